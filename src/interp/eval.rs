//! Tree-walking evaluator for one batch of lines.
//!
//! An [`Interpreter`] owns the batch's environment: the read-only globals
//! (builtins, modules, aliases), a top frame holding page namespaces and
//! user bindings, and the step/time budgets. Lines run strictly in order
//! against the same environment, and every fault is caught per line.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::interp::ast::{
    BinOp, CmpOp, Comprehension, Constant, Expr, FunctionBody, FunctionDef, Index, Stmt, Target,
};
use crate::interp::complex::Complex;
use crate::interp::error::{ErrorKind, EvalError, EvalResult};
use crate::interp::methods;
use crate::interp::native::{Args, ModuleSpec, Runtime};
use crate::interp::ops;
use crate::interp::parser::{parse_expression, parse_statements};
use crate::interp::scope::Frame;
use crate::interp::value::{
    compare_values, iterate, values_equal, values_identical, Dict, Function, RangeValue, Value,
};
use crate::sandbox::limits::StepLimiter;

/// Decides which modules a line may import.
pub trait ImportGate {
    /// Resolve `name`, failing with an import-denied error when the module
    /// is not in the available set.
    fn import(&self, name: &str) -> EvalResult<&'static ModuleSpec>;
}

/// How a statement finished.
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub struct Interpreter<'g> {
    globals: HashMap<String, Value>,
    top: Rc<Frame>,
    frame: Rc<Frame>,
    /// Frames captured by closures, cleared when the batch ends.
    closures: Vec<Weak<Frame>>,
    gate: &'g dyn ImportGate,
    runtime: Runtime,
}

impl<'g> Interpreter<'g> {
    pub fn new(globals: HashMap<String, Value>, gate: &'g dyn ImportGate, limiter: StepLimiter) -> Self {
        let top = Frame::root();
        Self {
            globals,
            frame: Rc::clone(&top),
            top,
            closures: Vec::new(),
            gate,
            runtime: Runtime::new(limiter),
        }
    }

    /// Bind a top-level name before any line runs.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.top.set(name, value);
    }

    /// Top-level bindings after the lines ran, sorted by name.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        self.top.bindings()
    }

    pub fn limiter(&self) -> &StepLimiter {
        &self.runtime.limiter
    }

    /// Run one line and render its result: `""`, a repr, or `Error: ...`.
    pub fn run_line(&mut self, line: &str) -> String {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            return String::new();
        }
        self.runtime.limiter.begin_line();
        let rendered = self.eval_line(line).and_then(|value| match value {
            Value::None => Ok(String::new()),
            value => {
                let limit = self.runtime.limiter.max_output_len();
                value.try_repr(limit).ok_or_else(|| {
                    EvalError::new(
                        ErrorKind::Resource,
                        format!("result is longer than {limit} characters"),
                    )
                })
            }
        });
        match rendered {
            Ok(text) => text,
            Err(err) => {
                debug!(kind = err.kind.name(), "line failed: {}", err.message);
                self.frame = Rc::clone(&self.top);
                err.render()
            }
        }
    }

    /// Expression first; statements only when the line is not an expression.
    fn eval_line(&mut self, line: &str) -> EvalResult<Value> {
        self.runtime.limiter.check_time()?;
        match parse_expression(line) {
            Ok(expr) => self.eval(&expr),
            Err(err) if err.is_syntax() => {
                let stmts = parse_statements(line)?;
                match self.exec_block(&stmts)? {
                    Flow::Normal => Ok(Value::None),
                    Flow::Return(_) => Err(EvalError::syntax("'return' outside function")),
                    Flow::Break => Err(EvalError::syntax("'break' outside loop")),
                    Flow::Continue => Err(EvalError::syntax("'continue' not properly in loop")),
                }
            }
            Err(err) => Err(err),
        }
    }

    fn tick(&mut self) -> EvalResult<()> {
        self.runtime.tick()
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    fn exec_block(&mut self, stmts: &[Stmt]) -> EvalResult<Flow> {
        for stmt in stmts {
            match self.exec(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> EvalResult<Flow> {
        self.tick()?;
        match stmt {
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
            Stmt::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
            }
            Stmt::AugAssign { target, op, value } => self.aug_assign(target, *op, value)?,
            Stmt::Import(aliases) => {
                for alias in aliases {
                    let spec = self.gate.import(&alias.name)?;
                    let bound = alias.asname.as_deref().unwrap_or(&alias.name);
                    self.frame.set(bound, Value::Module(spec));
                }
            }
            Stmt::ImportFrom { module, names } => {
                let spec = self.gate.import(module)?;
                for alias in names {
                    if alias.name == "*" {
                        for member in spec.member_names() {
                            if let Some(value) = spec.member(member) {
                                self.frame.set(member, value);
                            }
                        }
                        continue;
                    }
                    let value = spec.member(&alias.name).ok_or_else(|| {
                        EvalError::new(
                            ErrorKind::Import,
                            format!("cannot import name '{}' from '{}'", alias.name, spec.name),
                        )
                    })?;
                    let bound = alias.asname.as_deref().unwrap_or(&alias.name);
                    self.frame.set(bound, value);
                }
            }
            Stmt::FunctionDef(def) => {
                let function = self.make_function(def)?;
                self.frame.set(def.name.clone(), function);
            }
            Stmt::If { test, body, orelse } => {
                let branch = if self.eval(test)?.is_truthy() { body } else { orelse };
                return self.exec_block(branch);
            }
            Stmt::For { target, iter, body } => {
                let iterable = self.eval(iter)?;
                for item in iterate(&iterable)? {
                    self.tick()?;
                    self.assign(target, item)?;
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            Stmt::While { test, body } => {
                while self.eval(test)?.is_truthy() {
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::Pass => {}
        }
        Ok(Flow::Normal)
    }

    fn make_function(&mut self, def: &Rc<FunctionDef>) -> EvalResult<Value> {
        let defaults = def
            .params
            .iter()
            .map(|param| param.default.as_ref().map(|d| self.eval(d)).transpose())
            .collect::<EvalResult<Vec<_>>>()?;
        if !Rc::ptr_eq(&self.frame, &self.top)
            && !self
                .closures
                .last()
                .is_some_and(|last| std::ptr::eq(last.as_ptr(), Rc::as_ptr(&self.frame)))
        {
            self.closures.push(Rc::downgrade(&self.frame));
        }
        Ok(Value::Function(Rc::new(Function {
            def: Rc::clone(def),
            defaults,
            closure: Rc::clone(&self.frame),
        })))
    }

    fn assign(&mut self, target: &Target, value: Value) -> EvalResult<()> {
        match target {
            Target::Name(name) => {
                self.frame.set(name.as_str(), value);
                Ok(())
            }
            Target::Tuple(targets) => {
                let items = self.runtime.collect(&value)?;
                if items.len() < targets.len() {
                    return Err(EvalError::value(format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        items.len()
                    )));
                }
                if items.len() > targets.len() {
                    return Err(EvalError::value(format!(
                        "too many values to unpack (expected {})",
                        targets.len()
                    )));
                }
                for (target, item) in targets.iter().zip(items) {
                    self.assign(target, item)?;
                }
                Ok(())
            }
            Target::Subscript { value: object, index } => {
                let container = self.eval(object)?;
                self.store_item(&container, index, value)
            }
            Target::Attribute { value: object, attr } => {
                let object = self.eval(object)?;
                set_attribute(&object, attr, value)
            }
        }
    }

    fn aug_assign(&mut self, target: &Target, op: BinOp, rhs: &Expr) -> EvalResult<()> {
        match target {
            Target::Name(name) => {
                let current = self.lookup(name)?;
                let rhs = self.eval(rhs)?;
                let updated = self.aug_value(op, current, &rhs)?;
                self.frame.set(name.as_str(), updated);
                Ok(())
            }
            Target::Subscript { value: object, index } => {
                let container = self.eval(object)?;
                let current = self.load_item(&container, index)?;
                let rhs = self.eval(rhs)?;
                let updated = self.aug_value(op, current, &rhs)?;
                self.store_item(&container, index, updated)
            }
            Target::Attribute { value: object, attr } => {
                let object = self.eval(object)?;
                let current = self.attribute(&object, attr)?;
                let rhs = self.eval(rhs)?;
                let updated = self.aug_value(op, current, &rhs)?;
                set_attribute(&object, attr, updated)
            }
            Target::Tuple(_) => Err(EvalError::syntax(
                "'tuple' is an illegal expression for augmented assignment",
            )),
        }
    }

    /// `+=` extends lists in place; every other case rebinds.
    fn aug_value(&mut self, op: BinOp, current: Value, rhs: &Value) -> EvalResult<Value> {
        if let (BinOp::Add, Value::List(list)) = (op, &current) {
            let items = self.runtime.collect(rhs)?;
            let len = list.borrow().len();
            self.runtime.limiter.check_len(len + items.len())?;
            list.borrow_mut().extend(items);
            return Ok(current);
        }
        ops::binary(op, &current, rhs, &self.runtime.limiter)
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    fn lookup(&self, name: &str) -> EvalResult<Value> {
        self.frame
            .lookup(name)
            .or_else(|| self.globals.get(name).cloned())
            .ok_or_else(|| EvalError::name(name))
    }

    pub fn eval(&mut self, expr: &Expr) -> EvalResult<Value> {
        self.tick()?;
        match expr {
            Expr::Constant(constant) => Ok(match constant {
                Constant::None => Value::None,
                Constant::Bool(b) => Value::Bool(*b),
                Constant::Int(i) => Value::Int(*i),
                Constant::Float(f) => Value::Float(*f),
                Constant::Imaginary(f) => Value::Complex(Complex::new(0.0, *f)),
                Constant::Str(s) => Value::Str(Rc::clone(s)),
            }),
            Expr::Name(name) => self.lookup(name),
            Expr::List(items) => Ok(Value::list(self.eval_all(items)?)),
            Expr::Tuple(items) => Ok(Value::tuple(self.eval_all(items)?)),
            Expr::Dict(entries) => {
                let mut dict = Dict::new();
                for (key, value) in entries {
                    let key = self.eval(key)?;
                    let value = self.eval(value)?;
                    dict.insert(key, value)?;
                }
                Ok(Value::Dict(Rc::new(std::cell::RefCell::new(dict))))
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                ops::unary(*op, &operand)
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::binary(*op, &left, &right, &self.runtime.limiter)
            }
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Compare { left, comparisons } => {
                let mut left = self.eval(left)?;
                for (op, right) in comparisons {
                    let right = self.eval(right)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::IfExp { test, body, orelse } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(body)
                } else {
                    self.eval(orelse)
                }
            }
            Expr::Lambda(def) => self.make_function(def),
            Expr::Call {
                func,
                args,
                keywords,
            } => {
                let callee = self.eval(func)?;
                let positional = self.eval_all(args)?;
                let keywords = keywords
                    .iter()
                    .map(|(name, expr)| Ok((name.clone(), self.eval(expr)?)))
                    .collect::<EvalResult<Vec<_>>>()?;
                self.call(
                    &callee,
                    Args {
                        positional,
                        keywords,
                    },
                )
            }
            Expr::Attribute { value, attr } => {
                let object = self.eval(value)?;
                self.attribute(&object, attr)
            }
            Expr::Subscript { value, index } => {
                let container = self.eval(value)?;
                self.load_item(&container, index)
            }
            Expr::ListComp {
                element,
                generators,
            } => self.list_comprehension(element, generators),
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> EvalResult<Vec<Value>> {
        self.runtime.limiter.check_len(exprs.len())?;
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    fn attribute(&mut self, object: &Value, attr: &str) -> EvalResult<Value> {
        match object {
            Value::Module(spec) => spec.member(attr).ok_or_else(|| {
                EvalError::new(
                    ErrorKind::Attribute,
                    format!("module '{}' has no attribute '{attr}'", spec.name),
                )
            }),
            Value::Namespace(ns) => ns.attrs.borrow().get(attr).cloned().ok_or_else(|| {
                EvalError::new(
                    ErrorKind::Attribute,
                    format!("page '{}' has no attribute '{attr}'", ns.name),
                )
            }),
            other => methods::attribute(other, attr),
        }
    }

    fn call(&mut self, callee: &Value, args: Args) -> EvalResult<Value> {
        match callee {
            Value::Native(func) => func.invoke(&mut self.runtime, args),
            Value::Method(method) => methods::call_method(&mut self.runtime, method, args),
            Value::Function(func) => {
                self.runtime.limiter.enter_call()?;
                let result = self.call_function(func, args);
                self.runtime.limiter.leave_call();
                result
            }
            other => Err(EvalError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_function(&mut self, func: &Rc<Function>, args: Args) -> EvalResult<Value> {
        let def = &func.def;
        let params = &def.params;
        if args.positional.len() > params.len() {
            return Err(EvalError::type_error(format!(
                "{}() takes {} positional argument{} but {} were given",
                def.name,
                params.len(),
                if params.len() == 1 { "" } else { "s" },
                args.positional.len()
            )));
        }

        let mut slots: Vec<Option<Value>> = vec![None; params.len()];
        for (slot, value) in slots.iter_mut().zip(args.positional) {
            *slot = Some(value);
        }
        for (name, value) in args.keywords {
            let Some(i) = params.iter().position(|p| p.name == name) else {
                return Err(EvalError::type_error(format!(
                    "{}() got an unexpected keyword argument '{name}'",
                    def.name
                )));
            };
            if slots[i].is_some() {
                return Err(EvalError::type_error(format!(
                    "{}() got multiple values for argument '{name}'",
                    def.name
                )));
            }
            slots[i] = Some(value);
        }

        let frame = Frame::child(&func.closure);
        for ((param, slot), default) in params.iter().zip(slots).zip(&func.defaults) {
            let value = slot.or_else(|| default.clone()).ok_or_else(|| {
                EvalError::type_error(format!(
                    "{}() missing required argument: '{}'",
                    def.name, param.name
                ))
            })?;
            frame.set(param.name.as_str(), value);
        }

        let saved = std::mem::replace(&mut self.frame, frame);
        let result = match &def.body {
            FunctionBody::Expr(expr) => self.eval(expr),
            FunctionBody::Block(stmts) => match self.exec_block(stmts) {
                Ok(Flow::Return(value)) => Ok(value),
                Ok(Flow::Normal) => Ok(Value::None),
                Ok(Flow::Break) => Err(EvalError::syntax("'break' outside loop")),
                Ok(Flow::Continue) => Err(EvalError::syntax("'continue' not properly in loop")),
                Err(err) => Err(err),
            },
        };
        self.frame = saved;
        result
    }

    fn list_comprehension(&mut self, element: &Expr, generators: &[Comprehension]) -> EvalResult<Value> {
        let scope = Frame::child(&self.frame);
        let saved = std::mem::replace(&mut self.frame, scope);
        let mut out = Vec::new();
        let result = self.comprehension_level(element, generators, &mut out);
        self.frame = saved;
        result?;
        Ok(Value::list(out))
    }

    fn comprehension_level(
        &mut self,
        element: &Expr,
        generators: &[Comprehension],
        out: &mut Vec<Value>,
    ) -> EvalResult<()> {
        let Some((generator, rest)) = generators.split_first() else {
            self.runtime.limiter.check_len(out.len() + 1)?;
            out.push(self.eval(element)?);
            return Ok(());
        };
        let iterable = self.eval(&generator.iter)?;
        'items: for item in iterate(&iterable)? {
            self.tick()?;
            self.assign(&generator.target, item)?;
            for condition in &generator.conditions {
                if !self.eval(condition)?.is_truthy() {
                    continue 'items;
                }
            }
            self.comprehension_level(element, rest, out)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Subscripts
    // ---------------------------------------------------------------------

    fn load_item(&mut self, container: &Value, index: &Index) -> EvalResult<Value> {
        match index {
            Index::Single(expr) => {
                let key = self.eval(expr)?;
                get_item(container, &key)
            }
            Index::Slice { lower, upper, step } => {
                let bounds = self.slice_bounds(lower, upper, step)?;
                get_slice(container, bounds, &self.runtime.limiter)
            }
        }
    }

    fn store_item(&mut self, container: &Value, index: &Index, value: Value) -> EvalResult<()> {
        match (container, index) {
            (Value::Dict(dict), Index::Single(expr)) => {
                let key = self.eval(expr)?;
                dict.borrow_mut().insert(key, value)
            }
            (Value::List(list), Index::Single(expr)) => {
                let key = self.eval(expr)?;
                let len = list.borrow().len();
                let i = sequence_index(&key, len, "list")?
                    .ok_or_else(|| EvalError::new(ErrorKind::Index, "list assignment index out of range"))?;
                list.borrow_mut()[i] = value;
                Ok(())
            }
            (Value::List(list), Index::Slice { lower, upper, step }) => {
                let bounds = self.slice_bounds(lower, upper, step)?;
                let items = self.runtime.collect(&value)?;
                let len = list.borrow().len();
                let (start, stop, step) = adjust_slice(bounds, len)?;
                if step == 1 {
                    let stop = stop.max(start);
                    self.runtime
                        .limiter
                        .check_len(len - (stop - start) as usize + items.len())?;
                    list.borrow_mut()
                        .splice(start as usize..stop as usize, items);
                    return Ok(());
                }
                let indices = slice_indices(start, stop, step);
                if indices.len() != items.len() {
                    return Err(EvalError::value(format!(
                        "attempt to assign sequence of size {} to extended slice of size {}",
                        items.len(),
                        indices.len()
                    )));
                }
                let mut target = list.borrow_mut();
                for (i, item) in indices.into_iter().zip(items) {
                    target[i] = item;
                }
                Ok(())
            }
            (other, _) => Err(EvalError::type_error(format!(
                "'{}' object does not support item assignment",
                other.type_name()
            ))),
        }
    }

    fn slice_bounds(
        &mut self,
        lower: &Option<Expr>,
        upper: &Option<Expr>,
        step: &Option<Expr>,
    ) -> EvalResult<SliceBounds> {
        let mut bound = |expr: &Option<Expr>| -> EvalResult<Option<i64>> {
            match expr {
                None => Ok(None),
                Some(expr) => match self.eval(expr)? {
                    Value::None => Ok(None),
                    value => value.as_int().map(Some).ok_or_else(|| {
                        EvalError::type_error(
                            "slice indices must be integers or None",
                        )
                    }),
                },
            }
        };
        Ok(SliceBounds {
            lower: bound(lower)?,
            upper: bound(upper)?,
            step: bound(step)?,
        })
    }
}

impl Drop for Interpreter<'_> {
    fn drop(&mut self) {
        for frame in self.closures.drain(..) {
            if let Some(frame) = frame.upgrade() {
                frame.clear();
            }
        }
        self.top.clear();
    }
}

fn set_attribute(object: &Value, attr: &str, value: Value) -> EvalResult<()> {
    match object {
        Value::Namespace(ns) => {
            ns.attrs.borrow_mut().insert(attr.to_string(), value);
            Ok(())
        }
        other => Err(EvalError::new(
            ErrorKind::Attribute,
            format!(
                "'{}' object attribute '{attr}' is read-only",
                other.type_name()
            ),
        )),
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> EvalResult<bool> {
    use std::cmp::Ordering::{Equal, Greater, Less};
    Ok(match op {
        CmpOp::Eq => values_equal(left, right),
        CmpOp::NotEq => !values_equal(left, right),
        CmpOp::Lt => compare_values(left, right)? == Some(Less),
        CmpOp::LtE => matches!(compare_values(left, right)?, Some(Less | Equal)),
        CmpOp::Gt => compare_values(left, right)? == Some(Greater),
        CmpOp::GtE => matches!(compare_values(left, right)?, Some(Greater | Equal)),
        CmpOp::In => contains(right, left)?,
        CmpOp::NotIn => !contains(right, left)?,
        CmpOp::Is => values_identical(left, right),
        CmpOp::IsNot => !values_identical(left, right),
    })
}

fn contains(container: &Value, item: &Value) -> EvalResult<bool> {
    match container {
        Value::List(items) => {
            let items = items.borrow().clone();
            Ok(items.iter().any(|x| values_equal(x, item)))
        }
        Value::Tuple(items) => Ok(items.iter().any(|x| values_equal(x, item))),
        Value::Dict(dict) => Ok(dict.borrow().get(item).is_some()),
        Value::Str(text) => match item {
            Value::Str(needle) => Ok(text.contains(&**needle)),
            other => Err(EvalError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::Range(range) => Ok(match item.as_int() {
            Some(n) => range_position(range, n).is_some(),
            None => false,
        }),
        other => Err(EvalError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn range_position(range: &RangeValue, n: i64) -> Option<usize> {
    let offset = n as i128 - range.start as i128;
    let step = range.step as i128;
    if offset % step != 0 {
        return None;
    }
    let position = offset / step;
    (position >= 0 && (position as usize) < range.len()).then_some(position as usize)
}

/// Resolve an integer subscript against a sequence of `len` items.
fn sequence_index(key: &Value, len: usize, type_name: &str) -> EvalResult<Option<usize>> {
    let Some(index) = key.as_int() else {
        return Err(EvalError::type_error(format!(
            "{type_name} indices must be integers or slices, not {}",
            key.type_name()
        )));
    };
    let len = len as i128;
    let index = i128::from(index);
    let resolved = if index < 0 { index + len } else { index };
    Ok((0..len).contains(&resolved).then_some(resolved as usize))
}

fn get_item(container: &Value, key: &Value) -> EvalResult<Value> {
    let out_of_range =
        |name: &str| EvalError::new(ErrorKind::Index, format!("{name} index out of range"));
    match container {
        Value::List(items) => {
            let items = items.borrow();
            let i = sequence_index(key, items.len(), "list")?.ok_or_else(|| out_of_range("list"))?;
            Ok(items[i].clone())
        }
        Value::Tuple(items) => {
            let i = sequence_index(key, items.len(), "tuple")?.ok_or_else(|| out_of_range("tuple"))?;
            Ok(items[i].clone())
        }
        Value::Str(text) => {
            let chars: Vec<char> = text.chars().collect();
            let i = sequence_index(key, chars.len(), "string")?
                .ok_or_else(|| out_of_range("string"))?;
            Ok(Value::str(chars[i].to_string()))
        }
        Value::Range(range) => {
            let i = sequence_index(key, range.len(), "range")?
                .ok_or_else(|| EvalError::new(ErrorKind::Index, "range object index out of range"))?;
            Ok(Value::Int(range.get(i)))
        }
        Value::Dict(dict) => dict
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| EvalError::new(ErrorKind::Key, key.repr())),
        other => Err(EvalError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

#[derive(Debug, Clone, Copy)]
struct SliceBounds {
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
}

/// Clamp slice bounds to a sequence length, Python style.
///
/// Works in `i128` so range lengths past `i64::MAX` clamp correctly.
fn adjust_slice(bounds: SliceBounds, len: usize) -> EvalResult<(i128, i128, i128)> {
    let len = len as i128;
    let step = i128::from(bounds.step.unwrap_or(1));
    if step == 0 {
        return Err(EvalError::value("slice step cannot be zero"));
    }
    let clamp = |value: i64| -> i128 {
        let value = i128::from(value);
        if value < 0 {
            let shifted = value + len;
            if shifted < 0 {
                if step < 0 {
                    -1
                } else {
                    0
                }
            } else {
                shifted
            }
        } else if value >= len {
            if step < 0 {
                len - 1
            } else {
                len
            }
        } else {
            value
        }
    };
    let (default_start, default_stop) = if step < 0 { (len - 1, -1) } else { (0, len) };
    let start = bounds.lower.map(clamp).unwrap_or(default_start);
    let stop = bounds.upper.map(clamp).unwrap_or(default_stop);
    Ok((start, stop, step))
}

/// Number of positions a clamped slice selects.
fn slice_len(start: i128, stop: i128, step: i128) -> i128 {
    if step > 0 {
        ((stop - start + step - 1) / step).max(0)
    } else {
        ((start - stop - step - 1) / -step).max(0)
    }
}

fn slice_indices(start: i128, stop: i128, step: i128) -> Vec<usize> {
    let count = slice_len(start, stop, step);
    (0..count).map(|k| (start + k * step) as usize).collect()
}

fn slice_range(range: &RangeValue, start: i128, stop: i128, step: i128) -> EvalResult<Value> {
    let count = slice_len(start, stop, step);
    let origin = i128::from(range.start);
    let first = origin + i128::from(range.step) * start;
    let new_step = i64::try_from(i128::from(range.step) * step).map_err(|_| EvalError::overflow())?;
    let end = origin + i128::from(range.step) * stop;
    let (first, end) = if count == 0 {
        let first = i64::try_from(first).unwrap_or(range.stop);
        (first, i64::try_from(end).unwrap_or(first))
    } else {
        // The end bound of a slice over a range wider than i64 may not fit;
        // one step past the last element is the next best bound.
        let last = first + i128::from(new_step) * (count - 1);
        let fallback = last + i128::from(new_step.signum());
        let first = i64::try_from(first).map_err(|_| EvalError::overflow())?;
        let end = i64::try_from(end)
            .or_else(|_| i64::try_from(fallback))
            .map_err(|_| EvalError::overflow())?;
        (first, end)
    };
    Ok(Value::Range(RangeValue {
        start: first,
        stop: end,
        step: new_step,
    }))
}

fn get_slice(container: &Value, bounds: SliceBounds, limiter: &StepLimiter) -> EvalResult<Value> {
    let len = match container {
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        Value::Str(text) => text.chars().count(),
        Value::Range(range) => range.len(),
        other => {
            return Err(EvalError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            )))
        }
    };
    let (start, stop, step) = adjust_slice(bounds, len)?;

    if let Value::Range(range) = container {
        return slice_range(range, start, stop, step);
    }

    limiter.check_len(slice_len(start, stop, step) as usize)?;
    let indices = slice_indices(start, stop, step);
    Ok(match container {
        Value::List(items) => {
            let items = items.borrow();
            Value::list(indices.iter().map(|&i| items[i].clone()).collect())
        }
        Value::Tuple(items) => Value::tuple(indices.iter().map(|&i| items[i].clone()).collect()),
        Value::Str(text) => {
            let chars: Vec<char> = text.chars().collect();
            Value::str(indices.iter().map(|&i| chars[i]).collect::<String>())
        }
        _ => Value::None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::builtins::BUILTINS;
    use crate::sandbox::config::SandboxConfig;
    use crate::sandbox::limits::Interrupt;

    struct DenyAll;

    impl ImportGate for DenyAll {
        fn import(&self, name: &str) -> EvalResult<&'static ModuleSpec> {
            Err(EvalError::import_denied(name))
        }
    }

    fn run(lines: &[&str]) -> Vec<String> {
        run_with(SandboxConfig::default(), lines)
    }

    fn run_with(config: SandboxConfig, lines: &[&str]) -> Vec<String> {
        let globals = BUILTINS
            .iter()
            .map(|f| (f.name.to_string(), Value::Native(f)))
            .collect();
        let limiter = StepLimiter::new(&config, Interrupt::new());
        let mut interp = Interpreter::new(globals, &DenyAll, limiter);
        lines.iter().map(|line| interp.run_line(line)).collect()
    }

    #[test]
    fn test_expression_and_statement_lines() {
        assert_eq!(run(&["1+1"]), vec!["2"]);
        assert_eq!(run(&["x = 5", "x * 2"]), vec!["", "10"]);
        assert_eq!(run(&["", "   # note", "3"]), vec!["", "", "3"]);
    }

    #[test]
    fn test_errors_do_not_abort_batch() {
        let results = run(&["1/0", "y = 2", "y"]);
        assert_eq!(results[0], "Error: division by zero");
        assert_eq!(results[1..], ["", "2"]);
    }

    #[test]
    fn test_runtime_error_is_not_retried_as_statement() {
        assert_eq!(run(&["undefined_name"]), vec!["Error: name 'undefined_name' is not defined"]);
    }

    #[test]
    fn test_import_denied_is_line_error() {
        let results = run(&["import os", "1"]);
        assert_eq!(results[0], "Error: Module 'os' is not allowed");
        assert_eq!(results[1], "1");
    }

    #[test]
    fn test_functions_and_closures() {
        let results = run(&[
            "def add(a, b=10): return a + b",
            "add(1)",
            "add(1, b=2)",
            "square = lambda v: v * v",
            "square(7)",
            "def fact(n): return 1 if n <= 1 else n * fact(n - 1)",
            "fact(10)",
        ]);
        assert_eq!(results, vec!["", "11", "3", "", "49", "", "3628800"]);
    }

    #[test]
    fn test_loops_and_comprehensions() {
        let results = run(&[
            "total = 0",
            "for i in range(5): total += i",
            "total",
            "[n * n for n in range(6) if n % 2 == 0]",
            "n = 3",
            "while n > 0: n -= 1",
            "n",
        ]);
        assert_eq!(results, vec!["", "", "10", "[0, 4, 16]", "", "", "0"]);
    }

    #[test]
    fn test_if_elif_else_across_lines() {
        let results = run(&["x = 7", "if x > 10: size = 'big'\nelif x > 5: size = 'mid'\nelse: size = 'small'", "size"]);
        assert_eq!(results[2], "'mid'");
    }

    #[test]
    fn test_subscripts_and_slices() {
        let results = run(&[
            "xs = [1, 2, 3, 4, 5]",
            "xs[-1]",
            "xs[1:3]",
            "xs[::-1]",
            "xs[0] = 10",
            "xs[:2]",
            "'hello'[1:4]",
            "d = {'a': 1}",
            "d['b'] = 2",
            "d",
            "d['zz']",
            "xs[9]",
        ]);
        assert_eq!(results[1], "5");
        assert_eq!(results[2], "[2, 3]");
        assert_eq!(results[3], "[5, 4, 3, 2, 1]");
        assert_eq!(results[5], "[10, 2]");
        assert_eq!(results[6], "'ell'");
        assert_eq!(results[9], "{'a': 1, 'b': 2}");
        assert_eq!(results[10], "Error: 'zz'");
        assert_eq!(results[11], "Error: list index out of range");
    }

    #[test]
    fn test_range_slices_stay_lazy() {
        let results = run(&[
            "range(10)[2:8:2]",
            "range(10)[::-1]",
            "range(10 ** 12)[1:][-1]",
            "len(range(10 ** 12)[::2])",
            "range(5)[10:]",
            "range(-9223372036854775807 - 1, 9223372036854775807)[-2:]",
        ]);
        assert_eq!(results[0], "range(2, 8, 2)");
        assert_eq!(results[1], "range(9, -1, -1)");
        assert_eq!(results[2], "999999999999");
        assert_eq!(results[3], "500000000000");
        assert_eq!(results[4], "range(5, 5)");
        assert_eq!(
            results[5],
            "range(9223372036854775805, 9223372036854775807)"
        );
    }

    #[test]
    fn test_tuple_unpacking() {
        let results = run(&["a, b = 1, 2", "a, b = b, a", "(a, b)", "a, b = [1]"]);
        assert_eq!(results[2], "(2, 1)");
        assert!(results[3].starts_with("Error: not enough values to unpack"));
    }

    #[test]
    fn test_infinite_loop_hits_step_limit() {
        let config = SandboxConfig::builder().max_steps(10_000).build();
        let results = run_with(config, &["while True: pass", "1"]);
        assert_eq!(results[0], "Error: execution step limit exceeded (10000 steps)");
        assert_eq!(results[1], "1");
    }

    #[test]
    fn test_unbounded_recursion_is_caught() {
        let results = run(&["def f(n): return f(n + 1)", "f(0)"]);
        assert_eq!(results[1], "Error: maximum recursion depth exceeded");
    }

    #[test]
    fn test_chained_comparison_and_membership() {
        let results = run(&["1 < 2 < 3", "3 in [1, 2, 3]", "'lo' in 'hello'", "5 in range(0, 10, 5)"]);
        assert_eq!(results, vec!["True", "True", "True", "True"]);
    }

    #[test]
    fn test_list_plus_equals_keeps_identity() {
        let results = run(&["a = [1]", "b = a", "a += [2]", "b"]);
        assert_eq!(results[3], "[1, 2]");
    }
}
