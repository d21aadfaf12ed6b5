//! Runtime values produced and consumed by the interpreter.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::rc::Rc;

use crate::interp::ast::FunctionDef;
use crate::interp::complex::Complex;
use crate::interp::error::{ErrorKind, EvalError, EvalResult};
use crate::interp::native::{ModuleSpec, NativeFunction};
use crate::interp::scope::Frame;

/// Deepest container nesting walked by repr, equality, ordering and export.
pub const MAX_NESTING_DEPTH: usize = 200;

/// Longest text [`Value::repr`] produces before it truncates with `...`.
pub const MAX_REPR_LEN: usize = 1 << 20;

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(Complex),
    Str(Rc<str>),
    List(Rc<ListItems>),
    Tuple(Rc<TupleItems>),
    Dict(Rc<RefCell<Dict>>),
    Range(RangeValue),
    /// Attribute bag holding a page's variables.
    Namespace(Rc<Namespace>),
    Module(&'static ModuleSpec),
    Native(&'static NativeFunction),
    Function(Rc<Function>),
    Method(Rc<BoundMethod>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeValue {
    pub fn len(&self) -> usize {
        let span = if self.step > 0 {
            (self.stop as i128 - self.start as i128 + self.step as i128 - 1) / self.step as i128
        } else {
            (self.start as i128 - self.stop as i128 - self.step as i128 - 1)
                / (-(self.step as i128))
        };
        span.max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, which must be below [`RangeValue::len`].
    pub fn get(&self, index: usize) -> i64 {
        let value = i128::from(self.start) + i128::from(self.step) * index as i128;
        i64::try_from(value).unwrap_or(self.stop)
    }
}

/// Storage behind a list value.
#[derive(Debug, Default)]
pub struct ListItems(RefCell<Vec<Value>>);

impl Deref for ListItems {
    type Target = RefCell<Vec<Value>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for ListItems {
    fn drop(&mut self) {
        release(std::mem::take(self.0.get_mut()));
    }
}

/// Storage behind a tuple value.
#[derive(Debug, Default)]
pub struct TupleItems(Vec<Value>);

impl Deref for TupleItems {
    type Target = Vec<Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for TupleItems {
    fn drop(&mut self) {
        release(std::mem::take(&mut self.0));
    }
}

/// Drop values without recursing into them.
///
/// Containers whose last reference goes away here hand their items back to
/// the work list, so tearing down a value nested a million levels deep
/// uses constant stack.
pub fn release(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        match value {
            Value::List(list) => {
                if let Ok(mut list) = Rc::try_unwrap(list) {
                    pending.append(list.0.get_mut());
                }
            }
            Value::Tuple(tuple) => {
                if let Ok(mut tuple) = Rc::try_unwrap(tuple) {
                    pending.append(&mut tuple.0);
                }
            }
            Value::Dict(dict) => {
                if let Ok(dict) = Rc::try_unwrap(dict) {
                    let mut dict = dict.into_inner();
                    for (k, v) in dict.entries.drain(..) {
                        pending.push(k);
                        pending.push(v);
                    }
                }
            }
            Value::Namespace(ns) => {
                if let Ok(ns) = Rc::try_unwrap(ns) {
                    pending.extend(ns.attrs.into_inner().into_values());
                }
            }
            Value::Function(func) => {
                if let Ok(mut func) = Rc::try_unwrap(func) {
                    pending.extend(func.take_captured());
                }
            }
            Value::Method(method) => {
                if let Ok(method) = Rc::try_unwrap(method) {
                    pending.push(method.receiver);
                }
            }
            _ => {}
        }
    }
}

/// Insertion-ordered mapping with Python equality on keys.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &Value) -> Option<usize> {
        self.entries.iter().position(|(k, _)| values_equal(k, key))
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    pub fn insert(&mut self, key: Value, value: Value) -> EvalResult<()> {
        ensure_hashable(&key)?;
        match self.position(&key) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((key, value)),
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }
}

impl Drop for Dict {
    fn drop(&mut self) {
        release(
            self.entries
                .drain(..)
                .flat_map(|(k, v)| [k, v])
                .collect(),
        );
    }
}

fn ensure_hashable(key: &Value) -> EvalResult<()> {
    hashable_at_depth(key, 0)
}

fn hashable_at_depth(key: &Value, depth: usize) -> EvalResult<()> {
    match key {
        Value::List(_) | Value::Dict(_) | Value::Namespace(_) => Err(EvalError::type_error(
            format!("unhashable type: '{}'", key.type_name()),
        )),
        Value::Tuple(_) if depth >= MAX_NESTING_DEPTH => Err(nesting_error()),
        Value::Tuple(items) => items
            .iter()
            .try_for_each(|item| hashable_at_depth(item, depth + 1)),
        _ => Ok(()),
    }
}

fn nesting_error() -> EvalError {
    EvalError::new(
        ErrorKind::Recursion,
        format!("value nested deeper than {MAX_NESTING_DEPTH} levels"),
    )
}

#[derive(Debug)]
pub struct Namespace {
    pub name: String,
    pub attrs: RefCell<BTreeMap<String, Value>>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: RefCell::new(BTreeMap::new()),
        }
    }
}

/// A user function from `def` or `lambda`.
#[derive(Debug)]
pub struct Function {
    pub def: Rc<FunctionDef>,
    pub defaults: Vec<Option<Value>>,
    pub closure: Rc<Frame>,
}

impl Function {
    /// Move out the defaults, and the closure's bindings when nothing else
    /// holds that frame.
    fn take_captured(&mut self) -> Vec<Value> {
        let mut captured: Vec<Value> = self.defaults.drain(..).flatten().collect();
        if Rc::strong_count(&self.closure) == 1 {
            captured.extend(self.closure.take_values());
        }
        captured
    }
}

impl Drop for Function {
    fn drop(&mut self) {
        release(self.take_captured());
    }
}

#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub name: &'static str,
}

impl Value {
    pub fn str(text: impl AsRef<str>) -> Value {
        Value::Str(Rc::from(text.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(ListItems(RefCell::new(items))))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::new(TupleItems(items)))
    }

    pub fn dict(dict: Dict) -> Value {
        Value::Dict(Rc::new(RefCell::new(dict)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Complex(_) => "complex",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Range(_) => "range",
            Value::Namespace(_) => "namespace",
            Value::Module(_) => "module",
            Value::Native(_) => "builtin_function_or_method",
            Value::Function(_) => "function",
            Value::Method(_) => "method",
        }
    }

    /// Code-like values: modules and callables. They never leave the sandbox.
    pub fn is_code(&self) -> bool {
        matches!(
            self,
            Value::Module(_) | Value::Native(_) | Value::Function(_) | Value::Method(_)
        )
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Complex(c) => c.re != 0.0 || c.im != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(dict) => !dict.borrow().is_empty(),
            Value::Range(range) => !range.is_empty(),
            _ => true,
        }
    }

    /// Integer view of ints and bools.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Real view of ints, bools and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Bool(b) => Some(*b as i64 as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<Complex> {
        match self {
            Value::Complex(c) => Some(*c),
            other => other.as_f64().map(Complex::from_real),
        }
    }

    pub fn expect_f64(&self, context: &str) -> EvalResult<f64> {
        self.as_f64().ok_or_else(|| {
            EvalError::type_error(format!(
                "{context}: must be real number, not {}",
                self.type_name()
            ))
        })
    }

    pub fn expect_int(&self, context: &str) -> EvalResult<i64> {
        self.as_int().ok_or_else(|| {
            EvalError::type_error(format!(
                "{context}: '{}' object cannot be interpreted as an integer",
                self.type_name()
            ))
        })
    }

    /// Python repr, cut short with `...` past [`MAX_REPR_LEN`].
    pub fn repr(&self) -> String {
        let mut renderer = Renderer::new(MAX_REPR_LEN);
        renderer.write(self);
        let mut out = renderer.out;
        if out.len() > MAX_REPR_LEN {
            let mut cut = MAX_REPR_LEN;
            while !out.is_char_boundary(cut) {
                cut -= 1;
            }
            out.truncate(cut);
            out.push_str("...");
        }
        out
    }

    /// Python repr, or `None` when it would be longer than `limit` bytes.
    ///
    /// Rendering stops as soon as the limit is passed, so the cost is
    /// bounded by `limit` even for heavily shared structures.
    pub fn try_repr(&self, limit: usize) -> Option<String> {
        let mut renderer = Renderer::new(limit);
        renderer.write(self);
        (renderer.out.len() <= limit).then_some(renderer.out)
    }

    /// `str()` rendering: strings print bare, everything else as repr.
    pub fn to_display(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            other => other.repr(),
        }
    }
}

fn container_ptr(value: &Value) -> Option<*const ()> {
    match value {
        Value::List(items) => Some(Rc::as_ptr(items) as *const ()),
        Value::Dict(dict) => Some(Rc::as_ptr(dict) as *const ()),
        Value::Namespace(ns) => Some(Rc::as_ptr(ns) as *const ()),
        _ => None,
    }
}

/// Repr writer with cycle, depth and length guards.
struct Renderer {
    out: String,
    /// Mutable containers on the current path.
    seen: Vec<*const ()>,
    depth: usize,
    limit: usize,
}

impl Renderer {
    fn new(limit: usize) -> Self {
        Self {
            out: String::new(),
            seen: Vec::new(),
            depth: 0,
            limit,
        }
    }

    fn full(&self) -> bool {
        self.out.len() > self.limit
    }

    fn write(&mut self, value: &Value) {
        if self.full() {
            return;
        }
        let ptr = container_ptr(value);
        let nested = ptr.is_some() || matches!(value, Value::Tuple(_));
        if nested {
            let cyclic = ptr.is_some_and(|p| self.seen.contains(&p));
            if cyclic || self.depth >= MAX_NESTING_DEPTH {
                self.out.push_str(match value {
                    Value::List(_) => "[...]",
                    Value::Dict(_) => "{...}",
                    Value::Tuple(_) => "(...)",
                    _ => "namespace(...)",
                });
                return;
            }
            self.depth += 1;
        }
        if let Some(ptr) = ptr {
            self.seen.push(ptr);
        }

        match value {
            Value::None => self.out.push_str("None"),
            Value::Bool(true) => self.out.push_str("True"),
            Value::Bool(false) => self.out.push_str("False"),
            Value::Int(i) => self.out.push_str(&i.to_string()),
            Value::Float(f) => self.out.push_str(&float_repr(*f)),
            Value::Complex(c) => self.out.push_str(&complex_repr(*c)),
            Value::Str(s) => self.out.push_str(&str_repr(s)),
            Value::List(items) => {
                self.out.push('[');
                self.write_items(&items.borrow());
                self.out.push(']');
            }
            Value::Tuple(items) => {
                self.out.push('(');
                self.write_items(items);
                if items.len() == 1 {
                    self.out.push(',');
                }
                self.out.push(')');
            }
            Value::Dict(dict) => {
                self.out.push('{');
                for (i, (k, v)) in dict.borrow().entries().iter().enumerate() {
                    if self.full() {
                        break;
                    }
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.write(k);
                    self.out.push_str(": ");
                    self.write(v);
                }
                self.out.push('}');
            }
            Value::Range(r) => {
                if r.step == 1 {
                    self.out.push_str(&format!("range({}, {})", r.start, r.stop));
                } else {
                    self.out
                        .push_str(&format!("range({}, {}, {})", r.start, r.stop, r.step));
                }
            }
            Value::Namespace(ns) => {
                self.out.push_str("namespace(");
                for (i, (k, v)) in ns.attrs.borrow().iter().enumerate() {
                    if self.full() {
                        break;
                    }
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(k);
                    self.out.push('=');
                    self.write(v);
                }
                self.out.push(')');
            }
            Value::Module(spec) => self.out.push_str(&format!("<module '{}'>", spec.name)),
            Value::Native(func) => self
                .out
                .push_str(&format!("<built-in function {}>", func.name)),
            Value::Function(func) => self.out.push_str(&format!("<function {}>", func.def.name)),
            Value::Method(method) => self.out.push_str(&format!(
                "<built-in method {} of {} object>",
                method.name,
                method.receiver.type_name()
            )),
        }

        if ptr.is_some() {
            self.seen.pop();
        }
        if nested {
            self.depth -= 1;
        }
    }

    fn write_items(&mut self, items: &[Value]) {
        for (i, item) in items.iter().enumerate() {
            if self.full() {
                break;
            }
            if i > 0 {
                self.out.push_str(", ");
            }
            self.write(item);
        }
    }
}

/// Shortest round-trip float text, Python style (`2.0`, `1e-07`, `1e+16`).
pub fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }
    let magnitude = f.abs();
    if (1e-4..1e16).contains(&magnitude) {
        let text = f.to_string();
        if text.contains('.') {
            text
        } else {
            format!("{text}.0")
        }
    } else {
        let text = format!("{f:e}");
        let (mantissa, exponent) = text.split_once('e').unwrap_or((&text, "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    }
}

fn complex_part(f: f64) -> String {
    let text = float_repr(f);
    text.strip_suffix(".0").map(str::to_string).unwrap_or(text)
}

pub fn complex_repr(c: Complex) -> String {
    if c.re == 0.0 && c.re.is_sign_positive() {
        return format!("{}j", complex_part(c.im));
    }
    let sign = if c.im.is_sign_negative() { "" } else { "+" };
    format!("({}{}{}j)", complex_part(c.re), sign, complex_part(c.im))
}

pub fn str_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Python `==`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    equal_at_depth(a, b, 0)
}

fn equal_at_depth(a: &Value, b: &Value, depth: usize) -> bool {
    if depth > MAX_NESTING_DEPTH {
        return false;
    }
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Complex(_), _) | (_, Value::Complex(_)) => {
            match (a.as_complex(), b.as_complex()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::List(x), Value::List(y)) => {
            Rc::ptr_eq(x, y) || sequences_equal(&x.borrow(), &y.borrow(), depth)
        }
        (Value::Tuple(x), Value::Tuple(y)) => sequences_equal(x, y, depth),
        (Value::Dict(x), Value::Dict(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.entries().iter().all(|(k, v)| {
                    y.get(k)
                        .is_some_and(|other| equal_at_depth(v, other, depth + 1))
                })
        }
        (Value::Range(x), Value::Range(y)) => {
            (x.is_empty() && y.is_empty())
                || (x.len() == y.len() && x.start == y.start && (x.len() == 1 || x.step == y.step))
        }
        (Value::Namespace(x), Value::Namespace(y)) => Rc::ptr_eq(x, y),
        (Value::Module(x), Value::Module(y)) => std::ptr::eq(*x, *y),
        (Value::Native(x), Value::Native(y)) => std::ptr::eq(*x, *y),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        _ => match (a.as_int(), b.as_int()) {
            (Some(x), Some(y)) => x == y,
            _ => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        },
    }
}

fn sequences_equal(x: &[Value], y: &[Value], depth: usize) -> bool {
    x.len() == y.len()
        && x
            .iter()
            .zip(y)
            .all(|(a, b)| equal_at_depth(a, b, depth + 1))
}

/// Python `is`: identity for containers, equality for immutable scalars.
pub fn values_identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::List(x), Value::List(y)) => Rc::ptr_eq(x, y),
        (Value::Dict(x), Value::Dict(y)) => Rc::ptr_eq(x, y),
        (Value::Tuple(x), Value::Tuple(y)) => Rc::ptr_eq(x, y),
        (Value::None, Value::None) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => Rc::ptr_eq(x, y) || x == y,
        (Value::Float(_), _) | (_, Value::Float(_)) => false,
        _ => values_equal(a, b) && a.type_name() == b.type_name(),
    }
}

/// Ordering for `<`-style comparisons. `Ok(None)` means unordered (NaN).
pub fn compare_values(a: &Value, b: &Value) -> EvalResult<Option<Ordering>> {
    compare_at_depth(a, b, 0)
}

fn compare_at_depth(a: &Value, b: &Value, depth: usize) -> EvalResult<Option<Ordering>> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Some(x.cmp(y))),
        (Value::List(_) | Value::Tuple(_), _) if depth >= MAX_NESTING_DEPTH => {
            Err(nesting_error())
        }
        (Value::List(x), Value::List(y)) => {
            compare_sequences(&x.borrow(), &y.borrow(), depth)
        }
        (Value::Tuple(x), Value::Tuple(y)) => compare_sequences(x, y, depth),
        _ => match (a.as_int(), b.as_int()) {
            (Some(x), Some(y)) => Ok(Some(x.cmp(&y))),
            _ => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(x.partial_cmp(&y)),
                _ => Err(EvalError::type_error(format!(
                    "'<' not supported between instances of '{}' and '{}'",
                    a.type_name(),
                    b.type_name()
                ))),
            },
        },
    }
}

fn compare_sequences(x: &[Value], y: &[Value], depth: usize) -> EvalResult<Option<Ordering>> {
    for (a, b) in x.iter().zip(y) {
        if !equal_at_depth(a, b, depth + 1) {
            return compare_at_depth(a, b, depth + 1);
        }
    }
    Ok(Some(x.len().cmp(&y.len())))
}

/// Lazily walks anything iterable.
pub enum ValueIter {
    Items(std::vec::IntoIter<Value>),
    Range { next: i64, remaining: usize, step: i64 },
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            ValueIter::Items(items) => items.next(),
            ValueIter::Range {
                next,
                remaining,
                step,
            } => {
                if *remaining == 0 {
                    return None;
                }
                let current = *next;
                *remaining -= 1;
                *next = next.wrapping_add(*step);
                Some(Value::Int(current))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            ValueIter::Items(items) => items.size_hint(),
            ValueIter::Range { remaining, .. } => (*remaining, Some(*remaining)),
        }
    }
}

pub fn iterate(value: &Value) -> EvalResult<ValueIter> {
    let items = match value {
        Value::List(items) => items.borrow().clone(),
        Value::Tuple(items) => items.to_vec(),
        Value::Str(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
        Value::Dict(dict) => dict.borrow().keys(),
        Value::Range(r) => {
            return Ok(ValueIter::Range {
                next: r.start,
                remaining: r.len(),
                step: r.step,
            })
        }
        other => {
            return Err(EvalError::new(
                ErrorKind::Type,
                format!("'{}' object is not iterable", other.type_name()),
            ))
        }
    };
    Ok(ValueIter::Items(items.into_iter()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_repr_matches_python() {
        assert_eq!(float_repr(2.0), "2.0");
        assert_eq!(float_repr(0.1), "0.1");
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1.5e-7), "1.5e-07");
        assert_eq!(float_repr(f64::INFINITY), "inf");
        assert_eq!(float_repr(-0.0), "-0.0");
    }

    #[test]
    fn test_container_repr() {
        let list = Value::list(vec![Value::Int(1), Value::str("a"), Value::None]);
        assert_eq!(list.repr(), "[1, 'a', None]");
        assert_eq!(Value::tuple(vec![Value::Int(1)]).repr(), "(1,)");
        assert_eq!(complex_repr(Complex::new(1.0, -2.0)), "(1-2j)");
        assert_eq!(complex_repr(Complex::new(0.0, 3.0)), "3j");
    }

    #[test]
    fn test_cyclic_list_repr_terminates() {
        let list = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(list.repr(), "[1, [...]]");
        if let Value::List(items) = &list {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn test_numeric_equality_across_types() {
        assert!(values_equal(&Value::Int(2), &Value::Float(2.0)));
        assert!(values_equal(&Value::Bool(true), &Value::Int(1)));
        assert!(!values_equal(&Value::str("1"), &Value::Int(1)));
    }

    #[test]
    fn test_range_len() {
        let r = RangeValue {
            start: 0,
            stop: 10,
            step: 3,
        };
        assert_eq!(r.len(), 4);
        let r = RangeValue {
            start: 5,
            stop: 0,
            step: -2,
        };
        assert_eq!(r.len(), 3);
        let r = RangeValue {
            start: 5,
            stop: 0,
            step: 1,
        };
        assert!(r.is_empty());
    }

    #[test]
    fn test_range_get_spans_full_width() {
        let r = RangeValue {
            start: i64::MIN,
            stop: i64::MAX,
            step: 1,
        };
        assert_eq!(r.len(), u64::MAX as usize);
        assert_eq!(r.get(0), i64::MIN);
        assert_eq!(r.get(r.len() - 1), i64::MAX - 1);
    }

    #[test]
    fn test_deep_nesting_is_released_without_recursion() {
        let mut value = Value::list(Vec::new());
        for _ in 0..1_000_000 {
            value = Value::tuple(vec![Value::list(vec![value])]);
        }
        assert!(value.repr().ends_with("],)"));
        assert!(value.try_repr(10).is_none());
        drop(value);
    }

    #[test]
    fn test_deep_tuple_repr_is_cut() {
        let mut value = Value::tuple(Vec::new());
        for _ in 0..MAX_NESTING_DEPTH * 2 {
            value = Value::tuple(vec![value]);
        }
        let text = value.repr();
        assert!(text.contains("(...)"));
        assert_eq!(text.matches('(').count(), MAX_NESTING_DEPTH + 1);
    }

    #[test]
    fn test_deep_ordering_is_an_error() {
        let mut a = Value::tuple(vec![Value::Int(1)]);
        let mut b = Value::tuple(vec![Value::Int(2)]);
        for _ in 0..MAX_NESTING_DEPTH * 2 {
            a = Value::tuple(vec![a]);
            b = Value::tuple(vec![b]);
        }
        assert_eq!(compare_values(&a, &b).unwrap_err().kind, ErrorKind::Recursion);
    }

    #[test]
    fn test_unhashable_dict_key() {
        let mut dict = Dict::new();
        let err = dict
            .insert(Value::list(Vec::new()), Value::Int(1))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }
}
