//! Host-implemented functions and modules exposed to evaluated lines.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::interp::error::{EvalError, EvalResult};
use crate::interp::value::{iterate, Value};
use crate::sandbox::limits::StepLimiter;

/// Signature shared by builtins and library functions.
pub type NativeFn = fn(&mut Runtime, Args) -> EvalResult<Value>;

/// Registration entry for one host function.
#[derive(Debug)]
pub struct NativeFunction {
    pub name: &'static str,
    /// Parameter list as shown in signatures, e.g. `x, /`.
    pub params: &'static str,
    /// Keyword arguments accepted in addition to positional ones.
    pub keywords: &'static [&'static str],
    pub doc: &'static str,
    pub call: NativeFn,
}

impl NativeFunction {
    /// `name(params)` text used by the function index.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.params)
    }

    pub fn invoke(&'static self, runtime: &mut Runtime, args: Args) -> EvalResult<Value> {
        if let Some((name, _)) = args
            .keywords
            .iter()
            .find(|(k, _)| !self.keywords.contains(&k.as_str()))
        {
            return Err(EvalError::type_error(format!(
                "{}() got an unexpected keyword argument '{name}'",
                self.name
            )));
        }
        (self.call)(runtime, args)
    }
}

/// A natively provided library: functions plus numeric constants.
#[derive(Debug)]
pub struct ModuleSpec {
    pub name: &'static str,
    pub functions: &'static [NativeFunction],
    pub constants: &'static [(&'static str, f64)],
}

impl ModuleSpec {
    pub fn function(&'static self, name: &str) -> Option<&'static NativeFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn member(&'static self, name: &str) -> Option<Value> {
        if let Some(func) = self.function(name) {
            return Some(Value::Native(func));
        }
        self.constants
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| Value::Float(*v))
    }

    /// Every public member name, callables and constants alike.
    pub fn member_names(&self) -> Vec<&'static str> {
        self.functions
            .iter()
            .map(|f| f.name)
            .chain(self.constants.iter().map(|(n, _)| *n))
            .collect()
    }
}

/// Call arguments after evaluation.
#[derive(Debug, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
}

impl Args {
    pub fn new(positional: Vec<Value>) -> Self {
        Self {
            positional,
            keywords: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    /// Checks the positional count is within `min..=max`.
    pub fn expect(&self, name: &str, min: usize, max: usize) -> EvalResult<()> {
        let given = self.positional.len();
        if given >= min && given <= max {
            return Ok(());
        }
        let message = if min == max {
            let plural = if min == 1 { "" } else { "s" };
            format!("{name}() takes exactly {min} argument{plural} ({given} given)")
        } else if given < min {
            format!("{name}() expected at least {min} arguments, got {given}")
        } else {
            format!("{name}() expected at most {max} arguments, got {given}")
        };
        Err(EvalError::type_error(message))
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Positional argument `index`, or `None` when absent.
    pub fn arg(&self, index: usize) -> Value {
        self.positional.get(index).cloned().unwrap_or(Value::None)
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn f64(&self, index: usize, name: &str) -> EvalResult<f64> {
        self.arg(index).expect_f64(name)
    }

    pub fn int(&self, index: usize, name: &str) -> EvalResult<i64> {
        self.arg(index).expect_int(name)
    }
}

/// Mutable state a native function may touch: budgets and the RNG.
pub struct Runtime {
    pub limiter: StepLimiter,
    rng: StdRng,
}

impl Runtime {
    pub fn new(limiter: StepLimiter) -> Self {
        Self {
            limiter,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn tick(&mut self) -> EvalResult<()> {
        self.limiter.tick()
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Collects an iterable, charging one step per element.
    pub fn collect(&mut self, value: &Value) -> EvalResult<Vec<Value>> {
        let iter = iterate(value)?;
        let (lower, _) = iter.size_hint();
        self.limiter.check_len(lower)?;
        let mut items = Vec::with_capacity(lower);
        for item in iter {
            self.tick()?;
            items.push(item);
        }
        Ok(items)
    }

    /// Collects an iterable of real numbers.
    pub fn collect_reals(&mut self, value: &Value, context: &str) -> EvalResult<Vec<f64>> {
        self.collect(value)?
            .iter()
            .map(|v| v.expect_f64(context))
            .collect()
    }
}
