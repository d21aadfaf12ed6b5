//! The `random` module, backed by a per-batch seedable generator.

use rand::seq::{index, SliceRandom};
use rand::Rng;

use crate::interp::error::{ErrorKind, EvalError, EvalResult};
use crate::interp::native::{Args, ModuleSpec, NativeFunction, Runtime};
use crate::interp::value::Value;

pub static RANDOM: ModuleSpec = ModuleSpec {
    name: "random",
    functions: RANDOM_FUNCTIONS,
    constants: &[],
};

static RANDOM_FUNCTIONS: &[NativeFunction] = &[
    entry!(
        "seed",
        "a=None",
        "Initialize internal state from a seed.\n\nNone or no argument seeds from current time or from an operating system specific randomness source if available.",
        seed
    ),
    entry!("random", "", "random() -> x in the interval [0, 1).", random),
    entry!(
        "uniform",
        "a, b",
        "Get a random number in the range [a, b) or [a, b] depending on rounding.",
        uniform
    ),
    entry!(
        "randint",
        "a, b",
        "Return random integer in range [a, b], including both end points.",
        randint
    ),
    entry!(
        "randrange",
        "start, stop=None, step=1",
        "Choose a random item from range(stop) or range(start, stop[, step]).",
        randrange
    ),
    entry!(
        "choice",
        "seq",
        "Choose a random element from a non-empty sequence.",
        choice
    ),
    entry!(
        "gauss",
        "mu=0.0, sigma=1.0",
        "Gaussian distribution.\n\nmu is the mean, and sigma is the standard deviation.",
        gauss
    ),
    entry!(
        "normalvariate",
        "mu=0.0, sigma=1.0",
        "Normal distribution.\n\nmu is the mean, and sigma is the standard deviation.",
        gauss
    ),
    entry!("shuffle", "x", "Shuffle list x in place, and return None.", shuffle),
    entry!(
        "sample",
        "population, k",
        "Chooses k unique random elements from a population sequence.",
        sample
    ),
];

fn seed(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("seed", 0, 1)?;
    let seed = match args.arg(0) {
        Value::None => rand::rng().random(),
        Value::Int(i) => i as u64,
        Value::Bool(b) => b as u64,
        Value::Float(f) => f.to_bits(),
        Value::Str(s) => s
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100_0000_01b3)),
        other => {
            return Err(EvalError::type_error(format!(
                "The only supported seed types are: None, int, float, str. Got {}",
                other.type_name()
            )))
        }
    };
    rt.reseed(seed);
    Ok(Value::None)
}

fn random(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("random", 0, 0)?;
    Ok(Value::Float(rt.rng().random::<f64>()))
}

fn uniform(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("uniform", 2, 2)?;
    let a = args.f64(0, "uniform()")?;
    let b = args.f64(1, "uniform()")?;
    let t = rt.rng().random::<f64>();
    Ok(Value::Float(a + (b - a) * t))
}

fn randint(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("randint", 2, 2)?;
    let a = args.int(0, "randint()")?;
    let b = args.int(1, "randint()")?;
    if a > b {
        return Err(EvalError::value(format!("empty range in randint({a}, {b})")));
    }
    Ok(Value::Int(rt.rng().random_range(a..=b)))
}

fn randrange(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("randrange", 1, 3)?;
    let (start, stop) = match args.get(1) {
        None | Some(Value::None) => (0, args.int(0, "randrange()")?),
        Some(_) => (args.int(0, "randrange()")?, args.int(1, "randrange()")?),
    };
    let step = match args.get(2) {
        Some(v) => v.expect_int("randrange()")?,
        None => 1,
    };
    if step == 0 {
        return Err(EvalError::value("zero step for randrange()"));
    }
    let span = stop as i128 - start as i128;
    let count = if step > 0 {
        (span + step as i128 - 1) / step as i128
    } else {
        (span + step as i128 + 1) / step as i128
    };
    if count <= 0 {
        return Err(EvalError::value(format!(
            "empty range in randrange({start}, {stop}, {step})"
        )));
    }
    let pick = rt.rng().random_range(0..count);
    Ok(Value::Int((start as i128 + pick * step as i128) as i64))
}

fn choice(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("choice", 1, 1)?;
    let items = rt.collect(&args.arg(0))?;
    if items.is_empty() {
        return Err(EvalError::new(
            ErrorKind::Index,
            "Cannot choose from an empty sequence",
        ));
    }
    let pick = rt.rng().random_range(0..items.len());
    Ok(items[pick].clone())
}

/// Box-Muller transform over the batch generator.
fn gauss(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("gauss", 0, 2)?;
    let mu = match args.get(0) {
        Some(v) => v.expect_f64("gauss()")?,
        None => 0.0,
    };
    let sigma = match args.get(1) {
        Some(v) => v.expect_f64("gauss()")?,
        None => 1.0,
    };
    let u1: f64 = 1.0 - rt.rng().random::<f64>();
    let u2: f64 = rt.rng().random::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
    Ok(Value::Float(mu + sigma * z))
}

fn shuffle(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("shuffle", 1, 1)?;
    match args.arg(0) {
        Value::List(items) => {
            let mut shuffled = items.borrow().clone();
            shuffled.shuffle(rt.rng());
            *items.borrow_mut() = shuffled;
            Ok(Value::None)
        }
        other => Err(EvalError::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

fn sample(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("sample", 2, 2)?;
    let population = rt.collect(&args.arg(0))?;
    let k = args.int(1, "sample()")?;
    if k < 0 || k as usize > population.len() {
        return Err(EvalError::value(
            "Sample larger than population or is negative",
        ));
    }
    let picks = index::sample(rt.rng(), population.len(), k as usize);
    Ok(Value::list(
        picks.into_iter().map(|i| population[i].clone()).collect(),
    ))
}
