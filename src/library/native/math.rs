//! The `math` module: real-valued functions and constants.

use std::f64::consts::{E, PI, TAU};

use crate::interp::ast::BinOp;
use crate::interp::error::{EvalError, EvalResult};
use crate::interp::native::{Args, ModuleSpec, NativeFunction, Runtime};
use crate::interp::ops;
use crate::interp::value::Value;
use crate::library::native::{
    checked_float, domain_error, is_close, one_real, range_error, tolerances, two_reals,
};

pub static MATH: ModuleSpec = ModuleSpec {
    name: "math",
    functions: MATH_FUNCTIONS,
    constants: &[
        ("pi", PI),
        ("e", E),
        ("tau", TAU),
        ("inf", f64::INFINITY),
        ("nan", f64::NAN),
    ],
};

static MATH_FUNCTIONS: &[NativeFunction] = &[
    entry!("sqrt", "x, /", "Return the square root of x.", sqrt),
    entry!("exp", "x, /", "Return e raised to the power of x.", exp),
    entry!(
        "log",
        "x, base=math.e, /",
        "Return the logarithm of x to the given base.\n\nIf the base is not specified, returns the natural logarithm (base e) of x.",
        log
    ),
    entry!("log10", "x, /", "Return the base 10 logarithm of x.", log10),
    entry!("log2", "x, /", "Return the base 2 logarithm of x.", log2),
    entry!(
        "log1p",
        "x, /",
        "Return the natural logarithm of 1+x (base e).\n\nThe result is computed in a way which is accurate for x near zero.",
        log1p
    ),
    entry!(
        "expm1",
        "x, /",
        "Return exp(x)-1.\n\nThis function avoids the loss of precision involved in the direct evaluation of exp(x)-1 for small x.",
        expm1
    ),
    entry!("pow", "x, y, /", "Return x**y (x to the power of y).", pow),
    entry!("sin", "x, /", "Return the sine of x (measured in radians).", sin),
    entry!("cos", "x, /", "Return the cosine of x (measured in radians).", cos),
    entry!("tan", "x, /", "Return the tangent of x (measured in radians).", tan),
    entry!(
        "asin",
        "x, /",
        "Return the arc sine (measured in radians) of x.\n\nThe result is between -pi/2 and pi/2.",
        asin
    ),
    entry!(
        "acos",
        "x, /",
        "Return the arc cosine (measured in radians) of x.\n\nThe result is between 0 and pi.",
        acos
    ),
    entry!(
        "atan",
        "x, /",
        "Return the arc tangent (measured in radians) of x.\n\nThe result is between -pi/2 and pi/2.",
        atan
    ),
    entry!(
        "atan2",
        "y, x, /",
        "Return the arc tangent (measured in radians) of y/x.\n\nUnlike atan(y/x), the signs of both x and y are considered.",
        atan2
    ),
    entry!("sinh", "x, /", "Return the hyperbolic sine of x.", sinh),
    entry!("cosh", "x, /", "Return the hyperbolic cosine of x.", cosh),
    entry!("tanh", "x, /", "Return the hyperbolic tangent of x.", tanh),
    entry!("asinh", "x, /", "Return the inverse hyperbolic sine of x.", asinh),
    entry!("acosh", "x, /", "Return the inverse hyperbolic cosine of x.", acosh),
    entry!("atanh", "x, /", "Return the inverse hyperbolic tangent of x.", atanh),
    entry!(
        "floor",
        "x, /",
        "Return the floor of x as an Integral.\n\nThis is the largest integer <= x.",
        floor
    ),
    entry!(
        "ceil",
        "x, /",
        "Return the ceiling of x as an Integral.\n\nThis is the smallest integer >= x.",
        ceil
    ),
    entry!(
        "trunc",
        "x, /",
        "Truncates the Real x to the nearest Integral toward 0.",
        trunc
    ),
    entry!("fabs", "x, /", "Return the absolute value of the float x.", fabs),
    entry!(
        "factorial",
        "n, /",
        "Find n!.\n\nRaise a ValueError if x is negative or non-integral.",
        factorial
    ),
    entry!("gcd", "*integers", "Greatest Common Divisor.", gcd),
    entry!("lcm", "*integers", "Least Common Multiple.", lcm),
    entry!(
        "comb",
        "n, k, /",
        "Number of ways to choose k items from n items without repetition and without order.",
        comb
    ),
    entry!(
        "perm",
        "n, k=None, /",
        "Number of ways to choose k items from n items without repetition and with order.",
        perm
    ),
    entry!(
        "hypot",
        "*coordinates",
        "Multidimensional Euclidean distance from the origin to a point.",
        hypot
    ),
    entry!("degrees", "x, /", "Convert angle x from radians to degrees.", degrees),
    entry!("radians", "x, /", "Convert angle x from degrees to radians.", radians),
    NativeFunction {
        name: "isclose",
        params: "a, b, *, rel_tol=1e-09, abs_tol=0.0",
        keywords: &["rel_tol", "abs_tol"],
        doc: "Determine whether two floating point numbers are close in value.",
        call: isclose,
    },
    entry!(
        "isfinite",
        "x, /",
        "Return True if x is neither an infinity nor a NaN, and False otherwise.",
        isfinite
    ),
    entry!(
        "isinf",
        "x, /",
        "Return True if x is a positive or negative infinity, and False otherwise.",
        isinf
    ),
    entry!(
        "isnan",
        "x, /",
        "Return True if x is a NaN (not a number), and False otherwise.",
        isnan
    ),
    entry!(
        "copysign",
        "x, y, /",
        "Return a float with the magnitude (absolute value) of x but the sign of y.",
        copysign
    ),
    entry!(
        "fmod",
        "x, y, /",
        "Return fmod(x, y), according to platform C.\n\nx % y may differ.",
        fmod
    ),
    entry!("gamma", "x, /", "Gamma function at x.", gamma),
    entry!(
        "lgamma",
        "x, /",
        "Natural logarithm of absolute value of Gamma function at x.",
        lgamma
    ),
    entry!("erf", "x, /", "Error function at x.", erf),
    entry!("erfc", "x, /", "Complementary error function at x.", erfc),
    entry!(
        "fsum",
        "seq, /",
        "Return an accurate floating point sum of values in the iterable seq.\n\nAssumes IEEE-754 floating point arithmetic.",
        fsum
    ),
    NativeFunction {
        name: "prod",
        params: "iterable, /, *, start=1",
        keywords: &["start"],
        doc: "Calculate the product of all the elements in the input iterable.\n\nThe default start value for the product is 1.",
        call: prod,
    },
    entry!(
        "dist",
        "p, q, /",
        "Return the Euclidean distance between two points p and q.",
        dist
    ),
    entry!(
        "isqrt",
        "n, /",
        "Return the integer part of the square root of the input.",
        isqrt
    ),
];

fn sqrt(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "sqrt")?;
    if x < 0.0 {
        return Err(domain_error());
    }
    checked_float(&[x], x.sqrt())
}

fn exp(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "exp")?;
    checked_float(&[x], x.exp())
}

fn positive_log(x: f64, f: fn(f64) -> f64) -> EvalResult<f64> {
    if x <= 0.0 {
        return Err(domain_error());
    }
    Ok(f(x))
}

fn log(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("log", 1, 2)?;
    let x = args.f64(0, "log")?;
    let numerator = positive_log(x, f64::ln)?;
    if args.len() == 1 {
        return Ok(Value::Float(numerator));
    }
    let base = args.f64(1, "log")?;
    let denominator = positive_log(base, f64::ln)?;
    if denominator == 0.0 {
        return Err(EvalError::zero_division("float division by zero"));
    }
    Ok(Value::Float(numerator / denominator))
}

fn log10(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "log10")?;
    Ok(Value::Float(positive_log(x, f64::log10)?))
}

fn log2(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "log2")?;
    Ok(Value::Float(positive_log(x, f64::log2)?))
}

fn log1p(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "log1p")?;
    if x <= -1.0 {
        return Err(domain_error());
    }
    Ok(Value::Float(x.ln_1p()))
}

fn expm1(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "expm1")?;
    checked_float(&[x], x.exp_m1())
}

fn pow(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let (x, y) = two_reals(&args, "pow")?;
    if x == 0.0 && y < 0.0 {
        return Err(domain_error());
    }
    if x < 0.0 && x.is_finite() && y.is_finite() && y.fract() != 0.0 {
        return Err(domain_error());
    }
    checked_float(&[x, y], x.powf(y))
}

fn sin(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "sin")?;
    checked_float(&[x], x.sin())
}

fn cos(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "cos")?;
    checked_float(&[x], x.cos())
}

fn tan(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "tan")?;
    checked_float(&[x], x.tan())
}

fn asin(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "asin")?;
    checked_float(&[x], x.asin())
}

fn acos(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "acos")?;
    checked_float(&[x], x.acos())
}

fn atan(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "atan")?;
    Ok(Value::Float(x.atan()))
}

fn atan2(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let (y, x) = two_reals(&args, "atan2")?;
    Ok(Value::Float(y.atan2(x)))
}

fn sinh(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "sinh")?;
    checked_float(&[x], x.sinh())
}

fn cosh(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "cosh")?;
    checked_float(&[x], x.cosh())
}

fn tanh(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "tanh")?;
    Ok(Value::Float(x.tanh()))
}

fn asinh(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "asinh")?;
    Ok(Value::Float(x.asinh()))
}

fn acosh(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "acosh")?;
    if x < 1.0 {
        return Err(domain_error());
    }
    Ok(Value::Float(x.acosh()))
}

fn atanh(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "atanh")?;
    if x.abs() >= 1.0 {
        return Err(domain_error());
    }
    Ok(Value::Float(x.atanh()))
}

/// Float to int conversion shared by floor, ceil and trunc.
fn integral(value: f64) -> EvalResult<Value> {
    if value.is_nan() {
        return Err(EvalError::value("cannot convert float NaN to integer"));
    }
    if value.is_infinite() {
        return Err(EvalError::new(
            crate::interp::error::ErrorKind::Overflow,
            "cannot convert float infinity to integer",
        ));
    }
    if value.abs() >= 9.223_372_036_854_775_807e18 {
        return Err(EvalError::overflow());
    }
    Ok(Value::Int(value as i64))
}

fn rounding(args: &Args, name: &str, f: fn(f64) -> f64) -> EvalResult<Value> {
    args.expect(name, 1, 1)?;
    match args.arg(0) {
        Value::Int(i) => Ok(Value::Int(i)),
        Value::Bool(b) => Ok(Value::Int(b as i64)),
        other => integral(f(other.expect_f64(name)?)),
    }
}

fn floor(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    rounding(&args, "floor", f64::floor)
}

fn ceil(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    rounding(&args, "ceil", f64::ceil)
}

fn trunc(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    rounding(&args, "trunc", f64::trunc)
}

fn fabs(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "fabs")?;
    Ok(Value::Float(x.abs()))
}

fn factorial(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("factorial", 1, 1)?;
    let n = args.int(0, "factorial()")?;
    if n < 0 {
        return Err(EvalError::value(
            "factorial() not defined for negative values",
        ));
    }
    (2..=n)
        .try_fold(1i64, |acc, k| acc.checked_mul(k))
        .map(Value::Int)
        .ok_or_else(EvalError::overflow)
}

fn int_args(args: &Args, name: &str) -> EvalResult<Vec<i64>> {
    args.positional
        .iter()
        .map(|v| v.expect_int(name))
        .collect()
}

/// Fails only when the result is 2**63, which `i64` cannot hold.
fn gcd_pair(a: i64, b: i64) -> EvalResult<i64> {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    i64::try_from(a).map_err(|_| EvalError::overflow())
}

fn gcd(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let values = int_args(&args, "gcd()")?;
    values.into_iter().try_fold(0, gcd_pair).map(Value::Int)
}

fn lcm(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let values = int_args(&args, "lcm()")?;
    let mut acc: i64 = 1;
    for v in values {
        if v == 0 {
            return Ok(Value::Int(0));
        }
        let g = gcd_pair(acc, v)?;
        acc = (acc / g)
            .checked_mul(v.checked_abs().ok_or_else(EvalError::overflow)?)
            .ok_or_else(EvalError::overflow)?;
    }
    Ok(Value::Int(acc))
}

fn non_negative(args: &Args, index: usize, what: &str, name: &str) -> EvalResult<i64> {
    let value = args.int(index, name)?;
    if value < 0 {
        return Err(EvalError::value(format!("{what} must be a non-negative integer")));
    }
    Ok(value)
}

fn comb(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("comb", 2, 2)?;
    let n = non_negative(&args, 0, "n", "comb()")?;
    let k = non_negative(&args, 1, "k", "comb()")?;
    if k > n {
        return Ok(Value::Int(0));
    }
    let k = k.min(n - k);
    let mut result: i128 = 1;
    for i in 0..k {
        result = result * (n - i) as i128 / (i + 1) as i128;
        if result > i64::MAX as i128 {
            return Err(EvalError::overflow());
        }
    }
    Ok(Value::Int(result as i64))
}

fn perm(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("perm", 1, 2)?;
    let n = non_negative(&args, 0, "n", "perm()")?;
    let k = match args.get(1) {
        None | Some(Value::None) => n,
        Some(_) => non_negative(&args, 1, "k", "perm()")?,
    };
    if k > n {
        return Ok(Value::Int(0));
    }
    ((n - k + 1)..=n)
        .try_fold(1i64, |acc, f| acc.checked_mul(f))
        .map(Value::Int)
        .ok_or_else(EvalError::overflow)
}

fn hypot(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let coords = args
        .positional
        .iter()
        .map(|v| v.expect_f64("hypot()"))
        .collect::<EvalResult<Vec<_>>>()?;
    Ok(Value::Float(coords.iter().fold(0.0, |acc: f64, x| acc.hypot(*x))))
}

fn degrees(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "degrees")?;
    Ok(Value::Float(x.to_degrees()))
}

fn radians(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "radians")?;
    Ok(Value::Float(x.to_radians()))
}

fn isclose(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let (a, b) = two_reals(&args, "isclose")?;
    let (rel_tol, abs_tol) = tolerances(&args)?;
    if a == b {
        return Ok(Value::Bool(true));
    }
    if a.is_infinite() || b.is_infinite() {
        return Ok(Value::Bool(false));
    }
    Ok(Value::Bool(is_close((a - b).abs(), a.abs(), b.abs(), rel_tol, abs_tol)))
}

fn isfinite(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    Ok(Value::Bool(one_real(&args, "isfinite")?.is_finite()))
}

fn isinf(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    Ok(Value::Bool(one_real(&args, "isinf")?.is_infinite()))
}

fn isnan(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    Ok(Value::Bool(one_real(&args, "isnan")?.is_nan()))
}

fn copysign(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let (x, y) = two_reals(&args, "copysign")?;
    Ok(Value::Float(x.copysign(y)))
}

fn fmod(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let (x, y) = two_reals(&args, "fmod")?;
    if y == 0.0 || x.is_infinite() {
        return Err(domain_error());
    }
    Ok(Value::Float(x % y))
}

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

fn lanczos_sum(x: f64) -> f64 {
    LANCZOS_COEFFICIENTS[1..]
        .iter()
        .enumerate()
        .fold(LANCZOS_COEFFICIENTS[0], |acc, (i, c)| acc + c / (x + i as f64 + 1.0))
}

fn is_non_positive_integer(x: f64) -> bool {
    x <= 0.0 && x.fract() == 0.0
}

/// Gamma via Lanczos with reflection; exact on small positive integers.
pub(crate) fn gamma_fn(x: f64) -> f64 {
    if x.fract() == 0.0 && x > 0.0 && x <= 23.0 {
        return (2..x as i64).fold(1.0, |acc, k| acc * k as f64);
    }
    if x < 0.5 {
        return PI / ((PI * x).sin() * gamma_fn(1.0 - x));
    }
    let x = x - 1.0;
    let t = x + LANCZOS_G + 0.5;
    (2.0 * PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * lanczos_sum(x)
}

pub(crate) fn lgamma_fn(x: f64) -> f64 {
    if x < 0.5 {
        return (PI / (PI * x).sin().abs()).ln() - lgamma_fn(1.0 - x);
    }
    let x = x - 1.0;
    let t = x + LANCZOS_G + 0.5;
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + lanczos_sum(x).ln()
}

fn gamma(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "gamma")?;
    if is_non_positive_integer(x) || x == f64::NEG_INFINITY {
        return Err(domain_error());
    }
    if x > 171.7 {
        return Err(range_error());
    }
    checked_float(&[x], gamma_fn(x))
}

fn lgamma(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let x = one_real(&args, "lgamma")?;
    if is_non_positive_integer(x) {
        return Err(domain_error());
    }
    if x.is_infinite() {
        return Ok(Value::Float(f64::INFINITY));
    }
    checked_float(&[x], lgamma_fn(x))
}

/// Error function: Maclaurin series near zero, continued fraction beyond.
pub(crate) fn erf_fn(x: f64) -> f64 {
    if x.is_nan() {
        return x;
    }
    if x.abs() >= 2.5 {
        return x.signum() * (1.0 - erfc_tail(x.abs()));
    }
    let mut term = x;
    let mut sum = x;
    let x2 = x * x;
    for n in 1..200 {
        term *= -x2 / n as f64;
        let contribution = term / (2 * n + 1) as f64;
        sum += contribution;
        if contribution.abs() < 1e-17 * sum.abs() {
            break;
        }
    }
    sum * 2.0 / PI.sqrt()
}

/// erfc(x) for x >= 2.5 via its continued fraction.
fn erfc_tail(x: f64) -> f64 {
    let mut fraction = x;
    for k in (1..=120).rev() {
        fraction = x + (k as f64 / 2.0) / fraction;
    }
    (-x * x).exp() / (PI.sqrt() * fraction)
}

pub(crate) fn erfc_fn(x: f64) -> f64 {
    if x >= 2.5 {
        erfc_tail(x)
    } else if x <= -2.5 {
        2.0 - erfc_tail(-x)
    } else {
        1.0 - erf_fn(x)
    }
}

fn erf(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    Ok(Value::Float(erf_fn(one_real(&args, "erf")?)))
}

fn erfc(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    Ok(Value::Float(erfc_fn(one_real(&args, "erfc")?)))
}

fn fsum(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("fsum", 1, 1)?;
    let values = rt.collect_reals(&args.arg(0), "fsum()")?;
    let mut sum = 0.0f64;
    let mut compensation = 0.0f64;
    for x in values {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            compensation += (sum - t) + x;
        } else {
            compensation += (x - t) + sum;
        }
        sum = t;
    }
    Ok(Value::Float(sum + compensation))
}

fn prod(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("prod", 1, 1)?;
    let mut acc = args.keyword("start").cloned().unwrap_or(Value::Int(1));
    for item in rt.collect(&args.arg(0))? {
        rt.tick()?;
        acc = ops::binary(BinOp::Mul, &acc, &item, &rt.limiter)?;
    }
    Ok(acc)
}

fn dist(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("dist", 2, 2)?;
    let p = rt.collect_reals(&args.arg(0), "dist()")?;
    let q = rt.collect_reals(&args.arg(1), "dist()")?;
    if p.len() != q.len() {
        return Err(EvalError::value(
            "both points must have the same number of dimensions",
        ));
    }
    let distance = p
        .iter()
        .zip(&q)
        .fold(0.0f64, |acc, (a, b)| acc.hypot(a - b));
    Ok(Value::Float(distance))
}

fn isqrt(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("isqrt", 1, 1)?;
    let n = args.int(0, "isqrt()")?;
    if n < 0 {
        return Err(EvalError::value("isqrt() argument must be nonnegative"));
    }
    let mut root = (n as f64).sqrt() as i64;
    while root.checked_mul(root).map_or(true, |sq| sq > n) {
        root -= 1;
    }
    while (root + 1).checked_mul(root + 1).is_some_and(|sq| sq <= n) {
        root += 1;
    }
    Ok(Value::Int(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::error::ErrorKind;
    use crate::sandbox::config::SandboxConfig;
    use crate::sandbox::limits::{Interrupt, StepLimiter};

    fn call(name: &str, args: Vec<Value>) -> EvalResult<Value> {
        let mut rt = Runtime::new(StepLimiter::new(&SandboxConfig::default(), Interrupt::new()));
        MATH.function(name).unwrap().invoke(&mut rt, Args::new(args))
    }

    fn float(name: &str, x: f64) -> f64 {
        match call(name, vec![Value::Float(x)]) {
            Ok(Value::Float(f)) => f,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_sqrt_and_domain_errors() {
        assert_eq!(float("sqrt", 16.0), 4.0);
        let err = call("sqrt", vec![Value::Int(-1)]).unwrap_err();
        assert_eq!(err.message, "math domain error");
        assert!(call("log", vec![Value::Int(0)]).is_err());
    }

    #[test]
    fn test_exp_overflow_is_range_error() {
        let err = call("exp", vec![Value::Int(1000)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Overflow);
        assert_eq!(err.message, "math range error");
    }

    #[test]
    fn test_integer_functions() {
        assert!(matches!(call("factorial", vec![Value::Int(5)]), Ok(Value::Int(120))));
        assert!(call("factorial", vec![Value::Int(-1)]).is_err());
        assert!(matches!(call("gcd", vec![Value::Int(12), Value::Int(18)]), Ok(Value::Int(6))));
        assert!(matches!(call("lcm", vec![Value::Int(4), Value::Int(6)]), Ok(Value::Int(12))));
        assert!(matches!(call("comb", vec![Value::Int(5), Value::Int(2)]), Ok(Value::Int(10))));
        assert!(matches!(call("perm", vec![Value::Int(5), Value::Int(2)]), Ok(Value::Int(20))));
        assert!(matches!(call("isqrt", vec![Value::Int(17)]), Ok(Value::Int(4))));
        assert!(matches!(call("floor", vec![Value::Float(-2.5)]), Ok(Value::Int(-3))));
    }

    #[test]
    fn test_gcd_of_min_int_overflows() {
        let err = call("gcd", vec![Value::Int(i64::MIN), Value::Int(0)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Overflow);
        assert!(matches!(
            call("gcd", vec![Value::Int(i64::MIN), Value::Int(6)]),
            Ok(Value::Int(2))
        ));
        assert!(matches!(call("gcd", vec![Value::Int(-4), Value::Int(6)]), Ok(Value::Int(2))));
    }

    #[test]
    fn test_special_functions() {
        assert_eq!(float("gamma", 5.0), 24.0);
        assert!((float("gamma", 0.5) - PI.sqrt()).abs() < 1e-12);
        assert!((float("lgamma", 10.0) - 362_880f64.ln()).abs() < 1e-10);
        assert!((float("erf", 1.0) - 0.842_700_792_949_714_9).abs() < 1e-14);
        assert!((float("erfc", 3.0) - 2.209_049_699_858_544e-5).abs() < 1e-17);
        assert!(call("gamma", vec![Value::Int(0)]).is_err());
    }

    #[test]
    fn test_fsum_is_accurate() {
        let values = Value::list(vec![Value::Float(0.1); 10]);
        assert!(matches!(call("fsum", vec![values]), Ok(Value::Float(f)) if f == 1.0));
    }
}
