//! The `cmath` module: complex-valued counterparts of `math`.

use std::f64::consts::{E, PI};

use crate::interp::complex::Complex;
use crate::interp::error::{EvalError, EvalResult};
use crate::interp::native::{Args, ModuleSpec, NativeFunction, Runtime};
use crate::interp::value::Value;
use crate::library::native::{domain_error, is_close, range_error, tolerances};

pub static CMATH: ModuleSpec = ModuleSpec {
    name: "cmath",
    functions: CMATH_FUNCTIONS,
    constants: &[("pi", PI), ("e", E)],
};

static CMATH_FUNCTIONS: &[NativeFunction] = &[
    entry!("sqrt", "z, /", "Return the square root of z.", sqrt),
    entry!("exp", "z, /", "Return the exponential value e**z.", exp),
    entry!(
        "log",
        "z, base=math.e, /",
        "log(z[, base]) -> the logarithm of z to the given base.\n\nIf the base not specified, returns the natural logarithm (base e) of z.",
        log
    ),
    entry!("log10", "z, /", "Return the base-10 logarithm of z.", log10),
    entry!("sin", "z, /", "Return the sine of z.", sin),
    entry!("cos", "z, /", "Return the cosine of z.", cos),
    entry!("tan", "z, /", "Return the tangent of z.", tan),
    entry!("asin", "z, /", "Return the arc sine of z.", asin),
    entry!("acos", "z, /", "Return the arc cosine of z.", acos),
    entry!("atan", "z, /", "Return the arc tangent of z.", atan),
    entry!(
        "phase",
        "z, /",
        "Return argument, also known as the phase angle, of a complex.",
        phase
    ),
    entry!(
        "polar",
        "z, /",
        "Convert a complex from rectangular coordinates to polar coordinates.\n\nr is the distance from 0 and phi the phase angle.",
        polar
    ),
    entry!(
        "rect",
        "r, phi, /",
        "Convert from polar coordinates to rectangular coordinates.",
        rect
    ),
    NativeFunction {
        name: "isclose",
        params: "a, b, *, rel_tol=1e-09, abs_tol=0.0",
        keywords: &["rel_tol", "abs_tol"],
        doc: "Determine whether two complex numbers are close in value.",
        call: isclose,
    },
    entry!(
        "isfinite",
        "z, /",
        "Return True if both the real and imaginary parts of z are finite, else False.",
        isfinite
    ),
    entry!(
        "isnan",
        "z, /",
        "Checks if the real or imaginary part of z not a number (NaN).",
        isnan
    ),
];

fn complex_arg(args: &Args, index: usize, name: &str) -> EvalResult<Complex> {
    let value = args.arg(index);
    value.as_complex().ok_or_else(|| {
        EvalError::type_error(format!(
            "{name}: must be real number, not {}",
            value.type_name()
        ))
    })
}

fn one_complex(args: &Args, name: &str) -> EvalResult<Complex> {
    args.expect(name, 1, 1)?;
    complex_arg(args, 0, name)
}

/// Map a computed value back to the sandbox, rejecting overflow.
fn finish(input: Complex, result: Complex) -> EvalResult<Value> {
    if !result.is_finite() && input.is_finite() {
        return Err(if result.is_nan() {
            domain_error()
        } else {
            range_error()
        });
    }
    Ok(Value::Complex(result))
}

fn sqrt(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let z = one_complex(&args, "sqrt")?;
    finish(z, z.sqrt())
}

fn exp(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let z = one_complex(&args, "exp")?;
    finish(z, z.exp())
}

fn ln(z: Complex) -> EvalResult<Complex> {
    if z.re == 0.0 && z.im == 0.0 {
        return Err(domain_error());
    }
    Ok(z.ln())
}

fn log(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("log", 1, 2)?;
    let z = complex_arg(&args, 0, "log")?;
    let numerator = ln(z)?;
    if args.len() == 1 {
        return Ok(Value::Complex(numerator));
    }
    let base = ln(complex_arg(&args, 1, "log")?)?;
    numerator
        .div(base)
        .map(Value::Complex)
        .ok_or_else(|| EvalError::zero_division("complex division by zero"))
}

fn log10(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let z = one_complex(&args, "log10")?;
    let natural = ln(z)?;
    Ok(Value::Complex(Complex::new(
        natural.re / std::f64::consts::LN_10,
        natural.im / std::f64::consts::LN_10,
    )))
}

fn sin(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let z = one_complex(&args, "sin")?;
    finish(z, z.sin())
}

fn cos(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let z = one_complex(&args, "cos")?;
    finish(z, z.cos())
}

fn tan(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let z = one_complex(&args, "tan")?;
    let result = z.tan().ok_or_else(domain_error)?;
    finish(z, result)
}

fn asin(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let z = one_complex(&args, "asin")?;
    finish(z, z.asin())
}

fn acos(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let z = one_complex(&args, "acos")?;
    finish(z, z.acos())
}

fn atan(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let z = one_complex(&args, "atan")?;
    let result = z.atan().ok_or_else(domain_error)?;
    finish(z, result)
}

fn phase(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    Ok(Value::Float(one_complex(&args, "phase")?.arg()))
}

fn polar(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let z = one_complex(&args, "polar")?;
    let r = z.abs();
    if r.is_infinite() && z.is_finite() {
        return Err(range_error());
    }
    Ok(Value::tuple(vec![Value::Float(r), Value::Float(z.arg())]))
}

fn rect(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("rect", 2, 2)?;
    let r = args.f64(0, "rect")?;
    let phi = args.f64(1, "rect")?;
    Ok(Value::Complex(Complex::new(r * phi.cos(), r * phi.sin())))
}

fn isclose(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("isclose", 2, 2)?;
    let a = complex_arg(&args, 0, "isclose")?;
    let b = complex_arg(&args, 1, "isclose")?;
    let (rel_tol, abs_tol) = tolerances(&args)?;
    if a == b {
        return Ok(Value::Bool(true));
    }
    if !a.is_finite() || !b.is_finite() {
        return Ok(Value::Bool(false));
    }
    let diff = a.sub(b).abs();
    Ok(Value::Bool(is_close(diff, a.abs(), b.abs(), rel_tol, abs_tol)))
}

fn isfinite(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    Ok(Value::Bool(one_complex(&args, "isfinite")?.is_finite()))
}

fn isnan(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    Ok(Value::Bool(one_complex(&args, "isnan")?.is_nan()))
}
