//! Arithmetic, bitwise and unary operators.

use crate::interp::ast::{BinOp, UnaryOp};
use crate::interp::complex::Complex;
use crate::interp::error::{ErrorKind, EvalError, EvalResult};
use crate::interp::value::Value;
use crate::sandbox::limits::StepLimiter;

fn unsupported(op: BinOp, left: &Value, right: &Value) -> EvalError {
    EvalError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

pub fn binary(op: BinOp, left: &Value, right: &Value, limiter: &StepLimiter) -> EvalResult<Value> {
    // Sequence operators first; they are not numeric.
    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            limiter.check_len(a.len() + b.len())?;
            return Ok(Value::str(format!("{a}{b}")));
        }
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            limiter.check_len(items.len())?;
            return Ok(Value::list(items));
        }
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            let mut items = a.to_vec();
            items.extend(b.iter().cloned());
            limiter.check_len(items.len())?;
            return Ok(Value::tuple(items));
        }
        (BinOp::Mul, seq @ (Value::Str(_) | Value::List(_) | Value::Tuple(_)), count)
        | (BinOp::Mul, count, seq @ (Value::Str(_) | Value::List(_) | Value::Tuple(_)))
            if count.as_int().is_some() =>
        {
            return repeat(seq, count.as_int().unwrap_or(0), limiter);
        }
        (BinOp::Mod, Value::Str(_), _) => {
            return Err(EvalError::type_error(
                "printf-style string formatting is not supported",
            ))
        }
        _ => {}
    }

    if let (Some(a), Some(b)) = (int_operand(left), int_operand(right)) {
        return int_binary(op, a, b);
    }

    match (left, right) {
        (Value::Complex(_), _) | (_, Value::Complex(_)) => {
            let (Some(a), Some(b)) = (left.as_complex(), right.as_complex()) else {
                return Err(unsupported(op, left, right));
            };
            complex_binary(op, a, b, left, right)
        }
        _ => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Err(unsupported(op, left, right));
            };
            float_binary(op, a, b, left, right)
        }
    }
}

fn int_operand(value: &Value) -> Option<i64> {
    match value {
        Value::Int(_) | Value::Bool(_) => value.as_int(),
        _ => None,
    }
}

fn repeat(seq: &Value, count: i64, limiter: &StepLimiter) -> EvalResult<Value> {
    let count = count.max(0) as usize;
    let len = match seq {
        Value::Str(s) => s.len(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        _ => 0,
    };
    limiter.check_len(len.saturating_mul(count))?;
    Ok(match seq {
        Value::Str(s) => Value::str(s.repeat(count)),
        Value::List(items) => Value::list(repeat_items(&items.borrow(), count)),
        Value::Tuple(items) => Value::tuple(repeat_items(items, count)),
        _ => Value::None,
    })
}

fn repeat_items(items: &[Value], count: usize) -> Vec<Value> {
    let mut out = Vec::with_capacity(items.len() * count);
    for _ in 0..count {
        out.extend(items.iter().cloned());
    }
    out
}

fn int_binary(op: BinOp, a: i64, b: i64) -> EvalResult<Value> {
    let overflow = EvalError::overflow;
    let value = match op {
        BinOp::Add => Value::Int(a.checked_add(b).ok_or_else(overflow)?),
        BinOp::Sub => Value::Int(a.checked_sub(b).ok_or_else(overflow)?),
        BinOp::Mul => Value::Int(a.checked_mul(b).ok_or_else(overflow)?),
        BinOp::Div => {
            if b == 0 {
                return Err(EvalError::zero_division("division by zero"));
            }
            Value::Float(a as f64 / b as f64)
        }
        BinOp::FloorDiv => {
            if b == 0 {
                return Err(EvalError::zero_division(
                    "integer division or modulo by zero",
                ));
            }
            Value::Int(floor_div(a, b).ok_or_else(overflow)?)
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(EvalError::zero_division("integer modulo by zero"));
            }
            Value::Int(floor_mod(a, b))
        }
        BinOp::Pow => int_pow(a, b)?,
        BinOp::BitAnd => Value::Int(a & b),
        BinOp::BitOr => Value::Int(a | b),
        BinOp::BitXor => Value::Int(a ^ b),
        BinOp::LeftShift => {
            if b < 0 {
                return Err(EvalError::value("negative shift count"));
            }
            if b >= 64 {
                if a == 0 {
                    Value::Int(0)
                } else {
                    return Err(overflow());
                }
            } else {
                let shifted = a << b;
                if shifted >> b != a {
                    return Err(overflow());
                }
                Value::Int(shifted)
            }
        }
        BinOp::RightShift => {
            if b < 0 {
                return Err(EvalError::value("negative shift count"));
            }
            Value::Int(a >> b.min(63))
        }
    };
    Ok(value)
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) {
        r + b
    } else {
        r
    }
}

fn int_pow(base: i64, exp: i64) -> EvalResult<Value> {
    if exp < 0 {
        if base == 0 {
            return Err(EvalError::zero_division(
                "0.0 cannot be raised to a negative power",
            ));
        }
        return Ok(Value::Float((base as f64).powf(exp as f64)));
    }
    let exp = u32::try_from(exp).map_err(|_| EvalError::overflow())?;
    base.checked_pow(exp)
        .map(Value::Int)
        .ok_or_else(EvalError::overflow)
}

fn float_binary(op: BinOp, a: f64, b: f64, left: &Value, right: &Value) -> EvalResult<Value> {
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(EvalError::zero_division("division by zero"));
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(EvalError::zero_division("float floor division by zero"));
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(EvalError::zero_division("float modulo by zero"));
            }
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(EvalError::zero_division(
                    "0.0 cannot be raised to a negative power",
                ));
            }
            if a < 0.0 && b.fract() != 0.0 && b.is_finite() {
                // Negative base with a fractional exponent leaves the reals.
                let z = Complex::from_real(a)
                    .powc(Complex::from_real(b))
                    .ok_or_else(|| EvalError::zero_division("0.0 to a negative power"))?;
                return Ok(Value::Complex(z));
            }
            let result = a.powf(b);
            if result.is_infinite() && a.is_finite() && b.is_finite() {
                return Err(EvalError::new(
                    ErrorKind::Overflow,
                    "numerical result out of range",
                ));
            }
            result
        }
        _ => return Err(unsupported(op, left, right)),
    };
    Ok(Value::Float(value))
}

fn complex_binary(
    op: BinOp,
    a: Complex,
    b: Complex,
    left: &Value,
    right: &Value,
) -> EvalResult<Value> {
    let value = match op {
        BinOp::Add => a.add(b),
        BinOp::Sub => a.sub(b),
        BinOp::Mul => a.mul(b),
        BinOp::Div => a
            .div(b)
            .ok_or_else(|| EvalError::zero_division("complex division by zero"))?,
        BinOp::Pow => a.powc(b).ok_or_else(|| {
            EvalError::zero_division("0.0 to a negative or complex power")
        })?,
        _ => return Err(unsupported(op, left, right)),
    };
    Ok(Value::Complex(value))
}

pub fn unary(op: UnaryOp, operand: &Value) -> EvalResult<Value> {
    let bad = || {
        let symbol = match op {
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
            UnaryOp::Invert => "~",
            UnaryOp::Not => "not",
        };
        EvalError::type_error(format!(
            "bad operand type for unary {symbol}: '{}'",
            operand.type_name()
        ))
    };
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Neg => match operand {
            Value::Int(_) | Value::Bool(_) => operand
                .as_int()
                .and_then(i64::checked_neg)
                .map(Value::Int)
                .ok_or_else(EvalError::overflow),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Complex(c) => Ok(Value::Complex(c.neg())),
            _ => Err(bad()),
        },
        UnaryOp::Pos => match operand {
            Value::Bool(b) => Ok(Value::Int(*b as i64)),
            Value::Int(_) | Value::Float(_) | Value::Complex(_) => Ok(operand.clone()),
            _ => Err(bad()),
        },
        UnaryOp::Invert => match operand {
            Value::Int(_) | Value::Bool(_) => Ok(Value::Int(!operand.as_int().unwrap_or(0))),
            _ => Err(bad()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::config::SandboxConfig;
    use crate::sandbox::limits::Interrupt;

    fn limiter() -> StepLimiter {
        StepLimiter::new(&SandboxConfig::default(), Interrupt::new())
    }

    fn eval(op: BinOp, a: Value, b: Value) -> EvalResult<Value> {
        binary(op, &a, &b, &limiter())
    }

    #[test]
    fn test_int_arithmetic() {
        assert!(matches!(
            eval(BinOp::Add, Value::Int(1), Value::Int(1)),
            Ok(Value::Int(2))
        ));
        assert!(matches!(
            eval(BinOp::FloorDiv, Value::Int(-7), Value::Int(2)),
            Ok(Value::Int(-4))
        ));
        assert!(matches!(
            eval(BinOp::Mod, Value::Int(-7), Value::Int(2)),
            Ok(Value::Int(1))
        ));
        assert!(matches!(
            eval(BinOp::Div, Value::Int(7), Value::Int(2)),
            Ok(Value::Float(f)) if f == 3.5
        ));
    }

    #[test]
    fn test_division_by_zero() {
        let err = eval(BinOp::Div, Value::Int(1), Value::Int(0)).unwrap_err();
        assert_eq!(err.message, "division by zero");
        assert!(eval(BinOp::Mod, Value::Float(1.0), Value::Float(0.0)).is_err());
    }

    #[test]
    fn test_overflow_is_an_error() {
        let err = eval(BinOp::Pow, Value::Int(10), Value::Int(40)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Overflow);
    }

    #[test]
    fn test_negative_exponent_gives_float() {
        assert!(matches!(
            eval(BinOp::Pow, Value::Int(2), Value::Int(-1)),
            Ok(Value::Float(f)) if f == 0.5
        ));
    }

    #[test]
    fn test_sequence_repeat_and_limit() {
        let config = SandboxConfig::builder().max_sequence_len(10).build();
        let limiter = StepLimiter::new(&config, Interrupt::new());
        let ok = binary(BinOp::Mul, &Value::str("ab"), &Value::Int(3), &limiter).unwrap();
        assert_eq!(ok.repr(), "'ababab'");
        let too_big = binary(BinOp::Mul, &Value::list(vec![Value::Int(0)]), &Value::Int(11), &limiter);
        assert!(too_big.is_err());
    }

    #[test]
    fn test_mixed_type_error() {
        let err = eval(BinOp::Add, Value::str("a"), Value::Int(1)).unwrap_err();
        assert_eq!(
            err.message,
            "unsupported operand type(s) for +: 'str' and 'int'"
        );
    }
}
