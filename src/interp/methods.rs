//! Methods on built-in container and text values.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::interp::error::{ErrorKind, EvalError, EvalResult};
use crate::interp::native::{Args, Runtime};
use crate::interp::value::{compare_values, values_equal, BoundMethod, Dict, Value};

const LIST_METHODS: &[&str] = &[
    "append", "extend", "pop", "insert", "index", "count", "sort", "reverse", "copy", "remove",
    "clear",
];
const DICT_METHODS: &[&str] = &["keys", "values", "items", "get", "pop", "update", "copy"];
const STR_METHODS: &[&str] = &[
    "upper",
    "lower",
    "strip",
    "split",
    "join",
    "replace",
    "startswith",
    "endswith",
];
const NUMBER_METHODS: &[&str] = &["conjugate"];

fn method_names(value: &Value) -> &'static [&'static str] {
    match value {
        Value::List(_) => LIST_METHODS,
        Value::Dict(_) => DICT_METHODS,
        Value::Str(_) => STR_METHODS,
        Value::Int(_) | Value::Float(_) | Value::Complex(_) => NUMBER_METHODS,
        _ => &[],
    }
}

/// Attribute lookup on a value that is not a module or namespace:
/// numeric parts, or a method bound to its receiver.
pub fn attribute(value: &Value, attr: &str) -> EvalResult<Value> {
    match (value, attr) {
        (Value::Complex(c), "real") => return Ok(Value::Float(c.re)),
        (Value::Complex(c), "imag") => return Ok(Value::Float(c.im)),
        (Value::Int(_) | Value::Float(_), "real") => return Ok(value.clone()),
        (Value::Int(_), "imag") => return Ok(Value::Int(0)),
        (Value::Float(_), "imag") => return Ok(Value::Float(0.0)),
        _ => {}
    }
    match method_names(value).iter().copied().find(|name| *name == attr) {
        Some(name) => Ok(Value::Method(Rc::new(BoundMethod {
            receiver: value.clone(),
            name,
        }))),
        None => Err(EvalError::new(
            ErrorKind::Attribute,
            format!("'{}' object has no attribute '{attr}'", value.type_name()),
        )),
    }
}

pub fn call_method(rt: &mut Runtime, method: &BoundMethod, args: Args) -> EvalResult<Value> {
    if let Some((name, _)) = args
        .keywords
        .iter()
        .find(|(k, _)| !(method.name == "sort" && k == "reverse"))
    {
        return Err(EvalError::type_error(format!(
            "{}() got an unexpected keyword argument '{name}'",
            method.name
        )));
    }
    match &method.receiver {
        Value::List(_) => list_method(rt, &method.receiver, method.name, args),
        Value::Dict(_) => dict_method(rt, &method.receiver, method.name, args),
        Value::Str(s) => str_method(rt, s, method.name, args),
        number => {
            args.expect(method.name, 0, 0)?;
            match number {
                Value::Complex(c) => Ok(Value::Complex(c.conj())),
                other => Ok(other.clone()),
            }
        }
    }
}

fn list_method(rt: &mut Runtime, receiver: &Value, name: &str, args: Args) -> EvalResult<Value> {
    let Value::List(list) = receiver else {
        return Err(EvalError::type_error("descriptor requires a 'list' object"));
    };
    match name {
        "append" => {
            args.expect("append", 1, 1)?;
            let len = list.borrow().len();
            rt.limiter.check_len(len + 1)?;
            list.borrow_mut().push(args.arg(0));
            Ok(Value::None)
        }
        "extend" => {
            args.expect("extend", 1, 1)?;
            let items = rt.collect(&args.arg(0))?;
            let len = list.borrow().len();
            rt.limiter.check_len(len + items.len())?;
            list.borrow_mut().extend(items);
            Ok(Value::None)
        }
        "pop" => {
            args.expect("pop", 0, 1)?;
            let len = list.borrow().len();
            if len == 0 {
                return Err(EvalError::new(ErrorKind::Index, "pop from empty list"));
            }
            let index = match args.get(0) {
                Some(v) => normalize_index(v.expect_int("pop()")?, len)
                    .ok_or_else(|| EvalError::new(ErrorKind::Index, "pop index out of range"))?,
                None => len - 1,
            };
            Ok(list.borrow_mut().remove(index))
        }
        "insert" => {
            args.expect("insert", 2, 2)?;
            let len = list.borrow().len();
            rt.limiter.check_len(len + 1)?;
            let index = args.int(0, "insert()")?;
            let position = if index < 0 {
                (len as i64 + index).max(0) as usize
            } else {
                (index as usize).min(len)
            };
            list.borrow_mut().insert(position, args.arg(1));
            Ok(Value::None)
        }
        "index" => {
            args.expect("index", 1, 1)?;
            let needle = args.arg(0);
            let items = list.borrow().clone();
            items
                .iter()
                .position(|item| values_equal(item, &needle))
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| {
                    EvalError::value(format!("{} is not in list", needle.repr()))
                })
        }
        "count" => {
            args.expect("count", 1, 1)?;
            let needle = args.arg(0);
            let items = list.borrow().clone();
            let count = items.iter().filter(|item| values_equal(item, &needle)).count();
            Ok(Value::Int(count as i64))
        }
        "remove" => {
            args.expect("remove", 1, 1)?;
            let needle = args.arg(0);
            let items = list.borrow().clone();
            let index = items
                .iter()
                .position(|item| values_equal(item, &needle))
                .ok_or_else(|| EvalError::value("list.remove(x): x not in list"))?;
            list.borrow_mut().remove(index);
            Ok(Value::None)
        }
        "sort" => {
            args.expect("sort", 0, 0)?;
            let reverse = args.keyword("reverse").is_some_and(Value::is_truthy);
            let mut items = list.borrow().clone();
            sort_values(&mut items)?;
            if reverse {
                items.reverse();
            }
            *list.borrow_mut() = items;
            Ok(Value::None)
        }
        "reverse" => {
            args.expect("reverse", 0, 0)?;
            list.borrow_mut().reverse();
            Ok(Value::None)
        }
        "copy" => {
            args.expect("copy", 0, 0)?;
            Ok(Value::list(list.borrow().clone()))
        }
        "clear" => {
            args.expect("clear", 0, 0)?;
            let drained = std::mem::take(&mut *list.borrow_mut());
            drop(drained);
            Ok(Value::None)
        }
        other => Err(no_method("list", other)),
    }
}

/// Stable sort using Python ordering; the first incomparable pair fails.
pub fn sort_values(items: &mut [Value]) -> EvalResult<()> {
    let mut failure = None;
    items.sort_by(|a, b| match compare_values(a, b) {
        Ok(order) => order.unwrap_or(Ordering::Equal),
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn dict_method(rt: &mut Runtime, receiver: &Value, name: &str, args: Args) -> EvalResult<Value> {
    let Value::Dict(dict) = receiver else {
        return Err(EvalError::type_error("descriptor requires a 'dict' object"));
    };
    match name {
        "keys" => {
            args.expect("keys", 0, 0)?;
            Ok(Value::list(dict.borrow().keys()))
        }
        "values" => {
            args.expect("values", 0, 0)?;
            let values = dict.borrow().entries().iter().map(|(_, v)| v.clone()).collect();
            Ok(Value::list(values))
        }
        "items" => {
            args.expect("items", 0, 0)?;
            let items = dict
                .borrow()
                .entries()
                .iter()
                .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
                .collect();
            Ok(Value::list(items))
        }
        "get" => {
            args.expect("get", 1, 2)?;
            let found = dict.borrow().get(&args.arg(0)).cloned();
            Ok(found.unwrap_or_else(|| args.arg(1)))
        }
        "pop" => {
            args.expect("pop", 1, 2)?;
            let key = args.arg(0);
            let removed = dict.borrow_mut().remove(&key);
            match (removed, args.get(1)) {
                (Some(value), _) => Ok(value),
                (None, Some(default)) => Ok(default.clone()),
                (None, None) => Err(EvalError::new(ErrorKind::Key, key.repr())),
            }
        }
        "update" => {
            args.expect("update", 1, 1)?;
            let entries: Vec<(Value, Value)> = match args.arg(0) {
                Value::Dict(other) => other.borrow().entries().to_vec(),
                iterable => rt
                    .collect(&iterable)?
                    .into_iter()
                    .map(pair)
                    .collect::<EvalResult<_>>()?,
            };
            let mut target = dict.borrow_mut();
            for (k, v) in entries {
                target.insert(k, v)?;
            }
            Ok(Value::None)
        }
        "copy" => {
            args.expect("copy", 0, 0)?;
            let copy: Dict = dict.borrow().clone();
            Ok(Value::Dict(Rc::new(std::cell::RefCell::new(copy))))
        }
        other => Err(no_method("dict", other)),
    }
}

fn pair(item: Value) -> EvalResult<(Value, Value)> {
    match item {
        Value::Tuple(items) if items.len() == 2 => Ok((items[0].clone(), items[1].clone())),
        Value::List(items) if items.borrow().len() == 2 => {
            let items = items.borrow();
            Ok((items[0].clone(), items[1].clone()))
        }
        _ => Err(EvalError::value(
            "dictionary update sequence element has wrong length; 2 is required",
        )),
    }
}

fn str_method(rt: &mut Runtime, text: &str, name: &str, args: Args) -> EvalResult<Value> {
    match name {
        "upper" => {
            args.expect("upper", 0, 0)?;
            Ok(Value::str(text.to_uppercase()))
        }
        "lower" => {
            args.expect("lower", 0, 0)?;
            Ok(Value::str(text.to_lowercase()))
        }
        "strip" => {
            args.expect("strip", 0, 1)?;
            match args.arg(0) {
                Value::None => Ok(Value::str(text.trim())),
                Value::Str(chars) => {
                    Ok(Value::str(text.trim_matches(|c: char| chars.contains(c))))
                }
                other => Err(str_arg_error("strip", &other)),
            }
        }
        "split" => {
            args.expect("split", 0, 2)?;
            let maxsplit = match args.get(1) {
                Some(v) => v.expect_int("split()")?,
                None => -1,
            };
            let parts: Vec<Value> = match args.arg(0) {
                Value::None => {
                    let words = text.split_whitespace();
                    if maxsplit < 0 {
                        words.map(Value::str).collect()
                    } else {
                        split_whitespace_n(text, maxsplit as usize)
                            .into_iter()
                            .map(Value::str)
                            .collect()
                    }
                }
                Value::Str(sep) => {
                    if sep.is_empty() {
                        return Err(EvalError::value("empty separator"));
                    }
                    if maxsplit < 0 {
                        text.split(&*sep).map(Value::str).collect()
                    } else {
                        text.splitn(maxsplit as usize + 1, &*sep)
                            .map(Value::str)
                            .collect()
                    }
                }
                other => return Err(str_arg_error("split", &other)),
            };
            rt.limiter.check_len(parts.len())?;
            Ok(Value::list(parts))
        }
        "join" => {
            args.expect("join", 1, 1)?;
            let items = rt.collect(&args.arg(0))?;
            let mut pieces = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::Str(s) => pieces.push(Rc::clone(s)),
                    other => {
                        return Err(EvalError::type_error(format!(
                            "sequence item {i}: expected str instance, {} found",
                            other.type_name()
                        )))
                    }
                }
            }
            let separators = text.len().saturating_mul(pieces.len().saturating_sub(1));
            let total = pieces
                .iter()
                .fold(separators, |len, piece| len.saturating_add(piece.len()));
            rt.limiter.check_len(total)?;
            let mut joined = String::with_capacity(total);
            for (i, piece) in pieces.iter().enumerate() {
                if i > 0 {
                    joined.push_str(text);
                }
                joined.push_str(piece);
            }
            Ok(Value::str(joined))
        }
        "replace" => {
            args.expect("replace", 2, 3)?;
            let (Value::Str(old), Value::Str(new)) = (args.arg(0), args.arg(1)) else {
                return Err(EvalError::type_error("replace() arguments must be str"));
            };
            let limit = match args.get(2) {
                Some(count) => usize::try_from(count.expect_int("replace()")?).ok(),
                None => None,
            };
            let found = text.matches(&*old).count();
            let matches = limit.map_or(found, |limit| found.min(limit));
            let result_len = (text.len() - matches * old.len())
                .saturating_add(matches.saturating_mul(new.len()));
            rt.limiter.check_len(result_len)?;
            Ok(Value::str(text.replacen(&*old, &new, matches)))
        }
        "startswith" | "endswith" => {
            args.expect(name, 1, 1)?;
            let candidates = match args.arg(0) {
                Value::Str(s) => vec![s],
                Value::Tuple(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::Str(s) => Ok(Rc::clone(s)),
                        other => Err(str_arg_error(name, other)),
                    })
                    .collect::<EvalResult<_>>()?,
                other => return Err(str_arg_error(name, &other)),
            };
            let hit = candidates.iter().any(|c| {
                if name == "startswith" {
                    text.starts_with(&**c)
                } else {
                    text.ends_with(&**c)
                }
            });
            Ok(Value::Bool(hit))
        }
        other => Err(no_method("str", other)),
    }
}

fn split_whitespace_n(text: &str, maxsplit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        if parts.len() == maxsplit {
            parts.push(rest.to_string());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
            }
            None => {
                parts.push(rest.to_string());
                break;
            }
        }
    }
    parts
}

fn str_arg_error(method: &str, value: &Value) -> EvalError {
    EvalError::type_error(format!(
        "{method}() argument must be str, not {}",
        value.type_name()
    ))
}

fn no_method(type_name: &str, name: &str) -> EvalError {
    EvalError::new(
        ErrorKind::Attribute,
        format!("'{type_name}' object has no attribute '{name}'"),
    )
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    (0..len as i64).contains(&resolved).then_some(resolved as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::config::SandboxConfig;
    use crate::sandbox::limits::{Interrupt, StepLimiter};

    fn runtime() -> Runtime {
        Runtime::new(StepLimiter::new(&SandboxConfig::default(), Interrupt::new()))
    }

    fn call(receiver: &Value, name: &str, args: Vec<Value>) -> EvalResult<Value> {
        let Value::Method(method) = attribute(receiver, name)? else {
            panic!("expected bound method");
        };
        call_method(&mut runtime(), &method, Args::new(args))
    }

    #[test]
    fn test_list_mutation() {
        let list = Value::list(vec![Value::Int(3), Value::Int(1)]);
        call(&list, "append", vec![Value::Int(2)]).unwrap();
        call(&list, "sort", vec![]).unwrap();
        assert_eq!(list.repr(), "[1, 2, 3]");
        assert!(matches!(call(&list, "pop", vec![]), Ok(Value::Int(3))));
        assert!(matches!(call(&list, "index", vec![Value::Int(2)]), Ok(Value::Int(1))));
    }

    #[test]
    fn test_extend_with_itself() {
        let list = Value::list(vec![Value::Int(1)]);
        call(&list, "extend", vec![list.clone()]).unwrap();
        assert_eq!(list.repr(), "[1, 1]");
    }

    #[test]
    fn test_sort_mixed_types_fails() {
        let list = Value::list(vec![Value::Int(1), Value::str("a")]);
        let err = call(&list, "sort", vec![]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn test_str_methods() {
        let text = Value::str("  a,b,c ");
        let stripped = call(&text, "strip", vec![]).unwrap();
        assert_eq!(stripped.repr(), "'a,b,c'");
        let parts = call(&stripped, "split", vec![Value::str(",")]).unwrap();
        assert_eq!(parts.repr(), "['a', 'b', 'c']");
        let joined = call(&Value::str("-"), "join", vec![parts]).unwrap();
        assert_eq!(joined.repr(), "'a-b-c'");
    }

    #[test]
    fn test_dict_get_and_pop() {
        let mut dict = Dict::new();
        dict.insert(Value::str("a"), Value::Int(1)).unwrap();
        let dict = Value::Dict(Rc::new(std::cell::RefCell::new(dict)));
        assert!(matches!(call(&dict, "get", vec![Value::str("b")]), Ok(Value::None)));
        assert!(matches!(call(&dict, "pop", vec![Value::str("a")]), Ok(Value::Int(1))));
        assert_eq!(
            call(&dict, "pop", vec![Value::str("a")]).unwrap_err().kind,
            ErrorKind::Key
        );
    }

    #[test]
    fn test_complex_parts() {
        let c = Value::Complex(crate::interp::complex::Complex::new(1.0, 2.0));
        assert!(matches!(attribute(&c, "imag"), Ok(Value::Float(f)) if f == 2.0));
        assert_eq!(call(&c, "conjugate", vec![]).unwrap().repr(), "(1-2j)");
        assert_eq!(
            attribute(&Value::Int(1), "nope").unwrap_err().kind,
            ErrorKind::Attribute
        );
    }
}
