//! Conversion between interpreter values and JSON.

use std::rc::Rc;

use serde_json::{Map, Number, Value as Json};

use crate::interp::value::{float_repr, Dict, Namespace, Value, MAX_NESTING_DEPTH, MAX_REPR_LEN};

/// Ranges longer than this export as their repr instead of an array.
pub const MAX_EXPORTED_RANGE: usize = 100_000;

/// Stands in for a value that did not fit the export budget.
pub const TOO_LARGE_MARKER: &str = "<value too large to export>";

/// Convert a value into a transport-safe JSON value, with a budget of
/// [`MAX_REPR_LEN`].
pub fn to_json(value: &Value) -> Json {
    Exporter::new(MAX_REPR_LEN).export(value)
}

/// Converts values to JSON against a shared size budget.
///
/// Dicts and namespaces become objects, lists, tuples and short ranges
/// become arrays. Cycles and nesting beyond [`MAX_NESTING_DEPTH`] are cut
/// with a repr-style marker string. Values JSON cannot carry (non-finite
/// floats, complex numbers, callables) become their repr.
///
/// Every node costs one unit plus the length of its text. A value that
/// runs the budget out exports as [`TOO_LARGE_MARKER`]. What it used is not
/// refunded, so later values only get what is left.
pub struct Exporter {
    remaining: usize,
    exhausted: bool,
    seen: Vec<*const ()>,
    depth: usize,
}

impl Exporter {
    pub fn new(budget: usize) -> Self {
        Self {
            remaining: budget,
            exhausted: false,
            seen: Vec::new(),
            depth: 0,
        }
    }

    pub fn export(&mut self, value: &Value) -> Json {
        self.exhausted = false;
        self.seen.clear();
        self.depth = 0;
        let json = self.convert(value);
        if self.exhausted {
            Json::String(TOO_LARGE_MARKER.to_string())
        } else {
            json
        }
    }

    fn charge(&mut self, units: usize) -> bool {
        match self.remaining.checked_sub(units) {
            Some(left) if !self.exhausted => {
                self.remaining = left;
                true
            }
            _ => {
                self.exhausted = true;
                false
            }
        }
    }

    fn convert(&mut self, value: &Value) -> Json {
        let text_len = match value {
            Value::Str(s) => s.len(),
            _ => 0,
        };
        if !self.charge(1 + text_len) {
            return Json::Null;
        }

        let ptr = identity(value);
        let nested = ptr.is_some() || matches!(value, Value::Tuple(_));
        if nested {
            let cyclic = ptr.is_some_and(|p| self.seen.contains(&p));
            if cyclic || self.depth >= MAX_NESTING_DEPTH {
                return Json::String(
                    match value {
                        Value::List(_) => "[...]",
                        Value::Dict(_) => "{...}",
                        Value::Tuple(_) => "(...)",
                        _ => "namespace(...)",
                    }
                    .to_string(),
                );
            }
            self.depth += 1;
        }
        if let Some(ptr) = ptr {
            self.seen.push(ptr);
        }

        let json = match value {
            Value::None => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::Number((*i).into()),
            Value::Float(f) => Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or_else(|| Json::String(float_repr(*f))),
            Value::Str(s) => Json::String(s.to_string()),
            Value::List(items) => self.array(&items.borrow()),
            Value::Tuple(items) => self.array(items),
            Value::Range(range) if range.len() <= MAX_EXPORTED_RANGE => {
                if self.charge(range.len()) {
                    Json::Array(
                        (0..range.len())
                            .map(|i| Json::Number(range.get(i).into()))
                            .collect(),
                    )
                } else {
                    Json::Null
                }
            }
            Value::Dict(dict) => Json::Object(self.dict_object(&dict.borrow())),
            Value::Namespace(ns) => Json::Object(self.namespace_object(ns)),
            other => {
                let text = other.repr();
                if self.charge(text.len()) {
                    Json::String(text)
                } else {
                    Json::Null
                }
            }
        };

        if ptr.is_some() {
            self.seen.pop();
        }
        if nested {
            self.depth -= 1;
        }
        json
    }

    fn array(&mut self, items: &[Value]) -> Json {
        let mut out = Vec::with_capacity(items.len().min(self.remaining));
        for item in items {
            if self.exhausted {
                break;
            }
            out.push(self.convert(item));
        }
        Json::Array(out)
    }

    fn dict_object(&mut self, dict: &Dict) -> Map<String, Json> {
        let mut out = Map::new();
        for (k, v) in dict.entries() {
            if self.exhausted {
                break;
            }
            let key = k.to_display();
            if !self.charge(key.len()) {
                break;
            }
            let value = self.convert(v);
            out.insert(key, value);
        }
        out
    }

    fn namespace_object(&mut self, ns: &Namespace) -> Map<String, Json> {
        let attrs = ns.attrs.borrow();
        let mut out = Map::new();
        for (k, v) in attrs.iter().filter(|(_, v)| !v.is_code()) {
            if self.exhausted || !self.charge(k.len()) {
                break;
            }
            let value = self.convert(v);
            out.insert(k.clone(), value);
        }
        out
    }
}

fn identity(value: &Value) -> Option<*const ()> {
    match value {
        Value::List(items) => Some(Rc::as_ptr(items) as *const ()),
        Value::Dict(dict) => Some(Rc::as_ptr(dict) as *const ()),
        Value::Namespace(ns) => Some(Rc::as_ptr(ns) as *const ()),
        _ => None,
    }
}

/// Convert client-supplied JSON into an interpreter value.
///
/// Objects become dicts with string keys; integral numbers that fit in
/// `i64` become ints, every other number a float.
pub fn from_json(json: &Json) -> Value {
    match json {
        Json::Null => Value::None,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::str(s),
        Json::Array(items) => Value::list(items.iter().map(from_json).collect()),
        Json::Object(map) => {
            let mut dict = Dict::new();
            for (k, v) in map {
                // String keys are always hashable.
                let _ = dict.insert(Value::str(k), from_json(v));
            }
            Value::dict(dict)
        }
    }
}

/// Build a page namespace from a JSON object of variable bindings.
pub fn namespace_from_json(name: &str, vars: &Map<String, Json>) -> Value {
    let ns = Namespace::new(name);
    {
        let mut attrs = ns.attrs.borrow_mut();
        for (k, v) in vars {
            attrs.insert(k.clone(), from_json(v));
        }
    }
    Value::Namespace(Rc::new(ns))
}
