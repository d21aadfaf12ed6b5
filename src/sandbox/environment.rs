//! Construction of the restricted environment a batch runs against.

use std::collections::HashMap;

use serde_json::{Map, Value as Json};

use crate::interp::builtins::BUILTINS;
use crate::interp::value::Value;
use crate::interp::Interpreter;
use crate::library::ModuleRegistry;
use crate::sandbox::serialize::{namespace_from_json, Exporter};

/// Read-only globals: the builtin whitelist, every available module under
/// its own name, and the short aliases whose target is available.
pub fn globals(registry: &ModuleRegistry) -> HashMap<String, Value> {
    let mut globals: HashMap<String, Value> = BUILTINS
        .iter()
        .map(|f| (f.name.to_string(), Value::Native(f)))
        .collect();
    for (name, spec) in registry.available() {
        globals.insert(name.to_string(), Value::Module(spec));
    }
    for &(alias, target) in registry.catalog().aliases() {
        if let Some(spec) = registry.module(target) {
            globals.insert(alias.to_string(), Value::Module(spec));
        }
    }
    globals
}

/// Bind each page context as a namespace named after its page.
///
/// Pages whose bindings are not a JSON object are skipped.
pub fn bind_pages(interp: &mut Interpreter<'_>, pages: &Map<String, Json>) {
    for (page, vars) in pages {
        match vars {
            Json::Object(vars) => interp.bind(page.clone(), namespace_from_json(page, vars)),
            _ => tracing::debug!(page = page.as_str(), "ignoring page context that is not an object"),
        }
    }
}

/// Whether a top-level binding belongs in the exported context.
pub fn is_exported(name: &str, value: &Value) -> bool {
    !name.starts_with('_') && !value.is_code()
}

/// Serialize the exported top-level bindings within one shared size budget.
pub fn export(bindings: &[(String, Value)], budget: usize) -> Map<String, Json> {
    let mut exporter = Exporter::new(budget);
    bindings
        .iter()
        .filter(|(name, value)| is_exported(name, value))
        .map(|(name, value)| (name.clone(), exporter.export(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LibraryCatalog;
    use crate::sandbox::serialize::TOO_LARGE_MARKER;

    #[test]
    fn test_globals_contents() {
        let registry = ModuleRegistry::new(LibraryCatalog::default());
        let globals = globals(&registry);
        for name in ["abs", "min", "max", "sum", "range", "len", "round", "pow", "math", "random"] {
            assert!(globals.contains_key(name), "missing {name}");
        }
        for name in ["open", "eval", "exec", "__import__", "print", "np", "sp", "numpy"] {
            assert!(!globals.contains_key(name), "unexpected {name}");
        }
    }

    #[test]
    fn test_disabled_module_is_not_bound() {
        let registry = ModuleRegistry::new(LibraryCatalog::default().without("statistics"));
        assert!(!globals(&registry).contains_key("statistics"));
    }

    #[test]
    fn test_export_filters_hidden_and_code() {
        let bindings = vec![
            ("_hidden".to_string(), Value::Int(1)),
            ("shown".to_string(), Value::Int(2)),
            ("f".to_string(), Value::Native(&BUILTINS[0])),
        ];
        let exported = export(&bindings, 1_000);
        assert_eq!(exported.len(), 1);
        assert_eq!(exported["shown"], serde_json::json!(2));
    }

    #[test]
    fn test_export_budget_is_shared() {
        let big = Value::list(vec![Value::str("x".repeat(600))]);
        let bindings = vec![
            ("a".to_string(), big.clone()),
            ("b".to_string(), big),
            ("c".to_string(), Value::Int(3)),
        ];
        let exported = export(&bindings, 1_000);
        assert_eq!(exported["a"][0].as_str().map(str::len), Some(600));
        assert_eq!(exported["b"], serde_json::json!(TOO_LARGE_MARKER));
        assert_eq!(exported["c"], serde_json::json!(3));
    }
}
