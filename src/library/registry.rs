//! Module registrar: which configured libraries are available.

use crate::interp::error::{EvalError, EvalResult};
use crate::interp::eval::ImportGate;
use crate::interp::native::ModuleSpec;
use crate::library::catalog::LibraryCatalog;
use crate::library::index::ModuleDescriptor;
use crate::library::native;

/// The available module set and the import gate built on it.
///
/// A configured library is available when a native provider exists for it
/// and the catalog does not disable it. Anything else is simply absent;
/// resolving modules never fails the registry as a whole.
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    catalog: LibraryCatalog,
    /// Available modules in catalog order.
    available: Vec<(&'static str, &'static ModuleSpec)>,
}

impl ModuleRegistry {
    pub fn new(catalog: LibraryCatalog) -> Self {
        let mut available = Vec::new();
        for &name in catalog.modules() {
            match native::provider(name) {
                Some(spec) if !catalog.is_disabled(name) => available.push((name, spec)),
                _ => tracing::warn!(module = name, "library unavailable"),
            }
        }
        tracing::info!(
            available = available.len(),
            unavailable = catalog.modules().len() - available.len(),
            "module registry built"
        );
        Self { catalog, available }
    }

    pub fn catalog(&self) -> &LibraryCatalog {
        &self.catalog
    }

    /// Available modules in declaration order.
    pub fn available(&self) -> impl Iterator<Item = (&'static str, &'static ModuleSpec)> + '_ {
        self.available.iter().copied()
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.module(name).is_some()
    }

    pub fn module(&self, name: &str) -> Option<&'static ModuleSpec> {
        self.available
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, spec)| *spec)
    }

    /// Every configured library, available or not, in declaration order.
    pub fn descriptors(&self) -> Vec<ModuleDescriptor> {
        self.catalog
            .modules()
            .iter()
            .map(|&name| ModuleDescriptor {
                name: name.to_string(),
                available: self.is_available(name),
                doc_template: self.catalog.doc_template(name).unwrap_or_default().to_string(),
            })
            .collect()
    }
}

impl ImportGate for ModuleRegistry {
    fn import(&self, name: &str) -> EvalResult<&'static ModuleSpec> {
        self.module(name)
            .ok_or_else(|| EvalError::import_denied(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_modules_available() {
        let registry = ModuleRegistry::new(LibraryCatalog::default());
        let names: Vec<_> = registry.available().map(|(name, _)| name).collect();
        assert_eq!(names, ["math", "cmath", "statistics", "random"]);
        assert!(!registry.is_available("numpy"));
    }

    #[test]
    fn test_import_gate() {
        let registry = ModuleRegistry::new(LibraryCatalog::default());
        assert_eq!(registry.import("math").unwrap().name, "math");
        let err = registry.import("os").unwrap_err();
        assert!(err.is_import_denied());
        assert_eq!(err.message, "Module 'os' is not allowed");
        assert!(registry.import("numpy").is_err());
    }

    #[test]
    fn test_disabled_module_is_denied() {
        let registry = ModuleRegistry::new(LibraryCatalog::default().without("math"));
        assert!(registry.import("math").is_err());
        let math = &registry.descriptors()[0];
        assert_eq!(math.name, "math");
        assert!(!math.available);
        assert!(math.doc_template.contains("{name}"));
    }

    #[test]
    fn test_descriptors_keep_declaration_order() {
        let registry = ModuleRegistry::new(LibraryCatalog::default());
        let descriptors = registry.descriptors();
        assert_eq!(descriptors.len(), 10);
        assert_eq!(descriptors[6].name, "numpy");
        assert!(!descriptors[6].available);
    }
}
