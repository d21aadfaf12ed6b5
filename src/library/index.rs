//! Function metadata index over the available libraries.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::interp::native::{ModuleSpec, NativeFunction};
use crate::library::registry::ModuleRegistry;

/// Longest description kept per function.
pub const MAX_DESCRIPTION_LEN: usize = 150;

/// Metadata for one configured library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    pub name: String,
    pub available: bool,
    /// Documentation URL template with a `{name}` placeholder; empty if absent.
    pub doc_template: String,
}

/// Metadata for one indexed callable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDescriptor {
    #[serde(skip)]
    pub module: String,
    pub name: String,
    pub signature: String,
    #[serde(rename = "doc")]
    pub description: String,
}

impl FunctionDescriptor {
    fn from_native(module: &str, function: &NativeFunction) -> Self {
        Self {
            module: module.to_string(),
            name: function.name.to_string(),
            signature: function.signature(),
            description: short_description(function.doc),
        }
    }

    /// Descriptor for a name that was never indexed.
    pub fn bare(module: &str, name: &str) -> Self {
        Self {
            module: module.to_string(),
            name: name.to_string(),
            signature: name.to_string(),
            description: String::new(),
        }
    }
}

/// First documentation line, trimmed and cut to [`MAX_DESCRIPTION_LEN`] chars.
pub fn short_description(doc: &str) -> String {
    doc.lines()
        .next()
        .map(str::trim)
        .unwrap_or_default()
        .chars()
        .take(MAX_DESCRIPTION_LEN)
        .collect()
}

/// Per-module callable names plus their signatures and descriptions.
///
/// Built once from the registry's available modules and never mutated.
/// Names are kept sorted so search tiers come out in a stable order.
#[derive(Debug, Default)]
pub struct FunctionIndex {
    modules: BTreeMap<String, BTreeMap<String, FunctionDescriptor>>,
}

impl FunctionIndex {
    pub fn build(registry: &ModuleRegistry) -> Self {
        let mut modules = BTreeMap::new();
        for (name, spec) in registry.available() {
            modules.insert(name.to_string(), index_module(spec));
        }
        let functions: usize = modules.values().map(BTreeMap::len).sum();
        tracing::info!(
            modules = modules.len(),
            functions,
            "function index built"
        );
        Self { modules }
    }

    /// Sorted callable names of `module`; empty when it is not indexed.
    pub fn names(&self, module: &str) -> BTreeSet<&str> {
        self.modules
            .get(module)
            .map(|functions| functions.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, module: &str, name: &str) -> Option<&FunctionDescriptor> {
        self.modules.get(module)?.get(name)
    }

    /// Metadata for `name`, falling back to the bare name with no description.
    pub fn describe(&self, module: &str, name: &str) -> FunctionDescriptor {
        self.get(module, name)
            .cloned()
            .unwrap_or_else(|| FunctionDescriptor::bare(module, name))
    }

    pub fn function_count(&self, module: &str) -> usize {
        self.modules.get(module).map_or(0, BTreeMap::len)
    }
}

fn index_module(spec: &ModuleSpec) -> BTreeMap<String, FunctionDescriptor> {
    spec.functions
        .iter()
        .map(|function| {
            (
                function.name.to_string(),
                FunctionDescriptor::from_native(spec.name, function),
            )
        })
        .collect()
}
