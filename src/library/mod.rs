//! Library registration, indexing and search.
//!
//! The registry and index are built once per process and shared read-only
//! by every request.

pub mod catalog;
pub mod index;
pub mod native;
pub mod registry;
pub mod search;

use std::sync::{Arc, LazyLock};

pub use catalog::LibraryCatalog;
pub use index::{FunctionDescriptor, FunctionIndex, ModuleDescriptor};
pub use registry::ModuleRegistry;
pub use search::{LibraryMatches, SearchMatcher, SearchResponse};

/// Registry and index built together from one catalog.
#[derive(Debug)]
pub struct Library {
    pub registry: ModuleRegistry,
    pub index: FunctionIndex,
}

impl Library {
    pub fn new(catalog: LibraryCatalog) -> Self {
        let registry = ModuleRegistry::new(catalog);
        let index = FunctionIndex::build(&registry);
        Self { registry, index }
    }

    pub fn matcher(&self) -> SearchMatcher<'_> {
        SearchMatcher::new(&self.registry, &self.index)
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new(LibraryCatalog::default())
    }
}

/// Process-wide library state over the default catalog.
static GLOBAL_LIBRARY: LazyLock<Arc<Library>> = LazyLock::new(|| Arc::new(Library::default()));

/// Get the process-wide library state.
///
/// Built on first use and never mutated afterwards.
pub fn global_library() -> Arc<Library> {
    Arc::clone(&GLOBAL_LIBRARY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_library_is_shared() {
        assert!(Arc::ptr_eq(&global_library(), &global_library()));
        assert!(global_library().registry.is_available("math"));
    }
}
