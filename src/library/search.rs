//! Ranked function-name search and natural-language phrase matching.

use serde::Serialize;

use crate::library::index::{FunctionDescriptor, FunctionIndex};
use crate::library::registry::ModuleRegistry;

/// Most matches returned per library.
pub const MAX_MATCHES: usize = 15;

/// Search response: the normalized term and one bundle per configured library.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<LibraryMatches>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryMatches {
    pub library: String,
    pub available: bool,
    pub doc_url: String,
    pub matches: Vec<FunctionDescriptor>,
    pub match_count: usize,
    pub library_match: bool,
    pub human_matches: Vec<String>,
    pub human_terms: Vec<String>,
}

/// Searches the index of every configured library.
pub struct SearchMatcher<'a> {
    registry: &'a ModuleRegistry,
    index: &'a FunctionIndex,
}

impl<'a> SearchMatcher<'a> {
    pub fn new(registry: &'a ModuleRegistry, index: &'a FunctionIndex) -> Self {
        Self { registry, index }
    }

    /// Run a search for `raw`, optionally dotted like `np.sqrt`.
    pub fn search(&self, raw: &str) -> SearchResponse {
        let raw = raw.trim();
        let term = query_term(raw);
        tracing::debug!(raw, term, "function search");

        let catalog = self.registry.catalog();
        let results = catalog
            .modules()
            .iter()
            .map(|&library| {
                let mut bundle = LibraryMatches {
                    library: library.to_string(),
                    available: self.registry.is_available(library),
                    doc_url: catalog.doc_url(library, term),
                    matches: Vec::new(),
                    match_count: 0,
                    library_match: false,
                    human_matches: Vec::new(),
                    human_terms: Vec::new(),
                };
                if !term.is_empty() {
                    let lower = term.to_lowercase();
                    bundle.library_match = lower_matches_library(&lower, library, self.registry);
                    bundle.matches = rank(self.index, library, &lower)
                        .into_iter()
                        .map(|name| self.index.describe(library, name))
                        .collect();
                    bundle.match_count = bundle.matches.len();
                    let (matches, terms) = human_matches(self.registry, raw, library);
                    bundle.human_matches = matches;
                    bundle.human_terms = terms;
                }
                bundle
            })
            .collect();

        SearchResponse {
            query: term.to_string(),
            results,
        }
    }
}

/// The function-name part of a raw query: its last dot-separated segment.
pub fn query_term(raw: &str) -> &str {
    raw.rsplit('.').next().unwrap_or(raw)
}

fn lower_matches_library(lower: &str, library: &str, registry: &ModuleRegistry) -> bool {
    library.to_lowercase().contains(lower)
        || registry.catalog().alias_target(lower) == Some(library)
}

/// Exact, then prefix, then substring matches, capped at [`MAX_MATCHES`].
fn rank<'i>(index: &'i FunctionIndex, library: &str, lower: &str) -> Vec<&'i str> {
    let names = index.names(library);
    let mut exact = Vec::new();
    let mut prefix = Vec::new();
    let mut contains = Vec::new();
    for name in names {
        let folded = name.to_lowercase();
        if folded == lower {
            exact.push(name);
        } else if folded.starts_with(lower) {
            prefix.push(name);
        } else if folded.contains(lower) {
            contains.push(name);
        }
    }
    exact
        .into_iter()
        .chain(prefix)
        .chain(contains)
        .take(MAX_MATCHES)
        .collect()
}

/// Phrases found in the raw query and the functions they map to in `library`.
pub fn human_matches(
    registry: &ModuleRegistry,
    raw: &str,
    library: &str,
) -> (Vec<String>, Vec<String>) {
    let lower = raw.to_lowercase();
    let mut matches: Vec<String> = Vec::new();
    let mut terms = Vec::new();
    for entry in registry.catalog().phrases() {
        if !lower.contains(entry.phrase) {
            continue;
        }
        terms.push(entry.phrase.to_string());
        for name in entry.targets_for(library) {
            if !matches.iter().any(|m| m == name) {
                matches.push(name.to_string());
            }
        }
    }
    (matches, terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::catalog::LibraryCatalog;

    fn fixtures() -> (ModuleRegistry, FunctionIndex) {
        let registry = ModuleRegistry::new(LibraryCatalog::default());
        let index = FunctionIndex::build(&registry);
        (registry, index)
    }

    fn bundle<'r>(response: &'r SearchResponse, library: &str) -> &'r LibraryMatches {
        response
            .results
            .iter()
            .find(|r| r.library == library)
            .unwrap()
    }

    #[test]
    fn test_query_term() {
        assert_eq!(query_term("np.linalg.norm"), "norm");
        assert_eq!(query_term("sqrt"), "sqrt");
        assert_eq!(query_term("math."), "");
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let (registry, index) = fixtures();
        let response = SearchMatcher::new(&registry, &index).search("sqrt");
        let math = bundle(&response, "math");
        let names: Vec<_> = math.matches.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["sqrt", "isqrt"]);
        assert_eq!(math.match_count, 2);
        assert_eq!(math.matches[0].signature, "sqrt(x, /)");
    }

    #[test]
    fn test_prefix_before_substring() {
        let (registry, index) = fixtures();
        let response = SearchMatcher::new(&registry, &index).search("SIN");
        let names: Vec<_> = bundle(&response, "math")
            .matches
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, ["sin", "sinh", "asin", "asinh", "isinf"]);
    }

    #[test]
    fn test_match_cap() {
        let (registry, index) = fixtures();
        let response = SearchMatcher::new(&registry, &index).search("a");
        assert!(response
            .results
            .iter()
            .all(|r| r.matches.len() <= MAX_MATCHES));
        assert_eq!(bundle(&response, "math").match_count, MAX_MATCHES);
    }

    #[test]
    fn test_results_cover_every_library_in_order() {
        let (registry, index) = fixtures();
        let response = SearchMatcher::new(&registry, &index).search("sqrt");
        let libraries: Vec<_> = response.results.iter().map(|r| r.library.as_str()).collect();
        assert_eq!(libraries[0], "math");
        assert_eq!(libraries.len(), 10);
        let numpy = bundle(&response, "numpy");
        assert!(!numpy.available);
        assert!(numpy.matches.is_empty());
        assert_eq!(
            numpy.doc_url,
            "https://numpy.org/doc/stable/reference/generated/numpy.sqrt.html"
        );
    }

    #[test]
    fn test_dotted_query_and_alias() {
        let (registry, index) = fixtures();
        let response = SearchMatcher::new(&registry, &index).search("  math.floor ");
        assert_eq!(response.query, "floor");

        let response = SearchMatcher::new(&registry, &index).search("np");
        assert!(bundle(&response, "numpy").library_match);
        assert!(!bundle(&response, "sympy").library_match);

        let response = SearchMatcher::new(&registry, &index).search("math");
        assert!(bundle(&response, "math").library_match);
        assert!(bundle(&response, "cmath").library_match);
    }

    #[test]
    fn test_human_phrase_matches() {
        let (registry, index) = fixtures();
        let response = SearchMatcher::new(&registry, &index).search("square root");
        let math = bundle(&response, "math");
        assert!(math.matches.is_empty());
        assert_eq!(math.human_terms, ["square root", "square"]);
        assert_eq!(math.human_matches, ["sqrt", "pow"]);

        let stats = bundle(&response, "statistics");
        assert!(stats.human_matches.is_empty());
        assert_eq!(stats.human_terms, ["square root", "square"]);
    }

    #[test]
    fn test_human_matches_deduplicate() {
        let (registry, _) = fixtures();
        let (matches, terms) = human_matches(&registry, "natural log", "math");
        assert_eq!(terms, ["log", "natural log"]);
        assert_eq!(matches, ["log"]);
    }

    #[test]
    fn test_empty_query() {
        let (registry, index) = fixtures();
        let response = SearchMatcher::new(&registry, &index).search("   ");
        assert_eq!(response.query, "");
        let math = bundle(&response, "math");
        assert!(math.matches.is_empty());
        assert!(!math.library_match);
        assert!(math.human_terms.is_empty());
        assert_eq!(math.doc_url, "https://docs.python.org/3/library/math.html#math.");
    }
}
