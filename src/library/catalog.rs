//! The fixed, configured list of libraries and their search metadata.

use std::collections::BTreeSet;

/// One human phrase and the functions it maps to, per library.
#[derive(Debug, Clone)]
pub struct PhraseEntry {
    pub phrase: &'static str,
    pub targets: &'static [(&'static str, &'static [&'static str])],
}

impl PhraseEntry {
    /// Functions this phrase maps to within `library`.
    pub fn targets_for(&self, library: &str) -> &'static [&'static str] {
        self.targets
            .iter()
            .find(|(lib, _)| *lib == library)
            .map(|(_, names)| *names)
            .unwrap_or(&[])
    }
}

const MODULES: &[&str] = &[
    "math",
    "cmath",
    "statistics",
    "random",
    "decimal",
    "fractions",
    "numpy",
    "scipy",
    "sympy",
    "mpmath",
];

const DOC_URL_TEMPLATES: &[(&str, &str)] = &[
    ("math", "https://docs.python.org/3/library/math.html#math.{name}"),
    ("cmath", "https://docs.python.org/3/library/cmath.html#cmath.{name}"),
    (
        "statistics",
        "https://docs.python.org/3/library/statistics.html#statistics.{name}",
    ),
    ("random", "https://docs.python.org/3/library/random.html#random.{name}"),
    ("decimal", "https://docs.python.org/3/library/decimal.html#decimal.{name}"),
    (
        "fractions",
        "https://docs.python.org/3/library/fractions.html#fractions.{name}",
    ),
    (
        "numpy",
        "https://numpy.org/doc/stable/reference/generated/numpy.{name}.html",
    ),
    (
        "scipy",
        "https://docs.scipy.org/doc/scipy/reference/generated/scipy.{name}.html",
    ),
    ("sympy", "https://docs.sympy.org/latest/search.html?q={name}"),
    ("mpmath", "https://mpmath.org/doc/current/search.html?q={name}"),
];

const ALIASES: &[(&str, &str)] = &[("np", "numpy"), ("sp", "sympy")];

const HUMAN_SEARCH_MAP: &[PhraseEntry] = &[
    PhraseEntry {
        phrase: "square root",
        targets: &[
            ("math", &["sqrt"]),
            ("cmath", &["sqrt"]),
            ("numpy", &["sqrt"]),
            ("sympy", &["sqrt"]),
            ("mpmath", &["sqrt"]),
        ],
    },
    PhraseEntry {
        phrase: "square",
        targets: &[("math", &["pow"]), ("numpy", &["square"]), ("sympy", &["Pow"])],
    },
    PhraseEntry {
        phrase: "power",
        targets: &[("math", &["pow"]), ("numpy", &["power"]), ("sympy", &["Pow"])],
    },
    PhraseEntry {
        phrase: "sine",
        targets: &[
            ("math", &["sin"]),
            ("numpy", &["sin"]),
            ("sympy", &["sin"]),
            ("mpmath", &["sin"]),
            ("cmath", &["sin"]),
        ],
    },
    PhraseEntry {
        phrase: "cosine",
        targets: &[
            ("math", &["cos"]),
            ("numpy", &["cos"]),
            ("sympy", &["cos"]),
            ("mpmath", &["cos"]),
            ("cmath", &["cos"]),
        ],
    },
    PhraseEntry {
        phrase: "tangent",
        targets: &[
            ("math", &["tan"]),
            ("numpy", &["tan"]),
            ("sympy", &["tan"]),
            ("mpmath", &["tan"]),
            ("cmath", &["tan"]),
        ],
    },
    PhraseEntry {
        phrase: "arc sine",
        targets: &[
            ("math", &["asin"]),
            ("numpy", &["arcsin"]),
            ("sympy", &["asin"]),
            ("mpmath", &["asin"]),
            ("cmath", &["asin"]),
        ],
    },
    PhraseEntry {
        phrase: "arc cosine",
        targets: &[
            ("math", &["acos"]),
            ("numpy", &["arccos"]),
            ("sympy", &["acos"]),
            ("mpmath", &["acos"]),
            ("cmath", &["acos"]),
        ],
    },
    PhraseEntry {
        phrase: "arc tangent",
        targets: &[
            ("math", &["atan"]),
            ("numpy", &["arctan"]),
            ("sympy", &["atan"]),
            ("mpmath", &["atan"]),
            ("cmath", &["atan"]),
        ],
    },
    PhraseEntry {
        phrase: "log",
        targets: &[
            ("math", &["log"]),
            ("numpy", &["log"]),
            ("sympy", &["log"]),
            ("mpmath", &["log"]),
            ("cmath", &["log"]),
        ],
    },
    PhraseEntry {
        phrase: "natural log",
        targets: &[
            ("math", &["log"]),
            ("numpy", &["log"]),
            ("sympy", &["log"]),
            ("mpmath", &["log"]),
            ("cmath", &["log"]),
        ],
    },
    PhraseEntry {
        phrase: "log base 10",
        targets: &[
            ("math", &["log10"]),
            ("numpy", &["log10"]),
            ("sympy", &["log"]),
            ("mpmath", &["log10"]),
        ],
    },
    PhraseEntry {
        phrase: "exponential",
        targets: &[
            ("math", &["exp"]),
            ("numpy", &["exp"]),
            ("sympy", &["exp"]),
            ("mpmath", &["exp"]),
            ("cmath", &["exp"]),
        ],
    },
    PhraseEntry {
        phrase: "absolute",
        targets: &[
            ("math", &["fabs"]),
            ("numpy", &["abs"]),
            ("sympy", &["Abs"]),
            ("mpmath", &["fabs"]),
            ("cmath", &["fabs"]),
        ],
    },
    PhraseEntry {
        phrase: "factorial",
        targets: &[
            ("math", &["factorial"]),
            ("sympy", &["factorial"]),
            ("mpmath", &["factorial"]),
        ],
    },
    PhraseEntry {
        phrase: "gamma",
        targets: &[
            ("math", &["gamma"]),
            ("scipy", &["special.gamma"]),
            ("sympy", &["gamma"]),
            ("mpmath", &["gamma"]),
        ],
    },
    PhraseEntry {
        phrase: "mean",
        targets: &[
            ("statistics", &["mean"]),
            ("numpy", &["mean"]),
            ("scipy", &["mean"]),
        ],
    },
    PhraseEntry {
        phrase: "median",
        targets: &[
            ("statistics", &["median"]),
            ("numpy", &["median"]),
            ("scipy", &["median"]),
        ],
    },
    PhraseEntry {
        phrase: "variance",
        targets: &[
            ("statistics", &["variance"]),
            ("numpy", &["var"]),
            ("scipy", &["var"]),
        ],
    },
    PhraseEntry {
        phrase: "standard deviation",
        targets: &[
            ("statistics", &["stdev"]),
            ("numpy", &["std"]),
            ("scipy", &["std"]),
        ],
    },
    PhraseEntry {
        phrase: "random number",
        targets: &[
            ("random", &["random"]),
            ("numpy", &["random"]),
            ("scipy", &["random"]),
        ],
    },
    PhraseEntry {
        phrase: "uniform random",
        targets: &[
            ("random", &["uniform"]),
            ("numpy", &["uniform"]),
            ("scipy", &["uniform"]),
        ],
    },
    PhraseEntry {
        phrase: "normal distribution",
        targets: &[
            ("random", &["gauss", "normalvariate"]),
            ("numpy", &["random"]),
            ("scipy", &["stats.norm"]),
        ],
    },
];

/// Which libraries exist, how to link their docs, and how to search them.
///
/// The default catalog lists ten libraries in a fixed order. Only those
/// with a native provider can ever be available; the rest are still listed
/// and searchable so clients can show them as missing.
#[derive(Debug, Clone)]
pub struct LibraryCatalog {
    modules: Vec<&'static str>,
    disabled: BTreeSet<&'static str>,
}

impl Default for LibraryCatalog {
    fn default() -> Self {
        Self {
            modules: MODULES.to_vec(),
            disabled: BTreeSet::new(),
        }
    }
}

impl LibraryCatalog {
    /// Mark a library as unavailable even when a provider exists.
    pub fn without(mut self, name: &str) -> Self {
        if let Some(module) = self.modules.iter().copied().find(|m| *m == name) {
            self.disabled.insert(module);
        }
        self
    }

    /// Configured library names in declaration order.
    pub fn modules(&self) -> &[&'static str] {
        &self.modules
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.contains(name)
    }

    pub fn doc_template(&self, library: &str) -> Option<&'static str> {
        DOC_URL_TEMPLATES
            .iter()
            .find(|(lib, _)| *lib == library)
            .map(|(_, template)| *template)
    }

    /// Doc link for `name` in `library`, or `""` without a template.
    pub fn doc_url(&self, library: &str, name: &str) -> String {
        self.doc_template(library)
            .map(|template| template.replace("{name}", name))
            .unwrap_or_default()
    }

    /// `(alias, library)` pairs.
    pub fn aliases(&self) -> &'static [(&'static str, &'static str)] {
        ALIASES
    }

    pub fn alias_target(&self, alias: &str) -> Option<&'static str> {
        ALIASES
            .iter()
            .find(|(a, _)| *a == alias)
            .map(|(_, lib)| *lib)
    }

    pub fn phrases(&self) -> &'static [PhraseEntry] {
        HUMAN_SEARCH_MAP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let catalog = LibraryCatalog::default();
        assert_eq!(catalog.modules()[0], "math");
        assert_eq!(catalog.modules().len(), 10);
        assert_eq!(catalog.modules()[9], "mpmath");
    }

    #[test]
    fn test_doc_url() {
        let catalog = LibraryCatalog::default();
        assert_eq!(
            catalog.doc_url("numpy", "sqrt"),
            "https://numpy.org/doc/stable/reference/generated/numpy.sqrt.html"
        );
        assert_eq!(catalog.doc_url("unknown", "sqrt"), "");
    }

    #[test]
    fn test_without() {
        let catalog = LibraryCatalog::default().without("random").without("nope");
        assert!(catalog.is_disabled("random"));
        assert!(!catalog.is_disabled("math"));
    }

    #[test]
    fn test_phrase_targets() {
        let entry = &LibraryCatalog::default().phrases()[0];
        assert_eq!(entry.phrase, "square root");
        assert_eq!(entry.targets_for("math"), &["sqrt"]);
        assert!(entry.targets_for("random").is_empty());
    }
}
