//! Language label resolution.
//!
//! Callers send human-friendly labels ("Python", "C++", "typescript"); the
//! execution backend expects its own runtime identifiers. Lookup is
//! case-insensitive. Labels missing from the table are forwarded unchanged so
//! a backend that knows more languages than the table still works, and the
//! `known` flag on the result tells callers which case they hit.

use std::collections::BTreeMap;
use std::sync::Arc;

/// Built-in label → runtime identifier pairs.
pub const DEFAULT_LANGUAGE_MAP: &[(&str, &str)] = &[
    ("python", "python3"),
    ("java", "java"),
    ("cpp", "cpp17"),
    ("c++", "cpp17"),
    ("javascript", "nodejs"),
    ("typescript", "nodejs"),
];

/// Outcome of resolving a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLanguage {
    /// Identifier to send to the backend.
    pub runtime: String,
    /// Whether the label was found in the mapping table.
    pub known: bool,
}

#[derive(Debug, Clone)]
pub struct LanguageResolver {
    mapping: Arc<BTreeMap<String, String>>,
}

impl Default for LanguageResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageResolver {
    pub fn new() -> Self {
        Self::with_overrides(std::iter::empty::<(String, String)>())
    }

    /// Builds the table from the built-in pairs, then applies `overrides` on
    /// top. Override labels are lower-cased.
    pub fn with_overrides<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut mapping: BTreeMap<String, String> = DEFAULT_LANGUAGE_MAP
            .iter()
            .map(|(label, runtime)| (label.to_string(), runtime.to_string()))
            .collect();

        for (label, runtime) in overrides {
            mapping.insert(normalize_label(label.as_ref()), runtime.into());
        }

        Self {
            mapping: Arc::new(mapping),
        }
    }

    pub fn resolve(&self, language: &str) -> ResolvedLanguage {
        match self.mapping.get(&normalize_label(language)) {
            Some(runtime) => ResolvedLanguage {
                runtime: runtime.clone(),
                known: true,
            },
            None => ResolvedLanguage {
                runtime: language.to_string(),
                known: false,
            },
        }
    }

    pub fn is_known(&self, language: &str) -> bool {
        self.mapping.contains_key(&normalize_label(language))
    }

    /// All (label, runtime) pairs, sorted by label.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mapping
            .iter()
            .map(|(label, runtime)| (label.as_str(), runtime.as_str()))
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}
