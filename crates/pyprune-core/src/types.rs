use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::manifest::canonical_name;

/// Shape of an import statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// `import a.b.c [as d]`
    Direct,
    /// `from a.b import x [as y]`
    From,
}

/// One imported module path as it appears in a source file.
///
/// Aliases never appear here: `import numpy as np` yields `numpy`, and
/// `from a import b as c` records `b` in `names`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportItem {
    pub kind: ImportKind,
    pub module_path: String,
    pub names: Vec<String>,
}

impl ImportItem {
    pub fn direct(module_path: impl Into<String>) -> Self {
        Self {
            kind: ImportKind::Direct,
            module_path: module_path.into(),
            names: Vec::new(),
        }
    }

    pub fn from_import(module_path: impl Into<String>, names: Vec<String>) -> Self {
        Self {
            kind: ImportKind::From,
            module_path: module_path.into(),
            names,
        }
    }

    /// First dot-separated segment of the module path.
    pub fn root(&self) -> &str {
        root_module(&self.module_path)
    }
}

/// First dot-separated segment of a dotted module path.
pub fn root_module(module_path: &str) -> &str {
    module_path.split('.').next().unwrap_or(module_path)
}

/// Import surface and direct requirements of one manifest entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub import_surface: BTreeSet<String>,
    /// Canonical (lower-cased, PEP 503) names of declared requirements.
    pub direct_requires: BTreeSet<String>,
}

impl PackageMetadata {
    /// True when any surface module, or its root, was imported.
    pub fn is_used_by(&self, imported: &ImportedSet) -> bool {
        self.import_surface
            .iter()
            .any(|module| imported.contains(module) || imported.contains(root_module(module)))
    }
}

/// Metadata keyed by manifest requirement key (extras suffix included).
pub type MetadataMap = HashMap<String, PackageMetadata>;

/// External module names observed across the scanned source tree.
///
/// Holds both the literal dotted path and its root for each import. The set
/// is built once by the scanner and only read afterwards, so there is no
/// way to insert into it after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportedSet {
    names: HashSet<String>,
}

impl ImportedSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn contains_ignore_case(&self, name: &str) -> bool {
        self.contains(name) || self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Sorted copy, for stable reporting.
    pub fn sorted(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.iter().cloned().collect();
        names.sort();
        names
    }
}

/// Canonical package names retained because a directly-used package
/// requires them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProtectedSet {
    names: BTreeSet<String>,
}

impl ProtectedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str) -> bool {
        self.names.insert(canonical_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&canonical_name(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_first_segment() {
        assert_eq!(root_module("google.cloud.storage"), "google");
        assert_eq!(root_module("requests"), "requests");
        assert_eq!(ImportItem::direct("a.b").root(), "a");
    }

    #[test]
    fn surface_matches_on_root_form() {
        let imported = ImportedSet::from_names(["yaml", "google"]);
        let mut meta = PackageMetadata::default();
        meta.import_surface.insert("google.protobuf".to_string());
        assert!(meta.is_used_by(&imported));

        let mut unused = PackageMetadata::default();
        unused.import_surface.insert("six".to_string());
        assert!(!unused.is_used_by(&imported));
    }

    #[test]
    fn imported_set_case_insensitive_lookup() {
        let imported = ImportedSet::from_names(["PyYAML"]);
        assert!(!imported.contains("pyyaml"));
        assert!(imported.contains_ignore_case("pyyaml"));
    }

    #[test]
    fn protected_set_uses_canonical_names() {
        let mut protected = ProtectedSet::new();
        protected.insert("Email_Validator");
        assert!(protected.contains("email-validator"));
        assert!(protected.contains("email.validator"));
        assert_eq!(protected.len(), 1);
    }
}
