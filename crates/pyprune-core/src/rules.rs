use std::collections::HashSet;

use crate::{ManifestGrammar, PruneConfig, Result};

/// Development tooling that is never imported by application code but must
/// stay in the manifest.
pub const DEFAULT_ALLOW_LIST: &[&str] = &[
    "pytest",
    "black",
    "flake8",
    "mypy",
    "pylint",
    "ipython",
    "gunicorn",
    "uvicorn",
    "wheel",
    "setuptools",
    "pip",
    "tox",
];

/// Immutable lookup tables for one pruning run.
#[derive(Debug, Clone)]
pub struct PruneRules {
    allow_list: HashSet<String>,
    pub grammar: ManifestGrammar,
}

impl PruneRules {
    pub fn new<I, S>(extra_keep: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allow_list = DEFAULT_ALLOW_LIST
            .iter()
            .map(|name| name.to_string())
            .chain(
                extra_keep
                    .into_iter()
                    .map(|name| name.as_ref().trim().to_lowercase())
                    .filter(|name| !name.is_empty()),
            )
            .collect();

        Ok(Self {
            allow_list,
            grammar: ManifestGrammar::new()?,
        })
    }

    pub fn from_config(config: &PruneConfig) -> Result<Self> {
        Self::new(&config.prune.keep)
    }

    /// Case-insensitive allow-list check on a plain package name.
    pub fn is_allow_listed(&self, name: &str) -> bool {
        self.allow_list.contains(&name.trim().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tooling_is_allow_listed() {
        let rules = PruneRules::new(Vec::<String>::new()).unwrap();
        assert!(rules.is_allow_listed("pytest"));
        assert!(rules.is_allow_listed("Black"));
        assert!(!rules.is_allow_listed("requests"));
    }

    #[test]
    fn extra_keep_entries_extend_the_list() {
        let rules = PruneRules::new([" Pre-Commit ", ""]).unwrap();
        assert!(rules.is_allow_listed("pre-commit"));
        assert!(rules.is_allow_listed("tox"));
    }
}
