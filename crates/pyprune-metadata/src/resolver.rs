// ABOUTME: Package Metadata Resolver. Issues the single batch query and normalises the answer
// ABOUTME: into PackageMetadata; any service failure degrades to "no information".
use pyprune_core::{canonical_name, split_extras, ManifestGrammar, MetadataMap, PackageMetadata};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::{MetadataService, RawPackageInfo};

pub struct MetadataResolver<'a, S: MetadataService + ?Sized> {
    service: &'a S,
    grammar: &'a ManifestGrammar,
}

impl<'a, S: MetadataService + ?Sized> MetadataResolver<'a, S> {
    pub fn new(service: &'a S, grammar: &'a ManifestGrammar) -> Self {
        Self { service, grammar }
    }

    /// Resolve every manifest name in one query.
    ///
    /// Names the service does not mention get no entry. A failed query
    /// yields an empty map.
    pub fn resolve(&self, names: &[String]) -> MetadataMap {
        if names.is_empty() {
            return MetadataMap::new();
        }

        let raw = match self.service.query(names) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    "Could not fetch metadata automatically ({}). Falling back to name matching.",
                    e
                );
                return MetadataMap::new();
            }
        };

        let mut resolved = MetadataMap::new();
        for name in names {
            match raw.get(name) {
                Some(info) => {
                    let metadata = self.normalize(name, info);
                    debug!(
                        "{}: surface={:?} requires={:?}",
                        name, metadata.import_surface, metadata.direct_requires
                    );
                    resolved.insert(name.clone(), metadata);
                }
                None => debug!("{}: no metadata returned", name),
            }
        }

        info!("Resolved metadata for {}/{} packages", resolved.len(), names.len());
        resolved
    }

    fn normalize(&self, name: &str, info: &RawPackageInfo) -> PackageMetadata {
        let mut import_surface: BTreeSet<String> = info
            .import_names
            .iter()
            .filter_map(|module| sanitize_surface_entry(module))
            .collect();
        if import_surface.is_empty() {
            import_surface = guessed_surface(name);
        }

        let direct_requires = info
            .requires
            .iter()
            .filter_map(|spec| self.grammar.requirement_name(spec))
            .map(|req| canonical_name(&req))
            .collect();

        PackageMetadata {
            import_surface,
            direct_requires,
        }
    }
}

/// Surface used when a distribution cannot be found: the name lower-cased
/// with hyphens as underscores, plus the name itself (extras stripped).
pub fn guessed_surface(manifest_name: &str) -> BTreeSet<String> {
    let (plain, _) = split_extras(manifest_name);
    [plain.to_lowercase().replace('-', "_"), plain.to_string()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect()
}

/// Clean one reported surface entry. Metadata and cache segments, and
/// anything that cannot be a module name, are dropped; `six.py` becomes `six`.
pub fn sanitize_surface_entry(entry: &str) -> Option<String> {
    let entry = entry.trim();
    let entry = entry
        .strip_suffix(".py")
        .or_else(|| entry.strip_suffix(".pyi"))
        .unwrap_or(entry);

    if entry.is_empty()
        || entry.starts_with('.')
        || entry == "__pycache__"
        || entry.ends_with(".dist-info")
        || entry.ends_with(".egg-info")
        || entry.ends_with(".data")
    {
        return None;
    }

    let is_module_path = entry
        .split('.')
        .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_'));
    is_module_path.then(|| entry.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawMetadataMap;
    use pyprune_core::{PruneError, Result};
    use std::cell::Cell;

    fn grammar() -> ManifestGrammar {
        ManifestGrammar::new().unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sanitizes_file_manifest_segments() {
        assert_eq!(sanitize_surface_entry("six.py").as_deref(), Some("six"));
        assert_eq!(sanitize_surface_entry(" yaml ").as_deref(), Some("yaml"));
        assert_eq!(sanitize_surface_entry("google.protobuf").as_deref(), Some("google.protobuf"));
        assert_eq!(sanitize_surface_entry("requests-2.31.0.dist-info"), None);
        assert_eq!(sanitize_surface_entry("foo.egg-info"), None);
        assert_eq!(sanitize_surface_entry("__pycache__"), None);
        assert_eq!(sanitize_surface_entry(".."), None);
        assert_eq!(sanitize_surface_entry("distutils-precedence.pth"), None);
        assert_eq!(sanitize_surface_entry("bin/black"), None);
    }

    #[test]
    fn guess_strips_extras_and_normalises() {
        let guess = guessed_surface("Flask-Login[extra]");
        assert!(guess.contains("flask_login"));
        assert!(guess.contains("Flask-Login"));
        assert_eq!(guess.len(), 2);
    }

    #[test]
    fn normalises_requires_and_keeps_extras_key() {
        let service = |_: &[String]| -> Result<RawMetadataMap> {
            let mut raw = RawMetadataMap::new();
            raw.insert(
                "pydantic[email]".to_string(),
                RawPackageInfo::new(
                    ["pydantic"],
                    [
                        "annotated-types>=0.4.0",
                        "Typing_Extensions>=4.6.1",
                        "email-validator>=2.0.0; extra == \"email\"",
                    ],
                ),
            );
            Ok(raw)
        };
        let g = grammar();
        let map = MetadataResolver::new(&service, &g).resolve(&names(&["pydantic[email]"]));

        let meta = &map["pydantic[email]"];
        assert_eq!(meta.import_surface, BTreeSet::from(["pydantic".to_string()]));
        assert_eq!(
            meta.direct_requires,
            BTreeSet::from([
                "annotated-types".to_string(),
                "email-validator".to_string(),
                "typing-extensions".to_string(),
            ])
        );
    }

    #[test]
    fn empty_surface_falls_back_to_guess() {
        let service = |_: &[String]| -> Result<RawMetadataMap> {
            let mut raw = RawMetadataMap::new();
            raw.insert(
                "python-dateutil".to_string(),
                RawPackageInfo::new(["python_dateutil-2.9.0.dist-info"], Vec::<String>::new()),
            );
            Ok(raw)
        };
        let g = grammar();
        let map = MetadataResolver::new(&service, &g).resolve(&names(&["python-dateutil"]));
        assert!(map["python-dateutil"].import_surface.contains("python_dateutil"));
    }

    #[test]
    fn unmentioned_names_get_no_entry() {
        let service = |_: &[String]| -> Result<RawMetadataMap> { Ok(RawMetadataMap::new()) };
        let g = grammar();
        let map = MetadataResolver::new(&service, &g).resolve(&names(&["six"]));
        assert!(map.is_empty());
    }

    #[test]
    fn service_failure_degrades_to_empty_map() {
        let service = |_: &[String]| -> Result<RawMetadataMap> {
            Err(PruneError::Metadata("interpreter missing".to_string()))
        };
        let g = grammar();
        let map = MetadataResolver::new(&service, &g).resolve(&names(&["requests", "six"]));
        assert!(map.is_empty());
    }

    #[test]
    fn service_is_queried_once_with_the_whole_batch() {
        let calls = Cell::new(0);
        let service = |batch: &[String]| -> Result<RawMetadataMap> {
            calls.set(calls.get() + 1);
            assert_eq!(batch.len(), 3);
            Ok(RawMetadataMap::new())
        };
        let g = grammar();
        MetadataResolver::new(&service, &g).resolve(&names(&["a", "b", "c"]));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn empty_batch_does_not_query() {
        let service = |_: &[String]| -> Result<RawMetadataMap> {
            panic!("no query expected for an empty manifest")
        };
        let g = grammar();
        assert!(MetadataResolver::new(&service, &g).resolve(&[]).is_empty());
    }
}
