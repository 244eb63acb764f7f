// ABOUTME: Dependency Protector. Packages required by a directly-used package are retained.
// ABOUTME: A single hop over the requires graph.
use pyprune_core::{ImportedSet, ManifestEntry, MetadataMap, ProtectedSet};
use tracing::debug;

/// Collect the direct requirements of every manifest entry whose import
/// surface was imported.
///
/// Requirements of the protected packages themselves are not followed.
pub fn protect<'e, I>(entries: I, metadata: &MetadataMap, imported: &ImportedSet) -> ProtectedSet
where
    I: IntoIterator<Item = &'e ManifestEntry>,
{
    let mut protected = ProtectedSet::new();

    for entry in entries {
        let Some(meta) = metadata.get(&entry.name) else {
            continue;
        };
        if !meta.is_used_by(imported) {
            continue;
        }
        for requirement in &meta.direct_requires {
            if protected.insert(requirement) {
                debug!("{} protects {}", entry.plain_name, requirement);
            }
        }
    }

    protected
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyprune_core::{Manifest, ManifestGrammar, PackageMetadata};

    fn meta(surface: &[&str], requires: &[&str]) -> PackageMetadata {
        PackageMetadata {
            import_surface: surface.iter().map(|s| s.to_string()).collect(),
            direct_requires: requires.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn manifest(content: &str) -> Manifest {
        Manifest::parse(content, &ManifestGrammar::new().unwrap())
    }

    #[test]
    fn used_package_protects_its_requirements() {
        let manifest = manifest("pydantic[email]==2.0\nemail-validator==2.0\n");
        let mut metadata = MetadataMap::new();
        metadata.insert(
            "pydantic[email]".to_string(),
            meta(&["pydantic"], &["email-validator", "typing-extensions"]),
        );
        metadata.insert("email-validator".to_string(), meta(&["email_validator"], &["dnspython"]));

        let imported = ImportedSet::from_names(["pydantic"]);
        let protected = protect(manifest.entries(), &metadata, &imported);

        assert!(protected.contains("email-validator"));
        assert!(protected.contains("typing_extensions"));
        // one hop only: email-validator is protected but not used
        assert!(!protected.contains("dnspython"));
    }

    #[test]
    fn unused_package_protects_nothing() {
        let manifest = manifest("flask==3.0\n");
        let mut metadata = MetadataMap::new();
        metadata.insert("flask".to_string(), meta(&["flask"], &["werkzeug", "jinja2"]));

        let protected = protect(manifest.entries(), &metadata, &ImportedSet::from_names(["django"]));
        assert!(protected.is_empty());
    }

    #[test]
    fn root_form_counts_as_use() {
        let manifest = manifest("protobuf\n");
        let mut metadata = MetadataMap::new();
        metadata.insert("protobuf".to_string(), meta(&["google.protobuf"], &["six"]));

        let protected = protect(manifest.entries(), &metadata, &ImportedSet::from_names(["google"]));
        assert!(protected.contains("six"));
    }

    #[test]
    fn entries_without_metadata_are_ignored() {
        let manifest = manifest("requests\n");
        let protected = protect(
            manifest.entries(),
            &MetadataMap::new(),
            &ImportedSet::from_names(["requests"]),
        );
        assert!(protected.is_empty());
    }
}
