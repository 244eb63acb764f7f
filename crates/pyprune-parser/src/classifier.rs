// ABOUTME: Module Classifier. Decides whether an import refers to project code or to an
// ABOUTME: installed package, and yields the names an external import contributes.
use pyprune_core::{root_module, ImportItem};
use std::path::PathBuf;

use crate::RELATIVE_SENTINEL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleClass {
    Local,
    External,
}

#[derive(Debug, Clone)]
pub struct ModuleClassifier {
    project_root: PathBuf,
    source_extensions: Vec<String>,
}

impl ModuleClassifier {
    pub fn new<I, S>(project_root: impl Into<PathBuf>, source_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            project_root: project_root.into(),
            source_extensions: source_extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_string())
                .collect(),
        }
    }

    /// Local when relative, or when `<root>/a/b/c.<ext>` or
    /// `<root>/a/b/c/__init__.<ext>` exists for module `a.b.c`.
    pub fn classify(&self, module_path: &str) -> ModuleClass {
        if module_path.starts_with(RELATIVE_SENTINEL) {
            return ModuleClass::Local;
        }

        let mut base = self.project_root.clone();
        for segment in module_path.split('.') {
            base.push(segment);
        }

        let is_local = self.source_extensions.iter().any(|ext| {
            base.with_extension(ext).is_file() || base.join(format!("__init__.{ext}")).is_file()
        });

        if is_local {
            ModuleClass::Local
        } else {
            ModuleClass::External
        }
    }

    pub fn is_local(&self, module_path: &str) -> bool {
        self.classify(module_path) == ModuleClass::Local
    }

    /// Names an import adds to the imported set: the literal dotted path and
    /// its root when external, nothing when local.
    pub fn external_names<'i>(&self, item: &'i ImportItem) -> Option<[&'i str; 2]> {
        let module_path = item.module_path.as_str();
        if module_path.is_empty() || self.is_local(module_path) {
            return None;
        }
        Some([module_path, root_module(module_path)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app/services")).unwrap();
        fs::write(dir.path().join("app/__init__.py"), "").unwrap();
        fs::write(dir.path().join("app/services/billing.py"), "").unwrap();
        fs::write(dir.path().join("settings.py"), "").unwrap();
        dir
    }

    #[test]
    fn relative_imports_are_local() {
        let dir = project();
        let classifier = ModuleClassifier::new(dir.path(), ["py"]);
        assert!(classifier.is_local("."));
        assert!(classifier.is_local("..models"));
    }

    #[test]
    fn project_modules_and_packages_are_local() {
        let dir = project();
        let classifier = ModuleClassifier::new(dir.path(), ["py"]);
        assert!(classifier.is_local("settings"));
        assert!(classifier.is_local("app"));
        assert!(classifier.is_local("app.services.billing"));
    }

    #[test]
    fn everything_else_is_external() {
        let dir = project();
        let classifier = ModuleClassifier::new(dir.path(), ["py"]);
        assert_eq!(classifier.classify("requests"), ModuleClass::External);
        // a directory without __init__ is not a local package
        assert_eq!(classifier.classify("app.services"), ModuleClass::External);
        assert_eq!(classifier.classify("app.missing"), ModuleClass::External);
    }

    #[test]
    fn extension_list_is_respected() {
        let dir = project();
        fs::write(dir.path().join("typed.pyi"), "").unwrap();
        assert!(!ModuleClassifier::new(dir.path(), ["py"]).is_local("typed"));
        assert!(ModuleClassifier::new(dir.path(), ["py", "pyi"]).is_local("typed"));
    }

    #[test]
    fn external_import_contributes_literal_and_root() {
        let dir = project();
        let classifier = ModuleClassifier::new(dir.path(), ["py"]);

        let item = ImportItem::direct("google.cloud.storage");
        assert_eq!(
            classifier.external_names(&item),
            Some(["google.cloud.storage", "google"])
        );

        let local = ImportItem::from_import("app.services.billing", vec!["charge".to_string()]);
        assert_eq!(classifier.external_names(&local), None);
    }
}
