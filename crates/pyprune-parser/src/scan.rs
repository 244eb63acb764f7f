// ABOUTME: Walks the collected source files, extracts imports and builds the ImportedSet.
// ABOUTME: Files are independent, so they can be parsed on a rayon pool into a shared DashSet.
use dashmap::DashSet;
use pyprune_core::{ImportItem, ImportedSet, Result, ScanConfig};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

use crate::{extract_source_imports, LanguageRegistry, ModuleClassifier};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub imports_found: usize,
    pub external_imports: usize,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub imported: ImportedSet,
    pub stats: ScanStats,
}

/// Accumulates imported names while files are being scanned.
///
/// Only reachable through `SourceScanner`; `freeze` turns it into the
/// read-only `ImportedSet`.
#[derive(Default)]
struct ImportedSetBuilder {
    names: DashSet<String>,
    files_scanned: AtomicUsize,
    files_skipped: AtomicUsize,
    imports_found: AtomicUsize,
    external_imports: AtomicUsize,
}

impl ImportedSetBuilder {
    fn record(&self, classifier: &ModuleClassifier, items: &[ImportItem]) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
        self.imports_found.fetch_add(items.len(), Ordering::Relaxed);
        for item in items {
            if let Some(names) = classifier.external_names(item) {
                self.external_imports.fetch_add(1, Ordering::Relaxed);
                for name in names {
                    if !self.names.contains(name) {
                        self.names.insert(name.to_string());
                    }
                }
            }
        }
    }

    fn skip(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn freeze(self) -> ScanOutcome {
        let stats = ScanStats {
            files_scanned: self.files_scanned.into_inner(),
            files_skipped: self.files_skipped.into_inner(),
            imports_found: self.imports_found.into_inner(),
            external_imports: self.external_imports.into_inner(),
        };
        ScanOutcome {
            imported: ImportedSet::from_names(self.names),
            stats,
        }
    }
}

pub struct SourceScanner {
    registry: LanguageRegistry,
    classifier: ModuleClassifier,
    parallel: bool,
    threads: usize,
}

impl SourceScanner {
    pub fn new(project_root: &Path, config: &ScanConfig) -> Self {
        Self {
            registry: LanguageRegistry::new(&config.source_extensions),
            classifier: ModuleClassifier::new(project_root, &config.source_extensions),
            parallel: config.parallel,
            threads: config.threads,
        }
    }

    /// Parse every file and collect external module names.
    ///
    /// Unreadable or malformed files are logged and skipped.
    pub fn scan(&self, files: &[PathBuf]) -> Result<ScanOutcome> {
        let builder = ImportedSetBuilder::default();

        if self.parallel && files.len() > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.threads.max(1))
                .build()
            {
                Ok(pool) => pool.install(|| {
                    files.par_iter().for_each_init(
                        || self.registry.create_parser(),
                        |parser, path| match parser {
                            Ok(parser) => self.scan_file(parser, path, &builder),
                            Err(e) => {
                                warn!("No parser for {}: {}", path.display(), e);
                                builder.skip();
                            }
                        },
                    )
                }),
                Err(e) => {
                    warn!("Falling back to sequential scan: {}", e);
                    self.scan_sequential(files, &builder)?;
                }
            }
        } else {
            self.scan_sequential(files, &builder)?;
        }

        let outcome = builder.freeze();
        info!(
            "Scanned {} files ({} skipped), {} external module names",
            outcome.stats.files_scanned,
            outcome.stats.files_skipped,
            outcome.imported.len()
        );
        Ok(outcome)
    }

    fn scan_sequential(&self, files: &[PathBuf], builder: &ImportedSetBuilder) -> Result<()> {
        let mut parser = self.registry.create_parser()?;
        for path in files {
            self.scan_file(&mut parser, path, builder);
        }
        Ok(())
    }

    fn scan_file(&self, parser: &mut tree_sitter::Parser, path: &Path, builder: &ImportedSetBuilder) {
        let source = match std::fs::read(path) {
            Ok(source) => source,
            Err(e) => {
                warn!("Skipping unreadable file {}: {}", path.display(), e);
                builder.skip();
                return;
            }
        };

        match extract_source_imports(parser, &source) {
            Ok(items) => {
                debug!("{}: {} imports", path.display(), items.len());
                builder.record(&self.classifier, &items);
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                builder.skip();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config(parallel: bool) -> ScanConfig {
        ScanConfig {
            parallel,
            threads: 2,
            ..ScanConfig::default()
        }
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app")).unwrap();
        fs::write(root.join("app/__init__.py"), "").unwrap();
        fs::write(
            root.join("app/views.py"),
            "import requests\nfrom google.cloud import storage\nfrom . import models\nimport app.models\n",
        )
        .unwrap();
        fs::write(root.join("app/models.py"), "import sqlalchemy as sa\n").unwrap();
        fs::write(root.join("broken.py"), "import six\ndef oops(:\n").unwrap();
        dir
    }

    fn scan(dir: &Path, parallel: bool) -> ScanOutcome {
        let files = vec![
            dir.join("app/__init__.py"),
            dir.join("app/views.py"),
            dir.join("app/models.py"),
            dir.join("broken.py"),
            dir.join("missing.py"),
        ];
        SourceScanner::new(dir, &config(parallel)).scan(&files).unwrap()
    }

    #[test]
    fn builds_literal_and_root_names_for_external_imports() {
        let dir = project();
        let outcome = scan(dir.path(), false);

        assert_eq!(
            outcome.imported.sorted(),
            vec!["google", "google.cloud", "requests", "sqlalchemy"]
        );
        assert_eq!(outcome.stats.files_scanned, 3);
        assert_eq!(outcome.stats.files_skipped, 2);
        assert_eq!(outcome.stats.imports_found, 5);
        assert_eq!(outcome.stats.external_imports, 3);
    }

    #[test]
    fn parallel_scan_matches_sequential_scan() {
        let dir = project();
        let sequential = scan(dir.path(), false);
        let parallel = scan(dir.path(), true);
        assert_eq!(sequential.imported, parallel.imported);
        assert_eq!(sequential.stats, parallel.stats);
    }
}
