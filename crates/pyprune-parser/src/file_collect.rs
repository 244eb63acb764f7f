use ignore::{overrides::OverrideBuilder, WalkBuilder};
use pyprune_core::{PruneError, Result, ScanConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::LanguageRegistry;

/// Collect Python source files below `dir`.
///
/// Honours `.gitignore` and the configured exclude globs, and keeps only
/// files whose extension is registered as Python source.
pub fn collect_source_files(dir: &Path, config: &ScanConfig) -> Result<Vec<PathBuf>> {
    info!("Collecting source files from: {:?}", dir);

    let mut ovr = OverrideBuilder::new(dir);
    for exclude in &config.exclude_patterns {
        let pattern = if exclude.starts_with('!') {
            exclude.clone()
        } else {
            format!("!{}", exclude)
        };
        if let Err(e) = ovr.add(&pattern) {
            warn!("Ignoring invalid exclude pattern {}: {}", exclude, e);
            continue;
        }
        debug!("Added exclude pattern: {}", exclude);
    }

    let overrides = ovr
        .build()
        .map_err(|e| PruneError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    let walker = WalkBuilder::new(dir)
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .ignore(true)
        .require_git(false)
        .overrides(overrides)
        .build();

    let registry = LanguageRegistry::new(&config.source_extensions);
    let mut paths = Vec::new();

    for dent in walker {
        let dent = match dent {
            Ok(d) => d,
            Err(e) => {
                warn!("Walker error: {}", e);
                continue;
            }
        };

        let path = dent.path();
        if path.is_file() && registry.is_source_file(path) {
            paths.push(path.to_path_buf());
        }
    }

    paths.sort();
    info!("File collection complete: {} source files", paths.len());
    Ok(paths)
}
