// ABOUTME: Pruning Engine. Reads the manifest, resolves metadata, scans the source tree and
// ABOUTME: decides keep/remove for every manifest line, rewriting the file only on removals.
use pyprune_core::{
    ImportedSet, LineKind, Manifest, ManifestEntry, MetadataMap, ProtectedSet, PruneConfig,
    PruneRules, Result,
};
use pyprune_metadata::{guessed_surface, MetadataResolver, MetadataService};
use pyprune_parser::{collect_source_files, SourceScanner};
use std::path::Path;
use tracing::{debug, info};

use crate::{protect, Decision, KeepReason, LineDecision, PruneReport};

/// Keep/remove decisions for a manifest plus its rewritten content.
#[derive(Debug, Clone)]
pub struct PruneOutcome {
    pub decisions: Vec<LineDecision>,
    pub protected: ProtectedSet,
    pub content: String,
}

impl PruneOutcome {
    pub fn removed(&self) -> Vec<String> {
        self.decisions
            .iter()
            .filter(|d| !d.decision.is_kept())
            .filter_map(|d| d.name.clone())
            .collect()
    }
}

/// Decide every manifest line against the imported set.
///
/// Blank, comment, directive and allow-listed lines are always kept. A
/// requirement is otherwise kept when protected, when its import surface
/// (or a surface root) was imported, or, lacking metadata, when its name
/// or normalised guess matches an imported module case-insensitively.
pub fn prune_manifest(
    manifest: &Manifest,
    metadata: &MetadataMap,
    imported: &ImportedSet,
    rules: &PruneRules,
) -> PruneOutcome {
    let protected = protect(manifest.entries(), metadata, imported);

    let decisions: Vec<LineDecision> = manifest
        .lines
        .iter()
        .enumerate()
        .map(|(line_index, line)| {
            let (name, decision) = match &line.kind {
                LineKind::Blank => (None, Decision::Keep(KeepReason::Blank)),
                LineKind::Comment => (None, Decision::Keep(KeepReason::Comment)),
                LineKind::Directive => (None, Decision::Keep(KeepReason::Directive)),
                LineKind::Requirement(entry) => {
                    let decision = if rules.is_allow_listed(&entry.plain_name) {
                        Decision::Keep(KeepReason::AllowListed)
                    } else if protected.contains(&entry.plain_name) {
                        Decision::Keep(KeepReason::Protected)
                    } else {
                        match metadata.get(&entry.name) {
                            Some(meta) if meta.is_used_by(imported) => {
                                Decision::Keep(KeepReason::Imported)
                            }
                            Some(_) => Decision::Remove,
                            None if matches_by_name(entry, imported) => {
                                Decision::Keep(KeepReason::NameMatch)
                            }
                            None => Decision::Remove,
                        }
                    };
                    debug!("{}: {:?}", entry.name, decision);
                    (Some(entry.plain_name.clone()), decision)
                }
            };
            LineDecision {
                line_index,
                name,
                decision,
            }
        })
        .collect();

    let content = manifest.render(|idx| decisions[idx].decision.is_kept());

    PruneOutcome {
        decisions,
        protected,
        content,
    }
}

/// Fallback for entries without metadata: the manifest name, or its
/// normalised guess (`typing-extensions` as `typing_extensions`), compared
/// case-insensitively with the imported names.
fn matches_by_name(entry: &ManifestEntry, imported: &ImportedSet) -> bool {
    imported.contains_ignore_case(&entry.name)
        || guessed_surface(&entry.name)
            .iter()
            .any(|guess| imported.contains_ignore_case(guess))
}

pub struct PruneEngine<'a, S: MetadataService + ?Sized> {
    config: &'a PruneConfig,
    rules: &'a PruneRules,
    service: &'a S,
    dry_run: bool,
}

impl<'a, S: MetadataService + ?Sized> PruneEngine<'a, S> {
    pub fn new(config: &'a PruneConfig, rules: &'a PruneRules, service: &'a S) -> Self {
        Self {
            config,
            rules,
            service,
            dry_run: false,
        }
    }

    /// Report decisions without touching the manifest.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Prune the manifest in `project_dir`.
    ///
    /// A missing or unreadable manifest and a failed rewrite are errors;
    /// metadata and per-file parse failures are not.
    pub fn run(&self, project_dir: &Path) -> Result<PruneReport> {
        let manifest_path = project_dir.join(&self.config.prune.manifest);
        let manifest = Manifest::read(&manifest_path, &self.rules.grammar)?;
        info!(
            "Read {} requirements from {}",
            manifest.entries().count(),
            manifest_path.display()
        );

        let keys = manifest.requirement_keys();
        let metadata = MetadataResolver::new(self.service, &self.rules.grammar).resolve(&keys);

        let project_root = project_dir
            .canonicalize()
            .unwrap_or_else(|_| project_dir.to_path_buf());
        let files = collect_source_files(&project_root, &self.config.scan)?;
        let scan = SourceScanner::new(&project_root, &self.config.scan).scan(&files)?;

        let outcome = prune_manifest(&manifest, &metadata, &scan.imported, self.rules);
        let removed = outcome.removed();

        let written = !removed.is_empty() && !self.dry_run;
        if written {
            std::fs::write(&manifest_path, &outcome.content)?;
            info!("Rewrote {} ({} removed)", manifest_path.display(), removed.len());
        }

        Ok(PruneReport {
            manifest: manifest_path,
            decisions: outcome.decisions,
            removed,
            protected: outcome.protected.iter().map(str::to_string).collect(),
            metadata_entries: metadata.len(),
            scan: scan.stats,
            dry_run: self.dry_run,
            written,
        })
    }
}
