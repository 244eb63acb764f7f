use pyprune_parser::ScanStats;
use serde::Serialize;
use std::path::PathBuf;

/// Why a manifest line survived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepReason {
    Blank,
    Comment,
    Directive,
    AllowListed,
    Protected,
    Imported,
    NameMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "decision", content = "reason")]
pub enum Decision {
    Keep(KeepReason),
    Remove,
}

impl Decision {
    pub fn is_kept(&self) -> bool {
        matches!(self, Decision::Keep(_))
    }
}

/// Outcome for one manifest line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineDecision {
    pub line_index: usize,
    /// Plain package name, `None` for blank, comment and directive lines.
    pub name: Option<String>,
    pub decision: Decision,
}

/// Summary of one pruning run.
#[derive(Debug, Clone, Serialize)]
pub struct PruneReport {
    pub manifest: PathBuf,
    pub decisions: Vec<LineDecision>,
    pub removed: Vec<String>,
    pub protected: Vec<String>,
    pub metadata_entries: usize,
    pub scan: ScanStats,
    pub dry_run: bool,
    /// True when the manifest file was rewritten.
    pub written: bool,
}

impl PruneReport {
    pub fn kept_packages(&self) -> impl Iterator<Item = &str> {
        self.decisions
            .iter()
            .filter(|d| d.decision.is_kept())
            .filter_map(|d| d.name.as_deref())
    }

    pub fn is_clean(&self) -> bool {
        self.removed.is_empty()
    }
}
