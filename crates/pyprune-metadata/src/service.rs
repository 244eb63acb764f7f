use pyprune_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What the metadata service reports for one manifest name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPackageInfo {
    #[serde(default)]
    pub import_names: Vec<String>,
    /// Requirement specifiers as declared by the distribution.
    #[serde(default)]
    pub requires: Vec<String>,
}

impl RawPackageInfo {
    pub fn new<I, R>(import_names: I, requires: R) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            import_names: import_names.into_iter().map(Into::into).collect(),
            requires: requires.into_iter().map(Into::into).collect(),
        }
    }
}

/// Response keyed by the manifest name exactly as requested.
pub type RawMetadataMap = HashMap<String, RawPackageInfo>;

/// Capability that maps a batch of manifest names to distribution metadata.
///
/// Called once per run with every name. Implementations report failure
/// through `Err`; the resolver decides how to degrade.
pub trait MetadataService {
    fn query(&self, names: &[String]) -> Result<RawMetadataMap>;
}

impl<F> MetadataService for F
where
    F: Fn(&[String]) -> Result<RawMetadataMap>,
{
    fn query(&self, names: &[String]) -> Result<RawMetadataMap> {
        self(names)
    }
}

/// Service used when metadata lookup is disabled: knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataService for NoMetadata {
    fn query(&self, _names: &[String]) -> Result<RawMetadataMap> {
        Ok(RawMetadataMap::new())
    }
}
