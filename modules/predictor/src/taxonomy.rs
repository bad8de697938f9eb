use std::collections::HashMap;
use std::path::Path;

use fleetguard_entity::Platform;

use crate::traits::TaxonomyEntry;

#[derive(Debug, thiserror::Error)]
pub enum TaxonomyLoadError {
    #[error("reading taxonomy file: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing taxonomy file: {0}")]
    Json(#[from] serde_json::Error),
}

/// The read-only, per-platform label taxonomy consulted by Tier 3
/// (`spec.md` §4.3, §5 "Taxonomies (label → description) are read-only
/// after load"). Loaded once at startup; rebuilding requires a restart.
#[derive(Debug, Default)]
pub struct Taxonomy {
    by_platform: HashMap<Platform, Vec<TaxonomyEntry>>,
}

impl Taxonomy {
    pub fn new(by_platform: HashMap<Platform, Vec<TaxonomyEntry>>) -> Self {
        Self { by_platform }
    }

    /// Loads a platform-keyed `label -> description` taxonomy from disk
    /// (`spec.md` §5 "Taxonomies ... read-only after load"). The file is a
    /// JSON object keyed by the platform's kebab-case serde name (e.g.
    /// `"ios-xe"`) mapping to an array of [`TaxonomyEntry`].
    pub fn load_json(path: &Path) -> Result<Self, TaxonomyLoadError> {
        let bytes = std::fs::read(path)?;
        let by_platform: HashMap<Platform, Vec<TaxonomyEntry>> = serde_json::from_slice(&bytes)?;
        Ok(Self::new(by_platform))
    }

    pub fn entries_for(&self, platform: Platform) -> Vec<TaxonomyEntry> {
        self.by_platform.get(&platform).cloned().unwrap_or_default()
    }

    /// `labels` not present in this platform's taxonomy, used by the
    /// offline-package loader (§6.1) to reject unknown labels per-record.
    pub fn unknown_labels<'a>(&self, platform: Platform, labels: &'a [String]) -> Vec<&'a str> {
        let known = self.entries_for(platform);
        labels
            .iter()
            .filter(|label| !known.iter().any(|entry| &entry.label == *label))
            .map(String::as_str)
            .collect()
    }
}
