/// Errors a caller of `LabelPredictor::predict` can act on directly. Tier-2
/// and Tier-3 collaborator failures are deliberately absorbed into a
/// degraded [`crate::prediction::LabelPrediction`] rather than surfaced here
/// (`spec.md` §4.3, "never a fatal error surfaced to the caller").
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] fleetguard_module_store::Error),
}
