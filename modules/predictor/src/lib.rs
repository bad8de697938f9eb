pub mod error;
pub mod example_index;
pub mod prediction;
mod predictor;
pub mod taxonomy;
pub mod traits;

pub use error::Error;
pub use predictor::{LabelPredictor, PredictRequest};
pub use prediction::{ConfidenceSource, LabelPrediction, PredictionSource, RetrievedExample};
