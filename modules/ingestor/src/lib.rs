pub mod error;
mod package;
mod record;
mod snapshot;

pub use error::Error;
pub use package::{Manifest, UpdateReport, apply_update_package};
pub use snapshot::apply_snapshot_json;
