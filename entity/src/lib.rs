pub mod device;
pub mod enums;
pub mod label_index;
pub mod scan_result;
pub mod version_index;
pub mod vulnerability;

pub use enums::*;
