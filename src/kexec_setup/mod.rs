pub mod error;
pub mod images;
pub mod options;

pub use error::KexecOptionsError;
pub use images::{KexecImage, KexecImages};
pub use options::{KexecOptions, ReadAt};
