use std::io;
use std::path::PathBuf;

/// Errors produced while encoding, decoding or persisting [`KexecOptions`],
/// and while acquiring the images a load request points at.
///
/// [`KexecOptions`]: super::options::KexecOptions
#[derive(Debug, thiserror::Error)]
pub enum KexecOptionsError {
    /// The options could not be encoded. Two booleans always encode, so this
    /// only surfaces if the encoder itself misbehaves.
    #[error("failed to encode kexec options: {0}")]
    Encode(#[source] serde_json::Error),
    /// The input was not a JSON object of the expected shape.
    #[error("failed to decode kexec options: {0}")]
    Decode(#[source] serde_json::Error),
    /// Reading or writing a file failed.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The device-tree-blob source returned an error.
    #[error("failed to read device tree blob: {0}")]
    Dtb(#[source] io::Error),
}

impl KexecOptionsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        KexecOptionsError::Io { path: path.into(), source }
    }
}
