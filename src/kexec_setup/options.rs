use std::fmt;
use std::fs::{read, write};
use std::io;
use std::path::Path;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use super::error::KexecOptionsError;

/// Random-access byte source, read at an explicit offset without moving any
/// cursor.
///
/// Used for the device-tree-blob so the same source can be shared by several
/// readers. A read returning `Ok(0)` marks the end of the data.
pub trait ReadAt: fmt::Debug + Sync {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

#[cfg(unix)]
impl ReadAt for std::fs::File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }
}

impl ReadAt for [u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let start = match usize::try_from(offset) {
            Ok(s) if s < self.len() => s,
            _ => return Ok(0)
        };
        let count = buf.len().min(self.len() - start);
        buf[..count].copy_from_slice(&self[start..start + count]);
        Ok(count)
    }
}

impl ReadAt for &[u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

impl<const N: usize> ReadAt for [u8; N] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.as_slice().read_at(buf, offset)
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.as_slice().read_at(buf, offset)
    }
}

/// Options handed to a kexec-style kernel load.
///
/// Each architecture's loader looks only at the options it understands, and
/// treats both mapping flags as hints it may ignore.
///
/// Mapping an image makes its virtual pages point straight at the page cache.
/// If the image lives in tmpfs it is already cached; if it lives on disk the
/// kernel only allocates page frames as bytes are touched, so the disk I/O
/// happens at load time instead of up front.
///
/// # Fields
/// * `dtb` - Device tree blob to hand to the new kernel, if any. Borrowed from
///           the caller, who stays responsible for closing it.
/// * `map_kernel` - Map the kernel image instead of reading it into a buffer.
/// * `map_initramfs` - Map the initramfs image instead of reading it into a buffer.
///
/// # Serialization
/// Only the two flags are persisted, as `map-kernel` and `map-initramfs`.
/// `dtb` is a live handle and is always `None` after decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct KexecOptions<'a> {
    pub dtb: Option<&'a dyn ReadAt>,
    pub map_kernel: bool,
    pub map_initramfs: bool
}

/// Persisted subset of [`KexecOptions`].
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(default)]
struct KexecOptionsWire {
    #[serde(rename = "map-kernel")]
    map_kernel: bool,
    #[serde(rename = "map-initramfs")]
    map_initramfs: bool
}

impl From<&KexecOptions<'_>> for KexecOptionsWire {
    fn from(opts: &KexecOptions<'_>) -> Self {
        // TODO: persist the dtb too, e.g. by copying it to a tmpfs file and
        // recording the path.
        KexecOptionsWire {
            map_kernel: opts.map_kernel,
            map_initramfs: opts.map_initramfs
        }
    }
}

impl From<KexecOptionsWire> for KexecOptions<'_> {
    fn from(wire: KexecOptionsWire) -> Self {
        KexecOptions {
            dtb: None,
            map_kernel: wire.map_kernel,
            map_initramfs: wire.map_initramfs
        }
    }
}

impl Serialize for KexecOptions<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        KexecOptionsWire::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KexecOptions<'_> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        KexecOptionsWire::deserialize(deserializer).map(KexecOptions::from)
    }
}

impl<'a> KexecOptions<'a> {
    /// Options with no device tree and both images read into buffers.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dtb(mut self, dtb: &'a dyn ReadAt) -> Self {
        self.dtb = Some(dtb);
        self
    }

    pub fn with_map_kernel(mut self, map_kernel: bool) -> Self {
        self.map_kernel = map_kernel;
        self
    }

    pub fn with_map_initramfs(mut self, map_initramfs: bool) -> Self {
        self.map_initramfs = map_initramfs;
        self
    }

    pub fn has_dtb(&self) -> bool {
        self.dtb.is_some()
    }

    /// Encodes the options as a JSON object holding the two mapping flags.
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - `{"map-kernel":..,"map-initramfs":..}`.
    /// * `Err(KexecOptionsError::Encode)` - Not expected for this shape.
    pub fn to_json(&self) -> Result<Vec<u8>, KexecOptionsError> {
        serde_json::to_vec(&KexecOptionsWire::from(self)).map_err(KexecOptionsError::Encode)
    }

    /// Decodes options previously produced by [`KexecOptions::to_json`].
    ///
    /// Missing flags default to `false` and unknown fields are ignored. The
    /// result never carries a device tree blob.
    ///
    /// # Arguments
    /// * `bytes` - JSON text.
    ///
    /// # Returns
    /// * `Ok(KexecOptions)` - Flags populated, `dtb` set to `None`.
    /// * `Err(KexecOptionsError::Decode)` - Malformed JSON or a field of the wrong type.
    pub fn from_json(bytes: &[u8]) -> Result<KexecOptions<'static>, KexecOptionsError> {
        match serde_json::from_slice::<KexecOptionsWire>(bytes) {
            Ok(wire) => Ok(KexecOptions::from(wire)),
            Err(e) => Err(KexecOptionsError::Decode(e))
        }
    }

    /// Writes the JSON form of the options to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), KexecOptionsError> {
        let path = path.as_ref();
        if self.has_dtb() {
            log::warn!("device tree blob is not persisted to {}", path.display());
        }
        let bytes = self.to_json()?;
        write(path, bytes).map_err(|e| KexecOptionsError::io(path, e))?;
        log::debug!("saved kexec options to {}", path.display());
        Ok(())
    }

    /// Reads options written by [`KexecOptions::save`].
    ///
    /// # Returns
    /// * `Ok(KexecOptions)` - Decoded options without a device tree blob.
    /// * `Err(KexecOptionsError::Io)` - The file could not be read.
    /// * `Err(KexecOptionsError::Decode)` - The file contents are not valid options.
    pub fn load(path: impl AsRef<Path>) -> Result<KexecOptions<'static>, KexecOptionsError> {
        let path = path.as_ref();
        let bytes = read(path).map_err(|e| KexecOptionsError::io(path, e))?;
        let opts = KexecOptions::from_json(&bytes)?;
        log::debug!(
            "loaded kexec options from {}: map_kernel={} map_initramfs={}",
            path.display(), opts.map_kernel, opts.map_initramfs
        );
        Ok(opts)
    }
}
