use std::fs::{File, read};
use std::io::{Error, ErrorKind};
use std::ops::Deref;
use std::path::Path;
use memmap2::Mmap;
use super::error::KexecOptionsError;
use super::options::{KexecOptions, ReadAt};

const DTB_CHUNK_SIZE: usize = 4096;
/// Largest device tree blob accepted, matching the kernel's own 2 MiB limit.
pub const DTB_MAX_SIZE: usize = 2 * 1024 * 1024;

/// A kernel or initramfs image, either mapped from its file or copied into memory.
#[derive(Debug)]
pub enum KexecImage {
    Mapped(Mmap),
    Buffered(Vec<u8>)
}

impl KexecImage {
    /// Opens the image at `path`.
    ///
    /// # Arguments
    /// * `path` - Image file.
    /// * `map` - Map the file read-only instead of reading it into a buffer.
    ///
    /// # Returns
    /// * `Ok(KexecImage)` - The mapped or buffered image.
    /// * `Err(KexecOptionsError::Io)` - The file could not be opened, mapped or read.
    pub fn open(path: &Path, map: bool) -> Result<Self, KexecOptionsError> {
        if !map {
            return match read(path) {
                Ok(bytes) => Ok(KexecImage::Buffered(bytes)),
                Err(e) => Err(KexecOptionsError::io(path, e))
            };
        }

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => return Err(KexecOptionsError::io(path, e))
        };
        // SAFETY: the mapping is read-only; callers must not truncate the
        // image while a load request still holds it.
        match unsafe { Mmap::map(&file) } {
            Ok(mmap) => Ok(KexecImage::Mapped(mmap)),
            Err(e) => Err(KexecOptionsError::io(path, e))
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, KexecImage::Mapped(_))
    }
}

impl Deref for KexecImage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            KexecImage::Mapped(mmap) => &mmap[..],
            KexecImage::Buffered(bytes) => &bytes[..]
        }
    }
}

/// Reads the whole device tree blob from `src`, starting at offset 0 and
/// stopping at the first empty read.
///
/// Sources that keep returning data past [`DTB_MAX_SIZE`] bytes (a character
/// device, say) are rejected with `KexecOptionsError::Dtb`.
pub fn read_dtb(src: &dyn ReadAt) -> Result<Vec<u8>, KexecOptionsError> {
    let mut blob = Vec::new();
    let mut chunk = [0u8; DTB_CHUNK_SIZE];
    loop {
        match src.read_at(&mut chunk, blob.len() as u64) {
            Ok(0) => break,
            Ok(n) => {
                blob.extend_from_slice(&chunk[..n]);
                if blob.len() > DTB_MAX_SIZE {
                    return Err(KexecOptionsError::Dtb(Error::new(
                        ErrorKind::InvalidData,
                        format!("device tree blob exceeds {} bytes", DTB_MAX_SIZE)
                    )));
                }
            },
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(KexecOptionsError::Dtb(e))
        }
    }
    Ok(blob)
}

/// Everything a kexec load needs from the filesystem, acquired as the
/// [`KexecOptions`] ask for.
///
/// # Fields
/// * `kernel` - The kernel image.
/// * `initramfs` - Optional initramfs image.
/// * `dtb` - Contents of the device tree blob, when the options supplied one.
#[derive(Debug)]
pub struct KexecImages {
    pub kernel: KexecImage,
    pub initramfs: Option<KexecImage>,
    pub dtb: Option<Vec<u8>>
}

impl KexecImages {
    /// Opens the kernel and initramfs and reads the device tree blob.
    ///
    /// `map_kernel` and `map_initramfs` are honored independently of each other.
    pub fn prepare(
        kernel: impl AsRef<Path>,
        initramfs: Option<&Path>,
        opts: &KexecOptions<'_>
    ) -> Result<Self, KexecOptionsError> {
        let kernel_path = kernel.as_ref();
        let kernel = KexecImage::open(kernel_path, opts.map_kernel)?;
        log::debug!(
            "kernel {} ({} bytes, {})",
            kernel_path.display(), kernel.len(), strategy(&kernel)
        );

        let initramfs = match initramfs {
            Some(path) => {
                let image = KexecImage::open(path, opts.map_initramfs)?;
                log::debug!(
                    "initramfs {} ({} bytes, {})",
                    path.display(), image.len(), strategy(&image)
                );
                Some(image)
            },
            None => None
        };

        let dtb = match opts.dtb {
            Some(src) => {
                let blob = read_dtb(src)?;
                log::debug!("device tree blob ({} bytes)", blob.len());
                Some(blob)
            },
            None => None
        };

        Ok(KexecImages {kernel, initramfs, dtb})
    }
}

fn strategy(image: &KexecImage) -> &'static str {
    if image.is_mapped() { "mapped" } else { "buffered" }
}
