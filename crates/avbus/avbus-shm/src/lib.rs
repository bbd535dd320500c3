//! Named shared-memory regions for the avbus rings.
//!
//! A [`SharedRegion`] pairs a file in the POSIX shared-memory namespace
//! (`/dev/shm` where available) with a read-write mapping of it. The region
//! survives the exit of individual attachers; only an explicit unlink (or the
//! `cleanup` flag on the handle that requested it) removes the OS object.
//!
//! Names are plain strings. The raw file primitives are used directly; there
//! is no supervisory tracker that could unlink a region behind our back.

use memmap2::MmapMut;
use rand::Rng;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// How [`SharedRegion::create`] treats a preexisting name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Attach if the name exists, otherwise create it.
    Always,
    /// Attach only; fail if the name does not exist.
    Existing,
    /// Unlink any preexisting name, then create fresh.
    New,
}

#[derive(Debug, thiserror::Error)]
pub enum ShmError {
    #[error("share does not exist: {name}")]
    NotFound { name: String },

    #[error("invalid region size: {size}")]
    InvalidSize { size: usize },

    #[error("failed to open share '{name}'")]
    Open {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to map share '{name}'")]
    Map {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to unlink share '{name}'")]
    Unlink {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Alphabet used for generated share names.
const NAME_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const NAME_LEN: usize = 32;

/// A share name in the local shared-memory namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShareName(String);

impl ShareName {
    /// Generates a random 32-character name (uppercase letters and digits).
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let s = (0..NAME_LEN)
            .map(|_| NAME_CHARS[rng.gen_range(0..NAME_CHARS.len())] as char)
            .collect();
        ShareName(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShareName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShareName {
    fn from(s: &str) -> Self {
        ShareName(s.to_string())
    }
}

impl From<String> for ShareName {
    fn from(s: String) -> Self {
        ShareName(s)
    }
}

/// Directory backing the shared-memory namespace.
///
/// `/dev/shm` is the POSIX shm mount on Linux; elsewhere the system temp
/// directory stands in (same visibility, slower backing).
pub fn shm_dir() -> PathBuf {
    let dev_shm = Path::new("/dev/shm");
    if dev_shm.is_dir() {
        dev_shm.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}

fn share_path(name: &ShareName) -> PathBuf {
    shm_dir().join(name.as_str())
}

/// Removes a share by name. Returns `Ok(true)` if something was unlinked,
/// `Ok(false)` if the name did not exist.
pub fn unlink_named(name: &str) -> io::Result<bool> {
    match std::fs::remove_file(shm_dir().join(name)) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// An exclusively-owned read-write mapping of a named shared region.
///
/// The handle is `Send` but deliberately not `Sync`: one attacher per handle,
/// one handle per thread. Multiple processes coordinate through the mapped
/// bytes, not through this struct.
pub struct SharedRegion {
    /// File handle kept alive to maintain the mapping's validity.
    _file: File,
    mmap: MmapMut,
    base: *mut u8,
    len: usize,
    name: ShareName,
    path: PathBuf,
    mode: OpenMode,
    existing: bool,
    cleanup: bool,
}

// The raw base pointer aliases the mmap the struct owns; moving the struct to
// another thread moves both together.
unsafe impl Send for SharedRegion {}

impl SharedRegion {
    /// Creates or attaches the named region per `mode`.
    ///
    /// `size` is only consulted when a fresh region is created; an attach
    /// always maps the file at its on-disk size, so observers never trust a
    /// caller-supplied size hint.
    pub fn create(
        name: ShareName,
        mode: OpenMode,
        size: usize,
        cleanup: bool,
    ) -> Result<SharedRegion, ShmError> {
        let path = share_path(&name);

        let mut file = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(f) => Some(f),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(ShmError::Open {
                    name: name.to_string(),
                    source: e,
                });
            }
        };
        let mut existing = file.is_some();

        // Kill the existing share if the caller wants a fresh one.
        if existing && mode == OpenMode::New {
            drop(file.take());
            std::fs::remove_file(&path).map_err(|e| ShmError::Unlink {
                name: name.to_string(),
                source: e,
            })?;
            existing = false;
        }

        let file = match file {
            Some(f) => f,
            None => {
                if mode == OpenMode::Existing {
                    return Err(ShmError::NotFound {
                        name: name.to_string(),
                    });
                }
                if size == 0 {
                    return Err(ShmError::InvalidSize { size });
                }
                let f = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .map_err(|e| ShmError::Open {
                        name: name.to_string(),
                        source: e,
                    })?;
                f.set_len(size as u64).map_err(|e| ShmError::Open {
                    name: name.to_string(),
                    source: e,
                })?;
                f
            }
        };

        let len = file
            .metadata()
            .map_err(|e| ShmError::Open {
                name: name.to_string(),
                source: e,
            })?
            .len() as usize;

        let mut mmap = unsafe {
            MmapMut::map_mut(&file).map_err(|e| ShmError::Map {
                name: name.to_string(),
                source: e,
            })?
        };
        let base = mmap.as_mut_ptr();

        Ok(SharedRegion {
            _file: file,
            mmap,
            base,
            len,
            name,
            path,
            mode,
            existing,
            cleanup,
        })
    }

    pub fn name(&self) -> &ShareName {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// True if the region already existed when this handle attached.
    pub fn was_existing(&self) -> bool {
        self.existing
    }

    pub fn cleanup(&self) -> bool {
        self.cleanup
    }

    pub fn set_cleanup(&mut self, cleanup: bool) {
        self.cleanup = cleanup;
    }

    /// Raw pointer to the start of the mapped region.
    ///
    /// The mapping is shared and read-write; callers coordinate slot
    /// ownership by protocol, not by borrow.
    #[inline]
    pub fn base(&self) -> *mut u8 {
        self.base
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        if self.cleanup {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
