//! Single-producer/single-consumer variable-length text queue.
//!
//! The region is a linear byte buffer of wraparound records:
//!
//! ```text
//! [u32 magic = 0x148219F8][i32 len]payload…
//! ```
//!
//! `len` counts the whole record including its 8 header bytes. A `len` of 0
//! is the sentinel terminating the written region; -1 marks a wrap, telling
//! the consumer to restart at offset 0. The producer writes the payload and
//! the trailing sentinel before the record's own header, so the consumer
//! never races past a record into undefined bytes.
//!
//! Correctness relies on the one-writer/one-reader contract; the write and
//! read cursors live in the handle, not in shared memory.

use crate::error::MsgError;
use crate::layout::{self, MSG_MAGIC};
use avbus_shm::{OpenMode, ShareName, SharedRegion};

/// Record header bytes (magic + length).
const OV: usize = 8;

/// Default region size: 64 KiB.
pub const DEFAULT_MSG_SIZE: usize = 64 * 1024;

/// Options for [`MsgRing::create`].
#[derive(Debug, Clone, Default)]
pub struct MsgOptions {
    pub name: Option<ShareName>,
    pub mode: Option<OpenMode>,
    /// Region size for fresh creation; 0 means [`DEFAULT_MSG_SIZE`].
    pub size: usize,
    pub cleanup: bool,
}

/// Handle to a shared message ring. A process holds the producer end or the
/// consumer end, never both sides of the same conversation.
pub struct MsgRing {
    region: SharedRegion,
    size: usize,
    write: usize,
    read: usize,
}

impl MsgRing {
    pub fn create(opts: MsgOptions) -> Result<MsgRing, MsgError> {
        let mode = opts.mode.unwrap_or(OpenMode::Always);
        let name = opts.name.unwrap_or_else(ShareName::generate);
        let size = if opts.size == 0 {
            DEFAULT_MSG_SIZE
        } else {
            opts.size
        };

        let region = SharedRegion::create(name, mode, size, opts.cleanup)?;
        let size = region.len();

        let ring = MsgRing {
            region,
            size,
            write: 0,
            read: 0,
        };
        if !ring.region.was_existing() {
            ring.set_header(0, 0);
        }
        Ok(ring)
    }

    pub fn name(&self) -> &ShareName {
        self.region.name()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn mode(&self) -> OpenMode {
        self.region.mode()
    }

    /// Appends one message.
    ///
    /// Empty messages are rejected, as are messages whose framed size would
    /// exceed half the region; the latter guarantees the wrap marker always
    /// fits ahead of the read cursor.
    pub fn send(&mut self, msg: &str) -> Result<(), MsgError> {
        let pkt = msg.as_bytes();
        if pkt.is_empty() {
            return Err(MsgError::Empty);
        }

        let ov = OV + pkt.len();
        if self.size / 2 <= ov + OV {
            return Err(MsgError::TooLong { len: pkt.len() });
        }

        // Not enough room for this record plus a trailing sentinel: mark the
        // wrap and restart at the front.
        if self.size <= self.write + ov + OV {
            self.set_header(0, 0);
            self.set_header(self.write, -1);
            self.write = 0;
        }

        let base = self.region.base();
        unsafe {
            std::ptr::copy_nonoverlapping(pkt.as_ptr(), base.add(self.write + OV), pkt.len());
        }

        // Trailing sentinel first, then this record's header; a consumer that
        // sees the header will always find a terminated region behind it.
        self.set_header(self.write + ov, 0);
        self.set_header(self.write, ov as i32);
        self.write += ov;

        Ok(())
    }

    /// Pops the next message, or `Ok(None)` when the queue is drained.
    ///
    /// Corruption (bad magic, nonsense length) resets the read cursor to the
    /// front of the region and surfaces as an error for this call.
    pub fn read(&mut self) -> Result<Option<String>, MsgError> {
        if self.read + OV >= self.size {
            self.read = 0;
        }

        let base = self.region.base();
        let len = loop {
            let magic = unsafe { layout::acquire_i32(base, self.read) } as u32;
            if magic != MSG_MAGIC {
                self.read = 0;
                return Err(MsgError::BadMagic { found: magic });
            }

            let len = unsafe { layout::load_i32(base, self.read + 4) };
            if len == 0 {
                return Ok(None);
            }
            if len == -1 {
                self.read = 0;
                continue;
            }
            if len <= OV as i32 || self.read + len as usize > self.size {
                self.read = 0;
                return Err(MsgError::BadLength { len });
            }
            break len as usize;
        };

        let mut buf = vec![0u8; len - OV];
        unsafe {
            std::ptr::copy_nonoverlapping(base.add(self.read + OV), buf.as_mut_ptr(), buf.len());
        }
        self.read += len;

        Ok(Some(String::from_utf8(buf)?))
    }

    fn set_header(&self, off: usize, len: i32) {
        let base = self.region.base();
        unsafe {
            layout::store_i32(base, off + 4, len);
            layout::publish_i32(base, off, MSG_MAGIC as i32);
        }
    }
}
