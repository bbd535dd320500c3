//! Fixed-capacity ring of interleaved PCM frames.
//!
//! Layout: a 64-byte header (`magic, buffers, idx, channels, bps, bitrate,
//! fps, reserved`) followed by `buffers` slots of
//! `48 + channels * bps/8 * bitrate/fps` bytes.
//!
//! PCM convention: 16-bit samples in a single interleaved row
//! (`l,r,l,r,…`) for up to two channels, one row per channel above that.
//! [`SampleBuf`] hides the difference behind `(channel, sample)` addressing.

use crate::error::RingError;
use crate::layout::{
    self, AUDIO_HEADER_CELLS, AUDIO_RING_MAGIC, AUDIO_SLOT_MAGIC, CELL, SLOT_HEADER_CELLS,
};
use crate::slot::{self, FrameInfo, FrameStamp};
use avbus_shm::{OpenMode, ShareName, SharedRegion};
use std::marker::PhantomData;

/// Dimensions of an audio ring, fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioShape {
    pub buffers: i64,
    pub channels: i64,
    /// Bits per sample: 8 or 16.
    pub bps: i64,
    /// Samples per second per channel.
    pub bitrate: i64,
    /// Slots per second.
    pub fps: i64,
}

/// Options for [`AudioRing::create`].
#[derive(Debug, Clone, Default)]
pub struct AudioOptions {
    pub name: Option<ShareName>,
    pub shape: AudioShape,
    pub mode: Option<OpenMode>,
    pub cleanup: bool,
}

/// How samples are arranged within a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleLayout {
    /// One row, channels interleaved (`l,r,l,r,…`). Used for ≤ 2 channels.
    Interleaved,
    /// One row per channel. Used for > 2 channels.
    Planar,
}

/// A mutable 16-bit sample view over one slot's payload.
///
/// Addressing is `(channel, sample)` regardless of the underlying layout.
/// Like the video view, the bytes are shared with other attachers.
pub struct SampleBuf<'a> {
    base: *mut u8,
    channels: usize,
    samples_per_channel: usize,
    bps: i64,
    _ring: PhantomData<&'a ()>,
}

impl<'a> SampleBuf<'a> {
    pub(crate) fn new(base: *mut u8, channels: usize, samples_per_channel: usize, bps: i64) -> Self {
        SampleBuf {
            base,
            channels,
            samples_per_channel,
            bps,
            _ring: PhantomData,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samples_per_channel(&self) -> usize {
        self.samples_per_channel
    }

    /// Total sample count across channels.
    pub fn len(&self) -> usize {
        self.channels * self.samples_per_channel
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bps(&self) -> i64 {
        self.bps
    }

    pub fn layout(&self) -> SampleLayout {
        if self.channels <= 2 {
            SampleLayout::Interleaved
        } else {
            SampleLayout::Planar
        }
    }

    fn sample_bytes(&self) -> usize {
        (self.bps / 8) as usize
    }

    fn offset(&self, ch: usize, i: usize) -> usize {
        debug_assert!(ch < self.channels && i < self.samples_per_channel);
        let pos = match self.layout() {
            SampleLayout::Interleaved => i * self.channels + ch,
            SampleLayout::Planar => ch * self.samples_per_channel + i,
        };
        pos * self.sample_bytes()
    }

    /// Reads one sample, widened to i16 for 8-bit streams.
    pub fn get(&self, ch: usize, i: usize) -> i16 {
        let off = self.offset(ch, i);
        unsafe {
            if self.bps == 8 {
                (*self.base.add(off)) as i8 as i16
            } else {
                let mut b = [0u8; 2];
                std::ptr::copy_nonoverlapping(self.base.add(off), b.as_mut_ptr(), 2);
                i16::from_le_bytes(b)
            }
        }
    }

    /// Writes one sample, truncated for 8-bit streams.
    pub fn set(&mut self, ch: usize, i: usize, v: i16) {
        let off = self.offset(ch, i);
        unsafe {
            if self.bps == 8 {
                *self.base.add(off) = v as i8 as u8;
            } else {
                let b = v.to_le_bytes();
                std::ptr::copy_nonoverlapping(b.as_ptr(), self.base.add(off), 2);
            }
        }
    }

    /// Mixes `v` into the existing sample at half amplitude each.
    pub fn mix_add(&mut self, ch: usize, i: usize, v: i16) {
        let cur = self.get(ch, i);
        self.set(ch, i, cur / 2 + v / 2);
    }

    /// Zeroes the payload.
    pub fn clear(&mut self) {
        let bytes = self.len() * self.sample_bytes();
        unsafe { std::ptr::write_bytes(self.base, 0, bytes) };
    }
}

/// Handle to a shared audio ring. Same attachment and writer discipline as
/// [`crate::VideoRing`].
pub struct AudioRing {
    region: SharedRegion,
    buffers: i64,
    channels: i64,
    bps: i64,
    bitrate: i64,
    fps: i64,
    packet_size: usize,
}

impl AudioRing {
    /// Creates or attaches the ring; header re-read and magic-checked on any
    /// success, dimensions taken from memory.
    pub fn create(opts: AudioOptions) -> Result<AudioRing, RingError> {
        let mode = opts.mode.unwrap_or(OpenMode::Always);
        let name = opts.name.unwrap_or_else(ShareName::generate);

        let mut size = 0usize;
        if mode != OpenMode::Existing {
            let s = opts.shape;
            if s.buffers <= 0 || s.channels <= 0 || s.bps <= 0 || s.bitrate <= 0 || s.fps <= 0 {
                return Err(RingError::Config(format!(
                    "bufs: {}, channels: {}, bps: {}, bitrate: {}, fps: {}",
                    s.buffers, s.channels, s.bps, s.bitrate, s.fps
                )));
            }
            let frame = frame_size(s.channels, s.bps, s.bitrate, s.fps);
            if frame == 0 {
                return Err(RingError::Config(format!(
                    "invalid audio frame: channels: {}, bps: {}, bitrate: {}, fps: {}",
                    s.channels, s.bps, s.bitrate, s.fps
                )));
            }
            size = header_bytes() + s.buffers as usize * (slot_header_bytes() + frame);
        }

        let region = SharedRegion::create(name, mode, size, opts.cleanup)?;
        let base = region.base();

        if !region.was_existing() {
            let s = opts.shape;
            unsafe {
                layout::store_i64(base, CELL, s.buffers);
                layout::store_i64(base, 2 * CELL, 0);
                layout::store_i64(base, 3 * CELL, s.channels);
                layout::store_i64(base, 4 * CELL, s.bps);
                layout::store_i64(base, 5 * CELL, s.bitrate);
                layout::store_i64(base, 6 * CELL, s.fps);
                layout::store_i64(base, 7 * CELL, 0);
                layout::publish_i64(base, 0, AUDIO_RING_MAGIC);
            }
        }

        let magic = unsafe { layout::acquire_i64(base, 0) };
        if magic != AUDIO_RING_MAGIC {
            return Err(RingError::InvalidHeader {
                found: magic,
                expected: AUDIO_RING_MAGIC,
            });
        }

        let buffers = unsafe { layout::load_i64(base, CELL) };
        let channels = unsafe { layout::load_i64(base, 3 * CELL) };
        let bps = unsafe { layout::load_i64(base, 4 * CELL) };
        let bitrate = unsafe { layout::load_i64(base, 5 * CELL) };
        let fps = unsafe { layout::load_i64(base, 6 * CELL) };
        if buffers <= 0 || channels <= 0 || bps <= 0 || bitrate <= 0 || fps <= 0 {
            return Err(RingError::Config(format!(
                "header bufs: {buffers}, channels: {channels}, bps: {bps}, bitrate: {bitrate}, fps: {fps}"
            )));
        }

        let frame = frame_size(channels, bps, bitrate, fps);
        let packet_size = slot_header_bytes() + frame;
        let expected = header_bytes() + buffers as usize * packet_size;
        if region.len() < expected {
            return Err(RingError::Truncated {
                expected,
                actual: region.len(),
            });
        }

        Ok(AudioRing {
            region,
            buffers,
            channels,
            bps,
            bitrate,
            fps,
            packet_size,
        })
    }

    /// Attaches to an existing ring by name.
    pub fn open(name: impl Into<ShareName>) -> Result<AudioRing, RingError> {
        AudioRing::create(AudioOptions {
            name: Some(name.into()),
            mode: Some(OpenMode::Existing),
            ..Default::default()
        })
    }

    pub fn name(&self) -> &ShareName {
        self.region.name()
    }

    pub fn size(&self) -> usize {
        header_bytes() + self.buffers as usize * self.packet_size
    }

    pub fn mode(&self) -> OpenMode {
        self.region.mode()
    }

    pub fn buffers(&self) -> i64 {
        self.buffers
    }

    pub fn channels(&self) -> i64 {
        self.channels
    }

    pub fn bps(&self) -> i64 {
        self.bps
    }

    pub fn bitrate(&self) -> i64 {
        self.bitrate
    }

    pub fn fps(&self) -> i64 {
        self.fps
    }

    /// PTS increment per slot: samples per channel per frame.
    pub fn pts_inc(&self) -> i64 {
        self.bitrate / self.fps
    }

    pub fn get_idx(&self) -> i64 {
        layout::idx_load(self.idx_cell()).rem_euclid(self.buffers)
    }

    pub fn set_idx(&self, idx: i64) -> i64 {
        let v = idx.rem_euclid(self.buffers);
        layout::idx_store(self.idx_cell(), v);
        v
    }

    /// Signed advance; the clock source only moves forward, but the index
    /// arithmetic supports walking either way.
    pub fn add_idx(&self, add: i64) -> i64 {
        let v = (layout::idx_load(self.idx_cell()) + add).rem_euclid(self.buffers);
        layout::idx_store(self.idx_cell(), v);
        v
    }

    pub fn calc_idx(&self, off: i64) -> i64 {
        layout::wrap_index(layout::idx_load(self.idx_cell()), off, self.buffers)
    }

    pub fn calc_drift(&self, off: i64, reference: Option<i64>) -> i64 {
        let r = reference.unwrap_or_else(|| layout::idx_load(self.idx_cell()));
        layout::drift(off, r, self.buffers)
    }

    pub fn frame_info(&self, n: i64) -> Option<FrameInfo> {
        let n = n.rem_euclid(self.buffers);
        unsafe { slot::read(self.region.base(), self.slot_off(n), AUDIO_SLOT_MAGIC, n) }
    }

    pub fn set_frame_info(&self, n: i64, s: FrameStamp) {
        let n = n.rem_euclid(self.buffers);
        unsafe { slot::stamp(self.region.base(), self.slot_off(n), AUDIO_SLOT_MAGIC, s) }
    }

    /// The slot's PCM payload.
    pub fn samples(&self, n: i64) -> Result<SampleBuf<'_>, RingError> {
        if n < 0 || n >= self.buffers {
            return Err(RingError::BadIndex { index: n });
        }
        let off = self.slot_off(n) + slot_header_bytes();
        let base = unsafe { self.region.base().add(off) };
        Ok(SampleBuf::new(
            base,
            self.channels as usize,
            (self.bitrate / self.fps) as usize,
            self.bps,
        ))
    }

    fn idx_cell(&self) -> &std::sync::atomic::AtomicI64 {
        unsafe { layout::idx_cell(self.region.base()) }
    }

    fn slot_off(&self, n: i64) -> usize {
        header_bytes() + n as usize * self.packet_size
    }
}

fn frame_size(channels: i64, bps: i64, bitrate: i64, fps: i64) -> usize {
    let ch_size = (bps / 8) * (bitrate / fps);
    (channels * ch_size) as usize
}

fn header_bytes() -> usize {
    AUDIO_HEADER_CELLS * CELL
}

fn slot_header_bytes() -> usize {
    SLOT_HEADER_CELLS * CELL
}
