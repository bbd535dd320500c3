//! Fixed-capacity ring of uncompressed RGB24 frames.
//!
//! Layout: a 48-byte header (`magic, buffers, idx, width, height, fps`)
//! followed by `buffers` contiguous slots of `48 + width*height*3` bytes.
//! The header is written once by the creator; after that only the `idx` cell
//! changes, and only through the single authorized writer.

use crate::error::RingError;
use crate::layout::{
    self, CELL, SLOT_HEADER_CELLS, VIDEO_HEADER_CELLS, VIDEO_RING_MAGIC, VIDEO_SLOT_MAGIC,
};
use crate::slot::{self, FrameInfo, FrameStamp};
use avbus_shm::{OpenMode, ShareName, SharedRegion};
use std::marker::PhantomData;

/// An axis-aligned pixel rectangle, used for ROI views and partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, w: usize, h: usize) -> Self {
        Rect { x, y, w, h }
    }

    pub fn area(&self) -> usize {
        self.w * self.h
    }
}

/// Dimensions of a video ring, fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoShape {
    pub buffers: i64,
    pub width: i64,
    pub height: i64,
    pub fps: i64,
}

/// Options for [`VideoRing::create`].
#[derive(Debug, Clone, Default)]
pub struct VideoOptions {
    /// Share name; a random name is generated when absent.
    pub name: Option<ShareName>,
    /// Shape for fresh creation; ignored when attaching.
    pub shape: VideoShape,
    pub mode: Option<OpenMode>,
    /// Unlink the share when this handle drops.
    pub cleanup: bool,
}

/// A mutable RGB24 view over one slot's pixels, possibly restricted to a
/// sub-rectangle of the frame.
///
/// The view is backed by shared memory: other attachers may write the same
/// bytes concurrently. Slot ownership is coordinated by the ring protocol
/// (bias/window), not by the borrow checker.
pub struct FrameBuf<'a> {
    base: *mut u8,
    stride: usize,
    width: usize,
    height: usize,
    _ring: PhantomData<&'a ()>,
}

impl<'a> FrameBuf<'a> {
    pub(crate) fn new(base: *mut u8, stride: usize, width: usize, height: usize) -> Self {
        FrameBuf {
            base,
            stride,
            width,
            height,
            _ring: PhantomData,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// True when the rows are back to back (no ROI narrowing).
    pub fn is_contiguous(&self) -> bool {
        self.stride == self.width * 3
    }

    /// All pixel bytes as one slice; only available for contiguous views.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.is_contiguous()
            .then(|| unsafe { std::slice::from_raw_parts(self.base, self.height * self.stride) })
    }

    pub fn row(&self, y: usize) -> &[u8] {
        assert!(y < self.height, "row {y} out of {}", self.height);
        unsafe { std::slice::from_raw_parts(self.base.add(y * self.stride), self.width * 3) }
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        assert!(y < self.height, "row {y} out of {}", self.height);
        unsafe { std::slice::from_raw_parts_mut(self.base.add(y * self.stride), self.width * 3) }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let r = self.row(y);
        Some([r[x * 3], r[x * 3 + 1], r[x * 3 + 2]])
    }

    /// Writes one pixel; coordinates outside the view are ignored so shape
    /// rasterizers can overdraw edges safely.
    pub fn set_pixel(&mut self, x: usize, y: usize, col: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let r = self.row_mut(y);
        r[x * 3..x * 3 + 3].copy_from_slice(&col);
    }

    /// Fills `[x1, x2)` on row `y`, clamped to the view.
    pub fn fill_span(&mut self, y: usize, x1: usize, x2: usize, col: [u8; 3]) {
        if y >= self.height {
            return;
        }
        let x2 = x2.min(self.width);
        if x1 >= x2 {
            return;
        }
        let r = self.row_mut(y);
        for px in r[x1 * 3..x2 * 3].chunks_exact_mut(3) {
            px.copy_from_slice(&col);
        }
    }

    pub fn fill(&mut self, col: [u8; 3]) {
        for y in 0..self.height {
            self.fill_span(y, 0, self.width, col);
        }
    }

    /// Zeroes the view.
    pub fn clear(&mut self) {
        for y in 0..self.height {
            self.row_mut(y).fill(0);
        }
    }

    /// A sub-rectangle view sharing the same backing pixels.
    pub fn view(&mut self, roi: Rect) -> Result<FrameBuf<'a>, RingError> {
        if roi.w == 0
            || roi.h == 0
            || roi.x + roi.w > self.width
            || roi.y + roi.h > self.height
        {
            return Err(RingError::BadRoi {
                x: roi.x,
                y: roi.y,
                w: roi.w,
                h: roi.h,
                width: self.width,
                height: self.height,
            });
        }
        let base = unsafe { self.base.add(roi.y * self.stride + roi.x * 3) };
        Ok(FrameBuf::new(base, self.stride, roi.w, roi.h))
    }
}

/// Handle to a shared video ring.
///
/// `Send` but not `Sync`: one handle per thread, any number of handles per
/// region across processes. Writer discipline (who advances `idx`, who
/// stamps which slots) is a protocol obligation on the attachers.
pub struct VideoRing {
    region: SharedRegion,
    buffers: i64,
    width: i64,
    height: i64,
    fps: i64,
    packet_size: usize,
}

impl VideoRing {
    /// Creates or attaches the ring per `opts.mode` (default: attach if
    /// present, else create).
    ///
    /// On success the header is always re-read from shared memory and its
    /// magic verified; the authoritative dimensions come from the mapping,
    /// never from the caller.
    pub fn create(opts: VideoOptions) -> Result<VideoRing, RingError> {
        let mode = opts.mode.unwrap_or(OpenMode::Always);
        let name = opts.name.unwrap_or_else(ShareName::generate);

        let mut size = 0usize;
        if mode != OpenMode::Existing {
            let s = opts.shape;
            if s.buffers <= 0 || s.width <= 0 || s.height <= 0 || s.fps <= 0 {
                return Err(RingError::Config(format!(
                    "bufs: {}, width: {}, height: {}, fps: {}",
                    s.buffers, s.width, s.height, s.fps
                )));
            }
            let frame = (s.width * s.height * 3) as usize;
            size = header_bytes() + s.buffers as usize * (slot_header_bytes() + frame);
        }

        let region = SharedRegion::create(name, mode, size, opts.cleanup)?;
        let base = region.base();

        if !region.was_existing() {
            let s = opts.shape;
            unsafe {
                layout::store_i64(base, CELL, s.buffers);
                layout::store_i64(base, 2 * CELL, 0);
                layout::store_i64(base, 3 * CELL, s.width);
                layout::store_i64(base, 4 * CELL, s.height);
                layout::store_i64(base, 5 * CELL, s.fps);
                layout::publish_i64(base, 0, VIDEO_RING_MAGIC);
            }
        }

        let magic = unsafe { layout::acquire_i64(base, 0) };
        if magic != VIDEO_RING_MAGIC {
            return Err(RingError::InvalidHeader {
                found: magic,
                expected: VIDEO_RING_MAGIC,
            });
        }

        let buffers = unsafe { layout::load_i64(base, CELL) };
        let width = unsafe { layout::load_i64(base, 3 * CELL) };
        let height = unsafe { layout::load_i64(base, 4 * CELL) };
        let fps = unsafe { layout::load_i64(base, 5 * CELL) };
        if buffers <= 0 || width <= 0 || height <= 0 {
            return Err(RingError::Config(format!(
                "header bufs: {buffers}, width: {width}, height: {height}"
            )));
        }

        let frame_size = (width * height * 3) as usize;
        let packet_size = slot_header_bytes() + frame_size;
        let expected = header_bytes() + buffers as usize * packet_size;
        if region.len() < expected {
            return Err(RingError::Truncated {
                expected,
                actual: region.len(),
            });
        }

        Ok(VideoRing {
            region,
            buffers,
            width,
            height,
            fps,
            packet_size,
        })
    }

    /// Attaches to an existing ring by name.
    pub fn open(name: impl Into<ShareName>) -> Result<VideoRing, RingError> {
        VideoRing::create(VideoOptions {
            name: Some(name.into()),
            mode: Some(OpenMode::Existing),
            ..Default::default()
        })
    }

    pub fn name(&self) -> &ShareName {
        self.region.name()
    }

    /// Total region size in bytes, as implied by the header.
    pub fn size(&self) -> usize {
        header_bytes() + self.buffers as usize * self.packet_size
    }

    pub fn mode(&self) -> OpenMode {
        self.region.mode()
    }

    pub fn buffers(&self) -> i64 {
        self.buffers
    }

    pub fn width(&self) -> i64 {
        self.width
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn fps(&self) -> i64 {
        self.fps
    }

    /// PTS increment per frame.
    pub fn pts_inc(&self) -> i64 {
        1
    }

    /// Current writer index, in `0..buffers`.
    pub fn get_idx(&self) -> i64 {
        layout::idx_load(self.idx_cell()).rem_euclid(self.buffers)
    }

    /// Writer only: stores `idx`, normalized mod `buffers`.
    pub fn set_idx(&self, idx: i64) -> i64 {
        let v = idx.rem_euclid(self.buffers);
        layout::idx_store(self.idx_cell(), v);
        v
    }

    /// Writer only: advances `idx` by `add` (signed), normalized.
    pub fn add_idx(&self, add: i64) -> i64 {
        let v = (layout::idx_load(self.idx_cell()) + add).rem_euclid(self.buffers);
        layout::idx_store(self.idx_cell(), v);
        v
    }

    /// The slot `off` positions ahead of the writer's current index.
    pub fn calc_idx(&self, off: i64) -> i64 {
        layout::wrap_index(layout::idx_load(self.idx_cell()), off, self.buffers)
    }

    /// Signed distance from `off` to `reference` (current index when `None`);
    /// see [`layout::drift`] for the sign convention.
    pub fn calc_drift(&self, off: i64, reference: Option<i64>) -> i64 {
        let r = reference.unwrap_or_else(|| layout::idx_load(self.idx_cell()));
        layout::drift(off, r, self.buffers)
    }

    /// Slot metadata, or `None` while the slot is unstamped.
    pub fn frame_info(&self, n: i64) -> Option<FrameInfo> {
        let n = n.rem_euclid(self.buffers);
        unsafe { slot::read(self.region.base(), self.slot_off(n), VIDEO_SLOT_MAGIC, n) }
    }

    /// Stamps slot metadata; the slot magic is written last.
    pub fn set_frame_info(&self, n: i64, s: FrameStamp) {
        let n = n.rem_euclid(self.buffers);
        unsafe { slot::stamp(self.region.base(), self.slot_off(n), VIDEO_SLOT_MAGIC, s) }
    }

    /// The slot's pixel payload as an `height × width` RGB24 view.
    pub fn frame(&self, n: i64) -> Result<FrameBuf<'_>, RingError> {
        if n < 0 || n >= self.buffers {
            return Err(RingError::BadIndex { index: n });
        }
        let off = self.slot_off(n) + slot_header_bytes();
        let base = unsafe { self.region.base().add(off) };
        let w = self.width as usize;
        Ok(FrameBuf::new(base, w * 3, w, self.height as usize))
    }

    /// The frame (current frame when `n` is `None`), optionally narrowed to
    /// a region of interest.
    pub fn roi(&self, n: Option<i64>, roi: Option<Rect>) -> Result<FrameBuf<'_>, RingError> {
        let n = n.unwrap_or_else(|| self.get_idx());
        let mut buf = self.frame(n)?;
        match roi {
            Some(r) => buf.view(r),
            None => Ok(buf),
        }
    }

    fn idx_cell(&self) -> &std::sync::atomic::AtomicI64 {
        unsafe { layout::idx_cell(self.region.base()) }
    }

    fn slot_off(&self, n: i64) -> usize {
        header_bytes() + n as usize * self.packet_size
    }
}

fn header_bytes() -> usize {
    VIDEO_HEADER_CELLS * CELL
}

fn slot_header_bytes() -> usize {
    SLOT_HEADER_CELLS * CELL
}
