//! `avbus-ring`: shared-memory media buses for inter-process pipelines.
//!
//! Three fixed on-wire layouts over named shared regions:
//!
//! - [`VideoRing`]: a ring of uncompressed RGB24 frame slots plus per-frame
//!   metadata, advanced by a single writer.
//! - [`AudioRing`]: the same shape for interleaved PCM slots.
//! - [`MsgRing`]: a one-writer/one-reader wraparound text log.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐      named shared region      ┌──────────────┐
//! │ clock source │ ───────────────────────────── │   recorder   │
//! │ (writes idx) │        (mmap, slots)          │ (bias -0.5)  │
//! └──────────────┘                               └──────────────┘
//!        │                                       ┌──────────────┐
//!        └────────── producers (bias -0.25) ──── │    eraser    │
//!                                                │ (bias -0.75) │
//!                                                └──────────────┘
//! ```
//!
//! Every attacher tracks its own cursor; the ring itself carries only the
//! writer's index. See `avbus-filter` for the cursor-following runtime.

mod audio;
mod error;
mod layout;
mod message;
mod mix;
mod slot;
mod video;

pub use audio::{AudioOptions, AudioRing, AudioShape, SampleBuf, SampleLayout};
pub use error::{MsgError, RingError};
pub use layout::{
    AUDIO_RING_MAGIC, AUDIO_SLOT_MAGIC, MSG_MAGIC, VIDEO_RING_MAGIC, VIDEO_SLOT_MAGIC, drift,
    wrap_index,
};
pub use message::{DEFAULT_MSG_SIZE, MsgOptions, MsgRing};
pub use mix::{MixMode, PcmBlock, mix_into};
pub use slot::{FrameInfo, FrameStamp};
pub use video::{FrameBuf, Rect, VideoOptions, VideoRing, VideoShape};

pub use avbus_shm::{OpenMode, ShareName};
