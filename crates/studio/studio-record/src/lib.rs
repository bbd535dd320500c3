//! `studio-record`: the consumer filter that captures ring media to disk.
//!
//! [`RecordHooks`] derives stream parameters from the attached rings and
//! feeds every fresh slot to an [`Encoder`]. The bundled [`RawSink`] writes
//! raw RGB24 plus WAV; a real codec backend implements the same trait.

mod recorder;
mod sink;

pub use recorder::{RecordHooks, RecordSettings};
pub use sink::{AudioParams, ChannelLayout, Encoder, RawSink, SampleFormat, VideoParams};
