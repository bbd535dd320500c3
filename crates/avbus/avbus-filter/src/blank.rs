//! The eraser: zeroes slots before the ring reuses them.
//!
//! Run at the deepest negative bias in a session (just ahead of the
//! wrap-around point) so producers always start from clean payloads.

use crate::error::FilterFault;
use crate::filter::{AudioStream, FilterHooks, VideoStream};
use avbus_ring::{FrameBuf, FrameInfo, SampleBuf};

pub struct BlankHooks;

impl FilterHooks for BlankHooks {
    fn on_video(
        &mut self,
        _stream: &VideoStream,
        _info: &FrameInfo,
        frame: &mut FrameBuf<'_>,
    ) -> Result<(), FilterFault> {
        frame.clear();
        Ok(())
    }

    fn on_audio(
        &mut self,
        _stream: &AudioStream,
        _info: &FrameInfo,
        samples: &mut SampleBuf<'_>,
    ) -> Result<(), FilterFault> {
        samples.clear();
        Ok(())
    }
}
