//! The recorder filter: pulls frames off the rings and feeds an [`Encoder`].
//!
//! Typically attached at bias -0.5, half a ring behind the producers.
//! Stream parameters are derived from the attached rings at init; the
//! encoder sees monotonically increasing pts (`+1` per video frame,
//! `+bitrate/fps` per audio slot).

use crate::sink::{AudioParams, ChannelLayout, Encoder, SampleFormat, VideoParams};
use avbus_filter::{AudioStream, FilterCtx, FilterFault, FilterHooks, VideoStream};
use avbus_ring::{FrameBuf, FrameInfo, SampleBuf};

/// Encoder defaults and overrides.
#[derive(Debug, Clone)]
pub struct RecordSettings {
    pub video_codec: String,
    pub pix_fmt: String,
    pub audio_codec: String,
    /// Channel layout override; derived from the channel count when unset.
    pub layout: Option<ChannelLayout>,
    /// Video bit rate override; `width * height * 2` when unset.
    pub bit_rate: Option<u64>,
    /// Tolerance override; follows the bit rate when unset.
    pub bit_rate_tolerance: Option<u64>,
}

impl Default for RecordSettings {
    fn default() -> Self {
        RecordSettings {
            video_codec: "libx264".into(),
            pix_fmt: "yuv420p".into(),
            audio_codec: "aac".into(),
            layout: None,
            bit_rate: None,
            bit_rate_tolerance: None,
        }
    }
}

/// Hooks wiring ring callbacks to an encoder.
pub struct RecordHooks<E: Encoder> {
    encoder: E,
    settings: RecordSettings,
    active: bool,
    vpts: i64,
    apts: i64,
    apts_inc: i64,
}

impl<E: Encoder> RecordHooks<E> {
    pub fn new(encoder: E, settings: RecordSettings) -> RecordHooks<E> {
        RecordHooks {
            encoder,
            settings,
            active: false,
            vpts: 0,
            apts: 0,
            apts_inc: 0,
        }
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    fn video_params(&self, vs: &VideoStream) -> VideoParams {
        let ring = vs.ring();
        // The encoder sees the ROI dimensions, not the full ring frame.
        let (width, height) = match vs.roi() {
            Some(r) => (r.w, r.h),
            None => (ring.width() as usize, ring.height() as usize),
        };
        let bit_rate = self
            .settings
            .bit_rate
            .unwrap_or((width * height * 2) as u64);
        VideoParams {
            width,
            height,
            fps: ring.fps(),
            codec: self.settings.video_codec.clone(),
            pix_fmt: self.settings.pix_fmt.clone(),
            bit_rate,
            bit_rate_tolerance: self.settings.bit_rate_tolerance.unwrap_or(bit_rate),
        }
    }

    fn audio_params(&self, au: &AudioStream) -> Result<AudioParams, String> {
        let ring = au.ring();
        let channels = ring.channels() as usize;
        let layout = self.settings.layout.unwrap_or(match channels {
            1 => ChannelLayout::Mono,
            2 => ChannelLayout::Stereo,
            _ => ChannelLayout::Multi,
        });
        let format = match ring.bps() {
            8 => SampleFormat::S8,
            16 => SampleFormat::S16,
            bps => return Err(format!("invalid audio sample type for bps {bps}")),
        };
        Ok(AudioParams {
            channels,
            sample_rate: ring.bitrate(),
            fps: ring.fps(),
            codec: self.settings.audio_codec.clone(),
            layout,
            format,
        })
    }
}

impl<E: Encoder> FilterHooks for RecordHooks<E> {
    fn on_init(&mut self, ctx: &mut FilterCtx) {
        self.vpts = 0;
        self.apts = 0;

        let video = ctx.video().map(|vs| self.video_params(vs));
        let audio = match ctx.audio().map(|au| self.audio_params(au)) {
            Some(Ok(a)) => {
                self.apts_inc = ctx.audio().map(|au| au.ring().pts_inc()).unwrap_or(0);
                Some(a)
            }
            Some(Err(reason)) => {
                tracing::error!(filter = ctx.name(), "{reason}; recording disabled");
                return;
            }
            None => None,
        };

        match self.encoder.start(video.as_ref(), audio.as_ref()) {
            Ok(()) => self.active = true,
            Err(e) => {
                tracing::error!(filter = ctx.name(), "failed to start encoder: {e}");
            }
        }
    }

    fn on_end(&mut self, ctx: &mut FilterCtx) {
        if self.active {
            self.active = false;
            if let Err(e) = self.encoder.finish() {
                tracing::error!(filter = ctx.name(), "failed to finalize encoder: {e}");
            }
        }
    }

    fn on_video(
        &mut self,
        _stream: &VideoStream,
        _info: &FrameInfo,
        frame: &mut FrameBuf<'_>,
    ) -> Result<(), FilterFault> {
        if !self.active {
            return Ok(());
        }
        self.encoder
            .write_video(self.vpts, frame)
            .map_err(FilterFault::Io)?;
        self.vpts += 1;
        Ok(())
    }

    fn on_audio(
        &mut self,
        _stream: &AudioStream,
        _info: &FrameInfo,
        samples: &mut SampleBuf<'_>,
    ) -> Result<(), FilterFault> {
        if !self.active {
            return Ok(());
        }
        self.encoder
            .write_audio(self.apts, samples)
            .map_err(FilterFault::Io)?;
        self.apts += self.apts_inc;
        Ok(())
    }
}
