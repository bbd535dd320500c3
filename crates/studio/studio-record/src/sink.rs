//! The frame-delivery contract between the recorder filter and whatever
//! encodes the media.
//!
//! Codec selection and muxing live behind [`Encoder`]; the recorder only
//! promises monotonically increasing pts and ring-shaped frames. [`RawSink`]
//! is the bundled implementation: raw RGB24 to one file, PCM through a WAV
//! writer to another, which keeps sessions inspectable without an external
//! codec library.

use avbus_ring::{FrameBuf, SampleBuf};
use hound::{SampleFormat as WavSampleFormat, WavSpec, WavWriter};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Audio channel layout advertised to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Mono,
    Stereo,
    Multi,
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChannelLayout::Mono => "mono",
            ChannelLayout::Stereo => "stereo",
            ChannelLayout::Multi => "multi",
        })
    }
}

/// PCM sample format by bits per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    S8,
    S16,
}

/// Video stream parameters handed to [`Encoder::start`].
#[derive(Debug, Clone)]
pub struct VideoParams {
    pub width: usize,
    pub height: usize,
    pub fps: i64,
    pub codec: String,
    pub pix_fmt: String,
    pub bit_rate: u64,
    pub bit_rate_tolerance: u64,
}

/// Audio stream parameters handed to [`Encoder::start`].
#[derive(Debug, Clone)]
pub struct AudioParams {
    pub channels: usize,
    pub sample_rate: i64,
    pub fps: i64,
    pub codec: String,
    pub layout: ChannelLayout,
    pub format: SampleFormat,
}

/// Where recorded frames go.
///
/// `start` is called once before any frame, `finish` once after the last.
/// Implementations receive frames in pts order per stream and must not block
/// for long; a stalled sink shows up as ring overruns upstream.
pub trait Encoder: Send {
    fn start(
        &mut self,
        video: Option<&VideoParams>,
        audio: Option<&AudioParams>,
    ) -> io::Result<()>;

    fn write_video(&mut self, pts: i64, frame: &FrameBuf<'_>) -> io::Result<()>;

    fn write_audio(&mut self, pts: i64, samples: &SampleBuf<'_>) -> io::Result<()>;

    fn finish(&mut self) -> io::Result<()>;
}

/// Raw-file sink: `<base>.rgb24` for video, `<base>.wav` for audio.
pub struct RawSink {
    base: PathBuf,
    video: Option<BufWriter<File>>,
    wav: Option<WavWriter<BufWriter<File>>>,
}

impl RawSink {
    pub fn new(base: impl Into<PathBuf>) -> RawSink {
        RawSink {
            base: base.into(),
            video: None,
            wav: None,
        }
    }

    fn path_with(&self, ext: &str) -> PathBuf {
        let mut p = self.base.clone().into_os_string();
        p.push(".");
        p.push(ext);
        PathBuf::from(p)
    }
}

fn wav_err(e: hound::Error) -> io::Error {
    match e {
        hound::Error::IoError(e) => e,
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}

impl Encoder for RawSink {
    fn start(
        &mut self,
        video: Option<&VideoParams>,
        audio: Option<&AudioParams>,
    ) -> io::Result<()> {
        if let Some(dir) = self.base.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        if video.is_some() {
            self.video = Some(BufWriter::new(File::create(self.path_with("rgb24"))?));
        }

        if let Some(a) = audio {
            let spec = WavSpec {
                channels: a.channels as u16,
                sample_rate: a.sample_rate as u32,
                bits_per_sample: match a.format {
                    SampleFormat::S8 => 8,
                    SampleFormat::S16 => 16,
                },
                sample_format: WavSampleFormat::Int,
            };
            self.wav = Some(WavWriter::create(self.path_with("wav"), spec).map_err(wav_err)?);
        }

        Ok(())
    }

    fn write_video(&mut self, _pts: i64, frame: &FrameBuf<'_>) -> io::Result<()> {
        let out = match self.video.as_mut() {
            Some(w) => w,
            None => return Ok(()),
        };
        match frame.bytes() {
            Some(all) => out.write_all(all)?,
            // ROI views are not contiguous; write row by row.
            None => {
                for y in 0..frame.height() {
                    out.write_all(frame.row(y))?;
                }
            }
        }
        Ok(())
    }

    fn write_audio(&mut self, _pts: i64, samples: &SampleBuf<'_>) -> io::Result<()> {
        let wav = match self.wav.as_mut() {
            Some(w) => w,
            None => return Ok(()),
        };
        // WAV is interleaved regardless of the slot layout.
        for i in 0..samples.samples_per_channel() {
            for ch in 0..samples.channels() {
                wav.write_sample(samples.get(ch, i)).map_err(wav_err)?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        if let Some(mut v) = self.video.take() {
            v.flush()?;
        }
        if let Some(w) = self.wav.take() {
            w.finalize().map_err(wav_err)?;
        }
        Ok(())
    }
}
