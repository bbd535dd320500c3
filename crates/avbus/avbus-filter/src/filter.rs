//! The per-process worker that follows one or two rings.
//!
//! A filter attaches to a video and/or audio ring at a configured bias (its
//! read position relative to the writer's index, as a fraction of the ring)
//! and window (how far it may fall behind before slots are skipped). Each
//! pass it drains whatever fresh slots are available and hands them to the
//! [`FilterHooks`] implementation.
//!
//! The concurrency model is an explicit blocking loop: either on a dedicated
//! thread with a shutdown flag ([`Filter::spawn`]) or driven manually by the
//! host ([`FilterWorker::run_once`]).

use crate::error::{FilterError, FilterFault, MediaKind};
use avbus_ring::{
    AudioRing, FrameBuf, FrameInfo, Rect, SampleBuf, ShareName, VideoRing,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Worker customization points. Every method has a default no-op, so an
/// implementation only supplies the callbacks it cares about.
///
/// Media callbacks return a `Result`; an `Err` is routed to [`on_error`]
/// and the loop continues. Callbacks must not block for long: a stalled
/// consumer gets lapped by the writer and the next pass reports overruns.
///
/// [`on_error`]: FilterHooks::on_error
pub trait FilterHooks: Send {
    /// Called once when the worker starts running.
    fn on_init(&mut self, ctx: &mut FilterCtx) {
        let _ = ctx;
    }

    /// Called after each pass. The returned duration overrides the default
    /// sleep (`1 / max(fps) / 2`).
    fn on_idle(&mut self, ctx: &mut FilterCtx) -> Option<Duration> {
        let _ = ctx;
        None
    }

    /// Called exactly once during teardown.
    fn on_end(&mut self, ctx: &mut FilterCtx) {
        let _ = ctx;
    }

    /// Whether this filter reads media slots at all. Pure index drivers
    /// like the clock return false and skip the cursor pass.
    fn consumes_media(&self) -> bool {
        true
    }

    /// Called for every recoverable fault. The default logs and moves on.
    fn on_error(&mut self, name: &str, fault: &FilterFault) {
        tracing::warn!(filter = name, "{fault}");
    }

    /// Called with each fresh video frame (ROI-sliced when configured).
    fn on_video(
        &mut self,
        stream: &VideoStream,
        info: &FrameInfo,
        frame: &mut FrameBuf<'_>,
    ) -> Result<(), FilterFault> {
        let _ = (stream, info, frame);
        Ok(())
    }

    /// Called with each fresh audio slot.
    fn on_audio(
        &mut self,
        stream: &AudioStream,
        info: &FrameInfo,
        samples: &mut SampleBuf<'_>,
    ) -> Result<(), FilterFault> {
        let _ = (stream, info, samples);
        Ok(())
    }
}

/// Filter attachment configuration.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Human label for diagnostics; generated when absent.
    pub name: Option<String>,
    /// Video share to attach to.
    pub video: Option<ShareName>,
    /// Audio share to attach to. At least one share is required.
    pub audio: Option<ShareName>,
    /// Read offset as a fraction of the ring length, in `[-1, 1]`.
    pub vbias: f64,
    /// Window size as a fraction of the ring length, in `(0, 1]`.
    pub vwin: f64,
    pub abias: f64,
    pub awin: f64,
    /// Restrict video callbacks to a sub-rectangle.
    pub roi: Option<Rect>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            name: None,
            video: None,
            audio: None,
            vbias: 0.0,
            vwin: 0.25,
            abias: 0.0,
            awin: 0.25,
            roi: None,
        }
    }
}

/// Per-stream cursor state over a video ring.
pub struct VideoStream {
    ring: VideoRing,
    biasf: i64,
    winf: i64,
    ptr: i64,
    idx_last: i64,
    roi: Option<Rect>,
}

impl VideoStream {
    pub fn ring(&self) -> &VideoRing {
        &self.ring
    }

    /// Next slot this stream will read.
    pub fn ptr(&self) -> i64 {
        self.ptr
    }

    /// Bias, rounded to slots.
    pub fn bias_slots(&self) -> i64 {
        self.biasf
    }

    /// Window, rounded to slots.
    pub fn window_slots(&self) -> i64 {
        self.winf
    }

    pub fn roi(&self) -> Option<Rect> {
        self.roi
    }
}

/// Per-stream cursor state over an audio ring.
pub struct AudioStream {
    ring: AudioRing,
    biasf: i64,
    winf: i64,
    ptr: i64,
    idx_last: i64,
}

impl AudioStream {
    pub fn ring(&self) -> &AudioRing {
        &self.ring
    }

    pub fn ptr(&self) -> i64 {
        self.ptr
    }

    pub fn bias_slots(&self) -> i64 {
        self.biasf
    }

    pub fn window_slots(&self) -> i64 {
        self.winf
    }
}

/// The filter's attached streams, handed to lifecycle hooks.
pub struct FilterCtx {
    name: String,
    video: Option<VideoStream>,
    audio: Option<AudioStream>,
    default_delay: Duration,
}

impl FilterCtx {
    fn new(config: FilterConfig) -> Result<FilterCtx, FilterError> {
        if config.video.is_none() && config.audio.is_none() {
            return Err(FilterError::NoShare);
        }

        let name = config
            .name
            .unwrap_or_else(|| format!("filter-{}", &ShareName::generate().as_str()[..8]));

        let mut fps = 1i64;

        let video = match config.video {
            Some(share) => {
                let ring = VideoRing::open(share.clone()).map_err(|e| FilterError::OpenShare {
                    kind: MediaKind::Video,
                    name: share.to_string(),
                    source: e,
                })?;
                if let Some(r) = config.roi {
                    // Probe the slice now so a bad ROI fails create, not the loop.
                    ring.roi(Some(0), Some(r)).map_err(|e| FilterError::BadRoi {
                        kind: MediaKind::Video,
                        source: e,
                    })?;
                }
                let bufs = ring.buffers() as f64;
                let biasf = (config.vbias * bufs).round() as i64;
                let winf = (config.vwin * bufs).round() as i64;
                let ptr = ring.calc_idx(biasf);
                fps = fps.max(ring.fps());
                Some(VideoStream {
                    ring,
                    biasf,
                    winf,
                    ptr,
                    idx_last: -1,
                    roi: config.roi,
                })
            }
            None => None,
        };

        let audio = match config.audio {
            Some(share) => {
                let ring = AudioRing::open(share.clone()).map_err(|e| FilterError::OpenShare {
                    kind: MediaKind::Audio,
                    name: share.to_string(),
                    source: e,
                })?;
                let bufs = ring.buffers() as f64;
                let biasf = (config.abias * bufs).round() as i64;
                let winf = (config.awin * bufs).round() as i64;
                let ptr = ring.calc_idx(biasf);
                fps = fps.max(ring.fps());
                Some(AudioStream {
                    ring,
                    biasf,
                    winf,
                    ptr,
                    idx_last: -1,
                })
            }
            None => None,
        };

        Ok(FilterCtx {
            name,
            video,
            audio,
            default_delay: Duration::from_secs_f64(1.0 / fps as f64 / 2.0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn video(&self) -> Option<&VideoStream> {
        self.video.as_ref()
    }

    pub fn audio(&self) -> Option<&AudioStream> {
        self.audio.as_ref()
    }

    /// Sleep used between passes when `on_idle` does not suggest one.
    pub fn default_delay(&self) -> Duration {
        self.default_delay
    }
}

/// A filter worker the host drives itself (the no-thread mode).
pub struct FilterWorker<H: FilterHooks> {
    ctx: FilterCtx,
    hooks: H,
    shutdown: Arc<AtomicBool>,
    initialized: bool,
    ended: bool,
}

impl<H: FilterHooks> FilterWorker<H> {
    pub fn new(config: FilterConfig, hooks: H) -> Result<FilterWorker<H>, FilterError> {
        Ok(FilterWorker {
            ctx: FilterCtx::new(config)?,
            hooks,
            shutdown: Arc::new(AtomicBool::new(false)),
            initialized: false,
            ended: false,
        })
    }

    pub fn ctx(&self) -> &FilterCtx {
        &self.ctx
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// Flag checked each cycle; setting it makes `run` exit after the
    /// current pass.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// One scheduling cycle: init on the first call, drain both streams,
    /// consult `on_idle`. Returns the suggested sleep before the next call.
    pub fn run_once(&mut self) -> Duration {
        if !self.initialized {
            self.initialized = true;
            self.hooks.on_init(&mut self.ctx);
        }

        if self.hooks.consumes_media() {
            self.run_pass();
        }

        self.hooks
            .on_idle(&mut self.ctx)
            .unwrap_or(self.ctx.default_delay)
    }

    /// Teardown; `on_end` fires exactly once no matter how often this is
    /// called.
    pub fn finish(&mut self) {
        if !self.ended {
            self.ended = true;
            self.hooks.on_end(&mut self.ctx);
        }
    }

    /// The blocking worker loop. Sleeps are sliced so a join request is
    /// honored promptly.
    pub fn run(mut self) {
        while !self.shutdown.load(Ordering::Acquire) {
            let delay = self.run_once();
            let mut left = delay;
            while !left.is_zero() && !self.shutdown.load(Ordering::Acquire) {
                let step = left.min(Duration::from_millis(25));
                std::thread::sleep(step);
                left -= step;
            }
        }
        self.finish();
    }

    /// Drains both streams, repeating while any slot was handled.
    fn run_pass(&mut self) {
        let hooks = &mut self.hooks;
        let FilterCtx {
            name, video, audio, ..
        } = &mut self.ctx;

        let mut progress = true;
        while progress {
            progress = false;
            if let Some(vs) = video.as_mut() {
                progress |= poll_video(vs, hooks, name);
            }
            if let Some(au) = audio.as_mut() {
                progress |= poll_audio(au, hooks, name);
            }
        }
    }
}

/// Advances the video cursor by at most one slot; true if a slot was handled.
fn poll_video<H: FilterHooks>(vs: &mut VideoStream, hooks: &mut H, name: &str) -> bool {
    let b = vs.ring.buffers();
    let target = vs.ring.calc_idx(vs.biasf);
    let d = vs.ring.calc_drift(target, Some(vs.ptr));

    if -vs.winf >= d {
        // Out of the window: report, skip one slot, consume nothing.
        hooks.on_error(
            name,
            &FilterFault::WindowBreach {
                kind: MediaKind::Video,
                win: vs.winf,
                drift: d,
            },
        );
        vs.ptr = (vs.ptr + 1).rem_euclid(b);
        return false;
    }
    if d >= 0 {
        return false;
    }

    let n = vs.ptr;
    vs.ptr = (vs.ptr + 1).rem_euclid(b);

    match vs.ring.frame_info(n) {
        // The producer has not stamped this slot yet; normal early in a
        // ring's life.
        None => {}
        Some(fi) if fi.idx <= vs.idx_last => {
            hooks.on_error(
                name,
                &FilterFault::Overrun {
                    kind: MediaKind::Video,
                    clk: fi.clk,
                    slot: target,
                    idx: fi.idx,
                    last: vs.idx_last,
                },
            );
        }
        Some(fi) => {
            vs.idx_last = fi.idx;
            let buf = match vs.roi {
                Some(r) => vs.ring.roi(Some(n), Some(r)),
                None => vs.ring.frame(n),
            };
            match buf {
                Ok(mut frame) => {
                    if let Err(fault) = hooks.on_video(&*vs, &fi, &mut frame) {
                        hooks.on_error(name, &fault);
                    }
                }
                Err(e) => hooks.on_error(name, &FilterFault::Ring(e)),
            }
        }
    }
    true
}

/// Audio twin of [`poll_video`].
fn poll_audio<H: FilterHooks>(au: &mut AudioStream, hooks: &mut H, name: &str) -> bool {
    let b = au.ring.buffers();
    let target = au.ring.calc_idx(au.biasf);
    let d = au.ring.calc_drift(target, Some(au.ptr));

    if -au.winf >= d {
        hooks.on_error(
            name,
            &FilterFault::WindowBreach {
                kind: MediaKind::Audio,
                win: au.winf,
                drift: d,
            },
        );
        au.ptr = (au.ptr + 1).rem_euclid(b);
        return false;
    }
    if d >= 0 {
        return false;
    }

    let n = au.ptr;
    au.ptr = (au.ptr + 1).rem_euclid(b);

    match au.ring.frame_info(n) {
        None => {}
        Some(fi) if fi.idx <= au.idx_last => {
            hooks.on_error(
                name,
                &FilterFault::Overrun {
                    kind: MediaKind::Audio,
                    clk: fi.clk,
                    slot: target,
                    idx: fi.idx,
                    last: au.idx_last,
                },
            );
        }
        Some(fi) => {
            au.idx_last = fi.idx;
            match au.ring.samples(n) {
                Ok(mut samples) => {
                    if let Err(fault) = hooks.on_audio(&*au, &fi, &mut samples) {
                        hooks.on_error(name, &fault);
                    }
                }
                Err(e) => hooks.on_error(name, &FilterFault::Ring(e)),
            }
        }
    }
    true
}

/// Handle to a filter running on its own thread.
///
/// Dropping the handle requests shutdown and joins; there is no forced
/// interrupt, so a blocked callback delays the join.
pub struct Filter {
    name: String,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Filter {
    /// Opens the configured shares and starts the worker loop on a named
    /// thread. Open failures surface here; the thread never starts.
    pub fn spawn<H: FilterHooks + 'static>(
        config: FilterConfig,
        hooks: H,
    ) -> Result<Filter, FilterError> {
        let worker = FilterWorker::new(config, hooks)?;
        let name = worker.ctx().name().to_string();
        let shutdown = worker.shutdown_handle();
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker.run())
            .map_err(FilterError::Spawn)?;
        Ok(Filter {
            name,
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requests shutdown without waiting.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Requests shutdown and waits for the worker to finish its current
    /// cycle and run `on_end`.
    pub fn join(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Filter {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
