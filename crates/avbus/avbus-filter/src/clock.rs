//! The clock source: the one writer of a ring's index.
//!
//! On each idle tick the clock compares wall time (scaled by the `div`
//! divider) against each stream's next frame deadline. Due slots get their
//! metadata stamped and the writer index advances; the returned delay puts
//! the worker to sleep until the next deadline.
//!
//! Video is stamped at the writer's current index before advancing; audio is
//! stamped one slot ahead and the index moved onto it, giving audio
//! consumers a one-slot lead to fill. Keeping this ordering is what holds
//! the soft phase relationship between the two streams.

use crate::filter::{FilterCtx, FilterHooks};
use avbus_ring::FrameStamp;
use std::time::{Duration, Instant};

/// Clock rates and wall divider.
#[derive(Debug, Clone, Copy)]
pub struct ClockConfig {
    /// Video frames per second; the video ring is only driven when set.
    pub vfps: Option<i64>,
    /// Audio slots per second; likewise.
    pub afps: Option<i64>,
    /// Wall-clock divider: 1 is real time, 4 runs at quarter speed.
    pub div: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig {
            vfps: None,
            afps: None,
            div: 1.0,
        }
    }
}

/// Hooks implementation driving ring indices at wall-clock rate.
pub struct ClockHooks {
    cfg: ClockConfig,
    start: Option<Instant>,
    vind: i64,
    aind: i64,
    clk: f64,
}

impl ClockHooks {
    pub fn new(cfg: ClockConfig) -> ClockHooks {
        ClockHooks {
            cfg,
            start: None,
            vind: 0,
            aind: 0,
            clk: 0.0,
        }
    }

    /// Simulated clock in seconds (wall time over `div`).
    pub fn clk(&self) -> f64 {
        self.clk
    }

    /// Logical video frames stamped so far.
    pub fn vind(&self) -> i64 {
        self.vind
    }

    /// Logical audio slots stamped so far.
    pub fn aind(&self) -> i64 {
        self.aind
    }
}

impl FilterHooks for ClockHooks {
    // The clock only writes the index; it never reads slots.
    fn consumes_media(&self) -> bool {
        false
    }

    fn on_init(&mut self, _ctx: &mut FilterCtx) {
        self.start = Some(Instant::now());
        self.vind = 0;
        self.aind = 0;
    }

    fn on_idle(&mut self, ctx: &mut FilterCtx) -> Option<Duration> {
        let start = self.start?;
        let div = if self.cfg.div > 0.0 { self.cfg.div } else { 1.0 };
        let t = start.elapsed().as_secs_f64();
        self.clk = t / div;
        let clk_ms = (self.clk * 1000.0).round() as i64;

        let mut delay = f64::INFINITY;

        if let (Some(vs), Some(vfps)) = (ctx.video(), self.cfg.vfps) {
            let vdly = self.vind as f64 / (vfps as f64 / div) - t;
            if vdly < -1.0 {
                tracing::warn!("video lagging: {vdly:.3}s");
            }
            if vdly <= 0.0 {
                let ring = vs.ring();
                let n = ring.get_idx();
                ring.set_frame_info(
                    n,
                    FrameStamp {
                        pts: 0,
                        idx: self.vind,
                        clk: clk_ms,
                        rds: 0,
                        wts: 0,
                    },
                );
                ring.set_idx(n + 1);
                self.vind += 1;
                delay = 0.0;
            } else {
                delay = delay.min(vdly);
            }
        }

        if let (Some(au), Some(afps)) = (ctx.audio(), self.cfg.afps) {
            let adly = self.aind as f64 / (afps as f64 / div) - t;
            if adly < -1.0 {
                tracing::warn!("audio lagging: {adly:.3}s");
            }
            if adly <= 0.0 {
                let ring = au.ring();
                // One slot ahead of the writer index, then move onto it.
                let n = ring.calc_idx(1);
                ring.set_frame_info(
                    n,
                    FrameStamp {
                        pts: 0,
                        idx: self.aind,
                        clk: clk_ms,
                        rds: 0,
                        wts: 0,
                    },
                );
                ring.set_idx(n);
                self.aind += 1;
                delay = 0.0;
            } else {
                delay = delay.min(adly);
            }
        }

        if delay.is_finite() {
            Some(Duration::from_secs_f64(delay.max(0.0)))
        } else {
            // Neither stream is configured with a rate; fall back to the
            // worker's default pacing.
            None
        }
    }
}
