//! The test pattern source: a bouncing shaded ball with a chirp on impact.
//!
//! Video draws a frame border, two diagonals, and the ball into whatever
//! region the filter hands it (usually a partitioned ROI). Audio mixes a
//! short rising tone into the slot whenever the ball bounced since the last
//! audio callback, enveloped at the slot edges so chirps never click.

use crate::shapes;
use avbus_filter::{AudioStream, FilterFault, FilterHooks, VideoStream};
use avbus_ring::{FrameBuf, FrameInfo, MixMode, PcmBlock, SampleBuf, mix_into};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const BORDER: [u8; 3] = [255, 255, 255];
const DIAG_DOWN: [u8; 3] = [200, 100, 50];
const DIAG_UP: [u8; 3] = [50, 100, 200];

/// Chirp length in audio slots.
const CHIRP_SLOTS: i64 = 20;

struct Ball {
    x: i64,
    y: i64,
    xs: i64,
    ys: i64,
    sz: i64,
    col: [u8; 3],
    bounced: bool,
}

struct Chirp {
    /// Base frequency; the tone climbs by this much every slot.
    base: i64,
    freq: i64,
    remaining: i64,
    volume: i16,
}

/// Hooks producing the test pattern. Supply it to a filter attached at a
/// negative bias so it fills slots ahead of downstream consumers.
pub struct PatternHooks {
    rng: SmallRng,
    ball: Option<Ball>,
    chirp: Option<Chirp>,
    vpts: i64,
    apts: i64,
}

impl PatternHooks {
    pub fn new() -> PatternHooks {
        PatternHooks {
            rng: SmallRng::from_entropy(),
            ball: None,
            chirp: None,
            vpts: 0,
            apts: 0,
        }
    }

    fn update_ball(&mut self, w: i64, h: i64) {
        let rng = &mut self.rng;
        let ball = self.ball.get_or_insert_with(|| Ball {
            x: w / 2,
            y: h / 2,
            xs: 5,
            ys: 5,
            sz: 30i64.min(w / 2).min(h / 2).max(2),
            col: [
                rng.gen_range(100..=255),
                rng.gen_range(100..=255),
                rng.gen_range(100..=255),
            ],
            bounced: false,
        });

        let bounce = |p: i64, r: i64, s: i64, mn: i64, mx: i64| {
            (s > 0 && p + r + s >= mx) || (s < 0 && mn >= p - r + s)
        };

        let r = ball.sz / 2;
        if bounce(ball.x, r, ball.xs, 0, w) {
            ball.bounced = true;
            let sp = rng.gen_range(2..=10);
            ball.xs = if ball.xs > 0 { -sp } else { sp };
        }
        ball.x += ball.xs;

        if bounce(ball.y, r, ball.ys, 0, h) {
            ball.bounced = true;
            let sp = rng.gen_range(2..=10);
            ball.ys = if ball.ys > 0 { -sp } else { sp };
        }
        ball.y += ball.ys;
    }

    fn draw(&mut self, frame: &mut FrameBuf<'_>) {
        let (w, h) = (frame.width() as i64, frame.height() as i64);
        let ball = match self.ball.as_mut() {
            Some(b) => b,
            None => return,
        };

        // Keep the ball inside the view after a speed change.
        if ball.x + ball.sz / 2 >= w {
            ball.x = w - ball.sz - 1;
        }
        if ball.y + ball.sz / 2 >= h {
            ball.y = h - ball.sz - 1;
        }

        shapes::draw_rect(frame, 0, 0, w - 1, h - 1, BORDER);
        shapes::draw_line(frame, 0, 0, w - 1, h - 1, DIAG_DOWN);
        shapes::draw_line(frame, 0, h - 1, w - 1, 0, DIAG_UP);

        // Shaded ball: repeated fills with a darkening color and a shrinking
        // left side.
        let mut col = ball.col;
        let mut shade = 10i64;
        while shade >= -2 {
            col = col.map(|v| (v as f64 / 1.15) as u8);
            shapes::fill_circle(
                frame,
                ball.x,
                ball.y,
                ball.sz / 2,
                col,
                shade as f64 / 10.0,
                1.0,
            );
            shade -= 2;
        }
    }

    /// One slot of the rising tone with a quarter-slot triangular envelope
    /// at both edges.
    fn chirp_block(&mut self, channels: usize, spc: usize, bitrate: i64) -> Option<PcmBlock> {
        let took_bounce = self
            .ball
            .as_mut()
            .map(|b| std::mem::take(&mut b.bounced))
            .unwrap_or(false);

        let rng = &mut self.rng;
        let chirp = self.chirp.get_or_insert_with(|| {
            let base = rng.gen_range(50..=100);
            Chirp {
                base,
                freq: base,
                remaining: 0,
                volume: 5000,
            }
        });

        if took_bounce {
            chirp.freq = chirp.base;
            chirp.remaining = CHIRP_SLOTS;
        }
        if chirp.remaining <= 0 {
            return None;
        }
        chirp.remaining -= 1;
        chirp.freq += chirp.base;

        let mut block = PcmBlock::new(channels, spc);
        let att = (spc / 4).max(1);
        for ch in 0..channels {
            // Offset each channel's pitch slightly for a stereo shimmer.
            let freq = (chirp.freq + ch as i64 * chirp.base) as f64;
            let out = block.channel_mut(ch);
            for (i, s) in out.iter_mut().enumerate() {
                let n = (self.apts + i as i64) as f64;
                let v = chirp.volume as f64
                    * (2.0 * std::f64::consts::PI * n * freq / bitrate as f64).sin();
                let env = (i.min(spc - i - 1) as f64 / att as f64).min(1.0);
                *s = (v * env) as i16;
            }
        }
        Some(block)
    }
}

impl Default for PatternHooks {
    fn default() -> Self {
        PatternHooks::new()
    }
}

impl FilterHooks for PatternHooks {
    fn on_video(
        &mut self,
        stream: &VideoStream,
        _info: &FrameInfo,
        frame: &mut FrameBuf<'_>,
    ) -> Result<(), FilterFault> {
        self.update_ball(frame.width() as i64, frame.height() as i64);
        self.draw(frame);
        self.vpts += stream.ring().pts_inc();
        Ok(())
    }

    fn on_audio(
        &mut self,
        stream: &AudioStream,
        _info: &FrameInfo,
        samples: &mut SampleBuf<'_>,
    ) -> Result<(), FilterFault> {
        if let Some(block) = self.chirp_block(
            samples.channels(),
            samples.samples_per_channel(),
            stream.ring().bitrate(),
        ) {
            mix_into(samples, &block, MixMode::Blend);
        }
        self.apts += stream.ring().pts_inc();
        Ok(())
    }
}
