//! PCM block mixing between process-local buffers and ring slots.
//!
//! Mixing is additive at half amplitude each (`d/2 + s/2`), matching what a
//! cooperative producer expects when several sources share a slot. Channel
//! layouts are adapted: equal counts map one to one, a mono source feeds
//! every destination channel, and a multi-channel source folds into a mono
//! destination by averaging. Resampling is out of scope; sample counts are
//! truncated to the shorter side.

use crate::audio::SampleBuf;

/// A heap-backed planar PCM block used to prepare samples before mixing
/// them into a shared slot.
#[derive(Debug, Clone)]
pub struct PcmBlock {
    channels: usize,
    samples_per_channel: usize,
    /// Channel-major: `data[ch * samples_per_channel + i]`.
    data: Vec<i16>,
}

impl PcmBlock {
    pub fn new(channels: usize, samples_per_channel: usize) -> Self {
        PcmBlock {
            channels,
            samples_per_channel,
            data: vec![0; channels * samples_per_channel],
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samples_per_channel(&self) -> usize {
        self.samples_per_channel
    }

    pub fn channel(&self, ch: usize) -> &[i16] {
        let s = ch * self.samples_per_channel;
        &self.data[s..s + self.samples_per_channel]
    }

    pub fn channel_mut(&mut self, ch: usize) -> &mut [i16] {
        let s = ch * self.samples_per_channel;
        &mut self.data[s..s + self.samples_per_channel]
    }
}

/// Whether [`mix_into`] blends with or replaces the destination samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixMode {
    /// `dst = dst/2 + src/2`
    Blend,
    /// `dst = src`
    Overwrite,
}

/// Copies or blends `src` into the slot view, adapting channel counts.
pub fn mix_into(dst: &mut SampleBuf<'_>, src: &PcmBlock, mode: MixMode) {
    let n = dst.samples_per_channel().min(src.samples_per_channel());
    let dch = dst.channels();
    let sch = src.channels();

    let write = |dst: &mut SampleBuf<'_>, ch: usize, i: usize, v: i16| match mode {
        MixMode::Blend => dst.mix_add(ch, i, v),
        MixMode::Overwrite => dst.set(ch, i, v),
    };

    if dch == sch {
        for ch in 0..dch {
            let s = src.channel(ch);
            for i in 0..n {
                write(dst, ch, i, s[i]);
            }
        }
    } else if sch == 1 {
        // Mono source feeds every destination channel.
        let s = src.channel(0);
        for ch in 0..dch {
            for i in 0..n {
                write(dst, ch, i, s[i]);
            }
        }
    } else if dch == 1 {
        // Fold a multi-channel source down by averaging.
        for i in 0..n {
            let mut acc = 0i32;
            for ch in 0..sch {
                acc += src.channel(ch)[i] as i32;
            }
            write(dst, 0, i, (acc / sch as i32) as i16);
        }
    } else {
        // No sensible mapping between unequal multi-channel layouts.
        tracing::warn!(src = sch, dst = dch, "unhandled channel layout");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleBuf;

    fn buf_from(bytes: &mut [u8], channels: usize, spc: usize) -> SampleBuf<'_> {
        SampleBuf::new(bytes.as_mut_ptr(), channels, spc, 16)
    }

    #[test]
    fn blend_halves_both_sides() {
        let mut bytes = [0u8; 8];
        let mut dst = buf_from(&mut bytes, 1, 4);
        for i in 0..4 {
            dst.set(0, i, 1000);
        }

        let mut src = PcmBlock::new(1, 4);
        src.channel_mut(0).copy_from_slice(&[2000, 2000, 2000, 2000]);

        mix_into(&mut dst, &src, MixMode::Blend);
        for i in 0..4 {
            assert_eq!(dst.get(0, i), 1500);
        }
    }

    #[test]
    fn mono_source_reaches_every_channel() {
        let mut bytes = [0u8; 16];
        let mut dst = buf_from(&mut bytes, 2, 4);

        let mut src = PcmBlock::new(1, 4);
        src.channel_mut(0).copy_from_slice(&[10, 20, 30, 40]);

        mix_into(&mut dst, &src, MixMode::Overwrite);
        for ch in 0..2 {
            for i in 0..4 {
                assert_eq!(dst.get(ch, i), ((i + 1) * 10) as i16);
            }
        }
    }

    #[test]
    fn stereo_folds_to_mono_by_average() {
        let mut bytes = [0u8; 8];
        let mut dst = buf_from(&mut bytes, 1, 4);

        let mut src = PcmBlock::new(2, 4);
        src.channel_mut(0).copy_from_slice(&[100, 100, 100, 100]);
        src.channel_mut(1).copy_from_slice(&[300, 300, 300, 300]);

        mix_into(&mut dst, &src, MixMode::Overwrite);
        for i in 0..4 {
            assert_eq!(dst.get(0, i), 200);
        }
    }
}
