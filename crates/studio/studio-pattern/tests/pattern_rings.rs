//! Drives the pattern source against real rings and checks it actually
//! paints and sounds.

use avbus_filter::{FilterConfig, FilterWorker};
use avbus_ring::{
    AudioOptions, AudioRing, AudioShape, FrameStamp, OpenMode, ShareName, VideoOptions, VideoRing,
    VideoShape,
};
use studio_pattern::PatternHooks;

fn name(tag: &str) -> ShareName {
    ShareName::from(format!("avbus_pat_test_{tag}_{}", std::process::id()))
}

#[test]
fn pattern_paints_frames_and_chirps_on_bounce() {
    let vid = VideoRing::create(VideoOptions {
        name: Some(name("v")),
        shape: VideoShape {
            buffers: 8,
            width: 40,
            height: 40,
            fps: 30,
        },
        mode: Some(OpenMode::New),
        cleanup: true,
    })
    .unwrap();
    let aud = AudioRing::create(AudioOptions {
        name: Some(name("a")),
        shape: AudioShape {
            buffers: 8,
            channels: 2,
            bps: 16,
            bitrate: 48000,
            fps: 30,
        },
        mode: Some(OpenMode::New),
        cleanup: true,
    })
    .unwrap();

    let mut worker = FilterWorker::new(
        FilterConfig {
            name: Some("pattern".into()),
            video: Some(vid.name().clone()),
            audio: Some(aud.name().clone()),
            ..Default::default()
        },
        PatternHooks::new(),
    )
    .unwrap();

    // Stand in for the clock: stamp one slot per stream per cycle. The
    // 40px view and 5px/frame speed force a bounce within a few frames.
    for k in 0..30i64 {
        let n = vid.get_idx();
        vid.set_frame_info(
            n,
            FrameStamp {
                pts: 0,
                idx: k,
                clk: k,
                rds: 0,
                wts: 0,
            },
        );
        vid.add_idx(1);

        let n = aud.calc_idx(1);
        aud.set_frame_info(
            n,
            FrameStamp {
                pts: 0,
                idx: k,
                clk: k,
                rds: 0,
                wts: 0,
            },
        );
        aud.set_idx(n);

        worker.run_once();
    }
    worker.finish();

    // Every painted frame keeps some of its top border visible (the ball
    // and diagonals only cover part of the row).
    let mut painted = false;
    'slots: for slot in 0..vid.buffers() {
        if vid.frame_info(slot).is_some() {
            let f = vid.frame(slot).unwrap();
            for x in 0..f.width() {
                if f.pixel(x, 0) == Some([255, 255, 255]) {
                    painted = true;
                    break 'slots;
                }
            }
        }
    }
    assert!(painted, "no frame carries the pattern border");

    // At least one bounce happened in 30 frames of a 40px box, so some
    // audio slot carries a nonzero chirp sample.
    let mut heard = false;
    'outer: for slot in 0..aud.buffers() {
        let s = aud.samples(slot).unwrap();
        for i in 0..s.samples_per_channel() {
            if s.get(0, i) != 0 || s.get(1, i) != 0 {
                heard = true;
                break 'outer;
            }
        }
    }
    assert!(heard, "no chirp was mixed into the audio ring");
}
