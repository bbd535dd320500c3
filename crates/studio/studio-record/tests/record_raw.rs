//! Records a few hand-stamped slots through the raw sink and checks the
//! files that come out.

use avbus_filter::{FilterConfig, FilterWorker};
use avbus_ring::{
    AudioOptions, AudioRing, AudioShape, FrameStamp, OpenMode, Rect, ShareName, VideoOptions,
    VideoRing, VideoShape,
};
use studio_record::{RawSink, RecordHooks, RecordSettings};

fn name(tag: &str) -> ShareName {
    ShareName::from(format!("avbus_rec_test_{tag}_{}", std::process::id()))
}

fn out_base(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("avbus_rec_out_{tag}_{}", std::process::id()))
}

fn stamp_all(vid: &VideoRing, aud: &AudioRing, frames: i64, worker: &mut impl FnMut()) {
    for k in 0..frames {
        let n = vid.get_idx();
        let mut f = vid.frame(n).unwrap();
        f.fill([k as u8, 2 * k as u8, 3 * k as u8]);
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
        let mut s = aud.samples(n).unwrap();
        for i in 0..s.samples_per_channel() {
            s.set(0, i, (k * 100) as i16);
            s.set(1, i, -(k as i16));
        }
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

        worker();
    }
}

#[test]
fn raw_sink_captures_video_and_audio() {
    let vid = VideoRing::create(VideoOptions {
        name: Some(name("v")),
        shape: VideoShape {
            buffers: 8,
            width: 32,
            height: 24,
            fps: 10,
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
            bitrate: 8000,
            fps: 10,
        },
        mode: Some(OpenMode::New),
        cleanup: true,
    })
    .unwrap();

    let base = out_base("full");
    let mut worker = FilterWorker::new(
        FilterConfig {
            name: Some("recorder".into()),
            video: Some(vid.name().clone()),
            audio: Some(aud.name().clone()),
            ..Default::default()
        },
        RecordHooks::new(RawSink::new(&base), RecordSettings::default()),
    )
    .unwrap();

    let frames = 5i64;
    stamp_all(&vid, &aud, frames, &mut || {
        worker.run_once();
    });
    worker.finish();

    let rgb = std::fs::read(format!("{}.rgb24", base.display())).expect("rgb24 file");
    assert_eq!(rgb.len(), frames as usize * 32 * 24 * 3);
    // First recorded frame is solid [0,0,0]; second is [1,2,3].
    let frame_bytes = 32 * 24 * 3;
    assert_eq!(&rgb[frame_bytes..frame_bytes + 3], &[1, 2, 3]);

    let mut wav =
        hound::WavReader::open(format!("{}.wav", base.display())).expect("wav file");
    let spec = wav.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 8000);
    assert_eq!(spec.bits_per_sample, 16);
    let samples: Vec<i16> = wav.samples::<i16>().map(Result::unwrap).collect();
    assert_eq!(samples.len(), frames as usize * 2 * (8000 / 10));
    // Interleaved: [l, r, l, r, …]; slot k carries (k*100, -k).
    let spc = 8000 / 10;
    assert_eq!(samples[0], 0);
    assert_eq!(samples[2 * spc], 100);
    assert_eq!(samples[2 * spc + 1], -1);

    let _ = std::fs::remove_file(format!("{}.rgb24", base.display()));
    let _ = std::fs::remove_file(format!("{}.wav", base.display()));
}

#[test]
fn roi_recording_narrows_the_frame() {
    let vid = VideoRing::create(VideoOptions {
        name: Some(name("roi")),
        shape: VideoShape {
            buffers: 8,
            width: 64,
            height: 48,
            fps: 10,
        },
        mode: Some(OpenMode::New),
        cleanup: true,
    })
    .unwrap();

    let base = out_base("roi");
    let mut worker = FilterWorker::new(
        FilterConfig {
            name: Some("roi-recorder".into()),
            video: Some(vid.name().clone()),
            roi: Some(Rect::new(8, 8, 16, 12)),
            ..Default::default()
        },
        RecordHooks::new(RawSink::new(&base), RecordSettings::default()),
    )
    .unwrap();

    for k in 0..3i64 {
        let n = vid.get_idx();
        vid.frame(n).unwrap().fill([7, 7, 7]);
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
        worker.run_once();
    }
    worker.finish();

    let rgb = std::fs::read(format!("{}.rgb24", base.display())).expect("rgb24 file");
    assert_eq!(rgb.len(), 3 * 16 * 12 * 3);
    assert!(rgb.iter().all(|&b| b == 7));

    let _ = std::fs::remove_file(format!("{}.rgb24", base.display()));
}
