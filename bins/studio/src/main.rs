//! Session driver: wires a clock, partitioned pattern sources, a recorder,
//! and an eraser onto one video ring and one audio ring, runs for the
//! configured duration, then tears everything down.

use avbus_filter::{BlankHooks, ClockConfig, ClockHooks, Filter, FilterConfig};
use avbus_ring::{
    AudioOptions, AudioRing, AudioShape, OpenMode, Rect, ShareName, VideoOptions, VideoRing,
    VideoShape,
};
use studio_config::SessionConfig;
use studio_pattern::{PatternHooks, add_rect};
use studio_record::{RawSink, RecordHooks, RecordSettings};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn share_name(configured: &str) -> Option<ShareName> {
    if configured.is_empty() {
        None
    } else {
        Some(ShareName::from(configured))
    }
}

fn spawn_source(
    config: &SessionConfig,
    video: &ShareName,
    audio: &ShareName,
    index: usize,
    roi: Rect,
) -> Result<Filter, Box<dyn std::error::Error>> {
    let filter = Filter::spawn(
        FilterConfig {
            name: Some(format!("rect{index}")),
            video: Some(video.clone()),
            audio: Some(audio.clone()),
            vbias: config.source_bias,
            vwin: config.window,
            abias: config.source_bias,
            awin: config.window,
            roi: Some(roi),
        },
        PatternHooks::new(),
    )?;
    Ok(filter)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let video = VideoRing::create(VideoOptions {
        name: share_name(&config.video_share),
        shape: VideoShape {
            buffers: config.video_buffers(),
            width: config.width,
            height: config.height,
            fps: config.vfps,
        },
        mode: Some(OpenMode::New),
        cleanup: true,
    })?;
    let audio = AudioRing::create(AudioOptions {
        name: share_name(&config.audio_share),
        shape: AudioShape {
            buffers: config.audio_buffers(),
            channels: config.channels,
            bps: config.bps,
            bitrate: config.bitrate,
            fps: config.afps,
        },
        mode: Some(OpenMode::New),
        cleanup: true,
    })?;
    info!(
        "video share {} ({}x{}@{}), audio share {} ({}ch {}Hz@{})",
        video.name(),
        video.width(),
        video.height(),
        video.fps(),
        audio.name(),
        audio.channels(),
        audio.bitrate(),
        audio.fps()
    );

    let vname = video.name().clone();
    let aname = audio.name().clone();

    // One source for the whole frame; more split off as the session runs.
    let mut rects = vec![Rect::new(0, 0, config.width as usize, config.height as usize)];
    let mut sources = vec![spawn_source(&config, &vname, &aname, 1, rects[0])?];

    let recorder = Filter::spawn(
        FilterConfig {
            name: Some("recorder".into()),
            video: Some(vname.clone()),
            audio: Some(aname.clone()),
            vbias: config.recorder_bias,
            vwin: config.window,
            abias: config.recorder_bias,
            awin: config.window,
            roi: None,
        },
        RecordHooks::new(RawSink::new(&config.output), RecordSettings::default()),
    )?;

    let eraser = Filter::spawn(
        FilterConfig {
            name: Some("eraser".into()),
            video: Some(vname.clone()),
            audio: Some(aname.clone()),
            vbias: config.eraser_bias,
            vwin: config.window,
            abias: config.eraser_bias,
            awin: config.window,
            roi: None,
        },
        BlankHooks,
    )?;

    let clock = Filter::spawn(
        FilterConfig {
            name: Some("clock".into()),
            video: Some(vname.clone()),
            audio: Some(aname.clone()),
            vwin: config.window,
            awin: config.window,
            ..Default::default()
        },
        ClockHooks::new(ClockConfig {
            vfps: Some(config.vfps),
            afps: Some(config.afps),
            div: config.div,
        }),
    )?;

    info!(
        "session running for {}s (div {})",
        config.duration_secs, config.div
    );

    let div = config.div.max(1.0) as u64;
    let mut remaining = config.duration_secs * div;
    let mut since_split = 0u64;
    while remaining > 0 {
        remaining -= 1;
        since_split += 1;
        if since_split >= div && rects.len() < config.sources {
            since_split = 0;
            if let Some(roi) = add_rect(&mut rects) {
                info!("adding source {} at {roi:?}", rects.len());
                sources.push(spawn_source(&config, &vname, &aname, rects.len(), roi)?);
            }
        }
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    info!("session done, shutting down");
    clock.join();
    for source in sources {
        source.join();
    }
    recorder.join();
    eraser.join();

    Ok(())
}
