use avbus_perf::bench_share_name;
use avbus_ring::{FrameStamp, OpenMode, VideoOptions, VideoRing, VideoShape};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

fn ring(tag: &str) -> VideoRing {
    VideoRing::create(VideoOptions {
        name: Some(bench_share_name(tag)),
        shape: VideoShape {
            buffers: 64,
            width: 320,
            height: 240,
            fps: 30,
        },
        mode: Some(OpenMode::New),
        cleanup: true,
    })
    .expect("failed to create video ring")
}

fn bench_index_math(c: &mut Criterion) {
    let ring = ring("idx");
    let mut group = c.benchmark_group("video_ring");
    group.throughput(Throughput::Elements(1));

    group.bench_function("calc_idx", |b| {
        b.iter(|| black_box(ring.calc_idx(black_box(-16))));
    });
    group.bench_function("calc_drift", |b| {
        b.iter(|| black_box(ring.calc_drift(black_box(5), black_box(Some(60)))));
    });
    group.bench_function("add_idx", |b| {
        b.iter(|| black_box(ring.add_idx(1)));
    });

    group.finish();
}

fn bench_stamping(c: &mut Criterion) {
    let ring = ring("stamp");
    let mut group = c.benchmark_group("video_ring");
    group.throughput(Throughput::Elements(1));

    let stamp = FrameStamp {
        pts: 1,
        idx: 2,
        clk: 3,
        rds: 0,
        wts: 0,
    };
    group.bench_function("set_frame_info", |b| {
        b.iter(|| ring.set_frame_info(black_box(7), black_box(stamp)));
    });
    group.bench_function("frame_info", |b| {
        b.iter(|| black_box(ring.frame_info(black_box(7))));
    });

    group.finish();
}

criterion_group!(benches, bench_index_math, bench_stamping);
criterion_main!(benches);
