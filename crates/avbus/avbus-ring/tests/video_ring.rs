//! Video ring: dimension round-trips across handles, index arithmetic,
//! metadata stamping, and cross-process-style payload visibility.

use avbus_ring::{
    FrameStamp, OpenMode, RingError, ShareName, VideoOptions, VideoRing, VideoShape,
};

fn test_name(tag: &str) -> ShareName {
    ShareName::from(format!("avbus_vid_test_{tag}_{}", std::process::id()))
}

fn create(tag: &str, shape: VideoShape) -> VideoRing {
    VideoRing::create(VideoOptions {
        name: Some(test_name(tag)),
        shape,
        mode: Some(OpenMode::New),
        cleanup: true,
    })
    .expect("create video ring")
}

const SHAPE: VideoShape = VideoShape {
    buffers: 16,
    width: 320,
    height: 240,
    fps: 15,
};

#[test]
fn dimensions_round_trip_through_a_second_handle() {
    let vb1 = create("dims", SHAPE);
    let vb2 = VideoRing::open(vb1.name().clone()).expect("open existing");

    assert_eq!(vb2.buffers(), 16);
    assert_eq!(vb2.width(), 320);
    assert_eq!(vb2.height(), 240);
    assert_eq!(vb2.fps(), 15);
    assert_eq!(vb2.size(), vb1.size());
    assert_eq!(vb1.pts_inc(), 1);

    let b = SHAPE.buffers;
    for i in 0..b {
        // Walk forward one slot per iteration.
        assert_eq!(vb1.get_idx(), i);
        assert_eq!(vb2.get_idx(), i);
        assert_eq!(vb1.calc_idx(1), (i + 1) % b);
        assert_eq!(vb2.calc_idx(1), (i + 1) % b);

        vb1.set_frame_info(
            i,
            FrameStamp {
                pts: i * 1000,
                idx: i,
                clk: i + 1,
                rds: i + 2,
                wts: i + 3,
            },
        );
        let fi = vb2.frame_info(i).expect("stamped slot");
        assert_eq!(fi.buf, i);
        assert_eq!(fi.pts, i * 1000);
        assert_eq!(fi.idx, i);
        assert_eq!(fi.clk, i + 1);
        assert_eq!(fi.rds, i + 2);
        assert_eq!(fi.wts, i + 3);

        assert_eq!(vb1.add_idx(1), (i + 1) % b);
        assert_eq!(vb2.get_idx(), (i + 1) % b);
    }
}

#[test]
fn pixels_are_visible_across_handles() {
    let vb1 = create("pixels", SHAPE);
    let vb2 = VideoRing::open(vb1.name().clone()).unwrap();

    let mut f1 = vb1.frame(0).unwrap();
    let f2 = vb2.frame(0).unwrap();
    assert_eq!((f1.width(), f1.height()), (f2.width(), f2.height()));

    f1.set_pixel(0, 0, [123, 0, 0]);
    assert_eq!(f2.pixel(0, 0).unwrap()[0], 123);

    f1.set_pixel(319, 239, [0, 0, 77]);
    assert_eq!(f2.pixel(319, 239).unwrap()[2], 77);
}

#[test]
fn index_arithmetic_identities() {
    let ring = create("idx", SHAPE);
    let n = ring.buffers();

    assert_eq!(ring.calc_idx(0), ring.get_idx());
    for k in [-17, -1, 0, 1, 7, 16, 33] {
        assert_eq!(ring.calc_idx(k), (ring.get_idx() + k).rem_euclid(n));
    }

    ring.set_idx(5);
    assert_eq!(ring.get_idx(), 5);
    assert_eq!(ring.add_idx(13), (5 + 13) % n);
    assert_eq!(ring.add_idx(-20), (18i64 - 20).rem_euclid(n));

    for x in 0..n {
        assert_eq!(ring.calc_drift(x, Some(x)), 0);
        assert_eq!(ring.calc_drift((x + 1) % n, Some(x)), -1);
    }
    ring.set_idx(3);
    assert_eq!(ring.calc_drift(3, None), 0);
    assert_eq!(ring.calc_drift(4, None), -1);
}

#[test]
fn unstamped_and_zeroed_slots_read_as_absent() {
    let ring = create("absent", SHAPE);

    assert!(ring.frame_info(7).is_none());

    ring.set_frame_info(
        7,
        FrameStamp {
            pts: 1,
            idx: 2,
            clk: 3,
            rds: 0,
            wts: 0,
        },
    );
    assert!(ring.frame_info(7).is_some());

    // Zeroing the slot magic invalidates the metadata again.
    let raw = avbus_shm::SharedRegion::create(ring.name().clone(), OpenMode::Existing, 0, false)
        .unwrap();
    let slot_off = 48 + 7 * (48 + 320 * 240 * 3);
    unsafe { std::ptr::write_bytes(raw.base().add(slot_off), 0, 8) };
    assert!(ring.frame_info(7).is_none());
}

#[test]
fn attach_to_garbage_fails_with_invalid_header() {
    let name = test_name("garbage");
    let _raw =
        avbus_shm::SharedRegion::create(name.clone(), OpenMode::New, 4096, true).unwrap();

    match VideoRing::open(name) {
        Err(RingError::InvalidHeader { found, .. }) => assert_eq!(found, 0),
        other => panic!("expected InvalidHeader, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn open_missing_share_fails() {
    assert!(VideoRing::open(test_name("missing")).is_err());
}

#[test]
fn zero_shape_is_a_config_error() {
    let err = VideoRing::create(VideoOptions {
        name: Some(test_name("zero")),
        shape: VideoShape {
            buffers: 0,
            width: 320,
            height: 240,
            fps: 15,
        },
        mode: Some(OpenMode::New),
        cleanup: true,
    })
    .err()
    .expect("zero buffers must fail");
    assert!(matches!(err, RingError::Config(_)));
}

#[test]
fn roi_views_share_the_frame_bytes() {
    let ring = create("roi", SHAPE);

    let mut full = ring.frame(2).unwrap();
    full.clear();

    let mut sub = ring
        .roi(Some(2), Some(avbus_ring::Rect::new(10, 20, 40, 30)))
        .unwrap();
    assert_eq!((sub.width(), sub.height()), (40, 30));
    assert!(!sub.is_contiguous());
    sub.set_pixel(0, 0, [9, 8, 7]);
    sub.set_pixel(39, 29, [1, 2, 3]);

    let full = ring.frame(2).unwrap();
    assert_eq!(full.pixel(10, 20).unwrap(), [9, 8, 7]);
    assert_eq!(full.pixel(49, 49).unwrap(), [1, 2, 3]);

    // Out-of-bounds ROI is rejected.
    assert!(ring
        .roi(Some(2), Some(avbus_ring::Rect::new(300, 0, 40, 30)))
        .is_err());
}
