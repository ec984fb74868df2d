//! Session-level demux tests over synthetic Matroska files.

mod common;

use assert_matches::assert_matches;
use common::*;
use mkvsource::demux::SourceState;
use mkvsource::{CollectingSink, DecodedFrame, DemuxConfig, DemuxError, Pump, TrackKind};
use mkvsource_ebml::vint::{encode_id, encode_var_int};
use mkvsource_ebml::{EbmlError, ElementId};
use std::time::Duration;

const WHOLE: usize = usize::MAX;

fn track_frames(sink: &CollectingSink, track: u64) -> Vec<DecodedFrame> {
    sink.track_frames(track).cloned().collect()
}

fn timestamps_ms(sink: &CollectingSink, track: u64) -> Vec<i64> {
    sink.track_frames(track)
        .map(|f| f.timestamp_ns / 1_000_000)
        .collect()
}

#[test]
fn test_minimal_file_yields_one_frame() {
    for keyframe in [true, false] {
        let data = minimal_avc_file(keyframe);
        let sink = demux_all(&data, DemuxConfig::default(), WHOLE).unwrap();

        let metadata = sink.metadata.as_ref().unwrap();
        assert_eq!(metadata.tracks.len(), 1);
        let track = &metadata.tracks[0];
        assert_eq!(track.kind, TrackKind::Video);
        assert_eq!(track.codec_id, AVC_CODEC);
        let video = track.video.as_ref().unwrap();
        assert_eq!((video.pixel_width, video.pixel_height), (640, 480));
        assert!(track.audio.is_none());

        assert_eq!(sink.frames.len(), 1);
        let frame = &sink.frames[0];
        assert_eq!(frame.track_number, 1);
        assert_eq!(frame.byte_length, 96);
        assert_eq!(frame.is_keyframe, keyframe);
        assert_eq!(frame.data.as_ref(), frame_bytes(7, 96).as_slice());
        assert_eq!(sink.ended, vec![1]);
    }
}

#[test]
fn test_split_at_any_boundary_yields_same_frames() {
    let data = two_track_file(CuePlacement::Front);
    let whole = demux_all(&data, DemuxConfig::default(), WHOLE).unwrap();
    assert_eq!(whole.frames.len(), 12);

    for chunk in [1, 2, 3, 5, 7, 13, 64, 1000] {
        let split = demux_all(&data, DemuxConfig::default(), chunk).unwrap();
        for track in [1, 2] {
            assert_eq!(
                track_frames(&split, track),
                track_frames(&whole, track),
                "track {} differs with {}-byte reads",
                track,
                chunk
            );
        }
    }
}

#[test]
fn test_frame_timestamps_and_sizes() {
    let data = two_track_file(CuePlacement::None);
    let sink = demux_all(&data, DemuxConfig::default(), WHOLE).unwrap();

    assert_eq!(timestamps_ms(&sink, 1), vec![0, 40, 1000, 1040, 2000, 2040]);
    assert_eq!(timestamps_ms(&sink, 2), vec![0, 20, 1000, 1020, 2000, 2020]);

    let sizes: Vec<usize> = sink.track_frames(1).map(|f| f.byte_length).collect();
    assert_eq!(sizes, vec![300, 120, 300, 120, 300, 120]);
    let keys: Vec<bool> = sink.track_frames(1).map(|f| f.is_keyframe).collect();
    assert_eq!(keys, vec![true, false, true, false, true, false]);
    assert!(sink.track_frames(1).all(|f| f.duration_ns == Some(40_000_000)));

    let mut ended = sink.ended.clone();
    ended.sort_unstable();
    assert_eq!(ended, vec![1, 2]);
}

#[test]
fn test_cues_at_end_found_through_seek_head() {
    let data = two_track_file(CuePlacement::End);
    let mut sink = CollectingSink::new();
    let session = open_session(&data, DemuxConfig::default(), WHOLE, &mut sink).unwrap();

    let metadata = session.metadata().unwrap();
    assert_eq!(metadata.seek_head.len(), 1);
    assert_eq!(metadata.seek_head[0].element_name, "Cues");
    assert_eq!(metadata.cues.len(), 3);
    assert_eq!(metadata.info.muxing_app, "mkvsource-tests");

    let sink = demux_all(&data, DemuxConfig::default(), 7).unwrap();
    assert_eq!(sink.frames.len(), 12);
}

#[test]
fn test_seek_starts_at_cue_cluster() {
    let data = two_track_file(CuePlacement::Front);

    let cases = [
        (Duration::from_millis(700), vec![0, 40, 1000, 1040, 2000, 2040]),
        (Duration::from_millis(1500), vec![1000, 1040, 2000, 2040]),
        (Duration::from_secs(10), vec![2000, 2040]),
    ];
    for (position, expected) in cases {
        let mut sink = CollectingSink::new();
        let mut session = open_session(&data, DemuxConfig::default(), WHOLE, &mut sink).unwrap();
        session.start(&[1], Some(position)).unwrap();
        run_session(&mut session, &data, WHOLE, &mut sink).unwrap();
        assert_eq!(timestamps_ms(&sink, 1), expected, "seek to {:?}", position);
        assert_eq!(sink.track_frames(2).count(), 0);
    }
}

#[test]
fn test_seek_through_cues_at_end() {
    let data = two_track_file(CuePlacement::End);
    let mut sink = CollectingSink::new();
    let mut session = open_session(&data, DemuxConfig::default(), 5, &mut sink).unwrap();
    session.start(&[2], Some(Duration::from_millis(2000))).unwrap();
    run_session(&mut session, &data, 5, &mut sink).unwrap();
    assert_eq!(timestamps_ms(&sink, 2), vec![2000, 2020]);
}

#[test]
fn test_seek_without_cues() {
    let data = two_track_file(CuePlacement::None);
    let mut sink = CollectingSink::new();
    let mut session = open_session(&data, DemuxConfig::default(), WHOLE, &mut sink).unwrap();

    assert_matches!(
        session.start(&[], Some(Duration::from_secs(1))),
        Err(DemuxError::NoCueIndex)
    );
    assert_eq!(session.state(), SourceState::Stopped);

    // Position zero restarts at the first cluster and needs no index
    session.start(&[], Some(Duration::ZERO)).unwrap();
    run_session(&mut session, &data, WHOLE, &mut sink).unwrap();
    assert_eq!(sink.frames.len(), 12);
}

#[test]
fn test_stale_read_completion_is_dropped() {
    let data = two_track_file(CuePlacement::Front);
    let mut sink = CollectingSink::new();
    let mut session = open_session(&data, DemuxConfig::default(), WHOLE, &mut sink).unwrap();
    session.start(&[], None).unwrap();
    session.request_sample(1, &mut sink).unwrap();

    let request = assert_matches!(session.pump(&mut sink), Ok(Pump::Read(r)) => r);
    session.stop().unwrap();
    assert_eq!(session.generation(), request.generation + 1);

    // Bytes for the old generation must not reach the new window
    let garbage = vec![0xFFu8; request.len];
    assert!(!session.complete_read(request.generation, &garbage).unwrap());
    assert!(sink.frames.is_empty());

    session.start(&[], None).unwrap();
    run_session(&mut session, &data, WHOLE, &mut sink).unwrap();
    assert_eq!(sink.frames.len(), 12);
    assert_eq!(timestamps_ms(&sink, 1)[0], 0);
}

#[test]
fn test_unselected_tracks_are_skipped() {
    let data = two_track_file(CuePlacement::None);
    for chunk in [WHOLE, 7, 1] {
        let mut sink = CollectingSink::new();
        let mut session = open_session(&data, DemuxConfig::default(), chunk, &mut sink).unwrap();
        session.start(&[2], None).unwrap();
        run_session(&mut session, &data, chunk, &mut sink).unwrap();

        assert_eq!(sink.frames.len(), 6, "{}-byte reads", chunk);
        assert!(sink.frames.iter().all(|f| f.track_number == 2));
        assert_eq!(sink.ended, vec![2]);
        assert!(!session.stream(1).unwrap().is_active());
    }
}

#[test]
fn test_laced_blocks() {
    let ebml_frames = vec![frame_bytes(1, 10), frame_bytes(2, 13), frame_bytes(3, 7)];
    let fixed_frames = vec![frame_bytes(4, 8), frame_bytes(5, 8), frame_bytes(6, 8)];
    let data = MkvBuilder::new()
        .track(TrackSpec::audio(2))
        .cluster(
            500,
            vec![
                ebml_laced_block(2, 0, &ebml_frames),
                fixed_laced_block(2, 100, &fixed_frames),
            ],
        )
        .build();

    for chunk in [WHOLE, 3] {
        let sink = demux_all(&data, DemuxConfig::default(), chunk).unwrap();
        let sizes: Vec<usize> = sink.frames.iter().map(|f| f.byte_length).collect();
        assert_eq!(sizes, vec![10, 13, 7, 8, 8, 8]);
        assert_eq!(timestamps_ms(&sink, 2), vec![500, 520, 540, 600, 620, 640]);
        assert!(sink.frames.iter().all(|f| !f.is_keyframe));

        let expected: Vec<&Vec<u8>> = ebml_frames.iter().chain(&fixed_frames).collect();
        for (frame, bytes) in sink.frames.iter().zip(expected) {
            assert_eq!(frame.data.as_ref(), bytes.as_slice());
        }
    }
}

#[test]
fn test_xiph_lacing_is_fatal() {
    let mut body = vec![0x01, 0x05];
    body.extend(frame_bytes(0, 10));
    let block = element(
        ElementId::SIMPLE_BLOCK,
        &block_payload(1, 0, 0x02, &body),
    );
    let data = MkvBuilder::new()
        .track(TrackSpec::audio(1))
        .cluster(0, vec![block])
        .build();

    assert_matches!(
        demux_all(&data, DemuxConfig::default(), WHOLE),
        Err(DemuxError::Ebml(EbmlError::XiphLacing))
    );
}

#[test]
fn test_lace_count_over_ring_capacity_is_fatal() {
    let frames = vec![frame_bytes(0, 4); 3];
    let data = MkvBuilder::new()
        .track(TrackSpec::audio(1))
        .cluster(0, vec![fixed_laced_block(1, 0, &frames)])
        .build();
    let config = DemuxConfig {
        frame_ring_capacity: 2,
        ..DemuxConfig::default()
    };

    assert_matches!(
        demux_all(&data, config, WHOLE),
        Err(DemuxError::Ebml(EbmlError::TooManyFrames {
            count: 3,
            capacity: 2
        }))
    );
}

#[test]
fn test_oversized_block_is_rejected() {
    // SimpleBlock claiming 2^48 bytes with only its header present
    let mut block = encode_id(ElementId::SIMPLE_BLOCK.0);
    block.extend(encode_var_int(1 << 48, 8));
    block.extend(block_payload(1, 0, 0x80, &frame_bytes(0, 16)));
    let data = MkvBuilder::new()
        .track(TrackSpec::audio(1))
        .unknown_sizes()
        .cluster(0, vec![block])
        .build();

    let config = DemuxConfig::default();
    let limit = config.max_frame_size;
    assert_matches!(
        demux_all(&data, config, WHOLE),
        Err(DemuxError::ElementTooLarge { id, size, limit: l })
            if id == ElementId::SIMPLE_BLOCK && size == (1 << 48) - 4 && l == limit
    );
}

#[test]
fn test_read_requests_are_bounded() {
    let data = MkvBuilder::new()
        .track(TrackSpec::audio(1))
        .cluster(0, vec![simple_block(1, 0, true, &frame_bytes(3, 5000))])
        .build();
    let config = DemuxConfig {
        read_size: 512,
        max_read_size: 1024,
        ..DemuxConfig::default()
    };

    let mut sink = CollectingSink::new();
    let mut session = open_session(&data, config, WHOLE, &mut sink).unwrap();
    session.start(&[], None).unwrap();
    session.request_sample(1, &mut sink).unwrap();

    let mut largest = 0;
    while let Pump::Read(request) = session.pump(&mut sink).unwrap() {
        largest = largest.max(request.len);
        fulfil(&mut session, &data, request, WHOLE);
    }
    assert!(largest <= 1024, "read of {} bytes", largest);
    assert_eq!(sink.frames.len(), 1);
    assert_eq!(sink.frames[0].data.as_ref(), frame_bytes(3, 5000).as_slice());
    assert_eq!(sink.ended, vec![1]);
}

#[test]
fn test_block_group_frames() {
    let data = MkvBuilder::new()
        .track(TrackSpec::video(1, 320, 240))
        .cluster(
            0,
            vec![
                simple_block(1, 0, true, &frame_bytes(0, 50)),
                block_group(1, 40, &frame_bytes(1, 30)),
            ],
        )
        .build();

    let sink = demux_all(&data, DemuxConfig::default(), WHOLE).unwrap();
    let frames: Vec<(usize, bool, i64)> = sink
        .frames
        .iter()
        .map(|f| (f.byte_length, f.is_keyframe, f.timestamp_ticks))
        .collect();
    assert_eq!(frames, vec![(50, true, 0), (30, false, 40)]);
}

#[test]
fn test_unknown_size_segment_and_clusters() {
    let known = two_track_file(CuePlacement::None);
    let mut builder = MkvBuilder::new()
        .track(TrackSpec::video(1, 320, 240))
        .track(TrackSpec::audio(2))
        .unknown_sizes();
    for (i, timecode) in [0u64, 1000, 2000].into_iter().enumerate() {
        let seed = (i * 50) as u8;
        builder = builder.cluster(
            timecode,
            vec![
                simple_block(1, 0, true, &frame_bytes(seed, 300)),
                simple_block(2, 0, true, &frame_bytes(seed + 1, 40)),
                simple_block(1, 40, false, &frame_bytes(seed + 2, 120)),
                simple_block(2, 20, true, &frame_bytes(seed + 3, 40)),
            ],
        );
    }
    let unknown = builder.build();

    let expected = demux_all(&known, DemuxConfig::default(), WHOLE).unwrap();
    for chunk in [WHOLE, 11] {
        let sink = demux_all(&unknown, DemuxConfig::default(), chunk).unwrap();
        for track in [1, 2] {
            assert_eq!(track_frames(&sink, track), track_frames(&expected, track));
        }
    }
}

#[test]
fn test_large_void_is_jumped_over() {
    let data = MkvBuilder::new()
        .track(TrackSpec::audio(1))
        .void(20_000)
        .cluster(0, vec![simple_block(1, 0, true, &frame_bytes(9, 64))])
        .build();
    let config = DemuxConfig {
        read_size: 512,
        ..DemuxConfig::default()
    };

    let sink = demux_all(&data, config, WHOLE).unwrap();
    assert_eq!(sink.frames.len(), 1);
    assert_eq!(sink.frames[0].data.as_ref(), frame_bytes(9, 64).as_slice());
}

#[test]
fn test_pause_holds_delivery_until_resume() {
    let data = two_track_file(CuePlacement::None);
    let mut sink = CollectingSink::new();
    let mut session = open_session(&data, DemuxConfig::default(), WHOLE, &mut sink).unwrap();
    session.start(&[], None).unwrap();
    session.pause().unwrap();
    assert_eq!(session.state(), SourceState::Paused);

    session.request_sample(1, &mut sink).unwrap();
    while let Pump::Read(request) = session.pump(&mut sink).unwrap() {
        fulfil(&mut session, &data, request, WHOLE);
    }
    assert!(sink.frames.is_empty());
    assert!(session.stream(1).unwrap().queued() > 0);

    session.start(&[], None).unwrap();
    run_session(&mut session, &data, WHOLE, &mut sink).unwrap();
    assert_eq!(sink.frames.len(), 12);
}

#[test]
fn test_stop_rewinds_to_first_cluster() {
    let data = two_track_file(CuePlacement::Front);
    let mut sink = CollectingSink::new();
    let mut session = open_session(&data, DemuxConfig::default(), WHOLE, &mut sink).unwrap();

    session.start(&[], None).unwrap();
    run_session(&mut session, &data, WHOLE, &mut sink).unwrap();
    let first = std::mem::take(&mut sink.frames);
    assert_eq!(first.len(), 12);

    session.stop().unwrap();
    assert_eq!(session.state(), SourceState::Stopped);
    session.start(&[], None).unwrap();
    run_session(&mut session, &data, WHOLE, &mut sink).unwrap();
    for track in [1, 2] {
        let again: Vec<_> = sink.track_frames(track).cloned().collect();
        let before: Vec<_> = first.iter().filter(|f| f.track_number == track).cloned().collect();
        assert_eq!(again, before);
    }
}

#[test]
fn test_request_sample_errors() {
    let data = two_track_file(CuePlacement::None);
    let mut sink = CollectingSink::new();
    let mut session = open_session(&data, DemuxConfig::default(), WHOLE, &mut sink).unwrap();

    assert_matches!(
        session.pause(),
        Err(DemuxError::InvalidStateTransition {
            operation: "pause",
            state: SourceState::Stopped
        })
    );
    assert_matches!(session.start(&[9], None), Err(DemuxError::UnknownTrack(9)));

    session.start(&[1], None).unwrap();
    assert_matches!(session.request_sample(9, &mut sink), Err(DemuxError::UnknownTrack(9)));
    assert_matches!(session.request_sample(2, &mut sink), Err(DemuxError::TrackNotActive(2)));

    run_session(&mut session, &data, WHOLE, &mut sink).unwrap();
    assert_eq!(sink.ended, vec![1]);
    assert_matches!(session.request_sample(1, &mut sink), Err(DemuxError::EndOfStream(1)));

    session.shutdown().unwrap();
    assert_matches!(session.request_sample(1, &mut sink), Err(DemuxError::Shutdown));
    assert_matches!(session.stop(), Err(DemuxError::Shutdown));
}

#[test]
fn test_annexb_rewrite() {
    let data = MkvBuilder::new()
        .track(TrackSpec::video(1, 640, 480).with_codec_private(avcc()))
        .cluster(
            0,
            vec![
                simple_block(1, 0, true, &[0, 0, 0, 2, 0x65, 0x88]),
                simple_block(1, 40, false, &[0, 0, 0, 1, 0x41]),
            ],
        )
        .build();
    let config = DemuxConfig {
        annexb: true,
        ..DemuxConfig::default()
    };

    let sink = demux_all(&data, config, WHOLE).unwrap();
    assert_eq!(sink.frames.len(), 2);
    assert_eq!(
        sink.frames[0].data.as_ref(),
        &[0, 0, 0, 1, 0x67, 0x64, 0x1F, 0, 0, 0, 1, 0x68, 0xEE, 0, 0, 0, 1, 0x65, 0x88]
    );
    assert_eq!(sink.frames[0].byte_length, 6);
    assert_eq!(sink.frames[1].data.as_ref(), &[0, 0, 0, 1, 0x41]);

    // Disabled: bytes pass through untouched
    let sink = demux_all(&data, DemuxConfig::default(), WHOLE).unwrap();
    assert_eq!(sink.frames[0].data.as_ref(), &[0, 0, 0, 2, 0x65, 0x88]);
}

#[test]
fn test_streams_ready_fires_once() {
    let data = two_track_file(CuePlacement::Front);
    let mut sink = CollectingSink::new();
    let mut session = open_session(&data, DemuxConfig::default(), 3, &mut sink).unwrap();
    assert_eq!(session.state(), SourceState::Stopped);
    let metadata = sink.metadata.take().unwrap();
    assert_eq!(metadata.tracks.len(), 2);
    assert_eq!(metadata.cues.len(), 3);
    assert_eq!(metadata.segment_offset, MkvBuilder::new().segment_offset());

    session.start(&[], None).unwrap();
    run_session(&mut session, &data, 3, &mut sink).unwrap();
    assert!(sink.metadata.is_none());
}
