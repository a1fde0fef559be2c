//! End-to-end reframing through the public API

use proptest::prelude::*;
use speechframe::sources::{FileSource, MemorySource};
use speechframe::{
    CodecVariant, CollectingSink, ControlEvent, FileConfig, FormatDetector, ProcessStatus, Reframer,
    ReframerConfig, SeekIndexBuilder, SpeechCodec, StreamState,
};

/// Stream of `codec` frames; `indicators` are raw indicator bytes.
fn stream(codec: CodecVariant, indicators: &[u8]) -> Vec<u8> {
    let mut bytes = codec.marker().to_vec();
    for (i, indicator) in indicators.iter().enumerate() {
        bytes.push(*indicator);
        let size = codec.frame_size(*indicator) as usize;
        bytes.extend((0..size).map(|j| ((i + j) % 251) as u8));
    }
    bytes
}

fn run<S: speechframe::ByteSource>(reframer: &mut Reframer, source: &mut S, sink: &mut CollectingSink) {
    loop {
        match reframer.process(source, sink).unwrap() {
            ProcessStatus::EndOfStream => return,
            ProcessStatus::Paused | ProcessStatus::Stopped => panic!("reframer stalled"),
            _ => {}
        }
    }
}

fn playing(config: ReframerConfig) -> Reframer {
    let mut reframer = Reframer::new(config);
    reframer.handle_event(ControlEvent::Play { start: 0.0 });
    reframer
}

#[test]
fn every_codec_reframes_its_own_storage_format() {
    let cases = [
        (CodecVariant::Amr, vec![0x3C, 0x04, 0x44, 0x3C], 8000, 160),
        (CodecVariant::AmrWb, vec![0x44, 0x04, 0x24], 16000, 320),
        (CodecVariant::Evrc, vec![0x04, 0x01, 0x03, 0x02], 8000, 160),
        (CodecVariant::Smv, vec![0x03, 0x04], 8000, 160),
    ];

    for (codec, indicators, rate, spf) in cases {
        let bytes = stream(codec, &indicators);
        let mut source = MemorySource::new(bytes.clone()).with_chunk_sizes(&[3, 17]);
        let mut sink = CollectingSink::new();
        let mut reframer = playing(ReframerConfig::default());
        run(&mut reframer, &mut source, &mut sink);

        assert_eq!(reframer.codec(), Some(&codec));
        assert_eq!(reframer.data_offset(), Some(codec.marker().len()));
        assert_eq!(sink.frames.len(), indicators.len(), "{codec:?}");
        assert_eq!(sink.concatenated(), bytes[codec.marker().len()..].to_vec(), "{codec:?}");

        let properties = sink.latest_properties().unwrap();
        assert_eq!(properties.codec, codec.name());
        assert_eq!(properties.sample_rate, rate);
        assert_eq!(properties.timescale, rate);
        assert_eq!(properties.channels, 1);
        for (i, frame) in sink.frames.iter().enumerate() {
            assert_eq!(frame.timestamp, (i as u32 * spf) as u64);
            assert_eq!(frame.duration, spf);
        }
        assert_eq!(sink.end_of_stream_count, 1);
    }
}

#[test]
fn detector_reports_header_lengths() {
    for codec in CodecVariant::ALL {
        let mut prefix = codec.marker().to_vec();
        prefix.resize(32, 0x3C);
        let (detected, offset) = FormatDetector::detect_codec(&prefix).unwrap();
        assert_eq!(detected, codec);
        assert_eq!(offset, codec.data_offset());
    }
    assert!(FormatDetector::detect_codec(b"#!AMR_MC1.0\n").is_err());
}

#[test]
fn file_source_seek_lands_on_target_frame() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("voice.awb");
    // 3 s of AMR-WB at 20 ms per frame
    std::fs::write(&path, stream(CodecVariant::AmrWb, &vec![0x44; 150]))?;

    let index = SeekIndexBuilder::new(0.5).build_from_path(&CodecVariant::AmrWb, &path, 9)?;
    assert!(index.is_complete());
    assert_eq!(index.total_frames(), 150);
    assert_eq!(index.total_duration().as_secs_f64(), 3.0);

    let mut source = FileSource::with_config(&path, &FileConfig { block_size: 100 })?;
    let mut sink = CollectingSink::new();
    let mut reframer = Reframer::new(ReframerConfig { index_window: 0.5, ..Default::default() });
    reframer.handle_event(ControlEvent::Play { start: 1.31 });
    run(&mut reframer, &mut source, &mut sink);

    assert_eq!(reframer.seek_index().map(|i| i.len()), Some(index.len()));
    let first = &sink.frames[0];
    assert!(first.is_first);
    // 1.31 s at 16 kHz
    assert!(first.contains(20960), "first frame at {}", first.timestamp);
    assert_eq!(sink.frames.len(), 150 - 65);
    assert_eq!(reframer.stream_state(), StreamState::Playing);
    Ok(())
}

#[test]
fn live_source_plays_from_wherever_it_is() {
    let bytes = stream(CodecVariant::Amr, &[0x3C; 10]);
    let mut source = MemorySource::new(bytes).with_chunk_sizes(&[32]).non_seekable();
    let mut sink = CollectingSink::new();
    let mut reframer = Reframer::new(ReframerConfig::default());
    reframer.handle_event(ControlEvent::Play { start: 5.0 });
    run(&mut reframer, &mut source, &mut sink);

    assert!(reframer.seek_index().is_none());
    assert_eq!(sink.frames.len(), 10);
    assert_eq!(sink.frames[0].timestamp, 0);
    assert_eq!(sink.latest_properties().unwrap().duration, None);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn output_does_not_depend_on_chunking(
        frame_types in prop::collection::vec(0u8..=8, 1..60),
        sizes in prop::collection::vec(1usize..200, 1..6),
    ) {
        let indicators: Vec<u8> = frame_types.iter().map(|ft| ft << 3 | 0x04).collect();
        let bytes = stream(CodecVariant::Amr, &indicators);

        let mut whole = CollectingSink::new();
        run(&mut playing(ReframerConfig::default()), &mut MemorySource::new(bytes.clone()), &mut whole);

        let mut chunked = CollectingSink::new();
        let mut source = MemorySource::new(bytes).with_chunk_sizes(&sizes);
        run(&mut playing(ReframerConfig::default()), &mut source, &mut chunked);

        prop_assert_eq!(whole.frames.len(), indicators.len());
        prop_assert_eq!(
            whole.frames.iter().map(|f| (f.timestamp, f.data.clone())).collect::<Vec<_>>(),
            chunked.frames.iter().map(|f| (f.timestamp, f.data.clone())).collect::<Vec<_>>()
        );
    }
}
