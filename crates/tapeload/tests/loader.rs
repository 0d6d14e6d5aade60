//! Recordings to files, through the public API

use std::fs;

use tapeload::{
    checksum, Channel, InterleavedSamples, LoaderEvent, Outcome, SampleSource, TapeLoaderBuilder,
};

const PERIOD: u32 = 8;
const AMPLITUDE: i32 = 12000;

const RADIO: &[u8] = &[
    0x00, 0x00, 0xE6, 0x40, 0x00, 0x40, 0x02, 0x10, 0x20, 0x30, 0x00, 0x00, 0xE6, 0x30, 0x60,
];

const PROGRAM: &[u8] = b"10 PRINT \"HI\"\r20 GOTO 10\r";

fn orion_file(name: &[u8; 8], base: u16, payload: &[u8]) -> Vec<u8> {
    let end = base + payload.len() as u16 - 1;
    let crc = checksum(payload);

    let mut out = vec![0x00, 0x00, 0xE6];
    out.extend_from_slice(name);
    out.extend_from_slice(&[0x00; 8]);
    out.extend_from_slice(&[0x00, 0x00, 0xE6]);
    out.extend_from_slice(&base.to_be_bytes());
    out.extend_from_slice(&end.to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&[0x00, 0x00, 0xE6]);
    out.extend_from_slice(&crc.to_be_bytes());
    out
}

// lead-in tone, start bit, then one or two pulses per bit
fn record(bytes: &[u8], tone: usize, out: &mut Vec<u32>) {
    out.extend(std::iter::repeat(PERIOD).take(tone));
    out.push(2 * PERIOD);

    let mut prev = true;
    for byte in bytes {
        for i in (0..8).rev() {
            let bit = (byte >> i) & 0x01 == 0x01;
            if bit == prev {
                out.extend_from_slice(&[PERIOD, PERIOD]);
            } else {
                out.push(2 * PERIOD);
            }
            prev = bit;
        }
    }
}

fn square_wave(durations: &[u32]) -> Vec<i32> {
    let mut out = vec![];
    let mut level = AMPLITUDE;
    for &d in durations {
        out.extend(std::iter::repeat(level).take(d as usize));
        level = -level;
    }
    out
}

fn two_files() -> Vec<i32> {
    let mut durations = vec![PERIOD; 3];
    record(RADIO, 64, &mut durations);
    durations.push(5 * PERIOD);
    record(&orion_file(b"DEMOPROG", 0x2000, PROGRAM), 64, &mut durations);
    square_wave(&durations)
}

#[test]
fn test_load_and_save() {
    // signal on the right channel only
    let mut source =
        InterleavedSamples::stereo(two_files().into_iter().map(|sa| (sa / 50, sa)));

    let mut loader = TapeLoaderBuilder::default()
        .with_channel(Channel::Right)
        .build();
    let durations = loader.segment(&mut source).expect("memory source");
    assert_eq!(durations.sum(), source.len() as u64);

    let dir = tempfile::tempdir().expect("tempdir");
    let mut found = 0;
    let mut saved = vec![];
    for evt in loader.iter(&durations) {
        println!("{}", evt);
        match evt {
            LoaderEvent::ToneFound(_) => found += 1,
            LoaderEvent::ModulationError(mark) => panic!("modulation error at {}", mark),
            LoaderEvent::File(file) => {
                assert_eq!(file.outcome(), Outcome::Ok);
                if let Some(path) = file.save(dir.path()).expect("save file") {
                    saved.push(path);
                }
            }
            _ => {}
        }
    }

    assert_eq!(found, 2);
    assert_eq!(
        saved,
        vec![dir.path().join("3060.rk"), dir.path().join("DEMOPROG")]
    );
    assert_eq!(fs::read(&saved[0]).expect("read"), vec![0x10, 0x20, 0x30]);
    assert_eq!(fs::read(&saved[1]).expect("read"), PROGRAM.to_vec());
}

#[test]
fn test_wrong_channel_finds_nothing() {
    let mut source = InterleavedSamples::stereo(two_files().into_iter().map(|sa| (0, sa)));
    assert_eq!(source.layout().channels(), 2);

    let mut loader = TapeLoaderBuilder::default().build();
    let durations = loader.segment(&mut source).expect("memory source");
    assert_eq!(durations.len(), 1);
    assert_eq!(loader.iter(&durations).count(), 0);
}

#[cfg(feature = "wav")]
#[test]
fn test_wav_source() {
    use tapeload::{SourceError, WavSource};

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tape.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
    for sa in two_files() {
        writer.write_sample(sa as i16).expect("write sample");
    }
    writer.finalize().expect("finalize wav");

    let mut source = WavSource::open(&path).expect("open wav");
    let mut loader = TapeLoaderBuilder::default().build();
    let durations = loader.segment(&mut source).expect("read wav");
    let ok: Vec<String> = loader
        .iter(&durations)
        .filter_map(LoaderEvent::into_file)
        .filter(|f| f.outcome().is_ok())
        .filter_map(|f| f.name().map(str::to_owned))
        .collect();
    assert_eq!(ok, vec!["3060.rk", "DEMOPROG"]);

    // floating-point samples are refused
    let float_path = dir.path().join("float.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&float_path, spec).expect("create wav");
    writer.write_sample(0.5f32).expect("write sample");
    writer.finalize().expect("finalize wav");
    assert!(matches!(
        WavSource::open(&float_path),
        Err(SourceError::SampleFormat)
    ));
}
