use std::fs::File;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use wav_capture_core::processing::wav_format;
use wav_capture_core::storage::file_name::recording_path;
use wav_capture_core::{
    AudioFormat, ChannelCaptureProvider, ManualClock, Recorder, RecorderConfiguration, RecorderListener,
    RecorderState, Timer, TimerListener,
};

fn wait_until(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(2));
    }
}

#[derive(Default)]
struct Amplitudes(Mutex<Vec<f32>>);

impl RecorderListener for Amplitudes {
    fn on_amplitude(&self, amplitude: f32) {
        self.0.lock().push(amplitude);
    }
}

#[derive(Default)]
struct LastTick(Mutex<String>);

impl TimerListener for LastTick {
    fn on_timer_tick(&self, elapsed: &str) {
        *self.0.lock() = elapsed.to_string();
    }
}

#[test]
fn stereo_32_bit_recording_is_readable_by_hound() {
    let dir = tempfile::tempdir().unwrap();
    let path = recording_path(dir.path(), "stereo-take").unwrap();
    let format = AudioFormat::new(48_000, 2, 32);

    // 10 ms of interleaved frames; the left channel carries a ramp.
    let frames = 480;
    let samples: Vec<i32> = (0..frames)
        .flat_map(|i| [(i as i32) << 20, -((i as i32) << 16)])
        .collect();
    let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

    let (provider, feed) = ChannelCaptureProvider::new(960);
    let mut recorder = Recorder::new(provider, RecorderConfiguration::new(&path).with_format(format));
    let amplitudes = Arc::new(Amplitudes::default());
    recorder.subscribe(amplitudes.clone());
    recorder.set_tag(Some("1FTFW1ET5DFC10312".into()));

    recorder.start().unwrap();
    feed.push(pcm.clone());
    wait_until(|| recorder.bytes_written() == pcm.len() as u64);
    let result = recorder.stop().unwrap();

    assert_eq!(recorder.state(), RecorderState::Stopped);
    assert_eq!(result.file_name().as_deref(), Some("stereo-take.wav"));
    assert_eq!(result.tag.as_deref(), Some("1FTFW1ET5DFC10312"));
    assert_eq!(result.format, format);
    assert!((result.duration_secs - 0.01).abs() < 1e-9);

    let header = wav_format::read_header(&mut File::open(&path).unwrap()).unwrap();
    assert_eq!(header.data_size as usize, pcm.len());
    assert_eq!(header.format(), format);
    assert_eq!(header.duration(), Duration::from_millis(10));

    let mut reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().bits_per_sample, 32);
    let decoded: Vec<i32> = reader.samples::<i32>().map(|s| s.unwrap()).collect();
    assert_eq!(decoded, samples);

    // 960-byte reads are 120 frames; the last left sample of each read is the peak.
    let amplitudes = amplitudes.0.lock().clone();
    assert_eq!(amplitudes.len(), 4);
    assert!(amplitudes.windows(2).all(|w| w[0] < w[1]));
    let expected_last = ((frames as i32 - 1) << 20) as f32 / 2_147_483_648.0;
    assert!((amplitudes[3] - expected_last).abs() < 1e-6);
}

#[test]
fn timer_and_recorder_run_in_lockstep() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new());
    let mut timer = Timer::with_clock(clock.clone());
    let tick = Arc::new(LastTick::default());
    timer.subscribe(tick.clone());

    let (provider, feed) = ChannelCaptureProvider::new(4_410);
    let mut recorder = Recorder::new(provider, RecorderConfiguration::new(dir.path().join("lockstep.wav")));

    recorder.start().unwrap();
    timer.start();
    feed.push(vec![0u8; 4_410]);
    wait_until(|| recorder.bytes_written() == 4_410);
    clock.advance(Duration::from_millis(50));

    recorder.pause().unwrap();
    timer.pause();
    clock.advance(Duration::from_secs(3));

    recorder.resume().unwrap();
    timer.start();
    feed.push(vec![0u8; 4_410]);
    wait_until(|| recorder.bytes_written() == 8_820);
    clock.advance(Duration::from_millis(50));
    timer.tick();

    let result = recorder.stop().unwrap();
    timer.stop();

    assert_eq!(*tick.0.lock(), "00:00:10");
    assert_eq!(recorder.recorded_duration(), Duration::from_millis(100));
    assert!((result.duration_secs - 0.1).abs() < 1e-9);
}
