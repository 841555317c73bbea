use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::Parser;

use wav_capture_core::storage::file_name::recording_file_name;
use wav_capture_core::{
    AudioFormat, Recorder, RecorderConfiguration, RecorderError, RecorderListener, RecorderState, Timer,
    TimerListener,
};
use wav_capture_cpal::{CpalMicCapture, DeviceEnumerator};

/// Record the microphone to a WAV file.
#[derive(Parser, Debug)]
#[command(name = "wavrec", version, about)]
struct Args {
    /// Output file; the name may use letters, digits, '-' and '_'
    #[arg(short, long, default_value = "recording.wav")]
    output: PathBuf,

    /// Recording length in seconds, pauses excluded
    #[arg(short, long, default_value_t = 5.0)]
    seconds: f64,

    #[arg(long, default_value_t = 44_100)]
    sample_rate: u32,

    #[arg(long, default_value_t = 1)]
    channels: u16,

    /// 16 or 32
    #[arg(long, default_value_t = 16)]
    bits: u16,

    /// Input device name (see --list-devices)
    #[arg(short, long)]
    device: Option<String>,

    /// Opaque string stored with the result (e.g. a scanned code)
    #[arg(short, long)]
    tag: Option<String>,

    /// Pause after this many seconds of recording
    #[arg(long)]
    pause_at: Option<f64>,

    /// Pause length in seconds
    #[arg(long, default_value_t = 1.0)]
    pause_for: f64,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,
}

/// Writes the running clock on one stderr line.
struct ConsoleClock;

impl TimerListener for ConsoleClock {
    fn on_timer_tick(&self, elapsed: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", elapsed);
        let _ = stderr.flush();
    }
}

struct LogListener;

impl RecorderListener for LogListener {
    fn on_state_changed(&self, state: RecorderState) {
        log::debug!("Recorder is {}", state);
    }

    fn on_error(&self, error: &RecorderError) {
        log::error!("Recorder error: {}", error);
    }
}

fn output_path(output: &Path) -> Result<PathBuf> {
    let name = output
        .file_name()
        .and_then(|n| n.to_str())
        .context("output path has no file name")?;
    let name = recording_file_name(name)?;
    Ok(output.with_file_name(name))
}

fn seconds(value: f64, flag: &str) -> Result<Duration> {
    ensure!(value.is_finite() && value >= 0.0, "--{} must be a non-negative number", flag);
    Ok(Duration::from_secs_f64(value))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_devices {
        for device in DeviceEnumerator::new().list_input_devices()? {
            let marker = if device.is_default { " (default)" } else { "" };
            println!("{}{}", device.name, marker);
        }
        return Ok(());
    }

    let total = seconds(args.seconds, "seconds")?;
    let pause = match args.pause_at {
        Some(at) => Some((seconds(at, "pause-at")?, seconds(args.pause_for, "pause-for")?)),
        None => None,
    };

    let format = AudioFormat::new(args.sample_rate, args.channels, args.bits);
    format.validate().map_err(anyhow::Error::msg)?;
    let path = output_path(&args.output)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()
        .context("failed to build tokio runtime")?;

    let provider = match &args.device {
        Some(name) => CpalMicCapture::with_device(name.as_str()),
        None => CpalMicCapture::default_device(),
    };
    let mut recorder = Recorder::new(provider, RecorderConfiguration::new(&path).with_format(format));
    recorder.subscribe(Arc::new(LogListener));
    recorder.set_tag(args.tag.clone());

    let mut timer = Timer::new().with_runtime(runtime.handle().clone());
    timer.subscribe(Arc::new(ConsoleClock));

    log::info!("Recording {} from {}", path.display(), recorder.device_info().name);
    recorder.start()?;
    timer.start();

    match pause {
        Some((at, length)) if at < total => {
            thread::sleep(at);
            recorder.pause()?;
            timer.pause();
            log::info!("Paused for {:?}", length);
            thread::sleep(length);
            recorder.resume()?;
            timer.start();
            thread::sleep(total - at);
        }
        _ => thread::sleep(total),
    }

    timer.stop();
    let result = recorder.stop()?;
    eprintln!();

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
