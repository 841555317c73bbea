use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::{Mutex, RwLock};

use crate::models::audio_models::CaptureDevice;
use crate::models::config::{PausePolicy, RecorderConfiguration};
use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::RecorderState;
use crate::processing::amplitude::AmplitudePolicy;
use crate::processing::waveform_buffer::SharedWaveform;
use crate::session::pause_gate::PauseGate;
use crate::storage::wav_writer::WavFileWriter;
use crate::traits::capture_provider::{CaptureProvider, CaptureStream};
use crate::traits::recorder_listener::RecorderListener;

/// State shared by the recorder and every capture thread it spawns.
struct Shared {
    state: Mutex<RecorderState>,
    /// Held across a state change and its notification, so listeners see
    /// transitions in the order they happened.
    transitions: Mutex<()>,
    listeners: RwLock<Vec<Arc<dyn RecorderListener>>>,
    waveform: Arc<SharedWaveform>,
    tag: Mutex<Option<String>>,
}

impl Shared {
    fn state(&self) -> RecorderState {
        *self.state.lock()
    }

    fn listeners(&self) -> Vec<Arc<dyn RecorderListener>> {
        self.listeners.read().clone()
    }

    fn transition(&self, to: RecorderState) {
        let _serial = self.transitions.lock();
        *self.state.lock() = to;
        self.notify_state(to);
    }

    fn notify_state(&self, state: RecorderState) {
        for listener in self.listeners() {
            listener.on_state_changed(state);
        }
    }

    fn notify_error(&self, error: &RecorderError) {
        for listener in self.listeners() {
            listener.on_error(error);
        }
    }

    fn announce(&self, outcome: &Result<RecordingResult, RecorderError>) {
        match outcome {
            Ok(result) => {
                for listener in self.listeners() {
                    listener.on_recording_finished(result);
                }
            }
            Err(e) => self.notify_error(e),
        }
    }
}

/// The sink of one capture run. Dropped by finalization.
struct RecordingSession {
    writer: WavFileWriter,
}

/// Per-session control block shared with that session's capture thread.
///
/// A fresh block per session keeps a detached capture thread from an
/// earlier session away from the current sink and gate.
struct ActiveSession {
    gate: PauseGate,
    stop_requested: AtomicBool,
    session: Mutex<Option<RecordingSession>>,
    written_bytes: AtomicU64,
    discarded_bytes: AtomicU64,
    /// Outcome of a finalization performed by the capture thread itself.
    outcome: Mutex<Option<Result<RecordingResult, RecorderError>>>,
}

impl ActiveSession {
    fn new(writer: WavFileWriter) -> Self {
        Self {
            gate: PauseGate::new(),
            stop_requested: AtomicBool::new(false),
            session: Mutex::new(Some(RecordingSession { writer })),
            written_bytes: AtomicU64::new(0),
            discarded_bytes: AtomicU64::new(0),
            outcome: Mutex::new(None),
        }
    }

    fn bytes_written(&self) -> u64 {
        self.written_bytes.load(Ordering::Acquire)
    }

    fn write_chunk(&self, chunk: &[u8]) -> Result<WriteOutcome, RecorderError> {
        let mut guard = self.session.lock();
        let Some(session) = guard.as_mut() else {
            return Ok(WriteOutcome::Closed);
        };
        if chunk.len() as u64 > session.writer.remaining_capacity() {
            return Ok(WriteOutcome::Full);
        }
        session.writer.write(chunk)?;
        self.written_bytes
            .store(session.writer.data_bytes(), Ordering::Release);
        Ok(WriteOutcome::Written)
    }

    /// Close the sink and move to `Stopped`. Returns `None` if another
    /// caller already finalized this session.
    fn finalize(&self, shared: &Shared, mode: Finalize) -> Option<Result<RecordingResult, RecorderError>> {
        let session = self.session.lock().take()?;
        let writer = session.writer;
        let file_path = writer.file_path().to_path_buf();
        let format = writer.format();
        let data_bytes = writer.data_bytes();

        let outcome = match mode {
            Finalize::Patch => writer.finish().map(|checksum| {
                RecordingResult::new(file_path.clone(), format, data_bytes, checksum, shared.tag.lock().clone())
            }),
            Finalize::Abandon(error) => {
                writer.abandon();
                log::warn!("Left {} unpatched after a write failure", file_path.display());
                Err(error)
            }
        };

        match &outcome {
            Ok(result) => log::info!(
                "Recording finalized: {} ({} bytes, {:.2}s)",
                result.file_path.display(),
                result.data_bytes,
                result.duration_secs
            ),
            Err(e) => log::error!("Recording {} failed to finalize: {}", file_path.display(), e),
        }

        shared.transition(RecorderState::Stopped);
        Some(outcome)
    }
}

enum WriteOutcome {
    Written,
    Full,
    Closed,
}

enum Finalize {
    Patch,
    Abandon(RecorderError),
}

/// Why a capture loop returned.
#[derive(Debug)]
enum LoopExit {
    Stopped,
    DataLimitReached,
    SourceFailed(RecorderError),
    SinkFailed(RecorderError),
}

struct CaptureThread {
    handle: thread::JoinHandle<()>,
    done: Receiver<()>,
}

/// Real-time PCM recorder.
///
/// Owns the capture provider, a background capture thread, the pause gate
/// and the output file of the current session. Data flow:
/// ```text
/// [CaptureStream] → read chunk → [PauseGate] → [WavFileWriter]
///                                      └──────→ [AmplitudePolicy] → [SharedWaveform] → listeners
/// ```
pub struct Recorder<P: CaptureProvider> {
    provider: P,
    config: RecorderConfiguration,
    shared: Arc<Shared>,
    active: Option<Arc<ActiveSession>>,
    capture_thread: Option<CaptureThread>,
}

impl<P: CaptureProvider> Recorder<P> {
    pub fn new(provider: P, config: RecorderConfiguration) -> Self {
        let waveform = Arc::new(SharedWaveform::new(config.waveform_capacity));
        Self {
            provider,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(RecorderState::Idle),
                transitions: Mutex::new(()),
                listeners: RwLock::new(Vec::new()),
                waveform,
                tag: Mutex::new(None),
            }),
            active: None,
            capture_thread: None,
        }
    }

    /// Register a listener. Listeners are never removed.
    ///
    /// `on_state_changed` runs while transitions are serialized; it must not
    /// call `start`, `pause`, `resume` or `stop`.
    pub fn subscribe(&self, listener: Arc<dyn RecorderListener>) {
        self.shared.listeners.write().push(listener);
    }

    pub fn state(&self) -> RecorderState {
        self.shared.state()
    }

    /// True while a session is open, paused or not.
    pub fn is_recording(&self) -> bool {
        self.state().is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.state().is_paused()
    }

    pub fn output_file_path(&self) -> &Path {
        &self.config.output_path
    }

    /// Point the next session at a different file.
    pub fn set_output_path(&mut self, path: impl Into<PathBuf>) -> Result<(), RecorderError> {
        let state = self.state();
        if state.is_active() {
            return Err(RecorderError::invalid_state("change the output path", state));
        }
        self.config.output_path = path.into();
        Ok(())
    }

    /// Attach an opaque caller string (e.g. a scanned code) to the current
    /// or next recording. Carried into `RecordingResult::tag` uninterpreted.
    pub fn set_tag(&self, tag: Option<String>) {
        *self.shared.tag.lock() = tag;
    }

    pub fn tag(&self) -> Option<String> {
        self.shared.tag.lock().clone()
    }

    pub fn config(&self) -> &RecorderConfiguration {
        &self.config
    }

    pub fn device_info(&self) -> CaptureDevice {
        self.provider.device_info()
    }

    /// Live waveform, shared with the capture thread.
    pub fn waveform(&self) -> Arc<SharedWaveform> {
        Arc::clone(&self.shared.waveform)
    }

    /// PCM bytes written to the current (or last) session's file.
    pub fn bytes_written(&self) -> u64 {
        self.active.as_ref().map(|a| a.bytes_written()).unwrap_or(0)
    }

    /// Bytes read from the source and dropped while paused.
    pub fn bytes_discarded(&self) -> u64 {
        self.active
            .as_ref()
            .map(|a| a.discarded_bytes.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Playback length of the audio written so far.
    pub fn recorded_duration(&self) -> Duration {
        self.config.format.bytes_to_duration(self.bytes_written())
    }

    /// Start a new session. Transitions: idle/stopped → recording.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        let state = self.state();
        if !state.can_start() {
            return Err(RecorderError::invalid_state("start", state));
        }
        self.reap_capture_thread();

        self.config.validate().map_err(RecorderError::Initialization)?;
        let format = self.config.format;

        if !self.provider.is_available() {
            return Err(RecorderError::Initialization(format!(
                "capture device {:?} is not available",
                self.provider.device_info().name
            )));
        }

        let min_buffer_size = self.provider.min_buffer_size(&format)?;
        if min_buffer_size == 0 {
            return Err(RecorderError::Initialization(
                "capture device reported a zero buffer size".into(),
            ));
        }
        let buffer_size = format.align_to_frames(min_buffer_size);

        let mut stream = self.provider.open(&format, buffer_size)?;

        let writer = match WavFileWriter::create(&self.config.output_path, format) {
            Ok(writer) => writer,
            Err(e) => {
                stream.close();
                return Err(e);
            }
        };

        let active = Arc::new(ActiveSession::new(writer));
        self.shared.waveform.clear();
        // A capture thread that fails right away waits here before
        // publishing `Stopped`.
        let serial = self.shared.transitions.lock();
        *self.shared.state.lock() = RecorderState::Recording;

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let shared = Arc::clone(&self.shared);
        let session = Arc::clone(&active);
        let amplitude = AmplitudePolicy::for_format(&format);
        let pause_policy = self.config.pause_policy;

        let spawned = thread::Builder::new()
            .name("pcm-capture".into())
            .spawn(move || {
                let exit = run_capture_loop(&shared, &session, stream, buffer_size, amplitude, pause_policy);
                handle_loop_exit(&shared, &session, exit);
                let _ = done_tx.send(());
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                if let Some(session) = active.session.lock().take() {
                    let path = session.writer.file_path().to_path_buf();
                    session.writer.abandon();
                    let _ = fs::remove_file(path);
                }
                *self.shared.state.lock() = state;
                return Err(RecorderError::Initialization(format!(
                    "failed to spawn capture thread: {}",
                    e
                )));
            }
        };

        log::info!(
            "Recording started: {} ({} Hz, {} ch, {}-bit, {} byte reads)",
            self.config.output_path.display(),
            format.sample_rate,
            format.channels,
            format.bits_per_sample,
            buffer_size
        );

        self.active = Some(active);
        self.capture_thread = Some(CaptureThread { handle, done: done_rx });
        self.shared.notify_state(RecorderState::Recording);
        drop(serial);
        Ok(())
    }

    /// Pause writing. Transitions: recording → paused.
    pub fn pause(&mut self) -> Result<(), RecorderError> {
        let _serial = self.shared.transitions.lock();
        {
            let mut state = self.shared.state.lock();
            let active = match (&self.active, *state) {
                (Some(active), RecorderState::Recording) => active,
                (_, current) => return Err(RecorderError::invalid_state("pause", current)),
            };
            active.gate.pause();
            *state = RecorderState::Paused;
        }
        log::debug!("Recording paused");
        self.shared.notify_state(RecorderState::Paused);
        Ok(())
    }

    /// Resume writing. Transitions: paused → recording.
    pub fn resume(&mut self) -> Result<(), RecorderError> {
        let _serial = self.shared.transitions.lock();
        {
            let mut state = self.shared.state.lock();
            let active = match (&self.active, *state) {
                (Some(active), RecorderState::Paused) => active,
                (_, current) => return Err(RecorderError::invalid_state("resume", current)),
            };
            active.gate.resume();
            *state = RecorderState::Recording;
        }
        log::debug!("Recording resumed");
        self.shared.notify_state(RecorderState::Recording);
        Ok(())
    }

    /// Stop the capture loop, patch the header, and return the result.
    /// Transitions: recording/paused → stopped.
    pub fn stop(&mut self) -> Result<RecordingResult, RecorderError> {
        let state = self.state();
        let Some(active) = self.active.clone().filter(|_| state.is_active()) else {
            return Err(RecorderError::invalid_state("stop", state));
        };

        active.stop_requested.store(true, Ordering::SeqCst);
        active.gate.release();
        self.await_capture_thread();

        match active.finalize(&self.shared, Finalize::Patch) {
            Some(outcome) => {
                self.shared.announce(&outcome);
                outcome
            }
            // The capture thread finalized the session on its own.
            None => active
                .outcome
                .lock()
                .take()
                .unwrap_or_else(|| Err(RecorderError::invalid_state("stop", self.state()))),
        }
    }

    /// Wait for the capture thread, bounded by `stop_timeout`.
    fn await_capture_thread(&mut self) {
        let Some(thread) = self.capture_thread.take() else {
            return;
        };
        match thread.done.recv_timeout(self.config.stop_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if thread.handle.join().is_err() {
                    log::error!("Capture thread panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Capture thread did not exit within {:?}; detaching it",
                    self.config.stop_timeout
                );
            }
        }
    }

    /// Join a capture thread that already ended on its own.
    fn reap_capture_thread(&mut self) {
        if self.capture_thread.is_some() {
            self.await_capture_thread();
        }
        self.active = None;
    }
}

impl<P: CaptureProvider> Drop for Recorder<P> {
    fn drop(&mut self) {
        if self.state().is_active() {
            if let Err(e) = self.stop() {
                log::error!("Failed to stop recorder on drop: {}", e);
            }
        }
    }
}

/// Body of the capture thread.
fn run_capture_loop(
    shared: &Shared,
    session: &ActiveSession,
    mut stream: Box<dyn CaptureStream>,
    buffer_size: usize,
    amplitude: AmplitudePolicy,
    pause_policy: PausePolicy,
) -> LoopExit {
    let mut buffer = vec![0u8; buffer_size];

    let exit = loop {
        if session.stop_requested.load(Ordering::SeqCst) {
            break LoopExit::Stopped;
        }
        if pause_policy == PausePolicy::BlockSource && !session.gate.wait_while_paused() {
            break LoopExit::Stopped;
        }

        let read = match stream.read(&mut buffer) {
            Ok(read) => read.min(buffer.len()),
            Err(e) => break LoopExit::SourceFailed(e),
        };
        if session.stop_requested.load(Ordering::SeqCst) {
            break LoopExit::Stopped;
        }
        if read == 0 {
            continue;
        }
        if session.gate.is_paused() {
            session.discarded_bytes.fetch_add(read as u64, Ordering::Relaxed);
            continue;
        }

        let chunk = &buffer[..read];
        match session.write_chunk(chunk) {
            Ok(WriteOutcome::Written) => {}
            Ok(WriteOutcome::Full) => break LoopExit::DataLimitReached,
            Ok(WriteOutcome::Closed) => break LoopExit::Stopped,
            Err(e) => break LoopExit::SinkFailed(e),
        }

        let level = amplitude.analyze(chunk);
        shared.waveform.push(level);
        for listener in shared.listeners() {
            listener.on_audio_buffer_available(chunk);
            listener.on_amplitude(level);
        }
    };

    stream.close();
    exit
}

/// Finalize a session whose loop ended without `stop()`.
fn handle_loop_exit(shared: &Shared, session: &ActiveSession, exit: LoopExit) {
    let (mode, fault) = match exit {
        LoopExit::Stopped => return,
        LoopExit::DataLimitReached => {
            log::warn!("WAV data limit reached; ending the recording");
            (Finalize::Patch, None)
        }
        LoopExit::SourceFailed(e) => {
            log::error!("Capture source failed: {}", e);
            (Finalize::Patch, Some(e))
        }
        LoopExit::SinkFailed(e) => {
            log::error!("Failed to write audio data: {}", e);
            (Finalize::Abandon(e.clone()), Some(e))
        }
    };

    if let Some(fault) = &fault {
        shared.notify_error(fault);
    }
    let Some(outcome) = session.finalize(shared, mode) else {
        return;
    };
    match (&outcome, fault) {
        // The write error was already reported above.
        (Err(_), Some(_)) => {}
        _ => shared.announce(&outcome),
    }
    *session.outcome.lock() = Some(outcome);
}
