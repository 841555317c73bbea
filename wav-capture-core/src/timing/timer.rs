use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::clock::{Clock, MonotonicClock};
use crate::traits::timer_listener::TimerListener;

/// Cadence of the periodic tick.
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Format elapsed time as `MM:SS:hh`, or `HH:MM:SS:hh` once an hour has
/// passed. `hh` is hundredths of a second.
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    let hundredths = (millis / 10) % 100;
    let seconds = (millis / 1_000) % 60;
    let minutes = (millis / 60_000) % 60;
    let hours = millis / 3_600_000;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}:{:02}", hours, minutes, seconds, hundredths)
    } else {
        format!("{:02}:{:02}:{:02}", minutes, seconds, hundredths)
    }
}

#[derive(Debug, Default)]
struct TimerState {
    epoch: Option<Duration>,
    paused_at: Option<Duration>,
    running: bool,
}

struct TimerInner {
    clock: Arc<dyn Clock>,
    state: Mutex<TimerState>,
    listeners: RwLock<Vec<Arc<dyn TimerListener>>>,
}

impl TimerInner {
    fn elapsed(&self) -> Duration {
        let state = self.state.lock();
        let Some(epoch) = state.epoch else {
            return Duration::ZERO;
        };
        let end = state.paused_at.unwrap_or_else(|| self.clock.now());
        end.saturating_sub(epoch)
    }

    fn tick(&self) -> String {
        let text = format_elapsed(self.elapsed());
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.on_timer_tick(&text);
        }
        text
    }
}

/// Elapsed-time tracker that excludes paused intervals.
///
/// Runs independently of the recorder; callers start and stop both in
/// lockstep. With a runtime handle attached, a tokio task ticks every
/// [`TICK_INTERVAL`] while running. Without one, the caller's own loop
/// calls [`Timer::tick`].
pub struct Timer {
    inner: Arc<TimerInner>,
    runtime: Option<Handle>,
    ticker: Option<JoinHandle<()>>,
}

impl Timer {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(TimerInner {
                clock,
                state: Mutex::new(TimerState::default()),
                listeners: RwLock::new(Vec::new()),
            }),
            runtime: None,
            ticker: None,
        }
    }

    /// Drive periodic ticks from a task on `runtime`.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn subscribe(&self, listener: Arc<dyn TimerListener>) {
        self.inner.listeners.write().push(listener);
    }

    /// Start or continue timing. After `pause()`, the epoch moves forward by
    /// the paused interval.
    pub fn start(&mut self) {
        {
            let mut state = self.inner.state.lock();
            if state.running {
                return;
            }
            let now = self.inner.clock.now();
            match (state.epoch, state.paused_at.take()) {
                (Some(epoch), Some(paused_at)) => {
                    state.epoch = Some(epoch + now.saturating_sub(paused_at));
                }
                (Some(_), None) => {}
                (None, _) => state.epoch = Some(now),
            }
            state.running = true;
        }
        self.spawn_ticker();
    }

    /// Freeze elapsed time and halt ticks.
    pub fn pause(&mut self) {
        {
            let mut state = self.inner.state.lock();
            if !state.running {
                return;
            }
            state.paused_at = Some(self.inner.clock.now());
            state.running = false;
        }
        self.cancel_ticker();
    }

    /// Halt ticks and reset elapsed time to zero.
    pub fn stop(&mut self) {
        *self.inner.state.lock() = TimerState::default();
        self.cancel_ticker();
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.elapsed()
    }

    /// Format the elapsed time, deliver it to every listener, and return it.
    pub fn tick(&self) -> String {
        self.inner.tick()
    }

    fn spawn_ticker(&mut self) {
        let Some(runtime) = &self.runtime else {
            return;
        };
        let inner = Arc::clone(&self.inner);
        self.ticker = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                inner.tick();
            }
        }));
    }

    fn cancel_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Ticks {
        count: AtomicUsize,
        last: Mutex<String>,
    }

    impl TimerListener for Ticks {
        fn on_timer_tick(&self, elapsed: &str) {
            self.count.fetch_add(1, Ordering::SeqCst);
            *self.last.lock() = elapsed.to_string();
        }
    }

    fn manual_timer() -> (Timer, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (Timer::with_clock(clock.clone()), clock)
    }

    #[test]
    fn paused_interval_is_excluded() {
        let (mut timer, clock) = manual_timer();
        let ticks = Arc::new(Ticks::default());
        timer.subscribe(ticks.clone());

        timer.start();
        clock.advance(Duration::from_millis(500));
        timer.pause();
        clock.advance(Duration::from_millis(1_000));
        timer.start();

        assert_eq!(timer.elapsed(), Duration::from_millis(500));
        assert_eq!(timer.tick(), "00:00:50");
        assert_eq!(*ticks.last.lock(), "00:00:50");

        clock.advance(Duration::from_millis(250));
        assert_eq!(timer.elapsed(), Duration::from_millis(750));
    }

    #[test]
    fn elapsed_is_frozen_while_paused() {
        let (mut timer, clock) = manual_timer();
        timer.start();
        clock.advance(Duration::from_secs(3));
        timer.pause();
        clock.advance(Duration::from_secs(10));
        assert_eq!(timer.elapsed(), Duration::from_secs(3));
        assert!(!timer.is_running());
    }

    #[test]
    fn stop_resets_to_zero() {
        let (mut timer, clock) = manual_timer();
        timer.start();
        clock.advance(Duration::from_secs(2));
        timer.stop();
        assert_eq!(timer.elapsed(), Duration::ZERO);
        assert_eq!(timer.tick(), "00:00:00");

        timer.start();
        clock.advance(Duration::from_millis(10));
        assert_eq!(timer.elapsed(), Duration::from_millis(10));
    }

    #[test]
    fn repeated_start_keeps_epoch() {
        let (mut timer, clock) = manual_timer();
        timer.start();
        clock.advance(Duration::from_secs(1));
        timer.start();
        assert_eq!(timer.elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn formats_minutes_seconds_hundredths() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_millis(1_239)), "00:01:23");
        assert_eq!(format_elapsed(Duration::from_millis(754_990)), "12:34:99");
    }

    #[test]
    fn formats_hours_when_present() {
        assert_eq!(format_elapsed(Duration::from_millis(3_600_000)), "01:00:00:00");
        assert_eq!(format_elapsed(Duration::from_millis(3_723_450)), "01:02:03:45");
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_runs_only_while_started() {
        let mut timer = Timer::new().with_runtime(Handle::current());
        let ticks = Arc::new(Ticks::default());
        timer.subscribe(ticks.clone());

        timer.start();
        tokio::time::sleep(Duration::from_millis(95)).await;
        let running = ticks.count.load(Ordering::SeqCst);
        assert!(running >= 5, "only {} ticks", running);

        timer.pause();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ticks.count.load(Ordering::SeqCst), running);

        timer.start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(ticks.count.load(Ordering::SeqCst) > running);
        timer.stop();
    }
}
