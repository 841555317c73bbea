/// Receives formatted elapsed-time ticks from a `Timer`.
pub trait TimerListener: Send + Sync {
    /// `elapsed` is `MM:SS:hh`, or `HH:MM:SS:hh` once an hour has passed.
    fn on_timer_tick(&self, elapsed: &str);
}
