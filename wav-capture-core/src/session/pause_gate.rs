use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct GateState {
    paused: bool,
    released: bool,
}

/// Pause flag shared by the caller thread and the capture loop.
///
/// Every read and write of the flag happens under the gate's mutex, and
/// waiters are woken through the condition variable, so a resume issued
/// between a check and a wait cannot be missed.
#[derive(Debug, Default)]
pub struct PauseGate {
    state: Mutex<GateState>,
    condvar: Condvar,
}

impl PauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the gate was already paused.
    pub fn pause(&self) -> bool {
        let mut state = self.state.lock();
        if state.paused {
            return false;
        }
        state.paused = true;
        true
    }

    /// Returns `false` if the gate was not paused.
    pub fn resume(&self) -> bool {
        let mut state = self.state.lock();
        if !state.paused {
            return false;
        }
        state.paused = false;
        self.condvar.notify_all();
        true
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Block while paused. Returns `true` once the gate is open, or `false`
    /// if it was released for shutdown.
    pub fn wait_while_paused(&self) -> bool {
        let mut state = self.state.lock();
        while state.paused && !state.released {
            self.condvar.wait(&mut state);
        }
        !state.released
    }

    /// Wake every waiter for shutdown. Later waits return immediately.
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.released = true;
        self.condvar.notify_all();
    }
}
