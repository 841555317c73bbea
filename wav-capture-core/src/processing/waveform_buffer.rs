use parking_lot::Mutex;

/// Fixed-capacity circular buffer of recent amplitude values.
///
/// `push` overwrites the slot at the cursor and advances it, so the buffer
/// always holds the last `capacity` values with zeros before the first
/// wrap. Wrap in `SharedWaveform` for cross-thread access.
#[derive(Debug, Clone)]
pub struct WaveformRingBuffer {
    slots: Vec<f32>,
    cursor: usize,
}

impl WaveformRingBuffer {
    /// Capacity is clamped to at least one slot.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![0.0; capacity.max(1)],
            cursor: 0,
        }
    }

    pub fn push(&mut self, amplitude: f32) {
        self.slots[self.cursor] = amplitude;
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// All slots, oldest first.
    pub fn snapshot(&self) -> Vec<f32> {
        let mut ordered = Vec::with_capacity(self.slots.len());
        ordered.extend_from_slice(&self.slots[self.cursor..]);
        ordered.extend_from_slice(&self.slots[..self.cursor]);
        ordered
    }

    /// Most recently pushed value (zero when nothing was pushed yet).
    pub fn latest(&self) -> f32 {
        let last = (self.cursor + self.slots.len() - 1) % self.slots.len();
        self.slots[last]
    }

    pub fn clear(&mut self) {
        self.slots.fill(0.0);
        self.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// `WaveformRingBuffer` shared between the capture thread and renderers.
///
/// Every access goes through one lock, so a snapshot can never straddle a
/// concurrent push across the wrap point.
#[derive(Debug)]
pub struct SharedWaveform {
    inner: Mutex<WaveformRingBuffer>,
}

impl SharedWaveform {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(WaveformRingBuffer::new(capacity)),
        }
    }

    pub fn push(&self, amplitude: f32) {
        self.inner.lock().push(amplitude);
    }

    pub fn snapshot(&self) -> Vec<f32> {
        self.inner.lock().snapshot()
    }

    pub fn latest(&self) -> f32 {
        self.inner.lock().latest()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn snapshot_is_oldest_first() {
        let mut buf = WaveformRingBuffer::new(4);
        buf.push(1.0);
        buf.push(2.0);

        assert_eq!(buf.snapshot(), vec![0.0, 0.0, 1.0, 2.0]);
        assert_eq!(buf.latest(), 2.0);
    }

    #[test]
    fn overwrite_drops_oldest() {
        let mut buf = WaveformRingBuffer::new(4);
        for value in 1..=5 {
            buf.push(value as f32);
        }

        let snapshot = buf.snapshot();
        assert_eq!(snapshot.len(), 4);
        assert!(!snapshot.contains(&1.0));
        assert_eq!(snapshot, vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buf.cursor(), 1);
    }

    #[test]
    fn snapshot_length_is_always_capacity() {
        let mut buf = WaveformRingBuffer::new(720);
        assert_eq!(buf.snapshot().len(), 720);
        for i in 0..1000 {
            buf.push(i as f32);
            assert_eq!(buf.snapshot().len(), 720);
        }
    }

    #[test]
    fn clear_zeroes_and_resets_cursor() {
        let mut buf = WaveformRingBuffer::new(3);
        buf.push(0.5);
        buf.push(0.7);
        buf.clear();

        assert_eq!(buf.cursor(), 0);
        assert_eq!(buf.snapshot(), vec![0.0; 3]);
        assert_eq!(buf.latest(), 0.0);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buf = WaveformRingBuffer::new(0);
        buf.push(3.0);
        assert_eq!(buf.snapshot(), vec![3.0]);
    }

    #[test]
    fn shared_snapshots_stay_ordered_under_concurrent_pushes() {
        let waveform = Arc::new(SharedWaveform::new(16));
        let producer = {
            let waveform = Arc::clone(&waveform);
            thread::spawn(move || {
                for i in 1..=10_000 {
                    waveform.push(i as f32);
                }
            })
        };

        for _ in 0..200 {
            let snapshot = waveform.snapshot();
            assert_eq!(snapshot.len(), 16);
            // Non-zero entries must be strictly increasing: a torn read
            // across the wrap point would break the ordering.
            let filled: Vec<f32> = snapshot.into_iter().filter(|v| *v > 0.0).collect();
            assert!(filled.windows(2).all(|w| w[0] < w[1]));
        }

        producer.join().unwrap();
        assert_eq!(waveform.latest(), 10_000.0);
    }
}
