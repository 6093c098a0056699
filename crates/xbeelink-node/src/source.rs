use std::sync::{Arc, Mutex};

use xbeelink_frame::SensorReading;

/// Supplies the reading to put in a reply.
///
/// Passed into every node call in place of global sensor variables.
pub trait ReadingSource {
    fn current(&self) -> SensorReading;
}

impl ReadingSource for SensorReading {
    fn current(&self) -> SensorReading {
        *self
    }
}

impl<T: ReadingSource + ?Sized> ReadingSource for &T {
    fn current(&self) -> SensorReading {
        (**self).current()
    }
}

/// A reading updated by a sampler thread and read by the reply path.
#[derive(Debug, Clone, Default)]
pub struct SharedReading {
    inner: Arc<Mutex<SensorReading>>,
}

impl SharedReading {
    pub fn new(initial: SensorReading) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    /// Store a fresh sample.
    pub fn set(&self, reading: SensorReading) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *guard = reading;
    }
}

impl ReadingSource for SharedReading {
    fn current(&self) -> SensorReading {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_reading_is_its_own_source() {
        let reading = SensorReading::new(21.0, 40.0);
        assert_eq!(reading.current(), reading);
    }

    #[test]
    fn shared_reading_sees_updates_from_other_threads() {
        let shared = SharedReading::new(SensorReading::new(0.0, 0.0));
        let sampler = {
            let shared = shared.clone();
            std::thread::spawn(move || shared.set(SensorReading::new(23.5, 60.0)))
        };
        sampler.join().unwrap();

        assert_eq!(shared.current(), SensorReading::new(23.5, 60.0));
    }
}
