use crate::error::{FrameError, Result};

/// Size of an encoded sensor reading: two `f32` values.
pub const READING_SIZE: usize = 8;

/// One temperature/humidity sample as carried in a reply payload.
///
/// Each value is the raw IEEE-754 single-precision encoding in native byte
/// order, temperature first.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    pub temperature: f32,
    pub humidity: f32,
}

impl SensorReading {
    pub fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            temperature,
            humidity,
        }
    }

    /// Encode as the 8-byte reply payload.
    pub fn to_payload(&self) -> [u8; READING_SIZE] {
        let mut payload = [0u8; READING_SIZE];
        payload[..4].copy_from_slice(&self.temperature.to_ne_bytes());
        payload[4..].copy_from_slice(&self.humidity.to_ne_bytes());
        payload
    }

    /// Decode a reply payload. Anything but exactly 8 bytes is rejected.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let bytes: [u8; READING_SIZE] = payload
            .try_into()
            .map_err(|_| FrameError::InvalidReading(payload.len()))?;
        let (temperature, humidity) = bytes.split_at(4);
        Ok(Self {
            temperature: f32::from_ne_bytes([
                temperature[0],
                temperature[1],
                temperature[2],
                temperature[3],
            ]),
            humidity: f32::from_ne_bytes([humidity[0], humidity[1], humidity[2], humidity[3]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_temperature_then_humidity() {
        let payload = SensorReading::new(23.5, 60.0).to_payload();
        assert_eq!(&payload[..4], &23.5f32.to_ne_bytes());
        assert_eq!(&payload[4..], &60.0f32.to_ne_bytes());
    }

    #[test]
    fn decodes_reply_payload() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&25.0f32.to_ne_bytes());
        payload.extend_from_slice(&60.0f32.to_ne_bytes());

        let reading = SensorReading::from_payload(&payload).unwrap();
        assert_eq!(reading, SensorReading::new(25.0, 60.0));
    }

    #[test]
    fn rejects_short_payload() {
        let err = SensorReading::from_payload(&[0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidReading(4)));
    }
}
