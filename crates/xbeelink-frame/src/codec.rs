use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{trace, warn};

use crate::address::Address64;
use crate::error::{FrameError, Result};

/// Start-of-frame marker.
pub const START_DELIMITER: u8 = 0x7E;

/// Delimiter (1) + length (2).
pub const HEADER_SIZE: usize = 3;

/// Bytes on the wire that the length field does not count: header + checksum.
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + 1;

/// Transmit Request frame type.
pub const TRANSMIT_REQUEST: u8 = 0x10;

/// Explicit RX Indicator frame type.
pub const EXPLICIT_RX_INDICATOR: u8 = 0x91;

/// Frame ID used for outbound requests.
pub const DEFAULT_FRAME_ID: u8 = 0x01;

/// 16-bit network address meaning "unknown / use the 64-bit address".
pub const UNKNOWN_NETWORK_ADDRESS: u16 = 0xFFFE;

/// Type (1) + frame id (1) + destination (8) + network address (2) +
/// broadcast radius (1) + options (1).
pub const TRANSMIT_REQUEST_MIN_LENGTH: u16 = 14;

/// Fixed Explicit RX Indicator fields after the type byte.
pub const EXPLICIT_RX_HEADER_SIZE: usize = 17;

/// Type (1) + fixed header (17).
pub const EXPLICIT_RX_MIN_LENGTH: u16 = 1 + EXPLICIT_RX_HEADER_SIZE as u16;

/// Default upper bound on the length field accepted by the decoders.
pub const DEFAULT_MAX_FRAME_LENGTH: u16 = 512;

/// Default wait for the rest of a frame once its delimiter has been seen.
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_millis(50);

/// Checksum over the bytes from frame type through the end of the body.
pub fn checksum(bytes: &[u8]) -> u8 {
    let mut acc = ChecksumAccumulator::default();
    acc.update(bytes);
    acc.finish()
}

/// Running byte sum for frames consumed piecewise.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ChecksumAccumulator {
    sum: u8,
}

impl ChecksumAccumulator {
    pub(crate) fn update(&mut self, bytes: &[u8]) {
        self.sum = bytes.iter().fold(self.sum, |sum, b| sum.wrapping_add(*b));
    }

    pub(crate) fn finish(&self) -> u8 {
        0xFF - self.sum
    }
}

/// What to do when a received checksum does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumPolicy {
    /// Reject the frame with [`FrameError::ChecksumMismatch`].
    #[default]
    Enforce,
    /// Log a warning and deliver the frame anyway.
    Advisory,
}

/// Configuration shared by the frame decoders.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest length field accepted. Longer frames are treated as noise.
    pub max_frame_length: u16,
    /// Read timeout while the remainder of a frame is arriving.
    pub frame_timeout: Option<Duration>,
    /// Checksum handling.
    pub checksum_policy: ChecksumPolicy,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            frame_timeout: Some(DEFAULT_FRAME_TIMEOUT),
            checksum_policy: ChecksumPolicy::Enforce,
        }
    }
}

/// Outbound Transmit Request (`0x10`).
#[derive(Debug, Clone, PartialEq)]
pub struct TransmitRequest {
    pub frame_id: u8,
    pub destination: Address64,
    pub network_address: u16,
    pub broadcast_radius: u8,
    pub options: u8,
    pub payload: Bytes,
}

impl TransmitRequest {
    /// A request with the fixed header values used by this protocol.
    pub fn new(destination: Address64, payload: impl Into<Bytes>) -> Self {
        Self {
            frame_id: DEFAULT_FRAME_ID,
            destination,
            network_address: UNKNOWN_NETWORK_ADDRESS,
            broadcast_radius: 0,
            options: 0,
            payload: payload.into(),
        }
    }
}

/// Inbound Explicit RX Indicator (`0x91`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExplicitRxIndicator {
    pub source: Address64,
    pub network_address: u16,
    pub source_endpoint: u8,
    pub destination_endpoint: u8,
    pub cluster_id: u16,
    pub profile_id: u16,
    pub receive_options: u8,
    pub rf_data: Bytes,
}

impl ExplicitRxIndicator {
    /// Digi data endpoint.
    pub const DATA_ENDPOINT: u8 = 0xE8;
    /// Transparent serial data cluster.
    pub const SERIAL_DATA_CLUSTER: u16 = 0x0011;
    /// Digi drop-in networking profile.
    pub const DIGI_PROFILE: u16 = 0xC105;
    /// Packet acknowledged.
    pub const OPTION_ACKNOWLEDGED: u8 = 0x01;

    /// An indicator carrying `rf_data` with the usual serial-data addressing.
    pub fn new(source: Address64, rf_data: impl Into<Bytes>) -> Self {
        Self {
            source,
            network_address: UNKNOWN_NETWORK_ADDRESS,
            source_endpoint: Self::DATA_ENDPOINT,
            destination_endpoint: Self::DATA_ENDPOINT,
            cluster_id: Self::SERIAL_DATA_CLUSTER,
            profile_id: Self::DIGI_PROFILE,
            receive_options: Self::OPTION_ACKNOWLEDGED,
            rf_data: rf_data.into(),
        }
    }
}

/// A decoded API frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    TransmitRequest(TransmitRequest),
    ExplicitRx(ExplicitRxIndicator),
}

impl Frame {
    pub fn frame_type(&self) -> u8 {
        match self {
            Frame::TransmitRequest(_) => TRANSMIT_REQUEST,
            Frame::ExplicitRx(_) => EXPLICIT_RX_INDICATOR,
        }
    }

    /// The application bytes carried by the frame.
    pub fn payload(&self) -> &Bytes {
        match self {
            Frame::TransmitRequest(req) => &req.payload,
            Frame::ExplicitRx(rx) => &rx.rf_data,
        }
    }

    /// The remote address: destination for requests, source for indicators.
    pub fn address(&self) -> Address64 {
        match self {
            Frame::TransmitRequest(req) => req.destination,
            Frame::ExplicitRx(rx) => rx.source,
        }
    }

    /// Total bytes on the wire, delimiter and checksum included.
    pub fn wire_size(&self) -> usize {
        let length = match self {
            Frame::TransmitRequest(req) => {
                TRANSMIT_REQUEST_MIN_LENGTH as usize + req.payload.len()
            }
            Frame::ExplicitRx(rx) => EXPLICIT_RX_MIN_LENGTH as usize + rx.rf_data.len(),
        };
        FRAME_OVERHEAD + length
    }

    /// Append the wire encoding of this frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Frame::TransmitRequest(req) => put_transmit_request(req, dst),
            Frame::ExplicitRx(rx) => encode_explicit_rx(rx, dst),
        }
    }
}

/// Encode a Transmit Request carrying `payload` to `destination`.
///
/// Wire format:
/// ```text
/// 7E | len_hi len_lo | 10 | 01 | dest (8) | FF FE | 00 | 00 | payload | checksum
/// ```
/// The length field is `14 + payload.len()`; the checksum covers everything
/// from the `10` through the last payload byte.
pub fn encode_transmit_request(
    destination: &Address64,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    check_fits(payload.len(), TRANSMIT_REQUEST_MIN_LENGTH)?;

    let mut fixed = [0u8; TRANSMIT_REQUEST_MIN_LENGTH as usize - 1];
    fixed[0] = DEFAULT_FRAME_ID;
    fixed[1..9].copy_from_slice(destination.as_bytes());
    fixed[9..11].copy_from_slice(&UNKNOWN_NETWORK_ADDRESS.to_be_bytes());
    put_frame(TRANSMIT_REQUEST, &fixed, payload, dst);
    Ok(())
}

fn put_transmit_request(req: &TransmitRequest, dst: &mut BytesMut) -> Result<()> {
    check_fits(req.payload.len(), TRANSMIT_REQUEST_MIN_LENGTH)?;

    let mut fixed = BytesMut::with_capacity(TRANSMIT_REQUEST_MIN_LENGTH as usize - 1);
    fixed.put_u8(req.frame_id);
    fixed.put_slice(req.destination.as_bytes());
    fixed.put_u16(req.network_address);
    fixed.put_u8(req.broadcast_radius);
    fixed.put_u8(req.options);
    put_frame(TRANSMIT_REQUEST, &fixed, &req.payload, dst);
    Ok(())
}

/// Encode an Explicit RX Indicator, as a radio would deliver it to its host.
pub fn encode_explicit_rx(rx: &ExplicitRxIndicator, dst: &mut BytesMut) -> Result<()> {
    check_fits(rx.rf_data.len(), EXPLICIT_RX_MIN_LENGTH)?;

    let mut fixed = BytesMut::with_capacity(EXPLICIT_RX_HEADER_SIZE);
    fixed.put_slice(rx.source.as_bytes());
    fixed.put_u16(rx.network_address);
    fixed.put_u8(rx.source_endpoint);
    fixed.put_u8(rx.destination_endpoint);
    fixed.put_u16(rx.cluster_id);
    fixed.put_u16(rx.profile_id);
    fixed.put_u8(rx.receive_options);
    put_frame(EXPLICIT_RX_INDICATOR, &fixed, &rx.rf_data, dst);
    Ok(())
}

fn check_fits(payload_len: usize, fixed_length: u16) -> Result<()> {
    let max = (u16::MAX - fixed_length) as usize;
    if payload_len > max {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max,
        });
    }
    Ok(())
}

/// Caller guarantees `1 + fixed.len() + payload.len()` fits in a `u16`.
fn put_frame(frame_type: u8, fixed: &[u8], payload: &[u8], dst: &mut BytesMut) {
    let length = 1 + fixed.len() + payload.len();
    let mut acc = ChecksumAccumulator::default();
    acc.update(&[frame_type]);
    acc.update(fixed);
    acc.update(payload);

    dst.reserve(FRAME_OVERHEAD + length);
    dst.put_u8(START_DELIMITER);
    dst.put_u16(length as u16);
    dst.put_u8(frame_type);
    dst.put_slice(fixed);
    dst.put_slice(payload);
    dst.put_u8(acc.finish());
}

/// Check a declared length before anything is read or allocated for it.
///
/// `frame_type` is `None` for the type-independent check done right after
/// the length field. The configured `max` only caps the two frame types that
/// get buffered; anything else is drained whatever its length.
pub(crate) fn validate_length(frame_type: Option<u8>, length: u16, max: u16) -> Result<()> {
    let (min, max) = match frame_type {
        Some(TRANSMIT_REQUEST) => (TRANSMIT_REQUEST_MIN_LENGTH, max),
        Some(EXPLICIT_RX_INDICATOR) => (EXPLICIT_RX_MIN_LENGTH, max),
        _ => (1, u16::MAX),
    };
    if length < min || length > max {
        return Err(FrameError::MalformedLength {
            frame_type,
            length,
            min,
            max,
        });
    }
    Ok(())
}

/// Whether `frame_type` is one of the frames this crate parses.
pub(crate) fn is_supported(frame_type: u8) -> bool {
    frame_type == TRANSMIT_REQUEST || frame_type == EXPLICIT_RX_INDICATOR
}

/// Compare a received checksum against the computed one under `policy`.
pub(crate) fn verify_checksum(expected: u8, actual: u8, policy: ChecksumPolicy) -> Result<()> {
    if expected == actual {
        return Ok(());
    }
    match policy {
        ChecksumPolicy::Enforce => Err(FrameError::ChecksumMismatch { expected, actual }),
        ChecksumPolicy::Advisory => {
            warn!(expected, actual, "checksum mismatch; delivering frame anyway");
            Ok(())
        }
    }
}

/// Parse a frame body (everything after the type byte, before the checksum).
///
/// The body length must already have passed [`validate_length`].
pub(crate) fn parse_body(frame_type: u8, mut body: Bytes) -> Result<Frame> {
    match frame_type {
        TRANSMIT_REQUEST => {
            let frame_id = body.get_u8();
            let destination = get_address(&mut body);
            let network_address = body.get_u16();
            let broadcast_radius = body.get_u8();
            let options = body.get_u8();
            Ok(Frame::TransmitRequest(TransmitRequest {
                frame_id,
                destination,
                network_address,
                broadcast_radius,
                options,
                payload: body,
            }))
        }
        EXPLICIT_RX_INDICATOR => {
            let source = get_address(&mut body);
            let network_address = body.get_u16();
            let source_endpoint = body.get_u8();
            let destination_endpoint = body.get_u8();
            let cluster_id = body.get_u16();
            let profile_id = body.get_u16();
            let receive_options = body.get_u8();
            Ok(Frame::ExplicitRx(ExplicitRxIndicator {
                source,
                network_address,
                source_endpoint,
                destination_endpoint,
                cluster_id,
                profile_id,
                receive_options,
                rf_data: body,
            }))
        }
        other => Err(FrameError::UnknownFrameType {
            frame_type: other,
            length: (body.len() + 1) as u16,
        }),
    }
}

fn get_address(body: &mut Bytes) -> Address64 {
    let mut addr = [0u8; 8];
    body.copy_to_slice(&mut addr);
    Address64::new(addr)
}

/// Decode one frame from a buffer.
///
/// Leading bytes before a start delimiter are discarded. Returns `Ok(None)`
/// when the buffer does not yet hold a complete frame. A frame that fails
/// validation is consumed so the next call resynchronizes on the following
/// delimiter; a zero length, or a `0x10`/`0x91` length above the configured
/// maximum, drops only the delimiter.
pub fn decode_frame(src: &mut BytesMut, config: &FrameConfig) -> Result<Option<Frame>> {
    let skipped = src
        .iter()
        .position(|b| *b == START_DELIMITER)
        .unwrap_or(src.len());
    if skipped > 0 {
        trace!(skipped, "discarding bytes before start delimiter");
        src.advance(skipped);
    }

    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let length = u16::from_be_bytes([src[1], src[2]]);
    if let Err(err) = validate_length(None, length, config.max_frame_length) {
        src.advance(1);
        return Err(err);
    }

    if src.len() < HEADER_SIZE + 1 {
        return Ok(None);
    }
    let frame_type = src[HEADER_SIZE];
    if is_supported(frame_type) && length > config.max_frame_length {
        src.advance(1);
        validate_length(Some(frame_type), length, config.max_frame_length)?;
    }

    let total = FRAME_OVERHEAD + length as usize;
    if src.len() < total {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let mut content = src.split_to(length as usize).freeze();
    let received = src.get_u8();

    let frame_type = content.get_u8();
    if !is_supported(frame_type) {
        return Err(FrameError::UnknownFrameType { frame_type, length });
    }
    validate_length(Some(frame_type), length, config.max_frame_length)?;

    let mut acc = ChecksumAccumulator::default();
    acc.update(&[frame_type]);
    acc.update(&content);
    verify_checksum(acc.finish(), received, config.checksum_policy)?;

    parse_body(frame_type, content).map(Some)
}
