use bytes::BytesMut;
use tracing::warn;
use xbeelink_frame::{decode_frame, ChecksumPolicy, FrameConfig};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex input: {err}")))?;

    let config = FrameConfig {
        max_frame_length: args.max_length,
        checksum_policy: if args.advisory_checksum {
            ChecksumPolicy::Advisory
        } else {
            ChecksumPolicy::Enforce
        },
        ..FrameConfig::default()
    };

    let mut buf = BytesMut::from(bytes.as_slice());
    let frame = decode_frame(&mut buf, &config)
        .map_err(|err| frame_error("decode failed", err))?
        .ok_or_else(|| CliError::new(DATA_INVALID, "decode failed: incomplete frame"))?;

    // Bytes between the start of input and the end of the decoded frame.
    let consumed = bytes.len() - buf.len();
    if !buf.is_empty() {
        warn!(trailing = buf.len(), "bytes after the frame ignored");
    }

    print_frame(&frame, &bytes[..consumed], format);
    Ok(SUCCESS)
}
