use bytes::{Bytes, BytesMut};
use xbeelink_frame::{Frame, SensorReading, TransmitRequest};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = payload_from_args(&args)?;
    let frame = Frame::TransmitRequest(TransmitRequest::new(args.dest, payload));

    let mut wire = BytesMut::with_capacity(frame.wire_size());
    frame
        .encode(&mut wire)
        .map_err(|err| frame_error("encode failed", err))?;

    print_frame(&frame, &wire, format);
    Ok(SUCCESS)
}

fn payload_from_args(args: &EncodeArgs) -> CliResult<Bytes> {
    if let Some(reading) = &args.reading {
        return Ok(Bytes::copy_from_slice(&parse_reading(reading)?.to_payload()));
    }
    if let Some(value) = args.float {
        return Ok(Bytes::copy_from_slice(&value.to_ne_bytes()));
    }
    if let Some(data) = &args.data {
        if data.is_empty() {
            return Err(CliError::new(USAGE, "--data must not be empty"));
        }
        return Ok(Bytes::from(data.clone().into_bytes()));
    }
    Err(CliError::new(
        USAGE,
        "one of --reading, --float or --data is required",
    ))
}

fn parse_reading(input: &str) -> CliResult<SensorReading> {
    let invalid = || {
        CliError::new(
            USAGE,
            format!("invalid reading {input:?}: expected TEMPERATURE,HUMIDITY"),
        )
    };
    let (temperature, humidity) = input.split_once(',').ok_or_else(invalid)?;
    let temperature: f32 = temperature.trim().parse().map_err(|_| invalid())?;
    let humidity: f32 = humidity.trim().parse().map_err(|_| invalid())?;
    Ok(SensorReading::new(temperature, humidity))
}
