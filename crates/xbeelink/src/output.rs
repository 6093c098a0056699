use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use xbeelink_frame::{Address64, Frame, SensorReading, READING_SIZE};
use xbeelink_node::RunStats;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReadingOutput {
    source: String,
    temperature: f32,
    humidity: f32,
}

pub fn print_reading(source: &Address64, reading: &SensorReading, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ReadingOutput {
            source: source.to_string(),
            temperature: reading.temperature,
            humidity: reading.humidity,
        }),
        OutputFormat::Table => print_table(
            vec!["SOURCE", "TEMPERATURE", "HUMIDITY"],
            vec![vec![
                source.to_string(),
                reading.temperature.to_string(),
                reading.humidity.to_string(),
            ]],
        ),
        OutputFormat::Pretty => println!(
            "source={} temperature={} humidity={}",
            source, reading.temperature, reading.humidity
        ),
    }
}

#[derive(Serialize)]
struct FrameOutput {
    frame_type: String,
    frame_name: &'static str,
    address_role: &'static str,
    address: String,
    payload_size: usize,
    payload_hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reading: Option<ReadingFields>,
    wire_size: usize,
    wire_hex: String,
}

#[derive(Serialize)]
struct ReadingFields {
    temperature: f32,
    humidity: f32,
}

impl FrameOutput {
    fn new(frame: &Frame, wire: &[u8]) -> Self {
        let payload = frame.payload();
        let (frame_name, address_role) = match frame {
            Frame::TransmitRequest(_) => ("transmit-request", "destination"),
            Frame::ExplicitRx(_) => ("explicit-rx-indicator", "source"),
        };
        let reading = match frame {
            Frame::TransmitRequest(_) if payload.len() == READING_SIZE => {
                SensorReading::from_payload(payload)
                    .ok()
                    .map(|r| ReadingFields {
                        temperature: r.temperature,
                        humidity: r.humidity,
                    })
            }
            _ => None,
        };
        Self {
            frame_type: format!("0x{:02X}", frame.frame_type()),
            frame_name,
            address_role,
            address: frame.address().to_string(),
            payload_size: payload.len(),
            payload_hex: hex::encode(payload),
            payload_text: printable_text(payload),
            reading,
            wire_size: wire.len(),
            wire_hex: hex::encode(wire),
        }
    }
}

/// Print a frame together with its encoded bytes.
pub fn print_frame(frame: &Frame, wire: &[u8], format: OutputFormat) {
    let out = FrameOutput::new(frame, wire);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut rows = vec![
                vec!["frame_type".to_string(), out.frame_type.clone()],
                vec!["frame_name".to_string(), out.frame_name.to_string()],
                vec![out.address_role.to_string(), out.address.clone()],
                vec!["payload_size".to_string(), out.payload_size.to_string()],
                vec!["payload_hex".to_string(), out.payload_hex.clone()],
            ];
            if let Some(text) = &out.payload_text {
                rows.push(vec!["payload_text".to_string(), text.clone()]);
            }
            if let Some(reading) = &out.reading {
                rows.push(vec!["temperature".to_string(), reading.temperature.to_string()]);
                rows.push(vec!["humidity".to_string(), reading.humidity.to_string()]);
            }
            rows.push(vec!["wire_hex".to_string(), out.wire_hex.clone()]);
            print_table(vec!["FIELD", "VALUE"], rows);
        }
        OutputFormat::Pretty => {
            println!(
                "{} ({}) {}={} payload={}",
                out.frame_type, out.frame_name, out.address_role, out.address, out.payload_hex
            );
            if let Some(reading) = &out.reading {
                println!(
                    "temperature={} humidity={}",
                    reading.temperature, reading.humidity
                );
            }
            println!("{}", out.wire_hex);
        }
    }
}

#[derive(Serialize)]
struct ServeSummary<'a> {
    path: &'a str,
    replies: u64,
    ignored: u64,
    errors: u64,
}

pub fn print_serve_summary(path: &str, stats: &RunStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ServeSummary {
            path,
            replies: stats.replies,
            ignored: stats.ignored,
            errors: stats.errors,
        }),
        OutputFormat::Table => print_table(
            vec!["SOCKET", "REPLIES", "IGNORED", "ERRORS"],
            vec![vec![
                path.to_string(),
                stats.replies.to_string(),
                stats.ignored.to_string(),
                stats.errors.to_string(),
            ]],
        ),
        OutputFormat::Pretty => println!(
            "socket={} replies={} ignored={} errors={}",
            path, stats.replies, stats.ignored, stats.errors
        ),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: Vec<&str>, rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

fn printable_text(payload: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(payload).ok()?;
    if text.chars().all(|c| !c.is_control()) {
        Some(text.to_string())
    } else {
        None
    }
}
