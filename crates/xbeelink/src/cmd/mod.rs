use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use clap::{ArgGroup, Args, Subcommand};
use xbeelink_frame::Address64;
use xbeelink_node::DEFAULT_COMMAND_TOKEN;

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod request;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bind a link socket and answer data requests.
    Serve(ServeArgs),
    /// Connect to a serving node, request a reading and print it; with
    /// --interval, keep polling and print one reading per line.
    Request(RequestArgs),
    /// Encode a transmit request and print it.
    Encode(EncodeArgs),
    /// Decode one frame from hex and print its fields.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Request(args) => request::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Command token as text or hex; both absent means `GET_DATA` plus its NUL
/// terminator. `--token GET_DATA` selects the bare 8-byte form.
#[derive(Args, Debug, Default)]
pub struct TokenArgs {
    /// Command token matched against incoming rf_data, sent as typed (no terminator).
    #[arg(long, env = "XBEELINK_TOKEN", conflicts_with = "token_hex")]
    pub token: Option<String>,
    /// Command token as hex, for tokens with non-printable bytes (e.g. 4745545f4441544100).
    #[arg(long, value_name = "HEX")]
    pub token_hex: Option<String>,
}

impl TokenArgs {
    pub fn resolve(&self) -> CliResult<Bytes> {
        match (&self.token, &self.token_hex) {
            (_, Some(hex_token)) => {
                let bytes = parse_hex(hex_token)
                    .map_err(|err| CliError::new(USAGE, format!("invalid --token-hex: {err}")))?;
                if bytes.is_empty() {
                    return Err(CliError::new(USAGE, "command token must not be empty"));
                }
                Ok(Bytes::from(bytes))
            }
            (Some(text), None) if text.is_empty() => {
                Err(CliError::new(USAGE, "command token must not be empty"))
            }
            (Some(text), None) => Ok(Bytes::from(text.clone().into_bytes())),
            (None, None) => Ok(Bytes::from_static(DEFAULT_COMMAND_TOKEN)),
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Temperature reported in replies.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub temperature: f32,
    /// Humidity reported in replies.
    #[arg(long, default_value_t = 0.0)]
    pub humidity: f32,
    /// Destination for unsolicited reports.
    #[arg(long, env = "XBEELINK_DEST", default_value = "0000000000000000")]
    pub dest: Address64,
    #[command(flatten)]
    pub token: TokenArgs,
    /// Log checksum mismatches instead of rejecting the frame.
    #[arg(long)]
    pub advisory_checksum: bool,
    /// Send one unsolicited report to --dest when a link connects.
    #[arg(long)]
    pub report_on_connect: bool,
    /// Exit after answering N requests.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Address the request appears to come from; the reply is sent to it.
    #[arg(long)]
    pub source: Address64,
    /// Maximum time to wait for the reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Keep requesting on this interval (e.g. 10s) until interrupted.
    #[arg(long)]
    pub interval: Option<String>,
    /// With --interval, stop after N requests.
    #[arg(long, requires = "interval")]
    pub count: Option<u64>,
    #[command(flatten)]
    pub token: TokenArgs,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["reading", "float", "data"])))]
pub struct EncodeArgs {
    /// Destination address (16 hex digits, separators allowed).
    #[arg(long, env = "XBEELINK_DEST")]
    pub dest: Address64,
    /// Sensor reading as TEMPERATURE,HUMIDITY.
    #[arg(long, value_name = "T,H", allow_hyphen_values = true)]
    pub reading: Option<String>,
    /// A single float value.
    #[arg(long, allow_negative_numbers = true)]
    pub float: Option<f32>,
    /// Raw string payload.
    #[arg(long)]
    pub data: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex; spaces and colons are ignored.
    pub hex: String,
    /// Decode even when the checksum does not match.
    #[arg(long)]
    pub advisory_checksum: bool,
    /// Largest length field accepted.
    #[arg(long, default_value_t = xbeelink_frame::DEFAULT_MAX_FRAME_LENGTH)]
    pub max_length: u16,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Clear `running` on Ctrl-C so long-running commands can wind down.
pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Hex input as typed by a person: whitespace, `:` and a `0x` prefix allowed.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_accepts_separators() {
        assert!(parse_hex("7E 00:0A zz").is_err());
        assert_eq!(parse_hex("0x7E 00:0A").unwrap(), vec![0x7E, 0x00, 0x0A]);
        assert_eq!(parse_hex("7e000a").unwrap(), vec![0x7E, 0x00, 0x0A]);
    }

    #[test]
    fn default_token_is_get_data_with_terminator() {
        let token = TokenArgs::default().resolve().unwrap();
        assert_eq!(&token[..], b"GET_DATA\0");
    }

    #[test]
    fn text_token_is_sent_without_terminator() {
        let args = TokenArgs {
            token: Some("GET_DATA".to_string()),
            token_hex: None,
        };
        assert_eq!(&args.resolve().unwrap()[..], b"GET_DATA");
    }

    #[test]
    fn hex_token_may_carry_terminator() {
        let args = TokenArgs {
            token: None,
            token_hex: Some("4745545f4441544100".to_string()),
        };
        assert_eq!(&args.resolve().unwrap()[..], b"GET_DATA\0");
    }

    #[test]
    fn empty_token_is_rejected() {
        let args = TokenArgs {
            token: Some(String::new()),
            token_hex: None,
        };
        assert_eq!(args.resolve().unwrap_err().code, USAGE);
    }
}
