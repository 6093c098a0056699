use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use xbeelink_node::{connect_with_config, CoordinatorConfig};

use crate::cmd::{install_ctrlc_handler, RequestArgs};
use crate::exit::{node_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_reading, OutputFormat};

pub fn run(args: RequestArgs, format: OutputFormat) -> CliResult<i32> {
    let config = CoordinatorConfig {
        command_token: args.token.resolve()?,
        reply_timeout: parse_duration(&args.timeout)?,
        ..CoordinatorConfig::default()
    };
    let interval = args.interval.as_deref().map(parse_duration).transpose()?;

    let mut coordinator =
        connect_with_config(&args.path, config).map_err(|err| node_error("connect failed", err))?;

    let Some(interval) = interval else {
        let reading = coordinator
            .request_reading(args.source)
            .map_err(|err| node_error("request failed", err))?;
        print_reading(&args.source, &reading, format);
        return Ok(SUCCESS);
    };

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let stats = coordinator
        .poll_readings(args.source, interval, args.count, &running, |reading| {
            print_reading(&args.source, &reading, format)
        })
        .map_err(|err| node_error("polling failed", err))?;
    info!(
        requests = stats.requests,
        readings = stats.readings,
        failures = stats.failures,
        "polling stopped"
    );

    if stats.readings == 0 && stats.failures > 0 {
        return Err(CliError::new(
            TIMEOUT,
            format!("no reading received in {} requests", stats.requests),
        ));
    }
    Ok(SUCCESS)
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
