use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use xbeelink_frame::{ChecksumPolicy, FrameConfig, SensorReading};
use xbeelink_node::{NodeConfig, NodeListener, RunStats};

use crate::cmd::{install_ctrlc_handler, ServeArgs};
use crate::exit::{node_error, CliResult, SUCCESS};
use crate::output::{print_serve_summary, OutputFormat};

/// Pause between accept attempts while no link is waiting.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = NodeConfig {
        destination: args.dest,
        command_token: args.token.resolve()?,
        frame: FrameConfig {
            checksum_policy: if args.advisory_checksum {
                ChecksumPolicy::Advisory
            } else {
                ChecksumPolicy::Enforce
            },
            ..FrameConfig::default()
        },
        ..NodeConfig::default()
    };

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let listener = NodeListener::bind(&args.path)
        .map_err(|err| node_error("bind failed", err))?
        .with_config(config);
    info!(path = %listener.path().display(), "serving");

    let reading = SensorReading::new(args.temperature, args.humidity);
    let mut total = RunStats::default();

    while running.load(Ordering::SeqCst) {
        let remaining = match args.count {
            Some(count) if total.replies >= count => break,
            Some(count) => Some(count - total.replies),
            None => None,
        };

        let Some(mut node) = listener
            .try_accept()
            .map_err(|err| node_error("accept failed", err))?
        else {
            std::thread::sleep(ACCEPT_POLL_INTERVAL);
            continue;
        };

        if args.report_on_connect {
            if let Err(err) = node.report(&reading) {
                warn!(error = %err, "report failed; dropping link");
                continue;
            }
        }

        match node.run(&reading, &running, remaining) {
            Ok(stats) => {
                total.replies += stats.replies;
                total.ignored += stats.ignored;
                total.errors += stats.errors;
            }
            Err(err) => warn!(error = %err, "link failed"),
        }
    }

    info!(replies = total.replies, "serve stopped");
    print_serve_summary(&args.path.display().to_string(), &total, format);
    Ok(SUCCESS)
}
