//! Minimal sensor node: accepts one link and answers data requests until it
//! closes.
//!
//! Run with:
//!   cargo run --example sensor-node
//!
//! In another terminal:
//!   cargo run --features cli -- request /tmp/xbeelink-node-<pid>/link.sock \
//!     --source 0013A20040A1B2C3

use std::fs;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use xbeelink::frame::SensorReading;
use xbeelink::node::{NodeListener, SharedReading};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("xbeelink-node-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("link.sock");

    let listener = NodeListener::bind(&sock_path)?;
    eprintln!("Listening on {}", sock_path.display());

    // Fake sampler nudging the temperature up once a second.
    let reading = SharedReading::new(SensorReading::new(21.0, 45.0));
    {
        let reading = reading.clone();
        std::thread::spawn(move || {
            let mut temperature = 21.0f32;
            loop {
                std::thread::sleep(Duration::from_secs(1));
                temperature += 0.1;
                reading.set(SensorReading::new(temperature, 45.0));
            }
        });
    }

    let mut node = listener.accept()?;
    eprintln!("Link connected");

    let running = AtomicBool::new(true);
    let stats = node.run(&reading, &running, None)?;
    eprintln!(
        "Link closed: {} replies, {} ignored, {} errors",
        stats.replies, stats.ignored, stats.errors
    );

    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}
