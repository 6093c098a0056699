use std::path::Path;

use tracing::info;
use xbeelink_transport::{LinkStream, UnixDomainSocket};

use crate::config::NodeConfig;
use crate::error::Result;
use crate::node::SensorNode;

/// Listens on a link socket and hands out a [`SensorNode`] per connection.
pub struct NodeListener {
    socket: UnixDomainSocket,
    config: NodeConfig,
}

impl NodeListener {
    /// Bind to a Unix domain socket path.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let socket = UnixDomainSocket::bind(path)?;
        Ok(Self {
            socket,
            config: NodeConfig::default(),
        })
    }

    /// Override node behavior for accepted connections.
    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    /// Accept the next link and wrap it in a node.
    pub fn accept(&self) -> Result<SensorNode<LinkStream>> {
        let stream = self.socket.accept()?;
        info!(path = %self.socket.path().display(), "link accepted");
        Ok(SensorNode::with_config(stream, self.config.clone()))
    }

    /// Like [`accept`](Self::accept), but returns `Ok(None)` when no link is
    /// waiting.
    pub fn try_accept(&self) -> Result<Option<SensorNode<LinkStream>>> {
        let Some(stream) = self.socket.try_accept()? else {
            return Ok(None);
        };
        info!(path = %self.socket.path().display(), "link accepted");
        Ok(Some(SensorNode::with_config(stream, self.config.clone())))
    }

    pub fn path(&self) -> &Path {
        self.socket.path()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use xbeelink_frame::SensorReading;

    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::connector::connect_with_config;

    #[test]
    fn node_answers_coordinator_over_socket() {
        let dir = std::env::temp_dir().join(format!("xbeelink-node-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("link.sock");

        let listener = NodeListener::bind(&path).unwrap();
        let reading = SensorReading::new(23.5, 60.0);
        let server = std::thread::spawn(move || {
            let mut node = listener.accept().unwrap();
            let running = AtomicBool::new(true);
            node.run(&reading, &running, Some(1)).unwrap()
        });

        let config = CoordinatorConfig {
            reply_timeout: Duration::from_secs(2),
            ..CoordinatorConfig::default()
        };
        let from = "0013A20040A1B2C3".parse().unwrap();
        let mut coordinator = connect_with_config(&path, config).unwrap();
        assert_eq!(coordinator.request_reading(from).unwrap(), reading);

        let stats = server.join().unwrap();
        assert_eq!(stats.replies, 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn try_accept_hands_out_a_working_node() {
        let dir = std::env::temp_dir().join(format!("xbeelink-try-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("link.sock");

        let listener = NodeListener::bind(&path).unwrap();
        assert!(listener.try_accept().unwrap().is_none());

        let config = CoordinatorConfig {
            reply_timeout: Duration::from_secs(2),
            ..CoordinatorConfig::default()
        };
        let mut coordinator = connect_with_config(&path, config).unwrap();

        let reading = SensorReading::new(-1.5, 33.0);
        let server = std::thread::spawn(move || {
            let mut node = loop {
                if let Some(node) = listener.try_accept().unwrap() {
                    break node;
                }
                std::thread::sleep(Duration::from_millis(5));
            };
            let running = AtomicBool::new(true);
            node.run(&reading, &running, Some(1)).unwrap()
        });

        let from = "0013A20040A1B2C4".parse().unwrap();
        assert_eq!(coordinator.request_reading(from).unwrap(), reading);
        assert_eq!(server.join().unwrap().replies, 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
