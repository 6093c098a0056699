use std::path::Path;

use tracing::info;
use xbeelink_transport::{LinkStream, UnixDomainSocket};

use crate::config::CoordinatorConfig;
use crate::coordinator::Coordinator;
use crate::error::Result;

/// Connect to a listening node as a coordinator.
pub fn connect(path: impl AsRef<Path>) -> Result<Coordinator<LinkStream>> {
    connect_with_config(path, CoordinatorConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config(
    path: impl AsRef<Path>,
    config: CoordinatorConfig,
) -> Result<Coordinator<LinkStream>> {
    let path = path.as_ref();
    let stream = UnixDomainSocket::connect(path)?;
    info!(path = %path.display(), "link connected");
    Ok(Coordinator::with_config(stream, config))
}
