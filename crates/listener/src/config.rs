//! Listener settings.

use std::net::{Ipv4Addr, SocketAddr};

use crate::ListenerError;

/// Default webhook path, matching the path Functions-style triggers expose.
pub const DEFAULT_PATH: &str = "/api/events";

/// Default port for the webhook server.
pub const DEFAULT_PORT: u16 = 8080;

/// Where the webhook server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    bind_address: SocketAddr,
    path: String,
}

impl ListenerConfig {
    /// Creates a config, rejecting paths that do not start with `/` or that
    /// end with one.
    pub fn new(bind_address: SocketAddr, path: impl Into<String>) -> Result<Self, ListenerError> {
        let path = path.into();
        if !path.starts_with('/') || (path.len() > 1 && path.ends_with('/')) {
            return Err(ListenerError::InvalidPath { path });
        }
        if path.contains('{') || path.contains('}') {
            return Err(ListenerError::InvalidPath { path });
        }
        Ok(Self { bind_address, path })
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Path deliveries are POSTed to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Liveness probe path, nested under the webhook path.
    pub fn health_path(&self) -> String {
        if self.path == "/" {
            "/health".to_string()
        } else {
            format!("{}/health", self.path)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            path: DEFAULT_PATH.to_string(),
        }
    }
}
