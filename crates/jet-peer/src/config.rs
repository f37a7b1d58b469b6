//! Peer configuration.

use jet_common::consts::JETD_TCP_PORT;
#[cfg(unix)]
use jet_common::consts::JET_UNIX_DOMAIN_SOCKET;

use crate::stream::Endpoint;

/// Where and how a peer connects to the jet daemon.
///
/// `port == 0` selects the unix domain stream socket, in which case
/// `address` is the socket path.
///
/// # Example
///
/// ```
/// use jet_peer::PeerConfig;
///
/// let config = PeerConfig::tcp("10.0.0.5", 11122).with_name("scanner").with_debug(true);
/// assert_eq!(config.name, "scanner");
/// ```
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Host of the daemon, or the socket path when `port` is `0`.
    pub address: String,
    /// TCP port of the daemon, `0` for a unix domain socket.
    pub port: u16,
    /// Peer name announced in the startup `config` request.
    pub name: String,
    /// Ask the daemon for debug log messages concerning this peer.
    pub debug: bool,
}

impl PeerConfig {
    /// Connect via TCP.
    pub fn tcp(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            name: String::new(),
            debug: false,
        }
    }

    /// Connect via a unix domain stream socket.
    #[cfg(unix)]
    pub fn local_socket(path: impl Into<String>) -> Self {
        Self {
            address: path.into(),
            port: 0,
            name: String::new(),
            debug: false,
        }
    }

    /// Connect to the daemon on this machine via its default unix domain
    /// socket endpoint.
    #[cfg(unix)]
    pub fn local() -> Self {
        Self::local_socket(JET_UNIX_DOMAIN_SOCKET)
    }

    /// Set the peer name announced to the daemon.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Switch daemon-side debug log messages for this peer.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub(crate) fn endpoint(&self) -> Endpoint {
        #[cfg(unix)]
        if self.port == 0 {
            return Endpoint::Local {
                path: self.address.clone(),
            };
        }
        Endpoint::Tcp {
            host: self.address.clone(),
            port: self.port,
        }
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self::tcp("127.0.0.1", JETD_TCP_PORT)
    }
}
