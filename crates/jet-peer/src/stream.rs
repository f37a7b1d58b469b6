//! Socket stream abstraction: one connected stream to the jet daemon,
//! either TCP or a unix domain socket, split into independently owned read
//! and write halves so that the receive loop and the senders never contend.

use std::fmt;
use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{tcp, TcpStream};
#[cfg(unix)]
use tokio::net::{unix, UnixStream};

use jet_common::{JetError, Result};

/// Resolved connection target of a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP towards `host:port`.
    Tcp { host: String, port: u16 },
    /// Unix domain stream socket at `path`.
    #[cfg(unix)]
    Local { path: String },
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "{host}:{port}"),
            #[cfg(unix)]
            Endpoint::Local { path } => write!(f, "{path}"),
        }
    }
}

pub(crate) enum JetReader {
    Tcp(tcp::OwnedReadHalf),
    #[cfg(unix)]
    Local(unix::OwnedReadHalf),
}

pub(crate) enum JetWriter {
    Tcp(tcp::OwnedWriteHalf),
    #[cfg(unix)]
    Local(unix::OwnedWriteHalf),
}

/// Open the stream towards the daemon.
pub(crate) async fn connect(endpoint: &Endpoint) -> Result<(JetReader, JetWriter)> {
    match endpoint {
        Endpoint::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port))
                .await
                .map_err(|e| {
                    JetError::Connection(format!("could not connect to jet daemon at {endpoint}: {e}"))
                })?;
            let _ = stream.set_nodelay(true);
            let (reader, writer) = stream.into_split();
            Ok((JetReader::Tcp(reader), JetWriter::Tcp(writer)))
        }
        #[cfg(unix)]
        Endpoint::Local { path } => {
            let stream = UnixStream::connect(path).await.map_err(|e| {
                JetError::Connection(format!("could not connect to jet daemon at {endpoint}: {e}"))
            })?;
            let (reader, writer) = stream.into_split();
            Ok((JetReader::Local(reader), JetWriter::Local(writer)))
        }
    }
}

impl JetReader {
    pub(crate) async fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        match self {
            JetReader::Tcp(stream) => stream.read_exact(buf).await.map(|_| ()),
            #[cfg(unix)]
            JetReader::Local(stream) => stream.read_exact(buf).await.map(|_| ()),
        }
    }
}

impl JetWriter {
    pub(crate) async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            JetWriter::Tcp(stream) => stream.write_all(buf).await,
            #[cfg(unix)]
            JetWriter::Local(stream) => stream.write_all(buf).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_display() {
        let tcp = Endpoint::Tcp {
            host: "127.0.0.1".into(),
            port: 11122,
        };
        assert_eq!(tcp.to_string(), "127.0.0.1:11122");

        #[cfg(unix)]
        {
            let local = Endpoint::Local {
                path: "/var/run/jet.socket".into(),
            };
            assert_eq!(local.to_string(), "/var/run/jet.socket");
        }
    }

    #[tokio::test]
    async fn test_connect_failure_is_a_connection_error() {
        // Port 1 on localhost is assumed closed.
        let endpoint = Endpoint::Tcp {
            host: "127.0.0.1".into(),
            port: 1,
        };
        match connect(&endpoint).await {
            Err(JetError::Connection(message)) => {
                assert!(message.contains("127.0.0.1:1"));
            }
            Ok(_) => panic!("connect to a closed port succeeded"),
            Err(other) => panic!("expected Connection error, got {other:?}"),
        }
    }
}
