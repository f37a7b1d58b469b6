//! Connection lifecycle: connect and handshake, the receive loop, fetch
//! restoration on reconnect, and teardown.
//!
//! One spawned task per connection owns the read half and drives all
//! inbound dispatch, so every handler and response callback runs on that
//! task. Teardown semantics are the same whether the daemon went away or
//! the peer closes: every fetch callback sees the terminal status exactly
//! once, state and method registrations are dropped, and every pending
//! request resolves with the canceled error. Fetches stay registered across
//! a disconnect so a later `resume` can restore them under their original
//! ids.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};

use jet_common::protocol::message;
use jet_common::{consts, framing, FetchId, Matcher, Result};

use crate::peer::{PeerAsync, PeerInner};
use crate::stream::{self, JetReader};

/// Parse failures are logged with a hex dump of the payload, as long as the
/// payload is not longer than this.
const HEX_DUMP_LIMIT: usize = 2048;

impl PeerInner {
    /// Connect, spawn the receive loop, announce ourselves, and restore any
    /// fetches surviving from before a disconnect.
    pub(crate) async fn start(self: &Arc<Self>) -> Result<()> {
        // A still-open previous connection is torn down first, which makes
        // resume harmless to call at any time.
        self.abort_reader();
        self.disconnected().await;

        let (reader, writer) = stream::connect(&self.endpoint).await?;
        *self.writer.lock().await = Some(writer);

        let task = tokio::spawn(receive_loop(Arc::clone(self), reader));
        *self.reader_task.lock() = Some(task);

        let params = json!({
            consts::NAME: self.config.name,
            consts::DEBUG: self.config.debug,
        });
        self.execute(consts::CONFIG, params, None).await;

        for (fetch_id, matcher) in self.registry.fetch_snapshot() {
            if let Err(e) = self.restore_fetch(fetch_id, &matcher).await {
                error!("restoration of previous fetch {fetch_id} ('{matcher}') failed: {e}");
            }
        }
        Ok(())
    }

    /// Re-announce a fetch under its pre-disconnect id. Sent without an id
    /// of its own, so the daemon stays silent about it.
    async fn restore_fetch(&self, fetch_id: FetchId, matcher: &Matcher) -> Result<()> {
        let mut params = Map::new();
        params.insert(consts::ID.into(), json!(fetch_id));
        matcher.append_to(&mut params);
        let frame = message::request(consts::FETCH, Value::Object(params), None);
        self.send_message(&frame).await
    }

    /// Full teardown for the final shutdown: disconnect semantics plus
    /// forgetting the fetches.
    pub(crate) async fn shutdown(&self) {
        self.abort_reader();
        self.disconnected().await;
        self.registry.clear_fetchers();
    }

    /// Disconnect semantics, exactly once per live connection.
    pub(crate) async fn disconnected(&self) {
        if self.writer.lock().await.take().is_some() {
            self.fail_pending_and_clear();
        }
    }

    pub(crate) fn abort_reader(&self) {
        if let Some(task) = self.reader_task.lock().take() {
            task.abort();
        }
    }

    pub(crate) fn fail_pending_and_clear(&self) {
        self.registry.connection_lost();
        self.registry.clear_states();
        self.registry.clear_methods();
        let canceled = self.requests.cancel_all();
        if canceled > 0 {
            warn!(
                "{canceled} open request(s) left on disconnect of jet peer '{}', all have been canceled",
                self.config.name
            );
        }
    }
}

/// The receive loop of one connection: read the 4-byte length header,
/// validate it, read the payload, parse, dispatch, repeat. EOF, read
/// errors, and an oversize announcement all end the loop and trigger the
/// disconnect teardown. Parse failures only drop the single frame.
async fn receive_loop(inner: Arc<PeerInner>, mut reader: JetReader) {
    loop {
        let mut header = [0u8; framing::HEADER_SIZE];
        if let Err(e) = reader.read_exact(&mut header).await {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                debug!("connection closed by jet daemon at {}", inner.endpoint);
            } else {
                error!("error while receiving message header: {e}");
            }
            break;
        }

        let payload_size = match framing::decode_header(header) {
            Ok(payload_size) => payload_size,
            Err(e) => {
                error!("{e}, closing connection to {}", inner.endpoint);
                break;
            }
        };

        let mut payload = vec![0u8; payload_size];
        if let Err(e) = reader.read_exact(&mut payload).await {
            error!("error while receiving message payload: {e}");
            break;
        }

        match framing::decode_payload(&payload) {
            Ok(value) => inner.process_payload(value).await,
            Err(e) => {
                if payload.len() <= HEX_DUMP_LIMIT {
                    error!(
                        "error '{e}' while parsing received message ({} byte): {}",
                        payload.len(),
                        hex_dump(&payload)
                    );
                } else {
                    error!(
                        "error '{e}' while parsing received message ({} byte)",
                        payload.len()
                    );
                }
            }
        }
    }
    inner.disconnected().await;
}

fn hex_dump(payload: &[u8]) -> String {
    payload.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Dropping the peer closes the stream and runs the teardown without
/// waiting for the receive task: pending requests resolve with the
/// canceled error, fetch callbacks see the terminal status.
impl Drop for PeerAsync {
    fn drop(&mut self) {
        self.inner.abort_reader();
        let had_connection = match self.inner.writer.try_lock() {
            Ok(mut writer) => writer.take().is_some(),
            Err(_) => false,
        };
        if had_connection {
            self.inner.fail_pending_and_clear();
        }
        self.inner.registry.clear_fetchers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x00, 0x7b, 0xff]), "007bff");
        assert_eq!(hex_dump(&[]), "");
    }
}
