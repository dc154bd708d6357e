// Read loop over the event stream.
use bytes::BytesMut;
use padlink_wire::Message;
use quinn::{ConnectionError, ReadError, ReadExactError, RecvStream};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::translate::{InboundEvent, Translator};

/// Receive framed events until the stream ends.
///
/// The loop itself is the state machine: not running is idle, running is
/// streaming, returning is terminated. End-of-stream (and a locally closed
/// connection, which is what `stop()` produces) ends the loop quietly; any
/// other receive error emits exactly one `Reset` and ends it.
///
/// Each event is translated on its own spawned task, so emission order
/// across distinct events is not receipt order.
pub(crate) async fn run_event_loop(mut recv: RecvStream, translator: Arc<Translator>) {
    let mut scratch = BytesMut::with_capacity(64 * 1024);
    loop {
        match crate::wire_io::read_message(&mut recv, &mut scratch).await {
            Ok(Some(Message::Event {
                response_type,
                data,
                trace_id,
                request_id,
                uin,
            })) => {
                metrics::counter!("padlink_events_received_total").increment(1);
                let translator = Arc::clone(&translator);
                tokio::spawn(async move {
                    translator
                        .process(InboundEvent {
                            response_type,
                            data,
                            trace_id,
                            request_id,
                            uin,
                        })
                        .await;
                });
            }
            Ok(Some(other)) => {
                warn!(message = ?other, "unexpected message on event stream, skipping");
            }
            Ok(None) => {
                debug!("event stream finished");
                break;
            }
            Err(err) if is_local_close(&err) => {
                debug!("event stream closed locally");
                break;
            }
            Err(err) => {
                warn!(error = %err, "event stream receive failed");
                translator.emit_reset(format!("event stream receive failed: {err:#}"));
                break;
            }
        }
    }
}

// `stop()` closes the connection from our side; the pending receive then
// fails with a locally-closed error, which is a planned shutdown rather
// than a stream failure.
fn is_local_close(err: &anyhow::Error) -> bool {
    if let Some(ReadError::ConnectionLost(ConnectionError::LocallyClosed)) =
        err.downcast_ref::<ReadError>()
    {
        return true;
    }
    matches!(
        err.downcast_ref::<ReadExactError>(),
        Some(ReadExactError::ReadError(ReadError::ConnectionLost(
            ConnectionError::LocallyClosed
        )))
    )
}
