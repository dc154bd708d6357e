// Event-stream adapter for the padlink bridge backend.
//
// The adapter owns one long-lived bidirectional stream on which the backend
// pushes protocol events, translates those events into a small vocabulary of
// puppet events, and keeps the session identity plus two payload caches the
// host framework reads back later.
//
// ADAPTER DESIGN NOTES
//
// A) One reader, many one-shot translators
//    - A single task reads framed messages off the event stream in order.
//    - Every inbound event is handed to a freshly spawned translation task,
//      so a slow payload never blocks the receive loop. The cost is that
//      emission order across distinct events is not receipt order; hosts
//      that need ordering serialize inside their `PuppetHandle::emit`.
//
// B) Short-lived streams for unary calls
//    - Heartbeats, login nudges, and rich-media fetches each open one
//      bidirectional stream, do a single request/response round trip, and
//      drop it. There is no shared writer to contend on.
//
// C) Failure containment
//    - Errors before the adapter is running come back from `start()`.
//    - Errors while running become log lines or a single `Reset` event.
//      A malformed payload decodes to its default value instead of killing
//      the pipeline; only stream-level receive errors end the read loop.

pub mod cache;
pub mod config;
pub mod event;
pub mod payload;
pub mod session;

mod dispatcher;
mod link;
mod puppet;
mod translate;
mod wire_io;

pub use cache::{ContactCache, MessageCache, PayloadCache};
pub use config::PuppetConfig;
pub use event::{EventKind, PuppetEvent, PuppetHandle, ScanStatus};
pub use puppet::Puppet;
pub use session::Session;
