// Framed message IO over QUIC streams.
use anyhow::{Context, Result};
use bytes::{Bytes, BytesMut};
use padlink_wire::{Frame, FrameHeader, Message};
use quinn::{ReadExactError, RecvStream, SendStream};

use crate::config::runtime_config;

/// Read one framed message. `Ok(None)` means the peer finished the stream.
pub(crate) async fn read_message(
    recv: &mut RecvStream,
    scratch: &mut BytesMut,
) -> Result<Option<Message>> {
    let frame = match read_frame_into(recv, scratch).await? {
        Some(frame) => frame,
        None => return Ok(None),
    };
    match Message::decode(frame.clone()).context("decode message") {
        Ok(message) => Ok(Some(message)),
        Err(err) => {
            log_decode_error("read_message", &err, &frame);
            Err(err)
        }
    }
}

pub(crate) async fn read_frame_into(
    recv: &mut RecvStream,
    scratch: &mut BytesMut,
) -> Result<Option<Frame>> {
    let mut header_bytes = [0u8; FrameHeader::LEN];
    match recv.read_exact(&mut header_bytes).await {
        Ok(()) => {}
        Err(ReadExactError::FinishedEarly(_)) => return Ok(None),
        Err(ReadExactError::ReadError(err)) => return Err(err.into()),
    }

    let header = FrameHeader::decode(Bytes::copy_from_slice(&header_bytes))
        .context("decode frame header")?;
    let length = usize::try_from(header.length).context("frame length")?;

    // The declared length is enforced against `PADLINK_MAX_FRAME_BYTES`
    // before we allocate anything.
    let max_frame_bytes = runtime_config().max_frame_bytes;
    if length > max_frame_bytes {
        return Err(anyhow::anyhow!(
            "frame too large: {length} bytes (cap {max_frame_bytes}); refusing"
        ));
    }

    // Reuse the scratch buffer to avoid per-frame allocations.
    scratch.clear();
    scratch.resize(length, 0u8);
    recv.read_exact(&mut scratch[..])
        .await
        .context("read frame payload")?;

    metrics::counter!("padlink_frames_in_total").increment(1);
    Ok(Some(Frame {
        header,
        payload: scratch.split().freeze(),
    }))
}

pub(crate) async fn write_message(send: &mut SendStream, message: Message) -> Result<()> {
    let frame = message.encode().context("encode message")?;
    let mut header_bytes = [0u8; FrameHeader::LEN];
    frame.header.encode_into(&mut header_bytes);
    send.write_all(&header_bytes)
        .await
        .context("write frame header")?;
    send.write_all(&frame.payload)
        .await
        .context("write frame payload")?;
    metrics::counter!("padlink_frames_out_total").increment(1);
    Ok(())
}

// Bounded payload preview so a hostile frame cannot flood the log.
pub(crate) fn log_decode_error(context: &str, err: &anyhow::Error, frame: &Frame) {
    let preview_len = frame.payload.len().min(64);
    let preview = &frame.payload[..preview_len];
    let printable = preview
        .iter()
        .map(|b| {
            let c = *b as char;
            if c.is_ascii_graphic() || c == ' ' { c } else { '.' }
        })
        .collect::<String>();
    tracing::warn!(
        context,
        error = %err,
        frame_len = frame.header.length,
        payload_len = frame.payload.len(),
        preview = %printable,
        "frame decode error"
    );
}
