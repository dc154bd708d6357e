use bytes::Bytes;
use padlink_wire::{Frame, Message};

// Known-good frame encodings. The header is magic "PDL1", version 1, flags,
// then a big-endian payload length.
const VECTORS: &[(&str, &str)] = &[
    // payload "hi", flags 0
    ("6869", "50444c3100010000000000026869"),
    // Message::Ok as a framed JSON payload
    (
        "7b2274797065223a226f6b227d",
        "50444c31000100000000000d7b2274797065223a226f6b227d",
    ),
];

#[test]
fn vectors_match_frame_encoding() {
    for (payload_hex, frame_hex) in VECTORS {
        let payload = hex_to_bytes(payload_hex);
        let frame_expected = Bytes::from(hex_to_bytes(frame_hex));

        let frame = Frame::new(0, payload.into()).expect("frame");
        assert_eq!(
            frame.encode().as_ref(),
            frame_expected.as_ref(),
            "frame mismatch for payload {payload_hex}"
        );

        let decoded = Frame::decode(frame_expected.clone()).expect("decode");
        assert_eq!(decoded.encode().as_ref(), frame_expected.as_ref());
    }
}

#[test]
fn message_vector_round_trips() {
    let (_, frame_hex) = VECTORS[1];
    let frame = Frame::decode(Bytes::from(hex_to_bytes(frame_hex))).expect("decode frame");
    let message = Message::decode(frame).expect("decode message");
    assert_eq!(message, Message::Ok);
    let encoded = message.encode().expect("encode message");
    assert_eq!(encoded.encode().as_ref(), hex_to_bytes(frame_hex).as_slice());
}

fn hex_to_bytes(hex: &str) -> Vec<u8> {
    assert!(hex.len() % 2 == 0, "hex length must be even");
    hex.as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = from_hex_char(pair[0]) << 4;
            let lo = from_hex_char(pair[1]);
            hi | lo
        })
        .collect()
}

fn from_hex_char(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => panic!("invalid hex char"),
    }
}
