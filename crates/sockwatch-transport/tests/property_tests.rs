//! Property tests for the codec and the framer.
//!
//! Generated payloads cover every event kind, with nested argument values
//! for `broadcast`, `emit` and `recv`.

use proptest::prelude::*;
use serde_json::{Map, Number, Value};
use sockwatch_transport::codec::{decode, encode};
use sockwatch_transport::framer::encode_frame;
use sockwatch_transport::{Delimiter, Envelope, EventKind, FrameDecoder, Payload};
use sockwatch_types::{
    AuthError, AuthOutcome, BroadcastEvent, JoinEvent, LeaveEvent, RoomSummary, SocketEvent,
    SocketSummary, StateSnapshot, StringEvent, TrafficEvent,
};

// --- Strategies ---

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9_-]{0,12}",
        any::<String>(),
        Just("line one\nline two".to_string()),
    ]
}

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        any::<f64>()
            .prop_filter_map("finite", Number::from_f64)
            .prop_map(Value::Number),
        arb_text().prop_map(Value::String),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(6, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{0,6}", inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn arb_args() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(arb_value(), 0..5)
}

fn arb_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_text(), 0..4)
}

fn arb_auth_error() -> impl Strategy<Value = AuthError> {
    prop_oneof![
        Just(AuthError::PasswordRequired),
        Just(AuthError::PasswordUnexpected),
        Just(AuthError::InvalidPassword),
        Just(AuthError::Timeout),
    ]
}

fn arb_snapshot() -> impl Strategy<Value = StateSnapshot> {
    let room = (arb_text(), arb_names()).prop_map(|(name, sockets)| RoomSummary { name, sockets });
    let socket = (arb_text(), any::<Option<u64>>())
        .prop_map(|(id, connected_at)| SocketSummary { id, connected_at });
    (
        prop::collection::vec(room, 0..4),
        prop::collection::vec(socket, 0..4),
    )
        .prop_map(|(rooms, sockets)| StateSnapshot { rooms, sockets })
}

fn arb_traffic() -> impl Strategy<Value = TrafficEvent> {
    (arb_text(), arb_text(), arb_args()).prop_map(|(id, name, args)| TrafficEvent { id, name, args })
}

fn arb_payload() -> impl Strategy<Value = Payload> {
    prop_oneof![
        any::<bool>().prop_map(Payload::ReqAuth),
        arb_text().prop_map(Payload::Password),
        Just(Payload::Auth(AuthOutcome::Authorized)),
        arb_auth_error().prop_map(|e| Payload::Auth(AuthOutcome::rejected(&e))),
        arb_snapshot().prop_map(Payload::Init),
        (arb_names(), arb_names(), arb_text(), arb_args()).prop_map(|(rooms, flags, name, args)| {
            Payload::Broadcast(BroadcastEvent {
                rooms,
                flags,
                name,
                args,
            })
        }),
        (arb_text(), arb_names()).prop_map(|(id, rooms)| Payload::Join(JoinEvent { id, rooms })),
        (arb_text(), arb_text()).prop_map(|(id, room)| Payload::Leave(LeaveEvent { id, room })),
        arb_text().prop_map(|id| Payload::LeaveAll(SocketEvent::new(id))),
        arb_text().prop_map(|id| Payload::Connect(SocketEvent::new(id))),
        arb_text().prop_map(|id| Payload::Disconnect(SocketEvent::new(id))),
        arb_traffic().prop_map(Payload::Emit),
        arb_traffic().prop_map(Payload::Recv),
        (arb_text(), arb_text())
            .prop_map(|(id, string)| Payload::String(StringEvent { id, string })),
        arb_text().prop_map(Payload::Error),
    ]
}

fn arb_envelope() -> impl Strategy<Value = Envelope> {
    prop_oneof![
        4 => arb_payload().prop_map(Envelope::new),
        1 => prop::sample::select(EventKind::ALL.to_vec()).prop_map(Envelope::empty),
    ]
}

fn arb_delimiter() -> impl Strategy<Value = Delimiter> {
    prop::sample::select(vec!["\n", "\r\n", "~~~", "\0"])
        .prop_map(|d| d.parse::<Delimiter>().expect("valid delimiter"))
}

/// Messages that never decode, none containing a delimiter byte.
fn arb_corrupt_message() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        Just(b"zzgarbage".to_vec()),
        Just(b"01%%%%".to_vec()),
        Just(b"12not-base64!".to_vec()),
        Just(b"9".to_vec()),
        Just(Vec::new()),
        "[A-Za-z0-9+/=]{0,2}".prop_map(|s| format!("42{s}").into_bytes()),
    ]
}

fn stream_of(envelopes: &[Envelope], delimiter: &Delimiter) -> Vec<u8> {
    envelopes
        .iter()
        .flat_map(|e| encode_frame(e, delimiter).expect("encode frame"))
        .collect()
}

// --- Codec ---

proptest! {
    #[test]
    fn codec_roundtrip_and_stable_reencode(envelope in arb_envelope()) {
        let first = encode(&envelope).expect("encode");
        let decoded = decode(&first).expect("decode");
        prop_assert_eq!(&decoded, &envelope);

        let second = encode(&decoded).expect("re-encode");
        prop_assert_eq!(first, second);
    }
}

// --- Framer ---

proptest! {
    #[test]
    fn framer_is_independent_of_chunk_boundaries(
        envelopes in prop::collection::vec(arb_envelope(), 0..8),
        delimiter in arb_delimiter(),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
    ) {
        let stream = stream_of(&envelopes, &delimiter);
        let mut cuts: Vec<usize> = cuts.iter().map(|i| i.index(stream.len() + 1)).collect();
        cuts.push(0);
        cuts.push(stream.len());
        cuts.sort_unstable();

        let mut decoder = FrameDecoder::new(delimiter);
        let mut received = Vec::new();
        for pair in cuts.windows(2) {
            received.extend(decoder.decode_chunk(&stream[pair[0]..pair[1]]).expect("decode"));
        }
        prop_assert_eq!(received, envelopes);
        prop_assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn corrupt_message_only_drops_itself(
        envelopes in prop::collection::vec(arb_envelope(), 1..8),
        delimiter in arb_delimiter(),
        corrupt in arb_corrupt_message(),
        position in any::<prop::sample::Index>(),
    ) {
        let at = position.index(envelopes.len() + 1);
        let mut stream = stream_of(&envelopes[..at], &delimiter);
        stream.extend_from_slice(&corrupt);
        stream.extend_from_slice(delimiter.as_bytes());
        stream.extend(stream_of(&envelopes[at..], &delimiter));

        let mut decoder = FrameDecoder::new(delimiter);
        let received = decoder.decode_chunk(&stream).expect("decode");
        prop_assert_eq!(received, envelopes);
    }
}
