//! End-to-end scenario tests driven at the component boundary (frame
//! codec + correlator + router + adapter), since a live TLS server isn't
//! available in this suite.

use std::time::Duration;

use blynk_client::adapter::{Action, ActionEncoder, EventDecoder, StandardAdapter};
use blynk_client::correlator::{Correlator, Kind, Outcome};
use blynk_client::event::Event;
use blynk_client::router;
use blynk_wire::{encode_response, DecodedFrame, Decoder, Opcode, ResponseCode};

#[test]
fn s1_ping_pong_round_trip() {
    let bytes = blynk_wire::encode_command(Opcode::Ping, 42, &[]);
    assert_eq!(bytes, vec![0x06, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x00]);

    let mut decoder = Decoder::new();
    let frames = decoder.feed(&bytes);
    assert_eq!(frames, vec![DecodedFrame::Command { opcode: Opcode::Ping, id: 42, payload: vec![] }]);
}

#[test]
fn s2_login_frame_shape() {
    let adapter = StandardAdapter::new();
    let action =
        Action::Login { email: "a@b".into(), password: "p".into(), app_name: "App".into() };
    let (opcode, body, kind) = adapter.encode(&action).unwrap();
    assert_eq!(opcode, Opcode::Login);
    assert_eq!(kind, Kind::ResponseOnly);

    let digest = blynk_crypto::hash_password("p", "a@b");
    assert_eq!(body, format!("a@b\0{digest}\0iOS\01.0.0\0App").into_bytes());
}

#[test]
fn s3_ok_response_resolves_pending_with_no_event() {
    let mut correlator = Correlator::new();
    let (id, mut rx) = correlator.allocate(Kind::ResponseOnly, Duration::from_secs(10)).unwrap();
    assert_eq!(id, 7);

    let bytes = encode_response(7, 200);
    let mut decoder = Decoder::new();
    let frames = decoder.feed(&bytes);
    assert_eq!(frames, vec![DecodedFrame::Response { id: 7, code: 200 }]);

    let adapter = StandardAdapter::new();
    let event = router::route(frames.into_iter().next().unwrap(), &mut correlator, &adapter);
    assert!(event.is_none());
    assert!(matches!(rx.try_recv().unwrap().unwrap(), Outcome::Response(ResponseCode::Ok)));
}

#[test]
fn s4_unmatched_response_becomes_event() {
    let mut correlator = Correlator::new();
    let bytes = encode_response(9, 19);
    let mut decoder = Decoder::new();
    let frame = decoder.feed(&bytes).into_iter().next().unwrap();

    let adapter = StandardAdapter::new();
    let event = router::route(frame, &mut correlator, &adapter);
    assert!(matches!(event, Some(Event::Response { id: 9, code: ResponseCode::ServerError })));
}

#[test]
fn s5_profile_load_dual_reply_resolves_with_compressed_frame() {
    let mut correlator = Correlator::new();
    let (id, mut rx) = correlator.allocate(Kind::DataResponse, Duration::from_secs(10)).unwrap();

    let profile_json = b"{\"dashBoards\":[]}";
    let compressed = {
        use std::io::Write;
        let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(profile_json).unwrap();
        enc.finish().unwrap()
    };
    assert_eq!(&compressed[..2], &[0x78, 0x9C]);

    let bytes = blynk_wire::encode_command(Opcode::LoadProfileGzipped, id, &compressed);
    let mut decoder = Decoder::new();
    let frame = decoder.feed(&bytes).into_iter().next().unwrap();

    let adapter = StandardAdapter::new();
    let event = router::route(frame, &mut correlator, &adapter);
    assert!(event.is_none());

    let outcome = rx.try_recv().unwrap().unwrap();
    let Outcome::Data { opcode, payload } = outcome else { panic!("expected Data outcome") };
    assert_eq!(opcode, Opcode::LoadProfileGzipped);
    let decompressed = blynk_wire::maybe_decompress(&payload).unwrap();
    assert_eq!(decompressed, profile_json);
}

#[test]
fn s6_disconnect_cancels_in_flight_handles() {
    let mut correlator = Correlator::new();
    let (_id1, mut rx1) = correlator.allocate(Kind::ResponseOnly, Duration::from_secs(10)).unwrap();
    let (_id2, mut rx2) = correlator.allocate(Kind::ResponseOnly, Duration::from_secs(10)).unwrap();

    correlator.fail_all(|| blynk_client::Error::ConnectionClosed);

    assert!(matches!(rx1.try_recv().unwrap(), Err(blynk_client::Error::ConnectionClosed)));
    assert!(matches!(rx2.try_recv().unwrap(), Err(blynk_client::Error::ConnectionClosed)));
}

#[test]
fn hash_determinism_across_email_case() {
    let a = blynk_crypto::hash_password("p", "A@B.COM");
    let b = blynk_crypto::hash_password("p", "a@b.com");
    assert_eq!(a, b);
}
