//! Dispatches decoded frames to either a pending request or the public
//! event stream.

use blynk_wire::{DecodedFrame, ResponseCode};

use crate::adapter::EventDecoder;
use crate::correlator::Correlator;
use crate::event::Event;

/// Route one decoded frame (§4.6). Mutates `correlator` if the frame
/// resolves a pending request; otherwise hands the frame to `adapter` to
/// become a public [`Event`].
pub fn route(frame: DecodedFrame, correlator: &mut Correlator, adapter: &dyn EventDecoder) -> Option<Event> {
    match frame {
        DecodedFrame::Response { id, code } => {
            let code = ResponseCode::from(code);
            if correlator.resolve_response(id, code) {
                None
            } else {
                Some(Event::Response { id, code })
            }
        }
        DecodedFrame::Command { opcode, id, payload } => {
            if correlator.resolve_data(id, opcode, payload.clone()) {
                return None;
            }
            adapter.decode_event(opcode, &payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::StandardAdapter;
    use crate::correlator::Kind;
    use blynk_wire::Opcode;
    use std::time::Duration;

    #[test]
    fn unmatched_response_becomes_event() {
        let mut c = Correlator::new();
        let adapter = StandardAdapter::new();
        let ev = route(DecodedFrame::Response { id: 9, code: 19 }, &mut c, &adapter);
        assert!(matches!(ev, Some(Event::Response { id: 9, code: ResponseCode::ServerError })));
    }

    #[test]
    fn matched_response_resolves_silently() {
        let mut c = Correlator::new();
        let (id, _rx) = c.allocate(Kind::ResponseOnly, Duration::from_secs(10)).unwrap();
        let adapter = StandardAdapter::new();
        let ev = route(DecodedFrame::Response { id, code: 200 }, &mut c, &adapter);
        assert!(ev.is_none());
    }

    #[test]
    fn matched_data_response_resolves_silently() {
        let mut c = Correlator::new();
        let (id, _rx) = c.allocate(Kind::DataResponse, Duration::from_secs(10)).unwrap();
        let adapter = StandardAdapter::new();
        let frame = DecodedFrame::Command { opcode: Opcode::LoadProfileGzipped, id, payload: b"78 9c".to_vec() };
        let ev = route(frame, &mut c, &adapter);
        assert!(ev.is_none());
    }

    #[test]
    fn unmatched_command_becomes_domain_event() {
        let mut c = Correlator::new();
        let adapter = StandardAdapter::new();
        let frame = DecodedFrame::Command { opcode: Opcode::DeviceOffline, id: 5, payload: b"1-0".to_vec() };
        let ev = route(frame, &mut c, &adapter);
        assert!(matches!(ev, Some(Event::DeviceOffline { dash_id: 1, device_id: 0 })));
    }
}
