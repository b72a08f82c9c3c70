//! Action/event adapters (C8): pure `Action -> Frame` and `Frame ->
//! Event` functions behind two small traits, so the wider domain-model
//! catalogue and action enumeration stay pluggable rather than baked
//! into the connector.

use blynk_wire::Opcode;

use crate::correlator::Kind;
use crate::errors::Error;
use crate::event::Event;

pub mod hardware;

/// An outbound action the caller wants to perform. This is a reference
/// subset of the full >80-case action catalogue, enough to exercise
/// every opcode the test scenarios name; real deployments typically
/// define their own, richer action enum and [`ActionEncoder`] impl.
#[derive(Debug, Clone)]
pub enum Action {
    Login { email: String, password: String, app_name: String },
    Register { email: String, password: String, app_name: String },
    ShareLogin { token: String },
    Ping,
    Logout,
    ActivateDashboard { dash_id: i32 },
    DeactivateDashboard { dash_id: i32 },
    LoadProfileGzipped { dash_id: Option<i32> },
    Hardware { dash_id: i32, device_id: i32, command: Vec<u8> },
    SetWidgetProperty { dash_id: i32, device_id: i32, pin: u8, property: String, value: String },
    /// Escape hatch for any opcode not named above: NUL-joined fields,
    /// sent as a `ResponseOnly` request.
    Raw { opcode: Opcode, fields: Vec<String> },
}

/// Encodes an [`Action`] into a frame body and states which reply kind
/// the correlator should expect.
pub trait ActionEncoder: Send + Sync {
    fn encode(&self, action: &Action) -> Result<(Opcode, Vec<u8>, Kind), Error>;
}

/// Decodes an inbound command frame the correlator did not claim into a
/// public [`Event`].
pub trait EventDecoder: Send + Sync {
    fn decode_event(&self, opcode: Opcode, payload: &[u8]) -> Option<Event>;
}

fn join_fields(fields: &[&str]) -> Vec<u8> {
    fields.join("\0").into_bytes()
}

fn split_fields(payload: &[u8]) -> Vec<String> {
    payload.split(|&b| b == 0).map(|f| String::from_utf8_lossy(f).into_owned()).collect()
}

fn parse_dash_device(s: &str) -> Option<(i32, i32)> {
    let (dash, device) = s.split_once('-')?;
    Some((dash.parse().ok()?, device.parse().ok()?))
}

/// The reference action/event adapter covering the command set exercised
/// by the test scenarios: LOGIN, REGISTER, SHARE_LOGIN, PING, LOGOUT,
/// ACTIVATE/DEACTIVATE_DASHBOARD, LOAD_PROFILE_GZIPPED, HARDWARE,
/// SET_WIDGET_PROPERTY, HARDWARE_CONNECTED, DEVICE_OFFLINE — plus a
/// generic `Raw` path for the rest of the catalogue.
#[derive(Default)]
pub struct StandardAdapter;

impl StandardAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ActionEncoder for StandardAdapter {
    fn encode(&self, action: &Action) -> Result<(Opcode, Vec<u8>, Kind), Error> {
        Ok(match action {
            Action::Login { email, password, app_name } => {
                let digest = blynk_crypto::hash_password(password, email);
                let body = join_fields(&[email, &digest, "iOS", "1.0.0", app_name]);
                (Opcode::Login, body, Kind::ResponseOnly)
            }
            Action::Register { email, password, app_name } => {
                let digest = blynk_crypto::hash_password(password, email);
                let body = join_fields(&[email, &digest, app_name]);
                (Opcode::Register, body, Kind::ResponseOnly)
            }
            Action::ShareLogin { token } => (Opcode::ShareLogin, join_fields(&[token]), Kind::ResponseOnly),
            Action::Ping => (Opcode::Ping, Vec::new(), Kind::ResponseOnly),
            Action::Logout => (Opcode::Logout, Vec::new(), Kind::ResponseOnly),
            Action::ActivateDashboard { dash_id } => {
                (Opcode::ActivateDashboard, join_fields(&[&dash_id.to_string()]), Kind::ResponseOnly)
            }
            Action::DeactivateDashboard { dash_id } => {
                (Opcode::DeactivateDashboard, join_fields(&[&dash_id.to_string()]), Kind::ResponseOnly)
            }
            Action::LoadProfileGzipped { dash_id } => {
                let body = match dash_id {
                    Some(id) => join_fields(&[&id.to_string()]),
                    None => Vec::new(),
                };
                (Opcode::LoadProfileGzipped, body, Kind::DataResponse)
            }
            Action::Hardware { dash_id, device_id, command } => {
                let tuple = format!("{dash_id}-{device_id}");
                let mut body = join_fields(&[&tuple]);
                body.push(0);
                body.extend_from_slice(command);
                (Opcode::Hardware, body, Kind::ResponseOnly)
            }
            Action::SetWidgetProperty { dash_id, device_id, pin, property, value } => {
                let tuple = format!("{dash_id}-{device_id}");
                let pin = pin.to_string();
                let body = join_fields(&[&tuple, &pin, property, value]);
                (Opcode::SetWidgetProperty, body, Kind::ResponseOnly)
            }
            Action::Raw { opcode, fields } => {
                let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
                (*opcode, join_fields(&refs), Kind::ResponseOnly)
            }
        })
    }
}

impl EventDecoder for StandardAdapter {
    fn decode_event(&self, opcode: Opcode, payload: &[u8]) -> Option<Event> {
        let fields = split_fields(payload);

        match opcode {
            Opcode::Hardware => {
                let (dash_id, device_id) = parse_dash_device(fields.first()?)?;
                let cmd = hardware::parse(fields.get(1..)?.join("\0").as_bytes())?;
                let kind = cmd.write?;
                Some(Event::HardwareMessage { dash_id, device_id, kind, pin: cmd.pin, values: cmd.values })
            }
            Opcode::SetWidgetProperty => {
                let (dash_id, device_id) = parse_dash_device(fields.first()?)?;
                let pin: u8 = fields.get(1)?.parse().ok()?;
                let property = fields.get(2)?.clone();
                let value = fields.get(3)?.clone();
                Some(Event::WidgetPropertyChanged { dash_id, device_id, pin, property, value })
            }
            Opcode::HardwareConnected => {
                let (dash_id, device_id) = parse_dash_device(fields.first()?)?;
                Some(Event::HardwareConnected { dash_id, device_id })
            }
            Opcode::DeviceOffline => {
                let (dash_id, device_id) = parse_dash_device(fields.first()?)?;
                Some(Event::DeviceOffline { dash_id, device_id })
            }
            other => Some(Event::Raw { opcode: other, payload: payload.to_vec() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_body_matches_documented_shape() {
        let adapter = StandardAdapter::new();
        let action = Action::Login {
            email: "a@b".into(),
            password: "p".into(),
            app_name: "App".into(),
        };
        let (opcode, body, kind) = adapter.encode(&action).unwrap();
        assert_eq!(opcode, Opcode::Login);
        assert_eq!(kind, Kind::ResponseOnly);

        let digest = blynk_crypto::hash_password("p", "a@b");
        let expected = format!("a@b\0{digest}\0iOS\01.0.0\0App");
        assert_eq!(body, expected.into_bytes());
    }

    #[test]
    fn hardware_body_has_tuple_then_command_bytes() {
        let adapter = StandardAdapter::new();
        let action = Action::Hardware { dash_id: 1, device_id: 0, command: b"vw\x001\x00255".to_vec() };
        let (opcode, body, _) = adapter.encode(&action).unwrap();
        assert_eq!(opcode, Opcode::Hardware);
        assert_eq!(body, b"1-0\x00vw\x001\x00255".to_vec());
    }

    #[test]
    fn decodes_hardware_write_event() {
        let adapter = StandardAdapter::new();
        let payload = b"1-0\x00vw\x001\x00255".to_vec();
        let event = adapter.decode_event(Opcode::Hardware, &payload).unwrap();
        match event {
            Event::HardwareMessage { dash_id, device_id, kind, pin, values } => {
                assert_eq!(dash_id, 1);
                assert_eq!(device_id, 0);
                assert_eq!(kind, hardware::WriteKind::Virtual);
                assert_eq!(pin, 1);
                assert_eq!(values, vec!["255".to_string()]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unrecognised_opcode_falls_back_to_raw() {
        let adapter = StandardAdapter::new();
        let event = adapter.decode_event(Opcode::CreateReport, b"x").unwrap();
        assert!(matches!(event, Event::Raw { opcode: Opcode::CreateReport, .. }));
    }
}
