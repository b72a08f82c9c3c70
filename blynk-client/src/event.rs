//! Domain events delivered on the public event stream.

use blynk_wire::ResponseCode;

use crate::adapter::hardware::WriteKind;

/// A domain event produced by the router or the connector itself.
#[derive(Debug, Clone)]
pub enum Event {
    /// A RESPONSE frame that did not resolve any pending request — a
    /// server-originated status notification.
    Response { id: u16, code: ResponseCode },
    /// A hardware pin write/read reached this connection.
    HardwareMessage {
        dash_id: i32,
        device_id: i32,
        kind: WriteKind,
        pin: u8,
        values: Vec<String>,
    },
    /// A widget property changed server-side.
    WidgetPropertyChanged { dash_id: i32, device_id: i32, pin: u8, property: String, value: String },
    /// A hardware board attached to this connection.
    HardwareConnected { dash_id: i32, device_id: i32 },
    /// A hardware board detached.
    HardwareDisconnected { dash_id: i32, device_id: i32 },
    /// A device went offline.
    DeviceOffline { dash_id: i32, device_id: i32 },
    /// Catch-all for a recognised opcode this adapter does not decode further.
    Raw { opcode: blynk_wire::Opcode, payload: Vec<u8> },
    /// The controller has entered the reconnect loop.
    Reconnecting { attempt: u32 },
    /// The reconnect loop succeeded and the session is usable again.
    Reconnected,
    /// The controller has given up reconnecting, or `disconnect()` was called.
    Disconnected,
}
