//! Async client for a Blynk-family legacy IoT control server.
//!
//! Owns the TLS transport, the request correlator, the keep-alive ticker
//! and the reconnect/re-auth state machine described by [`Connector`].
//! The wire-level primitives live in `blynk-wire`; the password digest
//! lives in `blynk-crypto`.

pub mod adapter;
pub mod connector;
pub mod correlator;
pub mod errors;
pub mod event;
pub mod retry;
pub mod router;
pub mod transport;

pub use adapter::{Action, ActionEncoder, EventDecoder, StandardAdapter};
pub use connector::{Adapter, Config, Connector};
pub use correlator::{Correlator, Kind, Outcome};
pub use errors::Error;
pub use event::Event;
pub use retry::{ladder_delay, ExponentialLadder, NoRetries, RetryContext, RetryPolicy};
pub use transport::{AcceptAnyCert, CertVerifier};
