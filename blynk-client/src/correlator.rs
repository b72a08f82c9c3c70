//! Request/response correlation by wrapping 16-bit message id.
//!
//! One [`Correlator`] lives for the lifetime of a single TLS session; a
//! fresh one is built on every reconnect, which is what makes
//! [`Correlator::fail_all`] on disconnect sufficient to settle every
//! request a prior session left hanging.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use blynk_wire::{Opcode, ResponseCode};

use crate::errors::Error;

/// What a pending request resolves with.
#[derive(Debug)]
pub enum Outcome {
    /// A RESPONSE frame arrived for a `ResponseOnly` request.
    Response(ResponseCode),
    /// A command-shaped frame arrived for a `DataResponse` request.
    Data { opcode: Opcode, payload: Vec<u8> },
}

/// Which reply shape a pending request expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Resolves on a RESPONSE frame carrying this id.
    ResponseOnly,
    /// Resolves on a non-RESPONSE frame carrying this id (e.g. profile load).
    DataResponse,
}

struct Entry {
    kind: Kind,
    deadline: Instant,
    resolver: oneshot::Sender<Result<Outcome, Error>>,
}

/// The pending-request table: `message_id -> PendingRequest`, plus the
/// wrapping 16-bit id counter.
#[derive(Default)]
pub struct Correlator {
    next_id: u16,
    pending: HashMap<u16, Entry>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id, register a pending entry of `kind` with the
    /// given `timeout`, and return the id plus the receiver half the
    /// caller awaits. Fails with [`Error::Saturated`] if every id in the
    /// 16-bit space is currently pending.
    pub fn allocate(
        &mut self,
        kind: Kind,
        timeout: Duration,
    ) -> Result<(u16, oneshot::Receiver<Result<Outcome, Error>>), Error> {
        let start = self.next_id;
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);

            if !self.pending.contains_key(&id) {
                let (tx, rx) = oneshot::channel();
                self.pending.insert(
                    id,
                    Entry { kind, deadline: Instant::now() + timeout, resolver: tx },
                );
                return Ok((id, rx));
            }

            if self.next_id == start {
                return Err(Error::Saturated);
            }
        }
    }

    /// Handle an inbound RESPONSE frame. Returns `true` if it resolved a
    /// pending request (so the router should not also emit it as an
    /// event).
    pub fn resolve_response(&mut self, id: u16, code: ResponseCode) -> bool {
        match self.pending.get(&id).map(|e| e.kind) {
            Some(Kind::ResponseOnly) => {
                let entry = self.pending.remove(&id).expect("checked above");
                let _ = entry.resolver.send(Ok(Outcome::Response(code)));
                true
            }
            Some(Kind::DataResponse) => {
                if !code.is_ok() {
                    let entry = self.pending.remove(&id).expect("checked above");
                    let _ = entry.resolver.send(Err(Error::Server(code)));
                    true
                } else {
                    // Expected reply is the forthcoming command frame; leave pending.
                    false
                }
            }
            None => false,
        }
    }

    /// Handle an inbound command frame. Returns `true` if it resolved a
    /// pending `DataResponse` request.
    pub fn resolve_data(&mut self, id: u16, opcode: Opcode, payload: Vec<u8>) -> bool {
        match self.pending.get(&id).map(|e| e.kind) {
            Some(Kind::DataResponse) => {
                let entry = self.pending.remove(&id).expect("checked above");
                let _ = entry.resolver.send(Ok(Outcome::Data { opcode, payload }));
                true
            }
            _ => false,
        }
    }

    /// Fail every pending entry with `error`. Called on disconnect.
    pub fn fail_all(&mut self, error_factory: impl Fn() -> Error) {
        for (_, entry) in self.pending.drain() {
            let _ = entry.resolver.send(Err(error_factory()));
        }
    }

    /// Settle any entry whose deadline has passed with [`Error::Timeout`].
    pub fn expire_deadlines(&mut self) {
        let now = Instant::now();
        let expired: Vec<u16> =
            self.pending.iter().filter(|(_, e)| e.deadline <= now).map(|(id, _)| *id).collect();
        for id in expired {
            if let Some(entry) = self.pending.remove(&id) {
                let _ = entry.resolver.send(Err(Error::Timeout));
            }
        }
    }

    /// Number of currently pending requests. Exposed for tests/diagnostics.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop a pending entry without resolving it. Used when the caller
    /// gave up waiting on its own timeout and the id should not linger
    /// in the table until `expire_deadlines` next runs.
    pub fn discard(&mut self, id: u16) {
        self.pending.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_only_resolves_on_response_frame() {
        let mut c = Correlator::new();
        let (id, mut rx) = c.allocate(Kind::ResponseOnly, Duration::from_secs(10)).unwrap();
        assert!(c.resolve_response(id, ResponseCode::Ok));
        let outcome = rx.try_recv().unwrap().unwrap();
        assert!(matches!(outcome, Outcome::Response(ResponseCode::Ok)));
    }

    #[test]
    fn data_response_stays_pending_on_ok_response() {
        let mut c = Correlator::new();
        let (id, _rx) = c.allocate(Kind::DataResponse, Duration::from_secs(10)).unwrap();
        assert!(!c.resolve_response(id, ResponseCode::Ok));
        assert_eq!(c.pending_count(), 1);
    }

    #[test]
    fn data_response_fails_on_error_response() {
        let mut c = Correlator::new();
        let (id, mut rx) = c.allocate(Kind::DataResponse, Duration::from_secs(10)).unwrap();
        assert!(c.resolve_response(id, ResponseCode::ServerError));
        assert!(matches!(rx.try_recv().unwrap(), Err(Error::Server(ResponseCode::ServerError))));
    }

    #[test]
    fn data_response_resolves_on_command_frame() {
        let mut c = Correlator::new();
        let (id, mut rx) = c.allocate(Kind::DataResponse, Duration::from_secs(10)).unwrap();
        assert!(c.resolve_data(id, Opcode::LoadProfileGzipped, b"payload".to_vec()));
        let outcome = rx.try_recv().unwrap().unwrap();
        assert!(matches!(outcome, Outcome::Data { opcode: Opcode::LoadProfileGzipped, .. }));
    }

    #[test]
    fn unmatched_ids_resolve_nothing() {
        let mut c = Correlator::new();
        assert!(!c.resolve_response(99, ResponseCode::Ok));
        assert!(!c.resolve_data(99, Opcode::Ping, vec![]));
    }

    #[test]
    fn fail_all_settles_every_pending_entry() {
        let mut c = Correlator::new();
        let (_, mut rx1) = c.allocate(Kind::ResponseOnly, Duration::from_secs(10)).unwrap();
        let (_, mut rx2) = c.allocate(Kind::DataResponse, Duration::from_secs(10)).unwrap();
        c.fail_all(|| Error::ConnectionClosed);
        assert!(matches!(rx1.try_recv().unwrap(), Err(Error::ConnectionClosed)));
        assert!(matches!(rx2.try_recv().unwrap(), Err(Error::ConnectionClosed)));
        assert_eq!(c.pending_count(), 0);
    }

    #[test]
    fn allocation_wraps_and_skips_ids_still_pending() {
        let mut c = Correlator::new();
        c.next_id = u16::MAX;
        let (first, _rx1) = c.allocate(Kind::ResponseOnly, Duration::from_secs(10)).unwrap();
        assert_eq!(first, u16::MAX);
        let (second, _rx2) = c.allocate(Kind::ResponseOnly, Duration::from_secs(10)).unwrap();
        assert_eq!(second, 0);
    }

    #[test]
    fn discard_frees_the_id_without_resolving() {
        let mut c = Correlator::new();
        let (id, rx) = c.allocate(Kind::ResponseOnly, Duration::from_secs(10)).unwrap();
        c.discard(id);
        assert_eq!(c.pending_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn saturation_is_reported_when_every_id_is_pending() {
        let mut c = Correlator::new();
        let mut rxs = Vec::new();
        for _ in 0..=u16::MAX {
            let (_id, rx) = c.allocate(Kind::ResponseOnly, Duration::from_secs(10)).unwrap();
            rxs.push(rx);
        }
        assert!(matches!(c.allocate(Kind::ResponseOnly, Duration::from_secs(10)), Err(Error::Saturated)));
    }
}
