//! Session controller (C7): the public surface. Owns the transport, the
//! correlator, the keep-alive ticker and the reconnect/re-auth state
//! machine.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use blynk_wire::ResponseCode;

use crate::adapter::{Action, ActionEncoder, EventDecoder};
use crate::correlator::{Correlator, Kind, Outcome};
use crate::errors::Error;
use crate::event::Event;
use crate::retry::{ladder_delay, ExponentialLadder, RetryContext, RetryPolicy};
use crate::transport::{AcceptAnyCert, CertVerifier, Transport};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A combined action encoder and event decoder. [`crate::adapter::StandardAdapter`]
/// implements this via the blanket impl below; callers with their own
/// domain model implement both halves and get `Adapter` for free.
pub trait Adapter: ActionEncoder + EventDecoder {}
impl<T: ActionEncoder + EventDecoder> Adapter for T {}

/// Configuration recognized by the controller (§6).
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub response_timeout: Duration,
    pub ping_interval: Duration,
    pub reconnect_base_delay: Duration,
    pub reconnect_max_delay: Duration,
    pub max_reconnect_attempts: u32,
    pub tls_verify: CertVerifier,
    /// Consulted after every failed reconnect attempt, ahead of the
    /// built-in ladder. The default always defers to it; pass
    /// [`crate::retry::NoRetries`] (or a custom policy) to veto retries
    /// or substitute a different delay.
    pub retry_policy: Arc<dyn RetryPolicy>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 9443,
            response_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(10),
            reconnect_base_delay: Duration::from_secs(2),
            reconnect_max_delay: Duration::from_secs(30),
            max_reconnect_attempts: 10,
            tls_verify: Arc::new(AcceptAnyCert),
            retry_policy: Arc::new(ExponentialLadder),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportState {
    Disconnected,
    Connecting,
    Up,
    Reconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthState {
    Anonymous,
    Authenticating,
    Authenticated,
}

#[derive(Debug, Clone)]
enum SavedCredentials {
    None,
    Password { email: String, password: String, app_name: String },
    ShareToken(String),
}

struct Session {
    transport_state: TransportState,
    auth_state: AuthState,
    saved_credentials: SavedCredentials,
    active_dashboard_id: Option<i32>,
    reconnect_attempt: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            transport_state: TransportState::Disconnected,
            auth_state: AuthState::Anonymous,
            saved_credentials: SavedCredentials::None,
            active_dashboard_id: None,
            reconnect_attempt: 0,
        }
    }
}

struct Inner {
    config: Config,
    adapter: Arc<dyn Adapter>,
    transport: Mutex<Option<Arc<Transport>>>,
    correlator: Mutex<Correlator>,
    session: Mutex<Session>,
    events_tx: broadcast::Sender<Event>,
    pump_task: Mutex<Option<JoinHandle<()>>>,
    ticker_task: Mutex<Option<JoinHandle<()>>>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
}

/// The session controller. Cheap to clone — internally `Arc`-wrapped,
/// same shape as every other handle in this crate family.
#[derive(Clone)]
pub struct Connector {
    inner: Arc<Inner>,
}

impl Connector {
    pub fn new(config: Config, adapter: Arc<dyn Adapter>) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                config,
                adapter,
                transport: Mutex::new(None),
                correlator: Mutex::new(Correlator::new()),
                session: Mutex::new(Session::default()),
                events_tx,
                pump_task: Mutex::new(None),
                ticker_task: Mutex::new(None),
                reconnect_task: Mutex::new(None),
            }),
        }
    }

    /// Subscribe to the public event stream. Every subscriber receives
    /// every event from the point of subscription onward.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events_tx.subscribe()
    }

    /// The dashboard most recently activated by this connection, if any.
    pub async fn active_dashboard(&self) -> Option<i32> {
        self.inner.session.lock().await.active_dashboard_id
    }

    /// Establish the link, authenticate with `email`/`password`, and
    /// start the keep-alive ticker on success.
    pub async fn connect(&self, email: &str, password: &str, app_name: &str) -> Result<(), Error> {
        self.open_transport().await?;
        self.authenticate(Action::Login {
            email: email.to_string(),
            password: password.to_string(),
            app_name: app_name.to_string(),
        })
        .await?;
        *self.inner.session.lock().await = Session {
            transport_state: TransportState::Up,
            auth_state: AuthState::Authenticated,
            saved_credentials: SavedCredentials::Password {
                email: email.to_string(),
                password: password.to_string(),
                app_name: app_name.to_string(),
            },
            active_dashboard_id: None,
            reconnect_attempt: 0,
        };
        self.start_ticker();
        Ok(())
    }

    /// Establish the link and authenticate with a previously issued
    /// share token.
    pub async fn connect_with_share_token(&self, token: &str) -> Result<(), Error> {
        self.open_transport().await?;
        self.authenticate(Action::ShareLogin { token: token.to_string() }).await?;
        *self.inner.session.lock().await = Session {
            transport_state: TransportState::Up,
            auth_state: AuthState::Authenticated,
            saved_credentials: SavedCredentials::ShareToken(token.to_string()),
            active_dashboard_id: None,
            reconnect_attempt: 0,
        };
        self.start_ticker();
        Ok(())
    }

    /// Register a new account. Disconnects regardless of outcome, per §4.7.
    pub async fn register(&self, email: &str, password: &str, app_name: &str) -> Result<(), Error> {
        self.open_transport().await?;
        let result = self.authenticate(Action::Register {
            email: email.to_string(),
            password: password.to_string(),
            app_name: app_name.to_string(),
        })
        .await;
        self.disconnect().await;
        result
    }

    async fn authenticate(&self, action: Action) -> Result<(), Error> {
        self.inner.session.lock().await.auth_state = AuthState::Authenticating;
        match self.do_send(action).await {
            Ok(Outcome::Response(code)) if code.is_ok() => Ok(()),
            Ok(Outcome::Response(code)) => Err(Error::Auth(code)),
            Ok(Outcome::Data { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn open_transport(&self) -> Result<(), Error> {
        self.inner.session.lock().await.transport_state = TransportState::Connecting;
        let (transport, messages) =
            Transport::connect(&self.inner.config.host, self.inner.config.port, self.inner.config.tls_verify.clone())
                .await?;
        let transport = Arc::new(transport);
        *self.inner.transport.lock().await = Some(transport);
        *self.inner.correlator.lock().await = Correlator::new();

        let inner = self.inner.clone();
        let task = tokio::spawn(Self::pump(inner, messages));
        *self.inner.pump_task.lock().await = Some(task);
        Ok(())
    }

    async fn pump(inner: Arc<Inner>, mut messages: crate::transport::MessageStream) {
        while let Some(frame) = messages.next().await {
            let event = {
                let mut correlator = inner.correlator.lock().await;
                correlator.expire_deadlines();
                crate::router::route(frame, &mut correlator, inner.adapter.as_ref())
            };
            if let Some(event) = event {
                let _ = inner.events_tx.send(event);
            }
        }
        Self::on_transport_ended(inner).await;
    }

    async fn on_transport_ended(inner: Arc<Inner>) {
        {
            let mut correlator = inner.correlator.lock().await;
            correlator.fail_all(|| Error::ConnectionClosed);
        }
        *inner.transport.lock().await = None;

        let should_reconnect = {
            let mut session = inner.session.lock().await;
            if session.transport_state == TransportState::Disconnected {
                false
            } else {
                session.transport_state = TransportState::Reconnecting;
                session.reconnect_attempt = 1;
                true
            }
        };
        if !should_reconnect {
            return;
        }

        let task = tokio::spawn(Self::reconnect_loop(inner.clone()));
        *inner.reconnect_task.lock().await = Some(task);
    }

    async fn reconnect_loop(inner: Arc<Inner>) {
        let started_at = tokio::time::Instant::now();
        loop {
            let attempt = inner.session.lock().await.reconnect_attempt;
            if attempt > inner.config.max_reconnect_attempts {
                let mut session = inner.session.lock().await;
                session.transport_state = TransportState::Disconnected;
                let _ = inner.events_tx.send(Event::Disconnected);
                return;
            }

            let delay = ladder_delay(attempt, inner.config.reconnect_base_delay, inner.config.reconnect_max_delay);
            tokio::time::sleep(delay).await;
            let _ = inner.events_tx.send(Event::Reconnecting { attempt });

            match Self::try_reconnect_once(&inner).await {
                Ok(()) => {
                    let mut session = inner.session.lock().await;
                    session.transport_state = TransportState::Up;
                    session.auth_state = AuthState::Authenticated;
                    session.reconnect_attempt = 0;
                    drop(session);
                    let _ = inner.events_tx.send(Event::Reconnected);
                    Self::spawn_ticker(inner.clone()).await;
                    return;
                }
                Err(err) => {
                    tracing::warn!(%err, attempt, "reconnect attempt failed");
                    let ctx = RetryContext {
                        attempt: std::num::NonZeroU32::new(attempt.max(1)).unwrap(),
                        elapsed: started_at.elapsed(),
                        error: err,
                    };
                    if inner.config.retry_policy.should_retry(&ctx).is_break() {
                        let mut session = inner.session.lock().await;
                        session.transport_state = TransportState::Disconnected;
                        drop(session);
                        let _ = inner.events_tx.send(Event::Disconnected);
                        return;
                    }
                    inner.session.lock().await.reconnect_attempt += 1;
                }
            }
        }
    }

    async fn try_reconnect_once(inner: &Arc<Inner>) -> Result<(), Error> {
        let (transport, messages) =
            Transport::connect(&inner.config.host, inner.config.port, inner.config.tls_verify.clone()).await?;
        let transport = Arc::new(transport);

        let credentials = inner.session.lock().await.saved_credentials.clone();
        let action = match credentials {
            SavedCredentials::Password { email, password, app_name } => {
                Action::Login { email, password, app_name }
            }
            SavedCredentials::ShareToken(token) => Action::ShareLogin { token },
            SavedCredentials::None => {
                transport.disconnect().await;
                return Err(Error::Auth(ResponseCode::UserNotAuthenticated));
            }
        };

        *inner.transport.lock().await = Some(transport.clone());
        *inner.correlator.lock().await = Correlator::new();

        // Spawn the pump before sending the re-auth frame: the RESPONSE that
        // resolves it is only read and routed by the pump, same ordering as
        // `open_transport`.
        let pump_inner = inner.clone();
        let task = tokio::spawn(Self::pump(pump_inner, messages));
        *inner.pump_task.lock().await = Some(task);

        let (opcode, body, kind) = match inner.adapter.encode(&action) {
            Ok(v) => v,
            Err(err) => {
                transport.disconnect().await;
                return Err(err);
            }
        };

        let outcome = match Self::send_via(inner, &transport, opcode, kind, body).await {
            Ok(outcome) => outcome,
            Err(err) => {
                transport.disconnect().await;
                return Err(err);
            }
        };

        match outcome {
            Outcome::Response(code) if code.is_ok() => Ok(()),
            Outcome::Response(code) => {
                transport.disconnect().await;
                Err(Error::Auth(code))
            }
            Outcome::Data { .. } => Ok(()),
        }
    }

    fn start_ticker(&self) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            Self::spawn_ticker(inner).await;
        });
    }

    async fn spawn_ticker(inner: Arc<Inner>) {
        if let Some(old) = inner.ticker_task.lock().await.take() {
            old.abort();
        }
        let ticker_inner = inner.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(ticker_inner.config.ping_interval).await;
                let transport = ticker_inner.transport.lock().await.clone();
                let Some(transport) = transport else { break };
                if let Err(err) = Self::send_via(&ticker_inner, &transport, blynk_wire::Opcode::Ping, Kind::ResponseOnly, Vec::new()).await {
                    tracing::debug!(%err, "keep-alive ping failed, awaiting transport termination");
                }
            }
        });
        *inner.ticker_task.lock().await = Some(task);
    }

    /// Encode and send `action`, awaiting the correlator handle. A
    /// `ResponseOnly` outcome carrying a non-OK code is reported as
    /// `Err(Error::Server(code))`; callers that need the raw code (or a
    /// `Data` payload to decompress themselves) should match on the
    /// error instead of inspecting a successful `Outcome`.
    pub async fn send(&self, action: Action) -> Result<Outcome, Error> {
        match self.do_send(action).await? {
            Outcome::Response(code) if !code.is_ok() => Err(Error::Server(code)),
            outcome => Ok(outcome),
        }
    }

    async fn do_send(&self, action: Action) -> Result<Outcome, Error> {
        let transport = self.inner.transport.lock().await.clone().ok_or(Error::NotConnected)?;
        let (opcode, body, kind) = self.inner.adapter.encode(&action)?;
        Self::send_via(&self.inner, &transport, opcode, kind, body).await
    }

    async fn send_via(
        inner: &Arc<Inner>,
        transport: &Arc<Transport>,
        opcode: blynk_wire::Opcode,
        kind: Kind,
        body: Vec<u8>,
    ) -> Result<Outcome, Error> {
        let (id, rx) = inner.correlator.lock().await.allocate(kind, inner.config.response_timeout)?;
        let frame = blynk_wire::encode_command(opcode, id, &body);
        transport.send(&frame).await?;

        // Independent of any inbound traffic: even a silent peer must not
        // hang this request past its own deadline.
        match tokio::time::timeout(inner.config.response_timeout, rx).await {
            Ok(resolved) => resolved.map_err(|_| Error::Cancelled)?,
            Err(_) => {
                inner.correlator.lock().await.discard(id);
                Err(Error::Timeout)
            }
        }
    }

    /// Activate a dashboard for this connection (hardware commands
    /// against it become valid once this resolves OK).
    pub async fn activate_dashboard(&self, dash_id: i32) -> Result<(), Error> {
        match self.do_send(Action::ActivateDashboard { dash_id }).await? {
            Outcome::Response(code) if code.is_ok() => {
                self.inner.session.lock().await.active_dashboard_id = Some(dash_id);
                Ok(())
            }
            Outcome::Response(code) => Err(Error::Server(code)),
            Outcome::Data { .. } => Ok(()),
        }
    }

    /// Deactivate whichever dashboard is currently active.
    pub async fn deactivate_dashboard(&self, dash_id: i32) -> Result<(), Error> {
        match self.do_send(Action::DeactivateDashboard { dash_id }).await? {
            Outcome::Response(code) if code.is_ok() => {
                self.inner.session.lock().await.active_dashboard_id = None;
                Ok(())
            }
            Outcome::Response(code) => Err(Error::Server(code)),
            Outcome::Data { .. } => Ok(()),
        }
    }

    /// Stop the ticker, cancel any in-flight reconnect, close the
    /// transport, and fail every pending request with `ConnectionClosed`.
    pub async fn disconnect(&self) {
        {
            let mut session = self.inner.session.lock().await;
            session.transport_state = TransportState::Disconnected;
            session.auth_state = AuthState::Anonymous;
            session.active_dashboard_id = None;
        }

        if let Some(task) = self.inner.ticker_task.lock().await.take() {
            task.abort();
        }
        if let Some(task) = self.inner.reconnect_task.lock().await.take() {
            task.abort();
        }
        if let Some(task) = self.inner.pump_task.lock().await.take() {
            task.abort();
        }

        if let Some(transport) = self.inner.transport.lock().await.take() {
            transport.disconnect().await;
        }

        self.inner.correlator.lock().await.fail_all(|| Error::ConnectionClosed);
        let _ = self.inner.events_tx.send(Event::Disconnected);
    }
}
