//! TLS transport (C4): establishes the connection, offers a
//! single-writer send and a single-reader message stream, and sets TCP
//! keep-alive on the underlying socket.

use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;

use rustls_pki_types::ServerName;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use blynk_wire::{DecodedFrame, Decoder};

use crate::errors::Error;

const WAITING_TIMEOUT: Duration = Duration::from_secs(5);
const TCP_KEEPALIVE_IDLE: Duration = Duration::from_secs(10);
const TCP_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);
const TCP_KEEPALIVE_RETRIES: u32 = 3;

/// A pluggable TLS certificate verification policy (§9: "Must be a
/// pluggable policy hook").
pub type CertVerifier = Arc<dyn rustls::client::danger::ServerCertVerifier>;

/// The default policy: accept any certificate. Suitable for the common
/// self-signed-server deployment, unsuitable for anything that actually
/// needs the security TLS is supposed to provide. Callers targeting a
/// public deployment must supply their own [`CertVerifier`].
#[derive(Debug)]
pub struct AcceptAnyCert;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls_pki_types::CertificateDer<'_>,
        _intermediates: &[rustls_pki_types::CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls_pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls_pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls_pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

/// A stream of frames decoded from the inbound side of a [`Transport`].
/// Ends (yields `None`) on remote close or any read error — per §4.4,
/// the sole disconnect signal consumed upstream.
pub struct MessageStream {
    rx: mpsc::Receiver<DecodedFrame>,
}

impl MessageStream {
    pub async fn next(&mut self) -> Option<DecodedFrame> {
        self.rx.recv().await
    }
}

/// An established TLS connection: single-writer send, backed by a
/// background task draining the read half into a [`MessageStream`].
pub struct Transport {
    writer: Mutex<WriteHalf<TlsStream<TcpStream>>>,
    read_task: JoinHandle<()>,
}

impl Transport {
    /// Resolve `host:port`, open a TCP connection with keep-alive set,
    /// negotiate TLS under `verifier`, and start the background read
    /// loop. Forcibly fails with [`Error::Connect`] if negotiation has
    /// not completed within [`WAITING_TIMEOUT`].
    pub async fn connect(host: &str, port: u16, verifier: CertVerifier) -> Result<(Self, MessageStream), Error> {
        tokio::time::timeout(WAITING_TIMEOUT, Self::connect_inner(host, port, verifier))
            .await
            .map_err(|_| Error::Connect("timed out waiting for TLS negotiation".into()))?
    }

    async fn connect_inner(host: &str, port: u16, verifier: CertVerifier) -> Result<(Self, MessageStream), Error> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| Error::Connect(e.to_string()))?
            .next()
            .ok_or_else(|| Error::Connect(format!("no addresses resolved for {host}:{port}")))?;

        let tcp = TcpStream::connect(addr).await.map_err(|e| Error::Connect(e.to_string()))?;
        set_keepalive(&tcp).map_err(|e| Error::Connect(e.to_string()))?;

        let tls_config = rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(verifier)
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(tls_config));

        let server_name =
            ServerName::try_from(host.to_string()).map_err(|e| Error::Connect(e.to_string()))?;
        let tls_stream =
            connector.connect(server_name, tcp).await.map_err(|e| Error::Connect(e.to_string()))?;

        let (mut read_half, write_half) = tokio::io::split(tls_stream);
        let (tx, rx) = mpsc::channel(64);

        let read_task = tokio::spawn(async move {
            use tokio::io::AsyncReadExt;

            let mut decoder = Decoder::new();
            let mut buf = [0u8; 8192];
            loop {
                match read_half.read(&mut buf).await {
                    Ok(0) => {
                        tracing::debug!("transport read half closed by peer");
                        break;
                    }
                    Ok(n) => {
                        for frame in decoder.feed(&buf[..n]) {
                            if tx.send(frame).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%err, "transport read error, terminating message stream");
                        break;
                    }
                }
            }
        });

        Ok((Self { writer: Mutex::new(write_half), read_task }, MessageStream { rx }))
    }

    /// Write a complete frame to the wire. Concurrent callers are
    /// serialized by the internal mutex so the byte stream stays
    /// well-framed.
    pub async fn send(&self, bytes: &[u8]) -> Result<(), Error> {
        let mut writer = self.writer.lock().await;
        writer.write_all(bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Close the connection and stop the background read loop.
    pub async fn disconnect(&self) {
        self.read_task.abort();
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

fn set_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    let sock_ref = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(TCP_KEEPALIVE_IDLE)
        .with_interval(TCP_KEEPALIVE_INTERVAL)
        .with_retries(TCP_KEEPALIVE_RETRIES);
    sock_ref.set_tcp_keepalive(&keepalive)
}
