// crates/mash-harness-actions/tests/helpers/mod.rs
// ============================================================================
// Module: Action Test Helpers
// Description: In-process stub device peer for integration suites.
// Purpose: Provide a scripted TLS device that speaks the framed protocol.
// Dependencies: mash-harness-net, rustls, tokio, tokio-rustls
// ============================================================================

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::net::SocketAddr;
use std::sync::Arc;

use mash_harness_net::DecodedFrame;
use mash_harness_net::FrameError;
use mash_harness_net::RenewalMessage;
use mash_harness_net::ServerIdentity;
use mash_harness_net::StatusCode;
use mash_harness_net::WireMessage;
use mash_harness_net::decode_frame;
use mash_harness_net::generate_device_csr;
use mash_harness_net::generate_self_signed_identity;
use mash_harness_net::read_frame;
use mash_harness_net::renewal_to_bytes;
use mash_harness_net::to_bytes;
use mash_harness_net::write_frame;
use rustls::ServerConfig;
use rustls_pki_types::CertificateDer;
use rustls_pki_types::PrivateKeyDer;
use rustls_pki_types::PrivatePkcs8KeyDer;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;

/// Frame cap the stub enforces, matching the harness default.
const STUB_MAX_FRAME: usize = 65_536;

/// In-process scripted device peer.
pub struct StubDevice {
    /// Bound listener address.
    pub addr: SocketAddr,
    /// Accept-loop task.
    handle: JoinHandle<()>,
}

impl StubDevice {
    /// Returns the `host:port` dial target for the stub.
    pub fn target(&self) -> String {
        format!("127.0.0.1:{}", self.addr.port())
    }
}

impl Drop for StubDevice {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawns a stub with a self-signed identity (pre-commissioning trust).
pub async fn spawn_stub() -> StubDevice {
    let identity = generate_self_signed_identity(vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
    ])
    .unwrap();
    spawn_stub_with_identity(identity).await
}

/// Spawns a stub presenting the provided identity.
pub async fn spawn_stub_with_identity(identity: ServerIdentity) -> StubDevice {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = server_config(&identity);
    let acceptor = TlsAcceptor::from(Arc::new(config));
    let handle = tokio::spawn(async move {
        loop {
            let Ok((tcp, _)) = listener.accept().await else {
                break;
            };
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                if let Ok(stream) = acceptor.accept(tcp).await {
                    serve(stream).await;
                }
            });
        }
    });
    StubDevice {
        addr,
        handle,
    }
}

/// Builds the stub's TLS server configuration.
fn server_config(identity: &ServerIdentity) -> ServerConfig {
    let chain = vec![CertificateDer::from(identity.cert_der.clone())];
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(identity.key_der.clone()));
    ServerConfig::builder().with_no_client_auth().with_single_cert(chain, key).unwrap()
}

/// Serves one connection: answers requests and pings, plays the renewal
/// peer, and closes on oversize declarations.
async fn serve(mut stream: TlsStream<TcpStream>) {
    loop {
        match read_frame(&mut stream, STUB_MAX_FRAME).await {
            Ok(payload) => {
                let Ok(frame) = decode_frame(&payload) else {
                    break;
                };
                if !handle_frame(&mut stream, frame).await {
                    break;
                }
            }
            Err(FrameError::Oversize {
                ..
            }) => {
                let close = WireMessage::ControlClose {
                    reason: "oversize frame".to_string(),
                };
                if let Ok(bytes) = to_bytes(&close) {
                    let _ = write_frame(&mut stream, &bytes, STUB_MAX_FRAME).await;
                }
                break;
            }
            Err(_) => break,
        }
    }
    let _ = stream.shutdown().await;
}

/// Handles one decoded frame; returns false when the connection should end.
async fn handle_frame(stream: &mut TlsStream<TcpStream>, frame: DecodedFrame) -> bool {
    match frame {
        DecodedFrame::Wire(message) => match message {
            WireMessage::Request {
                message_id,
                value,
                ..
            } => {
                let reply = WireMessage::Response {
                    message_id,
                    status: StatusCode::Success,
                    payload: Some(value.unwrap_or(serde_cbor::Value::Integer(42))),
                };
                send_wire(stream, &reply).await
            }
            WireMessage::ControlPing {
                sequence,
            } => {
                let reply = WireMessage::ControlPong {
                    sequence,
                };
                send_wire(stream, &reply).await
            }
            WireMessage::ControlClose {
                ..
            } => false,
            // Notifications, triggers, and stray frames are absorbed.
            _ => true,
        },
        DecodedFrame::Renewal(message) => match message {
            RenewalMessage::Request {
                ..
            } => {
                let csr = generate_device_csr("mash-dev-1").unwrap();
                let reply = RenewalMessage::Csr {
                    csr_der: csr.csr_der,
                };
                send_renewal(stream, &reply).await
            }
            RenewalMessage::Install {
                sequence, ..
            } => {
                let reply = RenewalMessage::Ack {
                    status: StatusCode::Success,
                    active_sequence: sequence,
                };
                send_renewal(stream, &reply).await
            }
            _ => true,
        },
    }
}

/// Writes one wire message; returns false on failure.
async fn send_wire(stream: &mut TlsStream<TcpStream>, message: &WireMessage) -> bool {
    match to_bytes(message) {
        Ok(bytes) => write_frame(stream, &bytes, STUB_MAX_FRAME).await.is_ok(),
        Err(_) => false,
    }
}

/// Writes one renewal message; returns false on failure.
async fn send_renewal(stream: &mut TlsStream<TcpStream>, message: &RenewalMessage) -> bool {
    match renewal_to_bytes(message) {
        Ok(bytes) => write_frame(stream, &bytes, STUB_MAX_FRAME).await.is_ok(),
        Err(_) => false,
    }
}
