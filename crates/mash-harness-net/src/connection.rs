// crates/mash-harness-net/src/connection.rs
// ============================================================================
// Module: Connection Lifecycle
// Description: One framed TLS channel with its reader task and correlator.
// Purpose: Drive dial, handshake, post-handshake, request, and close paths.
// Dependencies: crate::{correlator, frame, protocol, verifier}, tokio, tokio-rustls
// ============================================================================

//! ## Overview
//! A connection owns its socket exclusively: all sends route through the
//! framer on the write half, and a single reader task owns the read half,
//! decoding frames and routing them through the correlator. The lifecycle
//! runs Disconnected -> Dialing -> TcpConnected -> TlsConnected ->
//! Operational, with Closing on the way back down. Any I/O failure
//! fast-paths to Disconnected with the last error retained; crypto material
//! held on the connection is cleared on disconnect.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use mash_harness_core::CryptoState;
use rustls::HandshakeKind;
use rustls::ProtocolVersion;
use rustls_pki_types::ServerName;
use serde_cbor::Value as CborValue;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::io::ReadHalf;
use tokio::io::WriteHalf;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::cert::issued_by_zone_ca;
use crate::correlator::Correlator;
use crate::correlator::InboundQueues;
use crate::correlator::InboundSenders;
use crate::correlator::dispatch_inbound;
use crate::correlator::inbound_channel;
use crate::frame::FrameError;
use crate::frame::read_frame;
use crate::frame::write_frame;
use crate::frame::write_length_only;
use crate::protocol::Operation;
use crate::protocol::RenewalMessage;
use crate::protocol::StatusCode;
use crate::protocol::WireError;
use crate::protocol::WireMessage;
use crate::protocol::decode_frame;
use crate::protocol::renewal_to_bytes;
use crate::protocol::to_bytes;
use crate::verifier::TlsContext;

// ============================================================================
// SECTION: Link State
// ============================================================================

/// Coarse connection lifecycle state.
///
/// # Invariants
/// - Labels are stable for output maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkState {
    /// No socket exists.
    #[default]
    Disconnected,
    /// TCP connect in flight.
    Dialing,
    /// Socket established, TLS pending.
    TcpConnected,
    /// TLS handshake complete, post-handshake pending.
    TlsConnected,
    /// Post-handshake step complete; channel usable for requests.
    Operational,
    /// Orderly shutdown in flight.
    Closing,
}

impl LinkState {
    /// Returns the stable label for output maps.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Dialing => "DIALING",
            Self::TcpConnected => "TCP_CONNECTED",
            Self::TlsConnected => "TLS_CONNECTED",
            Self::Operational => "OPERATIONAL",
            Self::Closing => "CLOSING",
        }
    }
}

// ============================================================================
// SECTION: Connection Errors
// ============================================================================

/// Errors raised by connection operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// No live connection exists for the operation.
    #[error("not connected")]
    NotConnected,
    /// Message-id 0 is reserved; the send was refused locally.
    #[error("message id 0 is reserved")]
    ReservedMessageId,
    /// The connection closed under the operation.
    #[error("connection closed: {0}")]
    Closed(String),
    /// The operation exceeded its deadline.
    #[error("timed out")]
    Timeout,
    /// Framing failure.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// Wire encoding or decoding failure.
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Connect failure carrying the lifecycle stage that was reached.
#[derive(Debug, Error)]
#[error("connect failed at {}: {}", .stage.as_str(), .message)]
pub struct ConnectFailure {
    /// Stage during which the failure occurred.
    pub stage: LinkState,
    /// Underlying error description.
    pub message: String,
}

// ============================================================================
// SECTION: Peer Snapshot
// ============================================================================

/// TLS session facts captured after the handshake.
#[derive(Debug, Clone, Default)]
pub struct PeerInfo {
    /// Leaf certificate presented by the peer, DER.
    pub certificate_der: Option<Vec<u8>>,
    /// Negotiated protocol version label.
    pub tls_version: Option<String>,
    /// True when the handshake resumed a prior session.
    pub resumed: bool,
}

// ============================================================================
// SECTION: Request Outcomes
// ============================================================================

/// Outcome of one correlated request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// The matching response arrived.
    Responded {
        /// Echoed message identifier.
        message_id: u32,
        /// Response status.
        status: StatusCode,
        /// Optional response payload.
        payload: Option<CborValue>,
    },
    /// The deadline elapsed with no matching response.
    TimedOut {
        /// Message identifier that went unanswered.
        message_id: u32,
        /// Deadline that elapsed.
        elapsed: Duration,
    },
}

/// Outcome of one ping round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingOutcome {
    /// Sequence number carried by the matched pong.
    pub sequence: u32,
    /// Round-trip time.
    pub rtt: Duration,
}

/// One request in a concurrent batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    /// Requested operation.
    pub operation: Operation,
    /// Endpoint identifier.
    pub endpoint: u8,
    /// Feature identifier.
    pub feature: u8,
    /// Attribute identifier.
    pub attribute: u16,
    /// Optional write or invoke value.
    pub value: Option<CborValue>,
}

// ============================================================================
// SECTION: Connection
// ============================================================================

/// Stream type carried by every connection.
type TlsIo = TlsStream<TcpStream>;

/// One logical channel to a device.
///
/// # Invariants
/// - Exactly one writer (this struct) and one reader (the spawned task)
///   exist per socket.
/// - `next_message_id` is monotonic and never mints 0.
pub struct Connection {
    /// Dial target as `host:port`.
    target: String,
    /// Maximum frame size for both directions.
    max_frame: usize,
    /// Lifecycle state.
    state: LinkState,
    /// Write half of the TLS stream.
    writer: Option<WriteHalf<TlsIo>>,
    /// Reader task handle.
    reader_task: Option<JoinHandle<()>>,
    /// Shared pending-waiter map.
    correlator: Arc<Correlator>,
    /// Inbound notification, pong, and renewal queues.
    queues: InboundQueues,
    /// TLS session snapshot.
    peer: PeerInfo,
    /// True once the PASE completion marker was recorded.
    pase_completed: bool,
    /// Next message identifier to mint.
    next_message_id: u32,
    /// Last ping sequence number issued.
    ping_sequence: u32,
    /// Frames written since connect.
    sent_frames: u64,
    /// Last error observed on this connection.
    last_error: Option<String>,
}

impl Connection {
    /// Opens a connection: TCP dial, TLS handshake, then the post-handshake
    /// step (operational-cert validation with zone crypto, PASE completion
    /// marker without).
    ///
    /// # Errors
    ///
    /// Returns [`ConnectFailure`] naming the stage during which the attempt
    /// failed.
    pub async fn connect(
        target: &str,
        tls: &TlsContext,
        crypto: Option<&CryptoState>,
        max_frame: usize,
    ) -> Result<Self, ConnectFailure> {
        let host = target.rsplit_once(':').map_or(target, |(host, _)| host);

        let tcp = TcpStream::connect(target).await.map_err(|err| ConnectFailure {
            stage: LinkState::Dialing,
            message: err.to_string(),
        })?;

        let server_name =
            ServerName::try_from(host.to_string()).map_err(|err| ConnectFailure {
                stage: LinkState::TcpConnected,
                message: err.to_string(),
            })?;
        let connector = TlsConnector::from(tls.config());
        let stream = connector.connect(server_name, tcp).await.map_err(|err| ConnectFailure {
            stage: LinkState::TcpConnected,
            message: err.to_string(),
        })?;

        let peer = snapshot_peer(&stream);

        let post_handshake_ok = match crypto {
            Some(crypto) => peer
                .certificate_der
                .as_deref()
                .is_some_and(|der| issued_by_zone_ca(der, &crypto.zone_ca_der)),
            None => true,
        };
        if !post_handshake_ok {
            return Err(ConnectFailure {
                stage: LinkState::TlsConnected,
                message: "peer certificate not issued by zone ca".to_string(),
            });
        }

        let (read_half, write_half) = tokio::io::split(stream);
        let correlator = Arc::new(Correlator::new());
        let (senders, queues) = inbound_channel();
        let reader_task = spawn_reader(read_half, Arc::clone(&correlator), senders, max_frame);

        Ok(Self {
            target: target.to_string(),
            max_frame,
            state: LinkState::Operational,
            writer: Some(write_half),
            reader_task: Some(reader_task),
            correlator,
            queues,
            peer,
            pase_completed: crypto.is_none(),
            next_message_id: 1,
            ping_sequence: 0,
            sent_frames: 0,
            last_error: None,
        })
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LinkState {
        self.state
    }

    /// Returns the dial target.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the TLS session snapshot.
    #[must_use]
    pub const fn peer(&self) -> &PeerInfo {
        &self.peer
    }

    /// Returns true once the PASE completion marker was recorded.
    #[must_use]
    pub const fn pase_completed(&self) -> bool {
        self.pase_completed
    }

    /// Returns the last error observed on this connection.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns true while the channel can carry frames.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self.state, LinkState::TlsConnected | LinkState::Operational)
            && !self.correlator.is_closed()
    }

    /// Returns true when traffic flowed in both directions.
    #[must_use]
    pub fn bidirectional_active(&self) -> bool {
        self.sent_frames > 0 && self.correlator.frames_received() > 0
    }

    /// Returns the count of discarded duplicate responses.
    #[must_use]
    pub fn duplicates_discarded(&self) -> u64 {
        self.correlator.duplicates_discarded()
    }

    /// Mints the next message identifier, skipping the reserved value 0.
    pub const fn mint_message_id(&mut self) -> u32 {
        let id = self.next_message_id;
        self.next_message_id = self.next_message_id.wrapping_add(1);
        if self.next_message_id == 0 {
            self.next_message_id = 1;
        }
        id
    }

    /// Writes one raw payload as a frame.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Frame`] on oversize payloads (local
    /// rejection, no bytes sent) and fails the connection on I/O errors.
    pub async fn send_raw(&mut self, payload: &[u8]) -> Result<(), ConnectionError> {
        let writer = self.writer.as_mut().ok_or(ConnectionError::NotConnected)?;
        match write_frame(writer, payload, self.max_frame).await {
            Ok(()) => {
                self.sent_frames += 1;
                Ok(())
            }
            Err(FrameError::Oversize {
                declared,
                max,
            }) => Err(ConnectionError::Frame(FrameError::Oversize {
                declared,
                max,
            })),
            Err(err) => {
                let message = err.to_string();
                self.fail(&message);
                Err(ConnectionError::Frame(err))
            }
        }
    }

    /// Writes a bare length prefix with no payload bytes.
    ///
    /// # Errors
    ///
    /// Fails the connection on I/O errors.
    pub async fn send_length_only(&mut self, declared: u32) -> Result<(), ConnectionError> {
        let writer = self.writer.as_mut().ok_or(ConnectionError::NotConnected)?;
        match write_length_only(writer, declared).await {
            Ok(()) => {
                self.sent_frames += 1;
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                self.fail(&message);
                Err(ConnectionError::Frame(err))
            }
        }
    }

    /// Sends one protocol message.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] on encode or send failure.
    pub async fn send_message(&mut self, message: &WireMessage) -> Result<(), ConnectionError> {
        let bytes = to_bytes(message)?;
        self.send_raw(&bytes).await
    }

    /// Sends one renewal message.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] on encode or send failure.
    pub async fn send_renewal(&mut self, message: &RenewalMessage) -> Result<(), ConnectionError> {
        let bytes = renewal_to_bytes(message)?;
        self.send_raw(&bytes).await
    }

    /// Issues a correlated request with a freshly minted message-id.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] on send failure or closed connection;
    /// deadline expiry yields [`RequestOutcome::TimedOut`], not an error.
    pub async fn request(
        &mut self,
        spec: &RequestSpec,
        timeout: Duration,
    ) -> Result<RequestOutcome, ConnectionError> {
        let message_id = self.mint_message_id();
        self.request_with_id(message_id, spec, timeout).await
    }

    /// Issues a correlated request under an explicit message-id.
    ///
    /// A message-id of 0 is refused locally: no bytes reach the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::ReservedMessageId`] for id 0 and
    /// [`ConnectionError`] on send failure or closed connection.
    pub async fn request_with_id(
        &mut self,
        message_id: u32,
        spec: &RequestSpec,
        timeout: Duration,
    ) -> Result<RequestOutcome, ConnectionError> {
        if message_id == 0 {
            return Err(ConnectionError::ReservedMessageId);
        }
        let receiver = self.correlator.register(message_id);
        let message = WireMessage::Request {
            message_id,
            operation: spec.operation,
            endpoint: spec.endpoint,
            feature: spec.feature,
            attribute: spec.attribute,
            value: spec.value.clone(),
        };
        if let Err(err) = self.send_message(&message).await {
            self.correlator.cancel(message_id);
            return Err(err);
        }
        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(WireMessage::Response {
                message_id,
                status,
                payload,
            })) => Ok(RequestOutcome::Responded {
                message_id,
                status,
                payload,
            }),
            Ok(Ok(_)) => Err(ConnectionError::Closed("non-response frame matched".to_string())),
            Ok(Err(_)) => Err(self.closed_error()),
            Err(_) => {
                self.correlator.cancel(message_id);
                Ok(RequestOutcome::TimedOut {
                    message_id,
                    elapsed: timeout,
                })
            }
        }
    }

    /// Issues a batch of requests concurrently on this connection and
    /// gathers every outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when any send fails; individual
    /// timeouts surface as [`RequestOutcome::TimedOut`] entries.
    pub async fn request_many(
        &mut self,
        specs: &[RequestSpec],
        timeout: Duration,
    ) -> Result<Vec<RequestOutcome>, ConnectionError> {
        let deadline = Instant::now() + timeout;
        let mut waiters = Vec::with_capacity(specs.len());
        for spec in specs {
            let message_id = self.mint_message_id();
            let receiver = self.correlator.register(message_id);
            let message = WireMessage::Request {
                message_id,
                operation: spec.operation,
                endpoint: spec.endpoint,
                feature: spec.feature,
                attribute: spec.attribute,
                value: spec.value.clone(),
            };
            if let Err(err) = self.send_message(&message).await {
                for (id, _) in &waiters {
                    self.correlator.cancel(*id);
                }
                self.correlator.cancel(message_id);
                return Err(err);
            }
            waiters.push((message_id, receiver));
        }

        let mut outcomes = Vec::with_capacity(waiters.len());
        for (message_id, receiver) in waiters {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, receiver).await {
                Ok(Ok(WireMessage::Response {
                    message_id,
                    status,
                    payload,
                })) => outcomes.push(RequestOutcome::Responded {
                    message_id,
                    status,
                    payload,
                }),
                Ok(Ok(_)) | Ok(Err(_)) => {
                    return Err(self.closed_error());
                }
                Err(_) => {
                    self.correlator.cancel(message_id);
                    outcomes.push(RequestOutcome::TimedOut {
                        message_id,
                        elapsed: timeout,
                    });
                }
            }
        }
        Ok(outcomes)
    }

    /// Sends a ping and awaits the matching pong.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Timeout`] when the deadline elapses and
    /// [`ConnectionError::Closed`] when the channel dies first.
    pub async fn ping(&mut self, timeout: Duration) -> Result<PingOutcome, ConnectionError> {
        self.ping_sequence += 1;
        let sequence = self.ping_sequence;
        let started = Instant::now();
        self.send_message(&WireMessage::ControlPing {
            sequence,
        })
        .await?;
        let deadline = started + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ConnectionError::Timeout);
            }
            match tokio::time::timeout(remaining, self.queues.pongs.recv()).await {
                Ok(Some(pong_sequence)) if pong_sequence == sequence => {
                    return Ok(PingOutcome {
                        sequence,
                        rtt: started.elapsed(),
                    });
                }
                // Stale pong from an earlier timed-out ping.
                Ok(Some(_)) => {}
                Ok(None) => return Err(self.closed_error()),
                Err(_) => return Err(ConnectionError::Timeout),
            }
        }
    }

    /// Awaits the next notification or control frame; `Ok(None)` on
    /// deadline expiry.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Closed`] when the channel dies.
    pub async fn next_notification(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<WireMessage>, ConnectionError> {
        match tokio::time::timeout(timeout, self.queues.notifications.recv()).await {
            Ok(Some(message)) => Ok(Some(message)),
            Ok(None) => Err(self.closed_error()),
            Err(_) => Ok(None),
        }
    }

    /// Drains every queued notification without blocking.
    pub fn drain_notifications(&mut self) -> Vec<WireMessage> {
        let mut drained = Vec::new();
        while let Ok(message) = self.queues.notifications.try_recv() {
            drained.push(message);
        }
        drained
    }

    /// Awaits the next renewal message; `Ok(None)` on deadline expiry.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Closed`] when the channel dies.
    pub async fn next_renewal(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<RenewalMessage>, ConnectionError> {
        match tokio::time::timeout(timeout, self.queues.renewals.recv()).await {
            Ok(Some(message)) => Ok(Some(message)),
            Ok(None) => Err(self.closed_error()),
            Err(_) => Ok(None),
        }
    }

    /// Sends `ControlClose` and tears the connection down; idempotent.
    pub async fn close(&mut self, reason: &str) {
        if self.state == LinkState::Disconnected {
            return;
        }
        self.state = LinkState::Closing;
        let close_frame = WireMessage::ControlClose {
            reason: reason.to_string(),
        };
        if let Ok(bytes) = to_bytes(&close_frame)
            && let Some(writer) = self.writer.as_mut()
        {
            let _ = write_frame(writer, &bytes, self.max_frame).await;
            let _ = writer.shutdown().await;
        }
        self.teardown();
    }

    /// Fast-paths to Disconnected retaining the error.
    pub fn fail(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
        self.teardown();
    }

    /// Releases the socket halves and clears per-connection crypto.
    fn teardown(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        self.writer = None;
        self.peer = PeerInfo::default();
        self.pase_completed = false;
        self.correlator.fail_all();
        self.state = LinkState::Disconnected;
    }

    /// Builds the closed error from the retained reader error.
    fn closed_error(&self) -> ConnectionError {
        let reason = self
            .correlator
            .reader_error()
            .unwrap_or_else(|| "connection closed".to_string());
        ConnectionError::Closed(reason)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

// ============================================================================
// SECTION: Reader Task
// ============================================================================

/// Captures the TLS session snapshot before the stream is split.
fn snapshot_peer(stream: &TlsIo) -> PeerInfo {
    let (_, session) = stream.get_ref();
    let certificate_der = session
        .peer_certificates()
        .and_then(|certs| certs.first())
        .map(|cert| cert.as_ref().to_vec());
    let tls_version = session.protocol_version().map(|version| {
        match version {
            ProtocolVersion::TLSv1_2 => "TLSv1.2",
            ProtocolVersion::TLSv1_3 => "TLSv1.3",
            _ => "TLS_UNKNOWN",
        }
        .to_string()
    });
    let resumed = session.handshake_kind() == Some(HandshakeKind::Resumed);
    PeerInfo {
        certificate_der,
        tls_version,
        resumed,
    }
}

/// Spawns the reader task owning the read half.
fn spawn_reader(
    mut read_half: ReadHalf<TlsIo>,
    correlator: Arc<Correlator>,
    senders: InboundSenders,
    max_frame: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match read_frame(&mut read_half, max_frame).await {
                Ok(payload) => match decode_frame(&payload) {
                    Ok(frame) => {
                        correlator.note_received();
                        if !dispatch_inbound(&correlator, &senders, frame) {
                            break;
                        }
                    }
                    Err(err) => {
                        correlator.set_reader_error(format!("undecodable frame: {err}"));
                        correlator.fail_all();
                        break;
                    }
                },
                Err(FrameError::Closed) => {
                    correlator.fail_all();
                    break;
                }
                Err(err) => {
                    correlator.set_reader_error(err.to_string());
                    correlator.fail_all();
                    break;
                }
            }
        }
    })
}
