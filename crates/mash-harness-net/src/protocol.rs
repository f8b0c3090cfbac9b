// crates/mash-harness-net/src/protocol.rs
// ============================================================================
// Module: Wire and Control Protocol Layer
// Description: Message kinds, integer field keys, and status codes.
// Purpose: Define the on-wire CBOR shapes for every protocol frame.
// Dependencies: crate::codec, serde_cbor, thiserror
// ============================================================================

//! ## Overview
//! Every frame payload is a CBOR map with small integer keys. Key 0 carries
//! the message-kind tag; request/response fields use keys 1..8 and control
//! fields use keys 9..12. Certificate-renewal messages share the envelope
//! but form their own kind family (8..11) decoded through a separate entry
//! point so the request/response correlator never consumes them.
//!
//! Field keys: message-id=1, operation=2, endpoint-id=3, feature-id=4,
//! attribute-id=5, value=6, status=7, payload=8, sequence=9, reason=10,
//! name=11, parameters=12.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_cbor::Value as CborValue;
use thiserror::Error;

use crate::codec::CodecError;
use crate::codec::marshal;
use crate::codec::unmarshal;

// ============================================================================
// SECTION: Field Keys
// ============================================================================

/// Message-kind tag key.
pub const KEY_KIND: i128 = 0;
/// Message identifier key.
pub const KEY_MESSAGE_ID: i128 = 1;
/// Operation key.
pub const KEY_OPERATION: i128 = 2;
/// Endpoint identifier key.
pub const KEY_ENDPOINT: i128 = 3;
/// Feature identifier key.
pub const KEY_FEATURE: i128 = 4;
/// Attribute identifier key.
pub const KEY_ATTRIBUTE: i128 = 5;
/// Value key.
pub const KEY_VALUE: i128 = 6;
/// Status key.
pub const KEY_STATUS: i128 = 7;
/// Payload key.
pub const KEY_PAYLOAD: i128 = 8;
/// Control sequence key.
pub const KEY_SEQUENCE: i128 = 9;
/// Close reason key.
pub const KEY_REASON: i128 = 10;
/// Event or trigger name key.
pub const KEY_NAME: i128 = 11;
/// Trigger parameters key.
pub const KEY_PARAMS: i128 = 12;

// ============================================================================
// SECTION: Message Kinds
// ============================================================================

/// Message-kind tag values.
///
/// # Invariants
/// - Values are stable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Controller-to-device request.
    Request,
    /// Device-to-controller response.
    Response,
    /// Unsolicited device notification.
    Notification,
    /// Liveness probe.
    ControlPing,
    /// Liveness probe reply.
    ControlPong,
    /// Orderly close announcement.
    ControlClose,
    /// Test-trigger frame for the device simulator.
    Trigger,
    /// Certificate renewal request.
    CertRenewalRequest,
    /// Certificate signing request reply.
    CertRenewalCsr,
    /// Certificate install message.
    CertRenewalInstall,
    /// Certificate renewal acknowledgement.
    CertRenewalAck,
}

impl MessageKind {
    /// Returns the wire tag value.
    #[must_use]
    pub const fn code(self) -> i128 {
        match self {
            Self::Request => 1,
            Self::Response => 2,
            Self::Notification => 3,
            Self::ControlPing => 4,
            Self::ControlPong => 5,
            Self::ControlClose => 6,
            Self::Trigger => 7,
            Self::CertRenewalRequest => 8,
            Self::CertRenewalCsr => 9,
            Self::CertRenewalInstall => 10,
            Self::CertRenewalAck => 11,
        }
    }

    /// Parses a wire tag value.
    #[must_use]
    pub const fn from_code(code: i128) -> Option<Self> {
        match code {
            1 => Some(Self::Request),
            2 => Some(Self::Response),
            3 => Some(Self::Notification),
            4 => Some(Self::ControlPing),
            5 => Some(Self::ControlPong),
            6 => Some(Self::ControlClose),
            7 => Some(Self::Trigger),
            8 => Some(Self::CertRenewalRequest),
            9 => Some(Self::CertRenewalCsr),
            10 => Some(Self::CertRenewalInstall),
            11 => Some(Self::CertRenewalAck),
            _ => None,
        }
    }

    /// Returns true for the renewal kind family.
    #[must_use]
    pub const fn is_renewal(self) -> bool {
        matches!(
            self,
            Self::CertRenewalRequest
                | Self::CertRenewalCsr
                | Self::CertRenewalInstall
                | Self::CertRenewalAck
        )
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Request operation codes.
///
/// # Invariants
/// - Values are stable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Attribute read.
    Read,
    /// Attribute write.
    Write,
    /// Attribute subscription.
    Subscribe,
    /// Command invocation.
    Invoke,
}

impl Operation {
    /// Returns the wire value.
    #[must_use]
    pub const fn code(self) -> i128 {
        match self {
            Self::Read => 1,
            Self::Write => 2,
            Self::Subscribe => 3,
            Self::Invoke => 4,
        }
    }

    /// Parses a wire value.
    #[must_use]
    pub const fn from_code(code: i128) -> Option<Self> {
        match code {
            1 => Some(Self::Read),
            2 => Some(Self::Write),
            3 => Some(Self::Subscribe),
            4 => Some(Self::Invoke),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Status Codes
// ============================================================================

/// Response status codes.
///
/// # Invariants
/// - Values and labels are stable on the wire and in output maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// Operation succeeded.
    Success,
    /// A parameter was invalid.
    InvalidParameter,
    /// The endpoint does not exist.
    InvalidEndpoint,
    /// The attribute does not exist within the feature.
    InvalidAttribute,
    /// The operation timed out device-side.
    Timeout,
    /// The zone connection cap was reached.
    MaxConnectionsExceeded,
    /// The device is busy.
    Busy,
}

impl StatusCode {
    /// Returns the wire value.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::InvalidParameter => 1,
            Self::InvalidEndpoint => 2,
            Self::InvalidAttribute => 3,
            Self::Timeout => 4,
            Self::MaxConnectionsExceeded => 5,
            Self::Busy => 6,
        }
    }

    /// Parses a wire value.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::InvalidParameter),
            2 => Some(Self::InvalidEndpoint),
            3 => Some(Self::InvalidAttribute),
            4 => Some(Self::Timeout),
            5 => Some(Self::MaxConnectionsExceeded),
            6 => Some(Self::Busy),
            _ => None,
        }
    }

    /// Returns the stable label used in output maps.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::InvalidParameter => "INVALID_PARAMETER",
            Self::InvalidEndpoint => "INVALID_ENDPOINT",
            Self::InvalidAttribute => "INVALID_ATTRIBUTE",
            Self::Timeout => "TIMEOUT",
            Self::MaxConnectionsExceeded => "MAX_CONNECTIONS_EXCEEDED",
            Self::Busy => "BUSY",
        }
    }
}

// ============================================================================
// SECTION: Wire Messages
// ============================================================================

/// Protocol frame payloads exchanged during a step.
///
/// # Invariants
/// - `Request.message_id` is never zero on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// Controller-to-device request.
    Request {
        /// Correlation identifier minted by the sender.
        message_id: u32,
        /// Requested operation.
        operation: Operation,
        /// Endpoint identifier.
        endpoint: u8,
        /// Feature identifier.
        feature: u8,
        /// Attribute identifier.
        attribute: u16,
        /// Optional write or invoke value.
        value: Option<CborValue>,
    },
    /// Device-to-controller response.
    Response {
        /// Echoed correlation identifier.
        message_id: u32,
        /// Operation status.
        status: StatusCode,
        /// Optional response payload.
        payload: Option<CborValue>,
    },
    /// Unsolicited notification.
    Notification {
        /// Event-type label.
        event_type: String,
        /// Optional event payload.
        payload: Option<CborValue>,
    },
    /// Liveness probe.
    ControlPing {
        /// Probe sequence number.
        sequence: u32,
    },
    /// Liveness probe reply.
    ControlPong {
        /// Echoed probe sequence number.
        sequence: u32,
    },
    /// Orderly close announcement.
    ControlClose {
        /// Close reason.
        reason: String,
    },
    /// Test-trigger frame for device-side simulation.
    Trigger {
        /// Trigger name.
        name: String,
        /// Trigger parameters.
        params: BTreeMap<String, CborValue>,
    },
}

/// Certificate-renewal frame payloads.
///
/// # Invariants
/// - These kinds never reach the request/response correlator.
#[derive(Debug, Clone, PartialEq)]
pub enum RenewalMessage {
    /// Renewal request with a controller nonce.
    Request {
        /// Random nonce minted by the controller.
        nonce: Vec<u8>,
    },
    /// PKCS#10 certificate signing request from the device.
    Csr {
        /// CSR in DER form.
        csr_der: Vec<u8>,
    },
    /// Signed certificate install message.
    Install {
        /// New certificate in DER form.
        cert_der: Vec<u8>,
        /// Monotonic install sequence number.
        sequence: u32,
    },
    /// Renewal acknowledgement.
    Ack {
        /// Install status.
        status: StatusCode,
        /// Sequence number of the active certificate.
        active_sequence: u32,
    },
}

// ============================================================================
// SECTION: Wire Errors
// ============================================================================

/// Errors raised while encoding or decoding protocol frames.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum WireError {
    /// Payload was not a CBOR map.
    #[error("frame payload is not a map")]
    NotAMap,
    /// Kind tag was absent.
    #[error("missing message kind tag")]
    MissingKind,
    /// Kind tag was unknown.
    #[error("unknown message kind: {0}")]
    UnknownKind(i128),
    /// A required field was absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),
    /// A field carried the wrong CBOR type or range.
    #[error("bad field: {0}")]
    BadField(&'static str),
    /// A renewal kind reached the general decoder or vice versa.
    #[error("unexpected message family: {0}")]
    WrongFamily(&'static str),
    /// Underlying CBOR failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Map builder for integer-keyed wire maps.
fn wire_map(kind: MessageKind) -> BTreeMap<CborValue, CborValue> {
    let mut map = BTreeMap::new();
    map.insert(CborValue::Integer(KEY_KIND), CborValue::Integer(kind.code()));
    map
}

/// Inserts an integer field.
fn put_int(map: &mut BTreeMap<CborValue, CborValue>, key: i128, value: i128) {
    map.insert(CborValue::Integer(key), CborValue::Integer(value));
}

/// Inserts a text field.
fn put_text(map: &mut BTreeMap<CborValue, CborValue>, key: i128, value: &str) {
    map.insert(CborValue::Integer(key), CborValue::Text(value.to_string()));
}

/// Inserts a byte-string field.
fn put_bytes(map: &mut BTreeMap<CborValue, CborValue>, key: i128, value: &[u8]) {
    map.insert(CborValue::Integer(key), CborValue::Bytes(value.to_vec()));
}

/// Encodes a wire message into its CBOR map form.
#[must_use]
pub fn encode(message: &WireMessage) -> CborValue {
    match message {
        WireMessage::Request {
            message_id,
            operation,
            endpoint,
            feature,
            attribute,
            value,
        } => {
            let mut map = wire_map(MessageKind::Request);
            put_int(&mut map, KEY_MESSAGE_ID, i128::from(*message_id));
            put_int(&mut map, KEY_OPERATION, operation.code());
            put_int(&mut map, KEY_ENDPOINT, i128::from(*endpoint));
            put_int(&mut map, KEY_FEATURE, i128::from(*feature));
            put_int(&mut map, KEY_ATTRIBUTE, i128::from(*attribute));
            if let Some(value) = value {
                map.insert(CborValue::Integer(KEY_VALUE), value.clone());
            }
            CborValue::Map(map)
        }
        WireMessage::Response {
            message_id,
            status,
            payload,
        } => {
            let mut map = wire_map(MessageKind::Response);
            put_int(&mut map, KEY_MESSAGE_ID, i128::from(*message_id));
            put_int(&mut map, KEY_STATUS, i128::from(status.code()));
            if let Some(payload) = payload {
                map.insert(CborValue::Integer(KEY_PAYLOAD), payload.clone());
            }
            CborValue::Map(map)
        }
        WireMessage::Notification {
            event_type,
            payload,
        } => {
            let mut map = wire_map(MessageKind::Notification);
            put_text(&mut map, KEY_NAME, event_type);
            if let Some(payload) = payload {
                map.insert(CborValue::Integer(KEY_PAYLOAD), payload.clone());
            }
            CborValue::Map(map)
        }
        WireMessage::ControlPing {
            sequence,
        } => {
            let mut map = wire_map(MessageKind::ControlPing);
            put_int(&mut map, KEY_SEQUENCE, i128::from(*sequence));
            CborValue::Map(map)
        }
        WireMessage::ControlPong {
            sequence,
        } => {
            let mut map = wire_map(MessageKind::ControlPong);
            put_int(&mut map, KEY_SEQUENCE, i128::from(*sequence));
            CborValue::Map(map)
        }
        WireMessage::ControlClose {
            reason,
        } => {
            let mut map = wire_map(MessageKind::ControlClose);
            put_text(&mut map, KEY_REASON, reason);
            CborValue::Map(map)
        }
        WireMessage::Trigger {
            name,
            params,
        } => {
            let mut map = wire_map(MessageKind::Trigger);
            put_text(&mut map, KEY_NAME, name);
            let entries = params
                .iter()
                .map(|(key, value)| (CborValue::Text(key.clone()), value.clone()))
                .collect::<BTreeMap<CborValue, CborValue>>();
            map.insert(CborValue::Integer(KEY_PARAMS), CborValue::Map(entries));
            CborValue::Map(map)
        }
    }
}

/// Encodes a renewal message into its CBOR map form.
#[must_use]
pub fn encode_renewal(message: &RenewalMessage) -> CborValue {
    match message {
        RenewalMessage::Request {
            nonce,
        } => {
            let mut map = wire_map(MessageKind::CertRenewalRequest);
            put_bytes(&mut map, KEY_PAYLOAD, nonce);
            CborValue::Map(map)
        }
        RenewalMessage::Csr {
            csr_der,
        } => {
            let mut map = wire_map(MessageKind::CertRenewalCsr);
            put_bytes(&mut map, KEY_PAYLOAD, csr_der);
            CborValue::Map(map)
        }
        RenewalMessage::Install {
            cert_der,
            sequence,
        } => {
            let mut map = wire_map(MessageKind::CertRenewalInstall);
            put_bytes(&mut map, KEY_PAYLOAD, cert_der);
            put_int(&mut map, KEY_SEQUENCE, i128::from(*sequence));
            CborValue::Map(map)
        }
        RenewalMessage::Ack {
            status,
            active_sequence,
        } => {
            let mut map = wire_map(MessageKind::CertRenewalAck);
            put_int(&mut map, KEY_STATUS, i128::from(status.code()));
            put_int(&mut map, KEY_SEQUENCE, i128::from(*active_sequence));
            CborValue::Map(map)
        }
    }
}

/// Encodes a wire message straight to frame bytes.
///
/// # Errors
///
/// Returns [`WireError::Codec`] when CBOR serialization fails.
pub fn to_bytes(message: &WireMessage) -> Result<Vec<u8>, WireError> {
    Ok(marshal(&encode(message))?)
}

/// Encodes a renewal message straight to frame bytes.
///
/// # Errors
///
/// Returns [`WireError::Codec`] when CBOR serialization fails.
pub fn renewal_to_bytes(message: &RenewalMessage) -> Result<Vec<u8>, WireError> {
    Ok(marshal(&encode_renewal(message))?)
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decoded frame: either a step-level wire message or a renewal message.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedFrame {
    /// General protocol message.
    Wire(WireMessage),
    /// Certificate-renewal message.
    Renewal(RenewalMessage),
}

/// Field accessor over a decoded CBOR map.
struct Fields<'a> {
    /// Backing CBOR map.
    map: &'a BTreeMap<CborValue, CborValue>,
}

impl<'a> Fields<'a> {
    /// Returns the raw value for an integer key.
    fn get(&self, key: i128) -> Option<&'a CborValue> {
        self.map.get(&CborValue::Integer(key))
    }

    /// Returns a required integer field.
    fn int(&self, key: i128, label: &'static str) -> Result<i128, WireError> {
        match self.get(key) {
            Some(CborValue::Integer(value)) => Ok(*value),
            Some(_) => Err(WireError::BadField(label)),
            None => Err(WireError::MissingField(label)),
        }
    }

    /// Returns a required `u32` field.
    fn u32(&self, key: i128, label: &'static str) -> Result<u32, WireError> {
        u32::try_from(self.int(key, label)?).map_err(|_| WireError::BadField(label))
    }

    /// Returns a required text field.
    fn text(&self, key: i128, label: &'static str) -> Result<String, WireError> {
        match self.get(key) {
            Some(CborValue::Text(value)) => Ok(value.clone()),
            Some(_) => Err(WireError::BadField(label)),
            None => Err(WireError::MissingField(label)),
        }
    }

    /// Returns a required byte-string field.
    fn bytes(&self, key: i128, label: &'static str) -> Result<Vec<u8>, WireError> {
        match self.get(key) {
            Some(CborValue::Bytes(value)) => Ok(value.clone()),
            Some(_) => Err(WireError::BadField(label)),
            None => Err(WireError::MissingField(label)),
        }
    }
}

/// Decodes frame bytes into either message family.
///
/// # Errors
///
/// Returns [`WireError`] on malformed payloads or unknown kinds.
pub fn decode_frame(bytes: &[u8]) -> Result<DecodedFrame, WireError> {
    let value = unmarshal(bytes)?;
    let CborValue::Map(map) = &value else {
        return Err(WireError::NotAMap);
    };
    let fields = Fields {
        map,
    };
    let kind_code = match fields.get(KEY_KIND) {
        Some(CborValue::Integer(code)) => *code,
        Some(_) => return Err(WireError::BadField("kind")),
        None => return Err(WireError::MissingKind),
    };
    let kind = MessageKind::from_code(kind_code).ok_or(WireError::UnknownKind(kind_code))?;
    if kind.is_renewal() {
        decode_renewal_fields(kind, &fields).map(DecodedFrame::Renewal)
    } else {
        decode_wire_fields(kind, &fields).map(DecodedFrame::Wire)
    }
}

/// Decodes frame bytes, accepting only the general message family.
///
/// # Errors
///
/// Returns [`WireError::WrongFamily`] for renewal kinds.
pub fn decode(bytes: &[u8]) -> Result<WireMessage, WireError> {
    match decode_frame(bytes)? {
        DecodedFrame::Wire(message) => Ok(message),
        DecodedFrame::Renewal(_) => Err(WireError::WrongFamily("renewal")),
    }
}

/// Decodes frame bytes, accepting only the renewal message family.
///
/// # Errors
///
/// Returns [`WireError::WrongFamily`] for general kinds.
pub fn decode_renewal(bytes: &[u8]) -> Result<RenewalMessage, WireError> {
    match decode_frame(bytes)? {
        DecodedFrame::Renewal(message) => Ok(message),
        DecodedFrame::Wire(_) => Err(WireError::WrongFamily("wire")),
    }
}

/// Decodes the general message family from parsed fields.
fn decode_wire_fields(kind: MessageKind, fields: &Fields<'_>) -> Result<WireMessage, WireError> {
    match kind {
        MessageKind::Request => {
            let operation_code = fields.int(KEY_OPERATION, "operation")?;
            let operation =
                Operation::from_code(operation_code).ok_or(WireError::BadField("operation"))?;
            Ok(WireMessage::Request {
                message_id: fields.u32(KEY_MESSAGE_ID, "message_id")?,
                operation,
                endpoint: u8::try_from(fields.int(KEY_ENDPOINT, "endpoint")?)
                    .map_err(|_| WireError::BadField("endpoint"))?,
                feature: u8::try_from(fields.int(KEY_FEATURE, "feature")?)
                    .map_err(|_| WireError::BadField("feature"))?,
                attribute: u16::try_from(fields.int(KEY_ATTRIBUTE, "attribute")?)
                    .map_err(|_| WireError::BadField("attribute"))?,
                value: fields.get(KEY_VALUE).cloned(),
            })
        }
        MessageKind::Response => {
            let status_code = u8::try_from(fields.int(KEY_STATUS, "status")?)
                .map_err(|_| WireError::BadField("status"))?;
            let status =
                StatusCode::from_code(status_code).ok_or(WireError::BadField("status"))?;
            Ok(WireMessage::Response {
                message_id: fields.u32(KEY_MESSAGE_ID, "message_id")?,
                status,
                payload: fields.get(KEY_PAYLOAD).cloned(),
            })
        }
        MessageKind::Notification => Ok(WireMessage::Notification {
            event_type: fields.text(KEY_NAME, "event_type")?,
            payload: fields.get(KEY_PAYLOAD).cloned(),
        }),
        MessageKind::ControlPing => Ok(WireMessage::ControlPing {
            sequence: fields.u32(KEY_SEQUENCE, "sequence")?,
        }),
        MessageKind::ControlPong => Ok(WireMessage::ControlPong {
            sequence: fields.u32(KEY_SEQUENCE, "sequence")?,
        }),
        MessageKind::ControlClose => Ok(WireMessage::ControlClose {
            reason: fields.text(KEY_REASON, "reason")?,
        }),
        MessageKind::Trigger => {
            let params = match fields.get(KEY_PARAMS) {
                Some(CborValue::Map(entries)) => entries
                    .iter()
                    .map(|(key, value)| match key {
                        CborValue::Text(text) => Ok((text.clone(), value.clone())),
                        _ => Err(WireError::BadField("params")),
                    })
                    .collect::<Result<BTreeMap<String, CborValue>, WireError>>()?,
                Some(_) => return Err(WireError::BadField("params")),
                None => BTreeMap::new(),
            };
            Ok(WireMessage::Trigger {
                name: fields.text(KEY_NAME, "name")?,
                params,
            })
        }
        MessageKind::CertRenewalRequest
        | MessageKind::CertRenewalCsr
        | MessageKind::CertRenewalInstall
        | MessageKind::CertRenewalAck => Err(WireError::WrongFamily("renewal")),
    }
}

/// Decodes the renewal message family from parsed fields.
fn decode_renewal_fields(
    kind: MessageKind,
    fields: &Fields<'_>,
) -> Result<RenewalMessage, WireError> {
    match kind {
        MessageKind::CertRenewalRequest => Ok(RenewalMessage::Request {
            nonce: fields.bytes(KEY_PAYLOAD, "nonce")?,
        }),
        MessageKind::CertRenewalCsr => Ok(RenewalMessage::Csr {
            csr_der: fields.bytes(KEY_PAYLOAD, "csr")?,
        }),
        MessageKind::CertRenewalInstall => Ok(RenewalMessage::Install {
            cert_der: fields.bytes(KEY_PAYLOAD, "cert")?,
            sequence: fields.u32(KEY_SEQUENCE, "sequence")?,
        }),
        MessageKind::CertRenewalAck => {
            let status_code = u8::try_from(fields.int(KEY_STATUS, "status")?)
                .map_err(|_| WireError::BadField("status"))?;
            let status =
                StatusCode::from_code(status_code).ok_or(WireError::BadField("status"))?;
            Ok(RenewalMessage::Ack {
                status,
                active_sequence: fields.u32(KEY_SEQUENCE, "active_sequence")?,
            })
        }
        _ => Err(WireError::WrongFamily("wire")),
    }
}
