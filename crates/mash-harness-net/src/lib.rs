// crates/mash-harness-net/src/lib.rs
// ============================================================================
// Module: MASH Harness Net Library
// Description: Framed TLS transport, wire protocol, and connection management.
// Purpose: Expose the transport stack consumed by the action handlers.
// Dependencies: crate::{cert, codec, connection, correlator, frame, manager,
// protocol, verifier}
// ============================================================================

//! ## Overview
//! The net crate carries everything that touches a socket: length-prefixed
//! framing, the CBOR codec with its integer-keyed map policy, the wire and
//! control message shapes, the request/response correlator, the TLS
//! connection lifecycle, the pooled connection manager, and the zone
//! certificate material behind it all.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cert;
pub mod codec;
pub mod connection;
pub mod correlator;
pub mod frame;
pub mod manager;
pub mod protocol;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cert::CertError;
pub use cert::CertificateView;
pub use cert::DeviceCsr;
pub use cert::GeneratedZoneCrypto;
pub use cert::ServerIdentity;
pub use cert::fingerprint_der;
pub use cert::generate_device_csr;
pub use cert::generate_self_signed_identity;
pub use cert::generate_server_identity;
pub use cert::generate_zone_crypto;
pub use cert::parse_certificate;
pub use cert::sign_csr;
pub use cert::validate_csr;
pub use codec::CodecError;
pub use codec::cbor_to_json;
pub use codec::encode_int_keyed_map;
pub use codec::hex_encode;
pub use codec::json_to_cbor;
pub use codec::marshal;
pub use codec::unmarshal;
pub use connection::ConnectFailure;
pub use connection::Connection;
pub use connection::ConnectionError;
pub use connection::LinkState;
pub use connection::PeerInfo;
pub use connection::PingOutcome;
pub use connection::RequestOutcome;
pub use connection::RequestSpec;
pub use correlator::Correlator;
pub use frame::FrameError;
pub use frame::LENGTH_PREFIX_LEN;
pub use frame::read_frame;
pub use frame::write_frame;
pub use frame::write_length_only;
pub use manager::ConnectionManager;
pub use manager::ManagerError;
pub use manager::ReconnectBackoff;
pub use protocol::DecodedFrame;
pub use protocol::MessageKind;
pub use protocol::Operation;
pub use protocol::RenewalMessage;
pub use protocol::StatusCode;
pub use protocol::WireError;
pub use protocol::WireMessage;
pub use protocol::decode;
pub use protocol::decode_frame;
pub use protocol::decode_renewal;
pub use protocol::encode;
pub use protocol::encode_renewal;
pub use protocol::renewal_to_bytes;
pub use protocol::to_bytes;
pub use verifier::TlsContext;
pub use verifier::TlsError;
