// crates/mash-harness-net/src/cert.rs
// ============================================================================
// Module: Zone Certificate Material
// Description: Zone CA generation, CSR handling, and certificate views.
// Purpose: Mint and inspect the crypto material behind zone connections.
// Dependencies: mash-harness-core, rcgen, rustls-pki-types, sha2, x509-parser
// ============================================================================

//! ## Overview
//! Each zone owns an ephemeral CA minted at creation. The controller's
//! operational certificate and renewed device certificates chain to it.
//! Material is carried as PEM/DER in [`CryptoState`] so it outlives
//! individual connections; this module rebuilds signing state from that
//! form when renewal steps need it. CSR validation is structural (PKCS#10
//! parse); chain trust is enforced by the TLS layer against the zone CA.

// ============================================================================
// SECTION: Imports
// ============================================================================

use mash_harness_core::CryptoState;
use rcgen::BasicConstraints;
use rcgen::CertificateParams;
use rcgen::CertificateSigningRequestParams;
use rcgen::DistinguishedName;
use rcgen::DnType;
use rcgen::IsCa;
use rcgen::Issuer;
use rcgen::KeyPair;
use rustls_pki_types::CertificateSigningRequestDer;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::prelude::FromDer;
use x509_parser::prelude::parse_x509_certificate;

use crate::codec::hex_encode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fingerprint length in bytes (leading bytes of the SHA-256 digest).
pub const FINGERPRINT_LEN: usize = 16;

// ============================================================================
// SECTION: Certificate Errors
// ============================================================================

/// Errors raised by certificate generation and inspection.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CertError {
    /// Key or certificate generation failed.
    #[error("certificate generation failure: {0}")]
    Generation(String),
    /// Certificate or CSR bytes failed to parse.
    #[error("certificate parse failure: {0}")]
    Parse(String),
    /// CSR was structurally invalid.
    #[error("invalid csr: {0}")]
    InvalidCsr(String),
}

impl From<rcgen::Error> for CertError {
    fn from(err: rcgen::Error) -> Self {
        Self::Generation(err.to_string())
    }
}

// ============================================================================
// SECTION: Zone Crypto Generation
// ============================================================================

/// Freshly generated zone crypto plus the CA fingerprint.
#[derive(Debug, Clone)]
pub struct GeneratedZoneCrypto {
    /// Serialized material for the suite session.
    pub crypto: CryptoState,
    /// Hex fingerprint of the CA certificate DER.
    pub fingerprint: String,
}

/// Generates a zone CA and a controller operational certificate chained to
/// it.
///
/// # Errors
///
/// Returns [`CertError::Generation`] when key or certificate generation
/// fails.
pub fn generate_zone_crypto(
    zone_id: &str,
    zone_type: &str,
    controller_id: &str,
) -> Result<GeneratedZoneCrypto, CertError> {
    let ca_key = KeyPair::generate()?;
    let ca_key_pem = ca_key.serialize_pem();
    let mut ca_params = CertificateParams::default();
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params.distinguished_name =
        distinguished_name(&format!("MASH {zone_type} Zone CA {zone_id}"));
    let ca_cert = ca_params.self_signed(&ca_key)?;
    let ca_cert_pem = ca_cert.pem();
    let ca_der = ca_cert.der().as_ref().to_vec();
    let issuer = Issuer::new(ca_params, ca_key);

    let controller_key = KeyPair::generate()?;
    let mut controller_params = CertificateParams::default();
    controller_params.is_ca = IsCa::NoCa;
    controller_params.distinguished_name =
        distinguished_name(&format!("MASH Controller {controller_id}"));
    let controller_cert = controller_params.signed_by(&controller_key, &issuer)?;

    let fingerprint = fingerprint_der(&ca_der);
    let crypto = CryptoState {
        zone_ca_cert_pem: ca_cert_pem,
        zone_ca_key_pem: ca_key_pem,
        zone_ca_der: ca_der,
        controller_cert_pem: controller_cert.pem(),
        controller_key_pem: controller_key.serialize_pem(),
        controller_cert_der: controller_cert.der().as_ref().to_vec(),
        controller_key_der: controller_key.serialize_der(),
        issued_device_cert_pem: None,
    };
    Ok(GeneratedZoneCrypto {
        crypto,
        fingerprint,
    })
}

/// Computes the hex fingerprint over the leading bytes of a SHA-256 digest.
#[must_use]
pub fn fingerprint_der(der: &[u8]) -> String {
    let digest = Sha256::digest(der);
    hex_encode(&digest[..FINGERPRINT_LEN])
}

// ============================================================================
// SECTION: CSR Handling
// ============================================================================

/// Validates that bytes parse as a PKCS#10 certificate signing request.
///
/// # Errors
///
/// Returns [`CertError::InvalidCsr`] when the bytes are not a CSR.
pub fn validate_csr(csr_der: &[u8]) -> Result<(), CertError> {
    let (_, request) = X509CertificationRequest::from_der(csr_der)
        .map_err(|err| CertError::InvalidCsr(err.to_string()))?;
    if request.certification_request_info.subject.as_raw().is_empty() {
        return Err(CertError::InvalidCsr("empty subject".to_string()));
    }
    Ok(())
}

/// Signs a CSR with the zone CA rebuilt from the suite session material.
///
/// # Errors
///
/// Returns [`CertError`] when the CA material is unusable or signing fails.
pub fn sign_csr(crypto: &CryptoState, csr_der: &[u8]) -> Result<Vec<u8>, CertError> {
    let ca_key = KeyPair::from_pem(&crypto.zone_ca_key_pem)?;
    let issuer = Issuer::from_ca_cert_pem(&crypto.zone_ca_cert_pem, ca_key)?;
    let request = CertificateSigningRequestParams::from_der(&CertificateSigningRequestDer::from(
        csr_der.to_vec(),
    ))?;
    let cert = request.signed_by(&issuer)?;
    Ok(cert.der().as_ref().to_vec())
}

/// Device CSR material for simulated renewal peers.
#[derive(Debug, Clone)]
pub struct DeviceCsr {
    /// CSR in DER form.
    pub csr_der: Vec<u8>,
    /// Device private key, PEM.
    pub key_pem: String,
}

/// Generates a device CSR for the given common name.
///
/// # Errors
///
/// Returns [`CertError::Generation`] when key or request generation fails.
pub fn generate_device_csr(common_name: &str) -> Result<DeviceCsr, CertError> {
    let key = KeyPair::generate()?;
    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name(common_name);
    let request = params.serialize_request(&key)?;
    Ok(DeviceCsr {
        csr_der: request.der().as_ref().to_vec(),
        key_pem: key.serialize_pem(),
    })
}

// ============================================================================
// SECTION: Server Identities
// ============================================================================

/// Server-side TLS identity for stub device peers.
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    /// Server certificate, DER.
    pub cert_der: Vec<u8>,
    /// Server private key, PKCS#8 DER.
    pub key_der: Vec<u8>,
}

/// Generates a server identity signed by the zone CA.
///
/// # Errors
///
/// Returns [`CertError`] when the CA material is unusable or signing fails.
pub fn generate_server_identity(
    crypto: &CryptoState,
    subject_alt_names: Vec<String>,
) -> Result<ServerIdentity, CertError> {
    let ca_key = KeyPair::from_pem(&crypto.zone_ca_key_pem)?;
    let issuer = Issuer::from_ca_cert_pem(&crypto.zone_ca_cert_pem, ca_key)?;
    let key = KeyPair::generate()?;
    let mut params = CertificateParams::new(subject_alt_names)?;
    params.is_ca = IsCa::NoCa;
    params.distinguished_name = distinguished_name("MASH Device");
    let cert = params.signed_by(&key, &issuer)?;
    Ok(ServerIdentity {
        cert_der: cert.der().as_ref().to_vec(),
        key_der: key.serialize_der(),
    })
}

/// Generates a self-signed server identity for pre-commissioning peers.
///
/// # Errors
///
/// Returns [`CertError::Generation`] when generation fails.
pub fn generate_self_signed_identity(
    subject_alt_names: Vec<String>,
) -> Result<ServerIdentity, CertError> {
    let key = KeyPair::generate()?;
    let mut params = CertificateParams::new(subject_alt_names)?;
    params.is_ca = IsCa::NoCa;
    params.distinguished_name = distinguished_name("MASH Uncommissioned Device");
    let cert = params.self_signed(&key)?;
    Ok(ServerIdentity {
        cert_der: cert.der().as_ref().to_vec(),
        key_der: key.serialize_der(),
    })
}

// ============================================================================
// SECTION: Certificate Views
// ============================================================================

/// Parsed certificate snapshot for expectation checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateView {
    /// Subject distinguished name.
    pub subject: String,
    /// Issuer distinguished name.
    pub issuer: String,
    /// Validity start, unix seconds.
    pub not_before: i64,
    /// Validity end, unix seconds.
    pub not_after: i64,
    /// Signature algorithm OID in dotted form.
    pub signature_algorithm: String,
    /// True when the certificate is a CA.
    pub is_ca: bool,
    /// Path length constraint when present.
    pub max_path_len: Option<u32>,
}

/// Parses a certificate into a view.
///
/// # Errors
///
/// Returns [`CertError::Parse`] when the bytes are not a certificate.
pub fn parse_certificate(der: &[u8]) -> Result<CertificateView, CertError> {
    let (_, cert) =
        parse_x509_certificate(der).map_err(|err| CertError::Parse(err.to_string()))?;
    let (is_ca, max_path_len) = cert
        .basic_constraints()
        .ok()
        .flatten()
        .map_or((false, None), |ext| (ext.value.ca, ext.value.path_len_constraint));
    Ok(CertificateView {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        not_before: cert.validity().not_before.timestamp(),
        not_after: cert.validity().not_after.timestamp(),
        signature_algorithm: cert.signature_algorithm.algorithm.to_id_string(),
        is_ca,
        max_path_len,
    })
}

/// Returns true when the peer certificate's issuer matches the zone CA
/// subject.
///
/// Chain trust is enforced by the TLS handshake; this is the structural
/// post-handshake check on the captured snapshot.
#[must_use]
pub fn issued_by_zone_ca(peer_der: &[u8], ca_der: &[u8]) -> bool {
    let Ok((_, peer)) = parse_x509_certificate(peer_der) else {
        return false;
    };
    let Ok((_, ca)) = parse_x509_certificate(ca_der) else {
        return false;
    };
    peer.issuer() == ca.subject()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a distinguished name with one common-name entry.
fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut name = DistinguishedName::new();
    name.push(DnType::CommonName, common_name);
    name
}
