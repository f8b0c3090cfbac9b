// crates/mash-harness-net/src/verifier.rs
// ============================================================================
// Module: TLS Client Contexts
// Description: Client TLS configuration for PASE and operational connections.
// Purpose: Build rustls configs from zone crypto or the pre-trust escape hatch.
// Dependencies: mash-harness-core, rustls, rustls-pki-types, thiserror
// ============================================================================

//! ## Overview
//! Two trust models exist. Operational connections trust exactly the zone
//! CA and present the controller certificate as client identity.
//! Pre-commissioning (PASE phase) connections have no CA yet, so the
//! harness accepts any server certificate on those — guarded by explicit
//! configuration and never used once zone crypto exists. Signatures are
//! still verified in the no-CA mode; only chain building is skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use mash_harness_core::CryptoState;
use rustls::ClientConfig;
use rustls::DigitallySignedStruct;
use rustls::RootCertStore;
use rustls::SignatureScheme;
use rustls::client::danger::HandshakeSignatureValid;
use rustls::client::danger::ServerCertVerified;
use rustls::client::danger::ServerCertVerifier;
use rustls::crypto::WebPkiSupportedAlgorithms;
use rustls::crypto::aws_lc_rs;
use rustls::crypto::verify_tls12_signature;
use rustls::crypto::verify_tls13_signature;
use rustls_pki_types::CertificateDer;
use rustls_pki_types::PrivateKeyDer;
use rustls_pki_types::PrivatePkcs8KeyDer;
use rustls_pki_types::ServerName;
use rustls_pki_types::UnixTime;
use thiserror::Error;

// ============================================================================
// SECTION: TLS Errors
// ============================================================================

/// Errors raised while building TLS client contexts.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum TlsError {
    /// The zone CA certificate was rejected by the trust store.
    #[error("zone ca rejected: {0}")]
    Root(String),
    /// Client configuration assembly failed.
    #[error("tls config failure: {0}")]
    Config(String),
}

// ============================================================================
// SECTION: TLS Context
// ============================================================================

/// Client TLS context for one connection attempt.
#[derive(Debug, Clone)]
pub struct TlsContext {
    /// Assembled rustls client configuration.
    config: Arc<ClientConfig>,
}

impl TlsContext {
    /// Builds the pre-commissioning context that accepts any server
    /// certificate.
    ///
    /// # Errors
    ///
    /// Returns [`TlsError::Config`] when provider assembly fails.
    pub fn uncommissioned() -> Result<Self, TlsError> {
        let verifier = AcceptAnyServerCert::new();
        let config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Builds the operational context trusting exactly the zone CA and
    /// presenting the controller identity.
    ///
    /// # Errors
    ///
    /// Returns [`TlsError`] when the CA or identity material is unusable.
    pub fn for_zone(crypto: &CryptoState) -> Result<Self, TlsError> {
        let mut roots = RootCertStore::empty();
        roots
            .add(CertificateDer::from(crypto.zone_ca_der.clone()))
            .map_err(|err| TlsError::Root(err.to_string()))?;
        let identity_chain = vec![CertificateDer::from(crypto.controller_cert_der.clone())];
        let identity_key =
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(crypto.controller_key_der.clone()));
        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_client_auth_cert(identity_chain, identity_key)
            .map_err(|err| TlsError::Config(err.to_string()))?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Returns the assembled client configuration.
    #[must_use]
    pub fn config(&self) -> Arc<ClientConfig> {
        Arc::clone(&self.config)
    }
}

// ============================================================================
// SECTION: Pre-Commissioning Verifier
// ============================================================================

/// Server-certificate verifier that skips chain building but still verifies
/// handshake signatures.
#[derive(Debug)]
struct AcceptAnyServerCert {
    /// Signature verification algorithms from the provider.
    supported: WebPkiSupportedAlgorithms,
}

impl AcceptAnyServerCert {
    /// Creates the verifier over the default provider's algorithms.
    fn new() -> Self {
        Self {
            supported: aws_lc_rs::default_provider().signature_verification_algorithms,
        }
    }
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.supported)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.supported)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.supported.supported_schemes()
    }
}
