//! Macaroon and TLS material for talking to the node.

use crate::config::LndConfig;
use crate::error::SourceError;
use std::path::Path;

/// The HTTP header LND's REST proxy reads the macaroon from.
pub const MACAROON_HEADER: &str = "grpc-metadata-macaroon";

/// Credentials loaded from the node's data directory.
#[derive(Clone)]
pub struct LndCredentials {
    macaroon_hex: String,
    tls_cert_pem: Vec<u8>,
    allow_invalid_certs: bool,
}

impl std::fmt::Debug for LndCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LndCredentials")
            .field("macaroon_hex", &"***")
            .field("tls_cert_pem_len", &self.tls_cert_pem.len())
            .field("allow_invalid_certs", &self.allow_invalid_certs)
            .finish()
    }
}

impl LndCredentials {
    /// Reads the macaroon and certificate files named in the config.
    pub fn load(config: &LndConfig) -> Result<Self, SourceError> {
        let macaroon = read(&config.macaroon_path)?;
        let tls_cert_pem = read(&config.cert_path)?;
        Ok(Self::from_parts(&macaroon, tls_cert_pem, config.allow_invalid_certs))
    }

    pub fn from_parts(macaroon: &[u8], tls_cert_pem: Vec<u8>, allow_invalid_certs: bool) -> Self {
        Self {
            macaroon_hex: hex::encode(macaroon),
            tls_cert_pem,
            allow_invalid_certs,
        }
    }

    /// The macaroon encoded for the `Grpc-Metadata-Macaroon` header.
    pub fn macaroon_hex(&self) -> &str {
        &self.macaroon_hex
    }

    /// A TLS connector that trusts the node's self-signed certificate.
    pub fn tls_connector(&self) -> Result<native_tls::TlsConnector, SourceError> {
        let cert = native_tls::Certificate::from_pem(&self.tls_cert_pem)
            .map_err(|e| SourceError::Tls(e.to_string()))?;
        native_tls::TlsConnector::builder()
            .add_root_certificate(cert)
            .danger_accept_invalid_certs(self.allow_invalid_certs)
            .danger_accept_invalid_hostnames(self.allow_invalid_certs)
            .build()
            .map_err(|e| SourceError::Tls(e.to_string()))
    }

    /// An HTTP client for the node's REST API, sending the macaroon on every
    /// request.
    pub fn http_client(&self) -> Result<reqwest::Client, SourceError> {
        let cert = reqwest::Certificate::from_pem(&self.tls_cert_pem)
            .map_err(|e| SourceError::Tls(e.to_string()))?;

        let mut headers = reqwest::header::HeaderMap::new();
        let mut value = reqwest::header::HeaderValue::from_str(&self.macaroon_hex)
            .map_err(|e| SourceError::Tls(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(MACAROON_HEADER, value);

        reqwest::Client::builder()
            .add_root_certificate(cert)
            .danger_accept_invalid_certs(self.allow_invalid_certs)
            .default_headers(headers)
            .build()
            .map_err(|e| SourceError::Tls(e.to_string()))
    }
}

fn read(path: &Path) -> Result<Vec<u8>, SourceError> {
    std::fs::read(path).map_err(|source| SourceError::Credentials {
        path: path.to_path_buf(),
        source,
    })
}
