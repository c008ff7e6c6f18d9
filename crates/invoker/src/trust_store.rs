//! CA bundle handling shared by the CLI runner and the HTTP clients.
//!
//! The HTTP clients load the PEM bundle directly. The analysis CLI runs on the JVM, which only
//! reads keystores, so the bundle is converted once into a PKCS#12 trust store that stays on disk
//! while the server runs.

use p12_keystore::{Certificate, KeyStore, KeyStoreEntry};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;
use thiserror::Error;

const PEM_CERT_MARKER: &str = "-----BEGIN CERTIFICATE-----";

/// The JVM's conventional default keystore password.
pub(crate) const TRUST_STORE_PASSWORD: &str = "changeit";

#[derive(Error, Debug)]
pub(crate) enum TrustStoreError {
    #[error("malformed PEM bundle: {0}")]
    Pem(#[source] io::Error),

    #[error("PEM bundle holds no certificate")]
    Empty,

    #[error("certificate #{index} rejected: {message}")]
    Certificate { index: usize, message: String },

    #[error("cannot encode PKCS#12 trust store: {0}")]
    Encode(String),

    #[error("cannot write trust store: {0}")]
    Write(#[from] io::Error),
}

/// Reads `path` if it is a PEM file holding at least one certificate.
pub(crate) fn read_pem_bundle(path: &Path) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) if contains_certificate(&bytes) => Some(bytes),
        Ok(_) => {
            log::warn!("CA bundle {} holds no PEM certificate; ignoring it", path.display());
            None
        }
        Err(err) => {
            log::warn!("CA bundle {} is not readable: {err}", path.display());
            None
        }
    }
}

fn contains_certificate(bytes: &[u8]) -> bool {
    String::from_utf8_lossy(bytes).contains(PEM_CERT_MARKER)
}

/// Encodes every certificate of a PEM bundle as a trusted entry of a PKCS#12 keystore.
pub(crate) fn pkcs12_from_pem(pem: &[u8]) -> Result<Vec<u8>, TrustStoreError> {
    let certificates = rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(TrustStoreError::Pem)?;
    if certificates.is_empty() {
        return Err(TrustStoreError::Empty);
    }

    let mut keystore = KeyStore::new();
    for (index, der) in certificates.iter().enumerate() {
        let certificate =
            Certificate::from_der(der.as_ref()).map_err(|err| TrustStoreError::Certificate {
                index,
                message: err.to_string(),
            })?;
        keystore.add_entry(&format!("ca-{index}"), KeyStoreEntry::Certificate(certificate));
    }

    keystore
        .writer(TRUST_STORE_PASSWORD)
        .write()
        .map_err(|err| TrustStoreError::Encode(err.to_string()))
}

/// PKCS#12 copy of the CA bundle for the analysis CLI. The file is removed when the last clone
/// is dropped.
#[derive(Debug, Clone)]
pub(crate) struct JavaTrustStore {
    path: Arc<TempPath>,
}

impl JavaTrustStore {
    /// Converts the bundle at `bundle`; `None` (with a warning) when it cannot be used.
    pub(crate) fn from_pem_file(bundle: &Path) -> Option<Self> {
        let pem = read_pem_bundle(bundle)?;
        match Self::write(&pem) {
            Ok(store) => {
                log::debug!(
                    "CA bundle {} converted to {}",
                    bundle.display(),
                    store.path().display()
                );
                Some(store)
            }
            Err(err) => {
                log::warn!(
                    "CA bundle {} cannot be passed to the cs CLI: {err}",
                    bundle.display()
                );
                None
            }
        }
    }

    fn write(pem: &[u8]) -> Result<Self, TrustStoreError> {
        let pkcs12 = pkcs12_from_pem(pem)?;
        let mut file = tempfile::Builder::new()
            .prefix("cs-mcp-truststore-")
            .suffix(".p12")
            .tempfile()?;
        file.write_all(&pkcs12)?;
        file.flush()?;
        Ok(Self {
            path: Arc::new(file.into_temp_path()),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// JVM system properties that make the analysis CLI trust the bundle.
    pub(crate) fn cli_args(&self) -> Vec<String> {
        vec![
            format!("-Djavax.net.ssl.trustStore={}", self.path().display()),
            "-Djavax.net.ssl.trustStoreType=PKCS12".to_string(),
            format!("-Djavax.net.ssl.trustStorePassword={TRUST_STORE_PASSWORD}"),
        ]
    }
}
