//! HTTPS connector using rustls.

use std::sync::Arc;
use std::time::Duration;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::SupportedCipherSuite;
use rustls::crypto::{CryptoProvider, ring};

use crate::{Error, Result};

/// Cipher suites offered during the handshake, TLS 1.3 first.
///
/// rustls has no CBC suites, so `ECDHE_RSA_WITH_AES_128_CBC_SHA256` cannot be offered.
pub const CIPHER_SUITES: [SupportedCipherSuite; 8] = [
    ring::cipher_suite::TLS13_AES_128_GCM_SHA256,
    ring::cipher_suite::TLS13_AES_256_GCM_SHA384,
    ring::cipher_suite::TLS13_CHACHA20_POLY1305_SHA256,
    ring::cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    ring::cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    ring::cipher_suite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    ring::cipher_suite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
    ring::cipher_suite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
];

/// rustls client configuration: TLS 1.2 and 1.3 only, [`CIPHER_SUITES`] only, Mozilla roots.
///
/// # Errors
///
/// Returns [`Error::Tls`] if rustls rejects the provider/version combination.
pub fn tls_config() -> Result<rustls::ClientConfig> {
    let provider = CryptoProvider {
        cipher_suites: CIPHER_SUITES.to_vec(),
        ..ring::default_provider()
    };

    let root_store: rustls::RootCertStore =
        webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])
        .map_err(|err| Error::tls(err.to_string()))?
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(config)
}

/// Create an HTTPS connector with rustls.
///
/// Speaks HTTP/1.1 and HTTP/2, plain `http://` URLs included. `connect_timeout` bounds the TCP
/// connect.
///
/// # Errors
///
/// Returns [`Error::Tls`] when the TLS configuration cannot be built.
pub fn https_connector(connect_timeout: Duration) -> Result<HttpsConnector<HttpConnector>> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(connect_timeout));

    let connector = HttpsConnectorBuilder::new()
        .with_tls_config(tls_config()?)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http);

    Ok(connector)
}
