//! HTTPS listener with mandatory client certificates.
//!
//! Every connection must present a certificate signed by the configured
//! CA. Its Common Name is attached to each request of the connection as a
//! [`PeerCertificate`] extension, which the API turns into the caller
//! identity.

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::Request;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use rustls::pki_types::pem::{self, PemObject};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::{VerifierBuilderError, WebPkiClientVerifier};
use rustls::{RootCertStore, ServerConfig};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;
use tower::ServiceExt;

use doorhub_adapter_http_axum::auth::PeerCertificate;

use crate::config::TlsPaths;

/// How long open connections get to finish once shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors building the TLS configuration.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// A PEM file could not be read or decoded.
    #[error("failed to read {}", path.display())]
    Pem {
        path: PathBuf,
        #[source]
        source: pem::Error,
    },

    /// A certificate file held no certificate.
    #[error("no certificate found in {}", path.display())]
    NoCertificate { path: PathBuf },

    /// The CA certificate was rejected.
    #[error("invalid CA certificate")]
    Ca(#[source] rustls::Error),

    /// The client certificate verifier could not be built.
    #[error("invalid client certificate verifier")]
    Verifier(#[source] VerifierBuilderError),

    /// The server certificate or key was rejected.
    #[error("invalid server certificate or key")]
    Config(#[source] rustls::Error),
}

/// Build a server configuration requiring client certificates signed by
/// `paths.ca`, offering HTTP/2 and HTTP/1.1.
///
/// # Errors
///
/// Returns [`TlsError`] if a file is missing or unreadable, or if rustls
/// rejects the certificates.
pub fn server_config(paths: &TlsPaths) -> Result<Arc<ServerConfig>, TlsError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let chain = read_certs(&paths.cert)?;
    let key = PrivateKeyDer::from_pem_file(&paths.key).map_err(|source| TlsError::Pem {
        path: paths.key.clone(),
        source,
    })?;

    let mut roots = RootCertStore::empty();
    for ca in read_certs(&paths.ca)? {
        roots.add(ca).map_err(TlsError::Ca)?;
    }
    let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), Arc::clone(&provider))
        .build()
        .map_err(TlsError::Verifier)?;

    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(TlsError::Config)?
        .with_client_cert_verifier(verifier)
        .with_single_cert(chain, key)
        .map_err(TlsError::Config)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let pem_error = |source| TlsError::Pem {
        path: path.to_path_buf(),
        source,
    };
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(pem_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(pem_error)?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificate {
            path: path.to_path_buf(),
        });
    }
    Ok(certs)
}

/// Common Name of the subject of a DER certificate.
#[must_use]
pub fn common_name(cert: &CertificateDer<'_>) -> Option<String> {
    let (_, parsed) = x509_parser::parse_x509_certificate(cert.as_ref()).ok()?;
    let name = parsed.subject().iter_common_name().next()?.as_str().ok()?;
    Some(name.to_string())
}

fn peer_certificate(tls: &TlsStream<TcpStream>) -> PeerCertificate {
    let (_, connection) = tls.get_ref();
    let common_name = connection
        .peer_certificates()
        .and_then(|chain| chain.first())
        .and_then(common_name);
    PeerCertificate::new(common_name)
}

/// Accept TLS connections on `listener` until `shutdown` resolves, then let
/// open connections finish.
pub async fn serve(
    listener: TcpListener,
    config: Arc<ServerConfig>,
    app: Router,
    shutdown: impl Future<Output = ()>,
) {
    let acceptor = TlsAcceptor::from(config);
    let (stop, stopped) = watch::channel(());
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to accept connection");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            },
            () = &mut shutdown => break,
        };
        tokio::spawn(serve_connection(
            acceptor.clone(),
            stream,
            remote,
            app.clone(),
            stopped.clone(),
        ));
    }

    drop(stopped);
    let _ = stop.send(());
    if tokio::time::timeout(DRAIN_TIMEOUT, stop.closed()).await.is_err() {
        tracing::warn!("connections still open after drain timeout");
    }
}

async fn serve_connection(
    acceptor: TlsAcceptor,
    stream: TcpStream,
    remote: SocketAddr,
    app: Router,
    mut stop: watch::Receiver<()>,
) {
    let tls = match acceptor.accept(stream).await {
        Ok(tls) => tls,
        Err(err) => {
            tracing::debug!(%remote, error = %err, "TLS handshake failed");
            return;
        }
    };
    let peer = peer_certificate(&tls);
    tracing::debug!(%remote, common_name = ?peer.common_name(), "TLS connection established");

    let service = app.map_request(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(peer.clone());
        request
    });
    let builder = auto::Builder::new(TokioExecutor::new());
    let connection = builder
        .serve_connection_with_upgrades(TokioIo::new(tls), TowerToHyperService::new(service));
    let mut connection = std::pin::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        _ = stop.changed() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };
    if let Err(err) = result {
        tracing::debug!(%remote, error = %err, "connection closed with error");
    }
}
