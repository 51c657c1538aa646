use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::{Certificate, ClientConfig, PrivateKey, RootCertStore, ServerConfig};

use crate::client::TransportError;

use super::server::ServerError;

/// Failure to load PEM material from disk.
#[derive(Debug)]
pub(crate) enum TlsMaterialError {
    Io { path: PathBuf, source: std::io::Error },
    Invalid(String),
}

impl From<TlsMaterialError> for ServerError {
    fn from(err: TlsMaterialError) -> Self {
        match err {
            TlsMaterialError::Io { path, source } => ServerError::IoPath { path, source },
            TlsMaterialError::Invalid(reason) => ServerError::TlsConfig(reason),
        }
    }
}

impl From<TlsMaterialError> for TransportError {
    fn from(err: TlsMaterialError) -> Self {
        match err {
            TlsMaterialError::Io { path, source } => TransportError::IoPath { path, source },
            TlsMaterialError::Invalid(reason) => TransportError::TlsConfig(reason),
        }
    }
}

pub(crate) fn server_config(
    cert_path: &Path,
    key_path: &Path,
) -> Result<Arc<ServerConfig>, TlsMaterialError> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let config = ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|err| TlsMaterialError::Invalid(format!("invalid certificate/key pair: {err}")))?;

    Ok(Arc::new(config))
}

pub(crate) fn client_config(ca_path: &Path) -> Result<Arc<ClientConfig>, TlsMaterialError> {
    let mut roots = RootCertStore::empty();
    let certs = load_certs(ca_path)?;
    let (added, _) = roots.add_parsable_certificates(
        &certs.into_iter().map(|cert| cert.0).collect::<Vec<_>>(),
    );
    if added == 0 {
        return Err(TlsMaterialError::Invalid(format!(
            "no valid certificates in {ca_path:?}"
        )));
    }

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Arc::new(config))
}

fn open(path: &Path) -> Result<BufReader<File>, TlsMaterialError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsMaterialError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn parse_error(path: &Path, err: std::io::Error) -> TlsMaterialError {
    TlsMaterialError::Invalid(format!("failed to parse {path:?}: {err}"))
}

fn load_certs(path: &Path) -> Result<Vec<Certificate>, TlsMaterialError> {
    let certs = rustls_pemfile::certs(&mut open(path)?).map_err(|err| parse_error(path, err))?;
    if certs.is_empty() {
        return Err(TlsMaterialError::Invalid(format!(
            "no certificates found in {path:?}"
        )));
    }
    Ok(certs.into_iter().map(Certificate).collect())
}

fn load_private_key(path: &Path) -> Result<PrivateKey, TlsMaterialError> {
    let mut keys =
        rustls_pemfile::pkcs8_private_keys(&mut open(path)?).map_err(|err| parse_error(path, err))?;
    if let Some(key) = keys.pop() {
        return Ok(PrivateKey(key));
    }

    let mut rsa_keys =
        rustls_pemfile::rsa_private_keys(&mut open(path)?).map_err(|err| parse_error(path, err))?;
    if let Some(key) = rsa_keys.pop() {
        return Ok(PrivateKey(key));
    }

    Err(TlsMaterialError::Invalid(format!(
        "no usable private key found in {path:?}"
    )))
}
