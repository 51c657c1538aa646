use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::address::Address;
use crate::endpoint::{EventSink, StoreEndpoint};
use crate::error::{ErrorCode, StoreError};
use crate::types::{Columns, WireRow};

/// Carries requests from a client to a [`StoreEndpoint`].
///
/// Every call is a blocking round trip. Implementations report endpoint-side
/// failures as [`TransportError::Rejected`] so the caller sees one error type
/// regardless of where the request failed.
pub trait Transport: Send + Sync {
    fn read(&self, address: &Address, columns: Columns) -> Result<Vec<WireRow>, TransportError>;

    fn insert(&self, address: &Address, row: WireRow) -> Result<Address, TransportError>;

    fn bulk_write(&self, address: &Address, rows: Vec<WireRow>) -> Result<usize, TransportError>;

    fn delete(&self, address: &Address) -> Result<(), TransportError>;

    /// Starts forwarding change events of `namespace` into `sink`.
    ///
    /// Events keep flowing until the returned [`Subscription`] is dropped.
    fn subscribe(
        &self,
        namespace: &str,
        sink: Box<dyn EventSink>,
    ) -> Result<Subscription, TransportError>;
}

/// Live event subscription. Dropping it stops delivery.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(std::io::Error),
    #[error("network operation timed out")]
    Timeout,
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),
    #[error("invalid dns name: {0}")]
    InvalidDnsName(String),
    #[error("io error at {path:?}: {source}")]
    IoPath {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to load certificates: {0}")]
    TlsConfig(String),
    #[error("endpoint refused credentials")]
    Unauthorized,
    #[error("handshake failed with code {code}")]
    Handshake { code: u8 },
    #[error("connection closed by endpoint")]
    ConnectionClosed,
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("endpoint is disabled")]
    Disabled,
    #[error("endpoint rejected request ({code:?}): {message}")]
    Rejected { code: ErrorCode, message: String },
}

impl TransportError {
    /// Error code reported by the endpoint, if the request reached it.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            TransportError::Rejected { code, .. } => Some(*code),
            TransportError::Unauthorized => Some(ErrorCode::Unauthorized),
            _ => None,
        }
    }

    pub fn is_security(&self) -> bool {
        self.code().map_or(false, ErrorCode::is_security)
    }
}

impl From<StoreError> for TransportError {
    fn from(err: StoreError) -> Self {
        TransportError::Rejected {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

pub(crate) fn map_io(err: std::io::Error) -> TransportError {
    match err.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => TransportError::Timeout,
        std::io::ErrorKind::UnexpectedEof
        | std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe => TransportError::ConnectionClosed,
        _ => TransportError::Io(err),
    }
}

/// In-process transport calling a [`StoreEndpoint`] directly.
///
/// Clones share the same enabled switch, which models an endpoint that has
/// been disabled by its host.
#[derive(Clone)]
pub struct LocalTransport {
    endpoint: Arc<StoreEndpoint>,
    enabled: Arc<AtomicBool>,
}

impl LocalTransport {
    pub fn new(endpoint: Arc<StoreEndpoint>) -> Self {
        Self {
            endpoint,
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn endpoint(&self) -> &Arc<StoreEndpoint> {
        &self.endpoint
    }

    fn ensure_enabled(&self) -> Result<&StoreEndpoint, TransportError> {
        if self.is_enabled() {
            Ok(&self.endpoint)
        } else {
            Err(TransportError::Disabled)
        }
    }
}

impl Transport for LocalTransport {
    fn read(&self, address: &Address, columns: Columns) -> Result<Vec<WireRow>, TransportError> {
        Ok(self.ensure_enabled()?.read(address, columns)?)
    }

    fn insert(&self, address: &Address, row: WireRow) -> Result<Address, TransportError> {
        Ok(self.ensure_enabled()?.insert(address, row)?)
    }

    fn bulk_write(&self, address: &Address, rows: Vec<WireRow>) -> Result<usize, TransportError> {
        Ok(self.ensure_enabled()?.write(address, rows)?)
    }

    fn delete(&self, address: &Address) -> Result<(), TransportError> {
        Ok(self.ensure_enabled()?.delete(address)?)
    }

    fn subscribe(
        &self,
        namespace: &str,
        sink: Box<dyn EventSink>,
    ) -> Result<Subscription, TransportError> {
        let id = self.ensure_enabled()?.subscribe(Some(namespace), sink)?;
        let endpoint = Arc::clone(&self.endpoint);
        Ok(Subscription::new(move || {
            endpoint.unsubscribe(id);
        }))
    }
}
