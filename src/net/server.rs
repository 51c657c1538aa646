use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt,
    BufReader as AsyncBufReader, ReadHalf, WriteHalf,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::spawn_blocking;
use tokio::time::{timeout, Instant};
use tokio_rustls::rustls::ServerConfig as TlsServerConfig;
use tokio_rustls::TlsAcceptor;

use crate::address::Address;
use crate::endpoint::StoreEndpoint;
use crate::error::{ErrorCode, StoreResult};
use crate::types::ChangeEvent;

use super::protocol::{
    decode_payload, encode_frame, payload_len, FrameError, Request, Response, AUTH_READY,
    FRAME_HEADER_LEN, MAX_AUTH_HEADER_LEN,
};
use super::tls;
use super::BasicAuthConfig;

type BufferedReader<S> = AsyncBufReader<ReadHalf<S>>;
type StreamWriter<S> = WriteHalf<S>;

pub const DEFAULT_PORT: u16 = 9443;

/// Authenticated server (TLS optional) exposing a [`StoreEndpoint`] to
/// [`NetworkTransport`](super::NetworkTransport) clients.
pub struct RemoteEndpointServer {
    bind_address: SocketAddr,
    security: ServerSecurityMode,
    limits: ServerLimits,
    state: Arc<ServerState>,
}

/// Handle that exposes server metrics without holding a reference to the server.
#[derive(Clone)]
pub struct RemoteServerHandle {
    metrics: Arc<ServerMetrics>,
}

/// Snapshot of server metrics.
#[derive(Debug, Clone)]
pub struct ServerMetricsSnapshot {
    pub active_connections: usize,
    pub total_connections: usize,
    pub active_subscriptions: usize,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub events_sent: u64,
    pub average_request_latency_micros: u64,
}

/// Configuration for the remote server.
#[derive(Clone, Debug)]
pub struct RemoteServerConfig {
    pub bind_address: SocketAddr,
    pub security: RemoteServerSecurity,
    pub auth: BasicAuthConfig,
    pub max_connections: usize,
    pub request_timeout: Duration,
    pub client_idle_timeout: Duration,
}

#[derive(Clone, Debug)]
pub enum RemoteServerSecurity {
    Tls {
        certificate_path: PathBuf,
        private_key_path: PathBuf,
    },
    Plain,
}

impl RemoteServerConfig {
    pub fn new(bind_address: SocketAddr, auth: BasicAuthConfig) -> Self {
        Self {
            bind_address,
            security: RemoteServerSecurity::Plain,
            auth,
            max_connections: 512,
            request_timeout: Duration::from_secs(2),
            client_idle_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_tls(
        mut self,
        certificate_path: impl Into<PathBuf>,
        private_key_path: impl Into<PathBuf>,
    ) -> Self {
        self.security = RemoteServerSecurity::Tls {
            certificate_path: certificate_path.into(),
            private_key_path: private_key_path.into(),
        };
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = BasicAuthConfig::new(username, password);
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.client_idle_timeout = idle_timeout;
        self
    }
}

impl Default for RemoteServerConfig {
    fn default() -> Self {
        Self::new(
            SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            BasicAuthConfig::placeholder(),
        )
    }
}

impl RemoteEndpointServer {
    /// Creates a new server instance bound to the provided endpoint.
    pub fn new(endpoint: Arc<StoreEndpoint>, config: RemoteServerConfig) -> Result<Self, ServerError> {
        if config.max_connections == 0 {
            return Err(ServerError::InvalidConfig(
                "max_connections must be greater than zero".into(),
            ));
        }
        if config.auth.is_placeholder() {
            return Err(ServerError::CredentialsMissing);
        }

        let security = match &config.security {
            RemoteServerSecurity::Tls {
                certificate_path,
                private_key_path,
            } => ServerSecurityMode::Tls(tls::server_config(certificate_path, private_key_path)?),
            RemoteServerSecurity::Plain => ServerSecurityMode::Plain,
        };

        let state = Arc::new(ServerState {
            endpoint,
            expected_auth_header: config.auth.authorization_header(),
            request_timeout: config.request_timeout,
            idle_timeout: config.client_idle_timeout,
            metrics: Arc::new(ServerMetrics::new()),
        });

        Ok(Self {
            bind_address: config.bind_address,
            security,
            limits: ServerLimits {
                max_connections: config.max_connections,
            },
            state,
        })
    }

    pub(crate) async fn bind_listener(&self) -> Result<TcpListener, ServerError> {
        let listener = TcpListener::bind(self.bind_address).await?;
        Ok(listener)
    }

    /// Starts listening for connections until `shutdown` resolves.
    pub async fn run_until_shutdown<F>(&self, shutdown: F) -> Result<(), ServerError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind_listener().await?;
        self.run_until_shutdown_with_listener(listener, shutdown)
            .await
    }

    pub(crate) async fn run_until_shutdown_with_listener<F>(
        &self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), ServerError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let local_address = listener.local_addr().unwrap_or(self.bind_address);
        tracing::info!(address = %local_address, "remote endpoint server listening");

        let semaphore = Arc::new(Semaphore::new(self.limits.max_connections));
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown signal received; stopping remote server");
                    break;
                }
                accept_res = listener.accept() => {
                    let (socket, peer_addr) = match accept_res {
                        Ok(inner) => inner,
                        Err(err) => {
                            tracing::error!(?err, "failed to accept incoming connection");
                            continue;
                        }
                    };

                    let permit = match semaphore.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            tracing::warn!(?peer_addr, "maximum concurrent clients reached; dropping connection");
                            drop(socket);
                            continue;
                        }
                    };

                    let state = Arc::clone(&self.state);
                    let security = self.security.clone();

                    tokio::spawn(async move {
                        let _permit = permit;
                        state.metrics.connection_opened();

                        let result =
                            handle_socket(state.clone(), security, socket, peer_addr).await;

                        if let Err(err) = result {
                            tracing::debug!(?peer_addr, ?err, "connection terminated");
                        }

                        state.metrics.connection_closed();
                    });
                }
            }
        }

        Ok(())
    }

    /// Returns a handle that can be used to inspect metrics.
    pub fn handle(&self) -> RemoteServerHandle {
        RemoteServerHandle {
            metrics: Arc::clone(&self.state.metrics),
        }
    }

    /// Runs the server on a dedicated runtime thread.
    ///
    /// The listener is bound before this returns, so the reported address
    /// is immediately connectable (use port `0` for an ephemeral port).
    pub fn spawn(self) -> Result<ServerHandle, ServerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("prefsync-server")
            .enable_all()
            .build()?;
        let listener = runtime.block_on(self.bind_listener())?;
        let local_addr = listener.local_addr()?;
        let metrics = self.handle();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("prefsync-server-main".into())
            .spawn(move || {
                let result = runtime.block_on(self.run_until_shutdown_with_listener(
                    listener,
                    async move {
                        let _ = shutdown_rx.await;
                    },
                ));
                runtime.shutdown_timeout(Duration::from_secs(1));
                result
            })?;

        Ok(ServerHandle {
            local_addr,
            metrics,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }
}

impl RemoteServerHandle {
    pub fn snapshot(&self) -> ServerMetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Owner of a server started with [`RemoteEndpointServer::spawn`].
///
/// Dropping the handle stops the server and waits for its thread.
pub struct ServerHandle {
    local_addr: SocketAddr,
    metrics: RemoteServerHandle,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<Result<(), ServerError>>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics(&self) -> ServerMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn shutdown(mut self) -> Result<(), ServerError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), ServerError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| ServerError::TaskFailure)?,
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::warn!(?err, "remote server stopped with an error");
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("io error at {path:?}: {source}")]
    IoPath {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("tls configuration error: {0}")]
    TlsConfig(String),
    #[error("invalid server configuration: {0}")]
    InvalidConfig(String),
    #[error("remote server requires explicit Basic Auth credentials; call `RemoteServerConfig::with_basic_auth` first")]
    CredentialsMissing,
    #[error("remote server thread panicked")]
    TaskFailure,
}

#[derive(Debug)]
struct ServerLimits {
    max_connections: usize,
}

struct ServerState {
    endpoint: Arc<StoreEndpoint>,
    expected_auth_header: String,
    request_timeout: Duration,
    idle_timeout: Duration,
    metrics: Arc<ServerMetrics>,
}

#[derive(Debug, Default)]
struct ServerMetrics {
    active_connections: AtomicUsize,
    total_connections: AtomicUsize,
    active_subscriptions: AtomicUsize,
    total_requests: AtomicU64,
    failed_requests: AtomicU64,
    events_sent: AtomicU64,
    total_request_latency_ns: AtomicU64,
}

impl ServerMetrics {
    fn new() -> Self {
        Self::default()
    }

    fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::AcqRel);
        self.total_connections.fetch_add(1, Ordering::AcqRel);
    }

    fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::AcqRel);
    }

    fn subscription_opened(&self) {
        self.active_subscriptions.fetch_add(1, Ordering::AcqRel);
    }

    fn subscription_closed(&self) {
        self.active_subscriptions.fetch_sub(1, Ordering::AcqRel);
    }

    fn event_sent(&self) {
        self.events_sent.fetch_add(1, Ordering::AcqRel);
    }

    fn request_completed(&self, latency: Duration) {
        self.total_requests.fetch_add(1, Ordering::AcqRel);
        let nanos = latency.as_nanos().min(u128::from(u64::MAX)) as u64;
        self.total_request_latency_ns
            .fetch_add(nanos, Ordering::AcqRel);
    }

    fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::AcqRel);
    }

    fn snapshot(&self) -> ServerMetricsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Acquire);
        let total_latency = self.total_request_latency_ns.load(Ordering::Acquire);
        ServerMetricsSnapshot {
            active_connections: self.active_connections.load(Ordering::Acquire),
            total_connections: self.total_connections.load(Ordering::Acquire),
            active_subscriptions: self.active_subscriptions.load(Ordering::Acquire),
            total_requests,
            failed_requests: self.failed_requests.load(Ordering::Acquire),
            events_sent: self.events_sent.load(Ordering::Acquire),
            average_request_latency_micros: if total_requests == 0 {
                0
            } else {
                (total_latency / total_requests) / 1_000
            },
        }
    }
}

async fn handle_socket(
    state: Arc<ServerState>,
    security: ServerSecurityMode,
    socket: TcpStream,
    peer_addr: SocketAddr,
) -> Result<(), ConnectionError> {
    socket.set_nodelay(true).ok();
    match security {
        ServerSecurityMode::Tls(config) => {
            let acceptor = TlsAcceptor::from(config);
            let tls_stream = match acceptor.accept(socket).await {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::warn!(?peer_addr, ?err, "tls handshake failed");
                    return Err(ConnectionError::Io);
                }
            };

            serve_connection(state, tls_stream, peer_addr).await
        }
        ServerSecurityMode::Plain => serve_connection(state, socket, peer_addr).await,
    }
}

async fn serve_connection<S>(
    state: Arc<ServerState>,
    stream: S,
    peer_addr: SocketAddr,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = AsyncBufReader::new(read_half);

    if let Err(err) = authenticate(&mut reader, &mut write_half, &state).await {
        state.metrics.record_failure();
        return Err(ConnectionError::Protocol(err));
    }

    loop {
        let request: Request = match read_request(&mut reader, &state).await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(ConnectionError::Protocol(err)) => {
                let failure = Response::failure(err.code(), format!("{err:?}"));
                send_response(&mut write_half, &failure).await.ok();
                state.metrics.record_failure();
                return Err(ConnectionError::Protocol(err));
            }
            Err(err) => return Err(err),
        };

        if let Request::Subscribe { namespace } = request {
            return stream_events(&state, &mut reader, &mut write_half, namespace, peer_addr)
                .await;
        }

        let start = Instant::now();
        let kind = request.kind();
        let endpoint = Arc::clone(&state.endpoint);
        let response = match spawn_blocking(move || execute(&endpoint, request)).await {
            Ok(response) => response,
            Err(join_err) => {
                tracing::error!(?join_err, "blocking endpoint call panicked");
                Response::failure(ErrorCode::StoreFailure, "endpoint call panicked")
            }
        };

        if let Response::Failure { code, message } = &response {
            tracing::debug!(?peer_addr, request = kind, ?code, %message, "request failed");
            state.metrics.record_failure();
        }

        if let Err(err) = send_response(&mut write_half, &response).await {
            tracing::warn!(?err, "failed to write response");
            return Err(ConnectionError::Io);
        }

        state.metrics.request_completed(start.elapsed());
        tracing::debug!(?peer_addr, request = kind, "served remote request");
    }
}

fn execute(endpoint: &StoreEndpoint, request: Request) -> Response {
    dispatch(endpoint, request).unwrap_or_else(Response::from)
}

fn dispatch(endpoint: &StoreEndpoint, request: Request) -> StoreResult<Response> {
    match request {
        Request::Read { address, columns } => {
            let address = Address::parse(&address)?;
            endpoint.read(&address, columns).map(Response::Rows)
        }
        Request::Insert { address, row } => {
            let inserted = endpoint.insert(&Address::parse(&address)?, row)?;
            Ok(Response::Inserted {
                address: inserted.to_string(),
            })
        }
        Request::BulkWrite { address, rows } => {
            let count = endpoint.write(&Address::parse(&address)?, rows)?;
            Ok(Response::Written {
                count: count as u64,
            })
        }
        Request::Delete { address } => {
            endpoint.delete(&Address::parse(&address)?)?;
            Ok(Response::Deleted)
        }
        Request::Subscribe { .. } => Ok(Response::failure(
            ErrorCode::InvalidPayload,
            "subscribe is handled by the connection loop",
        )),
    }
}

/// Turns the connection into a push stream of change events.
async fn stream_events<S>(
    state: &ServerState,
    reader: &mut BufferedReader<S>,
    writer: &mut StreamWriter<S>,
    namespace: String,
    peer_addr: SocketAddr,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<ChangeEvent>();
    let id = match state.endpoint.subscribe(Some(&namespace), Box::new(tx)) {
        Ok(id) => id,
        Err(err) => {
            state.metrics.record_failure();
            send_response(writer, &Response::from(err)).await.ok();
            return Ok(());
        }
    };

    state.metrics.subscription_opened();
    tracing::debug!(?peer_addr, namespace = %namespace, "change subscription opened");

    let result = pump_events(state, reader, writer, &mut rx).await;

    state.endpoint.unsubscribe(id);
    state.metrics.subscription_closed();
    tracing::debug!(?peer_addr, namespace = %namespace, "change subscription closed");
    result
}

async fn pump_events<S>(
    state: &ServerState,
    reader: &mut BufferedReader<S>,
    writer: &mut StreamWriter<S>,
    events: &mut mpsc::UnboundedReceiver<ChangeEvent>,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_response(writer, &Response::Subscribed)
        .await
        .map_err(|_| ConnectionError::Io)?;

    let mut probe = [0u8; 1];
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { return Ok(()) };
                send_response(writer, &Response::Event(event))
                    .await
                    .map_err(|_| ConnectionError::Io)?;
                state.metrics.event_sent();
            }
            // Subscribers send nothing after subscribing; any read result
            // means the peer is gone.
            _ = reader.read(&mut probe) => return Ok(()),
        }
    }
}

async fn authenticate<S>(
    reader: &mut BufferedReader<S>,
    writer: &mut StreamWriter<S>,
    state: &ServerState,
) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut line = match read_limited_auth_line(reader, state.idle_timeout).await {
        Ok(bytes) => bytes,
        Err(ProtocolError::InvalidHeader) => {
            let _ = send_code(writer, ErrorCode::InvalidHeader).await;
            return Err(ProtocolError::InvalidHeader);
        }
        Err(err) => return Err(err),
    };

    while matches!(line.last(), Some(b'\n' | b'\r')) {
        line.pop();
    }

    if line.is_empty() {
        return Err(ProtocolError::Unauthorized);
    }

    let received = String::from_utf8_lossy(&line);
    if received.trim() != state.expected_auth_header {
        let _ = send_code(writer, ErrorCode::Unauthorized).await;
        return Err(ProtocolError::Unauthorized);
    }

    writer
        .write_all(&[AUTH_READY])
        .await
        .map_err(|_| ProtocolError::Timeout)?;
    writer.flush().await.map_err(|_| ProtocolError::Timeout)?;
    Ok(())
}

async fn read_limited_auth_line<S>(
    reader: &mut BufferedReader<S>,
    idle_timeout: Duration,
) -> Result<Vec<u8>, ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut line = Vec::with_capacity(128);
    let deadline = Instant::now() + idle_timeout;

    loop {
        if line.len() >= MAX_AUTH_HEADER_LEN {
            return Err(ProtocolError::InvalidHeader);
        }

        let remaining = deadline
            .checked_duration_since(Instant::now())
            .ok_or(ProtocolError::Timeout)?;

        let (bytes_to_consume, finished) = {
            let buf = match timeout(remaining, reader.fill_buf()).await {
                Ok(Ok(chunk)) => chunk,
                Ok(Err(_)) => return Err(ProtocolError::Unauthorized),
                Err(_) => return Err(ProtocolError::Timeout),
            };

            if buf.is_empty() {
                return Err(ProtocolError::Unauthorized);
            }

            let current_len = line.len();
            match buf.iter().position(|byte| *byte == b'\n') {
                Some(idx) => {
                    if current_len + idx > MAX_AUTH_HEADER_LEN {
                        return Err(ProtocolError::InvalidHeader);
                    }
                    line.extend_from_slice(&buf[..=idx]);
                    (idx + 1, true)
                }
                None => {
                    let bytes_to_take = (MAX_AUTH_HEADER_LEN - current_len).min(buf.len());
                    line.extend_from_slice(&buf[..bytes_to_take]);
                    (bytes_to_take, false)
                }
            }
        };

        reader.consume(bytes_to_consume);

        if finished {
            return Ok(line);
        }
    }
}

/// Reads the next request frame. `Ok(None)` is a clean disconnect.
async fn read_request<S>(
    reader: &mut BufferedReader<S>,
    state: &ServerState,
) -> Result<Option<Request>, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    match timeout(state.idle_timeout, reader.read_exact(&mut header)).await {
        Ok(Ok(_)) => {}
        Ok(Err(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Ok(Err(err)) => {
            tracing::debug!(?err, "failed to read request header");
            return Err(ConnectionError::Io);
        }
        // An idle connection closes without a failure frame.
        Err(_) => {
            tracing::debug!("closing idle connection");
            return Ok(None);
        }
    }

    let len = payload_len(header)
        .map_err(|_| ConnectionError::Protocol(ProtocolError::InvalidHeader))?;
    let mut payload = vec![0u8; len];
    match timeout(state.request_timeout, reader.read_exact(&mut payload)).await {
        Ok(Ok(_)) => {}
        Ok(Err(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ConnectionError::Protocol(ProtocolError::InvalidPayload))
        }
        Ok(Err(err)) => {
            tracing::debug!(?err, "failed while reading request payload");
            return Err(ConnectionError::Io);
        }
        Err(_) => return Err(ConnectionError::Protocol(ProtocolError::Timeout)),
    }

    decode_payload(&payload)
        .map(Some)
        .map_err(|_| ConnectionError::Protocol(ProtocolError::InvalidPayload))
}

async fn send_response<S>(writer: &mut StreamWriter<S>, response: &Response) -> Result<(), FrameError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let frame = encode_frame(response)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

async fn send_code<S>(writer: &mut StreamWriter<S>, code: ErrorCode) -> Result<(), std::io::Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    writer.write_all(&[code.as_u8()]).await?;
    writer.flush().await
}

#[derive(Debug)]
enum ConnectionError {
    Io,
    Protocol(ProtocolError),
}

#[derive(Debug)]
enum ProtocolError {
    InvalidHeader,
    InvalidPayload,
    Unauthorized,
    Timeout,
}

impl ProtocolError {
    fn code(&self) -> ErrorCode {
        match self {
            ProtocolError::InvalidHeader => ErrorCode::InvalidHeader,
            ProtocolError::InvalidPayload => ErrorCode::InvalidPayload,
            ProtocolError::Unauthorized => ErrorCode::Unauthorized,
            ProtocolError::Timeout => ErrorCode::Timeout,
        }
    }
}

#[derive(Clone)]
enum ServerSecurityMode {
    Tls(Arc<TlsServerConfig>),
    Plain,
}
