use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rustls::client::ServerName;
use rustls::{ClientConfig as TlsClientConfig, ClientConnection, StreamOwned};

use crate::address::Address;
use crate::client::transport::map_io;
use crate::client::{Subscription, Transport, TransportError};
use crate::endpoint::EventSink;
use crate::error::ErrorCode;
use crate::types::{Columns, WireRow};

use super::protocol::{read_frame, write_frame, FrameError, Request, Response, AUTH_READY};
use super::tls;
use super::BasicAuthConfig;

/// Connection settings for a [`NetworkTransport`].
#[derive(Clone, Debug)]
pub struct NetworkConfig {
    pub security: NetworkSecurity,
    pub auth: BasicAuthConfig,
    pub timeout: Option<Duration>,
}

#[derive(Clone, Debug)]
pub enum NetworkSecurity {
    Tls {
        server_name: String,
        ca_certificate: PathBuf,
    },
    Plain,
}

impl NetworkConfig {
    pub fn with_tls(
        server_name: impl Into<String>,
        ca_certificate: impl Into<PathBuf>,
        auth: BasicAuthConfig,
    ) -> Self {
        Self {
            security: NetworkSecurity::Tls {
                server_name: server_name.into(),
                ca_certificate: ca_certificate.into(),
            },
            auth,
            timeout: None,
        }
    }

    pub fn without_tls(auth: BasicAuthConfig) -> Self {
        Self {
            security: NetworkSecurity::Plain,
            auth,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// [`Transport`] speaking the framed protocol over TCP (TLS optional).
///
/// The connection is opened on first use and reopened after an I/O
/// failure, so a transport can be built before its endpoint is reachable.
/// Requests share one connection; each subscription gets its own.
pub struct NetworkTransport {
    addrs: Vec<SocketAddr>,
    auth_line: String,
    timeout: Option<Duration>,
    tls: Option<(Arc<TlsClientConfig>, ServerName)>,
    connection: Mutex<Option<ClientStream>>,
}

impl NetworkTransport {
    pub fn new<A: ToSocketAddrs>(addr: A, config: NetworkConfig) -> Result<Self, TransportError> {
        let NetworkConfig {
            security,
            auth,
            timeout,
        } = config;

        let addrs: Vec<SocketAddr> = addr.to_socket_addrs().map_err(map_io)?.collect();
        if addrs.is_empty() {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "address resolved to nothing",
            )));
        }

        let tls = match security {
            NetworkSecurity::Tls {
                server_name,
                ca_certificate,
            } => {
                let config = tls::client_config(&ca_certificate)?;
                let name = ServerName::try_from(server_name.as_str())
                    .map_err(|_| TransportError::InvalidDnsName(server_name.clone()))?;
                Some((config, name))
            }
            NetworkSecurity::Plain => None,
        };

        let mut auth_line = auth.authorization_header();
        auth_line.push('\n');

        Ok(Self {
            addrs,
            auth_line,
            timeout,
            tls,
            connection: Mutex::new(None),
        })
    }

    /// Opens the shared connection now instead of on first use.
    pub fn connect(&self) -> Result<(), TransportError> {
        let mut connection = self.connection.lock();
        if connection.is_none() {
            *connection = Some(self.open()?);
        }
        Ok(())
    }

    /// Closes the shared connection; the next request reconnects.
    pub fn close(&self) -> Result<(), TransportError> {
        match self.connection.lock().take() {
            Some(stream) => stream.close().map_err(map_io),
            None => Ok(()),
        }
    }

    fn open(&self) -> Result<ClientStream, TransportError> {
        let socket = match self.timeout {
            Some(timeout) => connect_any(&self.addrs, |addr| {
                TcpStream::connect_timeout(addr, timeout)
            })?,
            None => connect_any(&self.addrs, |addr| TcpStream::connect(addr))?,
        };
        socket.set_nodelay(true).ok();
        socket.set_read_timeout(self.timeout).map_err(map_io)?;
        socket.set_write_timeout(self.timeout).map_err(map_io)?;

        let mut stream = match &self.tls {
            Some((config, name)) => {
                let connection = ClientConnection::new(Arc::clone(config), name.clone())?;
                ClientStream::Tls(Box::new(StreamOwned::new(connection, socket)))
            }
            None => ClientStream::Plain(socket),
        };

        stream.write_all(self.auth_line.as_bytes()).map_err(map_io)?;
        stream.flush().map_err(map_io)?;

        let mut ack = [0u8; 1];
        let received = stream.read(&mut ack).map_err(map_io)?;
        if received == 0 {
            return Err(TransportError::ConnectionClosed);
        }
        match ack[0] {
            AUTH_READY => Ok(stream),
            code if code == ErrorCode::Unauthorized.as_u8() => Err(TransportError::Unauthorized),
            code => Err(TransportError::Handshake { code }),
        }
    }

    fn round_trip(&self, request: &Request) -> Result<Response, TransportError> {
        let mut guard = self.connection.lock();
        let reused = guard.is_some();
        let result = self.exchange_on(&mut guard, request);

        // The server closes idle connections; retry once on a fresh one.
        let result = match result {
            Err(TransportError::ConnectionClosed) if reused => {
                tracing::debug!(request = request.kind(), "reconnecting closed connection");
                self.exchange_on(&mut guard, request)
            }
            other => other,
        };

        match result? {
            Response::Failure { code, message } => Err(TransportError::Rejected { code, message }),
            response => Ok(response),
        }
    }

    fn exchange_on(
        &self,
        slot: &mut Option<ClientStream>,
        request: &Request,
    ) -> Result<Response, TransportError> {
        if slot.is_none() {
            *slot = Some(self.open()?);
        }
        let stream = slot.as_mut().ok_or(TransportError::ConnectionClosed)?;
        let result = exchange(stream, request);
        if result.is_err() {
            // The stream state is unknown after a failed exchange.
            *slot = None;
        }
        result
    }
}

impl Transport for NetworkTransport {
    fn read(&self, address: &Address, columns: Columns) -> Result<Vec<WireRow>, TransportError> {
        let request = Request::Read {
            address: address.to_string(),
            columns,
        };
        match self.round_trip(&request)? {
            Response::Rows(rows) => Ok(rows),
            other => Err(unexpected(&request, &other)),
        }
    }

    fn insert(&self, address: &Address, row: WireRow) -> Result<Address, TransportError> {
        let request = Request::Insert {
            address: address.to_string(),
            row,
        };
        match self.round_trip(&request)? {
            Response::Inserted { address } => Address::parse(&address)
                .map_err(|err| TransportError::Protocol(format!("bad inserted address: {err}"))),
            other => Err(unexpected(&request, &other)),
        }
    }

    fn bulk_write(&self, address: &Address, rows: Vec<WireRow>) -> Result<usize, TransportError> {
        let request = Request::BulkWrite {
            address: address.to_string(),
            rows,
        };
        match self.round_trip(&request)? {
            Response::Written { count } => Ok(count as usize),
            other => Err(unexpected(&request, &other)),
        }
    }

    fn delete(&self, address: &Address) -> Result<(), TransportError> {
        let request = Request::Delete {
            address: address.to_string(),
        };
        match self.round_trip(&request)? {
            Response::Deleted => Ok(()),
            other => Err(unexpected(&request, &other)),
        }
    }

    fn subscribe(
        &self,
        namespace: &str,
        sink: Box<dyn EventSink>,
    ) -> Result<Subscription, TransportError> {
        let mut stream = self.open()?;
        let request = Request::Subscribe {
            namespace: namespace.to_string(),
        };
        match exchange(&mut stream, &request)? {
            Response::Subscribed => {}
            Response::Failure { code, message } => {
                return Err(TransportError::Rejected { code, message })
            }
            other => return Err(unexpected(&request, &other)),
        }

        // Events may be far apart; only cancellation should end the read.
        let control = stream.socket().try_clone().map_err(map_io)?;
        control.set_read_timeout(None).map_err(map_io)?;

        let namespace = namespace.to_string();
        let pump = thread::Builder::new()
            .name(format!("prefsync-events-{namespace}"))
            .spawn(move || pump_events(stream, sink, &namespace))
            .map_err(TransportError::Io)?;

        Ok(Subscription::new(move || {
            let _ = control.shutdown(Shutdown::Both);
            let _ = pump.join();
        }))
    }
}

fn pump_events(mut stream: ClientStream, sink: Box<dyn EventSink>, namespace: &str) {
    loop {
        match read_frame::<_, Response>(&mut stream) {
            Ok(Some(Response::Event(event))) => {
                if !sink.deliver(&event) {
                    break;
                }
            }
            Ok(Some(other)) => {
                tracing::warn!(namespace, response = ?other, "unexpected frame on event stream");
                break;
            }
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(namespace, error = %err, "event stream closed");
                break;
            }
        }
    }
}

fn exchange(stream: &mut ClientStream, request: &Request) -> Result<Response, TransportError> {
    write_frame(stream, request).map_err(map_frame)?;
    read_frame(stream)
        .map_err(map_frame)?
        .ok_or(TransportError::ConnectionClosed)
}

fn connect_any<F>(addrs: &[SocketAddr], connect: F) -> Result<TcpStream, TransportError>
where
    F: Fn(&SocketAddr) -> std::io::Result<TcpStream>,
{
    let mut last_err = None;
    for addr in addrs {
        match connect(addr) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.map(map_io).unwrap_or(TransportError::ConnectionClosed))
}

fn map_frame(err: FrameError) -> TransportError {
    match err {
        FrameError::Io(err) => map_io(err),
        other => TransportError::Protocol(other.to_string()),
    }
}

fn unexpected(request: &Request, response: &Response) -> TransportError {
    TransportError::Protocol(format!(
        "unexpected response to {}: {response:?}",
        request.kind()
    ))
}

enum ClientStream {
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
    Plain(TcpStream),
}

impl ClientStream {
    fn socket(&self) -> &TcpStream {
        match self {
            ClientStream::Tls(stream) => &stream.sock,
            ClientStream::Plain(stream) => stream,
        }
    }

    fn close(self) -> std::io::Result<()> {
        match self {
            ClientStream::Tls(mut stream) => {
                stream.conn.send_close_notify();
                stream.flush()
            }
            ClientStream::Plain(stream) => stream.shutdown(Shutdown::Both),
        }
    }
}

impl Read for ClientStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            ClientStream::Tls(stream) => stream.read(buf),
            ClientStream::Plain(stream) => stream.read(buf),
        }
    }
}

impl Write for ClientStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            ClientStream::Tls(stream) => stream.write(buf),
            ClientStream::Plain(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            ClientStream::Tls(stream) => stream.flush(),
            ClientStream::Plain(stream) => stream.flush(),
        }
    }
}
