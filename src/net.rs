//! Network access to a [`StoreEndpoint`](crate::endpoint::StoreEndpoint).
//!
//! [`RemoteEndpointServer`] exposes an endpoint over TCP (TLS optional) and
//! [`NetworkTransport`] is the matching client-side
//! [`Transport`](crate::client::Transport).

mod auth;
pub mod protocol;
pub mod server;
mod tls;
pub mod transport;

pub use auth::BasicAuthConfig;
pub use server::{
    RemoteEndpointServer, RemoteServerConfig, RemoteServerHandle, RemoteServerSecurity,
    ServerError, ServerHandle, ServerMetricsSnapshot, DEFAULT_PORT,
};
pub use transport::{NetworkConfig, NetworkSecurity, NetworkTransport};
