//! Network client example demonstrating remote endpoint access
//!
//! This example shows how to:
//! - Serve an endpoint over TLS with Basic Auth
//! - Read and write it through a `NetworkTransport`
//! - Access server metrics
//!
//! Run with: cargo run --example network_client

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use prefsync::{
    BasicAuthConfig, ClientConfig, EndpointConfig, MemoryStore, NetworkConfig, NetworkTransport,
    RemoteEndpointServer, RemoteServerConfig, RemoteStoreClient, StoreEndpoint,
};
use rcgen::generate_simple_self_signed;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🌐 Network Client Example\n");

    // Generate a self-signed TLS certificate for localhost
    println!("🔐 Generating self-signed TLS certificate...");
    let temp = tempfile::tempdir()?;
    let cert = generate_simple_self_signed(["localhost".to_string()])?;
    let cert_path = temp.path().join("server.crt");
    let key_path = temp.path().join("server.key");
    std::fs::write(&cert_path, cert.serialize_pem()?)?;
    std::fs::write(&key_path, cert.serialize_private_key_pem())?;
    println!("   ✓ Certificate generated\n");

    // Serve the endpoint
    println!("📦 Starting endpoint server...");
    let endpoint = StoreEndpoint::new(
        EndpointConfig::new().with_namespace("settings", Arc::new(MemoryStore::new())),
    )?;
    let auth = BasicAuthConfig::new("demo-user", "demo-pass");
    let config = RemoteServerConfig::new(
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        auth.clone(),
    )
    .with_tls(&cert_path, &key_path);
    let server = RemoteEndpointServer::new(Arc::new(endpoint), config)?.spawn()?;
    println!("   ✓ Listening on {}\n", server.local_addr());

    // Connect a remote client
    println!("🔗 Connecting remote client...");
    let transport = NetworkTransport::new(
        server.local_addr(),
        NetworkConfig::with_tls("localhost", &cert_path, auth).with_timeout(Duration::from_secs(2)),
    )?;
    let client = RemoteStoreClient::new(Arc::new(transport), ClientConfig::new("settings").strict())?;

    client.edit().put_long("launches", 1_337).commit()?;
    println!("   ✓ Remote read: launches={}\n", client.get_long("launches", 0)?);

    // Display server metrics
    let metrics = server.metrics();
    println!("📊 Server Metrics:");
    println!(
        "   • Active connections: {}\n   • Total requests: {}\n   • Avg latency: {}µs",
        metrics.active_connections, metrics.total_requests, metrics.average_request_latency_micros
    );

    drop(client);
    server.shutdown()?;
    println!("\n✅ Network client example completed!");
    Ok(())
}
