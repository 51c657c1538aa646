#[path = "common/support.rs"]
mod support;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rcgen::generate_simple_self_signed;
use prefsync::{
    BasicAuthConfig, ClientConfig, ClientError, ErrorCode, NetworkConfig, NetworkTransport,
    RemoteEndpointServer, RemoteServerConfig, RemoteStoreClient, ServerError, ServerHandle,
    Transport, TransportError,
};
use support::{EndpointHarness, RecordingListener, NAMESPACE};

fn workspace_tmp() -> PathBuf {
    let path = std::env::current_dir().unwrap().join("target/testdata");
    std::fs::create_dir_all(&path).unwrap();
    path
}

fn generate_tls_material(base: &Path) -> (PathBuf, PathBuf) {
    let cert = generate_simple_self_signed(["localhost".to_string()]).unwrap();
    let cert_path = base.join("server.crt");
    let key_path = base.join("server.key");
    std::fs::write(&cert_path, cert.serialize_pem().unwrap()).unwrap();
    std::fs::write(&key_path, cert.serialize_private_key_pem()).unwrap();
    (cert_path, key_path)
}

fn ephemeral_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
}

fn start_server(harness: &EndpointHarness, config: RemoteServerConfig) -> ServerHandle {
    RemoteEndpointServer::new(Arc::clone(&harness.endpoint), config)
        .unwrap()
        .spawn()
        .unwrap()
}

fn network_client(
    server: &ServerHandle,
    config: NetworkConfig,
    client: ClientConfig,
) -> RemoteStoreClient {
    let transport = NetworkTransport::new(server.local_addr(), config).unwrap();
    RemoteStoreClient::new(Arc::new(transport), client).unwrap()
}

#[test]
fn network_round_trip_without_tls() {
    let harness = EndpointHarness::new();
    let auth = BasicAuthConfig::new("tester", "secret");
    let server = start_server(
        &harness,
        RemoteServerConfig::new(ephemeral_addr(), auth.clone()),
    );

    let client = network_client(
        &server,
        NetworkConfig::without_tls(auth).with_timeout(Duration::from_secs(2)),
        ClientConfig::new(NAMESPACE).strict(),
    );

    assert!(client
        .edit()
        .put_string("s", "foo")
        .put_int("n", 42)
        .commit()
        .unwrap());
    assert_eq!(client.get_string("s", "").unwrap(), "foo");
    assert_eq!(client.get_int("n", 0).unwrap(), 42);
    assert!(client.contains("n").unwrap());
    assert_eq!(client.get_all().unwrap().len(), 2);

    let metrics = server.metrics();
    assert!(metrics.total_requests >= 5);
    assert_eq!(metrics.failed_requests, 0);
    server.shutdown().unwrap();
}

#[test]
fn network_round_trip_tls() {
    let harness = EndpointHarness::new();
    let temp = tempfile::tempdir_in(workspace_tmp()).unwrap();
    let (cert_path, key_path) = generate_tls_material(temp.path());
    let auth = BasicAuthConfig::new("tester", "secret");

    let server = start_server(
        &harness,
        RemoteServerConfig::new(ephemeral_addr(), auth.clone()).with_tls(&cert_path, &key_path),
    );

    let client = network_client(
        &server,
        NetworkConfig::with_tls("localhost", &cert_path, auth).with_timeout(Duration::from_secs(2)),
        ClientConfig::new(NAMESPACE).strict(),
    );

    client.edit().put_long("big", i64::MIN).commit().unwrap();
    assert_eq!(client.get_long("big", 0).unwrap(), i64::MIN);
    assert_eq!(harness.store.len(), 1);
    server.shutdown().unwrap();
}

#[test]
fn network_rejects_bad_credentials() {
    let harness = EndpointHarness::new();
    let server = start_server(
        &harness,
        RemoteServerConfig::new(ephemeral_addr(), BasicAuthConfig::new("user", "valid-pass")),
    );

    let transport = NetworkTransport::new(
        server.local_addr(),
        NetworkConfig::without_tls(BasicAuthConfig::new("user", "wrong-pass"))
            .with_timeout(Duration::from_secs(1)),
    )
    .unwrap();
    let err = transport.connect().unwrap_err();
    assert!(matches!(err, TransportError::Unauthorized));
    assert!(err.is_security());

    let client = RemoteStoreClient::new(Arc::new(transport), ClientConfig::new(NAMESPACE).strict())
        .unwrap();
    match client.get_int("n", 0) {
        Err(ClientError::RemoteAccess { source, .. }) => {
            assert_eq!(source.code(), Some(ErrorCode::Unauthorized))
        }
        other => panic!("expected unauthorized failure, got {other:?}"),
    }
    server.shutdown().unwrap();
}

#[test]
fn endpoint_errors_cross_the_network() {
    let harness = EndpointHarness::with_policy(|_ns: &str, key: &str, is_write: bool| {
        !(is_write && key == "secret")
    });
    let auth = BasicAuthConfig::new("tester", "secret");
    let server = start_server(
        &harness,
        RemoteServerConfig::new(ephemeral_addr(), auth.clone()),
    );
    let client = network_client(
        &server,
        NetworkConfig::without_tls(auth).with_timeout(Duration::from_secs(2)),
        ClientConfig::new(NAMESPACE).strict(),
    );

    let err = client
        .edit()
        .put_int("ok", 1)
        .put_int("secret", 2)
        .commit()
        .unwrap_err();
    match err {
        ClientError::RemoteAccess { source, .. } => {
            assert_eq!(source.code(), Some(ErrorCode::AccessDenied))
        }
        other => panic!("expected access denied, got {other}"),
    }
    assert!(harness.store.is_empty());

    // The connection survives a rejected request.
    client.edit().put_int("ok", 1).commit().unwrap();
    assert_eq!(client.get_int("ok", 0).unwrap(), 1);
    assert_eq!(server.metrics().failed_requests, 1);
    server.shutdown().unwrap();
}

#[test]
fn unreachable_endpoint_strict_vs_lenient() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
    let config = NetworkConfig::without_tls(BasicAuthConfig::new("user", "pass"))
        .with_timeout(Duration::from_millis(500));

    let strict = RemoteStoreClient::new(
        Arc::new(NetworkTransport::new(addr, config.clone()).unwrap()),
        ClientConfig::new(NAMESPACE).strict(),
    )
    .unwrap();
    assert!(matches!(
        strict.get_string("s", "default"),
        Err(ClientError::RemoteAccess { .. })
    ));

    let lenient = RemoteStoreClient::new(
        Arc::new(NetworkTransport::new(addr, config).unwrap()),
        ClientConfig::new(NAMESPACE),
    )
    .unwrap();
    assert_eq!(lenient.get_string("s", "default").unwrap(), "default");
    assert!(!lenient.edit().put_int("n", 1).commit().unwrap());
}

#[test]
fn subscription_streams_events_over_the_network() {
    let harness = EndpointHarness::new();
    let auth = BasicAuthConfig::new("tester", "secret");
    let server = start_server(
        &harness,
        RemoteServerConfig::new(ephemeral_addr(), auth.clone()),
    );
    let client = network_client(
        &server,
        NetworkConfig::without_tls(auth).with_timeout(Duration::from_secs(2)),
        ClientConfig::new(NAMESPACE).strict(),
    );

    let listener = RecordingListener::new();
    client.register_listener(listener.clone()).unwrap();
    assert!(support::wait_until(support::DEFAULT_TIMEOUT, || {
        harness.endpoint.notifier().subscriber_count() == 1
    }));

    client.edit().put_int("n", 1).commit().unwrap();
    client.edit().clear().commit().unwrap();

    assert_eq!(listener.wait_for(2), vec![Some("n".to_string()), None]);

    let handle: Arc<dyn prefsync::ChangeListener> = listener;
    assert!(client.unregister_listener(&handle));
    assert!(support::wait_until(support::DEFAULT_TIMEOUT, || {
        harness.endpoint.notifier().subscriber_count() == 0
    }));
    server.shutdown().unwrap();
}

#[test]
fn insert_and_delete_through_the_transport() {
    let harness = EndpointHarness::new();
    let auth = BasicAuthConfig::new("tester", "secret");
    let server = start_server(
        &harness,
        RemoteServerConfig::new(ephemeral_addr(), auth.clone()),
    );
    let transport = NetworkTransport::new(
        server.local_addr(),
        NetworkConfig::without_tls(auth).with_timeout(Duration::from_secs(2)),
    )
    .unwrap();

    let namespace = prefsync::Address::namespace(NAMESPACE).unwrap();
    let row = prefsync::WireRow::new("k", prefsync::TypeTag::Int, prefsync::WireValue::Int(3));
    let inserted = transport.insert(&namespace, row).unwrap();
    assert_eq!(inserted.to_string(), format!("{NAMESPACE}/k"));

    transport.delete(&inserted).unwrap();
    assert!(harness.store.is_empty());

    transport.close().unwrap();
    // The next call reconnects.
    assert!(transport
        .read(&namespace, prefsync::Columns::all())
        .unwrap()
        .is_empty());
    server.shutdown().unwrap();
}

#[test]
fn placeholder_credentials_are_refused() {
    let harness = EndpointHarness::new();
    let result = RemoteEndpointServer::new(
        Arc::clone(&harness.endpoint),
        RemoteServerConfig::new(ephemeral_addr(), BasicAuthConfig::default()),
    );
    assert!(matches!(result, Err(ServerError::CredentialsMissing)));
}
