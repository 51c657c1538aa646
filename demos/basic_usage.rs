//! Basic usage example demonstrating typed reads, batched edits and listeners
//!
//! Run with: cargo run --example basic_usage

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use prefsync::{
    ClientConfig, EndpointConfig, LocalTransport, MemoryStore, RemoteStoreClient, StoreEndpoint,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Prefsync Basic Usage Example\n");

    // Setup: one endpoint exposing a single in-memory namespace
    let store = Arc::new(MemoryStore::new());
    let endpoint = StoreEndpoint::new(EndpointConfig::new().with_namespace("settings", store))?;
    let transport = LocalTransport::new(Arc::new(endpoint));
    let client = RemoteStoreClient::new(Arc::new(transport.clone()), ClientConfig::new("settings"))?;
    println!("📦 Endpoint exposing namespace `settings`\n");

    // Example 1: listen for changes
    let _guard = client.listen(Arc::new(|key: Option<&str>| match key {
        Some(key) => println!("   🔔 changed: {key}"),
        None => println!("   🔔 namespace cleared"),
    }))?;

    // Example 2: commit a batch
    println!("✏️  Committing theme, volume and tags");
    client
        .edit()
        .put_string("theme", "dark")
        .put_int("volume", 7)
        .put_string_set("tags", ["beta", "night;owl"])
        .commit()?;
    thread::sleep(Duration::from_millis(50));

    println!(
        "   ✓ theme={} volume={}\n",
        client.get_string("theme", "light")?,
        client.get_int("volume", 0)?
    );

    // Example 3: remove then re-add in one batch
    println!("🔁 Replacing volume in a single edit");
    client.edit().remove("volume").put_int("volume", 3).commit()?;
    thread::sleep(Duration::from_millis(50));
    println!("   ✓ volume={}\n", client.get_int("volume", 0)?);

    // Example 4: lenient fallback when the endpoint goes away
    println!("🚫 Disabling the endpoint");
    transport.set_enabled(false);
    println!(
        "   ✓ lenient read falls back to default: {}\n",
        client.get_string("theme", "light")?
    );
    transport.set_enabled(true);

    // Example 5: clear everything
    println!("🧹 Clearing the namespace");
    client.edit().clear().commit()?;
    thread::sleep(Duration::from_millis(50));
    println!("   ✓ entries left: {}", client.get_all()?.len());

    println!("\n✅ Basic usage example completed!");
    Ok(())
}
