//! blynk-app — interactive connect + login + event stream demo.
//!
//! Fill in the constants below and run:
//!   cargo run -p blynk-app

use std::sync::Arc;

use blynk_client::{Config, Connector, Event, StandardAdapter};

// ── Fill in your server and credentials ───────────────────────────────────
const HOST: &str = "";
const EMAIL: &str = "";
const PASSWORD: &str = "";
const APP_NAME: &str = "blynk-app";
// ───────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    if std::env::var("RUST_LOG").is_err() {
        // SAFETY: single-threaded at this point, no other threads reading env.
        unsafe { std::env::set_var("RUST_LOG", "blynk_client=info,blynk_app=info") };
    }
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        eprintln!("\n✗ {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    if HOST.is_empty() {
        eprintln!("Edit HOST/EMAIL/PASSWORD at the top of blynk-app/src/main.rs");
        std::process::exit(1);
    }

    let connector = Connector::new(
        Config { host: HOST.to_string(), ..Default::default() },
        Arc::new(StandardAdapter::new()),
    );

    println!("🔌 Connecting to {HOST} …");
    connector.connect(EMAIL, PASSWORD, APP_NAME).await?;
    println!("✅ Signed in as {EMAIL}");

    let mut events = connector.subscribe();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("\n👂 Listening for events (Ctrl+C to quit) …\n");
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => print_event(&event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        eprintln!("⚠ dropped {n} events, subscriber too slow");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = &mut ctrl_c => {
                println!("\n👋 Disconnecting …");
                connector.disconnect().await;
                break;
            }
        }
    }

    Ok(())
}

fn print_event(event: &Event) {
    match event {
        Event::HardwareMessage { dash_id, device_id, kind, pin, values } => {
            println!("🔧 hw {kind:?} pin {pin} on {dash_id}-{device_id}: {values:?}")
        }
        Event::WidgetPropertyChanged { dash_id, device_id, pin, property, value } => {
            println!("🎛 widget {dash_id}-{device_id} pin {pin} {property}={value}")
        }
        Event::HardwareConnected { dash_id, device_id } => {
            println!("🔌 hardware connected {dash_id}-{device_id}")
        }
        Event::HardwareDisconnected { dash_id, device_id } => {
            println!("🔌 hardware disconnected {dash_id}-{device_id}")
        }
        Event::DeviceOffline { dash_id, device_id } => {
            println!("📴 device offline {dash_id}-{device_id}")
        }
        Event::Response { id, code } => println!("↩ response #{id}: {code:?}"),
        Event::Raw { opcode, .. } => println!("📦 raw {opcode:?}"),
        Event::Reconnecting { attempt } => println!("🔁 reconnecting (attempt {attempt}) …"),
        Event::Reconnected => println!("✅ reconnected"),
        Event::Disconnected => println!("🔌 disconnected"),
    }
}
