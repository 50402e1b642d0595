//! Desktop server example for trying the settings form without a device.
//!
//! This example registers a typical heat-pump gateway schema on an in-memory
//! EEPROM and serves it, allowing you to:
//! - Edit settings at http://localhost:8080/settings
//! - Read them as JSON at http://localhost:8080/api/settings
//! - Watch the event log at http://localhost:8080/log
//!
//! A background task plays the role of the firmware main loop: it samples a
//! fake flow sensor into a `RingLog` at the configured interval and records
//! a summary line in the event log.
//!
//! # Usage
//!
//! ```sh
//! cargo run --example desktop_server --features web
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use esp_core_kit::hal::MockEeprom;
use esp_core_kit::services::{run_server, SharedSettings, WebServerConfig};
use esp_core_kit::settings::{Field, FieldId, LoadOutcome, SettingsStore};
use esp_core_kit::{RingLog, StoreConfig, WebConfig};

/// Handles to the fields the main loop reads.
#[derive(Clone, Copy)]
struct Schema {
    interval: FieldId,
    flow_factor: FieldId,
    logging: FieldId,
}

fn build_store() -> anyhow::Result<(SettingsStore<MockEeprom>, Schema)> {
    let mut store = SettingsStore::new(MockEeprom::default(), StoreConfig::default());

    store.register(Field::text("Hostname", 32, "aquarea"))?;
    store.register(Field::text("MQTT broker", 64, "mqtt.local"))?;
    store.register(Field::password("MQTT password", 32))?;
    let interval = store.register(Field::integer("Sample interval (s)", 1, 60, 5))?;
    store.register(Field::time_span("Pump runtime", 60, 86_400, 3_600))?;
    let flow_factor = store.register(Field::float("Flow factor", 0.1, 20.0, 7.5, 2))?;
    let logging = store.register(Field::boolean("Log samples", true))?;

    Ok((
        store,
        Schema {
            interval,
            flow_factor,
            logging,
        },
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=================================");
    println!("  esp-core-kit Desktop Server");
    println!("=================================");
    println!();

    let (mut store, schema) = build_store()?;
    match store.begin()? {
        LoadOutcome::Loaded => println!("Loaded stored settings."),
        LoadOutcome::Defaulted => {
            println!("No stored settings, writing defaults.");
            store.save_if_dirty()?;
        }
    }
    println!("Record size: {} bytes", store.size());

    let web_config = WebConfig::default().with_title("Heat pump gateway");
    if !web_config.enabled {
        println!("Web server disabled in config, nothing to serve.");
        return Ok(());
    }
    let server_config = WebServerConfig::from_config(&web_config);

    println!();
    println!("  Settings: http://{}/settings", server_config.addr);
    println!("  JSON:     http://{}/api/settings", server_config.addr);
    println!("  Log:      http://{}/log", server_config.addr);
    println!();
    println!("Press Ctrl+C to stop.");
    println!();

    let state = Arc::new(SharedSettings::new(store));
    state.log_event("boot");

    spawn_sampler(Arc::clone(&state), schema);

    run_server(state, server_config)
        .await
        .context("web server stopped")
}

/// Stand-in for the firmware main loop.
fn spawn_sampler(state: Arc<SharedSettings<MockEeprom>>, schema: Schema) {
    tokio::spawn(async move {
        let mut samples: RingLog<f32, 16> = RingLog::new();
        let mut tick: u32 = 0;
        loop {
            let (interval, factor, logging) = state.with_store(|s| {
                (
                    s.integer(schema.interval).unwrap_or(5),
                    s.float(schema.flow_factor).unwrap_or(1.0),
                    s.boolean(schema.logging).unwrap_or(false),
                )
            });
            tokio::time::sleep(Duration::from_secs(interval.max(1) as u64)).await;

            // Pulses per second from a sawtooth, converted with the flow factor
            tick = tick.wrapping_add(1);
            let pulses = (tick % 20) as f32 * 3.0;
            samples.add(pulses / factor);

            if logging && samples.is_full() {
                let mean = samples.iter().sum::<f32>() / samples.count() as f32;
                state.log_event(format_args!("flow mean {mean:.2} l/min"));
                samples.clear();
            }
        }
    });
}
