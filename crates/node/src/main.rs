mod sensor;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::Serialize;
use std::{env, time::Duration};
use tokio::time::sleep;

/// Payload published to `farm/moisture/<id>`.  The hub aggregates these
/// into the per-section average the valve nodes act on.
#[derive(Debug, Serialize)]
struct MoistureMsg {
    moisture_device_id: i64,
    /// Soil moisture as a 0-100 percentage.
    value: i32,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Env config
    let broker = env::var("MQTT_HOST").unwrap_or_else(|_| "192.168.1.10".to_string());
    let port: u16 = env::var("MQTT_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1883);
    let device_id: i64 = env::var("DEVICE_ID")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);

    // The original hardware slept 30 s between samples; same default here.
    let sample_every_s: u64 = env::var("SAMPLE_EVERY_S")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    let client_id = format!("moisture_client_{device_id}");

    let mut mqttoptions = MqttOptions::new(client_id, broker, port);
    mqttoptions.set_keep_alive(Duration::from_secs(30));
    if let Ok(user) = env::var("MQTT_USERNAME") {
        mqttoptions.set_credentials(user, env::var("MQTT_PASSWORD").unwrap_or_default());
    }

    let (client, mut eventloop) = AsyncClient::new(mqttoptions, 10);

    // Publish-only node, but the event loop must run to keep the
    // connection alive.
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    eprintln!("node connected to mqtt");
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("mqtt error: {e}. retrying...");
                    sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });

    let topic = format!("farm/moisture/{device_id}");
    eprintln!("publishing to topic: {topic}");

    #[cfg(feature = "sim")]
    let mut probe = sensor::SimProbe::new();

    loop {
        #[cfg(feature = "sim")]
        let raw = probe.read();
        #[cfg(not(feature = "sim"))]
        let raw = sensor::RAW_DRY; // no probe wired: report bone-dry

        let msg = MoistureMsg {
            moisture_device_id: device_id,
            value: sensor::scale_to_percent(raw, sensor::RAW_DRY, sensor::RAW_WET),
        };

        match serde_json::to_vec(&msg) {
            Ok(payload) => {
                if let Err(e) = client
                    .publish(&topic, QoS::AtLeastOnce, false, payload)
                    .await
                {
                    eprintln!("publish error: {e}");
                } else {
                    eprintln!("published moisture value={}", msg.value);
                }
            }
            Err(e) => eprintln!("encode error: {e}"),
        }

        sleep(Duration::from_secs(sample_every_s)).await;
    }
}

// ===========================================================================
// Tests
// ===========================================================================
