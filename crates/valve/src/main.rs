mod config;
mod controller;
mod mqtt;
mod valve;

use anyhow::Result;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::env;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use controller::{CommandEvent, Outcome, ValveController};
use valve::ValvePin;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ──────────────────────────────────────────────────────
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = config::load(&config_path)?;

    // ── Valve pin (fail-safe closed at construction) ────────────────
    let mut pin = ValvePin::new(
        cfg.device.valve_gpio_pin as u8,
        cfg.device.relay_active_low,
    )?;
    let mut controller = ValveController::default();

    // ── MQTT ────────────────────────────────────────────────────────
    let client_id = format!("valve_client_{}", cfg.device.section_device_id);
    let mut mqttoptions = MqttOptions::new(client_id, cfg.mqtt.host.clone(), cfg.mqtt.port);
    mqttoptions.set_keep_alive(Duration::from_secs(30));
    if !cfg.mqtt.username.is_empty() {
        mqttoptions.set_credentials(cfg.mqtt.username.clone(), cfg.mqtt.password.clone());
    }

    let (client, mut eventloop) = AsyncClient::new(mqttoptions, 20);

    let (tx, mut rx) = mpsc::channel::<CommandEvent>(16);

    // Reader task: owns the event loop, (re)subscribes on every ConnAck,
    // decodes publishes and forwards typed events.  Decode failures never
    // leave this task.
    let sub_client = client.clone();
    let command_topic = mqtt::command_topic(cfg.device.section_device_id);
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("mqtt connected");
                    match sub_client.subscribe(&command_topic, QoS::AtLeastOnce).await {
                        Ok(()) => info!(topic = %command_topic, "subscribed"),
                        Err(e) => error!("subscribe failed: {e}"),
                    }
                }
                Ok(Event::Incoming(Packet::Publish(p))) => {
                    match mqtt::decode_command(&p.payload) {
                        Ok(ev) => {
                            if tx.send(ev).await.is_err() {
                                return; // controller task gone
                            }
                        }
                        Err(e) => warn!(topic = %p.topic, "{e}"),
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!("mqtt error: {e}. reconnecting...");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });

    let status_topic = mqtt::status_topic(cfg.device.section_device_id);
    let mut ticker = tokio::time::interval(Duration::from_secs(cfg.control.tick_interval_sec));

    info!(
        section = cfg.device.section_device_id,
        tick_sec = cfg.control.tick_interval_sec,
        "valve controller started"
    );

    // Single consumer: commands and the deadline tick are serialized on this
    // task, so the controller state has exactly one writer.
    loop {
        let outcome = tokio::select! {
            Some(cmd) = rx.recv() => {
                info!(?cmd, "command received");
                let out = controller.apply_command(&cmd, Instant::now());
                debug!(
                    mode = controller.mode().as_str(),
                    valve_open = controller.valve_open(),
                    thresholds = ?controller.thresholds(),
                    moisture = controller.last_moisture(),
                    "state after command"
                );
                out
            }
            _ = ticker.tick() => controller.tick(Instant::now()),
        };

        apply_outcome(
            &outcome,
            &mut pin,
            &client,
            &status_topic,
            cfg.device.section_device_id,
        )
        .await;
    }
}

/// Forward one transition's results to the collaborators: pin drive,
/// fault warning, status publication.
async fn apply_outcome(
    outcome: &Outcome,
    pin: &mut ValvePin,
    client: &AsyncClient,
    status_topic: &str,
    section_device_id: i64,
) {
    if let Some(fault) = outcome.fault {
        warn!("configuration fault: {fault}");
    }

    if let Some(open) = outcome.actuation {
        pin.set(open);
        info!("valve set {}", if open { "OPEN" } else { "CLOSED" });
    }

    if let Some(report) = outcome.report {
        let msg = mqtt::StatusMsg::from_report(section_device_id, &report);
        match serde_json::to_vec(&msg) {
            Ok(payload) => {
                if let Err(e) = client
                    .publish(status_topic, QoS::AtLeastOnce, false, payload)
                    .await
                {
                    error!("status publish failed: {e}");
                } else {
                    info!(mode = msg.mode, status = msg.status, "status published");
                }
            }
            Err(e) => error!("status encode failed: {e}"),
        }
    }
}
