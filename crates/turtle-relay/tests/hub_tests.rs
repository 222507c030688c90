//! Hub behaviour driven event by event, without sockets.
//!
//! Each test feeds [`GatewayEvent`]s straight into a [`Hub`] and reads what
//! each connection's writer would have sent from its outbox receiver.

#![allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]

use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use turtle_relay::session::{ConnectionId, Outbound, Outbox};
use turtle_relay::{GatewayEvent, Hub, RelayConfig};
use turtle_types::TurtleId;

const TURTLE_KEY: &str = "turtle-key";
const WEB_KEY: &str = "web-key";

struct Harness {
    hub: Hub,
    events: UnboundedReceiver<GatewayEvent>,
    // Keeps the hub's weak inbox handle upgradable.
    _sender: UnboundedSender<GatewayEvent>,
}

impl Harness {
    fn new(delay: Duration) -> Self {
        let config = RelayConfig::new(TURTLE_KEY, WEB_KEY).with_basic_states_delay(delay);
        let (sender, events) = mpsc::unbounded_channel();
        let hub = Hub::new(&config, sender.downgrade());
        Self {
            hub,
            events,
            _sender: sender,
        }
    }

    fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    fn connect(&mut self, id: u64) -> UnboundedReceiver<Outbound> {
        let (outbox, rx) = Outbox::channel(ConnectionId(id));
        self.hub.handle(GatewayEvent::Connected { outbox });
        rx
    }

    fn send(&mut self, id: u64, message: &Value) {
        self.send_raw(id, &message.to_string());
    }

    fn send_raw(&mut self, id: u64, text: &str) {
        self.hub.handle(GatewayEvent::Frame {
            connection: ConnectionId(id),
            text: text.to_owned(),
        });
    }

    fn close(&mut self, id: u64) {
        self.hub.handle(GatewayEvent::Closed {
            connection: ConnectionId(id),
        });
    }

    /// Connect and authenticate a turtle, discarding the auth ack.
    fn turtle(&mut self, id: u64, turtle: u32) -> UnboundedReceiver<Outbound> {
        let mut rx = self.connect(id);
        self.send(id, &json!({ "type": "auth", "key": TURTLE_KEY, "id": turtle }));
        assert_eq!(next(&mut rx)["success"], true);
        rx
    }

    /// Connect and authenticate a dashboard, discarding the auth ack and
    /// the immediate digest list.
    fn web(&mut self, id: u64) -> UnboundedReceiver<Outbound> {
        let mut rx = self.connect(id);
        self.send(id, &json!({ "type": "auth", "key": WEB_KEY }));
        assert_eq!(next(&mut rx), json!({ "type": "auth", "success": true, "message": "web" }));
        assert_eq!(next(&mut rx)["type"], "basic_states");
        rx
    }
}

fn next(rx: &mut UnboundedReceiver<Outbound>) -> Value {
    match rx.try_recv() {
        Ok(Outbound::Text(text)) => serde_json::from_str(&text).unwrap(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

fn assert_silent(rx: &mut UnboundedReceiver<Outbound>) {
    assert!(rx.try_recv().is_err(), "expected no frames");
}

fn report_state(harness: &mut Harness, conn: u64, turtle: u32, name: &str) {
    harness.send(
        conn,
        &json!({ "type": "turtle_state", "id": turtle, "name": name, "warnings": [] }),
    );
}

fn report_config(harness: &mut Harness, conn: u64, turtle: u32) {
    harness.send(
        conn,
        &json!({ "type": "turtle_config", "id": turtle, "config": {
            "mode": "plant",
            "block": { "name": "minecraft:wheat", "age": 7 },
            "bounds": { "max": [5, 64, 5], "min": [0, 60, 0] }
        } }),
    );
}

// =========================================================================
// Authentication
// =========================================================================

#[test]
fn turtle_auth_is_acknowledged_with_its_role() {
    let mut harness = Harness::immediate();
    let mut rx = harness.connect(1);
    harness.send(1, &json!({ "type": "auth", "key": TURTLE_KEY, "id": 42 }));

    assert_eq!(next(&mut rx), json!({ "type": "auth", "success": true, "message": "turtle" }));
    assert_silent(&mut rx);
    assert_eq!(harness.hub.status().turtles, vec![TurtleId(42)]);
}

#[test]
fn failed_auth_sends_failure_then_closes() {
    let mut harness = Harness::immediate();
    for (conn, frame) in [
        (1, json!({ "type": "auth", "key": "wrong", "id": 1 }).to_string()),
        (2, json!({ "type": "auth", "key": TURTLE_KEY }).to_string()),
        (3, json!({ "type": "subscribe", "id": 1 }).to_string()),
        (4, "not json".to_owned()),
    ] {
        let mut rx = harness.connect(conn);
        harness.send_raw(conn, &frame);
        assert_eq!(next(&mut rx), json!({ "type": "auth", "success": false }));
        assert_eq!(rx.try_recv().ok(), Some(Outbound::Close));
    }

    let status = harness.hub.status();
    assert_eq!((status.agents, status.observers, status.pending), (0, 0, 0));
}

#[test]
fn only_the_first_frame_is_auth_checked() {
    let mut harness = Harness::immediate();
    let mut web = harness.web(1);
    harness.send(1, &json!({ "type": "auth", "key": "wrong" }));
    assert_silent(&mut web);
    assert_eq!(harness.hub.status().observers, 1);
}

#[test]
fn closing_before_auth_forgets_the_connection() {
    let mut harness = Harness::immediate();
    let _rx = harness.connect(1);
    assert_eq!(harness.hub.status().pending, 1);
    harness.close(1);
    assert_eq!(harness.hub.status().pending, 0);
}

// =========================================================================
// Digests and state relay
// =========================================================================

#[test]
fn digest_lists_only_turtles_with_state_and_config() {
    let mut harness = Harness::immediate();
    let _one = harness.turtle(1, 1);
    let _two = harness.turtle(2, 2);
    report_state(&mut harness, 1, 1, "one");
    report_config(&mut harness, 1, 1);
    report_state(&mut harness, 2, 2, "two");

    let mut web = harness.web(3);
    report_state(&mut harness, 1, 1, "one again");

    let digest = next(&mut web);
    assert_eq!(
        digest,
        json!({ "type": "basic_states", "turtleStates": [
            { "id": 1, "hasWarning": false, "name": "one again", "block": "minecraft:wheat" }
        ] })
    );
    // Not subscribed, so no per-turtle state.
    assert_silent(&mut web);
}

#[test]
fn state_update_sends_digest_then_merged_state_to_subscribers() {
    let mut harness = Harness::immediate();
    let _turtle = harness.turtle(1, 1);
    let mut follower = harness.web(2);
    let mut bystander = harness.web(3);
    harness.send(2, &json!({ "type": "subscribe", "id": 1 }));

    harness.send(1, &json!({ "type": "turtle_state", "id": 1, "fuel": 50 }));
    harness.send(1, &json!({ "type": "turtle_state", "id": 1, "name": "x" }));

    assert_eq!(next(&mut follower)["type"], "basic_states");
    assert_eq!(next(&mut follower)["turtleState"]["fuel"], 50);
    assert_eq!(next(&mut follower)["type"], "basic_states");
    let merged = next(&mut follower);
    assert_eq!(merged["type"], "turtle_state");
    assert_eq!(merged["of"], 1);
    assert_eq!(merged["turtleState"]["fuel"], 50);
    assert_eq!(merged["turtleState"]["name"], "x");
    assert_silent(&mut follower);

    assert_eq!(next(&mut bystander)["type"], "basic_states");
    assert_eq!(next(&mut bystander)["type"], "basic_states");
    assert_silent(&mut bystander);
}

#[test]
fn position_before_state_is_ignored() {
    let mut harness = Harness::immediate();
    let _turtle = harness.turtle(1, 1);
    let mut web = harness.web(2);
    harness.send(2, &json!({ "type": "subscribe", "id": 1 }));

    harness.send(
        1,
        &json!({ "type": "turtle_pos", "id": 1, "position": [1, 2, 3], "facing": "north" }),
    );
    assert_silent(&mut web);

    report_state(&mut harness, 1, 1, "one");
    next(&mut web);
    next(&mut web);
    harness.send(
        1,
        &json!({ "type": "turtle_pos", "id": 1, "position": [1, 2, 3], "facing": "north" }),
    );
    assert_eq!(
        next(&mut web),
        json!({ "type": "turtle_pos", "of": 1, "position": [1, 2, 3], "facing": "north" })
    );
    assert_silent(&mut web);
}

#[test]
fn map_and_inventory_go_to_subscribers_only() {
    let mut harness = Harness::immediate();
    let _turtle = harness.turtle(1, 1);
    let mut follower = harness.web(2);
    let mut bystander = harness.web(3);
    harness.send(2, &json!({ "type": "subscribe", "id": 1 }));

    harness.send(
        1,
        &json!({ "type": "turtle_map", "id": 1, "map": [{ "x": 0, "z": 1, "b": "minecraft:dirt" }] }),
    );
    harness.send(
        1,
        &json!({ "type": "turtle_inventory", "id": 1, "inventory": [null, { "count": 2, "name": "minecraft:wheat" }] }),
    );

    assert_eq!(next(&mut follower)["map"][0]["b"], "minecraft:dirt");
    assert_eq!(next(&mut follower)["inventory"][1]["count"], 2);
    assert_silent(&mut bystander);
}

#[test]
fn messages_naming_another_turtle_are_dropped() {
    let mut harness = Harness::immediate();
    let _turtle = harness.turtle(1, 1);
    let mut web = harness.web(2);
    harness.send(2, &json!({ "type": "subscribe", "id": 7 }));

    report_state(&mut harness, 1, 7, "impostor");
    assert_silent(&mut web);

    harness.send(2, &json!({ "type": "subscribe", "id": 7 }));
    assert_silent(&mut web);
}

#[test]
fn bad_frames_are_dropped_and_the_connection_stays_open() {
    let mut harness = Harness::immediate();
    let mut turtle = harness.turtle(1, 1);
    let mut web = harness.web(2);

    harness.send_raw(1, "{{{");
    harness.send(1, &json!({ "type": "turtle_dance", "id": 1 }));
    harness.send_raw(2, "garbage");
    harness.send(2, &json!({ "type": "turtle_state", "id": 1 }));
    assert_silent(&mut turtle);
    assert_silent(&mut web);

    let status = harness.hub.status();
    assert_eq!((status.agents, status.observers), (1, 1));
}

// =========================================================================
// Subscriptions and commands
// =========================================================================

#[test]
fn subscribe_replies_with_snapshot_only_when_cached() {
    let mut harness = Harness::immediate();
    let _turtle = harness.turtle(1, 1);
    let mut web = harness.web(2);

    harness.send(2, &json!({ "type": "subscribe", "id": 1 }));
    assert_silent(&mut web);

    harness.send(
        1,
        &json!({ "type": "turtle_inventory", "id": 1, "inventory": [] }),
    );
    next(&mut web);

    harness.send(2, &json!({ "type": "subscribe", "id": 1 }));
    assert_eq!(
        next(&mut web),
        json!({ "type": "turtle_full", "of": 1, "turtle": { "inventory": [] } })
    );
    assert_silent(&mut web);
}

#[test]
fn unsubscribe_stops_deltas_and_unknown_ids_are_harmless() {
    let mut harness = Harness::immediate();
    let _turtle = harness.turtle(1, 1);
    let mut web = harness.web(2);
    harness.send(2, &json!({ "type": "subscribe", "id": 1 }));
    harness.send(2, &json!({ "type": "unsubscribe", "id": 99 }));

    harness.send(1, &json!({ "type": "turtle_map", "id": 1, "map": [] }));
    assert_eq!(next(&mut web)["type"], "turtle_map");

    harness.send(2, &json!({ "type": "unsubscribe", "id": 1 }));
    harness.send(1, &json!({ "type": "turtle_map", "id": 1, "map": [] }));
    assert_silent(&mut web);
}

#[test]
fn commands_are_forwarded_to_connected_turtles_only() {
    let mut harness = Harness::immediate();
    let mut turtle = harness.turtle(1, 1);
    let mut web = harness.web(2);

    harness.send(2, &json!({ "type": "command", "id": 5, "command": "pause" }));
    assert_silent(&mut turtle);
    assert_silent(&mut web);

    harness.send(2, &json!({ "type": "command", "id": 1, "command": "pause" }));
    assert_eq!(
        next(&mut turtle),
        json!({ "type": "command", "id": 1, "command": "pause", "data": {} })
    );

    harness.send(
        2,
        &json!({ "type": "command", "id": 1, "command": "set_home", "data": { "home": [1, 2, 3] } }),
    );
    assert_eq!(next(&mut turtle)["data"], json!({ "home": [1, 2, 3] }));
}

// =========================================================================
// Disconnects
// =========================================================================

#[test]
fn turtle_disconnect_removes_then_sends_fresh_digest() {
    let mut harness = Harness::immediate();
    let _one = harness.turtle(1, 1);
    let _two = harness.turtle(2, 2);
    for (conn, turtle) in [(1, 1), (2, 2)] {
        report_state(&mut harness, conn, turtle, "t");
        report_config(&mut harness, conn, turtle);
    }
    let mut follower = harness.web(3);
    let mut bystander = harness.web(4);
    harness.send(3, &json!({ "type": "subscribe", "id": 1 }));
    next(&mut follower);

    harness.close(1);

    assert_eq!(next(&mut follower), json!({ "type": "turtle_removed", "id": 1 }));
    let digest = next(&mut follower);
    assert_eq!(digest["turtleStates"].as_array().map(Vec::len), Some(1));
    assert_eq!(digest["turtleStates"][0]["id"], 2);
    assert_silent(&mut follower);

    assert_eq!(next(&mut bystander)["type"], "basic_states");
    assert_silent(&mut bystander);

    // The record is gone, so a fresh subscribe gets no snapshot, and the
    // follower's subscription set was left alone.
    harness.send(3, &json!({ "type": "subscribe", "id": 1 }));
    assert_silent(&mut follower);
    assert_eq!(harness.hub.status().turtles, vec![TurtleId(2)]);
    assert!(harness.hub.registry().cache().record(TurtleId(1)).is_none());
}

#[test]
fn dashboard_disconnect_only_deregisters() {
    let mut harness = Harness::immediate();
    let mut turtle = harness.turtle(1, 1);
    let _web = harness.web(2);
    harness.close(2);

    assert_eq!(harness.hub.status().observers, 0);
    assert_silent(&mut turtle);
}

#[test]
fn reconnecting_turtle_displaces_the_older_session() {
    let mut harness = Harness::immediate();
    let mut old = harness.turtle(1, 1);
    report_state(&mut harness, 1, 1, "kept");
    let mut web = harness.web(2);
    harness.send(2, &json!({ "type": "subscribe", "id": 1 }));
    next(&mut web);

    let _new = harness.turtle(3, 1);
    assert_eq!(old.try_recv().ok(), Some(Outbound::Close));

    // The displaced connection's close must not purge the newcomer's data.
    harness.close(1);
    assert_silent(&mut web);
    assert!(harness.hub.registry().cache().record(TurtleId(1)).is_some());
    assert_eq!(harness.hub.status().agents, 1);
}

// =========================================================================
// Delayed digest and status
// =========================================================================

#[tokio::test(start_paused = true)]
async fn first_digest_waits_for_the_configured_delay() {
    let mut harness = Harness::new(Duration::from_millis(500));
    let mut web = harness.connect(1);
    harness.send(1, &json!({ "type": "auth", "key": WEB_KEY }));
    assert_eq!(next(&mut web)["success"], true);
    assert_silent(&mut web);

    let started = tokio::time::Instant::now();
    let due = harness.events.recv().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert!(matches!(due, GatewayEvent::DigestDue { connection } if connection == ConnectionId(1)));

    harness.hub.handle(due);
    assert_eq!(next(&mut web), json!({ "type": "basic_states", "turtleStates": [] }));
}

#[tokio::test(start_paused = true)]
async fn delayed_digest_for_a_departed_dashboard_is_dropped() {
    let mut harness = Harness::new(Duration::from_millis(500));
    let mut web = harness.connect(1);
    harness.send(1, &json!({ "type": "auth", "key": WEB_KEY }));
    next(&mut web);
    harness.close(1);

    let due = harness.events.recv().await.unwrap();
    harness.hub.handle(due);
    assert_silent(&mut web);
}

#[tokio::test]
async fn status_event_reports_counts() {
    let mut harness = Harness::immediate();
    let _turtle = harness.turtle(1, 9);
    let _web = harness.web(2);
    let _pending = harness.connect(3);

    let (reply, report) = tokio::sync::oneshot::channel();
    harness.hub.handle(GatewayEvent::Status { reply });
    let report = report.await.unwrap();

    assert_eq!(report.agents, 1);
    assert_eq!(report.observers, 1);
    assert_eq!(report.pending, 1);
    assert_eq!(report.turtles, vec![TurtleId(9)]);
}
