//! End-to-end behavior of the message pipeline through a `Console`.

use indexmap::IndexMap;
use serde_json::json;
use sioscope_core::{
    Bus, Console, Error, FormattedContent, MessageOrigin, Payload, RawInbound, TransportCommand,
    TransportEvent, topics, transport_channel,
};
use sioscope_proto::Subscription;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn ingest(console: &Console, payload: serde_json::Value) {
    console.ingest(RawInbound::Payload(payload)).unwrap();
}

fn count_publishes(bus: &Bus, topic: &'static str) -> (Rc<Cell<usize>>, Subscription) {
    let count = Rc::new(Cell::new(0));
    let counter = Rc::clone(&count);
    let subscription = bus.subscribe(topic, move |_: &Payload| {
        counter.set(counter.get() + 1);
        Ok(())
    });
    (count, subscription)
}

#[test]
fn test_received_order_is_one_based_position() {
    let console = Console::default();
    for event in ["A", "B", "C", "D"] {
        ingest(&console, json!({ "event": event }));
    }

    let state = console.state();
    for (index, message) in state.messages.iter().enumerate() {
        assert_eq!(message.received_order, index as u64 + 1);
    }
}

#[test]
fn test_tags_come_from_event_or_lifecycle_source() {
    let console = Console::default();
    ingest(&console, json!({"event": "ChatRoomSync", "data": {}}));
    ingest(&console, json!({"type": "status", "content": "ok"}));
    ingest(&console, json!({"data": 1}));
    ingest(&console, json!({"event": "", "type": "error", "content": "x"}));
    console.apply(TransportEvent::Connected).unwrap();
    console.apply(TransportEvent::Frame("{oops".to_string())).unwrap();

    let tags: Vec<String> = console.state().messages.iter().map(|m| m.tag.clone()).collect();
    assert_eq!(
        tags,
        vec!["ChatRoomSync", "unknown", "unknown", "unknown", "status", "error"]
    );
}

#[test]
fn test_known_tags_union_and_clear_resets() {
    let console = Console::default();
    ingest(&console, json!({"event": "A"}));
    ingest(&console, json!({"event": "B"}));
    ingest(&console, json!({"event": "A"}));
    console.run_line("filter A");

    let state = console.state();
    let known: Vec<&str> = state.known_tags.iter().map(String::as_str).collect();
    assert_eq!(known, vec!["A", "B"]);

    console.run_line("clear");
    let state = console.state();
    assert!(state.messages.is_empty());
    assert!(state.known_tags.is_empty());
    assert!(state.active_filter.is_empty());

    ingest(&console, json!({"event": "C"}));
    assert_eq!(console.state().messages[0].received_order, 1);
}

#[test]
fn test_filter_shows_matching_messages_in_order() {
    let console = Console::default();
    ingest(&console, json!({"event": "A", "n": 1}));
    ingest(&console, json!({"event": "B", "n": 2}));
    ingest(&console, json!({"event": "A", "n": 3}));
    console.run_line("filter A");

    let state = console.state();
    let visible: Vec<u64> = state.visible_messages().map(|m| m.received_order).collect();
    assert_eq!(visible, vec![1, 3]);
    assert_eq!(state.messages.len(), 3);
}

#[test]
fn test_formatting_is_frozen_at_ingestion() {
    let console = Console::default();
    ingest(&console, json!({"event": "Ping"}));

    console.register_formatter("Ping", |_: &serde_json::Value| FormattedContent {
        compact: "pong".to_string(),
        full: "pong".to_string(),
    });
    ingest(&console, json!({"event": "Ping"}));

    let state = console.state();
    assert_eq!(state.messages[0].compact_content, r#"{"event":"Ping"}"#);
    assert_eq!(state.messages[1].compact_content, "pong");
}

#[test]
fn test_non_json_frame_yields_one_error_message() {
    let console = Console::default();
    console.apply(TransportEvent::Frame("not json".to_string())).unwrap();

    let state = console.state();
    assert_eq!(state.messages.len(), 1);
    let message = &state.messages[0];
    assert_eq!(message.tag, "error");
    assert_eq!(message.origin, MessageOrigin::Remote);
    assert!(message.compact_content.contains("Received non-JSON message: not json"));
}

#[test]
fn test_builder_coercion() {
    let console = Console::default();
    let mut values = IndexMap::new();
    values.insert("Query".to_string(), "42".to_string());
    values.insert("FullRooms".to_string(), "TRUE".to_string());

    let payload = console.builders().build("ChatRoomSearch", &values).unwrap();
    assert_eq!(payload["event"], json!("ChatRoomSearch"));
    assert_eq!(payload["data"]["Query"], json!(42));
    assert_eq!(payload["data"]["FullRooms"], json!(true));

    let mut login = IndexMap::new();
    login.insert("Password".to_string(), "12345".to_string());
    let payload = console.builders().build("AccountLogin", &login).unwrap();
    assert_eq!(payload["data"]["Password"], json!("12345"));
}

#[test]
fn test_unknown_builder_sends_nothing() {
    let console = Console::default();
    let (handle, mut endpoint) = transport_channel();
    console.attach_transport(handle.commands.clone());
    let (sends, _send_sub) = count_publishes(console.bus(), topics::SEND_MESSAGE);
    let (changes, _change_sub) = count_publishes(console.bus(), topics::STATE_CHANGED);

    let error = console.builders().build("Nope", &IndexMap::new()).unwrap_err();
    assert!(matches!(error, Error::UnknownBuilder(ref name) if name == "Nope"));

    console.run_line("send Nope");
    assert_eq!(sends.get(), 0);
    assert_eq!(changes.get(), 0);
    assert!(console.store().is_empty());
    assert!(endpoint.commands.try_recv().is_err());
}

#[test]
fn test_send_echo_flows_back_into_store() {
    let console = Console::default();
    let (handle, mut endpoint) = transport_channel();
    console.attach_transport(handle.commands.clone());

    console.run_line("send ChatRoomJoin Name=Catnest");
    let sent = match endpoint.commands.try_recv().unwrap() {
        TransportCommand::Send(payload) => payload,
        other => panic!("unexpected command {other:?}"),
    };
    assert_eq!(sent, json!({"event": "ChatRoomJoin", "data": {"Name": "Catnest"}}));
    assert!(console.store().is_empty());

    console.apply(TransportEvent::SendCompleted(sent.clone())).unwrap();
    let state = console.state();
    assert_eq!(state.messages.len(), 1);
    assert_eq!(state.messages[0].tag, "ChatRoomJoin");
    assert_eq!(state.messages[0].origin, MessageOrigin::Local);
    assert_eq!(state.messages[0].raw_payload, sent);
}

#[test]
fn test_subscribe_publish_unsubscribe() {
    let bus = Bus::new();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let mut subscription = bus.subscribe("t", move |_: &Payload| {
        counter.set(counter.get() + 1);
        Ok(())
    });

    bus.publish("t", &Payload::Empty);
    bus.publish("t", &Payload::Empty);
    subscription.unsubscribe();
    bus.publish("t", &Payload::Empty);

    assert_eq!(calls.get(), 2);
}

#[test]
fn test_state_changed_carries_snapshot() {
    let console = Console::default();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _subscription = console.bus().subscribe(topics::STATE_CHANGED, move |payload: &Payload| {
        if let Payload::State(state) = payload {
            sink.borrow_mut().push(state.messages.len());
        }
        Ok(())
    });

    ingest(&console, json!({"event": "A"}));
    ingest(&console, json!({"event": "B"}));
    console.run_line("clear");

    assert_eq!(*seen.borrow(), vec![1, 2, 0]);
}
