//! Unit tests for the transport module.
//! Exercises the raw transport without a registry in front of it.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex, Weak};

use toml::Value;

use crate::{
    ObserveError,
    lifecycle::Entity,
    transport::{
        ChangeSink, LocalTransport, ObservedObject, PropertyChange, PropertyPath, Transport,
        TransportError, TransportHandle,
    },
};

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(TransportHandle, PropertyChange)>>,
}

impl Recorder {
    fn handles(&self) -> Vec<TransportHandle> {
        self.seen.lock().unwrap().iter().map(|(h, _)| *h).collect()
    }
}

impl ChangeSink for Recorder {
    fn deliver(&self, handle: TransportHandle, change: &PropertyChange) {
        self.seen.lock().unwrap().push((handle, change.clone()));
    }
}

fn sink(recorder: &Arc<Recorder>) -> Weak<dyn ChangeSink> {
    let weak: Weak<Recorder> = Arc::downgrade(recorder);
    weak
}

fn path(raw: &str) -> PropertyPath {
    PropertyPath::parse(raw).unwrap()
}

#[test]
fn property_path_accepts_names_and_chains() {
    assert_eq!(path("count").as_str(), "count");
    assert_eq!(
        path("player.volume").segments().collect::<Vec<_>>(),
        vec!["player", "volume"]
    );
    assert_eq!(path("a.b.c").to_string(), "a.b.c");
}

#[test]
fn property_path_rejects_malformed_input() {
    for raw in ["", "a..b", ".a", "a.", "a b", "\tcount"] {
        let error = PropertyPath::parse(raw).unwrap_err();
        assert!(
            matches!(
                error,
                ObserveError::InvalidArgument {
                    argument: "property_path",
                    ..
                }
            ),
            "expected InvalidArgument for {raw:?}"
        );
    }
}

#[test]
fn duplicate_native_registration_delivers_twice() {
    let transport = LocalTransport::new();
    let recorder = Arc::new(Recorder::default());
    let subject = Entity::new();

    let first = transport
        .register(subject.id(), &path("count"), sink(&recorder))
        .unwrap();
    let second = transport
        .register(subject.id(), &path("count"), sink(&recorder))
        .unwrap();

    transport.notify(&PropertyChange::new(
        subject.id(),
        path("count"),
        None,
        Value::Integer(1),
    ));

    assert_ne!(first, second);
    assert_eq!(recorder.handles(), vec![first, second]);
    assert_eq!(transport.registrations_for(subject.id(), "count"), 2);
}

#[test]
fn unregister_twice_is_rejected() {
    let transport = LocalTransport::new();
    let recorder = Arc::new(Recorder::default());
    let subject = Entity::new();

    let handle = transport
        .register(subject.id(), &path("count"), sink(&recorder))
        .unwrap();

    assert_eq!(transport.unregister(handle), Ok(()));
    assert_eq!(
        transport.unregister(handle),
        Err(TransportError::UnknownHandle(handle))
    );
    assert_eq!(transport.active_registrations(), 0);
}

#[test]
fn register_with_dropped_sink_fails() {
    let transport = LocalTransport::new();
    let recorder = Arc::new(Recorder::default());
    let weak = sink(&recorder);
    drop(recorder);

    let subject = Entity::new();
    let result = transport.register(subject.id(), &path("count"), weak);

    assert_eq!(result, Err(TransportError::SinkUnavailable));
    assert_eq!(transport.active_registrations(), 0);
}

#[test]
fn notify_only_reaches_matching_subject_and_path() {
    let transport = LocalTransport::new();
    let recorder = Arc::new(Recorder::default());
    let subject = Entity::new();
    let other = Entity::new();

    let handle = transport
        .register(subject.id(), &path("count"), sink(&recorder))
        .unwrap();

    transport.notify(&PropertyChange::new(
        other.id(),
        path("count"),
        None,
        Value::Integer(1),
    ));
    transport.notify(&PropertyChange::new(
        subject.id(),
        path("name"),
        None,
        Value::Integer(1),
    ));
    transport.notify(&PropertyChange::new(
        subject.id(),
        path("count"),
        None,
        Value::Integer(2),
    ));

    assert_eq!(recorder.handles(), vec![handle]);
}

#[test]
fn observed_object_reports_old_and_new_values() {
    let transport = LocalTransport::shared();
    let recorder = Arc::new(Recorder::default());
    let object = ObservedObject::with_transport(Arc::clone(&transport));

    transport
        .register(object.id(), &path("count"), sink(&recorder))
        .unwrap();

    object.set("count", 0).unwrap();
    object.set("count", 5).unwrap();

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].1.old_value, None);
    assert_eq!(seen[0].1.new_value, Value::Integer(0));
    assert_eq!(seen[1].1.old_value, Some(Value::Integer(0)));
    assert_eq!(seen[1].1.new_value, Value::Integer(5));
    assert_eq!(object.get("count"), Some(Value::Integer(5)));
}

#[test]
fn observed_object_notifies_on_equal_values() {
    let transport = LocalTransport::shared();
    let recorder = Arc::new(Recorder::default());
    let object = ObservedObject::with_transport(Arc::clone(&transport));

    transport
        .register(object.id(), &path("flag"), sink(&recorder))
        .unwrap();

    object.set("flag", true).unwrap();
    object.set("flag", true).unwrap();

    assert_eq!(recorder.handles().len(), 2);
}

#[test]
fn observed_object_rejects_invalid_path() {
    let object = ObservedObject::with_transport(LocalTransport::shared());

    assert!(object.set("", 1).is_err());
    assert_eq!(object.get(""), None);
}

#[test]
fn change_extracts_typed_values() {
    let subject = Entity::new();
    let change = PropertyChange::new(
        subject.id(),
        path("count"),
        Some(Value::Integer(5)),
        Value::Integer(7),
    );

    assert_eq!(change.extract::<i64>().unwrap(), 7);
    assert_eq!(change.extract_old::<i64>().unwrap(), Some(5));
    assert!(matches!(
        change.extract::<String>(),
        Err(ObserveError::TypeMismatch { .. })
    ));
}
