use std::sync::Arc;

use empirica_admin::{
    AdminConfig, AdminContext, ExternalEvent, ListenersCollector, RegistrationError,
};
use empirica_test::{FakeServer, TestKinds};

// Helper function to create a collector over the batch/game Kind table
fn collector() -> ListenersCollector {
    ListenersCollector::new(Arc::new(TestKinds::locked_batch_game()))
}

#[test]
fn test_try_on_kind_unknown_kind() {
    let mut listeners = collector();

    let result = listeners.try_on_kind("bogus", |_, _| Ok(()));

    assert!(result.is_err());
    match result {
        Err(RegistrationError::UnknownKind { kind }) => {
            assert_eq!(kind, "bogus");
        }
        _ => panic!("Expected UnknownKind error"),
    }
    assert!(listeners.is_empty());
}

#[test]
fn test_try_on_kind_empty_kind() {
    let mut listeners = collector();

    let result = listeners.try_on_kind("", |_, _| Ok(()));

    assert_eq!(result, Err(RegistrationError::EmptyKind));
}

#[test]
fn test_try_on_attribute_empty_key() {
    let mut listeners = collector();

    let result = listeners.try_on_attribute("game", "", |_, _| Ok(()));

    match result {
        Err(RegistrationError::EmptyKey { kind }) => {
            assert_eq!(kind, "game");
        }
        _ => panic!("Expected EmptyKey error"),
    }
}

#[test]
fn test_try_on_attribute_unique_unknown_kind() {
    let mut listeners = collector();

    let result = listeners.try_on_attribute_unique("player", "status", |_, _| Ok(()));

    assert_eq!(
        result,
        Err(RegistrationError::UnknownKind {
            kind: "player".to_string()
        })
    );
}

#[test]
fn test_try_on_event_for_peer_event() {
    let mut listeners = collector();

    let result = listeners.try_on_event_for(ExternalEvent::PeerConnected, "p1", |_, _| Ok(()));

    assert_eq!(
        result,
        Err(RegistrationError::TargetNotSupported {
            event: ExternalEvent::PeerConnected
        })
    );
}

#[test]
fn test_try_on_event_for_empty_target() {
    let mut listeners = collector();

    let result = listeners.try_on_event_for(ExternalEvent::TransitionAdded, "", |_, _| Ok(()));

    assert_eq!(
        result,
        Err(RegistrationError::EmptyTarget {
            event: ExternalEvent::TransitionAdded
        })
    );
}

#[test]
fn test_valid_registrations_are_collected() {
    let mut listeners = collector();

    assert!(listeners.try_on_kind("game", |_, _| Ok(())).is_ok());
    assert!(listeners
        .before()
        .try_on_attribute("batch", "status", |_, _| Ok(()))
        .is_ok());
    assert!(listeners
        .try_on_event_for(ExternalEvent::TransitionAdded, "step-1", |_, _| Ok(()))
        .is_ok());

    assert_eq!(listeners.len(), 3);
}

#[test]
#[should_panic(expected = "Unknown kind: bogus")]
fn test_on_kind_panics_on_unknown_kind() {
    let mut listeners = collector();
    listeners.on_kind("bogus", |_, _| Ok(()));
}

#[test]
#[should_panic(expected = "Unknown kind: bogus")]
fn test_register_fails_at_registration_time() {
    let mut admin = AdminContext::new(
        FakeServer::new(),
        TestKinds::batch_game(),
        AdminConfig::default(),
    );

    // Not connected: the subscriber still runs once to validate its listeners
    admin.register(|listeners| {
        listeners.on_kind("bogus", |_, _| Ok(()));
    });
}
