use std::sync::{mpsc, Arc};

use proptest::prelude::*;
use serde_json::json;

use empirica_shared::{
    AttributeUpdateEvent, ScopeRemovalEvent, ScopeUpdateEvent, ScopeWorld, SetAttributeInput,
};
use empirica_test::{assert_attribute, assert_no_attribute, ChangeBuilder, TestKinds};

fn world() -> (ScopeWorld, mpsc::Receiver<SetAttributeInput>) {
    let (sender, receiver) = mpsc::channel();
    (
        ScopeWorld::new(Arc::new(TestKinds::batch_game()), sender),
        receiver,
    )
}

#[test]
fn batch_is_invisible_until_done() {
    let (mut world, _writes) = world();
    let mut changes = ChangeBuilder::new();

    assert!(world.receive_message(changes.scope("g1", "game")).is_none());
    assert!(world
        .receive_message(changes.set("g1", "round", &json!(1)))
        .is_none());

    assert!(world.scope("g1").is_none());
    assert_no_attribute!(world, "g1", "round");
    assert_eq!(world.peek_next("g1", "round"), Some(json!(1)));
    assert!(world.kind_was_updated("game"));
    assert!(world.scope_was_updated("g1"));

    let Some(mut events) = world.receive_message(changes.done()) else {
        panic!("Done must commit");
    };
    assert_eq!(events.seq(), 1);
    assert!(world.scope("g1").is_some());
    assert_attribute!(world, "g1", "round", json!(1));
    assert!(!world.scope_was_updated("g1"));

    let scopes: Vec<_> = events.read::<ScopeUpdateEvent>().collect();
    assert_eq!(scopes.len(), 1);
    assert_eq!(scopes[0].scope_id, "g1");

    let attributes: Vec<_> = events.read::<AttributeUpdateEvent>().collect();
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes[0].key, "round");
    assert_eq!(attributes[0].value, Some(json!(1)));

    // read drains
    assert!(!events.has::<AttributeUpdateEvent>());
}

#[test]
fn replayed_write_is_a_no_op() {
    let (mut world, _writes) = world();
    let mut changes = ChangeBuilder::new();

    let write = changes.write("g1", "status", &json!("running"));
    world.receive_message(changes.scope("g1", "game"));
    world.apply_attribute(write.clone(), false);
    world.commit();

    world.apply_attribute(write, false);
    let mut events = world.commit();

    assert_eq!(events.read::<AttributeUpdateEvent>().count(), 0);
    assert_eq!(events.read::<ScopeUpdateEvent>().count(), 0);
    assert_attribute!(world, "g1", "status", json!("running"));
}

#[test]
fn batch_sequence_increases_per_commit() {
    let (mut world, _writes) = world();
    assert_eq!(world.batch_seq(), 0);
    assert_eq!(world.commit().seq(), 1);
    assert_eq!(world.commit().seq(), 2);
    assert_eq!(world.batch_seq(), 2);
}

#[test]
fn unknown_kind_is_dropped() {
    let (mut world, _writes) = world();
    let mut changes = ChangeBuilder::new();

    world.receive_message(changes.scope("x1", "bogus"));
    world.receive_message(changes.set("x1", "k", &json!(1)));
    let mut events = world.receive_message(changes.done()).unwrap();

    assert!(world.scope("x1").is_none());
    assert_eq!(world.scopes_by_kind("bogus").count(), 0);
    assert_eq!(events.read::<ScopeUpdateEvent>().count(), 0);
    assert_eq!(events.read::<AttributeUpdateEvent>().count(), 0);
}

#[test]
fn removed_scope_is_flagged_then_swept() {
    let (mut world, _writes) = world();
    let mut changes = ChangeBuilder::new();

    world.receive_message(changes.scope("g1", "game"));
    world.receive_message(changes.set("g1", "round", &json!(1)));
    world.receive_message(changes.done());

    world.receive_message(changes.removed_scope("g1", "game"));
    let mut events = world.receive_message(changes.done()).unwrap();
    let removals: Vec<_> = events.read::<ScopeRemovalEvent>().collect();
    assert_eq!(removals.len(), 1);
    assert!(world.scope("g1").map(|scope| scope.is_deleted()).unwrap_or(false));
    assert_eq!(world.scopes_by_kind("game").count(), 0);

    world.receive_message(changes.done());
    assert!(world.scope("g1").is_none());
    assert_no_attribute!(world, "g1", "round");
}

#[test]
fn scope_writes_are_queued_not_applied() {
    let (mut world, writes) = world();
    let mut changes = ChangeBuilder::new();

    world.receive_message(changes.scope("g1", "game"));
    world.receive_message(changes.done());

    let Some(scope) = world.scope("g1") else {
        panic!("scope must be materialized");
    };
    scope.set("status", &json!("ended"));

    assert_no_attribute!(world, "g1", "status");
    let queued: Vec<SetAttributeInput> = writes.try_iter().collect();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].node_id.as_deref(), Some("g1"));
    assert_eq!(queued[0].val, "\"ended\"");
}

#[test]
fn vector_items_materialize_with_gaps() {
    let (mut world, _writes) = world();
    let mut changes = ChangeBuilder::new();

    world.receive_message(changes.scope("g1", "game"));
    world.receive_message(changes.item("g1", "chat", 0, &json!("hi")));
    world.receive_message(changes.item("g1", "chat", 2, &json!("bye")));
    world.receive_message(changes.done());

    assert_attribute!(world, "g1", "chat", json!(["hi", null, "bye"]));
}

#[test]
fn global_scope_reads() {
    let (mut world, _writes) = world();
    let mut changes = ChangeBuilder::new();

    world.receive_message(changes.scope("glob", "global"));
    world.receive_message(changes.set("glob", "experimentName", &json!("pilot")));
    world.receive_message(changes.done());

    assert_eq!(world.global("experimentName"), None);
    world.set_global_scope("glob");
    assert_eq!(world.global("experimentName"), Some(json!("pilot")));
}

proptest! {
    /// Whatever the order of writes within a batch, the last one is what
    /// commits.
    #[test]
    fn prop_last_write_in_batch_wins(values in prop::collection::vec(0i64..1000, 1..20)) {
        let (mut world, _writes) = world();
        let mut changes = ChangeBuilder::new();

        world.receive_message(changes.scope("g1", "game"));
        for value in &values {
            world.receive_message(changes.set("g1", "score", &json!(value)));
        }
        let mut events = world.receive_message(changes.done()).unwrap();

        let last = values[values.len() - 1];
        prop_assert_eq!(world.get("g1", "score"), Some(json!(last)));
        prop_assert_eq!(events.read::<AttributeUpdateEvent>().count(), 1);
    }

    /// Peeking during a batch predicts the committed value.
    #[test]
    fn prop_peek_predicts_commit(first in 0i64..1000, second in 0i64..1000) {
        let (mut world, _writes) = world();
        let mut changes = ChangeBuilder::new();

        world.receive_message(changes.scope("g1", "game"));
        world.receive_message(changes.set("g1", "score", &json!(first)));
        world.receive_message(changes.done());

        world.receive_message(changes.set("g1", "score", &json!(second)));
        let peeked = world.peek_next("g1", "score");
        prop_assert_eq!(world.get("g1", "score"), Some(json!(first)));
        world.receive_message(changes.done());
        prop_assert_eq!(world.get("g1", "score"), peeked);
    }
}
