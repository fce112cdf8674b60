use std::fmt;

use log::warn;
use serde_json::{Map, Value};

use crate::{
    world::{
        attributes::{
            attribute::Attribute,
            options::{AttributeOptions, SetAttributeInput},
        },
        scope_world::ScopeWorld,
        scopes::scope_record::ScopeRecord,
    },
};

/// A typed view over a Scope of one Kind.
///
/// ```ignore
/// struct Game<'w>(ScopeRef<'w>);
///
/// impl<'w> ScopeView<'w> for Game<'w> {
///     const KIND: &'static str = "game";
///     fn wrap(scope: ScopeRef<'w>) -> Self { Game(scope) }
///     fn scope(&self) -> &ScopeRef<'w> { &self.0 }
/// }
/// ```
pub trait ScopeView<'w>: Sized {
    const KIND: &'static str;

    fn wrap(scope: ScopeRef<'w>) -> Self;

    fn scope(&self) -> &ScopeRef<'w>;
}

/// Read-mostly handle to a materialized Scope.
///
/// Reads hit committed state. Writes never touch local state: they are queued
/// and reconciled through the change stream like any server-side write.
#[derive(Clone, Copy)]
pub struct ScopeRef<'w> {
    world: &'w ScopeWorld,
    record: &'w ScopeRecord,
}

impl<'w> ScopeRef<'w> {
    pub(crate) fn new(world: &'w ScopeWorld, record: &'w ScopeRecord) -> Self {
        Self { world, record }
    }

    pub fn id(&self) -> &'w str {
        self.record.id()
    }

    pub fn kind(&self) -> &'w str {
        self.record.kind()
    }

    pub fn name(&self) -> Option<&'w str> {
        self.record.name()
    }

    pub fn is_deleted(&self) -> bool {
        self.record.is_deleted()
    }

    pub fn world(&self) -> &'w ScopeWorld {
        self.world
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.world.get(self.id(), key)
    }

    pub fn attribute(&self, key: &str) -> Option<&'w Attribute> {
        self.world.attribute(self.id(), key)
    }

    /// Value as it will read after the pending batch commits
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.world.peek_next(self.id(), key)
    }

    /// All current Attribute values. Tombstoned keys are left out.
    pub fn inspect(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for attribute in self.world.attributes(self.id()) {
            if let Some(value) = attribute.value() {
                out.insert(attribute.key().to_string(), value);
            }
        }
        out
    }

    /// Whether the Scope is new or has Attribute updates awaiting commit
    pub fn has_updated(&self) -> bool {
        self.world.scope_was_updated(self.id())
    }

    pub fn set(&self, key: &str, value: &Value) {
        self.set_with(key, value, &AttributeOptions::default());
    }

    pub fn set_with(&self, key: &str, value: &Value, options: &AttributeOptions) {
        if self.is_deleted() {
            warn!("scope: set {} on deleted scope {}", key, self.id());
            return;
        }
        self.world
            .write(SetAttributeInput::new(self.id(), key, value).with_options(options));
    }

    pub fn scope_by_id(&self, id: &str) -> Option<ScopeRef<'w>> {
        self.world.scope(id)
    }

    /// Follows an Attribute holding another Scope's ID. Absent when the key is
    /// unset, not a string, or names a Scope not materialized yet.
    pub fn scope_by_key(&self, key: &str) -> Option<ScopeRef<'w>> {
        match self.get(key) {
            Some(Value::String(id)) => self.world.scope(&id),
            _ => None,
        }
    }

    pub fn cast<V: ScopeView<'w>>(self) -> Option<V> {
        if self.kind() == V::KIND {
            Some(V::wrap(self))
        } else {
            None
        }
    }
}

impl fmt::Debug for ScopeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeRef")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("deleted", &self.is_deleted())
            .finish()
    }
}

impl PartialEq for ScopeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.world, other.world) && self.id() == other.id()
    }
}
