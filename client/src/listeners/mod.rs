mod error;
mod placement;

pub use error::RegistrationError;
pub use placement::Placement;

use std::sync::Arc;

use serde_json::Value;

use empirica_shared::ScopeKinds;

use crate::{
    context::EventContext,
    events::{
        AttributeCallback, AttributeEvent, CallbackResult, ExternalCallback, ExternalEvent,
        ExternalPayload, KindCallback, KindEvent, SimpleCallback,
    },
};

pub(crate) struct SimpleListener {
    pub(crate) placement: Placement,
    pub(crate) callback: SimpleCallback,
}

pub(crate) struct KindListener {
    pub(crate) placement: Placement,
    pub(crate) kind: String,
    pub(crate) callback: KindCallback,
}

pub(crate) struct AttributeListener {
    pub(crate) placement: Placement,
    pub(crate) kind: String,
    pub(crate) key: String,
    pub(crate) callback: AttributeCallback,
}

pub(crate) struct ExternalListener {
    pub(crate) placement: Placement,
    pub(crate) event: ExternalEvent,
    pub(crate) target: Option<String>,
    pub(crate) callback: ExternalCallback,
}

/// Collects the listeners of one layer.
///
/// Registration is validated on the spot: the `on_*` methods panic on a bad
/// selector, the `try_on_*` twins return the [`RegistrationError`] instead.
/// Use [`ListenersCollector::before`] / [`ListenersCollector::after`] to
/// register ahead of or behind default listeners of the same selector.
pub struct ListenersCollector {
    kinds: Arc<ScopeKinds>,
    pub(crate) starts: Vec<SimpleListener>,
    pub(crate) readys: Vec<SimpleListener>,
    pub(crate) kind_listeners: Vec<KindListener>,
    pub(crate) attribute_listeners: Vec<AttributeListener>,
    pub(crate) external_listeners: Vec<ExternalListener>,
}

impl ListenersCollector {
    pub fn new(kinds: Arc<ScopeKinds>) -> Self {
        Self {
            kinds,
            starts: Vec::new(),
            readys: Vec::new(),
            kind_listeners: Vec::new(),
            attribute_listeners: Vec::new(),
            external_listeners: Vec::new(),
        }
    }

    pub fn before(&mut self) -> Placed<'_> {
        self.at(Placement::Before)
    }

    pub fn after(&mut self) -> Placed<'_> {
        self.at(Placement::After)
    }

    pub fn at(&mut self, placement: Placement) -> Placed<'_> {
        Placed {
            collector: self,
            placement,
        }
    }

    /// Runs once when the layer is added, before any replay
    pub fn on_start<F>(&mut self, callback: F)
    where
        F: FnMut(&mut EventContext<'_>) -> CallbackResult + 'static,
    {
        self.at(Placement::On).on_start(callback);
    }

    /// Runs once after the layer's start listeners and initial replay
    pub fn on_ready<F>(&mut self, callback: F)
    where
        F: FnMut(&mut EventContext<'_>) -> CallbackResult + 'static,
    {
        self.at(Placement::On).on_ready(callback);
    }

    pub fn on_kind<F>(&mut self, kind: &str, callback: F)
    where
        F: FnMut(&mut EventContext<'_>, &KindEvent) -> CallbackResult + 'static,
    {
        self.at(Placement::On).on_kind(kind, callback);
    }

    pub fn try_on_kind<F>(&mut self, kind: &str, callback: F) -> Result<(), RegistrationError>
    where
        F: FnMut(&mut EventContext<'_>, &KindEvent) -> CallbackResult + 'static,
    {
        self.at(Placement::On).try_on_kind(kind, callback)
    }

    pub fn on_attribute<F>(&mut self, kind: &str, key: &str, callback: F)
    where
        F: FnMut(&mut EventContext<'_>, &AttributeEvent) -> CallbackResult + 'static,
    {
        self.at(Placement::On).on_attribute(kind, key, callback);
    }

    pub fn try_on_attribute<F>(
        &mut self,
        kind: &str,
        key: &str,
        callback: F,
    ) -> Result<(), RegistrationError>
    where
        F: FnMut(&mut EventContext<'_>, &AttributeEvent) -> CallbackResult + 'static,
    {
        self.at(Placement::On).try_on_attribute(kind, key, callback)
    }

    pub fn on_attribute_unique<F>(&mut self, kind: &str, key: &str, callback: F)
    where
        F: FnMut(&mut EventContext<'_>, &AttributeEvent) -> CallbackResult + 'static,
    {
        self.at(Placement::On).on_attribute_unique(kind, key, callback);
    }

    pub fn try_on_attribute_unique<F>(
        &mut self,
        kind: &str,
        key: &str,
        callback: F,
    ) -> Result<(), RegistrationError>
    where
        F: FnMut(&mut EventContext<'_>, &AttributeEvent) -> CallbackResult + 'static,
    {
        self.at(Placement::On)
            .try_on_attribute_unique(kind, key, callback)
    }

    pub fn on_event<F>(&mut self, event: ExternalEvent, callback: F)
    where
        F: FnMut(&mut EventContext<'_>, &ExternalPayload) -> CallbackResult + 'static,
    {
        self.at(Placement::On).on_event(event, callback);
    }

    pub fn on_event_for<F>(&mut self, event: ExternalEvent, target: &str, callback: F)
    where
        F: FnMut(&mut EventContext<'_>, &ExternalPayload) -> CallbackResult + 'static,
    {
        self.at(Placement::On).on_event_for(event, target, callback);
    }

    pub fn try_on_event_for<F>(
        &mut self,
        event: ExternalEvent,
        target: &str,
        callback: F,
    ) -> Result<(), RegistrationError>
    where
        F: FnMut(&mut EventContext<'_>, &ExternalPayload) -> CallbackResult + 'static,
    {
        self.at(Placement::On).try_on_event_for(event, target, callback)
    }

    pub fn len(&self) -> usize {
        self.starts.len()
            + self.readys.len()
            + self.kind_listeners.len()
            + self.attribute_listeners.len()
            + self.external_listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_kind(&self, kind: &str) -> Result<(), RegistrationError> {
        if kind.is_empty() {
            return Err(RegistrationError::EmptyKind);
        }
        if !self.kinds.contains(kind) {
            return Err(RegistrationError::UnknownKind {
                kind: kind.to_string(),
            });
        }
        Ok(())
    }
}

/// Registers listeners at one [`Placement`]
pub struct Placed<'c> {
    collector: &'c mut ListenersCollector,
    placement: Placement,
}

impl<'c> Placed<'c> {
    pub fn on_start<F>(self, callback: F)
    where
        F: FnMut(&mut EventContext<'_>) -> CallbackResult + 'static,
    {
        self.collector.starts.push(SimpleListener {
            placement: self.placement,
            callback: Box::new(callback),
        });
    }

    pub fn on_ready<F>(self, callback: F)
    where
        F: FnMut(&mut EventContext<'_>) -> CallbackResult + 'static,
    {
        self.collector.readys.push(SimpleListener {
            placement: self.placement,
            callback: Box::new(callback),
        });
    }

    pub fn on_kind<F>(self, kind: &str, callback: F)
    where
        F: FnMut(&mut EventContext<'_>, &KindEvent) -> CallbackResult + 'static,
    {
        if let Err(err) = self.try_on_kind(kind, callback) {
            panic!("{}", err);
        }
    }

    pub fn try_on_kind<F>(self, kind: &str, callback: F) -> Result<(), RegistrationError>
    where
        F: FnMut(&mut EventContext<'_>, &KindEvent) -> CallbackResult + 'static,
    {
        self.collector.check_kind(kind)?;
        self.collector.kind_listeners.push(KindListener {
            placement: self.placement,
            kind: kind.to_string(),
            callback: Box::new(callback),
        });
        Ok(())
    }

    pub fn on_attribute<F>(self, kind: &str, key: &str, callback: F)
    where
        F: FnMut(&mut EventContext<'_>, &AttributeEvent) -> CallbackResult + 'static,
    {
        if let Err(err) = self.try_on_attribute(kind, key, callback) {
            panic!("{}", err);
        }
    }

    pub fn try_on_attribute<F>(self, kind: &str, key: &str, callback: F) -> Result<(), RegistrationError>
    where
        F: FnMut(&mut EventContext<'_>, &AttributeEvent) -> CallbackResult + 'static,
    {
        self.push_attribute(kind, key, Box::new(callback))
    }

    /// Like [`Placed::on_attribute`], but runs at most once per Attribute write
    /// and placement, across sessions. A `ran-<placement>-<attributeID>` marker
    /// Attribute is written on the Scope after the callback returns.
    pub fn on_attribute_unique<F>(self, kind: &str, key: &str, callback: F)
    where
        F: FnMut(&mut EventContext<'_>, &AttributeEvent) -> CallbackResult + 'static,
    {
        if let Err(err) = self.try_on_attribute_unique(kind, key, callback) {
            panic!("{}", err);
        }
    }

    pub fn try_on_attribute_unique<F>(
        self,
        kind: &str,
        key: &str,
        mut callback: F,
    ) -> Result<(), RegistrationError>
    where
        F: FnMut(&mut EventContext<'_>, &AttributeEvent) -> CallbackResult + 'static,
    {
        let placement = self.placement;
        let unique = move |ctx: &mut EventContext<'_>, event: &AttributeEvent| -> CallbackResult {
            let Some(attribute_id) = event.attribute_id.as_deref() else {
                return Ok(());
            };
            let marker = format!("ran-{}-{}", placement.as_str(), attribute_id);
            let Some(scope) = ctx.scope(&event.scope_id) else {
                return Ok(());
            };
            if scope.get(&marker).is_some() {
                return Ok(());
            }

            callback(ctx, event)?;

            scope.set(&marker, &Value::Bool(true));
            Ok(())
        };
        self.push_attribute(kind, key, Box::new(unique))
    }

    pub fn on_event<F>(self, event: ExternalEvent, callback: F)
    where
        F: FnMut(&mut EventContext<'_>, &ExternalPayload) -> CallbackResult + 'static,
    {
        self.collector.external_listeners.push(ExternalListener {
            placement: self.placement,
            event,
            target: None,
            callback: Box::new(callback),
        });
    }

    /// Transition listener for a single Step
    pub fn on_event_for<F>(self, event: ExternalEvent, target: &str, callback: F)
    where
        F: FnMut(&mut EventContext<'_>, &ExternalPayload) -> CallbackResult + 'static,
    {
        if let Err(err) = self.try_on_event_for(event, target, callback) {
            panic!("{}", err);
        }
    }

    pub fn try_on_event_for<F>(
        self,
        event: ExternalEvent,
        target: &str,
        callback: F,
    ) -> Result<(), RegistrationError>
    where
        F: FnMut(&mut EventContext<'_>, &ExternalPayload) -> CallbackResult + 'static,
    {
        if event != ExternalEvent::TransitionAdded {
            return Err(RegistrationError::TargetNotSupported { event });
        }
        if target.is_empty() {
            return Err(RegistrationError::EmptyTarget { event });
        }
        self.collector.external_listeners.push(ExternalListener {
            placement: self.placement,
            event,
            target: Some(target.to_string()),
            callback: Box::new(callback),
        });
        Ok(())
    }

    fn push_attribute(
        self,
        kind: &str,
        key: &str,
        callback: AttributeCallback,
    ) -> Result<(), RegistrationError> {
        self.collector.check_kind(kind)?;
        if key.is_empty() {
            return Err(RegistrationError::EmptyKey {
                kind: kind.to_string(),
            });
        }
        self.collector.attribute_listeners.push(AttributeListener {
            placement: self.placement,
            kind: kind.to_string(),
            key: key.to_string(),
            callback,
        });
        Ok(())
    }
}
