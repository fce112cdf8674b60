use std::{cell::RefCell, rc::Rc};

use serde_json::Value;

use empirica_admin::{AttributeEvent, CallbackResult, EventContext, ExternalPayload, KindEvent};

/// Shared record of listener invocations, cloned into callbacks
#[derive(Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Returns and clears the entries recorded so far
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| e.as_str() == entry).count()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    // Listener callbacks recording into this log

    /// Records `<tag>`
    pub fn simple(&self, tag: &'static str) -> impl FnMut(&mut EventContext<'_>) -> CallbackResult + 'static {
        let log = self.clone();
        move |_| {
            log.push(tag);
            Ok(())
        }
    }

    /// Records `<tag> <scope ID>`
    pub fn kind(
        &self,
        tag: &'static str,
    ) -> impl FnMut(&mut EventContext<'_>, &KindEvent) -> CallbackResult + 'static {
        let log = self.clone();
        move |_, event| {
            log.push(format!("{} {}", tag, event.scope_id));
            Ok(())
        }
    }

    /// Records `<tag> <scope ID> <value>`
    pub fn attribute(
        &self,
        tag: &'static str,
    ) -> impl FnMut(&mut EventContext<'_>, &AttributeEvent) -> CallbackResult + 'static {
        let log = self.clone();
        move |_, event| {
            log.push(format!(
                "{} {} {}",
                tag,
                event.scope_id,
                display(event.value.as_ref())
            ));
            Ok(())
        }
    }

    /// Records `<tag> <peer ID>` or `<tag> <step ID>`
    pub fn external(
        &self,
        tag: &'static str,
    ) -> impl FnMut(&mut EventContext<'_>, &ExternalPayload) -> CallbackResult + 'static {
        let log = self.clone();
        move |_, payload| {
            let subject = match payload {
                ExternalPayload::Peer(peer) => peer.id.clone(),
                ExternalPayload::Transition(transition) => transition.step.id.clone(),
            };
            log.push(format!("{} {}", tag, subject));
            Ok(())
        }
    }
}

fn display(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => "unset".to_string(),
    }
}
