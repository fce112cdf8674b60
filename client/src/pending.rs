use std::collections::{HashMap, VecDeque};

use log::error;

use empirica_shared::{SetAttributeInput, Step, Transition};

use crate::{
    context::EventContext,
    events::{CallbackResult, ReplyCallback},
    transport::{AddGroupInput, AddScopeInput, AddStepInput, CreatedScope, LinkInput, LinkPayload, TransitionInput},
};

/// Callback run with the result of a mutation once the service answered
pub type Reply<P> = Box<dyn FnOnce(&mut EventContext<'_>, &P) -> CallbackResult>;

/// A mutation requested by listener code, issued at the next flush
pub(crate) enum PendingChange {
    AddScopes {
        inputs: Vec<AddScopeInput>,
        reply: Option<Reply<[CreatedScope]>>,
    },
    AddGroups {
        inputs: Vec<AddGroupInput>,
        reply: Option<Reply<[String]>>,
    },
    LinkPeers {
        inputs: Vec<LinkInput>,
        reply: Option<Reply<[LinkPayload]>>,
    },
    AddSteps {
        inputs: Vec<AddStepInput>,
        reply: Option<Reply<[Step]>>,
    },
    AddTransitions {
        inputs: Vec<TransitionInput>,
        reply: Option<Reply<[Transition]>>,
    },
}

#[derive(Default)]
pub(crate) struct PendingChanges {
    changes: VecDeque<PendingChange>,
    finalizers: VecDeque<ReplyCallback>,
}

impl PendingChanges {
    pub(crate) fn push(&mut self, change: PendingChange) {
        self.changes.push_back(change);
    }

    pub(crate) fn push_finalizer(&mut self, finalizer: ReplyCallback) {
        self.finalizers.push_back(finalizer);
    }

    pub(crate) fn drain(&mut self) -> VecDeque<PendingChange> {
        std::mem::take(&mut self.changes)
    }

    /// Oldest finalizer. One runs per flush, after the flush's mutations.
    pub(crate) fn next_finalizer(&mut self) -> Option<ReplyCallback> {
        self.finalizers.pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.finalizers.is_empty()
    }
}

#[derive(PartialEq, Eq, Hash)]
struct WriteKey {
    node_id: String,
    key: String,
    append: Option<usize>,
    index: Option<usize>,
}

/// Collapses writes to the same Attribute slot, keeping the last one in the
/// position of the first. Appends are never collapsed. Writes without a node
/// are dropped.
pub(crate) fn coalesce_writes(inputs: Vec<SetAttributeInput>) -> Vec<SetAttributeInput> {
    let mut positions: HashMap<WriteKey, usize> = HashMap::new();
    let mut out: Vec<SetAttributeInput> = Vec::new();
    let mut appends = 0;

    for input in inputs {
        let Some(node_id) = input.node_id.clone() else {
            error!("runloop: attribute without node ID: {}", input.key);
            continue;
        };

        let append = if input.append {
            appends += 1;
            Some(appends)
        } else {
            None
        };
        let write_key = WriteKey {
            node_id,
            key: input.key.clone(),
            append,
            index: input.index,
        };

        match positions.get(&write_key) {
            Some(position) => out[*position] = input,
            None => {
                positions.insert(write_key, out.len());
                out.push(input);
            }
        }
    }

    out
}
