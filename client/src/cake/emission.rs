use std::collections::VecDeque;

use empirica_shared::{AttributeUpdateEvent, ScopeRemovalEvent, ScopeUpdateEvent, WorldEvents};

use crate::events::{AttributeEvent, ExternalEvent, ExternalPayload, KindEvent, ReplyCallback};

/// One unit of work for the dispatch queue
pub(crate) enum Emission {
    Kind(KindEvent),
    Attribute(AttributeEvent),
    External {
        event: ExternalEvent,
        payload: ExternalPayload,
    },
    Reply {
        label: &'static str,
        run: ReplyCallback,
    },
}

impl Emission {
    /// Kind emissions first, then Attribute emissions, then removals, in
    /// commit order
    pub(crate) fn from_world(events: &mut WorldEvents) -> Vec<Emission> {
        let mut emissions: Vec<Emission> = events
            .read::<ScopeUpdateEvent>()
            .map(|update| Emission::Kind(update.into()))
            .collect();
        emissions.extend(
            events
                .read::<AttributeUpdateEvent>()
                .map(|update| Emission::Attribute(update.into())),
        );
        emissions.extend(
            events
                .read::<ScopeRemovalEvent>()
                .map(|update| Emission::Kind(KindEvent::removal(update))),
        );
        emissions
    }
}

/// FIFO of emissions, each stamped with its enqueue order
#[derive(Default)]
pub(crate) struct EmissionQueue {
    items: VecDeque<(u64, Emission)>,
    stamp: u64,
}

impl EmissionQueue {
    pub(crate) fn extend(&mut self, emissions: Vec<Emission>) {
        for emission in emissions {
            self.stamp += 1;
            self.items.push_back((self.stamp, emission));
        }
    }

    pub(crate) fn pop(&mut self) -> Option<(u64, Emission)> {
        self.items.pop_front()
    }

    /// Stamp of the most recently enqueued emission
    pub(crate) fn stamp(&self) -> u64 {
        self.stamp
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}
