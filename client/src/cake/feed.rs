/// Listener selector a feed is keyed by
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Selector {
    Kind(String),
    Attribute(String, String),
}

/// Lifecycle of a selector's feed.
///
/// The feed starts streaming with its first layer. Every later layer is first
/// replayed against known state; until an emission newer than that replay
/// arrives, the feed is bounded by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedState {
    Uninitialized,
    Streaming,
    StreamingWithReplayBound { until: u64 },
}

impl FeedState {
    pub(crate) fn add_layer(self, stamp: u64) -> Self {
        match self {
            FeedState::Uninitialized => FeedState::Streaming,
            FeedState::Streaming | FeedState::StreamingWithReplayBound { .. } => {
                FeedState::StreamingWithReplayBound { until: stamp }
            }
        }
    }

    pub(crate) fn observe(self, stamp: u64) -> Self {
        match self {
            FeedState::StreamingWithReplayBound { until } if stamp > until => FeedState::Streaming,
            other => other,
        }
    }
}
