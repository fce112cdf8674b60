use empirica_shared::{ScopeKinds, ScopeRef, ScopeView};

/// Builder for the Kind tables used across the tests
pub struct TestKinds;

impl TestKinds {
    /// Only the always-present global Kind
    pub fn minimal() -> ScopeKinds {
        ScopeKinds::builder().build()
    }

    pub fn batch_game() -> ScopeKinds {
        ScopeKinds::builder()
            .add_kind(Batch::KIND)
            .add_kind(Game::KIND)
            .build()
    }

    pub fn locked_batch_game() -> ScopeKinds {
        let mut kinds = Self::batch_game();
        kinds.lock();
        kinds
    }
}

pub struct Batch<'w>(ScopeRef<'w>);

impl<'w> ScopeView<'w> for Batch<'w> {
    const KIND: &'static str = "batch";

    fn wrap(scope: ScopeRef<'w>) -> Self {
        Batch(scope)
    }

    fn scope(&self) -> &ScopeRef<'w> {
        &self.0
    }
}

impl<'w> Batch<'w> {
    pub fn status(&self) -> Option<String> {
        self.0.get("status").and_then(|v| v.as_str().map(str::to_string))
    }
}

pub struct Game<'w>(ScopeRef<'w>);

impl<'w> ScopeView<'w> for Game<'w> {
    const KIND: &'static str = "game";

    fn wrap(scope: ScopeRef<'w>) -> Self {
        Game(scope)
    }

    fn scope(&self) -> &ScopeRef<'w> {
        &self.0
    }
}

impl<'w> Game<'w> {
    /// The Batch named by the `batchID` Attribute, once it is materialized
    pub fn batch(&self) -> Option<Batch<'w>> {
        self.0.scope_by_key("batchID").and_then(ScopeRef::cast)
    }
}
