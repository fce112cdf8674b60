mod error;
mod payloads;

pub use error::TransportError;
pub use payloads::{
    AddGroupInput, AddScopeInput, AddStepInput, CreatedScope, LinkInput, LinkPayload,
    TransitionInput,
};

use empirica_shared::{
    AttributeChange, ChangeMessage, PeerChange, ScopedFilter, SetAttributeInput, Step, Transition,
};

/// The service the runtime reconciles against.
///
/// Calls are blocking; pushed changes are polled with
/// [`AdminTransport::receive`]. Batches are terminated by
/// [`ChangeMessage::Done`].
pub trait AdminTransport {
    /// Fetches every Scope matching `filter`, with its Attributes, and keeps
    /// streaming later changes to them through `receive`. The returned
    /// messages end with `Done`.
    fn fetch_scoped(&mut self, filter: &ScopedFilter) -> Result<Vec<ChangeMessage>, TransportError>;

    /// Starts streaming peer connections. Returns the peers connected right now;
    /// later connects and disconnects arrive through `receive`.
    fn subscribe_peers(&mut self) -> Result<Vec<PeerChange>, TransportError>;

    /// Starts streaming Transitions of one Step through `receive`
    fn subscribe_transitions(&mut self, step_id: &str) -> Result<(), TransportError>;

    /// Next pushed message, if any
    fn receive(&mut self) -> Result<Option<ChangeMessage>, TransportError>;

    fn create_scopes(&mut self, inputs: &[AddScopeInput]) -> Result<Vec<CreatedScope>, TransportError>;

    /// Returns the Attribute writes the service applied
    fn set_attributes(
        &mut self,
        inputs: &[SetAttributeInput],
    ) -> Result<Vec<AttributeChange>, TransportError>;

    /// Returns the IDs of the created groups
    fn create_groups(&mut self, inputs: &[AddGroupInput]) -> Result<Vec<String>, TransportError>;

    fn link_peers(&mut self, input: &LinkInput) -> Result<LinkPayload, TransportError>;

    fn create_steps(&mut self, inputs: &[AddStepInput]) -> Result<Vec<Step>, TransportError>;

    fn add_transition(&mut self, input: &TransitionInput) -> Result<Transition, TransportError>;
}
