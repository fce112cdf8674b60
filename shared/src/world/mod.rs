pub mod attributes;
pub mod scope_world;
pub mod scopes;
pub mod steps;
pub mod world_events;
