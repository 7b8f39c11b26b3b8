//! Tool contracts consumed by the agent loop.
//!
//! Concrete tools live in `mealbot-tools`; this module only defines the
//! contract and the registry.

pub mod registry;
