//! # mealbot-store
//!
//! The document-store collaborator: profiles, orders and products keyed by
//! opaque ids. The pipeline only depends on the traits in [`traits`];
//! [`memory`] backs tests and single-process deployments, [`rest`] talks
//! to an external CRUD service.

pub mod memory;
pub mod model;
pub mod rest;
pub mod traits;

pub use memory::MemoryStore;
pub use model::{NewOrder, Order, Product};
pub use rest::RestStore;
pub use traits::{OrderStore, ProductStore, ProfileStore};
