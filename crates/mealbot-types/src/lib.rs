//! # mealbot-types
//!
//! Core type definitions shared by every mealbot crate.
//!
//! - **[`identity`]** -- [`ChatIdentity`] and the login [`Origin`] tag
//! - **[`profile`]** -- [`Profile`] records and the [`ProfilePatch`] merge unit
//! - **[`error`]** -- [`MealbotError`], [`AuthError`], [`ChannelError`], [`StoreError`]
//! - **[`config`]** -- configuration schema and file discovery
//! - **[`secret`]** -- [`SecretString`] wrapper for credentials

pub mod config;
pub mod error;
pub mod identity;
pub mod profile;
pub mod secret;

pub use error::{AuthError, ChannelError, MealbotError, Result, StoreError};
pub use identity::{ChatIdentity, Origin};
pub use profile::{Profile, ProfilePatch, RegistrationStatus};
pub use secret::SecretString;
