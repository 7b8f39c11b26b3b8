//! # mealbot-auth
//!
//! The handshake that ties an anonymous chat identity to a logged-in web
//! session.
//!
//! - [`correlation`] -- single-use OAuth `state` records with expiry
//! - [`session`] -- signed session tokens, full and provisional
//! - [`resolver`] -- chat identity to profile and registration status
//! - [`line_login`] -- code exchange and profile fetch against LINE Login
//! - [`bridge`] -- the login flow itself, start to finish
//! - [`registration`] -- the registration form behind a provisional token

pub mod bridge;
pub mod correlation;
pub mod line_login;
pub mod registration;
pub mod resolver;
pub mod session;

pub use bridge::{CallbackParams, LOGIN_SCOPE, LoginOutcome, LoginSettings, OAuthBridge};
pub use correlation::{CorrelationRecord, CorrelationStore};
pub use line_login::{IdentityProvider, LineLoginClient, ProviderProfile};
pub use registration::{RegistrationForm, RegistrationOutcome, RegistrationService};
pub use resolver::IdentityResolver;
pub use session::{SessionClaims, SessionTokenIssuer, VerifiedSession};
