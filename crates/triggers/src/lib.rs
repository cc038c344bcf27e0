//! Trigger management domain.
//!
//! This crate contains the request/response shapes, newtype identifiers,
//! subscription filters, error types and port traits for managing triggers:
//! named, configurable event sources tied to connected third-party accounts.
//! It also contains the [`Triggers`] facade, the single entry point callers use.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate performs no network I/O of its
//! own. It defines *what* is needed ([`TriggersApi`], [`RealtimeFeed`],
//! [`SessionProvider`], [`ErrorNormalizer`]); infrastructure crates define
//! *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`ClientId`, `TriggerInstanceId`, etc.) |
//! | [`types`] | Platform DTOs (`TriggerDefinition`, `TriggerEvent`, etc.) |
//! | [`filter`] | [`SubscriptionFilter`] and its match semantics |
//! | [`errors`] | Facade and port error types, [`RetryPolicy`] |
//! | [`normalizer`] | [`ErrorNormalizer`] and the standard implementation |
//! | [`ports`] | Port traits implemented by infrastructure crates |
//! | [`facade`] | The [`Triggers`] facade |

pub mod errors;
pub mod facade;
pub mod filter;
pub mod identifiers;
pub mod normalizer;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{
    ApiError, ErrorCode, NormalizedError, RealtimeError, RetryPolicy, SessionError, TriggerError,
};
pub use facade::{EventCallback, Triggers};
pub use filter::SubscriptionFilter;
pub use identifiers::{ClientId, ConnectedAccountId, TriggerInstanceId, TriggerName};
pub use normalizer::{ErrorNormalizer, StandardErrorNormalizer};
pub use ports::{EventSink, RealtimeFeed, SessionProvider, TriggersApi};
pub use types::{
    ApiResponse, EnableTriggerRequest, ListTriggersQuery, SetupResponse, StatusAck,
    SwitchStatusRequest, TriggerConfig, TriggerConnection, TriggerDefinition, TriggerEvent,
    TriggerMetadata,
};

// Re-exported so port implementors and callers agree on the secret type.
pub use secrecy::SecretString;
