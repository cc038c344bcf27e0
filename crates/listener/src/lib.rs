//! Realtime trigger feed infrastructure.
//!
//! Implements the [`triggers::RealtimeFeed`] port with [`WsFeed`], a WebSocket
//! client that keeps one connection to the platform feed and routes every
//! `trigger_to_client` frame to the sink registered for the addressed client.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Socket handling, the frame format and the registry of
//! per-client sinks all live here. The [`triggers`] crate sees only
//! [`triggers::RealtimeFeed`], [`triggers::EventSink`] and
//! [`triggers::RealtimeError`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`config`] | [`FeedConfig`] and feed URL derivation |
//! | [`frame`] | [`FeedFrame`] wire codec and channel naming |
//! | [`registry`] | [`HandlerRegistry`], one sink per client id |
//! | [`ws`] | [`WsFeed`], the connection, its read/write loop and reconnection |

pub mod config;
pub mod frame;
pub mod registry;
pub mod ws;

pub use config::{feed_url_from_base, FeedConfig, FeedConfigError, FEED_PATH, FEED_URL_ENV};
pub use frame::{channel_for, client_id_from_channel, FeedFrame, FrameError};
pub use registry::HandlerRegistry;
pub use ws::{WsFeed, API_KEY_HEADER};
