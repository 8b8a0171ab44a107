//! Client-side engine for a live-synced personal bookmark vault.
//!
//! The engine mirrors one user's bookmark collection from a remote backend,
//! keeps it current through a change feed, and issues add/delete mutations —
//! all gated on an authenticated session. [`VaultController`] is the single
//! state owner; backends and navigation are reached through the traits in
//! [`service`].

pub mod backend;
pub mod config;
pub mod controller;
pub mod feed;
pub mod mutation;
pub mod notify;
pub mod service;
pub mod session;
pub mod store;
pub mod types;
pub mod util;

pub use controller::{AppEvent, VaultController, VaultOptions, BOOKMARKS_TABLE};
pub use feed::{ChangeFeedSubscriber, RetryPolicy};
pub use service::{
    AuthService, ChangeFeed, ChannelError, LocalChangeFeed, Navigator, RecordService,
    ServiceError, SignInRedirect, Subscription,
};
pub use session::{SessionGate, SessionState};
pub use store::RecordStore;
pub use types::{Bookmark, ChangeEvent, ChangeKind, EventMask, NewBookmark, Session};
