//! In-memory, expiring session storage.
//!
//! Both interactive flows keep their state on the server for the lifetime of a
//! visitor session: chat widget sessions and quiz wizards. Neither is ever
//! persisted; entries disappear when they expire or are removed explicitly.
//!
//! # Example
//!
//! ```rust
//! use agency_site::session::SessionStore;
//!
//! let store: SessionStore<u32> = SessionStore::new();
//! store.insert("abc", 1);
//! store.update("abc", |value| *value += 1);
//!
//! assert_eq!(store.get("abc"), Some(2));
//! ```

mod store;

pub use store::{DEFAULT_SESSION_TTL, SessionStore};
