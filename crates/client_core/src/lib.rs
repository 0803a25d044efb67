//! Client-side core of the watch-list settings panel.
//!
//! [`SettingsController`] is the entry point for front-ends. It sequences the
//! [`ProfileResolver`] with the two [`PersistedState`] values kept in durable storage.

pub mod controller;
pub mod directory;
pub mod error;
pub mod persisted;
pub mod resolver;
pub mod view;

pub use controller::{AddOutcome, SettingsController, SettingsEvent};
pub use directory::{HttpProfileDirectory, MissingProfileDirectory, ProfileDirectory};
pub use error::{SettingsError, StoreError};
pub use persisted::PersistedState;
pub use resolver::{ProfileResolver, ResolutionSink, ResolveError, ResolverStatus};
pub use view::{EntryView, SettingsView};
