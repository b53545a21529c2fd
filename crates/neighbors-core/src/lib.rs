//! Core domain logic for the Neighbors marketplace.
//!
//! Users post small tasks for their building, neighbors respond, and a karma
//! score tracks goodwill. This crate holds the parts of that system that are
//! pure computation:
//!
//! - [`models`] - Value objects: [`User`], [`Task`], [`TaskResponse`] and their enums
//! - [`reputation`] - Karma to [`Level`] mapping and clamped karma deltas
//! - [`feed`] - Urgency derivation, category counts, search and feed ordering
//! - [`clock`] - The [`Clock`] seam used for age-based urgency
//! - [`validation`] - Field validation applied at the request boundary
//!
//! Nothing here performs I/O or holds process-wide state. Callers own the
//! collections and pass them in.
//!
//! # Example
//!
//! ```rust
//! use neighbors_core::{apply_delta, level_for, Level};
//!
//! assert_eq!(level_for(49), Level::Newcomer);
//!
//! let update = apply_delta(150, 50);
//! assert_eq!(update.karma, 200);
//! assert_eq!(update.level, Level::GoodSoul);
//! ```

pub mod clock;
pub mod error;
pub mod feed;
pub mod models;
pub mod reputation;
pub mod validation;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ModelError;
pub use feed::{CategoryCounts, CategoryKey, FeedQuery, SortMode};
pub use models::{
    Category, ResponseStatus, Task, TaskResponse, TaskStatus, Urgency, UrgencySetting, User,
    UserCounts,
};
pub use reputation::{apply_delta, level_for, KarmaUpdate, Level};
pub use validation::ValidationError;
