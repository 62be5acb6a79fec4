//! The note board.
//!
//! # Architecture
//!
//! ```text
//! note windows ──► bus ──┐
//!                        ▼
//!   HubHandle ──► HubActor ──► BoardStore (reducer) ──► effects
//!                    ▲                                    │
//!                    │         ┌──────────────────────────┤
//!                    │         ▼                          ▼
//!                    └── EffectExecutor (host)     bus / persist debounce
//! ```
//!
//! - [`state`]: the persisted document types
//! - [`store`]: the synchronous reducer and its protocol tables
//! - [`actor`]: the event loop that owns the store
//! - [`executor`]: host calls and timers, results fed back to the actor
//! - [`persistence`]: document encoding with normalization, file storage
//! - [`geometry`], [`path`], [`overlay`]: connector anchoring and drawing

pub mod actor;
pub mod debounce;
pub mod drag;
pub mod effects;
pub mod executor;
pub mod geometry;
pub mod leases;
pub mod overlay;
pub mod path;
pub mod persistence;
pub mod state;
pub mod store;

pub use actor::{ActorError, HubActor, HubHandle, HubMessage, HubOptions, HubQuery, QueryResult};
pub use state::{BoardState, Note, NoteId};
pub use store::BoardStore;
