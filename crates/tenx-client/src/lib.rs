//! # tenx-client
//!
//! The local-first half of tenx: sessions live in a [`ChatStore`] on this
//! machine and are mirrored to the chat log API on a best-effort basis.
//!
//! - [`store`]: explicit session state container with immutable snapshots
//! - [`persist`]: serialize-on-mutate persistence of the store
//! - [`remote`]: HTTP client for the chat log API
//! - [`sync`]: the [`SyncAdapter`] that mirrors sessions and loads them back
//! - [`queue`]: FIFO background job queue
//! - [`controller_pool`]: cancellation handles of in-flight model calls
//! - [`controller`]: the chat flow tying everything together

#![deny(unsafe_code)]

pub mod controller;
pub mod controller_pool;
pub mod errors;
pub mod persist;
pub mod queue;
pub mod remote;
pub mod state;
pub mod store;
pub mod sync;

pub use controller::{ChatController, ChatOptions};
pub use controller_pool::ControllerPool;
pub use errors::{PersistError, Result, SyncError};
pub use persist::{JsonFilePersister, MemoryPersister, StatePersister};
pub use queue::{BackgroundQueue, BoxError};
pub use remote::{ChatLogRemote, HttpChatLogClient};
pub use state::ChatState;
pub use store::{ChatStore, DeletedSession};
pub use sync::{SyncAdapter, SyncOutcome};
