//! Entity store boundary for datastore-sync
//!
//! The export and import pumps never talk to a store directly. They go
//! through the `EntityStore` trait, reached via an open `Session`.
//!
//! ## Storage Backends
//!
//! - `MemoryStore` - Keeps records in memory, records how it was called
//! - `DirectoryStore` - Stores each kind as a JSON-lines file
//!
//! ## Sessions
//!
//! A `Session` opens the store when created and releases it exactly once,
//! when closed or dropped:
//!
//! ```ignore
//! let store = DirectoryStore::new("./data");
//! let session = Session::open(&store).await?;
//! let kinds = session.list_kinds().await?;
//! session.close();
//! ```

mod directory;
mod memory;
mod session;
pub mod store;

#[cfg(test)]
mod tests;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;
pub use session::Session;
pub use store::{Cursor, EntityStore, Page};
