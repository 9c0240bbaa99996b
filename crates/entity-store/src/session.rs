//! Scoped store session.

use anyhow::Result;
use std::ops::Deref;
use tracing::debug;

use crate::store::EntityStore;

/// Guard around an opened store.
///
/// [`Session::open`] calls [`EntityStore::open`]; the matching
/// [`EntityStore::release`] runs exactly once, either from
/// [`Session::close`] or when the session is dropped.
pub struct Session<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    released: bool,
}

impl<'a, S: EntityStore + ?Sized> Session<'a, S> {
    /// Open the store and start a session.
    pub async fn open(store: &'a S) -> Result<Self> {
        store.open().await?;
        debug!("Store session opened");
        Ok(Self {
            store,
            released: false,
        })
    }

    /// The underlying store.
    pub fn store(&self) -> &'a S {
        self.store
    }

    /// End the session and release the store.
    pub fn close(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.store.release();
            debug!("Store session released");
        }
    }
}

impl<S: EntityStore + ?Sized> Deref for Session<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.store
    }
}

impl<S: EntityStore + ?Sized> Drop for Session<'_, S> {
    fn drop(&mut self) {
        self.release_once();
    }
}
