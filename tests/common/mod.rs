#![allow(dead_code)]

use std::cell::Cell;

use moodtrack::store::{Collection, OrderBy, Provision, Record, SqliteStore, Store, StoreError};

pub fn store(provision: Provision) -> SqliteStore {
    SqliteStore::open_in_memory("tester", &provision).expect("in-memory store")
}

/// SQLite store whose writes can be switched to fail
pub struct FlakyStore {
    pub inner: SqliteStore,
    pub fail_inserts: Cell<bool>,
    pub fail_updates: Cell<bool>,
    pub inserts: Cell<usize>,
}

impl FlakyStore {
    pub fn new(provision: Provision) -> Self {
        Self {
            inner: store(provision),
            fail_inserts: Cell::new(false),
            fail_updates: Cell::new(false),
            inserts: Cell::new(0),
        }
    }
}

impl Store for FlakyStore {
    fn select(&self, collection: Collection, order: Option<OrderBy>) -> Result<Vec<Record>, StoreError> {
        self.inner.select(collection, order)
    }

    fn select_by_id(&self, collection: Collection, id: &str) -> Result<Record, StoreError> {
        self.inner.select_by_id(collection, id)
    }

    fn insert(&self, collection: Collection, record: Record) -> Result<Record, StoreError> {
        self.inserts.set(self.inserts.get() + 1);
        if self.fail_inserts.get() {
            return Err(StoreError::Backend("connection reset".to_string()));
        }
        self.inner.insert(collection, record)
    }

    fn update(&self, collection: Collection, id: &str, changes: Record) -> Result<(), StoreError> {
        if self.fail_updates.get() {
            return Err(StoreError::Backend("connection reset".to_string()));
        }
        self.inner.update(collection, id, changes)
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id)
    }
}
