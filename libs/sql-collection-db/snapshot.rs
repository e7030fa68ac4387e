use crate::query_map::QueryMap;
use crate::table_schema::TableSchema;
use crate::StoreResult;
use std::collections::VecDeque;

/// A fully materialized, ordered result of one range query.
///
/// Every matching row is fetched before the first element is handed out, so
/// consumption never observes concurrent mutation of the underlying store.
/// [`Snapshot::remove`] deletes in the store immediately and drops the entry
/// from the remaining snapshot without re-querying; removing while consuming
/// is therefore equivalent to calling the collection's single-key remove for
/// each element.
pub struct Snapshot<'m, 'conn, S: TableSchema> {
    map: &'m QueryMap<'conn, S>,
    entries: VecDeque<(S::Key, S::Value)>,
}

impl<'m, 'conn, S: TableSchema> Snapshot<'m, 'conn, S> {
    pub(crate) fn new(map: &'m QueryMap<'conn, S>, entries: Vec<(S::Key, S::Value)>) -> Self {
        Self {
            map,
            entries: entries.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the next entry in the snapshot's query order.
    pub fn next(&mut self) -> Option<(S::Key, S::Value)> {
        self.entries.pop_front()
    }

    /// Consumes the last remaining entry; together with [`Snapshot::next`]
    /// this gives bidirectional iteration over the bound range.
    pub fn next_back(&mut self) -> Option<(S::Key, S::Value)> {
        self.entries.pop_back()
    }

    pub fn peek(&self) -> Option<&(S::Key, S::Value)> {
        self.entries.front()
    }

    /// Deletes the key in the store and discards any matching entry still
    /// held by the snapshot. Returns whether the store had the key.
    pub fn remove(&mut self, key: &S::Key) -> StoreResult<bool> {
        let removed = self.map.remove(key)?.is_some();
        self.entries.retain(|(k, _)| k != key);
        Ok(removed)
    }

    pub fn keys(&self) -> Vec<S::Key> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn into_entries(self) -> Vec<(S::Key, S::Value)> {
        self.entries.into()
    }
}
