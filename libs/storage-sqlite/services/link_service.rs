use crate::collections::link_map::{full_link_map, link_parts_map};
use crate::services::prefix_service::PrefixService;
use linkstash_storage_core::{Link, LinkId, LinkParts, Prefix};
use sql_collection_db::{Connection, KeyRange, Order, StoreError};
use tracing::{instrument, trace};

/// Link persistence: decomposition against the prefix set on the way in,
/// view-backed reconstruction on the way out.
pub struct LinkService<'conn> {
    connection: &'conn Connection,
    prefixes: PrefixService<'conn>,
    chunk_size: usize,
}

impl<'conn> LinkService<'conn> {
    pub fn new(
        connection: &'conn Connection,
        prefixes: PrefixService<'conn>,
        chunk_size: usize,
    ) -> eyre::Result<Self> {
        if chunk_size == 0 {
            return Err(StoreError::contract_violation("chunk size must be positive").into());
        }
        Ok(Self {
            connection,
            prefixes,
            chunk_size,
        })
    }

    pub fn prefixes(&self) -> &PrefixService<'conn> {
        &self.prefixes
    }

    #[instrument(skip(self))]
    pub fn insert(&self, url: &str) -> eyre::Result<LinkId> {
        trace!("inserting link");
        let prefix = self.prefixes.resolve(url)?;
        let id = link_parts_map(self.connection).add(&decompose(&prefix, url))?;
        Ok(id)
    }

    /// Bulk insert committing every `chunk_size` rows, so a failure late in a
    /// large import keeps the completed chunks. The prefix set is fetched once
    /// and matched client-side.
    #[instrument(skip(self, urls))]
    pub fn insert_all(&self, urls: &[String]) -> eyre::Result<Vec<LinkId>> {
        trace!(total = urls.len(), "bulk inserting links");
        let prefixes = self.prefixes.all_prefixes_longest_first()?;
        let map = link_parts_map(self.connection);

        let mut ids = Vec::with_capacity(urls.len());
        for chunk in urls.chunks(self.chunk_size) {
            let mut parts = Vec::with_capacity(chunk.len());
            for url in chunk {
                let prefix = PrefixService::resolve_against(&prefixes, url)?;
                parts.push(decompose(&prefix, url));
            }
            ids.extend(map.add_all(&parts)?);
        }
        Ok(ids)
    }

    pub fn link(&self, id: LinkId) -> eyre::Result<Option<Link>> {
        let parts = link_parts_map(self.connection).get(&id)?;
        Ok(parts.map(|parts| Link {
            id,
            prefix_id: parts.prefix_id,
            suffix: parts.suffix,
        }))
    }

    /// The reconstructed full string, straight from the view.
    pub fn full_link(&self, id: LinkId) -> eyre::Result<Option<String>> {
        Ok(full_link_map(self.connection).get(&id)?)
    }

    pub fn all_links(&self) -> eyre::Result<Vec<(LinkId, String)>> {
        let map = full_link_map(self.connection);
        let snapshot = map.snapshot(&KeyRange::all(), Order::Ascending)?;
        Ok(snapshot.into_entries())
    }

    #[instrument(skip(self))]
    pub fn remove(&self, id: LinkId) -> eyre::Result<bool> {
        Ok(link_parts_map(self.connection).remove(&id)?.is_some())
    }

    /// Re-resolves one link against the current prefix set. Returns true when
    /// the link moved to a different prefix; the full string never changes.
    #[instrument(skip(self))]
    pub fn recompute_prefix(&self, id: LinkId) -> eyre::Result<bool> {
        let map = link_parts_map(self.connection);
        let Some(parts) = map.get(&id)? else {
            return Ok(false);
        };
        let Some(url) = self.full_link(id)? else {
            return Ok(false);
        };

        let prefix = self.prefixes.resolve(&url)?;
        if prefix.id == parts.prefix_id {
            return Ok(false);
        }
        map.put(&id, &decompose(&prefix, &url))?;
        Ok(true)
    }
}

fn decompose(prefix: &Prefix, url: &str) -> LinkParts {
    LinkParts {
        prefix_id: prefix.id,
        suffix: url[prefix.text.len()..].to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::prefix_map::prefix_map;
    use crate::schema;

    fn build_service(connection: &Connection, chunk_size: usize) -> LinkService<'_> {
        let prefixes = PrefixService::new(connection, 3, vec!['/']).unwrap();
        LinkService::new(connection, prefixes, chunk_size).unwrap()
    }

    fn build_connection() -> Connection {
        let connection = Connection::in_memory().unwrap();
        schema::bootstrap(&connection).unwrap();
        connection
    }

    #[test]
    pub fn test_insert_decomposes_against_longest_prefix() {
        let connection = build_connection();
        prefix_map(&connection).add(&"http://".to_string()).unwrap();
        let service = build_service(&connection, 500);

        let id = service.insert("http://a.com/page").unwrap();
        let link = service.link(id).unwrap().unwrap();
        assert_eq!(link.suffix, "a.com/page");
        assert_eq!(
            service.full_link(id).unwrap(),
            Some("http://a.com/page".to_string())
        );
    }

    #[test]
    pub fn test_insert_without_matching_prefix_uses_empty_fallback() {
        let connection = build_connection();
        let service = build_service(&connection, 500);

        let id = service.insert("mailto:someone").unwrap();
        let link = service.link(id).unwrap().unwrap();
        assert_eq!(link.suffix, "mailto:someone");
        assert_eq!(
            service.full_link(id).unwrap(),
            Some("mailto:someone".to_string())
        );
    }

    #[test]
    pub fn test_insert_all_chunks_and_preserves_order() {
        let connection = build_connection();
        let service = build_service(&connection, 2);

        let urls: Vec<String> = (0..5).map(|n| format!("http://{n}.com")).collect();
        let ids = service.insert_all(&urls).unwrap();

        assert_eq!(ids.len(), 5);
        assert!(connection.is_autocommit());
        for (url, id) in urls.iter().zip(&ids) {
            assert_eq!(service.full_link(*id).unwrap(), Some(url.clone()));
        }
        assert_eq!(service.all_links().unwrap().len(), 5);
    }

    #[test]
    pub fn test_remove() {
        let connection = build_connection();
        let service = build_service(&connection, 500);

        let id = service.insert("http://gone.com").unwrap();
        assert!(service.remove(id).unwrap());
        assert!(!service.remove(id).unwrap());
        assert_eq!(service.full_link(id).unwrap(), None);
    }

    #[test]
    pub fn test_recompute_prefix_moves_link_to_new_longer_prefix() {
        let connection = build_connection();
        let service = build_service(&connection, 500);

        let id = service.insert("http://a.com/x").unwrap();
        let before = service.link(id).unwrap().unwrap();

        prefix_map(&connection)
            .add(&"http://a.com/".to_string())
            .unwrap();

        assert!(service.recompute_prefix(id).unwrap());
        let after = service.link(id).unwrap().unwrap();
        assert_ne!(before.prefix_id, after.prefix_id);
        assert_eq!(after.suffix, "x");
        assert_eq!(
            service.full_link(id).unwrap(),
            Some("http://a.com/x".to_string())
        );

        // A second pass finds nothing to move.
        assert!(!service.recompute_prefix(id).unwrap());
    }

    #[test]
    pub fn test_zero_chunk_size_is_rejected() {
        let connection = build_connection();
        let prefixes = PrefixService::new(&connection, 3, vec!['/']).unwrap();
        assert!(LinkService::new(&connection, prefixes, 0).is_err());
    }
}
