use crate::collections::link_map::link_parts_map;
use crate::collections::prefix_map::prefix_map;
use crate::services::prefix_tree::PrefixTree;
use crate::utils::like::{escaped_prefix_pattern, LIKE_ESCAPE};
use linkstash_storage_core::{Extraction, LinkParts, Prefix};
use sql_collection_db::{Connection, KeyRange, Order, StoreError};
use std::collections::BTreeSet;
use tracing::{instrument, trace};

/// Prefix lifecycle: longest-prefix resolution, batch extraction and the
/// re-pointing removal of persisted prefixes.
pub struct PrefixService<'conn> {
    connection: &'conn Connection,
    threshold: usize,
    separators: Vec<char>,
}

impl<'conn> PrefixService<'conn> {
    pub fn new(
        connection: &'conn Connection,
        threshold: usize,
        separators: Vec<char>,
    ) -> eyre::Result<Self> {
        if threshold == 0 {
            return Err(StoreError::contract_violation("prefix threshold must be positive").into());
        }
        if separators.is_empty() {
            return Err(StoreError::contract_violation("separator set cannot be empty").into());
        }
        Ok(Self {
            connection,
            threshold,
            separators,
        })
    }

    /// The empty prefix is the universal fallback; callers may re-assert it
    /// after external tampering with the prefix table.
    pub fn ensure_empty_prefix(&self) -> eyre::Result<Prefix> {
        let id = prefix_map(self.connection).add_if_absent(&String::new())?;
        Ok(Prefix {
            id,
            text: String::new(),
        })
    }

    /// Longest persisted prefix of `url`. One LIKE scan ordered longest text
    /// first; SQLite's LIKE is case-insensitive for ASCII, so every candidate
    /// is re-verified with a case-sensitive match before it is accepted.
    #[instrument(skip(self))]
    pub fn resolve(&self, url: &str) -> eyre::Result<Prefix> {
        trace!("resolving longest prefix");
        let sql = format!(
            "SELECT id, text FROM prefix WHERE ? LIKE {} ESCAPE '{}' ORDER BY length(text) DESC",
            escaped_prefix_pattern("text"),
            LIKE_ESCAPE,
        );
        let mut statement = self
            .connection
            .raw()
            .prepare(&sql)
            .map_err(StoreError::from)?;
        let mut rows = statement.query([url]).map_err(StoreError::from)?;
        while let Some(row) = rows.next().map_err(StoreError::from)? {
            let prefix = Prefix {
                id: row.get(0).map_err(StoreError::from)?,
                text: row.get(1).map_err(StoreError::from)?,
            };
            if url.starts_with(&prefix.text) {
                return Ok(prefix);
            }
        }
        Err(StoreError::contract_violation(
            "the empty prefix is missing from the store",
        )
        .into())
    }

    /// Batch form of [`resolve`]: fetches the prefix set once and matches
    /// client-side instead of issuing one query per input.
    pub fn resolve_all(&self, urls: &[String]) -> eyre::Result<Vec<Prefix>> {
        let prefixes = self.all_prefixes_longest_first()?;
        urls.iter()
            .map(|url| Self::resolve_against(&prefixes, url))
            .collect()
    }

    pub(crate) fn all_prefixes_longest_first(&self) -> eyre::Result<Vec<Prefix>> {
        let map = prefix_map(self.connection);
        let snapshot = map.snapshot(&KeyRange::all(), Order::Ascending)?;
        let mut prefixes: Vec<Prefix> = snapshot
            .into_entries()
            .into_iter()
            .map(|(id, text)| Prefix { id, text })
            .collect();
        prefixes.sort_by(|a, b| b.text.len().cmp(&a.text.len()));
        Ok(prefixes)
    }

    pub(crate) fn resolve_against(prefixes: &[Prefix], url: &str) -> eyre::Result<Prefix> {
        prefixes
            .iter()
            .find(|prefix| url.starts_with(&prefix.text))
            .cloned()
            .ok_or_else(|| {
                StoreError::contract_violation("the empty prefix is missing from the store").into()
            })
    }

    /// Runs the extraction engine over a batch of full strings. Members
    /// already covered by a persisted non-empty prefix are held out; the rest
    /// are partitioned, qualifying labels are persisted, and existing links
    /// are re-pointed when a new longer prefix now covers them.
    #[instrument(skip(self, batch))]
    pub fn extract(&self, batch: &[String]) -> eyre::Result<Extraction> {
        trace!(batch_size = batch.len(), "extracting prefixes");
        let persisted = self.all_prefixes_longest_first()?;
        let existing: BTreeSet<String> =
            persisted.iter().map(|prefix| prefix.text.clone()).collect();

        let mut members = Vec::new();
        let mut already_covered = Vec::new();
        for url in batch {
            let resolved = Self::resolve_against(&persisted, url)?;
            if resolved.text.is_empty() {
                members.push(url.clone());
            } else {
                already_covered.push(url.clone());
            }
        }

        let tree = PrefixTree::build(&members, self.threshold, &self.separators);
        let labels = tree.promotions(&existing);

        let map = prefix_map(self.connection);
        let promoted = self.connection.run_batch(|| {
            labels
                .iter()
                .map(|label| {
                    let id = map.add_if_absent(label)?;
                    Ok(Prefix {
                        id,
                        text: label.clone(),
                    })
                })
                .collect::<Result<Vec<_>, StoreError>>()
        })?;

        if !promoted.is_empty() {
            self.repoint_links()?;
        }

        Ok(Extraction {
            promoted,
            already_covered,
        })
    }

    /// Moves every link whose full string now resolves to a different prefix.
    /// Full strings are invariant under re-pointing.
    pub(crate) fn repoint_links(&self) -> eyre::Result<()> {
        let prefixes = self.all_prefixes_longest_first()?;
        let links = link_parts_map(self.connection);

        let text_by_id: std::collections::BTreeMap<_, _> = prefixes
            .iter()
            .map(|prefix| (prefix.id, prefix.text.as_str()))
            .collect();

        let snapshot = links.snapshot(&KeyRange::all(), Order::Ascending)?;
        let mut moves = Vec::new();
        for (id, parts) in snapshot.into_entries() {
            let current = text_by_id.get(&parts.prefix_id).copied().ok_or_else(|| {
                StoreError::contract_violation("link references a missing prefix")
            })?;
            let url = format!("{current}{}", parts.suffix);
            let resolved = Self::resolve_against(&prefixes, &url)?;
            if resolved.id != parts.prefix_id {
                moves.push((
                    id,
                    LinkParts {
                        prefix_id: resolved.id,
                        suffix: url[resolved.text.len()..].to_owned(),
                    },
                ));
            }
        }

        self.connection.run_batch(|| {
            for (id, parts) in &moves {
                links.put(id, parts)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Deletes a persisted prefix after moving every dependent link to the
    /// longest surviving prefix, preserving each link's full string. Returns
    /// false when no such prefix is stored. The empty prefix is not removable.
    #[instrument(skip(self))]
    pub fn remove_prefix(&self, text: &str) -> eyre::Result<bool> {
        if text.is_empty() {
            return Err(
                StoreError::contract_violation("the empty prefix cannot be removed").into(),
            );
        }

        let map = prefix_map(self.connection);
        let Some(id) = map.key_for_value(&text.to_string())? else {
            return Ok(false);
        };

        let survivors: Vec<Prefix> = self
            .all_prefixes_longest_first()?
            .into_iter()
            .filter(|prefix| prefix.id != id)
            .collect();

        let links = link_parts_map(self.connection);
        let snapshot = links.snapshot(&KeyRange::all(), Order::Ascending)?;
        let dependents: Vec<_> = snapshot
            .into_entries()
            .into_iter()
            .filter(|(_, parts)| parts.prefix_id == id)
            .collect();

        self.connection.run_batch(|| {
            for (link_id, parts) in &dependents {
                let url = format!("{text}{}", parts.suffix);
                let resolved = Self::resolve_against(&survivors, &url)
                    .map_err(|_| StoreError::contract_violation(
                        "the empty prefix is missing from the store",
                    ))?;
                links.put(
                    link_id,
                    &LinkParts {
                        prefix_id: resolved.id,
                        suffix: url[resolved.text.len()..].to_owned(),
                    },
                )?;
            }
            map.remove(&id)?;
            Ok(())
        })?;
        Ok(true)
    }
}
