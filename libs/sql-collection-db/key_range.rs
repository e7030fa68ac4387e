use crate::{StoreError, StoreResult};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Order {
    Ascending,
    Descending,
}

impl Order {
    pub fn reverse(self) -> Order {
        match self {
            Order::Ascending => Order::Descending,
            Order::Descending => Order::Ascending,
        }
    }

    pub(crate) fn sql(self) -> &'static str {
        match self {
            Order::Ascending => "ASC",
            Order::Descending => "DESC",
        }
    }
}

/// Optional value-equality filter applied on top of a key range.
#[derive(Debug)]
pub enum ValueFilter<'a, V> {
    Any,
    /// Matches rows whose value columns are SQL NULL.
    Null,
    Eq(&'a V),
}

/// Key bounds of a range view: each side is either open or a `(key,
/// inclusive)` pair, mirroring `fromStart/fromKey/fromInclusive` and
/// `toEnd/toKey/toInclusive`.
#[derive(Clone, Debug)]
pub struct KeyRange<K> {
    pub(crate) from: Option<(K, bool)>,
    pub(crate) to: Option<(K, bool)>,
}

impl<K: Clone + PartialOrd> KeyRange<K> {
    pub fn all() -> Self {
        KeyRange { from: None, to: None }
    }

    pub fn starting_at(key: K, inclusive: bool) -> Self {
        KeyRange {
            from: Some((key, inclusive)),
            to: None,
        }
    }

    pub fn ending_at(key: K, inclusive: bool) -> Self {
        KeyRange {
            from: None,
            to: Some((key, inclusive)),
        }
    }

    pub fn bounded(from: K, from_inclusive: bool, to: K, to_inclusive: bool) -> StoreResult<Self> {
        if from > to {
            return Err(StoreError::contract_violation(
                "range bounds are inverted: from-key is greater than to-key",
            ));
        }
        Ok(KeyRange {
            from: Some((from, from_inclusive)),
            to: Some((to, to_inclusive)),
        })
    }

    /// Both-open ranges produce no predicate at all, which is the fast path
    /// used for bulk clear and whole-table size.
    pub(crate) fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    #[test]
    pub fn test_inverted_bounds_are_a_contract_violation() {
        let err = KeyRange::bounded(7, true, 3, true).unwrap_err();
        assert!(matches!(err, StoreError::ContractViolation(_)));
    }

    #[test]
    pub fn test_equal_bounds_are_accepted() {
        let range = KeyRange::bounded(3, true, 3, true).unwrap();
        assert!(!range.is_open());
    }

    #[test]
    pub fn test_open_range_has_no_bounds() {
        assert!(KeyRange::<i64>::all().is_open());
        assert!(!KeyRange::starting_at(1, false).is_open());
        assert!(!KeyRange::ending_at(1, true).is_open());
    }
}
