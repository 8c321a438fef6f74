use serde::{Deserialize, Serialize};

use crate::repository::error::StoreError;

/// Pagination mode for `find_many`.
///
/// Cursor mode resumes after a surrogate id and is always ordered by
/// `id ASC`; combining it with a caller-supplied ordering is rejected so
/// repeated reads from the same cursor stay idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Page {
    Offset { skip: i64, take: i64 },
    Cursor { after: i32, take: i64 },
}

impl Page {
    pub(crate) fn check(&self, order_len: usize) -> Result<(), StoreError> {
        match self {
            Page::Offset { skip, take } if *skip < 0 || *take < 0 => Err(StoreError::Validation(
                "offset pagination requires non-negative skip and take".into(),
            )),
            Page::Cursor { take, .. } if *take < 0 => Err(StoreError::Validation(
                "cursor pagination requires a non-negative take".into(),
            )),
            Page::Cursor { .. } if order_len > 0 => Err(StoreError::Validation(
                "cursor pagination is keyed on id and cannot be combined with orderBy".into(),
            )),
            _ => Ok(()),
        }
    }

    /// In-memory pagination for eager-loaded child collections, where the
    /// rows of several parents come back from one query. Cursor mode carries
    /// no caller ordering, so the slice sorts by id itself; repeated reads
    /// from the same cursor stay idempotent regardless of SQL row order.
    pub(crate) fn slice<T>(&self, items: Vec<T>, id_of: impl Fn(&T) -> i32) -> Vec<T> {
        match *self {
            Page::Offset { skip, take } => items
                .into_iter()
                .skip(skip.max(0) as usize)
                .take(take.max(0) as usize)
                .collect(),
            Page::Cursor { after, take } => {
                let mut items = items;
                items.sort_by_key(|item| id_of(item));
                items
                    .into_iter()
                    .filter(|item| id_of(item) > after)
                    .take(take.max(0) as usize)
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_rejects_negative_skip() {
        let err = Page::Offset { skip: -1, take: 10 }.check(0).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn cursor_rejects_caller_ordering() {
        let err = Page::Cursor { after: 5, take: 10 }.check(2).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn cursor_without_ordering_is_fine() {
        assert!(Page::Cursor { after: 5, take: 10 }.check(0).is_ok());
    }

    #[test]
    fn cursor_slice_orders_by_id_before_slicing() {
        let page = Page::Cursor { after: 2, take: 2 };
        // Rows arrive in whatever order the database produced them.
        let sliced = page.slice(vec![5, 1, 4, 3, 2], |n| *n);
        assert_eq!(sliced, vec![3, 4]);

        let resumed = Page::Cursor { after: 4, take: 2 }.slice(vec![5, 1, 4, 3, 2], |n| *n);
        assert_eq!(resumed, vec![5]);
    }

    #[test]
    fn offset_slice_preserves_input_order() {
        let page = Page::Offset { skip: 1, take: 2 };
        assert_eq!(page.slice(vec![30, 10, 20], |n| *n), vec![10, 20]);
    }
}
