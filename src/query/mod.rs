pub mod aggregate;
pub mod filter;
pub mod group;
pub mod page;
pub mod sort;

pub use aggregate::{AggregateRow, AggregateSelection};
pub use filter::{
    compile, escape_like, Cmp, DynCond, Filter, OptCmp, OptStr, QueryMode, StrCmp, StrFilter,
};
pub use group::{Aggregate, CmpOp, GroupQuery, Having, HavingTarget, HavingValue};
pub use page::Page;
pub use sort::{DynOrder, NullsPosition, OrderBy, SortOrder};

/// Filter/order/pagination controls for one eager-loaded relation,
/// independent of the parent query.
#[derive(Debug, Clone)]
pub struct RelationParams<P, F> {
    pub filter: Filter<P>,
    pub order: Vec<OrderBy<F>>,
    pub page: Option<Page>,
}

impl<P, F> Default for RelationParams<P, F> {
    fn default() -> Self {
        RelationParams {
            filter: Filter::all(),
            order: Vec::new(),
            page: None,
        }
    }
}

/// Static metadata about an entity's scalar fields. Drives the dynamic
/// group-by builder and aggregate validation.
pub trait FieldMeta: Copy + PartialEq {
    const TABLE: &'static str;

    fn column(&self) -> &'static str;

    /// Whether the column is an integer column (ids, foreign keys, scores,
    /// participant counts). Only numeric fields may be aggregated.
    fn numeric(&self) -> bool;
}
