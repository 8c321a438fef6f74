use diesel::expression::expression_types::NotSelectable;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// A boxed ORDER BY term for a single table.
pub type DynOrder<QS> = Box<dyn BoxableExpression<QS, Pg, SqlType = NotSelectable> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullsPosition {
    First,
    Last,
}

/// One ordering key; `find_many` applies a list of these in order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBy<F> {
    pub field: F,
    pub direction: SortOrder,
    pub nulls: Option<NullsPosition>,
}

impl<F> OrderBy<F> {
    pub fn asc(field: F) -> Self {
        OrderBy {
            field,
            direction: SortOrder::Asc,
            nulls: None,
        }
    }

    pub fn desc(field: F) -> Self {
        OrderBy {
            field,
            direction: SortOrder::Desc,
            nulls: None,
        }
    }

    pub fn nulls(mut self, position: NullsPosition) -> Self {
        self.nulls = Some(position);
        self
    }
}

/// Turns an `OrderBy` into a boxed ORDER BY term for a concrete column.
macro_rules! order_cond {
    ($col:expr, $o:expr) => {{
        match ($o.direction, $o.nulls) {
            ($crate::query::SortOrder::Asc, None) => Box::new($col.asc()) as _,
            ($crate::query::SortOrder::Asc, Some($crate::query::NullsPosition::First)) => {
                Box::new($col.asc().nulls_first()) as _
            }
            ($crate::query::SortOrder::Asc, Some($crate::query::NullsPosition::Last)) => {
                Box::new($col.asc().nulls_last()) as _
            }
            ($crate::query::SortOrder::Desc, None) => Box::new($col.desc()) as _,
            ($crate::query::SortOrder::Desc, Some($crate::query::NullsPosition::First)) => {
                Box::new($col.desc().nulls_first()) as _
            }
            ($crate::query::SortOrder::Desc, Some($crate::query::NullsPosition::Last)) => {
                Box::new($col.desc().nulls_last()) as _
            }
        }
    }};
}

pub(crate) use order_cond;
