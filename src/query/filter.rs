use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Nullable};
use diesel::IntoSql;
use serde::{Deserialize, Serialize};

use crate::repository::error::StoreError;

/// A boxed boolean condition over a single table, ready to be passed to
/// `.filter()` on a boxed query.
pub type DynCond<QS> = Box<dyn BoxableExpression<QS, Pg, SqlType = Nullable<Bool>>>;

/// Recursive conjunction/disjunction tree over per-entity leaf predicates.
///
/// `Filter::all()` (an empty `And`) matches every row; an empty `Or` matches
/// none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Filter<P> {
    And(Vec<Filter<P>>),
    Or(Vec<Filter<P>>),
    Not(Box<Filter<P>>),
    Where(P),
}

impl<P> Filter<P> {
    pub fn all() -> Self {
        Filter::And(Vec::new())
    }

    pub fn none() -> Self {
        Filter::Or(Vec::new())
    }

    pub fn not(inner: Filter<P>) -> Self {
        Filter::Not(Box::new(inner))
    }
}

impl<P> From<P> for Filter<P> {
    fn from(p: P) -> Self {
        Filter::Where(p)
    }
}

impl<P> Default for Filter<P> {
    fn default() -> Self {
        Filter::all()
    }
}

/// Scalar comparison over a non-nullable column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cmp<T> {
    Eq(T),
    Ne(T),
    In(Vec<T>),
    Lt(T),
    Lte(T),
    Gt(T),
    Gte(T),
    Between(T, T),
}

/// Scalar comparison over a nullable column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptCmp<T> {
    IsNull,
    NotNull,
    Value(Cmp<T>),
}

/// String predicate over a nullable text column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptStr {
    IsNull,
    NotNull,
    Value(StrFilter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QueryMode {
    #[default]
    Default,
    Insensitive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StrCmp {
    Eq(String),
    Ne(String),
    In(Vec<String>),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
}

/// A string predicate plus its case-sensitivity mode. `In` ignores the mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrFilter {
    pub cmp: StrCmp,
    pub mode: QueryMode,
}

impl StrFilter {
    pub fn new(cmp: StrCmp) -> Self {
        StrFilter {
            cmp,
            mode: QueryMode::Default,
        }
    }

    pub fn insensitive(cmp: StrCmp) -> Self {
        StrFilter {
            cmp,
            mode: QueryMode::Insensitive,
        }
    }
}

impl From<StrCmp> for StrFilter {
    fn from(cmp: StrCmp) -> Self {
        StrFilter::new(cmp)
    }
}

/// Escapes `%`, `_` and `\` so user input can be embedded in a LIKE pattern.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn lit<QS: Table + 'static>(value: bool) -> DynCond<QS> {
    Box::new(value.into_sql::<Bool>().nullable())
}

/// Folds a filter tree into one boxed diesel expression. `leaf` translates a
/// single entity predicate; each repository supplies its own.
pub fn compile<QS, P, L>(filter: &Filter<P>, leaf: &L) -> Result<DynCond<QS>, StoreError>
where
    QS: Table + 'static,
    L: Fn(&P) -> Result<DynCond<QS>, StoreError>,
{
    Ok(match filter {
        Filter::And(children) => {
            let mut acc = lit(true);
            for child in children {
                let cond = compile(child, leaf)?;
                acc = Box::new(acc.and(cond));
            }
            acc
        }
        Filter::Or(children) => {
            let mut iter = children.iter();
            match iter.next() {
                None => lit(false),
                Some(first) => {
                    let mut acc = compile(first, leaf)?;
                    for child in iter {
                        let cond = compile(child, leaf)?;
                        acc = Box::new(acc.or(cond));
                    }
                    acc
                }
            }
        }
        Filter::Not(inner) => Box::new(diesel::dsl::not(compile(inner, leaf)?)),
        Filter::Where(p) => leaf(p)?,
    })
}

/// Translates a `Cmp<T>` against a concrete column into a boxed condition.
macro_rules! cmp_cond {
    ($col:expr, $cmp:expr) => {{
        match $cmp {
            $crate::query::Cmp::Eq(v) => Box::new($col.eq(v.clone()).nullable()) as _,
            $crate::query::Cmp::Ne(v) => Box::new($col.ne(v.clone()).nullable()) as _,
            $crate::query::Cmp::In(vs) => Box::new($col.eq_any(vs.clone()).nullable()) as _,
            $crate::query::Cmp::Lt(v) => Box::new($col.lt(v.clone()).nullable()) as _,
            $crate::query::Cmp::Lte(v) => Box::new($col.le(v.clone()).nullable()) as _,
            $crate::query::Cmp::Gt(v) => Box::new($col.gt(v.clone()).nullable()) as _,
            $crate::query::Cmp::Gte(v) => Box::new($col.ge(v.clone()).nullable()) as _,
            $crate::query::Cmp::Between(lo, hi) => {
                Box::new($col.between(lo.clone(), hi.clone()).nullable()) as _
            }
        }
    }};
}

/// Like `cmp_cond!` but for nullable columns, adding null tests.
macro_rules! opt_cmp_cond {
    ($col:expr, $cmp:expr) => {{
        match $cmp {
            $crate::query::OptCmp::IsNull => Box::new($col.is_null().nullable()) as _,
            $crate::query::OptCmp::NotNull => Box::new($col.is_not_null().nullable()) as _,
            $crate::query::OptCmp::Value(c) => $crate::query::filter::cmp_cond!($col, c),
        }
    }};
}

/// Translates a `StrFilter` against a text column, honoring the query mode.
macro_rules! str_cond {
    ($col:expr, $f:expr) => {{
        let f: &$crate::query::StrFilter = $f;
        let escape = $crate::query::escape_like;
        match (&f.cmp, f.mode) {
            ($crate::query::StrCmp::Eq(v), $crate::query::QueryMode::Default) => {
                Box::new($col.eq(v.clone()).nullable()) as _
            }
            ($crate::query::StrCmp::Eq(v), $crate::query::QueryMode::Insensitive) => {
                Box::new($col.ilike(escape(v)).nullable()) as _
            }
            ($crate::query::StrCmp::Ne(v), $crate::query::QueryMode::Default) => {
                Box::new($col.ne(v.clone()).nullable()) as _
            }
            ($crate::query::StrCmp::Ne(v), $crate::query::QueryMode::Insensitive) => {
                Box::new($col.not_ilike(escape(v)).nullable()) as _
            }
            ($crate::query::StrCmp::In(vs), _) => Box::new($col.eq_any(vs.clone()).nullable()) as _,
            ($crate::query::StrCmp::Contains(v), $crate::query::QueryMode::Default) => {
                Box::new($col.like(format!("%{}%", escape(v))).nullable()) as _
            }
            ($crate::query::StrCmp::Contains(v), $crate::query::QueryMode::Insensitive) => {
                Box::new($col.ilike(format!("%{}%", escape(v))).nullable()) as _
            }
            ($crate::query::StrCmp::StartsWith(v), $crate::query::QueryMode::Default) => {
                Box::new($col.like(format!("{}%", escape(v))).nullable()) as _
            }
            ($crate::query::StrCmp::StartsWith(v), $crate::query::QueryMode::Insensitive) => {
                Box::new($col.ilike(format!("{}%", escape(v))).nullable()) as _
            }
            ($crate::query::StrCmp::EndsWith(v), $crate::query::QueryMode::Default) => {
                Box::new($col.like(format!("%{}", escape(v))).nullable()) as _
            }
            ($crate::query::StrCmp::EndsWith(v), $crate::query::QueryMode::Insensitive) => {
                Box::new($col.ilike(format!("%{}", escape(v))).nullable()) as _
            }
        }
    }};
}

/// Like `str_cond!` but for nullable text columns, adding null tests.
macro_rules! opt_str_cond {
    ($col:expr, $f:expr) => {{
        match $f {
            $crate::query::OptStr::IsNull => Box::new($col.is_null().nullable()) as _,
            $crate::query::OptStr::NotNull => Box::new($col.is_not_null().nullable()) as _,
            $crate::query::OptStr::Value(f) => $crate::query::filter::str_cond!($col, f),
        }
    }};
}

pub(crate) use cmp_cond;
pub(crate) use opt_cmp_cond;
pub(crate) use opt_str_cond;
pub(crate) use str_cond;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_passes_plain_text_through() {
        assert_eq!(escape_like("chess"), "chess");
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("100%_done"), "100\\%\\_done");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn empty_and_is_the_default() {
        let f: Filter<()> = Filter::default();
        assert!(matches!(f, Filter::And(ref v) if v.is_empty()));
    }

    #[test]
    fn from_predicate_builds_a_leaf() {
        let f: Filter<i32> = 7.into();
        assert!(matches!(f, Filter::Where(7)));
    }
}
