pub mod database;
pub mod error;
pub mod games;
pub mod matches;
pub mod team_members;
pub mod teams;
pub mod tournament_statuses;
pub mod tournament_types;
pub mod tournaments;
pub mod users;

/// Generates the per-entity `avg_field`/`sum_field`/`min_field`/`max_field`
/// helpers over the entity's numeric columns. Non-numeric fields are already
/// rejected by `AggregateSelection::validate`, so the fallback arm is only a
/// safety net.
macro_rules! numeric_aggregates {
    ($table:ident, $field_ty:ty, { $($variant:path => $col:expr),+ $(,)? }) => {
        async fn avg_field(
            conn: &mut diesel_async::AsyncPgConnection,
            cond: $crate::query::DynCond<$table::table>,
            field: &$field_ty,
        ) -> Result<Option<bigdecimal::BigDecimal>, $crate::repository::error::StoreError> {
            match field {
                $($variant => $table::table
                    .filter(cond)
                    .select(diesel::dsl::avg($col))
                    .get_result(conn)
                    .await
                    .map_err($crate::repository::error::StoreError::from),)+
                #[allow(unreachable_patterns)]
                other => Err($crate::repository::error::StoreError::Validation(format!(
                    "aggregates require a numeric field, got {}.{}",
                    <$field_ty as $crate::query::FieldMeta>::TABLE,
                    $crate::query::FieldMeta::column(other),
                ))),
            }
        }

        async fn sum_field(
            conn: &mut diesel_async::AsyncPgConnection,
            cond: $crate::query::DynCond<$table::table>,
            field: &$field_ty,
        ) -> Result<Option<i64>, $crate::repository::error::StoreError> {
            match field {
                $($variant => $table::table
                    .filter(cond)
                    .select(diesel::dsl::sum($col))
                    .get_result(conn)
                    .await
                    .map_err($crate::repository::error::StoreError::from),)+
                #[allow(unreachable_patterns)]
                other => Err($crate::repository::error::StoreError::Validation(format!(
                    "aggregates require a numeric field, got {}.{}",
                    <$field_ty as $crate::query::FieldMeta>::TABLE,
                    $crate::query::FieldMeta::column(other),
                ))),
            }
        }

        async fn min_field(
            conn: &mut diesel_async::AsyncPgConnection,
            cond: $crate::query::DynCond<$table::table>,
            field: &$field_ty,
        ) -> Result<Option<i32>, $crate::repository::error::StoreError> {
            match field {
                $($variant => $table::table
                    .filter(cond)
                    .select(diesel::dsl::min($col))
                    .get_result(conn)
                    .await
                    .map_err($crate::repository::error::StoreError::from),)+
                #[allow(unreachable_patterns)]
                other => Err($crate::repository::error::StoreError::Validation(format!(
                    "aggregates require a numeric field, got {}.{}",
                    <$field_ty as $crate::query::FieldMeta>::TABLE,
                    $crate::query::FieldMeta::column(other),
                ))),
            }
        }

        async fn max_field(
            conn: &mut diesel_async::AsyncPgConnection,
            cond: $crate::query::DynCond<$table::table>,
            field: &$field_ty,
        ) -> Result<Option<i32>, $crate::repository::error::StoreError> {
            match field {
                $($variant => $table::table
                    .filter(cond)
                    .select(diesel::dsl::max($col))
                    .get_result(conn)
                    .await
                    .map_err($crate::repository::error::StoreError::from),)+
                #[allow(unreachable_patterns)]
                other => Err($crate::repository::error::StoreError::Validation(format!(
                    "aggregates require a numeric field, got {}.{}",
                    <$field_ty as $crate::query::FieldMeta>::TABLE,
                    $crate::query::FieldMeta::column(other),
                ))),
            }
        }
    };
}

pub(crate) use numeric_aggregates;
