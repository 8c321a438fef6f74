use diesel::pg::Pg;
use diesel::sql_types::{BigInt, Double, Json, Text};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::query::FieldMeta;
use crate::repository::error::StoreError;

/// One aggregate projection of a group-by call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Aggregate<F> {
    Count,
    Avg(F),
    Sum(F),
    Min(F),
    Max(F),
}

impl<F: FieldMeta> Aggregate<F> {
    fn expr(&self) -> String {
        match self {
            Aggregate::Count => "COUNT(*)".to_string(),
            Aggregate::Avg(f) => format!("AVG(\"{}\")", f.column()),
            Aggregate::Sum(f) => format!("SUM(\"{}\")", f.column()),
            Aggregate::Min(f) => format!("MIN(\"{}\")", f.column()),
            Aggregate::Max(f) => format!("MAX(\"{}\")", f.column()),
        }
    }

    /// Key under which the aggregate appears in the result objects.
    pub fn alias(&self) -> String {
        match self {
            Aggregate::Count => "count".to_string(),
            Aggregate::Avg(f) => format!("avg_{}", f.column()),
            Aggregate::Sum(f) => format!("sum_{}", f.column()),
            Aggregate::Min(f) => format!("min_{}", f.column()),
            Aggregate::Max(f) => format!("max_{}", f.column()),
        }
    }

    fn field(&self) -> Option<F> {
        match self {
            Aggregate::Count => None,
            Aggregate::Avg(f) | Aggregate::Sum(f) | Aggregate::Min(f) | Aggregate::Max(f) => {
                Some(*f)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CmpOp {
    fn sql(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HavingTarget<F> {
    /// A grouped scalar field; must be listed in `by`.
    Field(F),
    /// An aggregate output; must be listed in `aggregates`.
    Aggregate(Aggregate<F>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HavingValue {
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Having<F> {
    pub target: HavingTarget<F>,
    pub op: CmpOp,
    pub value: HavingValue,
}

/// A dynamic GROUP BY over one entity's scalar fields.
///
/// The shape is validated before any I/O: a `having` clause that references a
/// field outside `by`, or an aggregate that was not selected, is a contract
/// error (`Validation`), not a database error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupQuery<F> {
    pub by: Vec<F>,
    pub aggregates: Vec<Aggregate<F>>,
    pub having: Vec<Having<F>>,
}

impl<F: FieldMeta> GroupQuery<F> {
    pub fn new(by: Vec<F>) -> Self {
        GroupQuery {
            by,
            aggregates: vec![Aggregate::Count],
            having: Vec::new(),
        }
    }

    pub fn aggregate(mut self, agg: Aggregate<F>) -> Self {
        self.aggregates.push(agg);
        self
    }

    pub fn having(mut self, clause: Having<F>) -> Self {
        self.having.push(clause);
        self
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.by.is_empty() {
            return Err(StoreError::Validation(
                "groupBy.by must name at least one field".into(),
            ));
        }
        for agg in &self.aggregates {
            if let Some(field) = agg.field() {
                if !field.numeric() {
                    return Err(StoreError::Validation(format!(
                        "aggregates require a numeric field, got {}.{}",
                        F::TABLE,
                        field.column()
                    )));
                }
            }
        }
        for clause in &self.having {
            match &clause.target {
                HavingTarget::Field(f) => {
                    if !self.by.contains(f) {
                        return Err(StoreError::Validation(format!(
                            "having references un-grouped field {}.{}",
                            F::TABLE,
                            f.column()
                        )));
                    }
                }
                HavingTarget::Aggregate(a) => {
                    if !self.aggregates.contains(a) {
                        return Err(StoreError::Validation(format!(
                            "having references aggregate {} which is not selected",
                            a.alias()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn to_sql(&self) -> String {
        let cols: Vec<String> = self
            .by
            .iter()
            .map(|f| format!("\"{}\"", f.column()))
            .collect();
        let mut projection = cols.clone();
        for agg in &self.aggregates {
            projection.push(format!("{} AS \"{}\"", agg.expr(), agg.alias()));
        }

        let mut sql = format!(
            "SELECT row_to_json(g) AS data FROM (SELECT {} FROM \"{}\" GROUP BY {}",
            projection.join(", "),
            F::TABLE,
            cols.join(", "),
        );

        if !self.having.is_empty() {
            let conds: Vec<String> = self
                .having
                .iter()
                .enumerate()
                .map(|(i, clause)| {
                    let lhs = match &clause.target {
                        HavingTarget::Field(f) => format!("\"{}\"", f.column()),
                        HavingTarget::Aggregate(a) => a.expr(),
                    };
                    format!("{} {} ${}", lhs, clause.op.sql(), i + 1)
                })
                .collect();
            sql.push_str(" HAVING ");
            sql.push_str(&conds.join(" AND "));
        }

        let ordinals: Vec<String> = (1..=self.by.len()).map(|i| i.to_string()).collect();
        sql.push_str(&format!(" ORDER BY {}) g", ordinals.join(", ")));
        sql
    }
}

#[derive(diesel::QueryableByName)]
struct JsonRow {
    #[diesel(sql_type = Json)]
    data: serde_json::Value,
}

/// Executes a validated group-by. Rows come back as JSON objects keyed by
/// column name and aggregate alias, since the projection is dynamic.
pub async fn run<F: FieldMeta>(
    conn: &mut AsyncPgConnection,
    query: &GroupQuery<F>,
) -> Result<Vec<serde_json::Value>, StoreError> {
    query.validate()?;

    let mut sql = diesel::sql_query(query.to_sql()).into_boxed::<Pg>();
    for clause in &query.having {
        sql = match &clause.value {
            HavingValue::Int(v) => sql.bind::<BigInt, _>(*v),
            HavingValue::Float(v) => sql.bind::<Double, _>(*v),
            HavingValue::Text(v) => sql.bind::<Text, _>(v.clone()),
        };
    }

    let rows: Vec<JsonRow> = sql.load(conn).await.map_err(StoreError::from)?;
    Ok(rows.into_iter().map(|row| row.data).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum DemoField {
        GameId,
        Format,
    }

    impl FieldMeta for DemoField {
        const TABLE: &'static str = "tournaments";

        fn column(&self) -> &'static str {
            match self {
                DemoField::GameId => "game_id",
                DemoField::Format => "format",
            }
        }

        fn numeric(&self) -> bool {
            matches!(self, DemoField::GameId)
        }
    }

    #[test]
    fn rejects_empty_by() {
        let q: GroupQuery<DemoField> = GroupQuery::new(vec![]);
        assert!(matches!(
            q.validate(),
            Err(StoreError::Validation(ref m)) if m.contains("at least one field")
        ));
    }

    #[test]
    fn rejects_having_on_ungrouped_field() {
        let q = GroupQuery::new(vec![DemoField::GameId]).having(Having {
            target: HavingTarget::Field(DemoField::Format),
            op: CmpOp::Eq,
            value: HavingValue::Text("swiss".into()),
        });
        assert!(matches!(
            q.validate(),
            Err(StoreError::Validation(ref m)) if m.contains("un-grouped")
        ));
    }

    #[test]
    fn rejects_having_on_unselected_aggregate() {
        let q = GroupQuery::new(vec![DemoField::GameId]).having(Having {
            target: HavingTarget::Aggregate(Aggregate::Sum(DemoField::GameId)),
            op: CmpOp::Gt,
            value: HavingValue::Int(10),
        });
        assert!(matches!(q.validate(), Err(StoreError::Validation(_))));
    }

    #[test]
    fn rejects_avg_on_text_field() {
        let q = GroupQuery::new(vec![DemoField::Format]).aggregate(Aggregate::Avg(DemoField::Format));
        assert!(matches!(
            q.validate(),
            Err(StoreError::Validation(ref m)) if m.contains("numeric")
        ));
    }

    #[test]
    fn renders_group_by_sql() {
        let q = GroupQuery::new(vec![DemoField::GameId]);
        assert_eq!(
            q.to_sql(),
            "SELECT row_to_json(g) AS data FROM (SELECT \"game_id\", COUNT(*) AS \"count\" \
             FROM \"tournaments\" GROUP BY \"game_id\" ORDER BY 1) g"
        );
    }

    #[test]
    fn renders_having_with_placeholders() {
        let q = GroupQuery::new(vec![DemoField::GameId])
            .having(Having {
                target: HavingTarget::Aggregate(Aggregate::Count),
                op: CmpOp::Gte,
                value: HavingValue::Int(2),
            })
            .having(Having {
                target: HavingTarget::Field(DemoField::GameId),
                op: CmpOp::Ne,
                value: HavingValue::Int(9),
            });
        let sql = q.to_sql();
        assert!(sql.contains("HAVING COUNT(*) >= $1 AND \"game_id\" <> $2"));
    }

    #[test]
    fn valid_query_passes() {
        let q = GroupQuery::new(vec![DemoField::GameId, DemoField::Format])
            .aggregate(Aggregate::Max(DemoField::GameId))
            .having(Having {
                target: HavingTarget::Aggregate(Aggregate::Count),
                op: CmpOp::Gt,
                value: HavingValue::Int(1),
            });
        assert!(q.validate().is_ok());
    }
}
