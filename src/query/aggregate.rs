use bigdecimal::BigDecimal;

use crate::query::FieldMeta;
use crate::repository::error::StoreError;

/// Which aggregates to compute for one `aggregate` call. Every listed field
/// must be numeric; that is checked before any I/O happens.
#[derive(Debug, Clone)]
pub struct AggregateSelection<F> {
    pub count: bool,
    pub avg: Vec<F>,
    pub sum: Vec<F>,
    pub min: Vec<F>,
    pub max: Vec<F>,
}

impl<F> Default for AggregateSelection<F> {
    fn default() -> Self {
        AggregateSelection {
            count: false,
            avg: Vec::new(),
            sum: Vec::new(),
            min: Vec::new(),
            max: Vec::new(),
        }
    }
}

impl<F: FieldMeta> AggregateSelection<F> {
    pub fn count_only() -> Self {
        AggregateSelection {
            count: true,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        for field in self
            .avg
            .iter()
            .chain(&self.sum)
            .chain(&self.min)
            .chain(&self.max)
        {
            if !field.numeric() {
                return Err(StoreError::Validation(format!(
                    "aggregates require a numeric field, got {}.{}",
                    F::TABLE,
                    field.column()
                )));
            }
        }
        Ok(())
    }
}

/// Aggregate outputs, `None` where the filtered set was empty.
#[derive(Debug, Clone)]
pub struct AggregateRow<F> {
    pub count: Option<i64>,
    pub avg: Vec<(F, Option<BigDecimal>)>,
    pub sum: Vec<(F, Option<i64>)>,
    pub min: Vec<(F, Option<i32>)>,
    pub max: Vec<(F, Option<i32>)>,
}

impl<F> Default for AggregateRow<F> {
    fn default() -> Self {
        AggregateRow {
            count: None,
            avg: Vec::new(),
            sum: Vec::new(),
            min: Vec::new(),
            max: Vec::new(),
        }
    }
}
