//! Feature reconciliation
//!
//! Maps arbitrary request records onto the fixed schema: missing fields
//! default to zero, unknown fields are dropped, every value is coerced to a
//! finite number, and the gender one-hot pair is normalized last.

use crate::models::{InputRecord, PreparedVector};
use crate::schema::{FeatureSchema, GenderFlags};
use serde_json::Value;

/// Reconciles input records against a schema
#[derive(Debug, Clone, Copy)]
pub struct FeatureReconciler<'a> {
    schema: &'a FeatureSchema,
}

impl<'a> FeatureReconciler<'a> {
    pub fn new(schema: &'a FeatureSchema) -> Self {
        Self { schema }
    }

    /// Reconcile one record into a vector in schema order
    pub fn reconcile(&self, record: &InputRecord) -> PreparedVector {
        let mut values: Vec<f64> = self
            .schema
            .names()
            .iter()
            .map(|name| record.get(name).map(coerce_numeric).unwrap_or(0.0))
            .collect();

        if let Some(flags) = self.schema.gender_flags() {
            normalize_gender(&mut values, flags);
        }

        PreparedVector(values)
    }

    /// Reconcile each record independently, preserving order
    pub fn reconcile_batch<'r, I>(&self, records: I) -> Vec<PreparedVector>
    where
        I: IntoIterator<Item = &'r InputRecord>,
    {
        records.into_iter().map(|r| self.reconcile(r)).collect()
    }
}

/// Coerce a JSON value to a finite number; anything unparsable becomes 0.0
pub fn coerce_numeric(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };

    match parsed {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Both flags unset means female; both set means male
fn normalize_gender(values: &mut [f64], flags: GenderFlags) {
    let male = values[flags.male];
    let female = values[flags.female];

    if male == 0.0 && female == 0.0 {
        values[flags.female] = 1.0;
    } else if male == 1.0 && female == 1.0 {
        values[flags.female] = 0.0;
    }
}
