//! Unit conversion against a caller-supplied conversion table
//!
//! A table is a list of `{from, to, factor}` rows. Converting `from → to`
//! multiplies by the factor of a matching row; when only the reverse row
//! `to → from` exists the quantity is divided instead. Results are rounded up
//! to the next whole unit, since a partial pack still has to be ordered whole.

use crate::value::{as_f64, normalize_text};
use crate::{TransformError, TransformResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub from: String,
    pub to: String,
    #[serde(default, deserialize_with = "lenient_factor")]
    pub factor: Option<f64>,
}

impl Conversion {
    /// The usable factor; missing, zero or negative factors count as 1
    fn effective_factor(&self, invert: bool) -> f64 {
        match self.factor {
            Some(factor) if factor > 0.0 => {
                if invert {
                    1.0 / factor
                } else {
                    factor
                }
            }
            _ => 1.0,
        }
    }

    fn matches(&self, from: &str, to: &str) -> bool {
        normalize_text(&self.from) == normalize_text(from) && normalize_text(&self.to) == normalize_text(to)
    }
}

/// Factors often arrive as strings from spreadsheets
fn lenient_factor<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_f64(&value))
}

/// Parse a conversion table from its JSON form
pub fn parse_table(table: &Value) -> TransformResult<Vec<Conversion>> {
    serde_json::from_value(table.clone())
        .map_err(|e| TransformError::function("convert_unit", format!("invalid conversion table: {}", e)))
}

/// Convert `quantity` between units. An unmatched pair returns the quantity
/// unchanged (not rounded).
pub fn convert(table: &[Conversion], quantity: f64, from: &str, to: &str, invert: bool) -> f64 {
    if quantity == 0.0 {
        return quantity;
    }
    if let Some(row) = table.iter().find(|row| row.matches(from, to)) {
        return (quantity * row.effective_factor(invert)).ceil();
    }
    if let Some(row) = table.iter().find(|row| row.matches(to, from)) {
        return (quantity / row.effective_factor(invert)).ceil();
    }
    quantity
}
