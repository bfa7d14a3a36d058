//! Quantity / price reconciliation
//!
//! Extracted invoice lines often violate `quantity × unit price = total`
//! because a single digit was misread. [`reconcile`] decides which of the
//! three numbers is wrong and proposes a corrected triple, searching
//! single-digit edits when no simpler explanation applies.

pub mod candidates;

use crate::path::{self, Path};
use crate::value::{as_text, from_decimal, to_decimal};
use candidates::{common_mistakes, is_integer_text, single_digit_variations};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{json, Map, Value};

pub const UNRESOLVED_MESSAGE: &str = "No valid correction found";

/// A corrected triple, every field rounded to one decimal place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correction {
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl Correction {
    fn new(quantity: Decimal, unit_price: Decimal, total_price: Decimal) -> Self {
        Self {
            quantity: round1(quantity),
            unit_price: round1(unit_price),
            total_price: round1(total_price),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "quantity": from_decimal(self.quantity),
            "unitPrice": from_decimal(self.unit_price),
            "totalPrice": from_decimal(self.total_price),
        })
    }
}

/// Outcome of reconciling one line
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// The triple already satisfies the identity
    Valid,
    /// Not enough numbers to check or repair anything
    Incomplete { quantity_present: bool },
    Corrected(Correction),
    /// The search found nothing; carries the inputs untouched
    Unresolved {
        quantity: Value,
        unit_price: Value,
        total_price: Value,
    },
}

impl Reconciliation {
    pub fn correction(&self) -> Option<&Correction> {
        match self {
            Reconciliation::Corrected(correction) => Some(correction),
            _ => None,
        }
    }

    /// Whether the quantity as extracted can be trusted
    pub fn quantity_valid(&self) -> bool {
        match self {
            Reconciliation::Valid => true,
            Reconciliation::Incomplete { quantity_present } => *quantity_present,
            Reconciliation::Corrected(_) | Reconciliation::Unresolved { .. } => false,
        }
    }

    /// JSON view: the triple to use, or the soft error marker
    pub fn to_json(&self, quantity: &Value, unit_price: &Value, total_price: &Value) -> Value {
        match self {
            Reconciliation::Corrected(correction) => correction.to_json(),
            Reconciliation::Unresolved {
                quantity,
                unit_price,
                total_price,
            } => json!({
                "error": UNRESOLVED_MESSAGE,
                "quantity": quantity,
                "unitPrice": unit_price,
                "totalPrice": total_price,
            }),
            Reconciliation::Valid | Reconciliation::Incomplete { .. } => json!({
                "quantity": rounded(quantity),
                "unitPrice": rounded(unit_price),
                "totalPrice": rounded(total_price),
            }),
        }
    }
}

fn round1(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

fn rounded(value: &Value) -> Value {
    match to_decimal(value) {
        Some(decimal) => from_decimal(round1(decimal)),
        None => value.clone(),
    }
}

/// `round(t,1) == round(u,1) × round(q,1)` and the unit price does not exceed the total
pub fn is_correct(quantity: Decimal, unit_price: Decimal, total_price: Decimal) -> bool {
    match round1(unit_price).checked_mul(round1(quantity)) {
        Some(product) => round1(total_price) == product && unit_price <= total_price,
        None => false,
    }
}

/// Numeric and non-zero
fn present(value: &Value) -> Option<Decimal> {
    to_decimal(value).filter(|d| !d.is_zero())
}

/// Reconcile one quantity / unit price / total price triple
pub fn reconcile(quantity: &Value, unit_price: &Value, total_price: &Value) -> Reconciliation {
    let Some(q) = present(quantity) else {
        return match (present(unit_price), present(total_price)) {
            (Some(u), Some(t)) if u > Decimal::ZERO => match t.checked_div(u) {
                Some(q) => Reconciliation::Corrected(Correction::new(q, u, t)),
                None => Reconciliation::Incomplete {
                    quantity_present: false,
                },
            },
            _ => Reconciliation::Incomplete {
                quantity_present: false,
            },
        };
    };

    let (Some(u), Some(t)) = (present(unit_price), present(total_price)) else {
        return Reconciliation::Incomplete {
            quantity_present: true,
        };
    };

    if is_correct(q, u, t) {
        return Reconciliation::Valid;
    }
    if u == t {
        return Reconciliation::Corrected(Correction::new(Decimal::ONE, u, t));
    }
    if u > t {
        if let Some(unit) = t.checked_div(q) {
            return Reconciliation::Corrected(Correction::new(q, unit, t));
        }
    }

    match search([quantity, unit_price, total_price], [q, u, t]) {
        Some(correction) => Reconciliation::Corrected(correction),
        None => Reconciliation::Unresolved {
            quantity: quantity.clone(),
            unit_price: unit_price.clone(),
            total_price: total_price.clone(),
        },
    }
}

/// Try every candidate of every field, common mistakes first
fn search(raw: [&Value; 3], parsed: [Decimal; 3]) -> Option<Correction> {
    let digits: Vec<Option<String>> = raw
        .iter()
        .map(|value| as_text(value).map(|t| t.trim().to_string()).filter(|t| is_integer_text(t)))
        .collect();

    let phases: [fn(&str) -> Vec<Decimal>; 2] = [common_mistakes, single_digit_variations];
    for generate in phases {
        for (field, text) in digits.iter().enumerate() {
            let Some(text) = text else { continue };
            for candidate in generate(text) {
                let mut triple = parsed;
                triple[field] = candidate;
                if is_correct(triple[0], triple[1], triple[2]) {
                    return Some(Correction::new(triple[0], triple[1], triple[2]));
                }
            }
        }
    }
    None
}

/// Paths of the three fields inside a line item
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemPaths {
    pub quantity: Path,
    pub unit_price: Path,
    pub total_price: Path,
}

/// Reconcile every line item of `items` (an array, or a single object) in place.
///
/// Corrected triples are written back; unresolved lines are left untouched.
/// With `audit`, each item also receives a `quantity_validation` object.
pub fn reconcile_line_items(items: &mut Value, paths: &LineItemPaths, audit: bool) {
    match items {
        Value::Array(list) => {
            for item in list.iter_mut().filter(|item| item.is_object()) {
                reconcile_item(item, paths, audit);
            }
        }
        Value::Object(_) => reconcile_item(items, paths, audit),
        _ => {}
    }
}

fn reconcile_item(item: &mut Value, paths: &LineItemPaths, audit: bool) {
    let quantity = path::get(item, &paths.quantity).into_value();
    let unit_price = path::get(item, &paths.unit_price).into_value();
    let total_price = path::get(item, &paths.total_price).into_value();

    let outcome = reconcile(&quantity, &unit_price, &total_price);

    if let Some(correction) = outcome.correction() {
        path::set(item, &paths.quantity, from_decimal(correction.quantity));
        path::set(item, &paths.unit_price, from_decimal(correction.unit_price));
        path::set(item, &paths.total_price, from_decimal(correction.total_price));
    }

    if audit {
        let corrections = match outcome.correction() {
            Some(correction) => json!({
                "quantity": from_decimal(correction.quantity),
                "unit_price": from_decimal(correction.unit_price),
                "total_price": from_decimal(correction.total_price),
            }),
            None => Value::Object(Map::new()),
        };
        if let Value::Object(map) = item {
            map.insert(
                "quantity_validation".to_string(),
                json!({
                    "is_valid": outcome.quantity_valid(),
                    "is_corrected": outcome.correction().is_some(),
                    "corrections": corrections,
                }),
            );
        }
    }
}
