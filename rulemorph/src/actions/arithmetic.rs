use super::{apply_writes, plan_writes, ValueSource};
use crate::path::{Path, Resolved};
use crate::value::{from_decimal, to_decimal};
use crate::{TransformError, TransformResult};
use rust_decimal::Decimal;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOperation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "add" => Some(Self::Add),
            "subtract" => Some(Self::Subtract),
            "multiply" => Some(Self::Multiply),
            "divide" => Some(Self::Divide),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }

    /// Apply the operation. Null operands count as zero.
    ///
    /// # Examples
    /// ```text
    /// add(2, "3")     = 5
    /// divide(7, 2)    = 3.5
    /// multiply(null, 4) = 0
    /// divide(1, 0)    -> DivisionByZero
    /// ```
    pub fn apply(&self, left: &Value, right: &Value) -> TransformResult<Value> {
        let l = self.operand(left)?;
        let r = self.operand(right)?;

        let result = match self {
            Self::Add => l.checked_add(r),
            Self::Subtract => l.checked_sub(r),
            Self::Multiply => l.checked_mul(r),
            Self::Divide => {
                if r.is_zero() {
                    return Err(TransformError::DivisionByZero);
                }
                l.checked_div(r)
            }
        };

        result
            .map(from_decimal)
            .ok_or_else(|| TransformError::Overflow(self.name().to_string()))
    }

    fn operand(&self, value: &Value) -> TransformResult<Decimal> {
        match value {
            Value::Null => Ok(Decimal::ZERO),
            other => to_decimal(other).ok_or_else(|| TransformError::not_numeric(self.name(), other)),
        }
    }
}

impl fmt::Display for ArithmeticOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// `add`, `subtract`, `multiply` or `divide` the value at `path` by an operand
#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticAction {
    pub operation: ArithmeticOperation,
    pub path: Path,
    pub target: Path,
    /// Literal `value` or `valueFromField`; null when neither is configured
    pub operand: ValueSource,
}

impl ArithmeticAction {
    pub fn execute(&self, record: &mut Value) -> TransformResult<()> {
        let writes = self.plan(record)?;
        apply_writes(record, writes);
        Ok(())
    }

    fn plan(&self, record: &Value) -> TransformResult<Vec<(Path, Value)>> {
        let operand = self
            .operand
            .resolve(record)
            .unwrap_or(Resolved::Single(Value::Null));

        plan_writes(record, &self.path, &self.target, |current, index| {
            let right = match index {
                Some(index) => operand.aligned(index),
                None => operand.clone().into_value(),
            };
            self.operation.apply(current, &right)
        })
    }
}
