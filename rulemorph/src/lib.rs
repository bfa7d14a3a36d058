//! # Rulemorph Engine
//!
//! **Declarative rules for cleaning up nested JSON**
//!
//! Rulemorph applies an ordered list of rules to JSON documents. Each rule
//! pairs a condition with actions that set, compute, delete or transform
//! values addressed by dotted paths with `*` wildcards. It was built for
//! post-processing documents extracted by OCR, where fields are noisy and
//! line items need their quantities and prices reconciled.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rulemorph::{Engine, FunctionRegistry, TransformResult};
//! use serde_json::json;
//!
//! fn main() -> TransformResult<()> {
//!     let rules = json!([{
//!         "condition": {"path": "vendor", "operator": "contains", "value": "acme"},
//!         "actions": [
//!             {"action": "set", "path": "category", "value": "tools"},
//!             {"action": "function", "path": "items.*.name", "function": "upper"}
//!         ]
//!     }]);
//!     let engine = Engine::new(&rules, FunctionRegistry::with_builtins())?;
//!
//!     let mut document = json!({"vendor": "ACME Corp", "items": [{"name": "hammer"}]});
//!     engine.transform(&mut document)?;
//!
//!     assert_eq!(document[0]["category"], "tools");
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Documents and records
//! A document is a single record (an object) or a list of records. The
//! output is always a list; a record an action turns into a list is split
//! into several records.
//!
//! ### Conditions
//! Simple conditions compare the value at a path with an operand. Composite
//! conditions combine them with `and`/`or`. A wildcard subject matches when
//! any of its values does.
//!
//! ### Actions
//! `set`, `arithmetic`, `delete` and `function` write into the record. An
//! action that fails leaves the record as it was and is reported to the
//! engine's [`Reporter`], never to the caller.

pub mod actions;
pub mod conditions;
pub mod engine;
pub mod error;
mod evaluator;
pub mod functions;
pub mod options;
pub mod parser;
pub mod path;
pub mod reconcile;
pub mod reporter;
pub mod units;
pub mod value;

pub use actions::{Action, ValueSource};
pub use conditions::{Condition, Operator, SimilarityMethod};
pub use engine::Engine;
pub use error::TransformError;
pub use functions::{FunctionRegistry, NativeFunction};
pub use options::EngineOptions;
pub use parser::{parse_rules, Rule};
pub use path::{Path, Resolved};
pub use reconcile::{reconcile, reconcile_line_items, LineItemPaths, Reconciliation};
pub use reporter::{Diagnostic, MemoryReporter, Reporter, TracingReporter};

/// Result type for rule parsing and transformation
pub type TransformResult<T> = Result<T, TransformError>;

#[cfg(test)]
mod tests;
