use crate::evaluator::Evaluator;
use crate::functions::FunctionRegistry;
use crate::options::EngineOptions;
use crate::parser::{parse_rules, Rule};
use crate::reporter::{Reporter, TracingReporter};
use crate::{TransformError, TransformResult};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// The transformation engine.
///
/// Built once from a rule configuration and a function registry, then used
/// for any number of documents. Cloning is cheap and clones share the parsed
/// rules, so an engine can be handed to concurrent callers freely.
#[derive(Clone)]
pub struct Engine {
    rules: Arc<[Rule]>,
    functions: Arc<FunctionRegistry>,
    reporter: Arc<dyn Reporter>,
    options: EngineOptions,
}

impl Engine {
    /// Build an engine from a JSON rule configuration
    pub fn new(config: &Value, functions: FunctionRegistry) -> TransformResult<Self> {
        Self::with_options(config, functions, EngineOptions::default())
    }

    pub fn with_options(
        config: &Value,
        functions: FunctionRegistry,
        options: EngineOptions,
    ) -> TransformResult<Self> {
        let rules = parse_rules(config, &options)?;
        debug!(
            rules = rules.len(),
            functions = functions.len(),
            "built transformation engine"
        );
        Ok(Self {
            rules: rules.into(),
            functions: Arc::new(functions),
            reporter: Arc::new(TracingReporter),
            options,
        })
    }

    /// Build an engine from rule configuration text
    pub fn from_json_str(config: &str, functions: FunctionRegistry) -> TransformResult<Self> {
        let config: Value = serde_json::from_str(config)
            .map_err(|e| TransformError::config("rules", format!("invalid JSON: {}", e)))?;
        Self::new(&config, functions)
    }

    /// Build an engine from rules parsed elsewhere
    pub fn from_rules(rules: Vec<Rule>, functions: FunctionRegistry) -> Self {
        Self {
            rules: rules.into(),
            functions: Arc::new(functions),
            reporter: Arc::new(TracingReporter),
            options: EngineOptions::default(),
        }
    }

    /// Replace the reporter that receives contained failures
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Transform a document in place.
    ///
    /// On success the document is always a list of records. Failing rules
    /// and actions are skipped and reported; the only error is a document
    /// that is not an object or a list of records, which is left untouched.
    pub fn transform(&self, document: &mut Value) -> TransformResult<()> {
        Evaluator {
            rules: &self.rules,
            functions: &self.functions,
            reporter: self.reporter.as_ref(),
            options: &self.options,
        }
        .transform(document)
    }

    /// Owned-value variant of [`Engine::transform`]
    pub fn transform_value(&self, mut document: Value) -> TransformResult<Value> {
        self.transform(&mut document)?;
        Ok(document)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("rules", &self.rules.len())
            .field("functions", &self.functions)
            .field("options", &self.options)
            .finish()
    }
}
