use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Row, Table};
use rulemorph::actions::Action;
use rulemorph::conditions::{Condition, Operator};
use rulemorph::{FunctionRegistry, Rule};

pub struct Formatter {}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self {}
    }

    /// Summary table of a rule configuration, with anything that will fail at run time
    pub fn format_rules(&self, rules: &[Rule], functions: &FunctionRegistry) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec![
            Cell::new("#").set_alignment(CellAlignment::Right),
            Cell::new("Condition").set_alignment(CellAlignment::Left),
            Cell::new("Actions").set_alignment(CellAlignment::Left),
            Cell::new("Warnings").set_alignment(CellAlignment::Left),
        ]));

        let mut warning_count = 0;
        for (index, rule) in rules.iter().enumerate() {
            let actions: Vec<String> = rule.actions.iter().map(describe_action).collect();
            let warnings = warnings(rule, functions);
            warning_count += warnings.len();

            table.add_row(Row::from(vec![
                Cell::new(index).set_alignment(CellAlignment::Right),
                Cell::new(rule.condition.to_string()),
                Cell::new(actions.join("\n")),
                Cell::new(warnings.join("\n")),
            ]));
        }

        let mut output = table.to_string();
        output.push('\n');
        output.push_str(&format!(
            "{} rule(s), {} warning(s)\n",
            rules.len(),
            warning_count
        ));
        output
    }
}

fn describe_action(action: &Action) -> String {
    let path = action
        .path()
        .map(|p| if p.is_root() { "<record>".to_string() } else { p.to_string() })
        .unwrap_or_default();
    match action {
        Action::Function(function) => format!("function {}({})", function.function, path),
        other => format!("{} {}", other.kind(), path).trim_end().to_string(),
    }
}

fn warnings(rule: &Rule, functions: &FunctionRegistry) -> Vec<String> {
    let mut warnings = Vec::new();
    unknown_operators(&rule.condition, &mut warnings);

    for (index, action) in rule.actions.iter().enumerate() {
        match action {
            Action::Unsupported { action } => {
                warnings.push(format!("action {}: unknown action '{}'", index, action))
            }
            Action::Function(function) if !functions.contains(&function.function) => {
                warnings.push(format!(
                    "action {}: function '{}' is not registered",
                    index, function.function
                ))
            }
            _ => {}
        }
    }
    warnings
}

fn unknown_operators(condition: &Condition, warnings: &mut Vec<String>) {
    match condition {
        Condition::Always => {}
        Condition::Simple(simple) => {
            if let Operator::Unsupported(name) = &simple.operator {
                warnings.push(format!("unknown operator '{}'", name));
            }
        }
        Condition::Composite(composite) => {
            for child in &composite.conditions {
                unknown_operators(child, warnings);
            }
        }
    }
}
