//! Metric-math expressions over raw time series
//!
//! This module provides:
//! - Spreadsheet-style variable allocation scoped to one building pass
//! - Immutable, shareable expressions with locally bound variables
//! - The builder that combines entity, zone, and region aggregates

mod allocator;
mod builder;

pub use allocator::{name_at, VariableAllocator};
pub use builder::{AvailabilityMetricType, MetricExpressionBuilder};

use crate::models::MetricRef;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Metric exposed by a contributor rule, e.g. its unique contributor count
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContributorCount {
    pub rule_name: String,
    pub metric: String,
}

impl ContributorCount {
    pub fn unique_contributors(rule_name: impl Into<String>) -> Self {
        Self {
            rule_name: rule_name.into(),
            metric: "UniqueContributors".to_string(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "INSIGHT_RULE_METRIC(\"{}\", \"{}\")",
            self.rule_name, self.metric
        )
    }
}

/// What a variable of an expression is bound to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Term {
    Metric(MetricRef),
    Contributors(ContributorCount),
    Expression(Arc<Expression>),
}

/// Argument of an external function call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CallArg {
    Number(f64),
    Text(String),
    Var(String),
}

impl CallArg {
    fn render(&self) -> String {
        match self {
            CallArg::Number(value) => value.to_string(),
            CallArg::Text(text) => format!("\"{}\"", text.replace('"', "\\\"")),
            CallArg::Var(name) => name.clone(),
        }
    }
}

/// Typed formula of an expression; renders to metric-math text
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Formula {
    Var {
        name: String,
    },
    Sum {
        terms: Vec<Formula>,
    },
    Ratio {
        numerator: Box<Formula>,
        denominator: Box<Formula>,
    },
    Scale {
        inner: Box<Formula>,
        factor: f64,
    },
    Call {
        function: String,
        args: Vec<CallArg>,
    },
}

impl Formula {
    pub fn var(name: impl Into<String>) -> Self {
        Formula::Var { name: name.into() }
    }

    /// Sum of the given formulas; a single formula is returned as is
    pub fn sum(mut terms: Vec<Formula>) -> Self {
        if terms.len() == 1 {
            terms.remove(0)
        } else {
            Formula::Sum { terms }
        }
    }

    pub fn ratio(numerator: Formula, denominator: Formula) -> Self {
        Formula::Ratio {
            numerator: Box::new(numerator),
            denominator: Box::new(denominator),
        }
    }

    pub fn scale(inner: Formula, factor: f64) -> Self {
        Formula::Scale {
            inner: Box::new(inner),
            factor,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Formula::Var { name } => name.clone(),
            Formula::Sum { terms } => {
                let parts: Vec<String> = terms.iter().map(Formula::render).collect();
                format!("({})", parts.join("+"))
            }
            Formula::Ratio {
                numerator,
                denominator,
            } => format!("({}/{})", numerator.render(), denominator.render()),
            Formula::Scale { inner, factor } => format!("{}*{}", inner.render(), factor),
            Formula::Call { function, args } => {
                let parts: Vec<String> = args.iter().map(CallArg::render).collect();
                format!("{}({})", function, parts.join(", "))
            }
        }
    }

    /// Variables referenced by this formula, in order of appearance
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Formula::Var { name } => out.push(name),
            Formula::Sum { terms } => terms.iter().for_each(|t| t.collect_variables(out)),
            Formula::Ratio {
                numerator,
                denominator,
            } => {
                numerator.collect_variables(out);
                denominator.collect_variables(out);
            }
            Formula::Scale { inner, .. } => inner.collect_variables(out),
            Formula::Call { args, .. } => {
                for arg in args {
                    if let CallArg::Var(name) = arg {
                        out.push(name);
                    }
                }
            }
        }
    }

    fn evaluate(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Option<f64> {
        match self {
            Formula::Var { name } => lookup(name),
            Formula::Sum { terms } => terms.iter().map(|t| t.evaluate(lookup)).sum(),
            Formula::Ratio {
                numerator,
                denominator,
            } => {
                let denominator = denominator.evaluate(lookup)?;
                // No datapoint, as the monitoring backend would report
                if denominator == 0.0 {
                    return None;
                }
                Some(numerator.evaluate(lookup)? / denominator)
            }
            Formula::Scale { inner, factor } => inner.evaluate(lookup).map(|v| v * factor),
            // Evaluated by the external function, never locally
            Formula::Call { .. } => None,
        }
    }
}

/// A named, immutable formula over metrics, contributor counts, and other
/// expressions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    expression: String,
    formula: Formula,
    terms: IndexMap<String, Term>,
    period_secs: u64,
}

impl Expression {
    pub(crate) fn new(
        label: Option<String>,
        formula: Formula,
        terms: IndexMap<String, Term>,
        period_secs: u64,
    ) -> Self {
        Self {
            label,
            expression: formula.render(),
            formula,
            terms,
            period_secs,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn terms(&self) -> &IndexMap<String, Term> {
        &self.terms
    }

    pub fn period_secs(&self) -> u64 {
        self.period_secs
    }

    /// Metric-math text of the top-level formula
    pub fn render(&self) -> &str {
        &self.expression
    }

    /// Every raw series reachable from this expression, depth first
    pub fn metric_refs(&self) -> Vec<&MetricRef> {
        let mut refs = Vec::new();
        for term in self.terms.values() {
            match term {
                Term::Metric(metric) => refs.push(metric),
                Term::Expression(nested) => refs.extend(nested.metric_refs()),
                Term::Contributors(_) => {}
            }
        }
        refs
    }

    /// Every `(variable, term)` binding in the transitive closure
    pub fn bindings(&self) -> Vec<(&str, &Term)> {
        let mut out = Vec::new();
        for (name, term) in &self.terms {
            out.push((name.as_str(), term));
            if let Term::Expression(nested) = term {
                out.extend(nested.bindings());
            }
        }
        out
    }

    /// True when no variable in the closure is bound to two different terms
    pub fn has_consistent_bindings(&self) -> bool {
        let mut seen: HashMap<&str, &Term> = HashMap::new();
        self.bindings().into_iter().all(|(name, term)| {
            let bound = *seen.entry(name).or_insert(term);
            std::ptr::eq(bound, term) || bound == term
        })
    }

    /// Compute the value of this expression for one assignment of raw series
    ///
    /// `resolve` is asked for metric and contributor terms only; nested
    /// expressions are evaluated recursively. Returns `None` when a value is
    /// missing, a denominator is zero, or an external call is involved.
    pub fn evaluate<F>(&self, resolve: &F) -> Option<f64>
    where
        F: Fn(&Term) -> Option<f64>,
    {
        let lookup = |name: &str| -> Option<f64> {
            match self.terms.get(name)? {
                Term::Expression(nested) => nested.evaluate(resolve),
                term => resolve(term),
            }
        };
        self.formula.evaluate(&lookup)
    }
}
