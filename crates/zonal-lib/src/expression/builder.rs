//! Expression builder
//!
//! Combines raw counters into entity, zone, and region aggregates. Every
//! variable of every expression built by one builder comes from the same
//! allocator, so an expression never rebinds a name used anywhere in its
//! closure.

use super::{CallArg, ContributorCount, Expression, Formula, Term, VariableAllocator};
use crate::error::{Result, SynthesisError};
use crate::models::{MetricRef, ZoneId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Percentage scale factor for rate expressions
const PERCENT: f64 = 100.0;

/// Shape of an availability expression built from success and fault counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityMetricType {
    SuccessRate,
    SuccessCount,
    FaultRate,
    FaultCount,
    RequestCount,
}

/// Builds expressions for one pass, owning that pass's allocator
#[derive(Debug, Clone)]
pub struct MetricExpressionBuilder {
    allocator: VariableAllocator,
    period_secs: u64,
}

impl MetricExpressionBuilder {
    pub fn new(period_secs: u64) -> Self {
        Self::with_allocator(VariableAllocator::new(), period_secs)
    }

    pub fn with_allocator(allocator: VariableAllocator, period_secs: u64) -> Self {
        Self {
            allocator,
            period_secs,
        }
    }

    pub fn allocator(&self) -> &VariableAllocator {
        &self.allocator
    }

    pub fn period_secs(&self) -> u64 {
        self.period_secs
    }

    fn bind(&mut self, terms: &mut IndexMap<String, Term>, term: Term) -> String {
        let name = self.allocator.next_name();
        terms.insert(name.clone(), term);
        name
    }

    /// Reuse the variable of a series already bound in this expression
    fn bind_shared<'m>(
        &mut self,
        terms: &mut IndexMap<String, Term>,
        bound: &mut Vec<(&'m MetricRef, String)>,
        metric: &'m MetricRef,
    ) -> Formula {
        if let Some((_, name)) = bound.iter().find(|(seen, _)| *seen == metric) {
            return Formula::var(name.clone());
        }
        let name = self.bind(terms, Term::Metric(metric.clone()));
        bound.push((metric, name.clone()));
        Formula::var(name)
    }

    fn bind_all(
        &mut self,
        terms: &mut IndexMap<String, Term>,
        bound: impl IntoIterator<Item = Term>,
    ) -> Vec<Formula> {
        let mut vars = Vec::new();
        for term in bound {
            vars.push(Formula::var(self.bind(terms, term)));
        }
        vars
    }

    /// Sum of the counters representing one signal for one entity
    pub fn aggregate_entity(
        &mut self,
        label: impl Into<String>,
        count_refs: Vec<MetricRef>,
    ) -> Result<Arc<Expression>> {
        let label = label.into();
        if count_refs.is_empty() {
            return Err(SynthesisError::EmptyEntity(label));
        }

        let mut terms = IndexMap::new();
        let vars = self.bind_all(&mut terms, count_refs.into_iter().map(Term::Metric));

        Ok(Arc::new(Expression::new(
            Some(label),
            Formula::sum(vars),
            terms,
            self.period_secs,
        )))
    }

    /// Sum of the entity expressions of one zone, labelled `"<zone> <suffix>"`
    ///
    /// Each entity expression must carry a label that is the zone id, or the
    /// zone id followed by a space.
    pub fn aggregate_zone(
        &mut self,
        zone: &ZoneId,
        suffix: &str,
        entity_expressions: &[Arc<Expression>],
    ) -> Result<Arc<Expression>> {
        if entity_expressions.is_empty() {
            return Err(SynthesisError::EmptyZone(zone.to_string()));
        }

        for entity in entity_expressions {
            match entity.label() {
                Some(label) if labels_zone(label, zone) => {}
                other => {
                    return Err(SynthesisError::MislabeledEntity {
                        zone: zone.to_string(),
                        label: other.unwrap_or_default().to_string(),
                    })
                }
            }
        }

        self.sum(format!("{zone} {suffix}"), entity_expressions)
    }

    /// Sum of every zone expression, in insertion order
    pub fn aggregate_region(
        &mut self,
        label: impl Into<String>,
        zone_expressions: &IndexMap<ZoneId, Arc<Expression>>,
    ) -> Result<Arc<Expression>> {
        let label = label.into();
        if zone_expressions.is_empty() {
            return Err(SynthesisError::NoZones(label));
        }

        let zones: Vec<Arc<Expression>> = zone_expressions.values().cloned().collect();
        self.sum(label, &zones)
    }

    /// Sum of arbitrary expressions, e.g. per-operation totals of a service
    pub fn sum(
        &mut self,
        label: impl Into<String>,
        expressions: &[Arc<Expression>],
    ) -> Result<Arc<Expression>> {
        let label = label.into();
        if expressions.is_empty() {
            return Err(SynthesisError::EmptyEntity(label));
        }

        let mut terms = IndexMap::new();
        let vars = self.bind_all(
            &mut terms,
            expressions.iter().cloned().map(Term::Expression),
        );

        Ok(Arc::new(Expression::new(
            Some(label),
            Formula::sum(vars),
            terms,
            self.period_secs,
        )))
    }

    /// `(n/d)`, or `(n/d)*100` when `as_percentage`
    pub fn ratio(
        &mut self,
        label: Option<String>,
        numerator: &Arc<Expression>,
        denominator: &Arc<Expression>,
        as_percentage: bool,
    ) -> Arc<Expression> {
        let mut terms = IndexMap::new();
        let n = self.bind(&mut terms, Term::Expression(Arc::clone(numerator)));
        let d = self.bind(&mut terms, Term::Expression(Arc::clone(denominator)));

        let formula = Self::maybe_percentage(
            Formula::ratio(Formula::var(n), Formula::var(d)),
            as_percentage,
        );
        Arc::new(Expression::new(label, formula, terms, self.period_secs))
    }

    /// Rate over raw counters; series appearing in both sides share a variable
    pub fn rate(
        &mut self,
        label: impl Into<String>,
        numerator: &[MetricRef],
        denominator: &[MetricRef],
        as_percentage: bool,
    ) -> Result<Arc<Expression>> {
        let label = label.into();
        if numerator.is_empty() || denominator.is_empty() {
            return Err(SynthesisError::EmptyEntity(label));
        }

        let mut terms = IndexMap::new();
        let mut bound: Vec<(&MetricRef, String)> = Vec::new();
        let top: Vec<Formula> = numerator
            .iter()
            .map(|metric| self.bind_shared(&mut terms, &mut bound, metric))
            .collect();
        let bottom: Vec<Formula> = denominator
            .iter()
            .map(|metric| self.bind_shared(&mut terms, &mut bound, metric))
            .collect();

        let formula = Self::maybe_percentage(
            Formula::ratio(Formula::sum(top), Formula::sum(bottom)),
            as_percentage,
        );
        Ok(Arc::new(Expression::new(
            Some(label),
            formula,
            terms,
            self.period_secs,
        )))
    }

    /// Availability expression of the requested shape
    pub fn availability(
        &mut self,
        label: impl Into<String>,
        successes: &[MetricRef],
        faults: &[MetricRef],
        metric_type: AvailabilityMetricType,
    ) -> Result<Arc<Expression>> {
        let label = label.into();
        let requests: Vec<MetricRef> = successes.iter().chain(faults).cloned().collect();

        match metric_type {
            AvailabilityMetricType::SuccessRate => self.rate(label, successes, &requests, true),
            AvailabilityMetricType::FaultRate => self.rate(label, faults, &requests, true),
            AvailabilityMetricType::SuccessCount => self.aggregate_entity(label, successes.to_vec()),
            AvailabilityMetricType::FaultCount => self.aggregate_entity(label, faults.to_vec()),
            AvailabilityMetricType::RequestCount => self.aggregate_entity(label, requests),
        }
    }

    /// Ratio of two contributor counts, e.g. faulting instances over serving ones
    pub fn contributor_ratio(
        &mut self,
        label: impl Into<String>,
        contributing: ContributorCount,
        total: ContributorCount,
    ) -> Arc<Expression> {
        let mut terms = IndexMap::new();
        let n = self.bind(&mut terms, Term::Contributors(contributing));
        let d = self.bind(&mut terms, Term::Contributors(total));

        Arc::new(Expression::new(
            Some(label.into()),
            Formula::ratio(Formula::var(n), Formula::var(d)),
            terms,
            self.period_secs,
        ))
    }

    /// Call of an external function with the per-zone breakdown bound as terms
    ///
    /// Arguments are the function name, the leading arguments, then one
    /// `zone id, variable` pair per zone in breakdown order.
    pub fn external_call(
        &mut self,
        label: impl Into<String>,
        function_name: &str,
        leading: Vec<CallArg>,
        breakdown: &IndexMap<ZoneId, Arc<Expression>>,
    ) -> Result<Arc<Expression>> {
        let label = label.into();
        if breakdown.is_empty() {
            return Err(SynthesisError::NoZones(label));
        }

        let mut terms = IndexMap::new();
        let mut args = vec![CallArg::Text(function_name.to_string())];
        args.extend(leading);
        for (zone, expression) in breakdown {
            let name = self.bind(&mut terms, Term::Expression(Arc::clone(expression)));
            args.push(CallArg::Text(zone.to_string()));
            args.push(CallArg::Var(name));
        }

        let formula = Formula::Call {
            function: "LAMBDA".to_string(),
            args,
        };
        Ok(Arc::new(Expression::new(
            Some(label),
            formula,
            terms,
            self.period_secs,
        )))
    }

    fn maybe_percentage(formula: Formula, as_percentage: bool) -> Formula {
        if as_percentage {
            Formula::scale(formula, PERCENT)
        } else {
            formula
        }
    }
}

fn labels_zone(label: &str, zone: &ZoneId) -> bool {
    match label.strip_prefix(zone.as_str()) {
        Some(rest) => rest.is_empty() || rest.starts_with(' '),
        None => false,
    }
}
