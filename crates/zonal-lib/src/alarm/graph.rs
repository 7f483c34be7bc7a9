//! Alarm node arena
//!
//! Leaves and composites are appended once and never mutated. Composites
//! refer to children by [`NodeId`], so one node may feed several parents
//! and the graph forms a DAG.

use crate::error::{Result, SynthesisError};
use crate::expression::Expression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Evaluation periods and datapoints used by the fixed-window leaves
pub const FIXED_EVALUATION_PERIODS: u32 = 5;
pub const FIXED_DATAPOINTS_TO_ALARM: u32 = 3;

/// Comparison of a leaf's metric against its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    GreaterThanOrEqualToThreshold,
    GreaterThanThreshold,
    LessThanThreshold,
    LessThanOrEqualToThreshold,
}

impl ComparisonOperator {
    pub fn compare(self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonOperator::GreaterThanOrEqualToThreshold => value >= threshold,
            ComparisonOperator::GreaterThanThreshold => value > threshold,
            ComparisonOperator::LessThanThreshold => value < threshold,
            ComparisonOperator::LessThanOrEqualToThreshold => value <= threshold,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOperator::GreaterThanOrEqualToThreshold => ">=",
            ComparisonOperator::GreaterThanThreshold => ">",
            ComparisonOperator::LessThanThreshold => "<",
            ComparisonOperator::LessThanOrEqualToThreshold => "<=",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// How a leaf treats periods without data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingDataPolicy {
    #[default]
    NotBreaching,
    Breaching,
    Ignore,
    Missing,
}

/// `datapoints_to_alarm` out of `evaluation_periods` must breach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationWindow {
    pub evaluation_periods: u32,
    pub datapoints_to_alarm: u32,
}

impl EvaluationWindow {
    /// Validated window; datapoints must lie in `1..=evaluation_periods`
    pub fn new(evaluation_periods: u32, datapoints_to_alarm: u32) -> Result<Self> {
        if datapoints_to_alarm == 0 || datapoints_to_alarm > evaluation_periods {
            return Err(SynthesisError::out_of_range(
                "datapoints_to_alarm",
                f64::from(datapoints_to_alarm),
                "1..=evaluation_periods",
            ));
        }
        Ok(Self {
            evaluation_periods,
            datapoints_to_alarm,
        })
    }

    /// The 5 / 3 window
    pub const fn fixed() -> Self {
        Self {
            evaluation_periods: FIXED_EVALUATION_PERIODS,
            datapoints_to_alarm: FIXED_DATAPOINTS_TO_ALARM,
        }
    }
}

impl Default for EvaluationWindow {
    fn default() -> Self {
        Self::fixed()
    }
}

/// Threshold alarm over one expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafAlarm {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub expression: Arc<Expression>,
    pub comparison: ComparisonOperator,
    pub threshold: f64,
    #[serde(flatten)]
    pub window: EvaluationWindow,
    pub missing_data: MissingDataPolicy,
}

impl LeafAlarm {
    /// Leaf treating missing data as not breaching
    pub fn new(
        name: impl Into<String>,
        expression: Arc<Expression>,
        comparison: ComparisonOperator,
        threshold: f64,
        window: EvaluationWindow,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            expression,
            comparison,
            threshold,
            window,
            missing_data: MissingDataPolicy::NotBreaching,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_missing_data(mut self, policy: MissingDataPolicy) -> Self {
        self.missing_data = policy;
        self
    }

    /// Whether a single datapoint breaches, honouring the missing-data policy
    pub fn breaches(&self, value: Option<f64>) -> bool {
        match value {
            Some(value) => self.comparison.compare(value, self.threshold),
            None => self.missing_data == MissingDataPolicy::Breaching,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BooleanOperator {
    All,
    Any,
}

impl BooleanOperator {
    fn keyword(self) -> &'static str {
        match self {
            BooleanOperator::All => "AND",
            BooleanOperator::Any => "OR",
        }
    }
}

/// Boolean combination of other nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeAlarm {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub operator: BooleanOperator,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlarmNode {
    Leaf(LeafAlarm),
    Composite(CompositeAlarm),
}

impl AlarmNode {
    pub fn name(&self) -> &str {
        match self {
            AlarmNode::Leaf(leaf) => &leaf.name,
            AlarmNode::Composite(composite) => &composite.name,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, AlarmNode::Leaf(_))
    }
}

/// Index of a node inside its [`AlarmGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Append-only arena of uniquely named alarm nodes
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlarmGraph {
    nodes: Vec<AlarmNode>,
    #[serde(skip)]
    names: HashMap<String, NodeId>,
}

impl AlarmGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, node: AlarmNode) -> Result<NodeId> {
        if self.names.contains_key(node.name()) {
            return Err(SynthesisError::DuplicateAlarmName(node.name().to_string()));
        }
        let id = NodeId(self.nodes.len());
        self.names.insert(node.name().to_string(), id);
        self.nodes.push(node);
        Ok(id)
    }

    pub fn add_leaf(&mut self, leaf: LeafAlarm) -> Result<NodeId> {
        self.insert(AlarmNode::Leaf(leaf))
    }

    /// Add a composite over existing nodes
    ///
    /// # Errors
    /// * `EmptyComposite` when `children` is empty
    /// * `UnknownNode` when a child was not produced by this graph
    /// * `DuplicateAlarmName` when the name is taken
    pub fn add_composite(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
        operator: BooleanOperator,
        children: Vec<NodeId>,
    ) -> Result<NodeId> {
        let name = name.into();
        if children.is_empty() {
            return Err(SynthesisError::EmptyComposite(name));
        }
        if let Some(child) = children.iter().find(|c| c.0 >= self.nodes.len()) {
            return Err(SynthesisError::UnknownNode {
                name,
                child: child.0,
            });
        }

        self.insert(AlarmNode::Composite(CompositeAlarm {
            name,
            description,
            operator,
            children,
        }))
    }

    pub fn all_of(&mut self, name: impl Into<String>, children: Vec<NodeId>) -> Result<NodeId> {
        self.add_composite(name, None, BooleanOperator::All, children)
    }

    pub fn any_of(&mut self, name: impl Into<String>, children: Vec<NodeId>) -> Result<NodeId> {
        self.add_composite(name, None, BooleanOperator::Any, children)
    }

    pub fn get(&self, id: NodeId) -> Option<&AlarmNode> {
        self.nodes.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.get(id).map(AlarmNode::name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    pub fn composite_count(&self) -> usize {
        self.nodes.len() - self.leaf_count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &AlarmNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Children of a composite; empty for leaves and unknown ids
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Some(AlarmNode::Composite(composite)) => &composite.children,
            _ => &[],
        }
    }

    /// Alarm rule text of a composite, e.g. `ALARM("a") OR ALARM("b")`
    pub fn rule(&self, id: NodeId) -> Option<String> {
        match self.get(id)? {
            AlarmNode::Composite(composite) => {
                let parts: Vec<String> = composite
                    .children
                    .iter()
                    .filter_map(|child| self.name_of(*child))
                    .map(|name| format!("ALARM(\"{name}\")"))
                    .collect();
                let separator = format!(" {} ", composite.operator.keyword());
                Some(parts.join(separator.as_str()))
            }
            AlarmNode::Leaf(_) => None,
        }
    }

    /// Boolean value of a node given the state of every leaf
    ///
    /// Returns `None` for ids outside this graph.
    pub fn resolve<F>(&self, id: NodeId, leaf_state: &F) -> Option<bool>
    where
        F: Fn(&LeafAlarm) -> bool,
    {
        match self.get(id)? {
            AlarmNode::Leaf(leaf) => Some(leaf_state(leaf)),
            AlarmNode::Composite(composite) => {
                let mut states = composite
                    .children
                    .iter()
                    .map(|child| self.resolve(*child, leaf_state));
                match composite.operator {
                    BooleanOperator::All => states.try_fold(true, |acc, s| s.map(|s| acc && s)),
                    BooleanOperator::Any => states.try_fold(false, |acc, s| s.map(|s| acc || s)),
                }
            }
        }
    }

    /// Whether `target` is reachable from `root`, `root` included
    pub fn references(&self, root: NodeId, target: NodeId) -> bool {
        root == target
            || self
                .children(root)
                .iter()
                .any(|child| self.references(*child, target))
    }

    /// Depth-first walk from `root` as `(depth, node)` pairs
    pub fn walk(&self, root: NodeId) -> Vec<(usize, NodeId)> {
        let mut out = Vec::new();
        let mut stack = vec![(0usize, root)];
        while let Some((depth, id)) = stack.pop() {
            if self.get(id).is_none() {
                continue;
            }
            out.push((depth, id));
            for child in self.children(id).iter().rev() {
                stack.push((depth + 1, *child));
            }
        }
        out
    }

    /// Hex sha256 of the canonical JSON of every node
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        if let Err(err) = serde_json::to_writer(&mut hasher, &self.nodes) {
            tracing::warn!(error = %err, "Failed to serialize alarm graph for fingerprint");
        }
        hex::encode(hasher.finalize())
    }
}
