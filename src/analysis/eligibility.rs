//! Pair eligibility rules.
//!
//! Two flow instances are compared only when they belong to the same flow
//! group. The default rule groups instances whose flow ids are equal or
//! differ by a fixed stride (related flows share an id space offset by the
//! number of sources in the scenario).

use std::collections::HashMap;

use super::comparator::ComparisonError;
use super::types::FlowRecord;

/// Decides which ordered index pairs take part in a comparison
pub trait PairEligibility {
    fn is_eligible(&self, i: usize, j: usize) -> bool;

    /// All `j` in `0..n` eligible for `i`, ascending.
    ///
    /// The default scans every index; rules with an index should override it.
    fn partners(&self, i: usize, n: usize) -> Vec<usize> {
        (0..n).filter(|&j| self.is_eligible(i, j)).collect()
    }
}

impl<F> PairEligibility for F
where
    F: Fn(usize, usize) -> bool,
{
    fn is_eligible(&self, i: usize, j: usize) -> bool {
        self(i, j)
    }
}

/// Flow-id grouping: `j` is eligible for `i` when `i != j` and
/// `flow[j] == flow[i]` or `flow[j] == flow[i] + stride`.
#[derive(Debug, Clone)]
pub struct FlowGroups {
    flow_ids: Vec<i64>,
    stride: Option<i64>,
    by_flow: HashMap<i64, Vec<usize>>,
    endpoints: Option<Vec<(i64, i64)>>,
}

impl FlowGroups {
    pub fn new(flow_ids: Vec<i64>, stride: Option<i64>) -> Self {
        let mut by_flow: HashMap<i64, Vec<usize>> = HashMap::new();
        for (idx, &id) in flow_ids.iter().enumerate() {
            by_flow.entry(id).or_default().push(idx);
        }
        // a zero stride is the same as no stride
        let stride = stride.filter(|&s| s != 0);
        Self {
            flow_ids,
            stride,
            by_flow,
            endpoints: None,
        }
    }

    pub fn from_records(records: &[FlowRecord], stride: Option<i64>) -> Self {
        Self::new(records.iter().map(|r| r.flow_id).collect(), stride)
    }

    /// Additionally require both instances to share `(source, destination)`
    pub fn with_endpoints(mut self, endpoints: Vec<(i64, i64)>) -> Result<Self, ComparisonError> {
        if endpoints.len() != self.flow_ids.len() {
            return Err(ComparisonError::ShapeMismatch {
                series: "topology".to_string(),
                expected: self.flow_ids.len(),
                actual: endpoints.len(),
            });
        }
        self.endpoints = Some(endpoints);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.flow_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flow_ids.is_empty()
    }

    pub fn stride(&self) -> Option<i64> {
        self.stride
    }

    /// Number of distinct flow ids
    pub fn group_count(&self) -> usize {
        self.by_flow.len()
    }

    fn same_endpoints(&self, i: usize, j: usize) -> bool {
        match &self.endpoints {
            Some(endpoints) => endpoints[i] == endpoints[j],
            None => true,
        }
    }
}

impl PairEligibility for FlowGroups {
    fn is_eligible(&self, i: usize, j: usize) -> bool {
        if i == j || i >= self.flow_ids.len() || j >= self.flow_ids.len() {
            return false;
        }
        let (a, b) = (self.flow_ids[i], self.flow_ids[j]);
        let grouped = a == b || self.stride.is_some_and(|s| a.checked_add(s) == Some(b));
        grouped && self.same_endpoints(i, j)
    }

    fn partners(&self, i: usize, n: usize) -> Vec<usize> {
        let Some(&id) = self.flow_ids.get(i) else {
            return Vec::new();
        };

        let empty = Vec::new();
        let same = self.by_flow.get(&id).unwrap_or(&empty);
        let shifted = self
            .stride
            .and_then(|s| id.checked_add(s))
            .and_then(|target| self.by_flow.get(&target))
            .unwrap_or(&empty);

        // the two groups are disjoint since the stride is nonzero
        let mut out: Vec<usize> = same
            .iter()
            .chain(shifted)
            .copied()
            .filter(|&j| j != i && j < n && self.same_endpoints(i, j))
            .collect();
        out.sort_unstable();
        out
    }
}
