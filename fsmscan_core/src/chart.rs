use crate::{Metadata, ServiceDescriptor};
use serde::Serialize;
use std::collections::BTreeMap;

/// States of a chart (or of a region) by name.
pub type States = BTreeMap<String, StateNode>;

/// The chart emitted for one machine.
///
/// Field names and nesting follow the schema expected by statechart visualizers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartDocument {
    /// Flat chart, possibly with one level of nested states.
    Machine(MachineChart),
    /// Chart made of independent orthogonal regions.
    Parallel(ParallelChart),
}

impl ChartDocument {
    /// The machine id.
    pub fn id(&self) -> &str {
        match self {
            ChartDocument::Machine(chart) => &chart.id,
            ChartDocument::Parallel(chart) => &chart.id,
        }
    }

    /// Serializes the chart as JSON.
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

/// Flat or hierarchical chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineChart {
    /// Machine id.
    pub id: String,
    /// Name of the initial state.
    pub initial: String,
    /// Free-text documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The states of the machine.
    pub states: States,
}

/// Marker for the `"type": "parallel"` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    /// Orthogonal regions active at the same time.
    Parallel,
}

/// Parallel chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParallelChart {
    /// Machine id.
    pub id: String,
    /// Always [`ChartType::Parallel`].
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    /// Free-text documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The regions by name.
    pub states: BTreeMap<String, RegionChart>,
}

/// One orthogonal region of a parallel chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionChart {
    /// Name of the initial state of the region.
    pub initial: String,
    /// The states of the region.
    pub states: States,
}

/// One state of a chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StateNode {
    /// Outgoing transitions by event name.
    pub on: BTreeMap<String, TransitionSpec>,
    /// Services invoked while in this state.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invoke: Vec<InvokeSpec>,
    /// Initial nested state, only on the designated parent state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    /// Nested states, only on the designated parent state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states: Option<States>,
}

/// One event-triggered transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionSpec {
    /// Name of the destination state.
    pub target: String,
    /// Free-text documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Guard names joined with `" && "`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cond: Option<String>,
    /// Action names in declaration order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
}

impl TransitionSpec {
    /// Renders a transition from a metadata record, if it has a target.
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        metadata.target.as_ref().map(|target| TransitionSpec {
            target: target.clone(),
            description: metadata.description.clone(),
            cond: metadata.cond(),
            actions: metadata.action_names(),
        })
    }
}

/// Wrapper around a state name, as in `"onDone": { "target": "Loaded" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetRef {
    /// Name of the destination state.
    pub target: String,
}

/// One invoked service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeSpec {
    /// Name of the service source.
    pub src: String,
    /// Transition taken on completion.
    pub on_done: TargetRef,
    /// Transition taken on failure.
    pub on_error: TargetRef,
    /// Free-text documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&ServiceDescriptor> for InvokeSpec {
    fn from(service: &ServiceDescriptor) -> Self {
        InvokeSpec {
            src: service.src.clone(),
            on_done: TargetRef {
                target: service.on_done.clone(),
            },
            on_error: TargetRef {
                target: service.on_error.clone(),
            },
            description: service.description.clone(),
        }
    }
}
