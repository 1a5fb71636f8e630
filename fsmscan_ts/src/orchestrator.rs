//! Chart assembly across the state definitions of a machine,
//! and across the machines of a run.

use crate::assembler::assemble_state;
use crate::source::{Lookup, SourceContext, SourceFile};
use fsmscan_core::{
    ChartDocument, ChartType, ConfigError, MachineChart, MachineConfig, ParallelChart,
    RegionChart, StateNode, States, Topology,
};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to extract a machine.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("input file '{}' of machine `{id}` is not among the loaded sources", .path.display())]
    MissingSource { id: String, path: PathBuf },
}

impl ExtractError {
    /// Id of the machine that failed.
    pub fn machine(&self) -> &str {
        match self {
            ExtractError::Config(err) => &err.id,
            ExtractError::MissingSource { id, .. } => id,
        }
    }
}

/// State lookups on behalf of one machine.
struct Scope<'a> {
    context: &'a SourceContext,
    file: &'a SourceFile,
    machine: &'a str,
}

impl Scope<'_> {
    fn state(&self, name: &str) -> Option<StateNode> {
        match self.context.lookup(self.file, name) {
            Lookup::Found(declaration) => Some(assemble_state(&declaration)),
            Lookup::Missing => {
                warn!(
                    target: "extractor",
                    "machine `{}`: class `{name}` not found, state skipped",
                    self.machine
                );
                None
            }
            Lookup::Ambiguous(paths) => {
                let paths: Vec<String> = paths.iter().map(|path| format!("'{}'", path.display())).collect();
                warn!(
                    target: "extractor",
                    "machine `{}`: class `{name}` is declared in {}, state skipped",
                    self.machine,
                    paths.join(", ")
                );
                None
            }
        }
    }

    fn states(&self, classes: &[String]) -> States {
        classes
            .iter()
            .filter_map(|name| self.state(name).map(|node| (name.clone(), node)))
            .collect()
    }

    fn check_initial(&self, initial: &str, states: &States, within: Option<&str>) {
        if !states.contains_key(initial) {
            let scope = within.map_or_else(String::new, |within| format!(" in `{within}`"));
            warn!(
                target: "extractor",
                "machine `{}`{scope}: initial state `{initial}` is not among the extracted states",
                self.machine
            );
        }
    }
}

/// Extracts the chart of one machine.
///
/// The configuration shape is validated before any source is looked at.
/// Missing state definitions are skipped with a warning, they do not fail the machine.
pub fn extract_one(context: &SourceContext, config: &MachineConfig) -> Result<ChartDocument, ExtractError> {
    let topology = config.topology()?;
    let file = context
        .file(&config.input)
        .ok_or_else(|| ExtractError::MissingSource {
            id: config.id.clone(),
            path: config.input.clone(),
        })?;
    info!(target: "extractor", "extracting machine `{}` from '{}'", config.id, file.path().display());
    let scope = Scope {
        context,
        file,
        machine: &config.id,
    };
    let chart = match topology {
        Topology::Flat {
            initial,
            classes,
            children,
        } => {
            let mut states = scope.states(classes);
            scope.check_initial(initial, &states, None);
            if let Some(children) = children {
                if let Some(parent) = states.get_mut(initial) {
                    let nested = scope.states(&children.classes);
                    scope.check_initial(&children.initial_state, &nested, Some(initial));
                    parent.initial = Some(children.initial_state.clone());
                    parent.states = Some(nested);
                } else {
                    warn!(
                        target: "extractor",
                        "machine `{}`: nested states dropped, their parent `{initial}` is missing",
                        config.id
                    );
                }
            }
            ChartDocument::Machine(MachineChart {
                id: config.id.clone(),
                initial: initial.to_string(),
                description: config.description.clone(),
                states,
            })
        }
        Topology::Parallel { regions } => {
            if config.children.is_some() {
                warn!(
                    target: "extractor",
                    "machine `{}`: `children` is ignored in a parallel machine",
                    config.id
                );
            }
            let mut states = BTreeMap::new();
            for region in regions {
                let region_states = scope.states(&region.classes);
                scope.check_initial(&region.initial_state, &region_states, Some(&region.name));
                let chart = RegionChart {
                    initial: region.initial_state.clone(),
                    states: region_states,
                };
                if states.insert(region.name.clone(), chart).is_some() {
                    warn!(
                        target: "extractor",
                        "machine `{}`: region `{}` is declared twice, the last one is kept",
                        config.id,
                        region.name
                    );
                }
            }
            ChartDocument::Parallel(ParallelChart {
                id: config.id.clone(),
                chart_type: ChartType::Parallel,
                description: config.description.clone(),
                states,
            })
        }
    };
    Ok(chart)
}

/// Outcome of a run over several machines.
#[derive(Debug, Default)]
pub struct Batch<'c> {
    /// Extracted charts, in configuration order.
    pub charts: Vec<(&'c MachineConfig, ChartDocument)>,
    /// Machines that could not be extracted.
    pub failures: Vec<(&'c MachineConfig, ExtractError)>,
}

impl Batch<'_> {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Extracts every machine, independently: a failing machine does not affect the others.
pub fn extract_many<'c>(context: &SourceContext, configs: &'c [MachineConfig]) -> Batch<'c> {
    let mut batch = Batch::default();
    for config in configs {
        match extract_one(context, config) {
            Ok(chart) => batch.charts.push((config, chart)),
            Err(err) => {
                error!(target: "extractor", "machine `{}` failed: {err}", config.id);
                batch.failures.push((config, err));
            }
        }
    }
    info!(
        target: "extractor",
        "extracted {} machines, {} failed",
        batch.charts.len(),
        batch.failures.len()
    );
    batch
}
