use anyhow::{Context, anyhow};
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extraction request for one machine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineConfig {
    /// Source file declaring the machine's state definitions.
    pub input: PathBuf,
    /// Machine id, copied into the chart.
    pub id: String,
    /// Free-text documentation, copied into the chart.
    #[serde(default)]
    pub description: Option<String>,
    /// Initial state of a flat machine.
    #[serde(default)]
    pub initial_state: Option<String>,
    /// State definitions of a flat machine.
    #[serde(default)]
    pub classes: Option<Vec<String>>,
    /// Regions of a parallel machine.
    #[serde(default)]
    pub parallel: Option<ParallelConfig>,
    /// States nested under the initial state of a flat machine.
    #[serde(default)]
    pub children: Option<ChildrenConfig>,
    /// Where the chart is written.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// Regions of a parallel machine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParallelConfig {
    /// The orthogonal regions, each extracted independently.
    pub regions: Vec<RegionConfig>,
}

/// One orthogonal region.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionConfig {
    /// Region name, key of the region in the chart.
    pub name: String,
    /// Initial state of the region.
    pub initial_state: String,
    /// State definitions of the region.
    pub classes: Vec<String>,
}

/// Second layer of states nested under the initial state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildrenConfig {
    /// Context field holding the nested machine at run time.
    /// Not part of the chart.
    pub context_property: String,
    /// Initial nested state.
    pub initial_state: String,
    /// Nested state definitions.
    pub classes: Vec<String>,
}

/// Shape of a machine, as validated by [`MachineConfig::topology`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology<'a> {
    /// Flat machine, with optional nested states under the initial state.
    Flat {
        /// Initial state.
        initial: &'a str,
        /// Requested state definitions.
        classes: &'a [String],
        /// Nested states of the initial state.
        children: Option<&'a ChildrenConfig>,
    },
    /// Parallel machine.
    Parallel {
        /// Requested regions.
        regions: &'a [RegionConfig],
    },
}

/// The ways a machine configuration can fail to describe a topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// Neither `initialState`+`classes` nor `parallel`.
    #[error("either `initialState` and `classes` or `parallel` must be given")]
    Missing,
    /// Both shapes at once.
    #[error("`parallel` cannot be combined with `initialState` or `classes`")]
    Ambiguous,
    /// `initialState` without `classes`.
    #[error("`initialState` is given without `classes`")]
    MissingClasses,
    /// `classes` without `initialState`.
    #[error("`classes` are given without `initialState`")]
    MissingInitialState,
    /// `parallel` with an empty region list.
    #[error("`parallel` declares no regions")]
    NoRegions,
}

/// A machine configuration that cannot be processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration for machine `{id}`")]
pub struct ConfigError {
    /// Id of the offending machine.
    pub id: String,
    /// What is wrong with it.
    #[source]
    pub kind: TopologyError,
}

impl MachineConfig {
    /// Validates the configuration shape.
    ///
    /// Exactly one of `initialState`+`classes` or `parallel` must be given.
    pub fn topology(&self) -> Result<Topology<'_>, ConfigError> {
        let error = |kind| ConfigError {
            id: self.id.clone(),
            kind,
        };
        match (&self.parallel, &self.initial_state, &self.classes) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(error(TopologyError::Ambiguous)),
            (Some(parallel), None, None) if parallel.regions.is_empty() => {
                Err(error(TopologyError::NoRegions))
            }
            (Some(parallel), None, None) => Ok(Topology::Parallel {
                regions: &parallel.regions,
            }),
            (None, Some(initial), Some(classes)) => Ok(Topology::Flat {
                initial,
                classes,
                children: self.children.as_ref(),
            }),
            (None, Some(_), None) => Err(error(TopologyError::MissingClasses)),
            (None, None, Some(_)) => Err(error(TopologyError::MissingInitialState)),
            (None, None, None) => Err(error(TopologyError::Missing)),
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.input.is_relative() {
            self.input = base.join(&self.input);
        }
        if let Some(output) = self.output.as_mut().filter(|output| output.is_relative()) {
            *output = base.join(&*output);
        }
    }
}

/// The content of a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    /// Source globs declared by the file.
    pub sources: Vec<String>,
    /// Machines to extract.
    pub machines: Vec<MachineConfig>,
    /// Directory of the configuration file, relative paths are resolved against it.
    pub base: PathBuf,
}

#[derive(Deserialize)]
struct ProjectFile {
    #[serde(default)]
    sources: Vec<String>,
    machines: Vec<MachineConfig>,
}

impl Project {
    /// Parses a configuration from JSON text.
    ///
    /// Accepted shapes: one machine object, an array of machines,
    /// or `{ "sources": [...], "machines": [...] }`.
    /// Relative paths are resolved against `base`.
    pub fn from_json(json: &str, base: &Path) -> anyhow::Result<Project> {
        let value: Value = serde_json::from_str(json).context("configuration is not valid JSON")?;
        let (sources, mut machines) = match value {
            Value::Array(list) => {
                let machines: Vec<MachineConfig> = serde_json::from_value(Value::Array(list))
                    .context("failed to parse machine list")?;
                (Vec::new(), machines)
            }
            Value::Object(object) if object.contains_key("machines") => {
                let project: ProjectFile = serde_json::from_value(Value::Object(object))
                    .context("failed to parse project")?;
                (project.sources, project.machines)
            }
            Value::Object(object) => {
                let machine: MachineConfig = serde_json::from_value(Value::Object(object))
                    .context("failed to parse machine")?;
                (Vec::new(), vec![machine])
            }
            _ => return Err(anyhow!("configuration must be an object or an array")),
        };
        if machines.is_empty() {
            warn!("configuration declares no machines");
        }
        machines
            .iter_mut()
            .for_each(|machine| machine.resolve_paths(base));
        Ok(Project {
            sources,
            machines,
            base: base.to_path_buf(),
        })
    }
}

/// Loads a configuration file.
pub fn load(path: &Path) -> anyhow::Result<Project> {
    info!("loading configuration file '{}'", path.display());
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file '{}'", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Project::from_json(&json, base)
        .with_context(|| format!("failed to parse configuration file '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(json: &str) -> MachineConfig {
        serde_json::from_str(json).expect("valid machine json")
    }

    #[test]
    fn flat_topology() -> Result<(), ConfigError> {
        let config = machine(r#"{"input": "a.ts", "id": "m", "initialState": "A", "classes": ["A", "B"]}"#);
        let Topology::Flat {
            initial,
            classes,
            children,
        } = config.topology()?
        else {
            panic!("expected a flat topology");
        };
        assert_eq!(initial, "A");
        assert_eq!(classes, ["A".to_string(), "B".to_string()]);
        assert!(children.is_none());
        Ok(())
    }

    #[test]
    fn parallel_topology() -> Result<(), ConfigError> {
        let config = machine(
            r#"{"input": "a.ts", "id": "m",
                "parallel": {"regions": [{"name": "r", "initialState": "A", "classes": ["A"]}]}}"#,
        );
        assert!(matches!(config.topology()?, Topology::Parallel { regions } if regions.len() == 1));
        Ok(())
    }

    #[test]
    fn missing_topology_names_machine() {
        let config = machine(r#"{"input": "a.ts", "id": "lonely"}"#);
        let err = config.topology().expect_err("no topology");
        assert_eq!(err.id, "lonely");
        assert_eq!(err.kind, TopologyError::Missing);
        assert!(err.to_string().contains("lonely"));
    }

    #[test]
    fn incomplete_or_ambiguous_topology() {
        let config = machine(r#"{"input": "a.ts", "id": "m", "initialState": "A"}"#);
        assert_eq!(config.topology().unwrap_err().kind, TopologyError::MissingClasses);
        let config = machine(r#"{"input": "a.ts", "id": "m", "classes": ["A"]}"#);
        assert_eq!(config.topology().unwrap_err().kind, TopologyError::MissingInitialState);
        let config = machine(
            r#"{"input": "a.ts", "id": "m", "initialState": "A", "classes": ["A"],
                "parallel": {"regions": [{"name": "r", "initialState": "A", "classes": ["A"]}]}}"#,
        );
        assert_eq!(config.topology().unwrap_err().kind, TopologyError::Ambiguous);
        let config = machine(r#"{"input": "a.ts", "id": "m", "parallel": {"regions": []}}"#);
        assert_eq!(config.topology().unwrap_err().kind, TopologyError::NoRegions);
    }

    #[test]
    fn children_config() {
        let config = machine(
            r#"{"input": "a.ts", "id": "m", "initialState": "A", "classes": ["A"],
                "children": {"contextProperty": "child", "initialState": "X", "classes": ["X", "Y"]}}"#,
        );
        let children = config.children.expect("children");
        assert_eq!(children.context_property, "child");
        assert_eq!(children.initial_state, "X");
    }

    #[test]
    fn project_shapes() -> anyhow::Result<()> {
        let base = Path::new("configs");
        let single = Project::from_json(
            r#"{"input": "src/a.ts", "id": "m", "initialState": "A", "classes": ["A"], "output": "out/m.json"}"#,
            base,
        )?;
        assert_eq!(single.machines.len(), 1);
        assert_eq!(single.machines[0].input, Path::new("configs/src/a.ts"));
        assert_eq!(
            single.machines[0].output.as_deref(),
            Some(Path::new("configs/out/m.json"))
        );

        let list = Project::from_json(
            r#"[{"input": "a.ts", "id": "m1"}, {"input": "/abs/b.ts", "id": "m2"}]"#,
            base,
        )?;
        assert_eq!(list.machines.len(), 2);
        assert_eq!(list.machines[1].input, Path::new("/abs/b.ts"));

        let project = Project::from_json(
            r#"{"sources": ["src/**/*.ts"], "machines": [{"input": "a.ts", "id": "m"}]}"#,
            base,
        )?;
        assert_eq!(project.sources, vec!["src/**/*.ts".to_string()]);
        assert_eq!(project.machines[0].id, "m");

        assert!(Project::from_json("42", base).is_err());
        assert!(Project::from_json(r#"{"id": "no input"}"#, base).is_err());
        Ok(())
    }

    #[test]
    fn load_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("fsm.json");
        std::fs::write(&path, r#"[{"input": "a.ts", "id": "m", "initialState": "A", "classes": ["A"]}]"#)?;
        let project = load(&path)?;
        assert_eq!(project.base, dir.path());
        assert_eq!(project.machines[0].input, dir.path().join("a.ts"));
        assert!(load(&dir.path().join("missing.json")).is_err());
        Ok(())
    }
}
