use anyhow::{Context, bail};
use clap::Parser;
use fsmscan_core::{MachineConfig, Project};
use fsmscan_ts::{ChartDocument, SourceContext, extract_many};
use log::{info, warn};
use std::path::{Path, PathBuf};

const DEFAULT_SOURCES: &str = "**/*.ts";

/// Extracts statecharts from annotated TypeScript state definitions
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path of the machine configuration file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    config: PathBuf,
    /// Glob of source files to load, relative to the root [default: the project's sources, or **/*.ts]
    #[arg(short, long = "source", value_name = "GLOB")]
    sources: Vec<String>,
    /// Directory the source globs are matched under [default: directory of the configuration file]
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    root: Option<PathBuf>,
    /// Only extract the machine with this id (repeatable)
    #[arg(long = "machine", value_name = "ID")]
    machines: Vec<String>,
    /// Emit compact instead of pretty JSON
    #[arg(long, default_value = "false")]
    compact: bool,
}

impl Cli {
    pub fn run(&self) -> anyhow::Result<()> {
        let project = fsmscan_core::load(&self.config)?;
        let machines = self.selected(&project);
        let context = self.load_sources(&project, &machines)?;
        let batch = extract_many(&context, &machines);
        for (config, chart) in &batch.charts {
            self.emit(config, chart)?;
        }
        eprintln!("extracted {}, failed {}", batch.charts.len(), batch.failures.len());
        if !batch.is_success() {
            let failed: Vec<&str> = batch.failures.iter().map(|(_, err)| err.machine()).collect();
            bail!("extraction failed for: {}", failed.join(", "));
        }
        Ok(())
    }

    fn selected(&self, project: &Project) -> Vec<MachineConfig> {
        if self.machines.is_empty() {
            return project.machines.clone();
        }
        for id in &self.machines {
            if !project.machines.iter().any(|machine| &machine.id == id) {
                warn!("no machine `{id}` in '{}'", self.config.display());
            }
        }
        project
            .machines
            .iter()
            .filter(|machine| self.machines.contains(&machine.id))
            .cloned()
            .collect()
    }

    fn load_sources(&self, project: &Project, machines: &[MachineConfig]) -> anyhow::Result<SourceContext> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None if project.base.as_os_str().is_empty() => PathBuf::from("."),
            None => project.base.clone(),
        };
        let patterns = if !self.sources.is_empty() {
            self.sources.clone()
        } else if !project.sources.is_empty() {
            project.sources.clone()
        } else {
            vec![DEFAULT_SOURCES.to_string()]
        };
        let mut context = SourceContext::new();
        context
            .discover(&root, &patterns)
            .with_context(|| format!("failed to load sources under '{}'", root.display()))?;
        // inputs outside the globs are loaded on their own
        for machine in machines {
            if context.file(&machine.input).is_none() {
                if let Err(err) = context.add_file(&machine.input) {
                    warn!("machine `{}`: {err}", machine.id);
                }
            }
        }
        info!("{} source files loaded", context.len());
        Ok(context)
    }

    fn emit(&self, config: &MachineConfig, chart: &ChartDocument) -> anyhow::Result<()> {
        let json = chart
            .to_json(!self.compact)
            .with_context(|| format!("failed to serialize machine `{}`", config.id))?;
        match &config.output {
            Some(output) => write_chart(output, &json),
            None => {
                println!("{json}");
                Ok(())
            }
        }
    }
}

fn write_chart(path: &Path, json: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    std::fs::write(path, format!("{json}\n"))
        .with_context(|| format!("failed to write chart '{}'", path.display()))?;
    info!("chart written to '{}'", path.display());
    Ok(())
}
