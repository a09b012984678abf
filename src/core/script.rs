//! Experiment files.
//!
//! ```text
//! # blocking
//! @model=Le Pelley; alpha_A=0.2
//! Blocking|10A+|10AB+
//! Control|10C+|10AB+
//! ```
//!
//! Each experiment line is `name|phase|phase|...`. A line starting with `@`
//! holds `;`-separated `name=value` directives that apply to every experiment
//! line after it.

use crate::config::RunArgs;
use crate::error::{PalmsError, PalmsResult};
use crate::experiment::{Experiment, PhaseResults};

/// A parsed experiment file: each experiment with the arguments in force on its line.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentFile {
    pub entries: Vec<(RunArgs, Experiment)>,
}

impl ExperimentFile {
    pub fn parse(text: &str, base_args: &RunArgs) -> PalmsResult<Self> {
        let mut args = base_args.clone();
        let mut entries = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(directives) = line.strip_prefix('@') {
                for prop in directives.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                    let (name, value) = prop
                        .split_once('=')
                        .ok_or_else(|| PalmsError::Directive(prop.to_string()))?;
                    args.set_value(name, value)?;
                }
                continue;
            }

            let mut fields = line.split('|');
            let name = fields.next().unwrap_or_default();
            let phases: Vec<&str> = fields.collect();
            entries.push((args.clone(), Experiment::new(name, &phases)?));
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every experiment and merge their series phase by phase.
    ///
    /// Phase `i` of the result holds phase `i` of every experiment that has one.
    pub fn run(&self) -> PalmsResult<Vec<PhaseResults>> {
        let mut merged: Vec<PhaseResults> = Vec::new();

        for (args, experiment) in &self.entries {
            let local = experiment.run_all_phases(args)?;
            if merged.len() < local.len() {
                merged.resize_with(local.len(), PhaseResults::new);
            }
            for (into, phase) in merged.iter_mut().zip(local) {
                into.extend(phase);
            }
        }

        Ok(merged)
    }
}
