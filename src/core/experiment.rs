use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::RunArgs;
use crate::environment::Environment;
use crate::error::{PalmsError, PalmsResult};
use crate::group::{Group, PhaseHistory, PhaseOverrides};
use crate::models::build_rule;
use crate::names::CueConfig;
use crate::phase::Phase;
use crate::stimulus::{Stimulus, StimulusHistory};

/// Series of one phase keyed `"{experiment} - {cs}"`.
pub type PhaseResults = BTreeMap<String, StimulusHistory>;

/// One named subject group and the phases it goes through.
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub name: String,
    pub phases: Vec<Phase>,
    /// Enable configural cues for this experiment whatever the run arguments say.
    pub force_configural: bool,
}

/// Seed of one repetition of one randomized phase.
fn repetition_seed(seed: u64, phase: usize, repetition: usize) -> u64 {
    seed.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ ((phase as u64) << 32)
        ^ repetition as u64
}

/// Outcome of one shuffled repetition.
struct Repetition {
    hist: PhaseHistory,
    env: Environment,
    prev_lamda: f64,
}

impl Experiment {
    pub fn new<S: AsRef<str>>(name: &str, phase_strs: &[S]) -> PalmsResult<Self> {
        let phases = phase_strs
            .iter()
            .map(|p| Phase::parse(p.as_ref()))
            .collect::<PalmsResult<Vec<_>>>()?;

        Ok(Self {
            name: name.trim().to_string(),
            phases,
            force_configural: false,
        })
    }

    pub fn with_configural(mut self, force: bool) -> Self {
        self.force_configural = force;
        self
    }

    pub fn cues(&self, args: &RunArgs) -> CueConfig {
        CueConfig {
            configural: args.configural_cues || self.force_configural,
        }
    }

    /// Every unit that learns in some phase, with its initial parameters.
    pub fn initial_group(&self, args: &RunArgs) -> PalmsResult<Group> {
        args.validate()?;
        let cues = self.cues(args);

        let mut env = Environment::new();
        for phase in &self.phases {
            for cs in phase.cs(cues)? {
                if !env.contains(&cs) {
                    let init = args.stimulus_init(&cs);
                    env.insert(Stimulus::new(cs, init));
                }
            }
        }

        let params = args.model_params();
        let rule = build_rule(&args.adaptive_type, params)?;
        Group::new(&self.name, env, rule, params, args.window_size, cues)
    }

    /// Run every phase from a fresh group and key the series by experiment.
    pub fn run_all_phases(&self, args: &RunArgs) -> PalmsResult<Vec<PhaseResults>> {
        tracing::info!(
            experiment = %self.name,
            model = %args.adaptive_type,
            phases = self.phases.len(),
            configural = self.cues(args).configural,
            "running experiment"
        );

        let mut group = self.initial_group(args)?;
        let results = self.run_group_experiments(&mut group, args)?;
        self.group_results(&results, args)
    }

    /// Thread one group through all phases.
    ///
    /// A randomized phase runs `num_trials` shuffled repetitions from the same
    /// starting state. Its history is the position-wise average of the
    /// repetitions, and the group continues from the average of their final
    /// environments.
    pub fn run_group_experiments(
        &self,
        g: &mut Group,
        args: &RunArgs,
    ) -> PalmsResult<Vec<PhaseHistory>> {
        let seed = args.seed.unwrap_or(0);
        let mut results = Vec::with_capacity(self.phases.len());

        for (index, phase) in self.phases.iter().enumerate() {
            let overrides = PhaseOverrides {
                lamda: phase.lamda,
                beta: phase.beta,
            };

            if !phase.rand {
                tracing::debug!(experiment = %self.name, phase = index + 1, "running phase");
                results.push(g.run_phase(&phase.parts, overrides)?);
                continue;
            }

            if args.num_trials == 0 {
                return Err(PalmsError::InvalidConfig(format!(
                    "phase \"{}\" is randomized but num_trials is 0",
                    phase.phase_str
                )));
            }

            tracing::debug!(
                experiment = %self.name,
                phase = index + 1,
                repetitions = args.num_trials,
                "running randomized phase"
            );

            let base: &Group = g;
            let run_one = |repetition: usize| -> PalmsResult<Repetition> {
                let mut rng = ChaCha8Rng::seed_from_u64(repetition_seed(seed, index, repetition));
                let mut parts = phase.parts.clone();
                parts.shuffle(&mut rng);

                let mut local = base.clone();
                let hist = local.run_phase(&parts, overrides)?;
                Ok(Repetition {
                    hist,
                    prev_lamda: local.prev_lamda(),
                    env: local.env,
                })
            };

            #[cfg(feature = "parallel")]
            let runs = (0..args.num_trials)
                .into_par_iter()
                .map(run_one)
                .collect::<PalmsResult<Vec<_>>>()?;

            #[cfg(not(feature = "parallel"))]
            let runs = (0..args.num_trials)
                .map(run_one)
                .collect::<PalmsResult<Vec<_>>>()?;

            let hists: Vec<PhaseHistory> = runs.iter().map(|r| r.hist.clone()).collect();
            let envs: Vec<Environment> = runs.iter().map(|r| r.env.clone()).collect();
            let prev_lamda = runs.last().map_or(g.prev_lamda(), |r| r.prev_lamda);

            results.push(PhaseHistory::average(&hists));
            if let Some(env) = Environment::average(&envs) {
                g.env = env;
            }
            g.set_prev_lamda(prev_lamda);
        }

        Ok(results)
    }

    /// Key every reported series of each phase by `"{name} - {cs}"`.
    pub fn group_results(
        &self,
        results: &[PhaseHistory],
        args: &RunArgs,
    ) -> PalmsResult<Vec<PhaseResults>> {
        let cues = self.cues(args);
        self.phases
            .iter()
            .zip(results)
            .map(|(phase, hist)| {
                let mut out = PhaseResults::new();
                for cs in phase.compound_cs(cues)? {
                    if let Some(series) = hist.get(&cs) {
                        out.insert(format!("{} - {}", self.name, cs), series.clone());
                    }
                }
                Ok(out)
            })
            .collect()
    }
}
