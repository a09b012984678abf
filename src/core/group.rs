use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::error::{PalmsError, PalmsResult};
use crate::models::{LearningRule, ModelParams, Signals};
use crate::names::{self, CueConfig};
use crate::phase::{Reinforcement, TrialPart};
use crate::stimulus::{Stimulus, StimulusHistory};

/// Per-series histories recorded while running one phase.
///
/// Each elementary unit and each presented compound gets its own series. A
/// series starts with the state before its first presentation and grows by one
/// snapshot per presentation, so its last entry is the prediction for the next,
/// not yet seen, trial.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhaseHistory {
    pub series: BTreeMap<String, StimulusHistory>,
}

impl PhaseHistory {
    pub fn get(&self, name: &str) -> Option<&StimulusHistory> {
        self.series.get(name)
    }

    /// Position-wise average of the histories of several repetitions.
    pub fn average(runs: &[PhaseHistory]) -> PhaseHistory {
        let mut names: Vec<&String> = runs.iter().flat_map(|r| r.series.keys()).collect();
        names.sort();
        names.dedup();

        let series = names
            .into_iter()
            .map(|name| {
                let hs: Vec<&StimulusHistory> =
                    runs.iter().filter_map(|r| r.series.get(name)).collect();
                (name.clone(), StimulusHistory::average(&hs))
            })
            .collect();

        PhaseHistory { series }
    }
}

/// Phase-level overrides of the group defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseOverrides {
    pub lamda: Option<f64>,
    pub beta: Option<f64>,
}

/// Largest and second largest value among the constituents of a trial-part.
#[derive(Debug, Clone, Copy)]
struct TopTwo {
    best: Option<(usize, f64)>,
    second: Option<f64>,
}

impl TopTwo {
    fn of(values: impl Iterator<Item = f64>) -> Self {
        let mut top = TopTwo {
            best: None,
            second: None,
        };
        for (i, v) in values.enumerate() {
            match top.best {
                Some((_, b)) if v <= b => {
                    if top.second.map_or(true, |s| v > s) {
                        top.second = Some(v);
                    }
                }
                _ => {
                    top.second = top.best.map(|(_, b)| b);
                    top.best = Some((i, v));
                }
            }
        }
        top
    }

    /// Largest value among every constituent except `i`.
    fn excluding(&self, i: usize) -> f64 {
        match self.best {
            Some((j, _)) if j == i => self.second.unwrap_or(0.0),
            Some((_, b)) => b,
            None => 0.0,
        }
    }
}

/// One subject group: its environment and the learning rule it follows.
#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub env: Environment,
    rule: Arc<dyn LearningRule>,
    params: ModelParams,
    window_size: Option<usize>,
    cues: CueConfig,
    prev_lamda: f64,
}

impl Group {
    pub fn new(
        name: impl Into<String>,
        env: Environment,
        rule: Arc<dyn LearningRule>,
        params: ModelParams,
        window_size: Option<usize>,
        cues: CueConfig,
    ) -> PalmsResult<Self> {
        if window_size == Some(0) {
            return Err(PalmsError::InvalidConfig(
                "window size must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            name: name.into(),
            env,
            rule,
            params,
            window_size,
            cues,
            prev_lamda: params.lamda,
        })
    }

    pub fn prev_lamda(&self) -> f64 {
        self.prev_lamda
    }

    pub(crate) fn set_prev_lamda(&mut self, lamda: f64) {
        self.prev_lamda = lamda;
    }

    /// β, λ and sign of a trial-part under this phase's overrides.
    fn resolve(&self, us: Reinforcement, overrides: PhaseOverrides) -> (f64, f64, f64) {
        let betap = overrides.beta.unwrap_or(self.params.betap);
        let lamda = overrides.lamda.unwrap_or(self.params.lamda);
        match us {
            Reinforcement::Plus => (betap, lamda, 1.0),
            Reinforcement::SecondOrder => (2.0 * betap, lamda, 1.0),
            Reinforcement::Minus => (self.params.betan, 0.0, -1.0),
        }
    }

    /// Run the trial-parts of one phase in the given order.
    ///
    /// Mutates the environment once per constituent per trial-part. All
    /// constituents of a trial-part see the same aggregate prediction, taken
    /// before any of them is updated.
    pub fn run_phase(
        &mut self,
        parts: &[TrialPart],
        overrides: PhaseOverrides,
    ) -> PalmsResult<PhaseHistory> {
        let mut hist: BTreeMap<String, StimulusHistory> = BTreeMap::new();

        for part in parts {
            let (beta, lamda, sign) = self.resolve(part.us, overrides);
            let constituents = names::list_cs(&part.cs, self.cues)?;

            let mut sigma = 0.0;
            let mut sigma_e = 0.0;
            let mut sigma_i = 0.0;
            let mut assocs = Vec::with_capacity(constituents.len());
            for cs in &constituents {
                let s = self.env.get(cs)?;
                sigma += s.assoc;
                sigma_e += s.ve;
                sigma_i += s.vi;
                assocs.push(s.assoc);
            }
            let top = TopTwo::of(assocs.into_iter());

            // A lone elementary cue already has its own series.
            let track_compound = !constituents.iter().any(|cs| *cs == part.cs);
            if track_compound && !hist.contains_key(&part.cs) {
                let before = self.env.lookup(&part.cs, self.cues)?;
                hist.insert(part.cs.clone(), StimulusHistory::starting_with(&before));
            }

            for (i, cs) in constituents.iter().enumerate() {
                let series = match hist.entry(cs.clone()) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => e.insert(StimulusHistory::starting_with(self.env.get(cs)?)),
                };

                let signals = Signals {
                    beta,
                    lamda,
                    prev_lamda: self.prev_lamda,
                    sign,
                    sigma,
                    sigma_e,
                    sigma_i,
                    count: series.len(),
                    max_assoc_rest: top.excluding(i),
                };

                let s: &mut Stimulus = self.env.get_mut(cs)?;
                let previous_assoc = s.assoc;
                self.rule.run_step(s, &signals)?;

                if let Some(size) = self.window_size {
                    s.observe_window(size, previous_assoc);
                }

                series.push(s);
            }

            if track_compound {
                let after = self.env.lookup(&part.cs, self.cues)?;
                if let Some(h) = hist.get_mut(&part.cs) {
                    h.push(&after);
                }
            }

            self.prev_lamda = lamda;
        }

        Ok(PhaseHistory { series: hist })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::build_rule;
    use crate::phase::Phase;
    use crate::stimulus::StimulusInit;

    fn group(model: &str, cs: &[&str], cues: CueConfig) -> Group {
        let init = StimulusInit {
            alpha: 0.1,
            ..StimulusInit::default()
        };
        let env = cs.iter().map(|name| Stimulus::new(*name, init)).collect();
        let params = ModelParams::default();
        Group::new("test", env, build_rule(model, params).unwrap(), params, None, cues).unwrap()
    }

    fn run(g: &mut Group, phase: &str) -> PhaseHistory {
        let phase = Phase::parse(phase).unwrap();
        g.run_phase(&phase.parts, PhaseOverrides::default()).unwrap()
    }

    #[test]
    fn rescorla_wagner_matches_hand_computation() {
        let mut g = group("Rescorla Wagner", &["A"], CueConfig::elemental());
        let h = run(&mut g, "A+/A-");

        let a = h.get("A").unwrap().assoc();
        assert_eq!(a.len(), 3);
        assert!((a[1] - 0.03).abs() < 1e-12);
        assert!((a[2] - 0.0294).abs() < 1e-12);
    }

    #[test]
    fn constituents_share_the_pre_update_prediction() {
        let mut g = group("Rescorla Wagner", &["A", "B"], CueConfig::elemental());
        g.env.get_mut("A").unwrap().assoc = 0.5;

        let h = run(&mut g, "AB+");

        // σ = 0.5 for both cues, so both move by α β (λ − σ).
        let step = 0.1 * 0.3 * 0.5;
        assert!((h.get("A").unwrap().assoc()[1] - (0.5 + step)).abs() < 1e-12);
        assert!((h.get("B").unwrap().assoc()[1] - step).abs() < 1e-12);
    }

    #[test]
    fn compound_series_is_recorded_without_extra_learning() {
        let mut g = group("Rescorla Wagner", &["A", "B"], CueConfig::elemental());
        let h = run(&mut g, "AB+/AB+");

        let ab = h.get("AB").unwrap();
        let a = h.get("A").unwrap();
        let b = h.get("B").unwrap();
        assert_eq!(ab.len(), 3);
        for i in 0..3 {
            let sum = a.get(i).unwrap().assoc + b.get(i).unwrap().assoc;
            assert!((ab.get(i).unwrap().assoc - sum).abs() < 1e-12);
        }
        // Two trial-parts, two updates per cue.
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn configural_unit_learns_alongside_elements() {
        let mut g = group(
            "Rescorla Wagner",
            &["A", "B", "(AB)"],
            CueConfig::configural(),
        );
        let h = run(&mut g, "AB+");

        assert!(h.get("(AB)").unwrap().last().unwrap().assoc > 0.0);
        let ab = h.get("AB").unwrap().last().unwrap().assoc;
        let sum: f64 = ["A", "B", "(AB)"]
            .iter()
            .map(|cs| g.env.get(cs).unwrap().assoc)
            .sum();
        assert!((ab - sum).abs() < 1e-12);
        assert!(h.get("AB").unwrap().iter().all(|s| s.name == "AB"));
    }

    #[test]
    fn phase_overrides_apply_to_reinforced_parts_only() {
        let mut g = group("Rescorla Wagner", &["A"], CueConfig::elemental());
        let phase = Phase::parse("lambda=0.5/beta=0.6/A+/A-").unwrap();
        let overrides = PhaseOverrides {
            lamda: phase.lamda,
            beta: phase.beta,
        };
        let h = g.run_phase(&phase.parts, overrides).unwrap();

        let a = h.get("A").unwrap().assoc();
        let first = 0.1 * 0.6 * 0.5;
        assert!((a[1] - first).abs() < 1e-12);
        assert!((a[2] - (first + 0.1 * 0.2 * (0.0 - first))).abs() < 1e-12);
        assert_eq!(g.prev_lamda(), 0.0);
    }

    #[test]
    fn second_order_doubles_beta() {
        let mut g = group("Rescorla Wagner", &["A"], CueConfig::elemental());
        let h = run(&mut g, "A++");
        assert!((h.get("A").unwrap().assoc()[1] - 0.1 * 0.6).abs() < 1e-12);
    }

    #[test]
    fn unknown_cue_is_an_error() {
        let mut g = group("Rescorla Wagner", &["A"], CueConfig::elemental());
        let phase = Phase::parse("AB+").unwrap();
        assert_eq!(
            g.run_phase(&phase.parts, PhaseOverrides::default()),
            Err(PalmsError::UnknownStimulus("B".to_string()))
        );
    }

    #[test]
    fn zero_window_is_rejected() {
        let params = ModelParams::default();
        let rule = build_rule("Hall", params).unwrap();
        assert!(Group::new(
            "g",
            Environment::new(),
            rule,
            params,
            Some(0),
            CueConfig::elemental()
        )
        .is_err());
    }

    #[test]
    fn window_feeds_surprise_signal() {
        let params = ModelParams::default();
        let env = [Stimulus::new("A", StimulusInit::default())]
            .into_iter()
            .collect();
        let rule = build_rule("Rescorla Wagner", params).unwrap();
        let mut g = Group::new("g", env, rule, params, Some(3), CueConfig::elemental()).unwrap();

        run(&mut g, "4A+");
        let a = g.env.get("A").unwrap();
        assert_eq!(a.window.len(), 3);
        assert!(a.delta_ma_hall != 0.2);
    }

    #[test]
    fn top_two_excludes_self() {
        let top = TopTwo::of([0.2, 0.9, 0.5].into_iter());
        assert_eq!(top.excluding(1), 0.5);
        assert_eq!(top.excluding(0), 0.9);
        assert_eq!(top.excluding(2), 0.9);

        let tied = TopTwo::of([0.7, 0.7].into_iter());
        assert_eq!(tied.excluding(0), 0.7);
        assert_eq!(tied.excluding(1), 0.7);

        let alone = TopTwo::of([0.4].into_iter());
        assert_eq!(alone.excluding(0), 0.0);
    }
}
