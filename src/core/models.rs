//! Per-trial learning rules.
//!
//! Every rule receives the same [`Signals`] bundle for one constituent of the
//! presented compound and mutates that constituent's [`Stimulus`] in place.
//!
//! Notation used below:
//! - `dvf = β (λ − σ)`: the Rescorla-Wagner prediction-error term
//! - `ρ = λ − (σE − σI)`: the dual-process prediction error
//! - `VXe = σE − Ve`, `VXi = σI − Vi`: what the *other* cues contribute
//!
//! References:
//! - Rescorla, R. A., & Wagner, A. R. (1972). A theory of Pavlovian conditioning.
//! - Mackintosh, N. J. (1975). A theory of attention.
//! - Pearce, J. M., & Hall, G. (1980). A model for Pavlovian learning.
//! - Kaye, H., & Pearce, J. M. (1984). The strength of the orienting response.
//! - Le Pelley, M. E. (2004). The role of associative history in models of associative learning.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PalmsError, PalmsResult};
use crate::stimulus::Stimulus;

const MIN_ATTENTION: f64 = 0.05;
const MAX_ATTENTION: f64 = 1.0;

/// Weight of the fresh surprise in the Hall associability.
const HALL_GAMMA: f64 = 0.99;

/// Hyperparameters shared by every cue of a group.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModelParams {
    /// Associability of a present US (β⁺).
    pub betap: f64,
    /// Associability of an absent US (β⁻).
    pub betan: f64,
    /// Asymptote of learning for reinforced trials.
    pub lamda: f64,
    /// Kaye-Hall averaging weight.
    pub gamma: f64,
    pub theta_e: f64,
    pub theta_i: f64,
    pub xi_hall: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            betap: 0.3,
            betan: 0.2,
            lamda: 1.0,
            gamma: 0.15,
            theta_e: 0.3,
            theta_i: 0.1,
            xi_hall: 0.2,
        }
    }
}

/// Everything a rule may read about the current trial-part.
///
/// Aggregates are taken from the environment as it was before any constituent
/// of this trial-part was updated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signals {
    pub beta: f64,
    pub lamda: f64,
    /// λ of the previous trial-part.
    pub prev_lamda: f64,
    /// +1 for a reinforced trial-part, −1 otherwise.
    pub sign: f64,
    pub sigma: f64,
    pub sigma_e: f64,
    pub sigma_i: f64,
    /// Presentations of this constituent so far in the phase, this one included.
    pub count: usize,
    /// Largest `assoc` among the other constituents presented together.
    pub max_assoc_rest: f64,
}

pub trait LearningRule: Send + Sync + fmt::Debug {
    /// Key under which the rule is registered.
    fn name(&self) -> &'static str;

    /// Update `s` in place.
    fn step(&self, s: &mut Stimulus, sig: &Signals, delta_v_factor: f64);

    /// Whether `alpha_mack` and `alpha_hall` are meaningful outputs of the rule.
    fn uses_dual_alphas(&self) -> bool {
        false
    }

    /// Run [`LearningRule::step`] and commit the result only if it stayed finite.
    fn run_step(&self, s: &mut Stimulus, sig: &Signals) -> PalmsResult<()> {
        let delta_v_factor = sig.beta * (sig.lamda - sig.sigma);

        let mut next = s.clone();
        self.step(&mut next, sig, delta_v_factor);

        if !next.is_finite() {
            tracing::error!(
                model = self.name(),
                cs = %s.name,
                lamda = sig.lamda,
                sigma = sig.sigma,
                "non-finite value after learning step"
            );
            return Err(PalmsError::Numerical {
                model: self.name(),
                lamda: sig.lamda,
                sigma: sig.sigma,
            });
        }

        *s = next;
        Ok(())
    }
}

fn clamp_attention(x: f64) -> f64 {
    x.clamp(MIN_ATTENTION, MAX_ATTENTION)
}

/// Le Pelley's competitive attention change: attention grows when this cue
/// predicts the outcome better than the other cues do.
fn competitive_attention(p: &ModelParams, s: &Stimulus, sig: &Signals, rho: f64) -> f64 {
    let vxe = sig.sigma_e - s.ve;
    let vxi = sig.sigma_i - s.vi;

    if rho > 0.0 {
        -p.theta_e * ((sig.lamda - s.ve + s.vi).abs() - (sig.lamda - vxe + vxi).abs())
    } else if rho < 0.0 {
        let r = rho.abs();
        -p.theta_i * ((r - s.vi + s.ve).abs() - (r - vxi + vxe).abs())
    } else {
        0.0
    }
}

/// Bounded Ve/Vi increments of the Le Pelley family, driven by `rate`.
fn dual_increments(p: &ModelParams, s: &Stimulus, rho: f64, rate: f64) -> (f64, f64) {
    if rho >= 0.0 {
        (rate * p.betap * (1.0 - s.ve + s.vi) * rho.abs(), 0.0)
    } else {
        (0.0, rate * p.betan * (1.0 - s.vi + s.ve) * rho.abs())
    }
}

fn dual_rho(sig: &Signals) -> f64 {
    sig.lamda - (sig.sigma_e - sig.sigma_i)
}

fn mack_alpha(s: &Stimulus, sigma: f64) -> f64 {
    0.5 * (1.0 + 2.0 * s.assoc - sigma)
}

fn hall_alpha(s: &Stimulus, sigma: f64, lamda: f64) -> f64 {
    let surprise = (lamda - sigma).abs();
    HALL_GAMMA * surprise + (1.0 - HALL_GAMMA) * s.alpha_hall
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RescorlaWagner;

impl LearningRule for RescorlaWagner {
    fn name(&self) -> &'static str {
        "Rescorla Wagner"
    }

    fn step(&self, s: &mut Stimulus, _sig: &Signals, dvf: f64) {
        s.assoc += s.alpha * dvf;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RescorlaWagnerLinear;

impl LearningRule for RescorlaWagnerLinear {
    fn name(&self) -> &'static str {
        "Rescorla Wagner Linear"
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, dvf: f64) {
        s.alpha *= 1.0 + sig.sign * 0.05;
        s.alpha = clamp_attention(s.alpha);
        s.assoc += s.alpha * dvf;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RescorlaWagnerExponential;

impl LearningRule for RescorlaWagnerExponential {
    fn name(&self) -> &'static str {
        "Rescorla Wagner Exponential"
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, dvf: f64) {
        if sig.sign > 0.0 {
            s.alpha *= s.alpha.powf(0.05);
        }
        s.assoc += s.alpha * dvf;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PearceHall;

impl LearningRule for PearceHall {
    fn name(&self) -> &'static str {
        "Pearce Hall"
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, _dvf: f64) {
        s.alpha = (sig.lamda - sig.sigma).abs();
        s.assoc += s.salience * s.alpha * sig.lamda.abs();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PearceKayeHall {
    params: ModelParams,
}

impl PearceKayeHall {
    fn update(&self, s: &mut Stimulus, sig: &Signals, gamma: f64) {
        let p = &self.params;
        let rho = dual_rho(sig);

        if rho >= 0.0 {
            s.ve += p.betap * s.alpha * sig.lamda;
        } else {
            s.vi += p.betan * s.alpha * rho.abs();
        }

        s.alpha = gamma * rho.abs() + (1.0 - gamma) * s.alpha;
        s.assoc = s.ve - s.vi;
    }
}

impl LearningRule for PearceKayeHall {
    fn name(&self) -> &'static str {
        "Pearce Kaye Hall"
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, _dvf: f64) {
        self.update(s, sig, self.params.gamma);
    }
}

/// Kaye-Hall averaging whose weight follows the windowed surprise signal.
#[derive(Debug, Clone, Copy)]
pub struct WindowedKayeHall {
    inner: PearceKayeHall,
}

impl LearningRule for WindowedKayeHall {
    fn name(&self) -> &'static str {
        "Pearce Kaye Hall Windowed"
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, _dvf: f64) {
        let gamma = 1.0 - (-s.delta_ma_hall.powi(2)).exp();
        self.inner.update(s, sig, gamma);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LePelley {
    params: ModelParams,
}

impl LearningRule for LePelley {
    fn name(&self) -> &'static str {
        "Le Pelley"
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, _dvf: f64) {
        let rho = dual_rho(sig);
        let (dve, dvi) = dual_increments(&self.params, s, rho, s.alpha);

        s.alpha += competitive_attention(&self.params, s, sig, rho);
        s.alpha = clamp_attention(s.alpha);

        s.ve += dve;
        s.vi += dvi;
        s.assoc = s.ve - s.vi;
    }
}

/// Le Pelley's rule with attention split into a Mackintosh similarity term and
/// a Hall surprise term, multiplied together.
#[derive(Debug, Clone, Copy)]
pub struct LePelleyHybrid {
    params: ModelParams,
}

impl LearningRule for LePelleyHybrid {
    fn name(&self) -> &'static str {
        "Le Pelley Hybrid"
    }

    fn uses_dual_alphas(&self) -> bool {
        true
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, _dvf: f64) {
        let p = &self.params;
        let rho = dual_rho(sig);
        let (dve, dvi) = dual_increments(p, s, rho, s.alpha);

        s.alpha_mack = clamp_attention(s.alpha_mack + competitive_attention(p, s, sig, rho));
        s.alpha_hall = clamp_attention(p.gamma * rho.abs() + (1.0 - p.gamma) * s.alpha_hall);
        s.alpha = clamp_attention(s.alpha_mack * s.alpha_hall);

        s.ve += dve;
        s.vi += dvi;
        s.assoc = s.ve - s.vi;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Mack;

impl LearningRule for Mack {
    fn name(&self) -> &'static str {
        "Mack"
    }

    fn uses_dual_alphas(&self) -> bool {
        true
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, dvf: f64) {
        s.alpha = s.alpha_mack;
        s.assoc = s.assoc * dvf + dvf / 2.0 * sig.beta;
    }
}

/// Mackintosh (1975): attention to a cue rises when it predicts the outcome
/// better than the best of the cues presented with it.
#[derive(Debug, Clone, Copy)]
pub struct MackintoshExtended {
    params: ModelParams,
}

impl LearningRule for MackintoshExtended {
    fn name(&self) -> &'static str {
        "Mackintosh Extended"
    }

    fn uses_dual_alphas(&self) -> bool {
        true
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, _dvf: f64) {
        let own = (sig.lamda - s.assoc).abs();
        let rest = (sig.lamda - sig.max_assoc_rest).abs();
        let theta = if sig.sign > 0.0 {
            self.params.theta_e
        } else {
            self.params.theta_i
        };

        s.assoc += s.alpha_mack * sig.beta * (sig.lamda - s.assoc);
        s.alpha_mack = clamp_attention(s.alpha_mack - theta * (own - rest));
        s.alpha = s.alpha_mack;
    }
}

/// Hall associability driven by the surprise of the *previous* trial-part's λ.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hall;

impl LearningRule for Hall {
    fn name(&self) -> &'static str {
        "Hall"
    }

    fn uses_dual_alphas(&self) -> bool {
        true
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, _dvf: f64) {
        s.alpha_hall = hall_alpha(s, sig.sigma, sig.prev_lamda);
        s.alpha = s.alpha_hall;
        s.assoc += s.alpha * sig.beta * (sig.lamda - sig.sigma);
    }
}

/// [`Hall`] with the surprise taken against the current λ.
#[derive(Debug, Clone, Copy, Default)]
pub struct HallCurrentLambda;

impl LearningRule for HallCurrentLambda {
    fn name(&self) -> &'static str {
        "Hall Current Lambda"
    }

    fn uses_dual_alphas(&self) -> bool {
        true
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, _dvf: f64) {
        s.alpha_hall = hall_alpha(s, sig.sigma, sig.lamda);
        s.alpha = s.alpha_hall;
        s.assoc += s.alpha * sig.beta * (sig.lamda - sig.sigma);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MackNHall;

impl LearningRule for MackNHall {
    fn name(&self) -> &'static str {
        "Macknhall"
    }

    fn uses_dual_alphas(&self) -> bool {
        true
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, dvf: f64) {
        s.alpha_mack = mack_alpha(s, sig.sigma);
        s.alpha_hall = hall_alpha(s, sig.sigma, sig.prev_lamda);
        s.alpha = (1.0 - (sig.prev_lamda - sig.sigma).abs()) * s.alpha_mack + s.alpha_hall;
        s.assoc += s.alpha * dvf;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DualMack {
    params: ModelParams,
}

impl LearningRule for DualMack {
    fn name(&self) -> &'static str {
        "Dualmack"
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, _dvf: f64) {
        let rho = dual_rho(sig);
        let vxe = sig.sigma_e - s.ve;
        let vxi = sig.sigma_i - s.vi;

        let (dve, dvi) = dual_increments(&self.params, s, rho, s.alpha);
        s.ve += dve;
        s.vi += dvi;

        s.alpha = 0.5 * (1.0 + s.assoc - (vxe - vxi));
        s.assoc = s.ve - s.vi;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Hybrid {
    params: ModelParams,
}

impl LearningRule for Hybrid {
    fn name(&self) -> &'static str {
        "Hybrid"
    }

    fn uses_dual_alphas(&self) -> bool {
        true
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, _dvf: f64) {
        let p = &self.params;
        let rho = dual_rho(sig);
        let (dve, dvi) = dual_increments(p, s, rho, s.alpha_hall);

        s.alpha_mack = clamp_attention(s.alpha_mack + competitive_attention(p, s, sig, rho));
        s.alpha_hall = p.gamma * rho.abs() + (1.0 - p.gamma) * s.alpha_hall;

        s.ve += dve;
        s.vi += dvi;
        s.assoc = s.alpha_mack * (s.ve - s.vi);
    }
}

/// Hybrid attention with exposure habituation.
///
/// - `habituation = habituation₀ⁿ` after `n` presentations; salience decays with it
/// - `alpha_mack` moves at rate `rho` towards cues that out-predict the rest
/// - `alpha_hall` is an average of surprise at rate `nu`, damped by the windowed
///   surprise: `1 − ξ exp(−Δ²/2)`
#[derive(Debug, Clone, Copy)]
pub struct MlabHybrid {
    params: ModelParams,
}

impl LearningRule for MlabHybrid {
    fn name(&self) -> &'static str {
        "MLAB Hybrid"
    }

    fn uses_dual_alphas(&self) -> bool {
        true
    }

    fn step(&self, s: &mut Stimulus, sig: &Signals, dvf: f64) {
        let own = (sig.lamda - s.assoc).abs();
        let rest = (sig.lamda - (sig.sigma - s.assoc)).abs();
        let surprise = (sig.lamda - sig.sigma).abs();
        let window = 1.0 - self.params.xi_hall * (-s.delta_ma_hall.powi(2) / 2.0).exp();

        s.habituation = s.habituation_0.powf(sig.count as f64);
        s.salience = s.salience_0 * s.habituation;

        s.alpha_mack = clamp_attention(s.alpha_mack - s.rho * (own - rest));
        s.alpha_hall = clamp_attention((1.0 - s.nu) * s.alpha_hall + s.nu * surprise * window);
        s.alpha = s.salience * s.alpha_mack * s.alpha_hall;

        s.assoc += s.alpha * dvf;
    }
}

type Constructor = fn(ModelParams) -> Arc<dyn LearningRule>;

/// Registered rules, in display order.
const MODELS: &[(&str, Constructor)] = &[
    ("Rescorla Wagner", |_| Arc::new(RescorlaWagner)),
    ("Rescorla Wagner Linear", |_| Arc::new(RescorlaWagnerLinear)),
    ("Rescorla Wagner Exponential", |_| Arc::new(RescorlaWagnerExponential)),
    ("Pearce Hall", |_| Arc::new(PearceHall)),
    ("Pearce Kaye Hall", |params| Arc::new(PearceKayeHall { params })),
    ("Pearce Kaye Hall Windowed", |params| {
        Arc::new(WindowedKayeHall {
            inner: PearceKayeHall { params },
        })
    }),
    ("Le Pelley", |params| Arc::new(LePelley { params })),
    ("Le Pelley Hybrid", |params| Arc::new(LePelleyHybrid { params })),
    ("Mack", |_| Arc::new(Mack)),
    ("Mackintosh Extended", |params| Arc::new(MackintoshExtended { params })),
    ("Hall", |_| Arc::new(Hall)),
    ("Hall Current Lambda", |_| Arc::new(HallCurrentLambda)),
    ("Macknhall", |_| Arc::new(MackNHall)),
    ("Dualmack", |params| Arc::new(DualMack { params })),
    ("Hybrid", |params| Arc::new(Hybrid { params })),
    ("MLAB Hybrid", |params| Arc::new(MlabHybrid { params })),
];

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Names accepted by [`build_rule`].
pub fn model_names() -> impl Iterator<Item = &'static str> {
    MODELS.iter().map(|(name, _)| *name)
}

/// Build the rule registered under `name`.
///
/// Matching ignores case, spaces and punctuation, so `"rescorla_wagner"` and
/// `"Rescorla Wagner"` select the same rule.
pub fn build_rule(name: &str, params: ModelParams) -> PalmsResult<Arc<dyn LearningRule>> {
    let key = normalize(name);
    MODELS
        .iter()
        .find(|(registered, _)| normalize(registered) == key)
        .map(|(_, construct)| construct(params))
        .ok_or_else(|| PalmsError::UnknownModel(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimulus::StimulusInit;

    fn cue(alpha: f64) -> Stimulus {
        Stimulus::new(
            "A",
            StimulusInit {
                alpha,
                ..StimulusInit::default()
            },
        )
    }

    fn reinforced(s: &Stimulus) -> Signals {
        Signals {
            beta: 0.3,
            lamda: 1.0,
            prev_lamda: 1.0,
            sign: 1.0,
            sigma: s.assoc,
            sigma_e: s.ve,
            sigma_i: s.vi,
            count: 1,
            max_assoc_rest: 0.0,
        }
    }

    fn nonreinforced(s: &Stimulus) -> Signals {
        Signals {
            beta: 0.2,
            lamda: 0.0,
            sign: -1.0,
            ..reinforced(s)
        }
    }

    /// `s` with Ve = 0.4, Vi = 0.1, presented without the US alongside a cue
    /// holding Ve = 0.2, Vi = 0, so that ρ = 0 − (0.6 − 0.1) = −0.5.
    fn inhibitory_compound() -> (Stimulus, Signals) {
        let mut s = cue(0.5);
        s.ve = 0.4;
        s.vi = 0.1;
        s.assoc = 0.3;
        let sig = Signals {
            sigma: 0.5,
            sigma_e: 0.6,
            sigma_i: 0.1,
            ..nonreinforced(&s)
        };
        (s, sig)
    }

    #[test]
    fn every_registered_name_builds_and_reports_itself() {
        for name in model_names() {
            let rule = build_rule(name, ModelParams::default()).unwrap();
            assert_eq!(rule.name(), name);
        }
        assert_eq!(model_names().count(), 16);
    }

    #[test]
    fn lookup_ignores_case_and_separators() {
        let rule = build_rule("rescorla_wagner-linear", ModelParams::default()).unwrap();
        assert_eq!(rule.name(), "Rescorla Wagner Linear");
    }

    #[test]
    fn unknown_model_fails_at_construction() {
        assert!(matches!(
            build_rule("Bush Mosteller", ModelParams::default()),
            Err(PalmsError::UnknownModel(_))
        ));
    }

    #[test]
    fn rescorla_wagner_acquisition_then_extinction() {
        let rule = RescorlaWagner;
        let mut s = cue(0.1);

        let sig = reinforced(&s);
        rule.run_step(&mut s, &sig).unwrap();
        assert!((s.assoc - 0.03).abs() < 1e-12);

        let sig = nonreinforced(&s);
        rule.run_step(&mut s, &sig).unwrap();
        assert!((s.assoc - 0.0294).abs() < 1e-12);
    }

    #[test]
    fn linear_alpha_is_clamped() {
        let rule = RescorlaWagnerLinear;
        let mut s = cue(0.99);
        let sig = reinforced(&s);
        rule.run_step(&mut s, &sig).unwrap();
        assert_eq!(s.alpha, 1.0);

        let mut s = cue(0.05);
        let sig = nonreinforced(&s);
        rule.run_step(&mut s, &sig).unwrap();
        assert_eq!(s.alpha, 0.05);
    }

    #[test]
    fn exponential_only_moves_alpha_on_reinforcement() {
        let rule = RescorlaWagnerExponential;
        let mut s = cue(0.5);
        let sig = nonreinforced(&s);
        rule.run_step(&mut s, &sig).unwrap();
        assert_eq!(s.alpha, 0.5);

        let sig = reinforced(&s);
        rule.run_step(&mut s, &sig).unwrap();
        assert!((s.alpha - 0.5 * 0.5f64.powf(0.05)).abs() < 1e-12);
    }

    #[test]
    fn pearce_hall_alpha_tracks_absolute_error() {
        let rule = PearceHall;
        let mut s = cue(0.5);
        s.assoc = 0.25;
        let sig = reinforced(&s);
        rule.run_step(&mut s, &sig).unwrap();

        assert!((s.alpha - 0.75).abs() < 1e-12);
        // salience 0.5 * alpha 0.75 * |λ| 1
        assert!((s.assoc - (0.25 + 0.375)).abs() < 1e-12);
    }

    #[test]
    fn kaye_hall_splits_excitation_and_inhibition() {
        let params = ModelParams::default();
        let rule = PearceKayeHall { params };
        let mut s = cue(0.5);

        let sig = reinforced(&s);
        rule.run_step(&mut s, &sig).unwrap();
        assert!((s.ve - 0.3 * 0.5).abs() < 1e-12);
        assert_eq!(s.vi, 0.0);
        // γ|ρ| + (1 − γ)α with ρ = 1
        assert!((s.alpha - (0.15 + 0.85 * 0.5)).abs() < 1e-12);

        let sig = nonreinforced(&s);
        let alpha = s.alpha;
        rule.run_step(&mut s, &sig).unwrap();
        assert!((s.vi - 0.2 * alpha * 0.15).abs() < 1e-12);
        assert!((s.assoc - (s.ve - s.vi)).abs() < 1e-12);
    }

    #[test]
    fn windowed_kaye_hall_without_surprise_keeps_alpha() {
        let rule = WindowedKayeHall {
            inner: PearceKayeHall {
                params: ModelParams::default(),
            },
        };
        let mut s = cue(0.4);
        s.delta_ma_hall = 0.0;
        let sig = reinforced(&s);
        rule.run_step(&mut s, &sig).unwrap();
        assert!((s.alpha - 0.4).abs() < 1e-12);
    }

    #[test]
    fn le_pelley_excitatory_step_uses_old_alpha() {
        let rule = LePelley {
            params: ModelParams::default(),
        };
        let mut s = cue(0.5);
        let sig = reinforced(&s);
        rule.run_step(&mut s, &sig).unwrap();

        // ΔVe = α β⁺ (1 − Ve + Vi) |ρ| = 0.5 * 0.3
        assert!((s.ve - 0.15).abs() < 1e-12);
        assert!((s.assoc - 0.15).abs() < 1e-12);
        // Alone, the cue predicts as well as "the rest": attention unchanged.
        assert!((s.alpha - 0.5).abs() < 1e-12);
    }

    #[test]
    fn linear_alpha_decays_on_nonreinforced_trials() {
        let mut s = cue(0.5);
        s.assoc = 0.2;
        let sig = nonreinforced(&s);
        RescorlaWagnerLinear.run_step(&mut s, &sig).unwrap();

        assert!((s.alpha - 0.475).abs() < 1e-12);
        // 0.2 + 0.475 * 0.2 * (0 − 0.2)
        assert!((s.assoc - 0.181).abs() < 1e-12);
    }

    #[test]
    fn windowed_kaye_hall_weight_follows_surprise() {
        let rule = WindowedKayeHall {
            inner: PearceKayeHall {
                params: ModelParams::default(),
            },
        };
        let mut s = cue(0.4);
        s.delta_ma_hall = 0.5;
        let sig = reinforced(&s);
        rule.run_step(&mut s, &sig).unwrap();

        let gamma = 1.0 - (-0.25f64).exp();
        assert!((s.alpha - (gamma + (1.0 - gamma) * 0.4)).abs() < 1e-12);
        assert!((s.alpha - 0.532_72).abs() < 1e-5);
        assert!((s.ve - 0.3 * 0.4).abs() < 1e-12);
    }

    #[test]
    fn le_pelley_inhibitory_step() {
        let rule = LePelley {
            params: ModelParams::default(),
        };
        let (mut s, sig) = inhibitory_compound();
        rule.run_step(&mut s, &sig).unwrap();

        // ΔVi = α β⁻ (1 − Vi + Ve) |ρ| = 0.5 * 0.2 * 1.3 * 0.5
        assert!((s.vi - 0.165).abs() < 1e-12);
        assert!((s.ve - 0.4).abs() < 1e-12);
        assert!((s.assoc - 0.235).abs() < 1e-12);
        // −θI (|0.5 − 0.1 + 0.4| − |0.5 − 0 + 0.2|)
        assert!((s.alpha - 0.49).abs() < 1e-12);
    }

    #[test]
    fn le_pelley_hybrid_multiplies_both_attentions() {
        let rule = LePelleyHybrid {
            params: ModelParams::default(),
        };
        let (mut s, sig) = inhibitory_compound();
        s.alpha_hall = 0.4;
        rule.run_step(&mut s, &sig).unwrap();

        assert!((s.alpha_mack - 0.49).abs() < 1e-12);
        // γ|ρ| + (1 − γ) α_hall = 0.075 + 0.34
        assert!((s.alpha_hall - 0.415).abs() < 1e-12);
        assert!((s.alpha - 0.49 * 0.415).abs() < 1e-12);
        // The increment is driven by the attention held before the trial.
        assert!((s.vi - 0.165).abs() < 1e-12);
    }

    #[test]
    fn le_pelley_hybrid_clamps_attention() {
        let rule = LePelleyHybrid {
            params: ModelParams::default(),
        };

        let mut low = cue(0.05);
        let sig = reinforced(&low);
        rule.run_step(&mut low, &sig).unwrap();
        assert!((low.alpha_hall - (0.15 + 0.85 * 0.05)).abs() < 1e-12);
        // 0.05 * 0.1925 is below the floor.
        assert_eq!(low.alpha, MIN_ATTENTION);

        let mut high = cue(1.0);
        let sig = Signals {
            lamda: 3.0,
            ..reinforced(&high)
        };
        rule.run_step(&mut high, &sig).unwrap();
        // 0.15 * 3 + 0.85 is above the ceiling.
        assert_eq!(high.alpha_hall, MAX_ATTENTION);
        assert_eq!(high.alpha, MAX_ATTENTION);
    }

    #[test]
    fn mack_scales_strength_by_prediction_error() {
        let mut s = cue(0.5);
        s.assoc = 0.2;
        s.alpha_mack = 0.7;
        let sig = reinforced(&s);
        Mack.run_step(&mut s, &sig).unwrap();

        // dvf = 0.3 * 0.8; V = 0.2 dvf + dvf / 2 * 0.3
        assert!((s.assoc - 0.084).abs() < 1e-12);
        assert_eq!(s.alpha, 0.7);
    }

    #[test]
    fn dualmack_attention_reads_strength_before_the_update() {
        let rule = DualMack {
            params: ModelParams::default(),
        };
        let (mut s, sig) = inhibitory_compound();
        rule.run_step(&mut s, &sig).unwrap();

        assert!((s.vi - 0.165).abs() < 1e-12);
        assert!((s.assoc - 0.235).abs() < 1e-12);
        // ½ (1 + 0.3 − (0.2 − 0))
        assert!((s.alpha - 0.55).abs() < 1e-12);
    }

    #[test]
    fn hall_uses_previous_lambda_and_current_variant_does_not() {
        let mut s = cue(0.5);
        let sig = Signals {
            prev_lamda: 0.0,
            ..reinforced(&s)
        };

        let mut prev = s.clone();
        Hall.run_step(&mut prev, &sig).unwrap();
        HallCurrentLambda.run_step(&mut s, &sig).unwrap();

        assert!((prev.alpha_hall - 0.01 * 0.5).abs() < 1e-12);
        assert!((s.alpha_hall - (0.99 + 0.01 * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn macknhall_combines_both_attentions() {
        let mut s = cue(0.5);
        let sig = reinforced(&s);
        MackNHall.run_step(&mut s, &sig).unwrap();

        assert!((s.alpha_mack - 0.5).abs() < 1e-12);
        let hall = 0.99 + 0.01 * 0.5;
        // Full surprise on the previous λ silences the Mackintosh term.
        assert!((s.alpha - hall).abs() < 1e-12);
        assert!((s.assoc - s.alpha * 0.3).abs() < 1e-12);
    }

    #[test]
    fn mackintosh_extended_favours_the_better_predictor() {
        let rule = MackintoshExtended {
            params: ModelParams::default(),
        };
        let mut good = cue(0.5);
        good.assoc = 0.8;
        let mut poor = cue(0.5);
        poor.assoc = 0.1;

        let sig_good = Signals {
            max_assoc_rest: poor.assoc,
            sigma: 0.9,
            ..reinforced(&good)
        };
        let sig_poor = Signals {
            max_assoc_rest: good.assoc,
            sigma: 0.9,
            ..reinforced(&poor)
        };
        rule.run_step(&mut good, &sig_good).unwrap();
        rule.run_step(&mut poor, &sig_poor).unwrap();

        assert!(good.alpha_mack > 0.5);
        assert!(poor.alpha_mack < 0.5);
    }

    #[test]
    fn hybrid_scales_strength_by_mackintosh_attention() {
        let rule = Hybrid {
            params: ModelParams::default(),
        };
        let mut s = cue(0.5);
        let sig = reinforced(&s);
        rule.run_step(&mut s, &sig).unwrap();
        assert!((s.assoc - s.alpha_mack * (s.ve - s.vi)).abs() < 1e-12);
    }

    #[test]
    fn mlab_hybrid_habituates_salience() {
        let rule = MlabHybrid {
            params: ModelParams::default(),
        };
        let mut s = cue(0.5);
        let sig = Signals {
            count: 3,
            ..reinforced(&s)
        };
        rule.run_step(&mut s, &sig).unwrap();

        assert!((s.habituation - 0.99f64.powi(3)).abs() < 1e-12);
        assert!((s.salience - 0.5 * 0.99f64.powi(3)).abs() < 1e-12);
        assert_eq!(s.salience_0, 0.5);
        assert!(s.assoc > 0.0);
    }

    #[test]
    fn overflow_is_reported_and_state_left_untouched() {
        let rule = MlabHybrid {
            params: ModelParams::default(),
        };
        let mut s = cue(0.5);
        s.habituation_0 = 10.0;
        let before = s.clone();
        let sig = Signals {
            count: 10_000,
            ..reinforced(&s)
        };

        let err = rule.run_step(&mut s, &sig).unwrap_err();
        assert!(matches!(err, PalmsError::Numerical { model: "MLAB Hybrid", .. }));
        assert_eq!(s, before);
    }
}
