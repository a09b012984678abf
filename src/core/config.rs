use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PalmsError, PalmsResult};
use crate::models::ModelParams;
use crate::names;
use crate::stimulus::StimulusInit;

/// `<field>_<cue>`, where the cue follows the same grammar as compound names.
static PER_CS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(alpha_mack|alpha_hall|alpha|salience|habituation)_({})$",
        names::ELEMENT_PATTERN
    ))
    .expect("per-cs pattern is valid")
});

/// Parameters of one simulation run.
///
/// Scalar defaults apply to every cue without an entry in the matching per-CS
/// map. `alpha_mack` and `alpha_hall` fall back to `alpha` when unset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RunArgs {
    pub adaptive_type: String,

    pub alpha: f64,
    pub alpha_mack: Option<f64>,
    pub alpha_hall: Option<f64>,

    pub beta: f64,
    pub beta_neg: f64,
    pub lamda: f64,
    pub gamma: f64,
    pub theta_e: f64,
    pub theta_i: f64,

    pub salience: f64,
    pub habituation: f64,
    pub xi_hall: f64,
    pub rho: f64,
    pub nu: f64,

    /// Repetitions of every randomized phase.
    pub num_trials: usize,
    pub configural_cues: bool,
    /// Length of the moving window behind `delta_ma_hall`. `None` disables it.
    pub window_size: Option<usize>,
    /// Seed of the randomized-phase shuffles. `None` means 0.
    pub seed: Option<u64>,

    pub alphas: BTreeMap<String, f64>,
    pub alpha_macks: BTreeMap<String, f64>,
    pub alpha_halls: BTreeMap<String, f64>,
    pub saliences: BTreeMap<String, f64>,
    pub habituations: BTreeMap<String, f64>,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            adaptive_type: "Rescorla Wagner".to_string(),
            alpha: 0.1,
            alpha_mack: None,
            alpha_hall: None,
            beta: 0.3,
            beta_neg: 0.2,
            lamda: 1.0,
            gamma: 0.15,
            theta_e: 0.3,
            theta_i: 0.1,
            salience: 0.5,
            habituation: 0.99,
            xi_hall: 0.2,
            rho: 0.2,
            nu: 0.25,
            num_trials: 100,
            configural_cues: false,
            window_size: None,
            seed: None,
            alphas: BTreeMap::new(),
            alpha_macks: BTreeMap::new(),
            alpha_halls: BTreeMap::new(),
            saliences: BTreeMap::new(),
            habituations: BTreeMap::new(),
        }
    }
}

fn parse<T: FromStr>(directive: &str, value: &str) -> PalmsResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PalmsError::Directive(directive.to_string()))
}

fn parse_bool(directive: &str, value: &str) -> PalmsResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(PalmsError::Directive(directive.to_string())),
    }
}

fn parse_optional<T: FromStr>(directive: &str, value: &str) -> PalmsResult<Option<T>> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "none" => Ok(None),
        _ => parse(directive, value).map(Some),
    }
}

impl RunArgs {
    /// Apply one `name=value` directive.
    ///
    /// Names accept `-` or `_` as separator and a few aliases (`betap`,
    /// `betan`, `lambda`, `model`). `alpha_A`, `salience_(AB)` and the like set
    /// a single cue.
    pub fn set_value(&mut self, name: &str, value: &str) -> PalmsResult<()> {
        let key = name.trim().replace('-', "_");
        let directive = format!("{}={}", name.trim(), value.trim());
        let d = directive.as_str();

        if let Some(c) = PER_CS.captures(&key) {
            let v: f64 = parse(d, value)?;
            let map = match &c[1] {
                "alpha" => &mut self.alphas,
                "alpha_mack" => &mut self.alpha_macks,
                "alpha_hall" => &mut self.alpha_halls,
                "salience" => &mut self.saliences,
                _ => &mut self.habituations,
            };
            map.insert(c[2].to_string(), v);
            return Ok(());
        }

        match key.to_ascii_lowercase().as_str() {
            "adaptive_type" | "model" => self.adaptive_type = value.trim().to_string(),
            "alpha" => self.alpha = parse(d, value)?,
            "alpha_mack" => self.alpha_mack = parse_optional(d, value)?,
            "alpha_hall" => self.alpha_hall = parse_optional(d, value)?,
            "beta" | "betap" => self.beta = parse(d, value)?,
            "beta_neg" | "betan" => self.beta_neg = parse(d, value)?,
            "lamda" | "lambda" => self.lamda = parse(d, value)?,
            "gamma" => self.gamma = parse(d, value)?,
            "theta_e" | "thetae" => self.theta_e = parse(d, value)?,
            "theta_i" | "thetai" => self.theta_i = parse(d, value)?,
            "salience" => self.salience = parse(d, value)?,
            "habituation" => self.habituation = parse(d, value)?,
            "xi_hall" => self.xi_hall = parse(d, value)?,
            "rho" => self.rho = parse(d, value)?,
            "nu" => self.nu = parse(d, value)?,
            "num_trials" => self.num_trials = parse(d, value)?,
            "configural_cues" => self.configural_cues = parse_bool(d, value)?,
            "window_size" => self.window_size = parse_optional(d, value)?,
            "seed" => self.seed = parse_optional(d, value)?,
            _ => return Err(PalmsError::Directive(directive)),
        }

        Ok(())
    }

    pub fn model_params(&self) -> ModelParams {
        ModelParams {
            betap: self.beta,
            betan: self.beta_neg,
            lamda: self.lamda,
            gamma: self.gamma,
            theta_e: self.theta_e,
            theta_i: self.theta_i,
            xi_hall: self.xi_hall,
        }
    }

    /// Initial parameters of cue `cs`.
    pub fn stimulus_init(&self, cs: &str) -> StimulusInit {
        let alpha = self.alphas.get(cs).copied().unwrap_or(self.alpha);
        StimulusInit {
            alpha,
            alpha_mack: self.alpha_macks.get(cs).copied().or(self.alpha_mack),
            alpha_hall: self.alpha_halls.get(cs).copied().or(self.alpha_hall),
            salience: self.saliences.get(cs).copied().unwrap_or(self.salience),
            habituation: self
                .habituations
                .get(cs)
                .copied()
                .unwrap_or(self.habituation),
            rho: self.rho,
            nu: self.nu,
        }
    }

    pub fn validate(&self) -> PalmsResult<()> {
        if self.window_size == Some(0) {
            return Err(PalmsError::InvalidConfig(
                "window size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
