//! Phase descriptions.
//!
//! A phase is written as `/`-separated clauses:
//!
//! ```text
//! rand/lambda=0.8/beta=0.4/10AB+/5A-/2B++
//! ```
//!
//! - `rand`: run the trial-parts in shuffled order, repeated and averaged
//! - `lambda=x` (or `lamda=x`): asymptote for reinforced trial-parts of this phase
//! - `beta=x`: associability of reinforced trial-parts of this phase
//! - `[count]CS[sign]`: `count` copies of a trial-part presenting compound `CS`;
//!   sign is `+` (default), `++` (second-order reinforcement) or `-`

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PalmsError, PalmsResult};
use crate::names::{self, CueConfig};

static LAMBDA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^lamb?da *= *([0-9]*(?:\.[0-9]*)?)$").expect("lambda pattern is valid")
});

static BETA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^beta *= *([0-9]*(?:\.[0-9]*)?)$").expect("beta pattern is valid")
});

static TRIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]*)((?:[A-Za-zÑñ]'*[⁰¹²³⁴⁵⁶⁷⁸⁹]*)+)(\+\+|[+-]?)$")
        .expect("trial pattern is valid")
});

/// Outcome of one trial-part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Reinforcement {
    /// US present (`+`).
    Plus,
    /// Second-order reinforcement (`++`): β is doubled.
    SecondOrder,
    /// US absent (`-`).
    Minus,
}

impl Reinforcement {
    pub fn from_sign(sign: &str) -> Option<Self> {
        match sign {
            "" | "+" => Some(Reinforcement::Plus),
            "++" => Some(Reinforcement::SecondOrder),
            "-" => Some(Reinforcement::Minus),
            _ => None,
        }
    }
}

impl fmt::Display for Reinforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self {
            Reinforcement::Plus => "+",
            Reinforcement::SecondOrder => "++",
            Reinforcement::Minus => "-",
        };
        f.write_str(sign)
    }
}

/// One presentation of a compound, the unit of learning.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrialPart {
    /// Sorted compound name.
    pub cs: String,
    pub us: Reinforcement,
}

impl TrialPart {
    pub fn new(cs: &str, us: Reinforcement) -> PalmsResult<Self> {
        let cs = names::split(cs)?.concat();
        Ok(Self { cs, us })
    }
}

impl fmt::Display for TrialPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.cs, self.us)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phase {
    pub phase_str: String,
    pub parts: Vec<TrialPart>,
    pub rand: bool,
    pub lamda: Option<f64>,
    pub beta: Option<f64>,
}

impl Phase {
    pub fn parse(phase_str: &str) -> PalmsResult<Self> {
        let mut phase = Phase {
            phase_str: phase_str.to_string(),
            parts: Vec::new(),
            rand: false,
            lamda: None,
            beta: None,
        };

        for clause in phase_str.trim().split('/') {
            let part = clause.trim();
            let syntax = || PalmsError::PhaseSyntax {
                part: clause.to_string(),
                phase: phase_str.to_string(),
            };

            if part.is_empty() {
                continue;
            } else if part == "rand" {
                phase.rand = true;
            } else if let Some(c) = LAMBDA.captures(part) {
                phase.lamda = Some(c[1].parse().map_err(|_| syntax())?);
            } else if let Some(c) = BETA.captures(part) {
                phase.beta = Some(c[1].parse().map_err(|_| syntax())?);
            } else if let Some(c) = TRIAL.captures(part) {
                let count: usize = match &c[1] {
                    "" => 1,
                    n => n.parse().map_err(|_| syntax())?,
                };
                let us = Reinforcement::from_sign(&c[3]).ok_or_else(syntax)?;
                let trial = TrialPart::new(&c[2].to_uppercase(), us)?;
                phase.parts.extend(std::iter::repeat(trial).take(count));
            } else {
                return Err(syntax());
            }
        }

        Ok(phase)
    }

    /// Every unit that learns during this phase.
    pub fn cs(&self, cues: CueConfig) -> PalmsResult<BTreeSet<String>> {
        let mut all = BTreeSet::new();
        for part in &self.parts {
            all.extend(names::list_cs(&part.cs, cues)?);
        }
        Ok(all)
    }

    /// Every series worth reporting: learning units plus the presented compounds,
    /// shorter names first.
    pub fn compound_cs(&self, cues: CueConfig) -> PalmsResult<Vec<String>> {
        let mut all = self.cs(cues)?;
        all.extend(self.parts.iter().map(|p| p.cs.clone()));

        let mut ordered: Vec<String> = all.into_iter().collect();
        ordered.sort_by_key(|n| names::display_order(n));
        Ok(ordered)
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
