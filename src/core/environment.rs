use std::collections::BTreeMap;
use std::ops::{Add, Div};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PalmsError, PalmsResult};
use crate::names::{self, CueConfig};
use crate::stimulus::Stimulus;

/// The learning state of every elementary cue of one group.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Environment {
    s: BTreeMap<String, Stimulus>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, s: Stimulus) {
        self.s.insert(s.name.clone(), s);
    }

    pub fn len(&self) -> usize {
        self.s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    pub fn contains(&self, cs: &str) -> bool {
        self.s.contains_key(cs)
    }

    pub fn cs(&self) -> impl Iterator<Item = &str> {
        self.s.keys().map(String::as_str)
    }

    /// State of one elementary (or configural) unit.
    pub fn get(&self, cs: &str) -> PalmsResult<&Stimulus> {
        self.s
            .get(cs)
            .ok_or_else(|| PalmsError::UnknownStimulus(cs.to_string()))
    }

    pub fn get_mut(&mut self, cs: &str) -> PalmsResult<&mut Stimulus> {
        self.s
            .get_mut(cs)
            .ok_or_else(|| PalmsError::UnknownStimulus(cs.to_string()))
    }

    /// Value of an elementary or compound key: the sum of its constituents.
    ///
    /// The result is named after the compound as written in sorted form, so a
    /// configural unit summed into it does not show up in the name.
    pub fn lookup(&self, key: &str, cues: CueConfig) -> PalmsResult<Stimulus> {
        let parts = names::list_cs(key, cues)?;

        let mut acc: Option<Stimulus> = None;
        for cs in &parts {
            let s = self.get(cs)?;
            acc = Some(match acc {
                None => s.clone(),
                Some(a) => &a + s,
            });
        }

        let mut sum = acc.ok_or_else(|| PalmsError::MalformedName(key.to_string()))?;
        sum.name = names::split(key)?.concat();
        Ok(sum)
    }

    /// Averages several environments as the sum of `e / n`, so that many small
    /// contributions are not truncated by a large running total.
    pub fn average(envs: &[Environment]) -> Option<Environment> {
        let n = envs.len() as f64;
        envs.iter().map(|e| e / n).reduce(|a, b| &a + &b)
    }

    pub fn assocs(&self) -> BTreeMap<String, f64> {
        self.s.iter().map(|(k, v)| (k.clone(), v.assoc)).collect()
    }
}

impl Add for &Environment {
    type Output = Environment;

    /// Cue-wise sum; a cue present on one side only is carried over unchanged.
    fn add(self, rhs: &Environment) -> Environment {
        let mut s = self.s.clone();
        for (cs, v) in &rhs.s {
            let merged = match s.get(cs) {
                Some(mine) => mine + v,
                None => v.clone(),
            };
            s.insert(cs.clone(), merged);
        }
        Environment { s }
    }
}

impl Div<f64> for &Environment {
    type Output = Environment;

    fn div(self, n: f64) -> Environment {
        Environment {
            s: self.s.iter().map(|(k, v)| (k.clone(), v / n)).collect(),
        }
    }
}

impl FromIterator<Stimulus> for Environment {
    fn from_iter<I: IntoIterator<Item = Stimulus>>(iter: I) -> Self {
        let mut env = Environment::new();
        for s in iter {
            env.insert(s);
        }
        env
    }
}
