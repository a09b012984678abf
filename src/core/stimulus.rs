use std::collections::VecDeque;
use std::ops::{Add, Div};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::names;

/// Learning state of one elementary cue, or the summed state of a compound.
///
/// Scalar fields combine independently under [`Stimulus::join`]; the window of
/// recent associative strengths combines entry by entry after left-padding the
/// shorter window with zeros.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stimulus {
    pub name: String,

    /// Associative strength V.
    pub assoc: f64,

    // Excitatory / inhibitory components for the dual-process rules.
    pub ve: f64,
    pub vi: f64,

    pub alpha: f64,
    pub alpha_mack: f64,
    pub alpha_hall: f64,

    pub salience: f64,
    pub habituation: f64,
    pub rho: f64,
    pub nu: f64,

    /// Recent `assoc` values, oldest first.
    pub window: VecDeque<f64>,
    /// Moving-average surprise derived from `window`.
    pub delta_ma_hall: f64,

    // Values at construction. Learning rules read these but never write them.
    pub alpha_mack_0: f64,
    pub alpha_hall_0: f64,
    pub salience_0: f64,
    pub habituation_0: f64,
}

/// Construction parameters for a fresh cue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StimulusInit {
    pub alpha: f64,
    pub alpha_mack: Option<f64>,
    pub alpha_hall: Option<f64>,
    pub salience: f64,
    pub habituation: f64,
    pub rho: f64,
    pub nu: f64,
}

impl Default for StimulusInit {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            alpha_mack: None,
            alpha_hall: None,
            salience: 0.5,
            habituation: 0.99,
            rho: 0.2,
            nu: 0.25,
        }
    }
}

const DEFAULT_DELTA_MA_HALL: f64 = 0.2;
const SCALAR_FIELDS: usize = 15;

impl Stimulus {
    pub fn new(name: impl Into<String>, init: StimulusInit) -> Self {
        let alpha_mack = init.alpha_mack.unwrap_or(init.alpha);
        let alpha_hall = init.alpha_hall.unwrap_or(init.alpha);

        Self {
            name: name.into(),
            assoc: 0.0,
            ve: 0.0,
            vi: 0.0,
            alpha: init.alpha,
            alpha_mack,
            alpha_hall,
            salience: init.salience,
            habituation: init.habituation,
            rho: init.rho,
            nu: init.nu,
            window: VecDeque::new(),
            delta_ma_hall: DEFAULT_DELTA_MA_HALL,
            alpha_mack_0: alpha_mack,
            alpha_hall_0: alpha_hall,
            salience_0: init.salience,
            habituation_0: init.habituation,
        }
    }

    fn scalars(&self) -> [f64; SCALAR_FIELDS] {
        [
            self.assoc,
            self.ve,
            self.vi,
            self.alpha,
            self.alpha_mack,
            self.alpha_hall,
            self.salience,
            self.habituation,
            self.rho,
            self.nu,
            self.delta_ma_hall,
            self.alpha_mack_0,
            self.alpha_hall_0,
            self.salience_0,
            self.habituation_0,
        ]
    }

    fn from_parts(name: String, s: [f64; SCALAR_FIELDS], window: VecDeque<f64>) -> Self {
        let [
            assoc,
            ve,
            vi,
            alpha,
            alpha_mack,
            alpha_hall,
            salience,
            habituation,
            rho,
            nu,
            delta_ma_hall,
            alpha_mack_0,
            alpha_hall_0,
            salience_0,
            habituation_0,
        ] = s;
        Self {
            name,
            assoc,
            ve,
            vi,
            alpha,
            alpha_mack,
            alpha_hall,
            salience,
            habituation,
            rho,
            nu,
            window,
            delta_ma_hall,
            alpha_mack_0,
            alpha_hall_0,
            salience_0,
            habituation_0,
        }
    }

    /// Combine two stimuli field by field with `op`.
    pub fn join(&self, other: &Stimulus, op: impl Fn(f64, f64) -> f64) -> Stimulus {
        let a = self.scalars();
        let b = other.scalars();
        let mut out = [0.0; SCALAR_FIELDS];
        for i in 0..SCALAR_FIELDS {
            out[i] = op(a[i], b[i]);
        }

        let size = self.window.len().max(other.window.len());
        let pad_a = size - self.window.len();
        let pad_b = size - other.window.len();
        let window = (0..size)
            .map(|i| {
                let x = if i < pad_a { 0.0 } else { self.window[i - pad_a] };
                let y = if i < pad_b { 0.0 } else { other.window[i - pad_b] };
                op(x, y)
            })
            .collect();

        Self::from_parts(names::union(&self.name, &other.name), out, window)
    }

    /// Apply `f` to every scalar and every window entry.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Stimulus {
        let s = self.scalars().map(&f);
        let window = self.window.iter().map(|&x| f(x)).collect();
        Self::from_parts(self.name.clone(), s, window)
    }

    /// Scale by `1 / n`.
    pub fn divide(&self, n: f64) -> Stimulus {
        self.map(|x| x / n)
    }

    pub fn is_finite(&self) -> bool {
        self.scalars().iter().all(|x| x.is_finite()) && self.window.iter().all(|x| x.is_finite())
    }

    /// Slide `assoc` into a window of at most `size` entries and refresh the
    /// surprise signal against the strength held before this update.
    pub fn observe_window(&mut self, size: usize, previous_assoc: f64) {
        while self.window.len() >= size && !self.window.is_empty() {
            self.window.pop_front();
        }
        self.window.push_back(self.assoc);

        let avg = self.window.iter().sum::<f64>() / self.window.len() as f64;
        self.delta_ma_hall = avg - previous_assoc;
    }
}

impl Add for &Stimulus {
    type Output = Stimulus;

    fn add(self, rhs: &Stimulus) -> Stimulus {
        self.join(rhs, |a, b| a + b)
    }
}

impl Add for Stimulus {
    type Output = Stimulus;

    fn add(self, rhs: Stimulus) -> Stimulus {
        &self + &rhs
    }
}

impl Div<f64> for &Stimulus {
    type Output = Stimulus;

    fn div(self, n: f64) -> Stimulus {
        self.divide(n)
    }
}

/// Append-only sequence of snapshots for one named series.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StimulusHistory {
    hist: Vec<Stimulus>,
}

impl StimulusHistory {
    pub fn starting_with(s: &Stimulus) -> Self {
        Self { hist: vec![s.clone()] }
    }

    pub fn push(&mut self, s: &Stimulus) {
        self.hist.push(s.clone());
    }

    pub fn len(&self) -> usize {
        self.hist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hist.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Stimulus> {
        self.hist.get(i)
    }

    pub fn last(&self) -> Option<&Stimulus> {
        self.hist.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stimulus> {
        self.hist.iter()
    }

    /// One field across the whole history.
    pub fn series(&self, field: impl Fn(&Stimulus) -> f64) -> Vec<f64> {
        self.hist.iter().map(field).collect()
    }

    pub fn assoc(&self) -> Vec<f64> {
        self.series(|s| s.assoc)
    }

    pub fn alpha(&self) -> Vec<f64> {
        self.series(|s| s.alpha)
    }

    /// Position-wise average of several histories of the same series.
    ///
    /// Entry `i` averages the histories that are long enough to have one,
    /// dividing each snapshot before summing.
    pub fn average(histories: &[&StimulusHistory]) -> StimulusHistory {
        let longest = histories.iter().map(|h| h.len()).max().unwrap_or(0);
        let hist = (0..longest)
            .filter_map(|i| {
                let at: Vec<&Stimulus> = histories.iter().filter_map(|h| h.get(i)).collect();
                let n = at.len() as f64;
                at.iter().map(|s| s.divide(n)).reduce(|a, b| a + b)
            })
            .collect();
        StimulusHistory { hist }
    }
}

impl FromIterator<Stimulus> for StimulusHistory {
    fn from_iter<I: IntoIterator<Item = Stimulus>>(iter: I) -> Self {
        Self {
            hist: iter.into_iter().collect(),
        }
    }
}
