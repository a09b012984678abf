use std::fmt::Write as _;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::experiment::PhaseResults;
use crate::stimulus::StimulusHistory;

/// Read-only view of the results of a whole run, one map of series per phase.
///
/// Reports never feed back into a simulation; they only reshape what the
/// experiments produced.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationReport {
    pub phases: Vec<PhaseResults>,
}

/// One flattened data point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReportRow {
    /// 1-based.
    pub phase: usize,
    pub series: String,
    /// 0 is the state before the first presentation.
    pub trial: usize,
    pub assoc: f64,
    pub alpha: f64,
    pub alpha_mack: f64,
    pub alpha_hall: f64,
}

pub struct SeriesView<'a> {
    pub name: &'a str,
    hist: &'a StimulusHistory,
}

impl<'a> SeriesView<'a> {
    pub fn new(name: &'a str, hist: &'a StimulusHistory) -> Self {
        Self { name, hist }
    }

    pub fn assoc(&self) -> Vec<f64> {
        self.hist.assoc()
    }

    pub fn alpha(&self) -> Vec<f64> {
        self.hist.alpha()
    }

    pub fn alpha_mack(&self) -> Vec<f64> {
        self.hist.series(|s| s.alpha_mack)
    }

    pub fn alpha_hall(&self) -> Vec<f64> {
        self.hist.series(|s| s.alpha_hall)
    }

    /// Associative strengths to draw: every entry but the final prediction.
    pub fn plotted(&self) -> Vec<f64> {
        let mut v = self.assoc();
        v.pop();
        v
    }

    /// Associative strength predicted for the next, unseen trial.
    pub fn final_value(&self) -> Option<f64> {
        self.hist.last().map(|s| s.assoc)
    }

    pub fn len(&self) -> usize {
        self.hist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hist.is_empty()
    }
}

impl SimulationReport {
    pub fn new(phases: Vec<PhaseResults>) -> Self {
        Self { phases }
    }

    /// Merge another run into this one phase by phase. Series of `other` win on
    /// a name clash.
    pub fn merge(&mut self, other: SimulationReport) {
        if self.phases.len() < other.phases.len() {
            self.phases.resize_with(other.phases.len(), PhaseResults::new);
        }
        for (into, phase) in self.phases.iter_mut().zip(other.phases) {
            into.extend(phase);
        }
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// `phase` is 1-based, like the rows.
    pub fn series(&self, phase: usize, name: &str) -> Option<SeriesView<'_>> {
        let results = self.phases.get(phase.checked_sub(1)?)?;
        let (key, hist) = results.get_key_value(name)?;
        Some(SeriesView::new(key, hist))
    }

    pub fn series_in(&self, phase: usize) -> impl Iterator<Item = SeriesView<'_>> {
        phase
            .checked_sub(1)
            .and_then(|i| self.phases.get(i))
            .into_iter()
            .flat_map(|r| r.iter().map(|(k, h)| SeriesView::new(k, h)))
    }

    pub fn to_rows(&self) -> Vec<ReportRow> {
        let mut rows = Vec::new();
        for (p, results) in self.phases.iter().enumerate() {
            for (name, hist) in results {
                for (trial, s) in hist.iter().enumerate() {
                    rows.push(ReportRow {
                        phase: p + 1,
                        series: name.clone(),
                        trial,
                        assoc: s.assoc,
                        alpha: s.alpha,
                        alpha_mack: s.alpha_mack,
                        alpha_hall: s.alpha_hall,
                    });
                }
            }
        }
        rows
    }

    /// Plain-text table, one line per row.
    ///
    /// `dual_alphas` adds the Mackintosh and Hall columns.
    pub fn to_text(&self, dual_alphas: bool) -> String {
        let mut out = String::new();
        if dual_alphas {
            out.push_str("phase\tseries\ttrial\tassoc\talpha\talpha_mack\talpha_hall\n");
        } else {
            out.push_str("phase\tseries\ttrial\tassoc\talpha\n");
        }

        for r in self.to_rows() {
            let _ = write!(
                out,
                "{}\t{}\t{}\t{:.6}\t{:.6}",
                r.phase, r.series, r.trial, r.assoc, r.alpha
            );
            if dual_alphas {
                let _ = write!(out, "\t{:.6}\t{:.6}", r.alpha_mack, r.alpha_hall);
            }
            out.push('\n');
        }
        out
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_rows())
    }
}
