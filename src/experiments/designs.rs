//! Classic conditioning designs, each a treatment group and its control.

use crate::config::RunArgs;
use crate::error::PalmsResult;
use crate::experiment::Experiment;
use crate::observer::SimulationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Design {
    Blocking,
    Overshadowing,
    ConditionedInhibition,
    Extinction,
    LatentInhibition,
}

impl Design {
    pub const ALL: [Design; 5] = [
        Design::Blocking,
        Design::Overshadowing,
        Design::ConditionedInhibition,
        Design::Extinction,
        Design::LatentInhibition,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Design::Blocking => "blocking",
            Design::Overshadowing => "overshadowing",
            Design::ConditionedInhibition => "conditioned-inhibition",
            Design::Extinction => "extinction",
            Design::LatentInhibition => "latent-inhibition",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let key = name.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL.into_iter().find(|d| d.name() == key)
    }

    /// Experiment lines in the `name|phase|...` form.
    pub fn lines(self) -> &'static [&'static str] {
        match self {
            Design::Blocking => &["Blocking|20A+|20AB+", "Control|20C+|20AB+"],
            Design::Overshadowing => &["Overshadowing|20AB+", "Control|20B+"],
            Design::ConditionedInhibition => {
                &["Inhibition|rand/20A+/20AX-", "Control|rand/20A+/20BX-"]
            }
            Design::Extinction => &["Extinction|20A+|20A-", "Control|20A+|20B-"],
            Design::LatentInhibition => &["Pre-exposed|20A-|5A+", "Control|20B-|5A+"],
        }
    }

    /// A model under which the design shows its effect.
    ///
    /// Rescorla-Wagner leaves a non-reinforced novel cue untouched, so latent
    /// inhibition needs an attentional rule.
    pub fn suggested_model(self) -> &'static str {
        match self {
            Design::LatentInhibition => "Pearce Kaye Hall",
            _ => "Rescorla Wagner",
        }
    }

    pub fn experiments(self) -> PalmsResult<Vec<Experiment>> {
        self.lines()
            .iter()
            .map(|line| {
                let mut fields = line.split('|');
                let name = fields.next().unwrap_or_default();
                let phases: Vec<&str> = fields.collect();
                Experiment::new(name, &phases)
            })
            .collect()
    }

    pub fn run(self, args: &RunArgs) -> PalmsResult<SimulationReport> {
        let mut report = SimulationReport::default();
        for experiment in self.experiments()? {
            report.merge(SimulationReport::new(experiment.run_all_phases(args)?));
        }
        Ok(report)
    }
}
