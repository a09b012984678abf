//! Trial-by-trial simulation of Pavlovian associative learning.
//!
//! An [`experiment::Experiment`] is a named group taken through a sequence of
//! phases such as `10AB+/5A-`. Each presentation updates the associative
//! strength of every cue present according to one of the rules in
//! [`models`], and every update is recorded for later inspection.
//!
//! ```no_run
//! use palms::prelude::*;
//!
//! let args = RunArgs::default();
//! let experiment = Experiment::new("Blocking", &["10A+", "10AB+"])?;
//! let report = SimulationReport::new(experiment.run_all_phases(&args)?);
//! println!("{}", report.to_text(false));
//! # Ok::<(), PalmsError>(())
//! ```

#[path = "core/error.rs"]
pub mod error;

#[path = "core/names.rs"]
pub mod names;

#[path = "core/stimulus.rs"]
pub mod stimulus;

#[path = "core/environment.rs"]
pub mod environment;

#[path = "core/models.rs"]
pub mod models;

#[path = "core/phase.rs"]
pub mod phase;

#[path = "core/group.rs"]
pub mod group;

#[path = "core/config.rs"]
pub mod config;

#[path = "core/experiment.rs"]
pub mod experiment;

#[path = "core/script.rs"]
pub mod script;

pub mod observer;

pub mod experiments {
    pub mod designs;
}

pub mod prelude {
    pub use crate::config::RunArgs;
    pub use crate::environment::Environment;
    pub use crate::error::{PalmsError, PalmsResult};
    pub use crate::experiment::{Experiment, PhaseResults};
    pub use crate::group::{Group, PhaseHistory, PhaseOverrides};
    pub use crate::models::{build_rule, model_names, LearningRule, ModelParams};
    pub use crate::names::CueConfig;
    pub use crate::observer::{SeriesView, SimulationReport};
    pub use crate::phase::{Phase, Reinforcement, TrialPart};
    pub use crate::script::ExperimentFile;
    pub use crate::stimulus::{Stimulus, StimulusHistory, StimulusInit};
}
