use std::fs;
use std::io::{self, Read as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::Level;

use palms::experiments::designs::Design;
use palms::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "palms", version, about = "Simulate Pavlovian associative learning")]
struct Cli {
    /// Log every phase and repetition
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the experiments of a file (`-` reads stdin)
    Run {
        file: PathBuf,

        #[command(flatten)]
        opts: RunOpts,

        /// JSON file with run parameters
        #[arg(long)]
        params: Option<PathBuf>,
    },
    /// Run one of the built-in designs
    Demo {
        /// blocking, overshadowing, conditioned-inhibition, extinction, latent-inhibition
        design: String,

        #[command(flatten)]
        opts: RunOpts,
    },
    /// List the available models
    Models,
}

#[derive(Args, Debug)]
struct RunOpts {
    /// Learning rule, e.g. "Rescorla Wagner" or "le_pelley"
    #[arg(long)]
    model: Option<String>,

    /// Seed for randomized phases
    #[arg(long)]
    seed: Option<u64>,

    /// Extra parameters, e.g. --set alpha_A=0.3 --set num_trials=500
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Print JSON rows instead of a table
    #[arg(long)]
    json: bool,
}

impl RunOpts {
    fn apply(&self, args: &mut RunArgs) -> Result<(), PalmsError> {
        if let Some(model) = &self.model {
            args.adaptive_type = model.clone();
        }
        if self.seed.is_some() {
            args.seed = self.seed;
        }
        for directive in &self.set {
            let (name, value) = directive
                .split_once('=')
                .ok_or_else(|| PalmsError::Directive(directive.clone()))?;
            args.set_value(name, value)?;
        }
        Ok(())
    }

    fn print(
        &self,
        report: &SimulationReport,
        args: &RunArgs,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.json {
            println!("{}", report.to_json()?);
        } else {
            let dual = build_rule(&args.adaptive_type, args.model_params())?.uses_dual_alphas();
            print!("{}", report.to_text(dual));
        }
        Ok(())
    }
}

fn read_input(path: &Path) -> io::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(path)
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Run { file, opts, params } => {
            let mut args = match params {
                Some(p) => serde_json::from_str(&fs::read_to_string(p)?)?,
                None => RunArgs::default(),
            };
            opts.apply(&mut args)?;

            let experiments = ExperimentFile::parse(&read_input(&file)?, &args)?;
            tracing::info!(
                experiments = experiments.len(),
                file = %file.display(),
                "loaded experiment file"
            );

            let report = SimulationReport::new(experiments.run()?);
            let last_args = experiments.entries.last().map_or(&args, |(a, _)| a);
            opts.print(&report, last_args)?;
        }
        Command::Demo { design, opts } => {
            let design = Design::from_name(&design).ok_or_else(|| {
                PalmsError::InvalidConfig(format!("unknown design \"{design}\""))
            })?;

            let mut args = RunArgs {
                adaptive_type: design.suggested_model().to_string(),
                ..RunArgs::default()
            };
            opts.apply(&mut args)?;

            for line in design.lines() {
                tracing::info!(design = design.name(), "{line}");
            }
            let report = design.run(&args)?;
            opts.print(&report, &args)?;
        }
        Command::Models => {
            for name in model_names() {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}
