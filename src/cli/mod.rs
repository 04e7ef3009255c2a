// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands the resulting
// config to Layer 2 (application).
//
// Two commands are supported:
//   1. `run`     — lift a 2D dataset to 3D and save 3dposes
//   2. `convert` — turn a PyTorch checkpoint into a Burn one

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ConvertArgs, RunArgs};

/// The main CLI struct
#[derive(Parser, Debug)]
#[command(
    name = "pose-lift",
    version,
    about = "Lift 2D human pose predictions to 3D with a pretrained linear model."
)]
pub struct Cli {
    /// The subcommand to run (run or convert)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Run(args)     => Self::run_lift(args),
            Commands::Convert(args) => Self::run_convert(args),
        }
    }

    fn run_lift(args: RunArgs) -> Result<()> {
        use crate::application::lift_use_case::LiftUseCase;

        tracing::info!("Lifting poses from: {}", args.data_dir.display());

        let path = LiftUseCase::new(args.into()).execute()?;
        println!("Predictions saved to {}", path.display());
        Ok(())
    }

    fn run_convert(args: ConvertArgs) -> Result<()> {
        use crate::application::convert_use_case::ConvertUseCase;

        let path = ConvertUseCase::new(args.into()).execute()?;
        println!("Checkpoint written to {}", path.display());
        Ok(())
    }
}
