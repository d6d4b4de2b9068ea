//! Command line configuration

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::{CrateResult, SphereError};

#[derive(Parser, Debug)]
#[command(name = "rotating-sphere")]
#[command(about = "Rotating point-cloud sphere, projected on the GPU with a host fallback")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the animation (the default when no subcommand is given)
    Run(RunArgs),
    /// List every compute adapter and which one would be selected
    Devices,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Latitude samples of the sphere
    #[arg(long, default_value_t = 120)]
    pub lat_steps: u32,

    /// Longitude samples of the sphere
    #[arg(long, default_value_t = 240)]
    pub lon_steps: u32,

    /// Stop after this many frames (runs until ctrl-c otherwise)
    #[arg(short, long)]
    pub frames: Option<u64>,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Canvas height in pixels
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Skip accelerator setup and transform on the host
    #[arg(long)]
    pub cpu_only: bool,

    /// Write the last frame to this PNG file on exit
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

impl RunArgs {
    pub fn validate(&self) -> CrateResult<()> {
        if self.lat_steps == 0 || self.lon_steps == 0 {
            return Err(SphereError::InvalidArgument(
                "--lat-steps and --lon-steps must be at least 1".into(),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(SphereError::InvalidArgument(
                "--width and --height must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_density() {
        let cli = Cli::try_parse_from(["rotating-sphere"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.lat_steps, 120);
        assert_eq!(cli.run.lon_steps, 240);
        assert_eq!((cli.run.width, cli.run.height), (800, 600));
        assert!(!cli.run.cpu_only);
        assert!(cli.run.validate().is_ok());
    }

    #[test]
    fn zero_steps_fail_validation() {
        let cli = Cli::try_parse_from(["rotating-sphere", "--lat-steps", "0"]).unwrap();
        assert!(matches!(
            cli.run.validate(),
            Err(SphereError::InvalidArgument(_))
        ));
    }

    #[test]
    fn devices_subcommand() {
        let cli = Cli::try_parse_from(["rotating-sphere", "devices"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Devices)));
    }

    #[test]
    fn explicit_run_subcommand() {
        let cli = Cli::try_parse_from(["rotating-sphere", "run", "--lat-steps", "8"]).unwrap();
        match cli.command {
            Some(Commands::Run(args)) => assert_eq!(args.lat_steps, 8),
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn run_flags() {
        let cli = Cli::try_parse_from([
            "rotating-sphere",
            "--frames",
            "30",
            "--cpu-only",
            "--snapshot",
            "out.png",
        ])
        .unwrap();
        assert_eq!(cli.run.frames, Some(30));
        assert!(cli.run.cpu_only);
        assert_eq!(cli.run.snapshot, Some(PathBuf::from("out.png")));
    }
}
