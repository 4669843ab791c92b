use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "climasense",
    version,
    about = "Agricultural forecast risk console"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Re-run interactive setup
    Init,
    /// Validate config and test the forecast connection
    Check,
    /// Fetch the forecast and print the advisory
    Advisory {
        /// Days to aggregate over
        #[arg(short, long, default_value_t = 7)]
        window: usize,
        /// Override the configured region
        #[arg(long)]
        region: Option<String>,
        /// Override the configured crop
        #[arg(long)]
        crop: Option<String>,
        /// Override the configured season
        #[arg(long)]
        season: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Fetch the forecast and write it as CSV
    Export {
        /// Output directory (defaults to config, then the download dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print heatmap samples for one forecast day as JSON
    Heatmap {
        /// Zero-based day index into the forecast
        #[arg(short, long, default_value_t = 0)]
        day: usize,
        /// rain, temp or moisture
        #[arg(short, long, default_value = "rain")]
        metric: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_advisory_overrides() {
        let cli = Cli::try_parse_from([
            "climasense",
            "advisory",
            "--window",
            "3",
            "--crop",
            "wheat",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Some(Commands::Advisory {
                window, crop, region, ..
            }) => {
                assert_eq!(window, 3);
                assert_eq!(crop.as_deref(), Some("wheat"));
                assert!(region.is_none());
            }
            _ => panic!("expected advisory command"),
        }
    }

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["climasense", "--config", "/tmp/c.yaml"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yaml")));
    }
}
