use crate::core::validator::FormFields;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "nomination-board")]
#[command(about = "Event slot registration with a live per-day tally")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "nomination.toml", global = true)]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit one nomination
    Register(RegisterArgs),

    /// Print the current registrations per day and slot
    Tally {
        /// Also write the counts as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Keep the board on screen and redraw it on every change
    Watch,
}

#[derive(Debug, Clone, Args)]
pub struct RegisterArgs {
    /// Complete name
    #[arg(long, default_value = "")]
    pub name: String,

    /// Flat number with wing, e.g. A-101
    #[arg(long, default_value = "")]
    pub flat: String,

    /// 10-digit phone number
    #[arg(long, default_value = "")]
    pub phone: String,

    /// Date as YYYY-MM-DD
    #[arg(long, default_value = "")]
    pub date: String,

    /// Morning or Evening
    #[arg(long, default_value = "")]
    pub slot: String,

    /// Bringing own pooja thali and prasad
    #[arg(long)]
    pub own_thali: bool,
}

impl From<RegisterArgs> for FormFields {
    fn from(args: RegisterArgs) -> Self {
        FormFields {
            full_name: args.name,
            flat_number: args.flat,
            phone_number: args.phone,
            date: args.date,
            slot: args.slot,
            brings_own_offering_set: args.own_thali,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_args_map_to_form() {
        let cli = Cli::parse_from([
            "nomination-board",
            "register",
            "--name",
            "Asha",
            "--flat",
            "a-101",
            "--phone",
            "9876543210",
            "--date",
            "2025-08-27",
            "--slot",
            "Morning",
            "--own-thali",
        ]);
        let Command::Register(args) = cli.command else {
            panic!("expected register");
        };
        let fields = FormFields::from(args);
        assert_eq!(fields.flat_number, "a-101");
        assert!(fields.brings_own_offering_set);
    }

    #[test]
    fn test_missing_register_args_default_to_empty() {
        let cli = Cli::parse_from(["nomination-board", "--verbose", "register"]);
        assert!(cli.verbose);
        let Command::Register(args) = cli.command else {
            panic!("expected register");
        };
        assert_eq!(FormFields::from(args), FormFields::default());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["nomination-board", "tally", "--config", "x.toml", "--csv", "out.csv"]);
        assert_eq!(cli.config, "x.toml");
        assert!(matches!(cli.command, Command::Tally { csv: Some(_) }));
    }
}
