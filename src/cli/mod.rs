use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};

use crate::application::PointService;
use crate::config::LedgerConfig;
use crate::domain::{format_points, AccountId, PointBalance, PointHistory, Points};
use crate::io::{ExportFormat, HistoryExporter};

/// Pointledger - per-account point balances
#[derive(Parser)]
#[command(name = "pointledger")]
#[command(about = "Charge, spend and audit per-account point balances")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file path (overrides the configuration file)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Log filter directive, e.g. "info" or "pointledger=debug"
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Show the balance of an account
    Point {
        /// Account ID
        id: AccountId,
    },

    /// Charge points to an account
    Charge {
        /// Account ID
        id: AccountId,

        /// Amount to charge (must be an allowed denomination)
        amount: Points,
    },

    /// Spend points from an account
    Use {
        /// Account ID
        id: AccountId,

        /// Amount to spend (must be an allowed denomination)
        amount: Points,
    },

    /// List an account's transactions, most recent first
    History {
        /// Account ID
        id: AccountId,

        /// Number of records to skip
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Maximum number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output format: table, csv, json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show the allowed charge and use amounts
    Denominations,
}

impl Cli {
    /// Load the configuration file if one was given, then apply overrides.
    pub fn load_config(&self) -> Result<LedgerConfig> {
        let mut config = match &self.config {
            Some(path) => LedgerConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => LedgerConfig::default(),
        };

        if let Some(database) = &self.database {
            config.storage.database = database.clone();
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        Ok(config)
    }

    pub fn run(self, config: LedgerConfig) -> Result<()> {
        let database = config.storage.database.clone();
        let policy = config.amount_policy();

        match self.command {
            Commands::Init => {
                PointService::init(&database, policy)?;
                println!("Database initialized: {}", database.display());
            }

            Commands::Point { id } => {
                let service = PointService::connect(&database, policy)?;
                print_balance(&service.query(id)?);
            }

            Commands::Charge { id, amount } => {
                let service = PointService::connect(&database, policy)?;
                let balance = service.charge(id, amount)?;
                println!("Charged {} points to account {}", format_points(amount), id);
                print_balance(&balance);
            }

            Commands::Use { id, amount } => {
                let service = PointService::connect(&database, policy)?;
                let balance = service.spend(id, amount)?;
                println!("Used {} points from account {}", format_points(amount), id);
                print_balance(&balance);
            }

            Commands::History {
                id,
                offset,
                limit,
                format,
            } => {
                let service = PointService::connect(&database, policy)?;
                run_history_command(&service, id, offset, limit, &format)?;
            }

            Commands::Denominations => {
                println!("Charge: {}", policy.charge);
                println!("Use:    {}", policy.spend);
            }
        }

        Ok(())
    }
}

fn print_balance(balance: &PointBalance) {
    println!(
        "Account {}: {} points (updated {})",
        balance.account_id,
        format_points(balance.point),
        balance.updated_at.format("%Y-%m-%d %H:%M:%S")
    );
}

fn run_history_command(
    service: &PointService,
    id: AccountId,
    offset: usize,
    limit: usize,
    format: &str,
) -> Result<()> {
    if format.eq_ignore_ascii_case("table") {
        let records = service.history(id, offset, limit)?;
        print_history_table(id, &records);
        return Ok(());
    }

    let format = ExportFormat::from_str(format)?;
    HistoryExporter::new(service).export(id, offset, limit, format, io::stdout().lock())?;
    Ok(())
}

fn print_history_table(id: AccountId, records: &[PointHistory]) {
    if records.is_empty() {
        println!("No history for account {}", id);
        return;
    }

    println!("{:<8} {:<8} {:>10}  {}", "ID", "KIND", "AMOUNT", "TIME");
    println!("{}", "-".repeat(48));
    for record in records {
        let time = DateTime::from_timestamp_millis(record.timestamp_millis)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
            .unwrap_or_else(|| record.timestamp_millis.to_string());
        println!(
            "{:<8} {:<8} {:>10}  {}",
            record.id,
            record.kind.as_str(),
            format_points(record.amount),
            time
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_charge() {
        let cli = Cli::try_parse_from(["pointledger", "charge", "1", "1000"]).unwrap();
        assert!(matches!(cli.command, Commands::Charge { id: 1, amount: 1000 }));
    }

    #[test]
    fn test_parse_history_defaults() {
        let cli = Cli::try_parse_from(["pointledger", "history", "3"]).unwrap();
        match cli.command {
            Commands::History {
                id,
                offset,
                limit,
                format,
            } => {
                assert_eq!((id, offset, limit), (3, 0, 20));
                assert_eq!(format, "table");
            }
            _ => panic!("expected history command"),
        }
    }

    #[test]
    fn test_database_flag_overrides_config() {
        let cli =
            Cli::try_parse_from(["pointledger", "--database", "other.db", "point", "1"]).unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.storage.database, PathBuf::from("other.db"));
    }

    #[test]
    fn test_log_level_flag_overrides_config() {
        let cli = Cli::try_parse_from(["pointledger", "denominations", "--log-level", "debug"])
            .unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.log.level, "debug");
    }
}
