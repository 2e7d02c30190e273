use anyhow::Result;
use clap::{Parser, Subcommand};
use outlay_core::Money;
use std::path::PathBuf;

mod commands;
mod config;

#[derive(Parser)]
#[command(
    name = "outlay",
    version,
    about = "Monthly spending review over bank CSV exports"
)]
struct Cli {
    /// TOML config file with folder / rules / budget defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether the current month's transaction CSV is present.
    ///
    /// Exits nonzero when it is missing, so wrappers can branch on it.
    Check {
        /// Folder containing the monthly CSV exports.
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// Render the cumulative spending-vs-budget chart for one export.
    Graph {
        /// Transaction CSV to plot.
        csv: PathBuf,
        /// Target budget for the export's period.
        #[arg(long)]
        budget: Option<Money>,
        /// Output PNG path.
        #[arg(long, default_value = "spending_graph.png")]
        out: PathBuf,
    },
    /// Categorize one export and render the per-category chart.
    Categories {
        /// Transaction CSV to categorize.
        csv: PathBuf,
        /// Classification CSV: columns are categories, cells are keywords.
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Output PNG path.
        #[arg(long, default_value = "spending_categories.png")]
        out: PathBuf,
        /// Where to list transactions no keyword matched.
        #[arg(long, default_value = "other_transactions.txt")]
        other_out: PathBuf,
    },
    /// Aggregate recent months and write the budget review report.
    Review {
        #[arg(long)]
        folder: Option<PathBuf>,
        /// How many months (or billing cycles) to analyze.
        #[arg(long)]
        months: usize,
        #[arg(long)]
        budget: Option<Money>,
        /// Billing cutoff day (1-31); switches from calendar months to
        /// billing cycles ending on this day.
        #[arg(long)]
        cutoff_day: Option<u32>,
        /// Output path for the review text.
        #[arg(long, default_value = "budget_review.txt")]
        out: PathBuf,
    },
    /// Driver: run last month's graph and categories steps and log
    /// notification messages.
    Run {
        #[arg(long)]
        folder: Option<PathBuf>,
        #[arg(long)]
        rules: Option<PathBuf>,
        #[arg(long)]
        budget: Option<Money>,
        /// Where the PNGs and the notifications log are written.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let file = config::FileConfig::load(cli.config.as_deref())?;
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Command::Check { folder } => {
            let folder = config::merge("folder", folder, file.folder)?;
            if !commands::check(&folder, today)? {
                std::process::exit(1);
            }
        }
        Command::Graph { csv, budget, out } => {
            let budget = config::merge("budget", budget, file.budget)?;
            commands::graph(&csv, budget, &out)?;
        }
        Command::Categories {
            csv,
            rules,
            out,
            other_out,
        } => {
            let rules = config::merge("rules", rules, file.rules)?;
            commands::categories(&csv, &rules, &out, &other_out)?;
        }
        Command::Review {
            folder,
            months,
            budget,
            cutoff_day,
            out,
        } => {
            let folder = config::merge("folder", folder, file.folder)?;
            let budget = config::merge("budget", budget, file.budget)?;
            let cutoff_day = cutoff_day.or(file.cutoff_day);
            commands::review(&folder, months, budget, cutoff_day, &out, today)?;
        }
        Command::Run {
            folder,
            rules,
            budget,
            out_dir,
        } => {
            let folder = config::merge("folder", folder, file.folder)?;
            let rules = config::merge("rules", rules, file.rules)?;
            let budget = config::merge("budget", budget, file.budget)?;
            commands::run_pipeline(&folder, &rules, budget, &out_dir, today)?;
        }
    }

    Ok(())
}
