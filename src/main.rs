// Entry point and high-level CLI flow.
//
// - Option [1] loads the campaign export and aggregates it per provider.
// - Option [2] writes the summary cards, provider comparison and rankings
//   to CSV plus a JSON summary, previewing each on the console.
// - After generating reports, the user can go back to the menu or exit.
mod aggregate;
mod config;
mod error;
mod loader;
mod output;
mod reports;
mod types;
mod util;

use clap::Parser;
use config::Config;
use loader::LoadReport;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use types::Aggregation;

// The last successful load. A failed load leaves it as it was.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    data: Option<Aggregation>,
}

impl AppState {
    /// Swap in a fresh aggregation, or keep the current one if loading failed.
    fn apply(&mut self, loaded: error::Result<Aggregation>) -> bool {
        match loaded {
            Ok(agg) => {
                self.data = Some(agg);
                true
            }
            Err(e) => {
                error!(error = %e, "error processing data");
                false
            }
        }
    }
}

fn app_state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
///
/// Returns `None` once stdin is closed.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ask the user whether to go back to the report selection menu after
/// generating reports.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N` or
/// stdin is closed.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        match io::stdin().read_line(&mut buf) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn load(path: &Path) -> error::Result<(Aggregation, LoadReport)> {
    let (rows, load_report) = loader::load_rows(path)?;
    Ok((aggregate::aggregate(&rows), load_report))
}

/// Handle option [1]: load and aggregate the export.
fn handle_load(cfg: &Config) {
    info!(path = %cfg.input.display(), "loading campaign export");
    let loaded = load(&cfg.input).map(|(agg, load_report)| {
        println!(
            "Processing dataset... ({} rows read, {} providers)",
            util::format_int(load_report.total_rows),
            util::format_int(agg.providers.len())
        );
        println!(
            "{} rows kept for week 1 and week 2.",
            util::format_int(agg.stats.rows_kept())
        );
        if load_report.parse_errors > 0 {
            println!(
                "Note: {} rows skipped due to parse errors.",
                util::format_int(load_report.parse_errors)
            );
        }
        if agg.stats.rows_discarded > 0 {
            println!(
                "Note: {} rows skipped for a missing provider or week.",
                util::format_int(agg.stats.rows_discarded)
            );
        }
        if agg.stats.rows_outside_weeks > 0 {
            println!(
                "Note: {} rows ignored for a week other than 1 or 2.",
                util::format_int(agg.stats.rows_outside_weeks)
            );
            warn!(
                rows = agg.stats.rows_outside_weeks,
                "rows outside week 1 and week 2 were ignored"
            );
        }
        println!();
        agg
    });
    app_state().apply(loaded);
}

fn export<T: serde::Serialize>(cfg: &Config, file_name: &str, rows: &[T]) {
    let path = cfg.output_path(file_name);
    if let Err(e) = output::write_csv(&path, rows) {
        error!(path = %path.display(), error = %e, "write error");
    }
}

/// Handle option [2]: generate every report and the JSON summary.
///
/// Writes four CSV files and `summary.json` into the output directory and
/// prints a Markdown preview of each report.
fn handle_generate_reports(cfg: &Config) {
    let data = app_state().data.clone();
    let Some(agg) = data else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };

    if let Err(e) = std::fs::create_dir_all(&cfg.out_dir) {
        error!(dir = %cfg.out_dir.display(), error = %e, "cannot create output directory");
        return;
    }

    println!("Generating reports...");
    println!("Outputs saved to {}\n", cfg.out_dir.display());

    let cards = reports::summary_cards(&agg);
    export(cfg, "summary_cards.csv", &cards);
    println!("Campaign Performance Summary\n");
    output::preview_table_rows(&cards, cards.len());

    let comparison = reports::provider_comparison(&agg);
    export(cfg, "provider_comparison.csv", &comparison);
    println!("Enrollment Comparison by Provider\n");
    output::preview_table_rows(&comparison, 10);
    println!("(Full table exported to provider_comparison.csv)\n");

    let top = reports::top_performer_rows(&agg, cfg.top);
    export(cfg, "top_performers.csv", &top);
    println!("Top Performers (Week 2)\n");
    output::preview_table_rows(&top, cfg.top);

    let changes = reports::largest_change_rows(&agg, cfg.top);
    export(cfg, "largest_changes.csv", &changes);
    println!("Largest Changes\n");
    output::preview_table_rows(&changes, cfg.top);

    let summary = reports::generate_summary(&agg);
    let summary_path = cfg.output_path("summary.json");
    if let Err(e) = output::write_json(&summary_path, &summary) {
        error!(path = %summary_path.display(), error = %e, "write error");
    }
    info!(providers = summary.provider_count, "reports written");
}

fn main() -> anyhow::Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    let cfg = Config::parse();

    if cfg.once {
        handle_load(&cfg);
        handle_generate_reports(&cfg);
        return Ok(());
    }

    loop {
        println!("Campaign Comparison");
        println!("[1] Load the file");
        println!("[2] Generate Reports\n");
        let Some(choice) = read_choice() else {
            break;
        };
        match choice.as_str() {
            "1" => {
                handle_load(&cfg);
            }
            "2" => {
                println!();
                handle_generate_reports(&cfg);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
    Ok(())
}
