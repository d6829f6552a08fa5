use clap::Parser;
use std::path::PathBuf;

/// Week-over-week comparison of healthcare campaign metrics.
#[derive(Debug, Clone, Parser)]
#[command(name = "campaign_report")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Campaign export to read.
    #[arg(
        long,
        env = "CAMPAIGN_INPUT",
        default_value = "Healthcare Data - Health Summary (1).csv"
    )]
    pub input: PathBuf,

    /// Directory the report files are written to.
    #[arg(long, env = "CAMPAIGN_OUT_DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Number of providers in each ranking.
    #[arg(long, env = "CAMPAIGN_TOP", default_value_t = 5)]
    pub top: usize,

    /// Load and report once, then exit.
    #[arg(long)]
    pub once: bool,
}

impl Config {
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.out_dir.join(file_name)
    }
}
