use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use tabled::Tabled;

/// One line of the campaign export exactly as the CSV reader hands it over.
///
/// Every column is optional: short rows and missing headers both end up as
/// `None` rather than failing the whole file.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Provider")]
    pub provider: Option<String>,
    #[serde(rename = "Week")]
    pub week: Option<String>,
    #[serde(rename = "Enrollment count")]
    pub enrollment_count: Option<String>,
    #[serde(rename = "Impressions")]
    pub impressions: Option<String>,
    #[serde(rename = "Revenue")]
    pub revenue: Option<String>,
    #[serde(rename = "CVR")]
    pub cvr: Option<String>,
}

/// A cell after the cleaning transform: either a number or the original text.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    /// Empty text and numeric zero count as "not there" for the presence checks.
    pub fn is_truthy(&self) -> bool {
        match self {
            Cell::Number(n) => *n != 0.0 && !n.is_nan(),
            Cell::Text(s) => !s.is_empty(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(_) => None,
        }
    }
}

/// A typed row ready for aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignRow {
    pub provider: Option<String>,
    pub week: Option<Cell>,
    pub enrollment_count: Option<Cell>,
    pub impressions: Option<Cell>,
    pub revenue: Option<Cell>,
    pub cvr: Option<Cell>,
}

/// The two observation periods being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Week {
    One,
    Two,
}

impl Week {
    /// Only an exact numeric 1 or 2 selects a week.
    pub fn from_cell(cell: &Cell) -> Option<Week> {
        match cell.as_number() {
            Some(n) if n == 1.0 => Some(Week::One),
            Some(n) if n == 2.0 => Some(Week::Two),
            _ => None,
        }
    }
}

/// A numeric value that may be missing or unusable.
///
/// `Unavailable` absorbs arithmetic: anything added to it stays unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "Option<f64>")]
pub enum Metric {
    Value(f64),
    Unavailable,
}

impl Metric {
    pub fn from_cell(cell: Option<&Cell>) -> Metric {
        match cell.and_then(Cell::as_number) {
            Some(n) => Metric::Value(n),
            None => Metric::Unavailable,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::Unavailable => None,
        }
    }

    pub fn or_zero(self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    pub fn average_over(self, divisor: usize) -> Metric {
        match self {
            Metric::Value(v) if divisor > 0 => Metric::Value(v / divisor as f64),
            _ => Metric::Unavailable,
        }
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Value(0.0)
    }
}

impl Add for Metric {
    type Output = Metric;

    fn add(self, rhs: Metric) -> Metric {
        match (self, rhs) {
            (Metric::Value(a), Metric::Value(b)) => Metric::Value(a + b),
            _ => Metric::Unavailable,
        }
    }
}

impl From<Metric> for Option<f64> {
    fn from(m: Metric) -> Self {
        m.value()
    }
}

/// The four measurements a provider reports for one week.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeekMetrics {
    pub enrollments: Metric,
    pub impressions: Metric,
    pub revenue: Metric,
    /// Conversion rate in percent; 0 when the cell did not parse.
    pub cvr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRecord {
    pub name: String,
    pub week1: Option<WeekMetrics>,
    pub week2: Option<WeekMetrics>,
}

impl ProviderRecord {
    pub fn new(name: String) -> Self {
        ProviderRecord {
            name,
            week1: None,
            week2: None,
        }
    }

    pub fn week(&self, week: Week) -> Option<&WeekMetrics> {
        match week {
            Week::One => self.week1.as_ref(),
            Week::Two => self.week2.as_ref(),
        }
    }

    pub fn set_week(&mut self, week: Week, metrics: WeekMetrics) {
        match week {
            Week::One => self.week1 = Some(metrics),
            Week::Two => self.week2 = Some(metrics),
        }
    }

    /// Enrollments for `week`, unavailable when the provider had no row for it.
    pub fn enrollments(&self, week: Week) -> Metric {
        self.week(week)
            .map(|m| m.enrollments)
            .unwrap_or(Metric::Unavailable)
    }
}

/// A value observed once per week.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WeekPair<T> {
    pub week1: T,
    pub week2: T,
}

impl<T> WeekPair<T> {
    pub fn get_mut(&mut self, week: Week) -> &mut T {
        match week {
            Week::One => &mut self.week1,
            Week::Two => &mut self.week2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Summary {
    pub total_enrollments: WeekPair<Metric>,
    pub total_impressions: WeekPair<Metric>,
    pub total_revenue: WeekPair<Metric>,
    /// Sum of parsed CVRs divided by the number of distinct providers.
    pub average_cvr: WeekPair<Metric>,
}

/// Row counts gathered while aggregating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AggregateStats {
    pub rows_seen: usize,
    pub rows_discarded: usize,
    pub rows_outside_weeks: usize,
}

impl AggregateStats {
    /// Rows that landed in week 1 or week 2.
    pub fn rows_kept(&self) -> usize {
        self.rows_seen - self.rows_discarded - self.rows_outside_weeks
    }
}

/// Everything derived from one load. Replaced wholesale on the next load.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregation {
    pub providers: Vec<ProviderRecord>,
    pub summary: Summary,
    pub stats: AggregateStats,
}

/// Result of comparing a week-1 value against its week-2 counterpart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentChange {
    Change(f64),
    NotAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Flat,
    Unknown,
}

impl PercentChange {
    pub fn value(self) -> Option<f64> {
        match self {
            PercentChange::Change(v) => Some(v),
            PercentChange::NotAvailable => None,
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            PercentChange::Change(v) if v > 0.0 => Direction::Up,
            PercentChange::Change(v) if v < 0.0 => Direction::Down,
            PercentChange::Change(_) => Direction::Flat,
            PercentChange::NotAvailable => Direction::Unknown,
        }
    }
}

impl fmt::Display for PercentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PercentChange::Change(v) => {
                // Sign first, then the magnitude rounded with ties away from
                // zero. An exact `-0.0` prints unsigned.
                if *v < 0.0 {
                    f.write_str("-")?;
                }
                write!(f, "{:.1}", round_tenths_half_up(v.abs()))
            }
            PercentChange::NotAvailable => write!(f, "N/A"),
        }
    }
}

/// `{:.1}` rounds exact ties to even; exports expect `0.25` to show as `0.3`.
fn round_tenths_half_up(magnitude: f64) -> f64 {
    // Multiplying by 4 is exact, so this only matches true x.x5 ties.
    let quarters = magnitude * 4.0;
    if quarters.fract() == 0.0 && quarters % 2.0 == 1.0 {
        (magnitude * 10.0).ceil() / 10.0
    } else {
        magnitude
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Flat => "flat",
            Direction::Unknown => "n/a",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SummaryCardRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Week1")]
    #[tabled(rename = "Week1")]
    pub week1: String,
    #[serde(rename = "Week2")]
    #[tabled(rename = "Week2")]
    pub week2: String,
    #[serde(rename = "Change")]
    #[tabled(rename = "Change")]
    pub change: String,
    #[serde(rename = "Direction")]
    #[tabled(rename = "Direction")]
    pub direction: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ProviderComparisonRow {
    #[serde(rename = "Provider")]
    #[tabled(rename = "Provider")]
    pub provider: String,
    #[serde(rename = "Week1Enrollments")]
    #[tabled(rename = "Week1Enrollments")]
    pub week1_enrollments: String,
    #[serde(rename = "Week2Enrollments")]
    #[tabled(rename = "Week2Enrollments")]
    pub week2_enrollments: String,
    #[serde(rename = "Change")]
    #[tabled(rename = "Change")]
    pub change: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopPerformerRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Provider")]
    #[tabled(rename = "Provider")]
    pub provider: String,
    #[serde(rename = "Week2Enrollments")]
    #[tabled(rename = "Week2Enrollments")]
    pub week2_enrollments: String,
    #[serde(rename = "Change")]
    #[tabled(rename = "Change")]
    pub change: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct LargestChangeRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Provider")]
    #[tabled(rename = "Provider")]
    pub provider: String,
    #[serde(rename = "Change")]
    #[tabled(rename = "Change")]
    pub change: String,
    #[serde(rename = "Direction")]
    #[tabled(rename = "Direction")]
    pub direction: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub provider_count: usize,
    pub rows_seen: usize,
    pub rows_kept: usize,
    pub rows_discarded: usize,
    pub rows_outside_weeks: usize,
    pub summary: Summary,
}
