use crate::types::{
    AggregateStats, Aggregation, CampaignRow, Cell, Metric, ProviderRecord, Summary, Week,
    WeekMetrics, WeekPair,
};
use crate::util::{normalize_provider, parse_cvr};
use std::collections::HashMap;
use tracing::debug;

#[derive(Default, Clone, Copy)]
struct Totals {
    enrollments: Metric,
    impressions: Metric,
    revenue: Metric,
    cvr: f64,
}

/// Fold campaign rows into per-provider records and a two-week summary.
///
/// Providers come out in the order their name was first seen. A row needs a
/// provider and a week to count at all; only weeks 1 and 2 contribute
/// figures, but any counted row registers its provider.
pub fn aggregate(rows: &[CampaignRow]) -> Aggregation {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut providers: Vec<ProviderRecord> = Vec::new();
    let mut totals: WeekPair<Totals> = WeekPair::default();
    let mut stats = AggregateStats {
        rows_seen: rows.len(),
        ..AggregateStats::default()
    };

    for row in rows {
        let (Some(provider), Some(week_cell)) = (present_provider(row), present_week(row)) else {
            stats.rows_discarded += 1;
            continue;
        };

        let name = normalize_provider(provider);
        let slot = match index.get(&name) {
            Some(&i) => i,
            None => {
                providers.push(ProviderRecord::new(name.clone()));
                index.insert(name, providers.len() - 1);
                providers.len() - 1
            }
        };

        let Some(week) = Week::from_cell(week_cell) else {
            stats.rows_outside_weeks += 1;
            continue;
        };

        let metrics = WeekMetrics {
            enrollments: Metric::from_cell(row.enrollment_count.as_ref()),
            impressions: Metric::from_cell(row.impressions.as_ref()),
            revenue: Metric::from_cell(row.revenue.as_ref()),
            cvr: parse_cvr(row.cvr.as_ref()),
        };
        providers[slot].set_week(week, metrics);

        let t = totals.get_mut(week);
        t.enrollments = t.enrollments + metrics.enrollments;
        t.impressions = t.impressions + metrics.impressions;
        t.revenue = t.revenue + metrics.revenue;
        t.cvr += metrics.cvr;
    }

    let provider_count = providers.len();
    let pick = |f: fn(&Totals) -> Metric| WeekPair {
        week1: f(&totals.week1),
        week2: f(&totals.week2),
    };
    let summary = Summary {
        total_enrollments: pick(|t| t.enrollments),
        total_impressions: pick(|t| t.impressions),
        total_revenue: pick(|t| t.revenue),
        average_cvr: WeekPair {
            week1: totals.week1.cvr_average(provider_count),
            week2: totals.week2.cvr_average(provider_count),
        },
    };

    debug!(
        providers = provider_count,
        discarded = stats.rows_discarded,
        outside_weeks = stats.rows_outside_weeks,
        "aggregated campaign rows"
    );

    Aggregation {
        providers,
        summary,
        stats,
    }
}

impl Totals {
    fn cvr_average(&self, provider_count: usize) -> Metric {
        Metric::Value(self.cvr).average_over(provider_count)
    }
}

fn present_provider(row: &CampaignRow) -> Option<&str> {
    row.provider.as_deref().filter(|p| !p.is_empty())
}

fn present_week(row: &CampaignRow) -> Option<&Cell> {
    row.week.as_ref().filter(|w| w.is_truthy())
}
