use crate::types::{
    Aggregation, LargestChangeRow, Metric, PercentChange, ProviderComparisonRow, ProviderRecord,
    SummaryCardRow, SummaryStats, TopPerformerRow, Week, WeekPair,
};
use crate::util::{format_change, format_count, format_metric, percent_change};
use std::cmp::Ordering;

fn enrollment_change(p: &ProviderRecord) -> PercentChange {
    percent_change(p.enrollments(Week::One), p.enrollments(Week::Two))
}

/// Providers with the most week-2 enrollments, best first.
///
/// Missing or unusable figures rank as zero; ties keep first-seen order.
pub fn top_performers(providers: &[ProviderRecord], n: usize) -> Vec<&ProviderRecord> {
    let mut ranked: Vec<&ProviderRecord> = providers.iter().collect();
    ranked.sort_by(|a, b| {
        let (a, b) = (a.enrollments(Week::Two).or_zero(), b.enrollments(Week::Two).or_zero());
        b.partial_cmp(&a).unwrap_or(Ordering::Equal)
    });
    ranked.truncate(n);
    ranked
}

/// Providers whose enrollments moved the most between the weeks, by absolute
/// percent change. Providers without a comparable change go last.
pub fn largest_changes(providers: &[ProviderRecord], n: usize) -> Vec<&ProviderRecord> {
    let mut ranked: Vec<(Option<f64>, &ProviderRecord)> = providers
        .iter()
        .map(|p| (enrollment_change(p).value().map(f64::abs), p))
        .collect();
    ranked.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    ranked.into_iter().take(n).map(|(_, p)| p).collect()
}

pub fn summary_cards(agg: &Aggregation) -> Vec<SummaryCardRow> {
    let s = &agg.summary;
    vec![
        card("Total Enrollments", s.total_enrollments, format_count),
        card("Total Impressions", s.total_impressions, format_count),
        card("Total Revenue", s.total_revenue, |m| match m {
            Metric::Value(_) => format!("${}", format_metric(m, 2)),
            Metric::Unavailable => format_metric(m, 2),
        }),
        card("Average CVR", s.average_cvr, |m| match m {
            Metric::Value(_) => format!("{}%", format_metric(m, 2)),
            Metric::Unavailable => format_metric(m, 2),
        }),
    ]
}

fn card(title: &str, pair: WeekPair<Metric>, render: fn(Metric) -> String) -> SummaryCardRow {
    let change = percent_change(pair.week1, pair.week2);
    SummaryCardRow {
        metric: title.to_string(),
        week1: render(pair.week1),
        week2: render(pair.week2),
        change: format_change(change),
        direction: change.direction().to_string(),
    }
}

/// Week-over-week enrollments for every provider, in first-seen order.
pub fn provider_comparison(agg: &Aggregation) -> Vec<ProviderComparisonRow> {
    agg.providers
        .iter()
        .map(|p| ProviderComparisonRow {
            provider: p.name.clone(),
            week1_enrollments: format_count(p.enrollments(Week::One)),
            week2_enrollments: format_count(p.enrollments(Week::Two)),
            change: format_change(enrollment_change(p)),
        })
        .collect()
}

pub fn top_performer_rows(agg: &Aggregation, n: usize) -> Vec<TopPerformerRow> {
    top_performers(&agg.providers, n)
        .into_iter()
        .enumerate()
        .map(|(idx, p)| TopPerformerRow {
            rank: idx + 1,
            provider: p.name.clone(),
            week2_enrollments: format_count(p.enrollments(Week::Two)),
            change: format_change(enrollment_change(p)),
        })
        .collect()
}

pub fn largest_change_rows(agg: &Aggregation, n: usize) -> Vec<LargestChangeRow> {
    largest_changes(&agg.providers, n)
        .into_iter()
        .enumerate()
        .map(|(idx, p)| {
            let change = enrollment_change(p);
            LargestChangeRow {
                rank: idx + 1,
                provider: p.name.clone(),
                change: format_change(change),
                direction: change.direction().to_string(),
            }
        })
        .collect()
}

pub fn generate_summary(agg: &Aggregation) -> SummaryStats {
    SummaryStats {
        generated_at: chrono::Utc::now(),
        provider_count: agg.providers.len(),
        rows_seen: agg.stats.rows_seen,
        rows_kept: agg.stats.rows_kept(),
        rows_discarded: agg.stats.rows_discarded,
        rows_outside_weeks: agg.stats.rows_outside_weeks,
        summary: agg.summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WeekMetrics;

    fn provider(name: &str, w1: Option<f64>, w2: Option<f64>) -> ProviderRecord {
        let block = |e: f64| WeekMetrics {
            enrollments: Metric::Value(e),
            impressions: Metric::Value(0.0),
            revenue: Metric::Value(0.0),
            cvr: 0.0,
        };
        ProviderRecord {
            name: name.to_string(),
            week1: w1.map(block),
            week2: w2.map(block),
        }
    }

    fn names(v: &[&ProviderRecord]) -> Vec<String> {
        v.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn top_performers_rank_by_week_two() {
        let providers = vec![
            provider("A", Some(5.0), Some(10.0)),
            provider("B", Some(1.0), None),
            provider("C", None, Some(30.0)),
            provider("D", Some(9.0), Some(10.0)),
            provider("E", Some(2.0), Some(20.0)),
            provider("F", Some(2.0), Some(1.0)),
            provider("G", Some(2.0), Some(0.5)),
        ];
        let top = top_performers(&providers, 5);
        assert_eq!(names(&top), ["C", "E", "A", "D", "F"]);
        // Ranking is a view; input order is untouched.
        assert_eq!(providers[0].name, "A");
    }

    #[test]
    fn largest_changes_rank_by_magnitude_with_unavailable_last() {
        let providers = vec![
            provider("flat", Some(10.0), Some(10.0)),
            provider("no-base", None, Some(50.0)),
            provider("drop", Some(100.0), Some(10.0)),
            provider("zero-base", Some(0.0), Some(5.0)),
            provider("rise", Some(10.0), Some(15.0)),
            provider("surge", Some(10.0), Some(40.0)),
        ];
        let ranked = largest_changes(&providers, 6);
        assert_eq!(
            names(&ranked),
            ["surge", "drop", "rise", "flat", "no-base", "zero-base"]
        );
        assert_eq!(largest_changes(&providers, 2).len(), 2);
    }

    #[test]
    fn change_rows_carry_direction() {
        let agg = Aggregation {
            providers: vec![
                provider("up", Some(10.0), Some(20.0)),
                provider("down", Some(10.0), Some(5.0)),
                provider("none", None, Some(5.0)),
            ],
            ..Aggregation::default()
        };
        let rows = largest_change_rows(&agg, 5);
        assert_eq!(rows[0].provider, "up");
        assert_eq!(rows[0].change, "100.0%");
        assert_eq!(rows[0].direction, "up");
        assert_eq!(rows[1].change, "-50.0%");
        assert_eq!(rows[1].direction, "down");
        assert_eq!(rows[2].change, "N/A");
        assert_eq!(rows[2].direction, "n/a");
    }

    #[test]
    fn summary_cards_format_each_metric() {
        let mut agg = Aggregation::default();
        agg.summary.total_enrollments = WeekPair { week1: Metric::Value(10.0), week2: Metric::Value(20.0) };
        agg.summary.total_impressions = WeekPair { week1: Metric::Value(12000.0), week2: Metric::Value(9000.0) };
        agg.summary.total_revenue = WeekPair { week1: Metric::Value(1500.5), week2: Metric::Unavailable };
        agg.summary.average_cvr = WeekPair { week1: Metric::Value(5.0), week2: Metric::Value(5.0) };

        let cards = summary_cards(&agg);
        assert_eq!(cards.len(), 4);
        assert_eq!(cards[0].change, "100.0%");
        assert_eq!(cards[1].week1, "12,000");
        assert_eq!(cards[1].direction, "down");
        assert_eq!(cards[2].week1, "$1,500.50");
        assert_eq!(cards[2].week2, "N/A");
        assert_eq!(cards[2].direction, "n/a");
        assert_eq!(cards[3].week2, "5.00%");
        assert_eq!(cards[3].direction, "flat");
    }

    #[test]
    fn json_summary_carries_row_accounting() {
        let agg = Aggregation {
            providers: vec![provider("A", Some(1.0), Some(2.0))],
            stats: crate::types::AggregateStats {
                rows_seen: 6,
                rows_discarded: 2,
                rows_outside_weeks: 1,
            },
            ..Aggregation::default()
        };
        let stats = generate_summary(&agg);
        assert_eq!(stats.provider_count, 1);
        assert_eq!(stats.rows_kept, 3);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["rows_outside_weeks"], 1);
        assert_eq!(json["rows_discarded"], 2);
        assert_eq!(json["rows_kept"], 3);
    }

    #[test]
    fn comparison_lists_every_provider_in_order() {
        let agg = Aggregation {
            providers: vec![provider("Z", Some(1.0), None), provider("A", None, Some(3.0))],
            ..Aggregation::default()
        };
        let rows = provider_comparison(&agg);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].provider, "Z");
        assert_eq!(rows[0].week2_enrollments, "N/A");
        assert_eq!(rows[1].week1_enrollments, "N/A");
        assert_eq!(rows[1].change, "N/A");
    }
}
