use crate::error::{ReportError, Result};
use crate::types::{CampaignRow, RawRow};
use crate::util::clean_cell;
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Header names the export must carry; extra columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "Provider",
    "Week",
    "Enrollment count",
    "Impressions",
    "Revenue",
    "CVR",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub parse_errors: usize,
}

pub fn load_rows(path: &Path) -> Result<(Vec<CampaignRow>, LoadReport)> {
    let file = File::open(path).map_err(|e| ReportError::io(path, e))?;
    debug!(path = %path.display(), "reading campaign export");
    read_rows(file)
}

/// Parse a campaign export from any reader.
///
/// Blank lines are skipped and short rows are accepted; a record the CSV
/// layer cannot decode is counted and skipped rather than failing the file.
pub fn read_rows<R: Read>(reader: R) -> Result<(Vec<CampaignRow>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?;
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|col| !headers.iter().any(|h| h == **col))
    {
        return Err(ReportError::MissingColumn(missing.to_string()));
    }

    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut rows = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        total_rows += 1;
        let raw = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(row = total_rows, error = %e, "skipping undecodable row");
                parse_errors += 1;
                continue;
            }
        };
        rows.push(clean_row(raw));
    }

    Ok((
        rows,
        LoadReport {
            total_rows,
            parse_errors,
        },
    ))
}

fn clean_row(raw: RawRow) -> CampaignRow {
    CampaignRow {
        provider: raw.provider,
        week: raw.week.as_deref().map(clean_cell),
        enrollment_count: raw.enrollment_count.as_deref().map(clean_cell),
        impressions: raw.impressions.as_deref().map(clean_cell),
        revenue: raw.revenue.as_deref().map(clean_cell),
        cvr: raw.cvr.as_deref().map(clean_cell),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;
    use std::io::Write;

    const HEADER: &str = "Provider,Week,Enrollment count,Impressions,Revenue,CVR\n";

    #[test]
    fn reads_and_cleans_quoted_cells() {
        let csv = format!(
            "{HEADER}\"A Health (X)\",1,\"1,200\",\"45,000\",\"$9,000\",5.5%\n"
        );
        let (rows, report) = read_rows(csv.as_bytes()).unwrap();
        assert_eq!(report.total_rows, 1);
        assert_eq!(report.parse_errors, 0);
        let row = &rows[0];
        assert_eq!(row.provider.as_deref(), Some("A Health (X)"));
        assert_eq!(row.week, Some(Cell::Number(1.0)));
        assert_eq!(row.enrollment_count, Some(Cell::Number(1200.0)));
        assert_eq!(row.impressions, Some(Cell::Number(45000.0)));
        assert_eq!(row.revenue, Some(Cell::Text("$9,000".into())));
        assert_eq!(row.cvr, Some(Cell::Number(5.5)));
    }

    #[test]
    fn short_rows_and_blank_lines_are_tolerated() {
        let csv = format!("{HEADER}B Clinic,2,30\n\nC Care,1,5,50,100,2%\n");
        let (rows, report) = read_rows(csv.as_bytes()).unwrap();
        assert_eq!(report.total_rows, 2);
        assert_eq!(rows[0].impressions, None);
        assert_eq!(rows[0].cvr, None);
        assert_eq!(rows[1].cvr, Some(Cell::Number(2.0)));
    }

    #[test]
    fn extra_and_reordered_columns_are_fine() {
        let csv = "Week,Notes,Provider,CVR,Revenue,Impressions,Enrollment count\n\
                   2,hello,D Health (Social),3%,10,20,4\n";
        let (rows, _) = read_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].provider.as_deref(), Some("D Health (Social)"));
        assert_eq!(rows[0].week, Some(Cell::Number(2.0)));
        assert_eq!(rows[0].enrollment_count, Some(Cell::Number(4.0)));
    }

    #[test]
    fn header_without_a_required_column_is_rejected() {
        let csv = "Provider,Enrollment count,Impressions,Revenue,CVR\nA,1,1,1,1%\n";
        let err = read_rows(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn(ref c) if c == "Week"));

        let err = read_rows("".as_bytes()).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn(ref c) if c == "Provider"));
    }

    #[test]
    fn loose_numbers_keep_their_leading_value() {
        let csv = format!("{HEADER}A,1,12 (est),100,500,5.5% avg\nA,2nd,20,200,1000,8%\n");
        let (rows, _) = read_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].enrollment_count, Some(Cell::Number(12.0)));
        assert_eq!(rows[0].cvr, Some(Cell::Number(5.5)));
        assert_eq!(rows[1].week, Some(Cell::Number(2.0)));

        let agg = crate::aggregate::aggregate(&rows);
        let p = &agg.providers[0];
        assert_eq!(p.week1.map(|m| m.cvr), Some(5.5));
        assert_eq!(p.week2.map(|m| m.enrollments), Some(crate::types::Metric::Value(20.0)));
        assert_eq!(agg.summary.total_enrollments.week1, crate::types::Metric::Value(12.0));
        assert_eq!(agg.stats.rows_outside_weeks, 0);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_rows(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{HEADER}A,1,1,1,1,1%\nB,2,2,2,2,2%\n").unwrap();
        let (rows, report) = load_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(report.total_rows, 2);
    }
}
