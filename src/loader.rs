// Data loader: reads the wide source sheet and melts it into the tidy table.
use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::goals::{goal_prefix, Goal};
use crate::types::{
    IndicatorRecord, RawRow, COL_DEPARTMENT, COL_INDICATOR, COL_INDICATOR_NUMBER, COL_SL_NO,
    COL_SUB_CATEGORY, COL_TARGET_VALUE, COL_TARGET_YEAR, ID_COLUMNS,
};
use crate::util::{non_blank, parse_f64_safe, parse_year};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct LoadReport {
    pub wide_rows: usize,
    pub blank_rows: usize,
    pub tidy_rows: usize,
    pub missing_values: usize,
}

/// The tidy table plus the distinct indicator names in first-seen order.
/// Built once per session and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<IndicatorRecord>,
    pub indicators: Vec<String>,
    pub years: Vec<i32>,
}

impl Dataset {
    pub fn new(records: Vec<IndicatorRecord>, years: Vec<i32>) -> Self {
        let indicators = distinct(records.iter().map(|r| r.indicator.as_str()));
        Dataset {
            records,
            indicators,
            years,
        }
    }

    pub fn indicator_rows(&self, indicator: &str) -> Vec<&IndicatorRecord> {
        self.records
            .iter()
            .filter(|r| r.indicator == indicator)
            .collect()
    }

    pub fn indicators_for_goal(&self, goal: Goal) -> Vec<String> {
        distinct(
            self.records
                .iter()
                .filter(|r| r.goal == goal)
                .map(|r| r.indicator.as_str()),
        )
    }

    pub fn departments(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.department.as_str()))
    }

    /// Distinct non-missing sub categories.
    pub fn sub_categories(&self) -> Vec<String> {
        distinct(self.records.iter().filter_map(|r| r.sub_category.as_deref()))
    }

    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        let min = self.years.iter().copied().min()?;
        let max = self.years.iter().copied().max()?;
        Some((min, max))
    }
}

/// Distinct values, keeping the order of first appearance.
pub fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for v in values {
        if seen.insert(v) {
            out.push(v.to_string());
        }
    }
    out
}

pub fn load_dataset(path: &Path, cfg: &LoaderConfig) -> Result<(Dataset, LoadReport), LoadError> {
    let rows = read_rows(path, cfg)?;
    let (dataset, report) = load_from_rows(rows, cfg)?;
    info!(
        path = %path.display(),
        wide_rows = report.wide_rows,
        tidy_rows = report.tidy_rows,
        missing_values = report.missing_values,
        indicators = dataset.indicators.len(),
        "loaded indicator table"
    );
    Ok((dataset, report))
}

/// Reshape already-read cells (header included) into the tidy table.
pub fn load_from_rows(
    rows: Vec<Vec<String>>,
    cfg: &LoaderConfig,
) -> Result<(Dataset, LoadReport), LoadError> {
    let (headers, body) = apply_offsets(rows, cfg)?;
    let (wide, blank_rows) = parse_wide(&headers, body, cfg)?;
    let wide_rows = wide.len();
    let (records, missing_values) = melt(wide)?;
    let report = LoadReport {
        wide_rows,
        blank_rows,
        tidy_rows: records.len(),
        missing_values,
    };
    Ok((Dataset::new(records, cfg.years.clone()), report))
}

pub fn read_rows(path: &Path, cfg: &LoaderConfig) -> Result<Vec<Vec<String>>, LoadError> {
    let suffix = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match suffix.as_str() {
        "csv" => read_csv_rows(path),
        "xlsx" | "xlsm" | "xls" | "ods" => read_workbook_rows(path, cfg.sheet.as_deref()),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    let mut rows = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        rows.push(rec.iter().map(|c| c.trim().to_string()).collect());
    }
    Ok(rows)
}

fn read_workbook_rows(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<String>>, LoadError> {
    if !path.is_file() {
        return Err(LoadError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    }
    let mut workbook =
        open_workbook_auto(path).map_err(|e| LoadError::Workbook(e.to_string()))?;
    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| LoadError::Workbook("workbook has no sheets".into()))?,
    };
    if !workbook.sheet_names().iter().any(|n| *n == sheet_name) {
        return Err(LoadError::SheetNotFound(sheet_name));
    }
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| LoadError::Workbook(e.to_string()))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
        .collect())
}

/// Drop the leading/trailing rows named by the configuration and split off
/// the header row.
pub fn apply_offsets(
    rows: Vec<Vec<String>>,
    cfg: &LoaderConfig,
) -> Result<(Vec<String>, Vec<Vec<String>>), LoadError> {
    let header_at = cfg.skip_rows + cfg.header_row;
    let end = rows.len().saturating_sub(cfg.skip_footer);
    if header_at >= end {
        return Err(LoadError::MissingHeader(header_at));
    }
    let mut rows = rows;
    rows.truncate(end);
    let body = rows.split_off(header_at + 1);
    let headers = rows
        .pop()
        .ok_or(LoadError::MissingHeader(header_at))?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    Ok((headers, body))
}

/// Map header names to cells and keep each row's text as-is.
pub fn parse_wide(
    headers: &[String],
    body: Vec<Vec<String>>,
    cfg: &LoaderConfig,
) -> Result<(Vec<RawRow>, usize), LoadError> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, h) in headers.iter().enumerate() {
        index.entry(h.as_str()).or_insert(i);
    }
    for col in ID_COLUMNS {
        if !index.contains_key(col) {
            return Err(LoadError::MissingColumn(col.to_string()));
        }
    }
    let mut year_index: HashMap<i32, usize> = HashMap::new();
    for (i, h) in headers.iter().enumerate() {
        if let Some(y) = parse_year(h) {
            year_index.entry(y).or_insert(i);
        }
    }
    let mut year_cols = Vec::with_capacity(cfg.years.len());
    for &year in &cfg.years {
        let col = *year_index
            .get(&year)
            .ok_or(LoadError::MissingYearColumn(year))?;
        year_cols.push((year, col));
    }

    let cell = |row: &[String], col: &str| -> Option<String> {
        index.get(col).and_then(|&i| row.get(i)).and_then(|s| non_blank(s))
    };

    let mut out = Vec::new();
    let mut blank_rows = 0usize;
    for row in body {
        if row.iter().all(|c| c.trim().is_empty()) {
            blank_rows += 1;
            continue;
        }
        out.push(RawRow {
            sl_no: cell(&row, COL_SL_NO),
            indicator_number: cell(&row, COL_INDICATOR_NUMBER),
            indicator: cell(&row, COL_INDICATOR),
            sub_category: cell(&row, COL_SUB_CATEGORY),
            target_year: cell(&row, COL_TARGET_YEAR),
            target_value: cell(&row, COL_TARGET_VALUE),
            department: cell(&row, COL_DEPARTMENT),
            years: year_cols
                .iter()
                .map(|&(year, i)| (year, row.get(i).and_then(|s| non_blank(s))))
                .collect(),
        });
    }
    debug!(rows = out.len(), blank_rows, "parsed wide rows");
    Ok((out, blank_rows))
}

/// One output row per (wide row x year), year-major like a classic melt.
/// Returns the records and how many value cells were coerced to missing.
pub fn melt(wide: Vec<RawRow>) -> Result<(Vec<IndicatorRecord>, usize), LoadError> {
    // Goals are validated up front so a bad row fails the load regardless of
    // where it sits in the year loop.
    let mut goals = Vec::with_capacity(wide.len());
    for (i, row) in wide.iter().enumerate() {
        // 1-based data row number after the header, for messages
        let row_no = i + 1;
        let number = row.indicator_number.clone().unwrap_or_default();
        let goal_num = goal_prefix(&number).ok_or_else(|| LoadError::InvalidIndicatorNumber {
            row: row_no,
            value: number.clone(),
        })?;
        let goal = u8::try_from(goal_num)
            .ok()
            .and_then(Goal::new)
            .ok_or(LoadError::GoalOutOfRange {
                row: row_no,
                goal: goal_num,
            })?;
        goals.push(goal);
    }

    let year_count = wide.first().map(|r| r.years.len()).unwrap_or(0);
    let mut records = Vec::with_capacity(wide.len() * year_count);
    let mut missing = 0usize;
    for y in 0..year_count {
        for (row, goal) in wide.iter().zip(&goals) {
            let (year, cell) = &row.years[y];
            let value = parse_f64_safe(cell.as_deref());
            if value.is_none() {
                missing += 1;
            }
            records.push(IndicatorRecord {
                sl_no: row.sl_no.clone().unwrap_or_default(),
                indicator_number: row.indicator_number.clone().unwrap_or_default(),
                indicator: row.indicator.clone().unwrap_or_default(),
                sub_category: row.sub_category.clone(),
                target_year: parse_f64_safe(row.target_year.as_deref()),
                target_value: parse_f64_safe(row.target_value.as_deref()),
                department: row.department.clone().unwrap_or_default(),
                year: *year,
                value,
                goal: *goal,
            });
        }
    }
    Ok((records, missing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn header(years: &[i32]) -> Vec<String> {
        let mut h: Vec<String> = ID_COLUMNS.iter().map(|s| s.to_string()).collect();
        h.extend(years.iter().map(|y| y.to_string()));
        h
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn two_year_cfg() -> LoaderConfig {
        LoaderConfig {
            years: vec![2015, 2016],
            ..LoaderConfig::default()
        }
    }

    #[test]
    fn melts_wide_rows_year_major() {
        let rows = vec![
            header(&[2015, 2016]),
            row(&["1", "3.2", "Mortality", "Urban", "2030", "25", "Health", "40", "35"]),
            row(&["2", "4.1", "Enrolment", "", "2030", "100", "Education", "80", "n/a"]),
        ];
        let (ds, report) = load_from_rows(rows, &two_year_cfg()).unwrap();
        assert_eq!(report.wide_rows, 2);
        assert_eq!(report.tidy_rows, 4);
        assert_eq!(report.missing_values, 1);
        assert_eq!(ds.indicators, vec!["Mortality", "Enrolment"]);

        let years: Vec<i32> = ds.records.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2015, 2015, 2016, 2016]);
        let r = &ds.records[1];
        assert_eq!(r.goal.number(), 4);
        assert_eq!(r.sub_category, None);
        assert_eq!(r.value, Some(80.0));
        assert_eq!(ds.records[3].value, None);
        assert_eq!(ds.records[0].target_value, Some(25.0));
        assert_eq!(ds.records[0].target_year, Some(2030.0));
    }

    #[test]
    fn rewidening_restores_the_sheet() {
        let wide = [
            ["1", "3.2", "Mortality", "Urban", "2030", "25", "Health", "40", "35.5"],
            ["2", "3.2", "Mortality", "Rural", "2030", "25", "Health", "", "1,200"],
            ["3", "5.1", "Seats held", "", "", "", "Law", "12", "x"],
        ];
        let mut rows = vec![header(&[2015, 2016])];
        rows.extend(wide.iter().map(|r| row(r)));
        let (ds, _) = load_from_rows(rows, &two_year_cfg()).unwrap();

        let mut rebuilt: HashMap<&str, Vec<Option<f64>>> = HashMap::new();
        for r in &ds.records {
            assert!([2015, 2016].contains(&r.year));
            assert!((1..=17).contains(&r.goal.number()));
            rebuilt.entry(r.sl_no.as_str()).or_default().push(r.value);
        }
        for cells in &wide {
            let expected: Vec<Option<f64>> = cells[7..]
                .iter()
                .map(|c| parse_f64_safe(Some(*c)))
                .collect();
            assert_eq!(rebuilt[cells[0]], expected);
        }
    }

    #[test]
    fn missing_identifying_column_is_fatal() {
        let mut h = header(&[2015, 2016]);
        h.retain(|c| c != COL_DEPARTMENT);
        let err = load_from_rows(vec![h], &two_year_cfg()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(c) if c == COL_DEPARTMENT));
    }

    #[test]
    fn missing_year_column_is_fatal() {
        let rows = vec![header(&[2015])];
        let err = load_from_rows(rows, &two_year_cfg()).unwrap_err();
        assert!(matches!(err, LoadError::MissingYearColumn(2016)));
    }

    #[test]
    fn bad_goal_prefix_is_fatal() {
        let rows = vec![
            header(&[2015, 2016]),
            row(&["1", "X.2", "Bad", "", "", "", "Dept", "1", "2"]),
        ];
        assert!(matches!(
            load_from_rows(rows, &two_year_cfg()),
            Err(LoadError::InvalidIndicatorNumber { row: 1, .. })
        ));

        let rows = vec![
            header(&[2015, 2016]),
            row(&["1", "18.1", "Bad", "", "", "", "Dept", "1", "2"]),
        ];
        assert!(matches!(
            load_from_rows(rows, &two_year_cfg()),
            Err(LoadError::GoalOutOfRange { goal: 18, .. })
        ));
    }

    #[test]
    fn honours_offsets_and_skips_blank_rows() {
        let cfg = LoaderConfig {
            skip_rows: 1,
            skip_footer: 1,
            ..two_year_cfg()
        };
        let rows = vec![
            row(&["State SDG dashboard export"]),
            header(&[2015, 2016]),
            row(&["1", "1.1", "Poverty", "", "2030", "0", "Welfare", "30", "28"]),
            row(&["", "", "", "", "", "", "", "", ""]),
            row(&["Source: planning department"]),
        ];
        let (ds, report) = load_from_rows(rows, &cfg).unwrap();
        assert_eq!(report.wide_rows, 1);
        assert_eq!(report.blank_rows, 1);
        assert_eq!(ds.records.len(), 2);
    }

    #[test]
    fn header_beyond_data_is_reported() {
        let cfg = LoaderConfig {
            skip_rows: 3,
            ..two_year_cfg()
        };
        assert!(matches!(
            load_from_rows(vec![header(&[2015, 2016])], &cfg),
            Err(LoadError::MissingHeader(3))
        ));
    }

    #[test]
    fn reads_csv_files() {
        let mut tmp = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(
            tmp,
            "Sl No.,Indicator Number,Indicator,Sub Category,Target Year,Target Value,Department,2015,2016"
        )
        .unwrap();
        writeln!(tmp, "1,3.2,\"Mortality, under five\",Rural,2030,25,Health,\"1,040\",35").unwrap();
        tmp.flush().unwrap();

        let (ds, _) = load_dataset(tmp.path(), &two_year_cfg()).unwrap();
        assert_eq!(ds.indicators, vec!["Mortality, under five"]);
        assert_eq!(ds.records[0].value, Some(1040.0));
    }

    #[test]
    fn rejects_unknown_extension() {
        let tmp = NamedTempFile::with_suffix(".json").unwrap();
        assert!(matches!(
            load_dataset(tmp.path(), &two_year_cfg()),
            Err(LoadError::UnsupportedFormat(ext)) if ext == "json"
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_dataset(Path::new("/nonexistent/allgoals.csv"), &two_year_cfg()).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
