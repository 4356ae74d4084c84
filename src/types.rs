use crate::goals::Goal;
use crate::util::{format_number, format_value};
use serde::Serialize;
use tabled::Tabled;

/// Column names of the identifying attributes, in source order.
pub const COL_SL_NO: &str = "Sl No.";
pub const COL_INDICATOR_NUMBER: &str = "Indicator Number";
pub const COL_INDICATOR: &str = "Indicator";
pub const COL_SUB_CATEGORY: &str = "Sub Category";
pub const COL_TARGET_YEAR: &str = "Target Year";
pub const COL_TARGET_VALUE: &str = "Target Value";
pub const COL_DEPARTMENT: &str = "Department";

pub const ID_COLUMNS: [&str; 7] = [
    COL_SL_NO,
    COL_INDICATOR_NUMBER,
    COL_INDICATOR,
    COL_SUB_CATEGORY,
    COL_TARGET_YEAR,
    COL_TARGET_VALUE,
    COL_DEPARTMENT,
];

/// One row of the wide source sheet, cells still as text.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    pub sl_no: Option<String>,
    pub indicator_number: Option<String>,
    pub indicator: Option<String>,
    pub sub_category: Option<String>,
    pub target_year: Option<String>,
    pub target_value: Option<String>,
    pub department: Option<String>,
    /// `(year, cell)` in configured year order.
    pub years: Vec<(i32, Option<String>)>,
}

/// One row of the tidy table: the identifying attributes plus a single
/// `(Year, Value)` observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRecord {
    #[serde(rename = "Sl No.")]
    pub sl_no: String,
    #[serde(rename = "Indicator Number")]
    pub indicator_number: String,
    #[serde(rename = "Indicator")]
    pub indicator: String,
    #[serde(rename = "Sub Category")]
    pub sub_category: Option<String>,
    #[serde(rename = "Target Year")]
    pub target_year: Option<f64>,
    #[serde(rename = "Target Value")]
    pub target_value: Option<f64>,
    #[serde(rename = "Department")]
    pub department: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Value")]
    pub value: Option<f64>,
    #[serde(rename = "Goal")]
    pub goal: Goal,
}

impl IndicatorRecord {
    /// `Value / Target Value * 100`, when both are present and the target is non-zero.
    pub fn progress(&self) -> Option<f64> {
        match (self.value, self.target_value) {
            (Some(v), Some(t)) if t != 0.0 => Some(v / t * 100.0),
            _ => None,
        }
    }
}

/// Display label for a possibly-missing sub category.
pub fn sub_category_label(sub_category: Option<&str>) -> &str {
    sub_category.unwrap_or("Overall")
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RecordRow {
    #[serde(rename = "Indicator Number")]
    #[tabled(rename = "Indicator Number")]
    pub indicator_number: String,
    #[serde(rename = "Indicator")]
    #[tabled(rename = "Indicator")]
    pub indicator: String,
    #[serde(rename = "Sub Category")]
    #[tabled(rename = "Sub Category")]
    pub sub_category: String,
    #[serde(rename = "Department")]
    #[tabled(rename = "Department")]
    pub department: String,
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Target Value")]
    #[tabled(rename = "Target Value")]
    pub target_value: String,
    #[serde(rename = "Target Year")]
    #[tabled(rename = "Target Year")]
    pub target_year: String,
}

impl From<&IndicatorRecord> for RecordRow {
    fn from(r: &IndicatorRecord) -> Self {
        RecordRow {
            indicator_number: r.indicator_number.clone(),
            indicator: r.indicator.clone(),
            sub_category: r.sub_category.clone().unwrap_or_default(),
            department: r.department.clone(),
            year: r.year,
            value: format_value(r.value),
            target_value: format_value(r.target_value),
            target_year: format_value(r.target_year),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct YearSummaryRow {
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub mean_value: String,
    #[serde(skip)]
    #[tabled(skip)]
    pub raw_mean: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AchieverRow {
    #[serde(rename = "Indicator Number")]
    #[tabled(rename = "Indicator Number")]
    pub indicator_number: String,
    #[serde(rename = "Indicator")]
    #[tabled(rename = "Indicator")]
    pub indicator: String,
    #[serde(rename = "Sub Category")]
    #[tabled(rename = "Sub Category")]
    pub sub_category: String,
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Progress")]
    #[tabled(rename = "Progress")]
    pub progress: String,
    #[serde(skip)]
    #[tabled(skip)]
    pub raw_progress: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GoalShareRow {
    #[serde(rename = "Goal")]
    #[tabled(rename = "Goal")]
    pub goal: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Percentage")]
    #[tabled(rename = "Percentage")]
    pub percentage: String,
    #[serde(skip)]
    #[tabled(skip)]
    pub raw_percentage: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GoalListRow {
    #[serde(rename = "SDG")]
    #[tabled(rename = "SDG")]
    pub number: u8,
    #[serde(rename = "Goal")]
    #[tabled(rename = "Goal")]
    pub name: String,
    #[serde(rename = "Indicators")]
    #[tabled(rename = "Indicators")]
    pub indicators: usize,
}

impl GoalShareRow {
    pub fn new(goal: Goal, count: usize, total: usize) -> Self {
        let pct = if total == 0 {
            0.0
        } else {
            count as f64 / total as f64 * 100.0
        };
        GoalShareRow {
            goal: goal.label(),
            count,
            percentage: format_number(pct, 2),
            raw_percentage: pct,
        }
    }
}
