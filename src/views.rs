// Chart and table builders for the dashboard views.
//
// Each builder takes an already-filtered selection of records and describes
// what to draw; rendering is left to the caller.

use crate::charts::{Bar, ChartSpec, ReferenceLine, Series};
use crate::trend::{group_points, project};
use crate::types::{
    sub_category_label, AchieverRow, GoalShareRow, IndicatorRecord, RecordRow, YearSummaryRow,
};
use crate::util::format_value;

/// How target reference lines are annotated on a progress chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetAnnotation {
    /// One line per sub category, `Target: <value> by <year>`.
    PerSubCategory,
    /// A single line from the first row, `Target Value: <value> by <year>`.
    Single,
}

/// Rows whose year lies within `from..=to`.
pub fn filter_years<'a>(
    rows: impl IntoIterator<Item = &'a IndicatorRecord>,
    (from, to): (i32, i32),
) -> Vec<&'a IndicatorRecord> {
    rows.into_iter()
        .filter(|r| (from..=to).contains(&r.year))
        .collect()
}

/// Clamp a requested year range into `bounds`, swapping reversed input.
pub fn clamp_range((a, b): (i32, i32), (lo, hi): (i32, i32)) -> (i32, i32) {
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    (a.clamp(lo, hi), b.clamp(lo, hi))
}

/// Min and max year of a selection.
pub fn year_span(rows: &[&IndicatorRecord]) -> Option<(i32, i32)> {
    let min = rows.iter().map(|r| r.year).min()?;
    let max = rows.iter().map(|r| r.year).max()?;
    Some((min, max))
}

pub fn record_rows(rows: &[&IndicatorRecord]) -> Vec<RecordRow> {
    rows.iter().map(|r| RecordRow::from(*r)).collect()
}

fn target_label(prefix: &str, row: &IndicatorRecord) -> Option<ReferenceLine> {
    let y = row.target_value?;
    Some(ReferenceLine {
        y,
        label: format!(
            "{prefix}: {} by {}",
            format_value(Some(y)),
            format_value(row.target_year)
        ),
    })
}

/// Progress of one indicator: a marked line per sub category plus purple
/// target references.
pub fn progress_chart(
    indicator: &str,
    rows: &[&IndicatorRecord],
    annotation: TargetAnnotation,
) -> ChartSpec {
    let mut spec = ChartSpec::line(
        format!("Progress of {indicator} Towards Target"),
        "Year",
        "Value",
    );
    for (sub_category, points) in group_points(rows.iter().copied()) {
        if points.is_empty() {
            continue;
        }
        spec.push_series(
            Series::line(
                sub_category_label(sub_category.as_deref()),
                points.into_iter().map(|(x, y)| (x as f64, y)).collect(),
            )
            .with_markers(),
        );
    }

    match annotation {
        TargetAnnotation::PerSubCategory => {
            let mut seen: Vec<&Option<String>> = Vec::new();
            for r in rows {
                if seen.contains(&&r.sub_category) {
                    continue;
                }
                seen.push(&r.sub_category);
                if let Some(line) = target_label("Target", r) {
                    spec.push_reference(line);
                }
            }
        }
        TargetAnnotation::Single => {
            if let Some(line) = rows.first().and_then(|r| target_label("Target Value", r)) {
                spec.push_reference(line);
            }
        }
    }
    spec
}

/// Draw the series of the given sub categories in the "achieved" colour.
pub fn mark_achieved(spec: &mut ChartSpec, passed: &[Option<String>]) {
    let names: Vec<&str> = passed
        .iter()
        .map(|s| sub_category_label(s.as_deref()))
        .collect();
    for s in spec.series_mut() {
        if names.contains(&s.name.as_str()) {
            s.highlighted = true;
        }
    }
}

/// One line per indicator, e.g. every indicator within a sub category or a
/// department. Multiple rows for the same indicator and year are averaged.
pub fn indicators_chart(title: impl Into<String>, rows: &[&IndicatorRecord]) -> ChartSpec {
    let mut spec = ChartSpec::line(title, "Year", "Value");
    let mut groups: Vec<(&str, Vec<(i32, f64)>)> = Vec::new();
    for r in rows {
        let Some(v) = r.value else { continue };
        match groups.iter_mut().find(|(k, _)| *k == r.indicator) {
            Some((_, pts)) => pts.push((r.year, v)),
            None => groups.push((r.indicator.as_str(), vec![(r.year, v)])),
        }
    }
    for (indicator, mut pts) in groups {
        pts.sort_by_key(|p| p.0);
        let mut merged: Vec<(f64, f64)> = Vec::new();
        let mut i = 0;
        while i < pts.len() {
            let year = pts[i].0;
            let same: Vec<f64> = pts[i..]
                .iter()
                .take_while(|p| p.0 == year)
                .map(|p| p.1)
                .collect();
            i += same.len();
            merged.push((year as f64, same.iter().sum::<f64>() / same.len() as f64));
        }
        spec.push_series(Series::line(indicator, merged).with_markers());
    }
    spec
}

pub fn yearly_summary_chart(rows: &[YearSummaryRow]) -> ChartSpec {
    let mut spec = ChartSpec::line("Average Progress of All Indicators Over Years", "Year", "Value");
    spec.push_series(
        Series::line(
            "Average",
            rows.iter().map(|r| (r.year as f64, r.raw_mean)).collect(),
        )
        .with_markers()
        .unlabelled(),
    );
    spec
}

pub fn achievers_chart(rows: &[AchieverRow]) -> ChartSpec {
    let bars = rows
        .iter()
        .map(|r| Bar {
            label: format!("{} ({})", r.indicator_number, r.year),
            value: r.raw_progress,
        })
        .collect();
    ChartSpec::bars("Indicators Achieving Target", "Indicator", "Progress", bars)
}

pub fn goal_distribution_chart(rows: &[GoalShareRow]) -> ChartSpec {
    let bars = rows
        .iter()
        .map(|r| Bar {
            label: r.goal.clone(),
            value: r.raw_percentage,
        })
        .collect();
    ChartSpec::bars(
        "Distribution of Indicators Across Goals",
        "Goal",
        "Percentage",
        bars,
    )
}

/// Historical series per sub category together with its linear projection
/// over `future` years.
pub fn trendline_chart(indicator: &str, rows: &[&IndicatorRecord], future: &[i32]) -> ChartSpec {
    let mut spec = ChartSpec::line(format!("Trendline for {indicator}"), "Year", "Value");
    for (sub_category, points) in group_points(rows.iter().copied()) {
        if points.is_empty() {
            continue;
        }
        spec.push_series(
            Series::line(
                sub_category_label(sub_category.as_deref()),
                points.into_iter().map(|(x, y)| (x as f64, y)).collect(),
            )
            .with_markers(),
        );
    }
    for line in project(rows.iter().copied(), future) {
        spec.push_series(
            Series::line(
                format!("Trendline ({})", sub_category_label(line.sub_category.as_deref())),
                line.points.into_iter().map(|(x, y)| (x as f64, y)).collect(),
            )
            .dashed(),
        );
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::Goal;
    use pretty_assertions::assert_eq;

    fn rec(sub: Option<&str>, year: i32, value: Option<f64>, target: Option<f64>) -> IndicatorRecord {
        IndicatorRecord {
            sl_no: "1".into(),
            indicator_number: "3.2".into(),
            indicator: "Mortality".into(),
            sub_category: sub.map(str::to_string),
            target_year: Some(2030.0),
            target_value: target,
            department: "Health".into(),
            year,
            value,
            goal: Goal::new(3).unwrap(),
        }
    }

    #[test]
    fn progress_chart_annotates_each_sub_category() {
        let rows = vec![
            rec(Some("Urban"), 2015, Some(40.0), Some(25.0)),
            rec(Some("Rural"), 2015, Some(50.0), Some(30.5)),
            rec(Some("Urban"), 2016, Some(35.0), Some(25.0)),
        ];
        let refs: Vec<&IndicatorRecord> = rows.iter().collect();
        let spec = progress_chart("Mortality", &refs, TargetAnnotation::PerSubCategory);
        assert_eq!(spec.title, "Progress of Mortality Towards Target");
        let labels: Vec<&str> = spec.references().iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Target: 25 by 2030", "Target: 30.5 by 2030"]);

        let single = progress_chart("Mortality", &refs, TargetAnnotation::Single);
        let labels: Vec<&str> = single.references().iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Target Value: 25 by 2030"]);
    }

    #[test]
    fn missing_target_draws_no_reference() {
        let rows = vec![rec(None, 2015, Some(1.0), None)];
        let refs: Vec<&IndicatorRecord> = rows.iter().collect();
        let spec = progress_chart("Mortality", &refs, TargetAnnotation::PerSubCategory);
        assert!(spec.references().is_empty());
        assert_eq!(spec.series()[0].name, "Overall");
    }

    #[test]
    fn marks_passing_series() {
        let rows = vec![
            rec(Some("Urban"), 2015, Some(40.0), Some(25.0)),
            rec(Some("Rural"), 2015, Some(50.0), Some(25.0)),
        ];
        let refs: Vec<&IndicatorRecord> = rows.iter().collect();
        let mut spec = progress_chart("Mortality", &refs, TargetAnnotation::PerSubCategory);
        mark_achieved(&mut spec, &[Some("Rural".into())]);
        let flags: Vec<bool> = spec.series().iter().map(|s| s.highlighted).collect();
        assert_eq!(flags, vec![false, true]);
    }

    #[test]
    fn year_helpers() {
        assert_eq!(clamp_range((2010, 2030), (2015, 2021)), (2015, 2021));
        assert_eq!(clamp_range((2019, 2016), (2015, 2021)), (2016, 2019));
        let rows = vec![rec(None, 2015, None, None), rec(None, 2018, None, None)];
        let refs: Vec<&IndicatorRecord> = rows.iter().collect();
        assert_eq!(year_span(&refs), Some((2015, 2018)));
        assert_eq!(filter_years(&rows, (2016, 2020)).len(), 1);
    }

    #[test]
    fn trendline_chart_adds_projection_series() {
        let rows: Vec<IndicatorRecord> = (2015..=2019)
            .map(|y| rec(Some("Urban"), y, Some(y as f64), None))
            .collect();
        let refs: Vec<&IndicatorRecord> = rows.iter().collect();
        let spec = trendline_chart("Mortality", &refs, &[2022, 2023]);
        let names: Vec<&str> = spec.series().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Urban", "Trendline (Urban)"]);
        assert_eq!(spec.series()[1].points.len(), 2);
    }

    #[test]
    fn indicators_chart_averages_duplicate_years() {
        let rows = vec![
            rec(Some("Urban"), 2015, Some(10.0), None),
            rec(Some("Rural"), 2015, Some(20.0), None),
            rec(Some("Rural"), 2016, None, None),
        ];
        let refs: Vec<&IndicatorRecord> = rows.iter().collect();
        let spec = indicators_chart("Department: Health", &refs);
        assert_eq!(spec.series().len(), 1);
        assert_eq!(spec.series()[0].points, vec![(2015.0, 15.0)]);
    }
}
