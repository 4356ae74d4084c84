// Linear trend projection per sub category.
//
// Each sub category is fitted independently with ordinary least squares on
// (Year, Value); rows without a value are dropped first. Sub categories left
// with no points produce no trendline, which is a normal outcome.
use crate::types::IndicatorRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trendline {
    pub sub_category: Option<String>,
    pub fit: LinearFit,
    /// `(future year, predicted value)`, years ascending.
    pub points: Vec<(i32, f64)>,
}

/// Least-squares fit of `y ~ x`. With no spread in `x` the slope is zero and
/// the line sits at the mean of `y`. `None` for an empty input.
pub fn fit_ols(points: &[(f64, f64)]) -> Option<LinearFit> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for &(x, y) in points {
        sxx += (x - mean_x) * (x - mean_x);
        sxy += (x - mean_x) * (y - mean_y);
    }
    let slope = if sxx.abs() < f64::EPSILON { 0.0 } else { sxy / sxx };
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// The `horizon` years following `last_year`.
pub fn future_years(last_year: i32, horizon: u32) -> Vec<i32> {
    (1..=horizon as i32).map(|k| last_year + k).collect()
}

/// Observed `(year, value)` points grouped by sub category, groups in
/// first-seen order. Rows without a value are dropped.
pub fn group_points<'a>(
    rows: impl IntoIterator<Item = &'a IndicatorRecord>,
) -> Vec<(Option<String>, Vec<(i32, f64)>)> {
    let mut groups: Vec<(Option<String>, Vec<(i32, f64)>)> = Vec::new();
    for r in rows {
        let idx = match groups.iter().position(|(k, _)| *k == r.sub_category) {
            Some(i) => i,
            None => {
                groups.push((r.sub_category.clone(), Vec::new()));
                groups.len() - 1
            }
        };
        if let Some(v) = r.value {
            groups[idx].1.push((r.year, v));
        }
    }
    for (_, pts) in &mut groups {
        pts.sort_by_key(|p| p.0);
    }
    groups
}

/// One trendline per sub category with at least one valid point.
///
/// An empty result means the indicator is not plottable.
pub fn project<'a>(
    rows: impl IntoIterator<Item = &'a IndicatorRecord>,
    future: &[i32],
) -> Vec<Trendline> {
    let mut years: Vec<i32> = future.to_vec();
    years.sort_unstable();
    years.dedup();
    group_points(rows)
        .into_iter()
        .filter_map(|(sub_category, pts)| {
            let xy: Vec<(f64, f64)> = pts.iter().map(|&(x, y)| (x as f64, y)).collect();
            let fit = fit_ols(&xy)?;
            let points = years.iter().map(|&y| (y, fit.predict(y as f64))).collect();
            Some(Trendline {
                sub_category,
                fit,
                points,
            })
        })
        .collect()
}
