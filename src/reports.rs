// Dashboard analyses over the tidy table.
//
// Everything here is a pure function of the records it is given; missing
// values are skipped, never treated as zero.
use crate::goals::Goal;
use crate::loader::Dataset;
use crate::types::{AchieverRow, GoalListRow, GoalShareRow, IndicatorRecord, YearSummaryRow};
use crate::util::{average, format_number};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Which side of the target counts as reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Higher is better: some value is at or above target.
    Positive,
    /// Lower is better: some value is at or below target.
    Negative,
}

impl Direction {
    pub fn reached(self, value: f64, target: f64) -> bool {
        match self {
            Direction::Positive => value >= target,
            Direction::Negative => value <= target,
        }
    }

    pub fn message(self, sub_category: &str) -> String {
        match self {
            Direction::Positive => format!(
                "Indicator reached or exceeded the target value for Subcategory: {sub_category}"
            ),
            Direction::Negative => format!(
                "Indicator reached or fell below the target value for Subcategory: {sub_category}"
            ),
        }
    }
}

/// Sub categories (first-seen order) in which some observation reached its
/// target in the given direction.
///
/// Nothing is checked when the first row of the selection has no target.
/// Each sub category is compared against the target of its own first row.
pub fn achievement_check(rows: &[&IndicatorRecord], direction: Direction) -> Vec<Option<String>> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    if first.target_value.is_none() {
        return Vec::new();
    }

    let mut groups: Vec<(Option<String>, Option<f64>, bool)> = Vec::new();
    for r in rows {
        let idx = match groups.iter().position(|(k, _, _)| *k == r.sub_category) {
            Some(i) => i,
            None => {
                groups.push((r.sub_category.clone(), r.target_value, false));
                groups.len() - 1
            }
        };
        let (_, target, passed) = &mut groups[idx];
        if let (Some(v), Some(t)) = (r.value, *target) {
            *passed |= direction.reached(v, t);
        }
    }
    groups
        .into_iter()
        .filter(|(_, _, passed)| *passed)
        .map(|(sub, _, _)| sub)
        .collect()
}

/// Mean Value per Year across every indicator. Years without any value are
/// left out.
pub fn yearly_summary(data: &[IndicatorRecord]) -> Vec<YearSummaryRow> {
    let mut map: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for r in data {
        if let Some(v) = r.value {
            map.entry(r.year).or_default().push(v);
        }
    }
    map.into_iter()
        .filter_map(|(year, values)| {
            let mean = average(&values)?;
            Some(YearSummaryRow {
                year,
                mean_value: format_number(mean, 2),
                raw_mean: mean,
            })
        })
        .collect()
}

/// Rows whose progress toward target is at least 100%, in table order.
pub fn target_achievers(data: &[IndicatorRecord]) -> Vec<AchieverRow> {
    data.iter()
        .filter_map(|r| {
            let progress = r.progress()?;
            (progress >= 100.0).then(|| AchieverRow {
                indicator_number: r.indicator_number.clone(),
                indicator: r.indicator.clone(),
                sub_category: r.sub_category.clone().unwrap_or_default(),
                year: r.year,
                progress: format_number(progress, 2),
                raw_progress: progress,
            })
        })
        .collect()
}

/// Tidy-row count and share per goal, largest first.
pub fn goal_distribution(data: &[IndicatorRecord]) -> Vec<GoalShareRow> {
    let mut counts: HashMap<Goal, usize> = HashMap::new();
    for r in data {
        *counts.entry(r.goal).or_default() += 1;
    }
    let total = data.len();
    let mut tmp: Vec<(Goal, usize)> = counts.into_iter().collect();
    tmp.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    tmp.into_iter()
        .map(|(goal, count)| GoalShareRow::new(goal, count, total))
        .collect()
}

/// The full registry with the number of distinct indicators loaded per goal.
pub fn goal_list(dataset: &Dataset) -> Vec<GoalListRow> {
    Goal::all()
        .map(|goal| GoalListRow {
            number: goal.number(),
            name: goal.name().to_string(),
            indicators: dataset.indicators_for_goal(goal).len(),
        })
        .collect()
}

/// Largest progress first; used to order the achievement bars.
pub fn sort_achievers(rows: &mut [AchieverRow]) {
    rows.sort_by(|a, b| {
        b.raw_progress
            .partial_cmp(&a.raw_progress)
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rec(
        number: &str,
        sub: Option<&str>,
        year: i32,
        value: Option<f64>,
        target: Option<f64>,
    ) -> IndicatorRecord {
        let goal: u8 = number.split('.').next().unwrap().parse().unwrap();
        IndicatorRecord {
            sl_no: "1".into(),
            indicator_number: number.into(),
            indicator: format!("Indicator {number}"),
            sub_category: sub.map(str::to_string),
            target_year: Some(2030.0),
            target_value: target,
            department: "Health".into(),
            year,
            value,
            goal: Goal::new(goal).unwrap(),
        }
    }

    #[test]
    fn positive_and_negative_checks_are_independent() {
        let rows = vec![
            rec("3.2", Some("Urban"), 2015, Some(10.0), Some(20.0)),
            rec("3.2", Some("Rural"), 2015, Some(30.0), Some(20.0)),
            rec("3.2", Some("Urban"), 2016, Some(15.0), Some(20.0)),
            rec("3.2", Some("Rural"), 2016, None, Some(20.0)),
        ];
        let refs: Vec<&IndicatorRecord> = rows.iter().collect();
        assert_eq!(
            achievement_check(&refs, Direction::Positive),
            vec![Some("Rural".to_string())]
        );
        assert_eq!(
            achievement_check(&refs, Direction::Negative),
            vec![Some("Urban".to_string())]
        );
    }

    #[test]
    fn no_check_without_a_leading_target() {
        let rows = vec![
            rec("3.2", Some("Urban"), 2015, Some(10.0), None),
            rec("3.2", Some("Rural"), 2015, Some(30.0), Some(1.0)),
        ];
        let refs: Vec<&IndicatorRecord> = rows.iter().collect();
        assert!(achievement_check(&refs, Direction::Positive).is_empty());
        assert!(achievement_check(&[], Direction::Negative).is_empty());
    }

    #[test]
    fn messages_name_the_sub_category() {
        assert_eq!(
            Direction::Positive.message("Urban"),
            "Indicator reached or exceeded the target value for Subcategory: Urban"
        );
        assert_eq!(
            Direction::Negative.message("Rural"),
            "Indicator reached or fell below the target value for Subcategory: Rural"
        );
    }

    #[test]
    fn yearly_summary_skips_missing_values() {
        let rows = vec![
            rec("1.1", None, 2016, Some(4.0), None),
            rec("1.1", None, 2015, Some(1.0), None),
            rec("2.1", None, 2015, Some(3.0), None),
            rec("2.1", None, 2017, None, None),
        ];
        let summary: Vec<(i32, f64)> = yearly_summary(&rows)
            .into_iter()
            .map(|r| (r.year, r.raw_mean))
            .collect();
        assert_eq!(summary, vec![(2015, 2.0), (2016, 4.0)]);
    }

    #[test]
    fn achievers_need_progress_of_one_hundred_percent() {
        let rows = vec![
            rec("3.2", Some("Urban"), 2015, Some(20.0), Some(20.0)),
            rec("3.2", Some("Urban"), 2016, Some(19.0), Some(20.0)),
            rec("3.2", Some("Urban"), 2017, Some(50.0), Some(0.0)),
            rec("4.1", None, 2015, Some(30.0), Some(20.0)),
        ];
        let mut achievers = target_achievers(&rows);
        assert_eq!(achievers.len(), 2);
        sort_achievers(&mut achievers);
        assert_eq!(achievers[0].indicator_number, "4.1");
        assert_eq!(achievers[0].progress, "150.00");
        assert_eq!(achievers[1].progress, "100.00");
    }

    #[test]
    fn distribution_counts_tidy_rows() {
        let rows = vec![
            rec("1.1", None, 2015, Some(1.0), None),
            rec("3.2", None, 2015, None, None),
            rec("3.2", None, 2016, None, None),
            rec("3.3", None, 2015, Some(1.0), None),
        ];
        let dist = goal_distribution(&rows);
        let shown: Vec<(&str, usize, &str)> = dist
            .iter()
            .map(|r| (r.goal.as_str(), r.count, r.percentage.as_str()))
            .collect();
        assert_eq!(shown, vec![("Goal 3", 3, "75.00"), ("Goal 1", 1, "25.00")]);
    }

    #[test]
    fn goal_list_covers_the_registry() {
        let dataset = Dataset::new(
            vec![
                rec("3.2", Some("Urban"), 2015, Some(1.0), None),
                rec("3.2", Some("Rural"), 2015, Some(1.0), None),
                rec("3.3", None, 2015, Some(1.0), None),
            ],
            vec![2015],
        );
        let list = goal_list(&dataset);
        assert_eq!(list.len(), 17);
        assert_eq!(list[2].indicators, 2);
        assert_eq!(list[0].indicators, 0);
        assert_eq!(list[16].name, "Partnerships for the Goals");
    }
}
