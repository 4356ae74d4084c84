// Fixed registry of the 17 Sustainable Development Goals.
use serde::Serialize;
use std::fmt;

pub const GOAL_COUNT: u8 = 17;

const GOAL_NAMES: [&str; GOAL_COUNT as usize] = [
    "No Poverty",
    "Zero Hunger",
    "Good Health and Well-being",
    "Quality Education",
    "Gender Equality",
    "Clean Water and Sanitation",
    "Affordable and Clean Energy",
    "Decent Work and Economic Growth",
    "Industry, Innovation, and Infrastructure",
    "Reduced Inequality",
    "Sustainable Cities and Communities",
    "Responsible Consumption and Production",
    "Climate Action",
    "Life Below Water",
    "Life on Land",
    "Peace, Justice, and Strong Institutions",
    "Partnerships for the Goals",
];

// Official accent colours, hex RGB without the leading '#'.
const GOAL_COLORS: [&str; GOAL_COUNT as usize] = [
    "E5243B", "DDA63A", "4C9F38", "C5192D", "FF3A21", "26BDE2", "FCC30B", "A21942", "FD6925",
    "DD1367", "FD9D24", "BF8B2E", "3F7E44", "0A97D9", "56C02B", "00689D", "19486A",
];

/// A goal number, always within `1..=17`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Goal(u8);

impl Goal {
    pub fn new(number: u8) -> Option<Goal> {
        (1..=GOAL_COUNT).contains(&number).then_some(Goal(number))
    }

    /// Every goal in registry order.
    pub fn all() -> impl Iterator<Item = Goal> {
        (1..=GOAL_COUNT).map(Goal)
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        GOAL_NAMES[(self.0 - 1) as usize]
    }

    pub fn color(self) -> &'static str {
        GOAL_COLORS[(self.0 - 1) as usize]
    }

    /// Label used by the goal distribution analysis, e.g. `Goal 3`.
    pub fn label(self) -> String {
        format!("Goal {}", self.0)
    }

    /// Heading used in the report, e.g. `SDG 3: Good Health and Well-being`.
    pub fn heading(self) -> String {
        format!("SDG {}: {}", self.0, self.name())
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Leading integer segment of an indicator number (`"3.2"` -> `3`).
///
/// Returns `None` when the prefix is not an integer. Range checking is left to
/// the caller so it can report which of the two problems occurred.
pub fn goal_prefix(indicator_number: &str) -> Option<i64> {
    let head = indicator_number.trim().split('.').next()?.trim();
    head.parse::<i64>().ok()
}
