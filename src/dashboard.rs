// Dashboard controller.
//
// The dashboard is a small state machine: `DashboardState` holds the
// active `View` and the filter selections, and `render` maps a state and
// an `Event` to the next state and the `ViewOutput` to display. `render`
// never touches the dataset beyond reading it and never runs the report
// build itself; it only asks for one. `Session` owns the
// `AppContext` for the lifetime of a session and performs the build when
// asked.

use crate::charts::{ChartSpec, SvgChartRenderer};
use crate::composer::{ReportArtifact, ReportComposer, StatusSink};
use crate::config::AppConfig;
use crate::cover::resolve_cover;
use crate::error::{LoadError, RenderError};
use crate::goals::Goal;
use crate::loader::{load_dataset, Dataset, LoadReport};
use crate::reports::{
    achievement_check, goal_distribution, goal_list, sort_achievers, target_achievers,
    yearly_summary, Direction,
};
use crate::trend::future_years;
use crate::types::{
    sub_category_label, AchieverRow, GoalListRow, GoalShareRow, IndicatorRecord, RecordRow,
    YearSummaryRow,
};
use crate::views::{
    achievers_chart, clamp_range, filter_years, goal_distribution_chart, indicators_chart,
    mark_achieved, progress_chart, record_rows, trendline_chart, year_span,
    yearly_summary_chart, TargetAnnotation,
};
use std::path::Path;
use tracing::{debug, error, info};

pub const MAIN_TITLE: &str = "Sustainable Development Goals Dashboard";
pub const GOALS_TITLE: &str = "Sustainable Development Goals";
pub const NO_GOAL_DATA: &str = "No data available for this goal.";
pub const NO_INDICATOR_DATA: &str = "No data available for this indicator.";

/// Everything a session reads: the tidy table, the configuration and the
/// chart renderer. Created once and shared by reference.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub dataset: Dataset,
    pub config: AppConfig,
    renderer: SvgChartRenderer,
}

impl AppContext {
    pub fn new(dataset: Dataset, config: AppConfig) -> Self {
        let renderer = SvgChartRenderer::new(config.chart.width, config.chart.height);
        AppContext {
            dataset,
            config,
            renderer,
        }
    }

    pub fn load(path: &Path, config: AppConfig) -> Result<(Self, LoadReport), LoadError> {
        let (dataset, report) = load_dataset(path, &config.loader)?;
        Ok((Self::new(dataset, config), report))
    }

    pub fn renderer(&self) -> &SvgChartRenderer {
        &self.renderer
    }

    /// Default year range of the sliders: the configured value years.
    pub fn default_range(&self) -> (i32, i32) {
        let loader = &self.config.loader;
        self.dataset
            .year_bounds()
            .or_else(|| Some((loader.first_year()?, loader.last_year()?)))
            .unwrap_or((2015, 2021))
    }

    /// Years the trendlines are projected over.
    pub fn future_years(&self) -> Vec<i32> {
        let (_, last) = self.default_range();
        future_years(last, self.config.trend.horizon_years)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    SubCategory,
    Department,
    YearlySummary,
    TargetAchievement,
    GoalDistribution,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::SubCategory,
        Tab::Department,
        Tab::YearlySummary,
        Tab::TargetAchievement,
        Tab::GoalDistribution,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::SubCategory => "Sub Category Analysis",
            Tab::Department => "Department-wise Performance",
            Tab::YearlySummary => "Yearly Progress Summary",
            Tab::TargetAchievement => "Target Achievement Analysis",
            Tab::GoalDistribution => "Goal Distribution",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Main,
    GoalList,
    GoalDetail(Goal),
}

/// Selections of the main view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub indicator: Option<String>,
    pub year_range: Option<(i32, i32)>,
    pub department: Option<String>,
    pub sub_category: Option<String>,
    pub tab: Tab,
    pub positive: bool,
    pub negative: bool,
}

/// Selections of the goal detail view; reset whenever a goal is opened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailFilters {
    pub indicator: Option<String>,
    pub year_range: Option<(i32, i32)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub view: View,
    pub filters: Filters,
    pub detail: DetailFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Refresh,
    SelectIndicator(String),
    SetYearRange(i32, i32),
    SelectDepartment(String),
    SelectSubCategory(String),
    SelectTab(Tab),
    CheckPositive,
    CheckNegative,
    ShowGoals,
    SelectGoal(u8),
    Back,
    GenerateReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Notice {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TableRows {
    Records(Vec<RecordRow>),
    YearSummary(Vec<YearSummaryRow>),
    Achievers(Vec<AchieverRow>),
    GoalShares(Vec<GoalShareRow>),
    Goals(Vec<GoalListRow>),
}

impl TableRows {
    pub fn len(&self) -> usize {
        match self {
            TableRows::Records(r) => r.len(),
            TableRows::YearSummary(r) => r.len(),
            TableRows::Achievers(r) => r.len(),
            TableRows::GoalShares(r) => r.len(),
            TableRows::Goals(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct TableOutput {
    pub name: String,
    pub rows: TableRows,
}

/// What the active view shows after an event.
#[derive(Debug, Clone, Default)]
pub struct ViewOutput {
    pub title: String,
    /// Picker options of the active view, e.g. the indicators of a goal.
    pub options: Vec<String>,
    pub selected: Option<String>,
    pub year_range: Option<(i32, i32)>,
    pub charts: Vec<ChartSpec>,
    pub tables: Vec<TableOutput>,
    pub notices: Vec<Notice>,
    /// Set when the event asked for a report; the session performs the build.
    pub build_report: bool,
    pub report: Option<ReportArtifact>,
}

impl ViewOutput {
    fn titled(title: impl Into<String>) -> Self {
        ViewOutput {
            title: title.into(),
            ..ViewOutput::default()
        }
    }

    fn table(&mut self, name: impl Into<String>, rows: TableRows) {
        self.tables.push(TableOutput {
            name: name.into(),
            rows,
        });
    }

    fn notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice::new(level, message));
    }
}

/// Apply `event` to `state` and describe the resulting view.
pub fn render(
    mut state: DashboardState,
    event: Event,
    ctx: &AppContext,
) -> (DashboardState, ViewOutput) {
    let mut pending: Vec<Notice> = Vec::new();
    let mut build_report = false;
    debug!(?event, view = ?state.view, "dashboard event");

    match event {
        Event::Refresh => {}
        Event::SelectIndicator(name) => match state.view {
            View::Main => {
                if ctx.dataset.indicators.contains(&name) {
                    state.filters.indicator = Some(name);
                    state.filters.positive = false;
                    state.filters.negative = false;
                } else {
                    pending.push(Notice::new(
                        NoticeLevel::Warning,
                        format!("Unknown indicator: {name}"),
                    ));
                }
            }
            View::GoalDetail(goal) => {
                if ctx.dataset.indicators_for_goal(goal).contains(&name) {
                    state.detail.indicator = Some(name);
                } else {
                    pending.push(Notice::new(
                        NoticeLevel::Warning,
                        format!("Indicator {name} does not belong to SDG {goal}"),
                    ));
                }
            }
            View::GoalList => {}
        },
        Event::SetYearRange(from, to) => match state.view {
            View::Main => {
                state.filters.year_range = Some((from, to));
                state.filters.positive = false;
                state.filters.negative = false;
            }
            View::GoalDetail(_) => state.detail.year_range = Some((from, to)),
            View::GoalList => {}
        },
        Event::SelectDepartment(d) => state.filters.department = Some(d),
        Event::SelectSubCategory(s) => state.filters.sub_category = Some(s),
        Event::SelectTab(tab) => state.filters.tab = tab,
        Event::CheckPositive => state.filters.positive = true,
        Event::CheckNegative => state.filters.negative = true,
        Event::ShowGoals => state.view = View::GoalList,
        Event::SelectGoal(n) => match Goal::new(n) {
            Some(goal) => {
                state.view = View::GoalDetail(goal);
                state.detail = DetailFilters::default();
            }
            None => pending.push(Notice::new(
                NoticeLevel::Warning,
                format!("There is no SDG {n}"),
            )),
        },
        Event::Back => {
            state.view = match state.view {
                View::GoalDetail(_) => View::GoalList,
                View::GoalList | View::Main => View::Main,
            };
        }
        Event::GenerateReport => build_report = true,
    }

    let mut out = match state.view {
        View::Main => main_view(&state.filters, ctx),
        View::GoalList => goal_list_view(ctx),
        View::GoalDetail(goal) => goal_detail_view(goal, &state.detail, ctx),
    };
    pending.append(&mut out.notices);
    out.notices = pending;
    out.build_report = build_report;
    (state, out)
}

fn main_view(filters: &Filters, ctx: &AppContext) -> ViewOutput {
    let mut out = ViewOutput::titled(MAIN_TITLE);
    let data = &ctx.dataset;
    out.options = data.indicators.clone();
    let Some(indicator) = filters
        .indicator
        .clone()
        .or_else(|| data.indicators.first().cloned())
    else {
        out.notice(NoticeLevel::Info, "No data loaded.");
        return out;
    };

    let range = clamp_range(
        filters.year_range.unwrap_or(ctx.default_range()),
        ctx.default_range(),
    );
    let filtered = filter_years(data.indicator_rows(&indicator), range);
    let mut chart = progress_chart(&indicator, &filtered, TargetAnnotation::PerSubCategory);

    for (enabled, direction) in [
        (filters.positive, Direction::Positive),
        (filters.negative, Direction::Negative),
    ] {
        if !enabled {
            continue;
        }
        let passed = achievement_check(&filtered, direction);
        mark_achieved(&mut chart, &passed);
        for sub in &passed {
            out.notice(
                NoticeLevel::Success,
                direction.message(sub_category_label(sub.as_deref())),
            );
        }
    }

    out.selected = Some(indicator);
    out.year_range = Some(range);
    out.charts.push(chart);
    out.table("records", TableRows::Records(record_rows(&filtered)));
    tab_view(filters, ctx, &mut out);
    out
}

fn tab_view(filters: &Filters, ctx: &AppContext, out: &mut ViewOutput) {
    let records = &ctx.dataset.records;
    match filters.tab {
        Tab::SubCategory => {
            let Some(sub) = filters
                .sub_category
                .clone()
                .or_else(|| ctx.dataset.sub_categories().into_iter().next())
            else {
                return;
            };
            let rows: Vec<&IndicatorRecord> = records
                .iter()
                .filter(|r| r.sub_category.as_deref() == Some(sub.as_str()))
                .collect();
            out.charts.push(indicators_chart(
                format!("Progress of Indicators in Sub Category: {sub}"),
                &rows,
            ));
            out.table("sub_category", TableRows::Records(record_rows(&rows)));
        }
        Tab::Department => {
            let Some(department) = filters
                .department
                .clone()
                .or_else(|| ctx.dataset.departments().into_iter().next())
            else {
                return;
            };
            let rows: Vec<&IndicatorRecord> =
                records.iter().filter(|r| r.department == department).collect();
            out.charts.push(indicators_chart(
                format!("Progress of Indicators under Department: {department}"),
                &rows,
            ));
            out.table("department", TableRows::Records(record_rows(&rows)));
        }
        Tab::YearlySummary => {
            let summary = yearly_summary(records);
            out.charts.push(yearly_summary_chart(&summary));
            out.table("yearly_summary", TableRows::YearSummary(summary));
        }
        Tab::TargetAchievement => {
            let mut achievers = target_achievers(records);
            out.charts.push(achievers_chart(&achievers));
            sort_achievers(&mut achievers);
            out.table("target_achievers", TableRows::Achievers(achievers));
        }
        Tab::GoalDistribution => {
            let shares = goal_distribution(records);
            out.charts.push(goal_distribution_chart(&shares));
            out.table("goal_distribution", TableRows::GoalShares(shares));
        }
    }
}

fn goal_list_view(ctx: &AppContext) -> ViewOutput {
    let mut out = ViewOutput::titled(GOALS_TITLE);
    let rows = goal_list(&ctx.dataset);
    out.options = rows.iter().map(|r| format!("SDG {}", r.number)).collect();
    out.table("goals", TableRows::Goals(rows));
    out
}

fn goal_detail_view(goal: Goal, detail: &DetailFilters, ctx: &AppContext) -> ViewOutput {
    let mut out = ViewOutput::titled(format!("SDG {} Graph", goal.number()));
    let indicators = ctx.dataset.indicators_for_goal(goal);
    let Some(indicator) = detail
        .indicator
        .clone()
        .filter(|i| indicators.contains(i))
        .or_else(|| indicators.first().cloned())
    else {
        out.notice(NoticeLevel::Info, NO_GOAL_DATA);
        return out;
    };
    out.options = indicators;

    let rows = ctx.dataset.indicator_rows(&indicator);
    let Some(bounds) = year_span(&rows) else {
        out.notice(NoticeLevel::Info, NO_INDICATOR_DATA);
        out.selected = Some(indicator);
        return out;
    };
    let range = clamp_range(detail.year_range.unwrap_or(ctx.default_range()), bounds);
    let filtered = filter_years(rows.iter().copied(), range);

    out.charts
        .push(progress_chart(&indicator, &filtered, TargetAnnotation::Single));
    out.charts
        .push(trendline_chart(&indicator, &rows, &ctx.future_years()));
    out.table("records", TableRows::Records(record_rows(&filtered)));
    out.selected = Some(indicator);
    out.year_range = Some(range);
    out
}

/// One interactive session: the context plus the current dashboard state.
pub struct Session {
    ctx: AppContext,
    state: DashboardState,
}

impl Session {
    pub fn new(ctx: AppContext) -> Self {
        Session {
            ctx,
            state: DashboardState::default(),
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Apply an event. A requested report is built before returning; a
    /// failed build becomes an error notice and the session carries on.
    pub fn handle(&mut self, event: Event, status: &mut dyn StatusSink) -> ViewOutput {
        let state = std::mem::take(&mut self.state);
        let (next, mut out) = render(state, event, &self.ctx);
        self.state = next;

        if out.build_report {
            out.build_report = false;
            match self.build_report(status, &mut out.notices) {
                Ok(artifact) => {
                    out.notices.push(Notice::new(
                        NoticeLevel::Success,
                        format!("Report ready: {}", artifact.file_name),
                    ));
                    out.report = Some(artifact);
                }
                Err(e) => {
                    error!(error = %e, "report build failed");
                    out.notices.push(Notice::new(
                        NoticeLevel::Error,
                        format!("Report generation failed: {e}"),
                    ));
                }
            }
        }
        out
    }

    fn build_report(
        &self,
        status: &mut dyn StatusSink,
        notices: &mut Vec<Notice>,
    ) -> Result<ReportArtifact, RenderError> {
        let cover_cfg = &self.ctx.config.cover;
        let cover = resolve_cover(cover_cfg);
        if cover.is_none() && (cover_cfg.path.is_some() || cover_cfg.url.is_some()) {
            notices.push(Notice::new(
                NoticeLevel::Warning,
                "Cover image unavailable; the report was generated without a cover page.",
            ));
        }
        let composer = ReportComposer::new(&self.ctx.config.report, &self.ctx.renderer);
        let artifact = composer.build(&self.ctx.dataset, cover.as_ref(), status)?;
        info!(file = %artifact.file_name, bytes = artifact.bytes.len(), "report ready");
        Ok(artifact)
    }
}
