// Report composer.
//
// A build runs in four steps:
//
// 1. `collect_images` renders one chart per indicator and buckets it under
//    the goal taken from the indicator number.
// 2. `plan_pagination` walks the goal registry and assigns each goal its
//    starting page. The index is printed first, so this happens before any
//    content is emitted.
// 3. `emit_front_matter` writes the optional cover and the goal index.
// 4. `emit_content` writes one bordered section per goal that has charts,
//    two charts per page with a page number after each page.
//
// The assembled document is serialised into memory and handed back as a
// `ReportArtifact`.

use crate::charts::{ChartImage, ChartRenderer, ChartSpec, Series};
use crate::config::ReportConfig;
use crate::cover::CoverImage;
use crate::docx::{Align, Document, SectionProps, DOCX_MIME};
use crate::error::RenderError;
use crate::goals::Goal;
use crate::loader::Dataset;
use crate::trend::group_points;
use crate::types::{sub_category_label, IndicatorRecord};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

pub const REPORT_TITLE: &str = "Sustainable Development Goals Report";
pub const INDEX_HEADING: &str = "Sustainable Development Goals";
pub const INDEX_COLUMNS: [&str; 3] = ["S.No", "SDG Goal", "Page No."];

pub const STATUS_STARTED: &str =
    "Report generation started. Please wait while the charts are rendered.";
pub const STATUS_ALMOST_DONE: &str =
    "Processing almost done. The report will be ready shortly.";

/// Receives the advisory progress messages of a report build.
pub trait StatusSink {
    fn status(&mut self, message: &str);
}

/// Sends status messages to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn status(&mut self, message: &str) {
        info!("{message}");
    }
}

impl StatusSink for Vec<String> {
    fn status(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

/// Rendered charts per goal, in the order the indicators were supplied.
#[derive(Debug, Default)]
pub struct GoalImages {
    by_goal: BTreeMap<Goal, Vec<ChartImage>>,
}

impl GoalImages {
    pub fn push(&mut self, goal: Goal, image: ChartImage) {
        self.by_goal.entry(goal).or_default().push(image);
    }

    pub fn count(&self, goal: Goal) -> usize {
        self.by_goal.get(&goal).map_or(0, Vec::len)
    }

    pub fn total(&self) -> usize {
        self.by_goal.values().map(Vec::len).sum()
    }

    /// Image counts for every registry goal, zero included.
    pub fn counts(&self) -> Vec<(Goal, usize)> {
        Goal::all().map(|g| (g, self.count(g))).collect()
    }

    fn take(&mut self, goal: Goal) -> Vec<ChartImage> {
        self.by_goal.remove(&goal).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanEntry {
    pub goal: Goal,
    pub images: usize,
    pub start_page: u32,
    pub pages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationPlan {
    pub entries: Vec<PlanEntry>,
    pub first_content_page: u32,
    pub images_per_page: usize,
}

impl PaginationPlan {
    pub fn entry(&self, goal: Goal) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| e.goal == goal)
    }

    /// Last page number of the document.
    pub fn last_page(&self) -> u32 {
        let content: u32 = self.entries.iter().map(|e| e.pages).sum();
        self.first_content_page + content - 1
    }

    /// Rows of the index table. Goals without charts show `-`.
    pub fn index_rows(&self) -> Vec<Vec<String>> {
        self.entries
            .iter()
            .map(|e| {
                let page = if e.images == 0 {
                    "-".to_string()
                } else {
                    e.start_page.to_string()
                };
                vec![e.goal.number().to_string(), e.goal.name().to_string(), page]
            })
            .collect()
    }
}

/// Pages needed for `images` charts laid out `per_page` to a page.
pub fn pages_for(images: usize, per_page: usize) -> u32 {
    let per_page = per_page.max(1);
    (images / per_page + usize::from(images % per_page != 0)) as u32
}

/// Front matter is the index page, preceded by the cover when there is one.
pub fn front_matter_pages(has_cover: bool) -> u32 {
    1 + u32::from(has_cover)
}

/// Assign starting pages in the order given. A goal with no images gets the
/// current running page but occupies none.
pub fn plan_pagination(
    counts: &[(Goal, usize)],
    first_content_page: u32,
    images_per_page: usize,
) -> PaginationPlan {
    let mut page = first_content_page;
    let entries = counts
        .iter()
        .map(|&(goal, images)| {
            let pages = pages_for(images, images_per_page);
            let entry = PlanEntry {
                goal,
                images,
                start_page: page,
                pages,
            };
            page += pages;
            entry
        })
        .collect();
    PaginationPlan {
        entries,
        first_content_page,
        images_per_page: images_per_page.max(1),
    }
}

/// The report chart for one indicator: a line per sub category with data, a
/// fallback line over all values when some sub category has none but a
/// target exists, and the target as a dashed purple line.
pub fn indicator_chart(rows: &[&IndicatorRecord]) -> Option<ChartSpec> {
    let first = rows.first()?;
    let mut spec = ChartSpec::line(
        format!("{}: {}", first.indicator_number, first.indicator),
        "Year",
        "Value",
    );

    let groups = group_points(rows.iter().copied());
    let mut some_group_empty = false;
    for (sub_category, points) in &groups {
        if points.is_empty() {
            some_group_empty = true;
            continue;
        }
        spec.push_series(
            Series::line(
                sub_category_label(sub_category.as_deref()),
                points.iter().map(|&(x, y)| (x as f64, y)).collect(),
            )
            .with_markers(),
        );
    }

    let has_target = rows.iter().any(|r| r.target_value.is_some());
    if some_group_empty && has_target {
        let mut all: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|r| r.value.map(|v| (r.year as f64, v)))
            .collect();
        all.sort_by(|a, b| a.0.total_cmp(&b.0));
        if !all.is_empty() {
            spec.push_series(Series::line("All values", all).with_markers().unlabelled());
        }
    }

    let mut seen = HashSet::new();
    let mut target: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|r| r.target_value.map(|t| (r.year, t)))
        .filter(|(year, _)| seen.insert(*year))
        .map(|(year, t)| (year as f64, t))
        .collect();
    target.sort_by(|a, b| a.0.total_cmp(&b.0));
    if !target.is_empty() {
        spec.push_series(
            Series::line("Target Value", target)
                .dashed()
                .colored((128, 0, 128)),
        );
    }
    Some(spec)
}

/// Render one chart per indicator and bucket it under its goal.
pub fn collect_images<R: ChartRenderer + ?Sized>(
    dataset: &Dataset,
    renderer: &R,
    config: &ReportConfig,
    status: &mut dyn StatusSink,
) -> Result<GoalImages, RenderError> {
    status.status(STATUS_STARTED);
    pause(config);

    let mut images = GoalImages::default();
    for indicator in &dataset.indicators {
        let rows = dataset.indicator_rows(indicator);
        let Some(spec) = indicator_chart(&rows) else {
            continue;
        };
        let goal = rows[0].goal;
        debug!(
            indicator = %indicator,
            goal = goal.number(),
            series = spec.series().len(),
            "rendering indicator chart"
        );
        let image = renderer.render_png(&spec)?;
        images.push(goal, image);
    }

    status.status(STATUS_ALMOST_DONE);
    pause(config);
    Ok(images)
}

fn pause(config: &ReportConfig) {
    let d = config.status_pause();
    if !d.is_zero() {
        std::thread::sleep(d);
    }
}

pub fn emit_front_matter(
    doc: &mut Document,
    plan: &PaginationPlan,
    cover: Option<&CoverImage>,
    config: &ReportConfig,
) {
    if let Some(cover) = cover {
        doc.add_picture(
            cover.png.clone(),
            config.cover_width_in,
            config.cover_height_in,
        );
        doc.add_page_break();
    }
    doc.add_heading(1, INDEX_HEADING, Align::Center);
    doc.add_table(
        INDEX_COLUMNS.iter().map(|c| c.to_string()).collect(),
        plan.index_rows(),
    );
}

/// Emit one section per goal with charts, in plan order. Consumes the
/// images; each buffer is moved into the document.
pub fn emit_content(
    doc: &mut Document,
    plan: &PaginationPlan,
    mut images: GoalImages,
    config: &ReportConfig,
) -> Result<(), RenderError> {
    let per_page = plan.images_per_page;
    for entry in plan.entries.iter().filter(|e| e.images > 0) {
        let goal_images = images.take(entry.goal);
        if goal_images.len() != entry.images {
            return Err(RenderError::InvalidData(format!(
                "goal {} planned {} charts but has {}",
                entry.goal,
                entry.images,
                goal_images.len()
            )));
        }
        doc.add_section(SectionProps {
            border_color: Some(entry.goal.color().to_string()),
        });
        doc.add_heading(2, entry.goal.heading(), Align::Center);

        let n = goal_images.len();
        for (i, image) in goal_images.into_iter().enumerate() {
            doc.add_picture(image.png, config.image_width_in, config.image_height_in);
            let page_full = (i + 1) % per_page == 0;
            let last = i + 1 == n;
            if page_full || last {
                let page = entry.start_page + (i / per_page) as u32;
                doc.add_paragraph(format!("Page {page}"), Align::Center);
            }
            if page_full && !last {
                doc.add_page_break();
            }
        }
    }
    if images.total() > 0 {
        warn!(
            leftover = images.total(),
            "charts collected for goals outside the plan were dropped"
        );
    }
    Ok(())
}

/// Front matter plus content for an already-collected set of images.
pub fn assemble(
    images: GoalImages,
    cover: Option<&CoverImage>,
    config: &ReportConfig,
) -> Result<(Document, PaginationPlan), RenderError> {
    let plan = plan_pagination(
        &images.counts(),
        front_matter_pages(cover.is_some()) + 1,
        config.images_per_page,
    );
    let mut doc = Document::new(REPORT_TITLE);
    emit_front_matter(&mut doc, &plan, cover, config);
    emit_content(&mut doc, &plan, images, config)?;
    Ok((doc, plan))
}

/// The finished report, ready to be offered for download.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
    pub plan: PaginationPlan,
}

pub struct ReportComposer<'a, R: ChartRenderer + ?Sized> {
    config: &'a ReportConfig,
    renderer: &'a R,
}

impl<'a, R: ChartRenderer + ?Sized> ReportComposer<'a, R> {
    pub fn new(config: &'a ReportConfig, renderer: &'a R) -> Self {
        ReportComposer { config, renderer }
    }

    pub fn build(
        &self,
        dataset: &Dataset,
        cover: Option<&CoverImage>,
        status: &mut dyn StatusSink,
    ) -> Result<ReportArtifact, RenderError> {
        info!(indicators = dataset.indicators.len(), "report build started");
        let images = collect_images(dataset, self.renderer, self.config, status)?;
        let charts = images.total();
        let (doc, plan) = assemble(images, cover, self.config)?;
        let bytes = doc.to_bytes()?;
        info!(
            charts,
            pages = plan.last_page(),
            bytes = bytes.len(),
            "report build finished"
        );
        Ok(ReportArtifact {
            file_name: self.config.file_name.clone(),
            mime: DOCX_MIME,
            bytes,
            plan,
        })
    }
}
