mod common;

use common::{config, write_fixture, zip_names, zip_part, MORTALITY_CSV};
use pretty_assertions::assert_eq;
use sdg_report::charts::SvgChartRenderer;
use sdg_report::composer::{LogStatus, ReportComposer, INDEX_HEADING};
use sdg_report::cover::{resolve_cover, CoverImage};
use sdg_report::docx::DOCX_MIME;
use sdg_report::goals::Goal;
use sdg_report::loader::load_dataset;
use sdg_report::{Dataset, ReportArtifact};

fn load(dir: &std::path::Path) -> Dataset {
    let path = write_fixture(dir, "allgoals.csv", MORTALITY_CSV);
    let (dataset, report) = load_dataset(&path, &config().loader).unwrap();
    assert_eq!(report.wide_rows, 3);
    assert_eq!(report.tidy_rows, 15);
    dataset
}

fn build(dataset: &Dataset, cover: Option<&CoverImage>) -> ReportArtifact {
    let cfg = config();
    let renderer = SvgChartRenderer::new(cfg.chart.width, cfg.chart.height);
    ReportComposer::new(&cfg.report, &renderer)
        .build(dataset, cover, &mut LogStatus)
        .unwrap()
}

#[test]
fn one_chart_under_goal_three() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = load(dir.path());
    let artifact = build(&dataset, None);

    assert_eq!(artifact.file_name, "final_report.docx");
    assert_eq!(artifact.mime, DOCX_MIME);

    let goal3 = artifact.plan.entry(Goal::new(3).unwrap()).unwrap();
    assert_eq!((goal3.images, goal3.start_page, goal3.pages), (1, 2, 1));
    // 4.1 has rows but no values or target; it still gets a chart with empty axes
    let goal4 = artifact.plan.entry(Goal::new(4).unwrap()).unwrap();
    assert_eq!((goal4.images, goal4.start_page, goal4.pages), (1, 3, 1));
    let with_images: Vec<u8> = artifact
        .plan
        .entries
        .iter()
        .filter(|e| e.images > 0)
        .map(|e| e.goal.number())
        .collect();
    assert_eq!(with_images, vec![3, 4]);

    let names = zip_names(&artifact.bytes);
    let media: Vec<&String> = names.iter().filter(|n| n.starts_with("word/media/")).collect();
    assert_eq!(media, vec!["word/media/image1.png", "word/media/image2.png"]);

    let body = zip_part(&artifact.bytes, "word/document.xml");
    assert!(body.contains(INDEX_HEADING));
    assert!(body.contains("SDG 3: Good Health and Well-being"));
    assert!(body.contains("SDG 4: Quality Education"));
    assert!(body.contains("Page 2"));
    assert!(body.contains("Page 3"));
    assert!(!body.contains("SDG 5: Gender Equality"));
    // goals are bordered in their accent colours
    assert!(body.contains(r#"w:color="4C9F38""#));
    assert!(body.contains(r#"w:color="C5192D""#));
    // 17 index rows plus the header
    assert_eq!(body.matches("<w:tr>").count(), 18);

    let core = zip_part(&artifact.bytes, "docProps/core.xml");
    assert!(core.contains("Sustainable Development Goals Report"));
}

#[test]
fn missing_cover_matches_a_run_without_cover() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = load(dir.path());

    let mut cover_cfg = config().cover;
    cover_cfg.path = Some(dir.path().join("no-such-cover.png"));
    let cover = resolve_cover(&cover_cfg);
    assert!(cover.is_none());

    let failed = build(&dataset, cover.as_ref());
    let plain = build(&dataset, None);
    assert_eq!(failed.plan, plain.plan);
    assert_eq!(zip_names(&failed.bytes), zip_names(&plain.bytes));
    assert_eq!(
        zip_part(&failed.bytes, "word/document.xml"),
        zip_part(&plain.bytes, "word/document.xml")
    );
}

#[test]
fn cover_adds_a_front_page() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = load(dir.path());

    let mut png = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png, 4, 4);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder
            .write_header()
            .unwrap()
            .write_image_data(&[200u8; 4 * 4 * 3])
            .unwrap();
    }
    let path = dir.path().join("cover.png");
    std::fs::write(&path, png).unwrap();
    let mut cover_cfg = config().cover;
    cover_cfg.path = Some(path);
    let cover = resolve_cover(&cover_cfg).unwrap();

    let artifact = build(&dataset, Some(&cover));
    assert_eq!(artifact.plan.first_content_page, 3);
    let goal3 = artifact.plan.entry(Goal::new(3).unwrap()).unwrap();
    assert_eq!(goal3.start_page, 3);
    let names = zip_names(&artifact.bytes);
    assert!(names.contains(&"word/media/image3.png".to_string()));
    let body = zip_part(&artifact.bytes, "word/document.xml");
    // 6 x 8 inch cover
    assert!(body.contains(r#"<wp:extent cx="5486400" cy="7315200"/>"#));
    assert!(body.contains("Page 3"));
    assert!(body.contains("Page 4"));
}

#[test]
fn repeated_builds_share_their_layout() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = load(dir.path());
    let first = build(&dataset, None);
    let second = build(&dataset, None);
    assert_eq!(first.plan, second.plan);
    assert_eq!(
        zip_part(&first.bytes, "word/document.xml"),
        zip_part(&second.bytes, "word/document.xml")
    );
}
