// Entry point and high-level CLI flow.
//
// - `dashboard` loads the sheet once and drives the dashboard
//   through a numbered menu; tables are previewed as markdown, charts and
//   the report are written to the output directory.
// - `report` builds the `.docx` report without any interaction.
// - `summary` prints load diagnostics and the goal distribution as JSON.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sdg_report::charts::render_svg;
use sdg_report::composer::{LogStatus, ReportComposer, StatusSink};
use sdg_report::cover::resolve_cover;
use sdg_report::dashboard::{AppContext, Event, NoticeLevel, Session, Tab, View, ViewOutput};
use sdg_report::loader::load_dataset;
use sdg_report::reports::goal_distribution;
use sdg_report::{output, util, AppConfig, LoadReport};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const PREVIEW_ROWS: usize = 5;

#[derive(Parser)]
#[command(name = "sdg_report")]
#[command(version, about = "Sustainable Development Goals dashboard and report generator", long_about = None)]
struct Cli {
    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "SDG_REPORT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Explore the indicators interactively
    Dashboard {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Directory for exported tables, charts and reports
        #[arg(short, long, default_value = "out")]
        out_dir: PathBuf,
    },

    /// Build the report document
    Report {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path (configured file name in the current directory if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fetch the cover image from this URL
        #[arg(long, conflicts_with_all = ["cover", "no_cover"])]
        cover_url: Option<String>,

        /// Use this local PNG as the cover image
        #[arg(long, conflicts_with = "no_cover")]
        cover: Option<PathBuf>,

        /// Build without a cover page even if one is configured
        #[arg(long)]
        no_cover: bool,
    },

    /// Print load diagnostics and the goal distribution as JSON
    Summary {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Prints report progress to the console as well as the log.
struct ConsoleStatus;

impl StatusSink for ConsoleStatus {
    fn status(&mut self, message: &str) {
        LogStatus.status(message);
        println!("{message}");
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => AppConfig::from_file(p)
            .with_context(|| format!("Failed to read configuration {}", p.display()))?,
        None => AppConfig::default(),
    };
    Ok(config)
}

fn print_load_report(report: &LoadReport) {
    println!(
        "Processing dataset... ({} rows loaded, {} observations)",
        util::format_int(report.wide_rows as u64),
        util::format_int(report.tidy_rows as u64)
    );
    if report.blank_rows > 0 {
        println!(
            "Note: {} blank rows skipped.",
            util::format_int(report.blank_rows as u64)
        );
    }
    if report.missing_values > 0 {
        println!(
            "Note: {} cells had no numeric value.",
            util::format_int(report.missing_values as u64)
        );
    }
    println!();
}

/// Read one trimmed line after printing `label`. `None` on end of input.
fn prompt(label: &str) -> Option<String> {
    print!("{label}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn read_choice() -> Option<String> {
    prompt("Enter choice: ")
}

/// Let the user pick one of `options` by number.
fn pick(label: &str, options: &[String]) -> Option<String> {
    if options.is_empty() {
        println!("Nothing to choose from.\n");
        return None;
    }
    println!("{label}:");
    for (i, o) in options.iter().enumerate() {
        println!("  [{}] {}", i + 1, o);
    }
    let choice = read_choice()?;
    match choice.parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => Some(options[n - 1].clone()),
        _ => {
            println!("Invalid choice.\n");
            None
        }
    }
}

fn read_year_range() -> Option<Event> {
    let from = prompt("From year: ")?;
    let to = prompt("To year: ")?;
    match (util::parse_year(&from), util::parse_year(&to)) {
        (Some(a), Some(b)) => Some(Event::SetYearRange(a, b)),
        _ => {
            println!("Invalid year.\n");
            None
        }
    }
}

fn show(out: &ViewOutput) {
    println!("\n{}", out.title);
    if let Some(selected) = &out.selected {
        match out.year_range {
            Some((a, b)) => println!("{selected} ({a}-{b})"),
            None => println!("{selected}"),
        }
    }
    println!();
    for n in &out.notices {
        let tag = match n.level {
            NoticeLevel::Success => "OK",
            NoticeLevel::Info => "Info",
            NoticeLevel::Warning => "Warning",
            NoticeLevel::Error => "Error",
        };
        println!("[{tag}] {}", n.message);
    }
    for chart in &out.charts {
        println!("Chart: {}", chart.title);
    }
    println!();
    for table in &out.tables {
        output::preview_table_rows(table, PREVIEW_ROWS);
    }
}

fn slug(title: &str) -> String {
    let mut s: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    while s.contains("__") {
        s = s.replace("__", "_");
    }
    s.trim_matches('_').to_string()
}

fn export_view(ctx: &AppContext, out: &ViewOutput, out_dir: &Path) {
    let (w, h) = (ctx.config.chart.width, ctx.config.chart.height);
    for chart in &out.charts {
        let path = out_dir.join("charts").join(format!("{}.svg", slug(&chart.title)));
        let written = render_svg(chart, (w, h))
            .map_err(|e| e.to_string())
            .and_then(|svg| output::write_bytes(&path, svg.as_bytes()).map_err(|e| e.to_string()));
        match written {
            Ok(()) => println!("Chart saved to {}", path.display()),
            Err(e) => eprintln!("Write error: {}", e),
        }
    }
    for table in &out.tables {
        match output::export_table(out_dir, table) {
            Ok(paths) => {
                for p in paths {
                    println!("Table exported to {}", p.display());
                }
            }
            Err(e) => eprintln!("Write error: {}", e),
        }
    }
    println!();
}

fn save_report(out: &ViewOutput, out_dir: &Path) {
    let Some(report) = &out.report else {
        return;
    };
    let path = out_dir.join(&report.file_name);
    match output::write_bytes(&path, &report.bytes) {
        Ok(()) => println!("Report saved to {} ({})\n", path.display(), report.mime),
        Err(e) => eprintln!("Write error: {}", e),
    }
}

fn print_main_menu() {
    println!("[1] Select Indicator");
    println!("[2] Select Year Range");
    println!("[3] Select Analysis Tab");
    println!("[4] Select Sub Category");
    println!("[5] Select Department");
    println!("[6] Positive");
    println!("[7] Negative");
    println!("[8] All Goals");
    println!("[9] Generate Report");
    println!("[E] Export Tables and Charts");
    println!("[0] Exit\n");
}

fn run_dashboard(file: &Path, out_dir: &Path, config: AppConfig) -> Result<()> {
    let (ctx, report) = AppContext::load(file, config)
        .with_context(|| format!("Failed to load file {}", file.display()))?;
    print_load_report(&report);
    let sub_categories = ctx.dataset.sub_categories();
    let departments = ctx.dataset.departments();
    let tabs: Vec<String> = Tab::ALL.iter().map(|t| t.title().to_string()).collect();

    let mut session = Session::new(ctx);
    let mut status = ConsoleStatus;
    let mut out = session.handle(Event::Refresh, &mut status);

    loop {
        show(&out);
        let event = match session.state().view {
            View::Main => {
                print_main_menu();
                let Some(choice) = read_choice() else { break };
                match choice.to_uppercase().as_str() {
                    "1" => pick("Select Indicator", &out.options).map(Event::SelectIndicator),
                    "2" => read_year_range(),
                    "3" => pick("Select Tab", &tabs).and_then(|t| {
                        Tab::ALL.iter().copied().find(|tab| tab.title() == t).map(Event::SelectTab)
                    }),
                    "4" => pick("Select Sub Category", &sub_categories).map(Event::SelectSubCategory),
                    "5" => pick("Select Department", &departments).map(Event::SelectDepartment),
                    "6" => Some(Event::CheckPositive),
                    "7" => Some(Event::CheckNegative),
                    "8" => Some(Event::ShowGoals),
                    "9" => Some(Event::GenerateReport),
                    "E" => {
                        export_view(session.context(), &out, out_dir);
                        continue;
                    }
                    "0" => break,
                    _ => {
                        println!("Invalid choice.\n");
                        continue;
                    }
                }
            }
            View::GoalList => {
                println!("[1-17] View SDG Graph");
                println!("[B] Back");
                println!("[0] Exit\n");
                let Some(choice) = read_choice() else { break };
                match choice.to_uppercase().as_str() {
                    "B" => Some(Event::Back),
                    "0" => break,
                    other => match other.parse::<u8>() {
                        Ok(n) => Some(Event::SelectGoal(n)),
                        Err(_) => {
                            println!("Invalid choice.\n");
                            continue;
                        }
                    },
                }
            }
            View::GoalDetail(_) => {
                println!("[1] Select Indicator");
                println!("[2] Select Year Range");
                println!("[E] Export Tables and Charts");
                println!("[B] Back to Goals");
                println!("[0] Exit\n");
                let Some(choice) = read_choice() else { break };
                match choice.to_uppercase().as_str() {
                    "1" => pick("Select Indicator", &out.options).map(Event::SelectIndicator),
                    "2" => read_year_range(),
                    "E" => {
                        export_view(session.context(), &out, out_dir);
                        continue;
                    }
                    "B" => Some(Event::Back),
                    "0" => break,
                    _ => {
                        println!("Invalid choice.\n");
                        continue;
                    }
                }
            }
        };
        let Some(event) = event else { continue };
        out = session.handle(event, &mut status);
        save_report(&out, out_dir);
    }
    println!("Exiting the program.");
    Ok(())
}

fn run_report(file: &Path, output_path: Option<PathBuf>, config: AppConfig) -> Result<()> {
    let (dataset, report) = load_dataset(file, &config.loader)
        .with_context(|| format!("Failed to load file {}", file.display()))?;
    print_load_report(&report);

    let ctx = AppContext::new(dataset, config);
    let cover = resolve_cover(&ctx.config.cover);
    if cover.is_none() && (ctx.config.cover.path.is_some() || ctx.config.cover.url.is_some()) {
        println!("Cover image unavailable; continuing without a cover page.");
    }
    let composer = ReportComposer::new(&ctx.config.report, ctx.renderer());
    let artifact = composer
        .build(&ctx.dataset, cover.as_ref(), &mut ConsoleStatus)
        .context("Report generation failed")?;

    let path = output_path.unwrap_or_else(|| PathBuf::from(&artifact.file_name));
    output::write_bytes(&path, &artifact.bytes)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "report written");
    println!(
        "Report saved to {} ({} pages, {} charts)",
        path.display(),
        artifact.plan.last_page(),
        artifact.plan.entries.iter().map(|e| e.images).sum::<usize>()
    );
    Ok(())
}

fn run_summary(file: &Path, config: &AppConfig) -> Result<()> {
    let (dataset, report) = load_dataset(file, &config.loader)
        .with_context(|| format!("Failed to load file {}", file.display()))?;
    let summary = serde_json::json!({
        "load": report,
        "indicators": dataset.indicators.len(),
        "goal_distribution": goal_distribution(&dataset.records),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Dashboard { file, out_dir }) => run_dashboard(&file, &out_dir, config),
        Some(Commands::Report {
            file,
            output,
            cover_url,
            cover,
            no_cover,
        }) => {
            if no_cover {
                config.cover.path = None;
                config.cover.url = None;
            } else if let Some(path) = cover {
                config.cover.path = Some(path);
                config.cover.url = None;
            } else if let Some(url) = cover_url {
                config.cover.path = None;
                config.cover.url = Some(url);
            }
            run_report(&file, output, config)
        }
        Some(Commands::Summary { file }) => run_summary(&file, &config),
        None => {
            println!("sdg_report - Sustainable Development Goals dashboard");
            println!("Run with --help for usage information");
            Ok(())
        }
    }
}
