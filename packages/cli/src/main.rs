#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the issue map.
//!
//! - `heatmap` loads issues (or synthetic points), runs one frame of an
//!   in-process render host and prints every overlay as an ASCII heatmap.
//! - `submit` stores a new issue.
//! - `generate` prints the points produced by a shape generator as JSON
//!   lines.
//!
//! The issue store is addressed by `--issues`: an `http(s)://` base URL for
//! the REST API, or the path of a JSON issue file.

mod render;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use issue_map_backend::open_backend;
use issue_map_decorator::FrameLoop;
use issue_map_generate::GeneratorKind;
use issue_map_issue_models::{GeoCoordinate, IssueType, IssueTypeFilter, NewIssue};
use issue_map_session::{HeatmapConfig, HeatmapMode, HeatmapSession, LoadOutcome};
use issue_map_spatial::{EquirectangularProjector, Range2d};

#[derive(Parser)]
#[command(name = "issue_map", about = "Civic issue heatmaps")]
struct Cli {
    /// Heatmap config TOML. Built-in defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the issue heatmap as text
    Heatmap(HeatmapArgs),
    /// Submit a new issue
    Submit(SubmitArgs),
    /// Print synthetic points from a shape generator
    Generate(GenerateArgs),
}

#[derive(Args)]
struct HeatmapArgs {
    /// Issue API base URL or JSON issue file. Overrides `backend_url`.
    #[arg(long)]
    issues: Option<String>,

    /// Issue type to show, or `all`
    #[arg(long)]
    filter: Option<IssueTypeFilter>,

    /// Weight points by isolation
    #[arg(long, conflicts_with = "generator")]
    weighted: bool,

    /// Show synthetic points from this generator instead of stored issues
    #[arg(long)]
    generator: Option<GeneratorKind>,

    /// Number of synthetic points
    #[arg(long, requires = "generator")]
    count: Option<usize>,

    /// Seed for the random generator
    #[arg(long)]
    seed: Option<u64>,

    /// Also draw the user location marker
    #[arg(long)]
    user_location: bool,

    #[arg(long, default_value_t = 72, value_parser = grid_size)]
    columns: usize,

    #[arg(long, default_value_t = 24, value_parser = grid_size)]
    rows: usize,
}

#[derive(Args)]
struct SubmitArgs {
    /// Issue API base URL or JSON issue file. Overrides `backend_url`.
    #[arg(long)]
    issues: Option<String>,

    #[arg(long = "type", value_parser = parse_issue_type)]
    issue_type: IssueType,

    #[arg(long, default_value = "")]
    description: String,

    #[arg(long, allow_negative_numbers = true)]
    latitude: f64,

    #[arg(long, allow_negative_numbers = true)]
    longitude: f64,

    /// Photo to attach
    #[arg(long)]
    photo: Option<PathBuf>,
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long, default_value = "random")]
    kind: GeneratorKind,

    #[arg(long, default_value_t = 10)]
    count: usize,

    #[arg(long)]
    seed: Option<u64>,

    /// Range as `min_x,min_y,max_x,max_y`. Defaults to the configured view.
    #[arg(long, value_parser = parse_range, allow_hyphen_values = true)]
    range: Option<Range2d>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => HeatmapConfig::load(path)?,
        None => HeatmapConfig::default(),
    };

    match cli.command {
        Commands::Heatmap(args) => heatmap(config, args).await?,
        Commands::Submit(args) => submit(&config, args).await?,
        Commands::Generate(args) => generate(&config, &args)?,
    }

    Ok(())
}

async fn heatmap(
    mut config: HeatmapConfig,
    args: HeatmapArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(issues) = args.issues {
        config.backend_url = issues;
    }
    if let Some(filter) = args.filter {
        config.filter = filter;
    }
    if args.weighted {
        config.mode = HeatmapMode::Weighted;
    }
    if let Some(kind) = args.generator {
        config.mode = HeatmapMode::Generator;
        config.generator.kind = kind;
    }
    if let Some(count) = args.count {
        config.generator.count = count;
    }
    if args.seed.is_some() {
        config.generator.seed = args.seed;
    }
    config.validate()?;

    let host = Arc::new(FrameLoop::with_viewport(
        config.default_view_range.to_range(),
    ));
    let backend = open_backend(&config.backend_url)?;
    let projector = Arc::new(EquirectangularProjector::new(
        config.user_location.fallback(),
    ));
    let show_location = args.user_location;

    let session = HeatmapSession::new(host.clone(), backend, projector, config);
    session.init_view()?;

    if let LoadOutcome::Applied(summary) = session.load().await? {
        log::info!(
            "Loaded {} points from {} selected (mode {})",
            summary.points,
            summary.selected,
            session.config().mode
        );
    }
    if show_location {
        session.show_user_location().await?;
    }

    let frame = host.tick();
    if frame.overlays.is_empty() {
        println!("Nothing to draw.");
    }
    for overlay in &frame.overlays {
        let surface = overlay.rasterize(args.columns, args.rows);
        println!(
            "{} points, spread {}, x [{:.3}, {:.3}] y [{:.3}, {:.3}]",
            overlay.points.len(),
            overlay.spread_factor,
            overlay.range.min_x,
            overlay.range.max_x,
            overlay.range.min_y,
            overlay.range.max_y,
        );
        print!("{}", render::render_ascii(&surface));
    }

    session.teardown();
    Ok(())
}

async fn submit(config: &HeatmapConfig, args: SubmitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let backend = open_backend(args.issues.as_deref().unwrap_or(&config.backend_url))?;
    let issue = NewIssue {
        issue_type: args.issue_type,
        description: args.description,
        location: GeoCoordinate::new(args.longitude, args.latitude, 0.0),
        photo: args.photo,
    };

    let receipt = backend.submit_issue(&issue).await?;
    println!("Submitted {} issue {}", issue.issue_type.label(), receipt.id);
    Ok(())
}

fn generate(config: &HeatmapConfig, args: &GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let Some(generator) = args.kind.shape_generator(args.seed) else {
        return Err(format!("{} needs issue records; use `heatmap` instead", args.kind).into());
    };
    let range = args
        .range
        .unwrap_or_else(|| config.default_view_range.to_range());

    for point in generator.generate(args.count, &range) {
        println!("{}", serde_json::to_string(&point)?);
    }
    Ok(())
}

fn parse_issue_type(s: &str) -> Result<IssueType, String> {
    match s.parse::<IssueTypeFilter>() {
        Ok(IssueTypeFilter::Only(issue_type)) => Ok(issue_type),
        Ok(IssueTypeFilter::All) => Err("a submission needs a single issue type".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn grid_size(s: &str) -> Result<usize, String> {
    const MAX_GRID_SIZE: usize = 1000;

    match s.parse::<usize>() {
        Ok(n) if (1..=MAX_GRID_SIZE).contains(&n) => Ok(n),
        Ok(n) => Err(format!("grid size must be between 1 and {MAX_GRID_SIZE}, got {n}")),
        Err(e) => Err(format!("invalid grid size '{s}': {e}")),
    }
}

fn parse_range(s: &str) -> Result<Range2d, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid range '{s}': {e}"))?;

    match values.as_slice() {
        [x0, y0, x1, y1] if values.iter().all(|v| v.is_finite()) => {
            Ok(Range2d::from_xyxy(*x0, *y0, *x1, *y1))
        }
        _ => Err(format!("range must be four finite numbers, got '{s}'")),
    }
}
