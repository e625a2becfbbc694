//! Hoplabel: polygon image annotations, taxonomy checks and dataset
//! format conversion.
//!
//! Labels are kept in a native per-image JSON form (polygons in normalized
//! coordinates plus probabilistic categories and properties) and converted
//! to and from Darknet, COCO and KITTI sets.
//!
//! # Modules
//!
//! - [`geom`]: Points, rectangles and polygons tagged with their coordinate space
//! - [`meta`]: The taxonomy a label set is checked against
//! - [`label`]: Image and object labels
//! - [`format`]: Dataset layouts and their readers and writers
//! - [`conversion`]: Whole-set conversion with a lossiness report
//! - [`validation`]: Label validation and cleaning
//! - [`editor`]: Interactive labeling session, independent of any GUI toolkit
//! - [`track`]: Frame-to-frame object identity by IOU
//! - [`error`]: Error types for hoplabel operations

pub mod conversion;
pub mod editor;
pub mod error;
pub mod format;
pub mod geom;
pub mod label;
pub mod meta;
pub mod track;
pub mod validation;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

pub use error::HoplabelError;

use editor::{load_records, HopStore, LabelFilter};
use format::io_coco_json::{coco_to_darknet, CocoToDarknetOptions};
use format::io_darknet::read_darknet_file;
use format::{files, LabelFormat, SetOptions};
use geom::{Pixel, Rect};
use meta::LabelMeta;
use track::{Detection, IouTracker};

/// The hoplabel CLI application.
#[derive(Parser)]
#[command(name = "hoplabel")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print the detected format of a dataset folder.
    Detect(DetectArgs),
    /// Convert a dataset folder to another format.
    Convert(ConvertArgs),
    /// Validate labels against their taxonomy.
    Validate(ValidateArgs),
    /// Drop objects the taxonomy filters reject and rewrite the labels.
    Clean(CleanArgs),
    /// Write a COCO annotation file as a Darknet label set.
    CocoToDarknet(CocoToDarknetArgs),
    /// List the images an editing session would open.
    Records(RecordsArgs),
    /// Assign track ids to a sequence of Darknet label files.
    Track(TrackArgs),
}

/// Options locating the taxonomy.
#[derive(clap::Args)]
struct MetaArgs {
    /// Taxonomy id.
    #[arg(long, short = 'm', default_value_t = 0, env = "HOPLABEL_META_ID")]
    meta_id: u32,

    /// Taxonomy file; defaults to `meta/m{id}.json` in the dataset folder
    /// or its nearest ancestor.
    #[arg(long)]
    meta: Option<PathBuf>,
}

impl MetaArgs {
    fn load(&self, folder: &Path) -> Result<LabelMeta, HoplabelError> {
        match &self.meta {
            Some(path) => meta::load_meta(path),
            None => meta::find_meta(self.meta_id, folder),
        }
    }

    /// The taxonomy if one can be found; conversions work without it.
    fn try_load(&self, folder: &Path) -> Option<LabelMeta> {
        match self.load(folder) {
            Ok(meta) => Some(meta),
            Err(err) if self.meta.is_some() => {
                log::warn!("{err}");
                None
            }
            Err(err) => {
                log::debug!("no taxonomy: {err}");
                None
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args)]
struct DetectArgs {
    /// Dataset folder.
    input: PathBuf,

    #[arg(long, short = 'm', default_value_t = 0)]
    meta_id: u32,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Source format ('hop', 'darknet', 'coco' or 'kitti'); detected if omitted.
    #[arg(long, short = 'f')]
    from: Option<String>,

    /// Target format.
    #[arg(long, short = 't')]
    to: String,

    /// Source dataset folder.
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Target dataset folder.
    #[arg(long, short = 'o')]
    output: PathBuf,

    #[command(flatten)]
    meta: MetaArgs,

    /// Crop Darknet output to each label's ROI.
    #[arg(long)]
    crop_roi: bool,

    /// Only convert images whose stem matches this wildcard.
    #[arg(long)]
    pattern: Option<String>,

    /// Output format for the conversion report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// Dataset folder to validate.
    input: PathBuf,

    /// Dataset format; detected if omitted.
    #[arg(long)]
    format: Option<String>,

    #[command(flatten)]
    meta: MetaArgs,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

#[derive(clap::Args)]
struct CleanArgs {
    /// Dataset folder to clean in place.
    input: PathBuf,

    /// Dataset format; detected if omitted.
    #[arg(long)]
    format: Option<String>,

    #[command(flatten)]
    meta: MetaArgs,
}

#[derive(clap::Args)]
struct CocoToDarknetArgs {
    /// COCO annotation file.
    input: PathBuf,

    /// Output folder.
    output: PathBuf,

    /// Comma-separated target class names; COCO category `c` maps to
    /// class `c - 1` if omitted.
    #[arg(long, value_delimiter = ',')]
    classes: Option<Vec<String>>,

    /// Pixel crop as `x,y,width,height`.
    #[arg(long, value_delimiter = ',')]
    crop: Option<Vec<f64>>,
}

#[derive(clap::Args)]
struct RecordsArgs {
    /// Native dataset folder.
    input: PathBuf,

    #[arg(long, short = 'm', default_value_t = 0)]
    meta_id: u32,

    #[arg(long, value_enum, default_value_t = LabelFilter::Export)]
    filter: LabelFilter,

    /// Wildcard on image stems.
    #[arg(long)]
    pattern: Option<String>,

    /// Keep images whose lowest confidence is at most this.
    #[arg(long, default_value_t = 1.0)]
    conf_thr: f64,
}

#[derive(clap::Args)]
struct TrackArgs {
    /// Folder of Darknet label files, one per frame in name order.
    input: PathBuf,

    /// IOU at or above which boxes of consecutive frames are one object.
    #[arg(long, default_value_t = track::DEFAULT_IOU_THR)]
    iou_thr: f64,
}

/// Run the hoplabel CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), HoplabelError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Detect(args)) => run_detect(args),
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Clean(args)) => run_clean(args),
        Some(Commands::CocoToDarknet(args)) => run_coco_to_darknet(args),
        Some(Commands::Records(args)) => run_records(args),
        Some(Commands::Track(args)) => run_track(args),
        None => {
            println!("hoplabel {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Polygon annotations, taxonomy checks and dataset conversion.");
            println!();
            println!("Run 'hoplabel --help' for usage information.");
            Ok(())
        }
    }
}

fn parse_format(name: &str) -> Result<LabelFormat, HoplabelError> {
    LabelFormat::parse(name).ok_or_else(|| {
        HoplabelError::UnsupportedFormat(format!(
            "'{}' (supported: hop, darknet, coco, kitti)",
            name
        ))
    })
}

fn parse_optional_format(name: Option<&str>) -> Result<Option<LabelFormat>, HoplabelError> {
    name.map(parse_format).transpose()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), HoplabelError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| HoplabelError::Io(std::io::Error::other(err)))?;
    println!("{json}");
    Ok(())
}

fn run_detect(args: DetectArgs) -> Result<(), HoplabelError> {
    let format = format::detect_format(&args.input, args.meta_id)?;
    println!("{format}");
    Ok(())
}

fn run_convert(args: ConvertArgs) -> Result<(), HoplabelError> {
    let from = parse_optional_format(args.from.as_deref())?;
    let to = parse_format(&args.to)?;

    let mut opts = SetOptions::new(args.meta.meta_id);
    opts.crop_roi = args.crop_roi;
    opts.pattern = args.pattern;
    if let Some(meta) = args.meta.try_load(&args.input) {
        opts.class_names = meta.class_names();
    }

    let report = conversion::convert_dataset(&args.input, from, &args.output, to, &opts)?;
    match args.report {
        ReportFormat::Json => print_json(&report)?,
        ReportFormat::Text => print!("{report}"),
    }
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), HoplabelError> {
    let format = parse_optional_format(args.format.as_deref())?;
    let meta = args.meta.load(&args.input)?;
    let set = format::open_label_set(&args.input, format, &SetOptions::new(args.meta.meta_id))?;
    let loaded = set.find_pairs()?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let mut report = validation::validate_labels(&loaded.pairs, &meta, &opts);
    for failure in &loaded.failures {
        report.add(validation::ValidationIssue::error(
            validation::IssueCode::UnreadableLabel,
            failure.message.clone(),
            validation::IssueContext::Image {
                image: failure.path.display().to_string(),
            },
        ));
    }

    match args.output {
        ReportFormat::Json => print_json(&serde_json::json!({
            "error_count": report.error_count(),
            "warning_count": report.warning_count(),
            "issues": &report.issues,
        }))?,
        ReportFormat::Text => print!("{}", report),
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(HoplabelError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

fn run_clean(args: CleanArgs) -> Result<(), HoplabelError> {
    let format = parse_optional_format(args.format.as_deref())?;
    let meta = args.meta.load(&args.input)?;
    let mut opts = SetOptions::new(args.meta.meta_id);
    opts.class_names = meta.class_names();
    let set = format::open_label_set(&args.input, format, &opts)?;

    let summary = validation::clean_dataset(set.as_ref(), &meta)?;
    println!(
        "Cleaned {} label(s), dropped {} object(s)",
        summary.labels, summary.dropped
    );
    for failure in &summary.failures {
        println!("  failed: {failure}");
    }
    Ok(())
}

fn run_coco_to_darknet(args: CocoToDarknetArgs) -> Result<(), HoplabelError> {
    let crop = args
        .crop
        .map(|v| match v.as_slice() {
            [x, y, w, h] => Ok(Rect::<Pixel>::new(*x, *y, *w, *h)),
            _ => Err(HoplabelError::Validation {
                message: format!("--crop needs 4 numbers, got {}", v.len()),
            }),
        })
        .transpose()?;
    let opts = CocoToDarknetOptions {
        class_names: args.classes,
        crop,
    };

    let report = coco_to_darknet(&args.input, &args.output, &opts)?;
    println!(
        "Wrote {} image(s), {} annotation(s) to {}",
        report.images_written,
        report.annotations_written,
        args.output.display()
    );
    if !report.images_skipped.is_empty() {
        println!("Skipped {} image(s) with pending annotations", report.images_skipped.len());
    }
    if report.annotations_outside_crop > 0 {
        println!("Dropped {} annotation(s) outside the crop", report.annotations_outside_crop);
    }
    for failure in &report.failures {
        println!("Failed: {failure}");
    }
    Ok(())
}

fn run_records(args: RecordsArgs) -> Result<(), HoplabelError> {
    let store = HopStore::new(args.meta_id);
    let records = load_records(
        &args.input,
        &store,
        args.filter,
        args.pattern.as_deref(),
        args.conf_thr,
    )?;
    for record in &records {
        let mark = if record.labeled { "*" } else { " " };
        println!(
            "{} {} ({} object(s), min conf {:.2})",
            mark,
            record.image.display(),
            record.label.objects.len(),
            record.label.min_conf()
        );
    }
    println!("{} record(s)", records.len());
    Ok(())
}

fn run_track(args: TrackArgs) -> Result<(), HoplabelError> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(&args.input)? {
        let path = entry?.path();
        if path.is_file() && files::has_extension(&path, &["txt"]) {
            frames.push(path);
        }
    }
    frames.sort();

    let mut tracker: IouTracker<Detection> = IouTracker::new(args.iou_thr);
    for frame in &frames {
        let mut detections: Vec<Detection> = read_darknet_file(frame)?
            .iter()
            .map(|row| Detection::new(row.class_id, 1.0, row.rect()))
            .collect();
        tracker.track(&mut detections);
        println!("{}", files::stem_string(frame));
        for det in &detections {
            println!("  {det}");
        }
    }
    log::info!(
        "tracked {} frame(s), {} id(s) assigned",
        frames.len(),
        tracker.peek_next_id().as_i64() - 1
    );
    Ok(())
}
