#![warn(unused_extern_crates)]
use anyhow::{Context, Result};
use clap::Parser;
use face_replace::config::{CASCADE_DIR, Config, DetectorConfig};
use face_replace::error::Error;
use face_replace::manipulation::Overlay;
use face_replace::pipeline::Pipeline;
use image::{DynamicImage, ImageError, ImageReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Debug)]
#[command(version, about = "Paste an image over every face found in a photo", long_about = None)]
struct CmdArgs {
    /// Photo to search for faces
    target: PathBuf,

    /// Image placed over each face. Transparency is honoured
    overlay: PathBuf,

    /// Where to write the result
    #[arg(short, long, value_name = "FILE", default_value = "result.png")]
    output: PathBuf,

    /// Directory holding the face and eye cascades
    #[arg(long, value_name = "DIR", default_value = CASCADE_DIR)]
    cascade_dir: PathBuf,

    /// Face cascade, overriding the one in --cascade-dir
    #[arg(long, value_name = "FILE")]
    face_cascade: Option<PathBuf>,

    /// Eye cascade, overriding the one in --cascade-dir
    #[arg(long, value_name = "FILE")]
    eye_cascade: Option<PathBuf>,

    /// Window growth between scan levels, must exceed 1
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Neighbouring hits a face needs to be reported
    #[arg(long)]
    min_neighbors: Option<u32>,

    /// Ignore faces smaller than this many pixels across
    #[arg(long)]
    min_face_size: Option<u32>,

    /// Keep faces with no eyes detected
    #[arg(long)]
    allow_eyeless: bool,

    /// Overlay width relative to face width
    #[arg(long)]
    scale: Option<f64>,

    /// Shift left, as a fraction of overlay width
    #[arg(long, allow_negative_numbers = true)]
    offset_x: Option<f64>,

    /// Shift up, as a fraction of overlay height
    #[arg(long, allow_negative_numbers = true)]
    offset_y: Option<f64>,

    /// Minimum head tilt (degrees) before the overlay is rotated
    #[arg(long)]
    rotation_threshold: Option<f64>,

    /// Never rotate the overlay
    #[arg(long)]
    no_rotate: bool,

    /// Outline detections and paste at half opacity
    #[arg(long)]
    trace: bool,
}

impl CmdArgs {
    fn config(&self) -> Config {
        let mut detector = DetectorConfig::with_cascade_dir(&self.cascade_dir);
        if let Some(path) = &self.face_cascade {
            detector.face_cascade = path.clone();
        }
        if let Some(path) = &self.eye_cascade {
            detector.eye_cascade = path.clone();
        }
        detector.scale_factor = self.scale_factor.unwrap_or(detector.scale_factor);
        detector.min_neighbors = self.min_neighbors.unwrap_or(detector.min_neighbors);
        detector.min_face_size = self.min_face_size.unwrap_or(detector.min_face_size);
        detector.require_eyes = !self.allow_eyeless;

        let mut config = Config {
            detector,
            ..Config::default()
        };
        let c = &mut config.compositor;
        c.scale = self.scale.unwrap_or(c.scale);
        c.offset_x = self.offset_x.unwrap_or(c.offset_x);
        c.offset_y = self.offset_y.unwrap_or(c.offset_y);
        c.rotation_threshold = self.rotation_threshold.unwrap_or(c.rotation_threshold);
        c.rotate = !self.no_rotate;
        if self.trace {
            c.opacity_scale = 0.5;
        }

        config
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let args = match CmdArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version come through here too
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(args: &CmdArgs) -> Result<()> {
    let config = args.config();
    config.validate()?;

    let mut target = load_image(&args.target)?.into_rgb8();
    let overlay = Overlay::from(load_image(&args.overlay)?);
    debug!(
        "Target {:?}, overlay {:?} (alpha: {})",
        target.dimensions(),
        overlay.dimensions(),
        overlay.has_alpha()
    );

    let pipeline = Pipeline::new(&config)?;

    let start = Instant::now();
    let detection = if args.trace {
        pipeline.run_trace(&mut target, &overlay)
    } else {
        pipeline.run(&mut target, &overlay)
    }
    .context("Failed to composite overlay")?;
    debug!("Took {:?}", start.elapsed());
    info!("Covered {} faces", detection.len());

    target.save(&args.output).map_err(|source| Error::Output {
        path: args.output.clone(),
        source,
    })?;
    info!("Result at {:?}", args.output);

    Ok(())
}

fn load_image(path: &Path) -> Result<DynamicImage, Error> {
    let input = |source: ImageError| Error::Input {
        path: path.to_path_buf(),
        source,
    };

    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| input(e.into()))?
        .decode()
        .map_err(input)
}

fn exit_code(e: &anyhow::Error) -> u8 {
    match e.chain().find_map(|cause| cause.downcast_ref::<Error>()) {
        Some(Error::InvalidArgument(_)) => 1,
        Some(Error::Input { .. }) => 2,
        Some(Error::Config { .. } | Error::Cascade { .. }) => 3,
        Some(Error::Output { .. }) => 4,
        None => 1,
    }
}
