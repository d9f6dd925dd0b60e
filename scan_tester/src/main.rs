use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::path::{Path, PathBuf};
use tone_scan::core_modules::body_classifier::Gender;
use tone_scan::core_modules::height::{Height, HeightUnit};
use tone_scan::core_modules::landmark::LandmarkSet;
use tone_scan::core_modules::region::region::{BoundingBox, Region};
use tone_scan::core_modules::swatch::{self, Swatch};
use tone_scan::store::JsonFileStore;
use tone_scan::{DetectorFrame, ScanConfig, ScanDriver, ScanReport, ScanRequest, ScanSession};

/// Runs tone_scan sessions against recorded detector output.
#[derive(Parser, Debug)]
#[command(name = "scan_tester", version, about, long_about = None)]
struct Cli {
    /// JSON file with a `ScanConfig`; missing fields keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score the skin tone of an image against a target color
    Match {
        /// Face image (any format the `image` crate reads)
        #[arg(long)]
        image: PathBuf,

        /// Hex code (#RRGGBB) or swatch name
        #[arg(long)]
        target: Option<String>,

        /// Face box as x,y,width,height
        #[arg(long, value_parser = parse_bounds)]
        crop: Option<BoundingBox>,

        /// JSON file that keeps the last match percentage
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Classify one face-mesh frame
    Face {
        /// JSON array of face-mesh landmarks
        #[arg(long)]
        landmarks: PathBuf,

        #[command(flatten)]
        person: Person,
    },
    /// Feed recorded pose frames until the body classifier fires
    Body {
        /// JSON array of frames; each frame is a landmark array or null
        #[arg(long)]
        landmarks: PathBuf,

        #[arg(long)]
        gender: Gender,

        /// Wait for 30 stable frames instead of 15
        #[arg(long)]
        steady: bool,

        #[command(flatten)]
        person: Person,
    },
}

#[derive(Args, Debug)]
struct Person {
    #[arg(long)]
    height: f64,

    #[arg(long, default_value = "cm")]
    unit: HeightUnit,

    /// Seed for the estimate and affirmation draws
    #[arg(long)]
    seed: Option<u64>,
}

impl Person {
    fn height(&self) -> Result<Height> {
        Ok(Height::new(self.height, self.unit)?)
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

fn parse_bounds(text: &str) -> std::result::Result<BoundingBox, String> {
    let parts = text
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    match parts[..] {
        [x, y, width, height] => Ok(BoundingBox {
            x,
            y,
            width,
            height,
        }),
        _ => Err(format!("expected x,y,width,height, got {text:?}")),
    }
}

fn load_config(path: Option<&Path>) -> Result<ScanConfig> {
    let Some(path) = path else {
        return Ok(ScanConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

async fn run(session: ScanSession<StdRng>, frames: Vec<DetectorFrame>) -> Result<ScanReport> {
    let (sender, handle) = ScanDriver::spawn(session);
    let total = frames.len();
    for (i, frame) in frames.into_iter().enumerate() {
        if sender.send(frame).await.is_err() {
            log::debug!("scan finished after {i} of {total} frames");
            break;
        }
    }
    drop(sender);
    Ok(handle.await??)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let report = match cli.command {
        Command::Match {
            image,
            target,
            crop,
            store,
        } => {
            let picture = image::open(&image)
                .with_context(|| format!("opening {}", image.display()))?
                .to_rgba8();
            let region = match crop {
                Some(bounds) => Region::crop(&picture, bounds)?,
                None => Region::from_image(&picture),
            };
            let target = match target.as_deref() {
                Some(text) => Some(match text.parse::<Swatch>() {
                    Ok(swatch) => swatch.lab(),
                    Err(_) => swatch::hex_to_lab(text)?,
                }),
                None if config.use_default_target => None,
                None => bail!("--target is required unless the config sets use_default_target"),
            };
            let request = ScanRequest {
                target,
                ..ScanRequest::color_match(swatch::DEFAULT_TARGET)
            };
            let mut session = ScanSession::with_rng(config, request, StdRng::from_entropy())?;
            if let Some(path) = store {
                session = session.with_store(JsonFileStore::open(path)?);
            }
            run(session, vec![DetectorFrame::FaceRegion(region)]).await?
        }
        Command::Face { landmarks, person } => {
            let set: LandmarkSet = read_json(&landmarks)?;
            let request = ScanRequest::face(person.height()?);
            let session = ScanSession::with_rng(config, request, person.rng())?;
            run(session, vec![DetectorFrame::Face(set)]).await?
        }
        Command::Body {
            landmarks,
            gender,
            steady,
            person,
        } => {
            let recorded: Vec<Option<LandmarkSet>> = read_json(&landmarks)?;
            let frames = recorded
                .into_iter()
                .map(|frame| frame.map_or(DetectorFrame::NoDetection, DetectorFrame::Pose))
                .collect();
            let config = if steady {
                ScanConfig {
                    required_frames: ScanConfig::steady().required_frames,
                    ..config
                }
            } else {
                config
            };
            let request = ScanRequest::body(person.height()?, gender);
            let session = ScanSession::with_rng(config, request, person.rng())?;
            run(session, frames)
                .await
                .context("recording ended before a stable pose was held")?
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}
