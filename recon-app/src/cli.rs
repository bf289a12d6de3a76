//! Command-line definitions.

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use recon_data::DenseModelKind;
use recon_pipeline::Stage;
use recon_pipeline::config::{MatcherKind, MesherKind};
use std::path::PathBuf;

/// Recon - COLMAP reconstruction orchestration
#[derive(Parser, Debug)]
#[command(name = "recon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Send spans to Tracy
    #[cfg(feature = "tracy")]
    #[arg(long, global = true)]
    pub tracy: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the reconstruction pipeline on a project
    Run(RunArgs),
    /// Print the effective pipeline configuration as JSON
    Config(RunArgs),
    /// Pick the sparse model with the most registered images
    SelectModel(SelectArgs),
    /// Summarize a dense model (fused cloud or mesh)
    Inspect(InspectArgs),
    /// Convert 16-bit depth images into depth hint files
    DepthHints(DepthHintArgs),
    /// Keypoint and match counts per image from a feature database
    DbStats(DbStatsArgs),
    /// Back-project an RGB-D pair into a colored point cloud
    Backproject(BackprojectArgs),
    /// Capture an RGB-D dataset
    Capture(CaptureArgs),
    /// Download a dataset subset from the Hugging Face hub
    Download(DownloadArgs),
    /// Print a directory name that does not exist yet
    UniqueDir {
        /// Base directory name
        base: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum MatcherArg {
    Exhaustive,
    Sequential,
}

impl From<MatcherArg> for MatcherKind {
    fn from(arg: MatcherArg) -> Self {
        match arg {
            MatcherArg::Exhaustive => MatcherKind::Exhaustive,
            MatcherArg::Sequential => MatcherKind::Sequential,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum MesherArg {
    None,
    Poisson,
    Delaunay,
    Both,
}

impl From<MesherArg> for MesherKind {
    fn from(arg: MesherArg) -> Self {
        match arg {
            MesherArg::None => MesherKind::None,
            MesherArg::Poisson => MesherKind::Poisson,
            MesherArg::Delaunay => MesherKind::Delaunay,
            MesherArg::Both => MesherKind::Both,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Project directory (holds images/, database.db, sparse/, dense/)
    pub project: Option<PathBuf>,

    /// JSON config file; command-line flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// COLMAP executable
    #[arg(long)]
    pub colmap: Option<PathBuf>,

    /// Input image directory (default: <project>/images)
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Feature database (default: <project>/database.db)
    #[arg(long)]
    pub database: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub matcher: Option<MatcherArg>,

    #[arg(long, value_enum)]
    pub mesher: Option<MesherArg>,

    /// Maximum SIFT features per image
    #[arg(long)]
    pub max_features: Option<u32>,

    /// Image size cap for undistortion and stereo
    #[arg(long)]
    pub max_image_size: Option<u32>,

    /// Depth hint directory passed to patch-match stereo
    #[arg(long)]
    pub depth_hints: Option<PathBuf>,

    /// Disable GPU use in extraction and matching
    #[arg(long)]
    pub no_gpu: bool,

    /// First stage to run
    #[arg(long)]
    pub from: Option<Stage>,

    /// Last stage to run
    #[arg(long)]
    pub to: Option<Stage>,

    /// Sparse model to densify instead of selecting one
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Print commands without running them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SelectArgs {
    /// Project directory or a sparse model root
    pub path: PathBuf,

    /// COLMAP executable
    #[arg(long, default_value = "colmap")]
    pub colmap: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Project directory with a dense/ subfolder
    pub project: PathBuf,

    /// Model type: f (fused point cloud), p (Poisson mesh), d (Delaunay mesh)
    #[arg(short = 't', long = "type", default_value = "f")]
    pub kind: DenseModelKind,
}

#[derive(Args, Debug, Clone)]
pub struct DepthHintArgs {
    /// Dataset directory with a depth/ subfolder
    pub dataset: PathBuf,

    /// Output directory (default: <dataset>/depth_hint)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Depths beyond this many meters are dropped
    #[arg(long, default_value_t = 5.0)]
    pub max_range: f32,
}

#[derive(Args, Debug, Clone)]
pub struct BackprojectArgs {
    /// Color image
    #[arg(long)]
    pub color: PathBuf,

    /// 16-bit depth image
    #[arg(long)]
    pub depth: PathBuf,

    /// Output PLY
    #[arg(short, long, default_value = "output.ply")]
    pub output: PathBuf,

    /// Focal length in pixels
    #[arg(long, default_value_t = 525.0)]
    pub focal: f32,

    /// Raw depth units per meter
    #[arg(long, default_value_t = 1000.0)]
    pub depth_scale: f32,

    /// Drop points farther than this many meters
    #[arg(long, default_value_t = 3.0)]
    pub depth_trunc: f32,

    /// Keep the camera frame instead of flipping y and z for viewing
    #[arg(long)]
    pub no_flip: bool,
}

/// `WIDTHxHEIGHT`, e.g. `1280x720`.
pub fn parse_resolution(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{value}`"))?;
    let width: u32 = width.trim().parse().map_err(|e| format!("width: {e}"))?;
    let height: u32 = height.trim().parse().map_err(|e| format!("height: {e}"))?;
    if width == 0 || height == 0 {
        return Err("resolution must be non-zero".to_string());
    }
    Ok((width, height))
}

#[derive(Args, Debug, Clone)]
pub struct DbStatsArgs {
    /// Project directory or a COLMAP database file
    pub path: PathBuf,

    /// Only list images without matches
    #[arg(long)]
    pub unmatched: bool,
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("mode").required(true).args(["manual", "automatic"])))]
pub struct CaptureArgs {
    /// Dataset directory name; a suffix is added if it already exists
    #[arg(default_value = "realsense_capture")]
    pub save_dir: PathBuf,

    /// Number of images to capture
    #[arg(default_value_t = 1000)]
    pub num_images: usize,

    /// Parent directory for datasets
    #[arg(long, default_value = "datasets")]
    pub root: PathBuf,

    /// Seconds between captures in automatic mode
    #[arg(short, long, default_value_t = 3.0)]
    pub interval: f64,

    /// Capture when Enter is pressed ("q" + Enter quits)
    #[arg(short, long)]
    pub manual: bool,

    /// Capture every --interval seconds
    #[arg(short, long)]
    pub automatic: bool,

    /// Webcam device index
    #[arg(long, default_value_t = 0)]
    pub device: u32,

    /// Requested camera resolution, e.g. 1280x720 (default: highest available)
    #[arg(long, value_parser = parse_resolution)]
    pub resolution: Option<(u32, u32)>,

    /// Also save masked copies keeping only near, green pixels
    #[arg(long)]
    pub mask: bool,

    /// Raw depth (millimeters) below which pixels survive masking
    #[arg(long, default_value_t = 800, requires = "mask")]
    pub depth_threshold: u16,

    /// Import color images from this directory instead of a camera
    #[arg(long)]
    pub from_dir: Option<PathBuf>,

    /// Depth images matching --from-dir
    #[arg(long, requires = "from_dir")]
    pub depth_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Dataset repository id, e.g. owner/name
    #[arg(long)]
    pub repo_id: String,

    /// Subset folder to download
    #[arg(long)]
    pub subset: String,

    /// Local directory for downloaded files
    #[arg(long, default_value = "./data")]
    pub local_dir: PathBuf,

    /// Hub CLI executable
    #[arg(long, default_value = "huggingface-cli")]
    pub cli: PathBuf,
}
