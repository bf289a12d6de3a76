//! Subcommand implementations.

use crate::cli::{
    BackprojectArgs, CaptureArgs, Command, DbStatsArgs, DepthHintArgs, DownloadArgs, InspectArgs, RunArgs, SelectArgs,
};
use crate::error::AppError;
use recon_capture::{CaptureMode, CaptureSession, DatasetWriter, ImageSequence, MaskParams, Trigger, unique_dir};
use recon_data::rgbd::image_dimensions;
use recon_data::{BackprojectParams, Intrinsics, backproject_files, convert_depth_dir, ply_summary, write_point_cloud_ply};
use recon_pipeline::commands::CommandBuilder;
use recon_pipeline::download::{DownloadRequest, download_subset};
use recon_pipeline::{
    DryRunRunner, Pipeline, PipelineConfig, PipelineReport, ProcessRunner, ProjectLayout, SelectedModel, Stage,
    StageRange, ToolRunner, read_database_stats, select_best_model,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing::info;

pub fn run(command: Command) -> Result<(), AppError> {
    match command {
        Command::Run(args) => run_pipeline(&args),
        Command::Config(args) => {
            println!("{}", build_config(&args)?.to_json_pretty()?);
            Ok(())
        }
        Command::SelectModel(args) => select_model(&args),
        Command::Inspect(args) => inspect(&args),
        Command::DepthHints(args) => depth_hints(&args),
        Command::DbStats(args) => db_stats(&args),
        Command::Backproject(args) => backproject(&args),
        Command::Capture(args) => capture(&args),
        Command::Download(args) => download(&args),
        Command::UniqueDir { base } => {
            println!("{}", unique_dir(base).display());
            Ok(())
        }
    }
}

/// Config file (or defaults) with command-line overrides applied.
pub fn build_config(args: &RunArgs) -> Result<PipelineConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(project) = &args.project {
        config.project = project.clone();
    }
    if let Some(colmap) = &args.colmap {
        config.colmap = colmap.clone();
    }
    if let Some(images) = &args.images {
        config.image_dir = Some(images.clone());
    }
    if let Some(database) = &args.database {
        config.database = Some(database.clone());
    }
    if let Some(matcher) = args.matcher {
        config.matching.matcher = matcher.into();
    }
    if let Some(mesher) = args.mesher {
        config.dense.mesher = mesher.into();
    }
    if let Some(max_features) = args.max_features {
        config.features.max_num_features = max_features;
    }
    if let Some(size) = args.max_image_size {
        config.dense.max_image_size = size;
    }
    if let Some(hints) = &args.depth_hints {
        config.dense.depth_hint_dir = Some(hints.clone());
    }
    if args.no_gpu {
        config.features.use_gpu = false;
        config.matching.use_gpu = false;
    }
    if args.dry_run {
        config.dry_run = true;
    }
    Ok(config)
}

fn stage_range(args: &RunArgs) -> Result<StageRange, AppError> {
    let from = args.from.unwrap_or(Stage::FeatureExtraction);
    let to = args.to.unwrap_or(Stage::Meshing);
    Ok(StageRange::new(from, to)?)
}

fn run_pipeline(args: &RunArgs) -> Result<(), AppError> {
    let config = build_config(args)?;
    let range = stage_range(args)?;

    let runner: Box<dyn ToolRunner> = if config.dry_run {
        Box::new(DryRunRunner)
    } else {
        Box::new(ProcessRunner::new())
    };

    let mut pipeline = Pipeline::new(config, runner)?.with_range(range);
    if let Some(model) = &args.model {
        pipeline = pipeline.with_model(model);
    }

    let report = pipeline.run()?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &PipelineReport) {
    for record in &report.stages {
        println!("{:<20} {:.1?}", record.stage.name(), record.elapsed);
    }
    match &report.model {
        Some(SelectedModel::Analyzed(best)) => println!(
            "model: {} ({} registered images, {} points)",
            best.path.display(),
            best.stats.registered_images,
            best.stats.points
        ),
        Some(SelectedModel::Explicit(path)) => println!("model: {}", path.display()),
        None => {}
    }
    for artifact in &report.artifacts {
        println!("output: {}", artifact.display());
    }
}

/// Sparse root for a path that is either a project or already a sparse root.
fn sparse_root(path: &Path) -> PathBuf {
    let nested = path.join("sparse");
    if nested.is_dir() { nested } else { path.to_path_buf() }
}

fn select_model(args: &SelectArgs) -> Result<(), AppError> {
    let sparse = sparse_root(&args.path);
    let mut config = PipelineConfig::for_project(&args.path);
    config.colmap = args.colmap.clone();
    let layout = ProjectLayout::from_config(&config);
    let commands = CommandBuilder::new(&config, &layout);

    let best = select_best_model(&ProcessRunner::new(), &commands, &sparse)?;
    println!(
        "{}\t{}\t{}",
        best.path.display(),
        best.stats.registered_images,
        best.stats.points
    );
    Ok(())
}

fn inspect(args: &InspectArgs) -> Result<(), AppError> {
    let path = args.kind.path_in(&args.project);
    if !path.is_file() {
        return Err(AppError::MissingFile(path));
    }

    info!("Loading {}: {}", args.kind, path.display());
    let summary = ply_summary(&path)?;

    println!("{}: {}", args.kind, path.display());
    println!("vertices: {}", summary.vertex_count);
    if args.kind.is_mesh() {
        println!("faces:    {}", summary.face_count);
    }
    println!("colors:   {}", summary.has_colors);
    println!("normals:  {}", summary.has_normals);
    if let Some(bounds) = summary.bounds {
        println!("min:      {:?}", bounds.min.to_array());
        println!("max:      {:?}", bounds.max.to_array());
        println!("extent:   {:?}", bounds.extent().to_array());
    }
    Ok(())
}

fn depth_hints(args: &DepthHintArgs) -> Result<(), AppError> {
    let depth_dir = args.dataset.join("depth");
    if !depth_dir.is_dir() {
        return Err(AppError::MissingFile(depth_dir));
    }
    let out_dir = args
        .output
        .clone()
        .unwrap_or_else(|| args.dataset.join("depth_hint"));

    let count = convert_depth_dir(&depth_dir, &out_dir, args.max_range)?;
    println!("{} depth hints written to {}", count, out_dir.display());
    Ok(())
}

fn backproject(args: &BackprojectArgs) -> Result<(), AppError> {
    for path in [&args.color, &args.depth] {
        if !path.is_file() {
            return Err(AppError::MissingFile(path.clone()));
        }
    }

    let (width, height) = image_dimensions(&args.depth)?;
    let intrinsics = Intrinsics::centered(width, height, args.focal);
    let params = BackprojectParams {
        depth_scale: args.depth_scale,
        depth_trunc: args.depth_trunc,
        flip_to_viewer: !args.no_flip,
    };

    let points = backproject_files(&args.color, &args.depth, Some(intrinsics), &params)?;
    write_point_cloud_ply(&args.output, &points)?;
    println!("{} points saved to {}", points.len(), args.output.display());
    Ok(())
}

fn db_stats(args: &DbStatsArgs) -> Result<(), AppError> {
    let database = if args.path.is_dir() {
        ProjectLayout::from_config(&PipelineConfig::for_project(&args.path)).database
    } else {
        args.path.clone()
    };
    if !database.is_file() {
        return Err(AppError::MissingFile(database));
    }

    let stats = read_database_stats(&database)?;
    for image in &stats.images {
        if args.unmatched && image.matched_images > 0 {
            continue;
        }
        println!("{}\t{}\t{}", image.name, image.keypoints, image.matched_images);
    }
    println!(
        "{} images, {} keypoints, {} without matches",
        stats.images.len(),
        stats.total_keypoints(),
        stats.unmatched().count()
    );
    Ok(())
}

fn capture_mode(args: &CaptureArgs) -> Result<CaptureMode, AppError> {
    if args.manual {
        Ok(CaptureMode::Manual)
    } else {
        Ok(CaptureMode::automatic_secs(args.interval)?)
    }
}

/// Trigger fed by stdin lines: Enter captures, "q" quits.
fn stdin_trigger() -> impl FnMut() -> Trigger {
    let (sender, receiver) = mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let action = if line.trim().eq_ignore_ascii_case("q") {
                Trigger::Quit
            } else {
                Trigger::Capture
            };
            if sender.send(action).is_err() || action == Trigger::Quit {
                break;
            }
        }
    });

    move || match receiver.try_recv() {
        Ok(action) => action,
        Err(mpsc::TryRecvError::Empty) => Trigger::Idle,
        Err(mpsc::TryRecvError::Disconnected) => Trigger::Quit,
    }
}

fn capture(args: &CaptureArgs) -> Result<(), AppError> {
    let root = unique_dir(args.root.join(&args.save_dir));
    let mode = capture_mode(args)?;
    println!("Saving to: {}", root.display());
    println!("Mode: {:?}, Images: {}", mode, args.num_images);

    let mut writer = DatasetWriter::create(&root)?;
    if args.mask {
        writer = writer.with_mask(MaskParams::default().with_depth_threshold(args.depth_threshold))?;
    }
    let mut session = CaptureSession::new(writer, mode, args.num_images);

    let saved = if let Some(color_dir) = &args.from_dir {
        let mut source = ImageSequence::from_dir(color_dir, args.depth_dir.as_deref())?;
        if args.manual {
            session.run(&mut source, stdin_trigger())?
        } else {
            session.run(&mut source, || Trigger::Idle)?
        }
    } else {
        capture_from_camera(args, &mut session)?
    };

    println!("{} frames saved to {}", saved, root.display());
    Ok(())
}

#[cfg(feature = "webcam")]
fn capture_from_camera(args: &CaptureArgs, session: &mut CaptureSession) -> Result<usize, AppError> {
    let mut camera = match args.resolution {
        Some((width, height)) => recon_capture::WebcamCapture::with_resolution(args.device, width, height)?,
        None => recon_capture::WebcamCapture::new(args.device)?,
    };
    if args.manual {
        println!("Press Enter to capture, q + Enter to quit");
    }
    let trigger = stdin_trigger();
    Ok(session.run(&mut camera, trigger)?)
}

#[cfg(not(feature = "webcam"))]
fn capture_from_camera(_args: &CaptureArgs, _session: &mut CaptureSession) -> Result<usize, AppError> {
    Err(AppError::Usage(
        "camera capture needs the `webcam` feature; use --from-dir to import images".to_string(),
    ))
}

fn download(args: &DownloadArgs) -> Result<(), AppError> {
    let request = DownloadRequest {
        cli: args.cli.clone(),
        ..DownloadRequest::new(&args.repo_id, &args.subset).with_local_dir(&args.local_dir)
    };
    let target = download_subset(&ProcessRunner::new(), &request)?;
    println!("{}", target.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{MatcherArg, MesherArg};
    use recon_pipeline::config::{MatcherKind, MesherKind};

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recon.json");
        std::fs::write(&path, r#"{ "colmap": "/opt/colmap", "dense": { "mesher": "delaunay" } }"#).unwrap();

        let args = RunArgs {
            project: Some(PathBuf::from("/data/scan")),
            config: Some(path),
            matcher: Some(MatcherArg::Sequential),
            no_gpu: true,
            ..Default::default()
        };
        let config = build_config(&args).unwrap();
        assert_eq!(config.colmap, PathBuf::from("/opt/colmap"));
        assert_eq!(config.project, PathBuf::from("/data/scan"));
        assert_eq!(config.matching.matcher, MatcherKind::Sequential);
        assert_eq!(config.dense.mesher, MesherKind::Delaunay);
        assert!(!config.features.use_gpu && !config.matching.use_gpu);

        let args = RunArgs {
            mesher: Some(MesherArg::None),
            ..Default::default()
        };
        assert_eq!(build_config(&args).unwrap().dense.mesher, MesherKind::None);
    }

    #[test]
    fn test_stage_range_defaults() {
        let range = stage_range(&RunArgs::default()).unwrap();
        assert_eq!(range, StageRange::default());

        let args = RunArgs {
            from: Some(Stage::Meshing),
            to: Some(Stage::Matching),
            ..Default::default()
        };
        assert!(stage_range(&args).is_err());
    }

    #[test]
    fn test_sparse_root_resolution() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(sparse_root(dir.path()), dir.path());
        std::fs::create_dir(dir.path().join("sparse")).unwrap();
        assert_eq!(sparse_root(dir.path()), dir.path().join("sparse"));
    }

    #[test]
    fn test_inspect_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let args = InspectArgs {
            project: dir.path().to_path_buf(),
            kind: recon_data::DenseModelKind::Poisson,
        };
        assert!(matches!(inspect(&args), Err(AppError::MissingFile(p)) if p.ends_with("dense/meshed-poisson.ply")));
    }

    fn capture_args(dir: &Path) -> CaptureArgs {
        CaptureArgs {
            save_dir: PathBuf::from("scan"),
            num_images: 10,
            root: dir.to_path_buf(),
            interval: 0.0,
            manual: false,
            automatic: true,
            device: 0,
            resolution: None,
            mask: false,
            depth_threshold: 800,
            from_dir: None,
            depth_dir: None,
        }
    }

    #[test]
    fn test_capture_mode_rejects_bad_interval() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = capture_args(dir.path());
        args.interval = f64::INFINITY;
        assert!(matches!(capture_mode(&args), Err(AppError::Capture(_))));
        args.manual = true;
        assert_eq!(capture_mode(&args).unwrap(), CaptureMode::Manual);
    }

    #[test]
    fn test_masked_import() {
        let dir = tempfile::tempdir().unwrap();
        let color_dir = dir.path().join("in_color");
        let depth_dir = dir.path().join("in_depth");
        std::fs::create_dir_all(&color_dir).unwrap();
        std::fs::create_dir_all(&depth_dir).unwrap();
        image::RgbImage::from_pixel(4, 2, image::Rgb([30, 200, 40]))
            .save(color_dir.join("frame_0.png"))
            .unwrap();
        image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::from_pixel(4, 2, image::Luma([500]))
            .save(depth_dir.join("frame_0.png"))
            .unwrap();

        let mut args = capture_args(dir.path());
        args.mask = true;
        args.from_dir = Some(color_dir);
        args.depth_dir = Some(depth_dir);
        capture(&args).unwrap();

        let root = dir.path().join("scan");
        assert!(root.join("color/color_000.png").is_file());
        assert!(root.join("mask_color/color_000.png").is_file());
        assert!(root.join("mask_depth/depth_000.png").is_file());
    }

    #[test]
    fn test_db_stats_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let args = DbStatsArgs {
            path: dir.path().to_path_buf(),
            unmatched: false,
        };
        assert!(matches!(db_stats(&args), Err(AppError::MissingFile(p)) if p.ends_with("database.db")));
    }

    #[test]
    fn test_dry_run_pipeline_command() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            project: Some(dir.path().join("scan")),
            dry_run: true,
            ..Default::default()
        };
        run_pipeline(&args).unwrap();
        assert!(!dir.path().join("scan").exists());
    }
}
