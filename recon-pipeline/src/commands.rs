//! Command lines for each COLMAP subcommand.

use crate::config::PipelineConfig;
use crate::layout::ProjectLayout;
use crate::stage::Stage;
use crate::tool::ToolInvocation;
use recon_data::DenseModelKind;
use std::path::Path;

/// Builds COLMAP invocations from the config and project layout.
#[derive(Debug, Clone)]
pub struct CommandBuilder<'a> {
    config: &'a PipelineConfig,
    layout: &'a ProjectLayout,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(config: &'a PipelineConfig, layout: &'a ProjectLayout) -> Self {
        Self { config, layout }
    }

    fn colmap(&self, subcommand: &str) -> ToolInvocation {
        ToolInvocation::new(&self.config.colmap, subcommand)
    }

    fn finish(&self, invocation: ToolInvocation, stage: Stage) -> ToolInvocation {
        invocation.extend(self.config.extra_args_for(stage))
    }

    pub fn feature_extractor(&self) -> ToolInvocation {
        let f = &self.config.features;
        let inv = self
            .colmap("feature_extractor")
            .path("database_path", &self.layout.database)
            .path("image_path", &self.layout.images)
            .opt("ImageReader.camera_model", &f.camera_model)
            .flag("ImageReader.single_camera", f.single_camera)
            .opt("SiftExtraction.max_num_features", f.max_num_features.to_string())
            .opt("SiftExtraction.max_image_size", f.max_image_size.to_string())
            .flag("SiftExtraction.use_gpu", f.use_gpu);
        self.finish(inv, Stage::FeatureExtraction)
    }

    pub fn matcher(&self) -> ToolInvocation {
        let m = &self.config.matching;
        let inv = self
            .colmap(m.matcher.subcommand())
            .path("database_path", &self.layout.database)
            .opt("SiftMatching.max_ratio", m.max_ratio.to_string())
            .opt("SiftMatching.max_distance", m.max_distance.to_string())
            .flag("SiftMatching.guided_matching", m.guided_matching)
            .flag("SiftMatching.use_gpu", m.use_gpu);
        self.finish(inv, Stage::Matching)
    }

    pub fn mapper(&self) -> ToolInvocation {
        let m = &self.config.mapper;
        let mut inv = self
            .colmap("mapper")
            .path("database_path", &self.layout.database)
            .path("image_path", &self.layout.images)
            .path("output_path", &self.layout.sparse)
            .opt("Mapper.min_num_matches", m.min_num_matches.to_string());
        if let Some(iterations) = m.ba_global_max_num_iterations {
            inv = inv.opt("Mapper.ba_global_max_num_iterations", iterations.to_string());
        }
        self.finish(inv, Stage::Mapping)
    }

    pub fn model_analyzer(&self, model: &Path) -> ToolInvocation {
        let inv = self.colmap("model_analyzer").path("path", model);
        self.finish(inv, Stage::ModelSelection)
    }

    pub fn image_undistorter(&self, model: &Path) -> ToolInvocation {
        let inv = self
            .colmap("image_undistorter")
            .path("image_path", &self.layout.images)
            .path("input_path", model)
            .path("output_path", &self.layout.dense)
            .opt("output_type", "COLMAP")
            .opt("max_image_size", self.config.dense.max_image_size.to_string());
        self.finish(inv, Stage::Undistortion)
    }

    pub fn patch_match_stereo(&self) -> ToolInvocation {
        let d = &self.config.dense;
        let mut inv = self
            .colmap("patch_match_stereo")
            .path("workspace_path", &self.layout.dense)
            .opt("workspace_format", "COLMAP")
            .opt("PatchMatchStereo.geom_consistency", if d.geom_consistency { "true" } else { "false" })
            .opt("PatchMatchStereo.max_image_size", d.max_image_size.to_string());
        if let Some(hints) = &d.depth_hint_dir {
            inv = inv.path(d.depth_hint_flag.trim_start_matches('-'), hints);
        }
        self.finish(inv, Stage::Stereo)
    }

    pub fn stereo_fusion(&self) -> ToolInvocation {
        let inv = self
            .colmap("stereo_fusion")
            .path("workspace_path", &self.layout.dense)
            .opt("workspace_format", "COLMAP")
            .opt("input_type", self.config.dense.fusion_input.as_str())
            .path("output_path", &self.layout.fused());
        self.finish(inv, Stage::Fusion)
    }

    pub fn poisson_mesher(&self) -> ToolInvocation {
        let inv = self
            .colmap("poisson_mesher")
            .path("input_path", &self.layout.fused())
            .path("output_path", &self.layout.dense_model(DenseModelKind::Poisson));
        self.finish(inv, Stage::Meshing)
    }

    pub fn delaunay_mesher(&self) -> ToolInvocation {
        let inv = self
            .colmap("delaunay_mesher")
            .path("input_path", &self.layout.dense)
            .path("output_path", &self.layout.dense_model(DenseModelKind::Delaunay));
        self.finish(inv, Stage::Meshing)
    }

    /// Mesher invocations enabled by the config, Poisson first.
    pub fn meshers(&self) -> Vec<ToolInvocation> {
        let mesher = self.config.dense.mesher;
        let mut meshers = Vec::new();
        if mesher.poisson() {
            meshers.push(self.poisson_mesher());
        }
        if mesher.delaunay() {
            meshers.push(self.delaunay_mesher());
        }
        meshers
    }
}
