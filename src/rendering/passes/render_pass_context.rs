use std::sync::Arc;

use crate::rendering::{
    config::RenderConfig,
    render_common::RenderCommon,
    shader_loader::{PipelineCache, PipelineCacheBuilder},
};

pub struct PassCreationContext<'a> {
    pub device: &'a wgpu::Device,
    pub config: &'static RenderConfig,
    pub common: Arc<RenderCommon>,
    pub cache_builder: &'a mut PipelineCacheBuilder,
}

pub struct RenderPassContext<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub pipeline_cache: &'a PipelineCache,
    pub common: &'a RenderCommon,
}
