use id_arena::Id;

use crate::{model::Model, rendering::render_model::RenderModelId};

pub type SceneModelId = Id<SceneModel>;

pub struct SceneModel {
    pub name: String,
    pub model: Model,
    /// Set by the renderer once the model has GPU buffers.
    pub render_model: Option<RenderModelId>,
}

impl SceneModel {
    pub fn new(model: Model) -> Self {
        Self {
            name: model.name.clone(),
            model,
            render_model: None,
        }
    }
}
