use glam::{Mat4, Quat, Vec3};
use id_arena::Arena;
use std::collections::HashMap;

use crate::animation::skin::{Skin, SkinId};
use crate::material_manager::MaterialManager;
use crate::model::{Buffers, Model};
use crate::scene_graph::object3d::{Object3D, ObjectId};
use crate::scene_graph::scene_model::{SceneModel, SceneModelId};
use crate::scene_graph::transform::Transform;

/// Result of spawning one glTF scene: a new root object plus the mapping from
/// glTF node indices to the objects created for them.
pub struct SpawnedGltf {
    pub root: ObjectId,
    pub nodes: HashMap<usize, ObjectId>,
}

pub struct Scene {
    pub objects: Arena<Object3D>,
    pub models: Arena<SceneModel>,
    pub skins: Arena<Skin>,
    gltf_mesh_to_model: HashMap<(String, usize), SceneModelId>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            models: Arena::new(),
            skins: Arena::new(),
            gltf_mesh_to_model: HashMap::new(),
        }
    }

    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Option<&mut Object3D> {
        self.objects.get_mut(id)
    }

    #[allow(dead_code)]
    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.name == name)
            .map(|(id, _)| id)
    }

    pub fn add_model(&mut self, model: SceneModel) -> SceneModelId {
        self.models.alloc(model)
    }

    /// Spawns every node of `scene` under a fresh root object called `root_name`.
    pub fn spawn_gltf_scene(
        &mut self,
        material_manager: &MaterialManager,
        file_name: &str,
        buffers: Buffers,
        scene: &gltf::Scene,
        root_name: &str,
    ) -> anyhow::Result<SpawnedGltf> {
        let root = self.add_object(Object3D::named(root_name));
        let mut nodes = HashMap::new();

        for node in scene.nodes() {
            self.spawn_gltf_node(
                material_manager,
                file_name,
                buffers,
                &node,
                root,
                &mut nodes,
            )?;
        }

        // Skins reference joints anywhere in the hierarchy, so they're resolved
        // after every node exists.
        for node in scene.nodes() {
            self.attach_gltf_skins(&node, buffers, &nodes)?;
        }

        self.invalidate_object_hierarchy(root);

        Ok(SpawnedGltf { root, nodes })
    }

    fn spawn_gltf_node(
        &mut self,
        material_manager: &MaterialManager,
        file_name: &str,
        buffers: Buffers,
        node: &gltf::Node,
        parent: ObjectId,
        nodes: &mut HashMap<usize, ObjectId>,
    ) -> anyhow::Result<ObjectId> {
        let node_name = node.name().unwrap_or("Unnamed").to_string();
        let mut object = Object3D::named(node_name.clone());
        let (translation, rotation, scale) = node.transform().decomposed();

        object.transform = Transform::from_trs(
            translation.into(),
            Quat::from_array(rotation),
            scale.into(),
        );

        if let Some(mesh) = node.mesh() {
            let key = (file_name.to_string(), mesh.index());

            let model_id = match self.gltf_mesh_to_model.get(&key).copied() {
                Some(model_id) => model_id,
                None => {
                    let mesh_name = mesh
                        .name()
                        .map(String::from)
                        .unwrap_or_else(|| format!("{} (Mesh)", node_name));

                    let model =
                        Model::from_gltf(material_manager, file_name, mesh_name, mesh, buffers)?;
                    let model_id = self.add_model(SceneModel::new(model));
                    self.gltf_mesh_to_model.insert(key, model_id);

                    model_id
                }
            };

            object.model_id = Some(model_id);
        }

        let object_id = self.add_object(object);
        nodes.insert(node.index(), object_id);
        self.set_object_parent(object_id, Some(parent));

        for child in node.children() {
            self.spawn_gltf_node(material_manager, file_name, buffers, &child, object_id, nodes)?;
        }

        Ok(object_id)
    }

    fn attach_gltf_skins(
        &mut self,
        node: &gltf::Node,
        buffers: Buffers,
        nodes: &HashMap<usize, ObjectId>,
    ) -> anyhow::Result<()> {
        if let Some(skin) = node.skin() {
            let skin_id = self.skins.alloc(Skin::from_gltf(&skin, buffers, nodes)?);

            if let Some(object) = nodes
                .get(&node.index())
                .and_then(|id| self.objects.get_mut(*id))
            {
                object.skin_id = Some(skin_id);
            }
        }

        for child in node.children() {
            self.attach_gltf_skins(&child, buffers, nodes)?;
        }

        Ok(())
    }

    pub fn get_skin(&self, id: SkinId) -> Option<&Skin> {
        self.skins.get(id)
    }

    /// `root` followed by all of its descendants, depth first.
    pub fn descendants(&self, root: ObjectId) -> Vec<ObjectId> {
        let mut result = Vec::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if let Some(object) = self.objects.get(id) {
                result.push(id);
                stack.extend(object.child_ids.iter().rev().copied());
            }
        }

        result
    }

    /// Objects under `root` that render a mesh.
    pub fn mesh_objects(&self, root: ObjectId) -> Vec<ObjectId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| {
                self.objects
                    .get(*id)
                    .is_some_and(|object| object.model_id.is_some())
            })
            .collect()
    }

    /// Whether `id` and all of its ancestors are visible.
    pub fn is_visible(&self, id: ObjectId) -> bool {
        let mut current = Some(id);

        while let Some(object) = current.and_then(|id| self.objects.get(id)) {
            if !object.visible {
                return false;
            }
            current = object.parent_id;
        }

        true
    }

    /// Updates all object transforms in hierarchical order
    fn update_transforms(&self) {
        let root_objects = self.objects.iter().filter_map(|(id, object)| {
            if object.parent_id.is_none() {
                Some(id)
            } else {
                None
            }
        });

        for root_id in root_objects {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY, false);
        }
    }

    fn update_object_transform_recursive(
        &self,
        object_id: ObjectId,
        parent_world_matrix: Mat4,
        parent_changed: bool,
    ) {
        if let Some(object) = self.objects.get(object_id) {
            let changed = parent_changed || object.transform.is_world_dirty();

            if changed {
                let local_matrix = *object.transform.get_local_matrix();
                object
                    .transform
                    .set_world_matrix(parent_world_matrix * local_matrix);
            }

            let world_matrix = *object.transform.get_world_matrix();
            for &child_id in &object.child_ids {
                self.update_object_transform_recursive(child_id, world_matrix, changed);
            }
        }
    }

    /// Invalidates world transforms for an object and all its descendants
    pub fn invalidate_object_hierarchy(&self, object_id: ObjectId) {
        if let Some(object) = self.objects.get(object_id) {
            object.transform.invalidate_world();

            for &child_id in &object.child_ids {
                self.invalidate_object_hierarchy(child_id);
            }
        }
    }

    /// Sets the parent of an object and updates child relationships
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if let Some(old_parent_id) = self.objects.get(child_id).and_then(|c| c.parent_id) {
            if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                old_parent.child_ids.retain(|&id| id != child_id);
            }
        }

        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;
        }

        if let Some(new_parent) = new_parent_id.and_then(|id| self.objects.get_mut(id)) {
            new_parent.child_ids.push(child_id);
        }

        self.invalidate_object_hierarchy(child_id);
    }

    pub fn set_object_translation(&mut self, object_id: ObjectId, translation: Vec3) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_translation(translation);
        }
    }

    pub fn set_object_transform(
        &mut self,
        object_id: ObjectId,
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_transform(translation, rotation, scale);
        }
    }

    pub fn get_object_transform(&self, object_id: ObjectId) -> Option<&Transform> {
        self.objects.get(object_id).map(|object| &object.transform)
    }

    pub fn late_update(&mut self) {
        self.update_transforms();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_follow_parent_translation() {
        let mut scene = Scene::new();
        let parent = scene.add_object(Object3D::named("parent"));
        let child = scene.add_object(Object3D::named("child"));
        scene.set_object_parent(child, Some(parent));
        scene.set_object_translation(child, Vec3::X);
        scene.late_update();

        scene.set_object_translation(parent, Vec3::new(0.0, 1.0, 0.0));
        scene.late_update();

        let world = *scene.get_object(child).unwrap().transform.get_world_matrix();
        assert!((world.transform_point3(Vec3::ZERO) - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn reparenting_moves_child_lists() {
        let mut scene = Scene::new();
        let a = scene.add_object(Object3D::named("a"));
        let b = scene.add_object(Object3D::named("b"));
        let child = scene.add_object(Object3D::named("child"));

        scene.set_object_parent(child, Some(a));
        scene.set_object_parent(child, Some(b));

        assert!(scene.get_object(a).unwrap().child_ids.is_empty());
        assert_eq!(scene.get_object(b).unwrap().child_ids, vec![child]);
        assert_eq!(scene.descendants(b), vec![b, child]);
        assert_eq!(scene.get_object_by_name("child"), Some(child));
    }

    #[test]
    fn hidden_parent_hides_descendants() {
        let mut scene = Scene::new();
        let parent = scene.add_object(Object3D::named("parent"));
        let child = scene.add_object(Object3D::named("child"));
        scene.set_object_parent(child, Some(parent));

        assert!(scene.is_visible(child));
        scene.get_object_mut(parent).unwrap().visible = false;
        assert!(!scene.is_visible(child));
    }
}
