use crate::demo::DemoState;

/// One tick of the simulation: vignette logic first, then world matrices so the
/// renderer sees this frame's transforms.
pub fn update(state: &mut DemoState, dt: f32) {
    state.update(dt);
    state.world.scene.late_update();
}
