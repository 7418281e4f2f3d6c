// Scene anchors: the assistant character on a head anchor, the wall canvas
// on a detected-plane anchor, and the doodle projectile between them.
use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;

use bevy::asset::LoadState;
use bevy::prelude::*;
use bevy::scene::SceneInstanceReady;

use crate::projectile::{FLIGHT_START, ParticleEmitter, Projectile};
use crate::viewer::{Viewer, spawn_viewer};

pub struct AnchorsPlugin;

impl Plugin for AnchorsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AnchorRegistry>()
            .add_systems(
                Startup,
                (load_assets, spawn_scene.after(spawn_viewer)).chain(),
            )
            .add_systems(
                Update,
                (advance_one_shots, watch_required_textures, warn_failed_scene),
            );
    }
}

const CHARACTER_PATH: &str = "character/assistant.gltf";

// Animation indices (alphabetical order in the GLTF)
const ANIM_IDLE: usize = 0; // Idle_Loop
const ANIM_JUMP_DOWN: usize = 1; // Jump_Down
const ANIM_JUMP_FLOAT: usize = 2; // Jump_Float
const ANIM_JUMP_UP: usize = 3; // Jump_Up
const ANIM_WAVE: usize = 4; // Wave

/// Assistant offset from the viewer's eyes, in metres.
const CHARACTER_OFFSET: Vec3 = Vec3::new(0.70, -0.35, -1.0);
const CHARACTER_YAW: f32 = -30.0 * std::f32::consts::PI / 180.0;

/// Pose of the simulated detected wall and the canvas surface on it.
const WALL_POSE: Vec3 = Vec3::new(0.0, 1.5, -3.0);
const CANVAS_SIZE: Vec2 = Vec2::new(3.75, 2.625);
const PLANE_MIN_BOUNDS: Vec2 = Vec2::new(0.6, 0.6);

const PLACEHOLDER_ART: &str = "textures/wall_placeholder.png";
const RESULT_ART: &str = "textures/doodle_result.png";

pub const CHARACTER: &str = "character";
pub const CANVAS: &str = "canvas";
pub const PROJECTILE: &str = "projectile";

/// How an entity is bound to the real world.
#[derive(Component)]
pub enum AnchorKind {
    /// Follows the viewer's head pose (parented to the camera).
    Head,
    /// Attached to a detected vertical surface with at least this much
    /// clear area, in metres.
    Plane { min_bounds: Vec2 },
}

impl AnchorKind {
    fn describe(&self) -> String {
        match self {
            AnchorKind::Head => "head-relative".into(),
            AnchorKind::Plane { min_bounds } => {
                format!(
                    "plane-relative (min bounds {} x {} m)",
                    min_bounds.x, min_bounds.y
                )
            }
        }
    }
}

/// Maps stable logical names to anchored entities, populated once at scene
/// setup. Callers skip a missing lookup instead of failing: the experience
/// degrades, it does not abort.
#[derive(Resource, Default)]
pub struct AnchorRegistry {
    entries: HashMap<&'static str, Entity>,
}

impl AnchorRegistry {
    pub fn register(&mut self, name: &'static str, entity: Entity) {
        if self.entries.insert(name, entity).is_some() {
            warn!("anchor {name} registered twice, keeping the newer entity");
        }
    }

    pub fn get(&self, name: &str) -> Option<Entity> {
        self.entries.get(name).copied()
    }
}

#[derive(Resource)]
pub struct CharacterAssets {
    pub scene: Handle<Scene>,
}

/// Animation graph and node indices for the assistant rig. Built once at
/// startup; handles are shared for the whole session.
#[derive(Resource)]
pub struct CharacterAnimations {
    pub graph: Handle<AnimationGraph>,
    pub idle: AnimationNodeIndex,
    pub wave: AnimationNodeIndex,
    pub jump_up: AnimationNodeIndex,
    pub jump_float: AnimationNodeIndex,
    pub jump_down: AnimationNodeIndex,
}

/// The two canvas textures. Both are required: a missing texture is fatal.
#[derive(Resource)]
pub struct CanvasArt {
    pub placeholder: Handle<Image>,
    pub result: Handle<Image>,
}

fn load_assets(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
) {
    let mut graph = AnimationGraph::new();
    let idle = graph.add_clip(
        asset_server.load(GltfAssetLabel::Animation(ANIM_IDLE).from_asset(CHARACTER_PATH)),
        1.0,
        graph.root,
    );
    let wave = graph.add_clip(
        asset_server.load(GltfAssetLabel::Animation(ANIM_WAVE).from_asset(CHARACTER_PATH)),
        1.0,
        graph.root,
    );
    let jump_up = graph.add_clip(
        asset_server.load(GltfAssetLabel::Animation(ANIM_JUMP_UP).from_asset(CHARACTER_PATH)),
        1.0,
        graph.root,
    );
    let jump_float = graph.add_clip(
        asset_server.load(GltfAssetLabel::Animation(ANIM_JUMP_FLOAT).from_asset(CHARACTER_PATH)),
        1.0,
        graph.root,
    );
    let jump_down = graph.add_clip(
        asset_server.load(GltfAssetLabel::Animation(ANIM_JUMP_DOWN).from_asset(CHARACTER_PATH)),
        1.0,
        graph.root,
    );

    commands.insert_resource(CharacterAnimations {
        graph: graphs.add(graph),
        idle,
        wave,
        jump_up,
        jump_float,
        jump_down,
    });
    commands.insert_resource(CharacterAssets {
        scene: asset_server.load(GltfAssetLabel::Scene(0).from_asset(CHARACTER_PATH)),
    });
    commands.insert_resource(CanvasArt {
        placeholder: asset_server.load(PLACEHOLDER_ART),
        result: asset_server.load(RESULT_ART),
    });
}

fn spawn_scene(
    mut commands: Commands,
    assets: Res<CharacterAssets>,
    art: Res<CanvasArt>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut registry: ResMut<AnchorRegistry>,
    viewer: Query<Entity, With<Viewer>>,
) {
    // Wall canvas on the detected vertical plane. The plane mesh faces +Y,
    // so a quarter turn about X points it back at the viewer.
    let wall_kind = AnchorKind::Plane {
        min_bounds: PLANE_MIN_BOUNDS,
    };
    debug!("spawning wall anchor: {}", wall_kind.describe());
    let wall = commands
        .spawn((
            wall_kind,
            Transform::from_translation(WALL_POSE).with_rotation(Quat::from_rotation_x(FRAC_PI_2)),
            Visibility::default(),
        ))
        .id();
    let canvas = commands
        .spawn((
            Name::new("canvas"),
            Mesh3d(meshes.add(Plane3d::default().mesh().size(CANVAS_SIZE.x, CANVAS_SIZE.y))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color_texture: Some(art.placeholder.clone()),
                ..default()
            })),
        ))
        .id();
    commands.entity(wall).add_child(canvas);
    registry.register(CANVAS, canvas);

    // Assistant, head-anchored: parented to the viewer camera.
    let Ok(camera) = viewer.single() else {
        warn!("no viewer camera, skipping the head-anchored assistant");
        return;
    };
    let character = commands
        .spawn((
            AnchorKind::Head,
            SceneRoot(assets.scene.clone()),
            Transform::from_translation(CHARACTER_OFFSET)
                .with_rotation(Quat::from_rotation_y(CHARACTER_YAW)),
        ))
        .observe(start_idle_animation)
        .id();
    commands.entity(camera).add_child(character);
    registry.register(CHARACTER, character);

    // The projectile rides along with the assistant until launched.
    let shuttle = commands
        .spawn((
            Projectile::default(),
            Mesh3d(meshes.add(Sphere::new(0.04))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgb(1.0, 0.8, 0.3),
                emissive: LinearRgba::rgb(4.0, 2.4, 0.6),
                ..default()
            })),
            Transform::from_translation(FLIGHT_START),
        ))
        .id();
    commands.entity(character).add_child(shuttle);
    for (name, burst_count, shape_size) in
        [("spark_trail", 500, 0.02), ("glow_trail", 120, 0.06)]
    {
        let emitter = commands
            .spawn((
                Name::new(name),
                ParticleEmitter {
                    emitting: false,
                    burst_count,
                    shape_size,
                },
                Transform::default(),
                Visibility::default(),
            ))
            .id();
        commands.entity(shuttle).add_child(emitter);
    }
    registry.register(PROJECTILE, shuttle);
}

fn start_idle_animation(
    trigger: On<SceneInstanceReady>,
    animations: Res<CharacterAnimations>,
    mut commands: Commands,
    children: Query<&Children>,
    mut players: Query<&mut AnimationPlayer>,
) {
    for child in children.iter_descendants(trigger.entity) {
        if let Ok(mut player) = players.get_mut(child) {
            player.play(animations.idle).repeat();
            commands
                .entity(child)
                .insert(AnimationGraphHandle(animations.graph.clone()));
            break;
        }
    }
}

/// Clips still queued on an in-progress one-shot; once the list drains the
/// rig returns to the idle loop.
#[derive(Component)]
pub struct OneShotChain(Vec<AnimationNodeIndex>);

/// Plays `clips` in order on the rig under `root`, then returns to idle.
/// Returns false when no animation player is reachable (scene not loaded),
/// which callers treat as a skippable sub-step.
pub fn play_one_shot(
    commands: &mut Commands,
    root: Entity,
    clips: &[AnimationNodeIndex],
    children: &Query<&Children>,
    players: &mut Query<&mut AnimationPlayer>,
) -> bool {
    let Some((&first, rest)) = clips.split_first() else {
        return false;
    };
    for child in children.iter_descendants(root) {
        if let Ok(mut player) = players.get_mut(child) {
            player.stop_all();
            player.play(first);
            commands.entity(child).insert(OneShotChain(rest.to_vec()));
            return true;
        }
    }
    false
}

fn advance_one_shots(
    mut commands: Commands,
    animations: Option<Res<CharacterAnimations>>,
    mut query: Query<(Entity, &mut AnimationPlayer, &mut OneShotChain)>,
) {
    let Some(animations) = animations else {
        return;
    };
    for (entity, mut player, mut chain) in &mut query {
        if !player.all_finished() {
            continue;
        }
        player.stop_all();
        if chain.0.is_empty() {
            player.play(animations.idle).repeat();
            commands.entity(entity).remove::<OneShotChain>();
        } else {
            let next = chain.0.remove(0);
            player.play(next);
        }
    }
}

/// The canvas cannot exist without its artwork: a failed required texture
/// aborts with a descriptive error.
fn watch_required_textures(asset_server: Res<AssetServer>, art: Option<Res<CanvasArt>>) {
    let Some(art) = art else {
        return;
    };
    for (label, handle) in [("placeholder", &art.placeholder), ("result", &art.result)] {
        if let Some(LoadState::Failed(err)) = asset_server.get_load_state(handle.id()) {
            panic!("required {label} canvas texture failed to load: {err}");
        }
    }
}

/// Scene loads are best-effort: without the assistant the experience runs
/// dialogue-only.
fn warn_failed_scene(
    asset_server: Res<AssetServer>,
    assets: Option<Res<CharacterAssets>>,
    mut warned: Local<bool>,
) {
    if *warned {
        return;
    }
    let Some(assets) = assets else {
        return;
    };
    if let Some(LoadState::Failed(err)) = asset_server.get_load_state(assets.scene.id()) {
        warn!("assistant scene failed to load, continuing without it: {err}");
        *warned = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_misses_return_none() {
        let registry = AnchorRegistry::default();
        assert!(registry.get(CHARACTER).is_none());
    }

    #[test]
    fn registry_returns_registered_entity() {
        let mut world = World::new();
        let entity = world.spawn_empty().id();
        let mut registry = AnchorRegistry::default();
        registry.register(CANVAS, entity);
        assert_eq!(registry.get(CANVAS), Some(entity));
    }

    #[test]
    fn reregistering_keeps_the_newer_entity() {
        let mut world = World::new();
        let old = world.spawn_empty().id();
        let new = world.spawn_empty().id();
        let mut registry = AnchorRegistry::default();
        registry.register(PROJECTILE, old);
        registry.register(PROJECTILE, new);
        assert_eq!(registry.get(PROJECTILE), Some(new));
    }
}
