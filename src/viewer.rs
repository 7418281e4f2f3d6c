// First-person viewer standing in for the AR head pose. Head-anchored
// content is parented to this camera, so looking around carries it along.
use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;

pub struct ViewerPlugin;

impl Plugin for ViewerPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(PASSTHROUGH_GREY))
            .add_systems(Startup, spawn_viewer)
            .add_systems(Update, mouse_look);
    }
}

/// Stand-in for the camera passthrough of the real room.
const PASSTHROUGH_GREY: Color = Color::srgb(0.82, 0.82, 0.84);
const EYE_HEIGHT: f32 = 1.5;
const MOUSE_SENSITIVITY: f32 = 0.003;
const MAX_PITCH: f32 = 1.3;

#[derive(Component)]
pub struct Viewer;

/// Tracks yaw and pitch for composed look rotation.
#[derive(Component)]
pub struct ViewerLook {
    pub yaw: f32,
    pub pitch: f32,
}

pub fn spawn_viewer(mut commands: Commands) {
    commands.spawn((
        Viewer,
        ViewerLook {
            yaw: 0.0,
            pitch: 0.0,
        },
        Camera3d::default(),
        IsDefaultUiCamera,
        Projection::from(PerspectiveProjection {
            fov: std::f32::consts::FRAC_PI_2 * 0.8,
            near: 0.01,
            ..default()
        }),
        Transform::from_xyz(0.0, EYE_HEIGHT, 0.0),
    ));

    // Room lighting stand-ins.
    commands.spawn((
        DirectionalLight {
            illuminance: 10_000.0,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -1.0, 0.5, 0.0)),
    ));
    commands.insert_resource(GlobalAmbientLight {
        color: Color::srgb(1.0, 0.98, 0.95),
        brightness: 120.0,
        affects_lightmapped_meshes: false,
    });
}

/// Hold the right mouse button to look around, simulating head movement.
fn mouse_look(
    mouse: Res<ButtonInput<MouseButton>>,
    mut motion: MessageReader<MouseMotion>,
    mut query: Query<(&mut Transform, &mut ViewerLook), With<Viewer>>,
) {
    if !mouse.pressed(MouseButton::Right) {
        motion.clear();
        return;
    }

    let mut delta = Vec2::ZERO;
    for ev in motion.read() {
        delta += ev.delta;
    }
    if delta == Vec2::ZERO {
        return;
    }

    let Ok((mut transform, mut look)) = query.single_mut() else {
        return;
    };
    look.yaw -= delta.x * MOUSE_SENSITIVITY;
    look.pitch = (look.pitch - delta.y * MOUSE_SENSITIVITY).clamp(-MAX_PITCH, MAX_PITCH);
    transform.rotation = Quat::from_rotation_y(look.yaw) * Quat::from_rotation_x(look.pitch);
}
