// Projectile flight: carries the doodle from the assistant to the wall.
use bevy::prelude::*;

use crate::anchors::{AnchorRegistry, PROJECTILE};
use crate::flow::{FlowEpoch, FlowState};

pub struct ProjectilePlugin;

impl Plugin for ProjectilePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(FlowState::ProjectileFlying), begin_flight)
            .add_systems(OnExit(FlowState::ProjectileFlying), end_flight)
            .add_systems(
                Update,
                tick_flight.run_if(in_state(FlowState::ProjectileFlying)),
            );
    }
}

/// Launch pose, local to the character anchor.
pub const FLIGHT_START: Vec3 = Vec3::new(-0.25, 0.2, -0.1);
/// Offset to the wall canvas. A fixed approximation of the wall-relative
/// target, independent of where the anchors currently are.
const FLIGHT_OFFSET: Vec3 = Vec3::new(-0.7, 0.33, -1.6);
const FLIGHT_SCALE: f32 = 2.0;
pub const FLIGHT_DURATION: f32 = 3.0;

/// Burst bookkeeping consumed by the host particle system.
#[derive(Component, Default)]
pub struct Projectile {
    pub can_burst: bool,
    pub bursted: bool,
}

/// Control knobs for one particle sub-emitter; the simulation itself is the
/// host's concern.
#[derive(Component)]
pub struct ParticleEmitter {
    pub emitting: bool,
    pub burst_count: u32,
    pub shape_size: f32,
}

/// An in-progress flight. The eased interpolation is the single source of
/// truth for completion; the emitters switch off only when it lands.
#[derive(Component)]
pub struct Flight {
    from: Vec3,
    to: Vec3,
    elapsed: f32,
    duration: f32,
    epoch: u64,
}

/// Cubic ease-in-ease-out curve. `t` should be in `[0, 1]`.
pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

pub(crate) fn begin_flight(
    mut commands: Commands,
    epoch: Res<FlowEpoch>,
    registry: Res<AnchorRegistry>,
    mut projectiles: Query<&mut Transform, With<Projectile>>,
    children: Query<&Children>,
    mut emitters: Query<&mut ParticleEmitter>,
    mut next: ResMut<NextState<FlowState>>,
) {
    let Some(entity) = registry.get(PROJECTILE) else {
        warn!("no projectile registered, skipping straight to the reveal");
        next.set(FlowState::UpdateWallArt);
        return;
    };
    let Ok(mut transform) = projectiles.get_mut(entity) else {
        warn!("registered projectile has no transform, skipping the flight");
        next.set(FlowState::UpdateWallArt);
        return;
    };

    transform.translation = FLIGHT_START;
    set_emitters(entity, true, &children, &mut emitters);
    commands.entity(entity).insert(Flight {
        from: FLIGHT_START,
        to: FLIGHT_START + FLIGHT_OFFSET * FLIGHT_SCALE,
        elapsed: 0.0,
        duration: FLIGHT_DURATION,
        epoch: epoch.0,
    });
}

pub(crate) fn tick_flight(
    mut commands: Commands,
    time: Res<Time>,
    epoch: Res<FlowEpoch>,
    mut flights: Query<(Entity, &mut Transform, &mut Flight)>,
    children: Query<&Children>,
    mut emitters: Query<&mut ParticleEmitter>,
    mut next: ResMut<NextState<FlowState>>,
) {
    let Ok((entity, mut transform, mut flight)) = flights.single_mut() else {
        return;
    };
    if flight.epoch != epoch.0 {
        return;
    }

    flight.elapsed += time.delta_secs();
    let t = (flight.elapsed / flight.duration).min(1.0);
    transform.translation = flight.from.lerp(flight.to, ease_in_out_cubic(t));

    if t >= 1.0 {
        set_emitters(entity, false, &children, &mut emitters);
        commands.entity(entity).remove::<Flight>();
        next.set(FlowState::UpdateWallArt);
    }
}

/// A cancelled flight must not leave trails running.
fn end_flight(
    mut commands: Commands,
    flights: Query<Entity, With<Flight>>,
    projectiles: Query<Entity, With<Projectile>>,
    children: Query<&Children>,
    mut emitters: Query<&mut ParticleEmitter>,
) {
    for entity in &flights {
        commands.entity(entity).remove::<Flight>();
    }
    for entity in &projectiles {
        set_emitters(entity, false, &children, &mut emitters);
    }
}

fn set_emitters(
    root: Entity,
    emitting: bool,
    children: &Query<&Children>,
    emitters: &mut Query<&mut ParticleEmitter>,
) {
    for child in children.iter_descendants(root) {
        if let Ok(mut emitter) = emitters.get_mut(child) {
            emitter.emitting = emitting;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::state::app::StatesPlugin;

    use super::*;

    // ── ease_in_out_cubic ───────────────────────────────────────────

    #[test]
    fn ease_at_zero_is_zero() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
    }

    #[test]
    fn ease_at_one_is_one() {
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
    }

    #[test]
    fn ease_at_half_is_half() {
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn ease_is_monotonically_increasing() {
        let steps: Vec<f32> = (0..=100)
            .map(|i| ease_in_out_cubic(i as f32 / 100.0))
            .collect();
        for w in steps.windows(2) {
            assert!(w[1] >= w[0], "ease_in_out_cubic must be non-decreasing");
        }
    }

    // ── flight ──────────────────────────────────────────────────────

    fn flight_app() -> (App, Entity) {
        let mut app = App::new();
        app.add_plugins(StatesPlugin);
        app.init_state::<FlowState>();
        app.init_resource::<FlowEpoch>();
        app.init_resource::<Time>();
        app.init_resource::<AnchorRegistry>();
        app.add_systems(OnEnter(FlowState::ProjectileFlying), begin_flight);
        app.add_systems(
            Update,
            tick_flight.run_if(in_state(FlowState::ProjectileFlying)),
        );

        let shuttle = app
            .world_mut()
            .spawn((Projectile::default(), Transform::default()))
            .id();
        for _ in 0..2 {
            let emitter = app
                .world_mut()
                .spawn(ParticleEmitter {
                    emitting: false,
                    burst_count: 100,
                    shape_size: 0.03,
                })
                .id();
            app.world_mut().entity_mut(shuttle).add_child(emitter);
        }
        app.world_mut()
            .resource_mut::<AnchorRegistry>()
            .register(PROJECTILE, shuttle);
        (app, shuttle)
    }

    fn emitter_states(app: &mut App) -> Vec<bool> {
        let mut emitters = app.world_mut().query::<&ParticleEmitter>();
        emitters.iter(app.world()).map(|e| e.emitting).collect()
    }

    #[test]
    fn emitters_on_at_launch_and_off_at_landing() {
        let (mut app, shuttle) = flight_app();
        app.world_mut()
            .resource_mut::<NextState<FlowState>>()
            .set(FlowState::ProjectileFlying);
        app.update();
        app.update();

        // Launch frames, no time elapsed: at the start pose, trails on.
        assert_eq!(emitter_states(&mut app), vec![true, true]);
        let start = app.world().entity(shuttle).get::<Transform>().unwrap();
        assert_eq!(start.translation, FLIGHT_START);

        // Midway: moved, still emitting.
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(1.5));
        app.update();
        let mid = app
            .world()
            .entity(shuttle)
            .get::<Transform>()
            .unwrap()
            .translation;
        let dest = FLIGHT_START + FLIGHT_OFFSET * FLIGHT_SCALE;
        assert!(mid.distance(FLIGHT_START) > 0.01);
        assert!(mid.distance(dest) > 0.01);
        assert_eq!(emitter_states(&mut app), vec![true, true]);

        // Landed: at the destination, trails off, flight done.
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(1.6));
        app.update();
        let landed = app
            .world()
            .entity(shuttle)
            .get::<Transform>()
            .unwrap()
            .translation;
        assert!(landed.distance(dest) < 1e-4);
        assert_eq!(emitter_states(&mut app), vec![false, false]);
        assert!(app.world().entity(shuttle).get::<Flight>().is_none());

        app.update();
        assert_eq!(
            *app.world().resource::<State<FlowState>>().get(),
            FlowState::UpdateWallArt
        );
    }

    #[test]
    fn missing_projectile_degrades_to_the_reveal() {
        let mut app = App::new();
        app.add_plugins(StatesPlugin);
        app.init_state::<FlowState>();
        app.init_resource::<FlowEpoch>();
        app.init_resource::<Time>();
        app.init_resource::<AnchorRegistry>();
        app.add_systems(OnEnter(FlowState::ProjectileFlying), begin_flight);

        app.world_mut()
            .resource_mut::<NextState<FlowState>>()
            .set(FlowState::ProjectileFlying);
        app.update();
        app.update();
        app.update();
        assert_eq!(
            *app.world().resource::<State<FlowState>>().get(),
            FlowState::UpdateWallArt
        );
    }

    #[test]
    fn stale_flight_does_not_move() {
        let mut app = App::new();
        app.add_plugins(StatesPlugin);
        app.insert_state(FlowState::ProjectileFlying);
        app.init_resource::<FlowEpoch>();
        app.init_resource::<Time>();
        app.add_systems(
            Update,
            tick_flight.run_if(in_state(FlowState::ProjectileFlying)),
        );

        let shuttle = app
            .world_mut()
            .spawn((
                Projectile::default(),
                Transform::from_translation(FLIGHT_START),
                Flight {
                    from: FLIGHT_START,
                    to: FLIGHT_START + FLIGHT_OFFSET * FLIGHT_SCALE,
                    elapsed: 0.0,
                    duration: FLIGHT_DURATION,
                    epoch: 7,
                },
            ))
            .id();

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(1.0));
        app.update();

        let transform = app.world().entity(shuttle).get::<Transform>().unwrap();
        assert_eq!(transform.translation, FLIGHT_START);
    }
}
