// Wall-art reveal: the doodle lands, the canvas swaps to the finished
// artwork, and the assistant celebrates.
use bevy::prelude::*;

use crate::anchors::{
    AnchorRegistry, CANVAS, CHARACTER, CanvasArt, CharacterAnimations, PROJECTILE, play_one_shot,
};
use crate::dialogue::{DialogueBuffer, Typewriter, start_line};
use crate::flow::{FlowEpoch, FlowState};
use crate::projectile::{ParticleEmitter, Projectile};

pub struct WallArtPlugin;

impl Plugin for WallArtPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(FlowState::UpdateWallArt),
            (reset_projectile, hang_result_art, begin_reveal),
        )
        .add_systems(OnExit(FlowState::UpdateWallArt), end_reveal)
        .add_systems(
            Update,
            (tick_reveal, impact_burst, restart_on_tap)
                .run_if(in_state(FlowState::UpdateWallArt)),
        );
    }
}

/// Pause between the landing and the assistant's jump.
const JUMP_DELAY: f32 = 0.5;
/// Pause between the two closing lines.
const LINE_GAP: f32 = 1.0;

const REVEAL_LINE: &str = "Ta-da! Your doodle is hanging on the wall.";
const AGAIN_LINE: &str = "Tap anywhere and we can make another one.";

/// Ordered reveal steps after the projectile lands.
#[derive(Resource)]
pub struct RevealSequence {
    phase: RevealPhase,
    timer: f32,
    epoch: u64,
}

impl RevealSequence {
    fn finished(&self) -> bool {
        self.phase == RevealPhase::Done
    }

    fn past_jump_delay(&self) -> bool {
        self.phase != RevealPhase::JumpDelay
    }
}

#[derive(Clone, Copy, PartialEq)]
enum RevealPhase {
    JumpDelay,
    TypeReveal,
    LineGap,
    TypeAgain,
    Done,
}

pub(crate) fn reset_projectile(mut projectiles: Query<&mut Projectile>) {
    for mut projectile in &mut projectiles {
        projectile.can_burst = true;
        projectile.bursted = false;
    }
}

/// Swaps the canvas material to the pre-selected result artwork, standing in
/// for externally generated imagery.
fn hang_result_art(
    registry: Res<AnchorRegistry>,
    art: Res<CanvasArt>,
    canvas: Query<&MeshMaterial3d<StandardMaterial>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some(entity) = registry.get(CANVAS) else {
        warn!("no canvas registered, the artwork has nowhere to hang");
        return;
    };
    let Ok(material) = canvas.get(entity) else {
        return;
    };
    let Some(material) = materials.get_mut(&material.0) else {
        return;
    };
    material.base_color_texture = Some(art.result.clone());
}

fn begin_reveal(mut commands: Commands, epoch: Res<FlowEpoch>) {
    commands.insert_resource(RevealSequence {
        phase: RevealPhase::JumpDelay,
        timer: 0.0,
        epoch: epoch.0,
    });
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn tick_reveal(
    mut commands: Commands,
    time: Res<Time>,
    epoch: Res<FlowEpoch>,
    sequence: Option<ResMut<RevealSequence>>,
    typewriter: Option<Res<Typewriter>>,
    mut buffer: ResMut<DialogueBuffer>,
    registry: Res<AnchorRegistry>,
    animations: Option<Res<CharacterAnimations>>,
    children: Query<&Children>,
    mut players: Query<&mut AnimationPlayer>,
) {
    let Some(mut sequence) = sequence else {
        return;
    };
    if sequence.epoch != epoch.0 {
        return;
    }

    match sequence.phase {
        RevealPhase::JumpDelay => {
            sequence.timer += time.delta_secs();
            if sequence.timer < JUMP_DELAY {
                return;
            }
            let jumped = match (registry.get(CHARACTER), animations.as_deref()) {
                (Some(character), Some(animations)) => play_one_shot(
                    &mut commands,
                    character,
                    &[animations.jump_up, animations.jump_float, animations.jump_down],
                    &children,
                    &mut players,
                ),
                _ => false,
            };
            if !jumped {
                debug!("assistant unavailable, skipping the jump");
            }
            start_line(&mut commands, &mut buffer, REVEAL_LINE);
            sequence.phase = RevealPhase::TypeReveal;
        }
        RevealPhase::TypeReveal => {
            if typewriter.is_none() {
                sequence.timer = 0.0;
                sequence.phase = RevealPhase::LineGap;
            }
        }
        RevealPhase::LineGap => {
            sequence.timer += time.delta_secs();
            if sequence.timer >= LINE_GAP {
                start_line(&mut commands, &mut buffer, AGAIN_LINE);
                sequence.phase = RevealPhase::TypeAgain;
            }
        }
        RevealPhase::TypeAgain => {
            if typewriter.is_none() {
                sequence.phase = RevealPhase::Done;
            }
        }
        RevealPhase::Done => {}
    }
}

/// The host particle system bursts on impact; this marks the burst consumed
/// once the reveal is underway.
pub(crate) fn impact_burst(
    sequence: Option<Res<RevealSequence>>,
    registry: Res<AnchorRegistry>,
    children: Query<&Children>,
    mut projectiles: Query<&mut Projectile>,
    emitters: Query<&ParticleEmitter>,
) {
    let Some(sequence) = sequence else {
        return;
    };
    if !sequence.past_jump_delay() {
        return;
    }
    let Some(entity) = registry.get(PROJECTILE) else {
        return;
    };
    let Ok(mut projectile) = projectiles.get_mut(entity) else {
        return;
    };
    if !projectile.can_burst || projectile.bursted {
        return;
    }
    projectile.bursted = true;
    for child in children.iter_descendants(entity) {
        if let Ok(emitter) = emitters.get(child) {
            debug!(
                "impact burst: {} particles at shape size {}",
                emitter.burst_count, emitter.shape_size
            );
        }
    }
}

/// Once the reveal has played out, a tap hangs the art and starts over.
fn restart_on_tap(
    mouse: Res<ButtonInput<MouseButton>>,
    sequence: Option<Res<RevealSequence>>,
    mut next: ResMut<NextState<FlowState>>,
) {
    let Some(sequence) = sequence else {
        return;
    };
    if sequence.finished() && mouse.just_pressed(MouseButton::Left) {
        next.set(FlowState::Idle);
    }
}

fn end_reveal(mut commands: Commands) {
    commands.remove_resource::<RevealSequence>();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::state::app::StatesPlugin;

    use super::*;

    fn reveal_app() -> App {
        let mut app = App::new();
        app.add_plugins(StatesPlugin);
        app.insert_state(FlowState::UpdateWallArt);
        app.init_resource::<FlowEpoch>();
        app.init_resource::<Time>();
        app.init_resource::<AnchorRegistry>();
        app.init_resource::<DialogueBuffer>();
        app.add_systems(
            OnEnter(FlowState::UpdateWallArt),
            (reset_projectile, begin_reveal),
        );
        app.add_systems(
            Update,
            (crate::dialogue::tick_typewriter, tick_reveal, impact_burst)
                .chain()
                .run_if(in_state(FlowState::UpdateWallArt)),
        );
        app
    }

    fn run_until_done(app: &mut App) {
        for _ in 0..128 {
            if app
                .world()
                .get_resource::<RevealSequence>()
                .is_some_and(RevealSequence::finished)
            {
                return;
            }
            app.world_mut()
                .resource_mut::<Time>()
                .advance_by(Duration::from_secs_f32(0.2));
            app.update();
        }
        panic!("reveal sequence never finished");
    }

    #[test]
    fn reveal_types_both_closing_lines_in_order() {
        let mut app = reveal_app();
        app.update();

        // Still inside the jump delay: nothing typed yet.
        assert!(app.world().get_resource::<Typewriter>().is_none());

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(0.6));
        app.update();
        assert!(app.world().get_resource::<Typewriter>().is_some());

        run_until_done(&mut app);
        assert_eq!(
            app.world().resource::<DialogueBuffer>().0.trim_end(),
            AGAIN_LINE
        );
    }

    #[test]
    fn burst_flags_reset_then_consume_after_the_delay() {
        let mut app = reveal_app();
        let shuttle = app
            .world_mut()
            .spawn((
                Projectile {
                    can_burst: false,
                    bursted: true,
                },
                Transform::default(),
            ))
            .id();
        app.world_mut()
            .resource_mut::<AnchorRegistry>()
            .register(PROJECTILE, shuttle);

        app.update();
        // Entry resets the flags and the delay holds the burst back.
        let flags = app.world().entity(shuttle).get::<Projectile>().unwrap();
        assert!(flags.can_burst);
        assert!(!flags.bursted);

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(0.6));
        app.update();
        let flags = app.world().entity(shuttle).get::<Projectile>().unwrap();
        assert!(flags.bursted);
    }
}
