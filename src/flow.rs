/// Experience flow states and shared sequencing state.
use bevy::prelude::*;
use strum::Display;

use crate::doodle::DrawingFinished;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States, Display)]
pub enum FlowState {
    #[default]
    Idle,
    Intro,
    ProjectileFlying,
    UpdateWallArt,
}

/// Counter bumped on every flow transition. A stage sequence captures the
/// value when it starts and compares it on every tick, so a superseded
/// sequence can never mutate state after a newer transition. The policy for
/// overlapping triggers is cancel-and-restart.
#[derive(Resource, Default)]
pub struct FlowEpoch(pub u64);

pub struct FlowPlugin;

impl Plugin for FlowPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnExit(FlowState::Idle), bump_epoch)
            .add_systems(OnExit(FlowState::Intro), bump_epoch)
            .add_systems(OnExit(FlowState::ProjectileFlying), bump_epoch)
            .add_systems(OnExit(FlowState::UpdateWallArt), bump_epoch)
            .add_systems(OnEnter(FlowState::Idle), announce_state)
            .add_systems(OnEnter(FlowState::Intro), announce_state)
            .add_systems(OnEnter(FlowState::ProjectileFlying), announce_state)
            .add_systems(OnEnter(FlowState::UpdateWallArt), announce_state)
            .add_systems(
                Update,
                advance_after_drawing.run_if(in_state(FlowState::Intro)),
            );
    }
}

fn bump_epoch(mut epoch: ResMut<FlowEpoch>) {
    epoch.0 += 1;
}

fn announce_state(state: Res<State<FlowState>>) {
    info!("flow -> {}", state.get());
}

/// The doodle canvas's only coupling to the flow: its done signal launches
/// the projectile.
pub(crate) fn advance_after_drawing(
    mut finished: MessageReader<DrawingFinished>,
    mut next: ResMut<NextState<FlowState>>,
) {
    for _ in finished.read() {
        next.set(FlowState::ProjectileFlying);
    }
}
