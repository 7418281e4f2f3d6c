// Intro stage: the assistant greets the user and invites a doodle.
use bevy::prelude::*;

use crate::anchors::{AnchorRegistry, CHARACTER, CharacterAnimations, play_one_shot};
use crate::dialogue::{DialogueBuffer, DialoguePanel, Typewriter, spawn_panel, start_line};
use crate::doodle::open_canvas;
use crate::flow::{FlowEpoch, FlowState};
use crate::ui;

pub struct IntroPlugin;

impl Plugin for IntroPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ConfirmAccepted>()
            .add_systems(Update, await_tap.run_if(in_state(FlowState::Idle)))
            .add_systems(OnEnter(FlowState::Intro), begin_intro)
            .add_systems(OnExit(FlowState::Intro), end_intro)
            .add_systems(
                Update,
                (
                    confirm_buttons,
                    ui::button_visuals::<ConfirmButton>,
                    tick_intro,
                )
                    .run_if(in_state(FlowState::Intro)),
            );
    }
}

const GREETING: &str = "Hey there! Want to put some fresh art on that wall?";
const DRAW_PROMPT: &str = "Sketch me a doodle and I will take care of the rest.";

/// Sent when the user accepts the assistant's offer. One press is enough;
/// extra presses before or after the wait unblock nothing further.
#[derive(Message)]
pub struct ConfirmAccepted;

/// Ordered intro steps, ticked once per frame. Each variant waits for its
/// own completion signal before handing over to the next.
#[derive(Resource)]
pub struct IntroSequence {
    phase: IntroPhase,
    epoch: u64,
}

#[derive(Clone, Copy, PartialEq)]
enum IntroPhase {
    Greet,
    TypeGreeting,
    AwaitConfirm,
    Done,
}

#[derive(Component)]
struct ConfirmControls;

#[derive(Component)]
enum ConfirmButton {
    Yes,
    No,
}

/// A tap anywhere in the scene wakes the assistant.
pub(crate) fn await_tap(
    mouse: Res<ButtonInput<MouseButton>>,
    mut next: ResMut<NextState<FlowState>>,
) {
    if mouse.just_pressed(MouseButton::Left) {
        next.set(FlowState::Intro);
    }
}

fn begin_intro(
    mut commands: Commands,
    epoch: Res<FlowEpoch>,
    mut panel: Query<&mut Visibility, With<DialoguePanel>>,
) {
    commands.insert_resource(IntroSequence {
        phase: IntroPhase::Greet,
        epoch: epoch.0,
    });
    // Reveal the dialogue panel, spawning it on the first run.
    if let Ok(mut visibility) = panel.single_mut() {
        *visibility = Visibility::Inherited;
    } else {
        spawn_panel(&mut commands);
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn tick_intro(
    mut commands: Commands,
    epoch: Res<FlowEpoch>,
    sequence: Option<ResMut<IntroSequence>>,
    typewriter: Option<Res<Typewriter>>,
    mut buffer: ResMut<DialogueBuffer>,
    mut accepted: MessageReader<ConfirmAccepted>,
    registry: Res<AnchorRegistry>,
    animations: Option<Res<CharacterAnimations>>,
    children: Query<&Children>,
    mut players: Query<&mut AnimationPlayer>,
    controls: Query<Entity, With<ConfirmControls>>,
) {
    let Some(mut sequence) = sequence else {
        return;
    };
    if sequence.epoch != epoch.0 {
        return;
    }

    match sequence.phase {
        IntroPhase::Greet => {
            let waved = match (registry.get(CHARACTER), animations.as_deref()) {
                (Some(character), Some(animations)) => play_one_shot(
                    &mut commands,
                    character,
                    &[animations.wave],
                    &children,
                    &mut players,
                ),
                _ => false,
            };
            if !waved {
                debug!("assistant unavailable, skipping the wave");
            }
            start_line(&mut commands, &mut buffer, GREETING);
            sequence.phase = IntroPhase::TypeGreeting;
        }
        IntroPhase::TypeGreeting => {
            // Block until the greeting is fully revealed.
            if typewriter.is_none() {
                spawn_confirm_controls(&mut commands);
                sequence.phase = IntroPhase::AwaitConfirm;
            }
        }
        IntroPhase::AwaitConfirm => {
            if accepted.read().next().is_some() {
                for entity in &controls {
                    commands.entity(entity).despawn();
                }
                // The prompt types on while the canvas opens; neither waits
                // for the other.
                start_line(&mut commands, &mut buffer, DRAW_PROMPT);
                open_canvas(&mut commands);
                sequence.phase = IntroPhase::Done;
            }
        }
        IntroPhase::Done => {}
    }
}

fn spawn_confirm_controls(commands: &mut Commands) {
    commands
        .spawn((
            ConfirmControls,
            DespawnOnExit(FlowState::Intro),
            Node {
                width: Val::Percent(100.0),
                position_type: PositionType::Absolute,
                bottom: Val::Px(120.0),
                justify_content: JustifyContent::Center,
                column_gap: Val::Px(16.0),
                ..default()
            },
            GlobalZIndex(60),
        ))
        .with_children(|parent| {
            ui::spawn_text_button(parent, "Yes", ConfirmButton::Yes);
            ui::spawn_text_button(parent, "No", ConfirmButton::No);
        });
}

fn confirm_buttons(
    query: Query<(&Interaction, &ConfirmButton), Changed<Interaction>>,
    mut accepted: MessageWriter<ConfirmAccepted>,
    mut next: ResMut<NextState<FlowState>>,
) {
    for (interaction, button) in &query {
        if *interaction != Interaction::Pressed {
            continue;
        }
        match button {
            ConfirmButton::Yes => {
                accepted.write(ConfirmAccepted);
            }
            ConfirmButton::No => {
                next.set(FlowState::Idle);
            }
        }
    }
}

fn end_intro(mut commands: Commands) {
    commands.remove_resource::<IntroSequence>();
}
