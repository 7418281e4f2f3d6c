// Typed subtitle dialogue: a buffer revealed word by word.
use bevy::prelude::*;
use rand::Rng;

use crate::flow::FlowState;

pub struct DialoguePlugin;

impl Plugin for DialoguePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DialogueBuffer>()
            .add_systems(OnEnter(FlowState::Idle), reset_dialogue)
            .add_systems(Update, (tick_typewriter, sync_panel_text).chain());
    }
}

/// Pause after each word, drawn uniformly from this two-valued set.
const WORD_DELAYS: [f32; 2] = [0.1, 0.2];

/// The currently displayed partial line. Cleared whenever a new line starts.
#[derive(Resource, Default)]
pub struct DialogueBuffer(pub String);

/// Reveals one line into the [`DialogueBuffer`], one word per tick. Removes
/// itself after the last word; starting a new line replaces the resource,
/// silently abandoning whatever the previous line had left.
#[derive(Resource)]
pub struct Typewriter {
    words: Vec<String>,
    next: usize,
    delay: f32,
}

impl Typewriter {
    pub fn new(line: &str) -> Self {
        Self {
            words: line.split_whitespace().map(String::from).collect(),
            next: 0,
            delay: 0.0,
        }
    }

    /// Appends the next word plus a trailing space. Returns false once no
    /// words remain after this one.
    pub fn append_next(&mut self, buffer: &mut String) -> bool {
        if self.next >= self.words.len() {
            return false;
        }
        buffer.push_str(&self.words[self.next]);
        buffer.push(' ');
        self.next += 1;
        self.next < self.words.len()
    }

    pub fn finished(&self) -> bool {
        self.next >= self.words.len()
    }
}

/// Clears the buffer and begins typing `line`.
pub fn start_line(commands: &mut Commands, buffer: &mut DialogueBuffer, line: &str) {
    buffer.0.clear();
    commands.insert_resource(Typewriter::new(line));
}

pub(crate) fn tick_typewriter(
    mut commands: Commands,
    time: Res<Time>,
    typewriter: Option<ResMut<Typewriter>>,
    mut buffer: ResMut<DialogueBuffer>,
) {
    let Some(mut typewriter) = typewriter else {
        return;
    };
    typewriter.delay -= time.delta_secs();
    if typewriter.delay > 0.0 {
        return;
    }
    if typewriter.append_next(&mut buffer.0) {
        let mut rng = rand::rng();
        typewriter.delay = WORD_DELAYS[rng.random_range(0..WORD_DELAYS.len())];
    } else {
        commands.remove_resource::<Typewriter>();
    }
}

#[derive(Component)]
pub struct DialoguePanel;

#[derive(Component)]
struct DialogueText;

/// Subtitle panel pinned to the bottom of the view, standing in for an
/// attachment floating next to the assistant.
pub fn spawn_panel(commands: &mut Commands) {
    commands
        .spawn((
            DialoguePanel,
            Node {
                width: Val::Percent(100.0),
                position_type: PositionType::Absolute,
                bottom: Val::Px(48.0),
                justify_content: JustifyContent::Center,
                ..default()
            },
            GlobalZIndex(50),
        ))
        .with_children(|parent| {
            parent
                .spawn((
                    Node {
                        padding: UiRect::axes(Val::Px(24.0), Val::Px(12.0)),
                        max_width: Val::Percent(70.0),
                        ..default()
                    },
                    BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
                    BorderRadius::all(Val::Px(12.0)),
                ))
                .with_children(|bubble| {
                    bubble.spawn((
                        DialogueText,
                        Text::new(""),
                        TextFont {
                            font_size: 24.0,
                            ..default()
                        },
                        TextColor(Color::WHITE),
                    ));
                });
        });
}

fn sync_panel_text(
    buffer: Res<DialogueBuffer>,
    mut texts: Query<&mut Text, With<DialogueText>>,
) {
    if !buffer.is_changed() {
        return;
    }
    let Ok(mut text) = texts.single_mut() else {
        return;
    };
    **text = buffer.0.clone();
}

fn reset_dialogue(
    mut commands: Commands,
    mut buffer: ResMut<DialogueBuffer>,
    mut panel: Query<&mut Visibility, With<DialoguePanel>>,
) {
    buffer.0.clear();
    commands.remove_resource::<Typewriter>();
    if let Ok(mut visibility) = panel.single_mut() {
        *visibility = Visibility::Hidden;
    }
}
