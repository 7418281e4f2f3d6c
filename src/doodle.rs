// Doodle canvas overlay: captures a freehand sketch for display. Its only
// coupling to the rest of the experience is the done signal.
use bevy::prelude::*;

use crate::flow::FlowState;
use crate::ui;

pub struct DoodlePlugin;

impl Plugin for DoodlePlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<DrawingFinished>().add_systems(
            Update,
            (
                capture_stroke,
                draw_strokes,
                ui::button_visuals::<DoneButton>,
                done_button,
            )
                .run_if(resource_exists::<DoodleSession>),
        );
    }
}

/// Fraction of the window covered by the drawing area. Matches the percent
/// sizing of the overlay node.
const AREA_FRACTION: Vec2 = Vec2::new(0.55, 0.6);
/// Minimum cursor travel before another point is recorded.
const MIN_SEGMENT: f32 = 2.0;

/// Sent once when the user presses Done.
#[derive(Message)]
pub struct DrawingFinished;

/// Present while the canvas overlay is open.
#[derive(Resource)]
pub struct DoodleSession;

/// Captured stroke polylines in overlay space. Display-only: the sketch is
/// never forwarded to the orchestrator.
#[derive(Resource, Default)]
pub struct Doodle {
    strokes: Vec<Vec<Vec2>>,
    drawing: bool,
}

#[derive(Component)]
struct DoodleOverlay;

#[derive(Component)]
struct DoodleCamera;

#[derive(Component)]
struct DoneButton;

/// Opens the drawing surface: a dimmed overlay with a rounded canvas, a
/// Done button, and a 2D camera for the stroke lines.
pub fn open_canvas(commands: &mut Commands) {
    commands.insert_resource(DoodleSession);
    commands.insert_resource(Doodle::default());

    commands.spawn((
        DoodleCamera,
        Camera2d,
        Camera {
            order: 1,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        DespawnOnExit(FlowState::Intro),
    ));

    commands
        .spawn((
            DoodleOverlay,
            DespawnOnExit(FlowState::Intro),
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                row_gap: Val::Px(16.0),
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.35)),
            GlobalZIndex(80),
        ))
        .with_children(|parent| {
            parent.spawn((
                Node {
                    width: Val::Percent(AREA_FRACTION.x * 100.0),
                    height: Val::Percent(AREA_FRACTION.y * 100.0),
                    ..default()
                },
                BackgroundColor(Color::srgba(0.93, 0.93, 0.93, 0.92)),
                BorderRadius::all(Val::Px(15.0)),
            ));
            ui::spawn_text_button(parent, "Done", DoneButton);
        });
}

/// Converts a window cursor position (top-left origin) into the centered
/// coordinates the 2D overlay camera uses.
fn to_overlay_space(cursor: Vec2, window_size: Vec2) -> Vec2 {
    Vec2::new(
        cursor.x - window_size.x / 2.0,
        window_size.y / 2.0 - cursor.y,
    )
}

fn in_drawing_area(point: Vec2, window_size: Vec2) -> bool {
    let half_area = window_size * AREA_FRACTION / 2.0;
    point.x.abs() <= half_area.x && point.y.abs() <= half_area.y
}

fn capture_stroke(
    mouse: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window>,
    mut doodle: ResMut<Doodle>,
) {
    if mouse.just_released(MouseButton::Left) {
        doodle.drawing = false;
    }
    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };

    let point = to_overlay_space(cursor, window.size());
    let inside = in_drawing_area(point, window.size());

    if mouse.just_pressed(MouseButton::Left) && inside {
        doodle.strokes.push(vec![point]);
        doodle.drawing = true;
    } else if mouse.pressed(MouseButton::Left) && doodle.drawing && inside {
        if let Some(stroke) = doodle.strokes.last_mut() {
            if stroke
                .last()
                .is_none_or(|last| last.distance(point) >= MIN_SEGMENT)
            {
                stroke.push(point);
            }
        }
    }
}

fn draw_strokes(doodle: Res<Doodle>, mut gizmos: Gizmos) {
    for stroke in &doodle.strokes {
        gizmos.linestrip_2d(stroke.iter().copied(), Color::BLACK);
    }
}

fn done_button(
    mut commands: Commands,
    query: Query<&Interaction, (Changed<Interaction>, With<DoneButton>)>,
    overlays: Query<Entity, With<DoodleOverlay>>,
    cameras: Query<Entity, With<DoodleCamera>>,
    mut finished: MessageWriter<DrawingFinished>,
) {
    for interaction in &query {
        if *interaction != Interaction::Pressed {
            continue;
        }
        for entity in overlays.iter().chain(cameras.iter()) {
            commands.entity(entity).despawn();
        }
        commands.remove_resource::<DoodleSession>();
        finished.write(DrawingFinished);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Vec2 = Vec2::new(1280.0, 720.0);

    #[test]
    fn cursor_center_maps_to_origin() {
        let point = to_overlay_space(WINDOW / 2.0, WINDOW);
        assert_eq!(point, Vec2::ZERO);
    }

    #[test]
    fn cursor_top_left_maps_up_and_left() {
        let point = to_overlay_space(Vec2::ZERO, WINDOW);
        assert_eq!(point, Vec2::new(-640.0, 360.0));
    }

    #[test]
    fn area_bounds_are_respected() {
        assert!(in_drawing_area(Vec2::ZERO, WINDOW));
        // Just inside the 55% x 60% area.
        assert!(in_drawing_area(Vec2::new(351.0, 215.0), WINDOW));
        // Outside horizontally.
        assert!(!in_drawing_area(Vec2::new(353.0, 0.0), WINDOW));
        // Outside vertically.
        assert!(!in_drawing_area(Vec2::new(0.0, 217.0), WINDOW));
    }
}
