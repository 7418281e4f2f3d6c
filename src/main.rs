// Main
mod anchors;
mod dialogue;
mod doodle;
mod flow;
mod intro;
mod projectile;
mod ui;
mod viewer;
mod wall_art;

use anchors::AnchorsPlugin;
use bevy::prelude::*;
use dialogue::DialoguePlugin;
use doodle::DoodlePlugin;
use flow::{FlowEpoch, FlowPlugin, FlowState};
use intro::IntroPlugin;
use projectile::ProjectilePlugin;
use viewer::ViewerPlugin;
use wall_art::WallArtPlugin;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Doodlewall".into(),
                ..default()
            }),
            ..default()
        }))
        .init_state::<FlowState>()
        .init_resource::<FlowEpoch>()
        .add_plugins((
            FlowPlugin,
            ViewerPlugin,
            AnchorsPlugin,
            DialoguePlugin,
            IntroPlugin,
            DoodlePlugin,
            ProjectilePlugin,
            WallArtPlugin,
        ))
        .run();
}
