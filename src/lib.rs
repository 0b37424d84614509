//! An input and UI-navigation engine built as a Bevy plugin: raw device
//! polling, an action-binding layer, HID mode arbitration between pointer
//! and controller, cursor collision/hover/click/drag handling, and an
//! explicit named group/layer navigation manager for directional
//! (keyboard/gamepad) focus movement.
//!
//! Add [`InputNavigationPlugin`] (or [`DefaultInputNavigationPlugins`] if
//! you also want the bundled keyboard/gamepad directional wiring) to your
//! app and drive everything else through the resources in [`prelude`]:
//! [`nav::NavManager`] for groups/layers, [`actions::ActionBindings`] for
//! named action bindings, [`cursor::CursorState`] for the logical cursor,
//! and [`hid::HidState`] for the active input mode.
#![warn(missing_docs)]

pub mod actions;
pub mod cursor;
pub mod cursor_events;
pub mod devices;
pub mod error;
pub mod events;
pub mod focus_legacy;
pub mod gameobject;
pub mod hid;
pub mod locks;
pub mod nav;
pub mod scroll;
pub mod settings;
pub mod text_input;

use bevy::app::PluginGroupBuilder;
use bevy::prelude::*;

use crate::actions::ActionBindings;
use crate::cursor::CursorState;
use crate::devices::{AxisButtonState, ButtonRepeatState};
use crate::gameobject::{CursorEntity, WorldContainer};
use crate::hid::HidState;
use crate::locks::LockState;
use crate::settings::{InputSettings, NavInputBindings, NavigationSettings};

/// Default imports for consuming this crate.
pub mod prelude {
    pub use crate::actions::{ActionBinding, ActionBindings, ActionTrigger, InputDevice};
    pub use crate::cursor::CursorState;
    pub use crate::error::InputError;
    pub use crate::events::{
        CursorVisibilityChanged, GamepadButtonPressed, GamepadButtonReleased, MouseButtonKind, MouseClicked,
        SpritePackChanged, UiButtonActivated, UiElementFocused,
    };
    pub use crate::gameobject::{Bounds2d, Interactable, InteractionCallbacks, TextInput};
    pub use crate::hid::{ConsoleKind, HidState, InputCategory};
    pub use crate::locks::LockState;
    pub use crate::nav::{DirectionalLinks, GroupMode, NavCallbacks, NavDirection, NavManager, Neighbors, RepeatConfig};
    pub use crate::scroll::{PaneParentRef, ScrollPane};
    pub use crate::settings::{InputSettings, NavInputBindings, NavigationSettings};
    pub use crate::{DefaultInputNavigationPlugins, InputNavigationPlugin};
}

/// Spawns the engine's two fixed entities: the dedicated cursor entity whose
/// [`Transform`] tracks [`CursorState::cursor_position`], and the
/// world-container fallback hover/focus target used when nothing else
/// qualifies (§3.2/§4.5).
fn spawn_core_entities(mut commands: Commands) {
    commands.spawn((Transform::default(), GlobalTransform::default(), CursorEntity));
    commands.spawn(WorldContainer);
}

/// The engine plugin: inserts every resource from §3, spawns the cursor and
/// world-container entities, and registers all systems in the
/// `PreUpdate` → `Update` → `PostUpdate` order from §5's control-flow
/// diagram. Does not add any default directional keybindings; see
/// [`DefaultInputNavigationPlugins`] for that.
#[derive(Default)]
pub struct InputNavigationPlugin;

impl Plugin for InputNavigationPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<events::MouseClicked>()
            .add_event::<events::UiButtonActivated>()
            .add_event::<events::UiElementFocused>()
            .add_event::<events::GamepadButtonPressed>()
            .add_event::<events::GamepadButtonReleased>()
            .add_event::<events::CursorVisibilityChanged>()
            .add_event::<events::SpritePackChanged>();

        app.insert_resource(nav::NavManager::new())
            .init_resource::<CursorState>()
            .init_resource::<HidState>()
            .init_resource::<LockState>()
            .init_resource::<AxisButtonState>()
            .init_resource::<ButtonRepeatState>()
            .insert_resource(ActionBindings::new())
            .init_resource::<InputSettings>()
            .init_resource::<NavigationSettings>()
            .init_resource::<NavInputBindings>();

        app.add_systems(Startup, spawn_core_entities);

        app.add_systems(
            PreUpdate,
            (
                devices::poll_keyboard_and_mouse,
                devices::poll_gamepad_buttons,
                devices::tick_gamepad_button_repeat,
                devices::poll_gamepad_axes,
                devices::poll_touch_input,
                locks::tick_frame_lock,
                nav::sync_repeat_config,
                nav::tick_nav_repeat,
            )
                .chain(),
        );

        app.add_systems(
            Update,
            (
                hid::clear_focus_on_mode_change,
                cursor::update_cursor_position,
                cursor::update_collision_and_hover,
                nav::dispatch_directional_input,
                focus_legacy::resolve_legacy_focus,
                cursor_events::run_cursor_event_pipeline,
                scroll::apply_wheel_scroll,
                text_input::apply_text_input_events,
            )
                .chain(),
        );

        app.add_systems(PostUpdate, (actions::tick_action_holds, actions::decay_actions).chain());
    }
}

/// [`InputNavigationPlugin`] plus the default keyboard/gamepad directional
/// bindings (arrow keys, WASD, D-pad, a confirm button) already wired to
/// [`nav::NavManager::navigate`]/[`nav::NavManager::select_current`] through
/// [`nav::dispatch_directional_input`]. The core plugin never assumes a
/// keybinding scheme; this plugin group only adds one on top.
///
/// `nav::dispatch_directional_input` is already part of
/// [`InputNavigationPlugin`] and reads [`NavInputBindings`] from the start;
/// this plugin group exists purely so `DefaultInputNavigationPlugins` reads
/// as the single "batteries included" entry point.
pub struct DefaultInputNavigationPlugins;

impl PluginGroup for DefaultInputNavigationPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::start::<Self>().add(InputNavigationPlugin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::NavDirection;

    fn headless_app() -> App {
        let mut app = App::new();
        app.add_plugins(bevy::time::TimePlugin);
        app.add_plugins(InputNavigationPlugin);
        app
    }

    #[test]
    fn plugin_inserts_all_core_resources() {
        let app = headless_app();
        assert!(app.world().get_resource::<nav::NavManager>().is_some());
        assert!(app.world().get_resource::<CursorState>().is_some());
        assert!(app.world().get_resource::<HidState>().is_some());
        assert!(app.world().get_resource::<InputSettings>().is_some());
        assert!(app.world().get_resource::<NavigationSettings>().is_some());
        assert!(app.world().get_resource::<ActionBindings>().is_some());
    }

    #[test]
    fn plugin_spawns_cursor_and_world_container_on_startup() {
        let mut app = headless_app();
        app.update();
        let world = app.world_mut();
        let mut cursor_q = world.query_filtered::<Entity, With<CursorEntity>>();
        let mut container_q = world.query_filtered::<Entity, With<WorldContainer>>();
        assert_eq!(cursor_q.iter(world).count(), 1);
        assert_eq!(container_q.iter(world).count(), 1);
    }

    #[test]
    fn stepping_the_app_runs_the_full_schedule_without_panicking() {
        let mut app = headless_app();
        for _ in 0..5 {
            app.update();
        }
        let nav = app.world().resource::<nav::NavManager>();
        assert!(nav.focused().is_none());
    }

    #[test]
    fn navigate_through_plugin_resources_updates_cursor_focus() {
        let mut app = headless_app();
        app.update();

        let a = app.world_mut().spawn(gameobject::Bounds2d::new(0.0, 0.0, 10.0, 10.0)).id();
        let b = app.world_mut().spawn(gameobject::Bounds2d::new(20.0, 0.0, 10.0, 10.0)).id();

        {
            let mut nav = app.world_mut().resource_mut::<nav::NavManager>();
            nav.create_group("row");
            nav.set_group_mode("row", nav::GroupMode::Linear);
            nav.add_entity("row", a);
            nav.add_entity("row", b);
            nav.set_selected("row", 0);
            nav.push_focus_group("row");
        }

        let world = app.world_mut();
        let mut commands_world = World::new();
        let mut queue = bevy::ecs::system::CommandQueue::default();
        let mut commands = Commands::new(&mut queue, &commands_world);
        world.resource_scope(|world, mut nav: Mut<nav::NavManager>| {
            nav.navigate(world, &mut commands, "row", NavDirection::Right);
        });
        queue.apply(&mut commands_world);

        let nav = app.world().resource::<nav::NavManager>();
        assert_eq!(nav.focused(), Some(b));
        let cursor = app.world().resource::<CursorState>();
        assert_eq!(cursor.cursor_focused_target, Some(b));
    }
}
