//! Cursor event pipeline (module E): down/up edge detection, click vs drag
//! disambiguation, release-on-target dispatch and hover dispatch.
//!
//! Grounded in `input_events.hpp`'s edge-handled-flag contract: every edge
//! is dispatched at most once per occurrence, guarded by the `*_handled`
//! flags on [`crate::cursor::CursorState`].

use bevy::prelude::*;
use tracing::trace;

use crate::cursor::CursorState;
use crate::events::{MouseButtonKind, MouseClicked, UiButtonActivated};
use crate::gameobject::{safe_call, Bounds2d, Interactable, InteractionCallbacks, WorldContainer};
use crate::hid::HidState;
use crate::settings::InputSettings;

/// `Update` system: press/release edge detection, drag start, click/release
/// dispatch and hover dispatch (§4.6). Runs after collision/hover
/// resolution.
#[allow(clippy::too_many_arguments)]
pub fn run_cursor_event_pipeline(
    mut cursor: ResMut<CursorState>,
    settings: Res<InputSettings>,
    hid: Res<HidState>,
    time: Res<Time>,
    time_virtual: Res<Time<Virtual>>,
    mouse: Res<ButtonInput<MouseButton>>,
    bounds: Query<&Bounds2d>,
    mut interactables: Query<&mut Interactable>,
    callbacks: Query<&InteractionCallbacks>,
    world_container: Query<Entity, With<WorldContainer>>,
    mut commands: Commands,
    mut clicked: EventWriter<MouseClicked>,
    mut activated: EventWriter<UiButtonActivated>,
) {
    let now = time.elapsed_secs();

    cursor.cursor_prev_dragging_target = cursor.cursor_dragging_target;

    dispatch_queued_right_click(&mut cursor, &interactables, &callbacks, &mut commands, &mut clicked);

    if mouse.just_pressed(MouseButton::Right) {
        cursor.right_click_queued = cursor.current_designated_hover_target.or(cursor.cursor_focused_target);
        cursor.right_click_handled = false;
    }

    if mouse.just_pressed(MouseButton::Left) {
        cursor.cursor_down_position = Some(cursor.cursor_position);
        cursor.cursor_down_time = now;
        let world_entity = world_container.single().ok();
        cursor.cursor_down_target = choose_down_target(&cursor, &hid, &interactables, world_entity);
        cursor.is_cursor_down = true;
        cursor.cursor_down_handled = false;

        if let Some(target) = cursor.cursor_down_target {
            if let Ok(i) = interactables.get(target) {
                if i.drag_enabled {
                    if let Ok(mut i) = interactables.get_mut(target) {
                        i.is_being_dragged = true;
                    }
                    cursor.cursor_dragging_target = Some(target);
                }
            }
        }
    }

    if mouse.just_released(MouseButton::Left) {
        cursor.cursor_up_position = Some(cursor.cursor_position);
        cursor.cursor_up_time = now;
        cursor.cursor_up_target = cursor.current_designated_hover_target.or(cursor.cursor_focused_target);
        cursor.is_cursor_down = false;
        cursor.cursor_up_handled = false;

        dispatch_release(
            &mut cursor,
            &settings,
            time_virtual.relative_speed(),
            &bounds,
            &mut interactables,
            &callbacks,
            &mut commands,
            &mut clicked,
            &mut activated,
        );
    }

    dispatch_hover(&mut cursor, &settings, &hid, time.delta_secs(), &interactables, &callbacks, &mut commands);
}

/// Dispatches a right-click queued on a previous frame's press edge, per
/// §4.6's `R_cursor_queue` contract: the click lands one update after the
/// press, on whichever entity was hovered/focused at press time.
fn dispatch_queued_right_click(
    cursor: &mut CursorState,
    interactables: &Query<&mut Interactable>,
    callbacks: &Query<&InteractionCallbacks>,
    commands: &mut Commands,
    clicked: &mut EventWriter<MouseClicked>,
) {
    let Some(target) = cursor.right_click_queued else { return };
    if cursor.right_click_handled {
        return;
    }
    cursor.right_click_queued = None;
    cursor.right_click_handled = true;

    if !interactables.get(target).map(|i| i.right_click_enabled).unwrap_or(false) {
        return;
    }
    if let Ok(cb) = callbacks.get(target) {
        if let Some(on_right_click) = cb.on_right_click.clone() {
            safe_call(&on_right_click, target, commands);
        }
    }
    clicked.send(MouseClicked { position: cursor.cursor_position, button: MouseButtonKind::Right, target: Some(target) });
}

/// Press-edge target selection (§4.6): touch+hovering, then the designated
/// hover target, then the focused target, then the first click-capable
/// entity in the collision list, then the world container.
fn choose_down_target(
    cursor: &CursorState,
    hid: &HidState,
    interactables: &Query<&mut Interactable>,
    world_entity: Option<Entity>,
) -> Option<Entity> {
    if hid.touch_enabled {
        if let Some(hovering) = cursor.current_designated_hover_target {
            return Some(hovering);
        }
    }
    cursor
        .current_designated_hover_target
        .or(cursor.cursor_focused_target)
        .or_else(|| cursor.collision_list.iter().copied().find(|&e| interactables.get(e).map(|i| i.click_enabled).unwrap_or(false)))
        .or(world_entity)
}

#[allow(clippy::too_many_arguments)]
fn dispatch_release(
    cursor: &mut CursorState,
    settings: &InputSettings,
    timescale: f32,
    bounds: &Query<&Bounds2d>,
    interactables: &mut Query<&mut Interactable>,
    callbacks: &Query<&InteractionCallbacks>,
    commands: &mut Commands,
    clicked: &mut EventWriter<MouseClicked>,
    activated: &mut EventWriter<UiButtonActivated>,
) {
    let dragging = cursor.cursor_prev_dragging_target;
    if let Some(dragged) = dragging {
        if cursor.cursor_up_target == dragging {
            if let Some(drop_target) = cursor
                .collision_list
                .iter()
                .copied()
                .find(|&e| e != dragged && interactables.get(e).map(|i| i.trigger_on_release_enabled).unwrap_or(false))
            {
                cursor.cursor_released_on_target = Some(drop_target);
            }
        }
        if let Ok(cb) = callbacks.get(dragged) {
            if let Some(on_release) = cb.on_release.clone() {
                safe_call(&on_release, dragged, commands);
            }
        }
        if let Ok(mut i) = interactables.get_mut(dragged) {
            i.is_being_dragged = false;
        }
        cursor.cursor_dragging_target = None;
        cursor.cursor_released_on_handled = true;
    }

    let moved_sq = match (cursor.cursor_down_position, cursor.cursor_up_position) {
        (Some(down), Some(up)) => down.distance_squared(up),
        _ => f32::INFINITY,
    };
    let elapsed = cursor.cursor_up_time - cursor.cursor_down_time;

    let click_ok = moved_sq <= settings.cursor_minimum_movement_distance && elapsed <= settings.default_click_timeout * timescale;

    if click_ok {
        if let Some(down_target) = cursor.cursor_down_target {
            if interactables.get(down_target).map(|i| i.click_enabled).unwrap_or(false) {
                cursor.cursor_clicked_target = Some(down_target);
                if let Ok(cb) = callbacks.get(down_target) {
                    if let Some(on_click) = cb.on_click.clone() {
                        safe_call(&on_click, down_target, commands);
                    }
                }
                clicked.send(MouseClicked {
                    position: cursor.cursor_up_position.unwrap_or(cursor.cursor_position),
                    button: MouseButtonKind::Left,
                    target: Some(down_target),
                });
                if bounds.get(down_target).is_ok() {
                    activated.send(UiButtonActivated { entity: down_target, button: MouseButtonKind::Left });
                }
                cursor.cursor_click_handled = true;
                trace!(entity = ?down_target, "click dispatched");
            }
        } else {
            clicked.send(MouseClicked { position: cursor.cursor_position, button: MouseButtonKind::Left, target: None });
        }
    }
}

fn dispatch_hover(
    cursor: &mut CursorState,
    settings: &InputSettings,
    hid: &HidState,
    dt: f32,
    interactables: &Query<&mut Interactable>,
    callbacks: &Query<&InteractionCallbacks>,
    commands: &mut Commands,
) {
    if cursor.cursor_hovering_handled {
        return;
    }
    if hid.touch_enabled {
        cursor.touch_hover_elapsed += dt;
        if cursor.touch_hover_elapsed < settings.touch_input_minimum_hover_time {
            return;
        }
    }
    if let Some(prev) = cursor.prev_designated_hover_target {
        let being_dragged = interactables.get(prev).map(|i| i.is_being_dragged).unwrap_or(false);
        if !being_dragged {
            if let Ok(cb) = callbacks.get(prev) {
                if let Some(on_stop_hover) = cb.on_stop_hover.clone() {
                    safe_call(&on_stop_hover, prev, commands);
                }
            }
        }
    }
    if let Some(next) = cursor.current_designated_hover_target {
        if Some(next) != cursor.cursor_dragging_target {
            if let Ok(cb) = callbacks.get(next) {
                if let Some(on_hover) = cb.on_hover.clone() {
                    safe_call(&on_hover, next, commands);
                }
            }
        }
    }
    cursor.cursor_hovering_handled = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choose_down_target_prefers_designated_hover_over_collision_list() {
        let mut world = World::new();
        let hovered = world.spawn(Interactable::default()).id();
        let other = world.spawn(Interactable::default()).id();
        let mut cursor = CursorState::default();
        cursor.current_designated_hover_target = Some(hovered);
        cursor.collision_list = vec![other];
        let mut state: bevy::ecs::system::SystemState<Query<&mut Interactable>> = bevy::ecs::system::SystemState::new(&mut world);
        let interactables = state.get_mut(&mut world);
        assert_eq!(choose_down_target(&cursor, &HidState::default(), &interactables, None), Some(hovered));
    }

    #[test]
    fn choose_down_target_falls_back_to_first_click_capable_in_collision_list() {
        let mut world = World::new();
        let non_clickable = world.spawn(Interactable { click_enabled: false, ..Default::default() }).id();
        let clickable = world.spawn(Interactable { click_enabled: true, ..Default::default() }).id();
        let mut cursor = CursorState::default();
        cursor.collision_list = vec![non_clickable, clickable];
        let mut state: bevy::ecs::system::SystemState<Query<&mut Interactable>> = bevy::ecs::system::SystemState::new(&mut world);
        let interactables = state.get_mut(&mut world);
        assert_eq!(choose_down_target(&cursor, &HidState::default(), &interactables, None), Some(clickable));
    }

    #[test]
    fn choose_down_target_falls_back_to_world_container_when_nothing_qualifies() {
        let mut world = World::new();
        let world_entity = world.spawn_empty().id();
        let cursor = CursorState::default();
        let mut state: bevy::ecs::system::SystemState<Query<&mut Interactable>> = bevy::ecs::system::SystemState::new(&mut world);
        let interactables = state.get_mut(&mut world);
        assert_eq!(choose_down_target(&cursor, &HidState::default(), &interactables, Some(world_entity)), Some(world_entity));
    }

    #[test]
    fn choose_down_target_prefers_hovering_target_when_touch_is_active() {
        let mut world = World::new();
        let hovered = world.spawn(Interactable::default()).id();
        let mut cursor = CursorState::default();
        cursor.current_designated_hover_target = Some(hovered);
        let hid = HidState { touch_enabled: true, ..Default::default() };
        let mut state: bevy::ecs::system::SystemState<Query<&mut Interactable>> = bevy::ecs::system::SystemState::new(&mut world);
        let interactables = state.get_mut(&mut world);
        assert_eq!(choose_down_target(&cursor, &hid, &interactables, None), Some(hovered));
    }

    #[test]
    fn queued_right_click_dispatches_once_then_clears() {
        let mut world = World::new();
        let target = world
            .spawn(Interactable { right_click_enabled: true, ..Default::default() })
            .id();
        let mut cursor = CursorState { right_click_queued: Some(target), right_click_handled: false, ..Default::default() };

        let mut state: bevy::ecs::system::SystemState<(
            Query<&mut Interactable>,
            Query<&InteractionCallbacks>,
            Commands,
            EventWriter<MouseClicked>,
        )> = bevy::ecs::system::SystemState::new(&mut world);
        {
            let (interactables, callbacks, mut commands, mut clicked) = state.get_mut(&mut world);
            dispatch_queued_right_click(&mut cursor, &interactables, &callbacks, &mut commands, &mut clicked);
        }
        state.apply(&mut world);

        assert!(cursor.right_click_queued.is_none());
        assert!(cursor.right_click_handled);
    }
}
