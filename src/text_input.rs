//! Minimal text-input field (§3.2). Out of the core's hard-case scope, but
//! carried as ambient UI plumbing alongside the other interaction
//! components in [`crate::gameobject`].

use bevy::input::keyboard::{Key, KeyboardInput};
use bevy::prelude::*;

use crate::cursor::CursorState;
use crate::gameobject::{safe_call, Callback, TextInput};

/// Optional submit callback, invoked when the active field receives Enter.
#[derive(Component, Default, Clone)]
pub struct TextInputCallbacks {
    pub on_submit: Option<Callback>,
}

/// Give `entity` text-capture focus, taking it from whatever field
/// previously held it.
pub fn activate_text_input(cursor: &mut CursorState, inputs: &mut Query<&mut TextInput>, entity: Entity) {
    if let Some(prev) = cursor.active_text_input {
        if let Ok(mut t) = inputs.get_mut(prev) {
            t.is_active = false;
        }
    }
    if let Ok(mut t) = inputs.get_mut(entity) {
        t.is_active = true;
        cursor.active_text_input = Some(entity);
    }
}

/// Release whichever field currently holds text-capture focus.
pub fn deactivate_text_input(cursor: &mut CursorState, inputs: &mut Query<&mut TextInput>) {
    if let Some(prev) = cursor.active_text_input.take() {
        if let Ok(mut t) = inputs.get_mut(prev) {
            t.is_active = false;
        }
    }
}

/// `Update` system: routes keyboard text-entry events to the active
/// [`TextInput`], applying `max_len`/`all_caps`, and fires `on_submit` on
/// Enter.
pub fn apply_text_input_events(
    mut cursor: ResMut<CursorState>,
    mut keyboard: EventReader<KeyboardInput>,
    mut inputs: Query<&mut TextInput>,
    callbacks: Query<&TextInputCallbacks>,
    mut commands: Commands,
) {
    let Some(active) = cursor.active_text_input else {
        keyboard.clear();
        return;
    };
    let Ok(mut field) = inputs.get_mut(active) else { return };

    for ev in keyboard.read() {
        if !ev.state.is_pressed() {
            continue;
        }
        match &ev.logical_key {
            Key::Character(c) => {
                if field.text.chars().count() < field.max_len || field.max_len == 0 {
                    let ch = if field.all_caps { c.to_uppercase() } else { c.to_string() };
                    let byte_pos = field.text.char_indices().nth(field.cursor_pos).map(|(b, _)| b).unwrap_or(field.text.len());
                    field.text.insert_str(byte_pos, &ch);
                    field.cursor_pos += ch.chars().count();
                }
            }
            Key::Backspace => {
                if field.cursor_pos > 0 {
                    let mut chars: Vec<char> = field.text.chars().collect();
                    if field.cursor_pos <= chars.len() {
                        chars.remove(field.cursor_pos - 1);
                        field.text = chars.into_iter().collect();
                        field.cursor_pos -= 1;
                    }
                }
            }
            Key::Enter => {
                if let Ok(cb) = callbacks.get(active) {
                    if let Some(on_submit) = cb.on_submit.clone() {
                        safe_call(&on_submit, active, &mut commands);
                    }
                }
                cursor.active_text_input = None;
                field.is_active = false;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activate_switches_active_field_and_clears_previous() {
        let mut world = World::new();
        let a = world.spawn(TextInput::default()).id();
        let b = world.spawn(TextInput { is_active: true, ..Default::default() }).id();
        let mut cursor = CursorState { active_text_input: Some(b), ..Default::default() };

        let mut state: bevy::ecs::system::SystemState<Query<&mut TextInput>> = bevy::ecs::system::SystemState::new(&mut world);
        {
            let mut inputs = state.get_mut(&mut world);
            activate_text_input(&mut cursor, &mut inputs, a);
        }
        state.apply(&mut world);

        assert_eq!(cursor.active_text_input, Some(a));
        assert!(!world.get::<TextInput>(b).unwrap().is_active);
        assert!(world.get::<TextInput>(a).unwrap().is_active);
    }

    #[test]
    fn character_insert_indexes_by_char_not_byte_for_multibyte_text() {
        let mut field = TextInput { text: "é".to_string(), cursor_pos: 1, ..Default::default() };
        let ch = "x";
        let byte_pos = field.text.char_indices().nth(field.cursor_pos).map(|(b, _)| b).unwrap_or(field.text.len());
        field.text.insert_str(byte_pos, ch);
        field.cursor_pos += ch.chars().count();

        assert_eq!(field.text, "éx");
        assert_eq!(field.cursor_pos, 2);
    }
}
