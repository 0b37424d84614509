//! Error types for the handful of fallible, caller-observable wiring APIs.
//!
//! Almost nothing in this crate returns a `Result`: the engine's own
//! per-frame systems never abort on bad input, they silently ignore unknown
//! names and log. [`InputError`] exists for the few APIs where a caller
//! wiring things up by hand (usually during development) benefits from a
//! typed signal in addition to the log line.

use bevy::prelude::Entity;
use thiserror::Error;

/// Errors surfaced by explicit wiring calls on [`crate::nav::NavManager`] and
/// [`crate::actions::ActionBindings`].
///
/// None of these are fatal: every fallible call also degrades gracefully
/// (see the error-handling policy table in `DESIGN.md`), this type is purely
/// a convenience for callers who want to `?` instead of checking logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    /// A navigation group name was referenced that has never been created.
    #[error("unknown navigation group: {0}")]
    UnknownGroup(String),
    /// A navigation layer name was referenced that has never been created.
    #[error("unknown navigation layer: {0}")]
    UnknownLayer(String),
    /// An action name was queried or bound to that has no bindings.
    #[error("unknown action: {0}")]
    UnknownAction(String),
    /// A navigation step attempted to drop more than one layer on the stack
    /// at once; rejected rather than treated as a multi-pop.
    #[error("illegal layer jump from {from} to {to} (would skip intermediate layers)")]
    IllegalLayerJump {
        /// Layer navigation was attempted from.
        from: String,
        /// Layer navigation attempted to land on.
        to: String,
    },
    /// The entity chosen as the next focus target is missing a required
    /// spatial component (`Bounds2d`); the navigation step is reverted.
    #[error("entity {0:?} is missing a required Bounds2d component")]
    MissingBounds(Entity),
    /// A string-based config loader (§6.3) referenced a device or trigger
    /// name this crate does not recognize.
    #[error("unrecognized input binding name: {0:?}")]
    UnknownBindingName(String),
}
