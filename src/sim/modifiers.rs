//! Timed player modifiers (boost and autopilot)
//!
//! Each modifier cycles Ready → Active → Cooldown → Ready on integer tick
//! timers, so pausing the simulation pauses the windows too.

use serde::{Deserialize, Serialize};

use super::level::ControlError;
use crate::{secs_to_ticks, ticks_to_secs_ceil};

/// Where a modifier is in its activation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifierState {
    Ready,
    Active { ticks_left: u32 },
    Cooldown { ticks_left: u32 },
}

/// Transition produced by [`Modifier::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierTransition {
    /// Active window ran out, cooldown started
    Expired,
    /// Cooldown finished, can be activated again
    Ready,
}

/// One timed modifier
#[derive(Debug, Clone, PartialEq)]
pub struct Modifier {
    pub state: ModifierState,
    active_ticks: u32,
    cooldown_ticks: u32,
}

impl Modifier {
    pub fn new(active_secs: u32, cooldown_secs: u32) -> Self {
        Self {
            state: ModifierState::Ready,
            active_ticks: secs_to_ticks(active_secs),
            cooldown_ticks: secs_to_ticks(cooldown_secs),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ModifierState::Active { .. })
    }

    pub fn is_ready(&self) -> bool {
        self.state == ModifierState::Ready
    }

    pub fn is_cooling_down(&self) -> bool {
        matches!(self.state, ModifierState::Cooldown { .. })
    }

    /// Start the active window. Rejected while active or cooling down.
    pub fn activate(&mut self) -> Result<(), ControlError> {
        match self.state {
            ModifierState::Ready => {
                self.state = ModifierState::Active {
                    ticks_left: self.active_ticks,
                };
                Ok(())
            }
            ModifierState::Active { .. } => Err(ControlError::AlreadyActive),
            ModifierState::Cooldown { .. } => Err(ControlError::CoolingDown),
        }
    }

    /// Advance one tick
    pub fn tick(&mut self) -> Option<ModifierTransition> {
        let (next, transition) = match self.state {
            ModifierState::Ready => return None,
            ModifierState::Active { ticks_left } if ticks_left > 1 => (
                ModifierState::Active {
                    ticks_left: ticks_left - 1,
                },
                None,
            ),
            ModifierState::Active { .. } => (
                ModifierState::Cooldown {
                    ticks_left: self.cooldown_ticks,
                },
                Some(ModifierTransition::Expired),
            ),
            ModifierState::Cooldown { ticks_left } if ticks_left > 1 => (
                ModifierState::Cooldown {
                    ticks_left: ticks_left - 1,
                },
                None,
            ),
            ModifierState::Cooldown { .. } => {
                (ModifierState::Ready, Some(ModifierTransition::Ready))
            }
        };
        self.state = next;
        transition
    }

    /// Back to Ready with no cooldown (terminal state, restart, dispose)
    pub fn reset(&mut self) {
        self.state = ModifierState::Ready;
    }

    /// Whole seconds left in the current window (0 when ready), for the HUD
    pub fn seconds_left(&self) -> u32 {
        match self.state {
            ModifierState::Ready => 0,
            ModifierState::Active { ticks_left } | ModifierState::Cooldown { ticks_left } => {
                ticks_to_secs_ceil(ticks_left)
            }
        }
    }
}
