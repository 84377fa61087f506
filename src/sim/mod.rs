//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity index)
//! - No rendering or platform dependencies

pub mod autopilot;
pub mod collision;
pub mod events;
pub mod layout;
pub mod level;
pub mod modifiers;
pub mod state;
pub mod tick;

pub use collision::{CollisionResult, circles_overlap};
pub use events::{GameEvent, LevelCallbacks, LevelObserver, RunSummary};
pub use layout::{SpawnLayout, generate_layout};
pub use level::{ControlError, Level, Lifecycle, create_level};
pub use modifiers::{Modifier, ModifierState};
pub use state::{GameOverReason, GamePhase, GameState, Hazard, Orb, Player, World};
pub use tick::{TickInput, tick};
