//! Server side of multi-channel chat: routing, moderation state and the
//! per-player toggles, independent of any particular game host.

pub mod active;
pub mod area_spy;
pub mod collaborators;
pub mod commands;
pub mod delivery;
pub mod duration;
pub mod format;
pub mod history;
pub mod mentions;
pub mod mirror;
pub mod mutes;
pub mod perms;
pub mod recipients;
pub mod relay;
pub mod router;
pub mod settings;
pub mod spy;
pub mod sync;
pub mod world;

pub use commands::{CommandOutcome, CommandService};
pub use router::{ChatRouter, DeathReport, Dispatch, DispatchReport, RouteError, RouterDeps};
pub use settings::ChatSettings;
pub use world::{OnlinePlayers, PlayerSnapshot};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
