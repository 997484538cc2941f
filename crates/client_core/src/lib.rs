//! Client side of multi-channel chat: classifies what arrives, keeps the
//! combined history and rebuilds the per-tab view of it.

pub mod classify;
pub mod engine;
pub mod merged;
pub mod outgoing;
pub mod replay;
pub mod session;
pub mod settings;
pub mod transport;
pub mod ui_config;

pub use classify::EntryKind;
pub use engine::{Arrival, ChatState, Entry, View};
pub use merged::MergedTabs;
pub use replay::{ChatSurface, ClientChat, SurfaceError};
pub use session::{ChatSession, Submitted};
pub use settings::ClientSettings;
pub use transport::{connect, ClientEvent, Connection, FrameSender, FrameSink, JoinParams};
pub use ui_config::UiConfig;
