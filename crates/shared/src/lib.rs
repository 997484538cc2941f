pub mod channel;
pub mod codec;
pub mod color;
pub mod domain;
pub mod error;
pub mod heuristics;
pub mod inline;
pub mod parser;
pub mod protocol;
pub mod text;

pub use channel::Channel;
pub use codec::{Envelope, Marker};
pub use color::{NamedColor, Rgb};
pub use text::RichText;
