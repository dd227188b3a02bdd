//! The typing game: phrase delivery, scoring and the per-connection exchange.

pub mod phrase;
pub mod protocol;
pub mod score;
pub mod session;

pub use self::phrase::{random_phrase, select_phrase, WordBand};
pub use self::protocol::{ClientEvent, ServerEvent};
pub use self::score::{compute_score, Score};
pub use self::session::{GameSession, SessionState};
