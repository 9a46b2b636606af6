//! Value Objects - Immutable, identity-less domain primitives

mod session_id;
mod speaker;
mod voice_id;

pub use session_id::SessionId;
pub use speaker::Speaker;
pub use voice_id::{VoiceId, VoiceIdCheck};
