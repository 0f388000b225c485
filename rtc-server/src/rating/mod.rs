//! Rating sessions and the like/dislike flow

pub mod flow;
pub mod session;

pub use flow::{rate_clip, SessionRecorder};
pub use session::{ClipState, RatingProgress, RatingSession, SessionClip};
