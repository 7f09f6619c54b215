//! Pronunciation practice
//!
//! Text normalization, similarity scoring and the practice-loop state machine.
//! Audio and recognition live in [`crate::voice`]; this module only decides
//! what an attempt means.

mod normalize;
mod session;
mod similarity;

pub use normalize::{normalize, normalize_str};
pub use session::{
    CLOSE_THRESHOLD, Feedback, Outcome, PhraseCursor, PracticeSession, PracticeState, evaluate,
};
pub use similarity::similarity;
