//! Click-captcha solving: instruction parsing, recognition with rotation
//! fallback, greedy matching and result classification.

mod angle;
mod instruction;
mod matcher;
mod render;
mod solver;

pub use angle::{
    ROTATED_CONFIDENCE, ROTATION_SWEEP, Recognition, UPRIGHT_CONFIDENCE, recognize_with_rotation,
};
pub use instruction::{LEAD_IN_PHRASES, is_target_char, parse_instruction};
pub use matcher::match_targets;
pub use render::DebugRenderer;
pub use solver::{CaptchaSolver, SolveObserver};

#[cfg(feature = "native")]
pub use solver::create_solver_from_dir;
