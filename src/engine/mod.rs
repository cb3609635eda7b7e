//! Availability scoring engine.
//!
//! Pure and synchronous: every pass is a function of already-collected
//! series or timelines. Missing or ragged data degrades to empty statistics
//! and the `-1` sentinel score instead of an error.

mod aggregate;
mod detect;
mod models;
mod normalize;
mod score;
mod window;

pub use aggregate::*;
pub use detect::*;
pub use models::*;
pub use normalize::*;
pub use score::*;
pub use window::*;
