//! Terminal front end

pub mod console;
pub mod play;

pub use play::run_play;
