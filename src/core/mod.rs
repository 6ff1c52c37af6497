pub mod clock;
pub mod indicator_set;
pub mod indicators;
pub mod levels;
pub mod sessions;
