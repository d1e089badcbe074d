#![forbid(unsafe_code)]

pub mod achievements;
pub mod model;
pub mod scoring;
pub mod time;

pub use achievements::{ACHIEVEMENTS, Achievement, AchievementId};
pub use time::Clock;
