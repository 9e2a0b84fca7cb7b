//! Training runs: many episodes in sequence, with the behavior profile
//! adapted and the exploration rate decayed after each completed one.

pub mod pipeline;

pub use pipeline::{episode_path, EpisodeSummary, TrainingLoop, TrainingReport, TrainingSettings};
