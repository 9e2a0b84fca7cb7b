//! Episode orchestration.
//!
//! - [`pacer`] -- injectable inter-action waiting.
//! - [`step`] -- one read/decide/wait/act cycle and its human-likeness score.
//! - [`episode`] -- the per-episode loop with circuit breaking, step cap and
//!   paginated experience export.

pub mod episode;
pub mod pacer;
pub mod step;

pub use episode::{EpisodeOutcome, EpisodeSettings, Orchestrator, Termination};
pub use pacer::{AnyPacer, InstantPacer, Pacer, TokioPacer};
pub use step::{human_likeness, to_play_request, StepExecutor, StepOutcome, NEUTRAL_HUMAN_LIKENESS};
