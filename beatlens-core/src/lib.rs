//! Analysis coordination for beatlens
//!
//! Runs the tempo, key and chord analyses of the playing source on worker
//! threads, keeps their latest outcomes in a per-channel locked store and
//! turns them into display updates at a fixed rate.

pub mod channel;
pub mod config;
pub mod display;
pub mod error;
pub mod form;
pub mod host;
pub mod job;
pub mod panel;
pub mod render;
pub mod schedule;
pub mod session;
pub mod store;

pub use channel::{Channel, SourceId, Ticket};
pub use config::{Config, ConfigStore, FileConfigStore, MemoryConfigStore};
pub use display::{DisplaySink, DisplayState, MenuAction};
pub use error::ConfigError;
pub use form::{ConfigForm, Field, FormResponse};
pub use host::{PlaybackHost, Track};
pub use job::{AnalysisJob, Completion, Executor, InlineExecutor, JobRequest, JobResult, ThreadExecutor};
pub use panel::AnalysisPanel;
pub use render::{RenderLoop, TickOutcome};
pub use schedule::Ticker;
pub use session::Session;
pub use store::{ChannelCell, ChannelState, Outcome, ResultStore};
