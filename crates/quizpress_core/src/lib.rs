//! Quizpress core: identity rules, session values and the pure job lifecycle reducer.
mod effect;
mod identity;
mod msg;
mod progress;
mod session;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, Warning};
pub use identity::{AllowList, Identity};
pub use msg::Msg;
pub use progress::{progress_percent, Progress};
pub use session::{AuthState, Session};
pub use state::{FailureKind, JobState, JobStatus};
pub use update::update;
pub use view_model::{FailureView, JobViewModel};
