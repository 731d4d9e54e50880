//! Pull and push orchestration.
//!
//! - **Pull**: source instance → local store, one step per entity kind
//! - **Push**: local store → target instance, foreign keys rewritten through
//!   a [`ReferenceMapper`](crate::mapper::ReferenceMapper)
//!
//! Both directions process kinds in dependency order (galleries, assets,
//! models, containers, content items, templates, pages). A failed item never
//! aborts its step, and a failed step never aborts the run.
//!
//! # Example
//!
//! ```ignore
//! use cms_sync::sync::{pull_instance, PullRequest, RunContext};
//!
//! let summary = pull_instance(&client, &root, &request, RunContext::silent()).await?;
//! println!("{}", summary.status);
//! ```

mod kinds;
mod order;
pub(crate) mod pull;
pub(crate) mod push;
mod resolve;
mod types;

pub use pull::{PULL_LOG_PREFIX, pull_instance};
pub use push::{PUSH_LOG_PREFIX, push_instance};
pub use types::{
    CancelFlag, ItemError, PullOutcome, PullRequest, PullStepReport, PullSummary, PushCounters,
    PushOutcome, PushRequest, PushStepReport, PushSummary, RunContext, RunStatus, StepStatus,
    SyncError, SyncResult,
};
