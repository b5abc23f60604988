pub mod config;
pub mod event;
pub mod judge_job;
pub mod judge_result;
pub mod mq;
pub mod submission_status;
pub mod worker;

pub use event::{RelayEvent, RelayEventType};
pub use submission_status::{SubmissionStatus, Verdict};
