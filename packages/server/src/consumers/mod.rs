pub mod judge_result;
pub mod local;

pub use judge_result::{apply_judge_result, consume_judge_results};
pub use local::LocalJudge;
