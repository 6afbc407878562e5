use async_trait::async_trait;
use detectq_core::job::JobInput;
use detectq_pipeline::Pipeline;

use crate::job::JobResult;

/// Whatever a worker runs for each job.
///
/// Implemented by [`Pipeline`]; tests substitute their own.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, input: &JobInput) -> JobResult;
}

#[async_trait]
impl JobProcessor for Pipeline {
    async fn process(&self, input: &JobInput) -> JobResult {
        Pipeline::process(self, input).await
    }
}
