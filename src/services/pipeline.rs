//! Deployment lifecycle pipeline.
//!
//! A deployment is created in `pending` by a request handler and handed to
//! this pipeline, which drives it to `running` or `failed` long after the
//! triggering request has returned. Jobs flow through a bounded queue into
//! a single worker task, so no two runs execute concurrently and a fault in
//! one run can never touch another deployment or the host process.

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::db::Store;
use crate::models::AppStatus;

/// Build stages simulated in place of a real build/test/deploy executor.
/// A real implementation would do work between the appends; the append-only
/// log contract is what must be preserved.
const BUILD_STAGES: [&str; 5] = [
    "Pulling source code...",
    "Building application...",
    "Running tests...",
    "Deploying to server...",
    "Deployment completed successfully",
];

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The job queue is full or the worker is gone.
    #[error("Deployment queue unavailable")]
    QueueUnavailable,
}

/// One unit of work for the pipeline worker.
#[derive(Debug, Clone)]
struct DeployJob {
    deployment_id: String,
    app_id: String,
}

/// Handle used by request handlers to enqueue deployment runs.
///
/// Cheap to clone; all clones feed the same worker.
#[derive(Clone)]
pub struct DeploymentPipeline {
    sender: mpsc::Sender<DeployJob>,
}

impl DeploymentPipeline {
    /// Spawn the worker task and return the scheduling handle.
    #[must_use]
    pub fn start(store: Store, queue_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_size.max(1));

        tokio::spawn(worker_loop(store, receiver));

        Self { sender }
    }

    /// Fire-and-forget scheduling: returns as soon as the job is queued,
    /// never waits for the run itself. The only error is backpressure from
    /// a full queue, which callers surface instead of silently dropping
    /// the job.
    pub fn schedule(&self, deployment_id: &str, app_id: &str) -> Result<(), PipelineError> {
        self.sender
            .try_send(DeployJob {
                deployment_id: deployment_id.to_string(),
                app_id: app_id.to_string(),
            })
            .map_err(|_| PipelineError::QueueUnavailable)
    }
}

/// Consumes jobs until every `DeploymentPipeline` handle is dropped.
/// Each job's fault is contained here: logged, converted to a `failed`
/// record, never propagated.
async fn worker_loop(store: Store, mut receiver: mpsc::Receiver<DeployJob>) {
    while let Some(job) = receiver.recv().await {
        if let Err(e) = run_deployment(&store, &job).await {
            error!("Deployment {} failed: {}", job.deployment_id, e);

            if let Err(e) = mark_failed(&store, &job, &e).await {
                // The record may be left non-terminal only if the store
                // itself is down; nothing more can be done from here.
                error!(
                    "Failed to record failure for deployment {}: {}",
                    job.deployment_id, e
                );
            }
        }
    }
}

/// Drive one deployment through `deploying` to `running`.
///
/// The terminal status and `completed_at` land in a single update, and the
/// owning app is only touched after the deployment is terminal, so readers
/// never observe a completion timestamp on an in-flight record or an app
/// ahead of its deployment.
async fn run_deployment(store: &Store, job: &DeployJob) -> anyhow::Result<()> {
    store
        .set_deployment_status(&job.deployment_id, AppStatus::Deploying)
        .await?;

    for stage in BUILD_STAGES {
        store.append_deployment_log(&job.deployment_id, stage).await?;
    }

    store
        .complete_deployment(&job.deployment_id, AppStatus::Running)
        .await?;

    store.set_app_status(&job.app_id, AppStatus::Running).await?;

    store
        .add_activity_log(
            Some(&job.app_id),
            Some(&job.deployment_id),
            None,
            "deployment",
            "info",
            "Deployment completed successfully",
        )
        .await?;

    info!("Deployment {} completed successfully", job.deployment_id);
    Ok(())
}

/// Failure branch: error line appended, terminal `failed` + `completed_at`
/// in one update, then the app mirrors the failure.
async fn mark_failed(store: &Store, job: &DeployJob, cause: &anyhow::Error) -> anyhow::Result<()> {
    store
        .append_deployment_log(&job.deployment_id, &format!("Error: {cause}"))
        .await?;

    store
        .complete_deployment(&job.deployment_id, AppStatus::Failed)
        .await?;

    store.set_app_status(&job.app_id, AppStatus::Failed).await?;

    store
        .add_activity_log(
            Some(&job.app_id),
            Some(&job.deployment_id),
            None,
            "deployment",
            "error",
            &format!("Deployment failed: {cause}"),
        )
        .await?;

    Ok(())
}
