// THEORY:
// Analyses are independent: each one owns its source image, surface and
// comparison texts, and nothing is written back to shared state. The parallel
// pipeline exploits that with a fixed pool of tokio workers fed by a
// round-robin dispatcher. Every submitted request carries a oneshot reply
// channel, so results come back to exactly the caller that asked, and a batch
// keeps its input order no matter which worker finishes first.

use crate::config::PipelineConfig;
use crate::core_modules::inference::InferenceService;
use crate::core_modules::report::Report;
use crate::error::{AnalysisError, Result};
use crate::pipeline::{AnalysisRequest, DiagnosticPipeline};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

pub struct AnalysisTask {
    pub request: AnalysisRequest,
    pub result_sender: oneshot::Sender<Result<Report>>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<AnalysisTask>,
    dispatcher: tokio::task::JoinHandle<()>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns the dispatcher and `worker_count` workers on the current runtime.
    pub fn new(
        worker_count: usize,
        pipeline: Arc<DiagnosticPipeline>,
        inference: Arc<dyn InferenceService>,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<AnalysisTask>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<AnalysisTask>())
            .unzip();

        // Spawn dispatcher
        let dispatcher = tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if let Err(mpsc::error::SendError(task)) = worker_senders[worker_idx].send(task) {
                    let _ = task.result_sender.send(Err(AnalysisError::WorkerUnavailable));
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        // Spawn workers
        let mut workers = Vec::with_capacity(worker_count);
        for (worker_id, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            let pipeline = pipeline.clone();
            let inference = inference.clone();

            let worker = tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    debug!(worker_id, "analysis picked up");
                    let result = pipeline.analyze(&task.request, inference.as_ref()).await;
                    let _ = task.result_sender.send(result);
                }
            });

            workers.push(worker);
        }

        Self {
            task_sender,
            dispatcher,
            workers,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub async fn submit(&self, request: AnalysisRequest) -> Result<Report> {
        let (result_sender, result_receiver) = oneshot::channel();

        self.task_sender
            .send(AnalysisTask {
                request,
                result_sender,
            })
            .map_err(|_| AnalysisError::WorkerUnavailable)?;

        result_receiver
            .await
            .map_err(|_| AnalysisError::WorkerUnavailable)?
    }

    /// Stops accepting work and waits for in-flight analyses to finish.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        let _ = self.dispatcher.await;
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

pub struct ParallelPipeline {
    worker_pool: WorkerPool,
}

impl ParallelPipeline {
    pub fn new(config: &PipelineConfig, inference: Arc<dyn InferenceService>) -> Self {
        Self::with_pipeline(config, Arc::new(DiagnosticPipeline::new(config)), inference)
    }

    pub fn with_pipeline(
        config: &PipelineConfig,
        pipeline: Arc<DiagnosticPipeline>,
        inference: Arc<dyn InferenceService>,
    ) -> Self {
        Self {
            worker_pool: WorkerPool::new(config.worker_count, pipeline, inference),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.worker_count()
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> Result<Report> {
        self.worker_pool.submit(request).await
    }

    /// Runs all requests concurrently; results are in request order.
    pub async fn analyze_batch(&self, requests: Vec<AnalysisRequest>) -> Vec<Result<Report>> {
        join_all(requests.into_iter().map(|request| self.analyze(request))).await
    }

    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
    }
}
