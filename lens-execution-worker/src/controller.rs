// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Implementation of the interface between the worker thread and the rest
//! of the process: queueing requests, waking the worker, and stopping it.

use crate::request_queue::{RequestQueue, RequestWithResponseSender};
use lens_execution_exports::{
    ExecutionConfig, ExecutionError, RunOutcome, RunRequest, RunnerController, RunnerManager,
    SeriesOutcome, SeriesRequest,
};
use parking_lot::{Condvar, Mutex};
use std::sync::mpsc;
use std::sync::Arc;
use tracing::info;

/// structure used to communicate with the runner thread, with shared ownership
pub(crate) struct RunnerInputData {
    /// set stop to true to stop the thread
    pub stop: bool,
    /// queue of pending single-run requests
    pub run_requests: RequestQueue<RunRequest, RunOutcome>,
    /// queue of pending series requests
    pub series_requests: RequestQueue<SeriesRequest, SeriesOutcome>,
}

impl RunnerInputData {
    pub fn new(config: &ExecutionConfig) -> Self {
        RunnerInputData {
            stop: Default::default(),
            run_requests: RequestQueue::new(config.request_queue_length),
            series_requests: RequestQueue::new(config.request_queue_length),
        }
    }
}

#[derive(Clone)]
/// implementation of the runner controller
pub struct RunnerControllerImpl {
    /// input data to process in the worker thread
    /// with a wake-up condition variable that needs to be triggered when the data changes
    pub(crate) input_data: Arc<(Condvar, Mutex<RunnerInputData>)>,
}

impl RunnerController for RunnerControllerImpl {
    /// Executes a top-level run request, blocking until the outcome is available.
    fn execute_run(&self, req: RunRequest) -> Result<RunOutcome, ExecutionError> {
        let resp_rx = {
            let mut input_data = self.input_data.1.lock();
            if input_data.run_requests.is_full() {
                return Err(ExecutionError::ChannelError(
                    "too many queued run requests".into(),
                ));
            }
            let (response_tx, response_rx) = mpsc::channel();
            input_data
                .run_requests
                .push(RequestWithResponseSender::new(req, response_tx));
            self.input_data.0.notify_one();
            response_rx
        };

        resp_rx.recv().map_err(|_| {
            ExecutionError::ChannelError("could not retrieve run outcome".into())
        })?
    }

    /// Executes a series request, blocking until the outcome is available.
    fn execute_series(&self, req: SeriesRequest) -> Result<SeriesOutcome, ExecutionError> {
        let resp_rx = {
            let mut input_data = self.input_data.1.lock();
            if input_data.series_requests.is_full() {
                return Err(ExecutionError::ChannelError(
                    "too many queued series requests".into(),
                ));
            }
            let (response_tx, response_rx) = mpsc::channel();
            input_data
                .series_requests
                .push(RequestWithResponseSender::new(req, response_tx));
            self.input_data.0.notify_one();
            response_rx
        };

        resp_rx.recv().map_err(|_| {
            ExecutionError::ChannelError("could not retrieve series outcome".into())
        })?
    }

    /// Returns a boxed clone of self.
    /// Allows cloning `Box<dyn RunnerController>`,
    /// see `lens-execution-exports/controller_traits.rs`
    fn clone_box(&self) -> Box<dyn RunnerController> {
        Box::new(self.clone())
    }
}

/// Runner manager
/// Allows stopping the runner worker
pub struct RunnerManagerImpl {
    /// input data to process in the worker thread
    pub(crate) input_data: Arc<(Condvar, Mutex<RunnerInputData>)>,
    /// handle used to join the worker thread
    pub(crate) thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl RunnerManager for RunnerManagerImpl {
    /// stops the worker
    fn stop(&mut self) {
        info!("stopping runner worker...");
        // notify the worker thread to stop
        {
            let mut input_wlock = self.input_data.1.lock();
            input_wlock.stop = true;
            self.input_data.0.notify_one();
        }
        // join the worker thread
        if let Some(join_handle) = self.thread_handle.take() {
            join_handle.join().expect("runner worker thread panicked");
        }
        info!("runner worker stopped");
    }
}
