// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! The runner worker thread: a single long-lived thread that sleeps on a
//! condition variable and drains the request queues as they fill up.

use crate::controller::{RunnerControllerImpl, RunnerInputData, RunnerManagerImpl};
use crate::execution::RunEngine;
use lens_execution_exports::{
    ChainStateController, ExecutionConfig, ExecutionError, ModelRegistry, RunnerController,
    RunnerManager,
};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use tracing::debug;

/// Structure gathering all elements needed by the runner thread
struct RunnerThread {
    /// data exchanged with the controller
    input_data: Arc<(Condvar, Mutex<RunnerInputData>)>,
    /// the engine executing requests
    engine: RunEngine,
}

impl RunnerThread {
    fn new(
        config: ExecutionConfig,
        input_data: Arc<(Condvar, Mutex<RunnerInputData>)>,
        registry: Arc<dyn ModelRegistry>,
        chain_state: Arc<dyn ChainStateController>,
    ) -> Self {
        RunnerThread {
            input_data,
            engine: RunEngine::new(config, registry, chain_state),
        }
    }

    /// Main loop of the runner thread.
    /// Waits on the condition variable for requests or a stop signal,
    /// then drains and processes all pending requests in arrival order.
    fn main_loop(&mut self) {
        loop {
            let (mut run_requests, mut series_requests) = {
                let mut input_data = self.input_data.1.lock();
                while !input_data.stop
                    && input_data.run_requests.is_empty()
                    && input_data.series_requests.is_empty()
                {
                    self.input_data.0.wait(&mut input_data);
                }
                if input_data.stop {
                    // cancel pending requests: their emitters are blocked on recv
                    let err = ExecutionError::ChannelError(
                        "request cancelled because the runner worker is closing".into(),
                    );
                    input_data.run_requests.cancel(err.clone());
                    input_data.series_requests.cancel(err);
                    return;
                }
                (
                    input_data.run_requests.take(),
                    input_data.series_requests.take(),
                )
            };

            while let Some(req) = run_requests.pop() {
                let (req, response_tx) = req.into_request_sender_pair();
                if response_tx.send(self.engine.execute_run(req)).is_err() {
                    debug!("could not send run outcome: emitter dropped the receiver");
                }
            }
            while let Some(req) = series_requests.pop() {
                let (req, response_tx) = req.into_request_sender_pair();
                if response_tx.send(self.engine.execute_series(req)).is_err() {
                    debug!("could not send series outcome: emitter dropped the receiver");
                }
            }
        }
    }
}

/// Launches a runner worker thread and returns a pair to interact with it.
///
/// # parameters
/// * `config`: execution configuration
/// * `registry`: the set of loaded models, fixed for the process lifetime
/// * `chain_state`: the external chain-state provider
///
/// # Returns
/// A pair `(runner_manager, runner_controller)` where:
/// * `runner_manager` allows stopping the worker
/// * `runner_controller` allows submitting run and series requests
pub fn start_runner_worker(
    config: ExecutionConfig,
    registry: Arc<dyn ModelRegistry>,
    chain_state: Arc<dyn ChainStateController>,
) -> (Box<dyn RunnerManager>, Box<dyn RunnerController>) {
    let input_data = Arc::new((
        Condvar::new(),
        Mutex::new(RunnerInputData::new(&config)),
    ));

    let thread_input_data = input_data.clone();
    let thread_handle = std::thread::spawn(move || {
        RunnerThread::new(config, thread_input_data, registry, chain_state).main_loop();
    });

    let manager = RunnerManagerImpl {
        input_data: input_data.clone(),
        thread_handle: Some(thread_handle),
    };
    let controller = RunnerControllerImpl { input_data };

    (Box::new(manager), Box::new(controller))
}
