// Copyright 2023 The RocketMQ Rust Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod simple_scheduler {
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::atomic::AtomicU64;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use anyhow::Result;
    use parking_lot::Mutex;
    use tokio::sync::Semaphore;
    use tokio::task::JoinHandle;
    use tokio::time::Duration;
    use tokio::time::Instant;
    use tokio::time::MissedTickBehavior;
    use tokio::time::{self};
    use tokio_util::sync::CancellationToken;
    use tracing::debug;
    use tracing::error;
    use tracing::info;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ScheduleMode {
        /// Align the beats, and they might pile up.
        FixedRate,
        /// Sleep only after the task is completed, and there will be no accumulation.
        FixedDelay,
        /// Align the beats, but skip if the last run is not yet completed.
        FixedRateNoOverlap,
    }

    pub type TaskId = u64;

    struct TaskInfo {
        name: &'static str,
        cancel_token: CancellationToken,
        handle: JoinHandle<()>,
    }

    /// Owns a set of periodic background tasks and cancels them as a group.
    #[derive(Clone, Default)]
    pub struct ScheduledTaskManager {
        tasks: Arc<Mutex<HashMap<TaskId, TaskInfo>>>,
        counter: Arc<AtomicU64>,
    }

    impl ScheduledTaskManager {
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers a periodic task and spawns its driver on the current runtime.
        ///
        /// `task_fn` is called once per beat with a child `CancellationToken`; an `Err`
        /// is logged and does not stop later beats.
        pub fn add_scheduled_task<F, Fut>(
            &self,
            name: &'static str,
            mode: ScheduleMode,
            initial_delay: Duration,
            period: Duration,
            task_fn: F,
        ) -> TaskId
        where
            F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<()>> + Send + 'static,
        {
            let id = self.counter.fetch_add(1, Ordering::Relaxed);
            let token = CancellationToken::new();
            let task_token = token.clone();
            let task_fn = Arc::new(task_fn);

            let handle = tokio::spawn(async move {
                match mode {
                    ScheduleMode::FixedDelay => {
                        tokio::select! {
                            _ = task_token.cancelled() => return,
                            _ = time::sleep(initial_delay) => {}
                        }
                        loop {
                            tokio::select! {
                                _ = task_token.cancelled() => break,
                                _ = async {
                                    if let Err(e) = task_fn(task_token.child_token()).await {
                                        error!("Scheduled task {} ({}) failed: {:?}", name, id, e);
                                    }
                                    time::sleep(period).await;
                                } => {}
                            }
                        }
                    }
                    ScheduleMode::FixedRate | ScheduleMode::FixedRateNoOverlap => {
                        let mut ticker = time::interval_at(Instant::now() + initial_delay, period);
                        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        // Permit=1 keeps runs from overlapping.
                        let gate = Arc::new(Semaphore::new(1));
                        loop {
                            tokio::select! {
                                _ = task_token.cancelled() => break,
                                _ = ticker.tick() => {
                                    let permit = if mode == ScheduleMode::FixedRateNoOverlap {
                                        match gate.clone().try_acquire_owned() {
                                            Ok(permit) => Some(permit),
                                            Err(_) => {
                                                debug!("Scheduled task {} ({}) skipped, previous run still active", name, id);
                                                continue;
                                            }
                                        }
                                    } else {
                                        None
                                    };
                                    let fut = task_fn(task_token.child_token());
                                    tokio::spawn(async move {
                                        if let Err(e) = fut.await {
                                            error!("Scheduled task {} ({}) failed: {:?}", name, id, e);
                                        }
                                        drop(permit);
                                    });
                                }
                            }
                        }
                    }
                }
                info!("Scheduled task {} ({}) cancelled gracefully", name, id);
            });

            self.tasks.lock().insert(
                id,
                TaskInfo {
                    name,
                    cancel_token: token,
                    handle,
                },
            );
            id
        }

        /// Graceful cancellation
        pub fn cancel_task(&self, id: TaskId) -> bool {
            match self.tasks.lock().remove(&id) {
                Some(info) => {
                    info.cancel_token.cancel();
                    true
                }
                None => false,
            }
        }

        /// Roughly abort
        pub fn abort_task(&self, id: TaskId) -> bool {
            match self.tasks.lock().remove(&id) {
                Some(info) => {
                    info.handle.abort();
                    true
                }
                None => false,
            }
        }

        /// Cancels every task and waits for their drivers to exit.
        pub async fn cancel_all(&self) {
            let drained: Vec<TaskInfo> = self.tasks.lock().drain().map(|(_, info)| info).collect();
            for info in &drained {
                info.cancel_token.cancel();
            }
            for info in drained {
                if let Err(e) = info.handle.await {
                    error!("Scheduled task {} did not stop cleanly: {}", info.name, e);
                }
            }
        }

        pub fn task_count(&self) -> usize {
            self.tasks.lock().len()
        }
    }
}
