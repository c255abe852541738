//! Wave scheduler.
//!
//! A wave is a set of stages whose inputs are all stored already, so its
//! stages may run in any order or concurrently. `run_wave` returns only when
//! every stage of the wave has finished, which is the barrier between waves.

#[cfg(not(feature = "async-scheduler"))]
pub use sync_impl::*;

#[cfg(feature = "async-scheduler")]
pub use async_impl::*;

/// Synchronous scheduler implementation (default, no tokio dependency)
#[cfg(not(feature = "async-scheduler"))]
mod sync_impl {
    use ramr_planner::stage::Stage;

    use crate::runtime::{ExecError, StageReport};

    /// Runs the stages of a wave one after another, in step order.
    pub struct WaveScheduler {
        max_parallel: usize,
    }

    impl WaveScheduler {
        pub fn new(max_parallel: usize) -> Result<Self, ExecError> {
            Ok(Self {
                max_parallel: max_parallel.max(1),
            })
        }

        pub fn max_parallel(&self) -> usize {
            self.max_parallel
        }

        /// Run every stage with `task`, stopping at the first failure.
        pub fn run_wave<F>(&self, stages: Vec<Stage>, task: F) -> Result<Vec<StageReport>, ExecError>
        where
            F: Fn(Stage) -> Result<StageReport, ExecError> + Send + Sync + 'static,
        {
            stages.into_iter().map(task).collect()
        }
    }
}

/// Asynchronous scheduler implementation (requires async-scheduler feature)
#[cfg(feature = "async-scheduler")]
mod async_impl {
    use std::future::Future;
    use std::sync::Arc;

    use tokio::runtime::{Handle, Runtime};
    use tokio::sync::Semaphore;

    use ramr_planner::stage::Stage;

    use crate::runtime::{ExecError, StageReport};

    /// Runs the stages of a wave on a tokio blocking pool, at most
    /// `max_parallel` at a time.
    ///
    /// Inside a tokio runtime the caller's runtime is reused; otherwise the
    /// scheduler owns one.
    pub struct WaveScheduler {
        runtime: Option<Runtime>,
        max_parallel: usize,
    }

    impl WaveScheduler {
        pub fn new(max_parallel: usize) -> Result<Self, ExecError> {
            let runtime = match Handle::try_current() {
                Ok(_) => None,
                Err(_) => Some(
                    tokio::runtime::Builder::new_multi_thread()
                        .enable_all()
                        .build()
                        .map_err(|e| ExecError::Scheduler(format!("tokio runtime: {e}")))?,
                ),
            };
            Ok(Self {
                runtime,
                max_parallel: max_parallel.max(1),
            })
        }

        pub fn max_parallel(&self) -> usize {
            self.max_parallel
        }

        /// Run every stage with `task`; all stages are awaited even when one
        /// fails, then the first error (in step order) is returned.
        pub fn run_wave<F>(&self, stages: Vec<Stage>, task: F) -> Result<Vec<StageReport>, ExecError>
        where
            F: Fn(Stage) -> Result<StageReport, ExecError> + Send + Sync + 'static,
        {
            let task = Arc::new(task);
            let semaphore = Arc::new(Semaphore::new(self.max_parallel));

            let wave = async move {
                let mut handles = Vec::with_capacity(stages.len());
                for stage in stages {
                    let permit = semaphore
                        .clone()
                        .acquire_owned()
                        .await
                        .map_err(|e| ExecError::Scheduler(format!("semaphore: {e}")))?;
                    let task = Arc::clone(&task);
                    handles.push(tokio::task::spawn_blocking(move || {
                        let _permit = permit; // Hold permit for duration of task
                        task(stage)
                    }));
                }

                let mut outcomes = Vec::with_capacity(handles.len());
                for handle in handles {
                    let outcome = handle
                        .await
                        .map_err(|e| ExecError::Scheduler(format!("stage task join: {e}")))?;
                    outcomes.push(outcome);
                }
                outcomes
                    .into_iter()
                    .collect::<Result<Vec<StageReport>, ExecError>>()
            };

            match (Handle::try_current(), &self.runtime) {
                (Ok(handle), _) => block_outside_runtime(&handle, wave),
                (Err(_), Some(runtime)) => runtime.block_on(wave),
                (Err(_), None) => {
                    let runtime = tokio::runtime::Builder::new_multi_thread()
                        .enable_all()
                        .build()
                        .map_err(|e| ExecError::Scheduler(format!("tokio runtime: {e}")))?;
                    runtime.block_on(wave)
                }
            }
        }
    }

    /// A runtime thread may not block on a future, so the wave is driven from
    /// a plain thread against the caller's runtime handle. Stage work runs on
    /// the blocking pool, which works for current-thread runtimes as well.
    fn block_outside_runtime<T, Fut>(handle: &Handle, fut: Fut) -> Result<T, ExecError>
    where
        Fut: Future<Output = Result<T, ExecError>> + Send,
        T: Send,
    {
        std::thread::scope(|scope| {
            scope
                .spawn(|| handle.block_on(fut))
                .join()
                .map_err(|_| ExecError::Scheduler("wave driver thread panicked".into()))?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramr_core::expr::OperatorKind;
    use ramr_core::id::StepId;
    use ramr_planner::stage::{OperatorSpec, Stage};

    use crate::runtime::{ExecError, StageReport};

    fn scan(step: u64) -> Stage {
        Stage {
            step: StepId::new(step),
            spec: OperatorSpec::Scan {
                relation: format!("R{step}"),
            },
            label: format!("R{step}"),
            depends_on: vec![],
        }
    }

    fn report(stage: &Stage) -> StageReport {
        StageReport {
            step: stage.step,
            kind: OperatorKind::Scan,
            records_in: 0,
            records_out: 0,
            attempts: 1,
            elapsed_ms: 0,
        }
    }

    #[test]
    fn runs_every_stage_of_a_wave() {
        let sched = WaveScheduler::new(2).unwrap();
        let reports = sched
            .run_wave(vec![scan(3), scan(4), scan(5)], |s| Ok(report(&s)))
            .unwrap();
        let steps: Vec<u64> = reports.iter().map(|r| r.step.get()).collect();
        assert_eq!(steps, vec![3, 4, 5]);
    }

    #[test]
    fn wave_fails_if_any_stage_fails() {
        let sched = WaveScheduler::new(1).unwrap();
        let out = sched.run_wave(vec![scan(3), scan(4)], |s| {
            if s.step.get() == 4 {
                Err(ExecError::Invalid("boom".into()))
            } else {
                Ok(report(&s))
            }
        });
        assert!(out.is_err());
    }

    #[cfg(feature = "async-scheduler")]
    #[tokio::test]
    async fn runs_inside_a_current_thread_runtime() {
        let sched = WaveScheduler::new(2).unwrap();
        let reports = sched
            .run_wave(vec![scan(3), scan(4)], |s| Ok(report(&s)))
            .unwrap();
        assert_eq!(reports.len(), 2);
    }

    #[cfg(feature = "async-scheduler")]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn runs_inside_a_multi_thread_runtime() {
        let sched = WaveScheduler::new(1).unwrap();
        let out = sched.run_wave(vec![scan(3), scan(4)], |s| {
            if s.step.get() == 3 {
                Err(ExecError::Invalid("boom".into()))
            } else {
                Ok(report(&s))
            }
        });
        assert!(matches!(out, Err(ExecError::Invalid(_))));
    }
}
