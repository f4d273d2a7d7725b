use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::duration::{format_duration, IntoBudget};
use crate::error::{ConfigError, ExecutionError};
use crate::handle::{Outcome, ResultHandle};
use crate::logger;
use crate::planner::DelayPlanner;
use crate::settings::Settings;

const WORKER_NAME: &str = "jitter-worker";

/// What a worker hands back: the action's own result, or a panic message.
type Finished<T, E> = Result<Result<T, E>, String>;

/// Runs one action after a random delay drawn from `[0, budget)`.
///
/// Each executor owns its own generator, so two executors built with the
/// same budget and seed draw the same delays in the same order.
#[derive(Debug)]
pub struct Executor {
    budget: Duration,
    planner: Mutex<DelayPlanner>,
}

impl Executor {
    /// `max_duration` is a `Duration`, a string such as `"1.5m"`, or seconds
    /// as `f64`. Malformed or negative values fail here, never later.
    pub fn new(max_duration: impl IntoBudget, seed: Option<u64>) -> Result<Self, ConfigError> {
        let planner = DelayPlanner::new(max_duration, seed)?;
        let budget = planner.budget();
        logger::debug_p(
            "executor",
            &format!("budget {} seed {:?}", format_duration(budget), seed),
        );
        Ok(Self { budget, planner: Mutex::new(planner) })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Self::new(settings.budget()?, settings.seed)
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Draw the next delay without running anything.
    pub fn next_delay(&self) -> Duration {
        self.planner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sample()
    }

    /// Wait a random delay on the calling thread, then run `action` there.
    ///
    /// No worker is involved, so the action may borrow local data or hold
    /// values that are not `Send`. A panicking action unwinds into the
    /// caller as usual.
    pub fn execute_inline<T, E, F>(&self, action: F) -> Outcome<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let delay = self.next_delay();
        logger::debug_p("executor", &format!("sleeping {:?} before action", delay));
        thread::sleep(delay);
        action().map_err(ExecutionError::failed)
    }

    /// Wait a random delay, then run `action` and return its value.
    ///
    /// Without a timeout this is `execute_inline`. The `Send + 'static`
    /// bounds exist for the timed case; callers that never pass a timeout
    /// and need to borrow should call `execute_inline` directly.
    ///
    /// With a timeout, the delay and the action run on a worker thread and
    /// the caller waits at most `timeout` in total. Running out of time
    /// yields `ExecutionError::Timeout`, but the action is NOT interrupted:
    /// it keeps running on its worker to completion and its outcome is
    /// discarded. Panics on the worker come back as `Panicked`.
    pub fn execute<T, E, F>(&self, action: F, timeout: Option<Duration>) -> Outcome<T, E>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let Some(timeout) = timeout else {
            return self.execute_inline(action);
        };
        let delay = self.next_delay();

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name(WORKER_NAME.into())
            .spawn(move || {
                // The caller may have stopped waiting; nobody to tell then.
                tx.send(run(delay, action)).ok();
            })
            .map_err(|e| spawn_failed(&e))?;

        let started = Instant::now();
        match rx.recv_timeout(timeout) {
            Ok(finished) => settle(finished),
            Err(RecvTimeoutError::Timeout) => {
                logger::warn_p(
                    "executor",
                    &format!(
                        "gave up after {:?} (delay {:?}), action left running",
                        started.elapsed(),
                        delay
                    ),
                );
                Err(ExecutionError::Timeout { waited: timeout })
            }
            Err(RecvTimeoutError::Disconnected) => Err(ExecutionError::Panicked {
                message: "worker exited without an outcome".into(),
            }),
        }
    }

    /// Start the delay-then-run sequence on a worker thread and return at
    /// once with a pending handle.
    ///
    /// The delay is drawn here, on the caller's thread, so a seeded
    /// executor hands out delays in call order. Failures and panics are
    /// stored in the handle; nothing is raised on the worker.
    pub fn execute_async<T, E, F>(&self, action: F) -> ResultHandle<T, E>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + Sync + 'static,
    {
        let delay = self.next_delay();
        let handle = ResultHandle::pending();
        let writer = handle.clone();

        let spawned = thread::Builder::new()
            .name(WORKER_NAME.into())
            .spawn(move || {
                logger::debug_p("executor", &format!("worker sleeping {:?}", delay));
                writer.complete(settle(run(delay, action)));
            });
        if let Err(e) = spawned {
            handle.complete(Err(spawn_failed(&e)));
        }
        handle
    }
}

fn run<T, E, F>(delay: Duration, action: F) -> Finished<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    thread::sleep(delay);
    panic::catch_unwind(AssertUnwindSafe(action)).map_err(panic_message)
}

fn settle<T, E>(finished: Finished<T, E>) -> Outcome<T, E> {
    match finished {
        Ok(Ok(value)) => {
            logger::debug_p("executor", "action succeeded");
            Ok(value)
        }
        Ok(Err(cause)) => {
            logger::debug_p("executor", "action failed");
            Err(ExecutionError::failed(cause))
        }
        Err(message) => {
            logger::warn_p("executor", &format!("action panicked: {}", message));
            Err(ExecutionError::Panicked { message })
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".into()
    }
}

fn spawn_failed<E>(err: &std::io::Error) -> ExecutionError<E> {
    logger::error_p("executor", &format!("cannot spawn worker: {}", err));
    ExecutionError::Spawn { message: err.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;
    use std::sync::{Arc, Barrier};

    #[test]
    fn zero_budget_runs_immediately() {
        let ex = Executor::new("0s", None).unwrap();
        let started = Instant::now();
        let v: Result<i32, ExecutionError<String>> = ex.execute(|| Ok(42), None);
        assert_eq!(v.unwrap(), 42);
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn returns_value_unchanged() {
        let ex = Executor::new(Duration::from_millis(5), Some(1)).unwrap();
        let payload = vec![1u8, 2, 3];
        let expected = payload.clone();
        let v: Result<Vec<u8>, ExecutionError<()>> = ex.execute(move || Ok(payload), None);
        assert_eq!(v.unwrap(), expected);
    }

    #[test]
    fn action_error_is_wrapped() {
        let ex = Executor::new("0s", None).unwrap();
        let err = ex
            .execute(|| Err::<(), _>("disk full".to_string()), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Failed);
        assert_eq!(err.cause().map(String::as_str), Some("disk full"));
    }

    #[test]
    fn timed_execute_returns_value_within_timeout() {
        let ex = Executor::new(Duration::from_millis(10), Some(3)).unwrap();
        let v: Result<&str, ExecutionError<()>> =
            ex.execute(|| Ok("done"), Some(Duration::from_secs(5)));
        assert_eq!(v.unwrap(), "done");
    }

    #[test]
    fn zero_timeout_with_nonzero_budget_times_out() {
        let ex = Executor::new("1s", Some(9)).unwrap();
        let (go, wait) = mpsc::channel::<()>();
        let err = ex
            .execute(
                move || {
                    wait.recv().ok();
                    Ok::<_, ()>(1)
                },
                Some(Duration::ZERO),
            )
            .unwrap_err();
        assert!(err.is_timeout());
        drop(go);
    }

    #[test]
    fn timed_execute_reports_panic() {
        let ex = Executor::new("0s", None).unwrap();
        let err = ex
            .execute(|| -> Result<(), ()> { panic!("kaboom") }, Some(Duration::from_secs(5)))
            .unwrap_err();
        match err {
            ExecutionError::Panicked { message } => assert_eq!(message, "kaboom"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn async_returns_pending_then_value() {
        let ex = Executor::new(Duration::from_millis(20), Some(7)).unwrap();
        let (go, wait) = mpsc::channel::<()>();
        let handle = ex.execute_async(move || {
            wait.recv().ok();
            Ok::<_, String>("x")
        });

        let err = handle.get(Some(Duration::ZERO)).unwrap_err();
        assert!(err.is_timeout());
        assert!(!handle.is_finished());

        go.send(()).unwrap();
        assert_eq!(handle.get(None).unwrap(), "x");
        assert_eq!(handle.get(Some(Duration::ZERO)).unwrap(), "x");
    }

    #[test]
    fn async_failure_is_stored_not_raised() {
        let ex = Executor::new("0s", None).unwrap();
        let handle = ex.execute_async(|| Err::<u8, _>(std::io::Error::other("nope")));
        let err = handle.get(Some(Duration::from_secs(5))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Failed);
        assert_eq!(err.cause().map(|e| e.to_string()), Some("nope".into()));
    }

    #[test]
    fn async_panic_is_stored() {
        let ex = Executor::new("0s", None).unwrap();
        let handle = ex.execute_async(|| -> Result<u8, ()> { panic!("{}", String::from("owned")) });
        let err = handle.get(Some(Duration::from_secs(5))).unwrap_err();
        match err {
            ExecutionError::Panicked { message } => assert_eq!(message, "owned"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn inline_execute_accepts_borrowed_and_local_state() {
        use std::cell::Cell;
        use std::rc::Rc;

        let ex = Executor::new(Duration::from_millis(5), Some(2)).unwrap();
        let calls = Rc::new(Cell::new(0u32));
        let words = vec!["a", "b", "c"];
        let counter = Rc::clone(&calls);
        let joined: Result<String, ExecutionError<()>> = ex.execute_inline(|| {
            counter.set(counter.get() + 1);
            Ok(words.join("-"))
        });
        assert_eq!(joined.unwrap(), "a-b-c");
        assert_eq!(calls.get(), 1);
        assert_eq!(words.len(), 3);
    }

    #[test]
    fn untimed_execute_draws_same_delays_as_inline() {
        let a = Executor::new("10s", Some(4)).unwrap();
        let b = Executor::new("10s", Some(4)).unwrap();
        a.execute_inline(|| Ok::<_, ()>(())).ok();
        b.next_delay();
        assert_eq!(a.next_delay(), b.next_delay());
    }

    #[test]
    fn concurrent_readers_agree() {
        let ex = Executor::new(Duration::from_millis(30), None).unwrap();
        let handle = ex.execute_async(|| Ok::<_, ()>(String::from("shared")));
        let barrier = Arc::new(Barrier::new(8));
        let readers: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    handle.get(None)
                })
            })
            .collect();
        for r in readers {
            assert_eq!(r.join().unwrap().unwrap(), "shared");
        }
    }

    #[test]
    fn same_seed_same_delays() {
        let a = Executor::new("30s", Some(11)).unwrap();
        let b = Executor::new("30s", Some(11)).unwrap();
        let xs: Vec<_> = (0..20).map(|_| a.next_delay()).collect();
        let ys: Vec<_> = (0..20).map(|_| b.next_delay()).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|d| *d < a.budget()));
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(Executor::new("5 minutes", None).is_err());
        assert!(Executor::new(-2.0, Some(1)).is_err());
        let settings = Settings { max_duration: "nope".into(), ..Settings::default() };
        assert!(Executor::from_settings(&settings).is_err());
    }

    #[test]
    fn executor_is_shareable() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<Executor>();
        assert_send_sync::<ResultHandle<String, std::io::Error>>();
    }
}
