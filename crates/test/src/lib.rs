//! Helpers shared by the scenario suite.

use std::sync::mpsc;

use libtest_mimic::Failed;

/// Fail the trial with `msg` unless `cond` holds.
pub fn ensure(cond: bool, msg: impl Into<String>) -> Result<(), Failed> {
    if cond {
        Ok(())
    } else {
        let msg: String = msg.into();
        Err(msg.into())
    }
}

/// An action that blocks until the returned gate is opened (or dropped),
/// then yields `value`. Keeps a background run pending for as long as a
/// scenario needs.
pub fn gated<T: Send + 'static>(
    value: T,
) -> (Gate, impl FnOnce() -> Result<T, String> + Send + 'static) {
    let (tx, rx) = mpsc::channel::<()>();
    let action = move || {
        rx.recv().ok();
        Ok(value)
    };
    (Gate(tx), action)
}

pub struct Gate(mpsc::Sender<()>);

impl Gate {
    pub fn open(self) {
        self.0.send(()).ok();
    }
}
