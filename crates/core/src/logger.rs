use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{mpsc, Mutex, MutexGuard, OnceLock, PoisonError};

use chrono::Local;

use crate::types::Level;

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

struct Logger {
    sink: Sink,
    tx: Option<mpsc::Sender<String>>,
    level: Level,
}

enum Sink {
    None,
    File(File),
    Stderr,
}

fn logger() -> &'static Mutex<Logger> {
    LOGGER.get_or_init(|| {
        Mutex::new(Logger { sink: Sink::None, tx: None, level: Level::Info })
    })
}

fn lock() -> MutexGuard<'static, Logger> {
    logger().lock().unwrap_or_else(PoisonError::into_inner)
}

/// Log to `<log_dir>/jitter.log`. Clears the file.
pub fn init(log_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(log_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_dir.join("jitter.log"))?;
    lock().sink = Sink::File(file);
    Ok(())
}

/// Log to stderr instead of a file.
pub fn init_stderr() {
    lock().sink = Sink::Stderr;
}

/// Mirror every emitted line to a channel.
pub fn set_sender(tx: mpsc::Sender<String>) {
    lock().tx = Some(tx);
}

pub fn set_level(level: Level) {
    lock().level = level;
}

fn write_log(level: Level, prefix: &str, msg: &str) {
    let mut l = lock();
    if level < l.level {
        return;
    }
    if matches!(l.sink, Sink::None) && l.tx.is_none() {
        return;
    }

    let ts = Local::now().format("%H:%M:%S");
    let line = if prefix.is_empty() {
        format!("[{}] [{}] {}", ts, level.as_str(), msg)
    } else {
        format!("[{}] [{}] [{}] {}", ts, level.as_str(), prefix, msg)
    };

    match &mut l.sink {
        Sink::File(file) => {
            writeln!(file, "{}", line).ok();
        }
        Sink::Stderr => eprintln!("{}", line),
        Sink::None => {}
    }
    // Drop the sender once its receiver is gone.
    let gone = l.tx.as_ref().map_or(false, |tx| tx.send(line).is_err());
    if gone {
        l.tx = None;
    }
}

pub fn debug(msg: &str) {
    write_log(Level::Debug, "", msg);
}

pub fn info(msg: &str) {
    write_log(Level::Info, "", msg);
}

pub fn warn(msg: &str) {
    write_log(Level::Warn, "", msg);
}

pub fn error(msg: &str) {
    write_log(Level::Error, "", msg);
}

pub fn debug_p(prefix: &str, msg: &str) {
    write_log(Level::Debug, prefix, msg);
}

pub fn info_p(prefix: &str, msg: &str) {
    write_log(Level::Info, prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log(Level::Warn, prefix, msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log(Level::Error, prefix, msg);
}
