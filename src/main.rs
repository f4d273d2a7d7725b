use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitCode};

use anyhow::{bail, Context, Result};

use jitter_core::{format_duration, logger, ExecutionError, Executor, Level, Settings};

/// Exit code used when the caller's timeout runs out, as with coreutils `timeout`.
const TIMEOUT_EXIT: u8 = 124;

const USAGE: &str = "usage: jitter [--config FILE] [--max DURATION] [--seed N] [--timeout SECS] \
[--sample N] [--verbose] [-- COMMAND ARGS...]";

#[derive(Debug, Default, PartialEq)]
struct Cli {
    config: Option<PathBuf>,
    max: Option<String>,
    seed: Option<u64>,
    timeout: Option<f64>,
    sample: Option<usize>,
    verbose: bool,
    help: bool,
    command: Vec<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().with_context(|| format!("{} needs a value", flag));
        match arg.as_str() {
            "--config" => cli.config = Some(PathBuf::from(value("--config")?)),
            "--max" => cli.max = Some(value("--max")?),
            "--seed" => {
                let v = value("--seed")?;
                cli.seed = Some(v.parse().with_context(|| format!("bad --seed '{}'", v))?);
            }
            "--timeout" => {
                let v = value("--timeout")?;
                cli.timeout = Some(v.parse().with_context(|| format!("bad --timeout '{}'", v))?);
            }
            "--sample" => {
                let v = value("--sample")?;
                cli.sample = Some(v.parse().with_context(|| format!("bad --sample '{}'", v))?);
            }
            "-v" | "--verbose" => cli.verbose = true,
            "-h" | "--help" => cli.help = true,
            "--" => {
                cli.command = args.by_ref().collect();
                break;
            }
            other => bail!("unknown argument '{}'\n{}", other, USAGE),
        }
    }
    Ok(cli)
}

/// Command-line flags win over the settings file.
fn merge(cli: &Cli, mut settings: Settings) -> Settings {
    if let Some(max) = &cli.max {
        settings.max_duration = max.clone();
    }
    if cli.seed.is_some() {
        settings.seed = cli.seed;
    }
    if cli.timeout.is_some() {
        settings.timeout_secs = cli.timeout;
    }
    if cli.verbose {
        settings.log_level = Level::Debug;
    }
    settings
}

fn main() -> Result<ExitCode> {
    let cli = parse_args(std::env::args().skip(1))?;
    if cli.help {
        println!("{}", USAGE);
        return Ok(ExitCode::SUCCESS);
    }

    let config_path = match &cli.config {
        Some(p) => p.clone(),
        None => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("jitter.json"),
    };
    let settings = merge(&cli, Settings::load(&config_path)?);

    // Init logger
    match &settings.log_dir {
        Some(dir) => logger::init(dir)
            .with_context(|| format!("cannot open log dir {}", dir.display()))?,
        None => logger::init_stderr(),
    }
    logger::set_level(settings.log_level);

    let executor = Executor::from_settings(&settings)?;
    let timeout = settings.timeout()?;

    if let Some(n) = cli.sample {
        for _ in 0..n {
            println!("{}", format_duration(executor.next_delay()));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let Some((program, rest)) = cli.command.split_first() else {
        bail!("no command given\n{}", USAGE);
    };
    logger::info(&format!(
        "running '{}' within {}",
        program,
        format_duration(executor.budget())
    ));

    let program = program.clone();
    let rest = rest.to_vec();
    // A timed-out command is not killed; it keeps running after we exit.
    let outcome = executor.execute(move || Command::new(&program).args(&rest).status(), timeout);

    match outcome {
        Ok(status) => {
            logger::info(&format!("command exited: {}", status));
            let code = status.code().and_then(|c| u8::try_from(c).ok()).unwrap_or(1);
            Ok(ExitCode::from(code))
        }
        Err(ExecutionError::Timeout { waited }) => {
            logger::warn(&format!("timed out after {}", format_duration(waited)));
            Ok(ExitCode::from(TIMEOUT_EXIT))
        }
        Err(e) => Err(run_failure(e)),
    }
}

/// The command's own error becomes the root of the chain, so `{:#}` and
/// `root_cause` reach it.
fn run_failure(err: ExecutionError<io::Error>) -> anyhow::Error {
    match err {
        ExecutionError::Failed { cause } => {
            anyhow::Error::new(io::Error::new(cause.kind(), cause.to_string()))
                .context("command did not run")
        }
        other => anyhow::Error::new(other).context("command did not run"),
    }
}
