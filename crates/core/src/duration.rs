//! Human-readable duration strings: `5s`, `1.5m`, `1h`.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::error::ConfigError;

const PATTERN: &str = r"^([0-9]+(?:\.[0-9]+)?)(s|m|h)$";

fn grammar() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PATTERN).ok()).as_ref()
}

/// Parse `<number>[.<fraction>](s|m|h)` into a `Duration`.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let caps = grammar()
        .and_then(|re| re.captures(input))
        .ok_or_else(|| ConfigError::malformed(input))?;

    let magnitude: f64 = caps[1]
        .parse()
        .map_err(|_| ConfigError::malformed(input))?;
    let unit = match &caps[2] {
        "s" => 1.0,
        "m" => 60.0,
        "h" => 3600.0,
        _ => return Err(ConfigError::malformed(input)),
    };

    Duration::try_from_secs_f64(magnitude * unit).map_err(|_| ConfigError::malformed(input))
}

/// Render a duration in seconds, in a form `parse_duration` accepts.
pub fn format_duration(d: Duration) -> String {
    format!("{}s", d.as_secs_f64())
}

/// Validate a float-seconds value (e.g. a timeout) as a `Duration`.
pub fn from_secs(seconds: f64) -> Result<Duration, ConfigError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ConfigError::Negative { seconds });
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| ConfigError::Negative { seconds })
}

/// Anything accepted as a delay budget: a `Duration`, a duration string,
/// or seconds as `f64`.
pub trait IntoBudget {
    fn into_budget(self) -> Result<Duration, ConfigError>;
}

impl IntoBudget for Duration {
    fn into_budget(self) -> Result<Duration, ConfigError> {
        Ok(self)
    }
}

impl IntoBudget for &str {
    fn into_budget(self) -> Result<Duration, ConfigError> {
        parse_duration(self)
    }
}

impl IntoBudget for String {
    fn into_budget(self) -> Result<Duration, ConfigError> {
        parse_duration(&self)
    }
}

impl IntoBudget for &String {
    fn into_budget(self) -> Result<Duration, ConfigError> {
        parse_duration(self)
    }
}

impl IntoBudget for f64 {
    fn into_budget(self) -> Result<Duration, ConfigError> {
        from_secs(self)
    }
}
