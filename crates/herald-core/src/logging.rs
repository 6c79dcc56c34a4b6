//! tracing 初期化
//!
//! The library itself only emits `tracing` spans and events
//! (`mediator.send`, `mediator.publish`, registry and publisher events).
//! A binary installs a subscriber once with [`init`].

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::SetupError;

/// Install a stderr `fmt` subscriber.
///
/// `level` is the default verbosity and must be a plain level name
/// (`"info"`, `"debug"`, ...). With `honor_env`, directives from `RUST_LOG`
/// are layered on top of it, e.g. `RUST_LOG=herald_core::publish=trace`.
pub fn init(level: &str, honor_env: bool) -> Result<(), SetupError> {
    let default_level = parse_level(level)?;
    let builder = EnvFilter::builder().with_default_directive(default_level.into());
    let filter = if honor_env {
        builder
            .from_env()
            .map_err(|e| SetupError::Logger(format!("RUST_LOG is not a valid filter: {e}")))?
    } else {
        builder
            .parse("")
            .map_err(|e| SetupError::Logger(format!("invalid filter: {e}")))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| SetupError::Logger(format!("subscriber already installed: {e}")))
}

/// Parse a plain level name. Target directives are not accepted here, so a
/// misspelt level fails instead of silently filtering everything out.
pub fn parse_level(level: &str) -> Result<LevelFilter, SetupError> {
    let trimmed = level.trim();
    if trimmed.is_empty() {
        return Err(SetupError::Logger("log_level is empty".into()));
    }
    trimmed
        .parse::<LevelFilter>()
        .map_err(|_| SetupError::Logger(format!("unknown log_level '{level}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("error", LevelFilter::ERROR)]
    #[case("WARN", LevelFilter::WARN)]
    #[case(" debug ", LevelFilter::DEBUG)]
    #[case("off", LevelFilter::OFF)]
    fn level_names_parse(#[case] input: &str, #[case] expected: LevelFilter) {
        assert_eq!(parse_level(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("verbose")]
    #[case("herald_core=debug")]
    fn non_level_strings_are_rejected(#[case] input: &str) {
        assert!(matches!(parse_level(input), Err(SetupError::Logger(_))));
    }

    #[test]
    fn init_rejects_unknown_level_before_installing() {
        let err = init("verbose", true).unwrap_err();
        assert!(err.to_string().contains("verbose"));
    }
}
