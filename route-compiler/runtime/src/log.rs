use anyhow::{anyhow, bail, Result};
use tracing_subscriber::EnvFilter;

/// A validated `tracing` filter directive, e.g. `route_compiler=debug,warn`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFilter(String);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

// === impl LogFilter ===

impl LogFilter {
    fn to_env_filter(&self) -> EnvFilter {
        // The directive was validated when parsed.
        EnvFilter::new(&self.0)
    }
}

impl std::str::FromStr for LogFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        EnvFilter::try_new(s)?;
        Ok(Self(s.to_string()))
    }
}

// === impl LogFormat ===

impl LogFormat {
    /// Installs the global subscriber. Logs are written to stderr so that
    /// stdout carries only compiled output.
    pub fn try_init(self, filter: LogFilter) -> Result<()> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter.to_env_filter())
            .with_writer(std::io::stderr);
        match self {
            Self::Plain => builder.try_init(),
            Self::Json => builder.json().try_init(),
        }
        .map_err(|error| anyhow!(error))
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            _ => bail!("invalid log format: {s}; expected 'plain' or 'json'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!("plain".parse::<LogFormat>().unwrap(), LogFormat::Plain);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn validates_filters() {
        assert!("route_compiler=info,warn".parse::<LogFilter>().is_ok());
        assert!("route_compiler=loud".parse::<LogFilter>().is_err());
    }
}
