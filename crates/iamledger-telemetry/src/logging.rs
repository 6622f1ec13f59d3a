//! Subscriber setup.
//!
//! One `fmt` layer, one env filter. The writer is picked from
//! [`LogTarget`]; the event format from [`LogFormat`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{TelemetryError, TelemetryResult};

/// How often a file target starts a new file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileRotation {
    /// One file per day.
    #[default]
    Daily,
    /// One file per hour.
    Hourly,
    /// A single file.
    Never,
}

impl From<FileRotation> for Rotation {
    fn from(rotation: FileRotation) -> Self {
        match rotation {
            FileRotation::Daily => Self::DAILY,
            FileRotation::Hourly => Self::HOURLY,
            FileRotation::Never => Self::NEVER,
        }
    }
}

/// Event layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, for reading at a terminal.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
    /// `tracing-subscriber`'s default layout.
    Full,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "full" => Ok(Self::Full),
            other => Err(TelemetryError::UnknownFormat(other.to_owned())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
            Self::Full => "full",
        })
    }
}

/// Where events are written.
///
/// Stderr is the default so command payloads on stdout stay parseable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
    /// Rolling files `{directory}/{prefix}.{period}`.
    File {
        /// Directory, created on setup.
        directory: PathBuf,
        /// File name prefix.
        prefix: String,
        /// Rotation period.
        rotation: FileRotation,
    },
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Base filter, e.g. `info` or `iamledger_core=debug`.
    pub level: String,
    /// Event layout.
    pub format: LogFormat,
    /// Destination.
    pub target: LogTarget,
    /// Prefix events with a timestamp.
    pub timestamps: bool,
    /// Colorize output. Ignored for file targets.
    pub ansi: bool,
    /// Extra filter directives layered over `level`.
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

impl LogConfig {
    /// Compact stderr logging at `level`.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            timestamps: true,
            ansi: true,
            directives: Vec::new(),
        }
    }

    /// Use `format` for events.
    #[must_use]
    pub fn with_format(self, format: LogFormat) -> Self {
        Self { format, ..self }
    }

    /// Layer one more filter directive over the level.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Omit timestamps.
    #[must_use]
    pub fn without_timestamps(self) -> Self {
        Self {
            timestamps: false,
            ..self
        }
    }

    /// Write to rolling files instead of a terminal.
    #[must_use]
    pub fn log_to_files(
        self,
        directory: impl Into<PathBuf>,
        prefix: impl Into<String>,
        rotation: FileRotation,
    ) -> Self {
        Self {
            target: LogTarget::File {
                directory: directory.into(),
                prefix: prefix.into(),
                rotation,
            },
            ansi: false,
            ..self
        }
    }

    fn filter(&self) -> TelemetryResult<EnvFilter> {
        let invalid = |directive: &str, e: &dyn fmt::Display| TelemetryError::InvalidFilter {
            directive: directive.to_owned(),
            reason: e.to_string(),
        };

        let mut filter = EnvFilter::try_new(&self.level).map_err(|e| invalid(&self.level, &e))?;
        for directive in &self.directives {
            let parsed = directive
                .parse()
                .map_err(|e: tracing_subscriber::filter::ParseError| invalid(directive, &e))?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }

    fn writer(&self) -> TelemetryResult<BoxMakeWriter> {
        Ok(match &self.target {
            LogTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogTarget::File {
                directory,
                prefix,
                rotation,
            } => {
                std::fs::create_dir_all(directory).map_err(|source| {
                    TelemetryError::LogDirectory {
                        path: directory.clone(),
                        source,
                    }
                })?;
                BoxMakeWriter::new(RollingFileAppender::new(
                    (*rotation).into(),
                    directory,
                    prefix,
                ))
            },
        })
    }

    fn layer<S>(&self) -> TelemetryResult<Box<dyn Layer<S> + Send + Sync>>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let ansi = self.ansi && !matches!(self.target, LogTarget::File { .. });
        let base = tracing_subscriber::fmt::layer()
            .with_writer(self.writer()?)
            .with_ansi(ansi)
            .with_target(true);

        let layer = match (self.format, self.timestamps) {
            (LogFormat::Pretty, true) => base.pretty().boxed(),
            (LogFormat::Pretty, false) => base.pretty().without_time().boxed(),
            (LogFormat::Compact, true) => base.compact().boxed(),
            (LogFormat::Compact, false) => base.compact().without_time().boxed(),
            (LogFormat::Json, true) => base.json().boxed(),
            (LogFormat::Json, false) => base.json().without_time().boxed(),
            (LogFormat::Full, true) => base.boxed(),
            (LogFormat::Full, false) => base.without_time().boxed(),
        };
        Ok(layer)
    }
}

/// Build from the `[logging]` config section.
///
/// `iamledger-config` validation has already rejected unknown formats, so an
/// unparseable one falls back to compact.
#[cfg(feature = "config")]
impl From<&iamledger_config::LoggingSection> for LogConfig {
    fn from(section: &iamledger_config::LoggingSection) -> Self {
        Self {
            format: section.format.parse().unwrap_or_default(),
            directives: section.directives.clone(),
            ..Self::new(section.level.clone())
        }
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// [`TelemetryError::InvalidFilter`] on a bad level or directive,
/// [`TelemetryError::LogDirectory`] if the file target cannot be created,
/// [`TelemetryError::AlreadyInstalled`] if a subscriber is already set.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.filter()?;
    tracing_subscriber::registry()
        .with(config.layer()?.with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInstalled(e.to_string()))
}

/// Install compact stderr logging at `info`.
///
/// # Errors
///
/// As [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::default())
}
