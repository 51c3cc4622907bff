//! Tracing setup.
//!
//! One stderr layer in the configured format behind an `EnvFilter`;
//! `TIDEMARK_LOG` takes precedence over the verbosity-derived default
//! and over the config file's extra directives.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LoggingConfig};

pub fn init(verbosity: u8, logging: &LoggingConfig) {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity).into())
        .with_env_var("TIDEMARK_LOG")
        .from_env_lossy();
    if let Some(directives) = &logging.filter {
        for directive in directives.split(',') {
            if let Ok(parsed) = directive.trim().parse() {
                filter = filter.add_directive(parsed);
            }
        }
    }

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if logging.stdout {
        layers.push(build_stderr_layer(logging.format));
    }
    layers.push(Box::new(filter));

    // tolerate repeated init (tests, embedders with their own subscriber)
    let _ = Registry::default().with(layers).try_init();
}

fn build_stderr_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Compact => Box::new(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(true),
        ),
        LogFormat::Pretty => Box::new(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_target(true),
        ),
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true),
        ),
    }
}

fn level_from_verbosity(verbosity: u8) -> tracing::metadata::LevelFilter {
    match verbosity {
        0 => tracing::metadata::LevelFilter::ERROR,
        1 => tracing::metadata::LevelFilter::INFO,
        _ => tracing::metadata::LevelFilter::DEBUG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_from_verbosity(0), tracing::metadata::LevelFilter::ERROR);
        assert_eq!(level_from_verbosity(1), tracing::metadata::LevelFilter::INFO);
        assert_eq!(level_from_verbosity(4), tracing::metadata::LevelFilter::DEBUG);
    }
}
