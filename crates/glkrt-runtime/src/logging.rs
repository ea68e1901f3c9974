#![forbid(unsafe_code)]

//! Subscriber installation.
//!
//! The runtime only emits `tracing` events; nothing is printed until a
//! subscriber is installed. [`init`] installs the default formatter once per
//! process. Embedders with their own subscriber skip it.
//!
//! Targets:
//!
//! | target           | level  | content                                  |
//! |------------------|--------|------------------------------------------|
//! | `glkrt.strict`   | WARN   | caller errors, with the failing `op`     |
//! | `glkrt.peer`     | WARN   | recoverable presentation-peer failures   |
//! | `glkrt.fatal`    | ERROR  | the condition that ended the session     |
//! | `glkrt.window`   | DEBUG  | window lifecycle and arrangement         |
//! | `glkrt.stream`   | DEBUG  | stream and fileref lifecycle             |
//! | `glkrt.event`    | TRACE  | raw signals and discards                 |
//! | `glkrt.dispatch` | DEBUG  | dispatch hook installation               |

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

/// Environment variable that overrides [`LoggingConfig::filter`].
pub const LOG_ENV: &str = "GLKRT_LOG";

/// Filter from `GLKRT_LOG`, else from the configured directive, else `warn`.
#[must_use]
pub fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber.
///
/// Returns `false` if a global subscriber was already set, in which case
/// nothing changes.
pub fn init(config: &LoggingConfig) -> bool {
    let builder = fmt()
        .with_env_filter(filter(config))
        .with_target(true)
        .with_writer(std::io::stderr);
    if config.json {
        builder.json().finish().try_init().is_ok()
    } else {
        builder.finish().try_init().is_ok()
    }
}
