//! Tracing initialization.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Environment variable selecting structured output (`json`) over the compact format.
pub const LOG_FORMAT_ENV: &str = "EXTENSION_SEARCH_LOG_FORMAT";

/// Initialize tracing. Safe to call multiple times.
///
/// Output goes to stderr; stdout is reserved for the MCP protocol. Under a test
/// harness the level defaults to DEBUG and output is captured per test.
pub fn init() {
    INIT.call_once(|| {
        let is_test =
            std::env::var("NEXTEST").is_ok() || std::env::var("CARGO_TARGET_TMPDIR").is_ok();
        let filter = EnvFilter::from_default_env().add_directive(
            if is_test {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            }
            .into(),
        );
        let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_target(true);

        let result = if is_test {
            builder.compact().with_test_writer().try_init()
        } else if json {
            builder.json().with_writer(std::io::stderr).try_init()
        } else {
            builder.compact().with_writer(std::io::stderr).try_init()
        };

        if let Err(e) = result {
            eprintln!("Failed to initialize tracing: {}", e);
        }
    });
}
