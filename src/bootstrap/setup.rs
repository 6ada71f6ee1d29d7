//! Setup/initialization module - handles process startup tasks
//!
//! Includes:
//! - Logger initialization (always on stderr)
//! - Workflow bundle availability check

use anstyle::{AnsiColor, Style};
use env_logger::{Builder, DEFAULT_FILTER_ENV, Target, WriteStyle};
use log::kv::Key;
use log::{info, warn};
use std::io::Write;

use crate::config::AppConfig;

// ────────────────────────────────────────────────────────────────
// Logger Initialization
// ────────────────────────────────────────────────────────────────

pub const DEFAULT_LOG_FILTER: &str = "info,rocket=warn";

/// Pick the `RUST_LOG` filter out of the given environment.
pub fn log_filter<I>(vars: I) -> String
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .find(|(key, _)| key == DEFAULT_FILTER_ENV)
        .map(|(_, value)| value)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

/// Initialize the global logger. Output goes to stderr so that stdout stays
/// reserved for machine-readable results.
pub fn initialize_logger(filter: &str) {
    let dim = Style::new().dimmed();
    let cyan = Style::new().fg_color(Some(AnsiColor::Cyan.into()));

    let _ = Builder::new()
        .parse_filters(filter)
        .write_style(WriteStyle::Auto)
        .target(Target::Stderr)
        .format(move |buf, record| {
            let ts = buf.timestamp();

            let level_style = buf.default_level_style(record.level());
            let lvl = format!(
                "{}{:<5}{}",
                level_style.render(),
                record.level(),
                level_style.render_reset()
            );

            let tgt = format!("{}{}{}", dim.render(), record.target(), dim.render_reset());

            // Extract raw duration and format to 2 decimal places
            let dur_raw = record
                .key_values()
                .get(Key::from("duration"))
                .map(|v| {
                    let s = format!("{}", v);
                    if let Some(idx) = s.find(|c: char| c.is_alphabetic()) {
                        let (num, unit) = (&s[..idx], &s[idx..]);
                        if let Ok(val) = num.parse::<f32>() {
                            return format!("{:.2} {}", val, unit);
                        }
                    }
                    s
                })
                .unwrap_or_default();

            let dur = if dur_raw.is_empty() {
                " ".repeat(10)
            } else {
                format!("{}{:>10}{}", cyan.render(), dur_raw, cyan.render_reset())
            };

            writeln!(buf, "{} {} {}", ts, lvl, tgt)?;

            let message = format!("{}", record.args());
            let subsequent_indent = " ".repeat(11);
            let mut lines = message.lines();

            if let Some(first_line) = lines.next() {
                writeln!(buf, "{} {}", dur, first_line)?;
            }
            for line in lines {
                writeln!(buf, "{}{}", subsequent_indent, line)?;
            }

            Ok(())
        })
        .try_init();
}

// ────────────────────────────────────────────────────────────────
// Workflow Bundle Check
// ────────────────────────────────────────────────────────────────

/// Warn early about missing workflow bundles. Requests that need them still
/// fail individually, so startup continues.
pub fn check_workflow_files(config: &AppConfig) {
    for path in [&config.complete_ad_workflow, &config.video_workflow] {
        if path.is_file() {
            info!("Workflow bundle found: {}", path.display());
        } else {
            warn!(
                "Workflow bundle `{}` is missing. Requests that depend on it will fail.",
                path.display()
            );
        }
    }
}
