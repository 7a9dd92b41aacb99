//! Single-line log rendering

use swarmhub_models::LogEntry;

/// Timestamp layout used for rendered log lines, e.g. `Jan 1, 2023 10:00:00AM`
pub const LOG_TIMESTAMP_FORMAT: &str = "%b %-d, %Y %-I:%M:%S%p";

/// Render a log entry as `"<timestamp>: <output>"` with terminal escape codes
/// removed. Entries without output render as an empty string.
pub fn format_log_line(entry: &LogEntry) -> String {
    if entry.output.is_empty() {
        return String::new();
    }
    format!(
        "{}: {}",
        entry.timestamp.format(LOG_TIMESTAMP_FORMAT),
        strip_ansi(&entry.output)
    )
}

/// Remove ANSI escape sequences
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            out.push(c);
            continue;
        }

        match chars.peek() {
            // CSI: parameters and intermediates up to a final byte in '@'..='~'
            Some('[') => {
                chars.next();
                for n in chars.by_ref() {
                    if ('@'..='~').contains(&n) {
                        break;
                    }
                }
            }
            // OSC: terminated by BEL or ESC '\'
            Some(']') => {
                chars.next();
                while let Some(n) = chars.next() {
                    if n == '\u{07}' {
                        break;
                    }
                    if n == '\u{1b}' {
                        if chars.peek() == Some(&'\\') {
                            chars.next();
                        }
                        break;
                    }
                }
            }
            // Other escapes: optional intermediates in ' '..='/' then one final byte
            Some(_) => {
                for n in chars.by_ref() {
                    if !(' '..='/').contains(&n) {
                        break;
                    }
                }
            }
            None => {}
        }
    }

    out
}
