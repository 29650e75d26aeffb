use std::time::Duration;

/// Render a duration as `{h}h{m}m{s}s`, e.g. `0h16m40s` or `0h0m2.5s`.
///
/// Used for the watcher's "sleeping for" and "retrying in" log lines.
#[must_use]
pub fn humanize(duration: Duration) -> String {
    let millis = duration.as_millis();
    let hours = millis / 3_600_000;
    let minutes = (millis % 3_600_000) / 60_000;
    let rest = millis % 60_000;

    let seconds = if rest % 1000 == 0 {
        (rest / 1000).to_string()
    } else {
        let formatted = format!("{:.3}", rest as f64 / 1000.0);
        formatted.trim_end_matches('0').to_string()
    };

    format!("{hours}h{minutes}m{seconds}s")
}
