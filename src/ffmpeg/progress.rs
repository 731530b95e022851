use regex::Regex;
use std::sync::LazyLock;

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^out_time_(?:ms|us)=(\d+)$").expect("invalid time regex"));

/// Parse one line of `-progress pipe:1` output against the expected output length.
/// Returns progress in [0, 1], or None for lines that carry no position.
pub fn parse_progress_line(line: &str, expected_secs: f64) -> Option<f64> {
    let line = line.trim();
    if line == "progress=end" {
        return Some(1.0);
    }
    if expected_secs.is_nan() || expected_secs <= 0.0 {
        return None;
    }
    let caps = TIME_RE.captures(line)?;
    // FFmpeg reports out_time_ms in microseconds despite the name.
    let micros: u64 = caps[1].parse().ok()?;
    let elapsed = micros as f64 / 1_000_000.0;
    Some((elapsed / expected_secs).clamp(0.0, 1.0))
}
