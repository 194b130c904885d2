/*!
 * Timecode codec.
 *
 * Converts between clock-style timestamps (`H:MM:SS.mmm` or `H:MM:SS,mmm`)
 * and floating-point seconds at millisecond precision.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::CueError;

/// Pattern for a single timecode; the fraction may use a dot or a comma
static TIMECODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2})(?:[.,](\d{1,3}))?$").unwrap()
});

/// Parse a timecode into seconds.
///
/// The fractional part is right-padded to milliseconds, so `"0:00:04.3"`
/// is 4.300 seconds. The result is derived from whole milliseconds, which
/// keeps `parse_timecode(&format_timecode(x)) == x` for millisecond values.
pub fn parse_timecode(timecode: &str) -> Result<f64, CueError> {
    parse_millis(timecode).map(|ms| ms as f64 / 1000.0)
}

/// Parse a timecode into whole milliseconds
pub fn parse_millis(timecode: &str) -> Result<u64, CueError> {
    let trimmed = timecode.trim();
    let caps = TIMECODE_REGEX
        .captures(trimmed)
        .ok_or_else(|| CueError::TimecodeFormat(trimmed.to_string()))?;

    let field = |idx: usize| -> Result<u64, CueError> {
        caps.get(idx)
            .map_or(Ok(0), |m| m.as_str().parse::<u64>())
            .map_err(|_| CueError::TimecodeFormat(trimmed.to_string()))
    };

    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;

    // "4" means 400 ms, "04" means 40 ms
    let millis = match caps.get(4) {
        Some(frac) => {
            let padded = format!("{:0<3}", frac.as_str());
            padded
                .parse::<u64>()
                .map_err(|_| CueError::TimecodeFormat(trimmed.to_string()))?
        }
        None => 0,
    };

    Ok(((hours * 3600 + minutes * 60 + seconds) * 1000) + millis)
}

/// Format seconds as a zero-padded `HH:MM:SS.mmm` timecode
pub fn format_timecode(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };

    let whole = seconds.floor();
    let total = whole as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    let millis = ((seconds - whole) * 1000.0).round().clamp(0.0, 999.0) as u64;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Re-render any accepted timecode in canonical `HH:MM:SS.mmm` form
pub fn normalize_timecode(timecode: &str) -> Result<String, CueError> {
    parse_timecode(timecode).map(format_timecode)
}
