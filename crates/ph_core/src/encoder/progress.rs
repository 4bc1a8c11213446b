//! Parsing of `ffmpeg -progress pipe:1` output.
//!
//! With `-progress`, ffmpeg writes `key=value` records to stdout roughly
//! twice a second. We derive a percentage from `out_time_us` against the
//! expected output duration. Note that `out_time_ms` is also microseconds
//! in every released ffmpeg; both keys are handled identically.

/// Incremental percent tracker over a progress record stream.
#[derive(Debug, Clone)]
pub struct ProgressParser {
    total_secs: f64,
    last_percent: Option<u8>,
}

impl ProgressParser {
    /// `total_secs` is the expected duration of the output.
    pub fn new(total_secs: f64) -> Self {
        Self {
            total_secs,
            last_percent: None,
        }
    }

    /// Feed one line; returns the new percentage when it changed.
    pub fn parse_line(&mut self, line: &str) -> Option<u8> {
        let (key, value) = line.split_once('=')?;
        let elapsed_secs = match key.trim() {
            // Both are microseconds despite the second key's name.
            "out_time_us" | "out_time_ms" => value.trim().parse::<i64>().ok()? as f64 / 1e6,
            "out_time" => parse_clock(value.trim())?,
            "progress" if value.trim() == "end" => {
                return self.advance_to(100);
            }
            _ => return None,
        };

        if self.total_secs <= 0.0 {
            return None;
        }

        let percent = ((elapsed_secs / self.total_secs) * 100.0).clamp(0.0, 100.0) as u8;
        self.advance_to(percent)
    }

    fn advance_to(&mut self, percent: u8) -> Option<u8> {
        match self.last_percent {
            Some(last) if last >= percent => None,
            _ => {
                self.last_percent = Some(percent);
                Some(percent)
            }
        }
    }
}

/// Parse `HH:MM:SS.frac` into seconds.
fn parse_clock(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_from_microsecond_keys() {
        let mut parser = ProgressParser::new(60.0);
        assert_eq!(parser.parse_line("out_time_us=15000000"), Some(25));
        // Same timestamp under the misnamed key changes nothing.
        assert_eq!(parser.parse_line("out_time_ms=15000000"), None);
        assert_eq!(parser.parse_line("out_time_us=30000000"), Some(50));
    }

    #[test]
    fn percent_from_clock_format() {
        let mut parser = ProgressParser::new(120.0);
        assert_eq!(parser.parse_line("out_time=00:01:00.000000"), Some(50));
    }

    #[test]
    fn never_exceeds_one_hundred() {
        let mut parser = ProgressParser::new(10.0);
        assert_eq!(parser.parse_line("out_time_us=99000000"), Some(100));
        assert_eq!(parser.parse_line("out_time_us=120000000"), None);
    }

    #[test]
    fn end_record_completes() {
        let mut parser = ProgressParser::new(60.0);
        assert_eq!(parser.parse_line("out_time_us=30000000"), Some(50));
        assert_eq!(parser.parse_line("progress=end"), Some(100));
    }

    #[test]
    fn ignores_unrelated_keys() {
        let mut parser = ProgressParser::new(60.0);
        assert_eq!(parser.parse_line("frame=123"), None);
        assert_eq!(parser.parse_line("speed=2.5x"), None);
        assert_eq!(parser.parse_line("progress=continue"), None);
        assert_eq!(parser.parse_line("not a record"), None);
    }

    #[test]
    fn zero_total_reports_nothing_until_end() {
        let mut parser = ProgressParser::new(0.0);
        assert_eq!(parser.parse_line("out_time_us=5000000"), None);
        assert_eq!(parser.parse_line("progress=end"), Some(100));
    }
}
