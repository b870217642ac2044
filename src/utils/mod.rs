use std::time::{Duration, Instant};
use tracing::info;

/// Wall-clock timer that logs when it is dropped.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!("Finished: {} (took {:.2?})", self.label, self.elapsed());
    }
}

/// Integer with Brazilian thousands separators: 1234567 → "1.234.567".
pub fn fmt_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Optional figure for tables; absent prints as a dash, never as zero.
pub fn fmt_opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_thousands() {
        assert_eq!(fmt_thousands(1_234_567), "1.234.567");
        assert_eq!(fmt_thousands(0), "0");
        assert_eq!(fmt_thousands(-42_000), "-42.000");
        assert_eq!(fmt_thousands(999), "999");
        assert_eq!(fmt_thousands(i64::MIN), "-9.223.372.036.854.775.808");
    }

    #[test]
    fn test_fmt_opt() {
        assert_eq!(fmt_opt(Some(31.5)), "31.5");
        assert_eq!(fmt_opt(Some(0)), "0");
        assert_eq!(fmt_opt::<f64>(None), "-");
    }
}
