use std::time::{Duration, Instant};

/// Logs the time spent in one step of a pipeline and returns the running total.
pub(crate) fn trace(l_type: &str, l_step: &str, start: Instant, prev_elapsed: Duration) -> Duration {
    let elapsed = start.elapsed();
    log::trace!("{} | Total={:.2?} | {}={:.2?}", l_type, elapsed, l_step, elapsed - prev_elapsed);
    elapsed
}

pub(crate) fn round_to(x: f32, places: i32) -> f32 {
    let factor = 10f64.powi(places);
    ((x as f64 * factor).round() / factor) as f32
}

pub(crate) fn human_bytes(size: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = size;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_six_places() {
        assert_eq!(round_to(0.123_456_78, 6), 0.123457);
        assert_eq!(round_to(0.5, 6), 0.5);
    }

    #[test]
    fn formats_bytes() {
        assert_eq!(human_bytes(512.0), "512.0 B");
        assert_eq!(human_bytes(1536.0), "1.5 KiB");
        assert_eq!(human_bytes(50.0 * 1024.0 * 1024.0), "50.0 MiB");
    }
}
