/// Raw progress notification as relayed from the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Progress {
    pub current: i64,
    pub total: i64,
    pub message: String,
}

impl Progress {
    pub fn percent(&self) -> u8 {
        progress_percent(self.current, self.total)
    }
}

/// Maps `(current, total)` to a display percentage in `0..=100`.
///
/// `current` is clamped into `[0, total]` first. A non-positive `total` yields 0.
pub fn progress_percent(current: i64, total: i64) -> u8 {
    if total <= 0 {
        return 0;
    }
    let current = current.clamp(0, total);
    // i128 keeps `current * 100` from overflowing near i64::MAX.
    let pct = (current as i128 * 100) / total as i128;
    pct as u8
}
