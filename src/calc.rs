use chrono::NaiveDate;

/// Whole-number percentage, rounded half away from zero. A zero denominator
/// yields 0 rather than NaN.
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let pct = (part as f64 / whole as f64 * 100.0).round();
    if pct.is_finite() && pct > 0.0 {
        pct as u32
    } else {
        0
    }
}

/// Calendar days from `start` to `end`; negative when the range is inverted.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Sessions the course is expected to hold: whole weeks spanned (rounded up)
/// times the number of weekly schedule slots.
pub fn planned_sessions(start: NaiveDate, end: NaiveDate, sessions_per_week: usize) -> usize {
    let days = days_between(start, end);
    if days <= 0 || sessions_per_week == 0 {
        return 0;
    }
    let weeks = (days as u64).div_ceil(7) as usize;
    weeks.saturating_mul(sessions_per_week)
}

/// Progress in [0, 100].
pub fn progress(completed: usize, planned: usize) -> u32 {
    percent(completed, planned).min(100)
}
