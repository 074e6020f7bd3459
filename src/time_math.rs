/*!
 * Time Math
 *
 * Pure, synchronous minute arithmetic shared by the Timeline Builder,
 * Availability Engine, and Capacity & Policy checks. Nothing in this
 * module performs I/O or reads the wall clock; every function is a
 * deterministic transform over plain integers.
 *
 * All internal time reasoning uses minutes since midnight (0..1439).
 * Overlap checks use the half-open convention `a_start < b_end && b_start < a_end`
 * throughout, so a block ending exactly when another starts never overlaps it.
 */

/// One day, in minutes.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Parses an `"HH:MM"` string into minutes since midnight.
///
/// Returns `None` if the string is malformed or the resulting time would
/// roll past midnight (hour >= 24 or minute >= 60).
pub fn to_minutes(hhmm: &str) -> Option<u16> {
    let (h, m) = hhmm.split_once(':')?;
    let h: u16 = h.parse().ok()?;
    let m: u16 = m.parse().ok()?;
    if h >= 24 || m >= 60 {
        return None;
    }
    Some(h * 60 + m)
}

/// Formats minutes since midnight as a zero-padded 24h `"HH:MM"` string.
pub fn to_hhmm(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Formats minutes since midnight as a 12h clock string, e.g. `510 -> "8:30 AM"`.
pub fn to_12h(minutes: u16) -> String {
    let h24 = minutes / 60;
    let m = minutes % 60;
    let period = if h24 < 12 { "AM" } else { "PM" };
    let h12 = match h24 % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", h12, m, period)
}

/// Half-open interval overlap test: `[a_start, a_end)` intersects `[b_start, b_end)`.
///
/// An interval that ends exactly where another begins does not overlap it.
pub fn intervals_overlap(a_start: u16, a_end: u16, b_start: u16, b_end: u16) -> bool {
    a_start < b_end && b_start < a_end
}

/// Whether a `[start, start+duration)` interval crosses the `[lunch_start, lunch_end)` window,
/// using the same half-open overlap rule as `intervals_overlap`.
pub fn crosses_lunch(start: u16, duration: u16, lunch_start: u16, lunch_end: u16) -> bool {
    intervals_overlap(start, start + duration, lunch_start, lunch_end)
}

/// Whether `start + duration` would roll past midnight. The engine never allows this;
/// callers treat it as "outside working hours" rather than wrapping to the next day.
pub fn rolls_past_midnight(start: u16, duration: u16) -> bool {
    start as u32 + duration as u32 >= MINUTES_PER_DAY as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_hhmm() {
        assert_eq!(to_minutes("08:30"), Some(510));
        assert_eq!(to_minutes("00:00"), Some(0));
        assert_eq!(to_minutes("23:59"), Some(1439));
    }

    #[test]
    fn rejects_malformed_or_rolling_hhmm() {
        assert_eq!(to_minutes("24:00"), None);
        assert_eq!(to_minutes("12:60"), None);
        assert_eq!(to_minutes("not-a-time"), None);
        assert_eq!(to_minutes("8"), None);
    }

    #[test]
    fn formats_24h() {
        assert_eq!(to_hhmm(510), "08:30");
        assert_eq!(to_hhmm(0), "00:00");
        assert_eq!(to_hhmm(1439), "23:59");
    }

    #[test]
    fn formats_12h() {
        assert_eq!(to_12h(510), "8:30 AM");
        assert_eq!(to_12h(0), "12:00 AM");
        assert_eq!(to_12h(720), "12:00 PM");
        assert_eq!(to_12h(750), "12:30 PM");
        assert_eq!(to_12h(1439), "11:59 PM");
    }

    #[test]
    fn overlap_is_half_open() {
        // Touching but not overlapping: [0,30) and [30,60)
        assert!(!intervals_overlap(0, 30, 30, 60));
        assert!(!intervals_overlap(30, 60, 0, 30));
        // Genuine overlap
        assert!(intervals_overlap(0, 30, 15, 45));
        assert!(intervals_overlap(15, 45, 0, 30));
        // One contains the other
        assert!(intervals_overlap(0, 60, 20, 30));
    }

    #[test]
    fn lunch_crossing_is_half_open() {
        // Ends exactly at lunch start: no crossing
        assert!(!crosses_lunch(660, 60, 720, 780)); // 11:00-12:00 vs 12:00-13:00
        // Starts exactly at lunch end: no crossing
        assert!(!crosses_lunch(780, 30, 720, 780)); // 13:00-13:30 vs 12:00-13:00
        // Overlaps into lunch
        assert!(crosses_lunch(690, 60, 720, 780)); // 11:30-12:30 vs 12:00-13:00
        // Fully contained in lunch
        assert!(crosses_lunch(730, 20, 720, 780));
    }

    #[test]
    fn detects_midnight_rollover() {
        assert!(!rolls_past_midnight(1400, 30));
        assert!(rolls_past_midnight(1410, 30));
        assert!(rolls_past_midnight(1439, 1));
    }
}
