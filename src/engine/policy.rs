/*!
 * Capacity & Policy
 *
 * The cheap-reject checks (P1-P6) applied before a booking is admitted.
 * Pure functions over plain values — no I/O, no wall-clock reads (the
 * caller supplies "now" and "today" from the `Clock`).
 */

use chrono::NaiveDate;

use crate::config::PolicyConfig;
use crate::models::BarberStatus;
use crate::time_math;
use crate::utils::{EngineError, Result};

/// I5: total duration must meet the configured minimum.
pub fn check_min_duration(total_duration_min: u16, policy: &PolicyConfig) -> Result<()> {
    if total_duration_min < policy.min_service_duration_min {
        return Err(EngineError::InvalidRequest(format!(
            "total duration {total_duration_min} is below the minimum of {}",
            policy.min_service_duration_min
        )));
    }
    Ok(())
}

/// P1: `start + duration <= working_end`.
pub fn check_working_hours_fit(start: u16, duration: u16, policy: &PolicyConfig) -> Result<()> {
    if time_math::rolls_past_midnight(start, duration) || start + duration > policy.working_end {
        return Err(EngineError::WorkingHoursExceeded);
    }
    if start < policy.working_start {
        return Err(EngineError::WorkingHoursExceeded);
    }
    Ok(())
}

/// P2: scheduled kinds must not cross the lunch interval.
pub fn check_no_lunch_crossing(start: u16, duration: u16, policy: &PolicyConfig) -> Result<()> {
    if time_math::crosses_lunch(start, duration, policy.lunch_start, policy.lunch_end) {
        return Err(EngineError::LunchConflict);
    }
    Ok(())
}

/// The aggregate minutes bookable across a day: working minutes minus lunch.
/// Shared by `check_queue_fit` and the coordinator's next-available-date
/// suggestion scan so both agree on what "free minutes" means.
pub fn daily_minute_budget(policy: &PolicyConfig) -> u32 {
    let working_minutes = (policy.working_end - policy.working_start) as u32;
    let lunch_minutes = (policy.lunch_end - policy.lunch_start) as u32;
    working_minutes.saturating_sub(lunch_minutes)
}

/// P3: the sum of durations of all active queue appointments plus the new
/// one must fit within the aggregate remaining gap budget (working minutes
/// minus scheduled minutes minus lunch).
pub fn check_queue_fit(
    scheduled_total_min: u32,
    existing_queue_total_min: u32,
    new_duration_min: u32,
    policy: &PolicyConfig,
) -> Result<()> {
    let budget = daily_minute_budget(policy);
    let required = scheduled_total_min + existing_queue_total_min + new_duration_min;
    if required > budget {
        return Err(EngineError::QueueFull(Default::default()));
    }
    Ok(())
}

/// P4: active queue length must stay under the configured cap.
pub fn check_queue_cap(active_queue_len: usize, policy: &PolicyConfig) -> Result<()> {
    if active_queue_len >= policy.max_active_queue {
        return Err(EngineError::QueueFull(Default::default()));
    }
    Ok(())
}

/// P5: day-off and barber status must allow booking.
pub fn check_barber_bookable(status: BarberStatus, is_day_off: bool) -> Result<()> {
    if is_day_off {
        return Err(EngineError::DayOff);
    }
    if !status.is_bookable() {
        return Err(EngineError::BarberOffline);
    }
    Ok(())
}

/// P6: past dates are always rejected; today is rejected once local time
/// passes the same-day cutoff. Admission-only — it never stops an already
/// `ongoing` row from completing after the cutoff.
pub fn check_booking_window(
    service_date: NaiveDate,
    today: NaiveDate,
    now_minute: u16,
    policy: &PolicyConfig,
) -> Result<()> {
    if service_date < today {
        return Err(EngineError::OutsideBookingWindow);
    }
    if service_date == today && now_minute >= policy.same_day_cutoff {
        return Err(EngineError::OutsideBookingWindow);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_past_date() {
        let policy = PolicyConfig::default();
        let today = NaiveDate::from_ymd_opt(2025, 10, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2025, 10, 9).unwrap();
        assert!(check_booking_window(yesterday, today, 0, &policy).is_err());
    }

    #[test]
    fn rejects_today_after_cutoff() {
        let policy = PolicyConfig::default();
        let today = NaiveDate::from_ymd_opt(2025, 10, 10).unwrap();
        assert!(check_booking_window(today, today, 16 * 60 + 35, &policy).is_err());
        assert!(check_booking_window(today, today, 16 * 60 + 29, &policy).is_ok());
    }

    #[test]
    fn queue_fit_rejects_when_over_budget() {
        let policy = PolicyConfig::default();
        // Working window minus lunch = 480 minutes. 8 scheduled appts at 60 min = 480.
        let result = check_queue_fit(480, 0, 30, &policy);
        assert!(matches!(result, Err(EngineError::QueueFull(_))));
    }

    #[test]
    fn queue_cap_rejects_at_limit() {
        let policy = PolicyConfig::default();
        assert!(check_queue_cap(15, &policy).is_err());
        assert!(check_queue_cap(14, &policy).is_ok());
    }

    #[test]
    fn barber_bookable_rejects_offline_and_day_off() {
        assert!(check_barber_bookable(BarberStatus::Offline, false).is_err());
        assert!(check_barber_bookable(BarberStatus::Available, true).is_err());
        assert!(check_barber_bookable(BarberStatus::Busy, false).is_ok());
    }

    #[test]
    fn working_hours_fit_rejects_before_start_or_past_end() {
        let policy = PolicyConfig::default();
        assert!(check_working_hours_fit(policy.working_start - 30, 30, &policy).is_err());
        assert!(check_working_hours_fit(policy.working_end - 15, 30, &policy).is_err());
        assert!(check_working_hours_fit(policy.working_start, 30, &policy).is_ok());
    }
}
