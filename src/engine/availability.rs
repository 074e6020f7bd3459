/*!
 * Availability Engine
 *
 * Classifies every candidate slot on a fixed grid as
 * available/scheduled/queue/lunch/past/full, and finds gaps for queue
 * estimates and alternative-barber search. Pure and synchronous: consumes a
 * Timeline Builder output and policy constants, never performing I/O or
 * reading the wall clock directly — callers supply "now" from the `Clock`.
 */

use serde::Serialize;
use uuid::Uuid;

use crate::config::PolicyConfig;
use crate::engine::timeline::{Block, BlockKind};
use crate::models::Barber;
use crate::time_math;

/// Classification of a candidate grid slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Available,
    Scheduled,
    Queue,
    Lunch,
    Past,
    Full,
}

/// One candidate start time on the fixed grid and its classification.
#[derive(Debug, Clone, Serialize)]
pub struct Slot {
    pub start_minute: u16,
    pub kind: SlotKind,
    pub bookable: bool,
    pub reason: Option<String>,
    /// The appointment id occupying this slot, when `kind` is `Scheduled`/`Queue`.
    pub queue_preview: Option<Uuid>,
}

/// A candidate barber for `find_alternatives`, with its own availability summary.
#[derive(Debug, Clone, Serialize)]
pub struct BarberOption {
    pub barber_id: Uuid,
    pub display_name: String,
    pub next_available: Option<u16>,
    pub available_count: usize,
    pub queue_length: usize,
    pub avg_rating: f64,
    pub score: f64,
}

/// Whether `[start, start+duration)` can be placed on `timeline` without
/// overlapping any existing block, crossing lunch, or exceeding working-end.
fn fits(timeline: &[Block], start: u16, duration: u16, policy: &PolicyConfig) -> bool {
    let end = start + duration;
    if time_math::rolls_past_midnight(start, duration) || end > policy.working_end {
        return false;
    }
    if time_math::crosses_lunch(start, duration, policy.lunch_start, policy.lunch_end) {
        return false;
    }
    !timeline.iter().any(|b| {
        matches!(b.kind, BlockKind::Scheduled | BlockKind::Queue | BlockKind::Lunch)
            && time_math::intervals_overlap(start, end, b.start_minute, b.end_minute)
    })
}

/// Builds the candidate grid (fixed `granularity`-minute steps across the
/// working window) and classifies each point against `timeline`.
pub fn unified_slots(
    timeline: &[Block],
    policy: &PolicyConfig,
    service_duration: u16,
    now_minute: Option<u16>,
) -> Vec<Slot> {
    let mut slots = Vec::new();
    let mut start = policy.working_start;
    while start < policy.working_end {
        slots.push(classify_slot(timeline, policy, start, service_duration, now_minute));
        start += policy.slot_granularity_min;
    }
    slots
}

fn classify_slot(
    timeline: &[Block],
    policy: &PolicyConfig,
    start: u16,
    service_duration: u16,
    now_minute: Option<u16>,
) -> Slot {
    if let Some(now) = now_minute {
        if start < now {
            return Slot {
                start_minute: start,
                kind: SlotKind::Past,
                bookable: false,
                reason: Some("slot is in the past".to_string()),
                queue_preview: None,
            };
        }
    }

    if let Some(block) = timeline.iter().find(|b| {
        matches!(b.kind, BlockKind::Scheduled | BlockKind::Queue | BlockKind::Lunch)
            && start >= b.start_minute
            && start < b.end_minute
    }) {
        let (kind, reason) = match block.kind {
            BlockKind::Scheduled => (SlotKind::Scheduled, "already scheduled"),
            BlockKind::Queue => (SlotKind::Queue, "occupied by an estimated queue slot"),
            BlockKind::Lunch => (SlotKind::Lunch, "lunch break"),
            BlockKind::Gap => unreachable!(),
        };
        return Slot {
            start_minute: start,
            kind,
            bookable: false,
            reason: Some(reason.to_string()),
            queue_preview: block.appointment_id,
        };
    }

    if fits(timeline, start, service_duration, policy) {
        Slot {
            start_minute: start,
            kind: SlotKind::Available,
            bookable: true,
            reason: None,
            queue_preview: None,
        }
    } else {
        Slot {
            start_minute: start,
            kind: SlotKind::Full,
            bookable: false,
            reason: Some("service does not fit before the next commitment".to_string()),
            queue_preview: None,
        }
    }
}

/// The earliest bookable slot on the same candidate grid as `unified_slots`.
pub fn next_available(
    timeline: &[Block],
    policy: &PolicyConfig,
    service_duration: u16,
    now_minute: Option<u16>,
) -> Option<u16> {
    unified_slots(timeline, policy, service_duration, now_minute)
        .into_iter()
        .find(|s| s.bookable)
        .map(|s| s.start_minute)
}

/// Whether the exact `[start, start+duration)` interval is currently bookable
/// — used by the Booking Coordinator to re-verify a caller-specified slot.
pub fn is_bookable(timeline: &[Block], policy: &PolicyConfig, start: u16, duration: u16, now_minute: Option<u16>) -> bool {
    if let Some(now) = now_minute {
        if start < now {
            return false;
        }
    }
    fits(timeline, start, duration, policy)
}

/// Builds one `BarberOption` for `find_alternatives`, given the candidate's
/// own timeline. Ordering (`bookable_slot_count desc, queue_length asc,
/// avg_rating desc, barber_id asc`) is applied by the caller across the
/// full set of options.
pub fn barber_option(
    barber: &Barber,
    timeline: &[Block],
    policy: &PolicyConfig,
    service_duration: u16,
    now_minute: Option<u16>,
) -> BarberOption {
    let slots = unified_slots(timeline, policy, service_duration, now_minute);
    let available_count = slots.iter().filter(|s| s.bookable).count();
    let queue_length = timeline
        .iter()
        .filter(|b| b.kind == BlockKind::Queue)
        .count();
    let next = slots.iter().find(|s| s.bookable).map(|s| s.start_minute);

    BarberOption {
        barber_id: barber.id,
        display_name: barber.display_name.clone(),
        next_available: next,
        available_count,
        queue_length,
        avg_rating: barber.avg_rating,
        score: available_count as f64 - queue_length as f64 * 0.1 + barber.avg_rating * 0.01,
    }
}

/// Sorts options by the tie-break chain required for `find_alternatives`:
/// `(bookable_slot_count desc, queue_length asc, avg_rating desc, barber_id asc)`.
pub fn sort_alternatives(options: &mut [BarberOption]) {
    options.sort_by(|a, b| {
        b.available_count
            .cmp(&a.available_count)
            .then(a.queue_length.cmp(&b.queue_length))
            .then(b.avg_rating.partial_cmp(&a.avg_rating).unwrap_or(std::cmp::Ordering::Equal))
            .then(a.barber_id.cmp(&b.barber_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::timeline::build_timeline;
    use crate::models::{Appointment, AppointmentKind, AppointmentStatus, Priority};
    use chrono::{NaiveDate, NaiveTime, Utc};

    fn scheduled(start: &str, duration: i32) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            barber_id: Uuid::new_v4(),
            customer_id: None,
            service_date: NaiveDate::from_ymd_opt(2025, 10, 10).unwrap(),
            appointment_kind: AppointmentKind::Scheduled,
            start_time: Some(NaiveTime::parse_from_str(start, "%H:%M").unwrap()),
            queue_position: None,
            priority: Priority::Normal,
            status: AppointmentStatus::Pending,
            total_duration_min: duration,
            service_ids: vec![],
            addon_ids: vec![],
            total_price: 0,
            notes: String::new(),
            friend_name: None,
            friend_phone: None,
            friend_email: None,
            primary_customer_id: None,
            idempotency_key: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 1,
        }
    }

    #[test]
    fn empty_day_is_fully_available_outside_lunch() {
        let policy = PolicyConfig::default();
        let timeline = build_timeline(&[], &policy);
        let slots = unified_slots(&timeline, &policy, 30, None);
        let lunch_slot = slots.iter().find(|s| s.start_minute == 720).unwrap();
        assert_eq!(lunch_slot.kind, SlotKind::Lunch);
        let morning_slot = slots.iter().find(|s| s.start_minute == 480).unwrap();
        assert_eq!(morning_slot.kind, SlotKind::Available);
        assert!(morning_slot.bookable);
    }

    #[test]
    fn scheduled_conflict_is_not_bookable() {
        let policy = PolicyConfig::default();
        let appt = scheduled("11:30", 45);
        let timeline = build_timeline(&[appt], &policy);
        let slot = unified_slots(&timeline, &policy, 30, None)
            .into_iter()
            .find(|s| s.start_minute == 690)
            .unwrap(); // 11:30
        assert_eq!(slot.kind, SlotKind::Scheduled);
        assert!(!slot.bookable);
    }

    #[test]
    fn lunch_crossing_duration_is_not_bookable_even_if_start_is_free() {
        let policy = PolicyConfig::default();
        let timeline = build_timeline(&[], &policy);
        // 11:45 + 60min would cross into lunch.
        assert!(!is_bookable(&timeline, &policy, 705, 60, None));
    }

    #[test]
    fn past_slots_are_marked_for_today() {
        let policy = PolicyConfig::default();
        let timeline = build_timeline(&[], &policy);
        let slots = unified_slots(&timeline, &policy, 30, Some(540)); // now = 09:00
        let early = slots.iter().find(|s| s.start_minute == 480).unwrap();
        assert_eq!(early.kind, SlotKind::Past);
        let later = slots.iter().find(|s| s.start_minute == 570).unwrap();
        assert_eq!(later.kind, SlotKind::Available);
    }

    #[test]
    fn next_available_finds_earliest_bookable() {
        let policy = PolicyConfig::default();
        let appt = scheduled("08:00", 60);
        let timeline = build_timeline(&[appt], &policy);
        let next = next_available(&timeline, &policy, 30, None);
        assert_eq!(next, Some(540)); // 09:00, right after the 08:00-09:00 block
    }

    #[test]
    fn sort_alternatives_breaks_ties_by_barber_id() {
        let a = Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap();
        let b = Uuid::parse_str("00000000-0000-0000-0000-000000000002").unwrap();
        let mut options = vec![
            BarberOption {
                barber_id: b,
                display_name: "B".into(),
                next_available: Some(480),
                available_count: 5,
                queue_length: 0,
                avg_rating: 4.5,
                score: 0.0,
            },
            BarberOption {
                barber_id: a,
                display_name: "A".into(),
                next_available: Some(480),
                available_count: 5,
                queue_length: 0,
                avg_rating: 4.5,
                score: 0.0,
            },
        ];
        sort_alternatives(&mut options);
        assert_eq!(options[0].barber_id, a);
    }
}
