/*!
 * Booking Coordinator
 *
 * Owns every mutating operation on the appointment timeline. All writes to a
 * given `(barber_id, service_date)` are serialized through a keyed mutex so
 * the admission checks in `engine::policy`, the snapshot they're evaluated
 * against, and the resulting insert/renumber all observe a single
 * consistent view — see the concurrency model this mirrors.
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::PolicyConfig;
use crate::engine::availability;
use crate::engine::catalog_cache::CatalogCache;
use crate::engine::events::{EventBus, EventType};
use crate::engine::policy;
use crate::engine::timeline::{self, build_timeline};
use crate::models::{
    Appointment, AppointmentKind, AppointmentStatus, BookRequest, BookingResult, Priority,
};
use crate::repository::{AppointmentPatch, NewAppointment, Repository};
use crate::time_math;
use crate::utils::{EngineError, Result, Suggestions};

const ACTIVE_STATUSES: [AppointmentStatus; 3] = [
    AppointmentStatus::Pending,
    AppointmentStatus::Confirmed,
    AppointmentStatus::Ongoing,
];

type LockKey = (Uuid, NaiveDate);

/// How many calendar days ahead `QueueFull`'s suggestion scan will look
/// before giving up and leaving `next_available_date` empty.
const SUGGESTION_LOOKAHEAD_DAYS: i64 = 30;

/// Validates, serializes, and persists every mutation to the appointment
/// timeline. Read-only queries go through `engine::facade` instead and never
/// touch the lock registry here.
pub struct BookingCoordinator {
    repository: Arc<dyn Repository>,
    catalog: Arc<CatalogCache>,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    policy: PolicyConfig,
    locks: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl BookingCoordinator {
    pub fn new(
        repository: Arc<dyn Repository>,
        catalog: Arc<CatalogCache>,
        events: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            repository,
            catalog,
            events,
            clock,
            policy,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn acquire(&self, barber_id: Uuid, date: NaiveDate) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap();
            locks
                .entry((barber_id, date))
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }

    async fn snapshot(&self, barber_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>> {
        self.repository
            .list_appointments(barber_id, date, &ACTIVE_STATUSES)
            .await
    }

    /// Best-effort remediation for a `QueueFull` rejection: scans forward
    /// from `date` (exclusive) for the first non-day-off date whose
    /// aggregate free minutes (§4.5 P3's budget) covers `duration_min`.
    /// Returns `None` rather than erroring if the scan itself fails partway
    /// — a missing suggestion is acceptable, a broken booking is not.
    async fn suggest_next_available_date(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        duration_min: u32,
    ) -> Option<NaiveDate> {
        let budget = policy::daily_minute_budget(&self.policy);
        for offset in 1..=SUGGESTION_LOOKAHEAD_DAYS {
            let candidate = date + chrono::Duration::days(offset);
            if matches!(self.repository.is_day_off(barber_id, candidate).await, Ok(true)) {
                continue;
            }
            let Ok(snapshot) = self.snapshot(barber_id, candidate).await else {
                continue;
            };
            let scheduled_total: u32 = snapshot
                .iter()
                .filter(|a| a.appointment_kind == AppointmentKind::Scheduled)
                .map(|a| a.total_duration_min as u32)
                .sum();
            let queue_total: u32 = Self::active_queue(&snapshot)
                .iter()
                .map(|a| a.total_duration_min as u32)
                .sum();
            let free = budget.saturating_sub(scheduled_total + queue_total);
            if free >= duration_min {
                return Some(candidate);
            }
        }
        None
    }

    /// Applies a version-checked update, retrying up to twice against the same
    /// `expected_version` to absorb a transient repository hiccup. A second
    /// writer having genuinely moved the row past `expected_version` fails on
    /// every attempt and is surfaced unchanged — this never overwrites a
    /// conflicting concurrent change.
    async fn update_checked(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: AppointmentPatch,
    ) -> Result<Appointment> {
        let mut attempts = 0;
        loop {
            match self
                .repository
                .update_appointment(id, patch.clone(), expected_version)
                .await
            {
                Ok(updated) => return Ok(updated),
                Err(EngineError::VersionConflict) if attempts < 2 => {
                    attempts += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn active_queue(snapshot: &[Appointment]) -> Vec<&Appointment> {
        snapshot
            .iter()
            .filter(|a| a.appointment_kind == AppointmentKind::Queue)
            .collect()
    }

    /// Builds the estimated start/end a row currently occupies on the rebuilt
    /// timeline, for both freshly booked and idempotent-replay responses.
    fn estimate(timeline: &[timeline::Block], appointment_id: Uuid) -> (u16, u16) {
        timeline
            .iter()
            .find(|b| b.appointment_id == Some(appointment_id))
            .map(|b| (b.start_minute, b.end_minute))
            .unwrap_or((0, 0))
    }

    fn to_booking_result(appointment: &Appointment, timeline: &[timeline::Block]) -> BookingResult {
        let (start, end) = Self::estimate(timeline, appointment.id);
        BookingResult {
            appointment_id: appointment.id,
            kind: appointment.appointment_kind,
            start_time: appointment.start_time.map(|t| t.format("%H:%M").to_string()),
            queue_position: appointment.queue_position,
            estimated_start_time: time_math::to_hhmm(start),
            estimated_end_time: time_math::to_hhmm(end),
            version: appointment.version,
        }
    }

    /// Books a new appointment, or replays the result of a prior call carrying
    /// the same `idempotency_key` without re-running admission.
    pub async fn book(&self, request: BookRequest) -> Result<BookingResult> {
        if let Some(existing) = self
            .repository
            .find_by_idempotency_key(request.barber_id, request.service_date, &request.idempotency_key)
            .await?
        {
            let snapshot = self.snapshot(request.barber_id, request.service_date).await?;
            let timeline = build_timeline(&snapshot, &self.policy);
            return Ok(Self::to_booking_result(&existing, &timeline));
        }

        let services = self.catalog.resolve_services(&request.service_ids).await?;
        let addons = self.catalog.resolve_addons(&request.addon_ids).await?;
        let total_duration_min: i32 = services.values().map(|s| s.duration_min).sum::<i32>()
            + addons.values().map(|a| a.duration_min).sum::<i32>();
        let total_price: i64 = services.values().map(|s| s.price).sum::<i64>()
            + addons.values().map(|a| a.price).sum::<i64>();

        policy::check_min_duration(total_duration_min as u16, &self.policy)?;

        let _guard = self.acquire(request.barber_id, request.service_date).await;

        let barber = self.repository.get_barber(request.barber_id).await?;
        let is_day_off = self
            .repository
            .is_day_off(request.barber_id, request.service_date)
            .await?;
        policy::check_barber_bookable(barber.status, is_day_off)?;
        policy::check_booking_window(
            request.service_date,
            self.clock.today(),
            self.clock.now_minutes(),
            &self.policy,
        )?;

        let snapshot = self.snapshot(request.barber_id, request.service_date).await?;
        let duration = total_duration_min as u16;

        let (kind, start_time, queue_position, renumber) = match &request.start_time {
            Some(hhmm) => {
                let start = time_math::to_minutes(hhmm)
                    .ok_or_else(|| EngineError::InvalidRequest(format!("invalid start_time {hhmm}")))?;
                policy::check_working_hours_fit(start, duration, &self.policy)?;
                policy::check_no_lunch_crossing(start, duration, &self.policy)?;
                let timeline = build_timeline(&snapshot, &self.policy);
                let now_minute = if request.service_date == self.clock.today() {
                    Some(self.clock.now_minutes())
                } else {
                    None
                };
                if !availability::is_bookable(&timeline, &self.policy, start, duration, now_minute) {
                    let suggestion_start = availability::next_available(&timeline, &self.policy, duration, now_minute);
                    return Err(EngineError::SlotNotAvailable(Suggestions {
                        alternative_start_minutes: suggestion_start.into_iter().collect(),
                        ..Default::default()
                    }));
                }
                let start_time = NaiveTime::from_hms_opt((start / 60) as u32, (start % 60) as u32, 0)
                    .expect("validated minute-of-day");
                (AppointmentKind::Scheduled, Some(start_time), None, Vec::new())
            }
            None => {
                let active_queue = Self::active_queue(&snapshot);
                if policy::check_queue_cap(active_queue.len(), &self.policy).is_err() {
                    let next_available_date = self
                        .suggest_next_available_date(request.barber_id, request.service_date, duration as u32)
                        .await;
                    return Err(EngineError::QueueFull(Suggestions {
                        next_available_date,
                        ..Default::default()
                    }));
                }

                let scheduled_total: u32 = snapshot
                    .iter()
                    .filter(|a| a.appointment_kind == AppointmentKind::Scheduled)
                    .map(|a| a.total_duration_min as u32)
                    .sum();
                let queue_total: u32 = active_queue.iter().map(|a| a.total_duration_min as u32).sum();
                if policy::check_queue_fit(scheduled_total, queue_total, duration as u32, &self.policy).is_err() {
                    let next_available_date = self
                        .suggest_next_available_date(request.barber_id, request.service_date, duration as u32)
                        .await;
                    return Err(EngineError::QueueFull(Suggestions {
                        next_available_date,
                        ..Default::default()
                    }));
                }

                if request.priority == Priority::Urgent {
                    let shifted: Vec<(Uuid, i32)> = active_queue
                        .iter()
                        .map(|a| (a.id, a.queue_position.unwrap_or(1) + 1))
                        .collect();
                    (AppointmentKind::Queue, None, Some(1), shifted)
                } else {
                    let next_position = active_queue
                        .iter()
                        .filter_map(|a| a.queue_position)
                        .max()
                        .unwrap_or(0)
                        + 1;
                    (AppointmentKind::Queue, None, Some(next_position), Vec::new())
                }
            }
        };

        if !renumber.is_empty() {
            self.repository
                .renumber_queue(request.barber_id, request.service_date, &renumber)
                .await?;
        }

        let inserted = self
            .repository
            .insert_appointment(NewAppointment {
                barber_id: request.barber_id,
                customer_id: request.customer_id,
                service_date: request.service_date,
                appointment_kind: kind,
                start_time,
                queue_position,
                priority: request.priority,
                status: AppointmentStatus::Pending,
                total_duration_min,
                service_ids: request.service_ids.clone(),
                addon_ids: request.addon_ids.clone(),
                total_price,
                notes: request.notes.clone(),
                friend_name: request.friend_block.as_ref().map(|f| f.friend_name.clone()),
                friend_phone: request.friend_block.as_ref().and_then(|f| f.friend_phone.clone()),
                friend_email: request.friend_block.as_ref().and_then(|f| f.friend_email.clone()),
                primary_customer_id: request
                    .friend_block
                    .as_ref()
                    .and_then(|f| f.primary_customer_id),
                idempotency_key: Some(request.idempotency_key.clone()),
            })
            .await?;

        info!(
            barber_id = %request.barber_id,
            service_date = %request.service_date,
            appointment_id = %inserted.id,
            version = inserted.version,
            "appointment booked"
        );

        let mut final_snapshot = snapshot;
        final_snapshot.push(inserted.clone());
        let timeline = build_timeline(&final_snapshot, &self.policy);

        self.events.publish(
            request.barber_id,
            request.service_date,
            EventType::AppointmentCreated,
            inserted.id,
            None,
            serde_json::to_value(&inserted).ok(),
        );
        if !renumber.is_empty() {
            for (id, _) in &renumber {
                self.events.publish(
                    request.barber_id,
                    request.service_date,
                    EventType::QueuePositionChanged,
                    *id,
                    None,
                    None,
                );
            }
        }

        Ok(Self::to_booking_result(&inserted, &timeline))
    }

    /// Cancels an appointment. A cancelled queue row's gap is closed by
    /// renumbering the remaining active queue contiguously from 1.
    pub async fn cancel(&self, id: Uuid, expected_version: i32) -> Result<()> {
        let current = self.repository.get_appointment(id).await?;
        let _guard = self.acquire(current.barber_id, current.service_date).await;
        let current = self.repository.get_appointment(id).await?;

        if !current.status.can_transition_to(AppointmentStatus::Cancelled) {
            warn!(appointment_id = %id, from = ?current.status, "rejected cancel: invalid transition");
            return Err(EngineError::InvalidTransition {
                from: current.status,
                to: AppointmentStatus::Cancelled,
            });
        }

        let updated = self
            .update_checked(
                id,
                expected_version,
                AppointmentPatch {
                    status: Some(AppointmentStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await?;

        if updated.appointment_kind == AppointmentKind::Queue {
            self.renumber_after_removal(current.barber_id, current.service_date, id)
                .await?;
        }

        self.events.publish(
            current.barber_id,
            current.service_date,
            EventType::AppointmentCancelled,
            id,
            None,
            None,
        );
        info!(appointment_id = %id, "appointment cancelled");
        Ok(())
    }

    async fn renumber_after_removal(&self, barber_id: Uuid, date: NaiveDate, removed_id: Uuid) -> Result<()> {
        let snapshot = self.snapshot(barber_id, date).await?;
        let mut queue: Vec<&Appointment> = Self::active_queue(&snapshot)
            .into_iter()
            .filter(|a| a.id != removed_id)
            .collect();
        queue.sort_by_key(|a| a.queue_position.unwrap_or(i32::MAX));
        let mapping: Vec<(Uuid, i32)> = queue
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id, i as i32 + 1))
            .collect();
        if !mapping.is_empty() {
            self.repository.renumber_queue(barber_id, date, &mapping).await?;
            for (id, _) in &mapping {
                self.events.publish(barber_id, date, EventType::QueuePositionChanged, *id, None, None);
            }
        }
        Ok(())
    }

    /// Applies a status transition, rejecting any move the state machine disallows.
    pub async fn transition_status(
        &self,
        id: Uuid,
        new_status: AppointmentStatus,
        expected_version: i32,
    ) -> Result<()> {
        let current = self.repository.get_appointment(id).await?;
        let _guard = self.acquire(current.barber_id, current.service_date).await;
        let current = self.repository.get_appointment(id).await?;

        if !current.status.can_transition_to(new_status) {
            warn!(appointment_id = %id, from = ?current.status, to = ?new_status, "rejected invalid status transition");
            return Err(EngineError::InvalidTransition {
                from: current.status,
                to: new_status,
            });
        }

        self.update_checked(
            id,
            expected_version,
            AppointmentPatch {
                status: Some(new_status),
                ..Default::default()
            },
        )
        .await?;

        if new_status == AppointmentStatus::Cancelled && current.appointment_kind == AppointmentKind::Queue {
            self.renumber_after_removal(current.barber_id, current.service_date, id)
                .await?;
        }

        self.events.publish(
            current.barber_id,
            current.service_date,
            EventType::AppointmentStatusChanged,
            id,
            None,
            None,
        );
        info!(appointment_id = %id, to = ?new_status, "appointment status transitioned");
        Ok(())
    }

    /// Changes an appointment's priority and re-derives queue order by stable
    /// `(priority_rank asc, created_at asc)`.
    pub async fn change_priority(&self, id: Uuid, new_priority: Priority, expected_version: i32) -> Result<()> {
        let current = self.repository.get_appointment(id).await?;
        let _guard = self.acquire(current.barber_id, current.service_date).await;
        let current = self.repository.get_appointment(id).await?;

        self.update_checked(
            id,
            expected_version,
            AppointmentPatch {
                priority: Some(new_priority),
                ..Default::default()
            },
        )
        .await?;

        if current.appointment_kind == AppointmentKind::Queue {
            let mut snapshot = self.snapshot(current.barber_id, current.service_date).await?;
            if let Some(row) = snapshot.iter_mut().find(|a| a.id == id) {
                row.priority = new_priority;
            }
            let ordered_ids = timeline::reorder_queue_by_priority(&snapshot);
            let mapping: Vec<(Uuid, i32)> = ordered_ids
                .into_iter()
                .enumerate()
                .map(|(i, aid)| (aid, i as i32 + 1))
                .collect();
            self.repository
                .renumber_queue(current.barber_id, current.service_date, &mapping)
                .await?;
            for (aid, _) in &mapping {
                self.events.publish(
                    current.barber_id,
                    current.service_date,
                    EventType::QueuePositionChanged,
                    *aid,
                    None,
                    None,
                );
            }
        }

        self.events.publish(
            current.barber_id,
            current.service_date,
            EventType::QueuePriorityChanged,
            id,
            None,
            None,
        );
        Ok(())
    }

    /// Moves a queue row to `new_position`, shifting the affected contiguous
    /// run by one to make room.
    pub async fn move_queue_position(&self, id: Uuid, new_position: i32, expected_version: i32) -> Result<()> {
        let current = self.repository.get_appointment(id).await?;
        let _guard = self.acquire(current.barber_id, current.service_date).await;
        let current = self.repository.get_appointment(id).await?;

        if current.appointment_kind != AppointmentKind::Queue {
            return Err(EngineError::InvalidRequest(
                "only queue appointments have a queue position".to_string(),
            ));
        }

        let snapshot = self.snapshot(current.barber_id, current.service_date).await?;
        let mut queue: Vec<&Appointment> = Self::active_queue(&snapshot);
        queue.sort_by_key(|a| a.queue_position.unwrap_or(i32::MAX));
        let active_len = queue.len() as i32;
        if new_position < 1 || new_position > active_len {
            return Err(EngineError::InvalidRequest(format!(
                "new_position must be between 1 and {active_len}"
            )));
        }

        let current_position = current
            .queue_position
            .ok_or_else(|| EngineError::Internal("queue row missing queue_position".to_string()))?;

        let mut ordered_ids: Vec<Uuid> = queue.iter().filter(|a| a.id != id).map(|a| a.id).collect();
        let insert_at = (new_position - 1) as usize;
        ordered_ids.insert(insert_at.min(ordered_ids.len()), id);

        let mapping: Vec<(Uuid, i32)> = ordered_ids
            .into_iter()
            .enumerate()
            .map(|(i, aid)| (aid, i as i32 + 1))
            .collect();

        self.update_checked(
            id,
            expected_version,
            AppointmentPatch {
                queue_position: Some(Some(new_position)),
                ..Default::default()
            },
        )
        .await?;
        self.repository
            .renumber_queue(current.barber_id, current.service_date, &mapping)
            .await?;

        for (aid, _) in &mapping {
            self.events.publish(
                current.barber_id,
                current.service_date,
                EventType::QueuePositionChanged,
                *aid,
                None,
                None,
            );
        }
        info!(appointment_id = %id, from = current_position, to = new_position, "queue position moved");
        Ok(())
    }

    /// Promotes a queue row to a scheduled appointment at its earliest bookable slot.
    pub async fn promote_queue_to_scheduled(&self, id: Uuid, expected_version: i32) -> Result<()> {
        let current = self.repository.get_appointment(id).await?;
        let _guard = self.acquire(current.barber_id, current.service_date).await;
        let current = self.repository.get_appointment(id).await?;

        if current.appointment_kind != AppointmentKind::Queue {
            return Err(EngineError::InvalidRequest("row is already scheduled".to_string()));
        }

        let snapshot = self.snapshot(current.barber_id, current.service_date).await?;
        let others: Vec<Appointment> = snapshot.iter().filter(|a| a.id != id).cloned().collect();
        let timeline = build_timeline(&others, &self.policy);
        let duration = current.total_duration_min as u16;
        let now_minute = if current.service_date == self.clock.today() {
            Some(self.clock.now_minutes())
        } else {
            None
        };
        let start = availability::next_available(&timeline, &self.policy, duration, now_minute)
            .ok_or(EngineError::SlotNotAvailable(Suggestions::default()))?;
        let start_time =
            NaiveTime::from_hms_opt((start / 60) as u32, (start % 60) as u32, 0).expect("validated minute-of-day");

        self.update_checked(
            id,
            expected_version,
            AppointmentPatch {
                appointment_kind: Some(AppointmentKind::Scheduled),
                start_time: Some(Some(start_time)),
                queue_position: Some(None),
                ..Default::default()
            },
        )
        .await?;

        self.renumber_after_removal(current.barber_id, current.service_date, id).await?;
        self.events.publish(
            current.barber_id,
            current.service_date,
            EventType::ScheduledTimeChanged,
            id,
            None,
            None,
        );
        Ok(())
    }

    /// Demotes a scheduled appointment back to the tail of the active queue,
    /// never to its former position.
    pub async fn demote_scheduled_to_queue(&self, id: Uuid, expected_version: i32) -> Result<()> {
        let current = self.repository.get_appointment(id).await?;
        let _guard = self.acquire(current.barber_id, current.service_date).await;
        let current = self.repository.get_appointment(id).await?;

        if current.appointment_kind != AppointmentKind::Scheduled {
            return Err(EngineError::InvalidRequest("row is already queued".to_string()));
        }

        let snapshot = self.snapshot(current.barber_id, current.service_date).await?;
        let next_position = Self::active_queue(&snapshot)
            .iter()
            .filter_map(|a| a.queue_position)
            .max()
            .unwrap_or(0)
            + 1;

        self.update_checked(
            id,
            expected_version,
            AppointmentPatch {
                appointment_kind: Some(AppointmentKind::Queue),
                start_time: Some(None),
                queue_position: Some(Some(next_position)),
                ..Default::default()
            },
        )
        .await?;

        self.events.publish(
            current.barber_id,
            current.service_date,
            EventType::QueuePositionChanged,
            id,
            None,
            None,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Barber, BarberStatus, Service};
    use crate::repository::MemoryRepository;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn setup() -> (
        BookingCoordinator,
        Uuid,
        NaiveDate,
        Uuid,
    ) {
        let repo = Arc::new(MemoryRepository::new());
        let barber_id = Uuid::new_v4();
        repo.seed_barber(Barber {
            id: barber_id,
            display_name: "Alex".to_string(),
            status: BarberStatus::Available,
            avg_rating: 4.8,
            rating_count: 10,
        });
        let service_id = Uuid::new_v4();
        repo.seed_service(Service {
            id: service_id,
            name: "Haircut".to_string(),
            duration_min: 45,
            price: 2500,
            active: true,
        });
        let catalog = Arc::new(CatalogCache::new(repo.clone(), Duration::from_secs(60)));
        let events = Arc::new(EventBus::new(16));
        let date = NaiveDate::from_ymd_opt(2025, 10, 10).unwrap();
        let clock = Arc::new(crate::clock::FixedClock::at(date, 9 * 60));
        let coordinator = BookingCoordinator::new(repo, catalog, events, clock, PolicyConfig::default());
        (coordinator, barber_id, date, service_id)
    }

    fn book_request(barber_id: Uuid, date: NaiveDate, service_id: Uuid, start_time: Option<&str>, key: &str) -> BookRequest {
        BookRequest {
            barber_id,
            service_date: date,
            kind: if start_time.is_some() {
                AppointmentKind::Scheduled
            } else {
                AppointmentKind::Queue
            },
            start_time: start_time.map(|s| s.to_string()),
            service_ids: vec![service_id],
            addon_ids: vec![],
            priority: Priority::Normal,
            customer_id: Some(Uuid::new_v4()),
            friend_block: None,
            notes: String::new(),
            idempotency_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn queue_full_suggests_next_available_date() {
        let (coordinator, barber_id, date, service_id) = setup();
        // 480 bookable minutes/day (08:00-17:00 minus lunch), 45 min/service:
        // the 11th queue booking (495 min) overruns the budget.
        for i in 0..10 {
            coordinator
                .book(book_request(barber_id, date, service_id, None, &format!("key-{i}")))
                .await
                .unwrap();
        }
        let result = coordinator
            .book(book_request(barber_id, date, service_id, None, "key-overflow"))
            .await;
        match result {
            Err(EngineError::QueueFull(suggestions)) => {
                assert_eq!(suggestions.next_available_date, Some(date + chrono::Duration::days(1)));
            }
            other => panic!("expected QueueFull with a suggestion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn books_a_scheduled_appointment() {
        let (coordinator, barber_id, date, service_id) = setup();
        let result = coordinator
            .book(book_request(barber_id, date, service_id, Some("09:00"), "key-1"))
            .await
            .unwrap();
        assert_eq!(result.kind, AppointmentKind::Scheduled);
        assert_eq!(result.start_time.as_deref(), Some("09:00"));
    }

    #[tokio::test]
    async fn rejects_a_scheduled_start_time_already_in_the_past_today() {
        // Clock in `setup()` reads 09:00 on `date`; 08:00 is already past.
        let (coordinator, barber_id, date, service_id) = setup();
        let result = coordinator
            .book(book_request(barber_id, date, service_id, Some("08:00"), "key-past"))
            .await;
        assert!(matches!(result, Err(EngineError::SlotNotAvailable(_))));
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_returns_the_same_appointment() {
        let (coordinator, barber_id, date, service_id) = setup();
        let first = coordinator
            .book(book_request(barber_id, date, service_id, None, "key-dup"))
            .await
            .unwrap();
        let second = coordinator
            .book(book_request(barber_id, date, service_id, None, "key-dup"))
            .await
            .unwrap();
        assert_eq!(first.appointment_id, second.appointment_id);
    }

    #[tokio::test]
    async fn urgent_queue_insert_takes_position_one() {
        let (coordinator, barber_id, date, service_id) = setup();
        coordinator
            .book(book_request(barber_id, date, service_id, None, "key-a"))
            .await
            .unwrap();
        let mut urgent = book_request(barber_id, date, service_id, None, "key-b");
        urgent.priority = Priority::Urgent;
        let result = coordinator.book(urgent).await.unwrap();
        assert_eq!(result.queue_position, Some(1));
    }

    #[tokio::test]
    async fn cancel_renumbers_remaining_queue() {
        let (coordinator, barber_id, date, service_id) = setup();
        let first = coordinator
            .book(book_request(barber_id, date, service_id, None, "key-1"))
            .await
            .unwrap();
        let second = coordinator
            .book(book_request(barber_id, date, service_id, None, "key-2"))
            .await
            .unwrap();
        assert_eq!(second.queue_position, Some(2));

        coordinator.cancel(first.appointment_id, first.version).await.unwrap();

        let remaining = coordinator.repository.get_appointment(second.appointment_id).await.unwrap();
        assert_eq!(remaining.queue_position, Some(1));
    }
}
