/*!
 * In-Memory Repository
 *
 * A test double for `Repository` backed by a `std::sync::Mutex`-guarded
 * `HashMap`. Used to unit-test the Booking Coordinator, Query Facade and
 * Event Bus without a Postgres instance. Not intended for production use —
 * it makes no attempt at durability or cross-process visibility.
 */

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{AddOn, Appointment, AppointmentStatus, Barber, DayOff, Service};
use crate::utils::{EngineError, Result};

use super::{AppointmentPatch, NewAppointment, Repository};

#[derive(Default)]
struct State {
    appointments: HashMap<Uuid, Appointment>,
    services: HashMap<Uuid, Service>,
    addons: HashMap<Uuid, AddOn>,
    barbers: HashMap<Uuid, Barber>,
    days_off: Vec<DayOff>,
}

/// In-memory `Repository` implementation for tests.
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// Seeds a service for tests; bypasses the repository trait since
    /// catalog writes are out of the engine's scope.
    pub fn seed_service(&self, service: Service) {
        self.state.lock().unwrap().services.insert(service.id, service);
    }

    pub fn seed_addon(&self, addon: AddOn) {
        self.state.lock().unwrap().addons.insert(addon.id, addon);
    }

    pub fn seed_barber(&self, barber: Barber) {
        self.state.lock().unwrap().barbers.insert(barber.id, barber);
    }

    pub fn seed_day_off(&self, day_off: DayOff) {
        self.state.lock().unwrap().days_off.push(day_off);
    }

    /// Directly seeds an appointment row (e.g. to set up a snapshot for a
    /// test), bypassing normal insertion so tests can construct arbitrary
    /// starting states including ones the coordinator would never produce.
    pub fn seed_appointment(&self, appointment: Appointment) {
        self.state
            .lock()
            .unwrap()
            .appointments
            .insert(appointment.id, appointment);
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_appointments(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        statuses: &[AppointmentStatus],
    ) -> Result<Vec<Appointment>> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| {
                a.barber_id == barber_id
                    && a.service_date == date
                    && statuses.contains(&a.status)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            use crate::models::AppointmentKind::*;
            let kind_rank = |k| match k {
                Scheduled => 0,
                Queue => 1,
            };
            kind_rank(a.appointment_kind)
                .cmp(&kind_rank(b.appointment_kind))
                .then(a.start_time.cmp(&b.start_time))
                .then(a.queue_position.cmp(&b.queue_position))
        });
        Ok(rows)
    }

    async fn get_services(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Service>> {
        let state = self.state.lock().unwrap();
        let mut missing = Vec::new();
        let mut out = HashMap::new();
        for id in ids {
            match state.services.get(id) {
                Some(s) => {
                    out.insert(*id, s.clone());
                }
                None => missing.push(*id),
            }
        }
        if let Some(id) = missing.into_iter().next() {
            return Err(EngineError::UnknownService(id));
        }
        Ok(out)
    }

    async fn get_addons(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, AddOn>> {
        let state = self.state.lock().unwrap();
        let mut missing = Vec::new();
        let mut out = HashMap::new();
        for id in ids {
            match state.addons.get(id) {
                Some(a) => {
                    out.insert(*id, a.clone());
                }
                None => missing.push(*id),
            }
        }
        if let Some(id) = missing.into_iter().next() {
            return Err(EngineError::UnknownAddOn(id));
        }
        Ok(out)
    }

    async fn get_barber(&self, id: Uuid) -> Result<Barber> {
        self.state
            .lock()
            .unwrap()
            .barbers
            .get(&id)
            .cloned()
            .ok_or(EngineError::UnknownBarber(id))
    }

    async fn list_active_barbers(&self) -> Result<Vec<Barber>> {
        Ok(self.state.lock().unwrap().barbers.values().cloned().collect())
    }

    async fn is_day_off(&self, barber_id: Uuid, date: NaiveDate) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .days_off
            .iter()
            .any(|d| d.barber_id == barber_id && d.covers(date)))
    }

    async fn insert_appointment(&self, row: NewAppointment) -> Result<Appointment> {
        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            barber_id: row.barber_id,
            customer_id: row.customer_id,
            service_date: row.service_date,
            appointment_kind: row.appointment_kind,
            start_time: row.start_time,
            queue_position: row.queue_position,
            priority: row.priority,
            status: row.status,
            total_duration_min: row.total_duration_min,
            service_ids: row.service_ids,
            addon_ids: row.addon_ids,
            total_price: row.total_price,
            notes: row.notes,
            friend_name: row.friend_name,
            friend_phone: row.friend_phone,
            friend_email: row.friend_email,
            primary_customer_id: row.primary_customer_id,
            idempotency_key: row.idempotency_key,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        self.state
            .lock()
            .unwrap()
            .appointments
            .insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update_appointment(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
        expected_version: i32,
    ) -> Result<Appointment> {
        let mut state = self.state.lock().unwrap();
        let row = state
            .appointments
            .get_mut(&id)
            .ok_or(EngineError::UnknownAppointment(id))?;
        if row.version != expected_version {
            return Err(EngineError::VersionConflict);
        }
        if let Some(kind) = patch.appointment_kind {
            row.appointment_kind = kind;
        }
        if let Some(start_time) = patch.start_time {
            row.start_time = start_time;
        }
        if let Some(queue_position) = patch.queue_position {
            row.queue_position = queue_position;
        }
        if let Some(priority) = patch.priority {
            row.priority = priority;
        }
        if let Some(status) = patch.status {
            row.status = status;
        }
        row.version += 1;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn renumber_queue(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        mapping: &[(Uuid, i32)],
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for (id, position) in mapping {
            let row = state
                .appointments
                .get_mut(id)
                .ok_or(EngineError::UnknownAppointment(*id))?;
            if row.barber_id != barber_id || row.service_date != date {
                return Err(EngineError::Internal(
                    "renumber_queue: row does not belong to the target timeline".to_string(),
                ));
            }
            row.queue_position = Some(*position);
            row.version += 1;
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn find_by_idempotency_key(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        key: &str,
    ) -> Result<Option<Appointment>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .appointments
            .values()
            .find(|a| {
                a.barber_id == barber_id
                    && a.service_date == date
                    && a.idempotency_key.as_deref() == Some(key)
            })
            .cloned())
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Appointment> {
        self.state
            .lock()
            .unwrap()
            .appointments
            .get(&id)
            .cloned()
            .ok_or(EngineError::UnknownAppointment(id))
    }
}
