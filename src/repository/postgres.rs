/*!
 * Postgres Repository
 *
 * The production `Repository` implementation, one struct wrapping a
 * `PgPool`. Multi-statement mutations (priority-insert shifts, renumbering)
 * run inside a single `sqlx` transaction for all-or-nothing persistence —
 * the in-process coordinator lock (`engine::coordinator`) is the primary
 * serialization mechanism across `(barber_id, service_date)`; the
 * transaction here exists for atomicity of the already-serialized
 * operation, not for concurrency control.
 */

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AddOn, Appointment, AppointmentStatus, Barber, Service};
use crate::utils::{EngineError, Result};

use super::{AppointmentPatch, NewAppointment, Repository};

pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_appointments(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        statuses: &[AppointmentStatus],
    ) -> Result<Vec<Appointment>> {
        let rows = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, barber_id, customer_id, service_date, appointment_kind,
                   start_time, queue_position, priority, status, total_duration_min,
                   service_ids, addon_ids, total_price, notes, friend_name,
                   friend_phone, friend_email, primary_customer_id, idempotency_key,
                   created_at, updated_at, version
            FROM appointments
            WHERE barber_id = $1 AND service_date = $2 AND status = ANY($3)
            ORDER BY
                (appointment_kind = 'queue'),
                start_time ASC NULLS LAST,
                queue_position ASC NULLS LAST
            "#,
        )
        .bind(barber_id)
        .bind(date)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_services(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Service>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, Service>(
            "SELECT id, name, duration_min, price, active FROM services WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        let found: HashMap<Uuid, Service> = rows.into_iter().map(|s| (s.id, s)).collect();
        if let Some(missing) = ids.iter().find(|id| !found.contains_key(id)) {
            return Err(EngineError::UnknownService(*missing));
        }
        Ok(found)
    }

    async fn get_addons(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, AddOn>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, AddOn>(
            "SELECT id, name, duration_min, price, active FROM addons WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        let found: HashMap<Uuid, AddOn> = rows.into_iter().map(|a| (a.id, a)).collect();
        if let Some(missing) = ids.iter().find(|id| !found.contains_key(id)) {
            return Err(EngineError::UnknownAddOn(*missing));
        }
        Ok(found)
    }

    async fn get_barber(&self, id: Uuid) -> Result<Barber> {
        sqlx::query_as::<_, Barber>(
            "SELECT id, display_name, status, avg_rating, rating_count FROM barbers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(EngineError::UnknownBarber(id))
    }

    async fn list_active_barbers(&self) -> Result<Vec<Barber>> {
        let rows = sqlx::query_as::<_, Barber>(
            "SELECT id, display_name, status, avg_rating, rating_count FROM barbers WHERE status <> 'offline'",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn is_day_off(&self, barber_id: Uuid, date: NaiveDate) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM days_off WHERE barber_id = $1 AND start_date <= $2 AND end_date >= $2 LIMIT 1",
        )
        .bind(barber_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn insert_appointment(&self, row: NewAppointment) -> Result<Appointment> {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (
                id, barber_id, customer_id, service_date, appointment_kind, start_time,
                queue_position, priority, status, total_duration_min, service_ids,
                addon_ids, total_price, notes, friend_name, friend_phone, friend_email,
                primary_customer_id, idempotency_key, created_at, updated_at, version
            )
            VALUES (
                gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, now(), now(), 1
            )
            RETURNING id, barber_id, customer_id, service_date, appointment_kind,
                      start_time, queue_position, priority, status, total_duration_min,
                      service_ids, addon_ids, total_price, notes, friend_name,
                      friend_phone, friend_email, primary_customer_id, idempotency_key,
                      created_at, updated_at, version
            "#,
        )
        .bind(row.barber_id)
        .bind(row.customer_id)
        .bind(row.service_date)
        .bind(row.appointment_kind)
        .bind(row.start_time)
        .bind(row.queue_position)
        .bind(row.priority)
        .bind(row.status)
        .bind(row.total_duration_min)
        .bind(&row.service_ids)
        .bind(&row.addon_ids)
        .bind(row.total_price)
        .bind(&row.notes)
        .bind(&row.friend_name)
        .bind(&row.friend_phone)
        .bind(&row.friend_email)
        .bind(row.primary_customer_id)
        .bind(&row.idempotency_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(appointment)
    }

    async fn update_appointment(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
        expected_version: i32,
    ) -> Result<Appointment> {
        // Conditional UPDATE ... WHERE id = $1 AND version = $2: zero rows affected
        // is indistinguishable between "missing" and "stale version" from the
        // RETURNING clause alone, so a miss is probed separately to pick the
        // right error.
        let updated = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments SET
                appointment_kind = COALESCE($3, appointment_kind),
                start_time = CASE WHEN $4 THEN $5 ELSE start_time END,
                queue_position = CASE WHEN $6 THEN $7 ELSE queue_position END,
                priority = COALESCE($8, priority),
                status = COALESCE($9, status),
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2
            RETURNING id, barber_id, customer_id, service_date, appointment_kind,
                      start_time, queue_position, priority, status, total_duration_min,
                      service_ids, addon_ids, total_price, notes, friend_name,
                      friend_phone, friend_email, primary_customer_id, idempotency_key,
                      created_at, updated_at, version
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(patch.appointment_kind)
        .bind(patch.start_time.is_some())
        .bind(patch.start_time.flatten())
        .bind(patch.queue_position.is_some())
        .bind(patch.queue_position.flatten())
        .bind(patch.priority)
        .bind(patch.status)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(row) => Ok(row),
            None => {
                let exists: Option<(i64,)> =
                    sqlx::query_as("SELECT 1 FROM appointments WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;
                if exists.is_some() {
                    Err(EngineError::VersionConflict)
                } else {
                    Err(EngineError::UnknownAppointment(id))
                }
            }
        }
    }

    async fn renumber_queue(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        mapping: &[(Uuid, i32)],
    ) -> Result<()> {
        if mapping.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for (id, position) in mapping {
            let result = sqlx::query(
                r#"
                UPDATE appointments
                SET queue_position = $1, version = version + 1, updated_at = now()
                WHERE id = $2 AND barber_id = $3 AND service_date = $4
                "#,
            )
            .bind(position)
            .bind(id)
            .bind(barber_id)
            .bind(date)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(EngineError::UnknownAppointment(*id));
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_idempotency_key(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        key: &str,
    ) -> Result<Option<Appointment>> {
        let row = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, barber_id, customer_id, service_date, appointment_kind,
                   start_time, queue_position, priority, status, total_duration_min,
                   service_ids, addon_ids, total_price, notes, friend_name,
                   friend_phone, friend_email, primary_customer_id, idempotency_key,
                   created_at, updated_at, version
            FROM appointments
            WHERE barber_id = $1 AND service_date = $2 AND idempotency_key = $3
            "#,
        )
        .bind(barber_id)
        .bind(date)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Appointment> {
        sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, barber_id, customer_id, service_date, appointment_kind,
                   start_time, queue_position, priority, status, total_duration_min,
                   service_ids, addon_ids, total_price, notes, friend_name,
                   friend_phone, friend_email, primary_customer_id, idempotency_key,
                   created_at, updated_at, version
            FROM appointments WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(EngineError::UnknownAppointment(id))
    }
}
