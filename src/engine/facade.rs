/*!
 * Query Facade
 *
 * The read-only counterpart to the Booking Coordinator. Thin and stateless:
 * resolves a request via the Repository plus the Timeline Builder and
 * Availability Engine, and returns DTOs. Never acquires the coordinator's
 * per-key lock — reads run lock-free against repository snapshots.
 */

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::PolicyConfig;
use crate::engine::availability::{self, BarberOption, Slot};
use crate::engine::catalog_cache::CatalogCache;
use crate::engine::timeline::build_timeline;
use crate::models::{Appointment, AppointmentStatus};
use crate::repository::Repository;
use crate::utils::Result;

const ACTIVE_STATUSES: [AppointmentStatus; 3] = [
    AppointmentStatus::Pending,
    AppointmentStatus::Confirmed,
    AppointmentStatus::Ongoing,
];

pub struct QueryFacade {
    repository: Arc<dyn Repository>,
    catalog: Arc<CatalogCache>,
    clock: Arc<dyn Clock>,
    policy: PolicyConfig,
}

impl QueryFacade {
    pub fn new(
        repository: Arc<dyn Repository>,
        catalog: Arc<CatalogCache>,
        clock: Arc<dyn Clock>,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            repository,
            catalog,
            clock,
            policy,
        }
    }

    async fn active_snapshot(&self, barber_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>> {
        self.repository
            .list_appointments(barber_id, date, &ACTIVE_STATUSES)
            .await
    }

    async fn total_duration(&self, service_ids: &[Uuid], addon_ids: &[Uuid]) -> Result<u16> {
        let services = self.catalog.resolve_services(service_ids).await?;
        let addons = self.catalog.resolve_addons(addon_ids).await?;
        let total = services.values().map(|s| s.duration_min).sum::<i32>()
            + addons.values().map(|a| a.duration_min).sum::<i32>();
        Ok(total as u16)
    }

    fn now_minute_for(&self, date: NaiveDate) -> Option<u16> {
        if date == self.clock.today() {
            Some(self.clock.now_minutes())
        } else {
            None
        }
    }

    /// Classifies every candidate grid slot for one barber/date/service duration.
    pub async fn unified_slots(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        service_ids: &[Uuid],
        addon_ids: &[Uuid],
    ) -> Result<Vec<Slot>> {
        let duration = self.total_duration(service_ids, addon_ids).await?;
        let snapshot = self.active_snapshot(barber_id, date).await?;
        let timeline = build_timeline(&snapshot, &self.policy);
        Ok(availability::unified_slots(
            &timeline,
            &self.policy,
            duration,
            self.now_minute_for(date),
        ))
    }

    /// The earliest bookable slot for one barber/date/service duration.
    pub async fn next_available(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        service_ids: &[Uuid],
        addon_ids: &[Uuid],
    ) -> Result<Option<u16>> {
        let duration = self.total_duration(service_ids, addon_ids).await?;
        let snapshot = self.active_snapshot(barber_id, date).await?;
        let timeline = build_timeline(&snapshot, &self.policy);
        Ok(availability::next_available(
            &timeline,
            &self.policy,
            duration,
            self.now_minute_for(date),
        ))
    }

    /// Finds other bookable barbers for the given date/service, sorted by the
    /// tie-break chain in `availability::sort_alternatives`.
    pub async fn find_alternatives(
        &self,
        date: NaiveDate,
        service_ids: &[Uuid],
        addon_ids: &[Uuid],
        exclude_barber_id: Option<Uuid>,
    ) -> Result<Vec<BarberOption>> {
        let duration = self.total_duration(service_ids, addon_ids).await?;
        let barbers = self.repository.list_active_barbers().await?;
        let now_minute = self.now_minute_for(date);

        let mut options = Vec::new();
        for barber in barbers {
            if Some(barber.id) == exclude_barber_id {
                continue;
            }
            if self.repository.is_day_off(barber.id, date).await? {
                continue;
            }
            let snapshot = self.active_snapshot(barber.id, date).await?;
            let timeline = build_timeline(&snapshot, &self.policy);
            options.push(availability::barber_option(
                &barber,
                &timeline,
                &self.policy,
                duration,
                now_minute,
            ));
        }
        availability::sort_alternatives(&mut options);
        Ok(options)
    }

    /// Looks up a single appointment by id, for status/detail reads.
    pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment> {
        self.repository.get_appointment(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Barber, BarberStatus, Service};
    use crate::repository::MemoryRepository;
    use std::time::Duration;

    fn setup() -> (QueryFacade, Uuid, NaiveDate, Uuid) {
        let repo = Arc::new(MemoryRepository::new());
        let barber_id = Uuid::new_v4();
        repo.seed_barber(Barber {
            id: barber_id,
            display_name: "Sam".to_string(),
            status: BarberStatus::Available,
            avg_rating: 4.5,
            rating_count: 3,
        });
        let service_id = Uuid::new_v4();
        repo.seed_service(Service {
            id: service_id,
            name: "Trim".to_string(),
            duration_min: 30,
            price: 1500,
            active: true,
        });
        let date = NaiveDate::from_ymd_opt(2025, 10, 10).unwrap();
        let clock = Arc::new(crate::clock::FixedClock::at(date, 9 * 60));
        let catalog = Arc::new(CatalogCache::new(repo.clone(), Duration::from_secs(60)));
        let facade = QueryFacade::new(repo, catalog, clock, PolicyConfig::default());
        (facade, barber_id, date, service_id)
    }

    #[tokio::test]
    async fn unified_slots_reports_availability_on_an_empty_day() {
        let (facade, barber_id, date, service_id) = setup();
        let slots = facade
            .unified_slots(barber_id, date, &[service_id], &[])
            .await
            .unwrap();
        assert!(slots.iter().any(|s| s.bookable));
    }

    #[tokio::test]
    async fn find_alternatives_excludes_the_requesting_barber() {
        let (facade, barber_id, date, service_id) = setup();
        let options = facade
            .find_alternatives(date, &[service_id], &[], Some(barber_id))
            .await
            .unwrap();
        assert!(options.iter().all(|o| o.barber_id != barber_id));
    }
}
