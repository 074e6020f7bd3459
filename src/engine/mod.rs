/*!
 * Scheduling Engine
 *
 * The appointment scheduling core: pure reasoning (`timeline`, `availability`,
 * `policy`) wrapped by the two stateful seams that own I/O and concurrency
 * (`coordinator` for writes, `facade` for reads), plus the ambient `events`
 * stream and `catalog_cache`.
 */

pub mod availability;
pub mod catalog_cache;
pub mod coordinator;
pub mod events;
pub mod facade;
pub mod policy;
pub mod timeline;

pub use availability::{BarberOption, Slot, SlotKind};
pub use catalog_cache::CatalogCache;
pub use coordinator::BookingCoordinator;
pub use events::{EventBus, EventRecord, EventSubscription, EventType};
pub use facade::QueryFacade;
pub use timeline::{Block, BlockKind};
