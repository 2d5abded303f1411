//! Slot allocation for vaccination appointments.
//!
//! The leaves (`priority`, `availability`, `slots`) are pure functions. The allocator and
//! the reconciliation engine work against the [`SchedulingRepository`] and
//! [`NotificationSink`] traits, and [`SchedulingService`] layers registration, queries and
//! statistics on top.

pub mod allocator;
pub mod availability;
pub mod domain;
pub mod memory;
pub mod notify;
pub mod priority;
pub mod queries;
pub mod reconciliation;
pub mod repository;
pub mod requests;
pub mod service;
pub mod slots;
pub mod statistics;

#[cfg(test)]
mod tests;

pub use allocator::{
    first_free_slot, AllocationOutcome, AppointmentAllocator, DeferReason, SlotPlan,
};
pub use availability::{resolve_availability, Interval};
pub use domain::{
    Appointment, AvailabilityWindow, DayOfWeek, Facility, FacilityId, FullyVaccinated,
    Registrant, RegistrantId, RegistrationId, TimeWindow, VaccinationRecord, WaitlistEntry,
};
pub use memory::{InMemoryNotificationSink, InMemorySchedulingRepository};
pub use notify::TracingNotificationSink;
pub use priority::compute_priority;
pub use queries::{AppointmentFilter, ValidTimeFilter, VaccinationFilter};
pub use reconciliation::{
    CapacityDelta, DeferredAllocation, ReconciliationEngine, ReconciliationError,
    ReconciliationPhase, ReconciliationReport,
};
pub use repository::{NotificationError, NotificationSink, RepositoryError, SchedulingRepository};
pub use requests::{
    FacilityChange, FacilityDraft, FacilitySelection, RegistrantDraft, WindowChange, WindowSpec,
};
pub use service::{RegisteredView, SchedulingService, ServiceError};
pub use slots::{search_slot, SlotPolicy, SlotProbe};
pub use statistics::Statistics;
