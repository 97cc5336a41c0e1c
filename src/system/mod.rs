//! Local implementations of the entity traits
//!
//! This module holds the data a pod owns itself:
//! - `LocalStore`: every home on this pod
//! - `LocalCalendarHome`, `LocalCalendar`, `LocalCalendarObject`: the entities
//! - `MemoryAttachmentStorage`: attachment bytes

mod calendar;
mod home;
pub mod ical;
mod local;
mod object;
mod storage;

pub use calendar::LocalCalendar;
pub use home::LocalCalendarHome;
pub use local::{IdAllocator, LocalStore};
pub(crate) use object::checksum;
pub use object::{LocalCalendarObject, ManagedAttachment};
pub use storage::MemoryAttachmentStorage;
