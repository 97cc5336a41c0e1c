//! Podstore Connect: proxies for calendar entities owned by other pods
//!
//! A pod that loads a home living elsewhere gets an [`ExternalCalendarHome`]
//! instead of a local one. It implements the same
//! [`podstore_interface::CalendarHome`] trait, so generic store code holds
//! either kind interchangeably and only notices the difference when it
//! calls an operation the proxy refuses.
//!
//! # Architecture
//!
//! - **Conduit**: the request/response contract to the owning pod
//! - **capability**: static tables saying which operations are forwarded,
//!   refused, or ignored on foreign entities
//! - **ExternalCalendarHome / ExternalCalendar / ExternalCalendarObject**:
//!   the proxies themselves
//! - **ManagedAttachmentExternal**: the managed id returned by attachment
//!   mutations executed remotely
//!
//! # Example
//!
//! ```rust,no_run
//! use podstore_connect::{Conduit, ExternalCalendarHome, TxnContext};
//! use podstore_interface::{AttachmentStorage, CalendarHome, ForeignRef, ResourceId};
//! use std::sync::Arc;
//!
//! async fn example(
//!     conduit: Arc<dyn Conduit>,
//!     storage: Arc<dyn AttachmentStorage>,
//! ) -> anyhow::Result<()> {
//!     let txn = TxnContext::new("txn-1", conduit, storage);
//!     let home = ExternalCalendarHome::new(txn, ForeignRef::new("user01", ResourceId(7)));
//!
//!     // Forwarded to the owning pod
//!     let attachments = home.get_all_attachments().await?;
//!
//!     // Refused: this pod has no authority over the home's calendars
//!     assert!(home.split_calendars().await.is_err());
//!     Ok(())
//! }
//! ```

pub mod calendar;
pub mod capability;
pub mod conduit;
pub mod error;
pub mod home;
pub mod object;
pub mod wire;

#[cfg(test)]
mod mock;

pub use calendar::ExternalCalendar;
pub use capability::{Disposition, HomeOperation, ObjectOperation, Operation};
pub use conduit::{Conduit, ConduitResult, TxnContext};
pub use error::ConduitError;
pub use home::ExternalCalendarHome;
pub use object::{ExternalCalendarObject, ManagedAttachmentExternal};
pub use wire::RawRecord;
