//! ExternalCalendar: a calendar inside a home owned by another pod

use async_trait::async_trait;
use podstore_interface::{Calendar, CalendarObject, ChildRef, ObjectRef, ResourceId, Result};
use std::sync::Arc;
use tracing::debug;

use crate::conduit::TxnContext;
use crate::object::ExternalCalendarObject;
use crate::wire;

/// Calendar of a foreign home.
///
/// Adds nothing over the base lookups; it exists so that objects found
/// through it come back as [`ExternalCalendarObject`]s.
#[derive(Debug, Clone)]
pub struct ExternalCalendar {
    reference: ChildRef,
    txn: TxnContext,
}

impl ExternalCalendar {
    pub fn new(txn: TxnContext, reference: ChildRef) -> Self {
        Self { reference, txn }
    }

    pub fn reference(&self) -> &ChildRef {
        &self.reference
    }

    /// Object construction hook
    fn make_object(&self, record: wire::CalendarObjectRecord) -> Arc<dyn CalendarObject> {
        let reference = ObjectRef {
            child: self.reference.clone(),
            resource_id: record.resource_id,
            name: record.name,
        };
        Arc::new(ExternalCalendarObject::new(
            self.txn.clone(),
            reference,
            record.uid,
            record.component,
        ))
    }
}

#[async_trait]
impl Calendar for ExternalCalendar {
    fn name(&self) -> &str {
        &self.reference.name
    }

    fn resource_id(&self) -> ResourceId {
        self.reference.resource_id
    }

    async fn list_object_names(&self) -> Result<Vec<String>> {
        Ok(self
            .txn
            .conduit()
            .send_child_list_objects(&self.reference)
            .await?)
    }

    async fn object_with_name(&self, name: &str) -> Result<Option<Arc<dyn CalendarObject>>> {
        debug!(
            home = %self.reference.home,
            calendar = %self.reference.name,
            name,
            "Looking up remote calendar object"
        );
        let raw = self
            .txn
            .conduit()
            .send_child_object_with_name(&self.reference, name)
            .await?;

        match raw {
            Some(raw) => Ok(Some(
                self.make_object(wire::deserialize_calendar_object(&raw)?),
            )),
            None => Ok(None),
        }
    }

    async fn create_object(
        &self,
        name: &str,
        component: &str,
    ) -> Result<Arc<dyn CalendarObject>> {
        ExternalCalendarObject::create_internal(&self.reference, name, component)
    }
}
