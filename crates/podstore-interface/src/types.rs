//! Identifiers and reference descriptors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned identifier of a home, calendar, object or attachment.
///
/// Only meaningful on the pod that assigned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub i64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ResourceId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Name of a pod in the federation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PodId(String);

impl PodId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a home that lives on another pod.
///
/// The descriptor carries no data of the home itself. Uniqueness of
/// `resource_id` is the owning pod's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignRef {
    owner_uid: String,
    resource_id: ResourceId,
    owner_pod: Option<PodId>,
}

impl ForeignRef {
    pub fn new(owner_uid: impl Into<String>, resource_id: ResourceId) -> Self {
        Self {
            owner_uid: owner_uid.into(),
            resource_id,
            owner_pod: None,
        }
    }

    /// Attach a hint naming the pod believed to own the home
    pub fn with_owner_pod(mut self, pod: PodId) -> Self {
        self.owner_pod = Some(pod);
        self
    }

    pub fn owner_uid(&self) -> &str {
        &self.owner_uid
    }

    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    pub fn owner_pod(&self) -> Option<&PodId> {
        self.owner_pod.as_ref()
    }
}

impl fmt::Display for ForeignRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner_pod {
            Some(pod) => write!(f, "{}#{}@{}", self.owner_uid, self.resource_id, pod),
            None => write!(f, "{}#{}", self.owner_uid, self.resource_id),
        }
    }
}

/// Address of a calendar inside a foreign home
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChildRef {
    pub home: ForeignRef,
    pub resource_id: ResourceId,
    pub name: String,
}

/// Address of a calendar object inside a foreign calendar
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub child: ChildRef,
    pub resource_id: ResourceId,
    pub name: String,
}

impl ObjectRef {
    pub fn home(&self) -> &ForeignRef {
        &self.child.home
    }
}

/// iCalendar component kinds that can have a default calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComponentType {
    Vevent,
    Vtodo,
}

impl ComponentType {
    pub const ALL: [ComponentType; 2] = [ComponentType::Vevent, ComponentType::Vtodo];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Vevent => "VEVENT",
            ComponentType::Vtodo => "VTODO",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which kind of entity an operation was attempted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Home,
    Calendar,
    CalendarObject,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Home => "CalendarHome",
            EntityKind::Calendar => "Calendar",
            EntityKind::CalendarObject => "CalendarObject",
        };
        f.write_str(name)
    }
}
