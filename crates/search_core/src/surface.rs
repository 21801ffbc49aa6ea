use std::{fmt, sync::Arc};

use serde::Serialize;
use shared::domain::{BloodGroup, Donor, DonorId};

use crate::reconcile::ResultSnapshot;

/// Non-blocking notices for the user. None of these represent a failed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Advisory {
    CapabilityUnavailable {
        capability: String,
        detail: String,
    },
    LiveUpdatesUnavailable {
        reason: String,
    },
    NewArrival {
        donor_id: DonorId,
        name: String,
        blood_group: BloodGroup,
        location: String,
    },
}

impl Advisory {
    pub fn new_arrival(donor: &Donor) -> Self {
        Advisory::NewArrival {
            donor_id: donor.id,
            name: donor.name.clone(),
            blood_group: donor.blood_group,
            location: donor.location.clone(),
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::CapabilityUnavailable { capability, detail } => {
                write!(f, "{capability} is not available: {detail}")
            }
            Advisory::LiveUpdatesUnavailable { reason } => {
                write!(f, "Live updates are off for this session ({reason})")
            }
            Advisory::NewArrival {
                name,
                blood_group,
                location,
                ..
            } => write!(f, "New {blood_group} donor registered: {name} ({location})"),
        }
    }
}

/// Everything the presentation layer is told. Implementations render only.
pub trait PresentationSurface: Send + Sync {
    fn render(&self, snapshot: Arc<ResultSnapshot>);
    fn advise(&self, advisory: Advisory);
}
