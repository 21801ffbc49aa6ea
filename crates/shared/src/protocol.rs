use serde::{Deserialize, Serialize};

use crate::domain::{Donor, DonorId};

/// Identifies one registered change listener on a record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Inserted,
    Updated,
}

/// Push notification emitted by the record store after a write. Carries the
/// donor's new field values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DonorChange {
    Inserted(Donor),
    Updated(Donor),
}

impl DonorChange {
    pub fn kind(&self) -> ChangeKind {
        match self {
            DonorChange::Inserted(_) => ChangeKind::Inserted,
            DonorChange::Updated(_) => ChangeKind::Updated,
        }
    }

    pub fn donor(&self) -> &Donor {
        match self {
            DonorChange::Inserted(donor) | DonorChange::Updated(donor) => donor,
        }
    }

    pub fn donor_id(&self) -> DonorId {
        self.donor().id
    }
}
