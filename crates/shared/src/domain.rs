use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(DonorId);

/// ABO/Rh blood group. The directory's closed category set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APositive,
        BloodGroup::ANegative,
        BloodGroup::BPositive,
        BloodGroup::BNegative,
        BloodGroup::AbPositive,
        BloodGroup::AbNegative,
        BloodGroup::OPositive,
        BloodGroup::ONegative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
        }
    }

    /// ABO letters without the Rh sign, e.g. `"AB"`.
    pub fn abo(self) -> &'static str {
        let label = self.as_str();
        &label[..label.len() - 1]
    }

    pub fn is_rh_positive(self) -> bool {
        self.as_str().ends_with('+')
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodGroup {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim();
        BloodGroup::ALL
            .into_iter()
            .find(|group| group.as_str().eq_ignore_ascii_case(normalized))
            .ok_or_else(|| DomainError::UnknownBloodGroup(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(DomainError::UnknownGender(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donor {
    pub id: DonorId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub blood_group: BloodGroup,
    pub gender: Gender,
    pub age: u8,
    pub location: String,
    pub address: Option<String>,
    pub last_donation_date: Option<NaiveDate>,
    pub medical_conditions: Option<String>,
    pub emergency_contact: String,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Donor {
    /// Textual fields consulted by free-text search, in match priority order.
    pub fn searchable_text(&self) -> [&str; 3] {
        [
            self.name.as_str(),
            self.location.as_str(),
            self.address.as_deref().unwrap_or_default(),
        ]
    }
}

/// Registration payload. Stored donors start out available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDonor {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub blood_group: BloodGroup,
    pub gender: Gender,
    pub age: u8,
    pub location: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub last_donation_date: Option<NaiveDate>,
    #[serde(default)]
    pub medical_conditions: Option<String>,
    pub emergency_contact: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorPatch {
    pub phone: Option<String>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub last_donation_date: Option<NaiveDate>,
    pub is_available: Option<bool>,
}

impl DonorPatch {
    pub fn availability(is_available: bool) -> Self {
        Self {
            is_available: Some(is_available),
            ..Self::default()
        }
    }
}

/// The filters a user currently wants answered. Values are never edited in
/// place; every change produces a new set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredicateSet {
    category: Option<BloodGroup>,
    free_text: Option<String>,
}

impl PredicateSet {
    pub fn new(category: Option<BloodGroup>, free_text: Option<&str>) -> Self {
        Self {
            category,
            free_text: normalize_free_text(free_text),
        }
    }

    pub fn unfiltered() -> Self {
        Self::default()
    }

    pub fn category(&self) -> Option<BloodGroup> {
        self.category
    }

    pub fn free_text(&self) -> Option<&str> {
        self.free_text.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.free_text.is_none()
    }

    pub fn with_category(&self, category: Option<BloodGroup>) -> Self {
        Self {
            category,
            free_text: self.free_text.clone(),
        }
    }

    pub fn with_free_text(&self, free_text: Option<&str>) -> Self {
        Self {
            category: self.category,
            free_text: normalize_free_text(free_text),
        }
    }

    /// Reference semantics of the store-side filter, including the
    /// availability precondition.
    pub fn matches(&self, donor: &Donor) -> bool {
        if !donor.is_available {
            return false;
        }
        if let Some(category) = self.category {
            if donor.blood_group != category {
                return false;
            }
        }
        match &self.free_text {
            None => true,
            Some(needle) => {
                let needle = fold_for_search(needle);
                donor
                    .searchable_text()
                    .iter()
                    .any(|field| fold_for_search(field).contains(&needle))
            }
        }
    }
}

impl fmt::Display for PredicateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.category, &self.free_text) {
            (None, None) => f.write_str("all blood groups"),
            (Some(group), None) => write!(f, "{group}"),
            (None, Some(text)) => write!(f, "all blood groups matching \"{text}\""),
            (Some(group), Some(text)) => write!(f, "{group} matching \"{text}\""),
        }
    }
}

/// Case folding shared by every free-text comparison. Full Unicode
/// lower-casing, so "KÖLN" and "köln" compare equal.
pub fn fold_for_search(text: &str) -> String {
    text.to_lowercase()
}

/// Whitespace-only text means no filter; anything else is kept verbatim.
fn normalize_free_text(free_text: Option<&str>) -> Option<String> {
    free_text
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn donor(name: &str, group: BloodGroup, location: &str) -> Donor {
        let now = Utc::now();
        Donor {
            id: DonorId(1),
            name: name.into(),
            email: "donor@example.com".into(),
            phone: "+91 9876543210".into(),
            blood_group: group,
            gender: Gender::Female,
            age: 29,
            location: location.into(),
            address: Some("12 Marine Drive".into()),
            last_donation_date: None,
            medical_conditions: None,
            emergency_contact: "+91 9000000000".into(),
            is_available: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn parses_blood_groups_case_insensitively() {
        assert_eq!("ab-".parse::<BloodGroup>().expect("ab-"), BloodGroup::AbNegative);
        assert_eq!(" O+ ".parse::<BloodGroup>().expect("o+"), BloodGroup::OPositive);
        assert!("C+".parse::<BloodGroup>().is_err());
    }

    #[test]
    fn abo_strips_rh_sign() {
        assert_eq!(BloodGroup::AbPositive.abo(), "AB");
        assert_eq!(BloodGroup::ONegative.abo(), "O");
        assert!(!BloodGroup::ONegative.is_rh_positive());
    }

    #[test]
    fn blank_free_text_is_absent() {
        let predicates = PredicateSet::new(None, Some("   "));
        assert!(predicates.is_empty());
        assert_eq!(predicates, PredicateSet::unfiltered());
    }

    #[test]
    fn non_blank_free_text_is_kept_verbatim() {
        let predicates = PredicateSet::new(None, Some("Kumar "));
        assert_eq!(predicates.free_text(), Some("Kumar "));
        assert_eq!(
            PredicateSet::unfiltered().with_free_text(Some(" 100%")).free_text(),
            Some(" 100%")
        );
    }

    #[test]
    fn folding_is_unicode_aware() {
        assert_eq!(fold_for_search("Émile Łukasz"), "émile łukasz");
        let mut emile = donor("Émile Łukasz", BloodGroup::ANegative, "Köln");
        emile.address = None;
        assert!(PredicateSet::new(None, Some("ÉMILE")).matches(&emile));
        assert!(PredicateSet::new(None, Some("KÖLN")).matches(&emile));
    }

    #[test]
    fn free_text_matches_name_location_or_address() {
        let priya = donor("Priya Sharma", BloodGroup::OPositive, "Delhi");
        assert!(PredicateSet::new(None, Some("priya")).matches(&priya));
        assert!(PredicateSet::new(None, Some("DEL")).matches(&priya));
        assert!(PredicateSet::new(None, Some("marine")).matches(&priya));
        assert!(!PredicateSet::new(None, Some("mumbai")).matches(&priya));
    }

    #[test]
    fn category_is_exact_and_unavailable_donors_never_match() {
        let mut amit = donor("Amit Singh", BloodGroup::APositive, "Bangalore");
        assert!(PredicateSet::new(Some(BloodGroup::APositive), None).matches(&amit));
        assert!(!PredicateSet::new(Some(BloodGroup::AbPositive), None).matches(&amit));
        amit.is_available = false;
        assert!(!PredicateSet::unfiltered().matches(&amit));
    }

    #[test]
    fn serializes_blood_group_with_symbolic_label() {
        let encoded = serde_json::to_string(&BloodGroup::AbNegative).expect("encode");
        assert_eq!(encoded, "\"AB-\"");
    }
}
