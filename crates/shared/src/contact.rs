//! Call and message links for a donor card.

use url::Url;

use crate::domain::Donor;

pub const APP_NAME: &str = "Blood Connect";

pub fn dial_uri(phone: &str) -> String {
    let compact: String = phone.chars().filter(|ch| !ch.is_whitespace()).collect();
    format!("tel:{compact}")
}

pub fn donation_request_message(donor: &Donor) -> String {
    format!(
        "Hi {}, I found your contact through {APP_NAME}. I need {} blood donation. Could you please help?",
        donor.name, donor.blood_group
    )
}

pub fn whatsapp_uri(donor: &Donor) -> Result<Url, url::ParseError> {
    let digits: String = donor.phone.chars().filter(char::is_ascii_digit).collect();
    Url::parse_with_params(
        &format!("https://wa.me/{digits}"),
        [("text", donation_request_message(donor))],
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{BloodGroup, DonorId, Gender};

    fn rajesh() -> Donor {
        let now = Utc::now();
        Donor {
            id: DonorId(1),
            name: "Rajesh Kumar".into(),
            email: "rajesh@example.com".into(),
            phone: "+91 98765-43210".into(),
            blood_group: BloodGroup::OPositive,
            gender: Gender::Male,
            age: 34,
            location: "Mumbai".into(),
            address: None,
            last_donation_date: None,
            medical_conditions: None,
            emergency_contact: "+91 9000000001".into(),
            is_available: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn dial_uri_drops_whitespace() {
        assert_eq!(dial_uri("+91 98765 43210"), "tel:+919876543210");
    }

    #[test]
    fn whatsapp_uri_keeps_digits_and_encodes_message() {
        let uri = whatsapp_uri(&rajesh()).expect("uri");
        assert_eq!(uri.host_str(), Some("wa.me"));
        assert_eq!(uri.path(), "/919876543210");
        let text = uri
            .query_pairs()
            .find(|(key, _)| key == "text")
            .map(|(_, value)| value.into_owned())
            .expect("text param");
        assert!(text.starts_with("Hi Rajesh Kumar"));
        assert!(text.contains("I need O+ blood donation"));
    }
}
