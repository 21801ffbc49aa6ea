use super::*;

#[test]
fn spoken_sign_maps_to_group() {
    assert_eq!(
        match_blood_group("find o positive donors"),
        Some(BloodGroup::OPositive)
    );
    assert_eq!(match_blood_group("B Minus"), Some(BloodGroup::BNegative));
    assert_eq!(match_blood_group("any a plus donor"), Some(BloodGroup::APositive));
}

#[test]
fn literal_label_maps_to_group() {
    assert_eq!(match_blood_group("need O+ urgently"), Some(BloodGroup::OPositive));
    assert_eq!(match_blood_group("the o- group"), Some(BloodGroup::ONegative));
}

#[test]
fn longer_group_wins_over_nested_suffix() {
    assert_eq!(
        match_blood_group("need ab positive blood"),
        Some(BloodGroup::AbPositive)
    );
    assert_eq!(match_blood_group("AB-"), Some(BloodGroup::AbNegative));
}

#[test]
fn repeated_mentions_of_one_group_still_match() {
    assert_eq!(
        match_blood_group("o positive, I said o+"),
        Some(BloodGroup::OPositive)
    );
}

#[test]
fn ambiguous_or_missing_group_is_no_match() {
    assert_eq!(match_blood_group("a negative or b negative"), None);
    assert_eq!(match_blood_group("hello there"), None);
    assert_eq!(match_blood_group(""), None);
}

#[test]
fn spoken_forms_cover_label_and_sign_words() {
    assert_eq!(
        spoken_forms(BloodGroup::AbNegative),
        vec!["ab-", "ab negative", "ab minus"]
    );
}

#[tokio::test]
async fn unsupported_recognizer_reports_capability_unavailable() {
    let err = UnsupportedRecognizer
        .recognize()
        .await
        .expect_err("no speech support");
    assert!(matches!(
        err,
        SearchError::CapabilityUnavailable {
            capability: VOICE_CAPABILITY,
            ..
        }
    ));
}
