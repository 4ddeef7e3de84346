use super::*;
use chrono::{Datelike, Local};
use serde_json::{Value, json};

fn check(validation_type: ValidationType, value: Value) -> RuleVerdict {
    ValidatorRegistry::standard()
        .validate(&value, &ValidationEntry::new(validation_type))
        .expect("registered rule")
}

fn passes(validation_type: ValidationType, value: Value) -> bool {
    check(validation_type, value).is_valid
}

fn token(validation_type: ValidationType, value: Value) -> Option<String> {
    check(validation_type, value).error_token
}

#[test]
fn standard_registry_covers_every_type() {
    let registry = ValidatorRegistry::standard();
    for validation_type in ValidationType::ALL {
        assert!(registry.contains(validation_type), "{validation_type}");
    }
    assert_eq!(
        registry
            .rule(ValidationType::Date)
            .expect("date rule")
            .default_args()["format"],
        json!("MM/DD/YYYY")
    );
}

#[test]
fn validation_type_names_parse() {
    for validation_type in ValidationType::ALL {
        assert_eq!(
            validation_type.as_str().parse::<ValidationType>(),
            Ok(validation_type)
        );
    }
    assert_eq!(
        "postcode".parse::<ValidationType>(),
        Err(FormError::UnknownValidationType("postcode".to_string()))
    );
}

#[test]
fn required_rule_rejects_blank_values() {
    assert!(!passes(ValidationType::Required, json!("")));
    assert!(!passes(ValidationType::Required, json!("   ")));
    assert!(!passes(ValidationType::Required, Value::Null));
    assert!(!passes(ValidationType::Required, json!([])));
    assert!(passes(ValidationType::Required, json!("a")));
    assert!(passes(ValidationType::Required, json!(0)));
    assert_eq!(
        token(ValidationType::Required, json!("")),
        Some(FIELD_REQUIRED.to_string())
    );
}

#[test]
fn email_rule_requires_dotted_domain() {
    assert!(passes(ValidationType::Email, json!("")));
    assert!(passes(ValidationType::Email, json!("test@test.com")));
    assert!(passes(ValidationType::Email, json!(" ada.lovelace@mail.example.org ")));
    assert!(!passes(ValidationType::Email, json!("test@")));
    assert!(!passes(ValidationType::Email, json!("test@red")));
    assert!(!passes(ValidationType::Email, json!("test@red.c")));
    assert!(!passes(ValidationType::Email, json!("not an email")));
    assert!(!passes(ValidationType::Email, json!(42)));
    assert_eq!(
        token(ValidationType::Email, json!("test@red")),
        Some(INVALID_EMAIL.to_string())
    );
}

#[test]
fn date_rule_checks_calendar_and_range() {
    assert!(passes(ValidationType::Date, json!("")));
    assert!(passes(ValidationType::Date, json!("02/28/2017")));
    assert!(passes(ValidationType::Date, json!("02/29/2016")));
    assert_eq!(
        token(ValidationType::Date, json!("02/29/2017")),
        Some(INVALID_DATE.to_string())
    );
    assert_eq!(
        token(ValidationType::Date, json!("13/01/2000")),
        Some(INVALID_DATE.to_string())
    );
    assert_eq!(
        token(ValidationType::Date, json!("01/01/1899")),
        Some(DATE_OUT_OF_RANGE.to_string())
    );
    assert_eq!(
        token(ValidationType::Date, json!("01/01/2101")),
        Some(DATE_OUT_OF_RANGE.to_string())
    );
}

#[test]
fn date_rule_honours_format_and_year_args() {
    let registry = ValidatorRegistry::standard();
    let iso = ValidationEntry::new(ValidationType::Date).arg("format", "YYYY-MM-DD");
    assert!(
        registry
            .validate(&json!("2020-02-29"), &iso)
            .expect("validate")
            .is_valid
    );
    assert!(
        !registry
            .validate(&json!("02/29/2020"), &iso)
            .expect("validate")
            .is_valid
    );

    let recent = ValidationEntry::new(ValidationType::Date).arg("minYear", 2000);
    let verdict = registry
        .validate(&json!("06/15/1995"), &recent)
        .expect("validate");
    assert_eq!(verdict.error_token.as_deref(), Some(DATE_OUT_OF_RANGE));
    assert_eq!(verdict.message, None);
}

#[test]
fn date_rule_accepts_single_letter_tokens() {
    let registry = ValidatorRegistry::standard();
    let loose = ValidationEntry::new(ValidationType::Date).arg("format", "M/D/YYYY");
    for text in ["1/5/2020", "12/25/2020", "01/05/2020"] {
        assert!(
            registry
                .validate(&json!(text), &loose)
                .expect("validate")
                .is_valid,
            "{text}"
        );
    }
    assert_eq!(
        registry
            .validate(&json!("2/30/2020"), &loose)
            .expect("validate")
            .error_token
            .as_deref(),
        Some(INVALID_DATE)
    );
}

#[test]
fn date_rule_rejects_unsupported_format_tokens() {
    let entry = ValidationEntry::new(ValidationType::Date).arg("format", "DD.MM.YYYY HH");
    let verdict = ValidatorRegistry::standard()
        .validate(&json!("21.11.2016 10"), &entry)
        .expect("validate");
    assert_eq!(verdict.error_token.as_deref(), Some(INVALID_DATE));
}

#[test]
fn format_error_receives_token_and_merged_args() {
    let entry = ValidationEntry::new(ValidationType::AlphanumericLength)
        .arg("maxLength", 5)
        .format_error(|token, args| {
            format!(
                "{token}: {}..{}",
                args["minLength"], args["maxLength"]
            )
        });
    let verdict = ValidatorRegistry::standard()
        .validate(&json!("ABCDEF"), &entry)
        .expect("validate");
    assert!(!verdict.is_valid);
    assert_eq!(
        verdict.message.as_deref(),
        Some("INVALID_ALPHANUMERIC: 1..5")
    );
}

#[test]
fn phone_rule_ignores_separators() {
    assert!(passes(ValidationType::Phone, json!("")));
    assert!(passes(ValidationType::Phone, json!("(555) 123-4567")));
    assert!(passes(ValidationType::Phone, json!("+44 20.7946.0958")));
    assert!(!passes(ValidationType::Phone, json!("555-1234")));
    assert!(!passes(ValidationType::Phone, json!("555-123-4567 ext 9")));
    assert!(!passes(ValidationType::Phone, json!("1234567890123456")));
    assert_eq!(
        token(ValidationType::Phone, json!("12")),
        Some(INVALID_PHONE.to_string())
    );
}

#[test]
fn phone_rule_counts_digits_against_args() {
    let registry = ValidatorRegistry::standard();
    let short = ValidationEntry::new(ValidationType::Phone)
        .arg("minDigits", 7)
        .arg("maxDigits", 8);
    for (text, valid) in [
        ("555-1234", true),
        ("+1 555 1234", true),
        ("555-123-4567", false),
        ("55-12", false),
        ("555+1234", false),
    ] {
        assert_eq!(
            registry
                .validate(&json!(text), &short)
                .expect("validate")
                .is_valid,
            valid,
            "{text}"
        );
    }
}

#[test]
fn numeric_rule_accepts_numbers_and_numeric_text() {
    assert!(passes(ValidationType::Numeric, json!("")));
    assert!(passes(ValidationType::Numeric, json!("42")));
    assert!(passes(ValidationType::Numeric, json!(" -3.5 ")));
    assert!(passes(ValidationType::Numeric, json!(12.25)));
    assert!(!passes(ValidationType::Numeric, json!("12a")));
    assert!(!passes(ValidationType::Numeric, json!(true)));

    let positive = ValidationEntry::new(ValidationType::Numeric).arg("allowNegative", false);
    let registry = ValidatorRegistry::standard();
    assert!(
        !registry
            .validate(&json!("-1"), &positive)
            .expect("validate")
            .is_valid
    );
    assert!(
        !registry
            .validate(&json!(-7), &positive)
            .expect("validate")
            .is_valid
    );
    assert!(
        registry
            .validate(&json!("0"), &positive)
            .expect("validate")
            .is_valid
    );
}

#[test]
fn alphanumeric_rule_checks_charset_and_length() {
    assert!(passes(ValidationType::AlphanumericLength, json!("")));
    assert!(passes(ValidationType::AlphanumericLength, json!("1HGCM82633A004352")));
    assert!(!passes(ValidationType::AlphanumericLength, json!("AB-12")));
    assert!(!passes(
        ValidationType::AlphanumericLength,
        json!("a".repeat(65))
    ));
}

#[test]
fn vehicle_year_rule_allows_next_model_year() {
    let next_year = Local::now().year() + 1;
    assert!(passes(ValidationType::VehicleYear, json!("")));
    assert!(passes(ValidationType::VehicleYear, json!("1998")));
    assert!(passes(ValidationType::VehicleYear, json!(next_year)));
    assert_eq!(
        token(ValidationType::VehicleYear, json!((next_year + 1).to_string())),
        Some(YEAR_OUT_OF_RANGE.to_string())
    );
    assert_eq!(
        token(ValidationType::VehicleYear, json!("1899")),
        Some(YEAR_OUT_OF_RANGE.to_string())
    );
    assert_eq!(
        token(ValidationType::VehicleYear, json!("98")),
        Some(INVALID_YEAR.to_string())
    );
    assert_eq!(
        token(ValidationType::VehicleYear, json!("19x8")),
        Some(INVALID_YEAR.to_string())
    );
}

#[test]
fn custom_rules_replace_standard_ones() {
    let registry = ValidatorRegistry::standard().with_rule(
        ValidationType::Phone,
        Rule::new("US_ONLY", |value, _| {
            value
                .as_str()
                .is_some_and(|text| text.starts_with("+1"))
                .into()
        }),
    );
    let verdict = registry
        .validate(&json!("+44 20 7946 0958"), &ValidationType::Phone.into())
        .expect("validate");
    assert_eq!(verdict.error_token.as_deref(), Some("US_ONLY"));

    assert_eq!(
        ValidatorRegistry::empty()
            .validate(&json!("x"), &ValidationType::Email.into())
            .map(|verdict| verdict.is_valid),
        Err(FormError::UnregisteredValidationType(ValidationType::Email))
    );
}
