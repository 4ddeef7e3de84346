use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use chrono::{Datelike, Local, NaiveDate};
use email_address::EmailAddress;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use super::descriptor::ValidationEntry;
use super::error::{FormError, FormResult};

pub const FIELD_REQUIRED: &str = "FIELD_REQUIRED";
pub const INVALID_EMAIL: &str = "INVALID_EMAIL";
pub const INVALID_DATE: &str = "INVALID_DATE";
pub const DATE_OUT_OF_RANGE: &str = "DATE_OUT_OF_RANGE";
pub const INVALID_PHONE: &str = "INVALID_PHONE";
pub const INVALID_NUMBER: &str = "INVALID_NUMBER";
pub const INVALID_ALPHANUMERIC: &str = "INVALID_ALPHANUMERIC";
pub const INVALID_YEAR: &str = "INVALID_YEAR";
pub const YEAR_OUT_OF_RANGE: &str = "YEAR_OUT_OF_RANGE";

pub type RuleArgs = Map<String, Value>;

pub type RuleFn = Arc<dyn Fn(&Value, &RuleArgs) -> RuleOutcome + Send + Sync>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ValidationType {
    Required,
    Email,
    Date,
    Phone,
    Numeric,
    AlphanumericLength,
    VehicleYear,
}

impl ValidationType {
    pub const ALL: [ValidationType; 7] = [
        ValidationType::Required,
        ValidationType::Email,
        ValidationType::Date,
        ValidationType::Phone,
        ValidationType::Numeric,
        ValidationType::AlphanumericLength,
        ValidationType::VehicleYear,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ValidationType::Required => "required",
            ValidationType::Email => "email",
            ValidationType::Date => "date",
            ValidationType::Phone => "phone",
            ValidationType::Numeric => "numeric",
            ValidationType::AlphanumericLength => "alphanumericLength",
            ValidationType::VehicleYear => "vehicleYear",
        }
    }
}

impl Display for ValidationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationType {
    type Err = FormError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
            .ok_or_else(|| FormError::UnknownValidationType(value.to_string()))
    }
}

/// Raw result of a rule. `Fail` uses the rule's default token, `FailWith`
/// carries a more specific one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RuleOutcome {
    Pass,
    Fail,
    FailWith(String),
}

impl From<bool> for RuleOutcome {
    fn from(valid: bool) -> Self {
        if valid { Self::Pass } else { Self::Fail }
    }
}

/// Normalized outcome of [`ValidatorRegistry::validate`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RuleVerdict {
    pub is_valid: bool,
    pub error_token: Option<String>,
    pub message: Option<String>,
}

impl RuleVerdict {
    fn pass() -> Self {
        Self {
            is_valid: true,
            error_token: None,
            message: None,
        }
    }
}

#[derive(Clone)]
pub struct Rule {
    check: RuleFn,
    default_error: String,
    default_args: RuleArgs,
}

impl Rule {
    pub fn new(
        default_error: impl Into<String>,
        check: impl Fn(&Value, &RuleArgs) -> RuleOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            check: Arc::new(check),
            default_error: default_error.into(),
            default_args: Map::new(),
        }
    }

    pub fn default_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default_args.insert(key.into(), value.into());
        self
    }

    pub fn default_error(&self) -> &str {
        &self.default_error
    }

    pub fn default_args(&self) -> &RuleArgs {
        &self.default_args
    }
}

impl Debug for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("default_error", &self.default_error)
            .field("default_args", &self.default_args)
            .finish_non_exhaustive()
    }
}

/// Immutable table of generic rules, injected into every form at construction.
#[derive(Clone, Debug, Default)]
pub struct ValidatorRegistry {
    rules: BTreeMap<ValidationType, Rule>,
}

impl ValidatorRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        Self::empty()
            .with_rule(
                ValidationType::Required,
                Rule::new(FIELD_REQUIRED, |value, _| is_filled(value).into()),
            )
            .with_rule(ValidationType::Email, Rule::new(INVALID_EMAIL, check_email))
            .with_rule(
                ValidationType::Date,
                Rule::new(INVALID_DATE, check_date)
                    .default_arg("format", "MM/DD/YYYY")
                    .default_arg("minYear", 1900)
                    .default_arg("maxYear", 2100),
            )
            .with_rule(
                ValidationType::Phone,
                Rule::new(INVALID_PHONE, check_phone)
                    .default_arg("minDigits", 10)
                    .default_arg("maxDigits", 15),
            )
            .with_rule(
                ValidationType::Numeric,
                Rule::new(INVALID_NUMBER, check_numeric).default_arg("allowNegative", true),
            )
            .with_rule(
                ValidationType::AlphanumericLength,
                Rule::new(INVALID_ALPHANUMERIC, check_alphanumeric)
                    .default_arg("minLength", 1)
                    .default_arg("maxLength", 64),
            )
            .with_rule(
                ValidationType::VehicleYear,
                Rule::new(INVALID_YEAR, check_vehicle_year).default_arg("minYear", 1900),
            )
    }

    pub fn with_rule(mut self, validation_type: ValidationType, rule: Rule) -> Self {
        self.rules.insert(validation_type, rule);
        self
    }

    pub fn contains(&self, validation_type: ValidationType) -> bool {
        self.rules.contains_key(&validation_type)
    }

    pub fn rule(&self, validation_type: ValidationType) -> FormResult<&Rule> {
        self.rules
            .get(&validation_type)
            .ok_or(FormError::UnregisteredValidationType(validation_type))
    }

    pub fn validate(&self, value: &Value, entry: &ValidationEntry) -> FormResult<RuleVerdict> {
        let rule = self.rule(entry.validation_type)?;
        let mut args = rule.default_args.clone();
        for (key, arg) in &entry.args {
            args.insert(key.clone(), arg.clone());
        }

        let token = match (rule.check)(value, &args) {
            RuleOutcome::Pass => return Ok(RuleVerdict::pass()),
            RuleOutcome::Fail => rule.default_error.clone(),
            RuleOutcome::FailWith(token) => token,
        };
        let message = entry
            .format_error
            .as_ref()
            .map(|format_error| format_error(&token, &args));
        Ok(RuleVerdict {
            is_valid: false,
            error_token: Some(token),
            message,
        })
    }
}

fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(entries) => !entries.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn arg_i64(args: &RuleArgs, key: &str) -> Option<i64> {
    args.get(key).and_then(Value::as_i64)
}

fn arg_bool(args: &RuleArgs, key: &str) -> Option<bool> {
    args.get(key).and_then(Value::as_bool)
}

fn check_email(value: &Value, _args: &RuleArgs) -> RuleOutcome {
    if is_blank(value) {
        return RuleOutcome::Pass;
    }
    let Some(text) = value.as_str() else {
        return RuleOutcome::Fail;
    };
    let Ok(address) = EmailAddress::from_str(text.trim()) else {
        return RuleOutcome::Fail;
    };
    // dotless domains are legal per RFC but never deliverable from a form
    let tld_ok = address
        .domain()
        .rsplit_once('.')
        .is_some_and(|(host, tld)| {
            !host.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
        });
    tld_ok.into()
}

/// Translates a moment-style date format into a chrono one. Any letter outside
/// `YYYY`, `YY`, `MM`, `M`, `DD` and `D` makes the format unusable.
fn chrono_format(format: &str) -> Option<String> {
    const TOKENS: [(&str, &str); 6] = [
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MM", "%m"),
        ("M", "%m"),
        ("DD", "%d"),
        ("D", "%d"),
    ];

    let mut translated = String::with_capacity(format.len() + 4);
    let mut rest = format;
    while let Some(next) = rest.chars().next() {
        if let Some((token, strftime)) =
            TOKENS.iter().find(|(token, _)| rest.starts_with(token))
        {
            translated.push_str(strftime);
            rest = &rest[token.len()..];
            continue;
        }
        if next.is_alphabetic() {
            return None;
        }
        if next == '%' {
            translated.push_str("%%");
        } else {
            translated.push(next);
        }
        rest = &rest[next.len_utf8()..];
    }
    Some(translated)
}

fn check_date(value: &Value, args: &RuleArgs) -> RuleOutcome {
    if is_blank(value) {
        return RuleOutcome::Pass;
    }
    let Some(text) = value.as_str() else {
        return RuleOutcome::Fail;
    };
    let format = args
        .get("format")
        .and_then(Value::as_str)
        .unwrap_or("MM/DD/YYYY");
    let Some(strftime) = chrono_format(format) else {
        log::warn!("date rule got an unsupported format `{format}`");
        return RuleOutcome::FailWith(INVALID_DATE.to_string());
    };
    let Ok(date) = NaiveDate::parse_from_str(text.trim(), &strftime) else {
        return RuleOutcome::FailWith(INVALID_DATE.to_string());
    };

    let year = i64::from(date.year());
    let min_year = arg_i64(args, "minYear").unwrap_or(i64::MIN);
    let max_year = arg_i64(args, "maxYear").unwrap_or(i64::MAX);
    if year < min_year || year > max_year {
        return RuleOutcome::FailWith(DATE_OUT_OF_RANGE.to_string());
    }
    RuleOutcome::Pass
}

static PHONE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\+?([0-9]+)$")
        .map_err(|error| log::warn!("phone pattern failed to compile: {error}"))
        .ok()
});

fn check_phone(value: &Value, args: &RuleArgs) -> RuleOutcome {
    if is_blank(value) {
        return RuleOutcome::Pass;
    }
    let Some(text) = value.as_str() else {
        return RuleOutcome::Fail;
    };
    let compact: String = text
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '(' | ')'))
        .collect();
    let min_digits = arg_i64(args, "minDigits").unwrap_or(10);
    let max_digits = arg_i64(args, "maxDigits").unwrap_or(15);
    let Some(digits) = PHONE_PATTERN
        .as_ref()
        .and_then(|pattern| pattern.captures(&compact))
        .and_then(|captures| captures.get(1))
    else {
        return RuleOutcome::Fail;
    };
    let count = i64::try_from(digits.as_str().len()).unwrap_or(i64::MAX);
    (min_digits..=max_digits).contains(&count).into()
}

fn check_numeric(value: &Value, args: &RuleArgs) -> RuleOutcome {
    if is_blank(value) {
        return RuleOutcome::Pass;
    }
    let allow_negative = arg_bool(args, "allowNegative").unwrap_or(true);
    let negative = match value {
        Value::Number(number) => number.as_f64().is_some_and(|n| n < 0.0),
        Value::String(text) => {
            let text = text.trim();
            match Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)) {
                Ok(number) => number.is_sign_negative() && !number.is_zero(),
                Err(_) => return RuleOutcome::Fail,
            }
        }
        _ => return RuleOutcome::Fail,
    };
    (allow_negative || !negative).into()
}

fn check_alphanumeric(value: &Value, args: &RuleArgs) -> RuleOutcome {
    if is_blank(value) {
        return RuleOutcome::Pass;
    }
    let Some(text) = value.as_str() else {
        return RuleOutcome::Fail;
    };
    let min_length = arg_i64(args, "minLength").unwrap_or(1);
    let max_length = arg_i64(args, "maxLength").unwrap_or(64);
    let length = i64::try_from(text.chars().count()).unwrap_or(i64::MAX);
    let alphanumeric = text.chars().all(|c| c.is_ascii_alphanumeric());
    (alphanumeric && length >= min_length && length <= max_length).into()
}

fn check_vehicle_year(value: &Value, args: &RuleArgs) -> RuleOutcome {
    if is_blank(value) {
        return RuleOutcome::Pass;
    }
    let year = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => {
            let text = text.trim();
            if text.len() == 4 && text.chars().all(|c| c.is_ascii_digit()) {
                text.parse::<i64>().ok()
            } else {
                None
            }
        }
        _ => None,
    };
    let Some(year) = year.filter(|year| (1000..=9999).contains(year)) else {
        return RuleOutcome::FailWith(INVALID_YEAR.to_string());
    };

    let min_year = arg_i64(args, "minYear").unwrap_or(1900);
    let max_year =
        arg_i64(args, "maxYear").unwrap_or_else(|| i64::from(Local::now().year()) + 1);
    if year < min_year || year > max_year {
        return RuleOutcome::FailWith(YEAR_OUT_OF_RANGE.to_string());
    }
    RuleOutcome::Pass
}

