mod descriptor;
mod error;
mod field;
mod model;
mod registry;

#[cfg(test)]
mod test_rules;

use serde_json::{Map, Value};

pub use descriptor::{
    CustomValidatorFn, CustomValidatorFuture, FieldDescriptor, FormatErrorFn, HasValueFn, Required,
    RequiredFn, ValidationEntry, Verdict,
};
pub use error::{FormError, FormResult};
pub use field::{
    DEFAULT_ERROR_MESSAGE, DEFAULT_NOT_EMPTY_MESSAGE, DEFAULT_REQUIRED_MESSAGE, Field,
    FieldSnapshot, Siblings, ValidationTicket,
};
pub use model::{DEFAULT_DEBOUNCE, FormModel, FormOptions, FormSnapshot};
pub use registry::{
    DATE_OUT_OF_RANGE, FIELD_REQUIRED, INVALID_ALPHANUMERIC, INVALID_DATE, INVALID_EMAIL,
    INVALID_NUMBER, INVALID_PHONE, INVALID_YEAR, Rule, RuleArgs, RuleFn, RuleOutcome, RuleVerdict,
    ValidationType, ValidatorRegistry, YEAR_OUT_OF_RANGE,
};

/// Builds a [`FormModel`] with default [`FormOptions`].
pub fn create_model<K>(
    initial_state: Map<String, Value>,
    validators: impl IntoIterator<Item = (K, FieldDescriptor)>,
) -> FormResult<FormModel>
where
    K: Into<String>,
{
    FormModel::new(initial_state, validators)
}
