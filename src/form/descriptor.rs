use std::fmt::{Debug, Display, Formatter};
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde_json::Value;

use super::field::{FieldSnapshot, Siblings};
use super::registry::{RuleArgs, ValidationType};

pub type RequiredFn = Arc<dyn Fn(&FieldSnapshot, &Siblings) -> bool + Send + Sync>;
pub type HasValueFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
pub type FormatErrorFn = Arc<dyn Fn(&str, &RuleArgs) -> String + Send + Sync>;
pub type CustomValidatorFuture = BoxFuture<'static, Result<Verdict, String>>;
pub type CustomValidatorFn =
    Arc<dyn Fn(FieldSnapshot, Siblings) -> CustomValidatorFuture + Send + Sync>;

/// Whether a field must carry a value. `Computed` is evaluated on every query
/// against a fresh snapshot of the field and its siblings.
#[derive(Clone)]
pub enum Required {
    Always(bool),
    WithMessage(String),
    Computed(RequiredFn),
}

impl Required {
    pub fn computed(f: impl Fn(&FieldSnapshot, &Siblings) -> bool + Send + Sync + 'static) -> Self {
        Self::Computed(Arc::new(f))
    }

    pub(super) fn evaluate(&self, field: &FieldSnapshot, siblings: &Siblings) -> bool {
        match self {
            Required::Always(required) => *required,
            Required::WithMessage(message) => !message.is_empty(),
            Required::Computed(f) => f(field, siblings),
        }
    }

    pub(super) fn message(&self) -> Option<&str> {
        match self {
            Required::WithMessage(message) if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

impl Default for Required {
    fn default() -> Self {
        Self::Always(false)
    }
}

impl From<bool> for Required {
    fn from(required: bool) -> Self {
        Self::Always(required)
    }
}

impl From<&str> for Required {
    fn from(message: &str) -> Self {
        Self::WithMessage(message.to_string())
    }
}

impl From<String> for Required {
    fn from(message: String) -> Self {
        Self::WithMessage(message)
    }
}

impl Debug for Required {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Required::Always(required) => f.debug_tuple("Always").field(required).finish(),
            Required::WithMessage(message) => f.debug_tuple("WithMessage").field(message).finish(),
            Required::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Result of a custom validator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    Valid,
    /// Invalid with the field's fallback message.
    Invalid,
    /// Invalid with an explicit message.
    Error(String),
}

impl Verdict {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }
}

impl From<bool> for Verdict {
    fn from(valid: bool) -> Self {
        if valid { Self::Valid } else { Self::Invalid }
    }
}

/// One entry of a field's generic rule chain.
#[derive(Clone)]
pub struct ValidationEntry {
    pub validation_type: ValidationType,
    pub error_message: Option<String>,
    pub args: RuleArgs,
    pub format_error: Option<FormatErrorFn>,
}

impl ValidationEntry {
    pub fn new(validation_type: ValidationType) -> Self {
        Self {
            validation_type,
            error_message: None,
            args: RuleArgs::new(),
            format_error: None,
        }
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Turns the failing rule's token and merged args into the final message.
    pub fn format_error(
        mut self,
        format_error: impl Fn(&str, &RuleArgs) -> String + Send + Sync + 'static,
    ) -> Self {
        self.format_error = Some(Arc::new(format_error));
        self
    }
}

impl From<ValidationType> for ValidationEntry {
    fn from(validation_type: ValidationType) -> Self {
        Self::new(validation_type)
    }
}

impl Debug for ValidationEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationEntry")
            .field("validation_type", &self.validation_type)
            .field("error_message", &self.error_message)
            .field("args", &self.args)
            .field("format_error", &self.format_error.is_some())
            .finish()
    }
}

/// Per-field validation configuration.
#[derive(Clone)]
pub struct FieldDescriptor {
    pub(super) required: Required,
    pub(super) required_message: Option<String>,
    pub(super) not_empty_message: Option<String>,
    pub(super) error_message: Option<String>,
    pub(super) validation_types: Vec<ValidationEntry>,
    pub(super) custom: Option<CustomValidatorFn>,
    pub(super) interactive: bool,
    pub(super) wait_for_blur: bool,
    pub(super) disabled: bool,
    pub(super) has_value: Option<HasValueFn>,
}

impl Default for FieldDescriptor {
    fn default() -> Self {
        Self {
            required: Required::default(),
            required_message: None,
            not_empty_message: None,
            error_message: None,
            validation_types: Vec::new(),
            custom: None,
            interactive: true,
            wait_for_blur: false,
            disabled: false,
            has_value: None,
        }
    }
}

impl FieldDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, required: impl Into<Required>) -> Self {
        self.required = required.into();
        self
    }

    pub fn required_when(
        self,
        f: impl Fn(&FieldSnapshot, &Siblings) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.required(Required::computed(f))
    }

    pub fn required_message(mut self, message: impl Into<String>) -> Self {
        self.required_message = Some(message.into());
        self
    }

    pub fn not_empty_message(mut self, message: impl Into<String>) -> Self {
        self.not_empty_message = Some(message.into());
        self
    }

    /// Fallback message for rule and custom validator failures.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Appends a generic rule; rules run in the order they are added.
    pub fn validation_type(mut self, entry: impl Into<ValidationEntry>) -> Self {
        self.validation_types.push(entry.into());
        self
    }

    pub fn validator<V>(
        mut self,
        f: impl Fn(&FieldSnapshot, &Siblings) -> V + Send + Sync + 'static,
    ) -> Self
    where
        V: Into<Verdict> + 'static,
    {
        self.custom = Some(Arc::new(move |field: FieldSnapshot, siblings: Siblings| {
            let verdict: Verdict = f(&field, &siblings).into();
            future::ready(Ok::<_, String>(verdict)).boxed()
        }));
        self
    }

    /// Registers an asynchronous custom validator. An `Err` is treated as a
    /// rejection: its trimmed text becomes the message.
    pub fn async_validator<F, Fut, V, E>(mut self, f: F) -> Self
    where
        F: Fn(FieldSnapshot, Siblings) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        V: Into<Verdict> + 'static,
        E: Display + 'static,
    {
        self.custom = Some(Arc::new(move |field: FieldSnapshot, siblings: Siblings| {
            f(field, siblings)
                .map(|result| -> Result<Verdict, String> {
                    result.map(Into::into).map_err(|error| error.to_string())
                })
                .boxed()
        }));
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn wait_for_blur(mut self, wait_for_blur: bool) -> Self {
        self.wait_for_blur = wait_for_blur;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Overrides the emptiness check used by `required`.
    pub fn has_value(mut self, f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.has_value = Some(Arc::new(f));
        self
    }

    pub(super) fn validation_entries(&self) -> &[ValidationEntry] {
        &self.validation_types
    }
}

impl Debug for FieldDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("required", &self.required)
            .field("required_message", &self.required_message)
            .field("not_empty_message", &self.not_empty_message)
            .field("error_message", &self.error_message)
            .field("validation_types", &self.validation_types)
            .field("custom", &self.custom.is_some())
            .field("interactive", &self.interactive)
            .field("wait_for_blur", &self.wait_for_blur)
            .field("disabled", &self.disabled)
            .field("has_value", &self.has_value.is_some())
            .finish()
    }
}
