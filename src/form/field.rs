use std::fmt::{Debug, Formatter};
use std::sync::{Arc, RwLock, Weak};

use futures::future::{AbortHandle, AbortRegistration, Abortable};
use futures::task::SpawnExt;
use futures_timer::Delay;
use indexmap::IndexMap;
use serde_json::Value;

use super::descriptor::{FieldDescriptor, Verdict};
use super::error::{FormResult, read_lock, write_lock};
use super::model::{FieldSet, FormOptions};

pub const DEFAULT_REQUIRED_MESSAGE: &str = "This field is required";
pub const DEFAULT_NOT_EMPTY_MESSAGE: &str = "This field cannot be blank";
pub const DEFAULT_ERROR_MESSAGE: &str = "The value is not valid";

/// Generation of a field's validation state. A validation only writes its
/// result while its ticket is still the field's current one.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValidationTicket(pub u64);

impl ValidationTicket {
    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Read-only copy of a field, handed to `required` predicates and custom
/// validators.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSnapshot {
    pub name: String,
    pub value: Value,
    pub initial_value: Value,
    pub interacted: bool,
    pub blurred_once: bool,
    pub disabled: bool,
    pub error_message: String,
}

impl FieldSnapshot {
    /// The value as text, or `""` for non-string values.
    pub fn text(&self) -> &str {
        self.value.as_str().unwrap_or_default()
    }
}

/// Snapshots of every field of the owning form, in field order.
pub type Siblings = IndexMap<String, FieldSnapshot>;

struct FieldState {
    value: Value,
    initial_value: Value,
    interacted: bool,
    blurred_once: bool,
    disabled: bool,
    error_message: String,
    ticket: ValidationTicket,
    validating: bool,
    debounce: Option<AbortHandle>,
}

impl FieldState {
    fn invalidate(&mut self) {
        self.ticket = self.ticket.next();
        self.validating = false;
        if let Some(handle) = self.debounce.take() {
            handle.abort();
        }
    }
}

struct FieldInner {
    name: String,
    descriptor: FieldDescriptor,
    options: Arc<FormOptions>,
    form: Weak<FieldSet>,
    state: RwLock<FieldState>,
}

/// Validation state machine for one named value. Cloning yields another handle
/// to the same field.
#[derive(Clone)]
pub struct Field {
    inner: Arc<FieldInner>,
}

impl Field {
    pub(super) fn new(
        name: String,
        initial_value: Value,
        descriptor: FieldDescriptor,
        options: Arc<FormOptions>,
        form: Weak<FieldSet>,
    ) -> Self {
        let state = FieldState {
            value: initial_value.clone(),
            initial_value,
            interacted: false,
            blurred_once: false,
            disabled: descriptor.disabled,
            error_message: String::new(),
            ticket: ValidationTicket::default(),
            validating: false,
            debounce: None,
        };
        Self {
            inner: Arc::new(FieldInner {
                name,
                descriptor,
                options,
                form,
                state: RwLock::new(state),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn interactive(&self) -> bool {
        self.inner.descriptor.interactive
    }

    pub fn wait_for_blur(&self) -> bool {
        self.inner.descriptor.wait_for_blur
    }

    pub fn snapshot(&self) -> FormResult<FieldSnapshot> {
        let state = read_lock(&self.inner.state, "reading field snapshot")?;
        Ok(self.snapshot_of(&state))
    }

    pub fn value(&self) -> FormResult<Value> {
        Ok(read_lock(&self.inner.state, "reading field value")?.value.clone())
    }

    pub fn initial_value(&self) -> FormResult<Value> {
        Ok(read_lock(&self.inner.state, "reading initial value")?
            .initial_value
            .clone())
    }

    pub fn error_message(&self) -> FormResult<String> {
        Ok(read_lock(&self.inner.state, "reading error message")?
            .error_message
            .clone())
    }

    pub fn interacted(&self) -> FormResult<bool> {
        Ok(read_lock(&self.inner.state, "reading interacted flag")?.interacted)
    }

    pub fn blurred_once(&self) -> FormResult<bool> {
        Ok(read_lock(&self.inner.state, "reading blurred flag")?.blurred_once)
    }

    pub fn disabled(&self) -> FormResult<bool> {
        Ok(read_lock(&self.inner.state, "reading disabled flag")?.disabled)
    }

    pub fn validating(&self) -> FormResult<bool> {
        Ok(read_lock(&self.inner.state, "reading validating flag")?.validating)
    }

    pub fn valid(&self) -> FormResult<bool> {
        let state = read_lock(&self.inner.state, "reading field validity")?;
        Ok(state.disabled || state.error_message.is_empty())
    }

    pub fn dirty(&self) -> FormResult<bool> {
        let state = read_lock(&self.inner.state, "reading dirty state")?;
        Ok(state.value != state.initial_value)
    }

    pub fn has_value(&self) -> FormResult<bool> {
        Ok(self.value_present(&self.value()?))
    }

    /// Pull-based: computed requiredness is re-evaluated against the current
    /// siblings on every call. Disabled fields are never required.
    pub fn is_required(&self) -> FormResult<bool> {
        let snapshot = self.snapshot()?;
        if snapshot.disabled {
            return Ok(false);
        }
        let siblings = self.siblings()?;
        Ok(self.inner.descriptor.required.evaluate(&snapshot, &siblings))
    }

    /// Stores `value` and marks the field interacted. Interactive fields get a
    /// debounced validation; others have their error cleared. `reset` skips
    /// validation and clears both the error and the interacted flag.
    pub fn set_value(&self, value: Value, reset: bool) -> FormResult<()> {
        let registration = {
            let mut state = write_lock(&self.inner.state, "setting field value")?;
            state.value = value;
            state.invalidate();
            if reset {
                state.error_message.clear();
                state.interacted = false;
                None
            } else {
                state.interacted = true;
                if self.live_validation() {
                    let (handle, registration) = AbortHandle::new_pair();
                    state.debounce = Some(handle);
                    Some(registration)
                } else {
                    state.error_message.clear();
                    None
                }
            }
        };

        if let Some(registration) = registration {
            self.schedule_validation(registration);
        }
        Ok(())
    }

    /// `set_value` that also makes `value` the new restore point.
    pub fn replace_value(&self, value: Value, reset: bool) -> FormResult<()> {
        write_lock(&self.inner.state, "replacing initial value")?.initial_value = value.clone();
        self.set_value(value, reset)
    }

    pub fn restore_initial_value(&self) -> FormResult<()> {
        let initial_value = self.initial_value()?;
        self.set_value(initial_value, true)
    }

    pub async fn mark_blurred_and_validate(&self) -> FormResult<bool> {
        write_lock(&self.inner.state, "marking field blurred")?.blurred_once = true;
        self.validate(false).await
    }

    /// Runs the validation pipeline and resolves once it settles. Without
    /// `force`, fields that were never interacted with (or not yet blurred when
    /// `wait_for_blur` is set) are reported valid and any validation still in
    /// flight for them is dropped.
    pub async fn validate(&self, force: bool) -> FormResult<bool> {
        let (ticket, snapshot) = {
            let mut state = write_lock(&self.inner.state, "starting field validation")?;
            if state.disabled {
                return Ok(true);
            }
            let deferred = !state.interacted
                || (self.inner.descriptor.wait_for_blur && !state.blurred_once);
            if !force && deferred {
                state.invalidate();
                state.error_message.clear();
                return Ok(true);
            }
            state.ticket = state.ticket.next();
            state.validating = true;
            (state.ticket, self.snapshot_of(&state))
        };

        let result = match self.siblings() {
            Ok(siblings) => self.evaluate(&snapshot, &siblings).await,
            Err(error) => Err(error),
        };
        self.finish(ticket, result)
    }

    pub fn set_disabled(&self, disabled: bool) -> FormResult<()> {
        let mut state = write_lock(&self.inner.state, "toggling disabled flag")?;
        state.disabled = disabled;
        if disabled {
            state.invalidate();
            state.error_message.clear();
        }
        Ok(())
    }

    pub fn reset_interacted_flag(&self) -> FormResult<()> {
        write_lock(&self.inner.state, "resetting interacted flag")?.interacted = false;
        Ok(())
    }

    /// Drops the current error along with any pending or in-flight validation.
    pub fn clear_validation(&self) -> FormResult<()> {
        let mut state = write_lock(&self.inner.state, "clearing field validation")?;
        state.invalidate();
        state.error_message.clear();
        Ok(())
    }

    async fn evaluate(&self, field: &FieldSnapshot, siblings: &Siblings) -> FormResult<String> {
        let descriptor = &self.inner.descriptor;

        if descriptor.required.evaluate(field, siblings) {
            if !self.value_present(&field.value) {
                return Ok(self.required_message());
            }
            if field.value.as_str().is_some_and(|text| text.trim().is_empty()) {
                return Ok(descriptor
                    .not_empty_message
                    .clone()
                    .unwrap_or_else(|| DEFAULT_NOT_EMPTY_MESSAGE.to_string()));
            }
        }

        for entry in descriptor.validation_entries() {
            let verdict = self.inner.options.registry.validate(&field.value, entry)?;
            if verdict.is_valid {
                continue;
            }
            return Ok(verdict
                .message
                .or_else(|| entry.error_message.clone())
                .or_else(|| descriptor.error_message.clone())
                .or(verdict.error_token)
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()));
        }

        let Some(custom) = descriptor.custom.as_ref() else {
            return Ok(String::new());
        };
        let message = match custom(field.clone(), siblings.clone()).await {
            Ok(Verdict::Valid) => String::new(),
            Ok(Verdict::Invalid) => self.fallback_message(),
            Ok(Verdict::Error(message)) if message.trim().is_empty() => self.fallback_message(),
            Ok(Verdict::Error(message)) => message,
            Err(reason) => {
                let reason = reason.trim();
                if reason.is_empty() {
                    self.fallback_message()
                } else {
                    reason.to_string()
                }
            }
        };
        Ok(message)
    }

    fn finish(&self, ticket: ValidationTicket, result: FormResult<String>) -> FormResult<bool> {
        let mut state = write_lock(&self.inner.state, "finishing field validation")?;
        if state.ticket != ticket {
            log::debug!(
                "discarding stale validation of `{}` (ticket {} superseded by {})",
                self.inner.name,
                ticket.0,
                state.ticket.0
            );
            return Ok(state.disabled || state.error_message.is_empty());
        }

        state.validating = false;
        state.error_message = result?;
        log::trace!(
            "validated `{}`: {}",
            self.inner.name,
            if state.error_message.is_empty() {
                "valid"
            } else {
                state.error_message.as_str()
            }
        );
        Ok(state.error_message.is_empty())
    }

    fn schedule_validation(&self, registration: AbortRegistration) {
        let Some(spawner) = self.inner.options.spawner.as_ref() else {
            return;
        };
        let field = self.clone();
        let debounce = self.inner.options.debounce;
        let task = Abortable::new(
            async move {
                Delay::new(debounce).await;
                if let Err(error) = field.validate(false).await {
                    log::warn!("debounced validation of `{}` failed: {error}", field.name());
                }
            },
            registration,
        );

        log::debug!("scheduled validation of `{}` in {debounce:?}", self.inner.name);
        if let Err(error) = spawner.spawn(async move {
            let _ = task.await;
        }) {
            log::warn!(
                "could not schedule validation of `{}`: {error}",
                self.inner.name
            );
        }
    }

    fn live_validation(&self) -> bool {
        self.inner.descriptor.interactive && self.inner.options.spawner.is_some()
    }

    fn siblings(&self) -> FormResult<Siblings> {
        let Some(form) = self.inner.form.upgrade() else {
            return Ok(Siblings::new());
        };
        form.fields
            .iter()
            .map(|(name, field)| -> FormResult<(String, FieldSnapshot)> {
                Ok((name.clone(), field.snapshot()?))
            })
            .collect()
    }

    fn value_present(&self, value: &Value) -> bool {
        if let Some(has_value) = self.inner.descriptor.has_value.as_ref() {
            return has_value(value);
        }
        match value {
            Value::Null => false,
            Value::String(text) => !text.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(entries) => !entries.is_empty(),
            Value::Bool(_) | Value::Number(_) => true,
        }
    }

    fn required_message(&self) -> String {
        let descriptor = &self.inner.descriptor;
        descriptor
            .required
            .message()
            .map(str::to_string)
            .or_else(|| descriptor.required_message.clone())
            .unwrap_or_else(|| DEFAULT_REQUIRED_MESSAGE.to_string())
    }

    fn fallback_message(&self) -> String {
        self.inner
            .descriptor
            .error_message
            .clone()
            .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string())
    }

    fn snapshot_of(&self, state: &FieldState) -> FieldSnapshot {
        FieldSnapshot {
            name: self.inner.name.clone(),
            value: state.value.clone(),
            initial_value: state.initial_value.clone(),
            interacted: state.interacted,
            blurred_once: state.blurred_once,
            disabled: state.disabled,
            error_message: state.error_message.clone(),
        }
    }
}

impl Debug for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("Field");
        debug.field("name", &self.inner.name);
        match self.inner.state.read() {
            Ok(state) => debug
                .field("value", &state.value)
                .field("error_message", &state.error_message)
                .field("interacted", &state.interacted)
                .field("disabled", &state.disabled)
                .finish(),
            Err(_) => debug.finish_non_exhaustive(),
        }
    }
}
