use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, LazyLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::executor::ThreadPool;
use futures::future::join_all;
use futures::task::Spawn;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::descriptor::FieldDescriptor;
use super::error::{FormError, FormResult};
use super::field::Field;
use super::registry::ValidatorRegistry;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

static DEBOUNCE_POOL: LazyLock<Option<ThreadPool>> = LazyLock::new(|| {
    ThreadPool::builder()
        .name_prefix("calmform-debounce-")
        .create()
        .map_err(|error| log::warn!("debounce pool unavailable, live validation off: {error}"))
        .ok()
});

/// Process-wide executor shared by every form built with default options.
fn default_spawner() -> Option<Arc<dyn Spawn + Send + Sync>> {
    DEBOUNCE_POOL
        .as_ref()
        .map(|pool| Arc::new(pool.clone()) as Arc<dyn Spawn + Send + Sync>)
}

#[derive(Clone)]
pub struct FormOptions {
    /// Quiet period before a live validation runs.
    pub debounce: Duration,
    pub registry: Arc<ValidatorRegistry>,
    /// Executor for debounced validations, a shared thread pool by default.
    /// Without one, value changes only clear errors and validation waits for
    /// blur or an explicit validate.
    pub spawner: Option<Arc<dyn Spawn + Send + Sync>>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            registry: Arc::new(ValidatorRegistry::standard()),
            spawner: default_spawner(),
        }
    }
}

impl FormOptions {
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn registry(mut self, registry: ValidatorRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn spawner(mut self, spawner: impl Spawn + Send + Sync + 'static) -> Self {
        self.spawner = Some(Arc::new(spawner));
        self
    }

    /// Turns live validation off for every field of the form.
    pub fn without_spawner(mut self) -> Self {
        self.spawner = None;
        self
    }
}

impl Debug for FormOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormOptions")
            .field("debounce", &self.debounce)
            .field("registry", &self.registry)
            .field("spawner", &self.spawner.is_some())
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormSnapshot {
    pub valid: bool,
    pub validating: bool,
    pub interacted: bool,
    pub dirty: bool,
    pub serialized_data: Map<String, Value>,
    pub summary: Vec<String>,
}

pub(super) struct FieldSet {
    pub(super) fields: IndexMap<String, Field>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Ordered set of [`Field`]s with form-level validity and serialization.
#[derive(Clone)]
pub struct FormModel {
    fields: Arc<FieldSet>,
    in_flight: Arc<AtomicUsize>,
}

impl FormModel {
    pub fn new<K>(
        initial_state: Map<String, Value>,
        validators: impl IntoIterator<Item = (K, FieldDescriptor)>,
    ) -> FormResult<Self>
    where
        K: Into<String>,
    {
        Self::with_options(initial_state, validators, FormOptions::default())
    }

    /// Builds one field per key of `initial_state`. Descriptors naming an
    /// unknown field or an unregistered rule are rejected.
    pub fn with_options<K>(
        initial_state: Map<String, Value>,
        validators: impl IntoIterator<Item = (K, FieldDescriptor)>,
        options: FormOptions,
    ) -> FormResult<Self>
    where
        K: Into<String>,
    {
        let mut descriptors = HashMap::new();
        for (name, descriptor) in validators {
            let name = name.into();
            if !initial_state.contains_key(&name) {
                return Err(FormError::FieldNotFound(name));
            }
            if let Some(entry) = descriptor
                .validation_entries()
                .iter()
                .find(|entry| !options.registry.contains(entry.validation_type))
            {
                return Err(FormError::UnregisteredValidationType(entry.validation_type));
            }
            descriptors.insert(name, descriptor);
        }

        let options = Arc::new(options);
        let fields = Arc::new_cyclic(|form| FieldSet {
            fields: initial_state
                .into_iter()
                .map(|(name, value)| {
                    let descriptor = descriptors.remove(&name).unwrap_or_default();
                    let field =
                        Field::new(name.clone(), value, descriptor, options.clone(), form.clone());
                    (name, field)
                })
                .collect(),
        });
        log::debug!("created form model with {} fields", fields.fields.len());

        Ok(Self {
            fields,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn field(&self, name: &str) -> FormResult<&Field> {
        self.fields
            .fields
            .get(name)
            .ok_or_else(|| FormError::FieldNotFound(name.to_string()))
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.fields.values()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.fields.keys().map(String::as_str)
    }

    pub fn value_of(&self, name: &str) -> FormResult<Value> {
        self.field(name)?.value()
    }

    /// Like [`FormModel::value_of`], with `default` standing in for null.
    pub fn value_of_or(&self, name: &str, default: Value) -> FormResult<Value> {
        let value = self.value_of(name)?;
        Ok(if value.is_null() { default } else { value })
    }

    pub fn error_of(&self, name: &str) -> FormResult<String> {
        self.field(name)?.error_message()
    }

    pub fn update_field(&self, name: &str, value: Value, reset: bool) -> FormResult<()> {
        self.field(name)?.set_value(value, reset)
    }

    /// Applies every entry of `values`. Names are checked up front so an
    /// unknown key leaves the form untouched.
    pub fn update_from(&self, values: Map<String, Value>, reset: bool) -> FormResult<()> {
        for (field, value) in self.resolve_all(values)? {
            field.set_value(value, reset)?;
        }
        Ok(())
    }

    /// Like [`FormModel::update_from`], but each value also becomes the
    /// field's restore point.
    pub fn replace_from(&self, values: Map<String, Value>, reset: bool) -> FormResult<()> {
        for (field, value) in self.resolve_all(values)? {
            field.replace_value(value, reset)?;
        }
        Ok(())
    }

    /// Validates every field concurrently and resolves once all of them have
    /// settled. [`FormModel::valid`] reports `false` until then.
    pub async fn validate(&self, validate_field: bool) -> FormResult<bool> {
        let results = {
            let _in_flight = InFlight::enter(&self.in_flight);
            log::debug!("validating {} fields", self.fields.fields.len());
            join_all(self.fields().map(|field| field.validate(validate_field))).await
        };
        for result in results {
            result?;
        }
        let valid = self.valid()?;
        log::debug!("form validation settled, valid: {valid}");
        Ok(valid)
    }

    pub async fn blur_field(&self, name: &str) -> FormResult<bool> {
        self.field(name)?.mark_blurred_and_validate().await
    }

    pub fn restore_initial_values(&self) -> FormResult<()> {
        for field in self.fields() {
            field.restore_initial_value()?;
        }
        Ok(())
    }

    pub fn disable_fields<I, S>(&self, names: I) -> FormResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_disabled(names, true)
    }

    pub fn enable_fields<I, S>(&self, names: I) -> FormResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_disabled(names, false)
    }

    pub fn reset_interacted_flag(&self) -> FormResult<()> {
        for field in self.fields() {
            field.reset_interacted_flag()?;
        }
        Ok(())
    }

    pub fn clear_validation(&self) -> FormResult<()> {
        for field in self.fields() {
            field.clear_validation()?;
        }
        Ok(())
    }

    pub fn is_validating(&self) -> FormResult<bool> {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return Ok(true);
        }
        for field in self.fields() {
            if field.validating()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn valid(&self) -> FormResult<bool> {
        if self.is_validating()? {
            return Ok(false);
        }
        for field in self.fields() {
            if !field.valid()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn interacted(&self) -> FormResult<bool> {
        for field in self.fields() {
            if field.interacted()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn dirty(&self) -> FormResult<bool> {
        for field in self.fields() {
            if field.dirty()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn required_fields(&self) -> FormResult<Vec<String>> {
        let mut required = Vec::new();
        for field in self.fields() {
            if field.is_required()? {
                required.push(field.name().to_string());
            }
        }
        Ok(required)
    }

    pub fn required_are_filled(&self) -> FormResult<bool> {
        for field in self.fields() {
            if field.is_required()? && !field.has_value()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn at_least_one_required_is_filled(&self) -> FormResult<bool> {
        for field in self.fields() {
            if field.is_required()? && field.has_value()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Values in field order with string values trimmed.
    pub fn serialized_data(&self) -> FormResult<Map<String, Value>> {
        let mut data = Map::new();
        for field in self.fields() {
            let value = match field.value()? {
                Value::String(text) => Value::String(text.trim().to_string()),
                other => other,
            };
            data.insert(field.name().to_string(), value);
        }
        Ok(data)
    }

    /// Non-empty error messages in field order.
    pub fn summary(&self) -> FormResult<Vec<String>> {
        let mut summary = Vec::new();
        for field in self.fields() {
            let message = field.error_message()?;
            if !message.is_empty() {
                summary.push(message);
            }
        }
        Ok(summary)
    }

    /// Restore points of every field.
    pub fn initial_data(&self) -> FormResult<Map<String, Value>> {
        let mut data = Map::new();
        for field in self.fields() {
            data.insert(field.name().to_string(), field.initial_value()?);
        }
        Ok(data)
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot> {
        Ok(FormSnapshot {
            valid: self.valid()?,
            validating: self.is_validating()?,
            interacted: self.interacted()?,
            dirty: self.dirty()?,
            serialized_data: self.serialized_data()?,
            summary: self.summary()?,
        })
    }

    fn set_disabled<I, S>(&self, names: I, disabled: bool) -> FormResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = names
            .into_iter()
            .map(|name| self.field(name.as_ref()))
            .collect::<FormResult<Vec<_>>>()?;
        for field in fields {
            field.set_disabled(disabled)?;
        }
        Ok(())
    }

    fn resolve_all(&self, values: Map<String, Value>) -> FormResult<Vec<(&Field, Value)>> {
        values
            .into_iter()
            .map(|(name, value)| -> FormResult<(&Field, Value)> {
                Ok((self.field(&name)?, value))
            })
            .collect()
    }
}

impl Debug for FormModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormModel")
            .field("fields", &self.fields.fields)
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}
