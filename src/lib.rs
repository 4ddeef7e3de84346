//! Reactive form validation: per-field validation state machines, an
//! aggregate [`form::FormModel`] and an injectable table of generic rules.
//!
//! ```ignore
//! use calmform::prelude::*;
//! use serde_json::json;
//!
//! let initial = json!({ "name": "", "email": "" });
//! let model = create_model(
//!     initial.as_object().cloned().unwrap_or_default(),
//!     [
//!         ("name", FieldDescriptor::new().required("Name required")),
//!         ("email", FieldDescriptor::new().validation_type(ValidationType::Email)),
//!     ],
//! )?;
//! let valid = model.validate(true).await?;
//! ```

pub mod form;
pub mod prelude;

#[cfg(test)]
mod test_public_api;
