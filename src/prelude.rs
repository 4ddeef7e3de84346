pub use crate::form::{
    Field, FieldDescriptor, FieldSnapshot, FormError, FormModel, FormOptions, FormResult,
    FormSnapshot, Required, Siblings, ValidationEntry, ValidationType, ValidatorRegistry, Verdict,
    create_model,
};
