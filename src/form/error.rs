use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use super::registry::ValidationType;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FormError {
    #[error("field not found: `{0}`")]
    FieldNotFound(String),
    #[error("unknown validation type: `{0}`")]
    UnknownValidationType(String),
    #[error("no rule registered for validation type `{0}`")]
    UnregisteredValidationType(ValidationType),
    #[error("form state lock poisoned while {0}")]
    StatePoisoned(&'static str),
}

pub type FormResult<T> = Result<T, FormError>;

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
