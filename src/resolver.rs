//! Resolves a form to the list of fields its conditions may reference,
//! memoized per form name.
//!
//! This is plumbing around the compiler, not part of it: the builder only
//! ever sees the field list. The cache exists because resolving a form is
//! done on every runtime view refresh and the field set is stable for the
//! life of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::value::{Field, FieldDef};

/// A form definition as the surrounding application hands it over: a
/// stable name and the fields bound to its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl Form {
    pub fn new(name: &str, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.to_string(),
            fields,
        }
    }
}

/// The resolved field set for one form. Read-only once built; the
/// compiler never mutates it.
#[derive(Debug)]
pub struct FormFieldResolver {
    fields: Vec<FieldDef>,
}

impl FormFieldResolver {
    fn new(form: &Form) -> Self {
        Self {
            fields: form.fields.clone(),
        }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// The field list in the shape [crate::builder::ConditionBuilder]
    /// takes it.
    pub fn field_refs(&self) -> Vec<&dyn Field> {
        self.fields.iter().map(|f| f as &dyn Field).collect()
    }
}

/// Hands out at most one [FormFieldResolver] per form name, no matter how
/// many threads ask at once. The lock is scoped to the map; resolvers
/// themselves are shared via [Arc] and need no further coordination.
#[derive(Debug, Default)]
pub struct ResolverCache {
    cache: Mutex<HashMap<String, Arc<FormFieldResolver>>>,
}

impl ResolverCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the resolver for `form`, building it on first request.
    pub fn resolver(&self, form: &Form) -> Arc<FormFieldResolver> {
        let mut cache = self.lock();
        cache
            .entry(form.name.clone())
            .or_insert_with(|| Arc::new(FormFieldResolver::new(form)))
            .clone()
    }

    /// Drops the cached resolver for a form, forcing a rebuild on the
    /// next request. Called when a form definition is edited.
    pub fn invalidate(&self, form_name: &str) {
        self.lock().remove(form_name);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<FormFieldResolver>>> {
        // A panic while holding the lock leaves the map intact, so the
        //  poisoned state can be safely ignored.
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
