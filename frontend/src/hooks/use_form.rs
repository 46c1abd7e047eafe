//! Form binding shared by every create and update form. A controller
//! tracks the values being edited against the defaults it was opened
//! with, runs the payload's schema before anything goes over the wire,
//! and maps failures to field or form-level messages.

use std::future::Future;

use shared::validation::{Schema, ValidationErrors};

use crate::services::error::ApiError;
use crate::services::logging::Logger;

/// Whatever can move input focus to a named field
pub trait FocusTarget {
    /// Returns false when the field has nothing to focus
    fn focus(&mut self, field: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

#[derive(Debug)]
pub enum SubmitOutcome<R> {
    Submitted(R),
    Invalid(ValidationErrors),
    Failed(ApiError),
    /// Submission not allowed in the form's current state
    Blocked,
}

impl<R> SubmitOutcome<R> {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted(_))
    }
}

/// Holds the submitting flag up until dropped, so a cancelled submit
/// leaves the form usable
struct SubmittingGuard<'a>(&'a mut bool);

impl<'a> SubmittingGuard<'a> {
    fn hold(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

pub struct FormController<V> {
    name: String,
    mode: FormMode,
    defaults: V,
    values: V,
    field_order: Vec<String>,
    read_only: bool,
    disabled_fields: Vec<String>,
    errors: ValidationErrors,
    form_error: Option<String>,
    submitting: bool,
}

impl<V> FormController<V>
where
    V: Schema + Clone + PartialEq,
{
    pub fn new(name: impl Into<String>, mode: FormMode, defaults: V) -> Self {
        Self {
            name: name.into(),
            mode,
            values: defaults.clone(),
            defaults,
            field_order: Vec::new(),
            read_only: false,
            disabled_fields: Vec::new(),
            errors: ValidationErrors::new(),
            form_error: None,
            submitting: false,
        }
    }

    pub fn create(name: impl Into<String>, defaults: V) -> Self {
        Self::new(name, FormMode::Create, defaults)
    }

    pub fn edit(name: impl Into<String>, current: V) -> Self {
        Self::new(name, FormMode::Edit, current)
    }

    /// Render order of the fields, used to pick which invalid field gets focus
    pub fn with_field_order<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_order = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_disabled_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn values(&self) -> &V {
        &self.values
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.errors.message_for(field)
    }

    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn set(&mut self, values: V) {
        self.values = values;
    }

    /// Edit values in place. Errors on touched fields are left until the
    /// next validation.
    pub fn update(&mut self, edit: impl FnOnce(&mut V)) {
        edit(&mut self.values);
    }

    pub fn is_dirty(&self) -> bool {
        self.values != self.defaults
    }

    pub fn is_field_disabled(&self, field: &str) -> bool {
        self.read_only || self.submitting || self.disabled_fields.iter().any(|f| f == field)
    }

    /// Edit forms only submit once something changed
    pub fn can_submit(&self) -> bool {
        if self.read_only || self.submitting {
            return false;
        }
        match self.mode {
            FormMode::Create => true,
            FormMode::Edit => self.is_dirty(),
        }
    }

    /// Run the schema over the current values, keeping the field errors.
    /// Returns the parsed payload on success.
    pub fn validate(&mut self) -> Result<V, ValidationErrors> {
        match self.values.clone().parse() {
            Ok(parsed) => {
                self.errors = ValidationErrors::new();
                Ok(parsed)
            }
            Err(errors) => {
                self.errors = errors.clone();
                Err(errors)
            }
        }
    }

    /// First invalid field in render order. Nested errors such as
    /// `entries.1.debit` count against their top-level field.
    pub fn first_invalid_field(&self) -> Option<String> {
        let ordered = self.field_order.iter().find(|field| {
            self.errors
                .iter()
                .any(|e| e.field == **field || e.field.starts_with(&format!("{}.", field)))
        });
        ordered
            .cloned()
            .or_else(|| self.errors.iter().next().map(|e| e.field.clone()))
    }

    pub fn focus_first_invalid(&self, target: &mut impl FocusTarget) -> Option<String> {
        let field = self.first_invalid_field()?;
        if target.focus(&field) {
            Some(field)
        } else {
            None
        }
    }

    /// Validate, then hand the parsed payload to `mutation`. Nothing is sent
    /// when validation fails. On success the submitted values become the
    /// new baseline so the form reads as clean.
    pub async fn submit<R, F, Fut>(&mut self, mutation: F) -> SubmitOutcome<R>
    where
        F: FnOnce(V) -> Fut,
        Fut: Future<Output = Result<R, ApiError>>,
    {
        if !self.can_submit() {
            Logger::debug_with_component(&self.name, "submit blocked");
            return SubmitOutcome::Blocked;
        }
        self.form_error = None;

        let payload = match self.validate() {
            Ok(payload) => payload,
            Err(errors) => {
                Logger::debug_with_component(&self.name, &format!("invalid: {}", errors));
                return SubmitOutcome::Invalid(errors);
            }
        };

        let result = {
            let _submitting = SubmittingGuard::hold(&mut self.submitting);
            mutation(payload).await
        };

        match result {
            Ok(response) => {
                self.defaults = self.values.clone();
                Logger::info_with_component(&self.name, "submitted");
                SubmitOutcome::Submitted(response)
            }
            Err(ApiError::Validation(errors)) => {
                self.errors = errors.clone();
                SubmitOutcome::Invalid(errors)
            }
            Err(e) => {
                Logger::warn_with_component(&self.name, &format!("submit failed: {}", e));
                self.form_error = Some(e.user_message());
                SubmitOutcome::Failed(e)
            }
        }
    }

    pub fn reset(&mut self) {
        self.values = self.defaults.clone();
        self.errors = ValidationErrors::new();
        self.form_error = None;
    }

    /// Reopen the form on new defaults
    pub fn reset_to(&mut self, defaults: V) {
        self.defaults = defaults;
        self.reset();
    }
}
