// src/common/validation.rs

use validator::{ValidateEmail, ValidationErrors};

use crate::common::error::{validation_messages, AppError};

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 100;

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Verifica o tamanho de um nome (em caracteres, não bytes).
pub fn validate_name_length(name: &str, min: usize, max: usize) -> bool {
    let len = name.trim().chars().count();
    len >= min && len <= max
}

/// Texto opcional vindo de formulário: espaços nas pontas saem, vazio vira `None`.
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Acumula violações para devolver todas de uma vez.
#[derive(Debug, Default)]
pub struct ValidationReport {
    errors: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra `message` quando `ok` for falso.
    pub fn check(&mut self, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(message.into());
        }
        self
    }

    pub fn push(&mut self, message: impl Into<String>) -> &mut Self {
        self.errors.push(message.into());
        self
    }

    /// Absorve o resultado do derive `Validate`.
    pub fn merge(&mut self, result: Result<(), ValidationErrors>) -> &mut Self {
        if let Err(errors) = result {
            self.errors.extend(validation_messages(&errors));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}
