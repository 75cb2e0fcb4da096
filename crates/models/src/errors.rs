use serde::Serialize;

/// A single rejected request field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), message: message.into() }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Non-empty after trimming.
pub fn require_text(field: &str, value: &str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::new(field, format!("{field} is required")));
    }
    Ok(())
}

/// Exactly `len` ASCII digits.
pub fn require_digits(field: &str, value: &str, len: usize) -> Result<(), FieldError> {
    let v = value.trim();
    if v.len() != len || !v.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldError::new(field, format!("{field} must be exactly {len} digits")));
    }
    Ok(())
}
