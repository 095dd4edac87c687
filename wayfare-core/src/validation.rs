use std::collections::BTreeMap;

/// Accumulates field-level validation failures before any mutation runs.
///
/// Serialized as `{"field": ["message", …]}` in 422 responses.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `Err(self)` when any failure was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.errors).unwrap_or_default()
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.errors.keys().map(String::as_str).collect();
        write!(f, "validation failed for: {}", fields.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collector_is_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn collects_multiple_messages_per_field() {
        let mut errors = FieldErrors::new();
        errors.push("rating", "must be at least 1");
        errors.push("rating", "must be at most 5");
        errors.push("comment", "too long");

        let json = errors.to_json();
        assert_eq!(json["rating"].as_array().unwrap().len(), 2);
        assert_eq!(json["comment"][0], "too long");
        assert!(errors.into_result().is_err());
    }
}
