use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfare_core::FieldErrors;

/// A user's guide profile. One per user; verified by an admin before the
/// guide's tours are surfaced.
#[derive(Debug, Clone, Serialize)]
pub struct GuideProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: String,
    pub languages: Vec<String>,
    pub specialties: Vec<String>,
    pub certifications: Vec<String>,
    pub experience_years: i32,
    pub is_verified: bool,
    pub is_available: bool,
    pub rating: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterGuide {
    pub bio: String,
    pub languages: Vec<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    pub experience_years: i32,
}

impl RegisterGuide {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.bio.trim().is_empty() {
            errors.push("bio", "must not be empty");
        }
        if self.bio.len() > 2000 {
            errors.push("bio", "must be at most 2000 characters");
        }
        if self.languages.is_empty() {
            errors.push("languages", "at least one language is required");
        }
        if self.experience_years < 0 {
            errors.push("experience_years", "must not be negative");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGuide {
    pub bio: Option<String>,
    pub languages: Option<Vec<String>>,
    pub specialties: Option<Vec<String>>,
    pub certifications: Option<Vec<String>>,
    pub experience_years: Option<i32>,
    pub is_available: Option<bool>,
}
