use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfare_core::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TourStatus {
    Draft,
    Active,
    Inactive,
}

impl TourStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TourStatus::Draft => "draft",
            TourStatus::Active => "active",
            TourStatus::Inactive => "inactive",
        }
    }
}

impl std::str::FromStr for TourStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(TourStatus::Draft),
            "active" => Ok(TourStatus::Active),
            "inactive" => Ok(TourStatus::Inactive),
            other => Err(format!("unknown tour status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Moderate => "moderate",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "moderate" => Ok(Difficulty::Moderate),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A tour offered by a guide. Prices are integer cents.
#[derive(Debug, Clone, Serialize)]
pub struct Tour {
    pub id: Uuid,
    pub guide_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub short_description: Option<String>,
    pub location: Option<String>,
    pub meeting_point: Option<String>,
    pub duration_hours: i32,
    pub max_participants: i32,
    pub price_cents: i64,
    pub difficulty: Difficulty,
    pub status: TourStatus,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tour {
    pub fn is_bookable(&self) -> bool {
        self.status == TourStatus::Active
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTour {
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub short_description: Option<String>,
    pub location: Option<String>,
    pub meeting_point: Option<String>,
    pub duration_hours: i32,
    pub max_participants: i32,
    pub price_cents: i64,
    pub difficulty: Difficulty,
}

impl CreateTour {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.title.trim().is_empty() {
            errors.push("title", "must not be empty");
        }
        if self.title.len() > 255 {
            errors.push("title", "must be at most 255 characters");
        }
        if self.description.trim().is_empty() {
            errors.push("description", "must not be empty");
        }
        if self.duration_hours < 1 {
            errors.push("duration_hours", "must be at least 1");
        }
        if self.max_participants < 1 {
            errors.push("max_participants", "must be at least 1");
        }
        if self.price_cents < 0 {
            errors.push("price_cents", "must not be negative");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTour {
    pub category_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub location: Option<String>,
    pub meeting_point: Option<String>,
    pub duration_hours: Option<i32>,
    pub max_participants: Option<i32>,
    pub price_cents: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<TourStatus>,
    pub featured: Option<bool>,
}

impl UpdateTour {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                errors.push("title", "must not be empty");
            }
        }
        if matches!(self.duration_hours, Some(h) if h < 1) {
            errors.push("duration_hours", "must be at least 1");
        }
        if matches!(self.max_participants, Some(m) if m < 1) {
            errors.push("max_participants", "must be at least 1");
        }
        if matches!(self.price_cents, Some(p) if p < 0) {
            errors.push("price_cents", "must not be negative");
        }
        errors.into_result()
    }
}

/// URL-safe slug derived from a tour title. Uniqueness comes from the store's
/// unique column plus a short suffix on collision.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("tour");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_dashes() {
        assert_eq!(slugify("Desert Safari & Dinner"), "desert-safari-dinner");
        assert_eq!(slugify("  Old   Town Walk  "), "old-town-walk");
        assert_eq!(slugify("!!!"), "tour");
    }

    #[test]
    fn create_tour_rejects_out_of_range_fields() {
        let input = CreateTour {
            category_id: Uuid::new_v4(),
            title: "".into(),
            description: "d".into(),
            short_description: None,
            location: None,
            meeting_point: None,
            duration_hours: 0,
            max_participants: 0,
            price_cents: -1,
            difficulty: Difficulty::Easy,
        };
        let errors = input.validate().unwrap_err();
        let json = errors.to_json();
        assert!(json.get("title").is_some());
        assert!(json.get("duration_hours").is_some());
        assert!(json.get("max_participants").is_some());
        assert!(json.get("price_cents").is_some());
    }

    #[test]
    fn partial_update_only_validates_present_fields() {
        let update = UpdateTour { price_cents: Some(5000), ..Default::default() };
        assert!(update.validate().is_ok());

        let update = UpdateTour { max_participants: Some(0), ..Default::default() };
        assert!(update.validate().is_err());
    }
}
