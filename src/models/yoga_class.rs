//! Modelo de YogaClass
//!
//! Este módulo contiene el struct YogaClass y sus variantes para CRUD operations.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::instructor::Instructor;
use crate::utils::validation::{validate_not_empty, validate_week_days};

/// Nivel de dificultad de la clase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// Estilo de yoga
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum YogaStyle {
    Hatha,
    Vinyasa,
    Ashtanga,
    Kundalini,
    Restorative,
}

/// Clase de yoga tal como se guarda en el repositorio
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YogaClass {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub instructor_id: u64,
    pub style: YogaStyle,
    pub level: DifficultyLevel,
    pub duration_minutes: u32,
    pub max_capacity: u32,
    pub price: f64,
    pub schedule_time: NaiveTime,
    pub week_days: Vec<u8>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request para crear una nueva clase
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 100), custom = "validate_not_empty")]
    pub name: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    pub instructor_id: u64,
    pub style: YogaStyle,
    pub level: DifficultyLevel,

    #[validate(range(min = 30, max = 120))]
    pub duration_minutes: u32,

    #[validate(range(min = 1, max = 50))]
    pub max_capacity: u32,

    #[validate(range(min = 0.0))]
    pub price: f64,

    pub schedule_time: NaiveTime,

    #[validate(length(min = 1, max = 7), custom = "validate_week_days")]
    pub week_days: Vec<u8>,
}

/// Request para actualizar una clase existente; solo se aplican los campos presentes
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateClassRequest {
    #[validate(length(min = 1, max = 100), custom = "validate_not_empty")]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    #[validate(range(min = 30, max = 120))]
    pub duration_minutes: Option<u32>,

    #[validate(range(min = 1, max = 50))]
    pub max_capacity: Option<u32>,

    #[validate(range(min = 0.0))]
    pub price: Option<f64>,

    pub active: Option<bool>,
}

impl YogaClass {
    /// Aplicar una actualización parcial
    pub fn apply(&mut self, update: UpdateClassRequest, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(duration) = update.duration_minutes {
            self.duration_minutes = duration;
        }
        if let Some(capacity) = update.max_capacity {
            self.max_capacity = capacity;
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        self.updated_at = now;
    }
}

/// Clase con cupos disponibles e instructor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassWithAvailability {
    #[serde(flatten)]
    pub class: YogaClass,
    pub available_spots: u32,
    pub instructor: Option<Instructor>,
}

/// Filtros del listado de clases
///
/// También forma parte de la clave de cache del listado, por eso serializa
/// siempre los mismos campos en el mismo orden.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassFilter {
    pub style: Option<YogaStyle>,
    pub level: Option<DifficultyLevel>,
    pub instructor_id: Option<u64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Default for ClassFilter {
    fn default() -> Self {
        Self {
            style: None,
            level: None,
            instructor_id: None,
            active: true,
        }
    }
}

impl ClassFilter {
    pub fn matches(&self, class: &YogaClass) -> bool {
        self.style.map_or(true, |style| class.style == style)
            && self.level.map_or(true, |level| class.level == level)
            && self
                .instructor_id
                .map_or(true, |instructor_id| class.instructor_id == instructor_id)
            && class.active == self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> CreateClassRequest {
        CreateClassRequest {
            name: "Vinyasa intermedio".to_string(),
            description: Some("Clase para nivel intermedio".to_string()),
            instructor_id: 2,
            style: YogaStyle::Vinyasa,
            level: DifficultyLevel::Intermediate,
            duration_minutes: 75,
            max_capacity: 15,
            price: 30.0,
            schedule_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            week_days: vec![2, 4],
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(sample_request().validate().is_ok());
    }

    #[test]
    fn test_invalid_request_fields() {
        let mut request = sample_request();
        request.duration_minutes = 15;
        request.max_capacity = 60;
        request.week_days = vec![];

        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("duration_minutes"));
        assert!(fields.contains_key("max_capacity"));
        assert!(fields.contains_key("week_days"));
    }

    #[test]
    fn test_update_rejects_blank_name() {
        let update = UpdateClassRequest {
            name: Some("   ".to_string()),
            ..UpdateClassRequest::default()
        };
        let errors = update.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));

        let update = UpdateClassRequest {
            name: Some("Yin nocturno".to_string()),
            ..UpdateClassRequest::default()
        };
        assert!(update.validate().is_ok());
        assert!(UpdateClassRequest::default().validate().is_ok());
    }

    #[test]
    fn test_enums_wire_format() {
        assert_eq!(serde_json::to_value(YogaStyle::Restorative).unwrap(), "restorative");
        assert_eq!(serde_json::to_value(DifficultyLevel::Beginner).unwrap(), "beginner");
    }

    #[test]
    fn test_filter_defaults_to_active() {
        let filter: ClassFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter, ClassFilter::default());
    }
}
