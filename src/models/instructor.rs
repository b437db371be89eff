use serde::{Deserialize, Serialize};

use super::yoga_class::YogaStyle;

/// Instructor del centro
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instructor {
    pub id: u64,
    pub name: String,
    pub specialties: Vec<YogaStyle>,
    pub years_experience: u32,
    pub rating: f64,
}

impl Instructor {
    /// Instructores con los que arranca el centro
    pub fn default_roster() -> Vec<Instructor> {
        vec![
            Instructor {
                id: 1,
                name: "Ana García".to_string(),
                specialties: vec![YogaStyle::Hatha, YogaStyle::Restorative],
                years_experience: 5,
                rating: 4.8,
            },
            Instructor {
                id: 2,
                name: "Carlos López".to_string(),
                specialties: vec![YogaStyle::Vinyasa, YogaStyle::Ashtanga],
                years_experience: 7,
                rating: 4.9,
            },
        ]
    }
}
