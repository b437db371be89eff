//! Utilidades de validación
//!
//! Validadores personalizados usados por los DTOs con `validator`.

use validator::ValidationError;

/// Validar días de la semana: 1 (lunes) a 7 (domingo), sin repetir
pub fn validate_week_days(days: &[u8]) -> Result<(), ValidationError> {
    let mut seen = [false; 8];

    for &day in days {
        if !(1..=7).contains(&day) {
            let mut error = ValidationError::new("week_day_range");
            error.add_param("value".into(), &day);
            return Err(error);
        }
        if seen[day as usize] {
            let mut error = ValidationError::new("week_day_duplicated");
            error.add_param("value".into(), &day);
            return Err(error);
        }
        seen[day as usize] = true;
    }

    Ok(())
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}
