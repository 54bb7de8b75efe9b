use serde::Deserialize;
use time::{macros::format_description, Date};

use crate::error::{FieldError, ValidationErrors};
use crate::forms::{non_negative, optional_text, text};

/// Raw form body for workout create/update.
#[derive(Debug, Default, Deserialize)]
pub struct WorkoutForm {
    pub workout_type_id: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub duration_min: Option<String>,
    pub intensity: Option<String>,
    pub calories_burned: Option<String>,
    pub notes: Option<String>,
    pub csrf_token: Option<String>,
}

/// Validated workout fields, ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutInput {
    pub workout_type_id: i32,
    pub description: Option<String>,
    pub date: Date,
    pub duration_min: i32,
    pub intensity: i32,
    pub calories_burned: i32,
    pub notes: Option<String>,
}

pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()
}

pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

impl WorkoutForm {
    pub fn validate(&self) -> Result<WorkoutInput, ValidationErrors> {
        let mut errors = Vec::new();

        let workout_type_id = text(self.workout_type_id.as_deref())
            .parse::<i32>()
            .ok()
            .filter(|id| *id > 0);
        if workout_type_id.is_none() {
            errors.push(FieldError::new("workout_type_id", "Choose a workout type."));
        }

        let date = parse_date(&text(self.date.as_deref()));
        if date.is_none() {
            errors.push(FieldError::new("date", "Date must be a valid YYYY-MM-DD date."));
        }

        match (workout_type_id, date) {
            (Some(workout_type_id), Some(date)) if errors.is_empty() => Ok(WorkoutInput {
                workout_type_id,
                description: optional_text(self.description.as_deref()),
                date,
                duration_min: non_negative(self.duration_min.as_deref()),
                intensity: non_negative(self.intensity.as_deref()),
                calories_burned: non_negative(self.calories_burned.as_deref()),
                notes: optional_text(self.notes.as_deref()),
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn base() -> WorkoutForm {
        WorkoutForm {
            workout_type_id: Some("2".into()),
            date: Some("2025-03-14".into()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_form_coerces_numbers() {
        let form = WorkoutForm {
            duration_min: Some("45".into()),
            intensity: Some("high".into()),
            calories_burned: Some("-10".into()),
            notes: Some("  felt good ".into()),
            ..base()
        };
        let input = form.validate().unwrap();
        assert_eq!(input.workout_type_id, 2);
        assert_eq!(
            input.date,
            Date::from_calendar_date(2025, Month::March, 14).unwrap()
        );
        assert_eq!(input.duration_min, 45);
        assert_eq!(input.intensity, 0);
        assert_eq!(input.calories_burned, 0);
        assert_eq!(input.notes.as_deref(), Some("felt good"));
        assert_eq!(input.description, None);
    }

    #[test]
    fn missing_type_and_bad_date_are_reported_together() {
        let form = WorkoutForm {
            workout_type_id: Some("zero".into()),
            date: Some("14/03/2025".into()),
            ..Default::default()
        };
        let errs = form.validate().unwrap_err();
        assert!(errs.has_field("workout_type_id"));
        assert!(errs.has_field("date"));
    }

    #[test]
    fn impossible_dates_are_rejected() {
        let form = WorkoutForm {
            date: Some("2025-02-30".into()),
            ..base()
        };
        assert!(form.validate().unwrap_err().has_field("date"));
    }

    #[test]
    fn date_formatting_round_trips() {
        let d = parse_date("2024-12-01").unwrap();
        assert_eq!(format_date(d), "2024-12-01");
    }
}
