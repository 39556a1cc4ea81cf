use chrono::NaiveDate;
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A person decoded from one CSV row, ready to be persisted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct PersonRecord {
    #[garde(skip)]
    pub id: Uuid,

    /// Label of the registered type module that decoded the row.
    #[garde(skip)]
    pub person_type: String,

    #[garde(length(min = 1, max = 200))]
    pub first_name: String,

    #[garde(length(min = 1, max = 200))]
    pub last_name: String,

    #[garde(custom(pesel_format))]
    pub pesel: String,

    #[garde(custom(strictly_positive))]
    pub height: f64,

    #[garde(custom(strictly_positive))]
    pub weight: f64,

    #[garde(email)]
    pub email: String,

    #[garde(dive)]
    pub details: PersonDetails,
}

/// Type-specific attributes, one variant per registered person type.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonDetails {
    Student {
        #[garde(length(min = 1, max = 200))]
        university: String,
        #[garde(range(min = 1))]
        study_year: i32,
        #[garde(length(min = 1, max = 200))]
        field_of_study: String,
        #[garde(range(min = 0.0))]
        scholarship: f64,
    },
    Employee {
        #[garde(skip)]
        start_date: NaiveDate,
        #[garde(length(min = 1, max = 200))]
        current_position: String,
        #[garde(range(min = 0.0))]
        current_salary: f64,
    },
    Retiree {
        #[garde(range(min = 0.0))]
        pension_amount: f64,
        #[garde(range(min = 0))]
        years_worked: i32,
    },
}

fn pesel_format(value: &str, _ctx: &()) -> garde::Result {
    if value.len() == 11 && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(garde::Error::new("must be exactly 11 digits"))
    }
}

fn strictly_positive(value: &f64, _ctx: &()) -> garde::Result {
    if value.is_finite() && *value > 0.0 {
        Ok(())
    } else {
        Err(garde::Error::new("must be greater than zero"))
    }
}
