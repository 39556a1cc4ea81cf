use crate::models::person::PersonDetails;
use crate::services::csv_row::{DecodeError, NormalizedRow};
use crate::services::registry::PersonTypeModule;

pub struct StudentModule;

impl PersonTypeModule for StudentModule {
    fn type_label(&self) -> &'static str {
        "STUDENT"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &["university", "studyyear", "fieldofstudy", "scholarship"]
    }

    fn decode_details(&self, row: &NormalizedRow) -> Result<PersonDetails, DecodeError> {
        Ok(PersonDetails::Student {
            university: row.required_string("university")?,
            study_year: row.required_integer("studyyear")?,
            field_of_study: row.required_string("fieldofstudy")?,
            scholarship: row.required_decimal("scholarship")?,
        })
    }
}

pub struct EmployeeModule;

impl PersonTypeModule for EmployeeModule {
    fn type_label(&self) -> &'static str {
        "EMPLOYEE"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &["startdate", "currentposition", "currentsalary"]
    }

    fn decode_details(&self, row: &NormalizedRow) -> Result<PersonDetails, DecodeError> {
        Ok(PersonDetails::Employee {
            start_date: row.required_date("startdate")?,
            current_position: row.required_string("currentposition")?,
            current_salary: row.required_decimal("currentsalary")?,
        })
    }
}

pub struct RetireeModule;

impl PersonTypeModule for RetireeModule {
    fn type_label(&self) -> &'static str {
        "RETIREE"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &["pensionamount", "yearsworked"]
    }

    fn decode_details(&self, row: &NormalizedRow) -> Result<PersonDetails, DecodeError> {
        Ok(PersonDetails::Retiree {
            pension_amount: row.required_decimal("pensionamount")?,
            years_worked: row.required_integer("yearsworked")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::csv_row::CsvLayout;

    const HEADER: &str = "type;firstname;lastname;pesel;height;weight;email;university;studyyear;fieldofstudy;scholarship;pensionamount;yearsworked";

    #[test]
    fn test_student_decoding() {
        let row = CsvLayout::parse(HEADER)
            .unwrap()
            .row("STUDENT;John;Smith;12345678901;180;75;john@example.com;University of Testing;1;Computer Science;1200,5;;", 2)
            .unwrap();
        let record = StudentModule.from_row(&row).unwrap();
        assert_eq!(
            record.details,
            PersonDetails::Student {
                university: "University of Testing".to_string(),
                study_year: 1,
                field_of_study: "Computer Science".to_string(),
                scholarship: 1200.5,
            }
        );
    }

    #[test]
    fn test_student_year_must_be_integer() {
        let row = CsvLayout::parse(HEADER)
            .unwrap()
            .row("STUDENT;John;Smith;12345678901;180;75;john@example.com;UoT;first;CS;0;;", 5)
            .unwrap();
        assert_eq!(
            StudentModule.from_row(&row).unwrap_err().to_string(),
            "Invalid integer value in column 'studyyear' at row 5"
        );
    }

    #[test]
    fn test_retiree_decoding() {
        let row = CsvLayout::parse(HEADER)
            .unwrap()
            .row("RETIREE;Mark;Brown;34567890123;175;82;mark@example.com;;;;;2500;35", 3)
            .unwrap();
        let record = RetireeModule.from_row(&row).unwrap();
        assert_eq!(
            record.details,
            PersonDetails::Retiree {
                pension_amount: 2500.0,
                years_worked: 35,
            }
        );
    }

    #[test]
    fn test_retiree_missing_pension() {
        let row = CsvLayout::parse(HEADER)
            .unwrap()
            .row("RETIREE;Mark;Brown;34567890123;175;82;mark@example.com", 4)
            .unwrap();
        assert_eq!(
            RetireeModule.from_row(&row).unwrap_err(),
            DecodeError::MissingValue {
                column: "pensionamount".to_string(),
                line: 4
            }
        );
    }
}
