use garde::Validate;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::person::{PersonDetails, PersonRecord};
use crate::services::csv_row::{DecodeError, NormalizedRow};
use crate::services::person_types::{EmployeeModule, RetireeModule, StudentModule};

/// Decoder for one person type.
///
/// Implementations only describe their own columns; the common attributes,
/// required-column checks and validation are shared by [`from_row`](Self::from_row).
pub trait PersonTypeModule: Send + Sync {
    /// Label matched (case-insensitively) against the `type` column.
    fn type_label(&self) -> &'static str;

    /// Columns that must hold a value for rows of this type.
    fn required_columns(&self) -> &'static [&'static str];

    fn decode_details(&self, row: &NormalizedRow) -> Result<PersonDetails, DecodeError>;

    fn from_row(&self, row: &NormalizedRow) -> Result<PersonRecord, DecodeError> {
        let record = PersonRecord {
            id: Uuid::new_v4(),
            person_type: self.type_label().to_uppercase(),
            first_name: row.required_string("firstname")?,
            last_name: row.required_string("lastname")?,
            pesel: row.required_string("pesel")?,
            height: row.required_decimal("height")?,
            weight: row.required_decimal("weight")?,
            email: row.required_string("email")?,
            details: {
                for column in self.required_columns() {
                    row.required(column)?;
                }
                self.decode_details(row)?
            },
        };

        if let Err(report) = record.validate() {
            if let Some((path, error)) = report.iter().next() {
                return Err(DecodeError::Invalid {
                    column: column_for_path(&path.to_string()),
                    line: row.line(),
                    reason: error.to_string(),
                });
            }
        }
        Ok(record)
    }
}

/// `details.current_salary` -> `currentsalary`
fn column_for_path(path: &str) -> String {
    path.rsplit('.')
        .next()
        .unwrap_or(path)
        .replace('_', "")
        .to_lowercase()
}

/// Lookup of person-type decoders by label, populated once at start-up.
#[derive(Clone, Default)]
pub struct PersonTypeRegistry {
    modules: HashMap<String, Arc<dyn PersonTypeModule>>,
}

impl PersonTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the student, employee and retiree decoders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(StudentModule));
        registry.register(Arc::new(EmployeeModule));
        registry.register(Arc::new(RetireeModule));
        registry
    }

    /// Add a decoder, replacing any previous one with the same label.
    pub fn register(&mut self, module: Arc<dyn PersonTypeModule>) -> &mut Self {
        self.modules
            .insert(module.type_label().to_uppercase(), module);
        self
    }

    pub fn resolve(&self, label: &str) -> Option<&Arc<dyn PersonTypeModule>> {
        self.modules.get(&label.trim().to_uppercase())
    }

    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels: Vec<_> = self.modules.values().map(|m| m.type_label()).collect();
        labels.sort_unstable();
        labels
    }

    /// Resolve the row's declared type and decode it.
    pub fn decode(&self, row: &NormalizedRow) -> Result<PersonRecord, DecodeError> {
        let label = row.type_label()?;
        let module = self.resolve(&label).ok_or_else(|| DecodeError::UnknownType {
            label: label.clone(),
            line: row.line(),
        })?;
        module.from_row(row)
    }
}
