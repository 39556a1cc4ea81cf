use chrono::NaiveDate;
use std::collections::HashMap;

/// Columns every import file must declare, whatever the person types inside.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "type", "firstname", "lastname", "pesel", "height", "weight", "email",
];

/// Problems with the header line. Nothing has been read past it yet.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("CSV file is empty")]
    Empty,

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Malformed CSV header: {0}")]
    Malformed(String),
}

/// A row that could not be turned into a domain record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed CSV line at row {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Missing value for column '{column}' at row {line}")]
    MissingValue { column: String, line: usize },

    #[error("Invalid decimal value in column '{column}' at row {line}")]
    InvalidDecimal { column: String, line: usize },

    #[error("Invalid integer value in column '{column}' at row {line}")]
    InvalidInteger { column: String, line: usize },

    #[error("Invalid date value in column '{column}' at row {line}. Expected format ISO-8601 (yyyy-MM-dd)")]
    InvalidDate { column: String, line: usize },

    #[error("Unsupported person type '{label}' at row {line}")]
    UnknownType { label: String, line: usize },

    #[error("Invalid value in column '{column}' at row {line}: {reason}")]
    Invalid {
        column: String,
        line: usize,
        reason: String,
    },
}

/// `;` if the header uses it anywhere, otherwise `,`. Applies to the whole file.
pub fn detect_delimiter(header_line: &str) -> u8 {
    if header_line.contains(';') {
        b';'
    } else {
        b','
    }
}

/// Split one physical line into trimmed fields.
///
/// With `expected_len > 0` the result has exactly that many fields: short
/// lines are padded with empty strings and surplus fields are dropped.
pub fn tokenize(line: &str, delimiter: u8, expected_len: usize) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    reader.read_record(&mut record)?;

    let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
    if expected_len > 0 {
        fields.resize(expected_len, String::new());
    }
    Ok(fields)
}

/// Header of an import file: delimiter plus normalized column names.
#[derive(Debug, Clone)]
pub struct CsvLayout {
    delimiter: u8,
    headers: Vec<String>,
}

impl CsvLayout {
    /// Parse and check the header line.
    pub fn parse(header_line: &str) -> Result<Self, LayoutError> {
        let header_line = header_line.trim_start_matches('\u{feff}');
        if header_line.trim().is_empty() {
            return Err(LayoutError::Empty);
        }

        let delimiter = detect_delimiter(header_line);
        let headers: Vec<String> = tokenize(header_line, delimiter, 0)
            .map_err(|e| LayoutError::Malformed(e.to_string()))?
            .into_iter()
            .map(|h| h.to_lowercase())
            .collect();

        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|column| !headers.iter().any(|h| h == *column))
        {
            return Err(LayoutError::MissingColumn(missing.to_string()));
        }

        Ok(Self { delimiter, headers })
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Normalize one non-blank data line found at physical line `line`.
    pub fn row(&self, raw: &str, line: usize) -> Result<NormalizedRow, DecodeError> {
        let fields = tokenize(raw, self.delimiter, self.headers.len()).map_err(|e| {
            DecodeError::Malformed {
                line,
                reason: e.to_string(),
            }
        })?;
        Ok(NormalizedRow::new(&self.headers, fields, line))
    }
}

/// One data line keyed by lower-cased column name.
#[derive(Debug, Clone)]
pub struct NormalizedRow {
    values: HashMap<String, String>,
    line: usize,
}

impl NormalizedRow {
    pub fn new(headers: &[String], fields: Vec<String>, line: usize) -> Self {
        let values = headers
            .iter()
            .map(|h| h.trim().to_lowercase())
            .zip(fields.into_iter().map(|f| f.trim().to_string()))
            .collect();
        Self { values, line }
    }

    /// 1-based physical line number, the header being line 1.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .get(&column.to_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Declared person type, upper-cased.
    pub fn type_label(&self) -> Result<String, DecodeError> {
        self.required("type").map(|t| t.to_uppercase())
    }

    pub fn required(&self, column: &str) -> Result<&str, DecodeError> {
        self.get(column).ok_or_else(|| DecodeError::MissingValue {
            column: column.to_lowercase(),
            line: self.line,
        })
    }

    pub fn required_string(&self, column: &str) -> Result<String, DecodeError> {
        self.required(column).map(str::to_string)
    }

    /// Decimal with either `.` or `,` as the fractional separator.
    pub fn required_decimal(&self, column: &str) -> Result<f64, DecodeError> {
        let raw = self.required(column)?;
        raw.replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| DecodeError::InvalidDecimal {
                column: column.to_lowercase(),
                line: self.line,
            })
    }

    pub fn required_integer(&self, column: &str) -> Result<i32, DecodeError> {
        let raw = self.required(column)?;
        raw.parse::<i32>().map_err(|_| DecodeError::InvalidInteger {
            column: column.to_lowercase(),
            line: self.line,
        })
    }

    /// ISO-8601 calendar date (`yyyy-MM-dd`).
    pub fn required_date(&self, column: &str) -> Result<NaiveDate, DecodeError> {
        let raw = self.required(column)?;
        raw.parse::<NaiveDate>().map_err(|_| DecodeError::InvalidDate {
            column: column.to_lowercase(),
            line: self.line,
        })
    }
}
