use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use super::properties::NewProperty;

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRent { line: usize, value: String },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read portfolio export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid portfolio CSV data: {}", err),
            ImportError::InvalidRent { line, value } => write!(
                f,
                "line {}: monthly_rent '{}' is not a decimal amount",
                line, value
            ),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::InvalidRent { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads a landlord's portfolio from a `name,address,city,monthly_rent` CSV export.
///
/// An optional `occupant_id` column binds existing occupants. Rent values may carry a leading
/// `$` and thousands separators.
pub struct PortfolioImporter;

impl PortfolioImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<NewProperty>, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<NewProperty>, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut properties = Vec::new();

        for (index, record) in csv_reader.deserialize::<PortfolioRow>().enumerate() {
            let row = record?;
            // header occupies line 1
            let line = index + 2;
            let monthly_rent = parse_rent(&row.monthly_rent).ok_or(ImportError::InvalidRent {
                line,
                value: row.monthly_rent.clone(),
            })?;

            properties.push(NewProperty {
                name: row.name,
                address: row.address,
                city: row.city.unwrap_or_default(),
                monthly_rent,
                occupant_id: row.occupant_id.map(Into::into),
            });
        }

        Ok(properties)
    }
}

#[derive(Debug, Deserialize)]
struct PortfolioRow {
    name: String,
    address: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    city: Option<String>,
    monthly_rent: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    occupant_id: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_rent(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|ch| *ch != ',')
        .collect();
    Decimal::from_str(cleaned.trim()).ok()
}
