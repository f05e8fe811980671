use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Experiment record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solvent {
    pub smiles: String,
    #[serde(default)]
    pub supplier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Electrode {
    pub material: String,
    pub purity: f64,
    pub manufacturer: String,
    /// millimetres
    pub diameter: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analyte {
    pub smiles: String,
    /// µM
    pub concentration: f64,
}

/// Metadata describing one break-junction experiment.
///
/// Carried alongside the datasets and shown to the operator; the histogram
/// pipeline never reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// ISO-8601 date kept as text.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub name_experimentalist: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub name_principal_investigator: Vec<String>,
    pub method: String,
    pub analyte: Analyte,
    /// K
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// mbar
    #[serde(default = "default_pressure")]
    pub pressure: f64,
    pub solvent: Solvent,
    /// V
    pub bias_voltage: f64,
    /// Hz
    #[serde(default = "default_acquisition_rate")]
    pub acquisition_rate: f64,
    /// nm/s
    #[serde(default = "default_pulling_rate")]
    pub pulling_rate: f64,
    pub electrode: Electrode,
    #[serde(default)]
    pub procedure: String,
}

pub const MIN_PULLING_RATE: f64 = 1e-16;

fn default_temperature() -> f64 {
    300.0
}

fn default_pressure() -> f64 {
    1013.25
}

fn default_acquisition_rate() -> f64 {
    40_000.0
}

fn default_pulling_rate() -> f64 {
    20.0
}

/// Accept `"name"` as well as `["name", ...]`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single constraint violation.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("invalid experiment metadata JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid experiment metadata: {}", join(.0))]
    Invalid(Vec<FieldError>),
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Experiment {
    /// Parse and validate a JSON record.
    pub fn from_json(text: &str) -> Result<Self, MetadataError> {
        let experiment: Experiment = serde_json::from_str(text)?;
        experiment.validated()
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("<{e}>"))
    }

    /// Trim every text field and check all numeric constraints.
    pub fn validated(mut self) -> Result<Self, MetadataError> {
        let mut errors = Vec::new();

        trim_names(&mut self.name_experimentalist, "name_experimentalist", &mut errors);
        trim_names(
            &mut self.name_principal_investigator,
            "name_principal_investigator",
            &mut errors,
        );
        trim(&mut self.method);
        trim(&mut self.analyte.smiles);
        trim(&mut self.solvent.smiles);
        if let Some(supplier) = &mut self.solvent.supplier {
            trim(supplier);
        }
        trim(&mut self.electrode.material);
        trim(&mut self.electrode.manufacturer);
        if let Some(date) = &mut self.date {
            trim(date);
        }

        non_negative(self.temperature, "temperature", &mut errors);
        non_negative(self.pressure, "pressure", &mut errors);
        if !(self.pulling_rate >= MIN_PULLING_RATE) {
            errors.push(FieldError {
                field: "pulling_rate",
                reason: format!("must be >= {MIN_PULLING_RATE:e}, got {}", self.pulling_rate),
            });
        }
        positive(self.acquisition_rate, "acquisition_rate", &mut errors);
        positive(self.analyte.concentration, "analyte.concentration", &mut errors);
        positive(self.bias_voltage, "bias_voltage", &mut errors);
        positive(self.electrode.purity, "electrode.purity", &mut errors);
        positive(self.electrode.diameter, "electrode.diameter", &mut errors);

        if errors.is_empty() {
            Ok(self)
        } else {
            Err(MetadataError::Invalid(errors))
        }
    }

    /// The record shown before the operator loads their own.
    pub fn example() -> Self {
        Experiment {
            date: None,
            name_experimentalist: vec!["John Smith".to_string()],
            name_principal_investigator: vec!["Jane Doe".to_string()],
            method: "Some method".to_string(),
            analyte: Analyte {
                smiles: "C1=CC=CC=C1".to_string(),
                concentration: 0.1,
            },
            temperature: 298.15,
            pressure: default_pressure(),
            solvent: Solvent {
                smiles: "CCO".to_string(),
                supplier: Some("Sigma-Aldrich".to_string()),
            },
            bias_voltage: 1.0,
            acquisition_rate: default_acquisition_rate(),
            pulling_rate: default_pulling_rate(),
            electrode: Electrode {
                material: "gold".to_string(),
                purity: 99.99,
                manufacturer: "Some company".to_string(),
                diameter: 1.0,
            },
            procedure: "Some procedure".to_string(),
        }
    }
}

fn trim(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}

fn trim_names(names: &mut Vec<String>, field: &'static str, errors: &mut Vec<FieldError>) {
    names.iter_mut().for_each(trim);
    names.retain(|n| !n.is_empty());
    if names.is_empty() {
        errors.push(FieldError {
            field,
            reason: "at least one non-empty name is required".to_string(),
        });
    }
}

fn positive(value: f64, field: &'static str, errors: &mut Vec<FieldError>) {
    if !(value > 0.0 && value.is_finite()) {
        errors.push(FieldError {
            field,
            reason: format!("must be positive, got {value}"),
        });
    }
}

fn non_negative(value: f64, field: &'static str, errors: &mut Vec<FieldError>) {
    if !(value >= 0.0 && value.is_finite()) {
        errors.push(FieldError {
            field,
            reason: format!("must be non-negative, got {value}"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "name_experimentalist": "  Ada  ",
        "name_principal_investigator": ["Grace", " Barbara "],
        "method": " MCBJ ",
        "analyte": {"smiles": "c1ccccc1", "concentration": 100.0},
        "solvent": {"smiles": "CCCCCCCC"},
        "bias_voltage": 0.1,
        "electrode": {"material": "Au", "purity": 99.99, "manufacturer": "Acme", "diameter": 0.25}
    }"#;

    #[test]
    fn defaults_and_trimming() {
        let exp = Experiment::from_json(MINIMAL).unwrap();
        assert_eq!(exp.name_experimentalist, vec!["Ada"]);
        assert_eq!(exp.name_principal_investigator, vec!["Grace", "Barbara"]);
        assert_eq!(exp.method, "MCBJ");
        assert_eq!(exp.temperature, 300.0);
        assert_eq!(exp.pressure, 1013.25);
        assert_eq!(exp.pulling_rate, 20.0);
        assert_eq!(exp.acquisition_rate, 40_000.0);
        assert_eq!(exp.solvent.supplier, None);
        assert_eq!(exp.procedure, "");
    }

    #[test]
    fn constraint_violations_are_all_reported() {
        let mut exp = Experiment::example();
        exp.name_experimentalist = vec!["   ".to_string()];
        exp.bias_voltage = 0.0;
        exp.pulling_rate = 0.0;
        exp.temperature = -1.0;

        let Err(MetadataError::Invalid(errors)) = exp.validated() else {
            panic!("expected validation errors");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["name_experimentalist", "temperature", "pulling_rate", "bias_voltage"]
        );
    }

    #[test]
    fn example_is_valid_and_round_trips_through_json() {
        let exp = Experiment::example().validated().unwrap();
        let again = Experiment::from_json(&exp.to_pretty_json()).unwrap();
        assert_eq!(exp, again);
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            Experiment::from_json("{\"method\": 1}"),
            Err(MetadataError::Json(_))
        ));
    }
}
