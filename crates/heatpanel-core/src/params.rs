//! Simulation parameter record and its validation rules.
//!
//! The record is small and `Copy` so it can be swapped whole under a lock and
//! handed to the render loop by value. On the wire it uses the physics names
//! `L`, `M`, `D` and the mode strings `"1D"` / `"2D"`.

use serde::{Deserialize, Serialize};

/// Dimensionality of the simulated domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Rod of length L, drawn as a line plot.
    #[default]
    #[serde(rename = "1D")]
    OneD,
    /// Square plate of side L, drawn as a heatmap.
    #[serde(rename = "2D")]
    TwoD,
}

impl Mode {
    /// Parse the wire name (`1D`/`2D`, case-insensitive; `1d`, `oned` etc.).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1d" | "oned" | "one_d" => Some(Mode::OneD),
            "2d" | "twod" | "two_d" => Some(Mode::TwoD),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::OneD => "1D",
            Mode::TwoD => "2D",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The live parameter set: mode, domain length, initial amplitude, diffusivity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub mode: Mode,
    /// Domain length L (> 0).
    #[serde(rename = "L")]
    pub length: f64,
    /// Initial amplitude M (any finite value, sign allowed).
    #[serde(rename = "M")]
    pub amplitude: f64,
    /// Diffusion coefficient D (> 0 at the API boundary).
    #[serde(rename = "D")]
    pub diffusivity: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            mode: Mode::OneD,
            length: 1.0,
            amplitude: 1.0,
            diffusivity: 0.1,
        }
    }
}

impl SimulationParameters {
    /// Check the record invariants: finite values, `L > 0`, `D > 0`.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !self.length.is_finite() || self.length <= 0.0 {
            return Err(ParameterError::NonPositiveLength(self.length));
        }
        if !self.diffusivity.is_finite() || self.diffusivity <= 0.0 {
            return Err(ParameterError::NonPositiveDiffusivity(self.diffusivity));
        }
        if !self.amplitude.is_finite() {
            return Err(ParameterError::NonFiniteAmplitude(self.amplitude));
        }
        Ok(())
    }
}

/// A partial update as received from the control surface.
///
/// Absent fields keep their current value. `mode` stays a string here so an
/// unknown mode can be reported as a validation error instead of a decode
/// failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParameterUpdate {
    pub mode: Option<String>,
    #[serde(rename = "L")]
    pub length: Option<f64>,
    #[serde(rename = "M")]
    pub amplitude: Option<f64>,
    #[serde(rename = "D")]
    pub diffusivity: Option<f64>,
}

impl ParameterUpdate {
    /// Merge onto `current` and validate the result.
    pub fn apply(&self, current: &SimulationParameters) -> Result<SimulationParameters, ParameterError> {
        let mode = match &self.mode {
            Some(name) => Mode::parse(name).ok_or_else(|| ParameterError::UnknownMode(name.clone()))?,
            None => current.mode,
        };
        let next = SimulationParameters {
            mode,
            length: self.length.unwrap_or(current.length),
            amplitude: self.amplitude.unwrap_or(current.amplitude),
            diffusivity: self.diffusivity.unwrap_or(current.diffusivity),
        };
        next.validate()?;
        Ok(next)
    }
}

impl From<SimulationParameters> for ParameterUpdate {
    fn from(p: SimulationParameters) -> Self {
        Self {
            mode: Some(p.mode.label().to_string()),
            length: Some(p.length),
            amplitude: Some(p.amplitude),
            diffusivity: Some(p.diffusivity),
        }
    }
}

/// Why a parameter set was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterError {
    NonPositiveLength(f64),
    NonPositiveDiffusivity(f64),
    NonFiniteAmplitude(f64),
    UnknownMode(String),
}

impl std::fmt::Display for ParameterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveLength(v) => write!(f, "L must be a positive finite number (got {v})"),
            Self::NonPositiveDiffusivity(v) => {
                write!(f, "D must be a positive finite number (got {v})")
            }
            Self::NonFiniteAmplitude(v) => write!(f, "M must be finite (got {v})"),
            Self::UnknownMode(m) => write!(f, "unknown mode '{m}' (expected 1D or 2D)"),
        }
    }
}

impl std::error::Error for ParameterError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimulationParameters::default().validate().is_ok());
    }

    #[test]
    fn test_mode_parse_variants() {
        assert_eq!(Mode::parse("1D"), Some(Mode::OneD));
        assert_eq!(Mode::parse("1d"), Some(Mode::OneD));
        assert_eq!(Mode::parse(" 2D "), Some(Mode::TwoD));
        assert_eq!(Mode::parse("twod"), Some(Mode::TwoD));
        assert_eq!(Mode::parse("3D"), None);
        assert_eq!(Mode::parse(""), None);
    }

    #[test]
    fn test_validate_rejects_zero_length() {
        let p = SimulationParameters {
            length: 0.0,
            ..Default::default()
        };
        assert_eq!(p.validate(), Err(ParameterError::NonPositiveLength(0.0)));
    }

    #[test]
    fn test_validate_rejects_negative_diffusivity() {
        let p = SimulationParameters {
            diffusivity: -0.5,
            ..Default::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ParameterError::NonPositiveDiffusivity(_))
        ));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let p = SimulationParameters {
            length: f64::NAN,
            ..Default::default()
        };
        assert!(p.validate().is_err());
        let p = SimulationParameters {
            amplitude: f64::INFINITY,
            ..Default::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ParameterError::NonFiniteAmplitude(_))
        ));
    }

    #[test]
    fn test_negative_amplitude_is_valid() {
        let p = SimulationParameters {
            amplitude: -3.0,
            ..Default::default()
        };
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_update_partial_keeps_other_fields() {
        let current = SimulationParameters::default();
        let update = ParameterUpdate {
            amplitude: Some(2.5),
            ..Default::default()
        };
        let next = update.apply(&current).unwrap();
        assert_eq!(next.amplitude, 2.5);
        assert_eq!(next.length, current.length);
        assert_eq!(next.diffusivity, current.diffusivity);
        assert_eq!(next.mode, current.mode);
    }

    #[test]
    fn test_update_unknown_mode() {
        let update = ParameterUpdate {
            mode: Some("3D".to_string()),
            ..Default::default()
        };
        assert_eq!(
            update.apply(&SimulationParameters::default()),
            Err(ParameterError::UnknownMode("3D".to_string()))
        );
    }

    #[test]
    fn test_wire_names() {
        let p = SimulationParameters {
            mode: Mode::TwoD,
            length: 1.0,
            amplitude: 1.0,
            diffusivity: 0.1,
        };
        let json = serde_json::to_value(p).unwrap();
        assert_eq!(json["mode"], "2D");
        assert_eq!(json["L"], 1.0);
        assert_eq!(json["M"], 1.0);
        assert_eq!(json["D"], 0.1);

        let back: SimulationParameters = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_update_from_json_body() {
        let body = r#"{"mode":"2D","L":2.0,"D":0.3}"#;
        let update: ParameterUpdate = serde_json::from_str(body).unwrap();
        let next = update.apply(&SimulationParameters::default()).unwrap();
        assert_eq!(next.mode, Mode::TwoD);
        assert_eq!(next.length, 2.0);
        assert_eq!(next.amplitude, 1.0);
        assert_eq!(next.diffusivity, 0.3);
    }
}
