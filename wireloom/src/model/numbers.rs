//! Quantities with an optional unit (lengths, gauges, BOM quantities).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::HarnessError;

/// A number together with an optional unit, e.g. `2.5 m` or `1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberAndUnit {
    pub number: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Raw quantity as it appears in the input: a bare number or `"<number> <unit>"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    Number(f64),
    Text(String),
}

impl NumberAndUnit {
    pub fn new(number: f64, unit: Option<&str>) -> Self {
        Self {
            number,
            unit: unit.map(str::to_string),
        }
    }

    pub fn unitless(number: f64) -> Self {
        Self { number, unit: None }
    }

    /// Convert an input quantity, applying `default_unit` when the input carries none.
    pub fn from_input(
        input: &QuantityInput,
        default_unit: Option<&str>,
    ) -> Result<Self, HarnessError> {
        match input {
            QuantityInput::Number(n) => Ok(Self::new(*n, default_unit)),
            QuantityInput::Text(text) => Self::parse(text, default_unit),
        }
    }

    /// Parse `"<number>"` or `"<number> <unit>"`.
    pub fn parse(text: &str, default_unit: Option<&str>) -> Result<Self, HarnessError> {
        let text = text.trim();
        let (number, unit) = match text.split_once(' ') {
            Some((number, unit)) => (number, Some(unit.trim())),
            None => (text, default_unit),
        };
        let number: f64 = number.parse().map_err(|_| HarnessError::InvalidDefinition {
            designator: text.to_string(),
            reason: "not a valid number and unit; it must be a number, \
                     or a number and unit separated by a space"
                .to_string(),
        })?;
        Ok(Self::new(number, unit))
    }

    fn chose_unit(&self, other: &NumberAndUnit) -> Result<Option<String>, HarnessError> {
        match (&self.unit, &other.unit) {
            (None, unit) => Ok(unit.clone()),
            (Some(a), Some(b)) if a != b => Err(HarnessError::UnitMismatch {
                left: self.to_string(),
                right: other.to_string(),
            }),
            (Some(a), _) => Ok(Some(a.clone())),
        }
    }

    /// Unit-aware addition; a unit-less operand adopts the other's unit.
    pub fn try_add(&self, other: &NumberAndUnit) -> Result<NumberAndUnit, HarnessError> {
        Ok(NumberAndUnit {
            number: self.number + other.number,
            unit: self.chose_unit(other)?,
        })
    }

    /// Unit-aware multiplication, resolving units like [`NumberAndUnit::try_add`].
    pub fn try_mul(&self, other: &NumberAndUnit) -> Result<NumberAndUnit, HarnessError> {
        Ok(NumberAndUnit {
            number: self.number * other.number,
            unit: self.chose_unit(other)?,
        })
    }

    pub fn scale(&self, factor: f64) -> NumberAndUnit {
        NumberAndUnit {
            number: self.number * factor,
            unit: self.unit.clone(),
        }
    }

    pub fn number_str(&self) -> String {
        if self.number.fract() != 0.0 {
            format!("{:.2}", self.number)
        } else {
            format!("{}", self.number as i64)
        }
    }

    pub fn unit_str(&self) -> &str {
        self.unit.as_deref().unwrap_or("")
    }
}

impl fmt::Display for NumberAndUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) if !unit.is_empty() => write!(f, "{} {}", self.number_str(), unit),
            _ => write!(f, "{}", self.number_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_integer_and_fraction() {
        assert_eq!(NumberAndUnit::new(3.0, Some("m")).to_string(), "3 m");
        assert_eq!(NumberAndUnit::new(0.25, Some("mm2")).to_string(), "0.25 mm2");
        assert_eq!(NumberAndUnit::unitless(2.0).to_string(), "2");
    }

    #[test]
    fn test_add_adopts_unit() {
        let a = NumberAndUnit::unitless(1.0);
        let b = NumberAndUnit::new(2.0, Some("m"));
        let sum = a.try_add(&b).unwrap();
        assert_eq!(sum, NumberAndUnit::new(3.0, Some("m")));
    }

    #[test]
    fn test_add_unit_mismatch() {
        let a = NumberAndUnit::new(1.0, Some("m"));
        let b = NumberAndUnit::new(2.0, Some("ft"));
        assert!(matches!(
            a.try_add(&b),
            Err(HarnessError::UnitMismatch { .. })
        ));
    }

    #[test]
    fn test_mul_resolves_unit() {
        let qty = NumberAndUnit::unitless(2.0);
        let length = NumberAndUnit::new(0.5, Some("m"));
        assert_eq!(qty.try_mul(&length).unwrap(), NumberAndUnit::new(1.0, Some("m")));
    }

    #[test]
    fn test_parse_with_default_unit() {
        let n = NumberAndUnit::from_input(&QuantityInput::Number(0.5), Some("mm2")).unwrap();
        assert_eq!(n.unit.as_deref(), Some("mm2"));

        let n = NumberAndUnit::parse("24 AWG", Some("mm2")).unwrap();
        assert_eq!(n.number, 24.0);
        assert_eq!(n.unit.as_deref(), Some("AWG"));

        assert!(NumberAndUnit::parse("many", None).is_err());
    }
}
