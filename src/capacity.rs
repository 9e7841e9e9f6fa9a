//! Capacity Value Parser
//!
//! A queue's share of its parent is written in one of three modes:
//!
//! - percentage: `40`, `40%`
//! - weight:     `2w`
//! - absolute:   `[memory=4096,vcores=2w,gpu=50%]`, where every resource carries
//!   its own mode (literal quantity, weight, or percentage of the parent's share
//!   of that resource)
//!
//! Parsed values keep their source text so untouched values are written back
//! byte-for-byte.

use crate::error::CapacityParseError;
use crate::types::Severity;
use serde::Serialize;
use std::fmt;

/// Capacity mode of a whole value, or of one resource inside a vector
/// (`Absolute` then means a literal quantity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityMode {
    Percentage,
    Weight,
    Absolute,
}

impl fmt::Display for CapacityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityMode::Percentage => write!(f, "percentage"),
            CapacityMode::Weight => write!(f, "weight"),
            CapacityMode::Absolute => write!(f, "absolute"),
        }
    }
}

/// Amount of one resource inside an absolute vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", content = "amount", rename_all = "lowercase")]
pub enum ResourceAmount {
    Quantity(f64),
    Percentage(f64),
    Weight(f64),
}

impl ResourceAmount {
    pub fn mode(&self) -> CapacityMode {
        match self {
            ResourceAmount::Quantity(_) => CapacityMode::Absolute,
            ResourceAmount::Percentage(_) => CapacityMode::Percentage,
            ResourceAmount::Weight(_) => CapacityMode::Weight,
        }
    }

    pub fn amount(&self) -> f64 {
        match self {
            ResourceAmount::Quantity(n)
            | ResourceAmount::Percentage(n)
            | ResourceAmount::Weight(n) => *n,
        }
    }

    fn parse(raw: &str) -> Result<Self, CapacityParseError> {
        if let Some(number) = raw.strip_suffix('%') {
            return parse_number(number).map(ResourceAmount::Percentage);
        }
        if let Some(number) = raw.strip_suffix('w') {
            return parse_number(number).map(ResourceAmount::Weight);
        }
        parse_number(raw).map(ResourceAmount::Quantity)
    }
}

impl fmt::Display for ResourceAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceAmount::Quantity(n) => write!(f, "{}", n),
            ResourceAmount::Percentage(n) => write!(f, "{}%", n),
            ResourceAmount::Weight(n) => write!(f, "{}w", n),
        }
    }
}

/// Ordered resource-name → amount map
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResourceVector {
    entries: Vec<(String, ResourceAmount)>,
}

impl ResourceVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource; fails if the name is already present.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        amount: ResourceAmount,
    ) -> Result<(), CapacityParseError> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(CapacityParseError::DuplicateResource(name));
        }
        self.entries.push((name, amount));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<ResourceAmount> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, amount)| *amount)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ResourceAmount)> {
        self.entries.iter().map(|(n, a)| (n.as_str(), *a))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for ResourceVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (idx, (name, amount)) in self.entries.iter().enumerate() {
            if idx > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}={}", name, amount)?;
        }
        write!(f, "]")
    }
}

/// A capacity expression
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum CapacityValue {
    Percentage(f64),
    Weight(f64),
    Absolute(ResourceVector),
}

impl CapacityValue {
    pub fn mode(&self) -> CapacityMode {
        match self {
            CapacityValue::Percentage(_) => CapacityMode::Percentage,
            CapacityValue::Weight(_) => CapacityMode::Weight,
            CapacityValue::Absolute(_) => CapacityMode::Absolute,
        }
    }

    pub fn as_percentage(&self) -> Option<f64> {
        match self {
            CapacityValue::Percentage(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&ResourceVector> {
        match self {
            CapacityValue::Absolute(v) => Some(v),
            _ => None,
        }
    }
}

/// Canonical text. Percentages are written bare, the form the scheduler accepts.
impl fmt::Display for CapacityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityValue::Percentage(n) => write!(f, "{}", n),
            CapacityValue::Weight(n) => write!(f, "{}w", n),
            CapacityValue::Absolute(vector) => write!(f, "{}", vector),
        }
    }
}

/// Parse a capacity expression.
pub fn parse(raw: &str) -> Result<CapacityValue, CapacityParseError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(CapacityParseError::Empty);
    }

    if let Some(interior) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        return parse_vector(text, interior).map(CapacityValue::Absolute);
    }
    if let Some(number) = text.strip_suffix('%') {
        return parse_number(number).map(CapacityValue::Percentage);
    }
    if let Some(number) = text.strip_suffix('w') {
        return parse_number(number).map(CapacityValue::Weight);
    }
    match parse_number(text) {
        Ok(n) => Ok(CapacityValue::Percentage(n)),
        Err(_) => Err(CapacityParseError::Unrecognized(text.to_string())),
    }
}

/// Canonical text for a value; inverse of [`parse`].
pub fn format(value: &CapacityValue) -> String {
    value.to_string()
}

fn parse_vector(text: &str, interior: &str) -> Result<ResourceVector, CapacityParseError> {
    if interior.trim().is_empty() {
        return Err(CapacityParseError::EmptyVector(text.to_string()));
    }
    let mut vector = ResourceVector::new();
    for entry in interior.split(',') {
        let entry = entry.trim();
        let Some((name, value)) = entry.split_once('=') else {
            return Err(CapacityParseError::MalformedEntry(entry.to_string()));
        };
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() || value.is_empty() {
            return Err(CapacityParseError::MalformedEntry(entry.to_string()));
        }
        vector.push(name, ResourceAmount::parse(value)?)?;
    }
    Ok(vector)
}

fn parse_number(text: &str) -> Result<f64, CapacityParseError> {
    let text = text.trim();
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(CapacityParseError::InvalidNumber(text.to_string())),
    }
}

/// A parsed capacity together with the text it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Capacity {
    value: CapacityValue,
    raw: String,
}

impl Capacity {
    pub fn parse(raw: &str) -> Result<Self, CapacityParseError> {
        Ok(Self {
            value: parse(raw)?,
            raw: raw.to_string(),
        })
    }

    /// Wrap a value built in code; its text is the canonical form.
    pub fn from_value(value: CapacityValue) -> Self {
        let raw = format(&value);
        Self { value, raw }
    }

    pub fn value(&self) -> &CapacityValue {
        &self.value
    }

    pub fn mode(&self) -> CapacityMode {
        self.value.mode()
    }

    /// Source text when unmodified, canonical text otherwise.
    pub fn to_wire(&self) -> &str {
        &self.raw
    }

    pub fn set_value(&mut self, value: CapacityValue) {
        if value != self.value {
            self.raw = format(&value);
            self.value = value;
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A range or compatibility finding for one value
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityIssue {
    pub severity: Severity,
    pub message: String,
}

impl CapacityIssue {
    fn error(message: String) -> Self {
        Self {
            severity: Severity::Error,
            message,
        }
    }
}

/// Range and mode-compatibility checks for a single value.
///
/// `sibling_modes` are the modes of the other effective children of the same
/// parent. Mixed modes are legal; an absolute value next to percentage siblings
/// is flagged as a warning because those percentages then apply to what is left
/// after the absolute allocations.
pub fn validate(value: &CapacityValue, sibling_modes: &[CapacityMode]) -> Vec<CapacityIssue> {
    let mut issues = Vec::new();
    match value {
        CapacityValue::Percentage(p) => {
            if !(0.0..=100.0).contains(p) {
                issues.push(CapacityIssue::error(format!(
                    "percentage {} is outside 0-100",
                    p
                )));
            }
        }
        CapacityValue::Weight(w) => {
            if *w <= 0.0 {
                issues.push(CapacityIssue::error(format!(
                    "weight {} must be greater than 0",
                    w
                )));
            }
        }
        CapacityValue::Absolute(vector) => {
            for (name, amount) in vector.iter() {
                let bad = match amount {
                    ResourceAmount::Quantity(n) => (n < 0.0).then(|| "must not be negative"),
                    ResourceAmount::Percentage(n) => {
                        (!(0.0..=100.0).contains(&n)).then(|| "is outside 0-100")
                    }
                    ResourceAmount::Weight(n) => (n <= 0.0).then(|| "must be greater than 0"),
                };
                if let Some(reason) = bad {
                    issues.push(CapacityIssue::error(format!(
                        "resource {} amount {} {}",
                        name, amount, reason
                    )));
                }
            }
            if sibling_modes.contains(&CapacityMode::Percentage) {
                issues.push(CapacityIssue {
                    severity: Severity::Warning,
                    message: "absolute capacity alongside percentage siblings; percentages apply to the remainder".to_string(),
                });
            }
        }
    }
    issues
}
