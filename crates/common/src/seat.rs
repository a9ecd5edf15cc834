use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque label of a seat within one showing, e.g. `"A1"`.
///
/// Labels carry no structure: two seats are the same seat iff their labels
/// are equal byte for byte. The text is kept as given; only blank labels are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatLabel(String);

/// Returned when a seat label is empty or whitespace only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("seat label must not be blank")]
pub struct InvalidSeatLabel;

impl SeatLabel {
    pub fn new(label: impl Into<String>) -> Result<Self, InvalidSeatLabel> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(InvalidSeatLabel);
        }
        Ok(Self(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SeatLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SeatLabel {
    type Error = InvalidSeatLabel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for SeatLabel {
    type Error = InvalidSeatLabel;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SeatLabel> for String {
    fn from(label: SeatLabel) -> Self {
        label.0
    }
}
