//! Wizard steps and their persisted integer codes

use serde::{Deserialize, Serialize};

/// Position inside the `start` flow.
///
/// Persisted as an integer. Codes 0..=5 are the main fields; the choice
/// prompts between them have codes 6..=9. Codes are never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Step {
    #[default]
    Departure,
    Arrival,
    Passengers,
    Compartments,
    ShelfSplit,
    TrackPrice,
    DepartureDate,
    CarriageType,
    ShelfType,
    SuggestSimilar,
}

impl Step {
    pub const ALL: [Step; 10] = [
        Step::Departure,
        Step::Arrival,
        Step::Passengers,
        Step::Compartments,
        Step::ShelfSplit,
        Step::TrackPrice,
        Step::DepartureDate,
        Step::CarriageType,
        Step::ShelfType,
        Step::SuggestSimilar,
    ];

    pub fn code(self) -> u8 {
        match self {
            Step::Departure => 0,
            Step::Arrival => 1,
            Step::Passengers => 2,
            Step::Compartments => 3,
            Step::ShelfSplit => 4,
            Step::TrackPrice => 5,
            Step::DepartureDate => 6,
            Step::CarriageType => 7,
            Step::ShelfType => 8,
            Step::SuggestSimilar => 9,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::Departure => "departure",
            Step::Arrival => "arrival",
            Step::Passengers => "passengers",
            Step::Compartments => "compartments",
            Step::ShelfSplit => "shelf-split",
            Step::TrackPrice => "track-price",
            Step::DepartureDate => "departure-date",
            Step::CarriageType => "carriage-type",
            Step::ShelfType => "shelf-type",
            Step::SuggestSimilar => "suggest-similar",
        }
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> Self {
        step.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Unknown wizard step code {0}")]
pub struct UnknownStep(pub u8);

impl TryFrom<u8> for Step {
    type Error = UnknownStep;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Step::from_code(code).ok_or(UnknownStep(code))
    }
}
