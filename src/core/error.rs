use thiserror::Error;

use super::proration::{MAX_MODEL_YEAR, MIN_MODEL_YEAR};
use super::types::ScenarioKey;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Invalid snapshot JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Scenario {0:?} has no years")]
    MissingYears(ScenarioKey),

    #[error(
        "Scenario {key:?} year {year} is outside {min}-{max}",
        min = MIN_MODEL_YEAR,
        max = MAX_MODEL_YEAR
    )]
    YearOutOfRange { key: ScenarioKey, year: i32 },

    #[error("Scenario {key:?} lists year {year} more than once")]
    DuplicateYear { key: ScenarioKey, year: i32 },
}
