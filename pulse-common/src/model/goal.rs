use crate::model::Id;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Date;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct GoalMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalCategory {
    Weekly,
    LongTerm,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalMetric {
    Workouts,
    ActiveMinutes,
    CaloriesBurned,
    Steps,
    DistanceKm,
    WeightKg,
    ProteinG,
    WaterL,
}

impl GoalMetric {
    pub const ALL: [GoalMetric; 8] = [
        GoalMetric::Workouts,
        GoalMetric::ActiveMinutes,
        GoalMetric::CaloriesBurned,
        GoalMetric::Steps,
        GoalMetric::DistanceKm,
        GoalMetric::WeightKg,
        GoalMetric::ProteinG,
        GoalMetric::WaterL,
    ];

    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            GoalMetric::Workouts => "sessions",
            GoalMetric::ActiveMinutes => "min",
            GoalMetric::CaloriesBurned => "kcal",
            GoalMetric::Steps => "steps",
            GoalMetric::DistanceKm => "km",
            GoalMetric::WeightKg => "kg",
            GoalMetric::ProteinG => "g",
            GoalMetric::WaterL => "L",
        }
    }
}

#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Goal {
    pub id: Id<GoalMarker>,
    pub category: GoalCategory,
    pub metric: GoalMetric,
    pub current: f64,
    pub target: f64,
    pub end_date: Option<Date>,
}

#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct CreateGoal {
    pub category: GoalCategory,
    pub metric: GoalMetric,
    pub target: f64,
    pub end_date: Option<Date>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum InvalidGoalError {
    #[error("Goal target must be a positive finite number, got {0}")]
    Target(String),
    #[error("Goal progress must be a non-negative finite number, got {0}")]
    Current(String),
}

pub fn validate_target(target: f64) -> Result<f64, InvalidGoalError> {
    if target.is_finite() && target > 0.0 {
        Ok(target)
    } else {
        Err(InvalidGoalError::Target(target.to_string()))
    }
}

pub fn validate_current(current: f64) -> Result<f64, InvalidGoalError> {
    if current.is_finite() && current >= 0.0 {
        Ok(current)
    } else {
        Err(InvalidGoalError::Current(current.to_string()))
    }
}

impl Goal {
    /// Progress towards the target in percent, clamped to `[0, 100]`.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.target <= 0.0 {
            return 0.0;
        }
        (self.current / self.target * 100.0).clamp(0.0, 100.0)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.target > 0.0 && self.current >= self.target
    }

    #[must_use]
    pub fn is_overdue(&self, today: Date) -> bool {
        self.end_date.is_some_and(|end| end < today) && !self.is_complete()
    }
}
