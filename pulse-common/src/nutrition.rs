//! Calorie and macro targets, collected through a multi-step wizard.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_CARBS: f64 = 4.0;
pub const KCAL_PER_G_FAT: f64 = 9.0;

pub const FAT_SHARE_OF_CALORIES: f64 = 0.25;
pub const MIN_TARGET_CALORIES: u32 = 1200;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    #[must_use]
    pub fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightGoal {
    Lose,
    Maintain,
    Gain,
}

impl WeightGoal {
    #[must_use]
    pub fn calorie_adjustment(self) -> f64 {
        match self {
            WeightGoal::Lose => -500.0,
            WeightGoal::Maintain => 0.0,
            WeightGoal::Gain => 300.0,
        }
    }

    #[must_use]
    pub fn protein_per_kg(self) -> f64 {
        match self {
            WeightGoal::Maintain => 1.8,
            WeightGoal::Lose | WeightGoal::Gain => 2.0,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct BodyProfile {
    pub sex: Sex,
    pub age_years: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct MacroTargets {
    pub calories: u32,
    pub protein_g: u32,
    pub carbs_g: u32,
    pub fat_g: u32,
}

/// Mifflin-St Jeor basal metabolic rate in kcal/day.
#[must_use]
pub fn basal_metabolic_rate(profile: &BodyProfile) -> f64 {
    let base = 10.0 * profile.weight_kg + 6.25 * profile.height_cm
        - 5.0 * f64::from(profile.age_years);
    match profile.sex {
        Sex::Male => base + 5.0,
        Sex::Female => base - 161.0,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_to_u32(value: f64) -> u32 {
    value.max(0.0).round() as u32
}

#[must_use]
pub fn macro_targets(
    profile: &BodyProfile,
    activity: ActivityLevel,
    goal: WeightGoal,
) -> MacroTargets {
    let maintenance = basal_metabolic_rate(profile) * activity.multiplier();
    let calories = round_to_u32(maintenance + goal.calorie_adjustment()).max(MIN_TARGET_CALORIES);
    let calories_f = f64::from(calories);

    let protein_g = round_to_u32(profile.weight_kg * goal.protein_per_kg());
    let fat_g = round_to_u32(calories_f * FAT_SHARE_OF_CALORIES / KCAL_PER_G_FAT);
    let remaining = calories_f
        - f64::from(protein_g) * KCAL_PER_G_PROTEIN
        - f64::from(fat_g) * KCAL_PER_G_FAT;
    let carbs_g = round_to_u32(remaining / KCAL_PER_G_CARBS);

    MacroTargets {
        calories,
        protein_g,
        carbs_g,
        fat_g,
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum WizardError {
    #[error("Age must be between 13 and 100 years")]
    Age,
    #[error("Height must be between 100 and 250 cm")]
    Height,
    #[error("Weight must be between 30 and 300 kg")]
    Weight,
    #[error("The {0:?} step has not been completed")]
    Incomplete(WizardStep),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum WizardStep {
    Profile,
    Activity,
    Goal,
    Review,
}

/// Collects inputs one step at a time; each step validates before moving on.
#[derive(Clone, PartialEq, Debug)]
pub struct NutritionWizard {
    step: WizardStep,
    profile: Option<BodyProfile>,
    activity: Option<ActivityLevel>,
    goal: Option<WeightGoal>,
}

impl Default for NutritionWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl NutritionWizard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: WizardStep::Profile,
            profile: None,
            activity: None,
            goal: None,
        }
    }

    #[must_use]
    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn submit_profile(&mut self, profile: BodyProfile) -> Result<WizardStep, WizardError> {
        if !(13..=100).contains(&profile.age_years) {
            return Err(WizardError::Age);
        }
        if !(100.0..=250.0).contains(&profile.height_cm) {
            return Err(WizardError::Height);
        }
        if !(30.0..=300.0).contains(&profile.weight_kg) {
            return Err(WizardError::Weight);
        }
        self.profile = Some(profile);
        self.step = WizardStep::Activity;
        Ok(self.step)
    }

    pub fn submit_activity(&mut self, activity: ActivityLevel) -> Result<WizardStep, WizardError> {
        if self.profile.is_none() {
            return Err(WizardError::Incomplete(WizardStep::Profile));
        }
        self.activity = Some(activity);
        self.step = WizardStep::Goal;
        Ok(self.step)
    }

    pub fn submit_goal(&mut self, goal: WeightGoal) -> Result<WizardStep, WizardError> {
        if self.activity.is_none() {
            return Err(WizardError::Incomplete(WizardStep::Activity));
        }
        self.goal = Some(goal);
        self.step = WizardStep::Review;
        Ok(self.step)
    }

    /// Steps back without discarding what was entered.
    pub fn back(&mut self) -> WizardStep {
        self.step = match self.step {
            WizardStep::Profile | WizardStep::Activity => WizardStep::Profile,
            WizardStep::Goal => WizardStep::Activity,
            WizardStep::Review => WizardStep::Goal,
        };
        self.step
    }

    pub fn targets(&self) -> Result<MacroTargets, WizardError> {
        let profile = self
            .profile
            .ok_or(WizardError::Incomplete(WizardStep::Profile))?;
        let activity = self
            .activity
            .ok_or(WizardError::Incomplete(WizardStep::Activity))?;
        let goal = self.goal.ok_or(WizardError::Incomplete(WizardStep::Goal))?;
        Ok(macro_targets(&profile, activity, goal))
    }
}
