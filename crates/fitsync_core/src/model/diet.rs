//! Diet records: planned meals with substitutions, and the daily diary.
//!
//! # Invariants
//! - `Meal` and `DiaryEntry` are owned directly by the user (no root).
//! - At most one `DiaryEntry` exists per (user, date).

use super::{Record, RecordId, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of boolean goals tracked per diary entry.
pub const TRACKED_GOALS: u32 = 4;

/// Meal slot within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    PreWorkout,
    Lunch,
    AfternoonSnack,
    Dinner,
}

impl MealType {
    /// All meal slots in day order.
    pub const ALL: [MealType; 5] = [
        MealType::Breakfast,
        MealType::PreWorkout,
        MealType::Lunch,
        MealType::AfternoonSnack,
        MealType::Dinner,
    ];
}

/// One planned food item in a meal slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub id: RecordId,
    pub user_id: UserId,
    pub meal_type: MealType,
    pub food_name: String,
    /// Free-form amount, e.g. "150g" or "2 slices".
    pub quantity: String,
    /// Optional planned time of day, free-form.
    #[serde(default)]
    pub time: Option<String>,
    pub created_at: i64,
}

/// Alternative food allowed in place of a planned meal item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodSubstitution {
    pub id: RecordId,
    pub user_id: UserId,
    pub meal_id: RecordId,
    pub substitute_name: String,
    pub quantity: String,
    pub created_at: i64,
}

/// One day of goal adherence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: RecordId,
    pub user_id: UserId,
    pub date: NaiveDate,
    #[serde(default)]
    pub diary_text: Option<String>,
    #[serde(default)]
    pub free_meal: bool,
    #[serde(default)]
    pub free_meal_description: Option<String>,
    #[serde(default)]
    pub water_goal: bool,
    #[serde(default)]
    pub workout_done: bool,
    #[serde(default)]
    pub cardio_done: bool,
    #[serde(default)]
    pub diet_followed: bool,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: i64,
}

impl DiaryEntry {
    /// Number of tracked goals marked done, out of [`TRACKED_GOALS`].
    pub fn goals_completed(&self) -> u32 {
        [
            self.water_goal,
            self.workout_done,
            self.cardio_done,
            self.diet_followed,
        ]
        .into_iter()
        .filter(|done| *done)
        .count() as u32
    }
}

impl Record for Meal {
    fn id(&self) -> RecordId {
        self.id
    }

    fn parent_id(&self) -> Option<RecordId> {
        None
    }
}

impl Record for FoodSubstitution {
    fn id(&self) -> RecordId {
        self.id
    }

    fn parent_id(&self) -> Option<RecordId> {
        Some(self.meal_id)
    }
}

impl Record for DiaryEntry {
    fn id(&self) -> RecordId {
        self.id
    }

    fn parent_id(&self) -> Option<RecordId> {
        None
    }
}

/// Insert payload for a meal item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealDraft {
    pub meal_type: MealType,
    pub food_name: String,
    pub quantity: String,
    pub time: Option<String>,
}

/// Insert payload for a substitution (parent meal passed separately).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstitutionDraft {
    pub substitute_name: String,
    pub quantity: String,
}

/// Insert payload for a diary entry (date passed separately).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiaryDraft {
    pub diary_text: Option<String>,
    pub free_meal: bool,
    pub free_meal_description: Option<String>,
    pub water_goal: bool,
    pub workout_done: bool,
    pub cardio_done: bool,
    pub diet_followed: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MealPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<Option<String>>,
}

impl MealPatch {
    pub fn is_empty(&self) -> bool {
        self.meal_type.is_none()
            && self.food_name.is_none()
            && self.quantity.is_none()
            && self.time.is_none()
    }

    pub(crate) fn apply_to(&self, meal: &mut Meal) {
        if let Some(meal_type) = self.meal_type {
            meal.meal_type = meal_type;
        }
        if let Some(food_name) = &self.food_name {
            meal.food_name = food_name.clone();
        }
        if let Some(quantity) = &self.quantity {
            meal.quantity = quantity.clone();
        }
        if let Some(time) = &self.time {
            meal.time = time.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubstitutionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitute_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
}

impl SubstitutionPatch {
    pub fn is_empty(&self) -> bool {
        self.substitute_name.is_none() && self.quantity.is_none()
    }

    pub(crate) fn apply_to(&self, substitution: &mut FoodSubstitution) {
        if let Some(name) = &self.substitute_name {
            substitution.substitute_name = name.clone();
        }
        if let Some(quantity) = &self.quantity {
            substitution.quantity = quantity.clone();
        }
    }
}

/// Partial update for a diary entry. Moving an entry to another date is
/// allowed as long as that date is free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiaryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diary_text: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_meal: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_meal_description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_goal: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout_done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardio_done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diet_followed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl DiaryPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.diary_text.is_none()
            && self.free_meal.is_none()
            && self.free_meal_description.is_none()
            && self.water_goal.is_none()
            && self.workout_done.is_none()
            && self.cardio_done.is_none()
            && self.diet_followed.is_none()
            && self.notes.is_none()
    }

    pub(crate) fn apply_to(&self, entry: &mut DiaryEntry) {
        if let Some(date) = self.date {
            entry.date = date;
        }
        if let Some(diary_text) = &self.diary_text {
            entry.diary_text = diary_text.clone();
        }
        if let Some(free_meal) = self.free_meal {
            entry.free_meal = free_meal;
        }
        if let Some(description) = &self.free_meal_description {
            entry.free_meal_description = description.clone();
        }
        if let Some(water_goal) = self.water_goal {
            entry.water_goal = water_goal;
        }
        if let Some(workout_done) = self.workout_done {
            entry.workout_done = workout_done;
        }
        if let Some(cardio_done) = self.cardio_done {
            entry.cardio_done = cardio_done;
        }
        if let Some(diet_followed) = self.diet_followed {
            entry.diet_followed = diet_followed;
        }
        if let Some(notes) = &self.notes {
            entry.notes = notes.clone();
        }
    }
}

/// Nested view of one meal item with its substitutions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealTree {
    pub meal: Meal,
    #[serde(default)]
    pub substitutions: Vec<FoodSubstitution>,
}

/// Qualitative band for a weekly adherence percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdherenceBand {
    /// 90% and above.
    Excellent,
    /// 80–89%.
    VeryGood,
    /// 60–79%.
    Good,
    /// 40–59%.
    KeepTrying,
    /// Below 40%.
    NeedsWork,
}

impl AdherenceBand {
    pub fn from_percent(percent: u32) -> Self {
        match percent {
            90.. => Self::Excellent,
            80..=89 => Self::VeryGood,
            60..=79 => Self::Good,
            40..=59 => Self::KeepTrying,
            _ => Self::NeedsWork,
        }
    }
}
