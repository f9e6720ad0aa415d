//! Evolution records: weekly routines, their exercises and sets, and
//! progress photos.

use super::{Record, RecordId, UserId};
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Weekday an evolution exercise is scheduled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];
}

impl From<Weekday> for DayOfWeek {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

/// Collection root: one named routine week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionWeek {
    pub id: RecordId,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Display position among the user's weeks, ascending.
    #[serde(default)]
    pub order_index: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionExercise {
    pub id: RecordId,
    pub user_id: UserId,
    pub evolution_week_id: RecordId,
    pub day_of_week: DayOfWeek,
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionExerciseSet {
    pub id: RecordId,
    pub user_id: UserId,
    pub evolution_exercise_id: RecordId,
    pub set_number: u32,
    pub reps: u32,
    pub weight: f64,
    pub created_at: i64,
}

/// Progress photo. `url` points at already-uploaded media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionPhoto {
    pub id: RecordId,
    pub user_id: UserId,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    pub date: NaiveDate,
    pub created_at: i64,
}

impl Record for EvolutionWeek {
    fn id(&self) -> RecordId {
        self.id
    }

    fn parent_id(&self) -> Option<RecordId> {
        None
    }
}

impl Record for EvolutionExercise {
    fn id(&self) -> RecordId {
        self.id
    }

    fn parent_id(&self) -> Option<RecordId> {
        Some(self.evolution_week_id)
    }
}

impl Record for EvolutionExerciseSet {
    fn id(&self) -> RecordId {
        self.id
    }

    fn parent_id(&self) -> Option<RecordId> {
        Some(self.evolution_exercise_id)
    }
}

impl Record for EvolutionPhoto {
    fn id(&self) -> RecordId {
        self.id
    }

    fn parent_id(&self) -> Option<RecordId> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvolutionWeekDraft {
    pub name: String,
    pub description: Option<String>,
    pub order_index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvolutionExerciseDraft {
    pub day_of_week: DayOfWeek,
    pub name: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionSetDraft {
    pub set_number: u32,
    pub reps: u32,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoDraft {
    pub url: String,
    pub description: Option<String>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvolutionWeekPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i64>,
}

impl EvolutionWeekPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.order_index.is_none()
    }

    pub(crate) fn apply_to(&self, week: &mut EvolutionWeek) {
        if let Some(name) = &self.name {
            week.name = name.clone();
        }
        if let Some(description) = &self.description {
            week.description = description.clone();
        }
        if let Some(order_index) = self.order_index {
            week.order_index = order_index;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvolutionExercisePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<DayOfWeek>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl EvolutionExercisePatch {
    pub fn is_empty(&self) -> bool {
        self.day_of_week.is_none() && self.name.is_none() && self.notes.is_none()
    }

    pub(crate) fn apply_to(&self, exercise: &mut EvolutionExercise) {
        if let Some(day) = self.day_of_week {
            exercise.day_of_week = day;
        }
        if let Some(name) = &self.name {
            exercise.name = name.clone();
        }
        if let Some(notes) = &self.notes {
            exercise.notes = notes.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvolutionSetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl EvolutionSetPatch {
    pub fn is_empty(&self) -> bool {
        self.set_number.is_none() && self.reps.is_none() && self.weight.is_none()
    }

    pub(crate) fn apply_to(&self, set: &mut EvolutionExerciseSet) {
        if let Some(set_number) = self.set_number {
            set.set_number = set_number;
        }
        if let Some(reps) = self.reps {
            set.reps = reps;
        }
        if let Some(weight) = self.weight {
            set.weight = weight;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionWeekTree {
    pub week: EvolutionWeek,
    #[serde(default)]
    pub exercises: Vec<EvolutionExerciseTree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionExerciseTree {
    pub exercise: EvolutionExercise,
    #[serde(default)]
    pub sets: Vec<EvolutionExerciseSet>,
}
