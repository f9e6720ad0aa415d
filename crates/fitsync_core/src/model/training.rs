//! Training-week records: weeks, days, exercises, logged sets, cardio.
//!
//! Hierarchy: `Week` → `Day` → (`Exercise` → `ExerciseSet`, `Cardio`).

use super::{Record, RecordId, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Collection root for one training week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Week {
    pub id: RecordId,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Unix epoch milliseconds, assigned by the store.
    pub created_at: i64,
}

/// One dated training day inside a week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub id: RecordId,
    pub user_id: UserId,
    pub week_id: RecordId,
    pub date: NaiveDate,
    /// Free-form label such as "Monday" or "Leg day".
    pub day_name: String,
    pub created_at: i64,
}

/// One exercise prescribed on a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: RecordId,
    pub user_id: UserId,
    pub day_id: RecordId,
    /// Optional reference into an external exercise catalog.
    #[serde(default)]
    pub exercise_ref: Option<String>,
    pub name: String,
    pub muscle_group: String,
    /// Prescribed set count.
    #[serde(default)]
    pub sets: Option<u32>,
    /// Prescribed repetitions per set.
    #[serde(default)]
    pub reps: Option<u32>,
    /// Prescribed load in kilograms.
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: i64,
}

/// One performed set of an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
    pub id: RecordId,
    pub user_id: UserId,
    pub exercise_id: RecordId,
    pub set_number: u32,
    pub reps: u32,
    pub weight: f64,
    pub created_at: i64,
}

/// Cardio machine/activity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardioKind {
    Treadmill,
    Stairs,
    Bike,
    Elliptical,
}

/// One cardio block logged on a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cardio {
    pub id: RecordId,
    pub user_id: UserId,
    pub day_id: RecordId,
    pub cardio_type: CardioKind,
    pub duration_minutes: u32,
    pub created_at: i64,
}

impl Record for Week {
    fn id(&self) -> RecordId {
        self.id
    }

    fn parent_id(&self) -> Option<RecordId> {
        None
    }
}

impl Record for Day {
    fn id(&self) -> RecordId {
        self.id
    }

    fn parent_id(&self) -> Option<RecordId> {
        Some(self.week_id)
    }
}

impl Record for Exercise {
    fn id(&self) -> RecordId {
        self.id
    }

    fn parent_id(&self) -> Option<RecordId> {
        Some(self.day_id)
    }
}

impl Record for ExerciseSet {
    fn id(&self) -> RecordId {
        self.id
    }

    fn parent_id(&self) -> Option<RecordId> {
        Some(self.exercise_id)
    }
}

impl Record for Cardio {
    fn id(&self) -> RecordId {
        self.id
    }

    fn parent_id(&self) -> Option<RecordId> {
        Some(self.day_id)
    }
}

/// Insert payload for a week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekDraft {
    pub name: String,
    pub description: Option<String>,
}

/// Insert payload for a day (parent week passed separately).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayDraft {
    pub date: NaiveDate,
    pub day_name: String,
}

/// Insert payload for an exercise (parent day passed separately).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExerciseDraft {
    pub exercise_ref: Option<String>,
    pub name: String,
    pub muscle_group: String,
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub notes: Option<String>,
}

/// Insert payload for a logged set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseSetDraft {
    pub set_number: u32,
    pub reps: u32,
    pub weight: f64,
}

/// Insert payload for a cardio block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardioDraft {
    pub cardio_type: CardioKind,
    pub duration_minutes: u32,
}

/// Partial update for a week. `None` leaves a field untouched;
/// `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeekPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

impl WeekPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    pub(crate) fn apply_to(&self, week: &mut Week) {
        if let Some(name) = &self.name {
            week.name = name.clone();
        }
        if let Some(description) = &self.description {
            week.description = description.clone();
        }
    }
}

/// Partial update for a day. The parent week cannot change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DayPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_name: Option<String>,
}

impl DayPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.day_name.is_none()
    }

    pub(crate) fn apply_to(&self, day: &mut Day) {
        if let Some(date) = self.date {
            day.date = date;
        }
        if let Some(day_name) = &self.day_name {
            day.day_name = day_name.clone();
        }
    }
}

/// Partial update for an exercise. The parent day cannot change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExercisePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_ref: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muscle_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sets: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl ExercisePatch {
    pub fn is_empty(&self) -> bool {
        self.exercise_ref.is_none()
            && self.name.is_none()
            && self.muscle_group.is_none()
            && self.sets.is_none()
            && self.reps.is_none()
            && self.weight.is_none()
            && self.notes.is_none()
    }

    pub(crate) fn apply_to(&self, exercise: &mut Exercise) {
        if let Some(exercise_ref) = &self.exercise_ref {
            exercise.exercise_ref = exercise_ref.clone();
        }
        if let Some(name) = &self.name {
            exercise.name = name.clone();
        }
        if let Some(muscle_group) = &self.muscle_group {
            exercise.muscle_group = muscle_group.clone();
        }
        if let Some(sets) = self.sets {
            exercise.sets = sets;
        }
        if let Some(reps) = self.reps {
            exercise.reps = reps;
        }
        if let Some(weight) = self.weight {
            exercise.weight = weight;
        }
        if let Some(notes) = &self.notes {
            exercise.notes = notes.clone();
        }
    }
}

/// Partial update for a logged set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExerciseSetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl ExerciseSetPatch {
    pub fn is_empty(&self) -> bool {
        self.set_number.is_none() && self.reps.is_none() && self.weight.is_none()
    }

    pub(crate) fn apply_to(&self, set: &mut ExerciseSet) {
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

/// Partial update for a cardio block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CardioPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardio_type: Option<CardioKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

impl CardioPatch {
    pub fn is_empty(&self) -> bool {
        self.cardio_type.is_none() && self.duration_minutes.is_none()
    }

    pub(crate) fn apply_to(&self, cardio: &mut Cardio) {
        if let Some(kind) = self.cardio_type {
            cardio.cardio_type = kind;
        }
        if let Some(minutes) = self.duration_minutes {
            cardio.duration_minutes = minutes;
        }
    }
}

/// Nested view of one week, as published to callers and written to cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekTree {
    pub week: Week,
    #[serde(default)]
    pub days: Vec<DayTree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayTree {
    pub day: Day,
    #[serde(default)]
    pub exercises: Vec<ExerciseTree>,
    #[serde(default)]
    pub cardio: Vec<Cardio>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseTree {
    pub exercise: Exercise,
    #[serde(default)]
    pub sets: Vec<ExerciseSet>,
}
