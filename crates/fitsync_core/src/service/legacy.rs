//! Decoding of pre-sync local data and its conversion into migration plans.
//!
//! Older clients stored camelCase JSON lists with string or numeric ids and
//! ISO timestamps. Decoding is lenient about optional fields and strict
//! about anything a row cannot be built without.

use crate::model::evolution::{
    DayOfWeek, EvolutionExerciseDraft, EvolutionSetDraft, EvolutionWeekDraft, PhotoDraft,
};
use crate::model::ids::derived_record_id;
use crate::model::training::{
    CardioDraft, CardioKind, DayDraft, ExerciseDraft, ExerciseSetDraft, WeekDraft,
};
use crate::model::{
    legacy_record_id, normalize_calendar_date, normalize_optional_text, normalize_required_text,
    RecordId, UserId,
};
use crate::repo::remote_store::Table;
use crate::sync::migration::{MigrationError, MigrationPlan};
use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Name of the routine week legacy evolution exercises are imported into.
pub(crate) const IMPORTED_ROUTINE_NAME: &str = "Imported routine";

/// Legacy identifier: older clients used timestamps, newer ones UUIDs.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LegacyId {
    Text(String),
    Number(i64),
}

impl LegacyId {
    fn record_id(&self) -> RecordId {
        match self {
            Self::Text(value) => legacy_record_id(value),
            Self::Number(value) => legacy_record_id(&value.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyWeek {
    id: LegacyId,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    days: Vec<LegacyDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDay {
    id: LegacyId,
    date: String,
    day_name: String,
    #[serde(default)]
    exercises: Vec<LegacyExercise>,
    #[serde(default)]
    cardio: Vec<LegacyCardio>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyExercise {
    id: LegacyId,
    #[serde(default)]
    exercise_id: Option<String>,
    exercise_name: String,
    #[serde(default)]
    muscle_group: String,
    #[serde(default)]
    sets: Option<LegacySets>,
    #[serde(default)]
    reps: Option<u32>,
    #[serde(default)]
    weight: Option<f64>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

/// Exercises stored either a prescribed set count or the logged sets.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacySets {
    Count(u32),
    Logged(Vec<LegacySet>),
}

#[derive(Debug, Deserialize)]
struct LegacySet {
    #[serde(default)]
    id: Option<LegacyId>,
    set_number: u32,
    reps: u32,
    #[serde(default)]
    weight: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyCardio {
    id: LegacyId,
    cardio_type: String,
    duration_minutes: u32,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyEvolutionExercise {
    id: LegacyId,
    name: String,
    #[serde(default)]
    sets: u32,
    #[serde(default)]
    reps: u32,
    #[serde(default)]
    notes: Option<String>,
    day_of_week: DayOfWeek,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPhoto {
    id: LegacyId,
    url: String,
    #[serde(default)]
    description: Option<String>,
    date: String,
    #[serde(default)]
    created_at: Option<String>,
}

/// Builds the upsert plan for a legacy `workout-weeks` blob.
///
/// Returns `Ok(None)` when the blob holds no weeks.
pub(crate) fn plan_training_weeks(raw: &str) -> Result<Option<MigrationPlan>, MigrationError> {
    let weeks: Vec<LegacyWeek> = decode_list(raw, "workout weeks")?;
    if weeks.is_empty() {
        return Ok(None);
    }

    let mut plan = MigrationPlan::new();
    for week in &weeks {
        let week_id = week.id.record_id();
        let name = normalize_required_text(&week.name)
            .ok_or_else(|| invalid(format!("week {week_id} has no name")))?;
        let draft = WeekDraft {
            name,
            description: normalize_optional_text(week.description.as_deref()),
        };
        plan.push(
            Table::Weeks,
            week_id,
            None,
            parse_timestamp(week.created_at.as_deref()),
            &draft,
        )?;

        for day in &week.days {
            push_training_day(&mut plan, week_id, day)?;
        }
    }
    Ok(Some(plan))
}

fn push_training_day(
    plan: &mut MigrationPlan,
    week_id: RecordId,
    day: &LegacyDay,
) -> Result<(), MigrationError> {
    let day_id = day.id.record_id();
    let date = normalize_calendar_date(&day.date)
        .ok_or_else(|| invalid(format!("day {day_id} has an unreadable date")))?;
    let draft = DayDraft {
        date,
        day_name: day.day_name.trim().to_string(),
    };
    plan.push(Table::Days, day_id, Some(week_id), None, &draft)?;

    for exercise in &day.exercises {
        let exercise_id = exercise.id.record_id();
        let (set_count, logged): (Option<u32>, &[LegacySet]) = match &exercise.sets {
            Some(LegacySets::Count(count)) => (Some(*count), &[]),
            Some(LegacySets::Logged(sets)) => (None, sets.as_slice()),
            None => (None, &[]),
        };
        let draft = ExerciseDraft {
            exercise_ref: exercise
                .exercise_id
                .as_deref()
                .and_then(normalize_required_text),
            name: exercise.exercise_name.trim().to_string(),
            muscle_group: exercise.muscle_group.trim().to_string(),
            sets: set_count,
            reps: exercise.reps,
            weight: exercise.weight,
            notes: normalize_optional_text(exercise.notes.as_deref()),
        };
        plan.push(
            Table::Exercises,
            exercise_id,
            Some(day_id),
            parse_timestamp(exercise.created_at.as_deref()),
            &draft,
        )?;

        for set in logged {
            let set_id = match &set.id {
                Some(id) => id.record_id(),
                None => derived_record_id(exercise_id, &format!("set-{}", set.set_number)),
            };
            let draft = ExerciseSetDraft {
                set_number: set.set_number,
                reps: set.reps,
                weight: set.weight,
            };
            plan.push(Table::ExerciseSets, set_id, Some(exercise_id), None, &draft)?;
        }
    }

    for cardio in &day.cardio {
        let cardio_id = cardio.id.record_id();
        let kind = parse_cardio_kind(&cardio.cardio_type).ok_or_else(|| {
            invalid(format!("cardio {cardio_id} has an unknown type"))
        })?;
        let draft = CardioDraft {
            cardio_type: kind,
            duration_minutes: cardio.duration_minutes,
        };
        plan.push(
            Table::Cardio,
            cardio_id,
            Some(day_id),
            parse_timestamp(cardio.created_at.as_deref()),
            &draft,
        )?;
    }
    Ok(())
}

/// Builds the upsert plan for legacy evolution exercise and photo blobs.
///
/// Exercises land under one deterministic "Imported routine" week and each
/// prescribed set becomes a set leaf. Returns `Ok(None)` when both lists are
/// absent or empty.
pub(crate) fn plan_evolution(
    user_id: UserId,
    exercises_raw: Option<&str>,
    photos_raw: Option<&str>,
) -> Result<Option<MigrationPlan>, MigrationError> {
    let exercises: Vec<LegacyEvolutionExercise> = match exercises_raw {
        Some(raw) => decode_list(raw, "evolution exercises")?,
        None => Vec::new(),
    };
    let photos: Vec<LegacyPhoto> = match photos_raw {
        Some(raw) => decode_list(raw, "evolution photos")?,
        None => Vec::new(),
    };
    if exercises.is_empty() && photos.is_empty() {
        return Ok(None);
    }

    let mut plan = MigrationPlan::new();
    if !exercises.is_empty() {
        let week_id = imported_routine_id(user_id);
        let week = EvolutionWeekDraft {
            name: IMPORTED_ROUTINE_NAME.to_string(),
            description: None,
            order_index: 0,
        };
        plan.push(Table::EvolutionWeeks, week_id, None, None, &week)?;

        for exercise in &exercises {
            let exercise_id = exercise.id.record_id();
            let name = normalize_required_text(&exercise.name)
                .ok_or_else(|| invalid(format!("exercise {exercise_id} has no name")))?;
            let draft = EvolutionExerciseDraft {
                day_of_week: exercise.day_of_week,
                name,
                notes: normalize_optional_text(exercise.notes.as_deref()),
            };
            plan.push(
                Table::EvolutionExercises,
                exercise_id,
                Some(week_id),
                parse_timestamp(exercise.created_at.as_deref()),
                &draft,
            )?;

            for set_number in 1..=exercise.sets {
                let draft = EvolutionSetDraft {
                    set_number,
                    reps: exercise.reps,
                    weight: 0.0,
                };
                plan.push(
                    Table::EvolutionExerciseSets,
                    derived_record_id(exercise_id, &format!("set-{set_number}")),
                    Some(exercise_id),
                    None,
                    &draft,
                )?;
            }
        }
    }

    for photo in &photos {
        let photo_id = photo.id.record_id();
        let date = normalize_calendar_date(&photo.date)
            .ok_or_else(|| invalid(format!("photo {photo_id} has an unreadable date")))?;
        let draft = PhotoDraft {
            url: photo.url.trim().to_string(),
            description: normalize_optional_text(photo.description.as_deref()),
            date,
        };
        plan.push(
            Table::EvolutionPhotos,
            photo_id,
            None,
            parse_timestamp(photo.created_at.as_deref()),
            &draft,
        )?;
    }
    Ok(Some(plan))
}

/// Stable id of the week legacy evolution exercises are imported into.
pub(crate) fn imported_routine_id(user_id: UserId) -> RecordId {
    derived_record_id(user_id, "imported-routine")
}

fn decode_list<T: DeserializeOwned>(raw: &str, what: &str) -> Result<Vec<T>, MigrationError> {
    serde_json::from_str(raw).map_err(|err| invalid(format!("{what}: {err}")))
}

fn invalid(message: String) -> MigrationError {
    MigrationError::InvalidLegacyData(message)
}

/// Accepts RFC 3339 timestamps and plain epoch milliseconds.
fn parse_timestamp(value: Option<&str>) -> Option<i64> {
    let value = value?.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.timestamp_millis());
    }
    value.parse::<i64>().ok()
}

fn parse_cardio_kind(value: &str) -> Option<CardioKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "treadmill" | "esteira" => Some(CardioKind::Treadmill),
        "stairs" | "escada" => Some(CardioKind::Stairs),
        "bike" => Some(CardioKind::Bike),
        "elliptical" | "eliptico" => Some(CardioKind::Elliptical),
        _ => None,
    }
}
