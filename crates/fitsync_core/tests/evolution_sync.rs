mod common;

use chrono::NaiveDate;
use common::{Harness, StoreOp};
use fitsync_core::model::evolution::{
    DayOfWeek, EvolutionExerciseDraft, EvolutionSetDraft, EvolutionSetPatch, EvolutionWeekPatch,
    PhotoDraft,
};
use fitsync_core::repo::local_cache::{
    legacy_evolution_exercises_key, legacy_evolution_photos_key,
};
use fitsync_core::{legacy_record_id, EvolutionSync, LocalCache, Severity, SyncError, Table};
use serde_json::json;

fn exercise(day: DayOfWeek, name: &str) -> EvolutionExerciseDraft {
    EvolutionExerciseDraft {
        day_of_week: day,
        name: name.to_string(),
        notes: None,
    }
}

fn photo(day: u32) -> PhotoDraft {
    PhotoDraft {
        url: format!("https://media.example/progress-{day}.jpg"),
        description: None,
        date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
    }
}

fn ready_sync(harness: &Harness) -> EvolutionSync {
    let mut sync = EvolutionSync::new(harness.deps());
    sync.initialize().unwrap();
    harness.reset_observations();
    sync
}

fn seed_legacy(harness: &Harness) {
    let exercises = json!([
        {
            "id": "1714000000000",
            "name": "Pull-up",
            "sets": 3,
            "reps": 8,
            "dayOfWeek": "monday",
            "createdAt": "2024-04-25T10:00:00.000Z"
        },
        {
            "id": "1714000000001",
            "name": "Dip",
            "sets": 2,
            "reps": 12,
            "notes": "bodyweight",
            "dayOfWeek": "wednesday"
        }
    ]);
    let photos = json!([{
        "id": "1714000000002",
        "url": "https://media.example/before.jpg",
        "date": "2024-04-20",
        "description": "before"
    }]);
    harness
        .cache
        .set(
            &legacy_evolution_exercises_key(harness.user),
            &exercises.to_string(),
        )
        .unwrap();
    harness
        .cache
        .set(&legacy_evolution_photos_key(harness.user), &photos.to_string())
        .unwrap();
}

#[test]
fn new_weeks_are_appended_after_the_highest_order_index() {
    let harness = Harness::new();
    let mut sync = ready_sync(&harness);

    let first = sync.add_week("Push", None).unwrap();
    assert_eq!(first.order_index, 0);
    let second = sync.add_week("Pull", Some("  heavy  ")).unwrap();
    assert_eq!(second.order_index, 1);
    assert_eq!(second.description.as_deref(), Some("heavy"));

    sync.update_week(
        first.id,
        EvolutionWeekPatch {
            order_index: Some(7),
            ..EvolutionWeekPatch::default()
        },
    )
    .unwrap();
    let third = sync.add_week("Legs", None).unwrap();
    assert_eq!(third.order_index, 8);

    let names: Vec<_> = sync.weeks().iter().map(|week| week.name.clone()).collect();
    assert_eq!(names, vec!["Pull", "Push", "Legs"]);
}

#[test]
fn exercises_are_grouped_by_weekday() {
    let harness = Harness::new();
    let mut sync = ready_sync(&harness);
    let week = sync.add_week("Routine", None).unwrap();

    sync.add_exercise(week.id, exercise(DayOfWeek::Monday, "Bench"))
        .unwrap();
    sync.add_exercise(week.id, exercise(DayOfWeek::Friday, "Deadlift"))
        .unwrap();
    sync.add_exercise(week.id, exercise(DayOfWeek::Monday, "Row"))
        .unwrap();

    let monday: Vec<_> = sync
        .exercises_by_day(week.id, DayOfWeek::Monday)
        .iter()
        .map(|e| e.name.clone())
        .collect();
    assert_eq!(monday, vec!["Bench", "Row"]);
    assert!(sync.exercises_by_day(week.id, DayOfWeek::Sunday).is_empty());

    let err = sync
        .add_exercise(week.id, exercise(DayOfWeek::Monday, " "))
        .unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));
}

#[test]
fn photos_are_listed_newest_date_first() {
    let harness = Harness::new();
    let mut sync = ready_sync(&harness);

    let middle = sync.add_photo(photo(10)).unwrap();
    let newest = sync.add_photo(photo(20)).unwrap();
    let oldest = sync.add_photo(photo(1)).unwrap();

    let ids: Vec<_> = sync.photos().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);

    sync.delete_photo(middle.id).unwrap();
    let ids: Vec<_> = sync.photos().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![newest.id, oldest.id]);
}

#[test]
fn deleting_a_week_drops_its_exercises_and_sets() {
    let harness = Harness::new();
    let mut sync = ready_sync(&harness);
    let week = sync.add_week("Routine", None).unwrap();
    let keep = sync.add_week("Other", None).unwrap();
    let squat = sync
        .add_exercise(week.id, exercise(DayOfWeek::Tuesday, "Squat"))
        .unwrap();
    for set_number in 1..=3 {
        sync.add_exercise_set(
            squat.id,
            EvolutionSetDraft {
                set_number,
                reps: 5,
                weight: 120.0,
            },
        )
        .unwrap();
    }

    sync.delete_week(week.id).unwrap();

    assert!(sync.sets_for_exercise(squat.id).is_empty());
    assert_eq!(sync.tree().len(), 1);
    assert_eq!(sync.tree()[0].week.id, keep.id);
    let inner = harness.store.inner();
    assert_eq!(inner.count(Table::EvolutionExercises, harness.user).unwrap(), 0);
    assert_eq!(inner.count(Table::EvolutionExerciseSets, harness.user).unwrap(), 0);
}

#[test]
fn legacy_lists_import_into_one_routine_week() {
    let harness = Harness::new();
    seed_legacy(&harness);

    let mut sync = EvolutionSync::new(harness.deps());
    sync.initialize().unwrap();

    let weeks = sync.weeks();
    assert_eq!(weeks.len(), 1);
    assert_eq!(weeks[0].name, "Imported routine");
    let week_id = weeks[0].id;

    let pull_up = legacy_record_id("1714000000000");
    let monday = sync.exercises_by_day(week_id, DayOfWeek::Monday);
    assert_eq!(monday.len(), 1);
    assert_eq!(monday[0].id, pull_up);
    let sets = sync.sets_for_exercise(pull_up);
    assert_eq!(
        sets.iter().map(|s| (s.set_number, s.reps)).collect::<Vec<_>>(),
        vec![(1, 8), (2, 8), (3, 8)]
    );
    let wednesday = sync.exercises_by_day(week_id, DayOfWeek::Wednesday);
    let dip = wednesday[0];
    assert_eq!(dip.notes.as_deref(), Some("bodyweight"));
    assert_eq!(sync.sets_for_exercise(dip.id).len(), 2);

    let photos = sync.photos();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0].description.as_deref(), Some("before"));

    assert_eq!(
        harness
            .cache
            .get(&legacy_evolution_exercises_key(harness.user))
            .unwrap(),
        None
    );
    assert_eq!(
        harness
            .cache
            .get(&legacy_evolution_photos_key(harness.user))
            .unwrap(),
        None
    );
    assert!(harness
        .notifier
        .messages()
        .contains(&("Local data migrated".to_string(), Severity::Success)));
    harness.assert_all_calls_scoped_to(harness.user);
}

#[test]
fn reinitializing_after_import_does_not_duplicate() {
    let harness = Harness::new();
    seed_legacy(&harness);
    let mut sync = EvolutionSync::new(harness.deps());
    sync.initialize().unwrap();

    // A stale copy of the legacy lists reappears, e.g. restored from backup.
    seed_legacy(&harness);
    harness.reset_observations();
    sync.initialize().unwrap();

    assert!(harness.store.calls_of(StoreOp::Upsert).is_empty());
    let inner = harness.store.inner();
    assert_eq!(inner.count(Table::EvolutionWeeks, harness.user).unwrap(), 1);
    assert_eq!(inner.count(Table::EvolutionExercises, harness.user).unwrap(), 2);
    assert_eq!(inner.count(Table::EvolutionExerciseSets, harness.user).unwrap(), 5);
    assert_eq!(inner.count(Table::EvolutionPhotos, harness.user).unwrap(), 1);
}

#[test]
fn failed_import_keeps_legacy_lists_for_the_next_pass() {
    let harness = Harness::new();
    seed_legacy(&harness);
    harness.store.fail_next(StoreOp::Upsert);

    let mut sync = EvolutionSync::new(harness.deps());
    sync.initialize().unwrap();
    assert!(sync.weeks().is_empty());
    assert!(harness
        .notifier
        .messages()
        .contains(&("Failed to migrate local data".to_string(), Severity::Error)));
    assert!(harness
        .cache
        .get(&legacy_evolution_exercises_key(harness.user))
        .unwrap()
        .is_some());

    sync.initialize().unwrap();
    let inner = harness.store.inner();
    assert_eq!(inner.count(Table::EvolutionWeeks, harness.user).unwrap(), 1);
    assert_eq!(inner.count(Table::EvolutionExerciseSets, harness.user).unwrap(), 5);
}

#[test]
fn non_finite_set_weights_are_rejected_before_the_store() {
    let harness = Harness::new();
    let mut sync = ready_sync(&harness);
    let week = sync.add_week("Routine", None).unwrap();
    let bench = sync
        .add_exercise(week.id, exercise(DayOfWeek::Monday, "Bench"))
        .unwrap();
    let set = sync
        .add_exercise_set(
            bench.id,
            EvolutionSetDraft {
                set_number: 1,
                reps: 10,
                weight: 60.0,
            },
        )
        .unwrap();
    harness.reset_observations();

    let err = sync
        .add_exercise_set(
            bench.id,
            EvolutionSetDraft {
                set_number: 2,
                reps: 10,
                weight: f64::NAN,
            },
        )
        .unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));
    let err = sync
        .update_exercise_set(
            set.id,
            EvolutionSetPatch {
                weight: Some(f64::INFINITY),
                ..EvolutionSetPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));

    assert!(harness.store.calls().is_empty());
    assert_eq!(
        harness.notifier.severities(),
        vec![Severity::Error, Severity::Error]
    );
    assert_eq!(sync.sets_for_exercise(bench.id), vec![&set]);
    assert_eq!(
        harness
            .store
            .inner()
            .count(Table::EvolutionExerciseSets, harness.user)
            .unwrap(),
        1
    );

    // The stored rows still decode on the next reconcile.
    let mut fresh = EvolutionSync::new(harness.deps());
    fresh.initialize().unwrap();
    assert_eq!(fresh.sets_for_exercise(bench.id)[0].weight, 60.0);
}

#[test]
fn import_that_fails_after_the_routine_week_is_not_retried() {
    let harness = Harness::new();
    seed_legacy(&harness);
    // Routine week and the first exercise land, the first set fails.
    harness.store.fail_after(StoreOp::Upsert, 2);

    let mut sync = EvolutionSync::new(harness.deps());
    sync.initialize().unwrap();
    assert_eq!(sync.weeks().len(), 1);
    assert_eq!(sync.sets_for_exercise(legacy_record_id("1714000000000")).len(), 0);
    assert!(harness
        .notifier
        .messages()
        .contains(&("Failed to migrate local data".to_string(), Severity::Error)));

    harness.reset_observations();
    sync.initialize().unwrap();
    assert!(harness.store.calls_of(StoreOp::Upsert).is_empty());
    assert!(harness
        .cache
        .get(&legacy_evolution_exercises_key(harness.user))
        .unwrap()
        .is_some());
    let inner = harness.store.inner();
    assert_eq!(inner.count(Table::EvolutionExercises, harness.user).unwrap(), 1);
    assert_eq!(inner.count(Table::EvolutionExerciseSets, harness.user).unwrap(), 0);
}
