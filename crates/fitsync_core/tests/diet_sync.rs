mod common;

use chrono::NaiveDate;
use common::{Harness, StoreOp};
use fitsync_core::model::diet::{
    AdherenceBand, DiaryDraft, DiaryPatch, MealDraft, MealPatch, MealTree, MealType,
    SubstitutionDraft,
};
use fitsync_core::repo::local_cache::{cache_key, SLOT_DIET_DIARY, SLOT_DIET_MEALS};
use fitsync_core::{DietSync, LocalCache, Severity, SyncError, SyncPhase, Table};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

fn meal(meal_type: MealType, food: &str) -> MealDraft {
    MealDraft {
        meal_type,
        food_name: food.to_string(),
        quantity: "100g".to_string(),
        time: None,
    }
}

fn goals(water: bool, workout: bool, cardio: bool, diet: bool) -> DiaryDraft {
    DiaryDraft {
        water_goal: water,
        workout_done: workout,
        cardio_done: cardio,
        diet_followed: diet,
        ..DiaryDraft::default()
    }
}

fn ready_sync(harness: &Harness) -> DietSync {
    let mut sync = DietSync::new(harness.deps());
    sync.initialize().unwrap();
    harness.reset_observations();
    sync
}

#[test]
fn second_diary_entry_for_a_date_is_rejected_without_a_store_call() {
    let harness = Harness::new();
    let mut sync = ready_sync(&harness);

    sync.add_diary_entry(date(4), goals(true, false, false, false))
        .unwrap();
    harness.reset_observations();

    let err = sync
        .add_diary_entry(date(4), goals(true, true, true, true))
        .unwrap_err();
    assert!(matches!(err, SyncError::DuplicateDiaryDate(d) if d == date(4)));
    assert!(harness.store.calls().is_empty());
    assert_eq!(sync.diary_entries().len(), 1);
    assert_eq!(
        harness.notifier.messages(),
        vec![(
            "A diary entry already exists for this date".to_string(),
            Severity::Error
        )]
    );
}

#[test]
fn moving_an_entry_onto_an_occupied_date_is_rejected() {
    let harness = Harness::new();
    let mut sync = ready_sync(&harness);

    sync.add_diary_entry(date(4), DiaryDraft::default()).unwrap();
    let second = sync.add_diary_entry(date(5), DiaryDraft::default()).unwrap();
    harness.reset_observations();

    let err = sync
        .update_diary_entry(
            second.id,
            DiaryPatch {
                date: Some(date(4)),
                ..DiaryPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, SyncError::DuplicateDiaryDate(_)));
    assert_eq!(harness.store.write_count(), 0);

    let moved = sync
        .update_diary_entry(
            second.id,
            DiaryPatch {
                date: Some(date(6)),
                notes: Some(Some("  rest day ".to_string())),
                ..DiaryPatch::default()
            },
        )
        .unwrap();
    assert_eq!(moved.date, date(6));
    assert_eq!(moved.notes.as_deref(), Some("rest day"));
    assert!(sync.diary_entry_by_date(date(5)).is_none());
    assert_eq!(sync.diary_entry_by_date(date(6)).map(|e| e.id), Some(second.id));
}

#[test]
fn weekly_adherence_counts_only_days_with_entries() {
    let harness = Harness::new();
    let mut sync = ready_sync(&harness);
    assert_eq!(sync.weekly_adherence(date(4)), 0);

    sync.add_diary_entry(date(4), goals(true, true, true, true))
        .unwrap();
    sync.add_diary_entry(date(5), goals(false, false, false, false))
        .unwrap();
    // Outside the seven-day window starting on the 4th.
    sync.add_diary_entry(date(11), goals(true, true, true, true))
        .unwrap();

    let percent = sync.weekly_adherence(date(4));
    assert_eq!(percent, 50);
    assert_eq!(DietSync::adherence_band(percent), AdherenceBand::KeepTrying);
    assert_eq!(sync.weekly_adherence(date(5)), 50);
    assert_eq!(DietSync::adherence_band(95), AdherenceBand::Excellent);
}

#[test]
fn half_met_goals_on_two_days_score_fifty() {
    let harness = Harness::new();
    let mut sync = ready_sync(&harness);

    for day in [4, 6] {
        sync.add_diary_entry(date(day), goals(true, true, false, false))
            .unwrap();
    }

    assert_eq!(sync.weekly_adherence(date(4)), 50);
    assert_eq!(sync.weekly_adherence(date(6)), 50);
    assert_eq!(sync.weekly_adherence(date(7)), 0);
}

#[test]
fn diary_and_free_meal_history_are_newest_first() {
    let harness = Harness::new();
    let mut sync = ready_sync(&harness);

    for day in [2, 9, 5] {
        sync.add_diary_entry(
            date(day),
            DiaryDraft {
                free_meal: day != 5,
                free_meal_description: Some(format!("pizza on the {day}")),
                ..DiaryDraft::default()
            },
        )
        .unwrap();
    }

    let dates: Vec<_> = sync.diary_entries().iter().map(|e| e.date).collect();
    assert_eq!(dates, vec![date(9), date(5), date(2)]);
    let history: Vec<_> = sync.free_meal_history().iter().map(|e| e.date).collect();
    assert_eq!(history, vec![date(9), date(2)]);
}

#[test]
fn deleting_a_meal_prunes_its_substitutions() {
    let harness = Harness::new();
    let mut sync = ready_sync(&harness);

    let rice = sync.add_meal(meal(MealType::Lunch, "Rice")).unwrap();
    let eggs = sync.add_meal(meal(MealType::Breakfast, "Eggs")).unwrap();
    for name in ["Quinoa", "Pasta"] {
        sync.add_substitution(
            rice.id,
            SubstitutionDraft {
                substitute_name: name.to_string(),
                quantity: "120g".to_string(),
            },
        )
        .unwrap();
    }
    assert_eq!(sync.substitutions_for_meal(rice.id).len(), 2);

    sync.delete_meal(rice.id).unwrap();

    assert!(sync.substitutions_for_meal(rice.id).is_empty());
    assert_eq!(sync.meals().iter().map(|m| m.id).collect::<Vec<_>>(), vec![eggs.id]);
    assert_eq!(
        harness
            .store
            .inner()
            .count(Table::FoodSubstitutions, harness.user)
            .unwrap(),
        0
    );
    let cached: Vec<MealTree> = serde_json::from_str(
        &harness
            .cache
            .get(&cache_key(SLOT_DIET_MEALS, harness.user))
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(cached, sync.meal_trees());
}

#[test]
fn meals_filter_by_slot_and_updates_validate_input() {
    let harness = Harness::new();
    let mut sync = ready_sync(&harness);

    let oats = sync.add_meal(meal(MealType::Breakfast, "Oats")).unwrap();
    sync.add_meal(meal(MealType::Dinner, "Salmon")).unwrap();
    sync.add_meal(meal(MealType::Breakfast, "Banana")).unwrap();

    let breakfast: Vec<_> = sync
        .meals_by_type(MealType::Breakfast)
        .iter()
        .map(|m| m.food_name.clone())
        .collect();
    assert_eq!(breakfast, vec!["Oats".to_string(), "Banana".to_string()]);

    let err = sync
        .update_meal(
            oats.id,
            MealPatch {
                food_name: Some("  ".to_string()),
                ..MealPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));

    let updated = sync
        .update_meal(
            oats.id,
            MealPatch {
                meal_type: Some(MealType::PreWorkout),
                ..MealPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.meal_type, MealType::PreWorkout);
    assert_eq!(sync.meals_by_type(MealType::Breakfast).len(), 1);
}

#[test]
fn cached_diet_data_is_shown_until_the_store_answers() {
    let harness = Harness::new();
    let mut first = ready_sync(&harness);
    first.add_meal(meal(MealType::Lunch, "Chicken")).unwrap();
    first.add_diary_entry(date(1), DiaryDraft::default()).unwrap();
    assert!(harness
        .cache
        .get(&cache_key(SLOT_DIET_DIARY, harness.user))
        .unwrap()
        .is_some());

    harness.store.set_offline(true);
    harness.reset_observations();
    let mut sync = DietSync::new(harness.deps());
    assert!(sync.begin());
    assert!(!sync.is_loading());
    assert_eq!(sync.meals().len(), 1);
    assert_eq!(sync.diary_entries().len(), 1);

    assert!(sync.reconcile().is_err());
    assert_eq!(sync.phase(), SyncPhase::Ready);
    assert_eq!(sync.meals().len(), 1);
    assert_eq!(
        harness.notifier.messages(),
        vec![("Failed to load diet data".to_string(), Severity::Error)]
    );
}

#[test]
fn failed_insert_changes_nothing() {
    let harness = Harness::new();
    let mut sync = ready_sync(&harness);

    harness.store.fail_next(StoreOp::Insert);
    assert!(sync.add_diary_entry(date(3), DiaryDraft::default()).is_err());
    assert!(sync.diary_entries().is_empty());
    assert!(sync.diary_entry_by_date(date(3)).is_none());

    sync.add_diary_entry(date(3), DiaryDraft::default()).unwrap();
    assert_eq!(sync.diary_entries().len(), 1);
    harness.assert_all_calls_scoped_to(harness.user);
}
