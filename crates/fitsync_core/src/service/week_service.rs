//! Training-week synchronization container.
//!
//! # Responsibility
//! - Hold the weeks → days → (exercises → sets, cardio) tree for one user.
//! - Hydrate from the `weeks` cache slot, then reconcile with the store,
//!   migrating the legacy `workout-weeks` list when the user has no weeks.
//! - Apply add/update/delete at every depth, remote first.
//!
//! # Invariants
//! - Local state changes only after the store accepted the write.
//! - Deleting a week or day prunes every local descendant.
//! - Days are presented in ascending date order, sets by set number.

use crate::model::training::{
    Cardio, CardioDraft, CardioPatch, Day, DayDraft, DayPatch, DayTree, Exercise, ExerciseDraft,
    ExercisePatch, ExerciseSet, ExerciseSetDraft, ExerciseSetPatch, ExerciseTree, Week,
    WeekDraft, WeekPatch, WeekTree,
};
use crate::model::{normalize_optional_text, RecordId, UserId};
use crate::repo::local_cache::{
    cache_key, load_snapshot, store_snapshot, LEGACY_WORKOUT_WEEKS_KEY, SLOT_WEEKS,
};
use crate::repo::remote_store::Table;
use crate::service::legacy::plan_training_weeks;
use crate::service::{
    ensure_patch, insert_record, patched_optional_text, patched_text, require_known,
    required_text, select_children, select_owned, update_record, validate_set_values,
    validate_weight,
};
use crate::sync::core::SyncCore;
use crate::sync::{Collection, SyncDeps, SyncError, SyncPhase, SyncResult};
use std::collections::HashSet;

const MODULE: &str = "week_sync";

#[derive(Debug, Default)]
struct WeekState {
    weeks: Collection<Week>,
    days: Collection<Day>,
    exercises: Collection<Exercise>,
    sets: Collection<ExerciseSet>,
    cardio: Collection<Cardio>,
}

impl WeekState {
    fn from_trees(trees: Vec<WeekTree>) -> Self {
        let mut state = Self::default();
        for tree in trees {
            state.weeks.upsert(tree.week);
            for day_tree in tree.days {
                state.days.upsert(day_tree.day);
                for exercise_tree in day_tree.exercises {
                    state.exercises.upsert(exercise_tree.exercise);
                    for set in exercise_tree.sets {
                        state.sets.upsert(set);
                    }
                }
                for cardio in day_tree.cardio {
                    state.cardio.upsert(cardio);
                }
            }
        }
        state
    }

    fn to_trees(&self) -> Vec<WeekTree> {
        self.weeks
            .iter()
            .map(|week| WeekTree {
                week: week.clone(),
                days: self
                    .days_for_week(week.id)
                    .into_iter()
                    .map(|day| self.day_tree(day))
                    .collect(),
            })
            .collect()
    }

    fn day_tree(&self, day: &Day) -> DayTree {
        DayTree {
            day: day.clone(),
            exercises: self
                .exercises
                .children_of(day.id)
                .into_iter()
                .map(|exercise| ExerciseTree {
                    exercise: exercise.clone(),
                    sets: self
                        .sets_for_exercise(exercise.id)
                        .into_iter()
                        .cloned()
                        .collect(),
                })
                .collect(),
            cardio: self.cardio.children_of(day.id).into_iter().cloned().collect(),
        }
    }

    fn days_for_week(&self, week_id: RecordId) -> Vec<&Day> {
        let mut days = self.days.children_of(week_id);
        days.sort_by_key(|day| day.date);
        days
    }

    fn sets_for_exercise(&self, exercise_id: RecordId) -> Vec<&ExerciseSet> {
        let mut sets = self.sets.children_of(exercise_id);
        sets.sort_by_key(|set| set.set_number);
        sets
    }

    fn remove_week(&mut self, week_id: RecordId) {
        self.weeks.remove(week_id);
        let days = self.days.remove_children_of(&HashSet::from([week_id]));
        self.remove_day_children(&days);
    }

    fn remove_day(&mut self, day_id: RecordId) {
        self.days.remove(day_id);
        self.remove_day_children(&HashSet::from([day_id]));
    }

    fn remove_day_children(&mut self, days: &HashSet<RecordId>) {
        let exercises = self.exercises.remove_children_of(days);
        self.cardio.remove_children_of(days);
        self.sets.remove_children_of(&exercises);
    }

    fn remove_exercise(&mut self, exercise_id: RecordId) {
        self.exercises.remove(exercise_id);
        self.sets.remove_children_of(&HashSet::from([exercise_id]));
    }
}

/// Container for one user's training weeks.
pub struct WeekSync {
    core: SyncCore,
    state: WeekState,
}

impl WeekSync {
    pub fn new(deps: SyncDeps) -> Self {
        Self {
            core: SyncCore::new(deps, MODULE),
            state: WeekState::default(),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.core.phase()
    }

    pub fn is_loading(&self) -> bool {
        self.core.is_loading()
    }

    /// Runs a full initialization pass: cache hydration, then reconcile.
    ///
    /// With nobody signed in the tree is emptied and `Ok(())` is returned.
    pub fn initialize(&mut self) -> SyncResult<()> {
        if self.begin() {
            self.reconcile()
        } else {
            Ok(())
        }
    }

    /// Re-initializes after the session's user changed.
    pub fn on_auth_state_changed(&mut self) -> SyncResult<()> {
        self.initialize()
    }

    /// First half of [`initialize`](Self::initialize): binds the session user
    /// and publishes the cached tree when one exists.
    ///
    /// Returns `false` when nobody is signed in.
    pub fn begin(&mut self) -> bool {
        let previous = self.core.user();
        let Some(user) = self.core.begin_session() else {
            self.state = WeekState::default();
            return false;
        };
        if previous != Some(user) {
            self.state = WeekState::default();
        }

        let key = cache_key(SLOT_WEEKS, user);
        if let Some(trees) = load_snapshot::<WeekTree>(self.core.cache(), &key) {
            self.state = WeekState::from_trees(trees);
            self.core.mark_hydrated();
        }
        true
    }

    /// Second half of [`initialize`](Self::initialize): replaces the tree
    /// with the store's canonical one. On failure the current tree stays.
    pub fn reconcile(&mut self) -> SyncResult<()> {
        let user = self.core.start_reconcile()?;
        let outcome = self.migrate_and_fetch(user).map(|state| {
            self.state = state;
            self.persist(user);
        });
        self.core
            .finish_reconcile(&outcome, "Failed to load training weeks");
        outcome
    }

    fn migrate_and_fetch(&self, user: UserId) -> SyncResult<WeekState> {
        if !self.core.has_remote_roots(Table::Weeks, user)? {
            if let Some(raw) = self.core.read_legacy(LEGACY_WORKOUT_WEEKS_KEY) {
                self.core.apply_legacy_migration(
                    user,
                    plan_training_weeks(&raw),
                    &[LEGACY_WORKOUT_WEEKS_KEY.to_string()],
                );
            }
        }
        self.fetch(user)
    }

    fn fetch(&self, user: UserId) -> SyncResult<WeekState> {
        let store = self.core.store();
        let weeks: Vec<Week> = select_owned(store, Table::Weeks, user)?;
        let days: Vec<Day> = select_children(
            store,
            Table::Days,
            user,
            weeks.iter().map(|week| week.id).collect(),
        )?;
        let day_ids: Vec<RecordId> = days.iter().map(|day| day.id).collect();
        let exercises: Vec<Exercise> =
            select_children(store, Table::Exercises, user, day_ids.clone())?;
        let cardio: Vec<Cardio> = select_children(store, Table::Cardio, user, day_ids)?;
        let sets: Vec<ExerciseSet> = select_children(
            store,
            Table::ExerciseSets,
            user,
            exercises.iter().map(|exercise| exercise.id).collect(),
        )?;

        Ok(WeekState {
            weeks: Collection::from_records(weeks),
            days: Collection::from_records(days),
            exercises: Collection::from_records(exercises),
            sets: Collection::from_records(sets),
            cardio: Collection::from_records(cardio),
        })
    }

    fn persist(&self, user: UserId) {
        store_snapshot(
            self.core.cache(),
            &cache_key(SLOT_WEEKS, user),
            &self.state.to_trees(),
        );
    }

    pub fn add_week(&mut self, draft: WeekDraft) -> SyncResult<Week> {
        let outcome = self.try_add_week(draft);
        self.core
            .report("add_week", outcome, "Week created", "Failed to create week")
    }

    fn try_add_week(&mut self, draft: WeekDraft) -> SyncResult<Week> {
        let user = self.core.require_user()?;
        let draft = WeekDraft {
            name: required_text(&draft.name, "week name")?,
            description: normalize_optional_text(draft.description.as_deref()),
        };
        let week: Week = insert_record(self.core.store(), Table::Weeks, user, None, &draft)?;
        self.state.weeks.upsert(week.clone());
        self.persist(user);
        Ok(week)
    }

    pub fn update_week(&mut self, week_id: RecordId, patch: WeekPatch) -> SyncResult<Week> {
        let outcome = self.try_update_week(week_id, patch);
        self.core
            .report("update_week", outcome, "Week updated", "Failed to update week")
    }

    fn try_update_week(&mut self, week_id: RecordId, patch: WeekPatch) -> SyncResult<Week> {
        let user = self.core.require_user()?;
        ensure_patch(patch.is_empty())?;
        let patch = WeekPatch {
            name: patched_text(&patch.name, "week name")?,
            description: patched_optional_text(&patch.description),
        };
        let mut week = require_known(&self.state.weeks, Table::Weeks, week_id)?.clone();

        update_record(self.core.store(), Table::Weeks, week_id, user, &patch)?;
        patch.apply_to(&mut week);
        self.state.weeks.upsert(week.clone());
        self.persist(user);
        Ok(week)
    }

    pub fn delete_week(&mut self, week_id: RecordId) -> SyncResult<()> {
        let outcome = self.try_delete_week(week_id);
        self.core
            .report("delete_week", outcome, "Week deleted", "Failed to delete week")
    }

    fn try_delete_week(&mut self, week_id: RecordId) -> SyncResult<()> {
        let user = self.core.require_user()?;
        require_known(&self.state.weeks, Table::Weeks, week_id)?;
        self.core.store().delete(Table::Weeks, week_id, user)?;
        self.state.remove_week(week_id);
        self.persist(user);
        Ok(())
    }

    pub fn add_day(&mut self, week_id: RecordId, draft: DayDraft) -> SyncResult<Day> {
        let outcome = self.try_add_day(week_id, draft);
        self.core
            .report("add_day", outcome, "Day added", "Failed to add day")
    }

    fn try_add_day(&mut self, week_id: RecordId, draft: DayDraft) -> SyncResult<Day> {
        let user = self.core.require_user()?;
        let draft = DayDraft {
            date: draft.date,
            day_name: required_text(&draft.day_name, "day name")?,
        };
        require_known(&self.state.weeks, Table::Weeks, week_id)?;

        let day: Day = insert_record(self.core.store(), Table::Days, user, Some(week_id), &draft)?;
        self.state.days.upsert(day.clone());
        self.persist(user);
        Ok(day)
    }

    pub fn update_day(&mut self, day_id: RecordId, patch: DayPatch) -> SyncResult<Day> {
        let outcome = self.try_update_day(day_id, patch);
        self.core
            .report("update_day", outcome, "Day updated", "Failed to update day")
    }

    fn try_update_day(&mut self, day_id: RecordId, patch: DayPatch) -> SyncResult<Day> {
        let user = self.core.require_user()?;
        ensure_patch(patch.is_empty())?;
        let patch = DayPatch {
            date: patch.date,
            day_name: patched_text(&patch.day_name, "day name")?,
        };
        let mut day = require_known(&self.state.days, Table::Days, day_id)?.clone();

        update_record(self.core.store(), Table::Days, day_id, user, &patch)?;
        patch.apply_to(&mut day);
        self.state.days.upsert(day.clone());
        self.persist(user);
        Ok(day)
    }

    pub fn delete_day(&mut self, day_id: RecordId) -> SyncResult<()> {
        let outcome = self.try_delete_day(day_id);
        self.core
            .report("delete_day", outcome, "Day deleted", "Failed to delete day")
    }

    fn try_delete_day(&mut self, day_id: RecordId) -> SyncResult<()> {
        let user = self.core.require_user()?;
        require_known(&self.state.days, Table::Days, day_id)?;
        self.core.store().delete(Table::Days, day_id, user)?;
        self.state.remove_day(day_id);
        self.persist(user);
        Ok(())
    }

    pub fn add_exercise(&mut self, day_id: RecordId, draft: ExerciseDraft) -> SyncResult<Exercise> {
        let outcome = self.try_add_exercise(day_id, draft);
        self.core.report(
            "add_exercise",
            outcome,
            "Exercise added",
            "Failed to add exercise",
        )
    }

    fn try_add_exercise(&mut self, day_id: RecordId, draft: ExerciseDraft) -> SyncResult<Exercise> {
        let user = self.core.require_user()?;
        let draft = ExerciseDraft {
            exercise_ref: normalize_optional_text(draft.exercise_ref.as_deref()),
            name: required_text(&draft.name, "exercise name")?,
            muscle_group: draft.muscle_group.trim().to_string(),
            notes: normalize_optional_text(draft.notes.as_deref()),
            ..draft
        };
        validate_weight(draft.weight)?;
        require_known(&self.state.days, Table::Days, day_id)?;

        let exercise: Exercise = insert_record(
            self.core.store(),
            Table::Exercises,
            user,
            Some(day_id),
            &draft,
        )?;
        self.state.exercises.upsert(exercise.clone());
        self.persist(user);
        Ok(exercise)
    }

    pub fn update_exercise(
        &mut self,
        exercise_id: RecordId,
        patch: ExercisePatch,
    ) -> SyncResult<Exercise> {
        let outcome = self.try_update_exercise(exercise_id, patch);
        self.core.report(
            "update_exercise",
            outcome,
            "Exercise updated",
            "Failed to update exercise",
        )
    }

    fn try_update_exercise(
        &mut self,
        exercise_id: RecordId,
        patch: ExercisePatch,
    ) -> SyncResult<Exercise> {
        let user = self.core.require_user()?;
        ensure_patch(patch.is_empty())?;
        let patch = ExercisePatch {
            exercise_ref: patched_optional_text(&patch.exercise_ref),
            name: patched_text(&patch.name, "exercise name")?,
            muscle_group: patch.muscle_group.map(|value| value.trim().to_string()),
            notes: patched_optional_text(&patch.notes),
            ..patch
        };
        validate_weight(patch.weight.flatten())?;
        let mut exercise =
            require_known(&self.state.exercises, Table::Exercises, exercise_id)?.clone();

        update_record(self.core.store(), Table::Exercises, exercise_id, user, &patch)?;
        patch.apply_to(&mut exercise);
        self.state.exercises.upsert(exercise.clone());
        self.persist(user);
        Ok(exercise)
    }

    pub fn delete_exercise(&mut self, exercise_id: RecordId) -> SyncResult<()> {
        let outcome = self.try_delete_exercise(exercise_id);
        self.core.report(
            "delete_exercise",
            outcome,
            "Exercise deleted",
            "Failed to delete exercise",
        )
    }

    fn try_delete_exercise(&mut self, exercise_id: RecordId) -> SyncResult<()> {
        let user = self.core.require_user()?;
        require_known(&self.state.exercises, Table::Exercises, exercise_id)?;
        self.core
            .store()
            .delete(Table::Exercises, exercise_id, user)?;
        self.state.remove_exercise(exercise_id);
        self.persist(user);
        Ok(())
    }

    pub fn add_exercise_set(
        &mut self,
        exercise_id: RecordId,
        draft: ExerciseSetDraft,
    ) -> SyncResult<ExerciseSet> {
        let outcome = self.try_add_exercise_set(exercise_id, draft);
        self.core
            .report("add_exercise_set", outcome, "Set added", "Failed to add set")
    }

    fn try_add_exercise_set(
        &mut self,
        exercise_id: RecordId,
        draft: ExerciseSetDraft,
    ) -> SyncResult<ExerciseSet> {
        let user = self.core.require_user()?;
        validate_set_values(Some(draft.set_number), Some(draft.weight))?;
        require_known(&self.state.exercises, Table::Exercises, exercise_id)?;

        let set: ExerciseSet = insert_record(
            self.core.store(),
            Table::ExerciseSets,
            user,
            Some(exercise_id),
            &draft,
        )?;
        self.state.sets.upsert(set.clone());
        self.persist(user);
        Ok(set)
    }

    pub fn update_exercise_set(
        &mut self,
        set_id: RecordId,
        patch: ExerciseSetPatch,
    ) -> SyncResult<ExerciseSet> {
        let outcome = self.try_update_exercise_set(set_id, patch);
        self.core.report(
            "update_exercise_set",
            outcome,
            "Set updated",
            "Failed to update set",
        )
    }

    fn try_update_exercise_set(
        &mut self,
        set_id: RecordId,
        patch: ExerciseSetPatch,
    ) -> SyncResult<ExerciseSet> {
        let user = self.core.require_user()?;
        ensure_patch(patch.is_empty())?;
        validate_set_values(patch.set_number, patch.weight)?;
        let mut set = require_known(&self.state.sets, Table::ExerciseSets, set_id)?.clone();

        update_record(self.core.store(), Table::ExerciseSets, set_id, user, &patch)?;
        patch.apply_to(&mut set);
        self.state.sets.upsert(set.clone());
        self.persist(user);
        Ok(set)
    }

    pub fn delete_exercise_set(&mut self, set_id: RecordId) -> SyncResult<()> {
        let outcome = self.try_delete_exercise_set(set_id);
        self.core.report(
            "delete_exercise_set",
            outcome,
            "Set deleted",
            "Failed to delete set",
        )
    }

    fn try_delete_exercise_set(&mut self, set_id: RecordId) -> SyncResult<()> {
        let user = self.core.require_user()?;
        require_known(&self.state.sets, Table::ExerciseSets, set_id)?;
        self.core.store().delete(Table::ExerciseSets, set_id, user)?;
        self.state.sets.remove(set_id);
        self.persist(user);
        Ok(())
    }

    pub fn add_cardio(&mut self, day_id: RecordId, draft: CardioDraft) -> SyncResult<Cardio> {
        let outcome = self.try_add_cardio(day_id, draft);
        self.core
            .report("add_cardio", outcome, "Cardio added", "Failed to add cardio")
    }

    fn try_add_cardio(&mut self, day_id: RecordId, draft: CardioDraft) -> SyncResult<Cardio> {
        let user = self.core.require_user()?;
        validate_duration(Some(draft.duration_minutes))?;
        require_known(&self.state.days, Table::Days, day_id)?;

        let cardio: Cardio =
            insert_record(self.core.store(), Table::Cardio, user, Some(day_id), &draft)?;
        self.state.cardio.upsert(cardio.clone());
        self.persist(user);
        Ok(cardio)
    }

    pub fn update_cardio(&mut self, cardio_id: RecordId, patch: CardioPatch) -> SyncResult<Cardio> {
        let outcome = self.try_update_cardio(cardio_id, patch);
        self.core.report(
            "update_cardio",
            outcome,
            "Cardio updated",
            "Failed to update cardio",
        )
    }

    fn try_update_cardio(&mut self, cardio_id: RecordId, patch: CardioPatch) -> SyncResult<Cardio> {
        let user = self.core.require_user()?;
        ensure_patch(patch.is_empty())?;
        validate_duration(patch.duration_minutes)?;
        let mut cardio = require_known(&self.state.cardio, Table::Cardio, cardio_id)?.clone();

        update_record(self.core.store(), Table::Cardio, cardio_id, user, &patch)?;
        patch.apply_to(&mut cardio);
        self.state.cardio.upsert(cardio.clone());
        self.persist(user);
        Ok(cardio)
    }

    pub fn delete_cardio(&mut self, cardio_id: RecordId) -> SyncResult<()> {
        let outcome = self.try_delete_cardio(cardio_id);
        self.core.report(
            "delete_cardio",
            outcome,
            "Cardio deleted",
            "Failed to delete cardio",
        )
    }

    fn try_delete_cardio(&mut self, cardio_id: RecordId) -> SyncResult<()> {
        let user = self.core.require_user()?;
        require_known(&self.state.cardio, Table::Cardio, cardio_id)?;
        self.core.store().delete(Table::Cardio, cardio_id, user)?;
        self.state.cardio.remove(cardio_id);
        self.persist(user);
        Ok(())
    }

    /// Weeks in creation order.
    pub fn weeks(&self) -> Vec<&Week> {
        self.state.weeks.iter().collect()
    }

    /// Nested view of the whole collection, as cached.
    pub fn tree(&self) -> Vec<WeekTree> {
        self.state.to_trees()
    }

    pub fn week_by_id(&self, week_id: RecordId) -> Option<&Week> {
        self.state.weeks.get(week_id)
    }

    pub fn day_by_id(&self, day_id: RecordId) -> Option<&Day> {
        self.state.days.get(day_id)
    }

    pub fn days_for_week(&self, week_id: RecordId) -> Vec<&Day> {
        self.state.days_for_week(week_id)
    }

    pub fn exercises_for_day(&self, day_id: RecordId) -> Vec<&Exercise> {
        self.state.exercises.children_of(day_id)
    }

    pub fn sets_for_exercise(&self, exercise_id: RecordId) -> Vec<&ExerciseSet> {
        self.state.sets_for_exercise(exercise_id)
    }

    pub fn cardio_for_day(&self, day_id: RecordId) -> Vec<&Cardio> {
        self.state.cardio.children_of(day_id)
    }

    /// Total cardio minutes logged across every day of a week.
    pub fn cardio_minutes_for_week(&self, week_id: RecordId) -> u32 {
        self.state
            .days
            .children_of(week_id)
            .into_iter()
            .flat_map(|day| self.state.cardio.children_of(day.id))
            .map(|cardio| cardio.duration_minutes)
            .sum()
    }
}

fn validate_duration(minutes: Option<u32>) -> SyncResult<()> {
    if minutes == Some(0) {
        return Err(SyncError::validation("cardio duration must be positive"));
    }
    Ok(())
}
