//! Evolution synchronization container: weekly routines and progress photos.
//!
//! # Responsibility
//! - Hold routine weeks → exercises → sets and the photo list for one user.
//! - Migrate the legacy local exercise/photo lists on first sync.
//!
//! # Invariants
//! - New weeks are appended after the highest existing `order_index`.
//! - Photos are presented newest date first.

use crate::model::evolution::{
    DayOfWeek, EvolutionExercise, EvolutionExerciseDraft, EvolutionExercisePatch,
    EvolutionExerciseSet, EvolutionExerciseTree, EvolutionPhoto, EvolutionSetDraft,
    EvolutionSetPatch, EvolutionWeek, EvolutionWeekDraft, EvolutionWeekPatch, EvolutionWeekTree,
    PhotoDraft,
};
use crate::model::{normalize_optional_text, RecordId, UserId};
use crate::repo::local_cache::{
    cache_key, legacy_evolution_exercises_key, legacy_evolution_photos_key, load_snapshot,
    store_snapshot, SLOT_EVOLUTION_PHOTOS, SLOT_EVOLUTION_WEEKS,
};
use crate::repo::remote_store::Table;
use crate::service::legacy::plan_evolution;
use crate::service::{
    ensure_patch, insert_record, patched_optional_text, patched_text, require_known,
    required_text, select_children, select_owned, update_record, validate_set_values,
};
use crate::sync::core::SyncCore;
use crate::sync::{Collection, SyncDeps, SyncPhase, SyncResult};
use std::collections::HashSet;

const MODULE: &str = "evolution_sync";

#[derive(Debug, Default)]
struct EvolutionState {
    weeks: Collection<EvolutionWeek>,
    exercises: Collection<EvolutionExercise>,
    sets: Collection<EvolutionExerciseSet>,
    photos: Collection<EvolutionPhoto>,
}

impl EvolutionState {
    fn sorted_weeks(&self) -> Vec<&EvolutionWeek> {
        let mut weeks: Vec<&EvolutionWeek> = self.weeks.iter().collect();
        weeks.sort_by_key(|week| week.order_index);
        weeks
    }

    fn sets_for_exercise(&self, exercise_id: RecordId) -> Vec<&EvolutionExerciseSet> {
        let mut sets = self.sets.children_of(exercise_id);
        sets.sort_by_key(|set| set.set_number);
        sets
    }

    fn week_trees(&self) -> Vec<EvolutionWeekTree> {
        self.sorted_weeks()
            .into_iter()
            .map(|week| EvolutionWeekTree {
                week: week.clone(),
                exercises: self
                    .exercises
                    .children_of(week.id)
                    .into_iter()
                    .map(|exercise| EvolutionExerciseTree {
                        exercise: exercise.clone(),
                        sets: self
                            .sets_for_exercise(exercise.id)
                            .into_iter()
                            .cloned()
                            .collect(),
                    })
                    .collect(),
            })
            .collect()
    }

    fn load_week_trees(&mut self, trees: Vec<EvolutionWeekTree>) {
        self.weeks.clear();
        self.exercises.clear();
        self.sets.clear();
        for tree in trees {
            self.weeks.upsert(tree.week);
            for exercise_tree in tree.exercises {
                self.exercises.upsert(exercise_tree.exercise);
                for set in exercise_tree.sets {
                    self.sets.upsert(set);
                }
            }
        }
    }

    fn sorted_photos(&self) -> Vec<&EvolutionPhoto> {
        let mut photos: Vec<&EvolutionPhoto> = self.photos.iter().collect();
        photos.sort_by(|left, right| {
            right
                .date
                .cmp(&left.date)
                .then(right.created_at.cmp(&left.created_at))
        });
        photos
    }

    fn next_order_index(&self) -> i64 {
        self.weeks
            .iter()
            .map(|week| week.order_index)
            .max()
            .map_or(0, |last| last + 1)
    }
}

/// Container for one user's evolution routines and photos.
pub struct EvolutionSync {
    core: SyncCore,
    state: EvolutionState,
}

impl EvolutionSync {
    pub fn new(deps: SyncDeps) -> Self {
        Self {
            core: SyncCore::new(deps, MODULE),
            state: EvolutionState::default(),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.core.phase()
    }

    pub fn is_loading(&self) -> bool {
        self.core.is_loading()
    }

    pub fn initialize(&mut self) -> SyncResult<()> {
        if self.begin() {
            self.reconcile()
        } else {
            Ok(())
        }
    }

    pub fn on_auth_state_changed(&mut self) -> SyncResult<()> {
        self.initialize()
    }

    pub fn begin(&mut self) -> bool {
        let previous = self.core.user();
        let Some(user) = self.core.begin_session() else {
            self.state = EvolutionState::default();
            return false;
        };
        if previous != Some(user) {
            self.state = EvolutionState::default();
        }

        let cache = self.core.cache();
        let weeks =
            load_snapshot::<EvolutionWeekTree>(cache, &cache_key(SLOT_EVOLUTION_WEEKS, user));
        let photos =
            load_snapshot::<EvolutionPhoto>(cache, &cache_key(SLOT_EVOLUTION_PHOTOS, user));
        let hydrated = weeks.is_some() || photos.is_some();
        if let Some(trees) = weeks {
            self.state.load_week_trees(trees);
        }
        if let Some(photos) = photos {
            self.state.photos = Collection::from_records(photos);
        }
        if hydrated {
            self.core.mark_hydrated();
        }
        true
    }

    pub fn reconcile(&mut self) -> SyncResult<()> {
        let user = self.core.start_reconcile()?;
        let outcome = self.migrate_and_fetch(user).map(|state| {
            self.state = state;
            self.persist(user);
        });
        self.core
            .finish_reconcile(&outcome, "Failed to load evolution data");
        outcome
    }

    fn migrate_and_fetch(&self, user: UserId) -> SyncResult<EvolutionState> {
        if !self.core.has_remote_roots(Table::EvolutionWeeks, user)? {
            let exercises_key = legacy_evolution_exercises_key(user);
            let photos_key = legacy_evolution_photos_key(user);
            let exercises = self.core.read_legacy(&exercises_key);
            let photos = self.core.read_legacy(&photos_key);
            if exercises.is_some() || photos.is_some() {
                self.core.apply_legacy_migration(
                    user,
                    plan_evolution(user, exercises.as_deref(), photos.as_deref()),
                    &[exercises_key, photos_key],
                );
            }
        }
        self.fetch(user)
    }

    fn fetch(&self, user: UserId) -> SyncResult<EvolutionState> {
        let store = self.core.store();
        let weeks: Vec<EvolutionWeek> = select_owned(store, Table::EvolutionWeeks, user)?;
        let exercises: Vec<EvolutionExercise> = select_children(
            store,
            Table::EvolutionExercises,
            user,
            weeks.iter().map(|week| week.id).collect(),
        )?;
        let sets: Vec<EvolutionExerciseSet> = select_children(
            store,
            Table::EvolutionExerciseSets,
            user,
            exercises.iter().map(|exercise| exercise.id).collect(),
        )?;
        let photos: Vec<EvolutionPhoto> = select_owned(store, Table::EvolutionPhotos, user)?;

        Ok(EvolutionState {
            weeks: Collection::from_records(weeks),
            exercises: Collection::from_records(exercises),
            sets: Collection::from_records(sets),
            photos: Collection::from_records(photos),
        })
    }

    fn persist(&self, user: UserId) {
        let cache = self.core.cache();
        store_snapshot(
            cache,
            &cache_key(SLOT_EVOLUTION_WEEKS, user),
            &self.state.week_trees(),
        );
        let photos: Vec<&EvolutionPhoto> = self.state.photos.iter().collect();
        store_snapshot(cache, &cache_key(SLOT_EVOLUTION_PHOTOS, user), &photos);
    }

    /// Appends a routine week after the current last one.
    pub fn add_week(&mut self, name: &str, description: Option<&str>) -> SyncResult<EvolutionWeek> {
        let outcome = self.try_add_week(name, description);
        self.core
            .report("add_week", outcome, "Week created", "Failed to create week")
    }

    fn try_add_week(&mut self, name: &str, description: Option<&str>) -> SyncResult<EvolutionWeek> {
        let user = self.core.require_user()?;
        let draft = EvolutionWeekDraft {
            name: required_text(name, "week name")?,
            description: normalize_optional_text(description),
            order_index: self.state.next_order_index(),
        };
        let week: EvolutionWeek =
            insert_record(self.core.store(), Table::EvolutionWeeks, user, None, &draft)?;
        self.state.weeks.upsert(week.clone());
        self.persist(user);
        Ok(week)
    }

    pub fn update_week(
        &mut self,
        week_id: RecordId,
        patch: EvolutionWeekPatch,
    ) -> SyncResult<EvolutionWeek> {
        let outcome = self.try_update_week(week_id, patch);
        self.core
            .report("update_week", outcome, "Week updated", "Failed to update week")
    }

    fn try_update_week(
        &mut self,
        week_id: RecordId,
        patch: EvolutionWeekPatch,
    ) -> SyncResult<EvolutionWeek> {
        let user = self.core.require_user()?;
        ensure_patch(patch.is_empty())?;
        let patch = EvolutionWeekPatch {
            name: patched_text(&patch.name, "week name")?,
            description: patched_optional_text(&patch.description),
            order_index: patch.order_index,
        };
        let mut week = require_known(&self.state.weeks, Table::EvolutionWeeks, week_id)?.clone();

        update_record(self.core.store(), Table::EvolutionWeeks, week_id, user, &patch)?;
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
        require_known(&self.state.weeks, Table::EvolutionWeeks, week_id)?;
        self.core
            .store()
            .delete(Table::EvolutionWeeks, week_id, user)?;
        self.state.weeks.remove(week_id);
        let exercises = self
            .state
            .exercises
            .remove_children_of(&HashSet::from([week_id]));
        self.state.sets.remove_children_of(&exercises);
        self.persist(user);
        Ok(())
    }

    pub fn add_exercise(
        &mut self,
        week_id: RecordId,
        draft: EvolutionExerciseDraft,
    ) -> SyncResult<EvolutionExercise> {
        let outcome = self.try_add_exercise(week_id, draft);
        self.core.report(
            "add_exercise",
            outcome,
            "Exercise added",
            "Failed to add exercise",
        )
    }

    fn try_add_exercise(
        &mut self,
        week_id: RecordId,
        draft: EvolutionExerciseDraft,
    ) -> SyncResult<EvolutionExercise> {
        let user = self.core.require_user()?;
        let draft = EvolutionExerciseDraft {
            day_of_week: draft.day_of_week,
            name: required_text(&draft.name, "exercise name")?,
            notes: normalize_optional_text(draft.notes.as_deref()),
        };
        require_known(&self.state.weeks, Table::EvolutionWeeks, week_id)?;

        let exercise: EvolutionExercise = insert_record(
            self.core.store(),
            Table::EvolutionExercises,
            user,
            Some(week_id),
            &draft,
        )?;
        self.state.exercises.upsert(exercise.clone());
        self.persist(user);
        Ok(exercise)
    }

    pub fn update_exercise(
        &mut self,
        exercise_id: RecordId,
        patch: EvolutionExercisePatch,
    ) -> SyncResult<EvolutionExercise> {
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
        patch: EvolutionExercisePatch,
    ) -> SyncResult<EvolutionExercise> {
        let user = self.core.require_user()?;
        ensure_patch(patch.is_empty())?;
        let patch = EvolutionExercisePatch {
            day_of_week: patch.day_of_week,
            name: patched_text(&patch.name, "exercise name")?,
            notes: patched_optional_text(&patch.notes),
        };
        let mut exercise =
            require_known(&self.state.exercises, Table::EvolutionExercises, exercise_id)?.clone();

        update_record(
            self.core.store(),
            Table::EvolutionExercises,
            exercise_id,
            user,
            &patch,
        )?;
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
        require_known(&self.state.exercises, Table::EvolutionExercises, exercise_id)?;
        self.core
            .store()
            .delete(Table::EvolutionExercises, exercise_id, user)?;
        self.state.exercises.remove(exercise_id);
        self.state
            .sets
            .remove_children_of(&HashSet::from([exercise_id]));
        self.persist(user);
        Ok(())
    }

    pub fn add_exercise_set(
        &mut self,
        exercise_id: RecordId,
        draft: EvolutionSetDraft,
    ) -> SyncResult<EvolutionExerciseSet> {
        let outcome = self.try_add_exercise_set(exercise_id, draft);
        self.core
            .report("add_exercise_set", outcome, "Set added", "Failed to add set")
    }

    fn try_add_exercise_set(
        &mut self,
        exercise_id: RecordId,
        draft: EvolutionSetDraft,
    ) -> SyncResult<EvolutionExerciseSet> {
        let user = self.core.require_user()?;
        validate_set_values(Some(draft.set_number), Some(draft.weight))?;
        require_known(&self.state.exercises, Table::EvolutionExercises, exercise_id)?;

        let set: EvolutionExerciseSet = insert_record(
            self.core.store(),
            Table::EvolutionExerciseSets,
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
        patch: EvolutionSetPatch,
    ) -> SyncResult<EvolutionExerciseSet> {
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
        patch: EvolutionSetPatch,
    ) -> SyncResult<EvolutionExerciseSet> {
        let user = self.core.require_user()?;
        ensure_patch(patch.is_empty())?;
        validate_set_values(patch.set_number, patch.weight)?;
        let mut set =
            require_known(&self.state.sets, Table::EvolutionExerciseSets, set_id)?.clone();

        update_record(
            self.core.store(),
            Table::EvolutionExerciseSets,
            set_id,
            user,
            &patch,
        )?;
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
        require_known(&self.state.sets, Table::EvolutionExerciseSets, set_id)?;
        self.core
            .store()
            .delete(Table::EvolutionExerciseSets, set_id, user)?;
        self.state.sets.remove(set_id);
        self.persist(user);
        Ok(())
    }

    /// Records a progress photo whose media is already uploaded.
    pub fn add_photo(&mut self, draft: PhotoDraft) -> SyncResult<EvolutionPhoto> {
        let outcome = self.try_add_photo(draft);
        self.core
            .report("add_photo", outcome, "Photo added", "Failed to add photo")
    }

    fn try_add_photo(&mut self, draft: PhotoDraft) -> SyncResult<EvolutionPhoto> {
        let user = self.core.require_user()?;
        let draft = PhotoDraft {
            url: required_text(&draft.url, "photo url")?,
            description: normalize_optional_text(draft.description.as_deref()),
            date: draft.date,
        };
        let photo: EvolutionPhoto =
            insert_record(self.core.store(), Table::EvolutionPhotos, user, None, &draft)?;
        self.state.photos.upsert(photo.clone());
        self.persist(user);
        Ok(photo)
    }

    pub fn delete_photo(&mut self, photo_id: RecordId) -> SyncResult<()> {
        let outcome = self.try_delete_photo(photo_id);
        self.core
            .report("delete_photo", outcome, "Photo deleted", "Failed to delete photo")
    }

    fn try_delete_photo(&mut self, photo_id: RecordId) -> SyncResult<()> {
        let user = self.core.require_user()?;
        require_known(&self.state.photos, Table::EvolutionPhotos, photo_id)?;
        self.core
            .store()
            .delete(Table::EvolutionPhotos, photo_id, user)?;
        self.state.photos.remove(photo_id);
        self.persist(user);
        Ok(())
    }

    /// Routine weeks by ascending `order_index`.
    pub fn weeks(&self) -> Vec<&EvolutionWeek> {
        self.state.sorted_weeks()
    }

    pub fn tree(&self) -> Vec<EvolutionWeekTree> {
        self.state.week_trees()
    }

    pub fn exercises_by_day(&self, week_id: RecordId, day: DayOfWeek) -> Vec<&EvolutionExercise> {
        self.state
            .exercises
            .children_of(week_id)
            .into_iter()
            .filter(|exercise| exercise.day_of_week == day)
            .collect()
    }

    pub fn sets_for_exercise(&self, exercise_id: RecordId) -> Vec<&EvolutionExerciseSet> {
        self.state.sets_for_exercise(exercise_id)
    }

    /// Photos, newest date first.
    pub fn photos(&self) -> Vec<&EvolutionPhoto> {
        self.state.sorted_photos()
    }
}
