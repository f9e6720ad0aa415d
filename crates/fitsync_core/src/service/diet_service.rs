//! Diet synchronization container: planned meals and the daily goal diary.
//!
//! # Responsibility
//! - Hold meals (with substitutions) and diary entries for one user.
//! - Compute weekly adherence over the four tracked goals.
//!
//! # Invariants
//! - At most one diary entry per calendar date; duplicates are rejected
//!   before any store call.
//! - Diary entries are presented newest date first.

use crate::model::diet::{
    AdherenceBand, DiaryDraft, DiaryEntry, DiaryPatch, FoodSubstitution, Meal, MealDraft,
    MealPatch, MealTree, MealType, SubstitutionDraft, SubstitutionPatch, TRACKED_GOALS,
};
use crate::model::{normalize_optional_text, RecordId, UserId};
use crate::repo::local_cache::{
    cache_key, load_snapshot, store_snapshot, SLOT_DIET_DIARY, SLOT_DIET_MEALS,
};
use crate::repo::remote_store::Table;
use crate::service::{
    ensure_patch, insert_record, patched_optional_text, patched_text, require_known,
    required_text, select_children, select_owned, update_record,
};
use crate::sync::core::SyncCore;
use crate::sync::{Collection, SyncDeps, SyncError, SyncPhase, SyncResult};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::HashSet;

const MODULE: &str = "diet_sync";

/// Days covered by one adherence window, start date included.
const ADHERENCE_WINDOW_DAYS: u64 = 7;

/// Insert payload for a diary entry: the date plus the draft fields.
#[derive(Serialize)]
struct DiaryInsert<'a> {
    date: NaiveDate,
    #[serde(flatten)]
    draft: &'a DiaryDraft,
}

#[derive(Debug, Default)]
struct DietState {
    meals: Collection<Meal>,
    substitutions: Collection<FoodSubstitution>,
    diary: Collection<DiaryEntry>,
}

impl DietState {
    fn meal_trees(&self) -> Vec<MealTree> {
        self.meals
            .iter()
            .map(|meal| MealTree {
                meal: meal.clone(),
                substitutions: self
                    .substitutions
                    .children_of(meal.id)
                    .into_iter()
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    fn load_meal_trees(&mut self, trees: Vec<MealTree>) {
        self.meals.clear();
        self.substitutions.clear();
        for tree in trees {
            self.meals.upsert(tree.meal);
            for substitution in tree.substitutions {
                self.substitutions.upsert(substitution);
            }
        }
    }

    fn entry_for_date(&self, date: NaiveDate) -> Option<&DiaryEntry> {
        self.diary.iter().find(|entry| entry.date == date)
    }
}

/// Container for one user's meal plan and diary.
pub struct DietSync {
    core: SyncCore,
    state: DietState,
}

impl DietSync {
    pub fn new(deps: SyncDeps) -> Self {
        Self {
            core: SyncCore::new(deps, MODULE),
            state: DietState::default(),
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

    /// Binds the session user and publishes whichever cache slots exist.
    pub fn begin(&mut self) -> bool {
        let previous = self.core.user();
        let Some(user) = self.core.begin_session() else {
            self.state = DietState::default();
            return false;
        };
        if previous != Some(user) {
            self.state = DietState::default();
        }

        let cache = self.core.cache();
        let meals = load_snapshot::<MealTree>(cache, &cache_key(SLOT_DIET_MEALS, user));
        let diary = load_snapshot::<DiaryEntry>(cache, &cache_key(SLOT_DIET_DIARY, user));
        let hydrated = meals.is_some() || diary.is_some();
        if let Some(trees) = meals {
            self.state.load_meal_trees(trees);
        }
        if let Some(entries) = diary {
            self.state.diary = Collection::from_records(entries);
        }
        if hydrated {
            self.core.mark_hydrated();
        }
        true
    }

    pub fn reconcile(&mut self) -> SyncResult<()> {
        let user = self.core.start_reconcile()?;
        let outcome = self.fetch(user).map(|state| {
            self.state = state;
            self.persist(user);
        });
        self.core.finish_reconcile(&outcome, "Failed to load diet data");
        outcome
    }

    fn fetch(&self, user: UserId) -> SyncResult<DietState> {
        let store = self.core.store();
        let meals: Vec<Meal> = select_owned(store, Table::Meals, user)?;
        let substitutions: Vec<FoodSubstitution> = select_children(
            store,
            Table::FoodSubstitutions,
            user,
            meals.iter().map(|meal| meal.id).collect(),
        )?;
        let diary: Vec<DiaryEntry> = select_owned(store, Table::DiaryEntries, user)?;

        Ok(DietState {
            meals: Collection::from_records(meals),
            substitutions: Collection::from_records(substitutions),
            diary: Collection::from_records(diary),
        })
    }

    fn persist(&self, user: UserId) {
        let cache = self.core.cache();
        store_snapshot(
            cache,
            &cache_key(SLOT_DIET_MEALS, user),
            &self.state.meal_trees(),
        );
        let diary: Vec<&DiaryEntry> = self.state.diary.iter().collect();
        store_snapshot(cache, &cache_key(SLOT_DIET_DIARY, user), &diary);
    }

    pub fn add_meal(&mut self, draft: MealDraft) -> SyncResult<Meal> {
        let outcome = self.try_add_meal(draft);
        self.core
            .report("add_meal", outcome, "Meal added", "Failed to add meal")
    }

    fn try_add_meal(&mut self, draft: MealDraft) -> SyncResult<Meal> {
        let user = self.core.require_user()?;
        let draft = MealDraft {
            meal_type: draft.meal_type,
            food_name: required_text(&draft.food_name, "food name")?,
            quantity: required_text(&draft.quantity, "quantity")?,
            time: normalize_optional_text(draft.time.as_deref()),
        };
        let meal: Meal = insert_record(self.core.store(), Table::Meals, user, None, &draft)?;
        self.state.meals.upsert(meal.clone());
        self.persist(user);
        Ok(meal)
    }

    pub fn update_meal(&mut self, meal_id: RecordId, patch: MealPatch) -> SyncResult<Meal> {
        let outcome = self.try_update_meal(meal_id, patch);
        self.core
            .report("update_meal", outcome, "Meal updated", "Failed to update meal")
    }

    fn try_update_meal(&mut self, meal_id: RecordId, patch: MealPatch) -> SyncResult<Meal> {
        let user = self.core.require_user()?;
        ensure_patch(patch.is_empty())?;
        let patch = MealPatch {
            meal_type: patch.meal_type,
            food_name: patched_text(&patch.food_name, "food name")?,
            quantity: patched_text(&patch.quantity, "quantity")?,
            time: patched_optional_text(&patch.time),
        };
        let mut meal = require_known(&self.state.meals, Table::Meals, meal_id)?.clone();

        update_record(self.core.store(), Table::Meals, meal_id, user, &patch)?;
        patch.apply_to(&mut meal);
        self.state.meals.upsert(meal.clone());
        self.persist(user);
        Ok(meal)
    }

    pub fn delete_meal(&mut self, meal_id: RecordId) -> SyncResult<()> {
        let outcome = self.try_delete_meal(meal_id);
        self.core
            .report("delete_meal", outcome, "Meal deleted", "Failed to delete meal")
    }

    fn try_delete_meal(&mut self, meal_id: RecordId) -> SyncResult<()> {
        let user = self.core.require_user()?;
        require_known(&self.state.meals, Table::Meals, meal_id)?;
        self.core.store().delete(Table::Meals, meal_id, user)?;
        self.state.meals.remove(meal_id);
        self.state
            .substitutions
            .remove_children_of(&HashSet::from([meal_id]));
        self.persist(user);
        Ok(())
    }

    pub fn add_substitution(
        &mut self,
        meal_id: RecordId,
        draft: SubstitutionDraft,
    ) -> SyncResult<FoodSubstitution> {
        let outcome = self.try_add_substitution(meal_id, draft);
        self.core.report(
            "add_substitution",
            outcome,
            "Substitution added",
            "Failed to add substitution",
        )
    }

    fn try_add_substitution(
        &mut self,
        meal_id: RecordId,
        draft: SubstitutionDraft,
    ) -> SyncResult<FoodSubstitution> {
        let user = self.core.require_user()?;
        let draft = SubstitutionDraft {
            substitute_name: required_text(&draft.substitute_name, "substitute name")?,
            quantity: required_text(&draft.quantity, "quantity")?,
        };
        require_known(&self.state.meals, Table::Meals, meal_id)?;

        let substitution: FoodSubstitution = insert_record(
            self.core.store(),
            Table::FoodSubstitutions,
            user,
            Some(meal_id),
            &draft,
        )?;
        self.state.substitutions.upsert(substitution.clone());
        self.persist(user);
        Ok(substitution)
    }

    pub fn update_substitution(
        &mut self,
        substitution_id: RecordId,
        patch: SubstitutionPatch,
    ) -> SyncResult<FoodSubstitution> {
        let outcome = self.try_update_substitution(substitution_id, patch);
        self.core.report(
            "update_substitution",
            outcome,
            "Substitution updated",
            "Failed to update substitution",
        )
    }

    fn try_update_substitution(
        &mut self,
        substitution_id: RecordId,
        patch: SubstitutionPatch,
    ) -> SyncResult<FoodSubstitution> {
        let user = self.core.require_user()?;
        ensure_patch(patch.is_empty())?;
        let patch = SubstitutionPatch {
            substitute_name: patched_text(&patch.substitute_name, "substitute name")?,
            quantity: patched_text(&patch.quantity, "quantity")?,
        };
        let mut substitution = require_known(
            &self.state.substitutions,
            Table::FoodSubstitutions,
            substitution_id,
        )?
        .clone();

        update_record(
            self.core.store(),
            Table::FoodSubstitutions,
            substitution_id,
            user,
            &patch,
        )?;
        patch.apply_to(&mut substitution);
        self.state.substitutions.upsert(substitution.clone());
        self.persist(user);
        Ok(substitution)
    }

    pub fn delete_substitution(&mut self, substitution_id: RecordId) -> SyncResult<()> {
        let outcome = self.try_delete_substitution(substitution_id);
        self.core.report(
            "delete_substitution",
            outcome,
            "Substitution deleted",
            "Failed to delete substitution",
        )
    }

    fn try_delete_substitution(&mut self, substitution_id: RecordId) -> SyncResult<()> {
        let user = self.core.require_user()?;
        require_known(
            &self.state.substitutions,
            Table::FoodSubstitutions,
            substitution_id,
        )?;
        self.core
            .store()
            .delete(Table::FoodSubstitutions, substitution_id, user)?;
        self.state.substitutions.remove(substitution_id);
        self.persist(user);
        Ok(())
    }

    /// Adds the entry for `date`. A second entry for the same date is
    /// rejected without touching the store.
    pub fn add_diary_entry(
        &mut self,
        date: NaiveDate,
        draft: DiaryDraft,
    ) -> SyncResult<DiaryEntry> {
        let outcome = self.try_add_diary_entry(date, draft);
        let failure_message = diary_failure_message(&outcome, "Failed to save diary entry");
        self.core
            .report("add_diary_entry", outcome, "Diary entry saved", failure_message)
    }

    fn try_add_diary_entry(&mut self, date: NaiveDate, draft: DiaryDraft) -> SyncResult<DiaryEntry> {
        let user = self.core.require_user()?;
        if self.state.entry_for_date(date).is_some() {
            return Err(SyncError::DuplicateDiaryDate(date));
        }
        let draft = DiaryDraft {
            diary_text: normalize_optional_text(draft.diary_text.as_deref()),
            free_meal_description: normalize_optional_text(draft.free_meal_description.as_deref()),
            notes: normalize_optional_text(draft.notes.as_deref()),
            ..draft
        };
        let payload = DiaryInsert {
            date,
            draft: &draft,
        };

        let entry: DiaryEntry =
            insert_record(self.core.store(), Table::DiaryEntries, user, None, &payload)?;
        self.state.diary.upsert(entry.clone());
        self.persist(user);
        Ok(entry)
    }

    pub fn update_diary_entry(
        &mut self,
        entry_id: RecordId,
        patch: DiaryPatch,
    ) -> SyncResult<DiaryEntry> {
        let outcome = self.try_update_diary_entry(entry_id, patch);
        let failure_message = diary_failure_message(&outcome, "Failed to update diary entry");
        self.core.report(
            "update_diary_entry",
            outcome,
            "Diary entry updated",
            failure_message,
        )
    }

    fn try_update_diary_entry(
        &mut self,
        entry_id: RecordId,
        patch: DiaryPatch,
    ) -> SyncResult<DiaryEntry> {
        let user = self.core.require_user()?;
        ensure_patch(patch.is_empty())?;
        let mut entry = require_known(&self.state.diary, Table::DiaryEntries, entry_id)?.clone();
        if let Some(date) = patch.date {
            if self
                .state
                .entry_for_date(date)
                .is_some_and(|other| other.id != entry_id)
            {
                return Err(SyncError::DuplicateDiaryDate(date));
            }
        }
        let patch = DiaryPatch {
            diary_text: patched_optional_text(&patch.diary_text),
            free_meal_description: patched_optional_text(&patch.free_meal_description),
            notes: patched_optional_text(&patch.notes),
            ..patch
        };

        update_record(self.core.store(), Table::DiaryEntries, entry_id, user, &patch)?;
        patch.apply_to(&mut entry);
        self.state.diary.upsert(entry.clone());
        self.persist(user);
        Ok(entry)
    }

    pub fn delete_diary_entry(&mut self, entry_id: RecordId) -> SyncResult<()> {
        let outcome = self.try_delete_diary_entry(entry_id);
        self.core.report(
            "delete_diary_entry",
            outcome,
            "Diary entry deleted",
            "Failed to delete diary entry",
        )
    }

    fn try_delete_diary_entry(&mut self, entry_id: RecordId) -> SyncResult<()> {
        let user = self.core.require_user()?;
        require_known(&self.state.diary, Table::DiaryEntries, entry_id)?;
        self.core
            .store()
            .delete(Table::DiaryEntries, entry_id, user)?;
        self.state.diary.remove(entry_id);
        self.persist(user);
        Ok(())
    }

    /// Meal items in creation order.
    pub fn meals(&self) -> Vec<&Meal> {
        self.state.meals.iter().collect()
    }

    /// Meal items with their substitutions, as cached.
    pub fn meal_trees(&self) -> Vec<MealTree> {
        self.state.meal_trees()
    }

    pub fn meals_by_type(&self, meal_type: MealType) -> Vec<&Meal> {
        self.state
            .meals
            .iter()
            .filter(|meal| meal.meal_type == meal_type)
            .collect()
    }

    pub fn substitutions_for_meal(&self, meal_id: RecordId) -> Vec<&FoodSubstitution> {
        self.state.substitutions.children_of(meal_id)
    }

    /// Diary entries, newest date first.
    pub fn diary_entries(&self) -> Vec<&DiaryEntry> {
        let mut entries: Vec<&DiaryEntry> = self.state.diary.iter().collect();
        entries.sort_by(|left, right| right.date.cmp(&left.date));
        entries
    }

    pub fn diary_entry_by_date(&self, date: NaiveDate) -> Option<&DiaryEntry> {
        self.state.entry_for_date(date)
    }

    /// Percent of tracked goals met in the seven days starting at `start`,
    /// rounded half up. Days without an entry do not count; no entries at all
    /// yields 0.
    pub fn weekly_adherence(&self, start: NaiveDate) -> u32 {
        let end = start
            .checked_add_days(Days::new(ADHERENCE_WINDOW_DAYS - 1))
            .unwrap_or(NaiveDate::MAX);
        let (entries, completed) = self
            .state
            .diary
            .iter()
            .filter(|entry| entry.date >= start && entry.date <= end)
            .fold((0_u32, 0_u32), |(entries, completed), entry| {
                (entries + 1, completed + entry.goals_completed())
            });
        adherence_percent(completed, entries * TRACKED_GOALS)
    }

    pub fn adherence_band(percent: u32) -> AdherenceBand {
        AdherenceBand::from_percent(percent)
    }

    /// Entries that used a free meal, newest first.
    pub fn free_meal_history(&self) -> Vec<&DiaryEntry> {
        self.diary_entries()
            .into_iter()
            .filter(|entry| entry.free_meal)
            .collect()
    }
}

fn diary_failure_message<T>(outcome: &SyncResult<T>, fallback: &'static str) -> &'static str {
    match outcome {
        Err(SyncError::DuplicateDiaryDate(_)) => "A diary entry already exists for this date",
        _ => fallback,
    }
}

/// `completed / total` as an integer percent, rounded half up.
fn adherence_percent(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (completed * 200 + total) / (2 * total)
}
