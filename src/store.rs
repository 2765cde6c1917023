use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::dispatch_events;
use crate::events::{
    GoalCascadeDeleted, GoalCreated, GoalInfoUpdated, GoalsLoaded, StepCreated, StepDeleted,
    StepUpdated, StepsRescheduled, StoreEvent,
};
use crate::index::StepIndex;
use crate::types::{Goal, GoalId, Step, StepId};

/// Client-side copy of the user's goals plus the calendar views derived from it.
///
/// `goals` is the canonical list and keeps steps whose date does not parse;
/// `index` only holds steps that have a day. The selected-day projection is
/// recomputed from the index after every event, never patched.
#[derive(Debug, Default)]
pub struct CalendarStore {
    pub(crate) goals: BTreeMap<GoalId, Goal>,
    pub(crate) index: StepIndex,
    selected_day: Option<NaiveDate>,
    selected: Vec<Step>,
}

impl CalendarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: StoreEvent) {
        let kind = event.kind();
        dispatch_events!(
            event,
            self,
            GoalsLoaded,
            GoalCreated,
            StepCreated,
            StepUpdated,
            StepDeleted,
            GoalCascadeDeleted,
            StepsRescheduled,
            GoalInfoUpdated,
        );
        self.refresh_selection();
        tracing::debug!(
            event = kind,
            goals = self.goals.len(),
            indexed = self.index.len(),
            selected = self.selected.len(),
            "store event applied"
        );
    }

    pub fn select_day(&mut self, day: NaiveDate) -> &[Step] {
        self.selected_day = Some(day);
        self.refresh_selection();
        &self.selected
    }

    pub fn clear_selection(&mut self) {
        self.selected_day = None;
        self.refresh_selection();
    }

    pub fn selected_day(&self) -> Option<NaiveDate> {
        self.selected_day
    }

    pub fn selected_steps(&self) -> &[Step] {
        &self.selected
    }

    /// `(done, total)` for `day`.
    pub fn day_progress(&self, day: NaiveDate) -> (usize, usize) {
        let steps = self.index.steps_for_day(day);
        let done = steps.iter().filter(|s| s.is_done()).count();
        (done, steps.len())
    }

    pub fn steps_for_day(&self, day: NaiveDate) -> Vec<Step> {
        self.index.steps_for_day(day)
    }

    pub fn goals(&self) -> impl Iterator<Item = &Goal> {
        self.goals.values()
    }

    pub fn goal(&self, id: GoalId) -> Option<&Goal> {
        self.goals.get(&id)
    }

    /// Look a step up in the canonical list, including undated ones.
    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.goals
            .values()
            .flat_map(|g| g.steps.iter())
            .find(|s| s.id == id)
    }

    pub fn index(&self) -> &StepIndex {
        &self.index
    }

    /// Record `step` under `goal`, refreshing the goal's metadata from the
    /// server copy. Any stale copy under a different goal is dropped.
    pub(crate) fn place_step(&mut self, goal: &Goal, step: Step) {
        self.detach_from_other_goals(step.id, goal.id);
        match self.goals.get_mut(&goal.id) {
            Some(known) => {
                known.refresh_metadata(goal);
                known.upsert_step(step);
            }
            None => {
                let mut fresh = goal.clone();
                fresh.upsert_step(step);
                self.goals.insert(fresh.id, fresh);
            }
        }
    }

    /// Record `step` under the goal it names. When that goal is unknown, the
    /// copy already held elsewhere is updated in place so the id stays
    /// addressable.
    pub(crate) fn reassign_step(&mut self, step: Step) {
        if self.goals.contains_key(&step.goal_id) {
            self.detach_from_other_goals(step.id, step.goal_id);
            if let Some(goal) = self.goals.get_mut(&step.goal_id) {
                goal.upsert_step(step);
            }
            return;
        }
        let existing = self
            .goals
            .values_mut()
            .flat_map(|g| g.steps.iter_mut())
            .find(|s| s.id == step.id);
        match existing {
            Some(existing) => *existing = step,
            None => tracing::debug!(
                step_id = step.id,
                goal_id = step.goal_id,
                "step refers to an unknown goal, calendar only"
            ),
        }
    }

    pub(crate) fn detach_from_other_goals(&mut self, step_id: StepId, keep: GoalId) {
        for goal in self.goals.values_mut().filter(|g| g.id != keep) {
            goal.remove_step(step_id);
        }
    }

    fn refresh_selection(&mut self) {
        self.selected = match self.selected_day {
            Some(day) => self.index.steps_for_day(day),
            None => Vec::new(),
        };
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::index::tests::step;
    use crate::types::StepStatus;

    pub(crate) fn goal(id: GoalId, steps: Vec<Step>) -> Goal {
        Goal {
            id,
            title: format!("Goal {id}"),
            description: String::new(),
            color: format!("#00000{}", id % 10),
            progress: 0.0,
            created_at: "2025-04-01T00:00:00".to_string(),
            updated_at: "2025-04-01T00:00:00".to_string(),
            steps,
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ids(steps: &[Step]) -> Vec<StepId> {
        steps.iter().map(|s| s.id).collect()
    }

    fn loaded() -> CalendarStore {
        let mut store = CalendarStore::new();
        store.apply(StoreEvent::goals_loaded(vec![
            goal(
                1,
                vec![
                    step(1, 1, "2025-05-01T00:00:00", StepStatus::Planned),
                    step(2, 1, "2025-05-01T00:00:00", StepStatus::Done),
                    step(3, 1, "2025-05-02T00:00:00", StepStatus::Planned),
                ],
            ),
            goal(
                2,
                vec![
                    step(10, 2, "2025-05-01T00:00:00", StepStatus::Planned),
                    step(11, 2, "whenever", StepStatus::Planned),
                ],
            ),
        ]));
        store
    }

    #[test]
    fn loading_builds_index_and_keeps_undated_steps() {
        let store = loaded();
        assert_eq!(ids(&store.steps_for_day(day("2025-05-01"))), vec![1, 10, 2]);
        assert_eq!(store.index().len(), 4);
        assert!(store.step(11).is_some());
        assert_eq!(store.goals().count(), 2);
    }

    #[test]
    fn selection_follows_every_event() {
        let mut store = loaded();
        assert_eq!(ids(store.select_day(day("2025-05-01"))), vec![1, 10, 2]);

        let mut moved = step(1, 1, "2025-05-02T00:00:00", StepStatus::Planned);
        moved.title = "moved".into();
        store.apply(StoreEvent::step_updated(goal(1, vec![moved.clone()]), moved));
        assert_eq!(ids(store.selected_steps()), vec![10, 2]);

        store.apply(StoreEvent::step_created(
            goal(2, vec![]),
            step(12, 2, "2025-05-01T00:00:00", StepStatus::Planned),
        ));
        assert_eq!(ids(store.selected_steps()), vec![10, 12, 2]);

        store.apply(StoreEvent::goal_cascade_deleted(2));
        assert_eq!(ids(store.selected_steps()), vec![2]);

        store.clear_selection();
        assert!(store.selected_steps().is_empty());
        assert_eq!(store.selected_day(), None);
    }

    #[test]
    fn step_created_updates_canonical_goal() {
        let mut store = loaded();
        let mut refreshed = goal(1, vec![]);
        refreshed.progress = 25.0;
        store.apply(StoreEvent::step_created(
            refreshed,
            step(4, 1, "2025-05-03T00:00:00", StepStatus::Planned),
        ));
        let g = store.goal(1).unwrap();
        assert_eq!(g.progress, 25.0);
        assert_eq!(ids(&g.steps), vec![1, 2, 3, 4]);
        assert_eq!(ids(&store.steps_for_day(day("2025-05-03"))), vec![4]);
    }

    #[test]
    fn step_created_for_unknown_goal_adds_it() {
        let mut store = loaded();
        let new_step = step(30, 7, "2025-05-04T00:00:00", StepStatus::Planned);
        store.apply(StoreEvent::step_created(goal(7, vec![new_step.clone()]), new_step));
        assert_eq!(ids(&store.goal(7).unwrap().steps), vec![30]);
        assert_eq!(store.index().day_of(30), Some(day("2025-05-04")));
    }

    #[test]
    fn step_deleted_with_and_without_day() {
        let mut store = loaded();
        store.apply(StoreEvent::step_deleted(2, Some(day("2025-05-01"))));
        store.apply(StoreEvent::step_deleted(3, None));
        assert_eq!(ids(&store.steps_for_day(day("2025-05-01"))), vec![1, 10]);
        assert!(store.steps_for_day(day("2025-05-02")).is_empty());
        assert_eq!(ids(&store.goal(1).unwrap().steps), vec![1]);

        // Unknown ids are ignored.
        store.apply(StoreEvent::step_deleted(999, None));
        assert_eq!(store.index().len(), 2);
    }

    #[test]
    fn reschedule_moves_steps_and_updates_goals() {
        let mut store = loaded();
        store.select_day(day("2025-05-01"));
        store.apply(StoreEvent::steps_rescheduled(vec![
            step(1, 1, "2025-05-07T00:00:00", StepStatus::Planned),
            step(10, 2, "2025-05-07T00:00:00", StepStatus::Planned),
        ]));
        assert_eq!(ids(store.selected_steps()), vec![2]);
        assert_eq!(ids(&store.steps_for_day(day("2025-05-07"))), vec![1, 10]);
        assert_eq!(store.step(1).unwrap().date, "2025-05-07T00:00:00");
    }

    #[test]
    fn reschedule_into_unknown_goal_keeps_step_addressable() {
        let mut store = loaded();
        store.apply(StoreEvent::steps_rescheduled(vec![step(
            1,
            9,
            "2025-05-03T00:00:00",
            StepStatus::Done,
        )]));
        assert_eq!(store.index().day_of(1), Some(day("2025-05-03")));
        let canonical = store.step(1).unwrap();
        assert_eq!(canonical.date, "2025-05-03T00:00:00");
        assert_eq!(canonical.status, StepStatus::Done);
        assert!(store.goal(9).is_none());
    }

    fn owners(store: &CalendarStore, id: StepId) -> Vec<GoalId> {
        store
            .goals()
            .filter(|g| g.steps.iter().any(|s| s.id == id))
            .map(|g| g.id)
            .collect()
    }

    #[test]
    fn goal_info_update_takes_over_steps_from_other_goals() {
        let mut store = loaded();
        let mut moved = step(1, 2, "2025-05-01T00:00:00", StepStatus::Done);
        moved.title = "now under goal 2".into();
        store.apply(StoreEvent::goal_info_updated(goal(2, vec![moved])));
        assert_eq!(owners(&store, 1), vec![2]);
        assert_eq!(store.step(1).unwrap().status, StepStatus::Done);
        assert_eq!(ids(&store.goal(1).unwrap().steps), vec![2, 3]);
    }

    #[test]
    fn goal_created_takes_over_steps_from_other_goals() {
        let mut store = loaded();
        store.apply(StoreEvent::goal_created(goal(
            4,
            vec![step(3, 4, "2025-05-02T00:00:00", StepStatus::Done)],
        )));
        assert_eq!(owners(&store, 3), vec![4]);
        assert_eq!(store.step(3).unwrap().status, StepStatus::Done);
        assert_eq!(store.index().len(), 4);
    }

    #[test]
    fn goal_info_update_replaces_goal_steps() {
        let mut store = loaded();
        store.apply(StoreEvent::goal_info_updated(goal(
            1,
            vec![step(3, 1, "2025-05-05T00:00:00", StepStatus::Done)],
        )));
        assert_eq!(ids(&store.steps_for_day(day("2025-05-01"))), vec![10]);
        assert!(store.steps_for_day(day("2025-05-02")).is_empty());
        assert_eq!(ids(&store.steps_for_day(day("2025-05-05"))), vec![3]);

        // A goal whose steps were all removed empties out of the calendar.
        store.apply(StoreEvent::goal_info_updated(goal(1, vec![])));
        assert!(store.steps_for_day(day("2025-05-05")).is_empty());
        assert!(store.goal(1).unwrap().steps.is_empty());
    }

    #[test]
    fn goal_created_indexes_its_steps() {
        let mut store = loaded();
        store.apply(StoreEvent::goal_created(goal(
            3,
            vec![
                step(20, 3, "2025-05-01T00:00:00", StepStatus::Done),
                step(21, 3, "2025-05-01T00:00:00", StepStatus::Planned),
            ],
        )));
        assert_eq!(ids(&store.steps_for_day(day("2025-05-01"))), vec![1, 10, 21, 2, 20]);
    }

    #[test]
    fn day_progress_counts_done_steps() {
        let store = loaded();
        assert_eq!(store.day_progress(day("2025-05-01")), (1, 3));
        assert_eq!(store.day_progress(day("2025-06-01")), (0, 0));
    }

    #[test]
    fn reload_discards_previous_state() {
        let mut store = loaded();
        store.select_day(day("2025-05-02"));
        store.apply(StoreEvent::goals_loaded(vec![goal(
            5,
            vec![step(50, 5, "2025-05-02T00:00:00", StepStatus::Planned)],
        )]));
        assert_eq!(ids(store.selected_steps()), vec![50]);
        assert!(store.goal(1).is_none());
        assert_eq!(store.index().len(), 1);
    }
}
