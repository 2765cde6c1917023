//! Store mutation events
//!
//! Every change to the client's goal/step state arrives as one of these
//! variants, built from a successful server response. Each variant wraps a
//! payload type of the same name that knows how to apply itself to the
//! [`CalendarStore`]; `CalendarStore::apply` routes through the
//! [`dispatch_events!`](crate::dispatch_events) handler table.

use chrono::NaiveDate;

use crate::store::CalendarStore;
use crate::types::{Goal, GoalId, Step, StepId};

#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    /// Full goal list fetched, at login or on explicit refresh.
    GoalsLoaded(GoalsLoaded),
    GoalCreated(GoalCreated),
    StepCreated(StepCreated),
    StepUpdated(StepUpdated),
    StepDeleted(StepDeleted),
    GoalCascadeDeleted(GoalCascadeDeleted),
    StepsRescheduled(StepsRescheduled),
    GoalInfoUpdated(GoalInfoUpdated),
}

impl StoreEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreEvent::GoalsLoaded(_) => "goals_loaded",
            StoreEvent::GoalCreated(_) => "goal_created",
            StoreEvent::StepCreated(_) => "step_created",
            StoreEvent::StepUpdated(_) => "step_updated",
            StoreEvent::StepDeleted(_) => "step_deleted",
            StoreEvent::GoalCascadeDeleted(_) => "goal_cascade_deleted",
            StoreEvent::StepsRescheduled(_) => "steps_rescheduled",
            StoreEvent::GoalInfoUpdated(_) => "goal_info_updated",
        }
    }

    pub fn goals_loaded(goals: Vec<Goal>) -> Self {
        StoreEvent::GoalsLoaded(GoalsLoaded { goals })
    }

    pub fn goal_created(goal: Goal) -> Self {
        StoreEvent::GoalCreated(GoalCreated { goal })
    }

    pub fn step_created(goal: Goal, step: Step) -> Self {
        StoreEvent::StepCreated(StepCreated { goal, step })
    }

    pub fn step_updated(goal: Goal, step: Step) -> Self {
        StoreEvent::StepUpdated(StepUpdated { goal, step })
    }

    pub fn step_deleted(step_id: StepId, day: Option<NaiveDate>) -> Self {
        StoreEvent::StepDeleted(StepDeleted { step_id, day })
    }

    pub fn goal_cascade_deleted(goal_id: GoalId) -> Self {
        StoreEvent::GoalCascadeDeleted(GoalCascadeDeleted { goal_id })
    }

    pub fn steps_rescheduled(steps: Vec<Step>) -> Self {
        StoreEvent::StepsRescheduled(StepsRescheduled { steps })
    }

    pub fn goal_info_updated(goal: Goal) -> Self {
        StoreEvent::GoalInfoUpdated(GoalInfoUpdated { goal })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GoalsLoaded {
    pub goals: Vec<Goal>,
}

impl GoalsLoaded {
    pub fn apply(self, store: &mut CalendarStore) {
        store.goals = self.goals.into_iter().map(|g| (g.id, g)).collect();
        let steps = store.goals.values().flat_map(|g| g.steps.iter());
        store.index.rebuild_from_steps(steps);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GoalCreated {
    pub goal: Goal,
}

impl GoalCreated {
    pub fn apply(self, store: &mut CalendarStore) {
        let steps = self.goal.steps.clone();
        for step in &steps {
            store.detach_from_other_goals(step.id, self.goal.id);
        }
        if let Some(previous) = store.goals.insert(self.goal.id, self.goal) {
            tracing::debug!(goal_id = previous.id, "goal created twice, replacing");
            store.index.remove_steps_by_goal(previous.id);
        }
        store.index.bulk_replace(steps);
    }
}

/// A new step together with its refreshed parent goal.
#[derive(Clone, Debug, PartialEq)]
pub struct StepCreated {
    pub goal: Goal,
    pub step: Step,
}

impl StepCreated {
    pub fn apply(self, store: &mut CalendarStore) {
        store.place_step(&self.goal, self.step.clone());
        store.index.insert_step(self.step);
    }
}

/// An edited step, possibly moved to another day, with its refreshed goal.
#[derive(Clone, Debug, PartialEq)]
pub struct StepUpdated {
    pub goal: Goal,
    pub step: Step,
}

impl StepUpdated {
    pub fn apply(self, store: &mut CalendarStore) {
        store.place_step(&self.goal, self.step.clone());
        store.index.replace_step(self.step.id, self.step);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepDeleted {
    pub step_id: StepId,
    /// Day the step was shown on, when the caller knows it.
    pub day: Option<NaiveDate>,
}

impl StepDeleted {
    pub fn apply(self, store: &mut CalendarStore) {
        for goal in store.goals.values_mut() {
            if goal.remove_step(self.step_id).is_some() {
                break;
            }
        }
        store.index.remove_step(self.step_id, self.day);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GoalCascadeDeleted {
    pub goal_id: GoalId,
}

impl GoalCascadeDeleted {
    pub fn apply(self, store: &mut CalendarStore) {
        store.goals.remove(&self.goal_id);
        let removed = store.index.remove_steps_by_goal(self.goal_id);
        tracing::debug!(goal_id = self.goal_id, removed, "goal steps removed");
    }
}

/// Fresh copies of the steps an AI reschedule touched.
#[derive(Clone, Debug, PartialEq)]
pub struct StepsRescheduled {
    pub steps: Vec<Step>,
}

impl StepsRescheduled {
    pub fn apply(self, store: &mut CalendarStore) {
        for step in &self.steps {
            store.reassign_step(step.clone());
        }
        store.index.bulk_replace(self.steps);
    }
}

/// A goal re-fetched with its full step list after an edit.
#[derive(Clone, Debug, PartialEq)]
pub struct GoalInfoUpdated {
    pub goal: Goal,
}

impl GoalInfoUpdated {
    pub fn apply(self, store: &mut CalendarStore) {
        let goal_id = self.goal.id;
        let steps = self.goal.steps.clone();
        for step in &steps {
            store.detach_from_other_goals(step.id, goal_id);
        }
        store.goals.insert(goal_id, self.goal);
        store.index.remove_steps_by_goal(goal_id);
        store.index.bulk_replace(steps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            StoreEvent::goals_loaded(vec![]).kind(),
            StoreEvent::step_deleted(1, None).kind(),
            StoreEvent::goal_cascade_deleted(1).kind(),
            StoreEvent::steps_rescheduled(vec![]).kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }
}
