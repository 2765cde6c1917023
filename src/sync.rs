//! User actions: one or two API calls, then one store event.
//!
//! The store is only touched from the success branch of each flow, so a
//! failed call leaves the calendar exactly as it was.

use chrono::NaiveDate;

use crate::client::GoalApi;
use crate::error::{ServiceError, ServiceResult};
use crate::events::StoreEvent;
use crate::store::CalendarStore;
use crate::types::{
    BulkStep, Goal, GoalId, GoalPatch, NewGoal, NewGoalStep, NewStep, Step, StepId, StepPatch,
    format_day_for_create,
};

pub struct Synchronizer<A> {
    api: A,
    store: CalendarStore,
}

impl<A: GoalApi> Synchronizer<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            store: CalendarStore::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &CalendarStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CalendarStore {
        &mut self.store
    }

    /// Load every goal with its steps, replacing whatever the store held.
    pub async fn bootstrap(&mut self) -> ServiceResult<usize> {
        let goals = self.api.goals_with_steps().await?;
        let count = goals.len();
        self.store.apply(StoreEvent::goals_loaded(goals));
        tracing::info!(goals = count, steps = self.store.index().len(), "calendar loaded");
        Ok(count)
    }

    /// The create endpoint does not return an id, so the whole list is refetched.
    pub async fn create_goal(
        &mut self,
        title: String,
        description: String,
        steps: Vec<NewGoalStep>,
    ) -> ServiceResult<String> {
        if title.trim().is_empty() {
            return Err(ServiceError::InvalidInput("goal title is empty".to_string()));
        }
        let message = self
            .api
            .create_goal(NewGoal {
                title,
                description,
                steps,
            })
            .await?;
        let goals = self.api.goals_with_steps().await?;
        self.store.apply(StoreEvent::goals_loaded(goals));
        Ok(message)
    }

    pub async fn generate_goal(&mut self, prompt: &str) -> ServiceResult<Goal> {
        if prompt.trim().is_empty() {
            return Err(ServiceError::InvalidInput("prompt is empty".to_string()));
        }
        let goal_id = self.api.generate_goal(prompt.to_string()).await?;
        let goal = self.api.goal_info(goal_id).await?;
        self.store.apply(StoreEvent::goal_created(goal.clone()));
        Ok(goal)
    }

    pub async fn add_step(
        &mut self,
        goal_id: GoalId,
        title: String,
        description: Option<String>,
        day: Option<NaiveDate>,
    ) -> ServiceResult<Step> {
        if title.trim().is_empty() {
            return Err(ServiceError::InvalidInput("step title is empty".to_string()));
        }
        let new_step = NewStep {
            title,
            description,
            date: day.map(format_day_for_create),
        };
        let step_id = self.api.add_step(goal_id, new_step).await?;
        let (goal, step) = self.api.goal_step_detail(goal_id, step_id).await?;
        self.store
            .apply(StoreEvent::step_created(goal, step.clone()));
        Ok(step)
    }

    /// Add several steps at once, then reload the goal they belong to.
    pub async fn add_steps(&mut self, goal_id: GoalId, steps: Vec<BulkStep>) -> ServiceResult<Goal> {
        if steps.is_empty() {
            return Err(ServiceError::InvalidInput("no steps given".to_string()));
        }
        self.api.add_steps_bulk(goal_id, steps).await?;
        let goal = self.api.goal_info(goal_id).await?;
        self.store.apply(StoreEvent::goal_info_updated(goal.clone()));
        Ok(goal)
    }

    pub async fn update_step(&mut self, step_id: StepId, patch: StepPatch) -> ServiceResult<Step> {
        if patch.is_empty() {
            return Err(ServiceError::InvalidInput("nothing to update".to_string()));
        }
        let goal_id = self.known_step(step_id)?.goal_id;
        self.api.update_step(step_id, patch).await?;
        let (goal, step) = self.api.goal_step_detail(goal_id, step_id).await?;
        self.store
            .apply(StoreEvent::step_updated(goal, step.clone()));
        Ok(step)
    }

    /// Flip a step between planned and done.
    pub async fn toggle_step(&mut self, step_id: StepId) -> ServiceResult<Step> {
        let status = self.known_step(step_id)?.status.toggled();
        self.update_step(
            step_id,
            StepPatch {
                status: Some(status),
                ..StepPatch::default()
            },
        )
        .await
    }

    pub async fn delete_step(&mut self, step_id: StepId) -> ServiceResult<String> {
        let day = self.store.index().day_of(step_id);
        let message = self.api.delete_step(step_id).await?;
        self.store.apply(StoreEvent::step_deleted(step_id, day));
        Ok(message)
    }

    pub async fn delete_goal(&mut self, goal_id: GoalId) -> ServiceResult<String> {
        let message = self.api.delete_goal(goal_id).await?;
        self.store.apply(StoreEvent::goal_cascade_deleted(goal_id));
        Ok(message)
    }

    pub async fn update_goal(&mut self, goal_id: GoalId, patch: GoalPatch) -> ServiceResult<Goal> {
        if patch.is_empty() {
            return Err(ServiceError::InvalidInput("nothing to update".to_string()));
        }
        self.api.update_goal(goal_id, patch).await?;
        let goal = self.api.goal_info(goal_id).await?;
        self.store.apply(StoreEvent::goal_info_updated(goal.clone()));
        Ok(goal)
    }

    /// Ask the service to move steps around a described problem.
    ///
    /// Returns the server's explanation and the fresh copies of moved steps.
    pub async fn reschedule(&mut self, problem: &str) -> ServiceResult<(String, Vec<Step>)> {
        if problem.trim().is_empty() {
            return Err(ServiceError::InvalidInput("problem description is empty".to_string()));
        }
        let (message, ids) = self.api.reschedule(problem.to_string()).await?;
        if ids.is_empty() {
            return Ok((message, Vec::new()));
        }
        let steps = self.api.steps_bulk(ids).await?;
        self.store
            .apply(StoreEvent::steps_rescheduled(steps.clone()));
        Ok((message, steps))
    }

    fn known_step(&self, step_id: StepId) -> ServiceResult<&Step> {
        self.store
            .step(step_id)
            .ok_or_else(|| ServiceError::InvalidInput(format!("unknown step {}", step_id)))
    }
}
