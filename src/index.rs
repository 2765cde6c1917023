//! Day-bucketed index of steps
//!
//! Derived cache mapping a calendar day to the steps scheduled on it. It is
//! rebuilt from the bulk goals fetch at session start and patched in place
//! afterwards. Within a bucket, planned steps come before done ones and ties
//! are broken by ascending id.
//!
//! None of the operations fail. A step whose date does not parse has no
//! bucket, and removing an unknown id does nothing.

use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::types::{GoalId, Step, StepId};

#[derive(Clone, Debug, Default)]
pub struct StepIndex {
    buckets: BTreeMap<NaiveDate, Vec<Step>>,
    // Where each indexed id lives; keeps removal from scanning every day.
    placed: HashMap<StepId, NaiveDate>,
}

fn sort_bucket(bucket: &mut [Step]) {
    bucket.sort_by(|a, b| a.status.cmp(&b.status).then(a.id.cmp(&b.id)));
}

impl StepIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps<'a>(steps: impl IntoIterator<Item = &'a Step>) -> Self {
        let mut index = Self::new();
        index.rebuild_from_steps(steps);
        index
    }

    /// Drop everything and index `steps` from scratch.
    pub fn rebuild_from_steps<'a>(&mut self, steps: impl IntoIterator<Item = &'a Step>) {
        self.buckets.clear();
        self.placed.clear();

        for step in steps {
            if let Some(previous) = self.placed.remove(&step.id) {
                self.detach(step.id, previous);
            }
            if let Some(day) = self.day_for(step) {
                self.buckets.entry(day).or_default().push(step.clone());
                self.placed.insert(step.id, day);
            }
        }

        for bucket in self.buckets.values_mut() {
            sort_bucket(bucket);
        }
        tracing::debug!(
            steps = self.placed.len(),
            days = self.buckets.len(),
            "step index rebuilt"
        );
    }

    /// Add a step under its day. An older copy of the same id is dropped first.
    ///
    /// Returns the day the step landed on.
    pub fn insert_step(&mut self, step: Step) -> Option<NaiveDate> {
        if let Some(previous) = self.placed.remove(&step.id) {
            self.detach(step.id, previous);
        }
        let day = self.day_for(&step)?;
        self.placed.insert(step.id, day);
        let bucket = self.buckets.entry(day).or_default();
        bucket.push(step);
        sort_bucket(bucket);
        Some(day)
    }

    /// Remove the step with `id`.
    ///
    /// `day_hint` is where the caller believes the step sits. A stale hint
    /// falls back to the index's own record.
    pub fn remove_step(&mut self, id: StepId, day_hint: Option<NaiveDate>) -> Option<Step> {
        if let Some(day) = day_hint {
            if let Some(step) = self.detach(id, day) {
                self.placed.remove(&id);
                return Some(step);
            }
        }
        let Some(day) = self.placed.remove(&id) else {
            tracing::debug!(step_id = id, "remove_step: id not indexed");
            return None;
        };
        self.detach(id, day)
    }

    /// Remove every step that belongs to `goal_id`. Returns how many went.
    pub fn remove_steps_by_goal(&mut self, goal_id: GoalId) -> usize {
        let mut removed = 0;
        let placed = &mut self.placed;
        // Filtering keeps the remaining order intact, so no re-sort is needed.
        self.buckets.retain(|_, bucket| {
            bucket.retain(|s| {
                if s.goal_id != goal_id {
                    return true;
                }
                placed.remove(&s.id);
                removed += 1;
                false
            });
            !bucket.is_empty()
        });
        removed
    }

    /// Replace the step `old_id` with `new_step`, wherever each one lives.
    pub fn replace_step(&mut self, old_id: StepId, new_step: Step) -> Option<NaiveDate> {
        self.remove_step(old_id, None);
        self.insert_step(new_step)
    }

    /// Move every step in `steps` to its (possibly new) day.
    ///
    /// Each touched bucket is sorted once at the end. Returns the days touched,
    /// both vacated and filled.
    pub fn bulk_replace(&mut self, steps: impl IntoIterator<Item = Step>) -> BTreeSet<NaiveDate> {
        let mut touched = BTreeSet::new();

        for step in steps {
            if let Some(previous) = self.placed.remove(&step.id) {
                self.detach(step.id, previous);
                touched.insert(previous);
            }
            if let Some(day) = self.day_for(&step) {
                self.placed.insert(step.id, day);
                self.buckets.entry(day).or_default().push(step);
                touched.insert(day);
            }
        }

        for day in &touched {
            if let Some(bucket) = self.buckets.get_mut(day) {
                sort_bucket(bucket);
            }
        }
        touched
    }

    /// Snapshot of the steps scheduled on `day`, in display order.
    pub fn steps_for_day(&self, day: NaiveDate) -> Vec<Step> {
        self.buckets.get(&day).cloned().unwrap_or_default()
    }

    pub fn count_for_day(&self, day: NaiveDate) -> usize {
        self.buckets.get(&day).map_or(0, Vec::len)
    }

    /// Distinct goal colors on `day`, sorted.
    pub fn colors_for_day(&self, day: NaiveDate) -> Vec<String> {
        let colors: BTreeSet<&str> = self
            .buckets
            .get(&day)
            .into_iter()
            .flatten()
            .map(|s| s.color.as_str())
            .collect();
        colors.into_iter().map(str::to_string).collect()
    }

    /// Days that currently hold at least one step, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.buckets.keys().copied()
    }

    pub fn days_in_month(&self, year: i32, month: u32) -> Vec<NaiveDate> {
        self.days()
            .filter(|d| d.year() == year && d.month() == month)
            .collect()
    }

    pub fn day_of(&self, id: StepId) -> Option<NaiveDate> {
        self.placed.get(&id).copied()
    }

    pub fn contains(&self, id: StepId) -> bool {
        self.placed.contains_key(&id)
    }

    /// Number of indexed steps.
    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    fn day_for(&self, step: &Step) -> Option<NaiveDate> {
        let day = step.day();
        if day.is_none() {
            tracing::warn!(
                step_id = step.id,
                date = %step.date,
                "step date does not parse, leaving it off the calendar"
            );
        }
        day
    }

    // Pull `id` out of the bucket for `day`, dropping the bucket if it empties.
    // Does not touch `placed`.
    fn detach(&mut self, id: StepId, day: NaiveDate) -> Option<Step> {
        let bucket = self.buckets.get_mut(&day)?;
        let pos = bucket.iter().position(|s| s.id == id)?;
        let step = bucket.remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&day);
        }
        Some(step)
    }
}
