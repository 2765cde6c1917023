use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type GoalId = i64;
pub type StepId = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Planned,
    Done,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Planned => "planned",
            StepStatus::Done => "done",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            StepStatus::Planned => StepStatus::Done,
            StepStatus::Done => StepStatus::Planned,
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "planned" => Ok(StepStatus::Planned),
            "done" => Ok(StepStatus::Done),
            _ => Err(format!("Unknown step status: {s}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub goal_id: GoalId,
    pub goal_name: String,
    pub color: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: StepStatus,
    pub date: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Step {
    /// Calendar day this step is scheduled on, if its date parses.
    pub fn day(&self) -> Option<NaiveDate> {
        parse_day(&self.date)
    }

    pub fn is_done(&self) -> bool {
        self.status == StepStatus::Done
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub color: String,
    pub progress: f64,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Goal {
    /// Copy everything but the step list from `other`.
    ///
    /// Single-step detail replies embed only the requested step, so callers
    /// refresh metadata without clobbering the known steps.
    pub fn refresh_metadata(&mut self, other: &Goal) {
        self.title = other.title.clone();
        self.description = other.description.clone();
        self.color = other.color.clone();
        self.progress = other.progress;
        self.created_at = other.created_at.clone();
        self.updated_at = other.updated_at.clone();
    }

    /// Insert or replace a step by id, keeping the step list ordered by id.
    pub fn upsert_step(&mut self, step: Step) {
        match self.steps.iter_mut().find(|s| s.id == step.id) {
            Some(existing) => *existing = step,
            None => {
                self.steps.push(step);
                self.steps.sort_by_key(|s| s.id);
            }
        }
    }

    pub fn remove_step(&mut self, id: StepId) -> Option<Step> {
        let pos = self.steps.iter().position(|s| s.id == id)?;
        Some(self.steps.remove(pos))
    }
}

/// Parse a server date into its calendar day, ignoring time of day.
///
/// The service stores timestamps but steps have day semantics; the date as
/// written is used with no timezone conversion.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Parse a day typed by a user: `DD.MM.YYYY` or `YYYY-MM-DD`.
pub fn parse_user_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d.%m.%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

pub fn format_user_day(day: NaiveDate) -> String {
    day.format("%d.%m.%Y").to_string()
}

/// Date format accepted by the step creation endpoints.
pub fn format_day_for_create(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Date format accepted by the step update endpoint.
pub fn format_day_for_update(day: NaiveDate) -> String {
    day.format("%Y-%m-%dT00:00:00").to_string()
}

// Request bodies

#[derive(Clone, Debug, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewGoal {
    pub title: String,
    pub description: String,
    pub steps: Vec<NewGoalStep>,
}

/// A step created together with its goal. Absent fields are sent as "".
#[derive(Clone, Debug, Serialize)]
pub struct NewGoalStep {
    pub title: String,
    pub description: String,
    pub date: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewStep {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StepPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StepStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl StepPatch {
    pub fn is_empty(&self) -> bool {
        self == &StepPatch::default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GoalPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl GoalPatch {
    pub fn is_empty(&self) -> bool {
        self == &GoalPatch::default()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct BulkStep {
    pub description: String,
    pub date: String,
}

// Response bodies

#[derive(Clone, Debug, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub access_token: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreatedStep {
    pub step_id: StepId,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GeneratedGoal {
    pub goal_id: GoalId,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdatedTask {
    pub task_id: StepId,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RescheduleResponse {
    pub message: String,
    pub updated_tasks: Vec<UpdatedTask>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StepsBulkResponse {
    pub steps: Vec<Step>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_server_timestamp() {
        assert_eq!(parse_day("2025-05-01T00:00:00"), Some(day(2025, 5, 1)));
        assert_eq!(parse_day("2025-05-01T23:59:59"), Some(day(2025, 5, 1)));
        assert_eq!(parse_day("2025-05-01T10:00:00.250"), Some(day(2025, 5, 1)));
    }

    #[test]
    fn parses_other_server_shapes() {
        assert_eq!(parse_day("2025-05-01"), Some(day(2025, 5, 1)));
        assert_eq!(parse_day("2025-05-01 08:30:00"), Some(day(2025, 5, 1)));
        assert_eq!(parse_day("2025-05-01T23:30:00+03:00"), Some(day(2025, 5, 1)));
        assert_eq!(
            parse_day("Thu, 01 May 2025 00:00:00 GMT"),
            Some(day(2025, 5, 1))
        );
    }

    #[test]
    fn rejects_malformed_dates() {
        assert_eq!(parse_day(""), None);
        assert_eq!(parse_day("not a date"), None);
        assert_eq!(parse_day("2025-13-01"), None);
        assert_eq!(parse_day("01.05.2025"), None);
    }

    #[test]
    fn user_days_round_trip_through_display_format() {
        let d = parse_user_day("05.12.2025").unwrap();
        assert_eq!(d, day(2025, 12, 5));
        assert_eq!(format_user_day(d), "05.12.2025");
        assert_eq!(parse_user_day("2025-12-05"), Some(d));
        assert_eq!(format_day_for_create(d), "2025-12-05");
        assert_eq!(format_day_for_update(d), "2025-12-05T00:00:00");
    }

    #[test]
    fn status_orders_planned_first() {
        assert!(StepStatus::Planned < StepStatus::Done);
        assert_eq!("DONE".parse::<StepStatus>(), Ok(StepStatus::Done));
        assert!("later".parse::<StepStatus>().is_err());
        assert_eq!(StepStatus::Planned.toggled(), StepStatus::Done);
    }

    #[test]
    fn goal_without_steps_field_decodes_empty() {
        let goal: Goal = serde_json::from_str(
            r##"{"id":3,"title":"Run","description":"","color":"#FF0000","progress":12.5,
                "created_at":"2025-04-01T00:00:00","updated_at":"2025-04-02T00:00:00"}"##,
        )
        .unwrap();
        assert!(goal.steps.is_empty());
        assert_eq!(goal.progress, 12.5);
    }

    #[test]
    fn patches_skip_absent_fields() {
        let patch = StepPatch {
            status: Some(StepStatus::Done),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "status": "done" })
        );
        assert!(StepPatch::default().is_empty());
        assert!(GoalPatch::default().is_empty());
    }
}
