use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use clap::{Args, Parser, Subcommand};

use crate::metadata::{PKG_DESCRIPTION, PKG_NAME, PKG_VERSION};
use crate::types::{BulkStep, GoalId, NewGoalStep, StepId, StepStatus, format_day_for_create, parse_user_day};

#[derive(Parser, Debug, Clone)]
#[command(name = PKG_NAME)]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub args: GlobalArguments,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign in and remember the access token
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the stored access token
    Logout,
    /// Create an account
    Register {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Request a password reset mail, or finish a reset with its token
    Recover {
        #[arg(long)]
        email: Option<String>,
        /// Token from the reset mail; prompts for the new password
        #[arg(long)]
        reset_token: Option<String>,
    },
    /// List goals with their progress
    Goals,
    /// Show the to-do list for a day (today by default)
    Day {
        #[arg(value_parser = parse_day_arg)]
        date: Option<NaiveDate>,
    },
    /// Show which days of a month have steps (current month by default)
    Month {
        /// YYYY-MM or MM.YYYY
        #[arg(value_parser = parse_month_arg)]
        month: Option<(i32, u32)>,
    },
    /// Create a goal, optionally with steps given as DATE:TITLE
    AddGoal {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "step", value_name = "DATE:TITLE", value_parser = parse_goal_step)]
        steps: Vec<NewGoalStep>,
    },
    /// Let the service draft a goal and its steps from a prompt
    Generate {
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// Add a step to a goal
    AddStep {
        goal_id: GoalId,
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_day_arg)]
        date: Option<NaiveDate>,
    },
    /// Add several steps to a goal, each given as DATE:TEXT
    AddSteps {
        goal_id: GoalId,
        #[arg(long = "step", value_name = "DATE:TEXT", required = true, value_parser = parse_bulk_step)]
        steps: Vec<BulkStep>,
    },
    /// Change a step's title, description, day or status
    EditStep {
        step_id: StepId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_day_arg)]
        date: Option<NaiveDate>,
        #[arg(long)]
        status: Option<StepStatus>,
    },
    /// Mark a step done, or planned again
    Toggle { step_id: StepId },
    DeleteStep { step_id: StepId },
    /// Delete a goal and all of its steps
    DeleteGoal {
        goal_id: GoalId,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    EditGoal {
        goal_id: GoalId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Describe a problem and let the service move steps around it
    Reschedule {
        #[arg(required = true, trailing_var_arg = true)]
        problem: Vec<String>,
    },
    /// Show the resolved configuration and check the stored session
    Status,
    /// Open an interactive config editor for settings.json
    Config,
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArguments {
    /// Service base URL, overrides settings.json
    #[arg(long, global = true, env = "WHATIAMTODO_BASE_URL")]
    pub base_url: Option<String>,

    /// Access token, overrides the stored session
    #[arg(long, global = true, env = "WHATIAMTODO_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Directory holding settings.json and session.json
    #[arg(long, global = true, env = "WHATIAMTODO_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,
}

impl GlobalArguments {
    /// Validate CLI/environment-derived arguments.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(url) = &self.base_url {
            let url = url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!(
                    "Invalid WHATIAMTODO_BASE_URL '{}': must start with http:// or https://",
                    url
                ));
            }
        }
        if matches!(&self.token, Some(t) if t.trim().is_empty()) {
            return Err("WHATIAMTODO_TOKEN cannot be empty when set".to_string());
        }
        if matches!(&self.config_dir, Some(d) if d.as_os_str().is_empty()) {
            return Err("WHATIAMTODO_CONFIG_DIR cannot be empty when set".to_string());
        }
        Ok(())
    }
}

fn parse_day_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_user_day(raw).ok_or_else(|| format!("'{raw}' is not a date (DD.MM.YYYY or YYYY-MM-DD)"))
}

fn parse_month_arg(raw: &str) -> Result<(i32, u32), String> {
    let raw = raw.trim();
    let day = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("01.{raw}"), "%d.%m.%Y"))
        .map_err(|_| format!("'{raw}' is not a month (YYYY-MM or MM.YYYY)"))?;
    Ok((day.year(), day.month()))
}

fn parse_goal_step(raw: &str) -> Result<NewGoalStep, String> {
    let (date, title) = raw
        .split_once(':')
        .ok_or_else(|| format!("'{raw}' should look like DATE:TITLE"))?;
    let day = parse_day_arg(date)?;
    let title = title.trim();
    if title.is_empty() {
        return Err(format!("'{raw}' has an empty title"));
    }
    Ok(NewGoalStep {
        title: title.to_string(),
        description: String::new(),
        date: format_day_for_create(day),
    })
}

fn parse_bulk_step(raw: &str) -> Result<BulkStep, String> {
    let step = parse_goal_step(raw)?;
    Ok(BulkStep {
        description: step.title,
        date: step.date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_day_and_step_arguments() {
        let cli = Cli::try_parse_from(["whatiamtodo", "day", "01.05.2025"]).unwrap();
        match cli.command {
            Command::Day { date } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2025, 5, 1));
            }
            other => panic!("unexpected {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "whatiamtodo",
            "add-goal",
            "Marathon",
            "--step",
            "2025-05-01:run 5k",
            "--step",
            "02.05.2025:stretch: legs",
        ])
        .unwrap();
        match cli.command {
            Command::AddGoal { title, steps, .. } => {
                assert_eq!(title, "Marathon");
                assert_eq!(steps[0].date, "2025-05-01");
                assert_eq!(steps[1].title, "stretch: legs");
                assert_eq!(steps[1].date, "2025-05-02");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bulk_steps_need_at_least_one() {
        assert!(Cli::try_parse_from(["whatiamtodo", "add-steps", "3"]).is_err());
        let cli = Cli::try_parse_from(["whatiamtodo", "add-steps", "3", "--step", "2025-05-01:warm up"])
            .unwrap();
        match cli.command {
            Command::AddSteps { goal_id, steps } => {
                assert_eq!(goal_id, 3);
                assert_eq!(steps[0].description, "warm up");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_months() {
        assert_eq!(parse_month_arg("2025-05"), Ok((2025, 5)));
        assert_eq!(parse_month_arg("05.2025"), Ok((2025, 5)));
        assert!(parse_month_arg("2025-13").is_err());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Cli::try_parse_from(["whatiamtodo", "day", "31.02.2025"]).is_err());
        assert!(Cli::try_parse_from(["whatiamtodo", "edit-step", "1", "--status", "maybe"]).is_err());
        assert!(parse_goal_step("2025-05-01").is_err());
        assert!(parse_goal_step("2025-05-01:  ").is_err());
    }

    #[test]
    fn trailing_prompt_words_are_collected() {
        let cli = Cli::try_parse_from(["whatiamtodo", "reschedule", "sick", "all", "week"]).unwrap();
        match cli.command {
            Command::Reschedule { problem } => assert_eq!(problem.join(" "), "sick all week"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn global_argument_validation() {
        let mut args = GlobalArguments::default();
        assert!(args.validate().is_ok());
        args.base_url = Some("whatiamtodo.ru".into());
        assert!(args.validate().is_err());
        args.base_url = Some("https://whatiamtodo.ru".into());
        args.token = Some(" ".into());
        assert!(args.validate().is_err());
    }
}
