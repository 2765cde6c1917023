//! Command execution: resolves settings and session, then runs one command.

use chrono::{Datelike, Local, NaiveDate};
use colored::Colorize;
use std::path::PathBuf;

use crate::cli::{Cli, Command};
use crate::client::{ApiClient, create_api_client};
use crate::error::{ServiceError, ServiceResult};
use crate::metadata::{PKG_NAME, PKG_VERSION};
use crate::session::{Session, SessionStore, config_dir};
use crate::settings::Settings;
use crate::sync::Synchronizer;
use crate::types::{Credentials, GoalPatch, Registration, StepId, StepPatch, format_day_for_update};
use crate::view;

struct Context {
    dir: PathBuf,
    settings: Settings,
    sessions: SessionStore,
    token_override: Option<String>,
}

impl Context {
    fn resolve(cli: &Cli) -> ServiceResult<Self> {
        cli.args.validate().map_err(ServiceError::Config)?;
        let dir = config_dir(cli.args.config_dir.as_deref())?;
        let settings = Settings::load(&dir)?.with_base_url(cli.args.base_url.as_deref());
        settings.validate()?;
        tracing::debug!(config_dir = %dir.display(), base_url = %settings.base_url, "settings resolved");
        Ok(Self {
            sessions: SessionStore::new(&dir),
            dir,
            settings,
            token_override: cli.args.token.clone(),
        })
    }

    fn anonymous_client(&self) -> ServiceResult<ApiClient> {
        create_api_client(&self.settings.base_url, None)
    }

    fn signed_in_client(&self) -> ServiceResult<ApiClient> {
        let token = match &self.token_override {
            Some(token) => token.clone(),
            None => self
                .sessions
                .load()?
                .map(|s| s.access_token)
                .ok_or(ServiceError::SessionExpired)?,
        };
        Ok(self.anonymous_client()?.with_token(token))
    }

    async fn synchronizer(&self) -> ServiceResult<Synchronizer<ApiClient>> {
        let mut sync = Synchronizer::new(self.signed_in_client()?);
        sync.bootstrap().await?;
        Ok(sync)
    }
}

pub async fn run(cli: Cli) -> ServiceResult<()> {
    let ctx = Context::resolve(&cli)?;

    match cli.command {
        Command::Version => {
            println!("{} {}", PKG_NAME, PKG_VERSION);
        }
        Command::Config => {
            let edited = ctx.settings.edit_interactively()?;
            edited.save(&ctx.dir)?;
            println!(
                "{} {}",
                "Saved".green(),
                Settings::path(&ctx.dir).display()
            );
        }
        Command::Login { email } => {
            let email = prompt_or(email, "Email")?;
            let password = prompt_password("Password", false)?;
            let credentials = Credentials {
                email: email.clone(),
                password,
            };
            let (greeting, access_token) = ctx
                .anonymous_client()?
                .run_blocking(move |c| c.login(&credentials))
                .await?;
            ctx.sessions.save(&Session {
                access_token,
                email,
            })?;
            println!("{}", greeting.green());
        }
        Command::Status => {
            println!("base url:   {}", ctx.settings.base_url);
            println!("config dir: {}", ctx.dir.display());
            let session = ctx.sessions.load()?;
            match (&ctx.token_override, &session) {
                (None, None) => println!("session:    {}", "signed out".yellow()),
                _ => {
                    if let Some(s) = &session {
                        println!("account:    {}", s.email);
                    }
                    let reply = ctx
                        .signed_in_client()?
                        .run_blocking(|c| c.check_protected())
                        .await?;
                    println!("session:    {} ({})", "valid".green(), reply);
                }
            }
        }
        Command::Logout => {
            if ctx.sessions.clear()? {
                println!("Signed out.");
            } else {
                println!("Not signed in.");
            }
        }
        Command::Register { email, name } => {
            let email = prompt_or(email, "Email")?;
            let password = prompt_password("Password", true)?;
            let registration = Registration {
                email,
                password,
                name,
            };
            let message = ctx
                .anonymous_client()?
                .run_blocking(move |c| c.register(&registration))
                .await?;
            println!("{}", message.green());
        }
        Command::Recover { email, reset_token } => {
            let client = ctx.anonymous_client()?;
            let message = match reset_token {
                Some(reset_token) => {
                    let password = prompt_password("New password", true)?;
                    client
                        .run_blocking(move |c| c.reset_password(&reset_token, &password))
                        .await?
                }
                None => {
                    let email = prompt_or(email, "Email")?;
                    client
                        .run_blocking(move |c| c.recover_password(&email))
                        .await?
                }
            };
            println!("{}", message.green());
        }
        command => run_signed_in(&ctx, command).await?,
    }

    Ok(())
}

async fn run_signed_in(ctx: &Context, command: Command) -> ServiceResult<()> {
    let mut sync = ctx.synchronizer().await?;
    let today = Local::now().date_naive();

    match command {
        Command::Goals => {
            print!("{}", view::render_goals(sync.store().goals()));
        }
        Command::Day { date } => {
            let day = date.unwrap_or(today);
            sync.store_mut().select_day(day);
            print!("{}", view::render_day(sync.store(), day));
        }
        Command::Month { month } => {
            let (year, month) = month.unwrap_or((today.year(), today.month()));
            print!("{}", view::render_month(sync.store(), year, month));
        }
        Command::AddGoal {
            title,
            description,
            steps,
        } => {
            let message = sync.create_goal(title, description, steps).await?;
            println!("{}", message.green());
        }
        Command::Generate { prompt } => {
            let goal = sync.generate_goal(&prompt.join(" ")).await?;
            println!("{} #{} {}", "Generated".green(), goal.id, goal.title.bold());
            print!("{}", view::render_goals([&goal]));
        }
        Command::AddStep {
            goal_id,
            title,
            description,
            date,
        } => {
            let step = sync.add_step(goal_id, title, description, date).await?;
            show_step_day(&mut sync, "Added", step.id);
        }
        Command::AddSteps { goal_id, steps } => {
            let count = steps.len();
            let goal = sync.add_steps(goal_id, steps).await?;
            println!("{} {} to #{}", "Added".green(), count, goal.id);
            print!("{}", view::render_goals([&goal]));
        }
        Command::EditStep {
            step_id,
            title,
            description,
            date,
            status,
        } => {
            let patch = StepPatch {
                title,
                description,
                status,
                date: date.map(format_day_for_update),
            };
            let step = sync.update_step(step_id, patch).await?;
            show_step_day(&mut sync, "Updated", step.id);
        }
        Command::Toggle { step_id } => {
            let step = sync.toggle_step(step_id).await?;
            show_step_day(&mut sync, "Marked", step.id);
        }
        Command::DeleteStep { step_id } => {
            let message = sync.delete_step(step_id).await?;
            println!("{}", message.green());
        }
        Command::DeleteGoal { goal_id, yes } => {
            let title = sync
                .store()
                .goal(goal_id)
                .map(|g| g.title.clone())
                .ok_or_else(|| ServiceError::InvalidInput(format!("unknown goal {}", goal_id)))?;
            if !yes && !confirm(&format!("Delete \"{}\" and all of its steps?", title))? {
                println!("Cancelled.");
                return Ok(());
            }
            let message = sync.delete_goal(goal_id).await?;
            println!("{}", message.green());
        }
        Command::EditGoal {
            goal_id,
            title,
            description,
            color,
        } => {
            let patch = GoalPatch {
                title,
                description,
                color,
            };
            let goal = sync.update_goal(goal_id, patch).await?;
            print!("{}", view::render_goals([&goal]));
        }
        Command::Reschedule { problem } => {
            let (message, moved) = sync.reschedule(&problem.join(" ")).await?;
            println!("{}", message);
            let mut days: Vec<NaiveDate> = moved.iter().filter_map(|s| s.day()).collect();
            days.sort();
            days.dedup();
            for day in days {
                print!("{}", view::render_day(sync.store(), day));
            }
        }
        Command::Version
        | Command::Status
        | Command::Config
        | Command::Login { .. }
        | Command::Logout
        | Command::Register { .. }
        | Command::Recover { .. } => {
            return Err(ServiceError::InvalidInput(
                "command runs without a session".to_string(),
            ));
        }
    }

    Ok(())
}

fn show_step_day(sync: &mut Synchronizer<ApiClient>, verb: &str, step_id: StepId) {
    println!("{} #{}", verb.green(), step_id);
    if let Some(day) = sync.store().index().day_of(step_id) {
        sync.store_mut().select_day(day);
        print!("{}", view::render_day(sync.store(), day));
    }
}

fn prompt_or(value: Option<String>, prompt: &str) -> ServiceResult<String> {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        return Ok(value);
    }
    dialoguer::Input::<String>::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(|e| ServiceError::InvalidInput(e.to_string()))
}

fn prompt_password(prompt: &str, confirm_twice: bool) -> ServiceResult<String> {
    let mut input = dialoguer::Password::new().with_prompt(prompt);
    if confirm_twice {
        input = input.with_confirmation("Repeat password", "Passwords don't match");
    }
    input
        .interact()
        .map_err(|e| ServiceError::InvalidInput(e.to_string()))
}

fn confirm(prompt: &str) -> ServiceResult<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| ServiceError::InvalidInput(e.to_string()))
}
