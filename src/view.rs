//! Terminal rendering of the calendar.

use chrono::{Datelike, NaiveDate};
use colored::{ColoredString, Colorize};
use std::fmt::Write;

use crate::store::CalendarStore;
use crate::types::{Goal, Step, StepStatus, format_user_day};

/// Header line plus one line per step, in display order.
pub fn render_day(store: &CalendarStore, day: NaiveDate) -> String {
    let steps = store.steps_for_day(day);
    let (done, total) = store.day_progress(day);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({}/{})",
        format!("To-do list for {}", format_user_day(day)).bold(),
        done,
        total
    );
    if steps.is_empty() {
        let _ = writeln!(out, "  {}", "nothing planned".dimmed());
    }
    for step in &steps {
        let _ = writeln!(out, "{}", step_line(step));
    }
    out
}

fn step_line(step: &Step) -> String {
    let (mark, title) = match step.status {
        StepStatus::Planned => ("[ ]".yellow(), step.title.normal()),
        StepStatus::Done => ("[x]".green(), step.title.dimmed().strikethrough()),
    };
    let mut line = format!(
        "  {} {} {} {}",
        mark,
        swatch(&step.color),
        format!("#{}", step.id).dimmed(),
        title
    );
    if !step.goal_name.is_empty() {
        let _ = write!(line, " {}", format!("({})", step.goal_name).dimmed());
    }
    if !step.description.is_empty() {
        let _ = write!(line, "\n      {}", step.description);
    }
    line
}

/// Days of the month that have steps, with counts and goal colors.
pub fn render_month(store: &CalendarStore, year: i32, month: u32) -> String {
    let index = store.index();
    let days = index.days_in_month(year, month);
    let mut out = String::new();
    let _ = writeln!(out, "{}", format!("{:02}.{}", month, year).bold());
    if days.is_empty() {
        let _ = writeln!(out, "  {}", "no steps this month".dimmed());
        return out;
    }
    for day in days {
        let (done, total) = store.day_progress(day);
        let swatches: Vec<String> = index
            .colors_for_day(day)
            .iter()
            .map(|c| swatch(c).to_string())
            .collect();
        let _ = writeln!(
            out,
            "  {} {:>3} {}  {}/{} done  {}",
            format_user_day(day),
            weekday_short(day),
            plural(index.count_for_day(day), "step"),
            done,
            total,
            swatches.join(" ")
        );
    }
    out
}

pub fn render_goals<'a>(goals: impl IntoIterator<Item = &'a Goal>) -> String {
    let mut out = String::new();
    for goal in goals {
        let done = goal.steps.iter().filter(|s| s.is_done()).count();
        let _ = writeln!(
            out,
            "{} {} {} {:.0}% ({}/{})",
            swatch(&goal.color),
            format!("#{}", goal.id).dimmed(),
            goal.title.bold(),
            goal.progress,
            done,
            goal.steps.len()
        );
        if !goal.description.is_empty() {
            let _ = writeln!(out, "    {}", goal.description);
        }
    }
    if out.is_empty() {
        out.push_str("No goals yet.\n");
    }
    out
}

/// A dot in the goal's color; unparseable colors render plain.
fn swatch(color: &str) -> ColoredString {
    match parse_hex_color(color) {
        Some((r, g, b)) => "●".truecolor(r, g, b),
        None => "●".normal(),
    }
}

fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn weekday_short(day: NaiveDate) -> String {
    day.weekday().to_string()
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}
