use std::io::{BufRead, Write};

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::SiteConfig;
use crate::datetime::{parse_day_expr, parse_time_of_day, readable_date};
use crate::event::EventDraft;
use crate::notify::NoticeQueue;
use crate::render::Renderer;
use crate::schedule::ScheduleSlot;
use crate::store::CalendarStore;
use crate::tag::TagKey;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "show", "day", "next", "prev", "tag", "tags", "select", "add", "delete", "totals", "json",
        "about", "help", "quit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Day(String),
    Next,
    Prev,
    Tag(String),
    Tags,
    Select(usize),
    Add {
        name: String,
        start: String,
        end: String,
        tag: Option<String>,
    },
    Delete,
    Totals,
    Json,
    About,
    Help,
    Quit,
}

impl Command {
    pub fn parse(tokens: &[String]) -> anyhow::Result<Self> {
        let Some((head, args)) = tokens.split_first() else {
            return Ok(Command::Show);
        };

        let lower = head.to_ascii_lowercase();
        let command = expand_command_abbrev(lower.as_str(), &known_command_names())
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {head}"))?;
        debug!(token = %head, expanded = %command, "resolved command token");

        let parsed = match command {
            "show" => Command::Show,
            "day" => Command::Day(single_arg(command, args)?),
            "next" => Command::Next,
            "prev" => Command::Prev,
            "tag" => Command::Tag(single_arg(command, args)?),
            "tags" => Command::Tags,
            "select" => {
                let raw = single_arg(command, args)?;
                let index = raw
                    .parse::<usize>()
                    .with_context(|| format!("invalid slot index: {raw}"))?;
                Command::Select(index)
            }
            "add" => match args {
                [name, start, end] => Command::Add {
                    name: name.clone(),
                    start: start.clone(),
                    end: end.clone(),
                    tag: None,
                },
                [name, start, end, tag] => Command::Add {
                    name: name.clone(),
                    start: start.clone(),
                    end: end.clone(),
                    tag: Some(tag.clone()),
                },
                _ => return Err(anyhow!("usage: add NAME START END [TAG]")),
            },
            "delete" => Command::Delete,
            "totals" => Command::Totals,
            "json" => Command::Json,
            "about" => Command::About,
            "help" => Command::Help,
            "quit" => Command::Quit,
            other => return Err(anyhow!("unknown command: {other}")),
        };
        Ok(parsed)
    }
}

fn single_arg(command: &str, args: &[String]) -> anyhow::Result<String> {
    match args {
        [value] => Ok(value.clone()),
        _ => Err(anyhow!("usage: {command} VALUE")),
    }
}

/// Splits a command line on whitespace; double quotes group words.
pub fn split_command_line(line: &str) -> anyhow::Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(anyhow!("unterminated quote in: {line}"));
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Serialize)]
struct ScheduleView<'a> {
    day: NaiveDate,
    tag: &'a TagKey,
    selected: usize,
    slots: Vec<ScheduleSlot>,
}

/// Drives a [`CalendarStore`] from text commands, like the calendar widget
/// drives it from clicks.
#[derive(Debug)]
pub struct Session {
    store: CalendarStore<NoticeQueue>,
    renderer: Renderer,
    site: SiteConfig,
    prompt: bool,
}

impl Session {
    pub fn new(store: CalendarStore<NoticeQueue>, renderer: Renderer, site: SiteConfig) -> Self {
        Self {
            store,
            renderer,
            site,
            prompt: false,
        }
    }

    pub fn with_prompt(mut self, prompt: bool) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn store(&self) -> &CalendarStore<NoticeQueue> {
        &self.store
    }

    /// Reads commands until `quit` or end of input. Failed commands are
    /// reported and the loop carries on.
    #[instrument(skip_all)]
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> anyhow::Result<()> {
        if self.prompt {
            write!(out, "tagcal> ")?;
            out.flush()?;
        }

        for line in input.lines() {
            let line = line.context("failed to read command")?;
            let trimmed = line.trim();

            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                match self.execute_line(trimmed, out) {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(err) => {
                        warn!(error = %err, line = %trimmed, "command failed");
                        writeln!(out, "error: {err:#}")?;
                    }
                }
            }

            if self.prompt {
                write!(out, "tagcal> ")?;
                out.flush()?;
            }
        }

        Ok(())
    }

    pub fn execute_line<W: Write>(&mut self, line: &str, out: &mut W) -> anyhow::Result<Flow> {
        let tokens = split_command_line(line)?;
        let command = Command::parse(&tokens)?;
        self.execute(command, out)
    }

    #[instrument(skip(self, out))]
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> anyhow::Result<Flow> {
        let result = self.dispatch(command, out);
        for notice in self.store.notifier_mut().drain() {
            self.renderer.print_notice(out, &notice)?;
        }
        result
    }

    fn dispatch<W: Write>(&mut self, command: Command, out: &mut W) -> anyhow::Result<Flow> {
        match command {
            Command::Show => self.show(out)?,
            Command::Day(expr) => {
                let day = parse_day_expr(&expr, self.store.today())?;
                self.store.select_day(day);
                self.show(out)?;
            }
            Command::Next => {
                self.store.shift_day(1)?;
                self.show(out)?;
            }
            Command::Prev => {
                self.store.shift_day(-1)?;
                self.show(out)?;
            }
            Command::Tag(key) => {
                self.store.select_tag(TagKey::new(&key))?;
                let tag = self.store.enabled_tag();
                writeln!(out, "Tag: {} ({} today)", tag.name, self.store.total_time())?;
            }
            Command::Tags => {
                self.renderer.print_tags(
                    out,
                    self.store.calendar().tags(),
                    &self.store.selection().tag,
                )?;
            }
            Command::Select(index) => {
                let selected = self.store.select_slot(index);
                match self.store.selected_item() {
                    Some(slot) => writeln!(out, "Selected {selected}: {}", slot.event.name)?,
                    None => writeln!(out, "Nothing to select")?,
                }
            }
            Command::Add {
                name,
                start,
                end,
                tag,
            } => {
                let start = parse_time_of_day(&start)?;
                let end = parse_time_of_day(&end)?;
                let tag = tag
                    .map(TagKey::new)
                    .unwrap_or_else(|| self.store.selection().tag.clone());
                let draft = EventDraft::new(name.clone(), start, end, tag);
                match self.store.create_event(draft) {
                    Ok(_) => writeln!(out, "Created event {name}")?,
                    Err(err) => writeln!(out, "{err}")?,
                }
            }
            Command::Delete => {
                // outcome is reported through the notice queue
                let _ = self.store.delete_selected();
            }
            Command::Totals => {
                let day = self.store.selection().day;
                let totals: Vec<_> = self
                    .store
                    .calendar()
                    .tags()
                    .iter()
                    .map(|tag| (tag.clone(), self.store.total_time_for(&tag.key)))
                    .collect();
                self.renderer.print_totals(out, day, &totals)?;
            }
            Command::Json => {
                let selection = self.store.selection();
                let view = ScheduleView {
                    day: selection.day,
                    tag: &selection.tag,
                    selected: selection.slot,
                    slots: self.store.schedule(),
                };
                self.renderer.print_json(out, &view)?;
            }
            Command::About => {
                writeln!(out, "{}", self.site.name)?;
                writeln!(out, "{}", self.site.description)?;
                writeln!(out, "Today is {}", readable_date(self.store.today()))?;
            }
            Command::Help => {
                writeln!(out, "commands:")?;
                writeln!(out, "  show                      schedule of the selected day")?;
                writeln!(out, "  day EXPR | next | prev    change the selected day")?;
                writeln!(out, "  tag KEY | tags            change or list tags")?;
                writeln!(out, "  select N                  select schedule slot N")?;
                writeln!(out, "  add NAME START END [TAG]  create an event on the selected day")?;
                writeln!(out, "  delete                    delete the selected event")?;
                writeln!(out, "  totals                    time per tag for the selected day")?;
                writeln!(out, "  json                      schedule as JSON")?;
                writeln!(out, "  about | help | quit")?;
            }
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn show<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        let selection = self.store.selection();
        self.renderer.print_schedule(
            out,
            selection.day,
            &self.store.schedule(),
            self.store.calendar().tags(),
            selection.slot,
        )?;
        let tag = self.store.enabled_tag();
        writeln!(
            out,
            "tag {}: {}  free: {}",
            tag.name,
            self.store.total_time(),
            self.store.free_time()
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(line: &str) -> Vec<String> {
        split_command_line(line).expect("balanced quotes")
    }

    #[test]
    fn splits_quoted_names() {
        assert_eq!(
            tokens(r#"add "Design review" 10:00 11:00 meeting"#),
            vec!["add", "Design review", "10:00", "11:00", "meeting"]
        );
        assert_eq!(tokens("  show  "), vec!["show"]);
        assert_eq!(tokens(r#"add "" 1 2"#), vec!["add", "", "1", "2"]);
        assert!(split_command_line(r#"add "open 1 2"#).is_err());
    }

    #[test]
    fn parses_abbreviated_commands() {
        assert_eq!(Command::parse(&tokens("sh")).expect("show"), Command::Show);
        assert_eq!(Command::parse(&tokens("del")).expect("delete"), Command::Delete);
        assert_eq!(Command::parse(&tokens("sel 3")).expect("select"), Command::Select(3));
        assert_eq!(Command::parse(&[]).expect("empty"), Command::Show);
        assert_eq!(
            Command::parse(&tokens("add Review 10 11")).expect("add"),
            Command::Add {
                name: "Review".to_string(),
                start: "10".to_string(),
                end: "11".to_string(),
                tag: None,
            }
        );
        // `t` matches tag, tags and totals
        assert!(Command::parse(&tokens("t")).is_err());
        assert!(Command::parse(&tokens("select x")).is_err());
        assert!(Command::parse(&tokens("add Review 10")).is_err());
    }
}
