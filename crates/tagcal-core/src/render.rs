use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::datetime::readable_date;
use crate::duration::{Duration, time_to_string};
use crate::event::time_from_minutes;
use crate::notify::{Notice, Severity};
use crate::schedule::ScheduleSlot;
use crate::tag::{Tag, TagColor, TagKey, TagSet};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// Colors only when enabled and stdout is a terminal.
    pub fn new(color: bool) -> Self {
        Self {
            color: color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all, fields(day = %day, slots = schedule.len()))]
    pub fn print_schedule<W: Write>(
        &self,
        out: &mut W,
        day: NaiveDate,
        schedule: &[ScheduleSlot],
        tags: &TagSet,
        selected: usize,
    ) -> anyhow::Result<()> {
        writeln!(out, "{} ({day})", readable_date(day))?;

        let headers = vec![
            " ".to_string(),
            "#".to_string(),
            "Time".to_string(),
            "Length".to_string(),
            "Event".to_string(),
            "Tag".to_string(),
        ];

        let rows = schedule
            .iter()
            .enumerate()
            .map(|(idx, slot)| {
                let tag = tags.get_or_unknown(&slot.event.tag);
                let marker = if idx == selected { ">" } else { "" };
                let span = format!(
                    "{}-{}",
                    time_to_string(time_from_minutes(slot.start_minutes)),
                    time_to_string(time_from_minutes(slot.end_minutes))
                );
                vec![
                    marker.to_string(),
                    idx.to_string(),
                    span,
                    slot.duration().to_string(),
                    slot.event.name.clone(),
                    self.paint_tag(&tag),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    pub fn print_tags<W: Write>(
        &self,
        out: &mut W,
        tags: &TagSet,
        enabled: &TagKey,
    ) -> anyhow::Result<()> {
        let headers = vec![" ".to_string(), "Key".to_string(), "Name".to_string()];
        let rows = tags
            .iter()
            .map(|tag| {
                let marker = if &tag.key == enabled { "*" } else { "" };
                vec![marker.to_string(), self.paint_tag(tag), tag.name.clone()]
            })
            .collect();
        write_table(out, headers, rows)
    }

    pub fn print_totals<W: Write>(
        &self,
        out: &mut W,
        day: NaiveDate,
        totals: &[(Tag, Duration)],
    ) -> anyhow::Result<()> {
        writeln!(out, "{} ({day})", readable_date(day))?;
        let headers = vec!["Tag".to_string(), "Total".to_string()];
        let rows = totals
            .iter()
            .map(|(tag, total)| vec![self.paint_tag(tag), total.to_string()])
            .collect();
        write_table(out, headers, rows)
    }

    pub fn print_notice<W: Write>(&self, out: &mut W, notice: &Notice) -> anyhow::Result<()> {
        let label = match notice.severity {
            Severity::Success => self.paint("ok", TagColor::Success.ansi_code()),
            Severity::Error => self.paint("!!", TagColor::Error.ansi_code()),
        };
        writeln!(out, "[{label}] {}: {}", notice.title, notice.description)?;
        Ok(())
    }

    pub fn print_json<W: Write, T: Serialize>(&self, out: &mut W, value: &T) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(&mut *out, value)?;
        writeln!(out)?;
        Ok(())
    }

    fn paint_tag(&self, tag: &Tag) -> String {
        match tag.color {
            Some(color) => self.paint(tag.key.as_str(), color.ansi_code()),
            None => tag.key.to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
