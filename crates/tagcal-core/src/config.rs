use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::datetime::{
  SystemClock,
  parse_time_of_day,
  parse_timezone
};
use crate::event::CalendarEvent;
use crate::schedule::{
  Calendar,
  DEFAULT_WORK_END,
  DEFAULT_WORK_START,
  WorkHours
};
use crate::tag::{
  Tag,
  TagColor,
  TagKey,
  TagSet
};

const CONFIG_FILE: &str = "tagcal.toml";
const CONFIG_DIR: &str = "tagcal";
const CONFIG_ENV_VAR: &str =
  "TAGCAL_CONFIG";

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
#[serde(default)]
pub struct Config {
  pub site:         SiteConfig,
  pub calendar:     CalendarSection,
  pub tags:         Vec<TagConfig>,
  pub daily_events: Vec<DailyEventConfig>,
  #[serde(skip)]
  pub loaded_files: Vec<PathBuf>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
#[serde(default)]
pub struct SiteConfig {
  pub name:        String,
  pub description: String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
#[serde(default)]
pub struct CalendarSection {
  pub work_start: u32,
  pub work_end:   u32,
  pub timezone:   Option<String>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct TagConfig {
  pub key:   String,
  #[serde(default)]
  pub name:  Option<String>,
  #[serde(default)]
  pub color: Option<TagColor>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct DailyEventConfig {
  pub name:  String,
  pub start: String,
  pub end:   String,
  pub tag:   String
}

impl Default for SiteConfig {
  fn default() -> Self {
    Self {
      name:        "DJH Playground"
        .to_string(),
      description: "A tag-based calendar \
                    that derives each \
                    day's schedule from \
                    recurring and dated \
                    events."
        .to_string()
    }
  }
}

impl Default for CalendarSection {
  fn default() -> Self {
    Self {
      work_start: DEFAULT_WORK_START,
      work_end:   DEFAULT_WORK_END,
      timezone:   None
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      site:         SiteConfig::default(),
      calendar:     CalendarSection::default(),
      tags:         default_tags(),
      daily_events: vec![DailyEventConfig {
        name:  "Standup".to_string(),
        start: "08:00".to_string(),
        end:   "09:00".to_string(),
        tag:   "meeting".to_string()
      }],
      loaded_files: vec![]
    }
  }
}

fn default_tags() -> Vec<TagConfig> {
  TagSet::default()
    .iter()
    .map(|tag| {
      TagConfig {
        key:   tag.key.to_string(),
        name:  Some(tag.name.clone()),
        color: tag.color
      }
    })
    .collect()
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) =
      resolve_config_path(
        config_override
      )
    else {
      warn!(
        "no {CONFIG_FILE} found; using \
         defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading config");
    let raw = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    let mut cfg = Self::from_toml_str(
      &raw,
      &path.display().to_string()
    )?;
    cfg.loaded_files.push(path);
    Ok(cfg)
  }

  pub fn from_toml_str(
    raw: &str,
    source: &str
  ) -> anyhow::Result<Self> {
    let mut cfg =
      toml::from_str::<Config>(raw)
        .with_context(|| {
          format!(
            "failed to parse config \
             {source}"
          )
        })?;
    cfg.sanitize();
    debug!(
      source,
      tags = cfg.tags.len(),
      daily_events =
        cfg.daily_events.len(),
      "parsed config"
    );
    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k.trim();
      let value = v.trim();
      debug!(key = %key, value = %value, "applying override");
      match key {
        | "calendar.work_start" => {
          self.calendar.work_start =
            parse_hour(key, value)?;
        }
        | "calendar.work_end" => {
          self.calendar.work_end =
            parse_hour(key, value)?;
        }
        | "calendar.timezone" => {
          self.calendar.timezone =
            (!value.is_empty())
              .then(|| value.to_string());
        }
        | "site.name" => {
          self.site.name =
            value.to_string();
        }
        | other => {
          return Err(anyhow!(
            "unknown config key: \
             {other}"
          ));
        }
      }
    }

    self.sanitize();
    Ok(())
  }

  pub fn work_hours(&self) -> WorkHours {
    WorkHours::new(
      self.calendar.work_start,
      self.calendar.work_end
    )
    .unwrap_or_default()
  }

  pub fn tag_set(&self) -> TagSet {
    TagSet::new(
      self
        .tags
        .iter()
        .map(|tag| {
          Tag::new(
            &tag.key,
            tag.name.clone().unwrap_or_else(
              || tag.key.clone()
            ),
            tag.color
          )
        })
        .collect()
    )
  }

  /// Recurring events that pass
  /// validation against `tags`.
  pub fn recurring_events(
    &self,
    tags: &TagSet
  ) -> Vec<CalendarEvent> {
    self
      .daily_events
      .iter()
      .filter_map(|entry| {
        match daily_event_from_config(
          entry, tags
        ) {
          | Ok(event) => Some(event),
          | Err(err) => {
            warn!(
              name = %entry.name,
              error = %err,
              "skipping daily event"
            );
            None
          }
        }
      })
      .collect()
  }

  pub fn build_calendar(
    &self
  ) -> Calendar {
    let tags = self.tag_set();
    let recurring =
      self.recurring_events(&tags);
    info!(
      tags = tags.len(),
      recurring = recurring.len(),
      work_start =
        self.calendar.work_start,
      work_end = self.calendar.work_end,
      "built calendar"
    );
    Calendar::new(
      tags,
      self.work_hours(),
      recurring
    )
  }

  pub fn clock(&self) -> SystemClock {
    let timezone = self
      .calendar
      .timezone
      .as_deref()
      .and_then(|raw| {
        parse_timezone(
          raw,
          "calendar.timezone"
        )
      });
    SystemClock::new(timezone)
  }

  fn sanitize(&mut self) {
    if self.calendar.work_end > 23 {
      warn!(
        work_end = self.calendar.work_end,
        "work_end past 23; clamping"
      );
      self.calendar.work_end = 23;
    }
    if self.calendar.work_start > 22 {
      warn!(
        work_start =
          self.calendar.work_start,
        "work_start past 22; clamping"
      );
      self.calendar.work_start = 22;
    }
    if self.calendar.work_end
      <= self.calendar.work_start
    {
      warn!(
        work_start =
          self.calendar.work_start,
        work_end = self.calendar.work_end,
        "work_end not after \
         work_start; extending window \
         to one hour"
      );
      self.calendar.work_end =
        self.calendar.work_start + 1;
    }

    if self
      .site
      .name
      .trim()
      .is_empty()
    {
      self.site.name =
        SiteConfig::default().name;
    }
  }
}

fn daily_event_from_config(
  entry: &DailyEventConfig,
  tags: &TagSet
) -> anyhow::Result<CalendarEvent> {
  let start =
    parse_time_of_day(&entry.start)?;
  let end =
    parse_time_of_day(&entry.end)?;
  if end <= start {
    return Err(anyhow!(
      "start {} is not before end {}",
      entry.start,
      entry.end
    ));
  }

  let tag = TagKey::new(&entry.tag);
  if tag.is_free() {
    return Err(anyhow!(
      "the free tag cannot be assigned"
    ));
  }
  if !tags.contains(&tag) {
    return Err(anyhow!(
      "unknown tag: {tag}"
    ));
  }

  Ok(CalendarEvent::new(
    entry.name.clone(),
    start,
    end,
    tag
  ))
}

fn parse_hour(
  key: &str,
  value: &str
) -> anyhow::Result<u32> {
  value.parse::<u32>().with_context(
    || {
      format!(
        "invalid hour for {key}: \
         {value}"
      )
    }
  )
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  if let Ok(dir) = std::env::current_dir()
  {
    let candidate =
      dir.join(CONFIG_FILE);
    if candidate.exists() {
      return Some(candidate);
    }
  }

  dirs::config_dir()
    .map(|dir| {
      dir
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
    })
    .filter(|candidate| {
      candidate.exists()
    })
}
