use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Local,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeDelta,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

/// Source of "today" for the calendar.
pub trait Clock {
  fn now(&self) -> NaiveDateTime;

  fn today(&self) -> NaiveDate {
    self.now().date()
  }
}

/// Wall clock, either in the process
/// local timezone or pinned to a
/// configured one.
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
  timezone: Option<Tz>
}

impl SystemClock {
  pub fn new(
    timezone: Option<Tz>
  ) -> Self {
    Self { timezone }
  }

  pub fn timezone(&self) -> Option<Tz> {
    self.timezone
  }
}

impl Clock for SystemClock {
  fn now(&self) -> NaiveDateTime {
    match self.timezone {
      | Some(tz) => {
        Utc::now()
          .with_timezone(&tz)
          .naive_local()
      }
      | None => Local::now().naive_local()
    }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
  pub fn at_midnight(
    date: NaiveDate
  ) -> Self {
    Self(date.and_time(NaiveTime::MIN))
  }
}

impl Clock for FixedClock {
  fn now(&self) -> NaiveDateTime {
    self.0
  }
}

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured calendar timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn is_weekend(
  date: NaiveDate
) -> bool {
  matches!(
    date.weekday(),
    Weekday::Sat | Weekday::Sun
  )
}

/// `days` from today at `hours:minutes`.
pub fn time_from_today(
  clock: &dyn Clock,
  days: i64,
  hours: u32,
  minutes: u32
) -> anyhow::Result<NaiveDateTime> {
  let day = clock
    .today()
    .checked_add_signed(
      TimeDelta::days(days)
    )
    .ok_or_else(|| {
      anyhow!(
        "date out of range: today \
         {days:+} days"
      )
    })?;
  let time =
    NaiveTime::from_hms_opt(
      hours, minutes, 0
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid time of day: \
         {hours}:{minutes:02}"
      )
    })?;
  Ok(day.and_time(time))
}

/// Long form, e.g. `Monday 19 October 2026`.
#[must_use]
pub fn readable_date(
  date: NaiveDate
) -> String {
  date
    .format("%A %-d %B %Y")
    .to_string()
}

#[tracing::instrument(fields(input = input))]
pub fn parse_day_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return shift_days(today, 1);
    }
    | "yesterday" => {
      return shift_days(today, -1);
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today,
      target_weekday
    ));
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)d$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let signed = match caps
      .name("sign")
      .map(|m| m.as_str())
    {
      | Some("-") => -num,
      | _ => num
    };
    return shift_days(today, signed);
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized day expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/-Nd, YYYY-MM-DD"
  })
}

#[tracing::instrument(fields(input = input))]
pub fn parse_time_of_day(
  input: &str
) -> anyhow::Result<NaiveTime> {
  let (hour, minute) =
    parse_clock_time(input)
      .ok_or_else(|| {
        anyhow!(
          "unrecognized time of day: \
           {input}"
        )
      })
      .with_context(|| {
        "supported formats: 15:23, \
         3:23pm, 15, 3pm"
      })?;

  NaiveTime::from_hms_opt(
    hour, minute, 0
  )
  .ok_or_else(|| {
    anyhow!(
      "invalid time of day: {input}"
    )
  })
}

fn shift_days(
  day: NaiveDate,
  days: i64
) -> anyhow::Result<NaiveDate> {
  day
    .checked_add_signed(
      TimeDelta::days(days)
    )
    .ok_or_else(|| {
      anyhow!(
        "date out of range: {day} \
         {days:+} days"
      )
    })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_signed(
      TimeDelta::days(delta)
    )
    .unwrap_or(from)
}

fn parse_clock_time(
  token: &str
) -> Option<(u32, u32)> {
  let clock_re = Regex::new(
    r"(?i)^(?P<hour>\d{1,2})(:(?P<minute>\d{2}))?\s*(?P<ampm>[ap]m)?$",
  )
  .ok()?;
  let captures =
    clock_re.captures(token.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = match captures
    .name("minute")
  {
    | Some(m) => {
      m.as_str().parse::<u32>().ok()?
    }
    | None => 0
  };
  if minute > 59 {
    return None;
  }

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    let ampm = ampm_match
      .as_str()
      .to_ascii_lowercase();
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    match ampm.as_str() {
      | "am" => {
        if raw_hour == 12 {
          0
        } else {
          raw_hour
        }
      }
      | "pm" => {
        if raw_hour == 12 {
          12
        } else {
          raw_hour + 12
        }
      }
      | _ => return None
    }
  } else {
    if raw_hour > 23 {
      return None;
    }
    raw_hour
  };

  Some((hour, minute))
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveTime
  };

  use super::{
    FixedClock,
    is_weekend,
    parse_day_expr,
    parse_time_of_day,
    readable_date,
    time_from_today
  };

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn parses_relative_and_named_days()
  {
    // Saturday
    let today = day(2026, 10, 17);
    assert_eq!(
      parse_day_expr("today", today)
        .expect("today"),
      today
    );
    assert_eq!(
      parse_day_expr(
        "tomorrow", today
      )
      .expect("tomorrow"),
      day(2026, 10, 18)
    );
    assert_eq!(
      parse_day_expr("Monday", today)
        .expect("weekday"),
      day(2026, 10, 19)
    );
    assert_eq!(
      parse_day_expr("sat", today)
        .expect("same weekday"),
      day(2026, 10, 24)
    );
    assert_eq!(
      parse_day_expr("-3d", today)
        .expect("relative"),
      day(2026, 10, 14)
    );
    assert_eq!(
      parse_day_expr(
        "2026-12-25",
        today
      )
      .expect("iso date"),
      day(2026, 12, 25)
    );
    assert!(
      parse_day_expr("someday", today)
        .is_err()
    );
  }

  #[test]
  fn parses_clock_times() {
    let expect =
      |h: u32, m: u32| {
        NaiveTime::from_hms_opt(h, m, 0)
          .expect("valid time")
      };
    assert_eq!(
      parse_time_of_day("15:23")
        .expect("24h"),
      expect(15, 23)
    );
    assert_eq!(
      parse_time_of_day("3:23pm")
        .expect("12h"),
      expect(15, 23)
    );
    assert_eq!(
      parse_time_of_day("8")
        .expect("bare hour"),
      expect(8, 0)
    );
    assert_eq!(
      parse_time_of_day("12am")
        .expect("midnight"),
      expect(0, 0)
    );
    assert!(
      parse_time_of_day("24:00")
        .is_err()
    );
    assert!(
      parse_time_of_day("9:75")
        .is_err()
    );
  }

  #[test]
  fn weekend_and_readable_date() {
    assert!(is_weekend(day(
      2026, 10, 17
    )));
    assert!(!is_weekend(day(
      2026, 10, 19
    )));
    assert_eq!(
      readable_date(day(2026, 10, 19)),
      "Monday 19 October 2026"
    );
  }

  #[test]
  fn time_from_today_offsets_days() {
    let clock = FixedClock::at_midnight(
      day(2026, 10, 17)
    );
    let at = time_from_today(
      &clock, 2, 14, 30
    )
    .expect("valid offset");
    assert_eq!(
      at.to_string(),
      "2026-10-19 14:30:00"
    );
    assert!(
      time_from_today(
        &clock, 0, 25, 0
      )
      .is_err()
    );
  }
}
