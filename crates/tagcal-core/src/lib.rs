pub mod cli;
pub mod config;
pub mod datetime;
pub mod duration;
pub mod event;
pub mod notify;
pub mod render;
pub mod schedule;
pub mod session;
pub mod store;
pub mod tag;

use std::ffi::OsString;
use std::io::{
  self,
  IsTerminal
};

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::datetime::{
  Clock,
  parse_day_expr
};
use crate::notify::NoticeQueue;
use crate::session::{
  Command,
  Session
};
use crate::store::CalendarStore;
use crate::tag::TagKey;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting tagcal"
  );
  debug!(overrides = ?cli.overrides, "config overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  )?;

  let clock = cfg.clock();
  let mut store = CalendarStore::new(
    cfg.build_calendar(),
    clock.today(),
    NoticeQueue::new()
  );

  if let Some(expr) = cli.day.as_deref()
  {
    let day = parse_day_expr(
      expr,
      store.today()
    )
    .context("invalid --day")?;
    store.select_day(day);
  }
  if let Some(tag) = cli.tag.as_deref() {
    store
      .select_tag(TagKey::new(tag))
      .context("invalid --tag")?;
  }

  let renderer =
    render::Renderer::new(!cli.no_color);
  let stdin = io::stdin();
  let interactive = cli.rest.is_empty()
    && stdin.is_terminal();
  let mut session = Session::new(
    store,
    renderer,
    cfg.site.clone()
  )
  .with_prompt(interactive);

  let stdout = io::stdout();
  let mut out = stdout.lock();

  if cli.rest.is_empty() {
    session.run(stdin.lock(), &mut out)?;
  } else {
    let command =
      Command::parse(&cli.rest)?;
    session.execute(command, &mut out)?;
  }

  info!("done");
  Ok(())
}
