use std::fmt::Write as _;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::app::App;
use crate::config::AppConfig;
use crate::reminder::LocalClock;
use crate::store::{ItemId, ItemStore, Namespace};
use crate::sync::{ListSynchronizer, RowBuffer};

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Item text; multiple words are joined with spaces
    #[arg(required = true)]
    pub text: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Print items as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DoneArgs {
    /// Position shown by `list` (1-based)
    pub index: usize,
    /// Mark the item as not done
    #[arg(long)]
    pub undo: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    /// Position shown by `list` (1-based)
    pub index: usize,
}

#[derive(Args, Debug, Clone)]
pub struct MoveArgs {
    /// Current position
    pub from: usize,
    /// Target position
    pub to: usize,
}

#[derive(Args, Debug, Clone)]
pub struct RemindArgs {
    /// Position shown by `list` (1-based)
    pub index: usize,
    /// 24-hour time of day, e.g. 18:30
    #[arg(required_unless_present = "clear", conflicts_with = "clear")]
    pub time: Option<String>,
    /// Remove the stored reminder
    #[arg(long)]
    pub clear: bool,
}

pub type CliList<S> = ListSynchronizer<S, RowBuffer>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListedItem<'a> {
    index: usize,
    id: &'a ItemId,
    text: &'a str,
    done: bool,
    order: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    notify_time: Option<OffsetDateTime>,
}

pub fn run_tui<S: ItemStore>(app: &mut App<S>) -> Result<()> {
    app.run()
}

/// Loads the collection for a one-shot command.
pub fn open_list<S: ItemStore>(store: S, ns: Namespace, config: &AppConfig) -> Result<CliList<S>> {
    let mut list = ListSynchronizer::new(store, ns, RowBuffer::default(), config.reorder.long_press());
    list.reload().context("loading items")?;
    Ok(list)
}

pub fn add_item<S: ItemStore>(list: &mut CliList<S>, args: AddArgs) -> Result<String> {
    let text = args.text.join(" ");
    let Some(id) = list.create(&text).context("creating item")? else {
        bail!("item text cannot be empty");
    };
    let index = list
        .items()
        .iter()
        .position(|item| item.id == id)
        .map(|idx| idx + 1)
        .unwrap_or(list.items().len());
    Ok(format!("Added {index}. {}\n", text.trim()))
}

pub fn list_items<S: ItemStore>(list: &CliList<S>, args: &ListArgs, clock: &LocalClock) -> Result<String> {
    if args.json {
        let listed: Vec<ListedItem<'_>> = list
            .items()
            .iter()
            .enumerate()
            .map(|(idx, item)| ListedItem {
                index: idx + 1,
                id: &item.id,
                text: &item.text,
                done: item.done,
                order: item.order,
                notify_time: item.notify_time,
            })
            .collect();
        let mut out = serde_json::to_string_pretty(&listed).context("serializing items")?;
        out.push('\n');
        return Ok(out);
    }
    Ok(format_rows(list, clock))
}

fn format_rows<S: ItemStore>(list: &CliList<S>, clock: &LocalClock) -> String {
    let rows = list.view().rows();
    if rows.is_empty() {
        return "No items.\n".to_string();
    }
    let mut out = String::new();
    for row in rows {
        let mark = if row.done { 'x' } else { ' ' };
        let _ = write!(&mut out, "{}. [{mark}] {}", row.index, row.text);
        if let Some(at) = row.notify_time {
            let _ = write!(&mut out, "  (reminder {})", format_reminder(clock.localize(at)));
        }
        out.push('\n');
    }
    out
}

fn format_reminder(at: OffsetDateTime) -> String {
    at.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| at.to_string())
}

pub fn mark_done<S: ItemStore>(list: &mut CliList<S>, args: DoneArgs) -> Result<String> {
    let id = list.row_by_index(args.index)?.id.clone();
    list.set_done(&id, !args.undo)
        .with_context(|| format!("updating item {}", args.index))?;
    let state = if args.undo { "not done" } else { "done" };
    Ok(format!("Marked {} {state}\n", args.index))
}

pub fn remove_item<S: ItemStore>(list: &mut CliList<S>, args: RemoveArgs) -> Result<String> {
    let item = list.row_by_index(args.index)?;
    let (id, text) = (item.id.clone(), item.text.clone());
    list.delete(&id)
        .with_context(|| format!("deleting item {}", args.index))?;
    Ok(format!("Deleted {}. {text}\n", args.index))
}

pub fn move_item<S: ItemStore>(list: &mut CliList<S>, args: MoveArgs) -> Result<String> {
    let report = list
        .move_item(args.from, args.to)
        .with_context(|| format!("moving item {} to {}", args.from, args.to))?;
    tracing::debug!(writes = report.applied, "move committed");
    Ok(format!("Moved {} to {}\n", args.from, args.to))
}

pub fn remind<S: ItemStore>(list: &mut CliList<S>, args: RemindArgs, clock: &LocalClock) -> Result<String> {
    let item = list.row_by_index(args.index)?;
    let id = item.id.clone();
    if args.clear {
        list.clear_reminder(&id)
            .with_context(|| format!("clearing reminder on item {}", args.index))?;
        return Ok(format!("Cleared reminder for {}\n", args.index));
    }
    let Some(input) = args.time.as_deref() else {
        bail!("a time of day (HH:MM) or --clear is required");
    };
    let reminder = list.set_reminder(&id, input, clock.now())?;
    Ok(format!(
        "Reminder for \"{}\" set for {} (fires while the TUI is running)\n",
        reminder.text,
        format_reminder(reminder.fire_at)
    ))
}
