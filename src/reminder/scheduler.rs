use std::collections::HashMap;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use time::OffsetDateTime;

use super::Reminder;
use crate::config::NotificationPermission;
use crate::store::ItemId;

/// Delivery side of reminders.
pub trait Notifier: Send + 'static {
    fn permission(&self) -> NotificationPermission;
    fn notify(&self, reminder: &Reminder);
}

/// Forwards fired reminders to a channel the event loop drains.
pub struct ChannelNotifier {
    permission: NotificationPermission,
    tx: Sender<Reminder>,
}

impl ChannelNotifier {
    pub fn new(permission: NotificationPermission) -> (Self, Receiver<Reminder>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { permission, tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn notify(&self, reminder: &Reminder) {
        if self.tx.send(reminder.clone()).is_err() {
            tracing::debug!(id = %reminder.item_id, "reminder receiver gone");
        }
    }
}

enum Command {
    Schedule(Reminder),
    Cancel(ItemId),
    Shutdown,
}

/// Fires each scheduled reminder once from a background thread. An item has
/// at most one pending reminder; scheduling again replaces it.
pub struct ReminderScheduler {
    tx: Sender<Command>,
    permission: NotificationPermission,
    worker: Option<JoinHandle<()>>,
}

impl ReminderScheduler {
    pub fn spawn<N: Notifier>(notifier: N) -> Result<Self> {
        let permission = notifier.permission();
        let (tx, rx) = crossbeam_channel::unbounded();
        let worker = thread::Builder::new()
            .name("reminders".into())
            .spawn(move || run(rx, notifier))
            .context("spawning reminder thread")?;
        Ok(Self {
            tx,
            permission,
            worker: Some(worker),
        })
    }

    /// Queues `reminder`. Returns false when notifications are not permitted,
    /// in which case nothing is scheduled.
    pub fn schedule(&self, reminder: Reminder) -> bool {
        if self.permission == NotificationPermission::Denied {
            tracing::debug!(id = %reminder.item_id, "notifications denied, reminder not scheduled");
            return false;
        }
        tracing::info!(id = %reminder.item_id, fire_at = %reminder.fire_at, "reminder scheduled");
        self.tx.send(Command::Schedule(reminder)).is_ok()
    }

    pub fn cancel(&self, id: &ItemId) {
        let _ = self.tx.send(Command::Cancel(id.clone()));
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("reminder thread panicked");
            }
        }
    }
}

fn run<N: Notifier>(rx: Receiver<Command>, notifier: N) {
    let mut pending: HashMap<ItemId, (Instant, Reminder)> = HashMap::new();
    loop {
        let next_due = pending.values().map(|(due, _)| *due).min();
        let command = match next_due {
            Some(due) => match rx.recv_deadline(due) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            },
        };
        match command {
            Some(Command::Schedule(reminder)) => {
                let due = deadline_for(reminder.fire_at);
                pending.insert(reminder.item_id.clone(), (due, reminder));
            }
            Some(Command::Cancel(id)) => {
                pending.remove(&id);
            }
            Some(Command::Shutdown) => break,
            None => {}
        }

        let now = Instant::now();
        let due: Vec<ItemId> = pending
            .iter()
            .filter(|(_, (at, _))| *at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in due {
            if let Some((_, reminder)) = pending.remove(&id) {
                tracing::info!(id = %reminder.item_id, "reminder fired");
                notifier.notify(&reminder);
            }
        }
    }
}

fn deadline_for(fire_at: OffsetDateTime) -> Instant {
    let wait = fire_at - OffsetDateTime::now_utc();
    let wait = if wait.is_positive() {
        wait.unsigned_abs()
    } else {
        Duration::ZERO
    };
    Instant::now() + wait
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    fn reminder(id: &str, fire_at: OffsetDateTime) -> Reminder {
        Reminder {
            item_id: ItemId::from(id),
            text: id.to_string(),
            fire_at,
        }
    }

    #[test]
    fn due_reminder_fires_once() -> Result<()> {
        let (notifier, fired) = ChannelNotifier::new(NotificationPermission::Granted);
        let scheduler = ReminderScheduler::spawn(notifier)?;
        assert!(scheduler.schedule(reminder("a", OffsetDateTime::now_utc())));
        let got = fired.recv_timeout(WAIT)?;
        assert_eq!(got.item_id, ItemId::from("a"));
        assert!(fired.recv_timeout(Duration::from_millis(200)).is_err());
        Ok(())
    }

    #[test]
    fn denied_permission_skips_scheduling() -> Result<()> {
        let (notifier, fired) = ChannelNotifier::new(NotificationPermission::Denied);
        let scheduler = ReminderScheduler::spawn(notifier)?;
        assert!(!scheduler.schedule(reminder("a", OffsetDateTime::now_utc())));
        assert!(fired.recv_timeout(Duration::from_millis(200)).is_err());
        Ok(())
    }

    #[test]
    fn rescheduling_replaces_the_pending_reminder() -> Result<()> {
        let (notifier, fired) = ChannelNotifier::new(NotificationPermission::Granted);
        let scheduler = ReminderScheduler::spawn(notifier)?;
        let far = OffsetDateTime::now_utc() + time::Duration::hours(1);
        scheduler.schedule(reminder("a", far));
        scheduler.schedule(Reminder {
            text: "soon".into(),
            ..reminder("a", OffsetDateTime::now_utc())
        });
        let got = fired.recv_timeout(WAIT)?;
        assert_eq!(got.text, "soon");
        assert!(fired.recv_timeout(Duration::from_millis(200)).is_err());
        Ok(())
    }

    #[test]
    fn cancelled_reminder_never_fires() -> Result<()> {
        let (notifier, fired) = ChannelNotifier::new(NotificationPermission::Granted);
        let scheduler = ReminderScheduler::spawn(notifier)?;
        let soon = OffsetDateTime::now_utc() + time::Duration::milliseconds(300);
        scheduler.schedule(reminder("a", soon));
        scheduler.cancel(&ItemId::from("a"));
        assert!(fired.recv_timeout(Duration::from_millis(800)).is_err());
        Ok(())
    }
}
