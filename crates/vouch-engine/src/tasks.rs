//! Periodic background work: inbox polling and the reminder sweep.
//!
//! Each task is a `tokio::time::interval` loop that exits when the shutdown
//! flag flips to `true` (or its sender is dropped). Errors are logged and the
//! loop carries on with the next tick.

use std::{sync::Arc, time::Duration};

use tokio::{
  sync::watch,
  task::JoinHandle,
  time::{MissedTickBehavior, interval},
};

use crate::{
  collab::Mailbox,
  controller::{Backend, Controller},
  reminders::ReminderScheduler,
};

/// Sender half of the shutdown flag shared by every periodic task.
pub type Shutdown = watch::Sender<bool>;

pub fn shutdown_channel() -> (Shutdown, watch::Receiver<bool>) { watch::channel(false) }

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
  loop {
    if *shutdown.borrow_and_update() {
      return;
    }
    // A dropped sender counts as shutdown too.
    if shutdown.changed().await.is_err() {
      return;
    }
  }
}

pub fn spawn_inbox_poller<B, M>(
  controller: Arc<Controller<B>>,
  mailbox: M,
  every: Duration,
  mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
  B: Backend,
  M: Mailbox + 'static,
{
  tokio::spawn(async move {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(every_secs = every.as_secs(), "inbox poller started");

    loop {
      tokio::select! {
        _ = stopped(&mut shutdown) => break,
        _ = ticker.tick() => {
          if let Err(e) = controller.poll_inbox(&mailbox).await {
            tracing::warn!(error = %e, "inbox poll failed");
          }
        }
      }
    }
    tracing::info!("inbox poller stopped");
  })
}

pub fn spawn_reminder_sweeper<B: Backend>(
  controller: Arc<Controller<B>>,
  scheduler: Arc<ReminderScheduler>,
  every: Duration,
  mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
  tokio::spawn(async move {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(every_secs = every.as_secs(), "reminder sweeper started");

    loop {
      tokio::select! {
        _ = stopped(&mut shutdown) => break,
        _ = ticker.tick() => {
          if let Err(e) = scheduler.sweep(&controller).await {
            tracing::warn!(error = %e, "reminder sweep failed");
          }
        }
      }
    }
    tracing::info!("reminder sweeper stopped");
  })
}
