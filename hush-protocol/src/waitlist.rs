use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::command::Command;

/// A shared holding area for commands that have been read off the wire but
/// not yet claimed by whichever task is waiting on their reply (§4.3).
///
/// Matching is by predicate rather than a single id so a waiter can, for
/// example, accept either a reply to its own request id or an unsolicited
/// `ERR`. Among commands satisfying the same predicate, the oldest queued
/// one is always returned first.
#[derive(Clone)]
pub struct Waitlist {
    inner: Arc<Mutex<VecDeque<Command>>>,
    notify: Arc<Notify>,
}

impl Waitlist {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::new())),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Queues a command and wakes any waiters so they can re-check the queue.
    pub async fn insert(&self, command: Command) {
        self.inner.lock().await.push_back(command);
        self.notify.notify_waiters();
    }

    /// Removes and returns the oldest queued command matching `predicate`,
    /// if one is already present. Never waits.
    pub async fn try_get<F>(&self, predicate: F) -> Option<Command>
    where
        F: Fn(&Command) -> bool,
    {
        let mut queue = self.inner.lock().await;
        let index = queue.iter().position(|cmd| predicate(cmd))?;
        queue.remove(index)
    }

    /// Waits until a command matching `predicate` is available, removes it,
    /// and returns it. Cancel-safe: if the returned future is dropped before
    /// completion (e.g. the caller was itself cancelled), no command is lost.
    pub async fn get<F>(&self, predicate: F) -> Command
    where
        F: Fn(&Command) -> bool,
    {
        loop {
            // Subscribe before checking so a notification fired between the
            // check and the wait is never missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(command) = self.try_get(&predicate).await {
                return command;
            }
            notified.await;
        }
    }

    /// Like [`Waitlist::get`], but gives up and returns `None` if `cancel`
    /// resolves first (used for idle/shutdown cancellation).
    pub async fn get_until<F, C>(&self, predicate: F, cancel: C) -> Option<Command>
    where
        F: Fn(&Command) -> bool,
        C: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(command) = self.try_get(&predicate).await {
                return Some(command);
            }
            tokio::select! {
                _ = notified => continue,
                _ = &mut cancel => return None,
            }
        }
    }

    /// Drops every command matching `predicate` without returning them, e.g.
    /// to discard a connection's outstanding commands on disconnect.
    pub async fn cancel<F>(&self, predicate: F)
    where
        F: Fn(&Command) -> bool,
    {
        self.inner.lock().await.retain(|cmd| !predicate(cmd));
    }

    /// Drops every queued command.
    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }
}

impl Default for Waitlist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::packet::Packet;

    fn command(id: u16) -> Command {
        Command::new(1, Packet::new(Action::Ok, id, 0, vec![]).unwrap(), false)
    }

    #[tokio::test]
    async fn try_get_returns_oldest_match_first() {
        let waitlist = Waitlist::new();
        waitlist.insert(command(1)).await;
        waitlist.insert(command(2)).await;
        let got = waitlist.try_get(|_| true).await.unwrap();
        assert_eq!(got.id(), 1);
    }

    #[tokio::test]
    async fn get_waits_for_a_matching_insert() {
        let waitlist = Waitlist::new();
        let waiter = tokio::spawn({
            let waitlist = waitlist.clone();
            async move { waitlist.get(|cmd| cmd.id() == 9).await }
        });
        tokio::task::yield_now().await;
        waitlist.insert(command(9)).await;
        let got = waiter.await.unwrap();
        assert_eq!(got.id(), 9);
    }

    #[tokio::test]
    async fn get_until_cancels_when_told() {
        let waitlist = Waitlist::new();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let waiter = tokio::spawn({
            let waitlist = waitlist.clone();
            async move {
                waitlist
                    .get_until(|cmd| cmd.id() == 9, async {
                        let _ = rx.await;
                    })
                    .await
            }
        });
        tokio::task::yield_now().await;
        tx.send(()).unwrap();
        assert!(waiter.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancel_drops_matching_entries() {
        let waitlist = Waitlist::new();
        waitlist.insert(command(1)).await;
        waitlist.insert(command(2)).await;
        waitlist.cancel(|cmd| cmd.id() == 1).await;
        assert!(waitlist.try_get(|cmd| cmd.id() == 1).await.is_none());
        assert!(waitlist.try_get(|cmd| cmd.id() == 2).await.is_some());
    }
}
