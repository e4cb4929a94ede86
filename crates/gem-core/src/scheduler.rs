//! Deferred change-notification queue
//!
//! Field writes never run listeners synchronously. Each committed change is
//! queued and delivered by a later `tick`; a tick only drains what was queued
//! before it started, so changes made by listeners wait for the next tick.

use crate::descriptor::{Change, FieldSpec};
use crate::runtime::Gem;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A queued change and the field whose listeners receive it
pub struct Notification {
    field: Rc<FieldSpec>,
    change: Change,
}

impl Notification {
    /// Pair a change with its field
    pub fn new(field: Rc<FieldSpec>, change: Change) -> Self {
        Self { field, change }
    }

    /// The committed change
    pub fn change(&self) -> &Change {
        &self.change
    }
}

/// Outcome of draining the queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Notifications taken off the queue
    pub notifications: usize,
    /// Listener calls that succeeded
    pub delivered: usize,
    /// Listener calls that failed (logged, not propagated)
    pub failed: usize,
    /// Notifications still queued afterwards
    pub pending: usize,
}

impl TickReport {
    fn absorb(&mut self, other: TickReport) {
        self.notifications += other.notifications;
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.pending = other.pending;
    }
}

/// FIFO queue of pending notifications
#[derive(Default)]
pub struct NotifyQueue {
    pending: RefCell<VecDeque<Notification>>,
}

impl NotifyQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a notification for the next tick
    pub fn schedule(&self, notification: Notification) {
        self.pending.borrow_mut().push_back(notification);
    }

    /// Number of queued notifications
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Deliver the notifications queued before this call
    pub fn tick(&self, gem: &Gem) -> TickReport {
        let batch = self.pending.borrow().len();
        let mut report = TickReport::default();

        for _ in 0..batch {
            // Pop one at a time; listeners may schedule more while we run
            let next = self.pending.borrow_mut().pop_front();
            let Some(notification) = next else {
                break;
            };
            log::trace!(
                "delivering change of {}.{}",
                notification.change.target.type_name(),
                notification.change.key
            );
            let (delivered, failed) = notification.field.notify(gem, &notification.change);
            report.notifications += 1;
            report.delivered += delivered;
            report.failed += failed;
        }

        report.pending = self.len();
        report
    }

    /// Tick until the queue is empty or `max_ticks` ticks have run
    pub fn run_until_idle(&self, gem: &Gem, max_ticks: usize) -> TickReport {
        let mut total = TickReport::default();
        for _ in 0..max_ticks {
            if self.is_empty() {
                break;
            }
            total.absorb(self.tick(gem));
        }
        total.pending = self.len();
        if total.pending > 0 {
            log::warn!(
                "notification queue still holds {} entries after {} ticks",
                total.pending,
                max_ticks
            );
        }
        total
    }
}
