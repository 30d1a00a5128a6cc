//! One-at-a-time presentation of transient notifications
//!
//! Every notification goes through a single FIFO queue. At most one is on
//! screen; the next is shown when the presenter finishes the current one.

use crate::conversation::ConversationKey;
use crate::events::{EventBus, SessionEvent};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tracing::debug;

/// A displayable unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Conversation to open when the user taps a message notification
    pub conversation: Option<ConversationKey>,
}

impl Notification {
    pub fn message(title: impl Into<String>, body: impl Into<String>, conversation: ConversationKey) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            conversation: Some(conversation),
        }
    }

    pub fn alert(message: impl Into<String>, title: Option<&str>) -> Self {
        Self {
            title: title.unwrap_or_default().to_string(),
            body: message.into(),
            conversation: None,
        }
    }
}

/// How the user left a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Opened,
    Dismissed,
}

/// Displays notifications. `show` must not block: present asynchronously and
/// finish the completion once the notification goes away. Finishing it from
/// inside `show` is allowed.
pub trait Presenter: Send + Sync {
    fn show(&self, notification: Notification, completion: Completion);
}

/// Completion signal for the notification currently on screen.
///
/// Dropping it unfinished counts as a dismissal.
#[derive(Debug)]
pub struct Completion {
    queue: Option<Weak<NotificationQueue>>,
    conversation: Option<ConversationKey>,
}

impl Completion {
    pub fn finish(mut self, outcome: Outcome) {
        self.resolve(outcome);
    }

    fn resolve(&mut self, outcome: Outcome) {
        let Some(queue) = self.queue.take().and_then(|q| q.upgrade()) else {
            return;
        };
        if outcome == Outcome::Opened {
            if let Some(conversation) = self.conversation.take() {
                queue.events.publish(SessionEvent::NotificationOpened(conversation));
            }
        }
        queue.advance();
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.resolve(Outcome::Dismissed);
    }
}

#[derive(Debug, Default)]
struct QueueState {
    showing: bool,
    backlog: VecDeque<Notification>,
    /// A thread is inside `Presenter::show`
    presenting: bool,
    /// The current notification completed while `presenting` was set
    advance_pending: bool,
}

impl QueueState {
    /// After `show` returns: the next notification to present, if the one
    /// just shown already completed
    fn after_show(&mut self) -> Option<Notification> {
        if !std::mem::take(&mut self.advance_pending) {
            self.presenting = false;
            return None;
        }
        let next = self.backlog.pop_front();
        if next.is_none() {
            self.showing = false;
            self.presenting = false;
        }
        next
    }
}

/// FIFO of notifications with a single "showing" slot
pub struct NotificationQueue {
    state: Mutex<QueueState>,
    presenter: Arc<dyn Presenter>,
    events: EventBus,
}

impl NotificationQueue {
    pub fn new(presenter: Arc<dyn Presenter>, events: EventBus) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState::default()),
            presenter,
            events,
        })
    }

    /// Show now if idle, otherwise wait behind everything already queued
    pub fn enqueue(self: &Arc<Self>, notification: Notification) {
        let to_show = {
            let mut state = self.state.lock();
            if state.showing {
                state.backlog.push_back(notification);
                debug!(pending = state.backlog.len(), "Notification queued");
                None
            } else {
                state.showing = true;
                state.presenting = true;
                Some(notification)
            }
        };

        if let Some(notification) = to_show {
            self.present(notification);
        }
    }

    /// Whether a notification is on screen
    pub fn is_showing(&self) -> bool {
        self.state.lock().showing
    }

    /// Notifications waiting behind the one on screen
    pub fn pending(&self) -> usize {
        self.state.lock().backlog.len()
    }

    fn advance(self: &Arc<Self>) {
        let next = {
            let mut state = self.state.lock();
            if state.presenting {
                // the thread inside `show` picks up the next one
                state.advance_pending = true;
                return;
            }
            match state.backlog.pop_front() {
                Some(next) => {
                    state.presenting = true;
                    Some(next)
                }
                None => {
                    state.showing = false;
                    None
                }
            }
        };

        if let Some(notification) = next {
            self.present(notification);
        }
    }

    /// Show `first`, then keep going for as long as each notification
    /// completes before `show` returns. Caller must have set `presenting`.
    fn present(self: &Arc<Self>, first: Notification) {
        let mut next = Some(first);
        while let Some(notification) = next {
            debug!(title = %notification.title, "Showing notification");
            let completion = Completion {
                queue: Some(Arc::downgrade(self)),
                conversation: notification.conversation.clone(),
            };
            self.presenter.show(notification, completion);
            next = self.state.lock().after_show();
        }
    }
}
