use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::SessionError;

type Outcome = Result<(), SessionError>;

#[derive(Debug, Default)]
struct Slot {
    outcome: Option<Outcome>,
    wakers: Vec<Waker>,
}

/// Session-owned side of the completion signal. Resolves at most once.
#[derive(Debug, Default)]
pub struct Completer {
    slot: Rc<RefCell<Slot>>,
}

impl Completer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settle the outcome. Only the first call has any effect; returns
    /// whether this call was it.
    pub fn resolve(&self, outcome: Outcome) -> bool {
        let wakers = {
            let mut slot = self.slot.borrow_mut();
            if slot.outcome.is_some() {
                return false;
            }
            slot.outcome = Some(outcome);
            std::mem::take(&mut slot.wakers)
        };
        for waker in wakers {
            waker.wake();
        }
        true
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.borrow().outcome.is_some()
    }

    pub fn completion(&self) -> SessionCompletion {
        SessionCompletion {
            slot: Rc::clone(&self.slot),
        }
    }
}

/// Future resolving when a session ends: `Ok` at end of track, `Err` when
/// the session was terminated by a failure.
#[derive(Debug, Clone)]
pub struct SessionCompletion {
    slot: Rc<RefCell<Slot>>,
}

impl SessionCompletion {
    pub fn is_resolved(&self) -> bool {
        self.slot.borrow().outcome.is_some()
    }

    /// Outcome without waiting, if already settled.
    pub fn outcome(&self) -> Option<Outcome> {
        self.slot.borrow().outcome.clone()
    }
}

impl Future for SessionCompletion {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.borrow_mut();
        if let Some(outcome) = &slot.outcome {
            return Poll::Ready(outcome.clone());
        }
        slot.wakers.push(cx.waker().clone());
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TimeSourceError;

    #[test]
    fn first_resolution_wins() {
        let completer = Completer::new();
        let completion = completer.completion();
        assert!(!completion.is_resolved());

        assert!(completer.resolve(Ok(())));
        assert!(!completer.resolve(Err(TimeSourceError::PlaybackRefused("late".into()).into())));

        assert_eq!(pollster::block_on(completion), Ok(()));
    }

    #[test]
    fn every_observer_sees_the_failure() {
        let completer = Completer::new();
        let a = completer.completion();
        let b = a.clone();
        let err: SessionError = TimeSourceError::PlaybackRefused("no device".into()).into();
        completer.resolve(Err(err.clone()));

        assert_eq!(pollster::block_on(a), Err(err.clone()));
        assert_eq!(b.outcome(), Some(Err(err)));
    }
}
