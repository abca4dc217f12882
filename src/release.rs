//! "All contacts released" signalling
//!
//! The recognizer arms the signal when a contact goes down and fires it at
//! the first flush that finds nothing down. Waiters hold a [`Released`]
//! future obtained while the signal was armed.

use crate::error::GestureError;
use tokio::sync::watch;

/// Sender side, owned by the recognizer
#[derive(Debug)]
pub(crate) struct ReleaseSignal {
    releases: watch::Sender<u64>,
    armed: bool,
}

impl Default for ReleaseSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseSignal {
    pub(crate) fn new() -> Self {
        let (releases, _) = watch::channel(0);
        Self {
            releases,
            armed: false,
        }
    }

    pub(crate) fn arm(&mut self) {
        self.armed = true;
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed
    }

    /// Resolve current waiters and disarm until the next `arm`
    pub(crate) fn fire(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        self.releases.send_modify(|count| *count += 1);
    }

    pub(crate) fn subscribe(&self) -> Option<Released> {
        if !self.armed {
            return None;
        }
        let rx = self.releases.subscribe();
        let seen = *rx.borrow();
        Some(Released { rx, seen })
    }
}

/// Resolves once no contacts are down
#[derive(Debug)]
pub struct Released {
    rx: watch::Receiver<u64>,
    seen: u64,
}

impl Released {
    /// Wait for the release.
    ///
    /// Fails with [`GestureError::TornDown`] if the recognizer is destroyed
    /// first.
    pub async fn wait(mut self) -> Result<(), GestureError> {
        loop {
            if *self.rx.borrow_and_update() != self.seen {
                return Ok(());
            }
            self.rx
                .changed()
                .await
                .map_err(|_| GestureError::TornDown)?;
        }
    }
}
