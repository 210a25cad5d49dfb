use actix_web::rt::{self, task::JoinHandle};
use std::{sync::Arc, time::Duration};

use super::{InboxRelay, NoteStore};

/// Background task that periodically drops expired notes and inboxes.
/// Lazy checks on access cover the gap between ticks.
pub struct Sweeper {
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Must be called from within the actix runtime.
    pub fn spawn(notes: Arc<NoteStore>, inboxes: Arc<InboxRelay>, period: Duration) -> Self {
        let handle = rt::spawn(async move {
            let mut interval = rt::time::interval(period);
            // the first tick fires immediately
            interval.tick().await;

            loop {
                interval.tick().await;

                let notes_swept = notes.sweep_expired();
                let inboxes_swept = inboxes.sweep_expired();
                if notes_swept + inboxes_swept > 0 {
                    log::info!(
                        "sweep removed {} expired notes and {} expired inboxes",
                        notes_swept,
                        inboxes_swept
                    );
                } else {
                    log::debug!("sweep found nothing to remove");
                }
            }
        });

        Sweeper { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}
