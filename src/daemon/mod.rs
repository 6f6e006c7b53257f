pub mod fetcher;

use anyhow::Result;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use crate::daemon::fetcher::fetch_candidates;
use crate::discord::payload::build_notification;
use crate::discord::webhook::NotificationSink;
use crate::gmail::MailboxProvider;
use crate::mail::extract::decode_message;
use crate::store::StateStore;

pub struct RelaySettings {
    /// Pause after each processed message, to stay under Gmail quotas.
    pub throttle: Duration,
    pub mark_as_read: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            throttle: Duration::from_secs(1),
            mark_as_read: true,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub candidates: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Owns the provider, the delivery target and the persisted state, and runs
/// fetch -> dedup -> decode -> build -> deliver -> record -> mark read.
pub struct Relay<P, S> {
    provider: P,
    sink: S,
    state: StateStore,
    settings: RelaySettings,
}

impl<P: MailboxProvider, S: NotificationSink> Relay<P, S> {
    pub fn new(provider: P, sink: S, state: StateStore, settings: RelaySettings) -> Self {
        Self {
            provider,
            sink,
            state,
            settings,
        }
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// One sync cycle. Per-message failures are logged and counted; only a
    /// failed fetch or a failed ledger write aborts the cycle.
    pub fn run_once(&mut self) -> Result<CycleReport> {
        let candidates = fetch_candidates(&self.provider, &mut self.state.cursor)?;
        let mut report = CycleReport {
            candidates: candidates.len(),
            ..Default::default()
        };

        if candidates.is_empty() {
            info!("No new mail");
            return Ok(report);
        }
        info!("Found {} candidate message(s)", candidates.len());

        let mut processed_any = false;
        for candidate in &candidates {
            let id = candidate.id.as_str();
            if self.state.ledger.contains(id) {
                debug!("Skipping already delivered message {id}");
                report.skipped += 1;
                continue;
            }

            // pause only between messages that actually hit the API
            if processed_any && !self.settings.throttle.is_zero() {
                thread::sleep(self.settings.throttle);
            }
            processed_any = true;

            let message = match decode_message(&self.provider, id) {
                Ok(m) => m,
                Err(e) => {
                    warn!("Could not load message {id}: {e:#}");
                    report.failed += 1;
                    continue;
                }
            };

            let subject = message.subject.clone();
            let payload = build_notification(message, Utc::now());

            if let Err(e) = self.sink.deliver(&payload) {
                error!("Delivery failed for {id} ({subject}): {e:#}");
                report.failed += 1;
                continue;
            }

            self.state.ledger.add(id)?;
            report.delivered += 1;
            info!("Delivered: {subject}");

            if self.settings.mark_as_read {
                match self.provider.mark_read(id) {
                    Ok(()) => debug!("Marked {id} as read"),
                    Err(e) => warn!("Could not mark {id} as read: {e:#}"),
                }
            }
        }

        info!(
            "Cycle done: {} delivered, {} skipped, {} failed",
            report.delivered, report.skipped, report.failed
        );
        Ok(report)
    }
}

/// Polls until Ctrl-C. A failed cycle is logged and retried after the usual interval.
pub fn run_daemon<P: MailboxProvider, S: NotificationSink>(
    relay: &mut Relay<P, S>,
    interval: Duration,
) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r2 = running.clone();
    ctrlc::set_handler(move || {
        r2.store(false, Ordering::SeqCst);
    })?;

    info!("Relay started; checking every {}s", interval.as_secs());

    while running.load(Ordering::SeqCst) {
        if let Err(e) = relay.run_once() {
            error!("Cycle failed: {e:#}");
        }
        sleep_while_running(&running, interval);
    }

    info!("Relay stopped");
    Ok(())
}

fn sleep_while_running(running: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    while running.load(Ordering::SeqCst) {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            break;
        }
        thread::sleep(left.min(Duration::from_millis(500)));
    }
}
