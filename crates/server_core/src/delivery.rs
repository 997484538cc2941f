use std::cell::Cell;

use shared::{codec::Envelope, domain::PlayerId};
use tracing::warn;

use crate::collaborators::{DeliveryError, Transport};

thread_local! {
    static SYSTEM_LOG_SUPPRESSED: Cell<bool> = const { Cell::new(false) };
}

struct SuppressGuard {
    previous: bool,
}

impl Drop for SuppressGuard {
    fn drop(&mut self) {
        SYSTEM_LOG_SUPPRESSED.with(|flag| flag.set(self.previous));
    }
}

/// Runs `f` with outbound system-message logging switched off on this thread,
/// so routed chat that is already logged as chat is not logged again as a
/// system message.
pub fn without_system_logging<R>(f: impl FnOnce() -> R) -> R {
    let previous = SYSTEM_LOG_SUPPRESSED.with(|flag| flag.replace(true));
    let _guard = SuppressGuard { previous };
    f()
}

pub fn system_logging_suppressed() -> bool {
    SYSTEM_LOG_SUPPRESSED.with(Cell::get)
}

#[derive(Debug, Default)]
pub struct FanoutReport {
    pub delivered: Vec<PlayerId>,
    pub failed: Vec<PlayerId>,
}

impl FanoutReport {
    pub fn absorb(&mut self, other: FanoutReport) {
        self.delivered.extend(other.delivered);
        self.failed.extend(other.failed);
    }
}

/// Sends `message` to every recipient. A failed send is logged and does not
/// stop the rest.
pub fn fan_out(
    transport: &dyn Transport,
    recipients: impl IntoIterator<Item = PlayerId>,
    message: &Envelope,
) -> FanoutReport {
    without_system_logging(|| {
        let mut report = FanoutReport::default();
        for recipient in recipients {
            match transport.send_system(recipient, message) {
                Ok(()) => report.delivered.push(recipient),
                Err(error) => {
                    log_delivery_failure(&error);
                    report.failed.push(recipient);
                }
            }
        }
        report
    })
}

fn log_delivery_failure(error: &DeliveryError) {
    warn!(%error, "system message delivery failed");
}
