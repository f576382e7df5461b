//! Periodic sweep over the content store, the PIT and the faces.

use ccn_relay_common::Suite;
use log::{debug, trace};
use std::time::Instant;

use crate::relay::Relay;

/// What one sweep did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AgeingReport {
    pub contents_removed: usize,
    pub contents_staled: usize,
    pub interests_removed: usize,
    pub interests_retransmitted: usize,
    pub faces_removed: usize,
}

impl Relay {
    pub fn do_ageing(&mut self) -> AgeingReport {
        self.do_ageing_at(Instant::now())
    }

    /// Runs one sweep as if the clock read `now`.
    pub fn do_ageing_at(&mut self, now: Instant) -> AgeingReport {
        trace!("ageing");
        let mut report = AgeingReport::default();

        let content_timeout = self.config.content_timeout();
        for id in self.cs.ids() {
            let Some(entry) = self.cs.get_mut(id) else {
                continue;
            };
            if !entry.is_static && entry.last_used + content_timeout <= now {
                debug!("  ageing out content <{}>", entry.packet.prefix);
                self.cs.remove(id);
                self.metrics.cs_expirations.increment();
                report.contents_removed += 1;
                continue;
            }
            if entry.stale || entry.packet.suite() != Suite::NdnTlv {
                continue;
            }
            if let Some(freshness) = entry.packet.freshness_period() {
                if entry.last_used + freshness <= now {
                    trace!("  content <{}> is stale", entry.packet.prefix);
                    entry.stale = true;
                    report.contents_staled += 1;
                }
            }
        }

        let max_retries = self.config.max_interest_retransmit;
        for id in self.pit.ids() {
            let Some(entry) = self.pit.get(id) else {
                continue;
            };
            if entry.expires_at() <= now || entry.retries >= max_retries {
                debug!(
                    "  ageing out interest <{}> after {} retries",
                    entry.packet.prefix, entry.retries
                );
                self.pit.remove(id);
                self.metrics.pit_expirations.increment();
                self.metrics.interests_timed_out.increment();
                report.interests_removed += 1;
                continue;
            }

            debug!(" retransmit {} <{}>", entry.retries, entry.packet.prefix);
            if let Err(e) = self.propagate(id) {
                debug!("  retransmission of {} failed: {}", id, e);
            }
            if let Some(entry) = self.pit.get_mut(id) {
                entry.retries += 1;
            }
            self.metrics.interests_retransmitted.increment();
            report.interests_retransmitted += 1;
        }

        let face_timeout = self.config.face_timeout();
        let idle: Vec<_> = self
            .faces
            .iter()
            .filter(|f| !f.flags.is_static && f.last_used + face_timeout <= now)
            .map(|f| f.id)
            .collect();
        for face in idle {
            if self.face_remove(face).is_ok() {
                report.faces_removed += 1;
            }
        }

        self.update_gauges();
        report
    }
}
