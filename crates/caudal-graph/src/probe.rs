//! Per-branch buffer counting observers.
//!
//! A [`BranchCounter`] is installed as a probe on one output port per branch.
//! It counts buffers crossing that port and periodically reports the
//! negotiated format. The counter is owned by its probe closure alone; the
//! two branch counters share nothing and each probe runs on its own branch's
//! streaming thread, so no synchronization is needed between them.

use std::sync::Arc;

use crate::port::{Port, ProbeAction};

/// Cycle length: the counter wraps back to 1 upon reaching this value.
pub const REPORT_CYCLE: u32 = 40;

/// Counter state for one branch's buffer observer.
#[derive(Debug)]
pub struct BranchCounter {
    branch: String,
    buffers_seen: u32,
    /// Set when the cycle's report fires. Diagnostic state only; nothing
    /// reads it back before the next cycle overwrites it.
    report_emitted: bool,
}

impl BranchCounter {
    /// Creates a counter for the named branch.
    pub fn new(branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            buffers_seen: 0,
            report_emitted: false,
        }
    }

    /// Buffers seen in the current cycle.
    pub fn buffers_seen(&self) -> u32 {
        self.buffers_seen
    }

    /// Observes one buffer crossing `port`.
    ///
    /// Increments the count, wrapping to 1 upon reaching [`REPORT_CYCLE`]
    /// rather than growing without bound. On the first count of each cycle,
    /// reads the port's negotiated format and emits a single report naming
    /// the branch and sample encoding. Returns whether a report fired.
    pub fn observe(&mut self, port: &Port) -> bool {
        self.buffers_seen += 1;
        if self.buffers_seen >= REPORT_CYCLE {
            self.buffers_seen = 1;
        }
        if self.buffers_seen == 1 {
            let format = port
                .current_format()
                .and_then(|f| f.sample_format().map(str::to_string))
                .unwrap_or_else(|| "unknown".to_string());
            tracing::info!(branch = %self.branch, format = %format, "branch buffer format");
            self.report_emitted = true;
            return true;
        }
        false
    }
}

/// Installs a counting observer on `port` for the named branch.
///
/// The observer never blocks, never drops or alters buffers, and always
/// signals the framework to continue: it is instrumentation, not a filter.
pub fn install_branch_observer(port: &Arc<Port>, branch: &str) {
    let mut counter = BranchCounter::new(branch);
    port.add_probe(Box::new(move |port, _buffer| {
        counter.observe(port);
        ProbeAction::Pass
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port_with_format() -> Arc<Port> {
        let port = Port::output("queue", "src");
        port.set_current_format(
            crate::FormatDescriptor::raw_audio().with(crate::format::ATTR_FORMAT, crate::format::S16LE),
        );
        port
    }

    #[test]
    fn count_wraps_to_one_not_zero() {
        let port = port_with_format();
        let mut counter = BranchCounter::new("monitor");
        for _ in 0..REPORT_CYCLE {
            counter.observe(&port);
        }
        assert_eq!(counter.buffers_seen(), 1);
    }

    #[test]
    fn count_just_before_wrap() {
        let port = port_with_format();
        let mut counter = BranchCounter::new("monitor");
        for _ in 0..(REPORT_CYCLE - 1) {
            counter.observe(&port);
        }
        assert_eq!(counter.buffers_seen(), REPORT_CYCLE - 1);
    }

    #[test]
    fn report_fires_on_first_buffer_of_each_cycle() {
        let port = port_with_format();
        let mut counter = BranchCounter::new("monitor");
        let mut report_deliveries = Vec::new();
        for delivery in 1..=120 {
            if counter.observe(&port) {
                report_deliveries.push(delivery);
            }
        }
        // First buffer, then every wrap: 40 increments reach the cycle
        // boundary once, after which each cycle spans 39 deliveries.
        assert_eq!(report_deliveries, vec![1, 40, 79, 118]);
    }

    #[test]
    fn independent_counters_do_not_interact() {
        let port = port_with_format();
        let mut monitor = BranchCounter::new("monitor");
        let mut playback = BranchCounter::new("playback");
        for _ in 0..1000 {
            monitor.observe(&port);
        }
        assert_eq!(playback.buffers_seen(), 0);
        playback.observe(&port);
        assert_eq!(playback.buffers_seen(), 1);
    }
}
