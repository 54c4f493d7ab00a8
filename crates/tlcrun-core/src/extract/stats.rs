//! State-space counters from the engine's progress lines.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::RunStats;

fn counts_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?P<generated>[\d,]+) states generated(?: \([^)]*\))?, ",
            r"(?P<distinct>[\d,]+) distinct states found(?: \([^)]*\))?, ",
            r"(?P<left>[\d,]+) states left on queue",
        ))
        .expect("static regex")
    })
}

fn depth_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"The depth of the complete state graph search is (?P<depth>[\d,]+)")
            .expect("static regex")
    })
}

fn parse_count(text: &str) -> Option<u64> {
    text.replace(',', "").parse().ok()
}

/// Tracks the latest counters as stdout lines stream past.
#[derive(Debug, Default)]
pub struct StatsCollector {
    stats: RunStats,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress lines repeat during a run; the final one wins.
    pub fn observe(&mut self, line: &str) {
        if let Some(caps) = counts_re().captures(line) {
            self.stats.states_generated = parse_count(&caps["generated"]);
            self.stats.distinct_states = parse_count(&caps["distinct"]);
            self.stats.states_left_on_queue = parse_count(&caps["left"]);
        }
        if let Some(caps) = depth_re().captures(line) {
            self.stats.depth = parse_count(&caps["depth"]);
        }
    }

    pub fn finish(self) -> RunStats {
        self.stats
    }
}

/// Extract the last reported counters from engine stdout.
pub fn parse_stats(stdout: &str) -> RunStats {
    let mut collector = StatsCollector::new();
    for line in stdout.lines() {
        collector.observe(line);
    }
    collector.finish()
}
