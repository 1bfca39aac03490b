use wimax_core::SimTime;

/// Per-flow counters. Grants are made in scheduling passes: `begin_pass` opens a pass,
/// `tentative_grant` books bytes without touching the backlog, and `commit_pass` merges
/// the pass into the authoritative counters exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFlowRecord {
    pub pkts_sent: u64,
    pub bytes_sent: u64,
    pub pkts_rcvd: u64,
    pub bytes_rcvd: u64,
    pub pkts_dropped: u64,

    /// Bytes asked for through bandwidth requests, cumulative
    pub requested_bandwidth: u64,
    /// Bytes granted, cumulative
    pub granted_bandwidth: u64,
    /// Requested but not yet granted bytes
    pub backlogged: u32,
    /// Bytes granted since the bandwidth measurement window last expired
    pub bw_since_last_expiry: u32,

    /// Symbols per unsolicited grant (UGS)
    pub grant_size: u32,
    pub grant_interval: SimTime,
    pub poll_interval: SimTime,
    pub last_grant_time: Option<SimTime>,
    pub last_poll_time: Option<SimTime>,
    /// Last time the downlink scheduler served this flow
    pub dl_timestamp: Option<SimTime>,

    granted_temp: u32,
    pass_open: bool,
}

impl ServiceFlowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_pkts_sent(&mut self, bytes: usize) {
        self.pkts_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    pub fn update_pkts_rcvd(&mut self, bytes: usize) {
        self.pkts_rcvd += 1;
        self.bytes_rcvd += bytes as u64;
    }

    pub fn update_pkts_dropped(&mut self, n: u64) {
        self.pkts_dropped += n;
    }

    /// Incremental requests add to the backlog, aggregate requests replace it
    pub fn update_requested_bandwidth(&mut self, bytes: u32, aggregate: bool) {
        self.requested_bandwidth += bytes as u64;
        if aggregate {
            self.backlogged = bytes;
        } else {
            self.backlogged = self.backlogged.saturating_add(bytes);
        }
    }

    /// Starts a scheduling pass with zeroed tentative counters
    pub fn begin_pass(&mut self) {
        debug_assert!(!self.pass_open, "scheduling pass opened twice");
        self.granted_temp = 0;
        self.pass_open = true;
    }

    pub fn tentative_grant(&mut self, bytes: u32) {
        debug_assert!(self.pass_open, "tentative grant outside a pass");
        self.granted_temp = self.granted_temp.saturating_add(bytes);
    }

    /// Bytes booked in the open pass
    pub fn granted_temp(&self) -> u32 {
        self.granted_temp
    }

    /// Backlog as it will stand once the open pass is committed
    pub fn backlog_temp(&self) -> u32 {
        self.backlogged.saturating_sub(self.granted_temp)
    }

    /// Window bandwidth as it will stand once the open pass is committed
    pub fn window_granted_temp(&self) -> u32 {
        self.bw_since_last_expiry.saturating_add(self.granted_temp)
    }

    pub fn is_pass_open(&self) -> bool {
        self.pass_open
    }

    /// Merges the open pass. A second commit without `begin_pass` is a no-op.
    pub fn commit_pass(&mut self, now: SimTime) {
        if !self.pass_open {
            return;
        }
        if self.granted_temp > 0 {
            self.backlogged = self.backlogged.saturating_sub(self.granted_temp);
            self.granted_bandwidth += self.granted_temp as u64;
            self.bw_since_last_expiry = self.bw_since_last_expiry.saturating_add(self.granted_temp);
            self.last_grant_time = Some(now);
        }
        self.granted_temp = 0;
        self.pass_open = false;
    }

    pub fn reset_window(&mut self) {
        self.bw_since_last_expiry = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_phase_commit() {
        let mut r = ServiceFlowRecord::new();
        r.update_requested_bandwidth(1000, true);
        r.begin_pass();
        assert_eq!(r.granted_temp(), 0);
        r.tentative_grant(300);
        r.tentative_grant(200);
        assert_eq!(r.backlogged, 1000, "tentative grants must not touch the backlog");
        assert_eq!(r.backlog_temp(), 500);

        r.commit_pass(SimTime::from_ms(10));
        assert_eq!(r.backlogged, 500);
        assert_eq!(r.bw_since_last_expiry, 500);
        assert_eq!(r.last_grant_time, Some(SimTime::from_ms(10)));
        assert_eq!(r.granted_temp(), 0);

        // Merged exactly once
        r.commit_pass(SimTime::from_ms(20));
        assert_eq!(r.backlogged, 500);
        assert_eq!(r.granted_bandwidth, 500);
        assert_eq!(r.last_grant_time, Some(SimTime::from_ms(10)));
    }

    #[test]
    fn test_incremental_and_aggregate_requests() {
        let mut r = ServiceFlowRecord::new();
        r.update_requested_bandwidth(100, false);
        r.update_requested_bandwidth(50, false);
        assert_eq!(r.backlogged, 150);
        r.update_requested_bandwidth(80, true);
        assert_eq!(r.backlogged, 80);
        assert_eq!(r.requested_bandwidth, 230);
    }
}
