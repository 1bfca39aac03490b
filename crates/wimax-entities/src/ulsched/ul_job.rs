use core::fmt;

use wimax_core::{Cid, SchedulingType, Sfid, SimTime};

/// Job queue of the MBQoS scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobPriority {
    Low,
    Intermediate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReqType {
    /// Grant for queued data
    Data,
    /// Unicast request opportunity
    UnicastPolling,
}

/// A unit of uplink work for one service flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UlJob {
    /// Basic CID of the owning station
    pub ss_cid: Cid,
    pub sfid: Sfid,
    pub scheduling_type: SchedulingType,
    pub req_type: ReqType,
    /// Bytes to grant for data jobs, unused for polls
    pub size: u32,
    pub release_time: SimTime,
    pub deadline: SimTime,
    pub period: SimTime,
}

impl fmt::Display for UlJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "job ss {} sfid {} {} {:?} {} bytes, deadline {}",
            self.ss_cid, self.sfid, self.scheduling_type, self.req_type, self.size, self.deadline
        )
    }
}

/// Job with the priority used to order the high queue, larger first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityUlJob {
    pub priority: i64,
    pub job: UlJob,
}

impl PriorityUlJob {
    pub fn new(job: UlJob, priority: i64) -> Self {
        PriorityUlJob { priority, job }
    }
}
