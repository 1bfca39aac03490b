//! Migration-based QoS scheduler. Work is queued as jobs in three priority queues and
//! migrated to the high queue when a deadline is near or a flow's minimum reserved rate
//! is not being met within the measurement window.

use std::collections::VecDeque;

use wimax_config::{StackConfig, UlSchedulerKind};
use wimax_core::{SchedulingType, SfDirection, Sfid, SimTime};
use wimax_pdus::mgmt::UlMapIe;

use super::ul_job::{JobPriority, PriorityUlJob, ReqType, UlJob};
use super::{UlMapBuilder, UlSchedCore, UlSchedCtx, UplinkScheduler, schedulable_flows};
use crate::sflow::sf_manager::ServiceFlowManager;

/// Priority of a flow whose minimum rate is already met in the current window
const SATISFIED_PRIORITY: i64 = -10000;

pub struct MbqosUlScheduler {
    core: UlSchedCore,
    high: VecDeque<UlJob>,
    intermediate: VecDeque<UlJob>,
    low: VecDeque<UlJob>,
    window: SimTime,
    deadline_frames: u64,
    window_start: Option<SimTime>,
}

impl MbqosUlScheduler {
    pub fn new(core: UlSchedCore, cfg: &StackConfig) -> Self {
        MbqosUlScheduler {
            core,
            high: VecDeque::new(),
            intermediate: VecDeque::new(),
            low: VecDeque::new(),
            window: SimTime::from_ms(cfg.scheduler.mbqos_window_ms),
            deadline_frames: cfg.scheduler.mbqos_deadline_frames as u64,
            window_start: None,
        }
    }

    pub fn queue(&self, priority: JobPriority) -> &VecDeque<UlJob> {
        match priority {
            JobPriority::High => &self.high,
            JobPriority::Intermediate => &self.intermediate,
            JobPriority::Low => &self.low,
        }
    }

    pub fn enqueue_job(&mut self, job: UlJob, priority: JobPriority) {
        tracing::trace!("mbqos: enqueue {:?} {}", priority, job);
        match priority {
            JobPriority::High => self.high.push_back(job),
            JobPriority::Intermediate => self.intermediate.push_back(job),
            JobPriority::Low => self.low.push_back(job),
        }
    }

    /// Moves up to `bytes` of the intermediate data job of `sfid` to the high queue.
    /// Returns the bytes moved.
    fn promote(&mut self, sfid: Sfid, bytes: u32) -> u32 {
        let Some(idx) = self.intermediate.iter().position(|j| j.sfid == sfid && j.req_type == ReqType::Data) else {
            return 0;
        };
        let job = &mut self.intermediate[idx];
        let moved = bytes.min(job.size);
        if moved == 0 {
            return 0;
        }
        job.size -= moved;
        let mut promoted = job.clone();
        promoted.size = moved;
        if job.size == 0 {
            self.intermediate.remove(idx);
        }
        tracing::debug!("mbqos: promoted {} bytes of sfid {}", moved, sfid);
        self.high.push_back(promoted);
        moved
    }

    /// Promotes rtPS work whose deadline falls within the configured number of frames.
    /// With one frame or less left the whole job moves, otherwise a `size / frames_left` share.
    pub fn check_deadline(&mut self, now: SimTime) {
        let frame = self.core.frame_duration;
        let candidates: Vec<(Sfid, u32, u64)> = self
            .intermediate
            .iter()
            .filter(|j| j.scheduling_type == SchedulingType::Rtps && j.req_type == ReqType::Data)
            .map(|j| (j.sfid, j.size, j.deadline.since(now).div_floor(frame)))
            .collect();
        for (sfid, size, frames_left) in candidates {
            if frames_left <= 1 {
                self.promote(sfid, size);
            } else if frames_left <= self.deadline_frames {
                self.promote(sfid, size / frames_left as u32);
            }
        }
    }

    /// Promotes the window deficit of flows below their minimum reserved rate,
    /// the most starved flow first
    pub fn check_minimum_bandwidth(&mut self, flows: &ServiceFlowManager) {
        let window_s = self.window.as_secs_f64();
        let mut starved = Vec::new();
        for job in self.intermediate.iter().filter(|j| j.req_type == ReqType::Data) {
            let Some(flow) = flows.get(job.sfid) else { continue };
            let min_bytes = (flow.min_reserved_rate() as f64 / 8.0 * window_s) as u32;
            let granted = flow.record().window_granted_temp();
            let priority = if granted >= min_bytes {
                SATISFIED_PRIORITY
            } else {
                flow.record().backlog_temp() as i64 + (min_bytes - granted) as i64
            };
            if priority > SATISFIED_PRIORITY {
                let mut deficit = job.clone();
                deficit.size = min_bytes - granted;
                starved.push(PriorityUlJob::new(deficit, priority));
            }
        }
        starved.sort_by(|a, b| b.priority.cmp(&a.priority));
        for pj in starved {
            self.promote(pj.job.sfid, pj.job.size);
        }
    }

    fn check_window(&mut self, flows: &mut ServiceFlowManager, now: SimTime) {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return;
        };
        if now.since(start) >= self.window {
            tracing::debug!("mbqos: bandwidth window expired at {}", now);
            for flow in flows.flows_mut() {
                flow.record_mut().reset_window();
            }
            self.window_start = Some(now);
        }
    }

    /// Turns the polls due and the outstanding requests of `ss` into jobs
    fn enqueue_jobs(&mut self, ctx: &UlSchedCtx<'_>, ss_cid: wimax_core::Cid, sfids: &[Sfid]) {
        for &sfid in sfids {
            let Some(flow) = ctx.flows.get(sfid) else { continue };
            let rec = flow.record();
            let job = UlJob {
                ss_cid,
                sfid,
                scheduling_type: flow.scheduling_type(),
                req_type: ReqType::UnicastPolling,
                size: 0,
                release_time: ctx.now,
                deadline: ctx.now,
                period: rec.poll_interval,
            };
            if rec.last_poll_time.is_none_or(|t| ctx.now.since(t) >= rec.poll_interval) {
                self.enqueue_job(job.clone(), JobPriority::High);
            }
            let backlog = rec.backlog_temp();
            if backlog > 0 {
                let data = UlJob {
                    req_type: ReqType::Data,
                    size: backlog,
                    deadline: rec.last_grant_time.unwrap_or(ctx.now) + flow.max_latency(),
                    ..job
                };
                let priority = match flow.scheduling_type() {
                    SchedulingType::Be => JobPriority::Low,
                    _ => JobPriority::Intermediate,
                };
                self.enqueue_job(data, priority);
            }
        }
    }

    /// Grants queued jobs in priority order until the map is full
    fn serve_queues(&mut self, map: &mut UlMapBuilder, ctx: &mut UlSchedCtx<'_>) {
        let jobs: Vec<UlJob> = self.high.drain(..).chain(self.intermediate.drain(..)).chain(self.low.drain(..)).collect();
        for job in jobs {
            if map.remaining() == 0 {
                break;
            }
            let Some(ss) = ctx.ss_mgr.get_by_cid(job.ss_cid) else { continue };
            let Some(flow) = ctx.flows.get_mut(job.sfid) else { continue };
            match job.req_type {
                ReqType::UnicastPolling => {
                    self.core.service_poll(map, flow, ctx.now);
                }
                ReqType::Data => {
                    self.core.grant_backlog(map, flow, job.size, ss.modulation, ctx.phy, ctx.profiles);
                }
            }
        }
    }
}

impl UplinkScheduler for MbqosUlScheduler {
    fn kind(&self) -> UlSchedulerKind {
        UlSchedulerKind::MbQos
    }

    fn core(&self) -> &UlSchedCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut UlSchedCore {
        &mut self.core
    }

    fn schedule(&mut self, ctx: &mut UlSchedCtx<'_>) -> Vec<UlMapIe> {
        let mut map = UlMapBuilder::new(self.core.nr_ul_symbols);
        self.check_window(ctx.flows, ctx.now);
        self.core.begin_pass(ctx.flows);
        self.core.allocate_initial_ranging_interval(&mut map, ctx.ss_mgr, ctx.now);

        let ss_mgr = ctx.ss_mgr;
        let mut dsa_allocated = false;
        let mut ready = Vec::new();
        for ss in ss_mgr.iter() {
            if !self.core.management_allocation(&mut map, ss, ctx.phy, ctx.profiles, &mut dsa_allocated) {
                ready.push(ss);
            }
        }

        'ugs: for ss in &ready {
            for sfid in schedulable_flows(ss, ctx.flows, SchedulingType::Ugs) {
                let Some(flow) = ctx.flows.get_mut(sfid) else { continue };
                if !self.core.service_unsolicited_grant(&mut map, flow, ss.modulation, ctx.phy, ctx.profiles, ctx.now) {
                    break 'ugs;
                }
            }
        }

        for ss in &ready {
            let sfids: Vec<Sfid> = ss
                .sfids()
                .iter()
                .copied()
                .filter(|sfid| {
                    ctx.flows.get(*sfid).is_some_and(|f| {
                        f.direction() == SfDirection::Up && f.is_active() && f.scheduling_type().is_polled()
                    })
                })
                .collect();
            self.enqueue_jobs(ctx, ss.basic_cid, &sfids);
        }

        self.check_deadline(ctx.now);
        self.check_minimum_bandwidth(ctx.flows);
        self.serve_queues(&mut map, ctx);

        self.core.commit_pass(ctx.flows, ctx.now);
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use wimax_config::UlSchedulerKind;
    use wimax_core::{Cid, SchedulingType, SimTime};
    use wimax_pdus::burst::BurstProfileManager;

    use super::super::test_util::*;
    use super::super::{UlSchedCore, UlSchedCtx, UplinkScheduler};
    use super::*;
    use crate::bs::ss_manager::SsManager;

    fn job(sfid: Sfid, st: SchedulingType, size: u32, deadline: SimTime) -> UlJob {
        UlJob {
            ss_cid: Cid::new(1),
            sfid,
            scheduling_type: st,
            req_type: ReqType::Data,
            size,
            release_time: SimTime::ZERO,
            deadline,
            period: SimTime::ZERO,
        }
    }

    fn scheduler(cfg: &StackConfig) -> MbqosUlScheduler {
        let phy = phy(cfg);
        MbqosUlScheduler::new(UlSchedCore::new(cfg, &phy), cfg)
    }

    #[test]
    fn test_check_deadline_promotion() {
        let cfg = config(UlSchedulerKind::MbQos);
        let mut sched = scheduler(&cfg);
        let now = SimTime::from_ms(100);
        sched.enqueue_job(job(1, SchedulingType::Rtps, 900, SimTime::from_ms(110)), JobPriority::Intermediate);
        sched.enqueue_job(job(2, SchedulingType::Rtps, 900, SimTime::from_ms(130)), JobPriority::Intermediate);
        sched.enqueue_job(job(3, SchedulingType::Rtps, 900, SimTime::from_ms(300)), JobPriority::Intermediate);
        sched.enqueue_job(job(4, SchedulingType::Nrtps, 900, SimTime::from_ms(100)), JobPriority::Intermediate);
        sched.enqueue_job(job(5, SchedulingType::Be, 900, SimTime::from_ms(100)), JobPriority::Low);

        sched.check_deadline(now);

        let high: Vec<(Sfid, u32)> = sched.queue(JobPriority::High).iter().map(|j| (j.sfid, j.size)).collect();
        assert_eq!(high, vec![(1, 900), (2, 300)]);
        let inter: Vec<(Sfid, u32)> = sched.queue(JobPriority::Intermediate).iter().map(|j| (j.sfid, j.size)).collect();
        assert_eq!(inter, vec![(2, 600), (3, 900), (4, 900)]);
        assert_eq!(sched.queue(JobPriority::Low).len(), 1);
    }

    #[test]
    fn test_imminent_deadline_served_first() {
        let mut cfg = config(UlSchedulerKind::MbQos);
        cfg.phy.nr_ul_symbols = 30;
        let phy = phy(&cfg);
        let profiles = BurstProfileManager::default();
        let mut sched = scheduler(&cfg);
        sched.set_is_ir_intrvl_allocated(true);

        let now = SimTime::from_ms(200);
        let mut ss_mgr = SsManager::new();
        let mut flows = ServiceFlowManager::new();
        for n in 1..=2u16 {
            ss_mgr.register(ranged_ss(n)).unwrap();
            let mut rt = active_flow(n as u32, 1000 + n, SchedulingType::Rtps);
            rt.record_mut().update_requested_bandwidth(4800, true);
            rt.record_mut().last_poll_time = Some(now);
            rt.record_mut().poll_interval = SimTime::from_ms(1000);
            add(&mut ss_mgr, &mut flows, n, rt);
        }
        // 100 ms latency, last served 95 ms ago
        flows.get_mut(2).unwrap().record_mut().last_grant_time = Some(SimTime::from_ms(105));

        let mut ctx = UlSchedCtx { now, phy: &phy, profiles: &profiles, ss_mgr: &ss_mgr, flows: &mut flows };
        let ies = sched.schedule(&mut ctx);
        assert_eq!(ies[0].cid, Cid::new(1002));
        assert_eq!(ies[0].duration, 30);
        assert_eq!(flows.get(1).unwrap().record().backlogged, 4800);
        assert!(sched.queue(JobPriority::High).is_empty(), "queues are drained every frame");
    }

    #[test]
    fn test_minimum_bandwidth_deficit_promoted() {
        let cfg = config(UlSchedulerKind::MbQos);
        let mut sched = scheduler(&cfg);
        let mut ss_mgr = SsManager::new();
        let mut flows = ServiceFlowManager::new();
        ss_mgr.register(ranged_ss(1)).unwrap();
        // 8 kbit/s over a 1 s window is 1000 bytes
        let mut starved = active_flow_with(1, 1001, SchedulingType::Nrtps, |p| p.min_reserved_rate = 8000);
        starved.record_mut().update_requested_bandwidth(3000, true);
        add(&mut ss_mgr, &mut flows, 1, starved);
        let mut fed = active_flow_with(2, 1002, SchedulingType::Nrtps, |p| p.min_reserved_rate = 8000);
        fed.record_mut().update_requested_bandwidth(3000, true);
        fed.record_mut().bw_since_last_expiry = 1000;
        add(&mut ss_mgr, &mut flows, 1, fed);

        let far = SimTime::from_ms(10_000);
        sched.enqueue_job(job(1, SchedulingType::Nrtps, 3000, far), JobPriority::Intermediate);
        sched.enqueue_job(job(2, SchedulingType::Nrtps, 3000, far), JobPriority::Intermediate);
        sched.check_minimum_bandwidth(&flows);

        let high: Vec<(Sfid, u32)> = sched.queue(JobPriority::High).iter().map(|j| (j.sfid, j.size)).collect();
        assert_eq!(high, vec![(1, 1000)]);
    }
}
