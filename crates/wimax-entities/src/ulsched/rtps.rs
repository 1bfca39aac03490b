use wimax_config::UlSchedulerKind;
use wimax_core::{ModulationType, SchedulingType, Sfid};
use wimax_pdus::mgmt::UlMapIe;

use super::{UlMapBuilder, UlSchedCore, UlSchedCtx, UplinkScheduler, schedulable_flows};

/// Serves each class across all stations before the next one: UGS, polls, rtPS, nrtPS, BE.
/// When the rtPS backlog does not fit the remaining symbols, every rtPS flow is cut back
/// in proportion to its request.
pub struct RtpsUlScheduler {
    core: UlSchedCore,
}

impl RtpsUlScheduler {
    pub fn new(core: UlSchedCore) -> Self {
        RtpsUlScheduler { core }
    }

    /// Grants the rtPS backlog of `ready`, scaled down to fit the map
    fn serve_rtps(&self, map: &mut UlMapBuilder, ctx: &mut UlSchedCtx<'_>, ready: &[(Vec<Sfid>, ModulationType)]) {
        let mut needs = Vec::new();
        for (sfids, modulation) in ready {
            for &sfid in sfids {
                let Some(flow) = ctx.flows.get(sfid) else { continue };
                let backlog = flow.record().backlog_temp();
                if backlog > 0 {
                    needs.push((sfid, *modulation, ctx.phy.nr_symbols(backlog, *modulation)));
                }
            }
        }
        let total: u64 = needs.iter().map(|(_, _, symbols)| *symbols as u64).sum();
        let available = map.remaining() as u64;
        if total > available {
            tracing::debug!("rtps: {} symbols requested, {} available, scaling down", total, available);
        }

        for (sfid, modulation, symbols) in needs {
            let share = if total > available { (symbols as u64 * available / total) as u32 } else { symbols };
            if share == 0 {
                continue;
            }
            let Some(flow) = ctx.flows.get_mut(sfid) else { continue };
            let max_bytes = ctx.phy.nr_bytes(share, modulation);
            self.core.grant_backlog(map, flow, max_bytes, modulation, ctx.phy, ctx.profiles);
        }
    }
}

impl UplinkScheduler for RtpsUlScheduler {
    fn kind(&self) -> UlSchedulerKind {
        UlSchedulerKind::Rtps
    }

    fn core(&self) -> &UlSchedCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut UlSchedCore {
        &mut self.core
    }

    fn schedule(&mut self, ctx: &mut UlSchedCtx<'_>) -> Vec<UlMapIe> {
        let mut map = UlMapBuilder::new(self.core.nr_ul_symbols);
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

        let core = &self.core;
        'ugs: for ss in &ready {
            for sfid in schedulable_flows(ss, ctx.flows, SchedulingType::Ugs) {
                let Some(flow) = ctx.flows.get_mut(sfid) else { continue };
                if !core.service_unsolicited_grant(&mut map, flow, ss.modulation, ctx.phy, ctx.profiles, ctx.now) {
                    break 'ugs;
                }
            }
        }
        'polls: for st in [SchedulingType::Rtps, SchedulingType::Nrtps, SchedulingType::Be] {
            for ss in &ready {
                for sfid in schedulable_flows(ss, ctx.flows, st) {
                    let Some(flow) = ctx.flows.get_mut(sfid) else { continue };
                    if !core.service_poll(&mut map, flow, ctx.now) {
                        break 'polls;
                    }
                }
            }
        }

        let rtps: Vec<_> =
            ready.iter().map(|ss| (schedulable_flows(ss, ctx.flows, SchedulingType::Rtps), ss.modulation)).collect();
        self.serve_rtps(&mut map, ctx, &rtps);

        'rest: for st in [SchedulingType::Nrtps, SchedulingType::Be] {
            for ss in &ready {
                for sfid in schedulable_flows(ss, ctx.flows, st) {
                    let Some(flow) = ctx.flows.get_mut(sfid) else { continue };
                    if !self.core.service_bandwidth_requests(&mut map, flow, ss.modulation, ctx.phy, ctx.profiles) {
                        break 'rest;
                    }
                }
            }
        }

        self.core.commit_pass(ctx.flows, ctx.now);
        map.finish()
    }
}
