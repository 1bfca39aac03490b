use wimax_config::UlSchedulerKind;
use wimax_core::SchedulingType;
use wimax_pdus::mgmt::UlMapIe;

use super::{UlMapBuilder, UlSchedCore, UlSchedCtx, UplinkScheduler, schedulable_flows};

/// Serves stations in registration order. Within a station: UGS grants, unicast polls,
/// then grants for outstanding rtPS, nrtPS and BE requests.
pub struct SimpleUlScheduler {
    core: UlSchedCore,
}

impl SimpleUlScheduler {
    pub fn new(core: UlSchedCore) -> Self {
        SimpleUlScheduler { core }
    }
}

impl UplinkScheduler for SimpleUlScheduler {
    fn kind(&self) -> UlSchedulerKind {
        UlSchedulerKind::Simple
    }

    fn core(&self) -> &UlSchedCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut UlSchedCore {
        &mut self.core
    }

    fn schedule(&mut self, ctx: &mut UlSchedCtx<'_>) -> Vec<UlMapIe> {
        let core = &mut self.core;
        let mut map = UlMapBuilder::new(core.nr_ul_symbols);
        core.begin_pass(ctx.flows);
        core.allocate_initial_ranging_interval(&mut map, ctx.ss_mgr, ctx.now);

        let mut dsa_allocated = false;
        'stations: for ss in ctx.ss_mgr.iter() {
            if map.remaining() == 0 {
                break;
            }
            if core.management_allocation(&mut map, ss, ctx.phy, ctx.profiles, &mut dsa_allocated) {
                continue;
            }

            for sfid in schedulable_flows(ss, ctx.flows, SchedulingType::Ugs) {
                let Some(flow) = ctx.flows.get_mut(sfid) else { continue };
                if !core.service_unsolicited_grant(&mut map, flow, ss.modulation, ctx.phy, ctx.profiles, ctx.now) {
                    break 'stations;
                }
            }
            for st in [SchedulingType::Rtps, SchedulingType::Nrtps, SchedulingType::Be] {
                for sfid in schedulable_flows(ss, ctx.flows, st) {
                    let Some(flow) = ctx.flows.get_mut(sfid) else { continue };
                    if !core.service_poll(&mut map, flow, ctx.now) {
                        break 'stations;
                    }
                }
            }
            for st in [SchedulingType::Rtps, SchedulingType::Nrtps, SchedulingType::Be] {
                for sfid in schedulable_flows(ss, ctx.flows, st) {
                    let Some(flow) = ctx.flows.get_mut(sfid) else { continue };
                    if !core.service_bandwidth_requests(&mut map, flow, ss.modulation, ctx.phy, ctx.profiles) {
                        break 'stations;
                    }
                }
            }
        }

        core.commit_pass(ctx.flows, ctx.now);
        map.finish()
    }
}
