use wimax_config::DlSchedulerKind;
use wimax_core::{Cid, CidType, SchedulingType};

use super::{
    BsScheduler, DlSchedCtx, DlSchedule, DlScheduleBuilder, burst_profile, connections_with_data, fill_burst,
    start_schedule,
};

/// Class by class: broadcast and ranging, basic, primary, UGS, rtPS, nrtPS, BE.
/// All rtPS connections with data share what is left after UGS, scaled down together
/// when their queues do not fit.
pub struct RtpsBsScheduler;

impl RtpsBsScheduler {
    fn serve_greedy(&self, ctx: &mut DlSchedCtx<'_>, builder: &mut DlScheduleBuilder, cids: Vec<Cid>) {
        for cid in cids {
            if builder.remaining() == 0 {
                return;
            }
            let fragment = self.check_for_fragmentation(ctx, cid);
            if let Some(burst) = fill_burst(ctx, cid, builder.remaining(), fragment) {
                self.add_downlink_burst(builder, burst);
            }
        }
    }

    fn serve_rtps(&self, ctx: &mut DlSchedCtx<'_>, builder: &mut DlScheduleBuilder) {
        let cids = connections_with_data(ctx, SchedulingType::Rtps);
        let mut shares: Vec<u32> = cids
            .iter()
            .map(|cid| {
                let (_, modulation) = burst_profile(ctx, *cid);
                let bytes = ctx.conns.get(*cid).map_or(0, |c| c.queue().queue_length_with_mac_overhead());
                ctx.phy.nr_symbols(bytes as u32, modulation)
            })
            .collect();

        let available = builder.remaining() as u64;
        let mut total: u64 = shares.iter().map(|s| *s as u64).sum();
        while total > available {
            tracing::debug!("dl rtps: {} symbols wanted, {} available", total, available);
            for share in shares.iter_mut() {
                *share = (*share as u64 * available / total) as u32;
            }
            total = shares.iter().map(|s| *s as u64).sum();
        }

        for (cid, share) in cids.into_iter().zip(shares) {
            if share == 0 {
                continue;
            }
            let fragment = self.check_for_fragmentation(ctx, cid);
            if let Some(burst) = fill_burst(ctx, cid, share.min(builder.remaining()), fragment) {
                self.add_downlink_burst(builder, burst);
            }
        }
    }
}

impl BsScheduler for RtpsBsScheduler {
    fn kind(&self) -> DlSchedulerKind {
        DlSchedulerKind::Rtps
    }

    fn schedule(&mut self, ctx: &mut DlSchedCtx<'_>) -> DlSchedule {
        let mut builder = start_schedule(ctx);

        let mut mgmt = vec![Cid::INITIAL_RANGING, Cid::BROADCAST];
        for cid_type in [CidType::Basic, CidType::Primary] {
            mgmt.extend(ctx.conns.connections_of_type(cid_type).filter(|c| c.has_packets()).map(|c| c.cid()));
        }
        self.serve_greedy(ctx, &mut builder, mgmt);

        for cid in connections_with_data(ctx, SchedulingType::Ugs) {
            if let Some(burst) = self.create_ugs_burst(ctx, cid, builder.remaining()) {
                self.add_downlink_burst(&mut builder, burst);
            }
        }

        self.serve_rtps(ctx, &mut builder);

        for st in [SchedulingType::Nrtps, SchedulingType::Be] {
            let cids = connections_with_data(ctx, st);
            self.serve_greedy(ctx, &mut builder, cids);
        }
        builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use wimax_core::{ModulationType, SchedulingType, SimTime};
    use wimax_pdus::burst::BurstProfileManager;

    use super::super::test_util::DlFixture;
    use super::super::{BsScheduler, DlSchedCtx};
    use super::RtpsBsScheduler;

    #[test]
    fn test_rtps_shares_scaled_and_be_starved() {
        let mut f = DlFixture::new();
        f.cfg.phy.nr_dl_symbols = 33;
        let profiles = BurstProfileManager::default();
        let ss1 = f.add_ss(1, ModulationType::Qam16_12);
        let ss2 = f.add_ss(2, ModulationType::Qam16_12);
        let be = f.add_flow(ss1, SchedulingType::Be, &[100]);
        // 474 + 6 bytes is 10 symbols, twice that for the second queue
        let rt1 = f.add_flow(ss1, SchedulingType::Rtps, &[474]);
        let rt2 = f.add_flow(ss2, SchedulingType::Rtps, &[474, 474]);

        let mut ctx = DlSchedCtx {
            now: SimTime::ZERO,
            phy: &f.phy,
            profiles: &profiles,
            ss_mgr: &f.ss_mgr,
            flows: &mut f.flows,
            conns: &mut f.conns,
            nr_dl_symbols: f.cfg.phy.nr_dl_symbols,
        };
        let sched = RtpsBsScheduler.schedule(&mut ctx);

        // DL-MAP for three connections takes 3 symbols, leaving 30 for 30 symbols of rtPS
        assert_eq!(sched.dl_map_symbols, 3);
        let served: Vec<_> = sched.bursts.iter().map(|b| (b.cid, b.symbols)).collect();
        assert_eq!(served, vec![(rt1, 10), (rt2, 20)]);
        assert!(f.conns.get(be).unwrap().has_packets(), "BE waits behind rtPS");
        assert!(!f.conns.get(rt2).unwrap().has_packets());
    }

    #[test]
    fn test_rtps_saturation() {
        let mut f = DlFixture::new();
        f.cfg.phy.nr_dl_symbols = 19;
        let profiles = BurstProfileManager::default();
        let ss1 = f.add_ss(1, ModulationType::Qam16_12);
        let ss2 = f.add_ss(2, ModulationType::Qam16_12);
        let rt1 = f.add_flow(ss1, SchedulingType::Rtps, &[474]);
        let rt2 = f.add_flow(ss2, SchedulingType::Rtps, &[500, 448]);

        let mut ctx = DlSchedCtx {
            now: SimTime::ZERO,
            phy: &f.phy,
            profiles: &profiles,
            ss_mgr: &f.ss_mgr,
            flows: &mut f.flows,
            conns: &mut f.conns,
            nr_dl_symbols: f.cfg.phy.nr_dl_symbols,
        };
        let sched = RtpsBsScheduler.schedule(&mut ctx);
        // 3 symbols of DL-MAP, 16 left for 30 wanted: shares 5 and 10
        assert_eq!(sched.dl_map_symbols, 3);
        let served: Vec<_> = sched.bursts.iter().map(|b| (b.cid, b.symbols)).collect();
        assert_eq!(served, vec![(rt1, 5), (rt2, 10)]);
        assert!(sched.bursts.iter().all(|b| b.pdus[0].frag.is_some()), "both heads fragmented");
    }
}
