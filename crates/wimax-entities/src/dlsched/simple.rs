use wimax_config::DlSchedulerKind;
use wimax_core::SchedulingType;

use super::{BsScheduler, DlSchedCtx, DlSchedule, connection_scheduling_type, fill_burst, start_schedule};

/// Serves one connection at a time in class order, each drained as far as the
/// remaining symbols allow
pub struct SimpleBsScheduler;

impl BsScheduler for SimpleBsScheduler {
    fn kind(&self) -> DlSchedulerKind {
        DlSchedulerKind::Simple
    }

    fn schedule(&mut self, ctx: &mut DlSchedCtx<'_>) -> DlSchedule {
        let mut builder = start_schedule(ctx);
        while builder.remaining() > 0 {
            let Some(cid) = self.select_connection(ctx, &builder) else {
                break;
            };
            let remaining = builder.remaining();
            let burst = if connection_scheduling_type(ctx, cid) == Some(SchedulingType::Ugs) {
                self.create_ugs_burst(ctx, cid, remaining)
            } else {
                let fragment = self.check_for_fragmentation(ctx, cid);
                fill_burst(ctx, cid, remaining, fragment)
            };
            match burst {
                Some(burst) => self.add_downlink_burst(&mut builder, burst),
                None => builder.skip(cid),
            }
        }
        builder.finish()
    }
}
