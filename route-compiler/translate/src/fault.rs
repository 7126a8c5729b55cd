use route_compiler_core::{
    route::{FaultAbort, FaultDelay, FaultPolicy, FractionalPercent},
    rule::{Abort, AbortKind, Delay, DelayKind, FaultInjection, Percent},
};
use tracing::warn;

/// Translates fault injection. Unsupported delay or abort kinds are dropped;
/// if neither survives, no fault policy is produced.
pub(crate) fn translate_fault(FaultInjection { delay, abort }: &FaultInjection) -> Option<FaultPolicy> {
    let delay = delay.as_ref().and_then(translate_delay);
    let abort = abort.as_ref().and_then(translate_abort);
    if delay.is_none() && abort.is_none() {
        return None;
    }
    Some(FaultPolicy { delay, abort })
}

fn translate_delay(delay: &Delay) -> Option<FaultDelay> {
    match delay.kind() {
        DelayKind::Fixed(fixed_delay) => Some(FaultDelay {
            percentage: percentage(delay.percentage, delay.percent),
            fixed_delay,
        }),
        kind => {
            warn!(?kind, "Only fixed delays are supported; dropping fault delay");
            None
        }
    }
}

fn translate_abort(abort: &Abort) -> Option<FaultAbort> {
    match abort.kind() {
        AbortKind::HttpStatus(http_status) => Some(FaultAbort {
            percentage: percentage(abort.percentage, abort.percent),
            http_status,
        }),
        kind => {
            warn!(?kind, "Only HTTP status aborts are supported; dropping fault abort");
            None
        }
    }
}

/// Fractional percentages take precedence over the integer `percent` field.
fn percentage(percentage: Option<Percent>, percent: u32) -> FractionalPercent {
    match percentage {
        Some(Percent { value }) => FractionalPercent::from_percent(value),
        None => FractionalPercent::hundred(percent),
    }
}
