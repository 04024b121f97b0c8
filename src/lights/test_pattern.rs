use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{Channel, EffectorError, LightBoard};
use crate::window::AggregateState;

fn only(channel: Channel) -> AggregateState {
    AggregateState {
        pre_alert: channel == Channel::PreAlert,
        near_alert: channel == Channel::NearAlert,
        active: channel == Channel::Active,
    }
}

/// Light each channel in turn for `hold`, then switch everything off and
/// release the board. Stops early when `cancel` fires.
pub async fn run_light_test(
    board: &mut LightBoard,
    hold: Duration,
    cancel: &CancellationToken,
) -> Result<(), EffectorError> {
    let mut result = Ok(());

    for channel in Channel::ALL {
        info!("Testing {} light", channel);
        if let Err(e) = board.apply(only(channel)) {
            warn!("Light test write failed: {}", e);
            result = Err(e);
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Light test interrupted");
                break;
            }
            _ = tokio::time::sleep(hold) => {}
        }
    }

    let shutdown = board.shutdown();
    result.and(shutdown)
}
