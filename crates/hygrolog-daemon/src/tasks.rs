//! Background loops: sensor polling and history flushing.
//!
//! Both loops run until `shutdown` is cancelled, including while a sensor
//! call is still in flight. A failed tick is logged and the loop waits for the
//! next one; nothing here ends the process.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Polls the sensor every `interval`, after one immediate warm-up sample.
///
/// `warmed_up` fires once the warm-up attempt has finished, successful or not.
pub async fn poll_loop(
    state: Arc<AppState>,
    interval: Duration,
    shutdown: CancellationToken,
    warmed_up: oneshot::Sender<()>,
) {
    info!("Poll loop started (interval: {:?})", interval);

    tokio::select! {
        _ = shutdown.cancelled() => {
            info!("Poll loop stopped during warm-up");
            return;
        }
        result = state.poll_once() => {
            if let Err(e) = result {
                warn!("Initial sensor read failed: {}", e);
            }
        }
    }
    let _ = warmed_up.send(());

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        // An in-flight sensor call is dropped, and its process killed, on shutdown.
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = state.poll_once() => {
                if let Err(e) = result {
                    warn!("Error during sensor read: {}", e);
                }
            }
        }
    }

    info!("Poll loop stopped");
}

/// Writes the current reading to the history log every `interval`.
///
/// The first write happens as soon as the poll loop's warm-up is done, then
/// once per interval. On shutdown one last flush is attempted so the newest
/// reading isn't lost.
pub async fn flush_loop(
    state: Arc<AppState>,
    interval: Duration,
    shutdown: CancellationToken,
    warmed_up: oneshot::Receiver<()>,
) {
    info!("Flush loop started (interval: {:?})", interval);

    tokio::select! {
        _ = shutdown.cancelled() => {
            state.flush_once().await;
            info!("Flush loop stopped");
            return;
        }
        result = warmed_up => {
            if result.is_err() {
                debug!("Poll loop ended before warm-up, flushing anyway");
            }
        }
    }
    state.flush_once().await;

    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                state.flush_once().await;
            }
        }
    }

    state.flush_once().await;
    info!("Flush loop stopped");
}
