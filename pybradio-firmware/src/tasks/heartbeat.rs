//! Heartbeat LED
//!
//! Blinks one LED of the matrix so a hung executor is visible.

use defmt::*;
use embassy_nrf::gpio::Output;
use embassy_time::{Duration, Ticker};

/// Half period of the blink
pub const HEARTBEAT_INTERVAL_MS: u64 = 500;

#[embassy_executor::task]
pub async fn heartbeat_task(mut led: Output<'static>) {
    info!("Heartbeat task started");

    let mut ticker = Ticker::every(Duration::from_millis(HEARTBEAT_INTERVAL_MS));
    loop {
        led.toggle();
        ticker.next().await;
    }
}
