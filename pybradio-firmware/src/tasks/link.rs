//! Link task
//!
//! Drives the link service: each iteration moves received datagrams into
//! the inbox and serves at most one host command. Commands run to
//! completion inside `poll`, so the host sees the busy filler only for the
//! time between its transaction ending and the next tick.

use defmt::*;
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_time::{Duration, Ticker};

use pybradio_core::LinkService;
use pybradio_hal_nrf51::{NrfRadio, Spis1};

/// Poll period in microseconds
pub const POLL_INTERVAL_US: u64 = 250;

/// Link service as instantiated on the board
pub type Link = LinkService<'static, Spis1, NrfRadio, ThreadModeRawMutex>;

#[embassy_executor::task]
pub async fn link_task(mut link: Link) {
    info!("Link task started");

    let mut ticker = Ticker::every(Duration::from_micros(POLL_INTERVAL_US));
    let mut served: u32 = 0;

    loop {
        match link.poll() {
            Ok(outcome) => {
                if outcome.command {
                    served = served.wrapping_add(1);
                    trace!("Command served ({} total)", served);
                }
                if outcome.datagrams > 0 {
                    debug!("{} datagram(s) received", outcome.datagrams);
                }
            }
            Err(e) => warn!("Link error: {:?}", e),
        }

        ticker.next().await;
    }
}
