//! pybradio - SPI radio bridge firmware
//!
//! Runs on an nRF51 module (BBC micro:bit v1) attached to a host
//! controller's SPI bus. The host sends framed commands; the module drives
//! its 2.4 GHz radio and answers with status bytes or data packets.
//!
//! Two tasks:
//! - link: radio receive path and host command service
//! - heartbeat: blinks an LED

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_nrf::config::{Config, HfclkSource};
use embassy_nrf::gpio::{Level, Output, OutputDrive};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use pybradio_core::{BufferedTransport, CommandEngine, LinkConfig, LinkService, RadioDefaults};
use pybradio_hal_nrf51::radio::FRAME_BUFFER_SIZE;
use pybradio_hal_nrf51::{NrfRadio, Spis1};
use pybradio_protocol::BUFFER_SIZE;

mod channels;
mod tasks;

/// Reported in response to VERSION
const VERSION: &str = env!("PYBRADIO_VERSION");

// DMA buffers (addresses are handed to the peripherals, must live forever)
static SPIS_RX: StaticCell<[u8; BUFFER_SIZE]> = StaticCell::new();
static SPIS_TX: StaticCell<[u8; BUFFER_SIZE]> = StaticCell::new();
static RADIO_FRAME: StaticCell<[u8; FRAME_BUFFER_SIZE]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("{} starting...", VERSION);

    // The radio runs from the external crystal
    let mut config = Config::default();
    config.hfclk_source = HfclkSource::ExternalXtal;
    let p = embassy_nrf::init(config);

    // LED matrix row 1 / column 1; the column is held low for the whole run
    let led = Output::new(p.P0_13, Level::Low, OutputDrive::Standard);
    let _column = Output::new(p.P0_04, Level::Low, OutputDrive::Standard);

    let link_config = LinkConfig::default();
    let radio_defaults = RadioDefaults::default();
    info!(
        "Radio defaults: band={}, power={}, group={}",
        radio_defaults.frequency_band, radio_defaults.power_level, radio_defaults.group
    );

    let radio = match NrfRadio::new(p.RADIO, &radio_defaults, RADIO_FRAME.init([0; FRAME_BUFFER_SIZE])) {
        Ok(radio) => radio,
        Err(e) => {
            error!("Radio bring-up failed: {:?}", e);
            spawner.spawn(tasks::heartbeat_task(led).unwrap());
            return;
        }
    };

    // Edge connector P13 SCK, P14 MISO, P15 MOSI, P16 CSN
    let spis = Spis1::new(
        p.SPIS1,
        p.P0_23,
        p.P0_22,
        p.P0_21,
        p.P0_16,
        SPIS_RX.init([0; BUFFER_SIZE]),
        SPIS_TX.init([0; BUFFER_SIZE]),
    );

    let transport = match BufferedTransport::new(spis, &link_config) {
        Ok(transport) => transport,
        Err(e) => {
            error!("SPI transport bring-up failed: {:?}", e);
            // Keep blinking so the board is visibly alive but not serving
            spawner.spawn(tasks::heartbeat_task(led).unwrap());
            return;
        }
    };
    info!("SPI slave ready");

    let engine = CommandEngine::new(radio, &channels::INBOX, VERSION);
    let link = LinkService::new(transport, engine);

    spawner.spawn(tasks::link_task(link).unwrap());
    spawner.spawn(tasks::heartbeat_task(led).unwrap());

    info!("All tasks spawned, firmware running");
}
