//! SPIS1 slave driver
//!
//! The nRF51 SPIS clocks bytes between the pins and two RAM buffers on its
//! own. Which side may touch the buffers is decided by the SEMSTAT
//! semaphore; this driver only exposes the registers, the ownership rules
//! are enforced by `pybradio_core::BufferedTransport`.

use embassy_nrf::gpio::{Flex, Pin, Pull};
use embassy_nrf::pac::spis::{vals, Spis};
use embassy_nrf::{pac, peripherals, Peri};
use pybradio_hal::{Semaphore, SlaveConfig, SlavePeripheral};
use pybradio_protocol::BUFFER_SIZE;

/// SPIS1 with its pins and buffer pair
pub struct Spis1 {
    _spis: Peri<'static, peripherals::SPIS1>,
    _pins: [Flex<'static>; 4],
    rx: &'static mut [u8; BUFFER_SIZE],
    tx: &'static mut [u8; BUFFER_SIZE],
}

impl Spis1 {
    /// Take over SPIS1 and point it at `rx`/`tx`
    ///
    /// The peripheral is enabled with an empty reply; configuration of the
    /// filler bytes and shortcut happens through
    /// [`SlavePeripheral::configure`].
    pub fn new(
        spis: Peri<'static, peripherals::SPIS1>,
        sck: Peri<'static, impl Pin>,
        miso: Peri<'static, impl Pin>,
        mosi: Peri<'static, impl Pin>,
        csn: Peri<'static, impl Pin>,
        rx: &'static mut [u8; BUFFER_SIZE],
        tx: &'static mut [u8; BUFFER_SIZE],
    ) -> Self {
        let r = regs();
        r.enable().write(|w| w.set_enable(vals::Enable::DISABLED));

        r.pselsck().write_value(sck.pin() as u32);
        r.pselmiso().write_value(miso.pin() as u32);
        r.pselmosi().write_value(mosi.pin() as u32);
        r.pselcsn().write_value(csn.pin() as u32);

        // All four start as connected inputs; MISO is driven by the
        // peripheral while CSN is low
        let mut pins = [Flex::new(sck), Flex::new(miso), Flex::new(mosi), Flex::new(csn)];
        for pin in pins.iter_mut() {
            pin.set_as_input(Pull::None);
        }

        r.rxdptr().write_value(rx.as_mut_ptr() as u32);
        r.maxrx().write(|w| w.set_maxrx(BUFFER_SIZE as u8));
        r.txdptr().write_value(tx.as_ptr() as u32);
        r.maxtx().write(|w| w.set_maxtx(0));
        r.config().write(|w| {
            w.set_order(vals::Order::MSB_FIRST);
            w.set_cpha(vals::Cpha::LEADING);
            w.set_cpol(vals::Cpol::ACTIVE_HIGH);
        });

        r.events_end().write_value(0);
        r.events_acquired().write_value(0);
        r.enable().write(|w| w.set_enable(vals::Enable::ENABLED));

        Self {
            _spis: spis,
            _pins: pins,
            rx,
            tx,
        }
    }
}

fn regs() -> Spis {
    pac::SPIS1
}

impl SlavePeripheral for Spis1 {
    fn semaphore(&self) -> Semaphore {
        Semaphore::from_bits(regs().semstat().read().0)
    }

    fn trigger_acquire(&mut self) {
        regs().tasks_acquire().write_value(1);
    }

    fn trigger_release(&mut self) {
        regs().tasks_release().write_value(1);
    }

    fn acquired_event(&self) -> bool {
        regs().events_acquired().read() != 0
    }

    fn clear_acquired_event(&mut self) {
        regs().events_acquired().write_value(0);
    }

    fn end_event(&self) -> bool {
        regs().events_end().read() != 0
    }

    fn clear_end_event(&mut self) {
        regs().events_end().write_value(0);
    }

    fn rx_amount(&self) -> usize {
        regs().amountrx().read().amountrx() as usize
    }

    fn set_tx_len(&mut self, len: usize) {
        regs().maxtx().write(|w| w.set_maxtx(len.min(BUFFER_SIZE) as u8));
    }

    fn rx_buffer(&mut self) -> &mut [u8] {
        &mut self.rx[..]
    }

    fn tx_buffer(&mut self) -> &mut [u8] {
        &mut self.tx[..]
    }

    fn configure(&mut self, config: &SlaveConfig) {
        let r = regs();
        r.def().write(|w| w.set_def(config.busy_byte));
        r.orc().write(|w| w.set_orc(config.overread_byte));
        r.shorts().write(|w| w.set_end_acquire(config.acquire_on_end));
    }

    fn wait_for_event(&mut self) {
        cortex_m::asm::nop();
    }
}
