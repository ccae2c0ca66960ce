//! SPI + GPIO wiring of the e-paper HAT.
//!
//! Pin assignments (BCM numbering):
//! - RST (Reset): GPIO 17
//! - DC (Data/Command): GPIO 25
//! - BUSY: GPIO 24 (LOW while the controller is busy)
//! - PWR (Power): GPIO 18
//!
//! SPI0 with CE0 at 4 MHz, mode 0.

use rppal::gpio::{Gpio, InputPin, Level, OutputPin};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// GPIO pin assignments (BCM numbering)
pub mod pins {
    pub const RST: u8 = 17;
    pub const DC: u8 = 25;
    pub const BUSY: u8 = 24;
    pub const PWR: u8 = 18;
}

/// SPI clock speed in Hz
const CLOCK_SPEED: u32 = 4_000_000;

/// Largest single SPI transfer
const CHUNK_SIZE: usize = 4096;

/// Command that refreshes the BUSY line on this controller
const GET_STATUS: u8 = 0x71;

/// Interface errors
#[derive(Error, Debug)]
pub enum InterfaceError {
    #[error("GPIO initialization failed: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("SPI initialization failed: {0}")]
    Spi(#[from] rppal::spi::Error),

    #[error("SPI write failed: {0}")]
    Write(String),

    #[error("Busy timeout: display did not respond within {0}ms")]
    BusyTimeout(u64),
}

/// Command/data channel to the panel controller
pub struct PanelInterface {
    spi: Spi,
    rst: OutputPin,
    dc: OutputPin,
    pwr: OutputPin,
    busy: InputPin,
}

impl PanelInterface {
    /// Claim the pins and open SPI
    pub fn new() -> Result<Self, InterfaceError> {
        let gpio = Gpio::new()?;

        let mut rst = gpio.get(pins::RST)?.into_output();
        let mut dc = gpio.get(pins::DC)?.into_output();
        let mut pwr = gpio.get(pins::PWR)?.into_output();
        let busy = gpio.get(pins::BUSY)?.into_input();

        rst.set_high();
        dc.set_low();
        pwr.set_low();

        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, CLOCK_SPEED, Mode::Mode0)?;

        tracing::debug!(
            "Panel interface ready: RST={}, DC={}, BUSY={}, PWR={}, SPI0/CE0 at {}Hz",
            pins::RST,
            pins::DC,
            pins::BUSY,
            pins::PWR,
            CLOCK_SPEED
        );

        Ok(Self {
            spi,
            rst,
            dc,
            pwr,
            busy,
        })
    }

    pub fn power_on(&mut self) {
        tracing::debug!("Display power ON");
        self.pwr.set_high();
        thread::sleep(Duration::from_millis(10));
    }

    pub fn power_off(&mut self) {
        tracing::debug!("Display power OFF");
        self.pwr.set_low();
    }

    /// Hardware reset pulse
    pub fn reset(&mut self) {
        tracing::debug!("Performing hardware reset");
        self.rst.set_high();
        thread::sleep(Duration::from_millis(20));
        self.rst.set_low();
        thread::sleep(Duration::from_millis(2));
        self.rst.set_high();
        thread::sleep(Duration::from_millis(20));
    }

    /// Send a command byte (DC low)
    pub fn command(&mut self, cmd: u8) -> Result<(), InterfaceError> {
        self.dc.set_low();
        self.spi
            .write(&[cmd])
            .map_err(|e| InterfaceError::Write(e.to_string()))?;
        Ok(())
    }

    /// Send data bytes (DC high), chunked for large frames
    pub fn data(&mut self, data: &[u8]) -> Result<(), InterfaceError> {
        self.dc.set_high();
        for chunk in data.chunks(CHUNK_SIZE) {
            self.spi
                .write(chunk)
                .map_err(|e| InterfaceError::Write(e.to_string()))?;
        }
        Ok(())
    }

    /// Send a command followed by its parameters
    pub fn command_data(&mut self, cmd: u8, data: &[u8]) -> Result<(), InterfaceError> {
        self.command(cmd)?;
        if !data.is_empty() {
            self.data(data)?;
        }
        Ok(())
    }

    /// Wait until BUSY goes high, polling the status register
    pub fn wait_busy(&mut self, timeout: Duration) -> Result<(), InterfaceError> {
        let start = Instant::now();
        let poll_interval = Duration::from_millis(20);

        self.command(GET_STATUS)?;
        while self.busy.read() == Level::Low {
            if start.elapsed() > timeout {
                return Err(InterfaceError::BusyTimeout(timeout.as_millis() as u64));
            }
            thread::sleep(poll_interval);
            self.command(GET_STATUS)?;
        }

        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 {
            tracing::debug!("BUSY wait completed after {:?}", elapsed);
        }
        Ok(())
    }
}

impl Drop for PanelInterface {
    fn drop(&mut self) {
        self.pwr.set_low();
        tracing::debug!("Panel interface dropped, power disabled");
    }
}
