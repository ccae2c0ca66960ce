//! Waveshare 7.5" V2 (EPD7IN5_V2) black/white e-paper driver.
//!
//! Resolution: 800 x 480 pixels, 1 bit per pixel (8 pixels per byte,
//! MSB first, 1 = white).
//!
//! Command sequence follows the official Waveshare Python driver:
//! https://github.com/waveshare/e-Paper/blob/master/RaspberryPi_JetsonNano/python/lib/waveshare_epd/epd7in5_V2.py

use super::DisplayError;
use super::interface::PanelInterface;
use std::thread;
use std::time::Duration;

/// Display dimensions
pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 480;

/// Buffer size: 8 pixels per byte
pub const BUFFER_SIZE: usize = (WIDTH as usize / 8) * HEIGHT as usize;

/// A full refresh takes several seconds
const REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// EPD commands
mod cmd {
    pub const PANEL_SETTING: u8 = 0x00;
    pub const POWER_SETTING: u8 = 0x01;
    pub const POWER_OFF: u8 = 0x02;
    pub const POWER_ON: u8 = 0x04;
    pub const BOOSTER_SOFT_START: u8 = 0x06;
    pub const DEEP_SLEEP: u8 = 0x07;
    pub const OLD_DATA: u8 = 0x10;
    pub const DISPLAY_REFRESH: u8 = 0x12;
    pub const NEW_DATA: u8 = 0x13;
    pub const DUAL_SPI: u8 = 0x15;
    pub const VCOM_DATA_INTERVAL: u8 = 0x50;
    pub const TCON_SETTING: u8 = 0x60;
    pub const RESOLUTION_SETTING: u8 = 0x61;
}

/// EPD7IN5_V2 display driver
pub struct Epd7in5V2 {
    interface: PanelInterface,
    initialized: bool,
}

impl Epd7in5V2 {
    /// Open the panel interface (does not touch the controller yet)
    pub fn new() -> Result<Self, DisplayError> {
        Ok(Self {
            interface: PanelInterface::new()?,
            initialized: false,
        })
    }

    /// Power up and configure the controller
    pub fn init(&mut self) -> Result<(), DisplayError> {
        if self.initialized {
            return Ok(());
        }
        tracing::info!("Initializing EPD7IN5_V2 display ({}x{})", WIDTH, HEIGHT);

        self.interface.power_on();
        self.interface.reset();

        self.interface
            .command_data(cmd::BOOSTER_SOFT_START, &[0x17, 0x17, 0x28, 0x17])?;
        self.interface
            .command_data(cmd::POWER_SETTING, &[0x07, 0x07, 0x28, 0x17])?;
        self.interface.command(cmd::POWER_ON)?;
        thread::sleep(Duration::from_millis(100));
        self.interface.wait_busy(REFRESH_TIMEOUT)?;

        // KW mode, 800 x 480 = 0x0320 x 0x01E0
        self.interface.command_data(cmd::PANEL_SETTING, &[0x1F])?;
        self.interface
            .command_data(cmd::RESOLUTION_SETTING, &[0x03, 0x20, 0x01, 0xE0])?;
        self.interface.command_data(cmd::DUAL_SPI, &[0x00])?;
        self.interface
            .command_data(cmd::VCOM_DATA_INTERVAL, &[0x10, 0x07])?;
        self.interface.command_data(cmd::TCON_SETTING, &[0x22])?;

        self.initialized = true;
        tracing::info!("Display initialized successfully");
        Ok(())
    }

    /// Show a packed 1-bit frame
    pub fn display(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        if !self.initialized {
            return Err(DisplayError::NotInitialized);
        }
        if buffer.len() != BUFFER_SIZE {
            return Err(DisplayError::InvalidBufferSize {
                expected: BUFFER_SIZE,
                actual: buffer.len(),
            });
        }

        tracing::info!("Sending image data to display ({} bytes)", buffer.len());

        // Old frame slot gets the image, new frame slot its inverse
        let inverted: Vec<u8> = buffer.iter().map(|b| !b).collect();
        self.interface.command_data(cmd::OLD_DATA, buffer)?;
        self.interface.command_data(cmd::NEW_DATA, &inverted)?;
        self.refresh()?;

        tracing::info!("Display refresh complete");
        Ok(())
    }

    /// Clear to white
    pub fn clear(&mut self) -> Result<(), DisplayError> {
        self.init()?;
        tracing::info!("Clearing display");

        self.interface
            .command_data(cmd::OLD_DATA, &vec![0xFF; BUFFER_SIZE])?;
        self.interface
            .command_data(cmd::NEW_DATA, &vec![0x00; BUFFER_SIZE])?;
        self.refresh()
    }

    /// Deep sleep; `init` is needed before the next frame
    pub fn sleep(&mut self) -> Result<(), DisplayError> {
        tracing::info!("Putting display to sleep");

        self.interface
            .command_data(cmd::VCOM_DATA_INTERVAL, &[0xF7])?;
        self.interface.command(cmd::POWER_OFF)?;
        self.interface.wait_busy(REFRESH_TIMEOUT)?;
        self.interface.command_data(cmd::DEEP_SLEEP, &[0xA5])?;
        thread::sleep(Duration::from_secs(2));

        self.interface.power_off();
        self.initialized = false;
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), DisplayError> {
        self.interface.command(cmd::DISPLAY_REFRESH)?;
        thread::sleep(Duration::from_millis(100));
        tracing::info!("Waiting for display refresh to complete...");
        self.interface.wait_busy(REFRESH_TIMEOUT)?;
        Ok(())
    }
}

impl Drop for Epd7in5V2 {
    fn drop(&mut self) {
        if self.initialized {
            let _ = self.sleep();
        }
    }
}
