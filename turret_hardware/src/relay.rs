//! Active-high relay on a GPIO pin.

use rppal::gpio::{Gpio, OutputPin};
use tracing::info;
use turret_traits::Relay;

use crate::error::{HwError, Result};

pub struct GpioRelay {
    pin: OutputPin,
    active: bool,
}

impl GpioRelay {
    pub fn new(bcm_pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let mut pin = gpio.get(bcm_pin).map_err(gpio_err)?.into_output();
        pin.set_low();
        Ok(Self { pin, active: false })
    }
}

impl Relay for GpioRelay {
    fn set_active(&mut self, on: bool) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Redundant writes are skipped so a steady state never chatters
        // the coil.
        if self.active == on {
            return Ok(());
        }
        if on {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        self.active = on;
        info!(on, "relay switched");
        Ok(())
    }
}

impl Drop for GpioRelay {
    fn drop(&mut self) {
        // Never leave the actuator energised.
        self.pin.set_low();
    }
}

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}
