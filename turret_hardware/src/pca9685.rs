//! PCA9685 16-channel PWM controller over I2C.

use std::thread::sleep;
use std::time::Duration;

use rppal::i2c::I2c;
use tracing::{debug, info};
use turret_traits::ServoBank;

use crate::error::{HwError, Result};

const REG_MODE1: u8 = 0x00;
const REG_PRESCALE: u8 = 0xFE;
const REG_LED0_ON_L: u8 = 0x06;

const MODE1_SLEEP: u8 = 0x10;
const MODE1_AUTO_INC: u8 = 0x20;
const MODE1_RESTART: u8 = 0x80;

/// Internal oscillator of the chip, Hz.
const OSC_CLOCK_HZ: f64 = 25_000_000.0;
const COUNTER_TICKS: f64 = 4096.0;

pub struct Pca9685 {
    i2c: I2c,
}

impl Pca9685 {
    /// Open the controller on the given bus/address and program the PWM
    /// frequency. The counter runs 12-bit, so pulse values are ticks out
    /// of 4096 per period.
    pub fn new(bus: u8, address: u16, pwm_frequency_hz: u32) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus).map_err(i2c_err)?;
        i2c.set_slave_address(address).map_err(i2c_err)?;

        let mut dev = Self { i2c };
        dev.write_reg(REG_MODE1, MODE1_AUTO_INC)?;
        dev.set_pwm_freq(pwm_frequency_hz)?;
        info!(bus, address, pwm_frequency_hz, "pca9685 initialised");
        Ok(dev)
    }

    /// Program the prescaler. The chip only accepts a prescale write while
    /// asleep, hence the sleep/restore/restart dance.
    fn set_pwm_freq(&mut self, freq_hz: u32) -> Result<()> {
        let prescale = (OSC_CLOCK_HZ / (COUNTER_TICKS * f64::from(freq_hz.max(1)))).round() - 1.0;
        let prescale = prescale.clamp(3.0, 255.0) as u8;

        let old_mode = self.read_reg(REG_MODE1)?;
        self.write_reg(REG_MODE1, (old_mode & !MODE1_RESTART) | MODE1_SLEEP)?;
        self.write_reg(REG_PRESCALE, prescale)?;
        self.write_reg(REG_MODE1, old_mode)?;
        sleep(Duration::from_millis(5));
        self.write_reg(REG_MODE1, old_mode | MODE1_RESTART)?;
        debug!(freq_hz, prescale, "pwm frequency programmed");
        Ok(())
    }

    /// Set raw on/off tick counts for one channel.
    pub fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<()> {
        if channel >= 16 {
            return Err(HwError::BadChannel(channel));
        }
        if on > 4095 || off > 4095 {
            return Err(HwError::BadPulse(on.max(off)));
        }
        let reg = REG_LED0_ON_L + 4 * channel;
        let bytes = [
            (on & 0xFF) as u8,
            (on >> 8) as u8,
            (off & 0xFF) as u8,
            (off >> 8) as u8,
        ];
        self.i2c.block_write(reg, &bytes).map_err(i2c_err)?;
        Ok(())
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<()> {
        self.i2c.smbus_write_byte(reg, value).map_err(i2c_err)
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8> {
        self.i2c.smbus_read_byte(reg).map_err(i2c_err)
    }
}

impl ServoBank for Pca9685 {
    fn set_pulse(
        &mut self,
        channel: u8,
        pulse: u16,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.set_pwm(channel, 0, pulse)?;
        Ok(())
    }
}

fn i2c_err(e: rppal::i2c::Error) -> HwError {
    HwError::I2c(e.to_string())
}
