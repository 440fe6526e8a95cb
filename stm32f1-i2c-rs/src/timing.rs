//! Bus timing derivation for CR2, CCR and TRISE.

use crate::ConfigError;
use embedded_i2c_regs::{
    CCR_MAX, Ccr, Cr2, MAX_INPUT_CLOCK_MHZ, MIN_INPUT_CLOCK_MHZ, TRISE_MAX, Trise,
};

/// Nanoseconds per microsecond; `NS_PER_US / f_MHz` is the clock period in ns.
pub const NS_PER_US: u32 = 1000;

/// SCL high period targeted in standard mode, in ns.
pub const STANDARD_HIGH_PERIOD_NS: u32 = 5000;

/// Maximum SCL rise time in standard mode, in ns.
pub const STANDARD_MAX_RISE_NS: u32 = 1000;

/// SCL high period targeted in fast mode, in ns.
pub const FAST_HIGH_PERIOD_NS: u32 = 100;

/// Maximum SCL rise time in fast mode, in ns.
pub const FAST_MAX_RISE_NS: u32 = 300;

/// Bus speed class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Speed {
    /// Standard mode, up to 100 kHz.
    #[default]
    Standard,
    /// Fast mode, up to 400 kHz, with a 9:16 high:low duty cycle.
    Fast,
}

/// Register values derived for a speed class and input clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Speed class the values were derived for.
    pub speed: Speed,
    /// Peripheral input clock in MHz, as programmed in CR2.FREQ.
    pub freq_mhz: u8,
    /// Clock divider, as programmed in CCR.CCR.
    pub ccr: u16,
    /// Rise time, as programmed in TRISE.
    pub trise: u8,
}

impl Timing {
    /// Derive the timing registers for `speed` with a peripheral clock of `pclk1_mhz`.
    ///
    /// Standard mode: `CCR = 5000 / f`, `TRISE = 1000 / (1000 / f) + 1`.
    /// Fast mode: `CCR = 100 / (1000 / f)`, `TRISE = 300 / (1000 / f) + 1`.
    /// All arithmetic is integer; the `+ 1` keeps the rise time from being
    /// under-counted.
    pub fn compute(speed: Speed, pclk1_mhz: u8) -> Result<Self, ConfigError> {
        if !(MIN_INPUT_CLOCK_MHZ..=MAX_INPUT_CLOCK_MHZ).contains(&pclk1_mhz) {
            return Err(ConfigError::ClockOutOfRange(pclk1_mhz));
        }
        let mhz = pclk1_mhz as u32;
        let period_ns = NS_PER_US / mhz;
        let (ccr, trise) = match speed {
            Speed::Standard => (
                STANDARD_HIGH_PERIOD_NS / mhz,
                STANDARD_MAX_RISE_NS / period_ns + 1,
            ),
            Speed::Fast => (
                FAST_HIGH_PERIOD_NS / period_ns,
                FAST_MAX_RISE_NS / period_ns + 1,
            ),
        };
        if ccr == 0 {
            return Err(ConfigError::ZeroDivider);
        }
        // Guards on the register widths; the clock range check keeps both in bounds.
        if ccr > CCR_MAX {
            return Err(ConfigError::DividerOverflow(ccr));
        }
        if trise > TRISE_MAX {
            return Err(ConfigError::RiseTimeOverflow(trise));
        }
        Ok(Self {
            speed,
            freq_mhz: pclk1_mhz,
            ccr: ccr as u16,
            trise: trise as u8,
        })
    }

    /// CR2 with the FREQ field set, other fields taken from `cr2`.
    pub fn cr2(&self, cr2: Cr2) -> Cr2 {
        cr2.with_freq(self.freq_mhz)
    }

    /// CCR value for this timing.
    pub fn ccr_register(&self) -> Ccr {
        let fast = self.speed == Speed::Fast;
        Ccr::new().with_fs(fast).with_duty(fast).with_ccr(self.ccr)
    }

    /// TRISE value for this timing.
    pub fn trise_register(&self) -> Trise {
        Trise::new().with_trise(self.trise)
    }
}
