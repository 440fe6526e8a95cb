//! # i2c-sim
//! Host-side model of the STM32F1 I2C master peripheral.
//!
//! [`SimPeripheral`] implements [`RegisterAccess`] and reacts to register
//! accesses the way the hardware does in master mode: START sets SB, the
//! address byte is acknowledged by an attached [`Target`] (or not), ADDR is
//! cleared by reading SR2, data flows through DR with TXE/BTF/RXNE, and the
//! acknowledge bit is sampled as each received byte completes. Every access
//! and every bus condition is logged so tests can check ordering.
//!
//! Flags become visible a configurable number of SR1 reads after the event
//! that raises them, and faults can be injected to make the bus stall.

use embedded_i2c_regs::{Cr1, Instance, Reg, RegisterAccess, Sr1, Sr2};
use log::trace;

mod target;

pub use target::{RegisterFile, Target};

const CRX_RESET: u32 = 0x4444_4444;
const SR1_ERROR_MASK: u16 = 0xdf00;

/// A register access performed by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(Reg, u32),
    Write(Reg, u32),
}

/// A condition or byte on the simulated bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    RepeatedStart,
    Address { address: u8, read: bool, acked: bool },
    Write { value: u8, acked: bool },
    Read { value: u8, acked: bool },
    Stop,
}

/// Injected misbehaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// START requests never raise SB.
    NoStart,
    /// The address byte is never acknowledged nor refused.
    AddressStall,
    /// Data bytes never complete.
    DataStall,
    /// Another master wins the bus during the address byte: ARLO instead of ADDR.
    ArbitrationLoss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Started,
    Address { read: bool },
    Transmit,
    Receive,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Latch {
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    flags: Sr1,
    countdown: u32,
}

pub struct SimPeripheral {
    instance: Instance,
    apb1enr: u32,
    apb2enr: u32,
    crl: u32,
    crh: u32,
    cr1: Cr1,
    cr2: u16,
    oar1: u16,
    oar2: u16,
    ccr: u16,
    trise: u16,
    sr1: Sr1,
    sr2: Sr2,
    rx: u8,
    rx_acked: bool,
    phase: Phase,
    pending: Option<Pending>,
    latched: Option<Latch>,
    selected: bool,
    target: Option<Box<dyn Target>>,
    latency: u32,
    fault: Option<Fault>,
    accesses: Vec<Access>,
    events: Vec<BusEvent>,
}

impl Default for SimPeripheral {
    fn default() -> Self {
        Self::new(Instance::I2c1)
    }
}

impl SimPeripheral {
    pub fn new(instance: Instance) -> Self {
        Self {
            instance,
            apb1enr: 0,
            apb2enr: 0,
            crl: CRX_RESET,
            crh: CRX_RESET,
            cr1: Cr1::new(),
            cr2: 0,
            oar1: 0,
            oar2: 0,
            ccr: 0,
            trise: 0x2,
            sr1: Sr1::new(),
            sr2: Sr2::new(),
            rx: 0,
            rx_acked: false,
            phase: Phase::Idle,
            pending: None,
            latched: None,
            selected: false,
            target: None,
            latency: 0,
            fault: None,
            accesses: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Attach a slave device.
    pub fn with_target(mut self, target: impl Target + 'static) -> Self {
        self.target = Some(Box::new(target));
        self
    }

    /// Number of SR1 reads a flag stays hidden after being raised.
    pub fn with_latency(mut self, reads: u32) -> Self {
        self.latency = reads;
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn set_fault(&mut self, fault: Option<Fault>) {
        self.fault = fault;
    }

    pub fn accesses(&self) -> &[Access] {
        &self.accesses
    }

    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    pub fn clear_log(&mut self) {
        self.accesses.clear();
        self.events.clear();
    }

    fn clocked(&self) -> bool {
        self.apb1enr & self.instance.clock_enable() != 0
    }

    fn event(&mut self, event: BusEvent) {
        trace!("sim: {:?}", event);
        self.events.push(event);
    }

    fn schedule(&mut self, flags: Sr1) {
        let flags = match self.pending {
            Some(p) => Sr1::from_bits(p.flags.into_bits() | flags.into_bits()),
            None => flags,
        };
        self.pending = Some(Pending {
            flags,
            countdown: self.latency,
        });
    }

    fn reset(&mut self) {
        self.cr2 = 0;
        self.oar1 = 0;
        self.oar2 = 0;
        self.ccr = 0;
        self.trise = 0x2;
        self.sr1 = Sr1::new();
        self.sr2 = Sr2::new();
        self.phase = Phase::Idle;
        self.pending = None;
        self.latched = None;
        self.selected = false;
    }

    fn receiving(&self) -> bool {
        self.phase == Phase::Receive && (self.pending.is_some() || self.sr1.rxne())
    }

    fn start(&mut self) {
        if self.fault == Some(Fault::NoStart) {
            return;
        }
        let event = if self.phase == Phase::Idle {
            BusEvent::Start
        } else {
            BusEvent::RepeatedStart
        };
        self.event(event);
        self.sr1 = self
            .sr1
            .with_addr(false)
            .with_txe(false)
            .with_btf(false)
            .with_rxne(false);
        self.sr2 = self.sr2.with_msl(true).with_busy(true).with_tra(false);
        self.phase = Phase::Started;
        self.pending = None;
        self.schedule(Sr1::new().with_sb(true));
    }

    fn stop(&mut self) {
        if self.phase == Phase::Idle {
            return;
        }
        self.event(BusEvent::Stop);
        if self.selected {
            if let Some(target) = self.target.as_mut() {
                target.stop();
            }
            self.selected = false;
        }
        self.sr1 = self
            .sr1
            .with_sb(false)
            .with_addr(false)
            .with_txe(false)
            .with_btf(false);
        self.sr2 = Sr2::new();
        self.phase = Phase::Idle;
        self.pending = None;
    }

    fn write_cr1(&mut self, value: u32) {
        let cr1 = Cr1::from_bits(value as u16);
        if cr1.swrst() {
            self.reset();
            self.cr1 = Cr1::new().with_swrst(true);
            return;
        }
        self.cr1 = cr1.with_start(false).with_stop(false);
        if !cr1.pe() {
            return;
        }
        if cr1.start() {
            if self.receiving() {
                self.latched = Some(Latch::Start);
            } else {
                self.start();
            }
        }
        if cr1.stop() {
            if self.receiving() {
                self.latched = Some(Latch::Stop);
            } else {
                self.stop();
            }
        }
    }

    fn write_dr(&mut self, byte: u8) {
        match self.phase {
            Phase::Started if self.sr1.sb() => {
                self.sr1.set_sb(false);
                self.address(byte >> 1, byte & 1 == 1);
            }
            Phase::Transmit => {
                self.sr1 = self.sr1.with_txe(false).with_btf(false);
                self.pending = None;
                if self.fault == Some(Fault::DataStall) {
                    return;
                }
                let acked = match self.target.as_mut() {
                    Some(target) => target.write(byte),
                    None => false,
                };
                self.event(BusEvent::Write { value: byte, acked });
                if acked {
                    self.schedule(Sr1::new().with_txe(true).with_btf(true));
                } else {
                    self.phase = Phase::Failed;
                    self.schedule(Sr1::new().with_af(true));
                }
            }
            _ => trace!("sim: DR write {:#04x} ignored in {:?}", byte, self.phase),
        }
    }

    fn address(&mut self, address: u8, read: bool) {
        if self.fault == Some(Fault::AddressStall) {
            self.phase = Phase::Address { read };
            return;
        }
        if self.fault == Some(Fault::ArbitrationLoss) {
            trace!("sim: arbitration lost on address {:#04x}", address);
            self.sr2 = self.sr2.with_msl(false);
            self.phase = Phase::Idle;
            self.schedule(Sr1::new().with_arlo(true));
            return;
        }
        let acked = self
            .target
            .as_ref()
            .is_some_and(|target| target.address() == address);
        self.event(BusEvent::Address {
            address,
            read,
            acked,
        });
        if acked {
            if let Some(target) = self.target.as_mut() {
                target.selected(read);
            }
            self.selected = true;
            self.phase = Phase::Address { read };
            self.schedule(Sr1::new().with_addr(true));
        } else {
            self.phase = Phase::Failed;
            self.schedule(Sr1::new().with_af(true));
        }
    }

    fn read_sr1(&mut self) -> u16 {
        if let Some(mut pending) = self.pending {
            if pending.countdown == 0 {
                self.pending = None;
                self.sr1 = Sr1::from_bits(self.sr1.into_bits() | pending.flags.into_bits());
                if pending.flags.rxne() {
                    self.byte_received();
                }
            } else {
                pending.countdown -= 1;
                self.pending = Some(pending);
            }
        }
        self.sr1.into_bits()
    }

    fn byte_received(&mut self) {
        let value = match self.target.as_mut() {
            Some(target) => target.read(),
            None => 0xff,
        };
        let acked = self.cr1.ack();
        self.rx = value;
        self.rx_acked = acked;
        self.event(BusEvent::Read { value, acked });
    }

    fn read_sr2(&mut self) -> u16 {
        let value = self.sr2.into_bits();
        if self.sr1.addr() {
            self.sr1.set_addr(false);
            match self.phase {
                Phase::Address { read: false } => {
                    self.sr2.set_tra(true);
                    self.phase = Phase::Transmit;
                    self.schedule(Sr1::new().with_txe(true));
                }
                Phase::Address { read: true } => {
                    self.phase = Phase::Receive;
                    self.schedule(Sr1::new().with_rxne(true));
                }
                _ => {}
            }
        }
        value
    }

    fn read_dr(&mut self) -> u8 {
        if self.sr1.rxne() {
            self.sr1.set_rxne(false);
            match self.latched.take() {
                Some(Latch::Stop) => self.stop(),
                Some(Latch::Start) => self.start(),
                None if self.rx_acked && self.fault != Some(Fault::DataStall) => {
                    self.schedule(Sr1::new().with_rxne(true))
                }
                None => {}
            }
        }
        self.rx
    }
}

impl RegisterAccess for SimPeripheral {
    fn read(&mut self, reg: Reg) -> u32 {
        let value = match reg {
            Reg::Cr1 => self.cr1.into_bits() as u32,
            Reg::Cr2 => self.cr2 as u32,
            Reg::Oar1 => self.oar1 as u32,
            Reg::Oar2 => self.oar2 as u32,
            Reg::Dr => self.read_dr() as u32,
            Reg::Sr1 => self.read_sr1() as u32,
            Reg::Sr2 => self.read_sr2() as u32,
            Reg::Ccr => self.ccr as u32,
            Reg::Trise => self.trise as u32,
            Reg::Apb1enr => self.apb1enr,
            Reg::Apb2enr => self.apb2enr,
            Reg::Crl => self.crl,
            Reg::Crh => self.crh,
        };
        self.accesses.push(Access::Read(reg, value));
        value
    }

    fn write(&mut self, reg: Reg, value: u32) {
        self.accesses.push(Access::Write(reg, value));
        match reg {
            Reg::Apb1enr => self.apb1enr = value,
            Reg::Apb2enr => self.apb2enr = value,
            Reg::Crl => self.crl = value,
            Reg::Crh => self.crh = value,
            _ if !self.clocked() => trace!("sim: {:?} written with clock gated", reg),
            Reg::Cr1 => self.write_cr1(value),
            Reg::Cr2 => self.cr2 = value as u16,
            Reg::Oar1 => self.oar1 = value as u16,
            Reg::Oar2 => self.oar2 = value as u16,
            Reg::Dr => self.write_dr(value as u8),
            Reg::Sr1 => {
                let keep = value as u16 | !SR1_ERROR_MASK;
                self.sr1 = Sr1::from_bits(self.sr1.into_bits() & keep);
            }
            Reg::Sr2 => {}
            Reg::Ccr => self.ccr = value as u16,
            Reg::Trise => self.trise = value as u16 & 0x3f,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(latency: u32) -> SimPeripheral {
        let mut sim = SimPeripheral::default()
            .with_target(RegisterFile::new(0x50).with_contents(0, &[0xaa, 0xbb]))
            .with_latency(latency);
        sim.write(Reg::Apb1enr, Instance::I2c1.clock_enable());
        sim.write(Reg::Cr1, 1);
        sim.clear_log();
        sim
    }

    fn sr1(sim: &mut SimPeripheral) -> Sr1 {
        Sr1::from_bits(sim.read(Reg::Sr1) as u16)
    }

    #[test]
    fn gated_clock_ignores_writes() {
        let mut sim = SimPeripheral::default();
        sim.write(Reg::Ccr, 100);
        assert_eq!(sim.read(Reg::Ccr), 0);
        sim.write(Reg::Apb1enr, Instance::I2c1.clock_enable());
        sim.write(Reg::Ccr, 100);
        assert_eq!(sim.read(Reg::Ccr), 100);
    }

    #[test]
    fn flags_appear_after_latency() {
        let mut sim = enabled(2);
        sim.write(Reg::Cr1, 0x101);
        assert!(!sr1(&mut sim).sb());
        assert!(!sr1(&mut sim).sb());
        assert!(sr1(&mut sim).sb());
        assert_eq!(sim.events(), [BusEvent::Start]);
        assert_eq!(sim.read(Reg::Cr1), 1);
    }

    #[test]
    fn unknown_address_raises_af() {
        let mut sim = enabled(0);
        sim.write(Reg::Cr1, 0x101);
        assert!(sr1(&mut sim).sb());
        sim.write(Reg::Dr, 0x42 << 1);
        assert!(sr1(&mut sim).af());
        sim.write(Reg::Sr1, 0);
        assert!(!sr1(&mut sim).af());
        sim.write(Reg::Cr1, 0x201);
        assert_eq!(
            sim.events(),
            [
                BusEvent::Start,
                BusEvent::Address {
                    address: 0x42,
                    read: false,
                    acked: false
                },
                BusEvent::Stop
            ]
        );
    }

    #[test]
    fn lost_arbitration_raises_arlo() {
        let mut sim = enabled(0).with_fault(Fault::ArbitrationLoss);
        sim.write(Reg::Cr1, 0x101);
        assert!(sr1(&mut sim).sb());
        sim.write(Reg::Dr, 0xa0);
        let status = sr1(&mut sim);
        assert!(status.arlo() && !status.addr());
        assert!(!Sr2::from_bits(sim.read(Reg::Sr2) as u16).msl());
        sim.write(Reg::Sr1, 0);
        assert!(!sr1(&mut sim).arlo());
        // No stop is driven on a bus the master no longer owns.
        sim.write(Reg::Cr1, 0x201);
        assert_eq!(sim.events(), [BusEvent::Start]);
    }

    #[test]
    fn reception_samples_ack_and_latches_stop() {
        let mut sim = enabled(0);
        sim.write(Reg::Cr1, 0x101);
        sr1(&mut sim);
        sim.write(Reg::Dr, 0xa1);
        assert!(sr1(&mut sim).addr());
        sim.read(Reg::Sr2);
        sim.write(Reg::Cr1, 0x401);
        assert!(sr1(&mut sim).rxne());
        assert_eq!(sim.read(Reg::Dr), 0xaa);
        // NACK and STOP requested while the second byte is on the wire.
        sim.write(Reg::Cr1, 0x201);
        assert!(!sim.events().contains(&BusEvent::Stop));
        assert!(sr1(&mut sim).rxne());
        assert_eq!(sim.read(Reg::Dr), 0xbb);
        assert_eq!(
            sim.events()[2..],
            [
                BusEvent::Read {
                    value: 0xaa,
                    acked: true
                },
                BusEvent::Read {
                    value: 0xbb,
                    acked: false
                },
                BusEvent::Stop
            ]
        );
        assert!(!Sr2::from_bits(sim.read(Reg::Sr2) as u16).busy());
    }

    #[test]
    fn software_reset_clears_state() {
        let mut sim = enabled(0);
        sim.write(Reg::Cr2, 36);
        sim.write(Reg::Cr1, 0x101);
        sim.write(Reg::Cr1, 1 << 15);
        assert_eq!(sim.read(Reg::Cr2), 0);
        assert!(!sr1(&mut sim).sb());
        assert!(!Sr2::from_bits(sim.read(Reg::Sr2) as u16).msl());
    }
}
