/// A slave device attached to the simulated bus.
pub trait Target {
    /// 7-bit address the device answers to.
    fn address(&self) -> u8;

    /// Called when the device is addressed, `read` being the direction bit.
    fn selected(&mut self, _read: bool) {}

    /// A byte written by the master; returns whether it is acknowledged.
    fn write(&mut self, byte: u8) -> bool;

    /// Next byte to send to the master.
    fn read(&mut self) -> u8;

    /// Stop condition seen while the device was selected.
    fn stop(&mut self) {}
}

/// A 256 byte register file, the way most I2C sensors and EEPROMs expose their memory.
///
/// The first byte of a write transfer sets the register pointer, following bytes
/// are stored there. Reads and writes auto-increment the pointer.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    address: u8,
    memory: [u8; 256],
    pointer: u8,
    pointer_set: bool,
    write_protected: bool,
}

impl RegisterFile {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            memory: [0; 256],
            pointer: 0,
            pointer_set: false,
            write_protected: false,
        }
    }

    /// Preload `data` starting at register `start`, wrapping at the end of the file.
    pub fn with_contents(mut self, start: u8, data: &[u8]) -> Self {
        let mut reg = start;
        for &byte in data {
            self.memory[reg as usize] = byte;
            reg = reg.wrapping_add(1);
        }
        self
    }

    /// Refuse (NACK) every data byte after the register pointer.
    pub fn write_protected(mut self) -> Self {
        self.write_protected = true;
        self
    }

    pub fn memory(&self) -> &[u8; 256] {
        &self.memory
    }
}

impl Target for RegisterFile {
    fn address(&self) -> u8 {
        self.address
    }

    fn selected(&mut self, read: bool) {
        if !read {
            self.pointer_set = false;
        }
    }

    fn write(&mut self, byte: u8) -> bool {
        if !self.pointer_set {
            self.pointer = byte;
            self.pointer_set = true;
            return true;
        }
        if self.write_protected {
            return false;
        }
        self.memory[self.pointer as usize] = byte;
        self.pointer = self.pointer.wrapping_add(1);
        true
    }

    fn read(&mut self) -> u8 {
        let byte = self.memory[self.pointer as usize];
        self.pointer = self.pointer.wrapping_add(1);
        byte
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_then_data() {
        let mut dev = RegisterFile::new(0x50);
        dev.selected(false);
        assert!(dev.write(0xfe));
        assert!(dev.write(1));
        assert!(dev.write(2));
        assert!(dev.write(3));
        assert_eq!(dev.memory()[0xfe..], [1, 2]);
        assert_eq!(dev.memory()[0], 3);

        dev.selected(false);
        dev.write(0xff);
        dev.selected(true);
        assert_eq!([dev.read(), dev.read()], [2, 3]);
    }

    #[test]
    fn protected_file_takes_pointer_only() {
        let mut dev = RegisterFile::new(0x50)
            .with_contents(4, &[9])
            .write_protected();
        dev.selected(false);
        assert!(dev.write(4));
        assert!(!dev.write(0));
        assert_eq!(dev.read(), 9);
    }
}
