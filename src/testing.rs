//! In-memory register file standing in for a real chip in tests.

use embedded_hal::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

/// A 256-byte register file behind an I2C address.
///
/// The first byte of a write sets the register pointer, the rest are stored
/// from there on. Reads start at the pointer. Both auto-increment and wrap at
/// 0xFF like the DS3232 SRAM pointer does.
pub(crate) struct SimulatedRtc {
    pub regs: [u8; 256],
    pub pointer: u8,
    pub address: u8,
    /// When set, every transaction fails with a NACK
    pub nack: bool,
}

impl SimulatedRtc {
    pub fn new() -> Self {
        Self {
            regs: [0; 256],
            pointer: 0,
            address: crate::DEFAULT_ADDRESS,
            nack: false,
        }
    }

    fn run(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
        if self.nack || address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    if let Some((&pointer, data)) = bytes.split_first() {
                        self.pointer = pointer;
                        for &byte in data {
                            self.regs[usize::from(self.pointer)] = byte;
                            self.pointer = self.pointer.wrapping_add(1);
                        }
                    }
                }
                Operation::Read(buffer) => {
                    for byte in buffer.iter_mut() {
                        *byte = self.regs[usize::from(self.pointer)];
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                }
            }
        }
        Ok(())
    }
}

impl ErrorType for SimulatedRtc {
    type Error = ErrorKind;
}

impl embedded_hal::i2c::I2c for SimulatedRtc {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.run(address, operations)
    }
}

#[cfg(feature = "async")]
impl embedded_hal_async::i2c::I2c for SimulatedRtc {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.run(address, operations)
    }
}
