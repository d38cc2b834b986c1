use std::mem::{discriminant, Discriminant};

use embedded_hal::i2c::{ErrorType, I2c, Operation};

use crate::buspirate::Transport;
use crate::command::MAX_BULK_WRITE;
use crate::error::{Error, Phase};
use crate::{modes, BusPirate};

fn i2c_read_address(address: u8) -> u8 {
    (address << 1) + 1
}

fn i2c_write_address(address: u8) -> u8 {
    address << 1
}

impl<P: Transport> ErrorType for BusPirate<modes::I2c, P> {
    type Error = Error;
}

impl<P: Transport> BusPirate<modes::I2c, P> {
    fn run_operations(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Error> {
        type PreviousOp<'a> = Option<Discriminant<Operation<'a>>>;
        // A Start condition is needed when:
        // - It is the first operation (previous_operation is None).
        // - The previous operation is of a different type to the current operation.
        fn needs_start<'a>(po: PreviousOp<'a>, op: &Operation<'a>) -> bool {
            !po.is_some_and(|po| discriminant(op) == po)
        }

        let is_read: Vec<bool> = operations
            .iter()
            .map(|op| matches!(op, Operation::Read(_)))
            .collect();
        let mut previous_operation: PreviousOp = None;

        for (index, operation) in operations.iter_mut().enumerate() {
            if needs_start(previous_operation, operation) {
                self.start()?;
                let (address_byte, phase) = match operation {
                    Operation::Read(_) => (i2c_read_address(address), Phase::ReadAddress),
                    Operation::Write(_) => (i2c_write_address(address), Phase::WriteAddress),
                };
                if self.write_bulk(&[address_byte])?.is_some() {
                    return Err(Error::Nack { phase, address });
                }
            }
            previous_operation = Some(discriminant(operation));

            match operation {
                Operation::Write(bytes) => {
                    for chunk in bytes.chunks(MAX_BULK_WRITE) {
                        if self.write_bulk(chunk)?.is_some() {
                            return Err(Error::Nack {
                                phase: Phase::Data,
                                address,
                            });
                        }
                    }
                }
                Operation::Read(buffer) => {
                    // Reads coalesce with a following read, so only the last
                    // byte before a direction change or the stop is NACKed.
                    let continues = is_read.get(index + 1).copied().unwrap_or(false);
                    let requested = buffer.len();
                    for i in 0..requested {
                        let Some(byte) = self.read_byte()? else {
                            return Err(Error::ShortRead {
                                requested,
                                data: buffer[..i].to_vec(),
                            });
                        };
                        buffer[i] = byte;
                        if i + 1 < requested || continues {
                            self.ack()?;
                        } else {
                            self.nack()?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl<P: Transport> I2c for BusPirate<modes::I2c, P> {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if operations.is_empty() {
            return Ok(());
        }
        let result = self.run_operations(address, operations);
        // Send the final Stop condition, also after a failed operation.
        let stop = self.stop();
        result.and(stop)
    }
}
