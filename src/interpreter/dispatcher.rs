use std::io::{ErrorKind, Read, Write};

use crate::lexer::{Operation, Position};

use super::{Runtime, RuntimeError};

/// The last operation executed and how many times in a row it ran
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OperationMemory {
    pub last: Option<Operation>,
    pub run: u64,
}

impl OperationMemory {
    fn record(&mut self, op: Operation) {
        if self.last == Some(op) {
            self.run = self.run.saturating_add(1);
        } else {
            self.last = Some(op);
            self.run = 1;
        }
    }

    /// Loop boundaries break a run, the last operation is kept
    pub fn break_run(&mut self) {
        self.run = 0;
    }
}

impl Runtime {
    /// Run a single primitive operation against the tape and io channels
    pub fn execute(&mut self, op: Operation) -> Result<(), RuntimeError> {
        match op {
            Operation::MoveLeft => self.tape.move_left()?,
            Operation::MoveRight => self.tape.move_right()?,
            Operation::Increment => self.tape.increment(),
            Operation::Decrement => self.tape.decrement(),
            Operation::Read => {
                let byte = self.read_byte()?;
                self.tape.write(byte);
            }
            Operation::Write => self.write_byte(self.tape.read())?,
        }

        self.memory.record(op);
        Ok(())
    }

    /// `2`: run the last operation once more for every time it has run in a row.
    ///
    /// Every replay counts towards the run so `+2` is `++` and `+22` is `++++`.
    pub fn repeat(&mut self, position: Position) -> Result<(), RuntimeError> {
        let (Some(op), run) = (self.memory.last, self.memory.run) else {
            return Err(RuntimeError::Syntax { token: '2', position });
        };
        if run == 0 {
            return Err(RuntimeError::Syntax { token: '2', position });
        }

        for _ in 0..run {
            self.execute(op)?;
        }
        Ok(())
    }

    /// Read from the input stream, end of input gives the configured sentinel
    fn read_byte(&mut self) -> Result<u8, RuntimeError> {
        let mut buf = [0u8; 1];
        loop {
            match self.in_stream.read(&mut buf) {
                Ok(0) => return Ok(self.config.eof),
                Ok(_) => return Ok(buf[0]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(RuntimeError::Input(e)),
            }
        }
    }

    /// Write to the output stream, flushed straight away so prompts show up
    fn write_byte(&mut self, byte: u8) -> Result<(), RuntimeError> {
        self.out_stream
            .write_all(&[byte])
            .and_then(|()| self.out_stream.flush())
            .map_err(RuntimeError::Output)
    }
}
