use thiserror::Error;

use crate::lexer::Bookmark;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("loop end without a matching loop start")]
    Unmatched,

    #[error("could not grow the loop stack past {entries} entries")]
    OutOfMemory { entries: usize },
}

/// Where each currently open loop body starts in the source
#[derive(Debug)]
pub struct PositionStack {
    entries: Vec<Bookmark>,
}

impl PositionStack {
    pub fn new() -> PositionStack {
        PositionStack {
            entries: Vec::with_capacity(1),
        }
    }

    /// Doubles the capacity whenever it's full
    pub fn push(&mut self, bookmark: Bookmark) -> Result<(), ControlError> {
        if self.entries.len() == self.entries.capacity() {
            let entries = self.entries.len();
            self.entries
                .try_reserve_exact(entries.max(1))
                .map_err(|_| ControlError::OutOfMemory { entries })?;
        }
        self.entries.push(bookmark);
        Ok(())
    }

    pub fn top(&self) -> Option<Bookmark> {
        self.entries.last().copied()
    }

    pub fn pop(&mut self) -> Option<Bookmark> {
        self.entries.pop()
    }

    /// Number of loops the entries belong to
    pub fn depth(&self) -> usize {
        self.entries.len()
    }
}

impl Default for PositionStack {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Executing instructions
    Active,
    /// Scanning past a loop body whose guard was zero, `depth` counts the
    /// nested loop starts seen since skipping began
    Skipping { depth: usize },
}

/// Decides what every `[` and `]` does, without ever building a bracket table.
///
/// A loop start saves the source position just after itself, a loop end
/// hands that position back so the caller can rewind to it. When the guard
/// cell is zero the body is skipped by counting brackets until the matching
/// loop end, which pops the saved position.
#[derive(Debug)]
pub struct LoopController {
    mode: Mode,
    stack: PositionStack,
}

impl LoopController {
    pub fn new() -> LoopController {
        LoopController {
            mode: Mode::Active,
            stack: PositionStack::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_skipping(&self) -> bool {
        matches!(self.mode, Mode::Skipping { .. })
    }

    /// Number of loops currently open
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Loop start, `body` is the position just after it
    pub fn open(&mut self, body: Bookmark, cell_is_zero: bool) -> Result<(), ControlError> {
        match self.mode {
            Mode::Active => {
                self.stack.push(body)?;
                if cell_is_zero {
                    tracing::debug!(depth = self.stack.depth(), "skipping loop body");
                    self.mode = Mode::Skipping { depth: 0 };
                }
            }
            Mode::Skipping { depth } => self.mode = Mode::Skipping { depth: depth + 1 },
        }
        Ok(())
    }

    /// Loop end, returns the position the source has to be rewound to (if any).
    ///
    /// Even when the guard is already zero the source is rewound, the body is
    /// then scanned again in skipping mode to find this loop end once more.
    pub fn close(&mut self, cell_is_zero: bool) -> Result<Option<Bookmark>, ControlError> {
        match self.mode {
            Mode::Active => {
                let body = self.stack.top().ok_or(ControlError::Unmatched)?;
                if cell_is_zero {
                    self.mode = Mode::Skipping { depth: 0 };
                }
                Ok(Some(body))
            }
            Mode::Skipping { depth } if depth > 0 => {
                self.mode = Mode::Skipping { depth: depth - 1 };
                Ok(None)
            }
            Mode::Skipping { .. } => {
                self.stack.pop();
                self.mode = Mode::Active;
                tracing::debug!(depth = self.stack.depth(), "left loop");
                Ok(None)
            }
        }
    }
}

impl Default for LoopController {
    fn default() -> Self {
        Self::new()
    }
}
