use std::fmt;

use thiserror::Error;

pub mod lexer;

/// The primitive operations, i.e. everything that acts on the tape or the io channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    // `<`: Move the `data pointer` one cell to the left
    MoveLeft,
    // `>`: Move the `data pointer` one cell to the right
    MoveRight,

    // `+`: Increment the byte at the `data pointer` by one
    Increment,
    // `-`: Decrement the byte at the `data pointer` by one
    Decrement,

    // `,`: Read the next byte from the `input device` and write it to the `data pointer`
    Read,
    // `.`: Write the byte at the `data pointer` to the `output device`
    Write,
}

impl Operation {
    pub fn symbol(self) -> char {
        match self {
            Operation::MoveLeft => '<',
            Operation::MoveRight => '>',
            Operation::Increment => '+',
            Operation::Decrement => '-',
            Operation::Read => ',',
            Operation::Write => '.',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Instruction(Operation),

    // `2`: Run the last operation again, once for every time it has run in a row
    Repeat,

    // `[`: If the byte at the `data pointer` is zero, then skip forward past the matching `]`
    LoopStart,
    // `]`: Go back to just after the matching `[` and test the byte at the `data pointer` again
    LoopEnd,
}

impl TokenKind {
    /// Classifies a single source byte, `None` for anything that isn't an instruction
    pub fn from_byte(byte: u8) -> Option<TokenKind> {
        Some(match byte {
            b'<' => TokenKind::Instruction(Operation::MoveLeft),
            b'>' => TokenKind::Instruction(Operation::MoveRight),
            b'+' => TokenKind::Instruction(Operation::Increment),
            b'-' => TokenKind::Instruction(Operation::Decrement),
            b',' => TokenKind::Instruction(Operation::Read),
            b'.' => TokenKind::Instruction(Operation::Write),
            b'2' => TokenKind::Repeat,
            b'[' => TokenKind::LoopStart,
            b']' => TokenKind::LoopEnd,
            _ => return None,
        })
    }

    pub fn symbol(self) -> char {
        match self {
            TokenKind::Instruction(op) => op.symbol(),
            TokenKind::Repeat => '2',
            TokenKind::LoopStart => '[',
            TokenKind::LoopEnd => ']',
        }
    }
}

/// Human readable location of a token, both 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

/// A saved place in the source that the lexer can be rewound to.
///
/// Only the lexer that handed it out knows how to interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bookmark {
    pub(crate) offset: u64,
    pub(crate) position: Position,
}

#[derive(Error, Debug)]
pub enum LexerError {
    #[error("reading failed")]
    Read(#[source] std::io::Error),

    #[error("file position indicator not available")]
    Seek(#[source] std::io::Error),
}
