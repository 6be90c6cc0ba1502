//! Interpreter for the eight-symbol byte tape language, plus `2` which
//! repeats the run of the previous instruction.
//!
//! Programs are executed straight off a seekable source: loops are
//! re-entered by seeking back rather than through a parsed bracket table.

pub mod interpreter;
pub mod lexer;
pub mod tape;
pub mod terminal;
