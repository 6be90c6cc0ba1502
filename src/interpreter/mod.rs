pub mod control;
pub mod dispatcher;

use std::io::{self, BufRead, Read, Seek, Write};

use thiserror::Error;

use crate::{
    lexer::{lexer::Lexer, LexerError, Position, Token, TokenKind},
    tape::{Tape, TapeError},
};

use self::{
    control::{ControlError, LoopController},
    dispatcher::OperationMemory,
};

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("could not allocate memory for the {what}")]
    OutOfMemory { what: &'static str },

    #[error("file position indicator not available")]
    Seek(#[source] io::Error),

    #[error("reading failed")]
    Read(#[source] io::Error),

    #[error("invalid syntax near '{token}' at {position}")]
    Syntax { token: char, position: Position },

    #[error("missing ']' ({depth} loop(s) left open)")]
    UnterminatedLoop { depth: usize },

    #[error("reading input failed")]
    Input(#[source] io::Error),

    #[error("writing output failed")]
    Output(#[source] io::Error),
}

impl RuntimeError {
    /// Every runtime failure is fatal and shares the one exit code
    pub fn exit_code(&self) -> u8 {
        match self {
            RuntimeError::OutOfMemory { .. }
            | RuntimeError::Seek(_)
            | RuntimeError::Read(_)
            | RuntimeError::Syntax { .. }
            | RuntimeError::UnterminatedLoop { .. }
            | RuntimeError::Input(_)
            | RuntimeError::Output(_) => 1,
        }
    }
}

impl From<TapeError> for RuntimeError {
    fn from(error: TapeError) -> Self {
        match error {
            TapeError::OutOfMemory { .. } => RuntimeError::OutOfMemory { what: "tape" },
        }
    }
}

impl From<LexerError> for RuntimeError {
    fn from(error: LexerError) -> Self {
        match error {
            LexerError::Read(e) => RuntimeError::Read(e),
            LexerError::Seek(e) => RuntimeError::Seek(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Stored by `,` once the input is exhausted
    pub eof: u8,
}

impl Default for Config {
    fn default() -> Self {
        // EOF (-1) truncated to a byte
        Config { eof: 255 }
    }
}

/// Everything an executing program can touch
pub struct Runtime {
    pub tape: Tape,
    pub memory: OperationMemory,
    pub config: Config,

    in_stream: Box<dyn Read>,
    out_stream: Box<dyn Write>,
}

impl Runtime {
    pub fn new(
        config: Config,
        in_stream: Box<dyn Read>,
        out_stream: Box<dyn Write>,
    ) -> Result<Self, RuntimeError> {
        Ok(Self {
            tape: Tape::new()?,
            memory: OperationMemory::default(),
            config,
            in_stream,
            out_stream,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Finished,
}

/// Runs a program straight off its source, one token at a time
pub struct Interpreter<R> {
    lexer: Lexer<R>,
    runtime: Runtime,
    control: LoopController,
}

impl<R: BufRead + Seek> Interpreter<R> {
    pub fn new(source: R, runtime: Runtime) -> Result<Self, RuntimeError> {
        Ok(Self {
            lexer: Lexer::new(source)?,
            runtime,
            control: LoopController::new(),
        })
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Number of loops currently open
    pub fn depth(&self) -> usize {
        self.control.depth()
    }

    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while self.step()? == Step::Continue {}
        Ok(())
    }

    /// Execute (or skip over) the next token
    pub fn step(&mut self) -> Result<Step, RuntimeError> {
        let Some(token) = self.lexer.next_token()? else {
            return match self.control.depth() {
                0 => Ok(Step::Finished),
                depth => Err(RuntimeError::UnterminatedLoop { depth }),
            };
        };

        match token.kind {
            TokenKind::LoopStart => self.loop_start(token)?,
            TokenKind::LoopEnd => self.loop_end(token)?,
            // discarded while skipping, `2` included
            _ if self.control.is_skipping() => {}
            TokenKind::Instruction(op) => self.runtime.execute(op)?,
            TokenKind::Repeat => self.runtime.repeat(token.position)?,
        }
        Ok(Step::Continue)
    }

    fn loop_start(&mut self, token: Token) -> Result<(), RuntimeError> {
        tracing::trace!(position = %token.position, mode = ?self.control.mode(), "loop start");
        self.runtime.memory.break_run();

        let body = self.lexer.bookmark();
        let cell_is_zero = self.runtime.tape.value_is_zero();
        self.control
            .open(body, cell_is_zero)
            .map_err(|e| control_error(e, token))
    }

    fn loop_end(&mut self, token: Token) -> Result<(), RuntimeError> {
        tracing::trace!(position = %token.position, mode = ?self.control.mode(), "loop end");
        self.runtime.memory.break_run();

        let cell_is_zero = self.runtime.tape.value_is_zero();
        let rewind = self
            .control
            .close(cell_is_zero)
            .map_err(|e| control_error(e, token))?;
        if let Some(body) = rewind {
            self.lexer.restore(body)?;
        }
        Ok(())
    }
}

fn control_error(error: ControlError, token: Token) -> RuntimeError {
    match error {
        ControlError::Unmatched => RuntimeError::Syntax {
            token: token.kind.symbol(),
            position: token.position,
        },
        ControlError::OutOfMemory { .. } => RuntimeError::OutOfMemory { what: "loop stack" },
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, io::Cursor, rc::Rc};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::interpreter::control::Mode;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn interpreter(
        source: &'static str,
        input: &'static [u8],
    ) -> (Interpreter<Cursor<&'static [u8]>>, SharedBuffer) {
        let output = SharedBuffer::default();
        let runtime = Runtime::new(
            Config::default(),
            Box::new(Cursor::new(input)),
            Box::new(output.clone()),
        )
        .unwrap();
        let interpreter = Interpreter::new(Cursor::new(source.as_bytes()), runtime).unwrap();
        (interpreter, output)
    }

    fn run(source: &'static str, input: &'static [u8]) -> Result<Vec<u8>, RuntimeError> {
        let (mut interpreter, output) = interpreter(source, input);
        interpreter.run()?;
        let bytes = output.0.borrow().clone();
        Ok(bytes)
    }

    #[test]
    fn multiplies_with_a_loop() {
        assert_eq!(run("++++++++[>++++++++<-]>.", b"").unwrap(), b"@");
    }

    #[test]
    fn echoes_input() {
        assert_eq!(run(",.", b"A").unwrap(), vec![65]);
    }

    #[test]
    fn repeat_doubles_the_run() {
        assert_eq!(run("+++2.", b"").unwrap(), vec![6]);
        assert_eq!(run("+2.", b"").unwrap(), vec![2]);
        assert_eq!(run("+22.", b"").unwrap(), vec![4]);
    }

    #[test]
    fn repeat_after_loop_boundary_is_a_syntax_error() {
        let error = run("+[-]2", b"").unwrap_err();
        assert!(matches!(error, RuntimeError::Syntax { token: '2', .. }));
        let error = run("+[2-]", b"").unwrap_err();
        assert!(matches!(error, RuntimeError::Syntax { token: '2', .. }));
    }

    #[test]
    fn repeat_is_ignored_inside_skipped_loops() {
        assert_eq!(run("[2]+.", b"").unwrap(), vec![1]);
    }

    #[test]
    fn skipped_loop_runs_nothing() {
        assert_eq!(run("[.+[.]]+.", b"").unwrap(), vec![1]);
    }

    #[test]
    fn nested_loops() {
        // 3 * 4 * 5 in the third cell
        assert_eq!(run("+++[>++++[>+++++<-]<-]>>.", b"").unwrap(), vec![60]);
    }

    #[test]
    fn unmatched_loop_end_reports_position() {
        let error = run("+\n ]", b"").unwrap_err();
        match error {
            RuntimeError::Syntax { token, position } => {
                assert_eq!(token, ']');
                assert_eq!(position, Position { line: 2, col: 2 });
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unterminated_loop() {
        assert!(matches!(
            run("+[-", b""),
            Err(RuntimeError::UnterminatedLoop { depth: 1 })
        ));
        // still open when the source runs out mid skip
        assert!(matches!(
            run("[[]", b""),
            Err(RuntimeError::UnterminatedLoop { depth: 1 })
        ));
    }

    #[test]
    fn empty_body_with_non_zero_guard_never_ends() {
        let (mut interpreter, _) = interpreter("+[]", b"");
        for _ in 0..10_000 {
            assert_eq!(interpreter.step().unwrap(), Step::Continue);
        }
        assert_eq!(interpreter.depth(), 1);
        assert_eq!(interpreter.control.mode(), Mode::Active);
        assert_eq!(interpreter.runtime().tape.read(), 1);
    }

    #[test]
    fn finishing_clears_the_stack() {
        let (mut interpreter, _) = interpreter("++[-[-]]", b"");
        interpreter.run().unwrap();
        assert_eq!(interpreter.depth(), 0);
        assert_eq!(interpreter.step().unwrap(), Step::Finished);
    }

    #[test]
    fn comments_are_skipped_in_both_modes() {
        // the `]` on the third line is part of a comment, so the loop closes on the fourth
        let source = "+. print one\n-[\nskipped +. ]\n]+. done\n";
        assert_eq!(run(source, b"").unwrap(), vec![1, 1]);
    }

    #[test]
    fn output_before_a_failure_is_kept() {
        let (mut interpreter, output) = interpreter("+.]", b"");
        assert!(interpreter.run().is_err());
        assert_eq!(*output.0.borrow(), vec![1]);
    }

    #[test]
    fn every_error_exits_with_one() {
        let error = run("]", b"").unwrap_err();
        assert_eq!(error.exit_code(), 1);
    }

    /// Reports where it is but can't go back there
    struct ForwardOnly(Cursor<&'static [u8]>);

    impl Read for ForwardOnly {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf)
        }
    }

    impl BufRead for ForwardOnly {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            self.0.fill_buf()
        }

        fn consume(&mut self, amt: usize) {
            self.0.consume(amt)
        }
    }

    impl Seek for ForwardOnly {
        fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
            match pos {
                io::SeekFrom::Current(0) => self.0.seek(pos),
                _ => Err(io::Error::other("cannot rewind")),
            }
        }
    }

    #[test]
    fn failed_rewind_at_loop_end_is_a_seek_error() {
        let runtime =
            Runtime::new(Config::default(), Box::new(io::empty()), Box::new(io::sink())).unwrap();
        let mut interpreter =
            Interpreter::new(ForwardOnly(Cursor::new(b"+[-]".as_slice())), runtime).unwrap();

        let error = interpreter.run().unwrap_err();
        assert!(matches!(error, RuntimeError::Seek(_)));
        assert_eq!(error.exit_code(), 1);
        assert_eq!(error.to_string(), "file position indicator not available");
    }
}
