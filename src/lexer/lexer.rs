use std::io::{BufRead, ErrorKind, Seek, SeekFrom};

use super::{Bookmark, LexerError, Position, Token, TokenKind};

/// Reads tokens straight off a seekable source, one byte at a time.
///
/// Nothing is buffered beyond what the reader does itself, loops are
/// re-executed by rewinding the reader to a `Bookmark`.
#[derive(Debug)]
pub struct Lexer<R> {
    /** Human Readable positions in file */
    cur_line: usize,
    cur_col: usize,

    /** 'raw' format / offset within the source (in bytes) */
    byte_offset: u64,

    reader: R,
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c')
}

impl<R: BufRead + Seek> Lexer<R> {
    /// Fails with `LexerError::Seek` if the source can't report its position
    pub fn new(mut reader: R) -> Result<Lexer<R>, LexerError> {
        let byte_offset = reader.stream_position().map_err(LexerError::Seek)?;

        Ok(Lexer {
            cur_line: 1,
            cur_col: 1,

            byte_offset,

            reader,
        })
    }

    pub fn position(&self) -> Position {
        Position {
            line: self.cur_line,
            col: self.cur_col,
        }
    }

    fn consume_byte(&mut self) -> Result<Option<u8>, LexerError> {
        let byte = loop {
            match self.reader.fill_buf() {
                Ok([]) => return Ok(None),
                Ok(buf) => break buf[0],
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(LexerError::Read(e)),
            }
        };
        self.reader.consume(1);

        self.cur_col += 1;
        if byte == b'\n' {
            self.cur_line += 1;
            self.cur_col = 1;
        }
        self.byte_offset += 1;
        Ok(Some(byte))
    }

    /// Throws away the rest of the line, including the line break
    fn skip_comment(&mut self) -> Result<(), LexerError> {
        while let Some(byte) = self.consume_byte()? {
            if byte == b'\n' {
                break;
            }
        }
        Ok(())
    }

    /// The next instruction in the source, `None` once the source is exhausted
    pub fn next_token(&mut self) -> Result<Option<Token>, LexerError> {
        loop {
            let position = self.position();
            let Some(byte) = self.consume_byte()? else {
                return Ok(None);
            };

            if let Some(kind) = TokenKind::from_byte(byte) {
                return Ok(Some(Token { kind, position }));
            }
            if !is_whitespace(byte) {
                self.skip_comment()?;
            }
        }
    }

    /// Remember the current place, the next token read after `restore`ing it
    /// is the one that would be read next right now
    pub fn bookmark(&self) -> Bookmark {
        Bookmark {
            offset: self.byte_offset,
            position: self.position(),
        }
    }

    pub fn restore(&mut self, bookmark: Bookmark) -> Result<(), LexerError> {
        self.reader
            .seek(SeekFrom::Start(bookmark.offset))
            .map_err(LexerError::Seek)?;
        self.byte_offset = bookmark.offset;
        self.cur_line = bookmark.position.line;
        self.cur_col = bookmark.position.col;
        Ok(())
    }

    pub fn collect_results(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut v = vec![];
        while let Some(token) = self.next_token()? {
            v.push(token);
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::lexer::Operation;

    fn lex(source: &str) -> Lexer<Cursor<&[u8]>> {
        Lexer::new(Cursor::new(source.as_bytes())).unwrap()
    }

    fn symbols(source: &str) -> String {
        lex(source)
            .collect_results()
            .unwrap()
            .into_iter()
            .map(|token| token.kind.symbol())
            .collect()
    }

    #[test]
    fn recognises_every_instruction() {
        assert_eq!(symbols("<>+-,.2[]"), "<>+-,.2[]");
    }

    #[test]
    fn whitespace_is_ignored() {
        assert_eq!(symbols(" +\t-\r\n>\x0b<\x0c."), "+-><.");
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(symbols("+ add one [not a loop]\n-"), "+-");
        assert_eq!(symbols("+# trailing comment without newline"), "+");
        assert_eq!(symbols("3+\n+"), "+");
    }

    #[test]
    fn non_ascii_bytes_start_a_comment() {
        let source: &[u8] = b"+\xff+\n-";
        let tokens = Lexer::new(Cursor::new(source))
            .unwrap()
            .collect_results()
            .unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Instruction(Operation::Increment),
                TokenKind::Instruction(Operation::Decrement),
            ]
        );
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = lex("+\n  [ comment\n]").collect_results().unwrap();
        let positions: Vec<_> = tokens.iter().map(|t| t.position.to_string()).collect();
        assert_eq!(positions, vec!["1:1", "2:3", "3:1"]);
    }

    #[test]
    fn restore_rewinds_to_bookmark() {
        let mut lexer = lex("[+-]>");
        assert_eq!(lexer.next_token().unwrap().unwrap().kind, TokenKind::LoopStart);
        let mark = lexer.bookmark();

        assert_eq!(symbols_left(&mut lexer), "+-]>");
        lexer.restore(mark).unwrap();

        let token = lexer.next_token().unwrap().unwrap();
        assert_eq!(token.kind.symbol(), '+');
        assert_eq!(token.position, Position { line: 1, col: 2 });
    }

    fn symbols_left<R: BufRead + Seek>(lexer: &mut Lexer<R>) -> String {
        lexer
            .collect_results()
            .unwrap()
            .into_iter()
            .map(|token| token.kind.symbol())
            .collect()
    }

    struct Unseekable;

    impl Read for Unseekable {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl BufRead for Unseekable {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            Ok(&[])
        }

        fn consume(&mut self, _: usize) {}
    }

    impl Seek for Unseekable {
        fn seek(&mut self, _: SeekFrom) -> io::Result<u64> {
            Err(io::Error::new(ErrorKind::Unsupported, "not seekable"))
        }
    }

    #[test]
    fn unseekable_source_is_rejected() {
        assert!(matches!(Lexer::new(Unseekable), Err(LexerError::Seek(_))));
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    impl BufRead for Broken {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            Err(io::Error::other("disk on fire"))
        }

        fn consume(&mut self, _: usize) {}
    }

    impl Seek for Broken {
        fn seek(&mut self, _: SeekFrom) -> io::Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn read_errors_are_not_end_of_input() {
        let mut lexer = Lexer::new(Broken).unwrap();
        assert!(matches!(lexer.next_token(), Err(LexerError::Read(_))));
    }
}
