//! Cursor over DSL source text.
//!
//! `Cursor` is a copyable (text, byte offset) pair. Scanning functions take it by
//! value and hand back whatever they read plus the advanced cursor, so grammar
//! rules can be tested one at a time and a failed lookahead simply drops the copy.

const QUOTES: [char; 3] = ['"', '`', '\''];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

pub fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

fn is_inline_space(c: char) -> bool {
    c.is_whitespace() && c != '\n'
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub fn pos(self) -> usize {
        self.pos
    }

    pub fn rest(self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn is_eof(self) -> bool {
        self.pos >= self.src.len()
    }

    pub fn peek(self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn starts_with(self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    /// Advance one character (no-op at end of input).
    pub fn bump(self) -> Self {
        match self.peek() {
            Some(c) => self.advance(c.len_utf8()),
            None => self,
        }
    }

    fn advance(self, bytes: usize) -> Self {
        Self {
            src: self.src,
            pos: (self.pos + bytes).min(self.src.len()),
        }
    }

    /// Consume `c` if it is next.
    pub fn eat(self, c: char) -> Option<Self> {
        (self.peek() == Some(c)).then(|| self.bump())
    }

    fn skip_while(self, pred: impl Fn(char) -> bool) -> Self {
        let len = self
            .rest()
            .find(|c: char| !pred(c))
            .unwrap_or(self.rest().len());
        self.advance(len)
    }

    pub fn skip_whitespace(self) -> Self {
        self.skip_while(char::is_whitespace)
    }

    /// Skip spaces and tabs without crossing a newline.
    pub fn skip_inline_whitespace(self) -> Self {
        self.skip_while(is_inline_space)
    }

    /// Skip through the end of the current line, newline included.
    pub fn skip_line(self) -> Self {
        let cur = self.skip_while(|c| c != '\n');
        cur.eat('\n').unwrap_or(cur)
    }

    /// Skip to (not past) the first char in `stops`.
    pub fn skip_until(self, stops: &[char]) -> Self {
        self.skip_while(|c| !stops.contains(&c))
    }

    /// Discard the rest of a line up to `\n` or `}`, consuming the newline.
    pub fn skip_rest_of_line(self) -> Self {
        let cur = self.skip_until(&['\n', '}']);
        cur.eat('\n').unwrap_or(cur)
    }

    /// Skip one `//` or `/* */` comment if the cursor is at one.
    pub fn skip_comment(self) -> Option<Self> {
        if self.starts_with("//") {
            Some(self.skip_line())
        } else if self.starts_with("/*") {
            let body = &self.rest()[2..];
            let len = body.find("*/").map(|i| i + 4).unwrap_or(self.rest().len());
            Some(self.advance(len))
        } else {
            None
        }
    }

    /// Run of ASCII letters at the cursor, or `""` when the run continues into
    /// identifier characters (`table_id` is not the `table` keyword).
    pub fn keyword(self) -> &'a str {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        match rest[len..].chars().next() {
            Some(c) if is_ident_char(c) => "",
            _ => &rest[..len],
        }
    }

    pub fn skip_keyword(self) -> Self {
        self.skip_while(|c| c.is_ascii_alphabetic())
    }

    /// Quoted identifier read raw up to the matching quote, or a run of
    /// alphanumerics, `_` and `.`. Empty when neither is present.
    ///
    /// Unquoted runs accept any Unicode alphanumeric, not only `[A-Za-z0-9]`,
    /// so `ユーザー` needs no quotes.
    pub fn identifier(self) -> (&'a str, Self) {
        match self.peek() {
            Some(q) if QUOTES.contains(&q) => self.bump().quoted(q),
            _ => {
                let end = self.skip_while(is_ident_char);
                (&self.src[self.pos..end.pos], end)
            }
        }
    }

    /// Content up to the closing `quote` (cursor just past the opening one).
    fn quoted(self, quote: char) -> (&'a str, Self) {
        let end = self.skip_while(|c| c != quote);
        (&self.src[self.pos..end.pos], end.bump())
    }

    /// Attribute or note value: quoted content verbatim, or unquoted text up to
    /// `,` `]` `\n` `}` with surrounding whitespace trimmed.
    pub fn value(self) -> (&'a str, Self) {
        if self.starts_with("'''") {
            let body = self.advance(3);
            return match body.rest().find("'''") {
                Some(len) => (&body.rest()[..len], body.advance(len + 3)),
                None => (body.rest(), body.advance(body.rest().len())),
            };
        }
        match self.peek() {
            Some(q) if QUOTES.contains(&q) => self.bump().quoted(q),
            _ => {
                let end = self.skip_until(&[',', ']', '\n', '}']);
                (self.src[self.pos..end.pos].trim(), end)
            }
        }
    }

    /// Balanced `open ... close` group including the delimiters. Quoted text
    /// inside is skipped whole. Runs to end of input when unbalanced.
    pub fn group(self, open: char, close: char) -> (&'a str, Self) {
        let mut cur = self;
        let mut depth = 0usize;
        while let Some(c) = cur.peek() {
            if QUOTES.contains(&c) && c != open && c != close {
                cur = cur.bump().quoted(c).1;
                continue;
            }
            cur = cur.bump();
            if c == open {
                depth += 1;
            } else if c == close {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
        }
        (&self.src[self.pos..cur.pos], cur)
    }

    /// Step past one unrecognized token: a quoted string, a word, or one char.
    pub fn resync(self) -> Self {
        match self.peek() {
            Some(q) if QUOTES.contains(&q) => self.bump().quoted(q).1,
            Some(c) if is_ident_char(c) => self.skip_while(is_ident_char),
            _ => self.bump(),
        }
    }
}
