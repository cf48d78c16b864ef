//! Token classifications and the token record.
use std::fmt;
use std::ops::Range;

/// The classification of a lexed span.
///
/// Downstream styling keys off `as_str()`, so the names are fixed.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TokenKind {
    Comment,
    Preprocessor,
    Error,
    /// Opcode mnemonics and directives.
    Keyword,
    /// Flag, register or displacement operands.
    Operand,
    /// `(...)` and `[...]` references.
    Label,
    String,
    HexNumber,
    DecimalNumber,
    BinaryNumber,
    PlainText,
}

impl TokenKind {
    pub const ALL: [TokenKind; 11] = [
        TokenKind::Comment,
        TokenKind::Preprocessor,
        TokenKind::Error,
        TokenKind::Keyword,
        TokenKind::Operand,
        TokenKind::Label,
        TokenKind::String,
        TokenKind::HexNumber,
        TokenKind::DecimalNumber,
        TokenKind::BinaryNumber,
        TokenKind::PlainText,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Comment       => "Comment",
            TokenKind::Preprocessor  => "Comment.Preprocessor",
            TokenKind::Error         => "Error",
            TokenKind::Keyword       => "Keyword",
            TokenKind::Operand       => "Keyword.Operand",
            TokenKind::Label         => "Label",
            TokenKind::String        => "String",
            TokenKind::HexNumber     => "Number.Hex",
            TokenKind::DecimalNumber => "Number.Decimal",
            TokenKind::BinaryNumber  => "Number.Binary",
            TokenKind::PlainText     => "PlainText",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified span of the source. `text` borrows from the input and
/// always equals `&source[start..end]`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Token<'src> {
    pub kind:  TokenKind,
    pub start: usize,
    pub end:   usize,
    pub text:  &'src str,
}

impl<'src> Token<'src> {
    pub fn new(kind: TokenKind, start: usize, text: &'src str) -> Self {
        Token { kind, start, end: start + text.len(), text }
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}..{} {:?}", self.kind, self.start, self.end, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(TokenKind::HexNumber.as_str(), "Number.Hex");
        assert_eq!(TokenKind::DecimalNumber.as_str(), "Number.Decimal");
        assert_eq!(TokenKind::BinaryNumber.as_str(), "Number.Binary");
        assert_eq!(TokenKind::Operand.as_str(), "Keyword.Operand");
        assert_eq!(TokenKind::Preprocessor.to_string(), "Comment.Preprocessor");

        let mut names: Vec<&str> = TokenKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), TokenKind::ALL.len());
    }

    #[test]
    fn test_token_span() {
        let src = ".ORG 1A2B";
        let tok = Token::new(TokenKind::HexNumber, 5, &src[5..]);
        assert_eq!(tok.span(), 5..9);
        assert_eq!(tok.len(), 4);
        assert_eq!(&src[tok.span()], tok.text);
        assert!(!tok.is_empty());
        assert_eq!(tok.to_string(), "Number.Hex@5..9 \"1A2B\"");
    }
}
