//! The driver walks the source with a private state stack and yields
//! tokens lazily.
use std::collections::VecDeque;
use std::sync::OnceLock;

use super::rules::{LexError, RuleTable, State, Transition};
use super::token::Token;

static SHARED: OnceLock<Result<Lexer, LexError>> = OnceLock::new();

/// An MCODE lexer. It holds only the compiled state table and is never
/// mutated after construction, so one instance serves any number of
/// concurrent `tokenize` calls.
pub struct Lexer {
    table: RuleTable,
}

impl Lexer {
    pub fn new() -> Result<Self, LexError> {
        Ok(Lexer { table: RuleTable::build()? })
    }

    /// The process-wide lexer, built on first use.
    pub fn shared() -> Result<&'static Lexer, LexError> {
        SHARED.get_or_init(Lexer::new).as_ref().map_err(Clone::clone)
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Lazily tokenizes `source`. Calling this again on the same text
    /// yields the same sequence.
    pub fn tokenize<'l, 'src>(&'l self, source: &'src str) -> Tokens<'l, 'src> {
        Tokens::new(&self.table, source)
    }

    pub fn tokenize_all<'src>(&self, source: &'src str) -> Result<Vec<Token<'src>>, LexError> {
        self.tokenize(source).collect()
    }
}

/// Iterator over the tokens of one source text.
///
/// The concatenated text of the yielded tokens is the source itself.
#[derive(Clone)]
pub struct Tokens<'l, 'src> {
    table:   &'l RuleTable,
    source:  &'src str,
    pos:     usize,
    stack:   Vec<State>,
    pending: VecDeque<Token<'src>>,
    failed:  bool,
}

impl<'l, 'src> Tokens<'l, 'src> {
    fn new(table: &'l RuleTable, source: &'src str) -> Self {
        Tokens {
            table,
            source,
            pos: 0,
            stack: vec![State::Root],
            pending: VecDeque::with_capacity(2),
            failed: false,
        }
    }

    /// The state the next rule will be chosen from.
    pub fn state(&self) -> State {
        self.stack.last().copied().unwrap_or(State::Root)
    }

    /// Byte offset of the cursor. Tokens already matched but not yet
    /// yielded lie before it.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Applies the first matching rule of the current state.
    fn step(&mut self) -> Result<(), LexError> {
        let state = self.state();
        let table = self.table;
        for rule in table.rules(state) {
            if let Some(len) = rule.apply(self.source, self.pos, &mut self.pending) {
                self.pos += len;
                self.transition(rule.transition);
                return Ok(());
            }
        }
        Err(LexError::NoMatch { state, offset: self.pos })
    }

    fn transition(&mut self, transition: Transition) {
        match transition {
            Transition::Stay => {},
            Transition::Push(state) => {
                trace!("push {} at offset {}", state, self.pos);
                self.stack.push(state);
            },
            // Root is never popped.
            Transition::Pop => if self.stack.len() > 1 {
                let state = self.stack.pop();
                trace!("pop {} at offset {}", state.unwrap_or(State::Root), self.pos);
            },
        }
    }
}

impl<'l, 'src> Iterator for Tokens<'l, 'src> {
    type Item = Result<Token<'src>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tok) = self.pending.pop_front() {
                return Some(Ok(tok));
            }
            if self.failed || self.pos >= self.source.len() {
                return None;
            }
            if let Err(err) = self.step() {
                self.failed = true;
                return Some(Err(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::rules::definition;
    use crate::lexer::token::TokenKind::{self, *};

    fn lex(src: &str) -> Vec<(TokenKind, &str)> {
        Lexer::shared().unwrap()
            .tokenize_all(src).unwrap()
            .into_iter()
            .map(|tok| (tok.kind, tok.text))
            .collect()
    }

    /// Tokens with the plain-text filler between them dropped.
    fn significant(src: &str) -> Vec<(TokenKind, &str)> {
        lex(src).into_iter().filter(|(kind, _)| *kind != PlainText).collect()
    }

    fn assert_partition(src: &str) {
        let toks = Lexer::shared().unwrap().tokenize_all(src).unwrap();
        let mut offset = 0;
        for tok in &toks {
            assert_eq!(tok.start, offset, "gap or overlap before {}", tok);
            assert!(tok.end > tok.start);
            assert_eq!(&src[tok.span()], tok.text);
            offset = tok.end;
        }
        assert_eq!(offset, src.len());
        let joined: std::string::String = toks.iter().map(|tok| tok.text).collect();
        assert_eq!(joined, src);
    }

    const LISTING: &str = "\
* Sample ROM
.TITLE \"TIMER\"  ; page title
.HP
.ORG 8000
.BSS 12
.EQU [TIMER] 8C00
*** ERROR 21: undefined label
#0A3
8000 04A1B3 ; raw listing words
[START] NOP
        LDI 02C ; literal
        CON 3FF
        LC 05
        C=REGN 14(d)/M
        A=A+1 ALL
        ?C#0 PT
        JNC +12
        GOC -7
        GOSUB (LOOP)
        ?NCXQ 2D1A
        PT= 13
        S10=1
        RTN\r\n";

    #[test]
    fn test_priority_ordering() {
        assert_eq!(lex("S10="), vec![(Keyword, "S10=")]);
        assert_eq!(lex("S1=1"), vec![(Keyword, "S1="), (PlainText, "1")]);
        assert_eq!(lex("A=B=C=0"), vec![(Keyword, "A=B=C=0")]);
        assert_eq!(lex("?NCGOREL"), vec![(Keyword, "?NCGOREL")]);
    }

    #[test]
    fn test_family_order() {
        // The register family is tried before the literal loads.
        assert_eq!(lex("LC3 0"), vec![(Keyword, "LC"), (Operand, "3"), (PlainText, " "), (Operand, "0")]);
        assert_eq!(significant("LDIS&X 2C0"), vec![(Keyword, "LDIS&X"), (HexNumber, "2C0")]);
        assert_eq!(significant("PT=A"), vec![(Keyword, "PT=A")]);
        assert_eq!(significant("PT= 9"), vec![(Keyword, "PT="), (DecimalNumber, "9")]);
    }

    #[test]
    fn test_mode_line_scoping() {
        assert_eq!(lex("LC 05\n* not a mode"), vec![
            (Keyword, "LC"),
            (PlainText, " "),
            (Operand, "05"),
            (Comment, "\n"),
            (Preprocessor, "* not a mode"),
        ]);

        // A bare number after the line end is not a register operand.
        assert_eq!(lex("LC\n05"), vec![(Keyword, "LC"), (Comment, "\n"), (PlainText, "0"), (PlainText, "5")]);
    }

    #[test]
    fn test_line_terminators() {
        assert_eq!(lex("RTN\r\nNOP"), vec![
            (Keyword, "RTN"),
            (Comment, "\r"),
            (PlainText, "\n"),
            (Keyword, "NOP"),
        ]);
        assert_eq!(lex("\n\r"), vec![(PlainText, "\n"), (PlainText, "\r")]);
    }

    #[test]
    fn test_disassembly_pair() {
        assert_eq!(lex("1A2B 040102"), vec![(HexNumber, "1A2B "), (BinaryNumber, "040102")]);
        assert_eq!(lex("1A2B\t3FF"), vec![(HexNumber, "1A2B\t"), (BinaryNumber, "3FF")]);
        // At most three code words are taken.
        assert_eq!(significant("0000 000111222333"), vec![(HexNumber, "0000 "), (BinaryNumber, "000111222")]);
        // A code word starts with 0-3.
        assert_eq!(lex("1A2B 4"), vec![
            (PlainText, "1"), (PlainText, "A"), (PlainText, "2"), (PlainText, "B"),
            (PlainText, " "), (PlainText, "4"),
        ]);
    }

    #[test]
    fn test_directive_operands() {
        assert_eq!(lex(".ORG 1A2B"), vec![(Keyword, ".ORG"), (PlainText, " "), (HexNumber, "1A2B")]);
        assert_eq!(lex(".BSS 12"), vec![(Keyword, ".BSS"), (PlainText, " "), (DecimalNumber, "12")]);
        assert_eq!(significant(".NAME \"CLOCK\" ; x"), vec![(Keyword, ".NAME"), (String, "\"CLOCK\""), (Comment, "; x")]);
        assert_eq!(significant(".EQU (LOOP) 0A12"), vec![(Keyword, ".EQU"), (Label, "(LOOP)"), (HexNumber, "0A12")]);
        assert_eq!(significant(".ZENCODE 1234"), vec![(Keyword, ".ZENCODE")]);
        assert_eq!(significant("#3FF"), vec![(Keyword, "#"), (BinaryNumber, "3FF")]);
    }

    #[test]
    fn test_malformed_operand_is_plain_text() {
        assert_eq!(lex(".FILLTO 1A2"), vec![
            (Keyword, ".FILLTO"), (PlainText, " "),
            (PlainText, "1"), (PlainText, "A"), (PlainText, "2"),
        ]);
        assert_eq!(significant(".ORG 1A2G"), vec![(Keyword, ".ORG")]);
        // A longer hex run still yields its last four digits at the word boundary.
        assert_eq!(significant(".ORG 1A2B3"), vec![(Keyword, ".ORG"), (HexNumber, "A2B3")]);
        assert_eq!(significant("#4FF"), vec![(Keyword, "#")]);
    }

    #[test]
    fn test_class2_operands() {
        assert_eq!(significant("A=0 ALL"), vec![(Keyword, "A=0"), (Operand, "ALL")]);
        assert_eq!(significant("C=C+1 WPT"), vec![(Keyword, "C=C+1"), (Operand, "WPT")]);
        assert_eq!(significant("ASL XS"), vec![(Keyword, "ASL"), (Operand, "XS")]);
        assert_eq!(significant("CSR S&X"), vec![(Keyword, "CSR"), (Operand, "S&X")]);
        assert_eq!(significant("?A<C @R"), vec![(Keyword, "?A<C"), (Operand, "@R")]);
        // A single P is tried first, so P-Q splits.
        assert_eq!(significant("B=0 P-Q"), vec![(Keyword, "B=0"), (Operand, "P"), (Operand, "Q")]);
    }

    #[test]
    fn test_class3_operands() {
        assert_eq!(significant("JNC +63"), vec![(Keyword, "JNC"), (Operand, "+63")]);
        assert_eq!(significant("JC -64"), vec![(Keyword, "JC"), (Operand, "-64")]);
        assert_eq!(significant("GONC +0"), vec![(Keyword, "GONC"), (Operand, "+0")]);
        assert_eq!(significant("GOC 1A2F"), vec![(Keyword, "GOC"), (HexNumber, "1A2F")]);
        assert_eq!(significant("GOTO [END]"), vec![(Keyword, "GOTO"), (Label, "[END]")]);
        // Out of range displacements only match a prefix.
        assert_eq!(lex("JC +64"), vec![(Keyword, "JC"), (PlainText, " "), (Operand, "+6"), (PlainText, "4")]);
        assert_eq!(lex("JC -65"), vec![(Keyword, "JC"), (PlainText, " "), (Operand, "-6"), (PlainText, "5")]);
        assert_eq!(significant("JC -0"), vec![(Keyword, "JC")]);
    }

    #[test]
    fn test_other_operands() {
        assert_eq!(significant("GOSUB 0A1B"), vec![(Keyword, "GOSUB"), (HexNumber, "0A1B")]);
        assert_eq!(significant("?NCXQ (SUB1)"), vec![(Keyword, "?NCXQ"), (Label, "(SUB1)")]);
        assert_eq!(significant("ST=1? 7"), vec![(Keyword, "ST=1?"), (DecimalNumber, "7")]);
        assert_eq!(significant("C=REGN 14(d)/M"), vec![(Keyword, "C=REGN"), (Operand, "14(d)/M")]);
        assert_eq!(significant("READ F"), vec![(Keyword, "READ"), (Operand, "F")]);
        assert_eq!(significant("CON 2FF"), vec![(Keyword, "CON"), (BinaryNumber, "2FF")]);
        assert_eq!(significant("CON [MSG]"), vec![(Keyword, "CON"), (Label, "[MSG]")]);
        assert_eq!(significant("LDI 0FAB"), vec![(Keyword, "LDI"), (HexNumber, "0FAB")]);
    }

    #[test]
    fn test_comments() {
        assert_eq!(lex("; all comment ; LC 5"), vec![(Comment, "; all comment ; LC 5")]);
        assert_eq!(significant("NOP ; GOTO 1234"), vec![(Keyword, "NOP"), (Comment, "; GOTO 1234")]);
        assert_eq!(lex("*** ERROR 3"), vec![(Error, "*** ERROR 3")]);
        assert_eq!(lex("** ERROR"), vec![(Preprocessor, "** ERROR")]);
    }

    #[test]
    fn test_labels() {
        assert_eq!(lex("(LOOP1)"), vec![(Label, "(LOOP1)")]);
        assert_eq!(lex("[MAIN]"), vec![(Label, "[MAIN]")]);
        assert_eq!(lex("()"), vec![(PlainText, "("), (PlainText, ")")]);
        assert_eq!(lex("(A\n)"), vec![(PlainText, "("), (PlainText, "A"), (PlainText, "\n"), (PlainText, ")")]);
    }

    #[test]
    fn test_catch_all() {
        let src = "\u{1}\u{2}\u{7f}";
        assert_eq!(lex(src), vec![(PlainText, "\u{1}"), (PlainText, "\u{2}"), (PlainText, "\u{7f}")]);
        assert_eq!(lex("ünö"), vec![(PlainText, "ü"), (PlainText, "n"), (PlainText, "ö")]);
        assert!(lex("").is_empty());
    }

    #[test]
    fn test_listing_partition() {
        assert_partition(LISTING);
        assert_partition("GOTO (UNCLOSED\n.TEXT \"open\n\r\r\n\t");
        assert_partition("\u{0}é😀 .ORG\r");
    }

    #[test]
    fn test_listing_tokens() {
        let toks = significant(LISTING);
        assert!(toks.contains(&(Preprocessor, "* Sample ROM")));
        assert!(toks.contains(&(String, "\"TIMER\"")));
        assert!(toks.contains(&(Label, "[TIMER]")));
        assert!(toks.contains(&(HexNumber, "8C00")));
        assert!(toks.contains(&(Error, "*** ERROR 21: undefined label")));
        assert!(toks.contains(&(BinaryNumber, "0A3")));
        assert!(toks.contains(&(HexNumber, "8000 ")));
        assert!(toks.contains(&(BinaryNumber, "04A1B3")));
        assert!(toks.contains(&(Label, "[START]")));
        assert!(toks.contains(&(HexNumber, "02C")));
        assert!(toks.contains(&(BinaryNumber, "3FF")));
        assert!(toks.contains(&(Operand, "14(d)/M")));
        assert!(toks.contains(&(Operand, "+12")));
        assert!(toks.contains(&(Operand, "-7")));
        assert!(toks.contains(&(Label, "(LOOP)")));
        assert!(toks.contains(&(HexNumber, "2D1A")));
        assert!(toks.contains(&(DecimalNumber, "13")));
        assert!(toks.contains(&(Keyword, "S10=")));
    }

    #[test]
    fn test_deterministic() {
        let lexer = Lexer::shared().unwrap();
        let first = lexer.tokenize_all(LISTING).unwrap();
        let second = lexer.tokenize_all(LISTING).unwrap();
        assert_eq!(first, second);

        let fresh = Lexer::new().unwrap();
        assert_eq!(fresh.tokenize_all(LISTING).unwrap(), first);
        assert_eq!(crate::tokenize(LISTING).unwrap(), first);
    }

    #[test]
    fn test_linear_bound() {
        let toks = Lexer::shared().unwrap().tokenize_all(LISTING).unwrap();
        assert!(toks.len() <= LISTING.len());
    }

    #[test]
    fn test_lazy_iteration() {
        let lexer = Lexer::shared().unwrap();
        let mut toks = lexer.tokenize(".ORG 1A2B\nNOP");
        assert_eq!(toks.state(), State::Root);
        assert_eq!(toks.next().unwrap().unwrap().text, ".ORG");
        assert_eq!(toks.state(), State::AddressDirective);
        assert_eq!(toks.offset(), 4);

        let rest = toks.clone();
        let tail: Vec<_> = toks.map(|tok| tok.unwrap().text).collect();
        assert_eq!(tail, vec![" ", "1A2B", "\n", "NOP"]);
        assert_eq!(rest.count(), 4);
    }

    #[test]
    fn test_concurrent_callers() {
        let lexer = Lexer::shared().unwrap();
        let expected = lexer.tokenize_all(LISTING).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| crate::tokenize(LISTING).unwrap().len()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected.len());
        }
    }

    #[test]
    fn test_no_match() {
        // A root state without its catch-all stops at the first stray character.
        let table = RuleTable::compile(|state| {
            let mut defs = definition(state);
            if state == State::Root {
                defs.truncate(1);
            }
            defs
        }).unwrap();
        let mut toks = Tokens::new(&table, "; note\nx");
        assert_eq!(toks.next().unwrap().unwrap().text, "; note");
        match toks.next() {
            Some(Err(LexError::NoMatch { state, offset })) => {
                assert_eq!(state, State::Root);
                assert_eq!(offset, 6);
            },
            _ => panic!("expected a match failure"),
        }
        assert!(toks.next().is_none());
    }
}
