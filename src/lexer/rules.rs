//! The state table: lexer states, their ordered rules, and the checks
//! run once the table is compiled.
//!
//! Rules are declared as plain data (`RuleDef`) and compiled into
//! `Rule`s when a `RuleTable` is built. Within a state the first rule
//! that matches wins, regardless of match length.
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::fmt::Write;

use regex::Regex;

use super::mnemonics::{self, MnemonicSet};
use super::token::{Token, TokenKind};

#[derive(Clone, Debug, thiserror::Error)]
pub enum LexError {
    #[error("invalid pattern `{pattern}` in state {state}: {source}")]
    Pattern {
        state:   State,
        pattern: &'static str,
        source:  regex::Error,
    },
    #[error("state {0} does not end with a catch-all rule")]
    MissingCatchAll(State),
    #[error("state {0} does not start with a line terminator pop rule")]
    MissingLinePop(State),
    #[error("state {0} is not reachable from root")]
    Unreachable(State),
    #[error("no rule of state {state} matches at offset {offset}")]
    NoMatch { state: State, offset: usize },
}

/// Lexer states. Every state but `Root` is an operand mode scoped to
/// the rest of the current line.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum State {
    Root,
    SimpleDirective,
    StringDirective,
    NumberDirective,
    AddressDirective,
    SymbolDirective,
    CodeLiteral,
    InstructionNone,
    InstructionNumber,
    InstructionAddress,
    InstructionRegister,
    InstructionClass2,
    InstructionClass3,
    InstructionSpecial1,
    InstructionSpecial2,
}

impl State {
    /// In discriminant order; `RuleTable` indexes by position in this list.
    pub const ALL: [State; 15] = [
        State::Root,
        State::SimpleDirective,
        State::StringDirective,
        State::NumberDirective,
        State::AddressDirective,
        State::SymbolDirective,
        State::CodeLiteral,
        State::InstructionNone,
        State::InstructionNumber,
        State::InstructionAddress,
        State::InstructionRegister,
        State::InstructionClass2,
        State::InstructionClass3,
        State::InstructionSpecial1,
        State::InstructionSpecial2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            State::Root                => "root",
            State::SimpleDirective     => "simple_directive",
            State::StringDirective     => "string_directive",
            State::NumberDirective     => "number_directive",
            State::AddressDirective    => "address_directive",
            State::SymbolDirective     => "symbol_directive",
            State::CodeLiteral         => "code_literal",
            State::InstructionNone     => "instruction_none",
            State::InstructionNumber   => "instruction_number",
            State::InstructionAddress  => "instruction_address",
            State::InstructionRegister => "instruction_register",
            State::InstructionClass2   => "instruction_class2",
            State::InstructionClass3   => "instruction_class3",
            State::InstructionSpecial1 => "instruction_special1",
            State::InstructionSpecial2 => "instruction_special2",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Transition {
    Stay,
    Push(State),
    Pop,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Transition::Stay        => Ok(()),
            Transition::Push(state) => write!(f, "push {}", state),
            Transition::Pop         => f.write_str("pop"),
        }
    }
}

/// How a match is turned into tokens.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Emit {
    /// The whole match becomes one token.
    Whole(TokenKind),
    /// One token per capture group, in group order. Groups that did not
    /// participate emit nothing; uncaptured text becomes PlainText.
    Groups(&'static [TokenKind]),
}

impl fmt::Display for Emit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Emit::Whole(kind) => write!(f, "{}", kind),
            Emit::Groups(kinds) => {
                let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
                write!(f, "({})", names.join(", "))
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum Source {
    Regex(&'static str),
    Words(&'static [&'static str]),
    AnyChar,
}

/// Declarative form of a rule, compiled by `RuleTable`.
#[derive(Copy, Clone, Debug)]
pub(crate) struct RuleDef {
    source:     Source,
    emit:       Emit,
    transition: Transition,
}

impl RuleDef {
    const fn re(pattern: &'static str, emit: Emit) -> Self {
        RuleDef { source: Source::Regex(pattern), emit, transition: Transition::Stay }
    }

    const fn words(words: &'static [&'static str], emit: Emit) -> Self {
        RuleDef { source: Source::Words(words), emit, transition: Transition::Stay }
    }

    const fn any(kind: TokenKind) -> Self {
        RuleDef { source: Source::AnyChar, emit: Emit::Whole(kind), transition: Transition::Stay }
    }

    const fn push(self, state: State) -> Self {
        RuleDef { transition: Transition::Push(state), ..self }
    }

    const fn pop(self) -> Self {
        RuleDef { transition: Transition::Pop, ..self }
    }
}

const LINE_END:      &str = r"\n|\r|\r\n";
const COMMENT:       &str = r";.*";
const PAREN_LABEL:   &str = r"\([^)\n\r]+\)";
const BRACKET_LABEL: &str = r"\[[^\]\n\r]+\]";
const ADDRESS:       &str = r"[0-9A-F]{4}\b";
const CODE:          &str = r"[0-3][0-9A-F]{2}\b";
const DECIMAL:       &str = r"\d+\b";

const KEYWORD: Emit = Emit::Whole(TokenKind::Keyword);

const ROOT: &[RuleDef] = &[
    RuleDef::re(COMMENT, Emit::Whole(TokenKind::Comment)),
    RuleDef::re(r"(\*\*\* ERROR.*)|(\*.*)", Emit::Groups(&[TokenKind::Error, TokenKind::Preprocessor])),
    // Listing lines: an address followed by up to three code words.
    RuleDef::re(r"([0-9A-F]{4}\s+)((?:[0-3][0-9A-F]{2}){1,3})", Emit::Groups(&[TokenKind::HexNumber, TokenKind::BinaryNumber])),
    RuleDef::words(mnemonics::SIMPLE_DIRECTIVES, KEYWORD).push(State::SimpleDirective),
    RuleDef::words(mnemonics::STRING_DIRECTIVES, KEYWORD).push(State::StringDirective),
    RuleDef::words(mnemonics::NUMBER_DIRECTIVES, KEYWORD).push(State::NumberDirective),
    RuleDef::words(mnemonics::ADDRESS_DIRECTIVES, KEYWORD).push(State::AddressDirective),
    RuleDef::words(mnemonics::SYMBOL_DIRECTIVES, KEYWORD).push(State::SymbolDirective),
    RuleDef::re(r"#", KEYWORD).push(State::CodeLiteral),
    RuleDef::words(mnemonics::NONE, KEYWORD).push(State::InstructionNone),
    RuleDef::words(mnemonics::NUMBER, KEYWORD).push(State::InstructionNumber),
    RuleDef::words(mnemonics::ADDRESS, KEYWORD).push(State::InstructionAddress),
    RuleDef::words(mnemonics::REGISTER, KEYWORD).push(State::InstructionRegister),
    RuleDef::words(mnemonics::CLASS2, KEYWORD).push(State::InstructionClass2),
    RuleDef::words(mnemonics::CLASS3, KEYWORD).push(State::InstructionClass3),
    RuleDef::words(mnemonics::SPECIAL1, KEYWORD).push(State::InstructionSpecial1),
    RuleDef::words(mnemonics::SPECIAL2, KEYWORD).push(State::InstructionSpecial2),
    RuleDef::re(PAREN_LABEL, Emit::Whole(TokenKind::Label)),
    RuleDef::re(BRACKET_LABEL, Emit::Whole(TokenKind::Label)),
    RuleDef::re(LINE_END, Emit::Whole(TokenKind::PlainText)),
    RuleDef::any(TokenKind::PlainText),
];

const ADDRESS_OPERAND: RuleDef = RuleDef::re(ADDRESS, Emit::Whole(TokenKind::HexNumber));
const CODE_OPERAND: RuleDef = RuleDef::re(CODE, Emit::Whole(TokenKind::BinaryNumber));
const DECIMAL_OPERAND: RuleDef = RuleDef::re(DECIMAL, Emit::Whole(TokenKind::DecimalNumber));
const PAREN_OPERAND: RuleDef = RuleDef::re(PAREN_LABEL, Emit::Whole(TokenKind::Label));
const BRACKET_OPERAND: RuleDef = RuleDef::re(BRACKET_LABEL, Emit::Whole(TokenKind::Label));

const STRING_OPERANDS: &[RuleDef] = &[
    RuleDef::re(r#""[^"\n\r]*""#, Emit::Whole(TokenKind::String)),
];
const DECIMAL_OPERANDS: &[RuleDef] = &[DECIMAL_OPERAND];
const ADDRESS_OPERANDS: &[RuleDef] = &[ADDRESS_OPERAND];
const SYMBOL_OPERANDS: &[RuleDef] = &[PAREN_OPERAND, BRACKET_OPERAND, ADDRESS_OPERAND];
const CODE_OPERANDS: &[RuleDef] = &[CODE_OPERAND];
const TARGET_OPERANDS: &[RuleDef] = &[ADDRESS_OPERAND, PAREN_OPERAND, BRACKET_OPERAND];
const REGISTER_OPERANDS: &[RuleDef] = &[
    RuleDef::re(
        r"(?:\d{1,2}|[0-9A-F])(?:\([TZYXLMNOPQabcde]\))?(?:/[TZYXLMNOPQabcde])?",
        Emit::Whole(TokenKind::Operand),
    ),
];
const FIELD_OPERANDS: &[RuleDef] = &[
    RuleDef::re(r"[P\[QT]|XS?|W(?:PT)?|MS?|S(?:&X)?|ALL|@R|R<|P-Q", Emit::Whole(TokenKind::Operand)),
];
const DISPLACEMENT_OPERANDS: &[RuleDef] = &[
    RuleDef::re(r"\+(?:[1-5]\d|6[0-3]|\d)", Emit::Whole(TokenKind::Operand)),
    RuleDef::re(r"-(?:[1-5]\d|6[0-4]|[1-9])", Emit::Whole(TokenKind::Operand)),
    PAREN_OPERAND,
    BRACKET_OPERAND,
    ADDRESS_OPERAND,
];
const LITERAL_OPERANDS: &[RuleDef] = &[
    RuleDef::re(r"[0-9A-F]+\b", Emit::Whole(TokenKind::HexNumber)),
];
const CONSTANT_OPERANDS: &[RuleDef] = &[CODE_OPERAND, PAREN_OPERAND, BRACKET_OPERAND];

/// The operand rules of a mode, tried between the line terminator pop
/// and the inline comment.
fn operands(state: State) -> &'static [RuleDef] {
    match state {
        State::Root | State::SimpleDirective | State::InstructionNone => &[],
        State::StringDirective => STRING_OPERANDS,
        State::NumberDirective | State::InstructionNumber => DECIMAL_OPERANDS,
        State::AddressDirective => ADDRESS_OPERANDS,
        State::SymbolDirective => SYMBOL_OPERANDS,
        State::CodeLiteral => CODE_OPERANDS,
        State::InstructionAddress => TARGET_OPERANDS,
        State::InstructionRegister => REGISTER_OPERANDS,
        State::InstructionClass2 => FIELD_OPERANDS,
        State::InstructionClass3 => DISPLACEMENT_OPERANDS,
        State::InstructionSpecial1 => LITERAL_OPERANDS,
        State::InstructionSpecial2 => CONSTANT_OPERANDS,
    }
}

/// The full rule list of a state. Modes share one template: pop on a
/// line terminator, the operand rules, the inline comment, catch-all.
pub(crate) fn definition(state: State) -> Vec<RuleDef> {
    if state == State::Root {
        return ROOT.to_vec();
    }
    let mut defs = Vec::with_capacity(operands(state).len() + 3);
    defs.push(RuleDef::re(LINE_END, Emit::Whole(TokenKind::Comment)).pop());
    defs.extend_from_slice(operands(state));
    defs.push(RuleDef::re(COMMENT, Emit::Whole(TokenKind::Comment)));
    defs.push(RuleDef::any(TokenKind::PlainText));
    defs
}

pub enum Pattern {
    /// Anchored at the cursor; `source` is the pattern as written.
    Regex { regex: Regex, source: &'static str },
    Words(MnemonicSet),
    /// Exactly one character, unconditionally.
    AnyChar,
}

impl Pattern {
    /// Length in bytes of a non-empty match at the start of `rest`.
    pub fn match_len(&self, rest: &str) -> Option<usize> {
        match self {
            Pattern::Regex { regex, .. } => regex.find(rest).map(|m| m.end()).filter(|&len| len > 0),
            Pattern::Words(set) => set.match_at(rest),
            Pattern::AnyChar => rest.chars().next().map(char::len_utf8),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Pattern::Regex { source, .. } => write!(f, "/{}/", source),
            Pattern::Words(set) => write!(f, "{} words", set.len()),
            Pattern::AnyChar => f.write_str("any char"),
        }
    }
}

pub struct Rule {
    pub pattern:    Pattern,
    pub emit:       Emit,
    pub transition: Transition,
}

impl Rule {
    fn compile(state: State, def: RuleDef) -> Result<Rule, LexError> {
        let pattern = match def.source {
            Source::Regex(source) => {
                let regex = Regex::new(&format!("^(?:{})", source))
                    .map_err(|err| LexError::Pattern { state, pattern: source, source: err })?;
                Pattern::Regex { regex, source }
            },
            Source::Words(words) => Pattern::Words(MnemonicSet::new(words)),
            Source::AnyChar => Pattern::AnyChar,
        };
        Ok(Rule { pattern, emit: def.emit, transition: def.transition })
    }

    /// Tries the rule at byte offset `pos` of `source`. On a match, queues
    /// the tokens it produces and returns the number of bytes consumed.
    pub fn apply<'src>(&self, source: &'src str, pos: usize, out: &mut VecDeque<Token<'src>>) -> Option<usize> {
        let rest = &source[pos..];
        match (&self.pattern, self.emit) {
            (Pattern::Regex { regex, .. }, Emit::Groups(kinds)) => {
                let caps = regex.captures(rest)?;
                let end = caps.get(0)?.end();
                if end == 0 {
                    return None;
                }
                let mut cursor = 0;
                for (i, &kind) in kinds.iter().enumerate() {
                    let group = match caps.get(i + 1) {
                        Some(group) if group.start() >= cursor && !group.as_str().is_empty() => group,
                        _ => continue,
                    };
                    if group.start() > cursor {
                        out.push_back(Token::new(TokenKind::PlainText, pos + cursor, &rest[cursor..group.start()]));
                    }
                    out.push_back(Token::new(kind, pos + group.start(), group.as_str()));
                    cursor = group.end();
                }
                if cursor < end {
                    out.push_back(Token::new(TokenKind::PlainText, pos + cursor, &rest[cursor..end]));
                }
                Some(end)
            },
            (pattern, emit) => {
                let len = pattern.match_len(rest)?;
                let kind = match emit {
                    Emit::Whole(kind) => kind,
                    Emit::Groups(kinds) => kinds.first().copied().unwrap_or(TokenKind::PlainText),
                };
                out.push_back(Token::new(kind, pos, &rest[..len]));
                Some(len)
            },
        }
    }
}

/// The compiled, immutable state table.
pub struct RuleTable {
    states: Vec<Vec<Rule>>,
}

impl RuleTable {
    pub fn build() -> Result<RuleTable, LexError> {
        let table = RuleTable::compile(definition)?;
        table.check()?;
        debug!("compiled {} lexer states with {} rules", table.states.len(), table.rule_count());
        Ok(table)
    }

    /// Compiles without running `check`.
    pub(crate) fn compile<F>(definitions: F) -> Result<RuleTable, LexError>
    where F: Fn(State) -> Vec<RuleDef>
    {
        let mut states = Vec::with_capacity(State::ALL.len());
        for &state in State::ALL.iter() {
            let rules = definitions(state)
                .into_iter()
                .map(|def| Rule::compile(state, def))
                .collect::<Result<Vec<Rule>, LexError>>()?;
            states.push(rules);
        }
        Ok(RuleTable { states })
    }

    /// Every state must end in a catch-all so some rule always matches,
    /// every mode must pop on a line terminator before anything else,
    /// and every mode must be reachable from root.
    fn check(&self) -> Result<(), LexError> {
        for &state in State::ALL.iter() {
            let rules = self.rules(state);
            match rules.last() {
                Some(Rule { pattern: Pattern::AnyChar, .. }) => {},
                _ => return Err(LexError::MissingCatchAll(state)),
            }
            if state != State::Root {
                let pops_on_line_end = rules.first().map_or(false, |rule| {
                    rule.transition == Transition::Pop
                        && ["\n", "\r", "\r\n"].iter().all(|eol| rule.pattern.match_len(eol).is_some())
                });
                if !pops_on_line_end {
                    return Err(LexError::MissingLinePop(state));
                }
            }
        }

        let mut reached = HashSet::new();
        let mut queue = VecDeque::new();
        reached.insert(State::Root);
        queue.push_back(State::Root);
        while let Some(state) = queue.pop_front() {
            for rule in self.rules(state) {
                if let Transition::Push(next) = rule.transition {
                    if reached.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        match State::ALL.iter().find(|state| !reached.contains(*state)) {
            Some(&state) => Err(LexError::Unreachable(state)),
            None => Ok(()),
        }
    }

    pub fn rules(&self, state: State) -> &[Rule] {
        &self.states[state.index()]
    }

    pub fn rule_count(&self) -> usize {
        self.states.iter().map(Vec::len).sum()
    }

    /// A readable listing of every state and its rules in priority order.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for &state in State::ALL.iter() {
            let _ = writeln!(out, "{}", state);
            for (i, rule) in self.rules(state).iter().enumerate() {
                let _ = write!(out, "  {:>2}  {:<56} {}", i + 1, rule.pattern.to_string(), rule.emit);
                if rule.transition != Transition::Stay {
                    let _ = write!(out, " -> {}", rule.transition);
                }
                out.push('\n');
            }
        }
        out
    }
}
