//! Opcode mnemonic inventory, grouped by the operand syntax each
//! family expects, and the exact-match dispatch used to recognise them.
//!
//! Families are tried in a fixed order by the root state, so a mnemonic
//! listed in an earlier family shadows any longer one in a later family
//! that it prefixes (`LC` shadows `LC3`, `LD@R` shadows `LD@R3`).
use std::collections::HashMap;

/// Mnemonics that take no operand.
pub const NONE: &[&str] = &[
    "FETCHS&X", "PRPHSLCT", "READDATA", "WRITDATA", "?LOWBAT", "A=B=C=0",
    "C=CANDA", "ENBANK1", "ENBANK2", "ENBANK3", "ENBANK4", "ENDREAD", "ENDWRIT",
    "GOTOADR", "PERSLCT", "PUSHADR", "RAMSLCT", "RDABC1L", "RDABC1R", "RDABC4L",
    "RTIMEST", "TIMER=A", "TIMER=B", "WKUPOFF", "WRABC1L", "WRABC1R", "WRABC4L",
    "WRABC4R", "?F10=1", "?F11=1", "?F12=1", "?F13=1", "?NCRTN", "?S10=1",
    "?S11=1", "?S12=1", "?S13=1", "?TFAIL", "ALARM?", "ALMOFF", "C=CORA",
    "C=DATA", "C=KEYS", "CLRABC", "CLRKEY", "CLRRTN", "CRDEXF", "CRDFLG",
    "CRDINF", "CRDOHF", "CRDWPF", "DADD=C", "DATA=C", "DISOFF", "DISTOG",
    "DSPOFF", "DSPTOG", "DSWKUP", "ENREAD", "ENROM1", "ENROM2", "ENROM3",
    "ENROM4", "ENWKUP", "ENWRIT", "ERROR?", "FLLABC", "FLLDAB", "FLSDAB",
    "FRSABC", "FRSDAB", "GOKEYS", "GTOKEY", "PFAD=C", "POPADR", "POWOFF",
    "POWON?", "RCTIME", "RDA12L", "RDAB1L", "RDAB1R", "RDAB6L", "RDB12L",
    "RDC12L", "RDTIME", "READAN", "READEN", "RTNCPU", "SETCTF", "SETDEC",
    "SETHEX", "SLLABC", "SLLDAB", "SLSABC", "SLSDAB", "SPOPND", "SRLABC",
    "SRLDAB", "SRSABC", "SRSDAB", "STARTC", "STATUS", "STPINT", "STREAD",
    "STWRIT", "TCLCRD", "TCLCTF", "TRPCRD", "TSTBUF", "WDTIME", "WINTST",
    "WKUPON", "WRA12L", "WRAB1L", "WRAB1R", "WRAB6L", "WRAB6R", "WRB12L",
    "WRC12L", "WRITAN", "WRTIME", "WTIME-", "?CRDR", "?CRTN", "?EDAV", "?F0=1",
    "?F1=1", "?F2=1", "?F3=1", "?F4=1", "?F5=1", "?F6=1", "?F7=1", "?F8=1",
    "?F9=1", "?FRAV", "?FRNS", "?IFCR", "?ORAV", "?PBSY", "?S0=1", "?S1=1",
    "?S2=1", "?S3=1", "?S4=1", "?S5=1", "?S6=1", "?S7=1", "?S8=1", "?S9=1",
    "?SERV", "?SRQR", "?WNDB", "ABC=0", "ALMON", "BUSY?", "C<>ST", "C=C!A",
    "C=C&A", "C=C.A", "C=KEY", "C=STK", "CHKKB", "CLRST", "CSTEX", "CXISA",
    "DECPT", "DSALM", "ENALM", "FEXSB", "FLLDA", "FLLDB", "FLLDC", "FLSDA",
    "FLSDB", "FLSDC", "FRAV?", "FRNS?", "FRSDA", "FRSDB", "FRSDC", "GOTOC",
    "IFCR?", "INCPT", "NCRTN", "ORAV?", "PRINT", "R=R+1", "R=R-1", "RABCL",
    "RABCR", "RDA1L", "RDA1R", "RDALM", "RDATA", "RDB1L", "RDB1R", "RDC1L",
    "RDC1R", "RDINT", "RDROM", "RDSCR", "RDSTS", "RSTKB", "RTIME", "RTNNC",
    "SLCTP", "SLCTQ", "SLSDA", "SLSDB", "SRLDA", "SRLDB", "SRLDC", "SRQR?",
    "SRSDA", "SRSDB", "SRSDC", "ST<>F", "ST<>T", "STK=C", "STOPC", "WDATA",
    "WMLDL", "WRA1L", "WRA1R", "WRALM", "WRB1L", "WRB1R", "WRC1L", "WRSCR",
    "WRSTS", "WRTEN", "WSINT", "WTIME", "XQ>GO", "?ALM", "?BAT", "?KEY", "?LLD",
    "?P=Q", "C<>G", "C<>M", "C<>N", "C=ST", "CGEX", "CMEX", "CNEX", "CRTN",
    "F=SB", "F=ST", "GTOC", "LLD?", "M<>C", "MCEX", "N<>C", "NCEX", "P=Q?",
    "PT=A", "PT=B", "PT=P", "PT=Q", "RALM", "RINT", "RSCR", "RSTS", "RTNC",
    "S10=", "S11=", "S12=", "S13=", "SB=F", "SELP", "SELQ", "ST=0", "ST=C",
    "ST=F", "ST=T", "T=ST", "WALM", "WROM", "WSCR", "WSTS", "+PT", "-PT", "C=G",
    "C=M", "C=N", "G=C", "M=C", "N=C", "NOP", "RTN", "S0=", "S1=", "S2=", "S3=",
    "S4=", "S5=", "S6=", "S7=", "S8=", "S9=",
];

/// Mnemonics taking a bare decimal operand.
pub const NUMBER: &[&str] = &[
    "FLG=1?", "HPIL=C", "?FSET", "ST=1?", "?FI=", "?PT=", "CLRF", "FCNS",
    "PT=?", "SETF", "ST=1", "XROM", "?FS", "?PF", "?R=", "PT=", "RCR", "CF",
    "R=", "SF",
];

/// Branch and call mnemonics taking an absolute address or a label.
pub const ADDRESS: &[&str] = &[
    "?NCGOREL", "?NCXQREL", "NCGOREL", "NCXQREL", "DEFP4K", "DEFR4K", "GOL41C",
    "GOLONG", "GSB41C", "GSUBNC", "U4KDEF", "?NCGO", "?NCXQ", "GOLNC", "GOSUB",
    "GSUBC", "?CGO", "?CXQ", "GOLC", "NCGO", "NCXQ", "CGO", "CXQ",
];

/// Mnemonics taking a register or digit specification.
pub const REGISTER: &[&str] = &[
    "C=REGN", "HPL=CH", "PERTCT", "REGN=C", "C=REG", "REG=C", "SELPF", "LD@R",
    "READ", "WRIT", "LC",
];

/// Arithmetic, shift and compare mnemonics taking a field selector (P, Q, X, W, ALL, ...).
pub const CLASS2: &[&str] = &[
    "C=-C-1", "A=A+1", "A=A+B", "A=A+C", "A=A-1", "A=A-B", "A=A-C", "C=0-C",
    "C=A+C", "C=A-C", "C=C+1", "C=C+A", "C=C+C", "C=C-1", "LSHFA", "RSHFA",
    "RSHFB", "RSHFC", "?A#0", "?A#C", "?A<B", "?A<C", "?B#0", "?C#0", "A#0?",
    "A#C?", "A<>B", "A<>C", "A<B?", "A<C?", "ABEX", "ACEX", "B#0?", "B<>A",
    "B<>C", "BAEX", "BCEX", "C#0?", "C<>A", "C<>B", "C=-C", "CAEX", "CBEX",
    "A=0", "A=B", "A=C", "ASL", "ASR", "B=0", "B=A", "B=C", "BSR", "C=0", "C=A",
    "C=B", "CSR",
];

/// Conditional and relative jumps taking a signed displacement, an address or a label.
pub const CLASS3: &[&str] = &[
    "GONC", "GOTO", "GOC", "JNC", "JC",
];

/// Literal loads taking a hex literal of any width.
pub const SPECIAL1: &[&str] = &[
    "LDIS&X", "LD@R3", "LC3", "LDI",
];

/// Constant definitions taking a 10-bit code word or a label.
pub const SPECIAL2: &[&str] = &[
    "CON",
];

/// Directives taking no argument.
pub const SIMPLE_DIRECTIVES: &[&str] = &[".ZENCODE", ".JDA", ".HP"];

/// Directives taking a quoted string.
pub const STRING_DIRECTIVES: &[&str] = &[".TITLE", ".MESSL", ".NAME", ".TEXT"];

/// Directives taking a decimal count.
pub const NUMBER_DIRECTIVES: &[&str] = &[".BSS"];

/// Directives taking a four digit hex address.
pub const ADDRESS_DIRECTIVES: &[&str] = &[".FILLTO", ".ORG"];

/// Directives defining a symbol.
pub const SYMBOL_DIRECTIVES: &[&str] = &[".EQU"];

/// Exact-match dispatch over a fixed word list.
///
/// Words are bucketed by their first byte and each bucket is ordered
/// longest first, so the first hit is also the longest word that
/// prefixes the input.
#[derive(Clone, Debug)]
pub struct MnemonicSet {
    buckets: HashMap<u8, Vec<&'static str>>,
    len: usize,
}

impl MnemonicSet {
    pub fn new(words: &[&'static str]) -> Self {
        let mut buckets: HashMap<u8, Vec<&'static str>> = HashMap::new();
        for &word in words.iter().filter(|w| !w.is_empty()) {
            buckets.entry(word.as_bytes()[0]).or_default().push(word);
        }
        for bucket in buckets.values_mut() {
            bucket.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
            bucket.dedup();
        }
        let len = buckets.values().map(Vec::len).sum();
        MnemonicSet { buckets, len }
    }

    /// Returns the byte length of the longest word that prefixes `rest`.
    pub fn match_at(&self, rest: &str) -> Option<usize> {
        let first = *rest.as_bytes().first()?;
        self.buckets.get(&first)?
            .iter()
            .find(|word| rest.starts_with(*word))
            .map(|word| word.len())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
