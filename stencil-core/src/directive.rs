//! Pack template lexer and the directive catalog
//!
//! A pack template is a run of single-letter directives, each optionally
//! followed by modifiers and a count, with parenthesised groups that carry
//! their own count. Whitespace is insignificant and `#` comments run to the
//! end of the line. The lexer turns the text into [`Token`]s; the pack and
//! unpack builders then fold those tokens into node trees.

use crate::constants::ByteOrder;
use crate::encoding::Encoding;
use crate::error::FormatError;
use crate::node::FormatNode;
use crate::Result;
use core::fmt;

/// How many times (or how wide) a directive applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Count {
    /// No count given; the directive's default applies
    #[default]
    Default,
    /// Explicit decimal count
    Fixed(usize),
    /// `*`: consume whatever remains
    Star,
}

impl Count {
    /// The explicit count, or `default` when none was given
    pub fn or(self, default: usize) -> Option<usize> {
        match self {
            Count::Default => Some(default),
            Count::Fixed(n) => Some(n),
            Count::Star => None,
        }
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Count::Default => Ok(()),
            Count::Fixed(n) => write!(f, "{}", n),
            Count::Star => f.write_str("*"),
        }
    }
}

/// Padding rule of the `a`, `A` and `Z` string directives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringPadding {
    /// `a`: pad with NUL
    Null,
    /// `A`: pad with spaces
    Space,
    /// `Z`: pad with NUL, `*` appends a terminator
    NullTerminated,
}

/// What a directive letter means once its modifiers are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// Fixed-width integer
    Integer {
        /// Width in bytes
        size: usize,
        /// Whether unpack sign-extends
        signed: bool,
        /// Byte order
        order: ByteOrder,
    },
    /// IEEE-754 float
    Float {
        /// 8-byte double instead of 4-byte single
        double: bool,
        /// Byte order
        order: ByteOrder,
    },
    /// `U`
    Utf8Char,
    /// `w`
    BerInteger,
    /// `a A Z`
    String(StringPadding),
    /// `B b`
    BitString {
        /// `B`: most significant bit first
        msb_first: bool,
    },
    /// `H h`
    HexString {
        /// `H`: high nibble first
        high_first: bool,
    },
    /// `u`
    UuEncoded,
    /// `m`
    Base64,
    /// `M`
    QuotedPrintable,
    /// `p P`
    Pointer,
    /// `@`
    Seek,
    /// `X`
    Back,
    /// `x`
    Null,
}

impl DirectiveKind {
    /// Text encoding this directive proposes for a pack result
    pub fn proposed_encoding(&self) -> Option<Encoding> {
        match self {
            DirectiveKind::String(_) => Some(Encoding::Binary),
            DirectiveKind::UuEncoded | DirectiveKind::Base64 | DirectiveKind::QuotedPrintable => {
                Some(Encoding::UsAscii)
            }
            DirectiveKind::Utf8Char => Some(Encoding::Utf8),
            _ => None,
        }
    }
}

/// One lexed directive: letter, modifiers and count
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Directive {
    /// Directive letter as written
    pub letter: char,
    /// `_` or `!` was given
    pub native: bool,
    /// `<` or `>` was given
    pub endian: Option<ByteOrder>,
    /// Count suffix
    pub count: Count,
    /// Resolved meaning
    pub kind: DirectiveKind,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter)?;
        if self.native {
            f.write_str("_")?;
        }
        match self.endian {
            Some(ByteOrder::Little) => f.write_str("<")?,
            Some(ByteOrder::Big) => f.write_str(">")?,
            None => {}
        }
        write!(f, "{}", self.count)
    }
}

/// Lexical unit of a pack template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// A directive
    Directive(Directive),
    /// `(`
    GroupOpen,
    /// `)` and the group's count
    GroupClose(Count),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Directive(d) => write!(f, "{}", d),
            Token::GroupOpen => f.write_str("("),
            Token::GroupClose(count) => write!(f, "){}", count),
        }
    }
}

/// Letters that accept `_ ! < >`
const SIZED_LETTERS: &[u8] = b"sSiIlLqQjJ";

fn resolve(letter: u8, native: bool, endian: Option<ByteOrder>) -> Option<DirectiveKind> {
    let order = endian.unwrap_or(ByteOrder::native());
    let int = |size, signed, order| DirectiveKind::Integer {
        size,
        signed,
        order,
    };
    let float = |double, order| DirectiveKind::Float { double, order };

    let kind = match letter {
        b'c' => int(1, true, order),
        b'C' => int(1, false, order),
        b's' => int(2, true, order),
        b'S' => int(2, false, order),
        b'l' => int(if native { 8 } else { 4 }, true, order),
        b'L' => int(if native { 8 } else { 4 }, false, order),
        b'q' | b'j' => int(8, true, order),
        b'Q' | b'J' => int(8, false, order),
        b'i' => int(4, true, order),
        b'I' => int(4, false, order),
        b'n' => int(2, false, ByteOrder::Big),
        b'N' => int(4, false, ByteOrder::Big),
        b'v' => int(2, false, ByteOrder::Little),
        b'V' => int(4, false, ByteOrder::Little),
        b'D' | b'd' => float(true, ByteOrder::native()),
        b'F' | b'f' => float(false, ByteOrder::native()),
        b'E' => float(true, ByteOrder::Little),
        b'e' => float(false, ByteOrder::Little),
        b'G' => float(true, ByteOrder::Big),
        b'g' => float(false, ByteOrder::Big),
        b'U' => DirectiveKind::Utf8Char,
        b'w' => DirectiveKind::BerInteger,
        b'a' => DirectiveKind::String(StringPadding::Null),
        b'A' => DirectiveKind::String(StringPadding::Space),
        b'Z' => DirectiveKind::String(StringPadding::NullTerminated),
        b'B' => DirectiveKind::BitString { msb_first: true },
        b'b' => DirectiveKind::BitString { msb_first: false },
        b'H' => DirectiveKind::HexString { high_first: true },
        b'h' => DirectiveKind::HexString { high_first: false },
        b'u' => DirectiveKind::UuEncoded,
        b'm' => DirectiveKind::Base64,
        b'M' => DirectiveKind::QuotedPrintable,
        b'p' | b'P' => DirectiveKind::Pointer,
        b'@' => DirectiveKind::Seek,
        b'X' => DirectiveKind::Back,
        b'x' => DirectiveKind::Null,
        _ => return None,
    };
    Some(kind)
}

/// Split a pack template into tokens
///
/// Fails on unknown letters, misplaced or conflicting modifiers, and counts
/// that overflow. Group balance is checked when the tree is built.
pub fn lex(template: &str) -> Result<Vec<Token>> {
    let bytes = template.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        pos += 1;
        match c {
            b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c' => {}
            b'#' => {
                pos = match memchr::memchr(b'\n', &bytes[pos..]) {
                    Some(nl) => pos + nl + 1,
                    None => bytes.len(),
                };
            }
            b'(' => tokens.push(Token::GroupOpen),
            b')' => {
                let count = lex_count(bytes, &mut pos)?;
                tokens.push(Token::GroupClose(count));
            }
            _ => {
                let (native, endian) = lex_modifiers(bytes, &mut pos, c)?;
                let kind = resolve(c, native, endian).ok_or_else(|| {
                    let shown = template
                        .get(pos - 1..)
                        .and_then(|rest| rest.chars().next())
                        .unwrap_or('?');
                    FormatError::parse(format!(
                        "unknown pack directive '{}' in '{}'",
                        shown, template
                    ))
                })?;
                let count = lex_count(bytes, &mut pos)?;
                tokens.push(Token::Directive(Directive {
                    letter: c as char,
                    native,
                    endian,
                    count,
                    kind,
                }));
            }
        }
    }

    Ok(tokens)
}

fn lex_modifiers(bytes: &[u8], pos: &mut usize, letter: u8) -> Result<(bool, Option<ByteOrder>)> {
    let mut native = false;
    let mut endian = None;

    while let Some(&m) = bytes.get(*pos) {
        let order = match m {
            b'_' | b'!' => None,
            b'<' => Some(ByteOrder::Little),
            b'>' => Some(ByteOrder::Big),
            _ => break,
        };
        if !SIZED_LETTERS.contains(&letter) {
            return Err(FormatError::parse(format!(
                "'{}' allowed only after types sSiIlLqQjJ",
                m as char
            )));
        }
        match order {
            None => native = true,
            Some(o) => {
                if endian.is_some_and(|prev| prev != o) {
                    return Err(FormatError::parse("Can't use both '<' and '>'"));
                }
                endian = Some(o);
            }
        }
        *pos += 1;
    }

    Ok((native, endian))
}

fn lex_count(bytes: &[u8], pos: &mut usize) -> Result<Count> {
    match bytes.get(*pos) {
        Some(b'*') => {
            *pos += 1;
            Ok(Count::Star)
        }
        Some(d) if d.is_ascii_digit() => {
            let mut n: usize = 0;
            while let Some(d) = bytes.get(*pos).filter(|d| d.is_ascii_digit()) {
                n = n
                    .checked_mul(10)
                    .and_then(|n| n.checked_add(usize::from(d - b'0')))
                    .ok_or_else(|| FormatError::InvalidLength("pack length too big".into()))?;
                *pos += 1;
            }
            Ok(Count::Fixed(n))
        }
        _ => Ok(Count::Default),
    }
}

/// Fold a token stream into a node tree
///
/// `leaf` compiles one directive (including its count) into a node. Groups
/// are collected on a stack of open lists and wrapped by their count when
/// closed.
pub(crate) fn build_tree<I, F>(tokens: &[Token], unroll_limit: usize, mut leaf: F) -> Result<FormatNode<I>>
where
    I: Clone,
    F: FnMut(&Directive) -> Result<FormatNode<I>>,
{
    let mut stack: Vec<Vec<FormatNode<I>>> = vec![Vec::new()];

    for token in tokens {
        match token {
            Token::Directive(d) => {
                let node = leaf(d)?;
                if let Some(top) = stack.last_mut() {
                    top.push(node);
                }
            }
            Token::GroupOpen => stack.push(Vec::new()),
            Token::GroupClose(count) => {
                if stack.len() < 2 {
                    return Err(FormatError::parse("unbalanced ')' in template"));
                }
                let body = FormatNode::sequence(stack.pop().unwrap_or_default());
                let wrapped = repeat(*count, body, unroll_limit);
                if let Some(top) = stack.last_mut() {
                    top.push(wrapped);
                }
            }
        }
    }

    if stack.len() != 1 {
        return Err(FormatError::parse("unbalanced '(' in template"));
    }
    Ok(FormatNode::Sequence(stack.pop().unwrap_or_default()))
}

/// Apply a repeat count to a node: default runs once, `*` runs while source remains
pub(crate) fn repeat<I: Clone>(count: Count, node: FormatNode<I>, unroll_limit: usize) -> FormatNode<I> {
    match count {
        Count::Default => node,
        Count::Fixed(n) => FormatNode::fixed_repeat(n, node, unroll_limit),
        Count::Star => FormatNode::star_repeat(node),
    }
}

/// Fold the encodings proposed by a token stream
pub(crate) fn unify_encoding(tokens: &[Token]) -> Encoding {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::Directive(d) => d.kind.proposed_encoding(),
            _ => None,
        })
        .fold(Encoding::Default, Encoding::unify)
        .finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directives(template: &str) -> Vec<Directive> {
        lex(template)
            .unwrap()
            .into_iter()
            .filter_map(|t| match t {
                Token::Directive(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_counts() {
        let ds = directives("C C3 C*");
        assert_eq!(ds[0].count, Count::Default);
        assert_eq!(ds[1].count, Count::Fixed(3));
        assert_eq!(ds[2].count, Count::Star);
    }

    #[test]
    fn test_sizes_and_orders() {
        let ds = directives("l l_ L! n V s> q<");
        assert!(matches!(ds[0].kind, DirectiveKind::Integer { size: 4, signed: true, .. }));
        assert!(matches!(ds[1].kind, DirectiveKind::Integer { size: 8, .. }));
        assert!(matches!(ds[2].kind, DirectiveKind::Integer { size: 8, signed: false, .. }));
        assert!(matches!(
            ds[3].kind,
            DirectiveKind::Integer { size: 2, order: ByteOrder::Big, .. }
        ));
        assert!(matches!(
            ds[4].kind,
            DirectiveKind::Integer { size: 4, order: ByteOrder::Little, .. }
        ));
        assert!(matches!(
            ds[5].kind,
            DirectiveKind::Integer { size: 2, order: ByteOrder::Big, .. }
        ));
        assert!(matches!(
            ds[6].kind,
            DirectiveKind::Integer { size: 8, order: ByteOrder::Little, .. }
        ));
    }

    #[test]
    fn test_comments_and_whitespace() {
        let ds = directives("C # a comment\n  n\tN");
        let letters: String = ds.iter().map(|d| d.letter).collect();
        assert_eq!(letters, "CnN");
    }

    #[test]
    fn test_rejects_bad_modifiers() {
        assert!(matches!(lex("C_"), Err(FormatError::Parse(_))));
        assert!(matches!(lex("s<>"), Err(FormatError::Parse(_))));
        assert!(lex("s<<").is_ok());
    }

    #[test]
    fn test_rejects_unknown_letters() {
        assert!(matches!(lex("%"), Err(FormatError::Parse(_))));
        assert!(matches!(lex("y"), Err(FormatError::Parse(_))));
        assert!(matches!(lex("é"), Err(FormatError::Parse(_))));
    }

    #[test]
    fn test_count_overflow() {
        assert!(matches!(
            lex("C99999999999999999999999"),
            Err(FormatError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_canonical_display() {
        let rendered: String = lex("( s_<2 C* )3 a").unwrap().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, "(s_<2C*)3a");
    }

    #[test]
    fn test_unbalanced_groups() {
        let leaf = |_: &Directive| Ok(FormatNode::<u8>::Op(0));
        assert!(build_tree(&lex("(C").unwrap(), 4, leaf).is_err());
        assert!(build_tree(&lex("C)").unwrap(), 4, leaf).is_err());
        assert!(build_tree(&lex("(C)2").unwrap(), 4, leaf).is_ok());
    }

    #[test]
    fn test_encoding_fold() {
        assert_eq!(unify_encoding(&lex("").unwrap()), Encoding::Binary);
        assert_eq!(unify_encoding(&lex("m u").unwrap()), Encoding::UsAscii);
        assert_eq!(unify_encoding(&lex("a m").unwrap()), Encoding::Binary);
        assert_eq!(unify_encoding(&lex("M Z*").unwrap()), Encoding::Binary);
        assert_eq!(unify_encoding(&lex("m U a").unwrap()), Encoding::Utf8);
        assert_eq!(unify_encoding(&lex("N n").unwrap()), Encoding::Binary);
    }
}
