//! Printf template parser
//!
//! Splits a template into literal runs and [`FormatSpec`]s, enforcing the
//! argument numbering rules up front: one template uses either sequential
//! (`%d`), numbered (`%1$d`) or named (`%<x>d`, `%{x}`) references, never a
//! mix.

use crate::error::FormatError;
use crate::Result;

/// Where a value (or a `*` width/precision) comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgRef {
    /// The next sequential argument
    Next,
    /// A 1-based argument index (`N$`)
    Index(usize),
    /// A key of the single hash argument
    Named(String),
}

/// Width or precision source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Operand {
    /// Not given
    #[default]
    Absent,
    /// Written in the template
    Literal(usize),
    /// Read from the arguments (`*` or `*N$`)
    Arg(ArgRef),
}

impl Operand {
    fn is_present(&self) -> bool {
        !matches!(self, Operand::Absent)
    }
}

/// Conversion flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags {
    /// ` `: leading space for non-negative numbers
    pub space: bool,
    /// `#`: alternate form
    pub alt: bool,
    /// `+`: always print a sign
    pub plus: bool,
    /// `-`: left-justify
    pub minus: bool,
    /// `0`: pad numbers with zeros
    pub zero: bool,
    /// `'`: group decimal digits in thousands
    pub group: bool,
}

/// Digit base of an integer conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Radix {
    /// `d i u`
    Decimal,
    /// `b B`
    Binary,
    /// `o`
    Octal,
    /// `x X`
    Hex,
}

impl Radix {
    /// Numeric base
    pub fn base(self) -> u32 {
        match self {
            Radix::Decimal => 10,
            Radix::Binary => 2,
            Radix::Octal => 8,
            Radix::Hex => 16,
        }
    }
}

/// Floating-point rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatStyle {
    /// `f`
    Fixed,
    /// `e E`
    Exponent,
    /// `g G`
    General,
    /// `a A`
    Hex,
}

/// What a spec converts its value into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    /// Integer in some base
    Integer {
        /// Digit base
        radix: Radix,
        /// Uppercase digits and prefix
        upper: bool,
    },
    /// Floating point
    Float {
        /// Rendering style
        style: FloatStyle,
        /// Uppercase exponent and digits
        upper: bool,
    },
    /// `c`
    Char,
    /// `s` and `%{name}`
    Str,
    /// `p`
    Inspect,
}

/// One parsed `%` conversion
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatSpec {
    /// Source of the converted value
    pub value: ArgRef,
    /// Flags
    pub flags: Flags,
    /// Field width
    pub width: Operand,
    /// Precision
    pub precision: Operand,
    /// Conversion type
    pub conversion: Conversion,
}

/// A parsed template element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Bytes copied verbatim
    Literal(Vec<u8>),
    /// A conversion
    Spec(FormatSpec),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgMode {
    Unset,
    Unnumbered(usize),
    Numbered,
    Named,
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    mode: ArgMode,
    next_arg: usize,
}

fn incomplete() -> FormatError {
    FormatError::parse("incomplete format specifier; use %% (double %) instead")
}

/// Parse a printf template into segments
pub fn parse(template: &[u8]) -> Result<Vec<Segment>> {
    Parser {
        bytes: template,
        pos: 0,
        mode: ArgMode::Unset,
        next_arg: 0,
    }
    .run()
}

impl<'a> Parser<'a> {
    fn run(mut self) -> Result<Vec<Segment>> {
        let mut segments = Vec::new();
        let mut literal = Vec::new();

        while self.pos < self.bytes.len() {
            let rest = &self.bytes[self.pos..];
            let Some(percent) = memchr::memchr(b'%', rest) else {
                literal.extend_from_slice(rest);
                break;
            };
            literal.extend_from_slice(&rest[..percent]);
            self.pos += percent + 1;

            match self.bytes.get(self.pos) {
                None => return Err(incomplete()),
                Some(b'%') => {
                    literal.push(b'%');
                    self.pos += 1;
                }
                Some(b'\n') | Some(b'\0') => literal.push(b'%'),
                Some(_) => {
                    let spec = self.spec()?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(core::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Spec(spec));
                }
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(segments)
    }

    fn spec(&mut self) -> Result<FormatSpec> {
        let mut flags = Flags::default();
        let mut width = Operand::Absent;
        let mut precision = Operand::Absent;
        let mut value: Option<ArgRef> = None;

        loop {
            let c = *self.bytes.get(self.pos).ok_or_else(incomplete)?;
            match c {
                b' ' | b'#' | b'+' | b'-' | b'0' | b'\'' => {
                    if precision.is_present() {
                        return Err(FormatError::parse("flag after precision"));
                    }
                    if width.is_present() {
                        return Err(FormatError::parse("flag after width"));
                    }
                    match c {
                        b' ' => flags.space = true,
                        b'#' => flags.alt = true,
                        b'+' => flags.plus = true,
                        b'-' => flags.minus = true,
                        b'0' => flags.zero = true,
                        _ => flags.group = true,
                    }
                    self.pos += 1;
                }
                b'1'..=b'9' => {
                    let n = self.number("width too big")?;
                    if self.bytes.get(self.pos) == Some(&b'$') {
                        self.pos += 1;
                        if value.is_some() {
                            return Err(FormatError::parse(format!("value given twice - {}$", n)));
                        }
                        value = Some(self.numbered(n)?);
                    } else {
                        if width.is_present() {
                            return Err(FormatError::parse("width given twice"));
                        }
                        width = Operand::Literal(n);
                    }
                }
                b'<' | b'{' => {
                    let close = if c == b'<' { b'>' } else { b'}' };
                    let start = self.pos + 1;
                    let len = memchr::memchr(close, &self.bytes[start..])
                        .ok_or_else(|| FormatError::parse("malformed name - unmatched parenthesis"))?;
                    let name = String::from_utf8_lossy(&self.bytes[start..start + len]).into_owned();
                    self.pos = start + len + 1;
                    match &value {
                        Some(ArgRef::Named(prior)) => {
                            return Err(FormatError::parse(format!("named<{}> after <{}>", name, prior)));
                        }
                        Some(ArgRef::Index(n)) => {
                            return Err(FormatError::parse(format!("named<{}> after numbered({})", name, n)));
                        }
                        _ => {}
                    }
                    value = Some(self.named(name)?);
                    if c == b'{' {
                        return Ok(FormatSpec {
                            value: value.unwrap_or(ArgRef::Next),
                            flags,
                            width,
                            precision,
                            conversion: Conversion::Str,
                        });
                    }
                }
                b'*' => {
                    self.pos += 1;
                    if precision.is_present() {
                        return Err(FormatError::parse("width after precision"));
                    }
                    if width.is_present() {
                        return Err(FormatError::parse("width given twice"));
                    }
                    width = Operand::Arg(self.star()?);
                }
                b'.' => {
                    self.pos += 1;
                    if precision.is_present() {
                        return Err(FormatError::parse("precision given twice"));
                    }
                    precision = if self.bytes.get(self.pos) == Some(&b'*') {
                        self.pos += 1;
                        Operand::Arg(self.star()?)
                    } else {
                        Operand::Literal(self.number("precision too big")?)
                    };
                }
                _ => {
                    let conversion = conversion_for(c).ok_or_else(|| {
                        FormatError::parse(format!("malformed format string - %{}", c as char))
                    })?;
                    self.pos += 1;
                    let value = match value {
                        Some(v) => v,
                        None => self.sequential()?,
                    };
                    return Ok(FormatSpec {
                        value,
                        flags,
                        width,
                        precision,
                        conversion,
                    });
                }
            }
        }
    }

    /// Operand after `*`: `*N$` or the next sequential argument
    fn star(&mut self) -> Result<ArgRef> {
        let start = self.pos;
        if self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
            let n = self.number("width too big")?;
            if self.bytes.get(self.pos) == Some(&b'$') {
                self.pos += 1;
                return self.numbered(n);
            }
            self.pos = start;
        }
        self.sequential()
    }

    fn number(&mut self, overflow: &'static str) -> Result<usize> {
        let mut n: usize = 0;
        while let Some(d) = self.bytes.get(self.pos).filter(|d| d.is_ascii_digit()) {
            n = n
                .checked_mul(10)
                .and_then(|n| n.checked_add(usize::from(d - b'0')))
                .filter(|&n| n <= i32::MAX as usize)
                .ok_or_else(|| FormatError::parse(overflow))?;
            self.pos += 1;
        }
        Ok(n)
    }

    fn sequential(&mut self) -> Result<ArgRef> {
        let n = self.next_arg + 1;
        match self.mode {
            ArgMode::Numbered => Err(FormatError::parse(format!("unnumbered({}) mixed with numbered", n))),
            ArgMode::Named => Err(FormatError::parse(format!("unnumbered({}) mixed with named", n))),
            _ => {
                self.next_arg = n;
                self.mode = ArgMode::Unnumbered(n);
                Ok(ArgRef::Next)
            }
        }
    }

    fn numbered(&mut self, n: usize) -> Result<ArgRef> {
        if n == 0 {
            return Err(FormatError::parse("invalid index - 0$"));
        }
        match self.mode {
            ArgMode::Unnumbered(k) => Err(FormatError::parse(format!(
                "numbered({}) after unnumbered({})",
                n, k
            ))),
            ArgMode::Named => Err(FormatError::parse(format!("numbered({}) after named", n))),
            _ => {
                self.mode = ArgMode::Numbered;
                Ok(ArgRef::Index(n))
            }
        }
    }

    fn named(&mut self, name: String) -> Result<ArgRef> {
        match self.mode {
            ArgMode::Unnumbered(k) => Err(FormatError::parse(format!(
                "named<{}> after unnumbered({})",
                name, k
            ))),
            ArgMode::Numbered => Err(FormatError::parse(format!("named<{}> after numbered", name))),
            _ => {
                self.mode = ArgMode::Named;
                Ok(ArgRef::Named(name))
            }
        }
    }
}

fn conversion_for(c: u8) -> Option<Conversion> {
    let int = |radix, upper| Conversion::Integer { radix, upper };
    let float = |style, upper| Conversion::Float { style, upper };
    Some(match c {
        b'd' | b'i' | b'u' => int(Radix::Decimal, false),
        b'b' => int(Radix::Binary, false),
        b'B' => int(Radix::Binary, true),
        b'o' => int(Radix::Octal, false),
        b'x' => int(Radix::Hex, false),
        b'X' => int(Radix::Hex, true),
        b'f' => float(FloatStyle::Fixed, false),
        b'e' => float(FloatStyle::Exponent, false),
        b'E' => float(FloatStyle::Exponent, true),
        b'g' => float(FloatStyle::General, false),
        b'G' => float(FloatStyle::General, true),
        b'a' => float(FloatStyle::Hex, false),
        b'A' => float(FloatStyle::Hex, true),
        b'c' => Conversion::Char,
        b's' => Conversion::Str,
        b'p' => Conversion::Inspect,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(template: &str) -> Vec<FormatSpec> {
        parse(template.as_bytes())
            .unwrap()
            .into_iter()
            .filter_map(|s| match s {
                Segment::Spec(spec) => Some(spec),
                _ => None,
            })
            .collect()
    }

    fn parse_err(template: &str) -> String {
        match parse(template.as_bytes()) {
            Err(FormatError::Parse(msg)) => msg,
            other => panic!("expected parse error for {:?}, got {:?}", template, other),
        }
    }

    #[test]
    fn test_literals_and_percent() {
        let segments = parse(b"100%% sure").unwrap();
        assert_eq!(segments, vec![Segment::Literal(b"100% sure".to_vec())]);

        let segments = parse(b"a%\nb").unwrap();
        assert_eq!(segments, vec![Segment::Literal(b"a%\nb".to_vec())]);
    }

    #[test]
    fn test_full_spec() {
        let s = &specs("%-+08.3x")[0];
        assert!(s.flags.minus && s.flags.plus && s.flags.zero);
        assert_eq!(s.width, Operand::Literal(8));
        assert_eq!(s.precision, Operand::Literal(3));
        assert_eq!(
            s.conversion,
            Conversion::Integer {
                radix: Radix::Hex,
                upper: false
            }
        );
        assert_eq!(s.value, ArgRef::Next);
    }

    #[test]
    fn test_star_operands() {
        let s = &specs("%*.*f")[0];
        assert_eq!(s.width, Operand::Arg(ArgRef::Next));
        assert_eq!(s.precision, Operand::Arg(ArgRef::Next));

        let s = &specs("%1$*2$d")[0];
        assert_eq!(s.value, ArgRef::Index(1));
        assert_eq!(s.width, Operand::Arg(ArgRef::Index(2)));
    }

    #[test]
    fn test_named() {
        let s = &specs("%<n>05.1f %{m}")[..];
        assert_eq!(s[0].value, ArgRef::Named("n".into()));
        assert_eq!(s[0].width, Operand::Literal(5));
        assert_eq!(s[1].value, ArgRef::Named("m".into()));
        assert_eq!(s[1].conversion, Conversion::Str);
    }

    #[test]
    fn test_mixing_errors() {
        assert_eq!(parse_err("%1$d %d"), "unnumbered(1) mixed with numbered");
        assert_eq!(parse_err("%d %1$d"), "numbered(1) after unnumbered(1)");
        assert_eq!(parse_err("%<a>d %d"), "unnumbered(1) mixed with named");
        assert_eq!(parse_err("%1$d %<a>d"), "named<a> after numbered");
        assert_eq!(parse_err("%d %<a>d"), "named<a> after unnumbered(1)");
        assert_eq!(parse_err("%<a>d %1$d"), "numbered(1) after named");
        assert_eq!(parse_err("%0$d"), "invalid index - 0$");
    }

    #[test]
    fn test_second_value_reference_names_the_first() {
        assert_eq!(parse_err("%1$<a>d"), "named<a> after numbered(1)");
        assert_eq!(parse_err("%<a><b>d"), "named<b> after <a>");
    }

    #[test]
    fn test_malformed() {
        assert_eq!(
            parse_err("abc%"),
            "incomplete format specifier; use %% (double %) instead"
        );
        assert_eq!(parse_err("%5"), "incomplete format specifier; use %% (double %) instead");
        assert_eq!(parse_err("%y"), "malformed format string - %y");
        assert_eq!(parse_err("%5*d"), "width given twice");
        assert_eq!(parse_err("%5-d"), "flag after width");
        assert_eq!(parse_err("%.2-d"), "flag after precision");
        assert_eq!(parse_err("%.2.3d"), "precision given twice");
        assert_eq!(parse_err("%<a"), "malformed name - unmatched parenthesis");
    }
}
