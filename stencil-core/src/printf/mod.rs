//! Printf: format a list of values into text following a template
//!
//! ## Example
//!
//! ```
//! use stencil_core::{sprintf, Value};
//!
//! let text = sprintf("%-6s|%05.1f|%x", &[Value::from("id"), Value::from(3.14159), Value::from(255)]).unwrap();
//! assert_eq!(&text[..], b"id    |003.1|ff");
//! ```
//!
//! Templates are parsed once into a flat [`FormatNode`] sequence of literal
//! runs and conversions. Argument references (sequential, `N$` or `<name>`)
//! are checked for consistency while parsing; width, precision and value
//! reads happen in that order at execution time.

pub mod parser;

mod float;
mod integer;

pub use parser::{ArgRef, Conversion, Flags, FloatStyle, FormatSpec, Operand, Radix, Segment};

use crate::buffer::OutputBuffer;
use crate::cache::{CacheStats, ProgramCache};
use crate::constants::DEFAULT_CACHE_CAPACITY;
use crate::encoding::Encoding;
use crate::error::FormatError;
use crate::node::{justify, read_next, Cursor, ExecutionState, FormatNode, Instruction};
use crate::value::Value;
use crate::Result;
use bytes::Bytes;
use num_traits::ToPrimitive;
use std::sync::{Arc, OnceLock};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Leaf instruction of a printf program
#[derive(Debug, Clone, PartialEq)]
pub enum PrintfOp {
    /// Copy bytes verbatim
    Literal(Bytes),
    /// Resolve operands, read a value, convert and write it
    Format(Box<FormatSpec>),
}

/// Per-call state of a printf execution
pub struct PrintfState<'a> {
    args: &'a [Value],
    cursor: Cursor,
    buffer: OutputBuffer,
    encoding: Encoding,
}

impl<'a> PrintfState<'a> {
    fn new(args: &'a [Value], encoding: Encoding) -> Self {
        Self {
            args,
            cursor: Cursor::new(args.len()),
            buffer: OutputBuffer::new(),
            encoding,
        }
    }

    fn fetch(&mut self, arg: &ArgRef) -> Result<&'a Value> {
        match arg {
            ArgRef::Next => read_next(self.args, &mut self.cursor),
            ArgRef::Index(n) => n
                .checked_sub(1)
                .and_then(|i| self.args.get(i))
                .ok_or_else(|| FormatError::Argument("too few arguments".to_string())),
            ArgRef::Named(name) => {
                let [hash @ Value::Hash(_)] = self.args else {
                    return Err(FormatError::Argument("one hash required".to_string()));
                };
                hash.hash_get(name)
                    .ok_or_else(|| FormatError::Argument(format!("key<{}> not found", name)))
            }
        }
    }

    /// Signed operand value; `*` arguments go through the implicit integer conversion
    fn operand(&mut self, operand: &Operand, overflow: &'static str) -> Result<Option<i64>> {
        match operand {
            Operand::Absent => Ok(None),
            Operand::Literal(n) => Ok(Some(*n as i64)),
            Operand::Arg(arg) => {
                let value = self.fetch(arg)?;
                value
                    .to_int()?
                    .to_i32()
                    .map(|n| Some(i64::from(n)))
                    .ok_or_else(|| FormatError::InvalidLength(overflow.to_string()))
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        self.buffer.write_at(self.cursor.output_position, bytes);
        self.cursor.output_position += bytes.len();
    }

    /// Display width of `text` in this execution's encoding
    fn measure(&self, text: &[u8]) -> usize {
        if self.encoding.is_multibyte() {
            text.iter().filter(|&&b| b & 0xC0 != 0x80).count()
        } else {
            text.len()
        }
    }

    /// Byte length of the first `chars` characters of `text`
    fn prefix_len(&self, text: &[u8], chars: usize) -> usize {
        if !self.encoding.is_multibyte() {
            return chars.min(text.len());
        }
        text.iter()
            .enumerate()
            .filter(|(_, &b)| b & 0xC0 != 0x80)
            .nth(chars)
            .map_or(text.len(), |(i, _)| i)
    }

    fn character(&self, value: &Value) -> Result<Vec<u8>> {
        if let Value::Str(text) = value {
            if text.is_empty() {
                return Err(FormatError::Argument("%c requires a character".to_string()));
            }
            let len = self.prefix_len(text, 1);
            return Ok(text[..len].to_vec());
        }

        let code = value.to_integer_strict()?;
        let invalid = || FormatError::Argument(format!("invalid character: {}", code));
        let code = code.to_u32().ok_or_else(invalid)?;
        if self.encoding.is_multibyte() {
            let c = char::from_u32(code).ok_or_else(invalid)?;
            Ok(c.to_string().into_bytes())
        } else {
            u8::try_from(code).map(|b| vec![b]).map_err(|_| invalid())
        }
    }

    fn format(&mut self, spec: &FormatSpec) -> Result<()> {
        let mut flags = spec.flags;
        let width = match self.operand(&spec.width, "width too big")? {
            Some(w) if w < 0 => {
                flags.minus = true;
                Some(w.unsigned_abs() as usize)
            }
            w => w.map(|w| w as usize),
        };
        let precision = self
            .operand(&spec.precision, "precision too big")?
            .and_then(|p| usize::try_from(p).ok());
        let value = self.fetch(&spec.value)?;

        match spec.conversion {
            Conversion::Integer { radix, upper } => {
                let n = value.to_integer_strict()?;
                let out = integer::format_integer(&n, radix, upper, flags, width, precision);
                self.write(&out);
            }
            Conversion::Float { style, upper } => {
                let f = value.to_f64_strict()?;
                let out = float::format_float(f, style, upper, flags, width, precision);
                self.write(&out);
            }
            Conversion::Char => {
                let c = self.character(value)?;
                let measured = self.measure(&c);
                let padded = justify(&c, measured, width, flags.minus);
                self.write(&padded);
            }
            Conversion::Str | Conversion::Inspect => {
                let text = match spec.conversion {
                    Conversion::Inspect => Bytes::from(value.inspect()),
                    _ => value.to_s(),
                };
                let text = match precision {
                    Some(p) => text.slice(..self.prefix_len(&text, p)),
                    None => text,
                };
                let measured = self.measure(&text);
                let padded = justify(&text, measured, width, flags.minus);
                self.write(&padded);
            }
        }
        Ok(())
    }

    fn finish(self) -> Bytes {
        self.buffer.finish(self.cursor.output_position)
    }
}

impl ExecutionState for PrintfState<'_> {
    fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    fn seek_output(&mut self, position: usize) -> Result<()> {
        if position > self.buffer.len() {
            return Err(FormatError::out_of_range("output position past end"));
        }
        self.cursor.output_position = position;
        Ok(())
    }
}

impl<'a> Instruction<PrintfState<'a>> for PrintfOp {
    fn execute(&self, state: &mut PrintfState<'a>) -> Result<()> {
        match self {
            PrintfOp::Literal(bytes) => {
                state.write(bytes);
                Ok(())
            }
            PrintfOp::Format(spec) => state.format(spec),
        }
    }
}

/// A compiled printf template
#[derive(Debug, Clone, PartialEq)]
pub struct PrintfProgram {
    root: FormatNode<PrintfOp>,
    encoding: Encoding,
}

impl PrintfProgram {
    /// Compile a template whose text is in `encoding`
    ///
    /// The encoding decides whether `%c`, width and precision work on
    /// characters or bytes.
    pub fn compile(template: &[u8], encoding: Encoding) -> Result<Self> {
        let nodes: Vec<_> = parser::parse(template)?
            .into_iter()
            .map(|segment| {
                FormatNode::Op(match segment {
                    Segment::Literal(bytes) => PrintfOp::Literal(Bytes::from(bytes)),
                    Segment::Spec(spec) => PrintfOp::Format(Box::new(spec)),
                })
            })
            .collect();
        let root = FormatNode::sequence(nodes);

        #[cfg(feature = "logging")]
        debug!(
            template_len = template.len(),
            nodes = root.node_count(),
            %encoding,
            "compiled printf template"
        );

        Ok(Self { root, encoding })
    }

    /// Format `args`
    pub fn execute(&self, args: &[Value]) -> Result<Bytes> {
        let mut state = PrintfState::new(args, self.encoding);
        self.root.execute(&mut state)?;
        Ok(state.finish())
    }

    /// Size of the compiled tree
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    /// Root of the compiled tree
    pub fn root(&self) -> &FormatNode<PrintfOp> {
        &self.root
    }

    /// Encoding of the template and the result
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

type CacheKey = (Vec<u8>, Encoding);

fn cache() -> &'static ProgramCache<CacheKey, Arc<PrintfProgram>> {
    static CACHE: OnceLock<ProgramCache<CacheKey, Arc<PrintfProgram>>> = OnceLock::new();
    CACHE.get_or_init(|| ProgramCache::new(DEFAULT_CACHE_CAPACITY))
}

/// Format `args` according to a UTF-8 `template`, reusing cached programs
pub fn sprintf(template: &str, args: &[Value]) -> Result<Bytes> {
    let key = (template.as_bytes().to_vec(), Encoding::Utf8);
    let program = cache().get_or_try_insert_with(key, || {
        #[cfg(feature = "logging")]
        trace!(template = %template, "printf cache miss");
        PrintfProgram::compile(template.as_bytes(), Encoding::Utf8).map(Arc::new)
    })?;
    program.execute(args)
}

/// Counters of the process-wide printf cache
pub fn cache_stats() -> CacheStats {
    cache().stats()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(template: &str, args: Vec<Value>) -> String {
        String::from_utf8(sprintf(template, &args).unwrap().to_vec()).unwrap()
    }

    fn err(template: &str, args: Vec<Value>) -> FormatError {
        sprintf(template, &args).unwrap_err()
    }

    #[test]
    fn test_basic_conversions() {
        assert_eq!(s("%05d", vec![42.into()]), "00042");
        assert_eq!(s("%-10s|", vec!["hi".into()]), "hi        |");
        assert_eq!(s("%d%%", vec![50.into()]), "50%");
        assert_eq!(s("%x %o %b", vec![255.into(), 8.into(), 5.into()]), "ff 10 101");
        assert_eq!(s("%.2f", vec![2.675.into()]), "2.67");
        assert_eq!(s("%e", vec![0.0.into()]), "0.000000e+00");
        assert_eq!(s("no specs", vec![]), "no specs");
    }

    #[test]
    fn test_strict_numeric_conversion() {
        assert_eq!(s("%d", vec!["0x1f".into()]), "31");
        assert_eq!(s("%d", vec![3.99.into()]), "3");
        assert_eq!(s("%.1f", vec!["2.5".into()]), "2.5");
        assert!(matches!(
            err("%d", vec!["abc".into()]),
            FormatError::Conversion { target: "Integer", .. }
        ));
        assert!(matches!(
            err("%f", vec![Value::Nil]),
            FormatError::Conversion { target: "Float", .. }
        ));
    }

    #[test]
    fn test_star_operands() {
        assert_eq!(s("%*d|", vec![5.into(), 42.into()]), "   42|");
        assert_eq!(s("%*d|", vec![(-5).into(), 42.into()]), "42   |");
        assert_eq!(s("%.*f", vec![2.into(), 1.0.into()]), "1.00");
        assert_eq!(s("%.*f", vec![(-1).into(), 1.0.into()]), "1.000000");
        assert_eq!(s("%1$*2$d|", vec![7.into(), 3.into()]), "  7|");
        assert!(matches!(
            err("%*d", vec!["x".into(), 1.into()]),
            FormatError::Conversion { .. }
        ));
    }

    #[test]
    fn test_numbered_arguments() {
        assert_eq!(s("%2$s %1$s", vec!["a".into(), "b".into()]), "b a");
        assert_eq!(s("%1$s%1$s", vec!["x".into()]), "xx");
        assert_eq!(
            err("%3$d", vec![1.into()]),
            FormatError::Argument("too few arguments".to_string())
        );
    }

    #[test]
    fn test_named_arguments() {
        let h = Value::hash([("name", Value::from("Ada")), ("n", Value::from(7))]);
        assert_eq!(s("%{name}!", vec![h.clone()]), "Ada!");
        assert_eq!(s("%<n>03d", vec![h.clone()]), "007");
        assert_eq!(
            err("%<missing>d", vec![h.clone()]),
            FormatError::Argument("key<missing> not found".to_string())
        );
        assert_eq!(
            err("%<n>d", vec![h.clone(), h]),
            FormatError::Argument("one hash required".to_string())
        );
        assert_eq!(
            err("%<n>d", vec![1.into()]),
            FormatError::Argument("one hash required".to_string())
        );
    }

    #[test]
    fn test_too_few_arguments() {
        assert_eq!(err("%d %d", vec![1.into()]), FormatError::TooFewArguments);
    }

    #[test]
    fn test_chars() {
        assert_eq!(s("%c", vec![65.into()]), "A");
        assert_eq!(s("%c", vec![0x263a.into()]), "☺");
        assert_eq!(s("%c", vec!["élan".into()]), "é");
        assert_eq!(s("%3c|", vec!["é".into()]), "  é|");
        assert_eq!(
            err("%c", vec!["".into()]),
            FormatError::Argument("%c requires a character".to_string())
        );

        let binary = PrintfProgram::compile(b"%c", Encoding::Binary).unwrap();
        assert_eq!(&binary.execute(&[200.into()]).unwrap()[..], [200]);
        assert!(matches!(binary.execute(&[300.into()]), Err(FormatError::Argument(_))));
    }

    #[test]
    fn test_precision_counts_characters() {
        assert_eq!(s("%.2s", vec!["héllo".into()]), "hé");
        assert_eq!(s("%5.1s|", vec!["日本".into()]), "    日|");

        let binary = PrintfProgram::compile(b"%.2s", Encoding::Binary).unwrap();
        let out = binary.execute(&["héllo".into()]).unwrap();
        assert_eq!(&out[..], b"h\xc3");
    }

    #[test]
    fn test_inspect() {
        assert_eq!(s("%p", vec!["a".into()]), "\"a\"");
        assert_eq!(s("%p", vec![Value::Nil]), "nil");
        assert_eq!(s("%s", vec![Value::Nil]), "");
        assert_eq!(s("%s", vec![Value::Array(vec![1.into(), 2.into()])]), "[1, 2]");
    }

    #[test]
    fn test_parse_errors_surface_before_execution() {
        assert!(matches!(err("%", vec![]), FormatError::Parse(_)));
        assert!(matches!(err("%1$d %d", vec![1.into()]), FormatError::Parse(_)));
        assert!(matches!(err("%y", vec![1.into()]), FormatError::Parse(_)));
    }

    #[test]
    fn test_program_shape() {
        let program = PrintfProgram::compile(b"a=%d, b=%s", Encoding::Utf8).unwrap();
        assert_eq!(program.node_count(), 5);
        assert_eq!(program.encoding(), Encoding::Utf8);
        let FormatNode::Sequence(children) = program.root() else {
            panic!("expected a sequence");
        };
        assert_eq!(children[0], FormatNode::Op(PrintfOp::Literal(Bytes::from_static(b"a="))));
    }

    #[test]
    fn test_cache_reuses_programs() {
        let template = "%d-%d # cache probe";
        sprintf(template, &[1.into(), 2.into()]).unwrap();
        let before = cache_stats();
        sprintf(template, &[1.into(), 2.into()]).unwrap();
        assert!(cache_stats().hits > before.hits);
    }
}
