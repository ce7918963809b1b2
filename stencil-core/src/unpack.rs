//! Unpack: decode bytes into a list of values following a pack template
//!
//! The directive catalog is shared with [`crate::pack`]; here the source
//! cursor walks the input bytes and each leaf appends the values it decodes.

use crate::cache::{CacheStats, ProgramCache};
use crate::codec;
use crate::constants::{ByteOrder, DEFAULT_CACHE_CAPACITY, POINTER_SIZE};
use crate::directive::{build_tree, lex, repeat, Count, Directive, DirectiveKind, StringPadding};
use crate::error::FormatError;
use crate::loop_recovery;
use crate::node::{Cursor, ExecutionState, FormatNode, Instruction};
use crate::options::CompileOptions;
use crate::value::Value;
use crate::Result;
use std::sync::{Arc, OnceLock};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Leaf instruction of an unpack program
///
/// `greedy` marks directives compiled from a `*` count: a short tail is
/// consumed silently instead of producing `nil`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpackOp {
    /// Fixed-width integer
    Integer {
        /// Width in bytes
        size: usize,
        /// Sign-extend
        signed: bool,
        /// Byte order
        order: ByteOrder,
        /// Compiled from `*`
        greedy: bool,
    },
    /// IEEE-754 float, widened to f64
    Float {
        /// 8-byte double instead of 4-byte single
        double: bool,
        /// Byte order
        order: ByteOrder,
        /// Compiled from `*`
        greedy: bool,
    },
    /// One UTF-8 character as its codepoint
    Utf8Char,
    /// BER-compressed integer
    BerInteger,
    /// Byte string of `width` bytes (`None` = the rest)
    String {
        /// Field width
        width: Option<usize>,
        /// Stripping rule
        padding: StringPadding,
    },
    /// Bits rendered as a `0`/`1` string
    BitString {
        /// Bits to read (`None` = the rest)
        bits: Option<usize>,
        /// Most significant bit first
        msb_first: bool,
    },
    /// Nibbles rendered as hex
    HexString {
        /// Nibbles to read (`None` = the rest)
        nibbles: Option<usize>,
        /// High nibble first
        high_first: bool,
    },
    /// UU-encoded lines
    UuEncoded,
    /// Base64 text
    Base64 {
        /// RFC 4648 strict mode (`m0`)
        strict: bool,
    },
    /// Quoted-printable text
    QuotedPrintable,
    /// Native pointer; zero decodes to `nil`
    Pointer {
        /// Compiled from `*`
        greedy: bool,
    },
}

/// Per-call state of an unpack execution
pub struct UnpackState<'a> {
    input: &'a [u8],
    cursor: Cursor,
    values: Vec<Value>,
}

impl<'a> UnpackState<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            cursor: Cursor::new(input.len()),
            values: Vec::new(),
        }
    }

    fn rest(&self) -> &'a [u8] {
        &self.input[self.cursor.source_position..self.cursor.source_end]
    }

    fn take(&mut self, len: usize) -> &'a [u8] {
        let start = self.cursor.source_position;
        self.cursor.source_position += len;
        &self.input[start..start + len]
    }

    fn push(&mut self, value: Value) {
        self.values.push(value);
        self.cursor.output_position += 1;
    }

    /// Read a `size`-byte word, or handle a short tail
    fn word(&mut self, size: usize, order: ByteOrder, greedy: bool) -> Option<u64> {
        if self.cursor.remaining() < size {
            if greedy {
                self.cursor.source_position = self.cursor.source_end;
            } else {
                self.push(Value::Nil);
            }
            return None;
        }
        let bytes = self.take(size);
        let mut buf = [0u8; 8];
        Some(match order {
            ByteOrder::Little => {
                buf[..size].copy_from_slice(bytes);
                u64::from_le_bytes(buf)
            }
            ByteOrder::Big => {
                buf[8 - size..].copy_from_slice(bytes);
                u64::from_be_bytes(buf)
            }
        })
    }
}

impl ExecutionState for UnpackState<'_> {
    fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    fn seek_output(&mut self, position: usize) -> Result<()> {
        self.values.truncate(position);
        self.cursor.output_position = self.values.len();
        Ok(())
    }
}

impl<'a> Instruction<UnpackState<'a>> for UnpackOp {
    fn execute(&self, state: &mut UnpackState<'a>) -> Result<()> {
        match self {
            UnpackOp::Integer {
                size,
                signed,
                order,
                greedy,
            } => {
                if let Some(raw) = state.word(*size, *order, *greedy) {
                    let value = if *signed {
                        let shift = 64 - size * 8;
                        Value::Integer(((raw << shift) as i64) >> shift)
                    } else {
                        Value::from_u64(raw)
                    };
                    state.push(value);
                }
            }
            UnpackOp::Float { double, order, greedy } => {
                let size = if *double { 8 } else { 4 };
                if let Some(raw) = state.word(size, *order, *greedy) {
                    let f = if *double {
                        f64::from_bits(raw)
                    } else {
                        f64::from(f32::from_bits(raw as u32))
                    };
                    state.push(Value::Float(f));
                }
            }
            UnpackOp::Utf8Char => {
                let rest = state.rest();
                if rest.is_empty() {
                    return Ok(());
                }
                let (cp, len) = codec::utf8_decode(rest)
                    .map_err(|_| FormatError::conversion(&Value::from(rest), "UTF-8 character"))?;
                state.take(len);
                state.push(Value::Integer(i64::from(cp)));
            }
            UnpackOp::BerInteger => {
                let rest = state.rest();
                if rest.is_empty() {
                    return Ok(());
                }
                match codec::ber_decode(rest) {
                    Some((value, len)) => {
                        state.take(len);
                        state.push(Value::from_bigint(value));
                    }
                    None => state.cursor.source_position = state.cursor.source_end,
                }
            }
            UnpackOp::String { width, padding } => {
                let available = state.cursor.remaining();
                let len = width.map_or(available, |w| w.min(available));
                let field = &state.rest()[..len];
                let (text, consumed) = match padding {
                    StringPadding::Null => (field, len),
                    StringPadding::Space => {
                        let end = field
                            .iter()
                            .rposition(|&b| b != b' ' && b != 0)
                            .map_or(0, |i| i + 1);
                        (&field[..end], len)
                    }
                    StringPadding::NullTerminated => match memchr::memchr(0, field) {
                        Some(nul) if width.is_none() => (&field[..nul], nul + 1),
                        Some(nul) => (&field[..nul], len),
                        None => (field, len),
                    },
                };
                state.push(Value::from(text));
                state.take(consumed);
            }
            UnpackOp::BitString { bits, msb_first } => {
                let available = state.cursor.remaining() * 8;
                let bits = bits.map_or(available, |b| b.min(available));
                let data = state.take(bits.div_ceil(8));
                state.push(Value::from(codec::bytes_to_bits(data, bits, *msb_first)));
            }
            UnpackOp::HexString { nibbles, high_first } => {
                let available = state.cursor.remaining() * 2;
                let nibbles = nibbles.map_or(available, |n| n.min(available));
                let data = state.take(nibbles.div_ceil(2));
                state.push(Value::from(codec::bytes_to_hex(data, nibbles, *high_first)));
            }
            UnpackOp::UuEncoded => {
                let (decoded, used) = codec::uu_decode(state.rest());
                state.take(used);
                state.push(Value::from(decoded));
            }
            UnpackOp::Base64 { strict } => {
                let rest = state.rest();
                let decoded = if *strict {
                    codec::base64_decode_strict(rest)
                        .ok_or_else(|| FormatError::conversion(&Value::from(rest), "strict base64"))?
                } else {
                    codec::base64_decode(rest)
                };
                state.take(rest.len());
                state.push(Value::from(decoded));
            }
            UnpackOp::QuotedPrintable => {
                let rest = state.rest();
                state.take(rest.len());
                state.push(Value::from(codec::qp_decode(rest)));
            }
            UnpackOp::Pointer { greedy } => {
                if let Some(raw) = state.word(POINTER_SIZE, ByteOrder::native(), *greedy) {
                    let value = if raw == 0 { Value::Nil } else { Value::from_u64(raw) };
                    state.push(value);
                }
            }
        }
        Ok(())
    }
}

fn compile_directive(d: &Directive, unroll_limit: usize) -> Result<FormatNode<UnpackOp>> {
    let greedy = d.count == Count::Star;
    let scalar = |op: UnpackOp| -> Result<FormatNode<UnpackOp>> {
        Ok(repeat(d.count, FormatNode::Op(op), unroll_limit))
    };

    match d.kind {
        DirectiveKind::Integer { size, signed, order } => scalar(UnpackOp::Integer {
            size,
            signed,
            order,
            greedy,
        }),
        DirectiveKind::Float { double, order } => scalar(UnpackOp::Float {
            double,
            order,
            greedy,
        }),
        DirectiveKind::Pointer => scalar(UnpackOp::Pointer { greedy }),
        DirectiveKind::Utf8Char => scalar(UnpackOp::Utf8Char),
        DirectiveKind::BerInteger => scalar(UnpackOp::BerInteger),
        DirectiveKind::String(padding) => Ok(FormatNode::Op(UnpackOp::String {
            width: d.count.or(1),
            padding,
        })),
        DirectiveKind::BitString { msb_first } => Ok(FormatNode::Op(UnpackOp::BitString {
            bits: d.count.or(1),
            msb_first,
        })),
        DirectiveKind::HexString { high_first } => Ok(FormatNode::Op(UnpackOp::HexString {
            nibbles: d.count.or(1),
            high_first,
        })),
        DirectiveKind::UuEncoded => Ok(FormatNode::Op(UnpackOp::UuEncoded)),
        DirectiveKind::Base64 => Ok(FormatNode::Op(UnpackOp::Base64 {
            strict: d.count == Count::Fixed(0),
        })),
        DirectiveKind::QuotedPrintable => Ok(FormatNode::Op(UnpackOp::QuotedPrintable)),
        DirectiveKind::Seek => Ok(match d.count {
            Count::Star => FormatNode::empty(),
            count => FormatNode::SetSourcePosition(count.or(0).unwrap_or(0)),
        }),
        DirectiveKind::Null => Ok(match d.count {
            Count::Star => FormatNode::AdvanceSourcePosition { to_end: true },
            count => FormatNode::fixed_repeat(
                count.or(1).unwrap_or(1),
                FormatNode::AdvanceSourcePosition { to_end: false },
                unroll_limit,
            ),
        }),
        DirectiveKind::Back => Ok(match d.count {
            Count::Star => FormatNode::ReverseSourcePosition { remaining: true },
            count => FormatNode::fixed_repeat(
                count.or(1).unwrap_or(1),
                FormatNode::ReverseSourcePosition { remaining: false },
                unroll_limit,
            ),
        }),
    }
}

/// A compiled unpack template
#[derive(Debug, Clone, PartialEq)]
pub struct UnpackProgram {
    root: FormatNode<UnpackOp>,
}

impl UnpackProgram {
    /// Compile with default options
    pub fn compile(template: &str) -> Result<Self> {
        Self::compile_with(template, &CompileOptions::default())
    }

    /// Compile with explicit options
    pub fn compile_with(template: &str, options: &CompileOptions) -> Result<Self> {
        let recovered = loop_recovery::recover(template, options);
        let tokens = lex(&recovered)?;
        let root = build_tree(&tokens, options.unroll_limit, |d| {
            compile_directive(d, options.unroll_limit)
        })?;

        #[cfg(feature = "logging")]
        debug!(
            template_len = template.len(),
            nodes = root.node_count(),
            "compiled unpack template"
        );

        Ok(Self { root })
    }

    /// Decode `input`
    pub fn execute(&self, input: &[u8]) -> Result<Vec<Value>> {
        let mut state = UnpackState::new(input);
        self.root.execute(&mut state)?;
        Ok(state.values)
    }

    /// Size of the compiled tree
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    /// Root of the compiled tree
    pub fn root(&self) -> &FormatNode<UnpackOp> {
        &self.root
    }
}

fn cache() -> &'static ProgramCache<String, Arc<UnpackProgram>> {
    static CACHE: OnceLock<ProgramCache<String, Arc<UnpackProgram>>> = OnceLock::new();
    CACHE.get_or_init(|| ProgramCache::new(DEFAULT_CACHE_CAPACITY))
}

/// Unpack `input` according to `template`, reusing cached programs
pub fn unpack(template: &str, input: &[u8]) -> Result<Vec<Value>> {
    let program = cache().get_or_try_insert_with(template.to_owned(), || {
        #[cfg(feature = "logging")]
        trace!(template = %template, "unpack cache miss");
        UnpackProgram::compile(template).map(Arc::new)
    })?;
    program.execute(input)
}

/// Counters of the process-wide unpack cache
pub fn cache_stats() -> CacheStats {
    cache().stats()
}
