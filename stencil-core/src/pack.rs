//! Pack: serialize a list of values into bytes following a template
//!
//! ## Example
//!
//! ```
//! use stencil_core::{pack, Encoding, Value};
//!
//! let packed = pack("n a3 U", &[Value::from(258), Value::from("hi"), Value::from(0x263a)]).unwrap();
//! assert_eq!(&packed.bytes[..], b"\x01\x02hi\x00\xe2\x98\xba");
//! assert_eq!(packed.encoding, Encoding::Utf8);
//! ```

use crate::buffer::OutputBuffer;
use crate::cache::{CacheStats, ProgramCache};
use crate::codec;
use crate::constants::{
    ByteOrder, BASE64_DEFAULT_LINE_BYTES, DEFAULT_CACHE_CAPACITY, MIME_DEFAULT_LINE_LENGTH,
    POINTER_SIZE, UU_MAX_LINE_BYTES,
};
use crate::directive::{build_tree, lex, repeat, unify_encoding, Count, Directive, DirectiveKind, StringPadding};
use crate::encoding::Encoding;
use crate::error::FormatError;
use crate::loop_recovery;
use crate::node::{read_next, Cursor, ExecutionState, FormatNode, Instruction};
use crate::options::CompileOptions;
use crate::value::Value;
use crate::Result;
use bytes::Bytes;
use num_traits::{Signed, ToPrimitive};
use std::sync::{Arc, OnceLock};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Result of a pack: the bytes and their unified text encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packed {
    /// Serialized bytes
    pub bytes: Bytes,
    /// Encoding the directives agreed on
    pub encoding: Encoding,
}

impl Packed {
    /// Number of bytes produced
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing was produced
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Leaf instruction of a pack program: read one value, convert it, write bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackOp {
    /// Low `size` bytes of an integer
    Integer {
        /// Width in bytes
        size: usize,
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
    /// One codepoint as UTF-8
    Utf8Char,
    /// BER-compressed unsigned integer
    BerInteger,
    /// Byte string padded or truncated to `width` (`None` = natural length)
    String {
        /// Field width
        width: Option<usize>,
        /// Padding rule
        padding: StringPadding,
    },
    /// `0`/`1` string packed into bits
    BitString {
        /// Bits to take (`None` = all characters)
        bits: Option<usize>,
        /// Most significant bit first
        msb_first: bool,
    },
    /// Hex digit string packed into nibbles
    HexString {
        /// Nibbles to take (`None` = all characters)
        nibbles: Option<usize>,
        /// High nibble first
        high_first: bool,
    },
    /// UU-encoded lines
    UuEncoded {
        /// Input bytes per line
        line_bytes: usize,
    },
    /// Base64 (`None` = strict, no line feeds)
    Base64 {
        /// Input bytes per line
        line_bytes: Option<usize>,
    },
    /// Quoted-printable text
    QuotedPrintable {
        /// Soft line break threshold
        line_length: usize,
    },
    /// Opaque native pointer
    Pointer,
    /// Run of NUL bytes
    NullBytes(usize),
}

/// Per-call state of a pack execution
pub struct PackState<'a> {
    args: &'a [Value],
    cursor: Cursor,
    buffer: OutputBuffer,
}

impl<'a> PackState<'a> {
    fn new(args: &'a [Value]) -> Self {
        Self {
            args,
            cursor: Cursor::new(args.len()),
            buffer: OutputBuffer::new(),
        }
    }

    fn read(&mut self) -> Result<&'a Value> {
        read_next(self.args, &mut self.cursor)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.buffer.write_at(self.cursor.output_position, bytes);
        self.cursor.output_position += bytes.len();
    }

    fn fill(&mut self, byte: u8, count: usize) {
        self.buffer.fill_at(self.cursor.output_position, byte, count);
        self.cursor.output_position += count;
    }

    fn finish(self) -> Bytes {
        self.buffer.finish(self.cursor.output_position)
    }
}

impl ExecutionState for PackState<'_> {
    fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    fn seek_output(&mut self, position: usize) -> Result<()> {
        // bytes past the write position were dropped by `X` or an earlier `@`
        self.buffer.truncate(position.min(self.cursor.output_position));
        let len = self.buffer.len();
        if position > len {
            self.buffer.fill_at(len, 0, position - len);
        }
        self.cursor.output_position = position;
        Ok(())
    }
}

impl<'a> Instruction<PackState<'a>> for PackOp {
    fn execute(&self, state: &mut PackState<'a>) -> Result<()> {
        match self {
            PackOp::Integer { size, order } => {
                let bits = state.read()?.to_packed_bits()?;
                match order {
                    ByteOrder::Little => state.write(&bits.to_le_bytes()[..*size]),
                    ByteOrder::Big => state.write(&bits.to_be_bytes()[8 - size..]),
                }
            }
            PackOp::Float { double, order } => {
                let f = state.read()?.to_f64()?;
                match (double, order) {
                    (true, ByteOrder::Little) => state.write(&f.to_le_bytes()),
                    (true, ByteOrder::Big) => state.write(&f.to_be_bytes()),
                    (false, ByteOrder::Little) => state.write(&(f as f32).to_le_bytes()),
                    (false, ByteOrder::Big) => state.write(&(f as f32).to_be_bytes()),
                }
            }
            PackOp::Utf8Char => {
                let value = state.read()?;
                let encoded = codec::utf8_encode(&value.to_int()?)
                    .ok_or_else(|| FormatError::conversion(value, "UTF-8 codepoint"))?;
                state.write(&encoded);
            }
            PackOp::BerInteger => {
                let value = state.read()?;
                let encoded = codec::ber_encode(&value.to_int()?)
                    .ok_or_else(|| FormatError::conversion(value, "BER-compressed integer"))?;
                state.write(&encoded);
            }
            PackOp::String { width, padding } => {
                let text = state.read()?.to_str()?;
                match width {
                    None => {
                        state.write(&text);
                        if *padding == StringPadding::NullTerminated {
                            state.write(&[0]);
                        }
                    }
                    Some(width) => {
                        let take = text.len().min(*width);
                        state.write(&text[..take]);
                        let pad = if *padding == StringPadding::Space { b' ' } else { 0 };
                        state.fill(pad, width - take);
                    }
                }
            }
            PackOp::BitString { bits, msb_first } => {
                let text = state.read()?.to_str()?;
                let bits = bits.unwrap_or(text.len());
                state.write(&codec::bits_to_bytes(&text, bits, *msb_first));
            }
            PackOp::HexString { nibbles, high_first } => {
                let text = state.read()?.to_str()?;
                let nibbles = nibbles.unwrap_or(text.len());
                state.write(&codec::hex_to_bytes(&text, nibbles, *high_first));
            }
            PackOp::UuEncoded { line_bytes } => {
                let text = state.read()?.to_str()?;
                let mut out = Vec::with_capacity(text.len() * 4 / 3 + 4);
                codec::uu_encode(&text, *line_bytes, &mut out);
                state.write(&out);
            }
            PackOp::Base64 { line_bytes } => {
                let text = state.read()?.to_str()?;
                let mut out = Vec::with_capacity(text.len() * 4 / 3 + 4);
                codec::base64_encode(&text, *line_bytes, &mut out);
                state.write(&out);
            }
            PackOp::QuotedPrintable { line_length } => {
                let text = state.read()?.to_s();
                let mut out = Vec::with_capacity(text.len() + text.len() / 4);
                codec::qp_encode(&text, *line_length, &mut out);
                state.write(&out);
            }
            PackOp::Pointer => {
                let value = state.read()?;
                let handle = match value {
                    Value::Nil => 0,
                    _ => {
                        let n = value.to_int()?;
                        if n.is_negative() {
                            return Err(FormatError::conversion(value, "pointer"));
                        }
                        n.to_u64().ok_or_else(|| FormatError::conversion(value, "pointer"))?
                    }
                };
                let bytes = match ByteOrder::native() {
                    ByteOrder::Little => handle.to_le_bytes(),
                    ByteOrder::Big => handle.to_be_bytes(),
                };
                state.write(&bytes[..POINTER_SIZE]);
            }
            PackOp::NullBytes(count) => state.fill(0, *count),
        }
        Ok(())
    }
}

/// Input bytes per `u`/`m` line for a count
fn line_bytes(count: Count, cap: Option<usize>) -> usize {
    match count {
        Count::Fixed(n) if n > 2 => cap.map_or(n, |cap| n.min(cap)) / 3 * 3,
        _ => BASE64_DEFAULT_LINE_BYTES,
    }
}

fn compile_directive(d: &Directive, unroll_limit: usize) -> Result<FormatNode<PackOp>> {
    let scalar = |op: PackOp| -> Result<FormatNode<PackOp>> {
        Ok(repeat(d.count, FormatNode::Op(op), unroll_limit))
    };

    match d.kind {
        DirectiveKind::Integer { size, order, .. } => scalar(PackOp::Integer { size, order }),
        DirectiveKind::Float { double, order } => scalar(PackOp::Float { double, order }),
        DirectiveKind::Utf8Char => scalar(PackOp::Utf8Char),
        DirectiveKind::BerInteger => scalar(PackOp::BerInteger),
        DirectiveKind::Pointer => scalar(PackOp::Pointer),
        DirectiveKind::String(padding) => Ok(FormatNode::Op(PackOp::String {
            width: d.count.or(1),
            padding,
        })),
        DirectiveKind::BitString { msb_first } => Ok(FormatNode::Op(PackOp::BitString {
            bits: d.count.or(1),
            msb_first,
        })),
        DirectiveKind::HexString { high_first } => Ok(FormatNode::Op(PackOp::HexString {
            nibbles: d.count.or(1),
            high_first,
        })),
        DirectiveKind::UuEncoded => Ok(FormatNode::Op(PackOp::UuEncoded {
            line_bytes: line_bytes(d.count, Some(UU_MAX_LINE_BYTES)),
        })),
        DirectiveKind::Base64 => {
            let line_bytes = match d.count {
                Count::Fixed(0) => None,
                count => Some(line_bytes(count, None)),
            };
            Ok(FormatNode::Op(PackOp::Base64 { line_bytes }))
        }
        DirectiveKind::QuotedPrintable => {
            let line_length = match d.count {
                Count::Fixed(n) if n > 1 => n,
                _ => MIME_DEFAULT_LINE_LENGTH,
            };
            Ok(FormatNode::Op(PackOp::QuotedPrintable { line_length }))
        }
        DirectiveKind::Seek => match d.count {
            Count::Star => Err(FormatError::InvalidLength("'@' does not take '*'".into())),
            count => Ok(FormatNode::SetOutputPosition(count.or(1).unwrap_or(1))),
        },
        DirectiveKind::Back => match d.count {
            Count::Star => Ok(FormatNode::empty()),
            count => Ok(FormatNode::fixed_repeat(
                count.or(1).unwrap_or(1),
                FormatNode::ReverseOutputPosition,
                unroll_limit,
            )),
        },
        DirectiveKind::Null => match d.count {
            Count::Star | Count::Fixed(0) => Ok(FormatNode::empty()),
            count => Ok(FormatNode::Op(PackOp::NullBytes(count.or(1).unwrap_or(1)))),
        },
    }
}

/// A compiled pack template
#[derive(Debug, Clone, PartialEq)]
pub struct PackProgram {
    root: FormatNode<PackOp>,
    encoding: Encoding,
}

impl PackProgram {
    /// Compile with default options
    pub fn compile(template: &str) -> Result<Self> {
        Self::compile_with(template, &CompileOptions::default())
    }

    /// Compile with explicit options
    pub fn compile_with(template: &str, options: &CompileOptions) -> Result<Self> {
        let recovered = loop_recovery::recover(template, options);
        let tokens = lex(&recovered)?;
        let encoding = unify_encoding(&tokens);
        let root = build_tree(&tokens, options.unroll_limit, |d| {
            compile_directive(d, options.unroll_limit)
        })?;

        #[cfg(feature = "logging")]
        debug!(
            template_len = template.len(),
            nodes = root.node_count(),
            %encoding,
            "compiled pack template"
        );

        Ok(Self { root, encoding })
    }

    /// Run the program against `values`
    pub fn execute(&self, values: &[Value]) -> Result<Packed> {
        let mut state = PackState::new(values);
        self.root.execute(&mut state)?;
        Ok(Packed {
            bytes: state.finish(),
            encoding: self.encoding,
        })
    }

    /// Size of the compiled tree
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    /// Root of the compiled tree
    pub fn root(&self) -> &FormatNode<PackOp> {
        &self.root
    }

    /// Unified encoding of the results
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

fn cache() -> &'static ProgramCache<String, Arc<PackProgram>> {
    static CACHE: OnceLock<ProgramCache<String, Arc<PackProgram>>> = OnceLock::new();
    CACHE.get_or_init(|| ProgramCache::new(DEFAULT_CACHE_CAPACITY))
}

/// Pack `values` according to `template`, reusing cached programs
pub fn pack(template: &str, values: &[Value]) -> Result<Packed> {
    let program = cache().get_or_try_insert_with(template.to_owned(), || {
        #[cfg(feature = "logging")]
        trace!(template = %template, "pack cache miss");
        PackProgram::compile(template).map(Arc::new)
    })?;
    program.execute(values)
}

/// Counters of the process-wide pack cache
pub fn cache_stats() -> CacheStats {
    cache().stats()
}
