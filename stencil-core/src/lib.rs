//! # Stencil Core
//!
//! A template-driven engine that packs values into bytes, unpacks bytes back
//! into values and formats values into text. Templates are compiled once into
//! an immutable node tree which is then executed against each argument list.
//!
//! ## Modules
//!
//! - `constants`: Format defaults and limits
//! - `error`: The [`FormatError`] type
//! - `value`: Dynamic [`Value`]s and their coercions
//! - `encoding`: Result encoding tags
//! - `directive`: Pack/unpack directive lexer and group tree builder
//! - `loop_recovery`: Rewrites long unrolled templates into repeat groups
//! - `node`: Node catalog and tree-walking executor
//! - `buffer`: Growable output buffer
//! - `codec`: Text codecs (uuencode, base64, quoted-printable, BER, UTF-8)
//! - `pack` / `unpack` / `printf`: The three front-ends
//! - `cache`: Bounded cache of compiled programs
//! - `options`: Compile-time tuning knobs

#![warn(missing_docs)]

pub mod buffer;
pub mod cache;
pub mod codec;
pub mod constants;
pub mod directive;
pub mod encoding;
pub mod error;
pub mod loop_recovery;
pub mod node;
pub mod options;
pub mod pack;
pub mod printf;
pub mod unpack;
pub mod value;

// Re-export commonly used types
pub use buffer::OutputBuffer;
pub use cache::{CacheStats, ProgramCache};
pub use encoding::Encoding;
pub use error::FormatError;
pub use options::CompileOptions;
pub use pack::{pack, PackProgram, Packed};
pub use printf::{sprintf, PrintfProgram};
pub use unpack::{unpack, UnpackProgram};
pub use value::Value;

/// Result type alias for Stencil operations
pub type Result<T> = core::result::Result<T, FormatError>;
