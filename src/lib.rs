//! Schema-driven translation of raw binary messages into compact,
//! offset-addressable binary objects.
//!
//! Callers describe message types as [`Definition`]s (primitives, string
//! blobs, or records of ordered, possibly array-valued fields), registered
//! in any order with a [`DefinitionRegistry`]. Finalization resolves type
//! references, computes record sizes, and compiles each definition into a
//! flat program of read commands (constant arrays unrolled, adjacent fixed
//! reads merged). A [`MessageWriter`] then executes that program against
//! input bytes, filling two append-only arenas: `data` for fixed-layout
//! record storage and `strings` for blob bodies. Variable-length values are
//! linked from their record slot by an 8-byte `(count, offset)` pair.
//!
//! # Pipeline
//!
//! ```text
//! Definition registration (any order)
//!   └─ DefinitionRegistry::finalize_all  – resolve types, size, compile
//!       └─ MessageWriter::reserve        – pre-size arenas for a batch
//!           └─ MessageWriter::write      – dispatch commands per message
//!               └─ (data, strings, offsets) – consumed by external readers
//! ```
//!
//! Input and output use host byte order throughout; producer and consumer
//! are assumed to share it.

mod command;
mod compile;
mod definition;
mod error;
mod reader;
mod registry;
mod writer;

pub use command::{Command, CommandKind, CommandTag};
pub use definition::{Definition, Field, OFFSET_PAIR_SIZE};
pub use error::{SchemaError, WriteError};
pub use registry::DefinitionRegistry;
pub use writer::{translate_messages, MessageWriter, TranslatedMessages};
