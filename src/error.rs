//! Error types for schema finalization and message translation.

/// Error returned by [`DefinitionRegistry::finalize_all`](crate::DefinitionRegistry::finalize_all).
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    /// A field references a type name that is not present in the registry.
    #[error("unknown type '{type_name}' for field '{field}' in definition '{definition}'")]
    UnknownFieldType {
        definition: String,
        field: String,
        type_name: String,
    },

    /// A definition contains itself by value. Cycles are only representable
    /// through array-valued fields, which occupy a fixed 8-byte slot.
    #[error("definition '{definition}' contains itself through non-array field '{field}'")]
    CyclicDefinition { definition: String, field: String },

    /// A definition recursed into itself while its commands were being
    /// recorded. Element programs are unrolled inline, so a recursive type
    /// has no finite command program.
    #[error("cannot compile commands for recursive definition '{definition}'")]
    RecursiveDefinition { definition: String },

    /// A field was never resolved against the registry. Indicates a
    /// definition whose commands were compiled without finalization.
    #[error("unresolved field '{field}' in definition '{definition}'")]
    UnresolvedField { definition: String, field: String },
}

/// Error returned by [`MessageWriter`](crate::MessageWriter) operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WriteError {
    /// The definition has pending fields or failed finalization.
    #[error("definition '{name}' has not been finalized")]
    InvalidDefinition { name: String },

    /// A command needed more bytes than remain in the input message.
    #[error("input under-run while executing '{label}': needed {needed} bytes, {remaining} remaining")]
    InputUnderrun {
        label: String,
        needed: usize,
        remaining: usize,
    },

    /// A copy would exceed its destination window. The compiled commands and
    /// the input disagree, i.e. the input is malformed for this definition.
    #[error("write of {size} bytes overflows window for '{label}' ({remaining} bytes left)")]
    WindowOverflow {
        label: String,
        size: usize,
        remaining: usize,
    },
}
