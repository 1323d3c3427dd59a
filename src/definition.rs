//! Schema definitions: named types built from ordered, possibly array-valued
//! fields.
//!
//! Definitions are assumed to be incomplete while they are being registered,
//! since they can reference each other in any order. Only once the registry
//! holds every type can final sizes be computed and command buffers recorded;
//! that happens in [`DefinitionRegistry::finalize_all`](crate::DefinitionRegistry::finalize_all).

use crate::command::{flatten, Command, CommandTag};

/// In-record footprint of every array, string, and dynamic-blob slot:
/// a `(count: u32, offset: u32)` pair.
pub const OFFSET_PAIR_SIZE: usize = 2 * std::mem::size_of::<u32>();

/// Stable handle into the registry's definition arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DefId(pub(crate) usize);

/// One named, typed slot within a record definition.
#[derive(Debug, Clone)]
pub struct Field {
    pub type_name: String,
    pub name: String,
    /// Registry handle cached on first finalization.
    pub(crate) resolved: Option<DefId>,
    pub is_array: bool,
    /// `>= 0` means a constant-length array; `-1` means dynamic length.
    pub array_size: i32,
}

/// Finalization progress. `InProgress` marks definitions currently on the
/// finalization stack so that by-value cycles are detected instead of looping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Finalization {
    Pending,
    InProgress,
    Finalized,
}

/// A named schema: a fixed-size primitive, a string-like blob, or a record
/// composed of ordered fields.
#[derive(Debug, Clone)]
pub struct Definition {
    name: String,
    size: usize,
    fields: Vec<Field>,
    is_string: bool,
    state: Finalization,
    has_constant_size: bool,
    commands: Vec<Command>,
}

impl Definition {
    /// A leaf type with a fixed in-record size, known at construction.
    pub(crate) fn leaf(name: &str, size: usize, is_string: bool) -> Self {
        Self {
            name: name.to_string(),
            size,
            fields: Vec::new(),
            is_string,
            state: Finalization::Finalized,
            has_constant_size: !is_string,
            commands: Vec::new(),
        }
    }

    /// A record type with no fields yet. Valid until the first `add_field`.
    pub(crate) fn record(name: &str) -> Self {
        Self::leaf(name, 0, false)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// In-record footprint in bytes. Meaningful for records only after
    /// finalization.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_string(&self) -> bool {
        self.is_string
    }

    pub fn is_valid(&self) -> bool {
        self.state == Finalization::Finalized
    }

    /// True iff no string, array, or non-constant-size type occurs anywhere
    /// in the transitive field tree.
    pub fn has_constant_size(&self) -> bool {
        self.has_constant_size
    }

    /// The compiled read program. Meaningful only when [`is_valid`](Self::is_valid).
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Adds a field to the definition and marks it invalid until the next
    /// [`finalize_all`](crate::DefinitionRegistry::finalize_all).
    ///
    /// `array_size >= 0` declares a constant-length array, `-1` a dynamic
    /// one; it is ignored when `is_array` is false.
    pub fn add_field(&mut self, type_name: &str, name: &str, is_array: bool, array_size: i32) {
        self.fields.push(Field {
            type_name: type_name.to_string(),
            name: name.to_string(),
            resolved: None,
            is_array,
            array_size,
        });
        self.state = Finalization::Pending;
    }

    /// Pre-order traversal of the compiled command tags (children after
    /// their parent), for asserting compiled shapes.
    pub fn flatten_commands(&self) -> Vec<CommandTag> {
        let mut out = Vec::new();
        flatten(&mut out, &self.commands);
        out
    }

    pub(crate) fn state(&self) -> Finalization {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: Finalization) {
        self.state = state;
    }

    pub(crate) fn reset_size(&mut self) {
        self.size = 0;
    }

    pub(crate) fn grow_size(&mut self, bytes: usize) {
        self.size += bytes;
    }

    pub(crate) fn clear_constant_size(&mut self) {
        self.has_constant_size = false;
    }

    pub(crate) fn field_mut(&mut self, index: usize) -> &mut Field {
        &mut self.fields[index]
    }

    pub(crate) fn set_commands(&mut self, commands: Vec<Command>) {
        self.commands = commands;
    }
}

impl Field {
    /// Bytes this field occupies in its parent record. Arrays always occupy
    /// the offset-pair slot regardless of element size.
    pub fn footprint(&self, resolved_size: usize) -> usize {
        if self.is_array {
            OFFSET_PAIR_SIZE
        } else {
            resolved_size
        }
    }
}
