//! Compiled read programs executed against input messages.
//!
//! A [`Command`] is one read/copy/allocation step. Array commands nest
//! element programs in `subcommands`; all other kinds are leaves.

/// One step of a compiled read program.
///
/// The label is a diagnostic string built from the field path that produced
/// the command (e.g. `"stamp(time)"`); merged fixed reads join their labels
/// with `+`. No translation decision depends on label text.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub label: String,
    pub kind: CommandKind,
}

/// The operation a [`Command`] performs.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Copy `size` bytes from the input to the destination window.
    FixedRead { size: usize },

    /// Read a u32 count from the input, allocate `count` bytes in the string
    /// arena, copy the body, and write a (count, offset) pair.
    StringRead,

    /// Read a u32 count from the input, allocate `count * size` bytes in the
    /// data arena, copy, and write a (count, offset) pair. Represents an
    /// array whose elements all have a constant size.
    DynamicRead { size: usize },

    /// A constant-length array. The element count is known when recording,
    /// so `subcommands` holds the programs for *all* elements (unrolled),
    /// which lets the optimizer merge fixed reads across element boundaries.
    ConstantArray {
        size: usize,
        length: u32,
        subcommands: Vec<Command>,
    },

    /// A variable-length array. `subcommands` holds the program for a single
    /// element and is dispatched once per element after the length is read
    /// from the input.
    DynamicArray {
        size: usize,
        subcommands: Vec<Command>,
    },
}

/// Fieldless mirror of [`CommandKind`] produced by
/// [`Definition::flatten_commands`](crate::Definition::flatten_commands).
///
/// Discriminants are part of the public contract; `tag as i32` is stable
/// for consumers that index commands numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTag {
    FixedRead = 0,
    StringRead = 1,
    DynamicRead = 2,
    ConstantArray = 3,
    DynamicArray = 4,
}

impl Command {
    pub fn tag(&self) -> CommandTag {
        match self.kind {
            CommandKind::FixedRead { .. } => CommandTag::FixedRead,
            CommandKind::StringRead => CommandTag::StringRead,
            CommandKind::DynamicRead { .. } => CommandTag::DynamicRead,
            CommandKind::ConstantArray { .. } => CommandTag::ConstantArray,
            CommandKind::DynamicArray { .. } => CommandTag::DynamicArray,
        }
    }

    pub fn subcommands(&self) -> &[Command] {
        match &self.kind {
            CommandKind::ConstantArray { subcommands, .. }
            | CommandKind::DynamicArray { subcommands, .. } => subcommands,
            _ => &[],
        }
    }
}

/// Pre-order traversal of command tags, children after their parent.
pub(crate) fn flatten(out: &mut Vec<CommandTag>, cmds: &[Command]) {
    for cmd in cmds {
        out.push(cmd.tag());
        flatten(out, cmd.subcommands());
    }
}
