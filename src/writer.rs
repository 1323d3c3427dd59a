//! Message translation: dispatching compiled commands into the two arenas.

use crate::{
    command::{Command, CommandKind},
    definition::{Definition, OFFSET_PAIR_SIZE},
    error::WriteError,
    reader::DataReader,
};

/// Over-reservation factor applied to the summed input byte length when
/// sizing the arenas up front. Tunable; exceeding the reservation triggers
/// normal growth, never an error.
const DATA_RESERVE_FACTOR: usize = 4;

/// Which arena a window points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arena {
    Data,
    Strings,
}

/// A half-open byte range `[next, end)` inside an arena, with `next` doubling
/// as the write cursor.
///
/// Windows hold indices, never slices: a child allocation can reallocate the
/// buffer that hosts the parent's window, so the backing memory is
/// re-resolved against the arena at every write.
#[derive(Debug, Clone, Copy)]
struct Window {
    arena: Arena,
    next: usize,
    end: usize,
}

/// Translated batch output: per-message record offsets plus the two arenas.
#[derive(Debug)]
pub struct TranslatedMessages {
    /// Byte offset of each message's record within `data`, in input order.
    pub offsets: Vec<u32>,
    pub data: Vec<u8>,
    pub strings: Vec<u8>,
}

/// Executes compiled definitions against raw input messages, appending
/// records to a data arena and blob bodies to a string arena.
///
/// Offsets returned by [`write`](Self::write) and the `(count, offset)`
/// pairs embedded in records stay valid for the writer's lifetime; arenas
/// only ever append.
#[derive(Default)]
pub struct MessageWriter {
    data: Vec<u8>,
    strings: Vec<u8>,
}

impl MessageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record arena: fixed-layout record data plus dynamic array storage.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The string arena: concatenated string and blob bodies.
    pub fn strings(&self) -> &[u8] {
        &self.strings
    }

    /// Hands off both arenas, consuming the writer.
    pub fn into_arenas(self) -> (Vec<u8>, Vec<u8>) {
        (self.data, self.strings)
    }

    /// Grows arena capacity ahead of a batch of `message_count` messages
    /// totalling `total_bytes` of input. Advisory: writes beyond the
    /// reservation succeed through normal growth.
    pub fn reserve(
        &mut self,
        definition: &Definition,
        message_count: usize,
        total_bytes: usize,
    ) -> Result<(), WriteError> {
        if !definition.is_valid() {
            return Err(WriteError::InvalidDefinition {
                name: definition.name().to_string(),
            });
        }

        // Records have a constant size, so their share is exact. Dynamic
        // data is estimated from the input length.
        let record_bytes = message_count * definition.size();
        let dynamic_bytes = DATA_RESERVE_FACTOR * total_bytes;
        self.data.reserve(record_bytes + dynamic_bytes);
        self.strings.reserve(dynamic_bytes);
        Ok(())
    }

    /// Translates one input message, returning the byte offset of its record
    /// in the data arena.
    ///
    /// On failure the arenas may contain bytes appended before the error;
    /// they are meaningless without the offset and should be discarded with
    /// the writer.
    pub fn write(&mut self, definition: &Definition, input: &[u8]) -> Result<u32, WriteError> {
        if !definition.is_valid() {
            return Err(WriteError::InvalidDefinition {
                name: definition.name().to_string(),
            });
        }

        let offset = self.data.len();
        let mut dst = self.allocate(Arena::Data, definition.size());
        let mut src = DataReader::new(input);
        self.dispatch(definition.commands(), &mut src, &mut dst)?;
        Ok(offset as u32)
    }

    /// Translates a batch: reserves capacity from the summed input lengths,
    /// then writes each message, collecting record offsets in input order.
    pub fn write_batch(
        &mut self,
        definition: &Definition,
        messages: &[&[u8]],
    ) -> Result<Vec<u32>, WriteError> {
        let total_bytes = messages.iter().map(|m| m.len()).sum();
        self.reserve(definition, messages.len(), total_bytes)?;
        messages
            .iter()
            .map(|message| self.write(definition, message))
            .collect()
    }

    fn dispatch(
        &mut self,
        commands: &[Command],
        src: &mut DataReader<'_>,
        dst: &mut Window,
    ) -> Result<(), WriteError> {
        for cmd in commands {
            match &cmd.kind {
                CommandKind::FixedRead { size } => {
                    self.copy_from_input(src, dst, *size, &cmd.label)?;
                }
                CommandKind::StringRead => {
                    self.read_dynamic(src, dst, Arena::Strings, 1, &cmd.label)?;
                }
                CommandKind::DynamicRead { size } => {
                    self.read_dynamic(src, dst, Arena::Data, *size, &cmd.label)?;
                }
                CommandKind::ConstantArray {
                    size,
                    length,
                    subcommands,
                } => {
                    let mut child = self.allocate(Arena::Data, *length as usize * size);
                    self.write_offset_pair(dst, *length, child.next as u32, &cmd.label)?;
                    if *length > 0 {
                        self.dispatch(subcommands, src, &mut child)?;
                    }
                }
                CommandKind::DynamicArray { size, subcommands } => {
                    let length = src.read_length(&cmd.label)?;
                    let mut child = self.allocate(Arena::Data, length as usize * size);
                    self.write_offset_pair(dst, length, child.next as u32, &cmd.label)?;
                    for _ in 0..length {
                        self.dispatch(subcommands, src, &mut child)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Shared path for strings and dynamic fixed-size data: read the count,
    /// carve a window in `arena`, link it from `dst`, and bulk-copy the
    /// payload.
    fn read_dynamic(
        &mut self,
        src: &mut DataReader<'_>,
        dst: &mut Window,
        arena: Arena,
        elem_size: usize,
        label: &str,
    ) -> Result<(), WriteError> {
        let count = src.read_length(label)?;
        let payload = count as usize * elem_size;
        let mut window = self.allocate(arena, payload);
        self.write_offset_pair(dst, count, window.next as u32, label)?;
        if count > 0 {
            self.copy_from_input(src, &mut window, payload, label)?;
        }
        Ok(())
    }

    /// Appends `n` zeroed bytes to an arena and returns the window over them.
    /// Zero-size allocations produce an empty window with no growth.
    fn allocate(&mut self, arena: Arena, n: usize) -> Window {
        let buf = self.arena_mut(arena);
        let begin = buf.len();
        if n > 0 {
            buf.resize(begin + n, 0);
        }
        Window {
            arena,
            next: begin,
            end: begin + n,
        }
    }

    fn arena_mut(&mut self, arena: Arena) -> &mut Vec<u8> {
        match arena {
            Arena::Data => &mut self.data,
            Arena::Strings => &mut self.strings,
        }
    }

    fn copy_from_input(
        &mut self,
        src: &mut DataReader<'_>,
        dst: &mut Window,
        size: usize,
        label: &str,
    ) -> Result<(), WriteError> {
        if dst.next + size > dst.end {
            return Err(WriteError::WindowOverflow {
                label: label.to_string(),
                size,
                remaining: dst.end - dst.next,
            });
        }
        let buf = self.arena_mut(dst.arena);
        src.read(&mut buf[dst.next..dst.next + size], label)?;
        dst.next += size;
        Ok(())
    }

    /// Writes the 8-byte `(count, offset)` pair linking a record slot to its
    /// side allocation. Host byte order, count first.
    fn write_offset_pair(
        &mut self,
        dst: &mut Window,
        count: u32,
        offset: u32,
        label: &str,
    ) -> Result<(), WriteError> {
        if dst.next + OFFSET_PAIR_SIZE > dst.end {
            return Err(WriteError::WindowOverflow {
                label: label.to_string(),
                size: OFFSET_PAIR_SIZE,
                remaining: dst.end - dst.next,
            });
        }
        let buf = self.arena_mut(dst.arena);
        buf[dst.next..dst.next + 4].copy_from_slice(&count.to_ne_bytes());
        buf[dst.next + 4..dst.next + 8].copy_from_slice(&offset.to_ne_bytes());
        dst.next += OFFSET_PAIR_SIZE;
        Ok(())
    }
}

/// One-shot translation of a message batch through a fresh writer.
pub fn translate_messages(
    definition: &Definition,
    messages: &[&[u8]],
) -> Result<TranslatedMessages, WriteError> {
    let mut writer = MessageWriter::new();
    let offsets = writer.write_batch(definition, messages)?;
    let (data, strings) = writer.into_arenas();
    Ok(TranslatedMessages {
        offsets,
        data,
        strings,
    })
}
