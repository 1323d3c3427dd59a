//! Positional reader over an input message buffer.

use bytes::Buf;

use crate::error::WriteError;

/// Cursor over the raw bytes of one input message. All multi-byte reads use
/// host byte order; under-runs fail without advancing the cursor.
pub(crate) struct DataReader<'a> {
    buf: &'a [u8],
}

impl<'a> DataReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Reads the u32 length prefix of a string or dynamic array.
    pub(crate) fn read_length(&mut self, label: &str) -> Result<u32, WriteError> {
        let needed = std::mem::size_of::<u32>();
        if self.buf.remaining() < needed {
            return Err(WriteError::InputUnderrun {
                label: label.to_string(),
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(self.buf.get_u32_ne())
    }

    /// Copies exactly `dst.len()` bytes from the input into `dst`.
    pub(crate) fn read(&mut self, dst: &mut [u8], label: &str) -> Result<(), WriteError> {
        if self.buf.remaining() < dst.len() {
            return Err(WriteError::InputUnderrun {
                label: label.to_string(),
                needed: dst.len(),
                remaining: self.buf.remaining(),
            });
        }
        self.buf.copy_to_slice(dst);
        Ok(())
    }
}
