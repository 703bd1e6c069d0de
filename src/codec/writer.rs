use super::CodecError;

/// Bounds-checked writer over a caller-provided fixed buffer.
pub struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn put(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let end = self
            .pos
            .checked_add(bytes.len())
            .filter(|&end| end <= self.buf.len())
            .ok_or(CodecError::BufferOverflow {
                capacity: self.buf.len(),
                needed: self.pos.saturating_add(bytes.len()),
            })?;
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    pub fn put_u8(&mut self, b: u8) -> Result<(), CodecError> {
        self.put(&[b])
    }

    pub fn put_u16_be(&mut self, v: u16) -> Result<(), CodecError> {
        self.put(&v.to_be_bytes())
    }

    pub fn put_u32_be(&mut self, v: u32) -> Result<(), CodecError> {
        self.put(&v.to_be_bytes())
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the written prefix, for variable-length output.
    pub fn into_written(self) -> &'a [u8] {
        let Self { buf, pos } = self;
        let buf: &'a [u8] = buf;
        &buf[..pos]
    }

    /// Returns the written prefix. Errors unless the buffer was filled exactly.
    pub fn finish(self) -> Result<&'a [u8], CodecError> {
        let Self { buf, pos } = self;
        if pos != buf.len() {
            return Err(CodecError::Incomplete {
                expected: buf.len(),
                written: pos,
            });
        }
        let buf: &'a [u8] = buf;
        Ok(&buf[..pos])
    }
}
