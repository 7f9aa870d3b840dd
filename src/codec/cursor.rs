//! Bounds-checked little-endian cursors over byte slices

use crate::error::GattError;

/// Reads fields from an input buffer, failing with `Truncated` at the end
pub struct ByteReader<'d> {
    buf: &'d [u8],
    pos: usize,
}

impl<'d> ByteReader<'d> {
    pub fn new(buf: &'d [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn read_u8(&mut self) -> Result<u8, GattError> {
        Ok(self.read_slice(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, GattError> {
        let b = self.read_slice(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, GattError> {
        let b = self.read_slice(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_slice(&mut self, n: usize) -> Result<&'d [u8], GattError> {
        if n > self.remaining() {
            return Err(GattError::Truncated);
        }
        let data = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(data)
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Bytes read so far
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Writes fields into an output buffer, failing with `BufferTooSmall` at the end
pub struct ByteWriter<'d> {
    buf: &'d mut [u8],
    pos: usize,
}

impl<'d> ByteWriter<'d> {
    pub fn new(buf: &'d mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn write_u8(&mut self, val: u8) -> Result<(), GattError> {
        self.append(&[val])
    }

    pub fn write_u16_le(&mut self, val: u16) -> Result<(), GattError> {
        self.append(&val.to_le_bytes())
    }

    pub fn write_u32_le(&mut self, val: u32) -> Result<(), GattError> {
        self.append(&val.to_le_bytes())
    }

    pub fn append(&mut self, data: &[u8]) -> Result<(), GattError> {
        if data.len() > self.buf.len() - self.pos {
            return Err(GattError::BufferTooSmall);
        }
        self.buf[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_little_endian() {
        let mut reader = ByteReader::new(&[0x34, 0x12, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(reader.read_u16_le(), Ok(0x1234));
        assert_eq!(reader.read_u32_le(), Ok(0x1234_5678));
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_reader_stops_at_end() {
        let mut reader = ByteReader::new(&[0x01, 0x02, 0x03]);
        assert_eq!(reader.read_u32_le(), Err(GattError::Truncated));
        // A failed read does not advance
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u8(), Ok(0x01));
    }

    #[test]
    fn test_writer_overflow() {
        let mut buf = [0u8; 3];
        let mut writer = ByteWriter::new(&mut buf);
        writer.write_u16_le(0xBEEF).unwrap();
        assert_eq!(writer.write_u16_le(0x0102), Err(GattError::BufferTooSmall));
        assert_eq!(writer.len(), 2);
        assert_eq!(buf, [0xEF, 0xBE, 0x00]);
    }
}
