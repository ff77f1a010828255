use std::io::{Read, Result, Seek, SeekFrom, Write};

/// A seekable byte source and sink.
///
/// Implemented for every `Read + Write + Seek` type, such as
/// `std::io::Cursor<Vec<u8>>` or `std::fs::File`.
pub trait GenericStream: Read + Write + Seek {
    /// Total length of the stream. The position is left unchanged.
    fn length(&mut self) -> Result<u64> {
        let position = self.stream_position()?;
        let length = self.seek(SeekFrom::End(0))?;
        if position != length {
            self.seek(SeekFrom::Start(position))?;
        }
        Ok(length)
    }
}

impl<T: Read + Write + Seek + ?Sized> GenericStream for T {}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Seek, SeekFrom};

    use super::GenericStream;

    #[test]
    fn length_keeps_the_position() {
        let mut stream = Cursor::new(vec![1_u8, 2, 3, 4]);
        stream.seek(SeekFrom::Start(1)).unwrap();
        assert_eq!(stream.length().unwrap(), 4);
        assert_eq!(stream.stream_position().unwrap(), 1);
    }
}
