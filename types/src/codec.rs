use bytes::{Buf, BufMut};
use commonware_codec::{Error, ReadExt, Write};

/// Write a string as length-prefixed UTF-8 bytes.
pub fn write_string(s: &str, writer: &mut impl BufMut) {
    (s.len() as u32).write(writer);
    writer.put_slice(s.as_bytes());
}

/// Read a length-prefixed UTF-8 string, rejecting anything over `max_len`.
pub fn read_string(reader: &mut impl Buf, max_len: usize) -> Result<String, Error> {
    let len = u32::read(reader)? as usize;
    if len > max_len {
        return Err(Error::Invalid("String", "too long"));
    }
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| Error::Invalid("String", "invalid UTF-8"))
}

/// Encoded size of a length-prefixed string.
pub fn string_encode_size(s: &str) -> usize {
    4 + s.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn read_string_rejects_too_long() {
        let mut buf = BytesMut::new();
        write_string("hello", &mut buf);

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 4).expect_err("should reject too-long string");
        assert!(matches!(err, Error::Invalid("String", "too long")));
    }

    #[test]
    fn read_string_rejects_truncated_buffers() {
        let mut buf = BytesMut::new();
        (10u32).write(&mut buf);
        buf.extend_from_slice(b"short");

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 64).expect_err("should reject truncated buffer");
        assert!(matches!(err, Error::EndOfBuffer));
    }

    #[test]
    fn string_round_trip() {
        let mut buf = BytesMut::new();
        write_string("Deadline processed", &mut buf);
        assert_eq!(buf.len(), string_encode_size("Deadline processed"));

        let mut reader = buf.as_ref();
        let out = read_string(&mut reader, 64).expect("read back");
        assert_eq!(out, "Deadline processed");
    }
}
