use std::io;

/// Writes everything to both writers, used to serialize and checksum in a single pass.
pub struct TeeWriter<'a, A, B> {
    a: &'a mut A,
    b: &'a mut B,
}

impl<'a, A: io::Write, B: io::Write> TeeWriter<'a, A, B> {
    pub fn new(a: &'a mut A, b: &'a mut B) -> Self {
        TeeWriter { a, b }
    }
}

impl<A: io::Write, B: io::Write> io::Write for TeeWriter<'_, A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.a.write_all(buf)?;
        self.b.write_all(buf)?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.a.flush()?;
        self.b.flush()?;
        Ok(())
    }
}

/// Strips leading zero bytes.
#[inline]
pub fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|b| b != &0) {
        Some(offset) => &bytes[offset..],
        None => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_leading_zeros() {
        assert_eq!(strip_leading_zeros(&[0, 0, 1, 2]), &[1, 2][..]);
        assert_eq!(strip_leading_zeros(&[1, 0, 2]), &[1, 0, 2][..]);
        assert_eq!(strip_leading_zeros(&[0, 0, 0]), &[][..]);
    }
}
