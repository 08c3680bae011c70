//! PDF header sniffing.
//!
//! Guards the file and byte entry points: anything that does not start with
//! a plausible `%PDF-x.y` header is rejected before the engine is involved.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Sniff a byte slice for a PDF header and return the declared version
/// (e.g. `"1.7"`).
pub fn sniff_bytes(data: &[u8]) -> Result<String> {
    let version_end = PDF_MAGIC.len() + 3;
    if data.len() < version_end || !data.starts_with(PDF_MAGIC) {
        return Err(Error::UnknownFormat);
    }

    let version = String::from_utf8_lossy(&data[PDF_MAGIC.len()..version_end]).to_string();
    let bytes = version.as_bytes();
    if bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit() {
        Ok(version)
    } else {
        Err(Error::UnsupportedVersion(version))
    }
}

/// Sniff the header of a file on disk.
pub fn sniff_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut header = [0u8; 16];
    let file = File::open(path)?;
    let n = read_header(file, &mut header)?;
    sniff_bytes(&header[..n])
}

/// Fill `buf` from the reader until it is full or the reader hits EOF.
/// A single `read` call may legally return fewer bytes than remain.
fn read_header<R: Read>(mut reader: R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_valid_header() {
        assert_eq!(sniff_bytes(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3").unwrap(), "1.4");
        assert_eq!(sniff_bytes(b"%PDF-2.0\n").unwrap(), "2.0");
    }

    #[test]
    fn test_sniff_not_a_pdf() {
        assert!(matches!(
            sniff_bytes(b"<!DOCTYPE html>"),
            Err(Error::UnknownFormat)
        ));
        assert!(matches!(sniff_bytes(b""), Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_sniff_truncated_header() {
        assert!(matches!(sniff_bytes(b"%PDF"), Err(Error::UnknownFormat)));
    }

    /// Reader that hands out one byte per `read` call.
    struct DribbleReader<'a>(&'a [u8]);

    impl Read for DribbleReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    #[test]
    fn test_read_header_tolerates_short_reads() {
        let mut header = [0u8; 16];
        let n = read_header(DribbleReader(b"%PDF-1.7\n%binary"), &mut header).unwrap();
        assert_eq!(n, 16);
        assert_eq!(sniff_bytes(&header[..n]).unwrap(), "1.7");
    }

    #[test]
    fn test_read_header_stops_at_eof() {
        let mut header = [0u8; 16];
        let n = read_header(DribbleReader(b"%PDF-1.4"), &mut header).unwrap();
        assert_eq!(n, 8);
        assert_eq!(sniff_bytes(&header[..n]).unwrap(), "1.4");
    }

    #[test]
    fn test_sniff_garbage_version() {
        assert!(matches!(
            sniff_bytes(b"%PDF-abc\n"),
            Err(Error::UnsupportedVersion(_))
        ));
    }
}
