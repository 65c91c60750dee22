//! Content-type sniffing from the leading bytes of a resource.

use crate::streaming::decompress::ContentType;

/// Number of leading bytes inspected when sniffing a remote resource
pub const SNIFF_LEN: usize = 261;

/// Identify a compressed stream by its magic bytes.
pub fn detect_content_type(prefix: &[u8]) -> Option<ContentType> {
    match prefix {
        [0x1F, 0x8B, ..] => Some(ContentType::Gzip),
        [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, ..] => Some(ContentType::Xz),
        [0x42, 0x5A, 0x68, ..] => Some(ContentType::Bzip2),
        [0x28, 0xB5, 0x2F, 0xFD, ..] => Some(ContentType::Zstd),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_gzip() {
        assert_eq!(
            detect_content_type(&[0x1F, 0x8B, 0x08, 0x00]),
            Some(ContentType::Gzip)
        );
    }

    #[test]
    fn detect_xz() {
        let header = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x00, 0x04];
        assert_eq!(detect_content_type(&header), Some(ContentType::Xz));
    }

    #[test]
    fn detect_bzip2() {
        assert_eq!(detect_content_type(b"BZh91AY&SY"), Some(ContentType::Bzip2));
    }

    #[test]
    fn detect_zstd() {
        let header = [0x28, 0xB5, 0x2F, 0xFD, 0x24, 0x00];
        assert_eq!(detect_content_type(&header), Some(ContentType::Zstd));
    }

    #[test]
    fn detect_unknown() {
        assert_eq!(detect_content_type(&[0xDE, 0xAD, 0xBE, 0xEF]), None);
        assert_eq!(detect_content_type(&[]), None);
    }

    #[test]
    fn detect_truncated_xz_magic() {
        assert_eq!(detect_content_type(&[0xFD, 0x37, 0x7A]), None);
    }
}
