//! Model artifact header
//!
//! File layout:
//! ```text
//! LZMODEL1
//! [4 bytes: format version u32 little-endian]
//! [8 bytes: payload length u64 little-endian]
//! ...payload...
//! ```

/// Magic bytes at the start of every artifact
pub const ARTIFACT_MAGIC: &[u8] = b"LZMODEL1";

/// The only format version this crate reads
pub const FORMAT_VERSION: u32 = 1;

/// Total header size in bytes
pub const HEADER_LEN: usize = ARTIFACT_MAGIC.len() + 4 + 8;

/// Decoded artifact header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactHeader {
    /// Format version
    pub version: u32,
    /// Number of payload bytes following the header
    pub payload_len: u64,
}

/// Parse an artifact header from the start of `input`
///
/// Returns a human-readable reason on failure; callers attach the path.
pub fn parse_header(input: &[u8]) -> std::result::Result<ArtifactHeader, String> {
    if input.len() < HEADER_LEN {
        return Err(format!(
            "file too short for header: {} bytes (need {})",
            input.len(),
            HEADER_LEN
        ));
    }

    let (magic, rest) = input.split_at(ARTIFACT_MAGIC.len());
    if magic != ARTIFACT_MAGIC {
        return Err("bad magic".to_string());
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&rest[..4]);
    let mut payload_len = [0u8; 8];
    payload_len.copy_from_slice(&rest[4..12]);

    let header = ArtifactHeader {
        version: u32::from_le_bytes(version),
        payload_len: u64::from_le_bytes(payload_len),
    };

    if header.version != FORMAT_VERSION {
        return Err(format!("unsupported format version {}", header.version));
    }

    Ok(header)
}

/// Build a header for a payload of `payload_len` bytes
pub fn create_header(payload_len: u64) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(ARTIFACT_MAGIC);
    header.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    header.extend_from_slice(&payload_len.to_le_bytes());
    header
}

/// Header followed by `payload`, ready to be written to disk
pub fn encode_artifact(payload: &[u8]) -> Vec<u8> {
    let mut bytes = create_header(payload.len() as u64);
    bytes.extend_from_slice(payload);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let header = create_header(42);
        let parsed = parse_header(&header).unwrap();

        assert_eq!(parsed.version, FORMAT_VERSION);
        assert_eq!(parsed.payload_len, 42);
    }

    #[test]
    fn test_parse_header_invalid_magic() {
        let mut header = create_header(0);
        header[0] = b'X';

        let err = parse_header(&header).unwrap_err();
        assert!(err.contains("magic"));
    }

    #[test]
    fn test_parse_header_too_short() {
        assert!(parse_header(b"LZMODEL1").is_err());
    }

    #[test]
    fn test_parse_header_future_version() {
        let mut header = create_header(0);
        header[8..12].copy_from_slice(&7u32.to_le_bytes());

        let err = parse_header(&header).unwrap_err();
        assert!(err.contains("version 7"));
    }

    #[test]
    fn test_encode_artifact_layout() {
        let bytes = encode_artifact(b"weights");

        assert_eq!(bytes.len(), HEADER_LEN + 7);
        assert_eq!(&bytes[..8], ARTIFACT_MAGIC);
        assert_eq!(&bytes[HEADER_LEN..], b"weights");
    }
}
