use super::snapshot::{GameSnapshot, SnapshotError};

const MAGIC: &[u8; 4] = b"A2S1"; // ASCII magic
const VERSION: u8 = 1;
// 4 magic + 1 version + 4 payload length
const HEADER_LEN: usize = 4 + 1 + 4;
const TRAILER_LEN: usize = 4;

#[derive(thiserror::Error, Debug)]
pub enum BinaryError {
    #[error("invalid magic or version")]
    MagicOrVersion,
    #[error("file too short or malformed")]
    Malformed,
    #[error("checksum mismatch")]
    Checksum,
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

#[inline]
fn read_u32_le(bytes: &[u8]) -> Option<u32> {
    let head: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(head))
}

/// Encode a snapshot as `magic | version | payload_len | postcard payload | crc32c`.
///
/// The checksum covers every byte before it.
pub fn encode_snapshot(snapshot: &GameSnapshot) -> Result<Vec<u8>, BinaryError> {
    let payload = postcard::to_allocvec(snapshot)?;
    let payload_len: u32 = payload.len().try_into().map_err(|_| BinaryError::Malformed)?;

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len() + TRAILER_LEN);
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&payload);

    let checksum = crc32c::crc32c(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    Ok(buf)
}

/// Decode and validate a snapshot produced by [`encode_snapshot`].
pub fn decode_snapshot(bytes: &[u8]) -> Result<GameSnapshot, BinaryError> {
    if bytes.len() < HEADER_LEN + TRAILER_LEN {
        return Err(BinaryError::Malformed);
    }

    // Checksum first so a damaged header never gets interpreted
    let (content, trailer) = bytes.split_at(bytes.len() - TRAILER_LEN);
    let file_crc = read_u32_le(trailer).ok_or(BinaryError::Malformed)?;
    if file_crc != crc32c::crc32c(content) {
        return Err(BinaryError::Checksum);
    }

    if &content[..4] != MAGIC || content[4] != VERSION {
        return Err(BinaryError::MagicOrVersion);
    }
    let payload_len = read_u32_le(&content[5..]).ok_or(BinaryError::Malformed)? as usize;
    let payload = &content[HEADER_LEN..];
    if payload.len() != payload_len {
        return Err(BinaryError::Malformed);
    }

    let snapshot: GameSnapshot = postcard::from_bytes(payload)?;
    snapshot.validate()?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::GridSnapshot;

    fn snapshot() -> GameSnapshot {
        GameSnapshot {
            remaining_lives: 1,
            grid_width: 2,
            grid_height: 2,
            goal: 32,
            player_name: String::new(),
            accepted_spawnables: vec![2, 4],
            max_undos: 2,
            undo_chain: vec![
                GridSnapshot { cells: vec![vec![4, 2], vec![0, 0]], score: 4 },
                GridSnapshot { cells: vec![vec![2, 2], vec![0, 2]], score: 0 },
            ],
        }
    }

    #[test]
    fn round_trip_small() {
        let bytes = encode_snapshot(&snapshot()).unwrap();
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(decode_snapshot(&bytes).unwrap(), snapshot());
    }

    #[test]
    fn checksum_mismatch() {
        let mut bytes = encode_snapshot(&snapshot()).unwrap();
        bytes[HEADER_LEN] ^= 0xFF;
        assert!(matches!(decode_snapshot(&bytes), Err(BinaryError::Checksum)));
    }

    #[test]
    fn malformed_bounds() {
        let mut bytes = encode_snapshot(&snapshot()).unwrap();
        bytes.truncate(bytes.len() - 5);
        assert!(decode_snapshot(&bytes).is_err());
        assert!(matches!(decode_snapshot(&bytes[..6]), Err(BinaryError::Malformed)));
    }

    #[test]
    fn wrong_version() {
        let mut bytes = encode_snapshot(&snapshot()).unwrap();
        bytes[4] = VERSION + 1;
        let body = bytes.len() - TRAILER_LEN;
        let crc = crc32c::crc32c(&bytes[..body]);
        bytes[body..].copy_from_slice(&crc.to_le_bytes());
        assert!(matches!(decode_snapshot(&bytes), Err(BinaryError::MagicOrVersion)));
    }

    #[test]
    fn invalid_content_is_rejected() {
        let bad = GameSnapshot { max_undos: 1, ..snapshot() };
        let bytes = encode_snapshot(&bad).unwrap();
        assert!(matches!(decode_snapshot(&bytes), Err(BinaryError::Snapshot(_))));
    }
}
