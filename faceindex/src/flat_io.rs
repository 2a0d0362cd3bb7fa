use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};

use crate::error::IndexError;
use crate::flat::FlatIndex;

const FLAT_MAGIC: [u8; 4] = [b'F', b'L', b'A', b'T'];
const FLAT_VERSION: u32 = 1;

/// Save serializes the vectors of a FlatIndex.
///
/// ```text
/// [4B magic "FLAT"] [4B version=1] [4B dim] [4B count]
/// [count x dim x 4B float32 vector data]
/// ```
///
/// All multi-byte values are little-endian. Identities are not written:
/// the student store is authoritative for them.
pub fn save(index: &FlatIndex, w: &mut dyn Write) -> Result<(), IndexError> {
    let mut bw = BufWriter::new(w);

    bw.write_all(&FLAT_MAGIC)?;
    bw.write_all(&FLAT_VERSION.to_le_bytes())?;
    bw.write_all(&(index.dim() as u32).to_le_bytes())?;
    bw.write_all(&(index.len() as u32).to_le_bytes())?;

    for vector in index.vectors() {
        for &v in vector {
            bw.write_all(&v.to_le_bytes())?;
        }
    }

    bw.flush()?;
    Ok(())
}

/// Load deserializes vectors written by [`save`].
///
/// The header width must equal `want_dim`; any other width is
/// [`IndexError::DimensionMismatch`], reported before the body is read.
/// The returned index has no identities; every entry is unmapped until the
/// course is rebuilt from the student store.
pub fn load(r: &mut dyn Read, want_dim: usize) -> Result<FlatIndex, IndexError> {
    let mut br = BufReader::new(r);

    let mut magic = [0u8; 4];
    read_exact(&mut br, &mut magic)?;
    if magic != FLAT_MAGIC {
        return Err(IndexError::InvalidFormat(format!("invalid magic {magic:?}")));
    }

    let version = read_u32(&mut br)?;
    if version != FLAT_VERSION {
        return Err(IndexError::InvalidFormat(format!(
            "unsupported version {version} (want {FLAT_VERSION})"
        )));
    }

    let dim = read_u32(&mut br)? as usize;
    if dim == 0 {
        return Err(IndexError::InvalidFormat("invalid dimension 0".into()));
    }
    if dim != want_dim {
        return Err(IndexError::DimensionMismatch {
            got: dim,
            want: want_dim,
        });
    }
    let count = read_u32(&mut br)? as usize;

    let mut vectors = Vec::with_capacity(count.min(1 << 16));
    let mut raw = vec![0u8; dim * 4];
    for _ in 0..count {
        read_exact(&mut br, &mut raw)?;
        let vector: Vec<f32> = raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        vectors.push(vector);
    }

    let mut trailing = [0u8; 1];
    if br.read(&mut trailing)? != 0 {
        return Err(IndexError::InvalidFormat("trailing bytes after vectors".into()));
    }

    Ok(FlatIndex::from_vectors(dim, vectors))
}

/// Encode an index into an in-memory blob.
pub fn encode(index: &FlatIndex) -> Result<Vec<u8>, IndexError> {
    let mut buf = Vec::with_capacity(16 + index.len() * index.dim() * 4);
    save(index, &mut buf)?;
    Ok(buf)
}

/// Decode an index of width `want_dim` from an in-memory blob.
pub fn decode(mut blob: &[u8], want_dim: usize) -> Result<FlatIndex, IndexError> {
    load(&mut blob, want_dim)
}

fn read_exact(br: &mut impl Read, buf: &mut [u8]) -> Result<(), IndexError> {
    br.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => IndexError::InvalidFormat("truncated data".into()),
        _ => IndexError::Io(e.to_string()),
    })
}

fn read_u32(br: &mut impl Read) -> Result<u32, IndexError> {
    let mut buf = [0u8; 4];
    read_exact(br, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat::StudentRef;

    fn sample() -> FlatIndex {
        let mut idx = FlatIndex::new(3);
        let ada = StudentRef {
            student_id: 1234,
            name: "Ada".into(),
        };
        idx.add(&[1.0, 0.0, 0.0], Some(ada)).unwrap();
        idx.add(&[0.0, -2.5, 0.5], None).unwrap();
        idx
    }

    #[test]
    fn test_save_load() {
        let idx = sample();
        let blob = encode(&idx).unwrap();
        assert_eq!(blob.len(), 16 + 2 * 3 * 4);

        let loaded = decode(&blob, 3).unwrap();
        assert_eq!(loaded.dim(), 3);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.vector(1), idx.vector(1));

        // Identities are not part of the blob.
        assert!(!loaded.is_mapped());
        assert!(loaded.student(0).is_none());

        let q = [0.5, 0.5, 0.5];
        let a = idx.search(&q, 2).unwrap();
        let b = loaded.search(&q, 2).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.position, y.position);
            assert_eq!(x.distance, y.distance);
        }
    }

    #[test]
    fn test_vectors_are_little_endian_f32() {
        let mut idx = FlatIndex::new(1);
        idx.add(&[1.5], None).unwrap();
        let blob = encode(&idx).unwrap();
        assert_eq!(&blob[16..20], &1.5f32.to_le_bytes());
    }

    #[test]
    fn test_save_load_empty() {
        let blob = encode(&FlatIndex::new(8)).unwrap();
        let loaded = decode(&blob, 8).unwrap();
        assert_eq!(loaded.dim(), 8);
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_invalid_magic() {
        assert!(matches!(
            decode(b"NOPE\x01\x00\x00\x00", 3),
            Err(IndexError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_load_truncated() {
        let blob = encode(&sample()).unwrap();
        let err = decode(&blob[..blob.len() - 2], 3).err().unwrap();
        assert!(matches!(err, IndexError::InvalidFormat(_)));
    }

    fn header(dim: u32, count: u32) -> Vec<u8> {
        let mut blob = FLAT_MAGIC.to_vec();
        blob.extend_from_slice(&FLAT_VERSION.to_le_bytes());
        blob.extend_from_slice(&dim.to_le_bytes());
        blob.extend_from_slice(&count.to_le_bytes());
        blob
    }

    #[test]
    fn test_load_huge_dim_header() {
        let err = decode(&header(u32::MAX, 1), 3).err().unwrap();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch { got, want: 3 } if got == u32::MAX as usize
        ));
    }

    #[test]
    fn test_load_wrong_dim_before_body() {
        let err = decode(&header(8, 3), 3).err().unwrap();
        assert!(matches!(err, IndexError::DimensionMismatch { got: 8, want: 3 }));

        // Matching width with a missing body is a format error.
        let err = decode(&header(3, 3), 3).err().unwrap();
        assert!(matches!(err, IndexError::InvalidFormat(_)));
    }

    #[test]
    fn test_load_huge_count_header() {
        let err = decode(&header(3, u32::MAX), 3).err().unwrap();
        assert!(matches!(err, IndexError::InvalidFormat(_)));
    }

    #[test]
    fn test_load_trailing_bytes() {
        let mut blob = encode(&sample()).unwrap();
        blob.push(0);
        assert!(decode(&blob, 3).is_err());
    }
}
