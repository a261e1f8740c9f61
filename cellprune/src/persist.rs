//! マジックバイト付きrkyvアーカイブの読み書き。
//!
//! ファイルは「マジックバイト」「16バイト境界までのパディング」「rkyvアーカイブ」の順に並びます。
//! 読み込み時はアーカイブ部分をアライメント済みバッファに複製してから検証します。

use std::io::{Read, Write};

use rkyv::api::high::{HighDeserializer, HighSerializer, HighValidator};
use rkyv::bytecheck::CheckBytes;
use rkyv::rancor::Error;
use rkyv::ser::allocator::ArenaHandle;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::{CellpruneError, Result};

const RKYV_ALIGNMENT: usize = 16;

const fn padding_len(magic_len: usize) -> usize {
    (RKYV_ALIGNMENT - (magic_len % RKYV_ALIGNMENT)) % RKYV_ALIGNMENT
}

/// `value` をマジックバイトに続けて書き込みます。
pub(crate) fn write_archive<T, W>(mut wtr: W, magic: &[u8], value: &T) -> Result<()>
where
    T: for<'a> Serialize<HighSerializer<AlignedVec, ArenaHandle<'a>, Error>>,
    W: Write,
{
    let bytes = rkyv::to_bytes::<Error>(value).map_err(|e| {
        CellpruneError::invalid_state("rkyv serialization failed".to_string(), e.to_string())
    })?;

    wtr.write_all(magic)?;
    wtr.write_all(&vec![0xFF; padding_len(magic.len())])?;
    wtr.write_all(&bytes)?;
    wtr.flush()?;

    Ok(())
}

/// マジックバイトを検証し、続くアーカイブを復元します。
pub(crate) fn read_archive<T, R>(mut rdr: R, magic: &[u8]) -> Result<T>
where
    T: Archive,
    T::Archived: for<'a> CheckBytes<HighValidator<'a, Error>> + Deserialize<T, HighDeserializer<Error>>,
    R: Read,
{
    let mut header = vec![0; magic.len()];
    rdr.read_exact(&mut header)?;
    if header != magic {
        return Err(CellpruneError::invalid_argument(
            "rdr",
            "The magic number of the input model mismatches.",
        ));
    }

    let mut padding_buf = vec![0; padding_len(magic.len())];
    rdr.read_exact(&mut padding_buf)?;

    let mut buffer = Vec::new();
    rdr.read_to_end(&mut buffer)?;

    let mut aligned_bytes = AlignedVec::<RKYV_ALIGNMENT>::with_capacity(buffer.len());
    aligned_bytes.extend_from_slice(&buffer);

    rkyv::from_bytes::<T, Error>(&aligned_bytes).map_err(|e| {
        CellpruneError::invalid_state(
            "rkyv deserialization failed. The model file may be corrupted.".to_string(),
            e.to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Archive, Serialize, Deserialize, Debug, PartialEq)]
    struct Sample {
        name: String,
        values: Vec<f32>,
    }

    const MAGIC: &[u8] = b"SampleRkyv 0.1\n";

    #[test]
    fn test_archive_round_trip() {
        let sample = Sample {
            name: "sample".to_string(),
            values: vec![0.5, -1.25],
        };
        let mut buf = vec![];
        write_archive(&mut buf, MAGIC, &sample).unwrap();
        assert!(buf.starts_with(MAGIC));
        assert_eq!(0xFF, buf[MAGIC.len()]);

        let restored: Sample = read_archive(buf.as_slice(), MAGIC).unwrap();
        assert_eq!(sample, restored);
    }

    #[test]
    fn test_magic_mismatch() {
        let sample = Sample {
            name: String::new(),
            values: vec![],
        };
        let mut buf = vec![];
        write_archive(&mut buf, MAGIC, &sample).unwrap();
        let result: Result<Sample> = read_archive(buf.as_slice(), b"OtherRkyv 0.1\n\n");
        assert!(result.is_err());
    }
}
