//! Superseded key retention.
//!
//! Rotation replaces the active key, but data encrypted under the outgoing
//! key stays readable only if that key survives somewhere. The retired list
//! keeps the newest few keys, tagged by version, so a consumer can decrypt
//! with the old key and re-encrypt with the new one.
//!
//! The list is a single store entry: CBOR, then base64 (the store holds
//! strings).

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    key::{KEY_LEN, KeyMaterial},
    store::StoreError,
};

/// A superseded key kept for migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetiredKey {
    /// Version the key was active as.
    pub version: u32,
    /// When it was superseded (milliseconds since the Unix epoch).
    pub retired_at_millis: u64,
    /// The key itself.
    pub material: KeyMaterial,
}

#[derive(Serialize, Deserialize)]
struct RetiredRecord {
    version: u32,
    retired_at_millis: u64,
    material: Vec<u8>,
}

/// Push `key` to the front of `retired`, keeping at most `capacity` entries.
///
/// The first key retired under a version wins. A rotation that failed part
/// way can leave an unissued key in the active slot under the old version;
/// retrying must not let that key displace the one that was really in use.
pub(crate) fn push_retired(retired: &mut Vec<RetiredKey>, key: RetiredKey, capacity: usize) {
    if retired.iter().any(|existing| existing.version == key.version) {
        retired.truncate(capacity);
        return;
    }
    retired.insert(0, key);
    retired.truncate(capacity);
}

pub(crate) fn encode_retired(retired: &[RetiredKey]) -> Result<Zeroizing<String>, StoreError> {
    let records: Vec<RetiredRecord> = retired
        .iter()
        .map(|key| RetiredRecord {
            version: key.version,
            retired_at_millis: key.retired_at_millis,
            material: key.material.as_bytes().to_vec(),
        })
        .collect();

    let mut bytes = Zeroizing::new(Vec::<u8>::new());
    let written = ciborium::into_writer(&records, &mut *bytes);
    scrub(records);
    written.map_err(|e| StoreError::Serialization(e.to_string()))?;

    Ok(Zeroizing::new(STANDARD.encode(bytes.as_slice())))
}

pub(crate) fn decode_retired(encoded: &str) -> Result<Vec<RetiredKey>, StoreError> {
    let bytes = Zeroizing::new(
        STANDARD.decode(encoded.trim()).map_err(|e| StoreError::Serialization(e.to_string()))?,
    );

    let records: Vec<RetiredRecord> = ciborium::from_reader(bytes.as_slice())
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    let mut retired = Vec::with_capacity(records.len());
    let mut malformed = false;
    for record in &records {
        match <[u8; KEY_LEN]>::try_from(record.material.as_slice()) {
            Ok(material) => retired.push(RetiredKey {
                version: record.version,
                retired_at_millis: record.retired_at_millis,
                material: KeyMaterial::from_bytes(material),
            }),
            Err(_) => malformed = true,
        }
    }
    scrub(records);

    if malformed {
        return Err(StoreError::Serialization("retired key has wrong length".to_string()));
    }
    Ok(retired)
}

fn scrub(records: Vec<RetiredRecord>) {
    for record in records {
        drop(Zeroizing::new(record.material));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retired(version: u32, fill: u8) -> RetiredKey {
        RetiredKey {
            version,
            retired_at_millis: u64::from(version) * 1000,
            material: KeyMaterial::from_bytes([fill; KEY_LEN]),
        }
    }

    #[test]
    fn push_keeps_newest_first_within_capacity() {
        let mut list = Vec::new();
        push_retired(&mut list, retired(1, 1), 2);
        push_retired(&mut list, retired(2, 2), 2);
        push_retired(&mut list, retired(3, 3), 2);

        let versions: Vec<u32> = list.iter().map(|k| k.version).collect();
        assert_eq!(versions, vec![3, 2]);
    }

    #[test]
    fn push_keeps_first_key_for_a_version() {
        let mut list = vec![retired(4, 1)];
        push_retired(&mut list, retired(4, 9), 3);

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].material.as_bytes()[0], 1);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut list = Vec::new();
        push_retired(&mut list, retired(1, 1), 0);
        assert!(list.is_empty());
    }

    #[test]
    fn encoded_list_decodes_to_same_keys() {
        let list = vec![retired(3, 3), retired(2, 2)];
        let encoded = encode_retired(&list).unwrap();

        assert_eq!(decode_retired(&encoded).unwrap(), list);
    }

    #[test]
    fn corrupt_list_is_serialization_error() {
        assert!(matches!(decode_retired("@@@"), Err(StoreError::Serialization(_))));

        let not_cbor = STANDARD.encode(b"\xff\xff");
        assert!(matches!(decode_retired(&not_cbor), Err(StoreError::Serialization(_))));
    }
}
