// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::LensHashError;
use crate::settings::HASH_SIZE_BYTES;
use std::convert::TryInto;
use std::str::FromStr;

/// Hash wrapper, the underlying hash type is `blake3`
#[derive(Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Hash)]
pub struct Hash([u8; HASH_SIZE_BYTES]);

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl Hash {
    /// Compute a hash from data.
    ///
    /// # Example
    ///  ```
    /// # use lens_hash::Hash;
    /// let hash = Hash::compute_from("hello world".as_bytes());
    /// ```
    pub fn compute_from(data: &[u8]) -> Self {
        Hash(*blake3::hash(data).as_bytes())
    }

    /// Compute a hash from a tuple of byte chunks.
    /// Chunks are length-prefixed before hashing so that
    /// `("ab", "c")` and `("a", "bc")` yield different hashes.
    ///
    /// # Example
    ///  ```
    /// # use lens_hash::Hash;
    /// let hash = Hash::compute_from_tuple(&["hello".as_bytes(), "world".as_bytes()]);
    /// assert_ne!(hash, Hash::compute_from_tuple(&["hell".as_bytes(), "oworld".as_bytes()]));
    /// ```
    pub fn compute_from_tuple(chunks: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for chunk in chunks {
            hasher.update(&(chunk.len() as u64).to_be_bytes());
            hasher.update(chunk);
        }
        Hash(*hasher.finalize().as_bytes())
    }

    /// Serialize a Hash using `bs58` encoding with checksum.
    ///
    /// # Example
    ///  ```
    /// # use lens_hash::Hash;
    /// let hash = Hash::compute_from("hello world".as_bytes());
    /// let serialized: String = hash.to_bs58_check();
    /// ```
    pub fn to_bs58_check(&self) -> String {
        bs58::encode(self.to_bytes()).with_check().into_string()
    }

    /// Serialize a Hash as bytes.
    ///
    /// # Example
    ///  ```
    /// # use lens_hash::Hash;
    /// let hash = Hash::compute_from("hello world".as_bytes());
    /// let serialized = hash.to_bytes();
    /// ```
    pub fn to_bytes(&self) -> &[u8; HASH_SIZE_BYTES] {
        &self.0
    }

    /// Convert into bytes.
    ///
    /// # Example
    ///  ```
    /// # use lens_hash::Hash;
    /// let hash = Hash::compute_from("hello world".as_bytes());
    /// let serialized = hash.into_bytes();
    /// ```
    pub fn into_bytes(self) -> [u8; HASH_SIZE_BYTES] {
        self.0
    }

    /// Deserialize using `bs58` encoding with checksum.
    ///
    /// # Example
    ///  ```
    /// # use lens_hash::Hash;
    /// # use std::str::FromStr;
    /// let hash = Hash::compute_from("hello world".as_bytes());
    /// let serialized: String = hash.to_bs58_check();
    /// let deserialized: Hash = Hash::from_bs58_check(&serialized).unwrap();
    /// assert_eq!(hash, deserialized);
    /// ```
    pub fn from_bs58_check(data: &str) -> Result<Hash, LensHashError> {
        let decoded_bs58_check = bs58::decode(data)
            .with_check(None)
            .into_vec()
            .map_err(|err| LensHashError::ParsingError(format!("{}", err)))?;
        Ok(Hash::from_bytes(
            &decoded_bs58_check
                .as_slice()
                .try_into()
                .map_err(|_| LensHashError::WrongSize)?,
        ))
    }

    /// Deserialize a Hash from bytes.
    ///
    /// # Example
    ///  ```
    /// # use lens_hash::Hash;
    /// let hash = Hash::compute_from("hello world".as_bytes());
    /// let deserialized: Hash = Hash::from_bytes(hash.to_bytes());
    /// assert_eq!(hash, deserialized);
    /// ```
    pub fn from_bytes(data: &[u8; HASH_SIZE_BYTES]) -> Hash {
        Hash(*data)
    }
}

impl FromStr for Hash {
    type Err = LensHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_bs58_check(s)
    }
}

impl serde::Serialize for Hash {
    /// `serde::Serialize` trait for Hash.
    /// If the serializer is human readable, serialization is done using `to_bs58_check`,
    /// otherwise raw bytes are serialized.
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.collect_str(&self.to_bs58_check())
        } else {
            s.serialize_bytes(self.to_bytes())
        }
    }
}

impl<'de> serde::Deserialize<'de> for Hash {
    /// `serde::Deserialize` trait for Hash.
    /// If the deserializer is human readable, deserialization expects a `bs58` check string,
    /// otherwise raw bytes are expected.
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Hash, D::Error> {
        if d.is_human_readable() {
            struct Base58CheckVisitor;

            impl<'de> serde::de::Visitor<'de> for Base58CheckVisitor {
                type Value = Hash;

                fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                    formatter.write_str("an ASCII base58check string")
                }

                fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
                where
                    E: serde::de::Error,
                {
                    if let Ok(v_str) = std::str::from_utf8(v) {
                        Hash::from_bs58_check(v_str).map_err(E::custom)
                    } else {
                        Err(E::invalid_value(serde::de::Unexpected::Bytes(v), &self))
                    }
                }

                fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
                where
                    E: serde::de::Error,
                {
                    Hash::from_bs58_check(v).map_err(E::custom)
                }
            }
            d.deserialize_str(Base58CheckVisitor)
        } else {
            struct BytesVisitor;

            impl<'de> serde::de::Visitor<'de> for BytesVisitor {
                type Value = Hash;

                fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                    formatter.write_str("a bytestring")
                }

                fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
                where
                    E: serde::de::Error,
                {
                    let bytes: &[u8; HASH_SIZE_BYTES] =
                        v.try_into().map_err(|_| E::custom("wrong hash size"))?;
                    Ok(Hash::from_bytes(bytes))
                }
            }
            d.deserialize_bytes(BytesVisitor)
        }
    }
}
