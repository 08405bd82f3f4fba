use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Hash algorithm of a checksum field in a source record.
///
/// Ordered strongest first, which is also the order in which record fields
/// are consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashKind {
    /// SHA-512, from `Checksums-Sha512`.
    Sha512,
    /// SHA-256, from `Checksums-Sha256`.
    Sha256,
    /// SHA-1, from `Checksums-Sha1`.
    Sha1,
    /// MD5, from the historically named `Files` field.
    Md5,
}

impl HashKind {
    /// All kinds in field priority order.
    pub const PRIORITY: [HashKind; 4] = [
        HashKind::Sha512,
        HashKind::Sha256,
        HashKind::Sha1,
        HashKind::Md5,
    ];

    /// Record field carrying checksums of this kind.
    pub fn field_name(self) -> &'static str {
        match self {
            HashKind::Sha512 => "Checksums-Sha512",
            HashKind::Sha256 => "Checksums-Sha256",
            HashKind::Sha1 => "Checksums-Sha1",
            HashKind::Md5 => "Files",
        }
    }

    /// Canonical hash name (`SHA512`, `SHA256`, `SHA1`, `MD5Sum`).
    pub fn as_str(self) -> &'static str {
        match self {
            HashKind::Sha512 => "SHA512",
            HashKind::Sha256 => "SHA256",
            HashKind::Sha1 => "SHA1",
            HashKind::Md5 => "MD5Sum",
        }
    }

    /// Length of a hex digest of this kind.
    pub fn hex_len(self) -> usize {
        match self {
            HashKind::Sha512 => 128,
            HashKind::Sha256 => 64,
            HashKind::Sha1 => 40,
            HashKind::Md5 => 32,
        }
    }
}

impl FromStr for HashKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha512" => Ok(HashKind::Sha512),
            "sha256" => Ok(HashKind::Sha256),
            "sha1" => Ok(HashKind::Sha1),
            "md5sum" | "md5" => Ok(HashKind::Md5),
            _ => Err(Error::InvalidHash(s.to_string())),
        }
    }
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hash value tagged with its algorithm, written `KIND:value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashString {
    /// Algorithm.
    pub kind: HashKind,
    /// Hex digest as found in the record.
    pub value: String,
}

impl HashString {
    /// Tag `value` with `kind`.
    pub fn new(kind: HashKind, value: impl Into<String>) -> Self {
        HashString {
            kind,
            value: value.into(),
        }
    }

    /// Whether the digest has the length and alphabet its kind requires.
    pub fn is_well_formed(&self) -> bool {
        self.value.len() == self.kind.hex_len() && self.value.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl FromStr for HashString {
    type Err = Error;

    /// Parse `KIND:value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use deb_cachefilter::{HashKind, HashString};
    ///
    /// let h: HashString = "SHA256:abcd".parse().unwrap();
    /// assert_eq!(h.kind, HashKind::Sha256);
    /// assert_eq!(h.value, "abcd");
    /// assert_eq!(h.to_string(), "SHA256:abcd");
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidHash(s.to_string()))?;
        Ok(HashString::new(kind.parse()?, value))
    }
}

impl fmt::Display for HashString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order() {
        let fields: Vec<&str> = HashKind::PRIORITY.iter().map(|k| k.field_name()).collect();
        assert_eq!(
            fields,
            vec!["Checksums-Sha512", "Checksums-Sha256", "Checksums-Sha1", "Files"]
        );
        let mut sorted = HashKind::PRIORITY;
        sorted.sort();
        assert_eq!(sorted, HashKind::PRIORITY);
    }

    #[test]
    fn kind_names() {
        assert_eq!(HashKind::Md5.to_string(), "MD5Sum");
        assert_eq!("md5sum".parse::<HashKind>().unwrap(), HashKind::Md5);
        assert_eq!("SHA1".parse::<HashKind>().unwrap(), HashKind::Sha1);
        assert!("crc32".parse::<HashKind>().is_err());
    }

    #[test]
    fn hash_string_parse() {
        let h: HashString = "MD5Sum:d41d8cd98f00b204e9800998ecf8427e".parse().unwrap();
        assert_eq!(h.kind, HashKind::Md5);
        assert!(h.is_well_formed());
        assert!("nocolon".parse::<HashString>().is_err());
    }

    #[test]
    fn well_formed_checks_length() {
        assert!(!HashString::new(HashKind::Sha256, "abcd").is_well_formed());
        assert!(!HashString::new(HashKind::Sha1, "z".repeat(40)).is_well_formed());
        assert!(HashString::new(HashKind::Sha1, "a".repeat(40)).is_well_formed());
    }
}
