// ─── Checksums ───
// Published artifact digests (`.sha256`, `.sha1`, `.md5` sidecars).

use md5::Md5;
use serde::{Serialize, Serializer};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::core::error::{StageError, StageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Sha256,
    Sha1,
    Md5,
}

impl ChecksumAlgorithm {
    /// Strongest first; the first sidecar a repository publishes wins.
    pub const PREFERENCE: [ChecksumAlgorithm; 3] = [
        ChecksumAlgorithm::Sha256,
        ChecksumAlgorithm::Sha1,
        ChecksumAlgorithm::Md5,
    ];

    /// Sidecar file extension appended to the artifact URL.
    pub fn extension(self) -> &'static str {
        match self {
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Md5 => "md5",
        }
    }

    fn digest_len(self) -> usize {
        match self {
            ChecksumAlgorithm::Sha256 => 32,
            ChecksumAlgorithm::Sha1 => 20,
            ChecksumAlgorithm::Md5 => 16,
        }
    }

    pub fn hasher(self) -> ChecksumHasher {
        match self {
            ChecksumAlgorithm::Sha256 => ChecksumHasher::Sha256(Sha256::new()),
            ChecksumAlgorithm::Sha1 => ChecksumHasher::Sha1(Sha1::new()),
            ChecksumAlgorithm::Md5 => ChecksumHasher::Md5(Md5::new()),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChecksumAlgorithm::Sha256 => "SHA-256",
            ChecksumAlgorithm::Sha1 => "SHA-1",
            ChecksumAlgorithm::Md5 => "MD5",
        };
        f.write_str(name)
    }
}

/// Incremental hasher for one of the supported algorithms.
pub enum ChecksumHasher {
    Sha256(Sha256),
    Sha1(Sha1),
    Md5(Md5),
}

impl ChecksumHasher {
    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            ChecksumHasher::Sha256(h) => h.update(bytes),
            ChecksumHasher::Sha1(h) => h.update(bytes),
            ChecksumHasher::Md5(h) => h.update(bytes),
        }
    }

    pub fn finalize(self) -> Vec<u8> {
        match self {
            ChecksumHasher::Sha256(h) => h.finalize().to_vec(),
            ChecksumHasher::Sha1(h) => h.finalize().to_vec(),
            ChecksumHasher::Md5(h) => h.finalize().to_vec(),
        }
    }
}

/// A digest together with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    #[serde(serialize_with = "serialize_hex")]
    pub digest: Vec<u8>,
}

fn serialize_hex<S: Serializer>(digest: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(digest))
}

impl Checksum {
    /// Parse the body of a sidecar file.
    ///
    /// Repositories write either the bare hex digest or `<digest>  <file>`;
    /// only the first token counts.
    pub fn parse_sidecar(algorithm: ChecksumAlgorithm, body: &str) -> StageResult<Self> {
        let token = body.split_whitespace().next().unwrap_or_default();
        Self::from_hex(algorithm, token)
    }

    pub fn from_hex(algorithm: ChecksumAlgorithm, raw: &str) -> StageResult<Self> {
        let digest = hex::decode(raw.trim()).map_err(|e| {
            StageError::MetadataParse(format!("invalid {algorithm} digest {raw:?}: {e}"))
        })?;
        if digest.len() != algorithm.digest_len() {
            return Err(StageError::MetadataParse(format!(
                "{algorithm} digest {raw:?} has {} bytes, expected {}",
                digest.len(),
                algorithm.digest_len()
            )));
        }
        Ok(Self { algorithm, digest })
    }

    /// Digest of `bytes` under `algorithm`.
    pub fn compute(algorithm: ChecksumAlgorithm, bytes: &[u8]) -> Self {
        let mut hasher = algorithm.hasher();
        hasher.update(bytes);
        Self {
            algorithm,
            digest: hasher.finalize(),
        }
    }

    pub fn matches(&self, bytes: &[u8]) -> bool {
        Checksum::compute(self.algorithm, bytes).digest == self.digest
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.digest)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.extension(), self.to_hex())
    }
}
