//! Object checksums in the `ALGORITHM/OFFSET/VALUE` wire format.
//!
//! Atmos reports checksums like `SHA0/1024/ab12...`, where the offset is the number
//! of bytes the digest covers. The short form `MD5/ab12...` has no offset.

use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::io::Read;
use std::str::FromStr;

use md5::Md5;
use sha1::Digest;
use sha1::Sha1;

use crate::sha0::Sha0;
use crate::{Error, ErrorKind, Result};

/// Digest algorithms supported by checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// SHA-0, the Atmos default.
    Sha0,
    /// SHA-1
    Sha1,
    /// MD5
    Md5,
}

impl Algorithm {
    /// Wire name of the algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Sha0 => "SHA0",
            Algorithm::Sha1 => "SHA1",
            Algorithm::Md5 => "MD5",
        }
    }

    /// Create a fresh hasher for this algorithm.
    pub fn hasher(&self) -> Hasher {
        match self {
            Algorithm::Sha0 => Hasher::Sha0(Sha0::new()),
            Algorithm::Sha1 => Hasher::Sha1(Sha1::new()),
            Algorithm::Md5 => Hasher::Md5(Md5::new()),
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SHA0" => Ok(Algorithm::Sha0),
            "SHA1" => Ok(Algorithm::Sha1),
            "MD5" => Ok(Algorithm::Md5),
            _ => Err(Error::request_invalid(format!(
                "unsupported checksum algorithm: {s}"
            ))),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hasher is the incremental state for one [`Algorithm`].
///
/// It is `Clone` so intermediate values can be taken without finishing the digest.
#[derive(Clone)]
pub enum Hasher {
    /// SHA-0 state
    Sha0(Sha0),
    /// SHA-1 state
    Sha1(Sha1),
    /// MD5 state
    Md5(Md5),
}

impl Hasher {
    /// Feed bytes into the digest.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha0(h) => h.update(data),
            Hasher::Sha1(h) => Digest::update(h, data),
            Hasher::Md5(h) => Digest::update(h, data),
        }
    }

    /// Finish and return the hex encoded digest.
    pub fn finalize_hex(self) -> String {
        match self {
            Hasher::Sha0(h) => hex::encode(h.finalize()),
            Hasher::Sha1(h) => hex::encode(h.finalize()),
            Hasher::Md5(h) => hex::encode(h.finalize()),
        }
    }
}

/// ChecksumValue is one parsed or computed checksum.
///
/// Equality is structural over algorithm, offset and value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChecksumValue {
    /// Digest algorithm.
    pub algorithm: Algorithm,
    /// Bytes covered by the digest, absent in the short form.
    pub offset: Option<u64>,
    /// Encoded digest.
    pub value: String,
}

impl ChecksumValue {
    /// Create a checksum value anchored at `offset`.
    pub fn new(algorithm: Algorithm, offset: Option<u64>, value: impl Into<String>) -> Self {
        Self {
            algorithm,
            offset,
            value: value.into(),
        }
    }

    /// Compute the checksum of a whole buffer, anchored at its length.
    pub fn compute(content: &[u8], algorithm: Algorithm) -> Self {
        let mut running = RunningChecksum::new(algorithm);
        running.update(content);
        running.value()
    }
}

impl FromStr for ChecksumValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        match parts.as_slice() {
            [alg, value] if !value.is_empty() => Ok(Self::new(alg.parse()?, None, *value)),
            [alg, offset, value] if !value.is_empty() => {
                let offset = offset.parse::<u64>().map_err(|e| {
                    Error::request_invalid(format!("invalid checksum offset in {s:?}"))
                        .with_source(e)
                })?;
                Ok(Self::new(alg.parse()?, Some(offset), *value))
            }
            _ => Err(Error::request_invalid(format!("invalid checksum: {s:?}"))),
        }
    }
}

impl Display for ChecksumValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{}/{}/{}", self.algorithm, offset, self.value),
            None => write!(f, "{}/{}", self.algorithm, self.value),
        }
    }
}

/// RunningChecksum accumulates a digest across sequential writes or reads.
///
/// Used for write-side checksums on appended uploads: every append must start exactly
/// where the previous one ended.
#[derive(Clone)]
pub struct RunningChecksum {
    algorithm: Algorithm,
    offset: u64,
    hasher: Hasher,
}

impl fmt::Debug for RunningChecksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningChecksum")
            .field("algorithm", &self.algorithm)
            .field("offset", &self.offset)
            .finish()
    }
}

impl RunningChecksum {
    /// Start a checksum at offset zero.
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            offset: 0,
            hasher: algorithm.hasher(),
        }
    }

    /// Algorithm in use.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Number of bytes digested so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Digest more bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.offset += data.len() as u64;
    }

    /// Digest bytes that claim to start at `offset`.
    ///
    /// Returns `ChecksumOffsetMismatch` if they do not continue the current range.
    pub fn append_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        if offset != self.offset {
            return Err(Error::checksum_offset_mismatch(format!(
                "append starts at {offset} but checksum covers {} bytes",
                self.offset
            )));
        }
        self.update(data);
        Ok(())
    }

    /// Current value without finishing the running state.
    pub fn value(&self) -> ChecksumValue {
        ChecksumValue::new(
            self.algorithm,
            Some(self.offset),
            self.hasher.clone().finalize_hex(),
        )
    }

    /// Compare the current state against an expected checksum.
    pub fn verify(&self, expected: &ChecksumValue) -> Result<()> {
        if expected.algorithm != self.algorithm {
            return Err(Error::checksum_mismatch(format!(
                "expected {} checksum but computed {}",
                expected.algorithm, self.algorithm
            )));
        }
        if let Some(offset) = expected.offset {
            if offset != self.offset {
                return Err(Error::checksum_offset_mismatch(format!(
                    "expected checksum at offset {offset} but read {} bytes",
                    self.offset
                )));
            }
        }

        let actual = self.value();
        if !actual.value.eq_ignore_ascii_case(&expected.value) {
            return Err(Error::checksum_mismatch(format!(
                "checksum mismatch, expected {expected} but got {actual}"
            )));
        }
        Ok(())
    }
}

/// ChecksumReader validates bytes against an expected checksum while they are read.
///
/// The reader is forward only. Once the expected offset is reached the digest is
/// compared immediately; a short form checksum is compared at end of stream.
pub struct ChecksumReader<R> {
    inner: R,
    expected: ChecksumValue,
    running: RunningChecksum,
    verified: bool,
    failed: Option<(ErrorKind, String)>,
}

impl<R: Read> ChecksumReader<R> {
    /// Wrap `inner` for validation against `expected`.
    pub fn new(inner: R, expected: ChecksumValue) -> Self {
        let running = RunningChecksum::new(expected.algorithm);
        Self {
            inner,
            expected,
            running,
            verified: false,
            failed: None,
        }
    }

    /// Expected checksum.
    pub fn expected(&self) -> &ChecksumValue {
        &self.expected
    }

    /// A failed check is sticky, every later read returns the same error.
    fn check(&mut self) -> std::io::Result<()> {
        match self.running.verify(&self.expected) {
            Ok(()) => {
                self.verified = true;
                Ok(())
            }
            Err(err) => {
                self.failed = Some((err.kind(), err.to_string()));
                Err(into_io_error(err))
            }
        }
    }
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if let Some((kind, message)) = &self.failed {
            return Err(into_io_error(Error::new(*kind, message.clone())));
        }
        if self.verified {
            return self.inner.read(buf);
        }

        // Never read past the anchored offset so the comparison happens exactly there.
        let limit = match self.expected.offset {
            Some(offset) => {
                let remaining = offset.saturating_sub(self.running.offset());
                if remaining == 0 {
                    self.check()?;
                    return self.inner.read(buf);
                }
                buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX))
            }
            None => buf.len(),
        };

        let n = self.inner.read(&mut buf[..limit])?;
        if n == 0 && limit > 0 {
            self.check()?;
            return Ok(0);
        }

        self.running.update(&buf[..n]);
        if self.expected.offset == Some(self.running.offset()) {
            self.check()?;
        }
        Ok(n)
    }
}

/// Wrap an emcsign error so it can travel through `std::io::Read`.
pub(crate) fn into_io_error(err: Error) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, err)
}

/// Recover an emcsign error that was carried through `std::io::Error`.
pub fn from_io_error(err: std::io::Error) -> Error {
    if err
        .get_ref()
        .is_some_and(|inner| inner.downcast_ref::<Error>().is_some())
    {
        if let Some(inner) = err.into_inner() {
            if let Ok(err) = inner.downcast::<Error>() {
                return *err;
            }
        }
        return Error::unexpected("lost error inside io error");
    }
    err.into()
}
