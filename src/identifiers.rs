//! Time-sortable 128-bit identifiers with typed prefixes.
//!
//! The leading 48 bits encode milliseconds since the Unix epoch; the trailing
//! 80 bits are cryptographically random. The 16 raw bytes are Crockford
//! base32 encoded into a fixed 26-character string, so identifiers sort
//! lexicographically in creation order.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::errors::OrchestratorError;

const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const ENCODED_LEN: usize = 26;

/// Earliest timestamp (ms since epoch) an identifier is allowed to carry.
/// 2020-01-01T00:00:00Z.
const MIN_TIMESTAMP_MS: u64 = 1_577_836_800_000;
/// How far into the future (ms) a timestamp may drift and still validate.
const FUTURE_SLACK_MS: u64 = 60_000;

/// Marker trait for identifier kinds, supplying the string prefix used in
/// `Display` output (e.g. `task-01H...`).
pub trait IdKind: Clone {
    const PREFIX: &'static str;
}

macro_rules! id_kind {
    ($kind:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $kind;
        impl IdKind for $kind {
            const PREFIX: &'static str = $prefix;
        }
    };
}

id_kind!(TaskIdKind, "task");
id_kind!(AgentIdKind, "agent");
id_kind!(DecisionIdKind, "decision");
id_kind!(ProposalIdKind, "proposal");
id_kind!(FileIdKind, "file");
id_kind!(ChunkIdKind, "chunk");
id_kind!(EmbeddingIdKind, "embedding");
id_kind!(LinkIdKind, "link");
id_kind!(SymbolIdKind, "symbol");

/// A typed, time-sortable 128-bit identifier.
///
/// `Id<TaskIdKind>` and `Id<AgentIdKind>` are distinct types at compile time even
/// though they share a representation, so a task id can never be passed
/// where an agent id is expected.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id<K> {
    bytes: [u8; 16],
    _kind: PhantomData<K>,
}

pub type TaskId = Id<TaskIdKind>;
pub type AgentId = Id<AgentIdKind>;
pub type DecisionId = Id<DecisionIdKind>;
pub type ProposalId = Id<ProposalIdKind>;
pub type FileId = Id<FileIdKind>;
pub type ChunkId = Id<ChunkIdKind>;
pub type EmbeddingId = Id<EmbeddingIdKind>;
pub type LinkId = Id<LinkIdKind>;
pub type SymbolId = Id<SymbolIdKind>;

impl<K: IdKind> Id<K> {
    /// Generate a new identifier stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        let millis = now_millis();
        Self::from_parts(millis, &mut rand::rngs::OsRng)
    }

    fn from_parts(millis: u64, rng: &mut impl RngCore) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..6].copy_from_slice(&millis.to_be_bytes()[2..8]);
        rng.fill_bytes(&mut bytes[6..16]);
        Self {
            bytes,
            _kind: PhantomData,
        }
    }

    /// Milliseconds-since-epoch encoded in this identifier.
    #[must_use]
    pub fn timestamp_millis(&self) -> u64 {
        let mut buf = [0u8; 8];
        buf[2..8].copy_from_slice(&self.bytes[0..6]);
        u64::from_be_bytes(buf)
    }

    /// The bare 26-character base32 body, without the typed prefix.
    #[must_use]
    pub fn encoded(&self) -> String {
        encode_base32(&self.bytes)
    }

    /// Parse the bare 26-character body (no prefix), validating the
    /// timestamp window per spec.md §4.1.
    pub fn parse(encoded: &str) -> Result<Self, OrchestratorError> {
        let bytes = decode_base32(encoded)
            .ok_or_else(|| OrchestratorError::InvalidIdentifier(encoded.to_string()))?;
        let id = Self {
            bytes,
            _kind: PhantomData,
        };
        if !id.has_valid_timestamp() {
            return Err(OrchestratorError::InvalidIdentifier(encoded.to_string()));
        }
        Ok(id)
    }

    fn has_valid_timestamp(&self) -> bool {
        let ts = self.timestamp_millis();
        let upper = now_millis().saturating_add(FUTURE_SLACK_MS);
        ts >= MIN_TIMESTAMP_MS && ts <= upper
    }
}

impl<K: IdKind> Default for Id<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn encode_base32(bytes: &[u8; 16]) -> String {
    // 16 bytes = 128 bits; 26 base32 chars carry 130 bits, so the two
    // leading bits of the first char are always zero.
    let mut out = String::with_capacity(ENCODED_LEN);
    let mut acc: u128 = 0;
    for &b in bytes {
        acc = (acc << 8) | u128::from(b);
    }
    acc <<= 2; // pad 128 bits to 130 so it splits evenly into 26 * 5 bits
    let mut chars = [0u8; ENCODED_LEN];
    for i in (0..ENCODED_LEN).rev() {
        let idx = (acc & 0b11111) as usize;
        chars[i] = CROCKFORD_ALPHABET[idx];
        acc >>= 5;
    }
    out.push_str(std::str::from_utf8(&chars).expect("alphabet is ASCII"));
    out
}

fn decode_base32(s: &str) -> Option<[u8; 16]> {
    if s.len() != ENCODED_LEN || !s.is_ascii() {
        return None;
    }
    let mut acc: u128 = 0;
    for c in s.bytes() {
        let val = crockford_value(c)?;
        acc = (acc << 5) | u128::from(val);
    }
    acc >>= 2; // undo the padding applied during encode
    Some(acc.to_be_bytes())
}

fn crockford_value(c: u8) -> Option<u8> {
    let upper = c.to_ascii_uppercase();
    // Crockford treats O as 0 and I/L as 1 when decoding, but our encoder
    // never emits them, so a strict lookup is sufficient for round-tripping.
    CROCKFORD_ALPHABET.iter().position(|&a| a == upper).map(|p| p as u8)
}

impl<K: IdKind> fmt::Display for Id<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", K::PREFIX, self.encoded())
    }
}

impl<K: IdKind> fmt::Debug for Id<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl<K: IdKind> FromStr for Id<K> {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(K::PREFIX)
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(s);
        Self::parse(body)
    }
}

impl<K: IdKind> Serialize for Id<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de, K: IdKind> Deserialize<'de> for Id<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(D::Error::custom)
    }
}

/// Sanitize an agent display name into the slug used as the identifier's
/// human-readable component: lowercase, spaces become dashes, anything
/// outside `[a-z0-9_-]` is stripped.
///
/// Fails with `InvalidIdentifier` if sanitization leaves nothing
/// alphanumeric behind.
pub fn sanitize_agent_slug(display_name: &str) -> Result<String, OrchestratorError> {
    let lowered = display_name.to_lowercase().replace(' ', "-");
    let slug: String = lowered
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if !slug.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(OrchestratorError::InvalidIdentifier(display_name.to_string()));
    }
    Ok(slug)
}

impl<K: IdKind> sqlx::Type<sqlx::Sqlite> for Id<K> {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'q, K: IdKind> sqlx::Encode<'q, sqlx::Sqlite> for Id<K> {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode(self.to_string(), buf)
    }
}

impl<'r, K: IdKind> sqlx::Decode<'r, sqlx::Sqlite> for Id<K> {
    fn decode(
        value: sqlx::sqlite::SqliteValueRef<'r>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let s = <String as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value)?;
        Self::from_str(&s).map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
    }
}
