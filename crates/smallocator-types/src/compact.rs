//! The `Compact` data model (spec §3) and the two packed 256-bit fields
//! (`id`, `nonce`) that carry extra structure inside a `U256`.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::encoding::EncodingError;

/// Reset-period lookup table, indexed by the 3-bit `resetPeriodIndex` packed
/// into `id` bits `[252..255)` (spec §3).
pub const RESET_PERIODS_SECONDS: [u64; 8] = [1, 15, 60, 600, 3900, 86400, 612_000, 2_592_000];

/// A decoded reset period: the grace window after which a sponsor may force-withdraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetPeriod {
    pub index: u8,
    pub seconds: u64,
}

impl TryFrom<u8> for ResetPeriod {
    type Error = EncodingError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        RESET_PERIODS_SECONDS
            .get(index as usize)
            .map(|&seconds| ResetPeriod { index, seconds })
            .ok_or_else(|| EncodingError::InvalidAmount(format!("reset period index {index}")))
    }
}

/// The lock id: a 256-bit value packing `(allocatorId, resetPeriodIndex)` plus
/// 160 reserved/opaque low bits (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockId(#[serde(with = "u256_decimal")] pub U256);

impl LockId {
    /// The 92-bit allocator id packed into bits `[160..252)`.
    pub fn allocator_id(&self) -> U256 {
        (self.0 >> 160) & U256::from((1u128 << 92) - 1)
    }

    /// The 3-bit reset-period index packed into bits `[252..255)`.
    pub fn reset_period_index(&self) -> u8 {
        ((self.0 >> 252) & U256::from(0b111u8)).to::<u8>()
    }

    pub fn reset_period(&self) -> Result<ResetPeriod, EncodingError> {
        ResetPeriod::try_from(self.reset_period_index())
    }

    pub fn is_nonzero(&self) -> bool {
        !self.0.is_zero()
    }

    pub fn pack(allocator_id: U256, reset_period_index: u8, reserved_low_160: U256) -> Self {
        let id = reserved_low_160
            | (allocator_id << 160)
            | (U256::from(reset_period_index) << 252);
        LockId(id)
    }
}

/// A compact's nonce: high 160 bits are the sponsor address, low 96 bits are
/// a free per-sponsor counter (spec §3, §9 "canonical choice: big-endian 32
/// bytes; high 20 bytes = sponsor; low 12 bytes = counter").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(#[serde(with = "u256_decimal")] pub U256);

impl Nonce {
    pub fn sponsor(&self) -> Address {
        let bytes = self.0.to_be_bytes::<32>();
        let mut high = [0u8; 20];
        high.copy_from_slice(&bytes[0..20]);
        Address::from(high)
    }

    pub fn counter(&self) -> u128 {
        (self.0 & U256::from((1u128 << 96) - 1)).to::<u128>()
    }

    /// Splits the nonce into its `(high 20 bytes, low 12 bytes)` storage representation.
    pub fn to_parts(&self) -> ([u8; 20], [u8; 12]) {
        let bytes = self.0.to_be_bytes::<32>();
        let mut high = [0u8; 20];
        let mut low = [0u8; 12];
        high.copy_from_slice(&bytes[0..20]);
        low.copy_from_slice(&bytes[20..32]);
        (high, low)
    }

    pub fn from_parts(high: [u8; 20], low: [u8; 12]) -> Self {
        let mut bytes = [0u8; 32];
        bytes[0..20].copy_from_slice(&high);
        bytes[20..32].copy_from_slice(&low);
        Nonce(U256::from_be_bytes(bytes))
    }

    /// `counter` must fit in 96 bits; higher bits are discarded.
    pub fn pack(sponsor: Address, counter: u128) -> Self {
        let low96 = counter & ((1u128 << 96) - 1);
        let low_bytes: [u8; 12] = low96.to_be_bytes()[4..16].try_into().unwrap();
        Self::from_parts(sponsor.into_array(), low_bytes)
    }
}

/// The inbound nonce field is either absent (server allocates) or a concrete
/// `U256` (spec §9 "Dynamic dispatch"): `NonceInput ∈ {Null, U256}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceInput {
    Null,
    Value(Nonce),
}

impl<'de> Deserialize<'de> for NonceInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Null,
            Str(String),
            Num(serde_json::Number),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Null => Ok(NonceInput::Null),
            Raw::Str(s) => U256::from_str_radix(s.trim_start_matches("0x"), if s.starts_with("0x") { 16 } else { 10 })
                .map(Nonce)
                .map(NonceInput::Value)
                .map_err(serde::de::Error::custom),
            Raw::Num(n) => {
                let s = n.to_string();
                U256::from_str_radix(&s, 10)
                    .map(Nonce)
                    .map(NonceInput::Value)
                    .map_err(serde::de::Error::custom)
            }
        }
    }
}

impl Serialize for NonceInput {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            NonceInput::Null => serializer.serialize_none(),
            NonceInput::Value(n) => n.serialize(serializer),
        }
    }
}

/// The optional witness extension: present together, or absent together
/// (spec §3 invariant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub witness_type_string: String,
    pub witness_hash: B256,
}

/// A compact as submitted by a client, prior to nonce allocation and signing.
///
/// `witnessTypeString`/`witnessHash` are kept as two independent optional
/// fields rather than a single `Option<Witness>` behind `#[serde(flatten)]`:
/// flattening an `Option<T>` only reconstructs `None` when the remaining map
/// is empty and every field of `T` tolerates that, which would silently swap
/// a genuine "one present, one absent" client error for a generic JSON
/// deserialize failure instead of the explicit `BadWitnessPair` tag spec §7
/// names. [`Compact::witness`] is the single place that reconciles the pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compact {
    #[serde(with = "address_checked")]
    pub arbiter: Address,
    #[serde(with = "address_checked")]
    pub sponsor: Address,
    pub nonce: NonceInput,
    pub expires: u64,
    pub id: LockId,
    #[serde(with = "u256_decimal")]
    pub amount: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness_type_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness_hash: Option<B256>,
}

impl Compact {
    /// Reconciles the witness pair (spec §3, §4.7 stage 2): both present
    /// yields `Some`, both absent yields `None`, anything else is the
    /// `BadWitnessPair` structural error.
    #[tracing::instrument(skip_all, err)]
    pub fn witness(&self) -> Result<Option<Witness>, crate::error::ApiError> {
        match (&self.witness_type_string, &self.witness_hash) {
            (Some(witness_type_string), Some(&witness_hash)) => Ok(Some(Witness {
                witness_type_string: witness_type_string.clone(),
                witness_hash,
            })),
            (None, None) => Ok(None),
            _ => Err(crate::error::ApiError::BadWitnessPair),
        }
    }
}

/// A compact with its nonce resolved, claim hash derived, and signature
/// produced — the durable, audit-log row (spec §3 StoredCompact).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCompact {
    pub chain_id: u64,
    pub arbiter: Address,
    pub sponsor: Address,
    pub nonce: Nonce,
    pub expires: u64,
    pub id: LockId,
    #[serde(with = "u256_decimal")]
    pub amount: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness_type_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness_hash: Option<B256>,
    pub claim_hash: B256,
    #[serde(with = "sig_hex")]
    pub signature: [u8; 64],
}

impl StoredCompact {
    pub fn witness(&self) -> Option<Witness> {
        match (&self.witness_type_string, self.witness_hash) {
            (Some(witness_type_string), Some(witness_hash)) => Some(Witness {
                witness_type_string: witness_type_string.clone(),
                witness_hash,
            }),
            _ => None,
        }
    }
}

/// 64-byte signature serialized as a `0x`-prefixed hex string on the wire.
mod sig_hex {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error> {
        format!("0x{}", hex::encode(value)).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 64], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected a 64-byte signature"))
    }
}

/// A `0x`-prefixed address on the wire, rejected at deserialize time through
/// the same [`crate::encoding::parse_address`] stage-2 structural checks use
/// (spec §4.2/§4.7 stage 2) rather than alloy's default, more permissive
/// `Address` deserialization. The `BadAddress:` prefix on the error message
/// lets the HTTP layer surface this as [`crate::error::ApiError::BadAddress`]
/// instead of a generic deserialize rejection.
mod address_checked {
    use alloy_primitives::Address;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::encoding::parse_address;

    pub fn serialize<S: Serializer>(value: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        value.to_checksum(None).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_address(&s).map_err(|e| serde::de::Error::custom(format!("BadAddress:{e}")))
    }
}

/// `U256` serialized as a decimal string on the wire (spec §9: "Amounts are
/// decimal strings on the wire, fixed-width bytes at rest"), rejected at
/// deserialize time through [`crate::encoding::parse_decimal_amount`] (spec
/// §4.7 stage 2's `/^\d+$/` check) rather than the laxer `U256::from_str_radix`.
/// The `BadAmount:` prefix lets the HTTP layer surface this as
/// [`crate::error::ApiError::BadAmount`].
mod u256_decimal {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::encoding::parse_decimal_amount;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        value.to_string().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(serde_json::Number),
        }
        let raw = match Raw::deserialize(deserializer)? {
            Raw::Str(s) => s,
            Raw::Num(n) => n.to_string(),
        };
        parse_decimal_amount(&raw).map_err(|e| serde::de::Error::custom(format!("BadAmount:{e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_id_decodes_allocator_and_reset_period() {
        // id = (1 << 160) | (7 << 252), matching S3/S8 fixtures in spec §8.
        let id = LockId((U256::from(1u64) << 160) | (U256::from(7u64) << 252));
        assert_eq!(id.allocator_id(), U256::from(1u64));
        assert_eq!(id.reset_period_index(), 7);
        assert_eq!(id.reset_period().unwrap().seconds, 2_592_000);
    }

    #[test]
    fn nonce_roundtrips_sponsor_and_counter() {
        let sponsor: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb9226"
            .parse()
            .unwrap();
        let nonce = Nonce::pack(sponsor, 42);
        assert_eq!(nonce.sponsor(), sponsor);
        assert_eq!(nonce.counter(), 42);
    }

    #[test]
    fn nonce_input_parses_null_and_numeric() {
        let null: NonceInput = serde_json::from_str("null").unwrap();
        assert_eq!(null, NonceInput::Null);

        let numeric: NonceInput = serde_json::from_str("\"123\"").unwrap();
        assert_eq!(numeric, NonceInput::Value(Nonce(U256::from(123u64))));
    }
}
