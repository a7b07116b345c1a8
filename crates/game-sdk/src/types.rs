//! on-chain wire types
//!
//! everything here serializes to BCS exactly as the ledger expects it.
//! enum variant order is part of the wire format - do not reorder.

use crate::error::{Result, SdkError};

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{
    de::Error as _, ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer,
};
use sha3::{Digest, Sha3_256};
use std::{fmt, str::FromStr};

pub const ADDRESS_LENGTH: usize = 32;

const RAW_TRANSACTION_SALT: &[u8] = b"APTOS::RawTransaction";
const TRANSACTION_SALT: &[u8] = b"APTOS::Transaction";

/// ed25519 single-key authentication scheme id
const ED25519_SCHEME: u8 = 0;

fn sha3_256(data: &[u8]) -> [u8; 32] {
    Sha3_256::digest(data).into()
}

// ============================================================================
// ADDRESSES
// ============================================================================

/// 32-byte account address
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress([u8; ADDRESS_LENGTH]);

impl AccountAddress {
    /// `0x1`, home of the framework modules
    pub const ONE: Self = Self::one();

    const fn one() -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[ADDRESS_LENGTH - 1] = 1;
        Self(bytes)
    }

    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// address derived from a fresh ed25519 key: sha3(pk || scheme)
    pub fn from_ed25519_public_key(public_key: &[u8; 32]) -> Self {
        let mut preimage = Vec::with_capacity(33);
        preimage.extend_from_slice(public_key);
        preimage.push(ED25519_SCHEME);
        Self(sha3_256(&preimage))
    }

    /// lowercase hex without prefix, always 64 digits
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl FromStr for AccountAddress {
    type Err = SdkError;

    /// accepts `0x1`, `1`, and full 64-digit forms
    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > ADDRESS_LENGTH * 2 {
            return Err(SdkError::Validation(format!("invalid address: {:?}", s)));
        }

        let padded = format!("{:0>width$}", digits, width = ADDRESS_LENGTH * 2);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|e| SdkError::Validation(format!("invalid address {:?}: {}", s, e)))?;
        Ok(Self(bytes))
    }
}

// human readable formats get the hex string, bcs gets the raw 32 bytes
impl Serialize for AccountAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(D::Error::custom)
        } else {
            <[u8; ADDRESS_LENGTH]>::deserialize(deserializer).map(Self)
        }
    }
}

// ============================================================================
// TYPE TAGS
// ============================================================================

/// move type used as a generic argument of an entry function
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TypeTag {
    Bool,
    U8,
    U64,
    U128,
    Address,
    Signer,
    Vector(Box<TypeTag>),
    Struct(Box<StructTag>),
    U16,
    U32,
    U256,
}

/// fully qualified struct type, e.g. `0x1::aptos_coin::AptosCoin`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct StructTag {
    pub address: AccountAddress,
    pub module: String,
    pub name: String,
    pub type_args: Vec<TypeTag>,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Bool => f.write_str("bool"),
            TypeTag::U8 => f.write_str("u8"),
            TypeTag::U16 => f.write_str("u16"),
            TypeTag::U32 => f.write_str("u32"),
            TypeTag::U64 => f.write_str("u64"),
            TypeTag::U128 => f.write_str("u128"),
            TypeTag::U256 => f.write_str("u256"),
            TypeTag::Address => f.write_str("address"),
            TypeTag::Signer => f.write_str("signer"),
            TypeTag::Vector(inner) => write!(f, "vector<{}>", inner),
            TypeTag::Struct(tag) => write!(f, "{}", tag),
        }
    }
}

impl fmt::Display for StructTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.address, self.module, self.name)?;
        if !self.type_args.is_empty() {
            let args: Vec<String> = self.type_args.iter().map(|t| t.to_string()).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        Ok(())
    }
}

impl FromStr for TypeTag {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let tag = match s {
            "bool" => TypeTag::Bool,
            "u8" => TypeTag::U8,
            "u16" => TypeTag::U16,
            "u32" => TypeTag::U32,
            "u64" => TypeTag::U64,
            "u128" => TypeTag::U128,
            "u256" => TypeTag::U256,
            "address" => TypeTag::Address,
            "signer" => TypeTag::Signer,
            _ => match s.strip_prefix("vector<").and_then(|r| r.strip_suffix('>')) {
                Some(inner) => TypeTag::Vector(Box::new(inner.parse()?)),
                None => TypeTag::Struct(Box::new(s.parse()?)),
            },
        };
        Ok(tag)
    }
}

impl FromStr for StructTag {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (head, type_args) = match s.find('<') {
            Some(open) => {
                let inner = s[open + 1..]
                    .strip_suffix('>')
                    .ok_or_else(|| SdkError::Validation(format!("unbalanced generics in {:?}", s)))?;
                let args = split_type_args(inner)?
                    .into_iter()
                    .map(str::parse)
                    .collect::<Result<Vec<TypeTag>>>()?;
                (&s[..open], args)
            }
            None => (s, Vec::new()),
        };

        let parts: Vec<&str> = head.split("::").collect();
        let [address, module, name] = parts.as_slice() else {
            return Err(SdkError::Validation(format!(
                "expected address::module::name, got {:?}",
                s
            )));
        };

        for ident in [module, name] {
            if !is_identifier(ident) {
                return Err(SdkError::Validation(format!("invalid identifier {:?} in {:?}", ident, s)));
            }
        }

        Ok(StructTag {
            address: address.parse()?,
            module: module.to_string(),
            name: name.to_string(),
            type_args,
        })
    }
}

/// split `A, B<C, D>, E` on the commas that sit at nesting depth zero
fn split_type_args(s: &str) -> Result<Vec<&str>> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| SdkError::Validation(format!("unbalanced generics in {:?}", s)))?;
            }
            ',' if depth == 0 => {
                args.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(SdkError::Validation(format!("unbalanced generics in {:?}", s)));
    }
    args.push(s[start..].trim());

    if args.iter().any(|a| a.is_empty()) {
        return Err(SdkError::Validation(format!("empty type argument in {:?}", s)));
    }
    Ok(args)
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ============================================================================
// ARGUMENT VALUES
// ============================================================================

/// positional argument of an entry function call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveValue {
    Bool(bool),
    U8(u8),
    U64(u64),
    U128(u128),
    Address(AccountAddress),
    String(String),
    Vector(Vec<MoveValue>),
}

impl MoveValue {
    /// bcs bytes as carried in the entry function's argument list
    pub fn to_bcs(&self) -> Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }
}

impl Serialize for MoveValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MoveValue::Bool(v) => serializer.serialize_bool(*v),
            MoveValue::U8(v) => serializer.serialize_u8(*v),
            MoveValue::U64(v) => serializer.serialize_u64(*v),
            MoveValue::U128(v) => serializer.serialize_u128(*v),
            MoveValue::Address(a) => a.serialize(serializer),
            MoveValue::String(s) => serializer.serialize_str(s),
            MoveValue::Vector(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl From<bool> for MoveValue {
    fn from(v: bool) -> Self {
        MoveValue::Bool(v)
    }
}

impl From<u8> for MoveValue {
    fn from(v: u8) -> Self {
        MoveValue::U8(v)
    }
}

impl From<u64> for MoveValue {
    fn from(v: u64) -> Self {
        MoveValue::U64(v)
    }
}

impl From<u128> for MoveValue {
    fn from(v: u128) -> Self {
        MoveValue::U128(v)
    }
}

impl From<AccountAddress> for MoveValue {
    fn from(v: AccountAddress) -> Self {
        MoveValue::Address(v)
    }
}

impl From<&str> for MoveValue {
    fn from(v: &str) -> Self {
        MoveValue::String(v.to_string())
    }
}

impl From<String> for MoveValue {
    fn from(v: String) -> Self {
        MoveValue::String(v)
    }
}

impl<T: Into<MoveValue>> From<Vec<T>> for MoveValue {
    fn from(v: Vec<T>) -> Self {
        MoveValue::Vector(v.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// TRANSACTIONS
// ============================================================================

/// `address::module`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ModuleId {
    pub address: AccountAddress,
    pub name: String,
}

impl ModuleId {
    pub fn new(address: AccountAddress, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.address, self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntryFunction {
    pub module: ModuleId,
    pub function: String,
    pub ty_args: Vec<TypeTag>,
    /// each argument individually bcs encoded
    pub args: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum TransactionPayload {
    // retired variants; kept so EntryFunction lands on index 2
    #[doc(hidden)]
    Script,
    #[doc(hidden)]
    ModuleBundle,
    EntryFunction(EntryFunction),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RawTransaction {
    pub sender: AccountAddress,
    pub sequence_number: u64,
    pub payload: TransactionPayload,
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration_timestamp_secs: u64,
    pub chain_id: u8,
}

impl RawTransaction {
    /// bytes the account key signs: sha3(salt) || bcs(raw)
    pub fn signing_message(&self) -> Result<Vec<u8>> {
        let mut message = sha3_256(RAW_TRANSACTION_SALT).to_vec();
        message.extend(bcs::to_bytes(self)?);
        Ok(message)
    }

    pub fn entry_function(&self) -> Option<&EntryFunction> {
        match &self.payload {
            TransactionPayload::EntryFunction(f) => Some(f),
            _ => None,
        }
    }
}

/// ed25519 public key, bcs encoded as length-prefixed bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey(pub [u8; 32]);

/// ed25519 signature, bcs encoded as length-prefixed bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum TransactionAuthenticator {
    Ed25519 {
        public_key: Ed25519PublicKey,
        signature: Ed25519Signature,
    },
}

impl TransactionAuthenticator {
    pub fn ed25519(public_key: [u8; 32], signature: [u8; 64]) -> Self {
        TransactionAuthenticator::Ed25519 {
            public_key: Ed25519PublicKey(public_key),
            signature: Ed25519Signature(signature),
        }
    }
}

/// raw transaction plus authenticator, ready for submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
    raw_txn: RawTransaction,
    authenticator: TransactionAuthenticator,
}

impl SignedTransaction {
    pub fn new(raw_txn: RawTransaction, authenticator: TransactionAuthenticator) -> Self {
        Self {
            raw_txn,
            authenticator,
        }
    }

    pub fn raw_transaction(&self) -> &RawTransaction {
        &self.raw_txn
    }

    pub fn authenticator(&self) -> &TransactionAuthenticator {
        &self.authenticator
    }

    pub fn sender(&self) -> AccountAddress {
        self.raw_txn.sender
    }

    pub fn sequence_number(&self) -> u64 {
        self.raw_txn.sequence_number
    }

    /// bcs bytes as posted to the node
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }

    /// hash the ledger assigns once committed
    pub fn committed_hash(&self) -> Result<TransactionHash> {
        let mut hasher = Sha3_256::new();
        hasher.update(sha3_256(TRANSACTION_SALT));
        // Transaction::UserTransaction
        hasher.update([0u8]);
        hasher.update(self.to_bytes()?);
        let digest: [u8; 32] = hasher.finalize().into();
        Ok(TransactionHash(format!("0x{}", hex::encode(digest))))
    }

    /// check the signature against the raw transaction
    pub fn verify_signature(&self) -> Result<()> {
        let TransactionAuthenticator::Ed25519 {
            public_key,
            signature,
        } = &self.authenticator;

        let key = VerifyingKey::from_bytes(&public_key.0)
            .map_err(|e| SdkError::Signing(format!("bad public key: {}", e)))?;
        let message = self.raw_txn.signing_message()?;
        key.verify(&message, &Signature::from_bytes(&signature.0))
            .map_err(|e| SdkError::Signing(format!("signature does not verify: {}", e)))
    }
}

/// `0x`-prefixed transaction hash as reported by the node
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionHash(String);

impl TransactionHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TransactionHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// final outcome of a committed transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminalStatus {
    Success { vm_status: String },
    Failed { vm_status: String },
}

impl TerminalStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TerminalStatus::Success { .. })
    }

    pub fn vm_status(&self) -> &str {
        match self {
            TerminalStatus::Success { vm_status } | TerminalStatus::Failed { vm_status } => vm_status,
        }
    }
}
