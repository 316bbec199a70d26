//! Type definitions for the persisted unit and call documents

use std::fmt::{self, Display};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::placeholder::{parse_reference, reference_placeholder};

/// The unit document: unit name to record, in the operator's dependency order
pub type UnitDocument = IndexMap<String, UnitRecord>;

/// The call document: an ordered sequence of post-deployment invocations
pub type CallDocument = Vec<CallRecord>;

// -------------
// | Arguments |
// -------------

/// A single constructor, initializer, or call argument.
///
/// Persisted as plain JSON. A string slot holding exactly `${<unit>.address}`
/// is read back as a [`Arg::Reference`], an array slot as an [`Arg::List`]
/// whose elements follow the same rules, and anything else as a literal.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    /// A concrete value passed to the provider as-is
    Literal(Value),
    /// The not-yet-known address of another unit
    Reference(String),
    /// A sequence slot, resolved element-wise
    List(Vec<Arg>),
}

impl Arg {
    /// Construct a literal string argument
    pub fn literal(s: impl Into<String>) -> Self {
        Arg::Literal(Value::String(s.into()))
    }

    /// Construct a reference to the address of the given unit
    pub fn reference(unit: impl Into<String>) -> Self {
        Arg::Reference(unit.into())
    }

    /// Whether any placeholder remains in this argument
    pub fn is_resolved(&self) -> bool {
        match self {
            Arg::Literal(_) => true,
            Arg::Reference(_) => false,
            Arg::List(items) => items.iter().all(Arg::is_resolved),
        }
    }

    /// The JSON value handed to the provider.
    ///
    /// Unresolved references are passed through in their textual form, leaving
    /// the provider to reject them.
    pub fn to_value(&self) -> Value {
        match self {
            Arg::Literal(v) => v.clone(),
            Arg::Reference(unit) => Value::String(reference_placeholder(unit)),
            Arg::List(items) => Value::Array(items.iter().map(Arg::to_value).collect()),
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => match parse_reference(&s) {
                Some(unit) => Arg::Reference(unit.to_string()),
                None => Arg::Literal(Value::String(s)),
            },
            Value::Array(items) => Arg::List(items.into_iter().map(Arg::from).collect()),
            other => Arg::Literal(other),
        }
    }
}

impl Serialize for Arg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Arg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Arg::from)
    }
}

/// Convert a slice of arguments into the values handed to the provider
pub fn arg_values(args: &[Arg]) -> Vec<Value> {
    args.iter().map(Arg::to_value).collect()
}

// -----------
// | Records |
// -----------

/// The tracked state of a single deployable unit
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnitRecord {
    /// The unit's address, empty until deployed
    pub address: String,
    /// Arguments for a direct create
    pub constructor_args: Vec<Arg>,
    /// Initializer arguments for a create-behind-proxy
    pub upgrade_args: Vec<Arg>,
    /// The address recorded by the last upgrade
    pub upgraded_address: String,
    /// Whether the provider confirmed creation
    pub deployed: bool,
    /// Whether an upgrade (or initial proxy creation) was applied
    pub upgraded: bool,
    /// Whether the unit's source was verified at its current address
    pub verified: bool,
    /// Operator-supplied keys the engine does not track, kept as written
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UnitRecord {
    /// A fresh record with the given constructor arguments
    pub fn with_constructor_args(args: Vec<Arg>) -> Self {
        UnitRecord {
            constructor_args: args,
            ..Default::default()
        }
    }

    /// A fresh record with the given proxy initializer arguments
    pub fn with_upgrade_args(args: Vec<Arg>) -> Self {
        UnitRecord {
            upgrade_args: args,
            ..Default::default()
        }
    }

    /// The address verification targets: the upgraded address once upgraded
    pub fn effective_address(&self) -> &str {
        if self.upgraded {
            &self.upgraded_address
        } else {
            &self.address
        }
    }
}

/// A single post-deployment invocation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallRecord {
    /// The name of the unit to call
    pub contract_name: String,
    /// The unit's address, filled from the unit document when empty
    #[serde(alias = "contractAddr")]
    pub contract_address: String,
    /// The function to invoke
    pub function_name: String,
    /// The function arguments
    pub args: Vec<Arg>,
    /// Records with `call = false` are skipped
    pub call: bool,
}

// ---------------
// | Environment |
// ---------------

/// Identifies the target environment, used only to select a state file
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvironmentKey {
    /// A numeric chain id
    Id(u64),
    /// A named environment
    Name(String),
}

impl Display for EnvironmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentKey::Id(id) => write!(f, "{}", id),
            EnvironmentKey::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<u64> for EnvironmentKey {
    fn from(id: u64) -> Self {
        EnvironmentKey::Id(id)
    }
}

impl From<&str> for EnvironmentKey {
    fn from(name: &str) -> Self {
        EnvironmentKey::Name(name.to_string())
    }
}

// ----------------
// | Transactions |
// ----------------

/// A handle to a submitted transaction
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TxHandle(pub String);

impl Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The receipt of a confirmed transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// The confirmed transaction
    pub tx: TxHandle,
    /// The block the transaction was included in, if reported
    pub block_number: Option<u64>,
    /// Whether the transaction executed successfully
    pub success: bool,
}

// -----------
// | Reports |
// -----------

/// How the deploy phase creates units
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeployMode {
    /// Plain create with the unit's constructor arguments
    Direct,
    /// Create behind an upgradeable proxy with the unit's upgrade arguments
    Proxy,
}

/// The per-unit outcome of a phase
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhaseReport {
    /// Units the phase acted on successfully
    pub succeeded: Vec<String>,
    /// Units the phase left untouched
    pub skipped: Vec<String>,
    /// Units whose provider operation failed, with the reason
    pub failed: Vec<(String, String)>,
}

impl PhaseReport {
    /// Whether every attempted unit succeeded
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A call that was invoked and confirmed, possibly reverted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallOutcome {
    /// The called unit
    pub contract_name: String,
    /// The invoked function
    pub function_name: String,
    /// The confirmed transaction
    pub tx: TxHandle,
    /// Whether the transaction executed without reverting
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Arg, CallRecord, UnitRecord};

    #[test]
    fn test_arg_parsing() {
        assert_eq!(Arg::from(json!("${Token.address}")), Arg::reference("Token"));
        assert_eq!(Arg::from(json!("0xabc")), Arg::literal("0xabc"));
        assert_eq!(Arg::from(json!(42)), Arg::Literal(json!(42)));
        assert_eq!(
            Arg::from(json!(["${A.address}", 1])),
            Arg::List(vec![Arg::reference("A"), Arg::Literal(json!(1))])
        );
    }

    #[test]
    fn test_unit_record_missing_fields() {
        let record: UnitRecord =
            serde_json::from_value(json!({ "constructorArgs": ["${A.address}"] })).unwrap();

        assert_eq!(record.constructor_args, vec![Arg::reference("A")]);
        assert!(record.address.is_empty());
        assert!(!record.deployed);
        assert!(!record.upgraded);
    }

    #[test]
    fn test_unit_record_field_names() {
        let value = serde_json::to_value(UnitRecord::default()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();

        assert_eq!(
            keys,
            vec![
                "address",
                "constructorArgs",
                "upgradeArgs",
                "upgradedAddress",
                "deployed",
                "upgraded",
                "verified"
            ]
        );
    }

    #[test]
    fn test_call_record_legacy_address_key() {
        let record: CallRecord = serde_json::from_value(json!({
            "contractName": "Treasury",
            "contractAddr": "0x01",
            "functionName": "setOwner",
            "args": [],
            "call": true
        }))
        .unwrap();

        assert_eq!(record.contract_address, "0x01");
    }

    #[test]
    fn test_effective_address() {
        let mut record = UnitRecord {
            address: "0x01".to_string(),
            upgraded_address: "0x02".to_string(),
            ..Default::default()
        };
        assert_eq!(record.effective_address(), "0x01");

        record.upgraded = true;
        assert_eq!(record.effective_address(), "0x02");
    }
}
