//! Resolution of cross-unit address placeholders.
//!
//! Argument slots may reference another unit's address before that unit is
//! deployed. Once the address is known, every matching slot in the unit and
//! call documents is rewritten to the literal address. Resolved slots no
//! longer match any placeholder, so resolving twice is a no-op.
//!
//! Unit documents only resolve slots that are exactly a placeholder. Call
//! documents also resolve any string slot that contains one, replacing the
//! whole slot with the address.

use serde_json::Value;

use crate::types::{Arg, CallRecord, UnitDocument};

/// The prefix of a textual placeholder
const PLACEHOLDER_PREFIX: &str = "${";
/// The suffix of a textual placeholder
const PLACEHOLDER_SUFFIX: &str = ".address}";

/// Render the textual placeholder for the given unit's address
pub fn reference_placeholder(unit: &str) -> String {
    format!("{PLACEHOLDER_PREFIX}{unit}{PLACEHOLDER_SUFFIX}")
}

/// Parse a textual placeholder, returning the referenced unit name
pub fn parse_reference(s: &str) -> Option<&str> {
    let unit = s
        .trim()
        .strip_prefix(PLACEHOLDER_PREFIX)?
        .strip_suffix(PLACEHOLDER_SUFFIX)?;

    (!unit.is_empty()).then_some(unit)
}

/// Replace references to `unit` in `args` with `address`, returning the
/// number of slots rewritten
pub fn resolve_args(args: &mut [Arg], unit: &str, address: &str) -> usize {
    args.iter_mut()
        .map(|arg| resolve_arg(arg, unit, address))
        .sum()
}

/// Resolve a single slot, descending into sequences
fn resolve_arg(arg: &mut Arg, unit: &str, address: &str) -> usize {
    match arg {
        Arg::Reference(name) if name == unit => {
            *arg = Arg::Literal(Value::String(address.to_string()));
            1
        }
        Arg::List(items) => resolve_args(items, unit, address),
        _ => 0,
    }
}

/// Replace every call argument slot referencing `unit` with `address`,
/// returning the number of slots rewritten.
///
/// Besides exact references, a literal string slot that contains the
/// unit's placeholder anywhere is replaced in full.
pub fn resolve_call_args(args: &mut [Arg], unit: &str, address: &str) -> usize {
    let placeholder = reference_placeholder(unit);
    args.iter_mut()
        .map(|arg| resolve_call_arg(arg, unit, &placeholder, address))
        .sum()
}

/// Resolve a single call slot, descending into sequences
fn resolve_call_arg(arg: &mut Arg, unit: &str, placeholder: &str, address: &str) -> usize {
    match arg {
        Arg::Literal(Value::String(s)) if s.contains(placeholder) => {
            *arg = Arg::literal(address);
            1
        }
        Arg::List(items) => items
            .iter_mut()
            .map(|item| resolve_call_arg(item, unit, placeholder, address))
            .sum(),
        _ => resolve_arg(arg, unit, address),
    }
}

/// Propagate a newly known address into the argument slots of every unit
pub fn propagate_to_units(units: &mut UnitDocument, unit: &str, address: &str) -> usize {
    units
        .values_mut()
        .map(|record| {
            resolve_args(&mut record.constructor_args, unit, address)
                + resolve_args(&mut record.upgrade_args, unit, address)
        })
        .sum()
}

/// Propagate a known address into the call document: fills empty
/// `contractAddress` slots for the unit and resolves argument references
pub fn propagate_to_calls(calls: &mut [CallRecord], unit: &str, address: &str) -> usize {
    calls
        .iter_mut()
        .map(|call| {
            let mut rewritten = 0;
            if call.contract_name == unit && call.contract_address.is_empty() {
                call.contract_address = address.to_string();
                rewritten += 1;
            }

            rewritten + resolve_call_args(&mut call.args, unit, address)
        })
        .sum()
}

/// Seed the unit document with every address already known from a
/// previously persisted run
pub fn seed_units(units: &mut UnitDocument) {
    let known = known_addresses(units);
    for (unit, address) in known {
        propagate_to_units(units, &unit, &address);
    }
}

/// Seed the call document with every address known in the unit document
pub fn seed_calls(calls: &mut [CallRecord], units: &UnitDocument) {
    for (unit, address) in known_addresses(units) {
        propagate_to_calls(calls, &unit, &address);
    }
}

/// The (unit, address) pairs of every unit with a non-empty address
fn known_addresses(units: &UnitDocument) -> Vec<(String, String)> {
    units
        .iter()
        .filter(|(_, record)| !record.address.is_empty())
        .map(|(name, record)| (name.clone(), record.address.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::types::{Arg, CallRecord, UnitDocument, UnitRecord};

    use super::{
        parse_reference, propagate_to_calls, propagate_to_units, reference_placeholder,
        resolve_args, seed_calls, seed_units,
    };

    #[test]
    fn test_placeholder_format() {
        assert_eq!(reference_placeholder("Token"), "${Token.address}");
        assert_eq!(parse_reference("${Token.address}"), Some("Token"));
        assert_eq!(parse_reference(" ${Token.address} "), Some("Token"));
        assert_eq!(parse_reference("${.address}"), None);
        assert_eq!(parse_reference("Token.address"), None);
        assert_eq!(parse_reference("0x1234"), None);
    }

    #[test]
    fn test_resolve_nested_and_idempotent() {
        let mut args = vec![
            Arg::reference("A"),
            Arg::reference("B"),
            Arg::List(vec![Arg::reference("A"), Arg::Literal(json!(7))]),
        ];

        assert_eq!(resolve_args(&mut args, "A", "0xaa"), 2);
        assert_eq!(
            args,
            vec![
                Arg::literal("0xaa"),
                Arg::reference("B"),
                Arg::List(vec![Arg::literal("0xaa"), Arg::Literal(json!(7))]),
            ]
        );

        // Already-resolved slots no longer match
        assert_eq!(resolve_args(&mut args, "A", "0xbb"), 0);
        assert_eq!(args[0], Arg::literal("0xaa"));
    }

    #[test]
    fn test_propagate_to_units_touches_both_arg_lists() {
        let mut units = UnitDocument::new();
        units.insert(
            "B".to_string(),
            UnitRecord {
                constructor_args: vec![Arg::reference("A")],
                upgrade_args: vec![Arg::reference("A"), Arg::literal("x")],
                ..Default::default()
            },
        );

        assert_eq!(propagate_to_units(&mut units, "A", "0xaa"), 2);
        assert_eq!(units["B"].constructor_args, vec![Arg::literal("0xaa")]);
        assert_eq!(units["B"].upgrade_args[0], Arg::literal("0xaa"));
    }

    #[test]
    fn test_seed_units_uses_persisted_addresses() {
        let mut units = UnitDocument::new();
        units.insert(
            "A".to_string(),
            UnitRecord {
                address: "0xaa".to_string(),
                deployed: true,
                ..Default::default()
            },
        );
        units.insert(
            "B".to_string(),
            UnitRecord::with_constructor_args(vec![Arg::reference("A"), Arg::reference("C")]),
        );

        seed_units(&mut units);

        assert_eq!(
            units["B"].constructor_args,
            vec![Arg::literal("0xaa"), Arg::reference("C")]
        );
    }

    #[test]
    fn test_propagate_to_calls_fills_empty_address_only() {
        let mut calls = vec![
            CallRecord {
                contract_name: "A".to_string(),
                args: vec![Arg::reference("A")],
                call: true,
                ..Default::default()
            },
            CallRecord {
                contract_name: "A".to_string(),
                contract_address: "0xfixed".to_string(),
                call: true,
                ..Default::default()
            },
        ];

        assert_eq!(propagate_to_calls(&mut calls, "A", "0xaa"), 2);
        assert_eq!(calls[0].contract_address, "0xaa");
        assert_eq!(calls[0].args, vec![Arg::literal("0xaa")]);
        assert_eq!(calls[1].contract_address, "0xfixed");
    }

    #[test]
    fn test_call_args_resolve_embedded_placeholders() {
        let mut units = UnitDocument::new();
        units.insert(
            "A".to_string(),
            UnitRecord {
                address: "0xaa".to_string(),
                deployed: true,
                ..Default::default()
            },
        );
        let mut calls = vec![CallRecord {
            contract_name: "B".to_string(),
            args: serde_json::from_value(json!([
                "prefix-${A.address}",
                ["${A.address}", "keep-${B.address}"],
                "${A.address}",
                7
            ]))
            .unwrap(),
            call: true,
            ..Default::default()
        }];

        seed_calls(&mut calls, &units);

        assert_eq!(
            calls[0].args,
            vec![
                Arg::literal("0xaa"),
                Arg::List(vec![Arg::literal("0xaa"), Arg::literal("keep-${B.address}")]),
                Arg::literal("0xaa"),
                Arg::Literal(json!(7)),
            ]
        );

        // Unit documents keep exact matching
        let mut unit_args: Vec<Arg> =
            serde_json::from_value(json!(["prefix-${A.address}"])).unwrap();
        assert_eq!(resolve_args(&mut unit_args, "A", "0xaa"), 0);
    }
}
