//! Property tests for node list decoding

use mmdb_reader::{decode_node_list, DataMap, DataValue, DecodeError, Decoder, EntryData, RawUint128};
use proptest::prelude::*;

fn value_strategy() -> impl Strategy<Value = DataValue> {
    let leaf = prop_oneof![
        "[a-zA-Z0-9 ]{0,12}".prop_map(DataValue::String),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(DataValue::Bytes),
        (-1.0e6f64..1.0e6).prop_map(DataValue::Double),
        any::<u16>().prop_map(DataValue::Uint16),
        any::<u32>().prop_map(DataValue::Uint32),
        any::<u64>().prop_map(DataValue::Uint64),
        any::<u128>().prop_map(DataValue::Uint128),
        any::<i32>().prop_map(DataValue::Int32),
        any::<bool>().prop_map(DataValue::Bool),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(DataValue::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..6)
                .prop_map(|pairs| DataValue::Map(pairs.into_iter().collect::<DataMap>())),
        ]
    })
}

/// Pre-order flattening, the shape the engine produces
fn flatten<'a>(value: &'a DataValue, out: &mut Vec<EntryData<'a>>) {
    match value {
        DataValue::Map(m) => {
            out.push(EntryData::Map { size: m.len() as u32 });
            for (k, v) in m.iter() {
                out.push(EntryData::Utf8String(k.as_bytes()));
                flatten(v, out);
            }
        }
        DataValue::Array(a) => {
            out.push(EntryData::Array { size: a.len() as u32 });
            for v in a {
                flatten(v, out);
            }
        }
        DataValue::String(s) => out.push(EntryData::Utf8String(s.as_bytes())),
        DataValue::Bytes(b) => out.push(EntryData::Bytes(b)),
        DataValue::Double(d) => out.push(EntryData::Double(*d)),
        DataValue::Float(f) => out.push(EntryData::Float(*f)),
        DataValue::Uint16(n) => out.push(EntryData::Uint16(*n)),
        DataValue::Uint32(n) => out.push(EntryData::Uint32(*n)),
        DataValue::Uint64(n) => out.push(EntryData::Uint64(*n)),
        DataValue::Uint128(n) => out.push(EntryData::Uint128(RawUint128::native(n.to_be_bytes()))),
        DataValue::Int32(n) => out.push(EntryData::Int32(*n)),
        DataValue::Bool(b) => out.push(EntryData::Boolean(*b)),
    }
}

proptest! {
    #[test]
    fn prop_flattened_values_rebuild(value in value_strategy()) {
        let mut nodes = Vec::new();
        flatten(&value, &mut nodes);
        let decoded = decode_node_list(&nodes.into()).unwrap();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn prop_map_consumes_two_n_plus_one(
        keys in prop::collection::hash_set("[a-z]{1,8}", 0..20),
        trailing in 0usize..4,
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let mut nodes = vec![EntryData::Map { size: keys.len() as u32 }];
        for (i, k) in keys.iter().enumerate() {
            nodes.push(EntryData::Utf8String(k.as_bytes()));
            nodes.push(EntryData::Uint32(i as u32));
        }
        for _ in 0..trailing {
            nodes.push(EntryData::Boolean(false));
        }

        let mut decoder = Decoder::new(&nodes);
        let value = decoder.decode_value().unwrap();
        prop_assert_eq!(decoder.position(), 2 * keys.len() + 1);
        prop_assert_eq!(value.as_map().map(DataMap::len), Some(keys.len()));
    }

    #[test]
    fn prop_array_consumes_n_plus_one(items in prop::collection::vec(any::<u16>(), 0..40)) {
        let mut nodes = vec![EntryData::Array { size: items.len() as u32 }];
        nodes.extend(items.iter().map(|&n| EntryData::Uint16(n)));
        nodes.push(EntryData::Uint16(0));

        let mut decoder = Decoder::new(&nodes);
        let value = decoder.decode_value().unwrap();
        prop_assert_eq!(decoder.position(), items.len() + 1);
        let expected: Vec<DataValue> = items.into_iter().map(DataValue::Uint16).collect();
        prop_assert_eq!(value, DataValue::Array(expected));
    }

    #[test]
    fn prop_duplicate_keys_last_write_wins(values in prop::collection::vec(any::<u32>(), 1..10)) {
        let mut nodes = vec![EntryData::Map { size: values.len() as u32 + 1 }];
        nodes.push(EntryData::Utf8String(b"first"));
        nodes.push(EntryData::Boolean(true));
        for &v in &values {
            nodes.push(EntryData::Utf8String(b"dup"));
            nodes.push(EntryData::Uint32(v));
        }

        let value = decode_node_list(&nodes.into()).unwrap();
        let map = value.as_map().unwrap();
        prop_assert_eq!(map.len(), 2);
        prop_assert_eq!(map.keys().collect::<Vec<_>>(), vec!["first", "dup"]);
        prop_assert_eq!(map.get("dup"), Some(&DataValue::Uint32(*values.last().unwrap())));
    }

    #[test]
    fn prop_truncated_lists_fail_cleanly(value in value_strategy(), cut in any::<prop::sample::Index>()) {
        let mut nodes = Vec::new();
        flatten(&value, &mut nodes);
        let keep = cut.index(nodes.len());
        nodes.truncate(keep);

        let mut decoder = Decoder::new(&nodes);
        match decoder.decode_value() {
            // A proper prefix can never be a complete value
            Ok(v) => prop_assert!(false, "decoded {:?} from a truncated list", v),
            Err(DecodeError::UnexpectedEnd { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
        prop_assert_eq!(decoder.position(), 0);
    }
}
