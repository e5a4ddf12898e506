//! Cross-format behavior: round-trip laws, polymorphic tagging, the decode
//! allow-list, default concrete containers, and order preservation.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use num_bigint::BigInt;
use serde_json::json;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use uuid::Uuid;
use wireform::codec::{array, deque, dynamic, map, of, optional, seq, sorted_map, sorted_set};
use wireform::config::SeqKind;
use wireform::core::CodecCore;
use wireform::error::CodecError;
use wireform::format::Format;
use wireform::formats::bin::BinCore;
use wireform::formats::json::{JsonCore, JsonReader, JsonWriter};
use wireform::formats::xml::XmlCore;
use wireform::reflect::{DynValue, TypeRef};

#[derive(Debug, Default, Clone, PartialEq)]
struct Person {
    name: String,
    age: u32,
    nickname: Option<String>,
    scores: Vec<i32>,
}

fn sample_person() -> Person {
    Person {
        name: "ada".to_string(),
        age: 36,
        nickname: Some("al".to_string()),
        scores: vec![3, 1, 4],
    }
}

fn register_person<F: Format>(core: &mut CodecCore<F>) {
    core.record::<Person>("demo.Person")
        .field("name", |p| &p.name, |p, v| p.name = v, of())
        .field("age", |p| &p.age, |p, v| p.age = v, of())
        .field(
            "nickname",
            |p| &p.nickname,
            |p, v| p.nickname = v,
            optional(of()),
        )
        .field("scores", |p| &p.scores, |p, v| p.scores = v, seq(of()))
        .build(Person::default);
}

#[test]
fn person_round_trips_in_every_format() {
    for person in [sample_person(), Person::default()] {
        let mut core = JsonCore::new();
        register_person(&mut core);
        let value = core.to_json_value(&person).unwrap();
        assert_eq!(core.from_json_value::<Person>(value).unwrap(), person);

        let mut core = XmlCore::new();
        register_person(&mut core);
        let text = core.to_xml_string(&person).unwrap();
        assert_eq!(core.from_xml_str::<Person>(&text).unwrap(), person);

        let mut core = BinCore::new();
        register_person(&mut core);
        let bytes = core.to_bytes(&person).unwrap();
        assert_eq!(core.from_bytes::<Person>(bytes).unwrap(), person);
    }
}

#[test]
fn json_preserves_field_declaration_order() {
    let mut core = JsonCore::new();
    register_person(&mut core);
    let text = core.to_json_string(&sample_person()).unwrap();
    assert_eq!(
        text,
        r#"{"name":"ada","age":36,"nickname":"al","scores":[3,1,4]}"#
    );
}

#[test]
fn xml_preserves_field_declaration_order() {
    let mut core = XmlCore::new();
    register_person(&mut core);
    let root = core.to_xml_element(&sample_person()).unwrap();
    let names: Vec<_> = root.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["name", "age", "nickname", "scores"]);
}

#[test]
fn dates_encode_as_calendar_fields() {
    let core = JsonCore::new();
    let date = Date::from_calendar_date(2024, Month::March, 15).unwrap();
    assert_eq!(
        core.to_json_string(&date).unwrap(),
        r#"{"year":2024,"month":3,"day":15}"#
    );
    assert_eq!(
        core.from_json_value::<Date>(json!({"year": 2024, "month": 3, "day": 15}))
            .unwrap(),
        date
    );
}

#[test]
fn int_sequences_have_the_documented_byte_form() {
    let mut core = BinCore::new();
    core.register_type(&seq::<i32, _>(of())).unwrap();
    let bytes = core.to_bytes(&vec![1i32, 2, 3]).unwrap();
    assert_eq!(
        bytes.as_ref(),
        &[
            0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00,
            0x00, 0x00, 0x03,
        ]
    );
    assert_eq!(
        core.from_bytes::<Vec<i32>>(bytes).unwrap(),
        vec![1, 2, 3]
    );
}

#[test]
fn dynamic_strings_are_tagged() {
    let core = JsonCore::new();
    let mut w = JsonWriter::new();
    core.encode_dynamic(&"hello".to_string(), &mut w).unwrap();
    let value = w.finish().unwrap();
    assert_eq!(value, json!({"@type": "String", "@value": "hello"}));

    let mut r = JsonReader::new(value);
    let decoded = core.decode_dynamic(&mut r).unwrap();
    assert_eq!(
        decoded.into_any().downcast::<String>().unwrap().as_str(),
        "hello"
    );
}

#[test]
fn string_keyed_maps_take_the_xml_fast_path() {
    let mut core = XmlCore::new();
    core.register_type::<HashMap<String, i32>>(&map(of(), of()))
        .unwrap();
    let mut value = HashMap::new();
    value.insert("a".to_string(), 1);
    value.insert("b".to_string(), 2);

    let root = core.to_xml_element(&value).unwrap();
    assert_eq!(root.children.len(), 2);
    for (key, expected) in [("a", "1"), ("b", "2")] {
        let child = root.children.iter().find(|c| c.name == key).unwrap();
        assert!(child.children.is_empty());
        assert_eq!(child.text, expected);
    }
    assert_eq!(
        core.from_xml_element::<HashMap<String, i32>>(root).unwrap(),
        value
    );
}

#[test]
fn disallowed_tags_fail_before_any_constructor_runs() {
    static CTOR_CALLS: AtomicUsize = AtomicUsize::new(0);

    let mut core = JsonCore::new();
    core.record::<Person>("demo.Person")
        .field("name", |p| &p.name, |p, v| p.name = v, of())
        .build(|| {
            CTOR_CALLS.fetch_add(1, Ordering::Relaxed);
            Person::default()
        });

    let payload = json!({"@type": "java.lang.Runtime", "@value": null});
    let mut r = JsonReader::new(payload);
    let err = match core.decode_dynamic(&mut r) {
        Ok(_) => panic!("expected decode_dynamic to fail"),
        Err(e) => e,
    };
    assert!(matches!(err, CodecError::DisallowedType { .. }));
    assert!(err.to_string().contains("java.lang.Runtime"));

    // A registered but not allow-listed namespace is rejected the same way,
    // and the target's constructor never runs.
    let payload = json!({"@type": "demo.Person", "@value": {"name": "x"}});
    let mut r = JsonReader::new(payload);
    let err = match core.decode_dynamic(&mut r) {
        Ok(_) => panic!("expected decode_dynamic to fail"),
        Err(e) => e,
    };
    assert!(matches!(err, CodecError::DisallowedType { .. }));
    assert_eq!(CTOR_CALLS.load(Ordering::Relaxed), 0);
}

#[test]
fn allowed_namespaces_decode_polymorphically() {
    let mut core = JsonCore::new();
    register_person(&mut core);
    core.config_mut().allow_namespace("demo");

    let person = sample_person();
    let mut w = JsonWriter::new();
    core.encode_dynamic(&person, &mut w).unwrap();
    let value = w.finish().unwrap();
    assert_eq!(value["@type"], "demo.Person");

    let mut r = JsonReader::new(value);
    let decoded = core.decode_dynamic(&mut r).unwrap();
    assert_eq!(
        *decoded.into_any().downcast::<Person>().unwrap(),
        person
    );
}

#[test]
fn shadowed_field_names_get_underscore_prefixes() {
    #[derive(Debug, Default, PartialEq)]
    struct Shadow {
        base: String,
        shadowed: String,
    }

    let mut core = JsonCore::new();
    core.record::<Shadow>("demo.Shadow")
        .field("name", |s| &s.base, |s, v| s.base = v, of())
        .field("name", |s| &s.shadowed, |s, v| s.shadowed = v, of())
        .build(Shadow::default);

    let value = Shadow {
        base: "outer".to_string(),
        shadowed: "inner".to_string(),
    };
    let encoded = core.to_json_value(&value).unwrap();
    assert_eq!(encoded, json!({"name": "outer", "_name": "inner"}));
    assert_eq!(core.from_json_value::<Shadow>(encoded).unwrap(), value);
}

#[test]
fn dynamic_fields_round_trip_with_their_runtime_type() {
    struct Holder {
        value: DynValue,
    }

    for make_core in [JsonCore::new] {
        let mut core = make_core();
        core.record::<Holder>("demo.Holder")
            .field("value", |h| &h.value, |h, v| h.value = v, dynamic())
            .build(|| Holder {
                value: Box::new(0i32),
            });

        let holder = Holder {
            value: Box::new(7i32),
        };
        let encoded = core.to_json_value(&holder).unwrap();
        assert_eq!(encoded["value"], json!({"@type": "i32", "@value": 7}));
        let decoded = core.from_json_value::<Holder>(encoded).unwrap();
        assert_eq!(
            decoded.value.as_ref().as_any().downcast_ref::<i32>(),
            Some(&7)
        );
    }
}

#[test]
fn alternate_containers_encode_under_the_public_identifier() {
    let mut core = JsonCore::new();
    core.register_type(&seq::<i32, _>(of())).unwrap();
    core.register_type(&deque::<i32, _>(of())).unwrap();

    let value: VecDeque<i32> = [1, 2].into_iter().collect();
    let mut w = JsonWriter::new();
    core.encode_dynamic(&value, &mut w).unwrap();
    let encoded = w.finish().unwrap();
    assert_eq!(encoded, json!({"@type": "List<i32>", "@value": [1, 2]}));

    // Decoding lands on the configured default concrete container.
    let mut r = JsonReader::new(encoded);
    let decoded = core.decode_dynamic(&mut r).unwrap();
    assert_eq!(
        *decoded.into_any().downcast::<Vec<i32>>().unwrap(),
        vec![1, 2]
    );
}

#[test]
fn the_default_sequence_kind_is_configurable() {
    let mut core = JsonCore::new();
    core.config_mut().set_default_seq(SeqKind::Deque);
    core.register_type(&seq::<i32, _>(of())).unwrap();

    let mut w = JsonWriter::new();
    core.encode_dynamic(&vec![5i32, 6], &mut w).unwrap();
    let mut r = JsonReader::new(w.finish().unwrap());
    let decoded = core.decode_dynamic(&mut r).unwrap();
    let expected: VecDeque<i32> = [5, 6].into_iter().collect();
    assert_eq!(
        *decoded.into_any().downcast::<VecDeque<i32>>().unwrap(),
        expected
    );
}

#[test]
fn sorted_sets_proxy_to_the_set_identifier() {
    let mut core = JsonCore::new();
    core.register_type(&sorted_set::<i32, _>(of())).unwrap();

    let value: BTreeSet<i32> = [3, 1].into_iter().collect();
    let mut w = JsonWriter::new();
    core.encode_dynamic(&value, &mut w).unwrap();
    let encoded = w.finish().unwrap();
    assert_eq!(encoded["@type"], "Set<i32>");

    let mut r = JsonReader::new(encoded);
    let decoded = core.decode_dynamic(&mut r).unwrap();
    let expected: HashSet<i32> = [1, 3].into_iter().collect();
    assert_eq!(
        *decoded.into_any().downcast::<HashSet<i32>>().unwrap(),
        expected
    );
}

#[test]
fn general_maps_encode_entries_as_records() {
    let mut core = JsonCore::new();
    core.register_type::<HashMap<i32, String>>(&map(of(), of()))
        .unwrap();
    let mut value = HashMap::new();
    value.insert(4, "four".to_string());

    let encoded = core.to_json_value(&value).unwrap();
    assert_eq!(encoded, json!([{"@key": 4, "@value": "four"}]));
    assert_eq!(
        core.from_json_value::<HashMap<i32, String>>(encoded).unwrap(),
        value
    );

    let mut core = BinCore::new();
    core.register_type::<HashMap<i32, String>>(&map(of(), of()))
        .unwrap();
    let bytes = core.to_bytes(&value).unwrap();
    assert_eq!(
        core.from_bytes::<HashMap<i32, String>>(bytes).unwrap(),
        value
    );

    let mut core = XmlCore::new();
    core.register_type::<HashMap<i32, String>>(&map(of(), of()))
        .unwrap();
    let root = core.to_xml_element(&value).unwrap();
    assert_eq!(root.children[0].name, "_");
    assert_eq!(root.children[0].children[0].name, "key");
    assert_eq!(root.children[0].children[1].name, "value");
    assert_eq!(
        core.from_xml_element::<HashMap<i32, String>>(root).unwrap(),
        value
    );
}

#[test]
fn sorted_maps_are_built_from_accumulated_entries() {
    let mut core = BinCore::new();
    core.register_type::<BTreeMap<String, i32>>(&sorted_map(of(), of()))
        .unwrap();
    let mut value = BTreeMap::new();
    value.insert("b".to_string(), 2);
    value.insert("a".to_string(), 1);

    let bytes = core.to_bytes(&value).unwrap();
    let decoded = core.from_bytes::<BTreeMap<String, i32>>(bytes).unwrap();
    assert_eq!(decoded, value);
    assert_eq!(
        decoded.keys().cloned().collect::<Vec<_>>(),
        ["a".to_string(), "b".to_string()]
    );
}

#[test]
fn fieldless_enums_encode_by_variant_name() {
    #[derive(Debug, Clone, PartialEq)]
    enum Color {
        Red,
        Green,
    }

    let mut core = JsonCore::new();
    core.register_enum(
        "demo.Color",
        [("red", Color::Red), ("green", Color::Green)],
    );

    assert_eq!(core.to_json_value(&Color::Green).unwrap(), json!("green"));
    assert_eq!(
        core.from_json_value::<Color>(json!("red")).unwrap(),
        Color::Red
    );
    let err = core.from_json_value::<Color>(json!("blue")).unwrap_err();
    assert!(matches!(err, CodecError::SchemaMismatch { .. }));
}

#[test]
fn big_numbers_and_ids_travel_as_strings() {
    let core = JsonCore::new();
    let big: BigInt = "123456789012345678901234567890".parse().unwrap();
    assert_eq!(
        core.to_json_value(&big).unwrap(),
        json!("123456789012345678901234567890")
    );
    assert_eq!(
        core.from_json_value::<BigInt>(json!("-42")).unwrap(),
        "-42".parse::<BigInt>().unwrap()
    );

    let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
    let encoded = core.to_json_value(&id).unwrap();
    assert_eq!(core.from_json_value::<Uuid>(encoded).unwrap(), id);

    let core = BinCore::new();
    let bytes = core.to_bytes(&big).unwrap();
    assert_eq!(core.from_bytes::<BigInt>(bytes).unwrap(), big);
}

#[test]
fn type_references_resolve_aliases_and_validate() {
    let core = JsonCore::new();
    assert_eq!(
        core.to_json_value(&TypeRef::new("i32")).unwrap(),
        json!("i32")
    );
    assert_eq!(
        core.from_json_value::<TypeRef>(json!("Integer")).unwrap(),
        TypeRef::new("i32")
    );
    let err = core.from_json_value::<TypeRef>(json!("no.such.Type")).unwrap_err();
    assert!(matches!(err, CodecError::UnknownType { .. }));
}

#[test]
fn the_time_surface_round_trips_in_every_format() {
    let date = Date::from_calendar_date(2024, Month::March, 15).unwrap();
    let time = Time::from_hms_nano(10, 30, 0, 125).unwrap();
    let datetime = PrimitiveDateTime::new(date, time);
    let offset = UtcOffset::from_whole_seconds(7200).unwrap();
    let zoned = datetime.assume_offset(offset);
    let duration = Duration::new(5, 250);

    macro_rules! check {
        ($core:expr, $encode:ident, $decode:ident) => {
            let core = $core;
            assert_eq!(core.$decode::<Date>(core.$encode(&date).unwrap()).unwrap(), date);
            assert_eq!(core.$decode::<Time>(core.$encode(&time).unwrap()).unwrap(), time);
            assert_eq!(
                core.$decode::<PrimitiveDateTime>(core.$encode(&datetime).unwrap())
                    .unwrap(),
                datetime
            );
            assert_eq!(
                core.$decode::<UtcOffset>(core.$encode(&offset).unwrap()).unwrap(),
                offset
            );
            assert_eq!(
                core.$decode::<OffsetDateTime>(core.$encode(&zoned).unwrap()).unwrap(),
                zoned
            );
            assert_eq!(
                core.$decode::<Duration>(core.$encode(&duration).unwrap()).unwrap(),
                duration
            );
        };
    }

    check!(JsonCore::new(), to_json_value, from_json_value);
    check!(XmlCore::new(), to_xml_element, from_xml_element);
    check!(BinCore::new(), to_bytes, from_bytes);
}

#[test]
fn component_range_violations_are_schema_mismatches() {
    let core = JsonCore::new();
    let err = core
        .from_json_value::<Date>(json!({"year": 2024, "month": 13, "day": 1}))
        .unwrap_err();
    assert!(matches!(err, CodecError::SchemaMismatch { .. }));
    assert!(err.to_string().contains("time.Date"));
}

#[test]
fn missing_fields_are_schema_mismatches() {
    let mut core = JsonCore::new();
    register_person(&mut core);
    let err = core
        .from_json_value::<Person>(json!({"name": "x"}))
        .unwrap_err();
    assert!(matches!(err, CodecError::SchemaMismatch { .. }));
}

#[test]
fn unregistered_types_fail_at_first_use_not_registration() {
    #[derive(Debug, Default, PartialEq)]
    struct Widget;

    #[derive(Debug, Default, PartialEq)]
    struct Gadget {
        widget: Widget,
    }

    let mut core = JsonCore::new();
    // Registration succeeds even though `Widget` has no codec.
    core.record::<Gadget>("demo.Gadget")
        .field("widget", |g| &g.widget, |g, v| g.widget = v, of())
        .build(Gadget::default);

    let err = core.to_json_value(&Gadget::default()).unwrap_err();
    assert!(matches!(err, CodecError::UnknownType { .. }));
}

#[test]
fn arrays_and_byte_arrays_round_trip() {
    let mut core = JsonCore::new();
    core.register_type::<Box<[String]>>(&array(of())).unwrap();
    let value: Box<[String]> = vec!["a".to_string(), "b".to_string()].into_boxed_slice();
    let encoded = core.to_json_value(&value).unwrap();
    assert_eq!(encoded, json!(["a", "b"]));
    assert_eq!(core.from_json_value::<Box<[String]>>(encoded).unwrap(), value);

    let core = BinCore::new();
    let bytes = core.to_bytes(&vec![1u8, 2, 3]).unwrap();
    assert_eq!(bytes.as_ref(), &[0, 0, 0, 3, 1, 2, 3]);
    assert_eq!(core.from_bytes::<Vec<u8>>(bytes).unwrap(), vec![1, 2, 3]);

    let core = JsonCore::new();
    assert_eq!(core.to_json_value(&vec![1u8, 2, 3]).unwrap(), json!([1, 2, 3]));
}

#[test]
fn optional_values_use_the_null_marker() {
    let mut core = JsonCore::new();
    core.register_type::<Option<i32>>(&optional(of())).unwrap();
    assert_eq!(core.to_json_value(&Some(5i32)).unwrap(), json!(5));
    assert_eq!(core.to_json_value(&None::<i32>).unwrap(), json!(null));
    assert_eq!(core.from_json_value::<Option<i32>>(json!(null)).unwrap(), None);

    let mut core = BinCore::new();
    core.register_type::<Option<i32>>(&optional(of())).unwrap();
    assert_eq!(core.to_bytes(&None::<i32>).unwrap().as_ref(), &[0x00]);
    assert_eq!(
        core.to_bytes(&Some(1i32)).unwrap().as_ref(),
        &[0x01, 0x00, 0x00, 0x00, 0x01]
    );
}

#[test]
fn tagged_decoding_accepts_aliases() {
    let core = JsonCore::new();
    let mut r = JsonReader::new(json!({"@type": "Integer", "@value": 3}));
    let decoded = core.decode_dynamic(&mut r).unwrap();
    assert_eq!(*decoded.into_any().downcast::<i32>().unwrap(), 3);
}

#[test]
fn bootstrap_registrations_can_be_replaced_before_first_use() {
    #[derive(Debug, Default, PartialEq)]
    struct Flag {
        v: String,
    }

    let mut core = JsonCore::new();
    core.record::<Flag>("demo.Flag")
        .field("v", |f| &f.v, |f, v| f.v = v, of())
        .build(Flag::default);
    core.register_string_proxy::<Flag>(
        "demo.Flag",
        |f| f.v.clone(),
        |s| {
            Ok(Flag {
                v: s.to_string(),
            })
        },
    );

    let flag = Flag { v: "x".to_string() };
    assert_eq!(core.to_json_value(&flag).unwrap(), json!("x"));
    assert_eq!(core.from_json_value::<Flag>(json!("x")).unwrap(), flag);
}

#[test]
fn concurrent_encodes_share_one_materialization() {
    let mut core = JsonCore::new();
    register_person(&mut core);
    let core = &core;
    let person = sample_person();

    std::thread::scope(|s| {
        for _ in 0..4 {
            let person = person.clone();
            s.spawn(move || {
                for _ in 0..50 {
                    let value = core.to_json_value(&person).unwrap();
                    assert_eq!(core.from_json_value::<Person>(value).unwrap(), person);
                }
            });
        }
    });
}
