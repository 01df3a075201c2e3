use std::io::Cursor;
use std::rc::Rc;

use graph_data::{DataIn, Encoder, List, Section, TypeRegistry, Value, ValueMap};
use graph_data_codec::{from_json_value, to_json_value, CodecError, JsonTreeCodec, TreeCodec};
use serde_json::json;

#[test]
fn encoded_graph_layout_matrix() {
    let registry = TypeRegistry::with_builtins();
    let shared = Rc::new(List::from_values(["x"]));
    let outer = Rc::new(List::from_values([Value::from(Rc::clone(&shared))]));

    let mut encoder = Encoder::new(&registry);
    encoder
        .write("n", 1)
        .unwrap()
        .write("outer", Value::from(outer))
        .unwrap()
        .write("shared", Value::from(shared))
        .unwrap();

    let json = to_json_value(&encoder.into_tree()).unwrap();
    assert_eq!(
        json,
        json!({
            "n": 1,
            "outer": {
                "__classname": "List",
                "__id": "__#1",
                "size": 1,
                "0": "__#2"
            },
            "shared": {
                "__classname": "List",
                "__id": "__#2",
                "size": 1,
                "0": "x"
            },
            "__#2": { "shared": {} }
        })
    );
}

#[test]
fn graph_survives_json_bytes_matrix() {
    let registry = TypeRegistry::with_builtins();
    let map = Rc::new(ValueMap::new());
    let list = Rc::new(List::from_values([Value::from(1.0), Value::from(2), Value::Null]));
    map.insert("list", Value::from(Rc::clone(&list)));
    map.insert("again", Value::from(list));

    let mut encoder = Encoder::new(&registry);
    encoder.write("map", Value::from(map)).unwrap();
    let mut codec = JsonTreeCodec::pretty();
    let bytes = codec.encode(&encoder.into_tree()).unwrap();

    let tree = codec.decode(&bytes).unwrap();
    let data = DataIn::new(&registry, tree);
    let map = data.read::<Rc<ValueMap>>("map").unwrap().unwrap();
    let first = map.get(&Value::from("list")).unwrap();
    let second = map.get(&Value::from("again")).unwrap();
    assert_eq!(first, second);
    let list = first.downcast::<List>().unwrap();
    assert_eq!(
        list.to_vec(),
        vec![Value::Float(1.0), Value::Integer(2), Value::Null]
    );
}

#[test]
fn deep_graph_survives_json_bytes_matrix() {
    let registry = TypeRegistry::with_builtins();
    let depth = 150;
    let mut head = Rc::new(List::from_values(["bottom"]));
    for _ in 1..depth {
        head = Rc::new(List::from_values([Value::from(head)]));
    }

    let mut encoder = Encoder::new(&registry);
    encoder.write("chain", Value::from(head)).unwrap();
    let mut codec = JsonTreeCodec::new();
    let bytes = codec.encode(&encoder.into_tree()).unwrap();

    let data = DataIn::new(&registry, codec.decode(&bytes).unwrap());
    let mut current = data.read::<Rc<List>>("chain").unwrap().unwrap();
    for _ in 1..depth {
        current = current.get(0).and_then(|v| v.downcast::<List>()).unwrap();
    }
    assert_eq!(current.get(0), Some(Value::from("bottom")));
}

#[test]
fn stream_roundtrip_matrix() {
    let mut tree = Section::new();
    tree.set("flag", true).set_null("nothing");
    tree.create_section("nested").set("text", "héllo");

    let mut codec = JsonTreeCodec::new();
    let mut sink = Vec::new();
    codec.write_to(&tree, &mut sink).unwrap();
    assert_eq!(TreeCodec::id(&codec), "json");

    let back = codec.read_from(Cursor::new(sink)).unwrap();
    assert!(back.get_bool("flag").unwrap());
    assert!(back.contains("nothing"));
    assert_eq!(
        back.get_section("nested").unwrap().get_text("text").unwrap(),
        "héllo"
    );
}

#[test]
fn malformed_input_matrix() {
    let mut codec = JsonTreeCodec::new();
    assert!(matches!(codec.decode(b"{\"a\": "), Err(CodecError::Json(_))));
    assert!(matches!(codec.decode(b"[1, 2]"), Err(CodecError::NotAnObject)));
    assert!(matches!(
        codec.decode(br#"{"list": [1]}"#),
        Err(CodecError::UnsupportedValue { .. })
    ));
    assert!(matches!(codec.decode(b"{} {}"), Err(CodecError::Json(_))));
    assert!(from_json_value(json!({})).unwrap().is_empty());
}
