//! Cross-crate tests through the umbrella crate
//!
//! Exercises the buffer core and the serialization formats together, the
//! way a computation graph hands buffers between nodes and snapshots.

use lamina::{BufferSerialization, ElementArray, ElementKind, SdrPayload, SharedElementBuffer};
use serde_json::json;

#[test]
fn test_fan_in_then_snapshot_round_trip() {
    // two nodes of differing kinds fan in to one destination buffer
    let spikes = ElementArray::from_slice(&[1i16, 0, 2]);
    let potentials = ElementArray::from_slice(&[0.5f32, 0.25]);

    let mut merged = SharedElementBuffer::new(ElementKind::Float64);
    spikes.convert_into(&mut merged, 0, 5).unwrap();
    potentials.convert_into(&mut merged, 3, 5).unwrap();

    let merged = ElementArray::from_buffer(merged);
    assert_eq!(
        merged.as_vec::<f64>().unwrap(),
        vec![1.0, 0.0, 2.0, 0.5, 0.25]
    );

    // the merged buffer survives every snapshot format
    let from_text = ElementArray::from_token_stream(&merged.to_token_stream().unwrap()).unwrap();
    let from_tree = ElementArray::from_tree(&merged.to_tree().unwrap()).unwrap();
    let from_bytes = ElementArray::from_packed(&merged.to_packed().unwrap()).unwrap();
    assert!(from_text == merged);
    assert!(from_tree == merged);
    assert!(from_bytes == merged);
}

#[test]
fn test_shared_payload_is_live_across_the_graph() {
    // one payload handle held by two buffers, mutated through one of them
    let mut producer = ElementArray::new(ElementKind::Sdr);
    producer.allocate_shaped(&[8, 8]).unwrap();
    let mut consumer = ElementArray::new(ElementKind::Sdr);
    consumer.attach_payload(producer.payload().unwrap());
    assert!(consumer.is_alias_of(&producer));

    producer
        .payload()
        .unwrap()
        .borrow_mut()
        .set_sparse(&[0, 9, 63])
        .unwrap();
    assert_eq!(consumer.element_count(), 64);
    assert_eq!(consumer.payload().unwrap().borrow().active_count(), 3);

    // emission sees the state the producer just wrote
    assert_eq!(consumer.to_json_text().unwrap(), "[0,9,63]");
}

#[test]
fn test_snapshot_preserves_kind_and_count_for_every_kind() {
    let mut payload = SdrPayload::new(&[6]).unwrap();
    payload.set_sparse(&[2, 3]).unwrap();

    let buffers = vec![
        ElementArray::from_slice(&[1i8, -1]),
        ElementArray::from_slice(&[1.25f64; 100]),
        ElementArray::from_vec(vec!["dendrite".to_string()]),
        ElementArray::from_payload(&payload),
    ];
    for source in buffers {
        let reloaded = ElementArray::from_packed(&source.to_packed().unwrap()).unwrap();
        assert_eq!(reloaded.kind(), source.kind());
        assert_eq!(reloaded.element_count(), source.element_count());
        assert!(reloaded == source);
    }
}

#[test]
fn test_tree_input_from_an_external_parser() {
    // a collaborator hands over a parsed configuration tree
    let tree = json!({"type": "Float32", "data": [0.5, 0, 1]});
    let weights = ElementArray::from_tree(&tree).unwrap();
    assert_eq!(weights.kind(), ElementKind::Float32);
    assert_eq!(weights.as_vec::<f32>().unwrap(), vec![0.5, 0.0, 1.0]);

    let tree = json!({"type": "SDR(4,4)", "data": [2, 3, 11]});
    let activation = ElementArray::from_tree(&tree).unwrap();
    assert_eq!(activation.element_count(), 16);
    assert_eq!(activation.to_json_text().unwrap(), "[2,3,11]");
}

#[test]
fn test_conversion_chain_across_kinds() {
    // Int32 -> SDR -> Bool -> Str -> Int32 truthiness chain
    let source = ElementArray::from_slice(&[0i32, 5, 0, 7]);
    let sdr = source.convert_to(ElementKind::Sdr).unwrap();
    let flags = sdr.convert_to(ElementKind::Bool).unwrap();
    let texts = flags.convert_to(ElementKind::Str).unwrap();
    assert_eq!(
        texts.as_vec::<String>().unwrap(),
        vec!["false", "true", "false", "true"]
    );
    let bits = texts
        .convert_to(ElementKind::Bool)
        .unwrap()
        .convert_to(ElementKind::Int32)
        .unwrap();
    assert!(source.matches_nonzero_pattern(&[0, 1, 0, 1]));
    assert_eq!(bits.as_vec::<i32>().unwrap(), vec![0, 1, 0, 1]);
}
