//! Tests for the Lamina shared buffer core
//!
//! Covers allocation and release invariants, shared-handle aliasing, the
//! element conversion registry, fan-in conversion, and the value wrapper.

use std::cell::RefCell;
use std::rc::Rc;

use lamina_structures::{
    BufferElement, ElementArray, ElementKind, ElementStore, LaminaDataError, OpaqueHandle,
    SdrPayload, SharedElementBuffer,
};

#[test]
fn test_empty_allocation_is_distinct_from_unallocated() {
    let mut buffer = SharedElementBuffer::new(ElementKind::Int32);
    assert!(!buffer.has_storage());
    assert_eq!(buffer.element_count(), 0);
    assert!(buffer.values::<i32>().is_err());

    buffer.allocate(0).unwrap();
    assert!(buffer.has_storage());
    assert_eq!(buffer.element_count(), 0);
    // a zero-element allocation still yields a valid, accessible view
    assert!(buffer.values::<i32>().unwrap().is_empty());

    buffer.release();
    assert!(!buffer.has_storage());
    buffer.release(); // release is idempotent
    assert!(!buffer.has_storage());
}

#[test]
fn test_allocation_is_zero_filled_for_every_kind() {
    for kind in ElementKind::ALL {
        let mut buffer = SharedElementBuffer::new(kind);
        buffer.allocate(5).unwrap();
        assert!(buffer.has_storage(), "kind {}", kind);
        assert_eq!(buffer.element_count(), 5, "kind {}", kind);
        assert!(buffer.matches_nonzero_pattern(&[0, 0, 0, 0, 0]), "kind {}", kind);
    }
}

#[test]
fn test_shared_handles_alias_one_storage() {
    let mut buffer = SharedElementBuffer::new(ElementKind::Float32);
    buffer.allocate(3).unwrap();

    let mut alias = buffer.share_handle();
    assert!(alias.is_alias_of(&buffer));
    assert!(buffer.is_alias_of(&alias));

    alias.values_mut::<f32>().unwrap()[1] = 2.5;
    assert_eq!(buffer.values::<f32>().unwrap()[1], 2.5);

    // reallocation disconnects this handle only
    alias.allocate(3).unwrap();
    assert!(!alias.is_alias_of(&buffer));
    assert_eq!(buffer.values::<f32>().unwrap()[1], 2.5);
    assert_eq!(alias.values::<f32>().unwrap()[1], 0.0);
}

#[test]
fn test_aliasing_requires_identity_not_equality() {
    let a = ElementArray::from_slice(&[1i64, 2, 3]);
    let b = ElementArray::from_slice(&[1i64, 2, 3]);
    assert!(a == b);
    assert!(!a.is_alias_of(&b));

    let unallocated_a = SharedElementBuffer::new(ElementKind::Bool);
    let unallocated_b = SharedElementBuffer::new(ElementKind::Bool);
    assert!(!unallocated_a.is_alias_of(&unallocated_b));
    assert!(!unallocated_a.is_alias_of(&unallocated_a));
}

#[test]
fn test_attach_shared_storage() {
    let storage = Rc::new(RefCell::new(<i32 as BufferElement>::store_from_vec(vec![
        10, 20, 30,
    ])));

    let mut buffer = SharedElementBuffer::new(ElementKind::Int32);
    buffer.attach_shared(Rc::clone(&storage)).unwrap();
    assert_eq!(buffer.element_count(), 3);
    assert_eq!(buffer.values::<i32>().unwrap()[1], 20);

    // the caller's handle observes writes made through the buffer
    buffer.values_mut::<i32>().unwrap()[1] = 99;
    match &*storage.borrow() {
        ElementStore::Int32(values) => assert_eq!(values[1], 99),
        other => panic!("unexpected store {:?}", other),
    }

    // kind mismatch is rejected
    let mut wrong = SharedElementBuffer::new(ElementKind::Float64);
    assert!(matches!(
        wrong.attach_shared(storage),
        Err(LaminaDataError::TypeMismatch(_))
    ));
}

#[test]
fn test_attach_payload_shares_the_live_object() {
    let payload = Rc::new(RefCell::new(SdrPayload::new(&[4]).unwrap()));

    let mut buffer = SharedElementBuffer::new(ElementKind::Sdr);
    buffer.attach_payload(Rc::clone(&payload));
    assert_eq!(buffer.element_count(), 4);

    // count is re-derived from the live payload after external mutation
    payload
        .borrow_mut()
        .set_dense(&[1, 0, 1, 0])
        .unwrap();
    assert_eq!(buffer.payload().unwrap().borrow().active_count(), 2);
    assert_eq!(buffer.dense_values().unwrap().to_vec(), vec![1, 0, 1, 0]);
}

#[test]
fn test_zero_clears_every_kind_its_own_way() {
    let mut numeric = ElementArray::from_slice(&[4i16, -2, 9]);
    numeric.zero();
    assert_eq!(numeric.as_vec::<i16>().unwrap(), vec![0, 0, 0]);

    let mut strings = ElementArray::from_vec(vec!["alpha".to_string(), "beta".to_string()]);
    strings.zero();
    assert_eq!(
        strings.as_vec::<String>().unwrap(),
        vec![String::new(), String::new()]
    );

    let mut payload = SdrPayload::new(&[2, 2]).unwrap();
    payload.set_sparse(&[0, 3]).unwrap();
    let mut sdr = ElementArray::from_payload(&payload);
    sdr.zero();
    assert_eq!(sdr.payload().unwrap().borrow().active_count(), 0);
    assert_eq!(sdr.element_count(), 4);
}

#[test]
fn test_sdr_flat_allocation_is_rank_one() {
    let mut buffer = SharedElementBuffer::new(ElementKind::Sdr);
    buffer.allocate(6).unwrap();
    let payload = buffer.payload().unwrap();
    assert_eq!(payload.borrow().dimensions(), &[6]);
    assert_eq!(buffer.element_count(), 6);

    let mut shaped = SharedElementBuffer::new(ElementKind::Sdr);
    shaped.allocate_shaped(&[3, 4]).unwrap();
    assert_eq!(shaped.element_count(), 12);

    let mut not_sdr = SharedElementBuffer::new(ElementKind::Int8);
    assert!(matches!(
        not_sdr.allocate_shaped(&[3, 4]),
        Err(LaminaDataError::TypeMismatch(_))
    ));
}

#[test]
fn test_conversion_widening_and_narrowing() {
    let source = ElementArray::from_slice(&[1i32, -7, 300]);

    let widened = source.convert_to(ElementKind::Int64).unwrap();
    assert_eq!(widened.as_vec::<i64>().unwrap(), vec![1, -7, 300]);

    let floated = source.convert_to(ElementKind::Float64).unwrap();
    assert_eq!(floated.as_vec::<f64>().unwrap(), vec![1.0, -7.0, 300.0]);

    // 300 does not fit in an i8; narrowing errors rather than clamps
    assert!(matches!(
        source.convert_to(ElementKind::Int8),
        Err(LaminaDataError::OutOfRange(_))
    ));

    // -7 does not fit in any unsigned kind
    assert!(matches!(
        source.convert_to(ElementKind::UInt16),
        Err(LaminaDataError::OutOfRange(_))
    ));
}

#[test]
fn test_conversion_between_floats_and_integers() {
    let source = ElementArray::from_slice(&[0.0f64, 1.5, -2.75]);
    let truncated = source.convert_to(ElementKind::Int32).unwrap();
    assert_eq!(truncated.as_vec::<i32>().unwrap(), vec![0, 1, -2]);

    let huge = ElementArray::from_slice(&[1.0e300f64]);
    assert!(matches!(
        huge.convert_to(ElementKind::Int64),
        Err(LaminaDataError::OutOfRange(_))
    ));
    assert!(matches!(
        huge.convert_to(ElementKind::Float32),
        Err(LaminaDataError::OutOfRange(_))
    ));

    let bools = ElementArray::from_slice(&[0i8, 3, 0, -1]);
    assert_eq!(
        bools.convert_to(ElementKind::Bool).unwrap().as_vec::<bool>().unwrap(),
        vec![false, true, false, true]
    );
}

#[test]
fn test_conversion_through_strings() {
    let source = ElementArray::from_slice(&[12u32, 0, 400]);
    let texts = source.convert_to(ElementKind::Str).unwrap();
    assert_eq!(
        texts.as_vec::<String>().unwrap(),
        vec!["12".to_string(), "0".to_string(), "400".to_string()]
    );

    let parsed = texts.convert_to(ElementKind::UInt32).unwrap();
    assert!(parsed == source);

    let garbage = ElementArray::from_vec(vec!["twelve".to_string()]);
    assert!(matches!(
        garbage.convert_to(ElementKind::UInt32),
        Err(LaminaDataError::OutOfRange(_))
    ));

    let flags = ElementArray::from_vec(vec!["true".to_string(), "off".to_string(), "1".to_string()]);
    assert_eq!(
        flags.convert_to(ElementKind::Bool).unwrap().as_vec::<bool>().unwrap(),
        vec![true, false, true]
    );
}

#[test]
fn test_conversion_with_sdr_payloads() {
    let source = ElementArray::from_slice(&[0i32, 5, 0, 7]);
    let sdr = source.convert_to(ElementKind::Sdr).unwrap();
    assert_eq!(sdr.payload().unwrap().borrow().to_sparse(), vec![1, 3]);

    let back = sdr.convert_to(ElementKind::Int32).unwrap();
    assert_eq!(back.as_vec::<i32>().unwrap(), vec![0, 1, 0, 1]);
}

#[test]
fn test_handle_buffers_refuse_conversion() {
    let handles = ElementArray::from_vec(vec![OpaqueHandle(3), OpaqueHandle(0)]);
    assert!(matches!(
        handles.convert_to(ElementKind::Int64),
        Err(LaminaDataError::TypeMismatch(_))
    ));
    let source = ElementArray::from_slice(&[1i32]);
    assert!(matches!(
        source.convert_to(ElementKind::Handle),
        Err(LaminaDataError::TypeMismatch(_))
    ));
    // handles still allocate, zero, and compare
    assert_eq!(handles.item::<OpaqueHandle>(0).unwrap(), OpaqueHandle(3));
    assert!(handles == handles.deep_copy());
}

#[test]
fn test_convert_into_grows_and_zero_fills() {
    let source = ElementArray::from_slice(&[10i32, 20, 30, 40, 50]);
    let mut destination = SharedElementBuffer::new(ElementKind::Int64);
    assert_eq!(destination.element_count(), 0);

    source.convert_into(&mut destination, 2, 0).unwrap();
    assert_eq!(destination.element_count(), 7);
    let values = destination.values::<i64>().unwrap().to_vec();
    assert_eq!(values, vec![0, 0, 10, 20, 30, 40, 50]);
}

#[test]
fn test_fan_in_conversion_in_increasing_offset_order() {
    let first = ElementArray::from_slice(&[1i16, 2, 3]);
    let second = ElementArray::from_slice(&[4.0f32, 5.0]);

    let mut destination = SharedElementBuffer::new(ElementKind::Float64);
    // pre-size with the final limit so no intermediate reallocation occurs
    first.convert_into(&mut destination, 0, 5).unwrap();
    second.convert_into(&mut destination, 3, 5).unwrap();

    let mut reference = SharedElementBuffer::new(ElementKind::Float64);
    reference.allocate(5).unwrap();
    {
        let mut values = reference.values_mut::<f64>().unwrap();
        values[0] = 1.0;
        values[1] = 2.0;
        values[2] = 3.0;
        values[3] = 4.0;
        values[4] = 5.0;
    }
    assert!(destination == reference);
}

#[test]
fn test_convert_into_window_overflow_is_rejected() {
    let source = ElementArray::from_slice(&[1u16, 2, 3, 4]);
    let mut destination = SharedElementBuffer::new(ElementKind::UInt32);
    destination.allocate(8).unwrap();
    // limit 5 cannot hold 4 elements at offset 2
    assert!(matches!(
        source.convert_into(&mut destination, 2, 5),
        Err(LaminaDataError::OutOfRange(_))
    ));
}

#[test]
fn test_truthiness_comparison() {
    let buffer = ElementArray::from_slice(&[0i32, 5, 0, 7]);
    assert!(buffer.matches_nonzero_pattern(&[0, 1, 0, 1]));
    assert!(buffer.matches_nonzero_pattern(&[0, 9, 0, 200]));
    assert!(!buffer.matches_nonzero_pattern(&[1, 0, 0, 1]));
    assert!(!buffer.matches_nonzero_pattern(&[0, 1, 0]));

    let wide = ElementArray::from_slice(&[0u64, u64::MAX]);
    assert!(wide.matches_nonzero_pattern(&[0, 1]));
}

#[test]
fn test_equality_rules() {
    let a = ElementArray::from_slice(&[1.5f32, f32::NAN]);
    let b = a.deep_copy();
    // bit-exact comparison: NaN equals its copy
    assert!(a == b);

    let mut empty_a = SharedElementBuffer::new(ElementKind::Str);
    let mut empty_b = SharedElementBuffer::new(ElementKind::Str);
    empty_a.allocate(0).unwrap();
    empty_b.allocate(0).unwrap();
    assert!(empty_a == empty_b);

    let ints = ElementArray::from_slice(&[1i32, 2]);
    let longs = ElementArray::from_slice(&[1i64, 2]);
    assert!(*ints != *longs); // equal contents, differing kinds

    let strings_a = ElementArray::from_vec(vec!["axon".to_string()]);
    let strings_b = ElementArray::from_vec(vec!["axon".to_string()]);
    let strings_c = ElementArray::from_vec(vec!["soma".to_string()]);
    assert!(strings_a == strings_b);
    assert!(strings_a != strings_c);
}

#[test]
fn test_item_access_checks() {
    let array = ElementArray::from_slice(&[5i32, 6, 7]);
    assert_eq!(array.item::<i32>(2).unwrap(), 7);
    assert!(matches!(
        array.item::<i32>(3),
        Err(LaminaDataError::OutOfRange(_))
    ));
    assert!(matches!(
        array.item::<i64>(0),
        Err(LaminaDataError::TypeMismatch(_))
    ));
}

#[test]
fn test_subset_rules() {
    let array = ElementArray::from_vec((0i32..10).collect::<Vec<_>>());
    let window = array.subset(3, 4).unwrap();
    assert_eq!(window.as_vec::<i32>().unwrap(), vec![3, 4, 5, 6]);
    assert!(!window.is_alias_of(&array));

    assert!(matches!(
        array.subset(8, 3),
        Err(LaminaDataError::OutOfRange(_))
    ));

    let mut sdr = ElementArray::new(ElementKind::Sdr);
    sdr.allocate(4).unwrap();
    assert!(matches!(
        sdr.subset(0, 2),
        Err(LaminaDataError::UnsupportedForSdr(_))
    ));

    let strings = ElementArray::from_vec(vec![
        "a".to_string(),
        "b".to_string(),
        "c".to_string(),
    ]);
    assert_eq!(
        strings.subset(1, 2).unwrap().as_vec::<String>().unwrap(),
        vec!["b".to_string(), "c".to_string()]
    );
}

#[test]
fn test_populate_and_extract() {
    let mut array = ElementArray::new(ElementKind::Float32);
    array.populate(&[1i32, 2, 3]).unwrap();
    assert_eq!(array.element_count(), 3);
    assert_eq!(array.as_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0]);

    // populating reallocates to the new length
    array.populate(&[9i32]).unwrap();
    assert_eq!(array.element_count(), 1);

    let mut sdr = ElementArray::new(ElementKind::Sdr);
    sdr.populate(&[0i32, 2, 0, 1]).unwrap();
    let payload = sdr.payload().unwrap();
    assert_eq!(payload.borrow().dimensions(), &[4]);
    assert_eq!(payload.borrow().to_sparse(), vec![1, 3]);
}

#[test]
fn test_deep_copy_breaks_aliasing_and_preserves_dimensions() {
    let mut payload = SdrPayload::new(&[2, 3]).unwrap();
    payload.set_sparse(&[1, 4]).unwrap();
    let original = ElementArray::from_payload(&payload);

    let copy = original.deep_copy();
    assert!(copy == original);
    assert!(!copy.is_alias_of(&original));
    assert_eq!(copy.payload().unwrap().borrow().dimensions(), &[2, 3]);

    // mutating the copy leaves the original untouched
    copy.payload().unwrap().borrow_mut().zero();
    assert_eq!(original.payload().unwrap().borrow().active_count(), 2);
}

#[test]
fn test_truncate_keeps_shared_storage() {
    let mut array = ElementArray::from_slice(&[1u16, 2, 3, 4]);
    let alias = array.share_handle();
    array.truncate(2).unwrap();
    assert_eq!(alias.element_count(), 2);
    assert!(matches!(
        array.truncate(5),
        Err(LaminaDataError::OutOfRange(_))
    ));

    let mut sdr = ElementArray::new(ElementKind::Sdr);
    sdr.allocate(3).unwrap();
    assert!(matches!(
        sdr.truncate(1),
        Err(LaminaDataError::UnsupportedForSdr(_))
    ));
}

#[test]
fn test_payload_view_caching() {
    // a dense construction normalizes every non-zero byte to 1
    let payload = SdrPayload::from_dense(&[0, 7, 1]);
    assert_eq!(payload.dimensions(), &[3]);
    assert_eq!(payload.dense(), &[0, 1, 1]);
    assert_eq!(payload.to_sparse(), vec![1, 2]);

    let mut payload = SdrPayload::new(&[5]).unwrap();
    payload.set_dense(&[0, 1, 0, 0, 1]).unwrap();
    assert_eq!(payload.sparse(), &[1, 4]);

    // a dense mutation invalidates the cached sparse view
    payload.dense_mut()[0] = 1;
    assert_eq!(payload.sparse(), &[0, 1, 4]);
    assert_eq!(payload.active_count(), 3);

    payload.zero();
    assert!(payload.sparse().is_empty());
}

#[test]
fn test_dense_view_mutation_refreshes_the_sparse_cache() {
    let mut buffer = SharedElementBuffer::new(ElementKind::Sdr);
    buffer.allocate(5).unwrap();
    buffer.dense_values_mut().unwrap()[3] = 1;
    assert_eq!(buffer.payload().unwrap().borrow().to_sparse(), vec![3]);
    assert_eq!(buffer.byte_len(), 5);

    let mut ints = SharedElementBuffer::new(ElementKind::Int32);
    ints.allocate(5).unwrap();
    assert_eq!(ints.byte_len(), 20);
    assert!(ints.dense_values().is_err());
    assert!(ints.dense_values_mut().is_err());
}

#[test]
fn test_kind_registry_round_trips() {
    for kind in ElementKind::ALL {
        let tag = kind as u8;
        assert_eq!(ElementKind::try_from(tag).unwrap(), kind);
        assert_eq!(ElementKind::parse_name(kind.name()).unwrap(), kind);
    }
    assert_eq!(ElementKind::Int64.fixed_byte_size(), Some(8));
    assert_eq!(ElementKind::Sdr.fixed_byte_size(), Some(1));
    assert_eq!(ElementKind::Str.fixed_byte_size(), None);
    assert!(matches!(
        ElementKind::try_from(13u8),
        Err(LaminaDataError::InvalidKind(_))
    ));
    assert!(matches!(
        ElementKind::parse_name("Quaternion"),
        Err(LaminaDataError::InvalidKind(_))
    ));
}

#[test]
fn test_ndarray_copy_out() {
    let array = ElementArray::from_slice(&[3i32, 1, 4]);
    let nd = array.copy_as_ndarray::<f64>().unwrap();
    assert_eq!(nd.to_vec(), vec![3.0, 1.0, 4.0]);
}
