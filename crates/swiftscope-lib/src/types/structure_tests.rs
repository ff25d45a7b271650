use swiftscope_abi::{DecodeError, Precondition};
use swiftscope_core::Memory;

use crate::Error;
use crate::types::Type;
use crate::types::test_image::Dummy;

#[test]
fn big_struct_layout_and_fields() {
    let dummy = Dummy::new();
    let ty = dummy.ty(dummy.big_struct);
    let big = ty.as_struct().unwrap();

    assert_eq!(ty.qualified_name(), "dummy.BigStruct");
    let layout = big.type_layout().unwrap();
    assert_eq!((layout.size, layout.stride, layout.alignment()), (40, 40, 8));
    assert_eq!(big.num_fields().unwrap(), 5);
    assert_eq!(big.field_offsets().unwrap(), [0, 8, 16, 24, 32]);

    let names: Vec<_> = big.info().fields().unwrap().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c", "d", "e"]);
    assert!(big.info().fields().unwrap().iter().all(|f| !f.is_var));
}

#[test]
fn big_struct_snapshot() {
    let dummy = Dummy::new();
    let registry = dummy.registry();
    let big = registry.type_by_name("dummy.BigStruct").unwrap();

    insta::assert_yaml_snapshot!(big.to_json().unwrap(), @r#"
    conformances:
      - Shape
    fields:
      - isVar: false
        name: a
        typeName: Swift.Int
      - isVar: false
        name: b
        typeName: Swift.Int
      - isVar: false
        name: c
        typeName: Swift.Int
      - isVar: false
        name: d
        typeName: Swift.Int
      - isVar: false
        name: e
        typeName: Swift.Int
    "#);
}

#[test]
fn empty_struct_has_no_fields() {
    let dummy = Dummy::new();
    let ty = dummy.ty(dummy.empty_struct);

    assert_eq!(ty.info().fields(), None);
    assert_eq!(ty.type_layout().unwrap().size, 0);
    insta::assert_yaml_snapshot!(ty.to_json().unwrap(), @"conformances: []");
}

#[test]
fn empty_value_is_zeroed_and_released() {
    let dummy = Dummy::new();
    let ty = dummy.ty(dummy.big_struct);
    let big = ty.as_struct().unwrap();

    let before = dummy.image.live_allocations();
    let value = big.make_empty_value().unwrap();
    assert!(value.instance().is_owned());
    assert_eq!(value.type_name(), "dummy.BigStruct");
    assert_eq!(value.read_bytes().unwrap(), vec![0; 40]);
    assert_eq!(dummy.image.live_allocations(), before + 1);

    drop(value);
    assert_eq!(dummy.image.live_allocations(), before);
}

#[test]
fn copy_goes_through_the_witness_table() {
    let dummy = Dummy::new();
    let ty = dummy.ty(dummy.big_struct);
    let big = ty.as_struct().unwrap();

    let source = big.make_empty_value().unwrap();
    for (i, offset) in big.field_offsets().unwrap().into_iter().enumerate() {
        dummy
            .image
            .write_u64(source.address().add(offset as u64), i as u64 + 1)
            .unwrap();
    }

    let copy = big.initialize_with_copy_raw(source.address()).unwrap();
    assert_ne!(copy.address(), source.address());
    assert_eq!(copy.read_bytes().unwrap(), source.read_bytes().unwrap());
    assert_eq!(dummy.image.read_u64(copy.address().add(32)).unwrap(), 5);
}

#[test]
fn raw_values_are_views() {
    let dummy = Dummy::new();
    let ty = dummy.ty(dummy.int);
    let int = ty.as_struct().unwrap();

    let owned = int.make_empty_value().unwrap();
    dummy.image.write_u64(owned.address(), 42).unwrap();
    let view = int.make_value_from_raw(owned.address()).unwrap();
    assert!(!view.instance().is_owned());
    assert_eq!(view.read_bytes().unwrap(), 42u64.to_le_bytes());

    let before = dummy.image.live_allocations();
    drop(view);
    assert_eq!(dummy.image.live_allocations(), before);
}

#[test]
fn generic_struct_has_no_layout() {
    let dummy = Dummy::new();
    let ty = dummy.ty(dummy.generic_box);
    let generic = ty.as_struct().unwrap();

    assert!(generic.info().is_generic());
    assert_eq!(generic.info().metadata(), None);
    assert_eq!(generic.type_layout(), None);
    let field = &generic.info().fields().unwrap()[0];
    assert_eq!((field.name.as_str(), field.type_name.as_deref(), field.is_var), ("value", None, true));

    let err = generic.make_empty_value().unwrap_err();
    assert_eq!(
        err,
        Error::Precondition(Precondition::GenericLayout {
            type_name: "dummy.GenericBox".to_owned()
        })
    );
    assert!(matches!(generic.field_offsets(), Err(Error::Precondition(Precondition::NoMetadata { .. }))));
}

#[test]
fn non_type_descriptor_is_rejected() {
    let dummy = Dummy::new();
    let err = Type::from_descriptor(&dummy.target(), dummy.shape).unwrap_err();
    assert!(matches!(
        err,
        Error::Decode(DecodeError::UnexpectedKind { expected: "type", .. })
    ));
}

#[test]
fn loadable_struct_fits_in_registers() {
    let dummy = Dummy::new();
    let ty = dummy.ty(dummy.loadable_struct);
    let loadable = ty.as_struct().unwrap();

    let layout = loadable.type_layout().unwrap();
    assert_eq!((layout.size, layout.stride), (32, 32));
    assert_eq!(loadable.field_offsets().unwrap(), [0, 8, 16, 24]);
    let types: Vec<_> = loadable
        .info()
        .fields()
        .unwrap()
        .iter()
        .map(|f| f.type_name.as_deref())
        .collect();
    assert_eq!(types, [Some("Swift.Int"); 4]);
}
