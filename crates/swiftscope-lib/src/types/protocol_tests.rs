use swiftscope_abi::DecodeError;

use crate::types::test_image::Dummy;
use crate::types::{Protocol, ProtocolComposition};
use crate::Error;

#[test]
fn reads_requirements_and_class_constraint() {
    let dummy = Dummy::new();
    let target = dummy.target();

    let shape = Protocol::read(&target, dummy.shape).unwrap();
    assert_eq!(shape.qualified_name(), "dummy.Shape");
    assert_eq!(shape.num_requirements(), 2);
    assert!(!shape.is_class_only());
    insta::assert_yaml_snapshot!(shape.to_json(), @r"
    isClassOnly: false
    numRequirements: 2
    ");

    let drawable = Protocol::read(&target, dummy.drawable).unwrap();
    assert_eq!(drawable.num_requirements(), 1);
    assert!(drawable.is_class_only());
}

#[test]
fn type_descriptor_is_not_a_protocol() {
    let dummy = Dummy::new();
    let err = Protocol::read(&dummy.target(), dummy.big_struct).unwrap_err();
    assert!(matches!(
        err,
        Error::Decode(DecodeError::UnexpectedKind { expected: "protocol", .. })
    ));
}

#[test]
fn composition_is_class_only_if_any_member_is() {
    let dummy = Dummy::new();
    let target = dummy.target();
    let shape = Protocol::read(&target, dummy.shape).unwrap();
    let drawable = Protocol::read(&target, dummy.drawable).unwrap();

    let open = ProtocolComposition::new(vec![shape.clone()]);
    assert!(!open.is_class_only());

    let constrained = ProtocolComposition::new(vec![shape, drawable]);
    assert_eq!(constrained.num_protocols(), 2);
    assert!(constrained.is_class_only());
    assert_eq!(constrained.protocols()[1].name(), "Drawable");

    assert!(!ProtocolComposition::new(Vec::new()).is_class_only());
}

#[test]
fn conformances_are_attached_by_the_registry() {
    let dummy = Dummy::new();
    let registry = dummy.registry();

    let big = registry.type_by_name("dummy.BigStruct").unwrap();
    assert!(big.info().conforms_to("Shape"));
    assert!(!big.info().conforms_to("Drawable"));
    let conformance = big.info().conformances()["Shape"].clone();
    assert_eq!(conformance.protocol.qualified_name(), "dummy.Shape");
    assert!(conformance.witness_table.is_some());

    let class = registry.type_by_name("dummy.SimpleClass").unwrap();
    assert_eq!(class.info().conformances().keys().collect::<Vec<_>>(), ["Drawable"]);

    let int = registry.type_by_name("Swift.Int").unwrap();
    assert!(int.info().conformances().is_empty());
}
