use swiftscope_abi::{MethodKind, Precondition};
use swiftscope_core::Memory;

use crate::config::Config;
use crate::types::test_image::{Dummy, INIT_SYMBOL};
use crate::types::{Argument, Type};
use crate::value::RuntimeInstance;
use crate::Error;

#[test]
fn methods_skip_null_slots() {
    let dummy = Dummy::new();
    let ty = dummy.ty(dummy.simple_class);
    let class = ty.as_class().unwrap();

    let kinds: Vec<_> = class.methods().unwrap().iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        [
            MethodKind::Getter,
            MethodKind::Setter,
            MethodKind::Getter,
            MethodKind::Setter,
            MethodKind::Init,
        ]
    );
    let init = class.methods().unwrap().last().unwrap();
    assert_eq!(init.address, dummy.init);
    assert_eq!(init.name.as_deref(), Some(INIT_SYMBOL));
    assert_eq!(class.info().metadata(), Some(dummy.simple_class_metadata));
}

#[test]
fn class_snapshot() {
    let dummy = Dummy::new();
    let registry = dummy.registry();
    let class = registry.type_by_name("dummy.SimpleClass").unwrap();

    let mut json = class.to_json().unwrap();
    let methods = json["methods"].as_array_mut().unwrap();
    assert_eq!(methods[4]["address"], format!("{:#x}", dummy.init.get()));
    for method in methods.iter_mut() {
        method.as_object_mut().unwrap().remove("address");
    }
    insta::assert_yaml_snapshot!(json, @r#"
    conformances:
      - Drawable
    fields:
      - isVar: true
        name: x
        typeName: Swift.Int
      - isVar: true
        name: y
        typeName: Swift.Int
    methods:
      - name: "dummy.SimpleClass.x.getter : Swift.Int"
        type: Getter
      - name: "dummy.SimpleClass.x.setter : Swift.Int"
        type: Setter
      - name: "dummy.SimpleClass.y.getter : Swift.Int"
        type: Getter
      - name: "dummy.SimpleClass.y.setter : Swift.Int"
        type: Setter
      - name: "dummy.SimpleClass.__allocating_init(first: Swift.Int, second: Swift.Int) -> dummy.SimpleClass"
        type: Init
    "#);
}

#[test]
fn initializers_are_bound_by_selector() {
    let dummy = Dummy::new();
    let ty = dummy.ty(dummy.simple_class);
    let class = ty.as_class().unwrap();

    let selectors: Vec<_> = class.initializers().unwrap().keys().cloned().collect();
    assert_eq!(selectors, ["init(first:second:)"]);
    let init = class.initializer("init(first:second:)").unwrap().unwrap();
    assert_eq!(init.address(), dummy.init);
    assert_eq!(init.signature().return_type_name, "dummy.SimpleClass");
    assert!(class.initializer("init()").unwrap().is_none());
}

#[test]
fn invoke_builds_an_object() {
    let dummy = Dummy::new();
    let registry = dummy.registry();
    let class = registry.type_by_name("dummy.SimpleClass").unwrap().as_class().unwrap();
    let init = class.initializer("init(first:second:)").unwrap().unwrap();

    let before = dummy.image.live_allocations();
    let object = init.invoke(&registry, &[Argument::Word(7), Argument::Word(9)]).unwrap();
    assert_eq!(dummy.image.live_allocations(), before + 1);

    assert_eq!(object.class_name(), "dummy.SimpleClass");
    assert_eq!(object.metadata(), dummy.simple_class_metadata);
    assert_eq!(dummy.image.read_pointer(object.address()).unwrap(), dummy.simple_class_metadata);
    assert_eq!(dummy.image.read_u64(object.address().add(16)).unwrap(), 7);
    assert_eq!(dummy.image.read_u64(object.address().add(24)).unwrap(), 9);
}

#[test]
fn invoke_passes_word_sized_values_in_registers() {
    let dummy = Dummy::new();
    let registry = dummy.registry();
    let class = registry.type_by_name("dummy.SimpleClass").unwrap().as_class().unwrap();
    let init = class.initializer("init(first:second:)").unwrap().unwrap();

    let int = registry.type_by_name("Swift.Int").unwrap().as_struct().unwrap();
    let value = int.make_empty_value().unwrap();
    dummy.image.write_u64(value.address(), 42).unwrap();
    let value: RuntimeInstance = value.into();

    let object = init
        .invoke(&registry, &[Argument::Value(&value), Argument::Word(3)])
        .unwrap();
    assert_eq!(dummy.image.read_u64(object.address().add(16)).unwrap(), 42);
    assert_eq!(dummy.image.read_u64(object.address().add(24)).unwrap(), 3);
}

#[test]
fn invoke_checks_arguments() {
    let dummy = Dummy::new();
    let registry = dummy.registry();
    let class = registry.type_by_name("dummy.SimpleClass").unwrap().as_class().unwrap();
    let init = class.initializer("init(first:second:)").unwrap().unwrap();

    let err = init.invoke(&registry, &[Argument::Word(1)]).unwrap_err();
    assert_eq!(
        err,
        Error::Precondition(Precondition::ArityMismatch {
            name: "init(first:second:)".to_owned(),
            expected: 2,
            actual: 1,
        })
    );

    let big = registry.type_by_name("dummy.BigStruct").unwrap().as_struct().unwrap();
    let value: RuntimeInstance = big.make_empty_value().unwrap().into();
    let err = init
        .invoke(&registry, &[Argument::Word(1), Argument::Value(&value)])
        .unwrap_err();
    assert_eq!(
        err,
        Error::Precondition(Precondition::ArgumentTypeMismatch {
            name: "init(first:second:)".to_owned(),
            index: 1,
            expected: "Swift.Int".to_owned(),
            actual: "dummy.BigStruct".to_owned(),
        })
    );
}

#[test]
fn invoke_needs_argument_types_in_the_registry() {
    let dummy = Dummy::new();
    let registry = crate::registry::Registry::new(dummy.target());
    let ty = dummy.ty(dummy.simple_class);
    let init = ty.as_class().unwrap().initializer("init(first:second:)").unwrap().unwrap();

    let err = init.invoke(&registry, &[Argument::Word(1), Argument::Word(2)]).unwrap_err();
    assert_eq!(err, Error::UnknownType("Swift.Int".to_owned()));
}

#[test]
fn words_are_rejected_for_large_value_types() {
    use std::collections::HashMap;

    use crate::registry::TypeRegistry;

    struct Aliases(HashMap<&'static str, Type>);

    impl TypeRegistry for Aliases {
        fn type_by_name(&self, name: &str) -> Option<&Type> {
            self.0.get(name)
        }
    }

    let dummy = Dummy::new();
    // Pretend `Swift.Int` is the 40-byte `BigStruct`.
    let aliases = Aliases(HashMap::from([("Swift.Int", dummy.ty(dummy.big_struct))]));
    let ty = dummy.ty(dummy.simple_class);
    let init = ty.as_class().unwrap().initializer("init(first:second:)").unwrap().unwrap();

    let err = init.invoke(&aliases, &[Argument::Word(1), Argument::Word(2)]).unwrap_err();
    assert!(matches!(
        err,
        Error::Precondition(Precondition::ArgumentTypeMismatch { index: 0, .. })
    ));

    let big = aliases.type_by_name("Swift.Int").unwrap().as_struct().unwrap();
    let value: RuntimeInstance = big.make_empty_value().unwrap().into();
    let err = init
        .invoke(&aliases, &[Argument::Value(&value), Argument::Word(2)])
        .unwrap_err();
    assert_eq!(
        err,
        Error::Precondition(Precondition::UnsupportedArgument {
            name: "init(first:second:)".to_owned(),
            index: 0,
            size: 40,
        })
    );
}

#[test]
fn initializer_binding_can_be_disabled() {
    let dummy = Dummy::new();
    let target = dummy.target_with(Config::new().bind_initializers(false));
    let ty = Type::from_descriptor(&target, dummy.simple_class).unwrap();
    let class = ty.as_class().unwrap();

    assert_eq!(class.methods().unwrap().len(), 5);
    assert!(class.initializers().unwrap().is_empty());
}

#[test]
fn unnamed_methods_bind_no_initializers() {
    let dummy = Dummy::new();
    let target = dummy.target_with(Config::new().resolve_method_names(false));
    let ty = Type::from_descriptor(&target, dummy.simple_class).unwrap();
    let class = ty.as_class().unwrap();

    assert!(class.methods().unwrap().iter().all(|m| m.name.is_none()));
    assert!(class.initializers().unwrap().is_empty());
}

#[test]
fn empty_class_has_only_its_initializer() {
    let dummy = Dummy::new();
    let registry = dummy.registry();
    let class = registry.type_by_name("dummy.EmptyClass").unwrap().as_class().unwrap();

    assert_eq!(class.info().fields(), None);
    assert_eq!(class.methods().unwrap().len(), 1);
    let init = class.initializer("init()").unwrap().unwrap();
    let object = init.invoke(&registry, &[]).unwrap();
    assert_eq!(object.class_name(), "dummy.EmptyClass");
    assert_eq!(dummy.image.read_pointer(object.address()).unwrap(), object.metadata());
}
