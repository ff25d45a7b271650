//! A synthetic `dummy` module with everything the facades need: metadata,
//! witness functions as closures over the image, and symbols.

use std::rc::Rc;

use swiftscope_abi::fixtures::{
    ClassSpec, FieldSpec, MethodSpec, TypeSpec, ValueMetadataSpec,
    VALUE_METADATA_FIELD_OFFSET_VECTOR, emit_class, emit_class_metadata, emit_conformance,
    emit_conformance_records, emit_context, emit_enum, emit_field_descriptor, emit_module,
    emit_protocol, emit_struct, emit_type_records, emit_value_metadata,
};
use swiftscope_abi::{
    ContextDescriptorKind, EnumValueWitnesses, FieldDescriptorKind, MetadataKind, MethodKind,
};
use swiftscope_core::{
    Address, CallError, FunctionTable, ImageBuilder, Memory, MemoryImage, NativeCall, SymbolTable,
};

use crate::config::Config;
use crate::registry::Registry;
use crate::target::Target;
use crate::types::Type;

const BASE: u64 = 0x1_0000_0000;
const CODE: u64 = 0x1_0010_0000;

/// Size of objects built by the `SimpleClass` initializer.
const OBJECT_SIZE: usize = 32;

pub(crate) const INIT_SYMBOL: &str =
    "dummy.SimpleClass.__allocating_init(first: Swift.Int, second: Swift.Int) -> dummy.SimpleClass";

/// Descriptor and section addresses of the emitted module.
pub(crate) struct Dummy {
    pub image: Rc<MemoryImage>,
    pub functions: Rc<FunctionTable>,
    symbols: SymbolTable,
    references: SymbolTable,

    pub int: Address,
    pub big_struct: Address,
    pub loadable_struct: Address,
    pub empty_struct: Address,
    pub generic_box: Address,
    pub simple_class: Address,
    pub empty_class: Address,
    pub c_style: Address,
    pub single_payload: Address,
    pub multi_payload: Address,
    pub extension: Address,
    pub shape: Address,
    pub drawable: Address,

    pub init: Address,
    pub simple_class_metadata: Address,
    pub types_section: Address,
    pub types_count: usize,
    pub conformances_section: Address,
    pub conformances_count: usize,
}

impl Dummy {
    pub fn new() -> Self {
        let image = Rc::new(MemoryImage::new());
        let functions = Rc::new(FunctionTable::new(Address::new(CODE)));
        let mut symbols = SymbolTable::new();
        let mut references = SymbolTable::new();
        let mut b = ImageBuilder::new(Address::new(BASE));

        let swift = emit_module(&mut b, "Swift");
        let dummy = emit_module(&mut b, "dummy");

        // Swift.Int
        let fields = emit_field_descriptor(
            &mut b,
            FieldDescriptorKind::Struct,
            &[FieldSpec::new("_value", "Bi64_")],
        );
        let int = value_type(
            &mut b,
            &image,
            &functions,
            ValueMetadataSpec {
                field_offsets: vec![0],
                ..ValueMetadataSpec::pod(MetadataKind::Struct, Address::NULL, 8)
            },
            |b, access| {
                let spec = TypeSpec::new("Int", swift).access_function(access).fields(fields.address);
                emit_struct(b, &spec, 1, VALUE_METADATA_FIELD_OFFSET_VECTOR)
            },
        );

        // dummy.BigStruct { let a, b, c, d, e: Int }
        let specs: Vec<_> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .map(|name| FieldSpec::new(name, "Si"))
            .collect();
        let big_fields = emit_field_descriptor(&mut b, FieldDescriptorKind::Struct, &specs);
        for mangled in big_fields.mangled_names.iter().flatten() {
            references.insert(*mangled, "Swift.Int");
        }
        let big_struct = value_type(
            &mut b,
            &image,
            &functions,
            ValueMetadataSpec {
                field_offsets: vec![0, 8, 16, 24, 32],
                ..ValueMetadataSpec::pod(MetadataKind::Struct, Address::NULL, 40)
            },
            |b, access| {
                let spec = TypeSpec::new("BigStruct", dummy)
                    .access_function(access)
                    .fields(big_fields.address);
                emit_struct(b, &spec, 5, VALUE_METADATA_FIELD_OFFSET_VECTOR)
            },
        );

        // dummy.EmptyStruct {}
        let empty_fields = emit_field_descriptor(&mut b, FieldDescriptorKind::Struct, &[]);
        let empty_struct = value_type(
            &mut b,
            &image,
            &functions,
            ValueMetadataSpec::pod(MetadataKind::Struct, Address::NULL, 0),
            |b, access| {
                let spec = TypeSpec::new("EmptyStruct", dummy)
                    .access_function(access)
                    .fields(empty_fields.address);
                emit_struct(b, &spec, 0, 0)
            },
        );

        // dummy.GenericBox<T> { var value: T }
        let box_fields = emit_field_descriptor(
            &mut b,
            FieldDescriptorKind::Struct,
            &[FieldSpec::var("value", "x")],
        );
        let generic_box = emit_struct(
            &mut b,
            &TypeSpec::new("GenericBox", dummy).fields(box_fields.address).generic(),
            1,
            VALUE_METADATA_FIELD_OFFSET_VECTOR,
        );

        // dummy.CStyle { case a, b, c, d, e }
        let cases: Vec<_> = ["a", "b", "c", "d", "e"].into_iter().map(FieldSpec::case).collect();
        let c_style_fields = emit_field_descriptor(&mut b, FieldDescriptorKind::Enum, &cases);
        let c_style = value_type(
            &mut b,
            &image,
            &functions,
            ValueMetadataSpec {
                enum_witnesses: Some(tag_witnesses(&functions, &image, 0)),
                ..ValueMetadataSpec::pod(MetadataKind::Enum, Address::NULL, 1)
            },
            |b, access| {
                let spec = TypeSpec::new("CStyle", dummy)
                    .access_function(access)
                    .fields(c_style_fields.address);
                emit_enum(b, &spec, 0, 5)
            },
        );

        // dummy.SinglePayload { case a, b, Some(Int), c, d }
        let payload_fields = emit_field_descriptor(
            &mut b,
            FieldDescriptorKind::Enum,
            &[
                FieldSpec::case("a"),
                FieldSpec::case("b"),
                FieldSpec::new("Some", "Si"),
                FieldSpec::case("c"),
                FieldSpec::case("d"),
            ],
        );
        for mangled in payload_fields.mangled_names.iter().flatten() {
            references.insert(*mangled, "Swift.Int");
        }
        let single_payload = value_type(
            &mut b,
            &image,
            &functions,
            ValueMetadataSpec {
                size: 9,
                stride: 16,
                enum_witnesses: Some(tag_witnesses(&functions, &image, 8)),
                ..ValueMetadataSpec::pod(MetadataKind::Enum, Address::NULL, 8)
            },
            |b, access| {
                let spec = TypeSpec::new("SinglePayload", dummy)
                    .access_function(access)
                    .fields(payload_fields.address);
                emit_enum(b, &spec, 1, 4)
            },
        );

        // dummy.LoadableStruct { let a, b, c, d: Int }
        let specs: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|name| FieldSpec::new(name, "Si"))
            .collect();
        let loadable_fields = emit_field_descriptor(&mut b, FieldDescriptorKind::Struct, &specs);
        for mangled in loadable_fields.mangled_names.iter().flatten() {
            references.insert(*mangled, "Swift.Int");
        }
        let loadable_struct = value_type(
            &mut b,
            &image,
            &functions,
            ValueMetadataSpec {
                field_offsets: vec![0, 8, 16, 24],
                ..ValueMetadataSpec::pod(MetadataKind::Struct, Address::NULL, 32)
            },
            |b, access| {
                let spec = TypeSpec::new("LoadableStruct", dummy)
                    .access_function(access)
                    .fields(loadable_fields.address);
                emit_struct(b, &spec, 4, VALUE_METADATA_FIELD_OFFSET_VECTOR)
            },
        );

        // dummy.MultiPayloadEnum { case a(Int), b(String), c(Double), d(Bool) }
        let multi_fields = emit_field_descriptor(
            &mut b,
            FieldDescriptorKind::MultiPayloadEnum,
            &[
                FieldSpec::new("a", "Si"),
                FieldSpec::new("b", "SS"),
                FieldSpec::new("c", "Sd"),
                FieldSpec::new("d", "Sb"),
            ],
        );
        for (mangled, name) in multi_fields
            .mangled_names
            .iter()
            .flatten()
            .zip(["Swift.Int", "Swift.String", "Swift.Double", "Swift.Bool"])
        {
            references.insert(*mangled, name);
        }
        let multi_payload = value_type(
            &mut b,
            &image,
            &functions,
            ValueMetadataSpec {
                size: 17,
                stride: 24,
                enum_witnesses: Some(tag_witnesses(&functions, &image, 16)),
                ..ValueMetadataSpec::pod(MetadataKind::Enum, Address::NULL, 8)
            },
            |b, access| {
                let spec = TypeSpec::new("MultiPayloadEnum", dummy)
                    .access_function(access)
                    .fields(multi_fields.address);
                emit_enum(b, &spec, 4, 0)
            },
        );

        // dummy.SimpleClass { var x, y: Int; init(first:second:) }
        let class_fields = emit_field_descriptor(
            &mut b,
            FieldDescriptorKind::Class,
            &[FieldSpec::var("x", "Si"), FieldSpec::var("y", "Si")],
        );
        for mangled in class_fields.mangled_names.iter().flatten() {
            references.insert(*mangled, "Swift.Int");
        }
        let init = initializer(&functions, &image);
        let accessors: Vec<_> = (0..4).map(|_| functions.register_constant(0)).collect();
        symbols.insert(init, INIT_SYMBOL);
        for (accessor, name) in accessors.iter().zip([
            "dummy.SimpleClass.x.getter : Swift.Int",
            "dummy.SimpleClass.x.setter : Swift.Int",
            "dummy.SimpleClass.y.getter : Swift.Int",
            "dummy.SimpleClass.y.setter : Swift.Int",
        ]) {
            symbols.insert(*accessor, name);
        }
        let methods = [
            MethodSpec {
                kind: MethodKind::Getter,
                ..MethodSpec::method(accessors[0])
            },
            MethodSpec {
                kind: MethodKind::Setter,
                ..MethodSpec::method(accessors[1])
            },
            MethodSpec {
                kind: MethodKind::Getter,
                ..MethodSpec::method(accessors[2])
            },
            MethodSpec {
                kind: MethodKind::Setter,
                ..MethodSpec::method(accessors[3])
            },
            MethodSpec::null(MethodKind::Method),
            MethodSpec::init(init),
        ];
        let simple_class_metadata = emit_class_metadata(&mut b, Address::NULL);
        let access = functions.register_constant(simple_class_metadata.get());
        let simple_class = emit_class(
            &mut b,
            &ClassSpec {
                num_fields: 2,
                field_offset_vector_offset: 10,
                ..ClassSpec::new(
                    TypeSpec::new("SimpleClass", dummy)
                        .access_function(access)
                        .fields(class_fields.address),
                )
                .methods(&methods)
            },
        );
        b.patch_pointer(simple_class_metadata.add(8), simple_class);

        // dummy.EmptyClass {}
        let empty_init = {
            let image = Rc::clone(&image);
            functions.register(move |call| {
                let Some(metadata) = call.context else {
                    return Err(bad_call(call));
                };
                let object = image.allocate(16)?;
                image.write_pointer(object, metadata)?;
                Ok(object.get())
            })
        };
        symbols.insert(empty_init, "dummy.EmptyClass.__allocating_init() -> dummy.EmptyClass");
        let empty_methods = [MethodSpec::init(empty_init)];
        let empty_class_metadata = emit_class_metadata(&mut b, Address::NULL);
        let access = functions.register_constant(empty_class_metadata.get());
        let empty_class = emit_class(
            &mut b,
            &ClassSpec::new(TypeSpec::new("EmptyClass", dummy).access_function(access))
                .methods(&empty_methods),
        );
        b.patch_pointer(empty_class_metadata.add(8), empty_class);

        let extension = emit_context(&mut b, ContextDescriptorKind::Extension, Some(dummy));
        let shape = emit_protocol(&mut b, "Shape", dummy, 2, false);
        let drawable = emit_protocol(&mut b, "Drawable", dummy, 1, true);

        let described = [
            int,
            big_struct,
            loadable_struct,
            empty_struct,
            generic_box,
            c_style,
            single_payload,
            multi_payload,
            simple_class,
            empty_class,
            extension,
            shape,
        ];
        let types_section = emit_type_records(&mut b, &described);

        let witness_table = b.push_pointer(Address::NULL);
        let conformances = [
            emit_conformance(&mut b, shape, big_struct, Some(witness_table)),
            emit_conformance(&mut b, shape, c_style, None),
            emit_conformance(&mut b, drawable, simple_class, None),
        ];
        let conformances_section = emit_conformance_records(&mut b, &conformances);

        image.load(b);
        Self {
            image,
            functions,
            symbols,
            references,
            int,
            big_struct,
            loadable_struct,
            empty_struct,
            generic_box,
            simple_class,
            empty_class,
            c_style,
            single_payload,
            multi_payload,
            extension,
            shape,
            drawable,
            init,
            simple_class_metadata,
            types_section,
            types_count: described.len(),
            conformances_section,
            conformances_count: conformances.len(),
        }
    }

    pub fn target(&self) -> Target {
        self.target_with(Config::default())
    }

    pub fn target_with(&self, config: Config) -> Target {
        Target::new(self.image.clone(), self.functions.clone())
            .with_symbols(Rc::new(self.symbols.clone()))
            .with_references(Rc::new(self.references.clone()))
            .with_config(config)
    }

    pub fn ty(&self, descriptor: Address) -> Type {
        Type::from_descriptor(&self.target(), descriptor).unwrap()
    }

    /// Registry with both record sections loaded.
    pub fn registry(&self) -> Registry {
        let mut registry = Registry::new(self.target());
        registry.load_type_records(self.types_section, self.types_count).unwrap();
        registry
            .load_conformance_records(self.conformances_section, self.conformances_count)
            .unwrap();
        registry
    }
}

/// Emit the metadata and a memcpy copy witness, then the descriptor with an
/// access function returning the metadata, and link the two.
fn value_type(
    b: &mut ImageBuilder,
    image: &Rc<MemoryImage>,
    functions: &FunctionTable,
    spec: ValueMetadataSpec,
    descriptor: impl FnOnce(&mut ImageBuilder, Address) -> Address,
) -> Address {
    let spec = ValueMetadataSpec {
        initialize_with_copy: memcpy(functions, image, spec.size as usize),
        ..spec
    };
    let metadata = emit_value_metadata(b, &spec);
    let access = functions.register_constant(metadata.get());
    let at = descriptor(b, access);
    b.patch_pointer(metadata.add(8), at);
    at
}

fn bad_call(call: NativeCall<'_>) -> CallError {
    CallError::Failed {
        function: call.function,
        reason: format!("unexpected arguments {:?}", call.args),
    }
}

/// `initializeWithCopy(dest, src, metadata)` for plain data of `size` bytes.
fn memcpy(functions: &FunctionTable, image: &Rc<MemoryImage>, size: usize) -> Address {
    let image = Rc::clone(image);
    functions.register(move |call| {
        let &[dest, src, _metadata] = call.args else {
            return Err(bad_call(call));
        };
        let mut buf = vec![0; size];
        image.read_bytes(Address::new(src), &mut buf)?;
        image.write_bytes(Address::new(dest), &buf)?;
        Ok(dest)
    })
}

/// Enum witnesses keeping the tag in one byte at `tag_offset`.
fn tag_witnesses(functions: &FunctionTable, image: &Rc<MemoryImage>, tag_offset: u64) -> EnumValueWitnesses {
    let get_enum_tag = {
        let image = Rc::clone(image);
        functions.register(move |call| {
            let &[value, _metadata] = call.args else {
                return Err(bad_call(call));
            };
            Ok(image.read_u8(Address::new(value).add(tag_offset))? as u64)
        })
    };
    let destructive_inject_enum_tag = {
        let image = Rc::clone(image);
        functions.register(move |call| {
            let &[value, tag, _metadata] = call.args else {
                return Err(bad_call(call));
            };
            image.write_bytes(Address::new(value).add(tag_offset), &[tag as u8])?;
            Ok(0)
        })
    };
    EnumValueWitnesses {
        get_enum_tag,
        destructive_project_enum_data: functions.register_constant(0),
        destructive_inject_enum_tag,
    }
}

/// `SimpleClass(first:second:)`: allocates an object with the metadata
/// from the context register and stores `x` and `y` after the header.
fn initializer(functions: &FunctionTable, image: &Rc<MemoryImage>) -> Address {
    let image = Rc::clone(image);
    functions.register(move |call| {
        let (&[first, second], Some(metadata)) = (call.args, call.context) else {
            return Err(bad_call(call));
        };
        let object = image.allocate(OBJECT_SIZE)?;
        image.write_pointer(object, metadata)?;
        image.write_u64(object.add(16), first)?;
        image.write_u64(object.add(24), second)?;
        Ok(object.get())
    })
}
