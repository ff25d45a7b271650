use swiftscope_core::{Address, ImageBuilder, Memory, MemoryImage};

use crate::descriptor::ContextDescriptor;
use crate::error::{DecodeError, DecodeLimits, Error};
use crate::fixtures::{ClassSpec, MethodSpec, TypeSpec, emit_class, emit_module};
use crate::kind::MethodKind;
use crate::layout;
use crate::vtable::{VTableDescriptorHeader, read_methods};

const BASE: u64 = 0x1_0000_0000;
const CODE: u64 = 0x1_0010_0000;

fn class_with(methods: &[MethodSpec]) -> (MemoryImage, Address) {
    let mut b = ImageBuilder::new(Address::new(BASE));
    let module = emit_module(&mut b, "dummy");
    let spec = ClassSpec::new(TypeSpec::new("SimpleClass", module)).methods(methods);
    let at = emit_class(&mut b, &spec);
    let image = MemoryImage::new();
    image.load(b);
    (image, at)
}

fn header_of(image: &MemoryImage, at: Address) -> VTableDescriptorHeader {
    let ContextDescriptor::Class(class) = ContextDescriptor::decode(image, at).unwrap() else {
        panic!("expected a class descriptor");
    };
    class.vtable_header(image).unwrap().unwrap()
}

#[test]
fn null_slot_is_skipped_in_order() {
    let first = Address::new(CODE);
    let third = Address::new(CODE + 0x20);
    let (image, at) = class_with(&[
        MethodSpec::method(first),
        MethodSpec::null(MethodKind::Getter),
        MethodSpec::init(third),
    ]);
    let header = header_of(&image, at);
    assert_eq!(header.vtable_size, 3);

    let methods = read_methods(&image, &header, &DecodeLimits::default()).unwrap();
    assert_eq!(methods.len(), 2);
    assert_eq!(methods[0].implementation, first);
    assert_eq!(methods[0].kind().unwrap(), MethodKind::Method);
    assert!(methods[0].flags.is_instance());
    assert_eq!(methods[1].implementation, third);
    assert_eq!(methods[1].kind().unwrap(), MethodKind::Init);
    assert_eq!(
        methods[1].address,
        header.methods_start().add(2 * layout::method::SIZE)
    );
}

#[test]
fn empty_vtable_yields_nothing() {
    let (image, at) = class_with(&[]);
    let header = header_of(&image, at);
    assert_eq!(header.vtable_size, 0);
    assert!(read_methods(&image, &header, &DecodeLimits::default()).unwrap().is_empty());
}

#[test]
fn undefined_method_kind_is_a_decode_error() {
    let (image, at) = class_with(&[MethodSpec::method(Address::new(CODE))]);
    let header = header_of(&image, at);
    let slot = header.methods_start();

    image.write_u32(slot, 0x17).unwrap();

    let err = read_methods(&image, &header, &DecodeLimits::default()).unwrap_err();
    assert_eq!(
        err,
        Error::Decode(DecodeError::UnknownMethodKind { address: slot, raw: 7 })
    );
}

#[test]
fn oversized_vtable_is_rejected() {
    let (image, at) = class_with(&[
        MethodSpec::method(Address::new(CODE)),
        MethodSpec::method(Address::new(CODE + 0x10)),
    ]);
    let header = header_of(&image, at);
    let limits = DecodeLimits {
        max_vtable_size: 1,
        ..DecodeLimits::default()
    };

    let err = read_methods(&image, &header, &limits).unwrap_err();
    assert_eq!(
        err,
        Error::Decode(DecodeError::VTableTooLarge {
            start: header.methods_start(),
            size: 2,
            limit: 1
        })
    );
}

#[test]
fn vtable_end_overflow_is_rejected() {
    let header = VTableDescriptorHeader {
        address: Address::new(u64::MAX - 0xF),
        vtable_offset: 0,
        vtable_size: 4,
    };
    let err = read_methods(&MemoryImage::new(), &header, &DecodeLimits::default()).unwrap_err();
    assert_eq!(
        err,
        Error::Decode(DecodeError::VTableOverflow {
            start: Address::new(u64::MAX - 0x7),
            size: 4
        })
    );
}
