use crate::Address;

#[test]
fn null_address() {
    assert!(Address::NULL.is_null());
    assert_eq!(Address::NULL.non_null(), None);
    assert_eq!(Address::new(0x10).non_null(), Some(Address::new(0x10)));
}

#[test]
fn signed_offset() {
    let base = Address::new(0x1000);
    assert_eq!(base.offset(0x20), Address::new(0x1020));
    assert_eq!(base.offset(-0x20), Address::new(0xFE0));
    assert_eq!(Address::new(0xFE0).offset_from(base), -0x20);
}

#[test]
fn checked_add_overflow() {
    assert_eq!(Address::new(u64::MAX).checked_add(1), None);
    assert_eq!(Address::new(8).checked_add(8), Some(Address::new(16)));
}

#[test]
fn alignment() {
    assert!(Address::new(0x1008).is_aligned(8));
    assert!(!Address::new(0x1004).is_aligned(8));
    assert!(Address::new(0x1004).is_aligned(4));
}

#[test]
fn display_is_hex() {
    assert_eq!(Address::new(0x1f00).to_string(), "0x1f00");
    assert_eq!(format!("{:?}", Address::new(255)), "Address(0xff)");
}

#[test]
fn serializes_as_hex_string() {
    let json = serde_json::to_string(&Address::new(0xdead)).unwrap();
    assert_eq!(json, "\"0xdead\"");
}
