//! The literal byte-for-byte scenarios used to seed this crate's test
//! suite, one test per scenario, numbered the way they're laid out.

use indexmap::IndexMap;
use restruct::array::ArrayDesc;
use restruct::enum_::EnumDesc;
use restruct::int::IntDesc;
use restruct::string::StringDesc;
use restruct::struct_::StructDesc;
use restruct::terminated::TerminatedDesc;
use restruct::union_::UnionDesc;
use restruct::{Descriptor, Endian, Value};

fn map(pairs: &[(&str, Value)]) -> Value {
    let mut m = IndexMap::new();
    for (k, v) in pairs {
        m.insert(k.to_string(), v.clone());
    }
    Value::Map(m)
}

#[test]
fn scenario_1_u32_endian_byte_order() {
    let le = Descriptor::Int(IntDesc::u32().with_endian(Endian::Little));
    assert_eq!(
        le.pack(&Value::Int(0xFEED_FACE)).unwrap(),
        vec![0xCE, 0xFA, 0xED, 0xFE]
    );
    let be = Descriptor::Int(IntDesc::u32().with_endian(Endian::Big));
    assert_eq!(
        be.pack(&Value::Int(0xFEED_FACE)).unwrap(),
        vec![0xFE, 0xED, 0xFA, 0xCE]
    );
}

#[test]
fn scenario_2_tlv_packet_round_trips() {
    let kind = EnumDesc::builder(IntDesc::u8())
        .sym("invalid")
        .sym("hello")
        .sym("read")
        .sym("write")
        .sym("goodbye")
        .build()
        .unwrap();
    let packet = StructDesc::builder()
        .field("type", Descriptor::Enum(kind))
        .field("len", Descriptor::Int(IntDesc::u32().with_endian(Endian::Big)))
        .field("value", Descriptor::String(StringDesc::greedy()))
        .size_by(|fields| Ok(5 + fields["len"].as_int()? as usize))
        .build()
        .unwrap();

    let d = Descriptor::Struct(packet);
    let value = map(&[
        ("type", Value::symbol("hello")),
        ("len", Value::Int(4)),
        ("value", Value::str("v1.0")),
    ]);
    let packed = d.pack(&value).unwrap();
    assert_eq!(packed, vec![0x01, 0x00, 0x00, 0x00, 0x04, b'v', b'1', b'.', b'0']);
    assert_eq!(d.unpack(&packed).unwrap(), value);
}

#[test]
fn scenario_3_union_over_network_byte_order() {
    let kind = EnumDesc::builder(IntDesc::u8())
        .sym("invalid")
        .sym("hello")
        .sym("read")
        .sym("write")
        .sym("goodbye")
        .build()
        .unwrap();
    let hello = StructDesc::builder()
        .field("type", Descriptor::Enum(kind.clone()))
        .field("version", Descriptor::String(StringDesc::greedy()))
        .build()
        .unwrap();
    let read = StructDesc::builder()
        .field("type", Descriptor::Enum(kind.clone()))
        .field("offset", Descriptor::Int(IntDesc::u64().with_endian(Endian::Big)))
        .field("len", Descriptor::Int(IntDesc::u64().with_endian(Endian::Big)))
        .build()
        .unwrap();

    let frame = UnionDesc::builder()
        .member("hello", Descriptor::Struct(hello))
        .member("read", Descriptor::Struct(read))
        .member("type", Descriptor::Enum(kind))
        .size_by(|_| Ok(17))
        .build()
        .unwrap();

    let bytes = [
        0x02, 0xFE, 0xFE, 0xFE, 0xFE, 0xFE, 0xFE, 0xFE, 0xFE, 0xAB, 0xAB, 0xAB, 0xAB, 0xAB, 0xAB,
        0xAB, 0xAB,
    ];
    let d = Descriptor::Union(frame);
    let (v, tail) = d.unpack_one(&bytes, None).unwrap();
    let out = v.as_map().unwrap();
    assert_eq!(out["type"], Value::symbol("read"));
    let read_fields = out["read"].as_map().unwrap();
    assert_eq!(read_fields["offset"], Value::Int(0xFEFE_FEFE_FEFE_FEFEu64 as i128));
    assert_eq!(read_fields["len"], Value::Int(0xABAB_ABAB_ABAB_ABABu64 as i128));
    assert!(tail.is_empty());
}

#[test]
fn scenario_4_terminated_string_stops_at_first_occurrence() {
    let d = Descriptor::Terminated(TerminatedDesc::new(
        Descriptor::String(StringDesc::greedy().trim_null(false)),
        b"STOP".to_vec(),
    ));
    let (v, tail) = d
        .unpack_one(b"this is the messageSTOPnext messageSTOP", None)
        .unwrap();
    assert_eq!(v.as_bytes().unwrap(), b"this is the message");
    assert_eq!(tail, b"next messageSTOP");
}

#[test]
fn scenario_5_int8_array_terminated_by_minus_one() {
    let d = Descriptor::Array(ArrayDesc::terminated(Descriptor::Int(IntDesc::i8()), Value::Int(-1)).unwrap());
    let packed = d
        .pack(&Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]))
        .unwrap();
    assert_eq!(packed, vec![0x01, 0x02, 0x03, 0x04, 0xFF]);

    let mut bytes = packed.clone();
    bytes.extend_from_slice(b"tail");
    let (v, tail) = d.unpack_one(&bytes, None).unwrap();
    assert_eq!(v, Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]));
    assert_eq!(tail, b"tail");
}

#[test]
fn scenario_6_bitfield_declarative_layout() {
    let d = restruct::bitfield::BitfieldDesc::builder(IntDesc::u8())
        .field("a", 1)
        .field("b", 2)
        .field("c", 3)
        .build()
        .unwrap();
    let packed = d
        .pack_raw(
            &map(&[("a", Value::Int(0)), ("b", Value::Int(0)), ("c", Value::Int(7))]),
            None,
        )
        .unwrap();
    assert_eq!(packed, vec![0x38]);
    let (v, _) = d.unpack_one(&[0x38], None).unwrap();
    assert_eq!(
        v,
        map(&[("a", Value::Int(0)), ("b", Value::Int(0)), ("c", Value::Int(7))])
    );
}

// Scenario 7 (union dynamic size via `size=|u| u.inner.size` with
// `pad_bytes`) references a member ("inner") the spec text never defines,
// so it isn't reproduced literally here; `union_.rs`'s
// `dynamic_sizing_extends_with_pad_bytes` test pins down the same
// pad-bytes-extend-and-retry mechanism it's meant to exercise (see
// DESIGN.md).
