//! A worked example: a small TLV (type-length-value) packet format built
//! from a [`restruct::Descriptor`] instead of a derived struct.

use restruct::array::ArrayDesc;
use restruct::bitmap::BitmapDesc;
use restruct::enum_::EnumDesc;
use restruct::int::IntDesc;
use restruct::string::StringDesc;
use restruct::struct_::StructDesc;
use restruct::{Descriptor, Endian, Value};

/// `message_type`: one byte, naming the kind of payload that follows.
pub fn message_type() -> EnumDesc {
    EnumDesc::builder(IntDesc::u8())
        .sym("invalid")
        .sym("hello")
        .sym("data")
        .sym("goodbye")
        .build()
        .expect("built-in enum is well-formed")
}

/// `flags`: one byte of named single-bit options.
pub fn flags() -> BitmapDesc {
    BitmapDesc::builder(IntDesc::u8())
        .flag("compressed", 0)
        .flag("encrypted", 1)
        .flag("final_fragment", 7)
        .build()
        .expect("built-in bitmap is well-formed")
}

/// A packet: `type` and `flags` bytes, a big-endian `u16` payload length,
/// and a payload whose size the length field determines.
pub fn packet() -> StructDesc {
    StructDesc::builder()
        .field("kind", Descriptor::Enum(message_type()))
        .field("flags", Descriptor::Bitmap(flags()))
        .field("length", Descriptor::Int(IntDesc::u16().with_endian(Endian::Big)))
        .field("payload", Descriptor::String(StringDesc::greedy().trim_null(false)))
        .size_by(|fields| Ok(4 + fields["length"].as_int()? as usize))
        .build()
        .expect("built-in packet layout is well-formed")
}

/// A run of packets back to back, with nothing marking where the run ends
/// (the caller already knows how many packets to expect).
pub fn packet_stream(count: usize) -> ArrayDesc {
    ArrayDesc::fixed(Descriptor::Struct(packet()), count).expect("a struct element is never a variable-size union")
}

fn sample_packet() -> Value {
    let mut fields = indexmap::IndexMap::new();
    fields.insert("kind".to_string(), Value::symbol("data"));
    fields.insert(
        "flags".to_string(),
        Value::List(vec![Value::symbol("final_fragment")]),
    );
    fields.insert("length".to_string(), Value::Int(5));
    fields.insert("payload".to_string(), Value::str("howdy"));
    Value::Map(fields)
}

pub fn main_demo() {
    let d = Descriptor::Struct(packet());
    let packed = d.pack(&sample_packet()).expect("sample packet is valid");
    let back = d.unpack(&packed).expect("just-packed bytes unpack cleanly");
    assert_eq!(back, sample_packet());
    println!("packed {} bytes: {:02x?}", packed.len(), packed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_round_trips() {
        let d = Descriptor::Struct(packet());
        let packed = d.pack(&sample_packet()).unwrap();
        assert_eq!(d.unpack(&packed).unwrap(), sample_packet());
    }

    #[test]
    fn demo_runs() {
        main_demo();
    }

    #[test]
    fn stream_of_three_fixed_length_packets() {
        let stream = Descriptor::Array(packet_stream(3));
        let value = Value::List(vec![sample_packet(), sample_packet(), sample_packet()]);
        let packed = stream.pack(&value).unwrap();
        assert_eq!(stream.unpack(&packed).unwrap(), value);
    }
}
