//! Byte-level test vectors for pack and unpack
//!
//! Each vector pairs a template and argument list with the exact bytes the
//! template must produce, written as hex. Every vector is checked in both
//! directions where the directive round-trips.

use stencil_core::{pack, unpack, Value};

struct Vector {
    name: &'static str,
    template: &'static str,
    values: Vec<Value>,
    hex: &'static str,
    round_trips: bool,
}

fn vectors() -> Vec<Vector> {
    vec![
        Vector {
            name: "unsigned integers in every byte order",
            template: "C S< S> L< L> Q>",
            values: vec![0xab.into(), 0x0102.into(), 0x0102.into(), 1.into(), 1.into(), 2.into()],
            hex: "ab0201010201000000000000010000000000000002",
            round_trips: true,
        },
        Vector {
            name: "signed integers",
            template: "c s> l< q<",
            values: vec![(-1).into(), (-2).into(), (-3).into(), (-4).into()],
            hex: "fffffefdfffffffcffffffffffffff",
            round_trips: true,
        },
        Vector {
            name: "network and vax orders",
            template: "n N v V",
            values: vec![0x1234.into(), 0x12345678.into(), 0x1234.into(), 0x12345678.into()],
            hex: "123412345678341278563412",
            round_trips: true,
        },
        Vector {
            name: "doubles and singles",
            template: "G g E e",
            values: vec![1.0.into(), 1.0.into(), (-2.0).into(), 0.5.into()],
            hex: "3ff00000000000003f80000000000000000000c00000003f",
            round_trips: true,
        },
        Vector {
            name: "string padding",
            template: "a4 A4 Z4 Z*",
            values: vec!["ab".into(), "ab".into(), "abcdef".into(), "xy".into()],
            hex: "616200006162202061626364787900",
            round_trips: false,
        },
        Vector {
            name: "bit and hex strings",
            template: "B8 b8 H4 h4",
            values: vec!["10110001".into(), "10110001".into(), "beef".into(), "beef".into()],
            hex: "b18dbeefebfe",
            round_trips: true,
        },
        Vector {
            name: "utf-8 and ber",
            template: "U w w",
            values: vec![0x20ac.into(), 127.into(), 16384.into()],
            hex: "e282ac7f818000",
            round_trips: true,
        },
        Vector {
            name: "uuencode then base64",
            template: "u m",
            values: vec!["hi".into(), "hi".into()],
            hex: "223a2644600a61476b3d0a",
            round_trips: true,
        },
        Vector {
            name: "quoted printable",
            template: "M",
            values: vec!["caf\u{e9}=".into()],
            hex: "6361663d43333d41393d33443d0a",
            round_trips: false,
        },
        Vector {
            name: "null fill and absolute seek",
            template: "C x2 C @6 C",
            values: vec![1.into(), 2.into(), 3.into()],
            hex: "01000002000003",
            round_trips: false,
        },
    ]
}

#[test]
fn test_pack_vectors() {
    for vector in vectors() {
        let packed = pack(vector.template, &vector.values)
            .unwrap_or_else(|e| panic!("{}: {}", vector.name, e));
        assert_eq!(hex::encode(&packed.bytes), vector.hex, "{}", vector.name);
    }
}

#[test]
fn test_unpack_vectors() {
    for vector in vectors().into_iter().filter(|v| v.round_trips) {
        let bytes = hex::decode(vector.hex).unwrap();
        let values = unpack(vector.template, &bytes).unwrap_or_else(|e| panic!("{}: {}", vector.name, e));
        assert_eq!(values, vector.values, "{}", vector.name);
    }
}

#[test]
fn test_string_padding_unpacks_trimmed() {
    let bytes = hex::decode("616200006162202061626364").unwrap();
    assert_eq!(
        unpack("a4 A4 Z4", &bytes).unwrap(),
        vec![Value::from(&b"ab\0\0"[..]), Value::from("ab"), Value::from("abcd")]
    );
}

#[test]
fn test_quoted_printable_decodes() {
    let bytes = hex::decode("6361663d43333d41393d33443d0a").unwrap();
    assert_eq!(unpack("M", &bytes).unwrap(), vec![Value::from("caf\u{e9}=")]);
}
