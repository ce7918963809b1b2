//! Integration tests for the complete compile → execute flow of all three front-ends

use stencil_core::{
    pack, sprintf, unpack, CompileOptions, Encoding, FormatError, PackProgram, PrintfProgram,
    UnpackProgram, Value,
};

#[test]
fn test_pack_network_long() {
    let packed = pack("N", &[Value::from(1)]).unwrap();
    assert_eq!(&packed.bytes[..], [0x00, 0x00, 0x00, 0x01]);
    assert_eq!(packed.encoding, Encoding::Binary);
}

#[test]
fn test_pack_star_consumes_remaining() {
    let packed = pack("C*", &[1.into(), 2.into(), 3.into()]).unwrap();
    assert_eq!(&packed.bytes[..], [0x01, 0x02, 0x03]);
}

#[test]
fn test_pack_null_padded_string() {
    let packed = pack("a5", &["ab".into()]).unwrap();
    assert_eq!(&packed.bytes[..], [0x61, 0x62, 0x00, 0x00, 0x00]);
}

#[test]
fn test_sprintf_zero_padded() {
    assert_eq!(&sprintf("%05d", &[42.into()]).unwrap()[..], b"00042");
}

#[test]
fn test_sprintf_left_justified() {
    assert_eq!(&sprintf("%-10s|", &["hi".into()]).unwrap()[..], b"hi        |");
}

#[test]
fn test_loop_recovery_matches_naive_compile() {
    let template = "C1".repeat(5000);
    let values = vec![Value::from(1); 5000];

    let recovered = PackProgram::compile(&template).unwrap();
    let naive = PackProgram::compile_with(&template, &CompileOptions::without_loop_recovery()).unwrap();

    assert!(recovered.node_count() < 10);
    let bytes = recovered.execute(&values).unwrap().bytes;
    assert_eq!(bytes.len(), 5000);
    assert!(bytes.iter().all(|&b| b == 1));
    assert_eq!(bytes, naive.execute(&values).unwrap().bytes);
    assert_eq!(pack(&template, &values).unwrap().bytes, bytes);
}

#[test]
fn test_record_round_trip() {
    let template = "n C a4 Z* G w U";
    let values = vec![
        Value::from(513),
        Value::from(7),
        Value::from("abcd"),
        Value::from("name"),
        Value::from(2.5),
        Value::from(1_000_000),
        Value::from(0x263a),
    ];

    let packed = pack(template, &values).unwrap();
    assert_eq!(packed.encoding, Encoding::Utf8);
    assert_eq!(unpack(template, &packed.bytes).unwrap(), values);
}

#[test]
fn test_groups_and_positioning() {
    let packed = pack("(C n)2 @8 C", &[1.into(), 2.into(), 3.into(), 4.into(), 9.into()]).unwrap();
    assert_eq!(&packed.bytes[..], [1, 0, 2, 3, 0, 4, 0, 0, 9]);

    let values = unpack("(C n)2 @8 C", &packed.bytes).unwrap();
    assert_eq!(
        values,
        vec![1.into(), 2.into(), 3.into(), 4.into(), 9.into()]
    );
}

#[test]
fn test_printf_table_row() {
    let row = sprintf(
        "%-8s|%6.2f|%+d|%#x",
        &["widget".into(), 3.14159.into(), 12.into(), 255.into()],
    )
    .unwrap();
    assert_eq!(&row[..], b"widget  |  3.14|+12|0xff");
}

#[test]
fn test_printf_named_references() {
    let args = [Value::hash([("user", Value::from("ada")), ("count", Value::from(3))])];
    let text = sprintf("%{user} has %<count>02d items", &args).unwrap();
    assert_eq!(&text[..], b"ada has 03 items");
}

#[test]
fn test_printf_binary_template() {
    let program = PrintfProgram::compile(b"\xff%c", Encoding::Binary).unwrap();
    let out = program.execute(&[Value::from(0x80)]).unwrap();
    assert_eq!(&out[..], [0xff, 0x80]);
}

#[test]
fn test_errors() {
    assert!(matches!(pack("Y", &[]), Err(FormatError::Parse(_))));
    assert!(matches!(pack("(C", &[]), Err(FormatError::Parse(_))));
    assert!(matches!(pack("C)", &[]), Err(FormatError::Parse(_))));
    assert_eq!(pack("n2", &[1.into()]), Err(FormatError::TooFewArguments));
    assert!(matches!(
        pack("n", &["x".into()]),
        Err(FormatError::Conversion { target: "Integer", .. })
    ));
    assert!(matches!(unpack("@5", &[0; 2]), Err(FormatError::PositionOutOfRange(_))));
    assert!(matches!(unpack("X", &[]), Err(FormatError::PositionOutOfRange(_))));
    assert!(matches!(sprintf("%d %1$d", &[1.into()]), Err(FormatError::Parse(_))));
    assert!(matches!(sprintf("%", &[]), Err(FormatError::Parse(_))));
    assert!(matches!(sprintf("%2$d", &[1.into()]), Err(FormatError::Argument(_))));
}

#[test]
fn test_numeric_strings_with_stray_signs_fail() {
    for text in ["--5", "+-5", "0x-5", "-0x-5", "0b+1"] {
        assert!(
            matches!(sprintf("%d", &[text.into()]), Err(FormatError::Conversion { target: "Integer", .. })),
            "{}",
            text
        );
    }
    assert_eq!(&sprintf("%d", &["-0x1f".into()]).unwrap()[..], b"-31");
    assert!(matches!(
        sprintf("%f", &["1.e5".into()]),
        Err(FormatError::Conversion { target: "Float", .. })
    ));
    assert_eq!(&sprintf("%.1f", &["1.5e2".into()]).unwrap()[..], b"150.0");
}

#[test]
fn test_error_messages_render() {
    let err = pack("n", &["x".into()]).unwrap_err();
    assert_eq!(err.to_string(), "Cannot convert \"x\" into Integer");
    assert_eq!(FormatError::TooFewArguments.to_string(), "too few arguments");
}

#[test]
fn test_programs_are_shareable_across_threads() {
    let program = std::sync::Arc::new(UnpackProgram::compile("N*").unwrap());
    let handles: Vec<_> = (0..4u32)
        .map(|i| {
            let program = program.clone();
            std::thread::spawn(move || program.execute(&i.to_be_bytes()).unwrap())
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), vec![Value::from(i as u32)]);
    }
}

#[test]
fn test_determinism() {
    let program = PackProgram::compile("m M H* U").unwrap();
    let values = [Value::from("stencil"), Value::from("a=b"), Value::from("beef"), Value::from(0xe9)];
    let first = program.execute(&values).unwrap();
    for _ in 0..10 {
        assert_eq!(program.execute(&values).unwrap(), first);
    }
}
