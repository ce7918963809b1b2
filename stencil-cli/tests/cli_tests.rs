use std::fs;
use tempfile::tempdir;

use stencil_cli::commands::{explain, pack, printf, unpack};
use stencil_cli::{load_options, parse_values, Frontend};
use stencil_core::{CompileOptions, Encoding};

fn write_file<P: AsRef<std::path::Path>>(p: P, s: &str) {
    fs::write(p, s.as_bytes()).unwrap();
}

#[test]
fn pack_values_file_to_raw_output() {
    let td = tempdir().unwrap();
    let in_path = td.path().join("values.json");
    let out_path = td.path().join("out.bin");
    write_file(&in_path, r#"[258, "hi", 9786]"#);

    pack::execute(
        "n a3 U",
        None,
        Some(in_path.to_str().unwrap()),
        Some(out_path.to_str().unwrap()),
        &CompileOptions::default(),
    )
    .unwrap();

    let bytes = fs::read(&out_path).unwrap();
    assert_eq!(bytes, b"\x01\x02hi\x00\xe2\x98\xba");
}

#[test]
fn pack_run_reports_encoding() {
    let values = parse_values(r#"["aGVsbG8="]"#).unwrap();
    let packed = pack::run("m0", &values, &CompileOptions::default()).unwrap();
    assert_eq!(packed.encoding, Encoding::UsAscii);
    assert_eq!(&packed.bytes[..], b"YUdWc2JHOD0=");
}

#[test]
fn pack_requires_one_value_source() {
    let err = pack::execute("C", None, None, None, &CompileOptions::default()).unwrap_err();
    assert!(err.to_string().contains("--values"));
}

#[test]
fn pack_error_carries_context() {
    let values = parse_values("[1]").unwrap();
    let err = pack::run("C2", &values, &CompileOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "Failed to pack values");
    assert_eq!(err.root_cause().to_string(), "too few arguments");
}

#[test]
fn unpack_file_to_json() {
    let td = tempdir().unwrap();
    let in_path = td.path().join("in.bin");
    fs::write(&in_path, [0x00, 0x2a, b'o', b'k', 0xff]).unwrap();

    let data = fs::read(&in_path).unwrap();
    let json = unpack::run("n a2 C", &data, &CompileOptions::default()).unwrap();
    assert_eq!(json.to_string(), r#"[42,"ok",255]"#);

    unpack::execute(
        "n a2 C",
        Some(in_path.to_str().unwrap()),
        None,
        &CompileOptions::default(),
    )
    .unwrap();
}

#[test]
fn unpack_hex_input_and_binary_strings() {
    unpack::execute("a*", None, Some("ff00"), &CompileOptions::default()).unwrap();
    let json = unpack::run("a*", &[0xff, 0x00], &CompileOptions::default()).unwrap();
    assert_eq!(json.to_string(), r#"[{"hex":"ff00"}]"#);
    assert!(unpack::execute("a*", None, Some("zz"), &CompileOptions::default()).is_err());
}

#[test]
fn printf_parses_json_arguments() {
    let args = vec!["42".to_string(), "hi".to_string(), "2.5".to_string()];
    let text = printf::run("%05d|%-4s|%.2f", &args).unwrap();
    assert_eq!(&text[..], b"00042|hi  |2.50");
}

#[test]
fn printf_named_arguments_from_object() {
    let args = vec![r#"{"name": "ada", "n": 3}"#.to_string()];
    let text = printf::run("%{name}:%<n>03d", &args).unwrap();
    assert_eq!(&text[..], b"ada:003");
}

#[test]
fn explain_reports_loop_recovery() {
    let template = "C".repeat(100);
    let explanation = explain::run(&template, Frontend::Pack, &CompileOptions::default()).unwrap();
    assert_eq!(explanation.recovered, "(C)100");
    assert_eq!(explanation.encoding.as_deref(), Some("ASCII-8BIT"));
    assert_eq!(explanation.tree[0], "repeat 100");
    assert!(explanation.node_count < 5);

    let naive = explain::run(&template, Frontend::Pack, &CompileOptions::without_loop_recovery()).unwrap();
    assert_eq!(naive.recovered, template);
    assert!(naive.node_count > 100);
}

#[test]
fn explain_printf_tree() {
    let explanation = explain::run("x=%d", Frontend::Printf, &CompileOptions::default()).unwrap();
    assert_eq!(explanation.frontend, "printf");
    assert_eq!(explanation.node_count, 3);
    assert_eq!(explanation.tree[0], "sequence");
    assert!(explanation.tree[1].starts_with("  Literal"));
}

#[test]
fn explain_unpack_has_no_encoding() {
    let explanation = explain::run("x* X2", Frontend::Unpack, &CompileOptions::default()).unwrap();
    assert_eq!(explanation.encoding, None);
    assert!(explanation.tree.iter().any(|l| l.contains("skip source to end")));
}

#[test]
fn config_file_and_overrides() {
    let td = tempdir().unwrap();
    let cfg = td.path().join("stencil.json");
    write_file(&cfg, r#"{"unroll_limit": 8}"#);

    let options = load_options(Some(cfg.to_str().unwrap()), false, None).unwrap();
    assert_eq!(options.unroll_limit, 8);
    assert!(options.loop_recovery);

    let options = load_options(Some(cfg.to_str().unwrap()), true, Some(2)).unwrap();
    assert_eq!(options.unroll_limit, 2);
    assert!(!options.loop_recovery);

    assert!(load_options(Some("/nonexistent/stencil.json"), false, None).is_err());
}
