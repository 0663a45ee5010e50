#![cfg(feature = "serde_cbor")]

use cbor_cddl::cbor::validate_cbor_bytes;
use cbor_cddl::util::{ErrorMatch, MismatchKind};
use cbor_cddl::ValidateError;
use serde::{Deserialize, Serialize};

#[rustfmt::skip] // allow arbitrary indents for readability
pub mod cbor {
    // Mostly example values from rfc7049 appendix A
    pub const BOOL_FALSE:   &[u8] = b"\xF4";
    pub const BOOL_TRUE:    &[u8] = b"\xF5";
    pub const NULL:         &[u8] = b"\xF6";

    pub const INT_0:        &[u8] = b"\x00";
    pub const INT_1:        &[u8] = b"\x01";
    pub const INT_23:       &[u8] = b"\x17";
    pub const INT_24:       &[u8] = b"\x18\x18";
    pub const INT_1T:       &[u8] = b"\x1b\x00\x00\x00\xe8\xd4\xa5\x10\x00";
    pub const NINT_1000:    &[u8] = b"\x39\x03\xe7";  // -1000

    pub const FLOAT_0_0:    &[u8] = b"\xf9\x00\x00";            // #7.25 (f16)
    pub const FLOAT_1_0:    &[u8] = b"\xf9\x3c\x00";            // #7.25 (f16)
    pub const FLOAT_1E5:    &[u8] = b"\xfa\x47\xc3\x50\x00";    // #7.26 (f32)
    pub const FLOAT_1E300:  &[u8] = b"\xfb\x7e\x37\xe4\x3c\x88\x00\x75\x9c"; // #7.27 (f64)

    pub const ARRAY_EMPTY:  &[u8] = b"\x80";              // []
    pub const ARRAY_123:    &[u8] = b"\x83\x01\x02\x03";  // [1,2,3]
    pub const ARRAY_12:     &[u8] = b"\x82\x01\x02";  // [1,2]
    pub const ARRAY_1_23_45:&[u8] = b"\x83\x01\x82\x02\x03\x82\x04\x05";  // [1, [2, 3], [4, 5]]
    pub const ARRAY_INDEF:  &[u8] = b"\x9f\x01\x02\x03\xff";  // [_ 1, 2, 3]

    pub const TEXT_EMPTY:   &[u8] = b"\x60";
    pub const TEXT_IETF:    &[u8] = b"\x64\x49\x45\x54\x46"; // "IETF"
    pub const TEXT_CJK:     &[u8] = b"\x63\xe6\xb0\xb4";     // "水"

    pub const BYTES_EMPTY:  &[u8] = b"\x40";
    pub const BYTES_1234:   &[u8] = b"\x44\x01\x02\x03\x04"; // hex 01020304

    pub const MAP_INT_KEYS: &[u8] = b"\xa2\x01\x02\x03\x04";  // {1: 2, 3: 4}
    pub const MAP_BOOL_KEY: &[u8] = b"\xa1\xf5\x01";          // {true: 1}
}

#[test]
fn validate_cbor_null() {
    let cddl_input = r#"thing = nil"#;
    validate_cbor_bytes("thing", cddl_input, cbor::NULL).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::INT_0).unwrap_err();
    let err = validate_cbor_bytes("thing", cddl_input, cbor::BOOL_FALSE).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Mismatch(ExpectedNil at thing, found Bool, position 0)"
    );
}

#[test]
fn validate_cbor_bool() {
    let cddl_input = r#"thing = true"#;
    validate_cbor_bytes("thing", cddl_input, cbor::BOOL_TRUE).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::BOOL_FALSE).unwrap_err();
    let err = validate_cbor_bytes("thing", cddl_input, cbor::NULL).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Mismatch(ExpectedBool at thing, found Null, position 0)"
    );
}

#[test]
fn validate_cbor_float() {
    let cddl_input = r#"thing = 0.0"#;
    validate_cbor_bytes("thing", cddl_input, cbor::FLOAT_0_0).unwrap();
    let m = validate_cbor_bytes("thing", cddl_input, cbor::FLOAT_1_0).err_mismatch();
    assert_eq!(m.kind, MismatchKind::ExpectedFloat);

    let cddl_input = r#"thing = float"#;
    validate_cbor_bytes("thing", cddl_input, cbor::FLOAT_1_0).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::FLOAT_1E5).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::FLOAT_1E300).unwrap();

    let cddl_input = r#"thing = float16"#;
    validate_cbor_bytes("thing", cddl_input, cbor::FLOAT_1_0).unwrap();

    // "Too small" floats should not cause a validation error.
    // "Canonical CBOR" suggests that floats should be shrunk to the smallest
    // size that can represent the value.  So 1.0 can be stored in 16 bits,
    // even if the CDDL specifies float64.
    let cddl_input = r#"thing = float32"#;
    validate_cbor_bytes("thing", cddl_input, cbor::FLOAT_1_0).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::FLOAT_1E5).unwrap();

    let cddl_input = r#"thing = float64"#;
    validate_cbor_bytes("thing", cddl_input, cbor::FLOAT_1_0).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::FLOAT_1E300).unwrap();
}

#[test]
fn validate_cbor_choice() {
    // Choices parse, but can't be validated.
    let cddl_input = r#"thing = 23 / 24"#;
    validate_cbor_bytes("thing", cddl_input, cbor::INT_23).err_unsupported();

    let cddl_input = r#"thing = (foo // bar) foo = int bar = tstr"#;
    validate_cbor_bytes("thing", cddl_input, cbor::INT_23).err_unsupported();

    let cddl_input = r#"thing = [* (int / float)]"#;
    validate_cbor_bytes("thing", cddl_input, cbor::ARRAY_EMPTY).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::ARRAY_123).err_unsupported();
}

#[test]
fn validate_cbor_integer() {
    let cddl_input = r#"thing = 1"#;
    validate_cbor_bytes("thing", cddl_input, cbor::INT_1).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::NULL).unwrap_err();
    validate_cbor_bytes("thing", cddl_input, cbor::FLOAT_1_0).unwrap_err();
    validate_cbor_bytes("thing", cddl_input, cbor::BOOL_TRUE).unwrap_err();
    let cddl_input = r#"thing = int"#;
    validate_cbor_bytes("thing", cddl_input, cbor::INT_0).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::INT_24).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::INT_1T).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::NINT_1000).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::FLOAT_1_0).unwrap_err();
    let cddl_input = r#"thing = uint"#;
    validate_cbor_bytes("thing", cddl_input, cbor::INT_0).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::INT_24).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::NINT_1000).unwrap_err();
    let cddl_input = r#"thing = nint"#;
    validate_cbor_bytes("thing", cddl_input, cbor::NINT_1000).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::INT_0).unwrap_err();
    validate_cbor_bytes("thing", cddl_input, cbor::INT_24).unwrap_err();
    let cddl_input = r#"thing = 1000000000000"#;
    validate_cbor_bytes("thing", cddl_input, cbor::INT_1T).unwrap();
    let cddl_input = r#"thing = -1000"#;
    validate_cbor_bytes("thing", cddl_input, cbor::NINT_1000).unwrap();
}

#[test]
fn validate_cbor_ranges() {
    let cddl_input = r#"thing = 1..5"#;
    validate_cbor_bytes("thing", cddl_input, cbor::INT_1).err_unsupported();
    let cddl_input = r#"thing = 1...24"#;
    validate_cbor_bytes("thing", cddl_input, cbor::INT_23).err_unsupported();
}

#[test]
fn validate_cbor_textstring() {
    // "tstr" and "text" mean the same thing.
    for cddl_input in [r#"thing = tstr"#, r#"thing = text"#].iter() {
        validate_cbor_bytes("thing", cddl_input, cbor::TEXT_EMPTY).unwrap();
        validate_cbor_bytes("thing", cddl_input, cbor::TEXT_IETF).unwrap();
        validate_cbor_bytes("thing", cddl_input, cbor::TEXT_CJK).unwrap();
        let m = validate_cbor_bytes("thing", cddl_input, cbor::BYTES_EMPTY).err_mismatch();
        assert_eq!(m.kind, MismatchKind::ExpectedTstr);
    }
    let cddl_input = r#"thing = "水""#;
    validate_cbor_bytes("thing", cddl_input, cbor::TEXT_CJK).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::TEXT_IETF).unwrap_err();
}

#[test]
fn validate_cbor_bytestring() {
    // "bstr" and "bytes" mean the same thing.
    for cddl_input in [r#"thing = bstr"#, r#"thing = bytes"#].iter() {
        validate_cbor_bytes("thing", cddl_input, cbor::BYTES_EMPTY).unwrap();
        validate_cbor_bytes("thing", cddl_input, cbor::BYTES_1234).unwrap();
        validate_cbor_bytes("thing", cddl_input, cbor::TEXT_EMPTY).unwrap_err();
        let err = validate_cbor_bytes("thing", cddl_input, cbor::ARRAY_123).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Mismatch(ExpectedBstr at thing, found BeginArray, position 0)"
        );
    }
}

#[test]
fn validate_cbor_array() {
    let cddl_input = r#"thing = []"#;
    validate_cbor_bytes("thing", cddl_input, cbor::ARRAY_EMPTY).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::NULL).unwrap_err();

    let cddl_input = r#"thing = [1, 2, 3]"#;
    validate_cbor_bytes("thing", cddl_input, cbor::ARRAY_123).unwrap();
    validate_cbor_bytes("thing", cddl_input, cbor::ARRAY_INDEF).unwrap();
    let m = validate_cbor_bytes("thing", cddl_input, cbor::ARRAY_12).err_mismatch();
    assert_eq!(m.kind, MismatchKind::ExpectedUint);

    let cddl_input = r#"thing = [int, [int, int], pair] pair = [int, int]"#;
    validate_cbor_bytes("thing", cddl_input, cbor::ARRAY_1_23_45).unwrap();
    let m = validate_cbor_bytes("thing", cddl_input, cbor::ARRAY_123).err_mismatch();
    assert_eq!(m.kind, MismatchKind::ExpectedArray);
    assert_eq!(m.position, Some(2));
}

// These data structures exist so that we can serialize some more complex
// beyond the RFC examples.
#[derive(Debug, Serialize, Deserialize)]
struct PersonStruct {
    name: String,
    age: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersonTuple(String, u32);

#[test]
fn validate_cbor_map() {
    let input = PersonStruct {
        name: "Bob".to_string(),
        age: 43,
    };
    let cbor_bytes = serde_cbor::to_vec(&input).unwrap();
    let cddl_input = r#"thing = {name: tstr, age: int}"#;
    validate_cbor_bytes("thing", cddl_input, &cbor_bytes).unwrap();

    let cddl_input = r#"thing = {name: tstr, ? age: int, ? minor: bool}"#;
    validate_cbor_bytes("thing", cddl_input, &cbor_bytes).unwrap();

    let cddl_input = r#"thing = {name: tstr, age: tstr}"#;
    let m = validate_cbor_bytes("thing", cddl_input, &cbor_bytes).err_mismatch();
    assert_eq!(m.rule, "age");

    let input = PersonTuple("Alice".to_string(), 42);
    let cbor_bytes = serde_cbor::to_vec(&input).unwrap();
    let cddl_input = r#"thing = [name: tstr, age: uint]"#;
    validate_cbor_bytes("thing", cddl_input, &cbor_bytes).unwrap();
}

#[test]
fn validate_cbor_map_keys() {
    // Integer keys are matched by their decimal text.
    let cddl_input = r#"thing = { 1: uint, 3: uint }"#;
    validate_cbor_bytes("thing", cddl_input, cbor::MAP_INT_KEYS).unwrap();

    let cddl_input = r#"thing = { * any: uint }"#;
    let err = validate_cbor_bytes("thing", cddl_input, cbor::MAP_BOOL_KEY).unwrap_err();
    assert!(matches!(err, ValidateError::ValueError(_)));
}

#[test]
fn validate_cbor_errors() {
    let err = validate_cbor_bytes("thing", "thing = int", b"\x18").unwrap_err();
    assert!(matches!(err, ValidateError::ValueError(_)));

    validate_cbor_bytes("other", "thing = int", cbor::INT_0).err_missing_rule();
}
