use cbor_cddl::parse_cddl;
use cbor_cddl::parser::ErrorKind;
use cbor_cddl::rules::Rule;

#[test]
fn parse_geography() {
    let cddl_input = "
        ; Where a city is.
        geography = [
            city           : tstr,
            gpsCoordinates : gps,
        ]
        gps = { longitude : uint, latitude : uint }
    ";
    let spec = parse_cddl(cddl_input).unwrap();
    assert_eq!(spec.root(), "geography");

    let dict = spec.dictionary();
    let names: Vec<&str> = dict.names().map(|(name, _)| name).collect();
    assert_eq!(names, ["geography", "gps"]);

    let gps = dict.lookup("gps").unwrap();
    match dict.get(gps).unwrap() {
        Rule::Map(map) => {
            let keys: Vec<&str> = map.index.keys().map(String::as_str).collect();
            assert_eq!(keys, ["latitude", "longitude"]);
        }
        other => panic!("expected map, got {:?}", other),
    }
}

#[test]
fn parse_identifiers() {
    parse_cddl("a-b.c_d$e@f = int").unwrap();
    parse_cddl("$a = int").unwrap();
    parse_cddl("_a1 = int").unwrap();
    let err = parse_cddl("a. = int").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidId);
}

#[test]
fn parse_comments_and_whitespace() {
    let cddl_input = "a = [ ; first\n  int , ; second\n\ttstr ; third\n] ; done";
    let spec = parse_cddl(cddl_input).unwrap();
    let dict = spec.dictionary();
    match dict.get(dict.lookup("a").unwrap()).unwrap() {
        Rule::Array(entries) => assert_eq!(entries.len(), 2),
        other => panic!("expected array, got {:?}", other),
    }
}

#[test]
fn parse_errors() {
    let err = parse_cddl("person = { name: tstr age: uint }").unwrap_err();
    assert_eq!(err.kind, ErrorKind::ExpectedCommaOrLeftParOrRightCurBracket);
    assert_eq!((err.line, err.column), (1, 23));
    assert_eq!(
        err.to_string(),
        "Expected , or ( or } at line 1 and column 23"
    );

    let err = parse_cddl("a = [int]\nb = [\n  tstr,\n  nonesuch ]").unwrap_err();
    assert_eq!(err.kind, ErrorKind::IdLookupFailed);
    assert_eq!((err.line, err.column), (4, 3));
    assert_eq!(err.to_string(), "Rule id lookup failed at line 4 and column 3");

    let err = parse_cddl("a = int\nb = tstr\na = uint").unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateRuleId);
    assert_eq!(err.line, 3);

    let err = parse_cddl("a = [ int,").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnexpectedEof);
}

#[test]
fn prelude_shadowing() {
    // A user rule can replace a prelude name.
    let spec = parse_cddl("a = [tstr]\ntstr = int").unwrap();
    let dict = spec.dictionary();
    let tstr = dict.lookup("tstr").unwrap();
    assert!(!dict.is_terminal(tstr));
}

#[test]
fn link_is_idempotent() {
    let mut spec = parse_cddl("a = { b, c: int }\nb = ( d: tstr, ? e: a )").unwrap();
    let before = format!("{:?}", spec.dictionary());
    spec.link().unwrap();
    spec.link().unwrap();
    assert_eq!(format!("{:?}", spec.dictionary()), before);
}
