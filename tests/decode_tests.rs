use pipegen::decode::{DecodeConfig, DecodeError, Decoder};

fn decoder() -> Decoder {
    Decoder::new(DecodeConfig::default())
}

#[test]
fn test_row_unpacks_into_pairs() {
    // Row 1 packs keys 1 and 2, values 10 and 20, in 16-bit chunks.
    let dump = "kvKeys[1]=131073\nkvValues[1]=1310730\n";
    let entries = decoder().decode(dump).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].key, "1");
    assert_eq!(entries[0].value, 10);
    assert_eq!(entries[1].key, "2");
    assert_eq!(entries[1].value, 20);
}

#[test]
fn test_empty_rows_are_skipped() {
    let dump = "kvKeys[0]=0\nkvValues[0]=7\nkvKeys[1]=5\nkvValues[1]=9\n";
    let entries = decoder().decode(dump).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "5");
    assert_eq!(entries[0].value, 9);
}

#[test]
fn test_missing_value_row_defaults_to_zero() {
    let entries = decoder().decode("kvKeys[3]=5\n").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].value, 0);
}

#[test]
fn test_unrelated_lines_are_ignored() {
    let dump = "RuntimeCmd: register_read kvKeys 1\nkvKeys[1]=5\nkvValues[1]=9\ndone\n";
    let entries = decoder().decode(dump).unwrap();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_other_register_names_are_ignored() {
    let dump = "otherReg[1]=5\nkvKeys[1]=6\nkvValues[1]=9\n";
    let entries = decoder().decode(dump).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "6");
}

#[test]
fn test_custom_register_names() {
    let decoder = Decoder::new(DecodeConfig {
        key_register: "KeyReg_flowcount".to_string(),
        value_register: "ValueReg_flowcount".to_string(),
        ..DecodeConfig::default()
    });
    let dump = "KeyReg_flowcount[2]=5\nValueReg_flowcount[2]=9\n";
    let entries = decoder.decode(dump).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].value, 9);
}

#[test]
fn test_garbage_value_is_an_error() {
    let err = decoder().decode("kvKeys[1]=garbage\n").unwrap_err();
    assert_eq!(err, DecodeError::BadValue("kvKeys[1]=garbage".to_string()));
}

#[test]
fn test_rows_decode_in_index_order() {
    let dump = "kvKeys[9]=2\nkvValues[9]=20\nkvKeys[1]=1\nkvValues[1]=10\n";
    let entries = decoder().decode(dump).unwrap();
    assert_eq!(entries[0].key, "1");
    assert_eq!(entries[1].key, "2");
}

#[test]
fn test_sub_key_width_renders_dotted_keys() {
    let decoder = Decoder::new(DecodeConfig {
        key_width: 32,
        sub_key_width: 8,
        ..DecodeConfig::default()
    });
    // 0x0a000001 = 10.0.0.1
    let dump = "kvKeys[1]=167772161\nkvValues[1]=3\n";
    let entries = decoder.decode(dump).unwrap();
    assert_eq!(entries[0].key, "10.0.0.1");
    assert_eq!(entries[0].value, 3);
}

#[test]
fn test_text_format() {
    let entries = decoder().decode("kvKeys[1]=5\nkvValues[1]=9\n").unwrap();
    assert_eq!(decoder().format(&entries), "5:\t9\n");
}

#[test]
fn test_json_format() {
    let d = decoder();
    let entries = d.decode("kvKeys[1]=5\nkvValues[1]=9\n").unwrap();
    assert_eq!(d.to_json(&entries).to_string(), "{\"5\":9}");
}
