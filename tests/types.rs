//! Primitive limits, strings and parameter passing through the flat surface.

mod common;

use dotbridge::prelude::*;

use common::bridge;

#[test]
fn test_primitive_limits() -> Result<()> {
    let bridge = bridge()?;

    let cases = [
        ("Type_Char", NativeValue::Char(0), NativeValue::Char(u16::MAX)),
        ("Type_SByte", NativeValue::I8(i8::MIN), NativeValue::I8(i8::MAX)),
        ("Type_Byte", NativeValue::U8(u8::MIN), NativeValue::U8(u8::MAX)),
        ("Type_Int16", NativeValue::I16(i16::MIN), NativeValue::I16(i16::MAX)),
        ("Type_UInt16", NativeValue::U16(u16::MIN), NativeValue::U16(u16::MAX)),
        ("Type_Int32", NativeValue::I32(i32::MIN), NativeValue::I32(i32::MAX)),
        ("Type_UInt32", NativeValue::U32(u32::MIN), NativeValue::U32(u32::MAX)),
        ("Type_Int64", NativeValue::I64(i64::MIN), NativeValue::I64(i64::MAX)),
        ("Type_UInt64", NativeValue::U64(u64::MIN), NativeValue::U64(u64::MAX)),
        ("Type_Single", NativeValue::F32(-f32::MAX), NativeValue::F32(f32::MAX)),
        ("Type_Double", NativeValue::F64(-f64::MAX), NativeValue::F64(f64::MAX)),
    ];

    for (prefix, min, max) in cases {
        assert_eq!(bridge.call(&format!("{prefix}_get_Min"), vec![])?, min, "{prefix} min");
        assert_eq!(bridge.call(&format!("{prefix}_get_Max"), vec![])?, max, "{prefix} max");
    }
    assert_eq!(bridge.call("Type_Char_get_Zero", vec![])?, NativeValue::Char(0));
    Ok(())
}

#[test]
fn test_strings() -> Result<()> {
    let bridge = bridge()?;

    assert!(bridge.call("Type_String_get_NullString", vec![])?.is_null());
    assert_eq!(bridge.call("Type_String_get_EmptyString", vec![])?.as_str(), Some(""));
    assert_eq!(
        bridge.call("Type_String_get_NonEmptyString", vec![])?.as_str(),
        Some("Hello World")
    );
    Ok(())
}

#[test]
fn test_builtin_returns() -> Result<()> {
    let bridge = bridge()?;
    let builtins = bridge.call("BuiltinTypes_new", vec![])?;
    assert!(!common::handle(&builtins).is_null());

    let expected = [
        ("ReturnsVoid", NativeValue::Void),
        ("ReturnsBool", NativeValue::Bool(true)),
        ("ReturnsSByte", NativeValue::I8(-5)),
        ("ReturnsByte", NativeValue::U8(5)),
        ("ReturnsShort", NativeValue::I16(-5)),
        ("ReturnsUShort", NativeValue::U16(5)),
        ("ReturnsInt", NativeValue::I32(-5)),
        ("ReturnsUInt", NativeValue::U32(5)),
        ("ReturnsLong", NativeValue::I64(-5)),
        ("ReturnsULong", NativeValue::U64(5)),
        ("ReturnsChar", NativeValue::Char(u16::from(b'a'))),
        ("ReturnsString", NativeValue::string("Mono")?),
    ];
    for (name, value) in expected {
        assert_eq!(
            bridge.call(&format!("BuiltinTypes_{name}"), vec![builtins.clone()])?,
            value,
            "{name}"
        );
    }
    Ok(())
}

#[test]
fn test_pass_and_return() -> Result<()> {
    let bridge = bridge()?;
    let builtins = bridge.call("BuiltinTypes_new", vec![])?;

    let values = [
        ("Bool", NativeValue::Bool(false)),
        ("SByte", NativeValue::I8(i8::MIN)),
        ("Byte", NativeValue::U8(u8::MAX)),
        ("Short", NativeValue::I16(-1)),
        ("UShort", NativeValue::U16(u16::MAX)),
        ("Int", NativeValue::I32(i32::MIN)),
        ("UInt", NativeValue::U32(u32::MAX)),
        ("Long", NativeValue::I64(i64::MIN)),
        ("ULong", NativeValue::U64(u64::MAX)),
        ("Char", NativeValue::Char(0xD800)),
        ("String", NativeValue::string("Mono")?),
        ("String", NativeValue::null_string()),
    ];
    for (suffix, value) in values {
        let echoed = bridge.call(
            &format!("BuiltinTypes_PassAndReturns{suffix}"),
            vec![builtins.clone(), value.clone()],
        )?;
        assert_eq!(echoed, value, "{suffix}");
    }
    Ok(())
}

#[test]
fn test_out_and_ref_parameters() -> Result<()> {
    let bridge = bridge()?;
    let builtins = bridge.call("BuiltinTypes_new", vec![])?;

    let mut out = NativeValue::I32(0);
    bridge.invoke(
        "BuiltinTypes_PassOutInt",
        &mut [NativeArg::In(builtins.clone()), NativeArg::out(&mut out)],
    )?;
    assert_eq!(out, NativeValue::I32(5));

    let mut by_ref = NativeValue::I32(0);
    bridge.invoke(
        "BuiltinTypes_PassRefInt",
        &mut [NativeArg::In(builtins.clone()), NativeArg::by_ref(&mut by_ref)],
    )?;
    assert_eq!(by_ref, NativeValue::I32(10));

    let mut text = NativeString::empty();
    bridge.invoke(
        "BuiltinTypes_PassOutString",
        &mut [NativeArg::In(builtins.clone()), NativeArg::out_string(&mut text)],
    )?;
    assert_eq!(text.as_str(), Some("Mono"));

    let mut text = NativeString::new(Some("monomono"))?;
    bridge.invoke(
        "BuiltinTypes_PassRefString",
        &mut [NativeArg::In(builtins), NativeArg::ref_string(&mut text)],
    )?;
    assert_eq!(text.as_str(), Some("Mono"));
    Ok(())
}

#[test]
fn test_empty_strings_stay_empty_in_every_direction() -> Result<()> {
    let bridge = bridge()?;
    let builtins = bridge.call("BuiltinTypes_new", vec![])?;

    let returned = bridge.call(
        "BuiltinTypes_PassAndReturnsString",
        vec![builtins.clone(), NativeValue::string("")?],
    )?;
    assert!(!returned.is_null());
    assert_eq!(returned.as_str().map(str::len), Some(0));

    let mut out = NativeString::new(Some("stale"))?;
    bridge.invoke(
        "BuiltinTypes_PassOutEmptyString",
        &mut [NativeArg::In(builtins.clone()), NativeArg::out_string(&mut out)],
    )?;
    assert!(!out.is_null());
    assert_eq!(out.as_str().map(str::len), Some(0));

    let mut by_ref = NativeString::empty();
    bridge.invoke(
        "BuiltinTypes_PassRefTrimmedString",
        &mut [NativeArg::In(builtins.clone()), NativeArg::ref_string(&mut by_ref)],
    )?;
    assert!(!by_ref.is_null());
    assert_eq!(by_ref.as_str().map(str::len), Some(0));

    let mut padded = NativeString::new(Some("  Mono  "))?;
    bridge.invoke(
        "BuiltinTypes_PassRefTrimmedString",
        &mut [NativeArg::In(builtins.clone()), NativeArg::ref_string(&mut padded)],
    )?;
    assert_eq!(padded.as_str(), Some("Mono"));

    let mut null = NativeString::default();
    bridge.invoke(
        "BuiltinTypes_PassRefTrimmedString",
        &mut [NativeArg::In(builtins), NativeArg::ref_string(&mut null)],
    )?;
    assert!(null.is_null());
    Ok(())
}

#[test]
fn test_width_mismatch_is_rejected() -> Result<()> {
    let bridge = bridge()?;
    let builtins = bridge.call("BuiltinTypes_new", vec![])?;

    let result = bridge.call("BuiltinTypes_PassAndReturnsInt", vec![builtins, NativeValue::I64(1)]);
    assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    Ok(())
}
