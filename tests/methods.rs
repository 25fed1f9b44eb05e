//! Static and instance methods, out and ref parameters, and sequence entry points.

mod common;

use dotbridge::prelude::*;

use common::{bridge, handle};

fn text(value: &str) -> NativeValue {
    NativeValue::string(value).expect("no interior nul")
}

#[test]
fn test_static_factory() -> Result<()> {
    let bridge = bridge()?;

    let created = bridge.call("Methods_Static_Create", vec![NativeValue::I32(1)])?;
    assert_eq!(bridge.call("Methods_Static_get_Id", vec![created])?, NativeValue::I32(1));

    let item = bridge.call("Methods_Factory_CreateItem", vec![NativeValue::I32(7)])?;
    assert_eq!(bridge.call("Methods_Item_get_Integer", vec![item])?, NativeValue::I32(7));
    Ok(())
}

#[test]
fn test_null_strings_cross_as_null() -> Result<()> {
    let bridge = bridge()?;
    let null = NativeValue::null_string;

    assert!(bridge.call("Methods_Parameters_Concat", vec![null(), null()])?.is_null());
    assert_eq!(
        bridge.call("Methods_Parameters_Concat", vec![text("first"), null()])?.as_str(),
        Some("first")
    );
    assert_eq!(
        bridge.call("Methods_Parameters_Concat", vec![null(), text("second")])?.as_str(),
        Some("second")
    );
    assert_eq!(
        bridge.call("Methods_Parameters_Concat", vec![text("first"), text("second")])?.as_str(),
        Some("firstsecond")
    );
    Ok(())
}

#[test]
fn test_ref_parameters() -> Result<()> {
    let bridge = bridge()?;

    let mut flag = NativeValue::Bool(false);
    let mut message = NativeString::new(None)?;
    bridge.invoke(
        "Methods_Parameters_Ref",
        &mut [NativeArg::by_ref(&mut flag), NativeArg::ref_string(&mut message)],
    )?;
    assert_eq!(flag, NativeValue::Bool(true));
    assert!(message.is_null());

    bridge.invoke(
        "Methods_Parameters_Ref",
        &mut [NativeArg::by_ref(&mut flag), NativeArg::ref_string(&mut message)],
    )?;
    assert_eq!(flag, NativeValue::Bool(false));
    assert_eq!(message.as_str(), Some("hello"));
    Ok(())
}

#[test]
fn test_out_parameters() -> Result<()> {
    let bridge = bridge()?;

    let mut length = NativeValue::I32(-1);
    let mut upper = NativeString::new(Some("stale"))?;
    bridge.invoke(
        "Methods_Parameters_Out",
        &mut [
            NativeArg::In(NativeValue::null_string()),
            NativeArg::out(&mut length),
            NativeArg::out_string(&mut upper),
        ],
    )?;
    assert_eq!(length, NativeValue::I32(0));
    assert!(upper.is_null());

    bridge.invoke(
        "Methods_Parameters_Out",
        &mut [
            NativeArg::In(text("Xamarin")),
            NativeArg::out(&mut length),
            NativeArg::out_string(&mut upper),
        ],
    )?;
    assert_eq!(length, NativeValue::I32(7));
    assert_eq!(upper.as_str(), Some("XAMARIN"));
    Ok(())
}

#[test]
fn test_direction_must_match_declaration() -> Result<()> {
    let bridge = bridge()?;

    let result = bridge.call(
        "Methods_Parameters_Out",
        vec![text("Xamarin"), NativeValue::I32(0), NativeValue::null_string()],
    );
    assert!(matches!(result, Err(Error::TypeMismatch { .. })));

    let result = bridge.call("Methods_Parameters_Concat", vec![text("only one")]);
    assert!(matches!(result, Err(Error::ArgumentCount { expected: 2, got: 1, .. })));
    Ok(())
}

#[test]
fn test_collection() -> Result<()> {
    let bridge = bridge()?;
    let collection = bridge.call("Methods_Collection_new", vec![])?;
    let count = || bridge.call("Methods_Collection_get_Count", vec![collection.clone()]);

    assert_eq!(count()?, NativeValue::I32(0));

    let first = bridge.call("Methods_Factory_CreateItem", vec![NativeValue::I32(1)])?;
    let second = bridge.call("Methods_Factory_CreateItem", vec![NativeValue::I32(2)])?;
    bridge.call("Methods_Collection_Add", vec![collection.clone(), first.clone()])?;
    bridge.call("Methods_Collection_Add", vec![collection.clone(), second.clone()])?;
    assert_eq!(count()?, NativeValue::I32(2));

    let at_zero = bridge.call(
        "Methods_Collection_get_Item",
        vec![collection.clone(), NativeValue::I32(0)],
    )?;
    assert!(bridge.same_object(handle(&at_zero), handle(&first))?);
    assert_eq!(bridge.call("Methods_Item_get_Integer", vec![at_zero])?, NativeValue::I32(1));

    bridge.call(
        "Methods_Collection_set_Item",
        vec![collection.clone(), NativeValue::I32(0), second.clone()],
    )?;
    let at_zero = bridge.call(
        "Methods_Collection_get_Item",
        vec![collection.clone(), NativeValue::I32(0)],
    )?;
    assert!(bridge.same_object(handle(&at_zero), handle(&second))?);

    // `first` is no longer a member.
    bridge.call("Methods_Collection_Remove", vec![collection.clone(), first])?;
    assert_eq!(count()?, NativeValue::I32(2));

    bridge.call("Methods_Collection_Remove", vec![collection.clone(), second])?;
    assert_eq!(count()?, NativeValue::I32(1));
    Ok(())
}

#[test]
fn test_collection_bounds() -> Result<()> {
    let bridge = bridge()?;
    let collection = bridge.call("Methods_Collection_new", vec![])?;

    for index in [0, -1, 3] {
        let result = bridge.call(
            "Methods_Collection_get_Item",
            vec![collection.clone(), NativeValue::I32(index)],
        );
        assert!(matches!(result, Err(ref error) if error.is_bounds_fault()), "{index}");
    }
    assert!(bridge.last_fault().is_none());
    Ok(())
}

#[test]
fn test_collection_rejects_wrong_element_type() -> Result<()> {
    let bridge = bridge()?;
    let collection = bridge.call("Methods_Collection_new", vec![])?;
    let query = bridge.call("Properties_Query_new", vec![])?;

    let result = bridge.call("Methods_Collection_Add", vec![collection, query]);
    assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    Ok(())
}
