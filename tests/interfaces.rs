//! Interface entry points dispatch to the concrete implementation.

mod common;

use dotbridge::prelude::*;

use common::{bridge, handle};

#[test]
fn test_interface_dispatch() -> Result<()> {
    let bridge = bridge()?;

    let made_up = bridge.call("Interfaces_Supplier_Create", vec![])?;
    assert!(!handle(&made_up).is_null());

    assert_eq!(
        bridge.call("Interfaces_IMakeItUp_get_Boolean", vec![made_up.clone()])?,
        NativeValue::Bool(true)
    );
    assert_eq!(
        bridge.call("Interfaces_IMakeItUp_get_Boolean", vec![made_up.clone()])?,
        NativeValue::Bool(false)
    );

    let converted = bridge.call(
        "Interfaces_IMakeItUp_Convert",
        vec![made_up.clone(), NativeValue::I32(123)],
    )?;
    assert_eq!(converted.as_str(), Some("123"));
    let converted = bridge.call(
        "Interfaces_IMakeItUp_Convert_1",
        vec![made_up, NativeValue::I64(-456)],
    )?;
    assert_eq!(converted.as_str(), Some("-456"));
    Ok(())
}

#[test]
fn test_interface_results_remember_the_concrete_type() -> Result<()> {
    let bridge = bridge()?;

    let made_up = bridge.call("Interfaces_Supplier_Create", vec![])?;
    assert_eq!(
        bridge.call("Interfaces_MakeItUp_Convert", vec![made_up, NativeValue::I32(1)])?.as_str(),
        Some("1")
    );
    Ok(())
}

#[test]
fn test_objects_passed_as_interfaces() -> Result<()> {
    let bridge = bridge()?;

    let adder = bridge.call("Interfaces_ManagedAdder_new", vec![])?;
    assert_eq!(
        bridge.call(
            "Interfaces_OpConsumer_DoAddition",
            vec![adder, NativeValue::I32(40), NativeValue::I32(2)]
        )?,
        NativeValue::I32(42)
    );
    assert_eq!(
        bridge.call(
            "Interfaces_OpConsumer_TestManagedAdder",
            vec![NativeValue::I32(1), NativeValue::I32(-1)],
        )?,
        NativeValue::Bool(true)
    );
    Ok(())
}

#[test]
fn test_unrelated_object_is_not_an_implementation() -> Result<()> {
    let bridge = bridge()?;

    let query = bridge.call("Properties_Query_new", vec![])?;
    let result = bridge.call(
        "Interfaces_OpConsumer_DoAddition",
        vec![query.clone(), NativeValue::I32(1), NativeValue::I32(2)],
    );
    assert!(matches!(result, Err(Error::TypeMismatch { .. })));

    let result = bridge.call("Interfaces_IMakeItUp_get_Boolean", vec![query]);
    assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    Ok(())
}

#[test]
fn test_interfaces_are_not_constructible() -> Result<()> {
    let bridge = bridge()?;
    assert!(bridge.binding("Interfaces_IMakeItUp_new").is_err());
    Ok(())
}
