//! Handle identity, reference counting and collection.

mod common;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use dotbridge::prelude::*;
use rayon::prelude::*;

use common::{bridge, handle, validation_domain};

#[test]
fn test_one_handle_per_object() -> Result<()> {
    let bridge = bridge()?;

    let first = handle(&bridge.call("Fields_Class_get_Scratch", vec![])?);
    let second = handle(&bridge.call("Fields_Class_get_Scratch", vec![])?);
    assert_eq!(first, second);
    assert_eq!(bridge.handles().ref_count(first)?, 2);
    assert_eq!(bridge.handles().live(), 1);

    assert_eq!(bridge.release(first)?, 1);
    assert_eq!(bridge.release(second)?, 0);
    assert!(matches!(bridge.release(first), Err(Error::HandleReleased(_))));
    Ok(())
}

#[test]
fn test_distinct_objects_get_distinct_handles() -> Result<()> {
    let bridge = bridge()?;

    let a = handle(&bridge.call("Properties_Query_new", vec![])?);
    let b = handle(&bridge.call("Properties_Query_new", vec![])?);
    assert_ne!(a, b);
    assert!(!bridge.same_object(a, b)?);
    assert!(bridge.same_object(a, a)?);
    Ok(())
}

#[test]
fn test_released_objects_are_collected() -> Result<()> {
    let bridge = bridge()?;

    let query = handle(&bridge.call("Properties_Query_new", vec![])?);
    let kept = handle(&bridge.call("Properties_Query_new", vec![])?);
    assert_eq!(bridge.collect()?, 0);

    bridge.release(query)?;
    assert_eq!(bridge.collect()?, 1);
    assert!(matches!(bridge.resolve(query), Err(Error::HandleReleased(_))));

    assert_eq!(
        bridge.call("Properties_Query_get_Answer", vec![NativeValue::Handle(kept)])?,
        NativeValue::I32(42)
    );
    Ok(())
}

#[test]
fn test_objects_reachable_from_statics_survive() -> Result<()> {
    let bridge = bridge()?;

    let scratch = handle(&bridge.call("Fields_Class_get_Scratch", vec![])?);
    bridge.release(scratch)?;
    bridge.collect()?;

    let again = bridge.call("Fields_Class_get_Scratch", vec![])?;
    assert_eq!(bridge.call("Fields_Class_get_Boolean", vec![again])?, NativeValue::Bool(true));
    Ok(())
}

#[test]
fn test_eager_collection_on_release() -> Result<()> {
    let config = BridgeConfig {
        log_faults: false,
        ..BridgeConfig::strict()
    };
    let bridge = Bridge::with_config(Arc::new(validation_domain()?), config)?;

    let query = handle(&bridge.call("Properties_Query_new", vec![])?);
    let objects = bridge.domain().heap().len();
    bridge.release(query)?;
    assert_eq!(bridge.domain().heap().len(), objects - 1);
    Ok(())
}

#[test]
fn test_handle_budget() -> Result<()> {
    let config = BridgeConfig::minimal().with_max_handles(2);
    let bridge = Bridge::with_config(Arc::new(validation_domain()?), config)?;

    let a = handle(&bridge.call("Properties_Query_new", vec![])?);
    bridge.call("Properties_Query_new", vec![])?;
    let result = bridge.call("Properties_Query_new", vec![]);
    assert!(matches!(result, Err(Error::HandleTableFull(2))));

    bridge.release(a)?;
    assert!(!handle(&bridge.call("Properties_Query_new", vec![])?).is_null());
    Ok(())
}

#[test]
fn test_concurrent_entry_points() -> Result<()> {
    let bridge = bridge()?;

    (0..256)
        .into_par_iter()
        .map(|id| -> Result<()> {
            let unique = bridge.call("Constructors_Unique_new_1", vec![NativeValue::I32(id)])?;
            let read = bridge.call("Constructors_Unique_get_Id", vec![unique.clone()])?;
            assert_eq!(read, NativeValue::I32(id));
            assert_eq!(bridge.release(handle(&unique))?, 0);
            Ok(())
        })
        .collect::<Result<Vec<()>>>()?;

    assert_eq!(bridge.handles().live(), 0);
    bridge.collect()?;
    Ok(())
}

#[test]
fn test_collection_waits_for_calls_in_flight() -> Result<()> {
    let bridge = bridge()?;
    let done = AtomicBool::new(false);

    thread::scope(|scope| -> Result<()> {
        let collector = scope.spawn(|| -> Result<usize> {
            let mut rounds = 0;
            loop {
                bridge.collect()?;
                rounds += 1;
                if done.load(Ordering::Acquire) {
                    return Ok(rounds);
                }
            }
        });

        let created = (0..20_000).try_for_each(|id| -> Result<()> {
            let item = bridge.call("Methods_Factory_CreateItem", vec![NativeValue::I32(id)])?;
            let read = bridge.call("Methods_Item_get_Integer", vec![item.clone()])?;
            assert_eq!(read, NativeValue::I32(id));
            assert_eq!(bridge.release(handle(&item))?, 0);
            Ok(())
        });
        done.store(true, Ordering::Release);

        let rounds = collector.join().map_err(|_| Error::LockError)??;
        created?;
        assert!(rounds > 0);
        Ok(())
    })?;

    assert_eq!(bridge.handles().live(), 0);
    Ok(())
}
