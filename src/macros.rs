#![allow(unused_macros)]

/// Helper macro for locking items, propagating poisoning as [`crate::Error::LockError`]
///
/// ```rust, ignore
///  let mut data = lock!(my_mutex);
///  data.some_field = 42;
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().map_err(|_| crate::Error::LockError)?
    };
}

/// Helper macro for reading locked items
///
/// ```rust, ignore
///  let data = read_lock!(my_rwlock);
///  println!("{}", data.some_field);
/// ```
macro_rules! read_lock {
    ($rwlock:expr) => {
        $rwlock.read().map_err(|_| crate::Error::LockError)?
    };
}

/// Helper macro for writing to locked items
///
/// ```rust, ignore
///  let mut data = write_lock!(my_rwlock);
///  data.some_field = 42;
/// ```
macro_rules! write_lock {
    ($rwlock:expr) => {
        $rwlock.write().map_err(|_| crate::Error::LockError)?
    };
}

/// Helper macro for raising a managed exception from a member body
///
/// ```rust, ignore
///  throw!("System.ArgumentNullException", "value was null")
/// ```
macro_rules! throw {
    ($type_name:expr, $msg:expr) => {
        return Err(crate::runtime::ManagedException::new($type_name, $msg).into())
    };

    ($type_name:expr, $fmt:expr, $($arg:tt)*) => {
        return Err(
            crate::runtime::ManagedException::new($type_name, format!($fmt, $($arg)*)).into(),
        )
    };
}
