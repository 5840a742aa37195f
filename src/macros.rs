#![allow(unused_macros)]

/// Helper macro for reading locked items
///
/// A poisoned lock is recovered, the protected values are only ever replaced as a whole.
///
/// ```rust, ignore
///  let data = read_lock!(self.state);
///  println!("{:?}", *data);
/// ```
macro_rules! read_lock {
    ($rwlock:expr) => {
        $rwlock
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for writing to locked items
///
/// ```rust, ignore
///  let mut data = write_lock!(self.state);
///  *data = 42;
/// ```
macro_rules! write_lock {
    ($rwlock:expr) => {
        $rwlock
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for turning a weak image handle into a strong one inside a deferred thunk
///
/// ```rust, ignore
///  let image = upgrade_image!(weak_image);
/// ```
macro_rules! upgrade_image {
    ($weak:expr) => {
        $weak.upgrade().ok_or(crate::Error::ImageDropped)?
    };
}
