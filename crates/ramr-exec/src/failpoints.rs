//! Injectable failures (feature: `failpoints`).
//!
//! `fail_point!(name, err)` returns `Err(err)` from the enclosing function
//! while `name` is armed. Without the feature the macro expands to nothing
//! and `err` is never evaluated.

#[cfg(feature = "failpoints")]
mod armed {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    static ARMED: Mutex<BTreeMap<String, usize>> = Mutex::new(BTreeMap::new());

    /// Make the next `times` hits of `name` fail.
    pub fn arm(name: &str, times: usize) {
        if let Ok(mut points) = ARMED.lock() {
            points.insert(name.to_string(), times);
        }
    }

    pub fn disarm(name: &str) {
        if let Ok(mut points) = ARMED.lock() {
            points.remove(name);
        }
    }

    /// Consume one armed failure of `name`, if any is left.
    pub fn hit(name: &str) -> bool {
        let Ok(mut points) = ARMED.lock() else {
            return false;
        };
        match points.get_mut(name) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }
}

#[cfg(feature = "failpoints")]
pub use armed::{arm, disarm, hit};

#[cfg(feature = "failpoints")]
#[macro_export]
macro_rules! fail_point {
    ($name:expr, $err:expr) => {{
        if $crate::failpoints::hit(&$name) {
            return Err($err);
        }
    }};
}

#[cfg(not(feature = "failpoints"))]
#[macro_export]
macro_rules! fail_point {
    ($name:expr, $err:expr) => {
        // no-op
        let _ = &$name;
    };
}
