pub mod result;

pub mod prelude {
    pub use crate::{assert_err, assert_err_contains, assert_ok};
}
