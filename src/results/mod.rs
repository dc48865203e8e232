// Result materialization: result sets over a transport handle, typed rows,
// and the eager/lazy row construction modes.

mod factory;
mod result_set;
mod row;

pub use factory::RowMode;
pub use result_set::ResultSet;
pub use row::{ColumnMeta, Row};
