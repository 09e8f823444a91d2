//! Buffered result sets and the cursor that replays them.

mod cursor;
mod result_set;
mod row;

pub use cursor::ResultSetCursor;
pub use result_set::ResultSet;
pub use row::CustomDbRow;
