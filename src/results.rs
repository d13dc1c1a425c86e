mod row;
mod row_set;

pub use row::ErpRow;
pub use row_set::RowSet;
