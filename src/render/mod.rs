//! Pure presentation helpers: cell and number formatting, and turning raw
//! query output into a rectangular table.

pub mod format;
pub mod table;

pub use format::{
    MISSING, coerce_date, format_currency, format_date_label, format_decimal, format_integer,
    format_relative_time, format_scan_volume, format_value,
};
pub use table::{NO_COLUMNS_MESSAGE, NO_ROWS_MESSAGE, ResultTable, normalize};
