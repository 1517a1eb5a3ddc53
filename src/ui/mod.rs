pub mod icons;
pub mod output;
pub mod table;

pub use icons::Icons;
pub use output::{header, info, palette, section, status, success, summary_row, warn, Palette};
pub use table::{TableBuilder, stats_table, token_table};
