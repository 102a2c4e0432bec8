//! Dataset materialization for solar segmentation sweeps: list file I/O,
//! fresh seeded splits of plain tile sets, and budgeted combo composition.

pub mod combo;
pub mod list;
pub mod split;

pub use combo::{compose_combo, compose_combo_pair, compose_combo_set, ComboSource, ComboSummary};
pub use list::{read_list_lines, read_sample_list, write_list, write_list_group, write_list_pair};
pub use split::{fresh_split, split_count, SplitFractions, SplitSummary};
