pub use crate::error::Error;

pub use anstream::eprintln;
pub use anstream::println;
pub use color_eyre::eyre::{eyre, Context, Result};
pub use std::format as f;

use colored::Colorize;

pub fn new_table() -> prettytable::Table {
    let mut table = prettytable::Table::new();

    let format = prettytable::format::FormatBuilder::new()
        .padding(1, 1)
        .build();

    table.set_format(format);

    table
}

/// A [`new_table`] whose first row holds `titles`
pub fn titled_table(titles: &[&str]) -> prettytable::Table {
    let mut table = new_table();
    table.set_titles(prettytable::Row::new(
        titles
            .iter()
            .map(|t| prettytable::Cell::new(&t.bold().cyan().to_string()))
            .collect(),
    ));
    table
}
