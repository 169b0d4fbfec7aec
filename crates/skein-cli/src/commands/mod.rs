//! CLI subcommands.

pub mod play;
pub mod run;

use comfy_table::{ContentArrangement, Table};

use skein_engine::{Presenter, StoryEngine};

/// Print the current quality table.
pub(crate) fn print_qualities<P: Presenter>(engine: &StoryEngine<P>) {
    let state = engine.state();
    if state.qualities.is_empty() {
        println!("  (no qualities set)");
        return;
    }
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(["quality", "value"]);
    for (id, value) in state.qualities.iter() {
        table.add_row([id.clone(), value.to_text()]);
    }
    println!("{table}");
}
