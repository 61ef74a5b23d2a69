//! Simulated table view driven by a data source
//!
//! Plays the role of a list UI: mutations are queued from "button presses",
//! and the resulting index batches are applied to a row model on the task
//! that drives the `ContextRunner`, bracketed by begin/end updates.
//!
//! Run with: cargo run --example table_demo

use ordered_source::{
    channel_context, Changes, Comparator, DataSource, Item, SourceConfig, SourceItem,
};
use parking_lot::Mutex;
use std::sync::Arc;

type Row = Item<String>;

/// Stand-in for a table view: a list of rendered row titles.
#[derive(Default)]
struct TableView {
    rows: Vec<String>,
    batches: usize,
}

impl TableView {
    fn begin_updates(&mut self) {
        tracing::info!(rows = self.rows.len(), "begin updates");
    }

    fn apply(&mut self, changes: &Changes<Row>) {
        for &index in changes.removals().iter().rev() {
            if index < self.rows.len() {
                self.rows.remove(index);
            }
        }
        for &index in changes.insertions() {
            if let Some(item) = changes.sequence.get(index) {
                self.rows.insert(index.min(self.rows.len()), item.value.clone());
            }
        }
        for &index in changes.reloads() {
            if let (Some(slot), Some(item)) = (self.rows.get_mut(index), changes.sequence.get(index)) {
                *slot = item.value.clone();
            }
        }
        tracing::info!(
            removed = ?changes.removals(),
            inserted = ?changes.insertions(),
            reloaded = ?changes.reloads(),
            "applied batch"
        );
    }

    fn end_updates(&mut self) {
        self.batches += 1;
        tracing::info!(rows = ?self.rows, "end updates");
    }
}

fn title(hint: f64) -> String {
    format!("Title: {hint:.4}")
}

fn new_row(hint: f64) -> Row {
    Item::new(title(hint), format!("{hint:.4}")).with_sort_hint(hint)
}

/// Submit an add, bracketing the table update around it.
fn add_rows(source: &DataSource<Row>, table: &Arc<Mutex<TableView>>, rows: Vec<Row>) -> ordered_source::Result<()> {
    let (opening, closing) = (Arc::clone(table), Arc::clone(table));
    source.add(
        rows,
        move || opening.lock().begin_updates(),
        move |result| match result {
            Ok(changes) => {
                let mut table = closing.lock();
                table.apply(&changes);
                table.end_updates();
            }
            Err(err) => tracing::error!(error = %err, "add failed"),
        },
    )
}

fn remove_row(source: &DataSource<Row>, table: &Arc<Mutex<TableView>>, row: Row) -> ordered_source::Result<()> {
    let (opening, closing) = (Arc::clone(table), Arc::clone(table));
    source.remove(
        vec![row],
        move || opening.lock().begin_updates(),
        move |result| match result {
            Ok(changes) => {
                let mut table = closing.lock();
                table.apply(&changes);
                table.end_updates();
            }
            Err(err) => tracing::error!(error = %err, "remove failed"),
        },
    )
}

#[tokio::main]
async fn main() -> ordered_source::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("Ordered Source Table Demo");
    println!("=========================\n");

    let (context, mut runner) = channel_context();
    let source = DataSource::with_config(SourceConfig::default(), Comparator::by_sort_hint(), context)?;
    let table = Arc::new(Mutex::new(TableView::default()));

    // "Add row" pressed once, then "Add rows" (five at a time).
    add_rows(&source, &table, vec![new_row(0.4817)])?;
    add_rows(
        &source,
        &table,
        [0.9102, 0.0533, 0.6671, 0.2395, 0.7788].into_iter().map(new_row).collect(),
    )?;

    // Drain both units: each delivers a before and an after job.
    for _ in 0..4 {
        runner.run_next().await;
    }

    // "Refresh row": same uid and hint, new payload, so the row reloads in place.
    let target = source.item_at(2)?;
    let refreshed = target.refreshed(format!("{} (refreshed)", target.value));
    add_rows(&source, &table, vec![refreshed])?;

    // "Remove row".
    let doomed = source.item_at(0)?;
    tracing::info!(uid = doomed.uid(), "removing first row");
    remove_row(&source, &table, doomed)?;

    for _ in 0..4 {
        runner.run_next().await;
    }

    // "Toggle sort": descending order, delivered as a full reset.
    let resort_table = Arc::clone(&table);
    source.set_comparator(Comparator::by_sort_hint().reversed(), move |result| {
        if let Ok(changes) = result {
            let mut table = resort_table.lock();
            table.begin_updates();
            table.apply(&changes);
            table.end_updates();
        }
    })?;
    runner.run_next().await;

    let table = table.lock();
    let committed: Vec<String> = source.items().iter().map(|row| row.value.clone()).collect();
    println!("\nBatches applied: {}", table.batches);
    println!("Table rows match committed sequence: {}", table.rows == committed);
    println!("Committed keys: {source}");

    Ok(())
}
