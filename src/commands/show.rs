//! `rpc-vector show` command.

use std::path::Path;

use crate::vector::format::{Vector, VectorFile};
use crate::vector::store::VectorStore;

/// Execute the `show` command.
///
/// Without a title, lists the setup session and every recorded test with
/// its request count. With a title, prints that test's pairs as JSON.
///
/// # Errors
///
/// Returns an error string if the document cannot be loaded or the title
/// was never recorded.
pub fn run(dir: &Path, title: Option<&str>) -> Result<(), String> {
    let store = VectorStore::new(dir);
    let document = store.load().map_err(|e| e.to_string())?;

    if let Some(title) = title {
        let vector = document
            .it
            .get(title)
            .ok_or_else(|| format!("no recorded test titled {title:?} in {}", store.path().display()))?;
        let pretty = serde_json::to_string_pretty(vector).map_err(|e| e.to_string())?;
        println!("{pretty}");
        return Ok(());
    }

    println!("Vectors: {}", store.path().display());
    print_summary(&document);
    Ok(())
}

fn print_summary(document: &VectorFile) {
    if document.account.is_some() {
        println!("Account: captured");
    }
    match &document.before {
        Some(vector) => println!("before: {}", describe(vector)),
        None => println!("before: none"),
    }
    if document.it.is_empty() {
        println!("No tests recorded.");
        return;
    }
    println!("Tests:");
    for (title, vector) in &document.it {
        println!("  {title}: {}", describe(vector));
    }
}

fn describe(vector: &Vector) -> String {
    let methods: Vec<&str> = vector.pairs().iter().map(|p| p.request.method.as_str()).collect();
    let state = if vector.is_sealed() { "" } else { ", unfinished" };
    match methods.len() {
        0 => format!("no requests{state}"),
        1 => format!("1 request{state} ({})", methods[0]),
        n => format!("{n} requests{state} ({})", methods.join(", ")),
    }
}
