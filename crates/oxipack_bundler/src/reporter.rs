use std::{
    env,
    io::{self, Write},
    path::Path,
};

use colored::Colorize;
use log::debug;

use crate::graph::Graph;

/// Show `path` relative to the working directory when it lives under it.
fn display_path(path: &Path) -> String {
    match env::current_dir() {
        Ok(cwd) => path.strip_prefix(&cwd).unwrap_or(path).display().to_string(),
        Err(_) => {
            debug!("Failed to get current directory");
            path.display().to_string()
        }
    }
}

pub fn print_summary<W: Write>(writer: &mut W, graph: &Graph, elapsed_ms: u128) -> io::Result<()> {
    let placeholders: Vec<_> = graph.placeholders().collect();

    if placeholders.is_empty() {
        writeln!(
            writer,
            "{} Bundled {} modules from {}",
            "✓".green().bold(),
            graph.len().to_string().cyan(),
            display_path(&graph.entry().resolved_path).blue()
        )?;
    } else {
        writeln!(
            writer,
            "{} Bundled {} modules from {} ({} could not be loaded)\n",
            "⚠".yellow().bold(),
            graph.len().to_string().cyan(),
            display_path(&graph.entry().resolved_path).blue(),
            placeholders.len().to_string().yellow()
        )?;

        for (idx, asset) in placeholders.iter().enumerate() {
            let is_last = idx == placeholders.len() - 1;
            let prefix = if is_last { "└──" } else { "├──" };
            let reason = asset.failure.as_deref().unwrap_or_default();
            writeln!(
                writer,
                "{}  {} {}",
                prefix.dimmed(),
                display_path(&asset.resolved_path).red(),
                reason.dimmed()
            )?;
        }
        writeln!(writer)?;
    }

    writeln!(writer, "{} Finished in {}ms.", "●".bright_blue(), elapsed_ms.to_string().cyan())?;
    writer.flush()?;
    Ok(())
}
