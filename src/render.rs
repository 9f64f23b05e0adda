//! Block rendering: one [`ContentBlock`] to zero or more Markdown lines.
//!
//! Rendering is total. Block kinds without a Markdown mapping produce no lines
//! and never an error.

use tracing::debug;

use crate::contract::{ContentBlock, TextRun};
use crate::format::format_run;

/// Render one block into lines. An empty string is a blank line.
pub fn render_block(block: &ContentBlock) -> Vec<String> {
    match block {
        ContentBlock::Heading1(runs) => heading("#", runs),
        ContentBlock::Heading2(runs) => heading("##", runs),
        ContentBlock::Heading3(runs) => heading("###", runs),
        ContentBlock::Paragraph(runs) => {
            // every run keeps its trailing space, including the last one
            let line: String = runs
                .iter()
                .map(|run| format!("{} ", format_run(run)))
                .collect();
            vec![String::new(), line, String::new()]
        }
        ContentBlock::BulletItem(runs) => vec![format!(" - {}", first_run(runs))],
        ContentBlock::Unsupported(kind) => {
            debug!(kind = %kind, "Skipping unsupported block");
            Vec::new()
        }
    }
}

/// Render a whole block sequence in order.
pub fn render_blocks(blocks: &[ContentBlock]) -> Vec<String> {
    blocks.iter().flat_map(render_block).collect()
}

fn heading(marker: &str, runs: &[TextRun]) -> Vec<String> {
    vec![String::new(), format!("{marker} {}", first_run(runs))]
}

/// Headings and bullets honour only their first run.
fn first_run(runs: &[TextRun]) -> String {
    runs.first().map(format_run).unwrap_or_default()
}
