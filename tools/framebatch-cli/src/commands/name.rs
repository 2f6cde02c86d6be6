//! Resolve an output file name.

use framebatch_model::frame::Chunk;
use framebatch_model::naming::{final_filename, resolve_name, NameScope};

pub fn run(
    source: &str,
    base: &str,
    range: Option<(i64, i64)>,
    chunk: bool,
    append_range: bool,
) -> anyhow::Result<()> {
    let name = match range {
        Some((start, end)) => {
            if start > end {
                anyhow::bail!("Invalid frame range: start ({start}) > end ({end})");
            }
            let scope = if chunk {
                NameScope::Chunk(Chunk::new(start, end))
            } else {
                NameScope::Single { start, end }
            };
            resolve_name(base, source, scope, append_range)
        }
        None => final_filename(base, source),
    };

    println!("{name}");
    Ok(())
}
