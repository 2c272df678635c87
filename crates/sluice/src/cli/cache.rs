use anyhow::{Context as _, Result};
use clap::Args;
use sluice_cache::DiskCache;
use tabled::Tabled;

use super::Context;
use crate::ui::table::{FormatConfig, Formatter, format_bytes};

#[derive(Args, Clone, Debug)]
pub struct RemoveArg {
    /// Disk cache key of the entry (usually the URL it was downloaded from)
    pub key: String,
}

#[derive(Tabled)]
struct Row {
    property: &'static str,
    value: String,
}

pub fn info(ctx: &Context) -> Result<()> {
    let cache = ctx.open_cache()?;
    let rows = [
        Row {
            property: "directory",
            value: cache.dir().display().to_string(),
        },
        Row {
            property: "entries",
            value: cache.entry_count().to_string(),
        },
        Row {
            property: "size",
            value: format_bytes(cache.size()),
        },
        Row {
            property: "max size",
            value: format_bytes(cache.max_size()),
        },
    ];

    let config = FormatConfig {
        header: Some("Disk cache".to_owned()),
        footer: None,
        col_name: true,
    };
    let table = Formatter::default(rows, config);
    println!("{table}");
    Ok(())
}

pub fn remove(arg: RemoveArg, ctx: &Context) -> Result<()> {
    let cache = ctx.open_cache()?;
    let removed = cache
        .remove(&arg.key)
        .with_context(|| format!("Failed to remove {}", arg.key))?;
    if removed {
        println!("removed {}", arg.key);
    } else {
        println!("no entry for {}", arg.key);
    }
    Ok(())
}

pub fn clear(ctx: &Context) -> Result<()> {
    let cache = ctx.open_cache()?;
    let size = cache.size();
    cache.clear().context("Failed to clear disk cache")?;
    println!("cleared {}", format_bytes(size));
    Ok(())
}
