//! Inspect command implementation
//!
//! Decodes a single CBF file and prints its header fields and pixel
//! statistics without touching any store.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use cbfvec_format::{decode_image, DecodedImage, PixelStats};
use colored::Colorize;
use serde_json::json;

/// Run the inspect command
pub fn run(input: &Path, json_output: bool) -> Result<ExitCode> {
    let raw = std::fs::read(input)
        .with_context(|| format!("Failed to read file: {}", input.display()))?;
    let image =
        decode_image(&raw).with_context(|| format!("Failed to decode: {}", input.display()))?;
    let stats = image.stats();
    let hash = blake3::hash(&raw).to_hex().to_string();

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&inspect_json(input, &image, &stats, &hash))?
        );
    } else {
        print_human(input, &image, &stats, &hash);
    }
    Ok(ExitCode::SUCCESS)
}

fn inspect_json(
    input: &Path,
    image: &DecodedImage,
    stats: &PixelStats,
    hash: &str,
) -> serde_json::Value {
    let header = &image.header;
    json!({
        "path": input.to_string_lossy(),
        "width": image.width,
        "height": image.height,
        "elements": header.element_count,
        "binary_size": header.binary_size,
        "conversions": header.conversions,
        "content_type": header.content_type,
        "element_type": header.element_type,
        "byte_order": header.byte_order,
        "content_md5": header.content_md5,
        "content_hash": hash,
        "stats": {
            "min": stats.min,
            "max": stats.max,
            "mean": stats.mean,
            "masked": stats.masked,
        }
    })
}

fn print_human(input: &Path, image: &DecodedImage, stats: &PixelStats, hash: &str) {
    let header = &image.header;
    println!("{} {}", "File:".cyan().bold(), input.display());
    println!(
        "  {} {} x {} ({} elements)",
        "Size:".dimmed(),
        image.width,
        image.height,
        header.element_count
    );
    println!("  {} {} bytes", "Payload:".dimmed(), header.binary_size);
    if let Some(conv) = &header.conversions {
        println!("  {} {}", "Conversion:".dimmed(), conv);
    }
    if let Some(ty) = &header.element_type {
        println!("  {} {}", "Element type:".dimmed(), ty);
    }
    println!("  {} {}", "BLAKE3:".dimmed(), hash);

    println!("{}", "Intensities:".cyan().bold());
    if stats.masked < image.pixels.len() {
        println!("  {} {}", "Min:".dimmed(), stats.min);
        println!("  {} {}", "Max:".dimmed(), stats.max);
        println!("  {} {:.3}", "Mean:".dimmed(), stats.mean);
    } else {
        println!("  {}", "no valid pixels".yellow());
    }
    if stats.masked > 0 {
        println!(
            "  {} {}",
            "Masked:".dimmed(),
            stats.masked.to_string().yellow()
        );
    }
}
