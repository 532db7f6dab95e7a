//! Engine command - report recognition engine discovery.

use console::style;

use pagescan_core::{locate_tesseract, tesseract_version};

use super::load_config;

/// Language choices offered by `extract --lang`.
const COMMON_LANGUAGES: &[&str] = &["rus+eng", "rus", "eng", "fra", "deu", "spa"];

pub async fn run(config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let Some(binary) = locate_tesseract(config.engine.binary_path.as_deref()) else {
        println!("Engine: {}", style("not found").red());
        println!();
        println!("Install tesseract or set engine.binary_path:");
        println!("  pagescan config set engine.binary_path /path/to/tesseract");
        anyhow::bail!("Tesseract engine not found");
    };

    println!("Engine: {}", style("found").green());
    println!("Binary: {}", binary.display());

    match tesseract_version(&binary) {
        Ok(version) => println!("Version: {}", version),
        Err(e) => println!("Version: {} ({})", style("unknown").yellow(), e),
    }

    match &config.engine.tessdata_path {
        Some(path) => println!("Tessdata: {}", path.display()),
        None => println!("Tessdata: {}", style("engine default").dim()),
    }

    println!();
    println!("Default languages: {}", config.extraction.languages);
    println!("Common choices: {}", COMMON_LANGUAGES.join(", "));

    Ok(())
}
