//! Debug script to run the extraction engine on a page
//!
//! Run with: cargo run --example debug_extract -p reelscout-core -- <url> [enhanced|playwright|basic]
//! or, offline: cargo run --example debug_extract -p reelscout-core -- <base-url> --file page.html

use reelscout_core::{ExtractOptions, ExtractionMethod, MovieScraper, RuleSet, extract_candidates};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(url) = args.first() else {
        eprintln!("usage: debug_extract <url> [method] | <base-url> --file <page.html>");
        return Ok(());
    };

    let links = if args.get(1).map(String::as_str) == Some("--file") {
        let path = args.get(2).ok_or("missing file path")?;
        let html = std::fs::read_to_string(path)?;
        println!("Extracting from {} ({} bytes) with base {}\n", path, html.len(), url);
        extract_candidates(&html, url, &RuleSet::download(), &ExtractOptions::default())
    } else {
        let method = args
            .get(1)
            .map(|m| m.parse::<ExtractionMethod>())
            .transpose()?
            .unwrap_or_default();
        println!("Fetching {} with method {}...\n", url, method);
        MovieScraper::new()?.extract_links(url, method).await?
    };

    if links.is_empty() {
        println!("No links found!");
        return Ok(());
    }

    println!("Found {} links:\n", links.len());
    for (i, link) in links.iter().enumerate() {
        println!("{}. [{}] {}", i + 1, link.priority, link.url);
        println!("   Service: {} ({:?})", link.service, link.link_type);
        println!("   Quality: {}  Size: {}  Language: {}", link.quality, link.size, link.language);
    }

    Ok(())
}
