//! End-to-end walk-through of the syntax engine's conversions.
use anyhow::Result;
use gs1_syntax_rs::{Gs1Encoder, Symbology, Validation};

fn main() -> Result<()> {
    simple_logger::init_with_level(log::Level::Debug)?;

    let mut encoder = Gs1Encoder::new();

    // Bracketed AI syntax in, canonical element string out.
    let ai_data = "(01)12312312312333(10)ABC123(99)TEST";
    encoder.set_ai_data_str(ai_data)?;
    println!("AI IN:  {ai_data}");
    println!("DATA:   {}", encoder.data_str());

    encoder.set_include_data_titles_in_hri(true);
    println!("HRI:");
    for line in encoder.hri() {
        println!("    {line}");
    }

    println!("DL URI: {}", encoder.dl_uri(None)?);

    encoder.set_sym(Symbology::Dm);
    let scan = encoder.scan_data()?;
    println!("SCAN:   {}", scan.escape_default());

    // And back again through the decoder.
    encoder.set_scan_data(&scan)?;
    println!("SYM:    {:?}", encoder.sym());
    println!("AI OUT: {}", encoder.ai_data_str().unwrap_or_default());

    println!(
        "RequisiteAis validation enabled: {}",
        encoder.validation_enabled(Validation::RequisiteAis)
    );

    Ok(())
}
