use breathwork_core::VibrationPattern;
use serde::Serialize;

#[derive(Serialize)]
struct PatternInfo {
    key: &'static str,
    name: &'static str,
    counted: bool,
}

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let patterns: Vec<PatternInfo> = VibrationPattern::ALL
        .iter()
        .map(|p| PatternInfo {
            key: p.key(),
            name: p.display_name(),
            counted: p.is_counted(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&patterns)?);
        return Ok(());
    }
    for p in &patterns {
        let note = if p.counted { "  (counted buzzes)" } else { "" };
        println!("{:<10} {}{note}", p.key, p.name);
    }
    Ok(())
}
