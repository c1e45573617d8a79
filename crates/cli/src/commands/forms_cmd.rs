//! `dialform forms` — List available form templates.

use dialform_config::AppConfig;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let templates = dialform_forms::list_form_templates(&config.forms_dir);
    if templates.is_empty() {
        println!(
            "No form templates found in {}.",
            config.forms_dir.display()
        );
        return Ok(());
    }

    println!("Available forms ({}):", config.forms_dir.display());
    for (id, path) in &templates {
        match dialform_forms::load_form_template(path) {
            Ok(schema) if !schema.title.is_empty() => println!("  {id} — {}", schema.title),
            _ => println!("  {id}"),
        }
    }

    Ok(())
}
