//! `dialform fill` — Interactive form-filling session.

use std::io::Write as _;

use dialform_config::AppConfig;
use dialform_engine::{DialogEngine, EngineReply};
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(form: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early — give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    DIALFORM_API_KEY   (generic)");
        eprintln!("    OPENAI_API_KEY     (for OpenAI)");
        eprintln!("    DEEPSEEK_API_KEY   (for DeepSeek)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let llm = dialform_providers::build_from_config(&config)
        .map_err(|e| format!("Failed to build LLM provider: {e}"))?;

    let templates = dialform_forms::list_form_templates(&config.forms_dir);
    if templates.is_empty() {
        return Err(format!(
            "No form templates found in {}. Put JSON templates there first.",
            config.forms_dir.display()
        )
        .into());
    }

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    // Resolve the form id: --form when valid, interactive listing otherwise.
    let form_id = match form {
        Some(id) if templates.contains_key(&id) => id,
        requested => {
            if let Some(id) = &requested {
                eprintln!("  Form '{id}' not found.");
            }
            println!("  Available forms:");
            for id in templates.keys() {
                println!("  - {id}");
            }
            print!("  Enter a form id: ");
            std::io::stdout().flush()?;
            let Some(line) = lines.next_line().await? else {
                return Err("No form selected.".into());
            };
            let id = line.trim().to_string();
            if !templates.contains_key(&id) {
                return Err(format!("Form '{id}' not found.").into());
            }
            id
        }
    };

    let schema = dialform_forms::load_form_template(&templates[&form_id])
        .map_err(|e| format!("Failed to load form '{form_id}': {e}"))?;
    tracing::debug!(form = %form_id, fields = schema.fields.len(), "Loaded form template");

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        dialform — Interactive Session        ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.provider);
    println!("  Model:     {}", config.model);
    println!("  Form:      {} — {}", schema.id, schema.title);
    println!("  Fields:    {}", schema.fields.len());
    println!();
    println!("  Answer in free text. Type 'выход' or 'exit' to quit without saving.");
    println!();

    let mut engine = DialogEngine::new(schema, llm, &config.model)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens);

    let mut reply = engine.opening();
    loop {
        match &reply {
            EngineReply::Ask(question) => {
                println!();
                for line in question.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
            EngineReply::Retry { question, error } => {
                eprintln!("  [Error] {error}");
                println!();
                for line in question.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
            EngineReply::Confirm(text) => {
                println!();
                for line in text.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
            EngineReply::Completed => {
                let answers =
                    dialform_store::save_answers(&config.answers_dir, &form_id, engine.state())?;
                let transcript = dialform_store::save_transcript(
                    &config.logs_dir,
                    &form_id,
                    engine.conversation(),
                )?;
                println!();
                println!("  Saved answers to {}", answers.display());
                println!("  Saved transcript to {}", transcript.display());
                println!();
                break;
            }
            EngineReply::Aborted => {
                println!();
                println!("  Session ended. Nothing was saved.");
                println!();
                break;
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            // EOF (Ctrl+D) ends the session without saving.
            println!();
            println!("  Session ended. Nothing was saved.");
            println!();
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        reply = engine.handle_input(&line).await?;
    }

    Ok(())
}
