//! Generate command handler

use std::sync::Arc;

use anyhow::{Context, Result};

use aetherlore_core::{generate, provider_for, GenerationProvider, ReqwestTransport, Session, Store};

use super::parse_entry_id;
use crate::output::{print_json, Output, OutputFormat};

/// Generate text for an entry and append it to the body
///
/// With `fresh` the existing body is ignored and replaced.
pub async fn run(
    store: &mut Store,
    id: String,
    prompt: String,
    fresh: bool,
    output: &Output,
) -> Result<()> {
    let id = parse_entry_id(&id, store)?;
    if prompt.trim().is_empty() {
        anyhow::bail!("Prompt cannot be empty");
    }

    let mut session = Session::from_config(store.config());
    session.select(store, &id)?;

    let mut ticket = session.begin_generation(store, &prompt)?;
    if fresh {
        ticket = ticket.without_context();
    }

    let settings = store.settings().ai.clone();
    let provider = provider_for(&settings, store.config(), Arc::new(ReqwestTransport::new()));
    if output.should_prompt() {
        eprintln!("Generating with {}...", provider.backend());
    }

    let result = generate(provider.as_ref(), &settings, &ticket.prompt, &ticket.context).await;
    let content = session
        .finish_generation(store, ticket, result)
        .context("Generation failed")?;

    match (content, output.format) {
        (None, _) => output.warn("Entry was deleted before the result arrived."),
        (Some(content), OutputFormat::Json) => print_json(&serde_json::json!({
            "id": id,
            "content": content,
        })),
        (Some(content), OutputFormat::Human) => {
            println!("{}", content);
            println!();
            output.success("Entry updated");
        }
        (Some(_), OutputFormat::Quiet) => {}
    }
    Ok(())
}
