//! # CLI Command Implementations

use crate::api;
use crate::config::AppConfig;
use crate::service::Service;
use semnet_core::SemnetError;
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_serve(
    config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), SemnetError> {
    let service = Service::from_config(&config)?;
    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);

    println!("semnet server starting...");
    println!();
    println!("Configuration:");
    println!("  Host:      {}", host);
    println!("  Port:      {}", port);
    match &config.knowledge.source {
        Some(source) => println!("  Knowledge: {}", source.display()),
        None => println!("  Knowledge: (empty)"),
    }
    println!("  Timeout:   {} ms", config.dispatcher.timeout_ms);
    println!(
        "  Router:    {}",
        if service.has_router() { "llm" } else { "none" }
    );
    println!();
    println!("Endpoints:");
    println!("  GET  /health  - Health check");
    println!("  GET  /status  - Knowledge base status");
    println!("  POST /resolve - Resolve an entity name");
    println!("  POST /invoke  - Run an operation on an entity");
    println!("  POST /stages  - Stages of a process scheme");
    println!("  POST /ask     - Answer a question");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, service).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

pub fn cmd_status(service: &Service, json_mode: bool) -> Result<(), SemnetError> {
    let status = service.status()?;

    if json_mode {
        print_json(&status);
        return Ok(());
    }

    println!("semnet Knowledge Base Status");
    println!("============================");
    println!("Elements:   {}", status.elements);
    println!("Edges:      {}", status.edges);
    println!("Timeout:    {} ms", status.timeout_ms);
    println!("Router:     {}", if status.router { "llm" } else { "none" });
    println!("Phrasing:   {}", if status.phraser { "llm" } else { "none" });
    println!("Operations:");
    for operation in &status.operations {
        println!("  {}", operation);
    }

    Ok(())
}

// =============================================================================
// LOOKUP COMMANDS
// =============================================================================

pub fn cmd_resolve(service: &Service, json_mode: bool, name: &str) -> Result<(), SemnetError> {
    let resolved = service.resolve(name)?;

    if json_mode {
        print_json(&resolved);
    } else {
        println!("{} -> {}", resolved.name, resolved.addr);
    }
    Ok(())
}

pub fn cmd_invoke(
    service: &Service,
    json_mode: bool,
    operation: &str,
    name: &str,
) -> Result<(), SemnetError> {
    let invocation = service.invoke(operation, name)?;

    if json_mode {
        print_json(&invocation);
        return Ok(());
    }

    println!("{} on {} ({}):", invocation.operation, name, invocation.entity);
    for item in &invocation.items {
        match &item.text {
            Some(text) => println!("  {} {}", item.addr, text),
            None => println!("  {}", item.addr),
        }
    }
    Ok(())
}

pub fn cmd_stages(service: &Service, json_mode: bool, name: &str) -> Result<(), SemnetError> {
    let stages = service.stages(name)?;

    if json_mode {
        print_json(&serde_json::json!({ "scheme": name, "stages": stages }));
    } else {
        println!("{}", stages);
    }
    Ok(())
}

// =============================================================================
// ASK COMMAND
// =============================================================================

pub fn cmd_ask(service: &Service, json_mode: bool, question: &str) -> Result<(), SemnetError> {
    let reply = service.ask(question)?;

    if json_mode {
        print_json(&reply);
        return Ok(());
    }

    if let Some(text) = &reply.text {
        println!("{}", text);
        return Ok(());
    }

    let answer = &reply.answer;
    println!("Intent: {}", answer.intent.decision());
    if answer.entity.is_some() {
        println!("Entity: {}", answer.entity_name);
    }
    if answer.items.is_empty() {
        println!("(no items)");
    }
    for item in &answer.items {
        println!("{}", item);
    }
    Ok(())
}
