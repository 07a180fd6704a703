//! Interactive review loop for `delphi review`.
//!
//! Pick a document, read its evidence, enter scores, submit. Leaving the
//! score form for another document abandons the unsaved entry.

use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::{Input, Select, theme::ColorfulTheme};
use std::path::Path;

use delphi::config::{DuplicatePolicy, IdentityMode};
use delphi::navigator::NavigationInput;
use delphi::session::ReviewSession;
use delphi::{Document, Expert, ScoreForm};

use super::Workspace;
use super::super::Cli;

enum FormAction {
    Submit,
    Edit,
    Leave,
}

fn pick_expert(ws: &Workspace, cli: &Cli) -> Result<Expert> {
    if cli.token.is_none() && ws.resolver.mode() == IdentityMode::Debug {
        let names = ws.resolver.roster().names();
        if names.is_empty() {
            bail!("Roster is empty; add experts to {}", ws.config.roster_file().display());
        }
        let choice = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Review as")
            .items(&names)
            .default(0)
            .interact()?;
        return Ok(ws.resolver.resolve(Some(names[choice]))?);
    }

    ws.resolver
        .resolve(cli.token.as_deref())
        .context("Could not identify expert")
}

fn show_document(doc: &Document) {
    println!();
    println!("{}", style(format!("{} | {}", doc.id, doc.title)).bold().underlined());
    for (heading, body) in [
        ("Evidence", &doc.evidence),
        ("AI report", &doc.ai_report),
        ("Author conclusion", &doc.author_conclusion),
    ] {
        println!();
        println!("{}", style(heading).cyan().bold());
        if body.trim().is_empty() {
            println!("{}", style("(empty)").dim());
        } else {
            println!("{}", body);
        }
    }
    println!();
}

fn read_score(label: &str, current: f64, min: f64, max: f64) -> Result<f64> {
    let value = Input::<f64>::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("{} [{}-{}]", label, min, max))
        .default(current)
        .interact_text()
        .context("Failed to read score")?;
    Ok(value)
}

/// Prompt for every field of the draft, pre-filled with its current values.
fn fill_form(ws: &Workspace, session: &mut ReviewSession) -> Result<()> {
    let rules = ws.service.rules();
    let dimensions = rules.dimensions.len();
    let current = session
        .navigator()
        .draft()
        .map(|d| d.form.clone())
        .unwrap_or_else(|| ScoreForm::blank(dimensions));

    let mut scores = Vec::with_capacity(dimensions);
    for (i, label) in rules.dimensions.iter().enumerate() {
        let default = current.quantitative_scores.get(i).copied().unwrap_or(0.0);
        scores.push(read_score(label, default, rules.min_score, rules.max_score)?);
    }
    let human = read_score(
        "Comparison with a human expert report",
        current.human_comparison_score,
        rules.min_score,
        rules.max_score,
    )?;

    let mut fields = current.qualitative_fields.clone();
    for name in &ws.config.toml.scoring.qualitative_fields {
        let text: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(name)
            .with_initial_text(fields.get(name).cloned().unwrap_or_default())
            .allow_empty(true)
            .interact_text()
            .context("Failed to read text field")?;
        fields.insert(name.clone(), text);
    }

    ws.service.edit_draft(session, |form| {
        form.quantitative_scores = scores;
        form.human_comparison_score = human;
        form.qualitative_fields = fields;
    });
    Ok(())
}

fn choose_action() -> Result<FormAction> {
    let options = ["Submit", "Edit scores again", "Back to document list (discard)"];
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Next")
        .items(options)
        .default(0)
        .interact()?;
    Ok(match choice {
        0 => FormAction::Submit,
        1 => FormAction::Edit,
        _ => FormAction::Leave,
    })
}

async fn review_current(ws: &Workspace, session: &mut ReviewSession) -> Result<()> {
    loop {
        fill_form(ws, session)?;
        match choose_action()? {
            FormAction::Submit => match ws.service.submit(session).await {
                Ok(record) => {
                    println!(
                        "{} Saved review of {} ({})",
                        style("✓").green().bold(),
                        record.document_id,
                        ws.service.progress(session)
                    );
                    return Ok(());
                }
                Err(e) => {
                    println!(
                        "{} {} [{}]",
                        style("✗").red().bold(),
                        e,
                        style(e.rule()).dim()
                    );
                    if let delphi::errors::ValidationError::DuplicateSubmission { .. } = e {
                        return Ok(());
                    }
                }
            },
            FormAction::Edit => {}
            FormAction::Leave => return Ok(()),
        }
    }
}

pub async fn cmd_review(cli: &Cli, project_dir: &Path) -> Result<()> {
    let ws = Workspace::open(project_dir)?;
    let expert = pick_expert(&ws, cli)?;
    let mut session = ws.service.start(expert).await;

    if ws.service.catalog().is_empty() {
        println!("The corpus is empty; there is nothing to review.");
        return Ok(());
    }

    println!();
    println!(
        "Reviewing as {}",
        style(session.expert().map(|e| e.name()).unwrap_or("?")).bold()
    );

    loop {
        let options = ws.service.options(&mut session).await;
        println!();
        println!("Progress: {}", style(ws.service.progress(&session)).cyan());
        if let delphi::navigator::ReviewedSnapshot::Unknown(reason) = session.reviewed() {
            println!("{} {}", style("Reviewed status unknown:").yellow(), reason);
        }

        let mut items: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
        items.push("Quit");
        let choice = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Choose a document")
            .items(&items)
            .default(session.navigator().current_index().unwrap_or(0))
            .interact()?;

        let Some(option) = options.get(choice) else {
            break;
        };
        if let Err(e) = ws
            .service
            .navigate(&mut session, &NavigationInput::SelectId(option.id.clone()))
        {
            println!("{} {}", style("✗").red().bold(), e);
            continue;
        }

        let Some(doc) = ws.service.current_document(&session) else {
            continue;
        };
        show_document(doc);

        if option.reviewed == Some(true) && ws.service.rules().duplicate_policy == DuplicatePolicy::Block {
            println!("{}", style("You have already reviewed this document.").green());
            continue;
        }

        review_current(&ws, &mut session).await?;
    }

    println!("Reviewed {} documents.", ws.service.progress(&session));
    Ok(())
}
