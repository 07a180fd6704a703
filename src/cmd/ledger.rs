//! Non-interactive ledger commands: documents, progress, submit, export.

use anyhow::{Context, Result, bail};
use console::style;
use std::io::Write;
use std::path::Path;

use delphi::navigator::{NavigationInput, ReviewedSnapshot};
use delphi::{DocumentId, Expert};

use super::Workspace;
use super::super::Cli;

fn identify(ws: &Workspace, cli: &Cli) -> Result<Expert> {
    ws.resolver
        .resolve(cli.token.as_deref())
        .context("Could not identify expert")
}

fn report_unknown(snapshot: &ReviewedSnapshot) {
    if let ReviewedSnapshot::Unknown(reason) = snapshot {
        eprintln!(
            "{} reviewed status unknown: {}",
            style("warning:").yellow().bold(),
            reason
        );
    }
}

pub async fn cmd_documents(cli: &Cli, project_dir: &Path) -> Result<()> {
    let ws = Workspace::open(project_dir)?;
    let expert = identify(&ws, cli)?;
    let mut session = ws.service.start(expert).await;

    let options = ws.service.options(&mut session).await;
    let heading = format!("Documents for {}", session.expert().map(|e| e.name()).unwrap_or("?"));
    println!("{}", style(heading).bold());
    println!();
    if options.is_empty() {
        println!("  (corpus is empty)");
    }
    for option in &options {
        println!("  {}", option.label);
    }
    println!();
    println!("Reviewed: {}", ws.service.progress(&session));
    report_unknown(session.reviewed());

    Ok(())
}

pub async fn cmd_progress(cli: &Cli, project_dir: &Path) -> Result<()> {
    let ws = Workspace::open(project_dir)?;
    let expert = identify(&ws, cli)?;
    let session = ws.service.start(expert).await;

    let progress = ws.service.progress(&session);
    println!("{}", progress);
    report_unknown(session.reviewed());
    if progress.is_complete() {
        println!("{}", style("All documents reviewed.").green());
    }

    Ok(())
}

pub async fn cmd_submit(
    cli: &Cli,
    project_dir: &Path,
    doc: &str,
    scores: &[f64],
    human: f64,
    fields: &[(String, String)],
) -> Result<()> {
    let ws = Workspace::open(project_dir)?;
    let expert = identify(&ws, cli)?;
    let mut session = ws.service.start(expert).await;

    ws.service
        .navigate(&mut session, &NavigationInput::SelectId(DocumentId::new(doc)))?;

    let known_fields = &ws.config.toml.scoring.qualitative_fields;
    for (name, _) in fields {
        if !known_fields.contains(name) {
            tracing::warn!(field = %name, "Qualitative field is not listed in scoring.qualitative_fields");
        }
    }

    ws.service.edit_draft(&mut session, |form| {
        form.quantitative_scores = scores.to_vec();
        form.human_comparison_score = human;
        for (name, text) in fields {
            form.qualitative_fields.insert(name.clone(), text.clone());
        }
    });

    match ws.service.submit(&mut session).await {
        Ok(record) => {
            println!(
                "{} Recorded review of {} by {} (record {})",
                style("✓").green(),
                record.document_id,
                record.expert_name,
                record.record_id
            );
            println!("Reviewed: {}", ws.service.progress(&session));
            Ok(())
        }
        Err(e) => bail!("Submission rejected [{}]: {}", e.rule(), e),
    }
}

pub async fn cmd_export(
    cli: &Cli,
    project_dir: &Path,
    output: Option<&Path>,
    latest: bool,
) -> Result<()> {
    use delphi::config::DelphiConfig;
    use delphi::store::{latest_per_pair, open_store};

    if !delphi::init::is_initialized(project_dir) {
        bail!(
            "No review project at {}. Run `delphi init` first.",
            project_dir.display()
        );
    }
    let config = DelphiConfig::new(project_dir.to_path_buf())?;
    let store = open_store(&config);

    let mut records = store
        .records(None)
        .await
        .context("Failed to read submission ledger")?;
    if latest {
        records = latest_per_pair(records);
    }

    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(std::io::BufWriter::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };
    for record in &records {
        let line = serde_json::to_string(record).context("Failed to serialize record")?;
        writeln!(out, "{}", line)?;
    }
    out.flush()?;

    if let Some(path) = output {
        eprintln!("Exported {} records to {}", records.len(), path.display());
    }
    Ok(())
}
