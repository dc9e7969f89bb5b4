//! cli::commands
//!
//! Command handlers. Each handler drives one router or reconciler operation
//! and renders the structured result; no backend logic lives here.

use anyhow::{bail, Result};

use crate::git::ApplyOutput;
use crate::search::SearchResult;
use crate::vcs::PrRole;

use super::args::{Command, RoleArg};
use super::Context;

pub async fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Search { search_host, query } => search(ctx, &search_host, &query).await,
        Command::Prs {
            search_host,
            code_host,
            role,
        } => prs(ctx, &search_host, &code_host, role).await,
        Command::Fork {
            search_host,
            code_host,
            project,
            repo,
        } => fork(ctx, &search_host, &code_host, &project, &repo).await,
        Command::Clone {
            search_host,
            code_host,
            project,
            repo,
            branch,
            default_branch,
        } => {
            clone(
                ctx,
                &search_host,
                &code_host,
                &project,
                &repo,
                &branch,
                &default_branch,
            )
            .await
        }
        Command::ValidateToken { search_host } => validate_token(ctx, &search_host).await,
    }
}

async fn search(ctx: &Context, search_host: &str, query: &str) -> Result<()> {
    let results = ctx.search_router.search(search_host, query).await?;
    for result in &results {
        println!("{}", result.as_path_string());
    }
    log::info!("{} repositories found", results.len());
    Ok(())
}

async fn prs(ctx: &Context, search_host: &str, code_host: &str, role: RoleArg) -> Result<()> {
    let role = match role {
        RoleArg::Author => PrRole::Author,
        RoleArg::Reviewer => PrRole::Reviewer,
    };
    match ctx.pr_router.get_all_prs(search_host, code_host, role).await? {
        Some(prs) => {
            for pr in &prs {
                println!("{}/{}\t{}", pr.project(), pr.repo_slug(), pr.title());
            }
            log::info!("{} open pull requests", prs.len());
        }
        None => bail!("no config for '{}'/'{}'", search_host, code_host),
    }
    Ok(())
}

async fn fork(
    ctx: &Context,
    search_host: &str,
    code_host: &str,
    project: &str,
    repo: &str,
) -> Result<()> {
    let target = SearchResult::new(search_host, code_host, project, repo);
    match ctx.pr_router.create_fork(&target).await? {
        Some(clone_url) => println!("{}", clone_url),
        None => bail!("no config for '{}'/'{}'", search_host, code_host),
    }
    Ok(())
}

async fn clone(
    ctx: &Context,
    search_host: &str,
    code_host: &str,
    project: &str,
    repo: &str,
    branch: &str,
    default_branch: &str,
) -> Result<()> {
    let target = SearchResult::new(search_host, code_host, project, repo);
    let Some(settings) = ctx.pr_router.resolve(search_host, code_host) else {
        bail!("no config for '{}'/'{}'", search_host, code_host);
    };

    let restored = ctx
        .reconciler
        .copy_if(&settings, &target, default_branch, branch)
        .await;
    render_history(&restored.actions);
    if restored.success {
        let saved = ctx
            .reconciler
            .save_copy(&settings, &target, default_branch)
            .await;
        render_history(&saved.actions);
        return Ok(());
    }

    // No usable cache; fall back to a full remote clone. Prefer the clone
    // link the backend advertises for the repo over the configured pattern.
    let clone_url = match ctx.pr_router.get_repo(&target).await {
        Ok(Some(repo_wrapper)) => ctx
            .url_helper
            .build_clone_url_for_repo(&settings, &repo_wrapper)?,
        Ok(None) => ctx
            .url_helper
            .build_clone_url(&settings, &settings.clone_url(project, repo))?,
        Err(e) => {
            log::warn!("repo lookup failed, using the clone pattern: {}", e);
            ctx.url_helper
                .build_clone_url(&settings, &settings.clone_url(project, repo))?
        }
    };
    let work_path = ctx.work_root.join(target.as_path_string());
    if let Some(parent) = work_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let output = ctx
        .runner
        .run(
            &ctx.work_root,
            &[
                "git",
                "clone",
                &clone_url,
                &work_path.display().to_string(),
            ],
        )
        .await;
    render_step("git clone", &output);
    if !output.success() {
        bail!("clone failed with exit code {}", output.exit_code);
    }
    if branch != default_branch {
        let checkout = ctx
            .runner
            .run(&work_path, &["git", "checkout", "-b", branch])
            .await;
        render_step("git checkout -b", &checkout);
    }
    let saved = ctx
        .reconciler
        .save_copy(&settings, &target, default_branch)
        .await;
    render_history(&saved.actions);
    Ok(())
}

async fn validate_token(ctx: &Context, search_host: &str) -> Result<()> {
    let verdict = ctx.search_router.validate_token(search_host).await?;
    println!("{}", verdict);
    Ok(())
}

fn render_history(actions: &[crate::git::Action]) {
    for action in actions {
        render_step(&action.label, &action.output);
    }
}

fn render_step(label: &str, output: &ApplyOutput) {
    let verdict = if output.success() { "ok" } else { "FAILED" };
    println!("[{}] {}", verdict, label);
    if !output.success() {
        log::warn!("{}", output.full_description());
    }
}
