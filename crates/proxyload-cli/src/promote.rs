//! Release promotion commands: `set-release`, `inquire`, `status` and
//! `releases`.

use std::io::{self, BufRead, Write};
use std::path::Path;

use proxyload_core::{Promotion, PromotionStore};

use crate::output::{self, BOLD, DIM, RESET, YELLOW};

/// Make `release` current for `target`/`environment`.
pub fn set_release(
    source_dir: &str,
    dist_dir: &str,
    target: &str,
    environment: &str,
    release: &str,
) -> anyhow::Result<()> {
    let store = PromotionStore::new(source_dir, dist_dir);
    output::step(&format!("Setting {target}/{environment} to {release}"));
    let promotion = store.promote(target, environment, release)?;
    output::done("");
    print_promotion(&promotion);
    Ok(())
}

fn print_promotion(promotion: &Promotion) {
    println!();
    println!("{DIM}Target:{RESET} {}", promotion.target);
    println!("{DIM}Environment:{RESET} {}", promotion.environment);
    println!("{DIM}Release:{RESET} {}", promotion.release);
    println!(
        "{DIM}Previous:{RESET} {}",
        promotion.previous.as_deref().unwrap_or("none")
    );
}

/// Interactive promotion: numbered prompts on stdin, then a confirmation.
pub fn inquire(source_dir: &str, dist_dir: &str) -> anyhow::Result<()> {
    let store = PromotionStore::new(source_dir, dist_dir);
    println!("{DIM}Using targets from:{RESET} {}", store.targets_path().display());
    println!(
        "{DIM}Using releases from:{RESET} {}",
        Path::new(dist_dir).join("releases.json").display()
    );
    println!();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    match select_promotion(&store, &mut input, &mut out)? {
        Some((target, environment, release)) => {
            let promotion = store.promote(&target, &environment, &release)?;
            output::done("Release set");
            print_promotion(&promotion);
        }
        None => println!("Operation cancelled."),
    }
    Ok(())
}

/// Prompt for target, environment and release. `None` if not confirmed.
fn select_promotion<R: BufRead, W: Write>(
    store: &PromotionStore,
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<Option<(String, String, String)>> {
    let targets = store.targets()?;
    if targets.is_empty() {
        anyhow::bail!("No targets found in {}", store.targets_path().display());
    }
    let index = store.releases()?;
    let releases: Vec<&str> = index.newest_first().into_iter().map(|(id, _)| id).collect();
    if releases.is_empty() {
        anyhow::bail!("No releases found; run a build first");
    }

    let names: Vec<&str> = targets.names().collect();
    let target = choose(input, out, "Select a target:", &names)?;

    let environments: Vec<&str> = targets
        .get(target)
        .map(|t| t.environments.iter().map(String::as_str).collect())
        .unwrap_or_default();
    if environments.is_empty() {
        anyhow::bail!("No environments found for target {target}");
    }
    let environment = choose(input, out, "Select an environment:", &environments)?;

    if let Some(entry) = store.current(target)?.get(environment) {
        writeln!(out, "{DIM}Current release:{RESET} {}", entry.current)?;
    }
    let release = choose(input, out, "Select a release:", &releases)?;

    let question = format!(
        "Set release \"{release}\" for target \"{target}\" in environment \"{environment}\"?"
    );
    if !confirm(input, out, &question)? {
        return Ok(None);
    }
    Ok(Some((
        target.to_string(),
        environment.to_string(),
        release.to_string(),
    )))
}

/// Numbered menu; re-prompts until a valid number is entered.
fn choose<'a, R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    message: &str,
    options: &[&'a str],
) -> anyhow::Result<&'a str> {
    writeln!(out, "{BOLD}{message}{RESET}")?;
    for (i, option) in options.iter().enumerate() {
        writeln!(out, "  {}) {}", i + 1, option)?;
    }

    loop {
        write!(out, "Enter 1-{}: ", options.len())?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            anyhow::bail!("No selection made (end of input)");
        }
        match line.trim().parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Ok(options[n - 1]),
            _ => writeln!(
                out,
                "{YELLOW}Enter a number between 1 and {}{RESET}",
                options.len()
            )?,
        }
    }
}

/// Yes/no question defaulting to yes.
fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> anyhow::Result<bool> {
    write!(out, "{question} [Y/n]: ")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(!matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "n" | "no"
    ))
}

/// Print current release and recent history per environment of `target`.
pub fn status(dist_dir: &str, target: &str, limit: usize) -> anyhow::Result<()> {
    // Targets are only needed to promote.
    let store = PromotionStore::new(dist_dir, dist_dir);
    let current = store.current(target)?;
    let history = store.history(target)?;

    output::header("status", target);
    if current.is_empty() {
        output::warn(format!("No release has been set for target {target}"));
        return Ok(());
    }

    for (environment, entry) in &current {
        println!(
            "{BOLD}{environment}{RESET}: {} {DIM}(since {}){RESET}",
            entry.current,
            entry.updated_at.to_rfc3339()
        );
        let log = history
            .get(environment)
            .map(|h| h.history.as_slice())
            .unwrap_or_default();
        for past in log.iter().skip(1).take(limit) {
            println!(
                "  {DIM}{}  {}{RESET}",
                past.updated_at.to_rfc3339(),
                past.name
            );
        }
    }
    Ok(())
}

/// List built releases, newest first.
pub fn releases(dist_dir: &str) -> anyhow::Result<()> {
    let store = PromotionStore::new(dist_dir, dist_dir);
    let index = store.releases()?;

    output::header("releases", dist_dir);
    let releases = index.newest_first();
    if releases.is_empty() {
        output::warn("No releases found; run a build first");
        return Ok(());
    }
    for (id, record) in releases {
        println!(
            "{BOLD}{id}{RESET}  {DIM}created {}  updated {}{RESET}",
            record.created_at.to_rfc3339(),
            record.updated_at.to_rfc3339()
        );
    }
    Ok(())
}
