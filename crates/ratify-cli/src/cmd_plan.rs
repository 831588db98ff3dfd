use clap::Subcommand;
use ratify_core::plan;
use ratify_core::scope::ScopeMatcher;
use std::path::Path;

#[derive(Subcommand)]
pub enum PlanCmd {
    /// Show the active plan and its scope
    Show,
    /// Make a repository-relative plan file the active plan
    Set {
        path: String,
    },
    /// Create a plan from the template and make it active
    New {
        title: String,
    },
    /// Check paths against the active plan's scope
    Check {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

pub fn run(cmd: PlanCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        PlanCmd::Show => show(repo_root),
        PlanCmd::Set { path } => set(repo_root, &path),
        PlanCmd::New { title } => new(repo_root, &title),
        PlanCmd::Check { paths } => check(repo_root, &paths),
    }
}

fn show(repo_root: &Path) -> anyhow::Result<()> {
    let Some(pointer) = plan::read_active_pointer(repo_root) else {
        println!("No active plan. Create one with `ratify plan new <title>`.");
        return Ok(());
    };
    let Some(p) = plan::read_plan(repo_root, &pointer.path) else {
        anyhow::bail!("active plan {} cannot be read", pointer.path);
    };
    println!("{}", p.title);
    println!("  path: {}", p.path);
    if p.scope_items.is_empty() {
        println!("  scope: (none declared; scope is not enforced)");
    } else {
        println!("  scope:");
        for item in &p.scope_items {
            println!("    - {item}");
        }
    }
    Ok(())
}

fn set(repo_root: &Path, path: &str) -> anyhow::Result<()> {
    if !repo_root.join(path).is_file() {
        anyhow::bail!("plan file not found: {path}");
    }
    let pointer = plan::set_active_plan(repo_root, path)?;
    println!("Active plan: {}", pointer.path);
    Ok(())
}

fn new(repo_root: &Path, title: &str) -> anyhow::Result<()> {
    let rel = plan::create_plan(repo_root, title)?;
    plan::set_active_plan(repo_root, &rel)?;
    println!("Created {rel} (active)");
    Ok(())
}

/// Scope verdict per path, or `None` without an active plan.
fn verdicts(repo_root: &Path, paths: &[String]) -> Option<Vec<(String, &'static str)>> {
    let p = plan::active_plan(repo_root)?;
    let matcher = ScopeMatcher::compile(&p.scope_items);
    Some(
        paths
            .iter()
            .map(|path| {
                let verdict = match matcher.matches(path) {
                    None => "unrestricted",
                    Some(true) => "in scope",
                    Some(false) => "OUT OF SCOPE",
                };
                (path.clone(), verdict)
            })
            .collect(),
    )
}

fn check(repo_root: &Path, paths: &[String]) -> anyhow::Result<()> {
    let Some(results) = verdicts(repo_root, paths) else {
        println!("No active plan; nothing is out of scope.");
        return Ok(());
    };
    for (path, verdict) in results {
        println!("{path}: {verdict}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn new_plan_becomes_active() {
        let tmp = tempfile::tempdir().unwrap();
        new(tmp.path(), "Parser cleanup").unwrap();
        let active = plan::active_plan(tmp.path()).unwrap();
        assert_eq!(active.path, ".ratify/plans/parser-cleanup.md");
        assert_eq!(active.title, "Parser cleanup");
        assert!(set(tmp.path(), "plans/missing.md").is_err());
    }

    #[test]
    fn check_reports_each_verdict() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(verdicts(tmp.path(), &paths(&["src/a.rs"])).is_none());

        // Template plan declares no scope.
        new(tmp.path(), "Open ended").unwrap();
        assert_eq!(
            verdicts(tmp.path(), &paths(&["src/a.rs"])).unwrap(),
            vec![("src/a.rs".to_string(), "unrestricted")]
        );

        std::fs::write(
            tmp.path().join(".ratify/plans/app.md"),
            "# Plan: App\n\n## Scope\n- src/app/**\n",
        )
        .unwrap();
        set(tmp.path(), ".ratify/plans/app.md").unwrap();
        assert_eq!(
            verdicts(tmp.path(), &paths(&["src/app/x.ts", "src/other/y.ts"])).unwrap(),
            vec![
                ("src/app/x.ts".to_string(), "in scope"),
                ("src/other/y.ts".to_string(), "OUT OF SCOPE"),
            ]
        );
    }
}
