use std::process::Command;

fn git(args: &[&str]) -> Option<std::process::Output> {
    Command::new("git").args(args).output().ok()
}

fn main() {
    // Container builds have no .git; let them pass the revision in
    let git_hash = std::env::var("STOCK_LEDGER_GIT_HASH").ok().or_else(|| {
        let output = git(&["rev-parse", "--short", "HEAD"]).filter(|o| o.status.success())?;
        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let dirty = git(&["diff", "--quiet"]).is_some_and(|o| !o.status.success());
        Some(if dirty { format!("{hash}-dirty") } else { hash })
    });

    println!(
        "cargo:rustc-env=GIT_HASH={}",
        git_hash.unwrap_or_else(|| "unknown".to_string())
    );
    println!("cargo:rerun-if-env-changed=STOCK_LEDGER_GIT_HASH");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
