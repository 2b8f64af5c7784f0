use vergen_git2::{BuildBuilder, Emitter, Git2Builder};

// Feeds `VERGEN_BUILD_TIMESTAMP` and `VERGEN_GIT_DESCRIBE` into `--version`.
// Outside of a git checkout vergen falls back to placeholder values.
fn main() -> anyhow::Result<()> {
    let build = BuildBuilder::default().build_timestamp(true).build()?;
    let git = Git2Builder::default().describe(true, true, None).build()?;

    Emitter::new()
        .add_instructions(&build)?
        .add_instructions(&git)?
        .emit()?;
    Ok(())
}
