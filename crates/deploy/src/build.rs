use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use contract_harness::{solc::SolcCompiler, Artifacts};

use crate::error::DeployError;

/// Compiles `path` and writes one artifact per contract below `out_dir`.
pub fn build<W: Write>(
    path: &Utf8Path,
    out_dir: &Utf8Path,
    optimize: bool,
    solc: Option<&str>,
    out: &mut W,
) -> Result<Vec<Utf8PathBuf>, DeployError> {
    let compiler = solc
        .map(SolcCompiler::new)
        .unwrap_or_else(SolcCompiler::from_env)
        .optimize(optimize);
    let compiled = compiler.compile_file(path)?;
    if compiled.is_empty() {
        return Err(DeployError::NoContracts(path.to_path_buf()));
    }

    let artifacts = Artifacts::new(out_dir);
    let mut written = Vec::with_capacity(compiled.len());
    for artifact in &compiled {
        let artifact_path = artifacts.write(artifact)?;
        tracing::info!(target: "build", "Compiled {}", artifact.contract_name);
        writeln!(out, "Wrote {artifact_path}")?;
        written.push(artifact_path);
    }
    Ok(written)
}
