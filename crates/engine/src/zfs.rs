//! ZFS binding: engine primitives via the zfs/zpool binaries

use crate::error::EngineError;
use crate::size::RawSpace;
use crate::{Engine, Snapshot};
use async_trait::async_trait;
use tokio::process::Command;

/// Production engine backed by the `zfs` and `zpool` command-line tools
#[derive(Debug, Default)]
pub struct ZfsEngine;

impl ZfsEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Engine for ZfsEngine {
    async fn list_datasets(&self, root: &str) -> Result<Vec<String>, EngineError> {
        let out = run("zfs", &["list", "-H", "-o", "name", "-t", "filesystem,volume", "-r", root])
            .await?;
        Ok(out
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    async fn list_snapshots(&self) -> Result<Vec<Snapshot>, EngineError> {
        // -p prints creation as raw epoch seconds, -s creation pre-sorts
        let out = run(
            "zfs",
            &["list", "-H", "-p", "-t", "snapshot", "-o", "creation,name", "-s", "creation"],
        )
        .await?;

        let mut snapshots = Vec::new();
        for line in out.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            snapshots.push(parse_snapshot_line(line)?);
        }
        Ok(snapshots)
    }

    async fn available_space(&self, pool: &str) -> Result<RawSpace, EngineError> {
        let out = run("zpool", &["list", "-H", "-o", "free", pool]).await?;
        RawSpace::parse(&out)
    }

    async fn create_snapshot(&self, dataset: &str, label: &str) -> Result<(), EngineError> {
        let name = format!("{dataset}@{label}");
        run("zfs", &["snapshot", &name]).await?;
        Ok(())
    }

    async fn destroy_snapshot(&self, dataset: &str, label: &str) -> Result<(), EngineError> {
        let name = format!("{dataset}@{label}");
        match run("zfs", &["destroy", &name]).await {
            Ok(_) => Ok(()),
            // Already gone: the catalog is stale by construction
            Err(EngineError::Command { ref stderr, .. }) if is_already_absent(stderr) => {
                tracing::debug!(snapshot = %name, "snapshot already absent on destroy");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// Run an engine command, returning stdout on success
async fn run(program: &str, args: &[&str]) -> Result<String, EngineError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|source| EngineError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(EngineError::Command {
            program: program.to_string(),
            args: args.join(" "),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse one `epoch<TAB>dataset@label` catalog line
fn parse_snapshot_line(line: &str) -> Result<Snapshot, EngineError> {
    let parse_err = || EngineError::Parse {
        what: "snapshot listing line",
        input: line.to_string(),
    };

    let (creation, name) = line.split_once('\t').ok_or_else(parse_err)?;
    let creation_epoch: i64 = creation.trim().parse().map_err(|_| parse_err())?;
    let (dataset, label) = name.trim().split_once('@').ok_or_else(parse_err)?;
    if dataset.is_empty() || label.is_empty() {
        return Err(parse_err());
    }

    Ok(Snapshot {
        dataset: dataset.to_string(),
        label: label.to_string(),
        creation_epoch,
    })
}

/// Does this destroy stderr mean the snapshot was already gone?
fn is_already_absent(stderr: &str) -> bool {
    stderr.contains("could not find any snapshots to destroy")
        || stderr.contains("dataset does not exist")
}
