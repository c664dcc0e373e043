// src/core/machines.rs

use crate::CancellationToken;
use crate::constants::PROJECT_DESCRIPTOR;
use crate::core::project::{ProjectContext, ProjectError};
use crate::models::Machine;
use crate::system::executor::{self, ExecutionError};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode the membership cache: {0}")]
    CacheEncode(#[from] bincode::error::EncodeError),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Why a membership cache file could not be used. Resolution treats any of
/// these as a miss and rebuilds the member list from scratch.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cache file is empty")]
    Empty,
    #[error("Decompression failed: {0}")]
    Decompress(#[from] lz4_flex::block::DecompressError),
    #[error("Deserialization failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Resolves the member list for the cluster project, sorted by name.
///
/// A readable on-disk cache is authoritative. On a miss the list is either
/// synthesized from the instance count declared in the project descriptor or,
/// when no count is declared, queried live from `vagrant`. A non-empty result
/// is written back to the cache; an unreadable cache is dropped silently.
pub fn resolve_members(
    ctx: &ProjectContext,
    cancellation_token: &CancellationToken,
) -> DirectoryResult<Vec<Machine>> {
    if !ctx.descriptor_path().is_file() {
        log::debug!(
            "No {} under {}; treating the cluster as empty.",
            PROJECT_DESCRIPTOR,
            ctx.root().display()
        );
        return Ok(Vec::new());
    }
    ctx.ensure_cluster_dir()?;

    let cache_path = ctx.members_cache_path();
    if cache_path.is_file() {
        match read_cache_file(&cache_path) {
            Ok(mut members) => {
                members.sort_by(|a, b| a.name.cmp(&b.name));
                return Ok(members);
            }
            Err(e) => {
                log::warn!(
                    "Membership cache at {} is unreadable ({}). Re-resolving.",
                    cache_path.display(),
                    e
                );
            }
        }
    }

    let mut members = match ctx.instance_count() {
        Some(count) => synthesize_members(ctx.platform().member_prefix(), count),
        None => query_live_members_with_retry(ctx, cancellation_token),
    };
    members.sort_by(|a, b| a.name.cmp(&b.name));

    if !members.is_empty() {
        write_cache_file(&cache_path, &members)?;
    }
    Ok(members)
}

/// Drops the membership cache so the next resolution starts fresh. Returns
/// whether a cache file was actually present.
pub fn invalidate_cache(ctx: &ProjectContext) -> DirectoryResult<bool> {
    let cache_path = ctx.members_cache_path();
    if cache_path.is_file() {
        fs::remove_file(&cache_path)?;
        log::debug!("Removed membership cache at {}.", cache_path.display());
        return Ok(true);
    }
    Ok(false)
}

pub fn read_cache_file(path: &Path) -> Result<Vec<Machine>, CacheError> {
    let bytes = fs::read(path)?;
    if bytes.is_empty() {
        return Err(CacheError::Empty);
    }
    let raw = lz4_flex::decompress_size_prepended(&bytes)?;
    let (members, _): (Vec<Machine>, usize) =
        bincode::serde::decode_from_slice(&raw, bincode::config::standard())?;
    Ok(members)
}

fn write_cache_file(path: &Path, members: &[Machine]) -> DirectoryResult<()> {
    let raw = bincode::serde::encode_to_vec(members, bincode::config::standard())?;
    fs::write(path, lz4_flex::compress_prepend_size(&raw))?;
    Ok(())
}

fn synthesize_members(prefix: &str, count: u32) -> Vec<Machine> {
    (1..=count)
        .map(|i| Machine::named(format!("{prefix}{i}")))
        .collect()
}

/// One full live resolution attempt: member names from `vagrant status`, then
/// an ssh-config blob per member.
fn query_live_members(
    ctx: &ProjectContext,
    cancellation_token: &CancellationToken,
) -> Result<Vec<Machine>, ExecutionError> {
    let status_output = executor::run_capture(
        "vagrant status --machine-readable",
        ctx.root(),
        cancellation_token,
    )?;
    let names = parse_status_targets(&status_output);

    let mut members = Vec::with_capacity(names.len());
    for name in names {
        let blob = executor::run_capture(
            &format!("vagrant ssh-config {name}"),
            ctx.root(),
            cancellation_token,
        )?;
        members.push(Machine {
            name,
            ssh_config: Some(blob),
        });
    }
    Ok(members)
}

/// A failed live query is retried exactly once; a second failure yields an
/// empty cluster rather than an error.
fn query_live_members_with_retry(
    ctx: &ProjectContext,
    cancellation_token: &CancellationToken,
) -> Vec<Machine> {
    match query_live_members(ctx, cancellation_token) {
        Ok(members) => members,
        Err(ExecutionError::Cancelled) => Vec::new(),
        Err(first) => {
            log::warn!("Live member query failed ({first}). Retrying once...");
            match query_live_members(ctx, cancellation_token) {
                Ok(members) => members,
                Err(second) => {
                    log::warn!(
                        "Live member query failed again ({second}). Treating the cluster as empty."
                    );
                    Vec::new()
                }
            }
        }
    }
}

/// Pulls machine names out of `vagrant status --machine-readable` output.
/// Each state row looks like `1614444444,core1,state,running`.
fn parse_status_targets(output: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in output.lines() {
        let mut fields = line.split(',');
        let _timestamp = fields.next();
        let target = fields.next().unwrap_or_default();
        let kind = fields.next().unwrap_or_default();
        if kind == "state" && !target.is_empty() && !names.iter().any(|n| n == target) {
            names.push(target.to_string());
        }
    }
    names
}
