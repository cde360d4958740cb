//! `viewfinder check` — load everything a level needs and report problems.

use std::path::Path;

use anyhow::{Context, Result};
use viewfinder_align::{OutcomeDispatcher, PoseStore, PuzzleId};
use viewfinder_common::Manifest;

pub fn run(manifest_path: &Path) -> Result<()> {
    let manifest = Manifest::load(manifest_path)
        .with_context(|| format!("loading manifest {}", manifest_path.display()))?;

    let dispatcher = OutcomeDispatcher::from_manifest(&manifest).context("building outcome table")?;
    let (poses, failures) = PoseStore::load_manifest(&manifest);

    for entry in &manifest.puzzles {
        let id = PuzzleId::new(entry.id.as_str());
        let kind = dispatcher
            .get(&id)
            .map(|o| format!("{:?}", o.kind()))
            .unwrap_or_else(|| "-".to_string());
        match poses.get(&id) {
            Some(record) => {
                let display = record
                    .screen_size
                    .and_then(|screen| record.display_size(screen))
                    .map(|(w, h)| format!(" view {}x{}", w, h))
                    .unwrap_or_default();
                println!(
                    "  {:<20} {:<20} pos {} pitch {:>7.2} yaw {:>7.2}{}{}",
                    id,
                    kind,
                    record.target.position,
                    record.target.angles.pitch,
                    record.target.angles.yaw,
                    if record.locked { " locked" } else { "" },
                    display
                );
            }
            None => println!("  {:<20} {:<20} (no pose)", id, kind),
        }
    }

    for failure in &failures {
        eprintln!("error: {}", failure);
    }

    if !failures.is_empty() {
        anyhow::bail!(
            "{} of {} pose records failed to load",
            failures.len(),
            manifest.puzzles.len()
        );
    }
    println!("{} puzzles OK", manifest.puzzles.len());
    Ok(())
}
