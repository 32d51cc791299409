#![allow(clippy::expect_used)]

//! Dump every archive directory of a cache on disk.
//!
//! Usage:
//!   RUNECACHE_PATH=/path/to/cache cargo run --example dump_directories \
//!       -p runecache-storage
//!
//! The cache path can also be passed as the first argument. Set `RUST_LOG`
//! to `debug` or `trace` to follow the block reads.

use runecache_storage::{CacheConfig, Engine};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cache_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("RUNECACHE_PATH").ok())
        .map(PathBuf::from)
        .expect("pass a cache directory or set RUNECACHE_PATH")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = cache_path();
    println!("Loading directories from: {}", path.display());

    let mut engine = Engine::open(CacheConfig::new(&path)).expect("failed to open cache");
    engine
        .load_directories()
        .expect("failed to load directories");

    for archive in 0..=u8::MAX {
        let Some(directory) = engine.directory(archive) else {
            continue;
        };
        let files: usize = directory.groups.values().map(|g| g.file_count()).sum();
        println!(
            "Archive {archive:>3}: {:?} format={} named={} groups={} files={} crc={:08x}",
            directory.format,
            directory.format_word,
            directory.has_hashed_names(),
            directory.len(),
            files,
            directory.crc,
        );

        // First few groups of each archive
        for group in directory.groups.values().take(5) {
            println!(
                "    group={:>6} version={:>10} crc={:08x} files={}",
                group.id,
                group.version,
                group.crc,
                group.file_count(),
            );
        }
        if directory.len() > 5 {
            println!("    ... and {} more", directory.len() - 5);
        }
    }

    engine.close();
}
