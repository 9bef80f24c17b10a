use std::path::PathBuf;

use colored::Colorize;

use crate::convert::DEFAULT_OUTPUT_DIR;
use crate::prelude::{println, *};

use onenote_md_core::cache::{cache_path, FileCache};

#[derive(Debug, Clone, clap::Args)]
pub struct ClearCacheOptions {
    /// Output directory holding the cache
    #[arg(short, long, env = "ONENOTE_OUTPUT", default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,
}

pub fn run(options: ClearCacheOptions, _global: crate::Global) -> Result<()> {
    let path = cache_path(&options.output);
    let cleared = FileCache::clear(&path)
        .wrap_err_with(|| f!("Failed to clear the cache at {}", path.display()))?;

    if cleared {
        println!("{} {}", "Cache cleared:".green(), path.display());
    } else {
        println!("No cache found at {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use onenote_md_core::cache::CacheStore;
    use tempfile::TempDir;

    fn global() -> crate::Global {
        crate::Global { verbose: false }
    }

    #[test]
    fn test_clear_existing_cache() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = FileCache::load(cache_path(temp_dir.path()));
        cache.mark_done("page", "Section/Page.md").unwrap();

        run(
            ClearCacheOptions {
                output: temp_dir.path().to_path_buf(),
            },
            global(),
        )
        .unwrap();

        assert!(FileCache::load(cache_path(temp_dir.path())).is_empty());
    }

    #[test]
    fn test_clear_without_cache_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        run(
            ClearCacheOptions {
                output: temp_dir.path().join("never-created"),
            },
            global(),
        )
        .unwrap();
        assert!(!temp_dir.path().join("never-created").exists());
    }
}
