//! UCI リポジトリからの covertype 取得

use crate::error::{DatasetError, DatasetResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const COVERTYPE_URL: &str =
    "https://archive.ics.uci.edu/ml/machine-learning-databases/covtype/covtype.data.gz";

pub const COVERTYPE_FILE: &str = "covtype.data.gz";

/// covertype の gzip を data_dir にキャッシュし、そのパスを返す
pub fn fetch_covertype(data_dir: &Path) -> DatasetResult<PathBuf> {
    let path = data_dir.join(COVERTYPE_FILE);
    if path.exists() {
        info!("キャッシュ済みの covertype を使用します: {}", path.display());
        return Ok(path);
    }

    info!("covertype をダウンロードしています: {}", COVERTYPE_URL);
    let response = reqwest::blocking::get(COVERTYPE_URL)
        .map_err(|e| DatasetError::Download(e.to_string()))?;
    if !response.status().is_success() {
        return Err(DatasetError::Download(format!(
            "{} returned {}",
            COVERTYPE_URL,
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .map_err(|e| DatasetError::Download(e.to_string()))?;

    fs::create_dir_all(data_dir)?;
    // キャッシュには書き終えたファイルだけを置く
    let partial = path.with_extension("gz.part");
    fs::write(&partial, &bytes)?;
    fs::rename(&partial, &path)?;
    info!("covertype を保存しました: {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_file_skips_download() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join(COVERTYPE_FILE);
        fs::write(&cached, b"cached").unwrap();

        assert_eq!(fetch_covertype(dir.path()).unwrap(), cached);
        assert_eq!(fs::read(&cached).unwrap(), b"cached");
    }
}
