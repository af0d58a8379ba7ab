//! # Store 模块
//!
//! 文件形式的快速存档。
//!
//! ## 文件布局
//!
//! ```text
//! saves/
//! └── quick.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use adv_runtime::{SaveData, SaveError, SaveStore};
use tracing::info;

/// 快速存档文件名
pub const QUICK_SAVE_FILE: &str = "quick.json";

/// 目录中的快速存档
pub struct FileSaveStore {
    saves_dir: PathBuf,
}

impl FileSaveStore {
    pub fn new(saves_dir: impl AsRef<Path>) -> Self {
        Self {
            saves_dir: saves_dir.as_ref().to_path_buf(),
        }
    }

    /// 快速存档文件路径
    pub fn quick_path(&self) -> PathBuf {
        self.saves_dir.join(QUICK_SAVE_FILE)
    }

    fn ensure_dir(&self) -> Result<(), SaveError> {
        if !self.saves_dir.exists() {
            fs::create_dir_all(&self.saves_dir)
                .map_err(|e| SaveError::Store(format!("无法创建存档目录: {e}")))?;
        }
        Ok(())
    }
}

impl SaveStore for FileSaveStore {
    fn save_quick(&mut self, data: &SaveData) -> Result<(), SaveError> {
        self.ensure_dir()?;
        let path = self.quick_path();
        fs::write(&path, data.to_json()?)
            .map_err(|e| SaveError::Store(format!("无法写入存档文件: {e}")))?;
        info!(path = %path.display(), "快速存档已写入");
        Ok(())
    }

    fn load_quick(&mut self) -> Result<Option<SaveData>, SaveError> {
        let path = self.quick_path();
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .map_err(|e| SaveError::Store(format!("无法读取存档文件: {e}")))?;
        let data = SaveData::from_json(&json)?;
        info!(path = %path.display(), "快速存档已读取");
        Ok(Some(data))
    }

    fn has_quick(&self) -> bool {
        self.quick_path().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adv_runtime::{Command, CommandKind, EngineConfig, Script, Session};

    fn snapshot() -> SaveData {
        let script = Script::new(
            "main",
            vec![Command::new(CommandKind::Message {
                text: "あ".to_string(),
            })],
        )
        .unwrap();
        Session::new(EngineConfig::default(), script).snapshot()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSaveStore::new(dir.path().join("saves"));
        assert!(!store.has_quick());
        assert_eq!(store.load_quick().unwrap(), None);

        let data = snapshot();
        store.save_quick(&data).unwrap();
        assert!(store.has_quick());
        assert_eq!(store.load_quick().unwrap(), Some(data));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSaveStore::new(dir.path());
        fs::write(store.quick_path(), "{").unwrap();
        assert!(matches!(
            store.load_quick(),
            Err(SaveError::DeserializationFailed(_))
        ));
    }
}
