/// 用户记录与本地存储
///
/// 只有注册成功 (rc=200) 时才会写入存储
use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// 用户身份
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// 用户名
    pub user_id: String,

    /// 密码
    pub password: String,
}

impl User {
    pub fn new(user_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            password: password.into(),
        }
    }
}

// 日志里不输出密码
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("user_id", &self.user_id)
            .field("password", &"***")
            .finish()
    }
}

/// 用户存储 trait
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 保存用户
    async fn save(&self, user: &User) -> Result<(), StoreError>;

    /// 读取最近一次保存的用户
    async fn current(&self) -> Result<Option<User>, StoreError>;
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    user: Mutex<Option<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn save(&self, user: &User) -> Result<(), StoreError> {
        let mut slot = self.user.lock().map_err(|_| StoreError::Poisoned)?;
        *slot = Some(user.clone());
        Ok(())
    }

    async fn current(&self) -> Result<Option<User>, StoreError> {
        let slot = self.user.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(slot.clone())
    }
}

/// JSON 文件存储
///
/// 先写临时文件再 rename，保证文件内容要么是旧值要么是新值
#[derive(Debug, Clone)]
pub struct FileUserStore {
    path: PathBuf,
}

impl FileUserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl UserStore for FileUserStore {
    async fn save(&self, user: &User) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(user)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        info!("用户已保存: {} -> {}", user.user_id, self.path.display());
        Ok(())
    }

    async fn current(&self) -> Result<Option<User>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("用户文件不存在: {}", self.path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
