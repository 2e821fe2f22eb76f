/// 设备信息模块
///
/// 提供注册请求需要的 OS 版本和硬件型号。
/// 每次查询都独立执行 初始化 -> 获取详情 -> 关闭，失败时返回空字符串
use crate::error::DeviceError;
use std::path::PathBuf;
use tracing::debug;

/// 设备详情
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceDetails {
    pub os_version: String,
    pub hardware_id: String,
}

/// 设备信息查询
///
/// 空字符串表示"未知"，不是错误
pub trait DeviceInfo: Send + Sync {
    fn os_version(&self) -> String;

    fn model(&self) -> String;
}

/// 有状态的设备平台接口
pub trait DevicePlatform: Send + Sync {
    fn initialize(&self) -> Result<(), DeviceError>;

    fn details(&self) -> Result<DeviceDetails, DeviceError>;

    fn shutdown(&self);
}

/// 平台会话，drop 时调用 shutdown
struct PlatformSession<'a, P: DevicePlatform + ?Sized> {
    platform: &'a P,
}

impl<'a, P: DevicePlatform + ?Sized> PlatformSession<'a, P> {
    fn open(platform: &'a P) -> Result<Self, DeviceError> {
        platform.initialize()?;
        Ok(Self { platform })
    }
}

impl<P: DevicePlatform + ?Sized> Drop for PlatformSession<'_, P> {
    fn drop(&mut self) {
        self.platform.shutdown();
    }
}

/// 基于 `DevicePlatform` 的设备信息
pub struct PlatformDeviceInfo<P> {
    platform: P,
}

impl<P: DevicePlatform> PlatformDeviceInfo<P> {
    pub fn new(platform: P) -> Self {
        Self { platform }
    }

    fn query<F>(&self, field: &str, pick: F) -> String
    where
        F: FnOnce(DeviceDetails) -> String,
    {
        let session = match PlatformSession::open(&self.platform) {
            Ok(session) => session,
            Err(e) => {
                debug!("error initializing device platform: {}", e);
                return String::new();
            }
        };

        match session.platform.details() {
            Ok(details) => pick(details),
            Err(e) => {
                debug!("error retrieving device details ({}): {}", field, e);
                String::new()
            }
        }
    }
}

impl<P: DevicePlatform> DeviceInfo for PlatformDeviceInfo<P> {
    fn os_version(&self) -> String {
        self.query("os_version", |d| d.os_version)
    }

    fn model(&self) -> String {
        self.query("model", |d| d.hardware_id)
    }
}

/// 固定的设备信息
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceInfo {
    os_version: String,
    model: String,
}

impl StaticDeviceInfo {
    pub fn new(os_version: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            os_version: os_version.into(),
            model: model.into(),
        }
    }
}

impl DeviceInfo for StaticDeviceInfo {
    fn os_version(&self) -> String {
        self.os_version.clone()
    }

    fn model(&self) -> String {
        self.model.clone()
    }
}

/// 部分覆盖：有覆盖值时使用覆盖值，否则查询内部实现
pub struct OverrideDeviceInfo<D> {
    inner: D,
    os_version: Option<String>,
    model: Option<String>,
}

impl<D: DeviceInfo> OverrideDeviceInfo<D> {
    pub fn new(inner: D, os_version: Option<String>, model: Option<String>) -> Self {
        Self {
            inner,
            os_version,
            model,
        }
    }
}

impl<D: DeviceInfo> DeviceInfo for OverrideDeviceInfo<D> {
    fn os_version(&self) -> String {
        self.os_version
            .clone()
            .unwrap_or_else(|| self.inner.os_version())
    }

    fn model(&self) -> String {
        self.model.clone().unwrap_or_else(|| self.inner.model())
    }
}

/// 从宿主机文件系统读取设备信息
///
/// OS 版本: `etc/os-release` 的 VERSION_ID，回退到 `proc/sys/kernel/osrelease`
/// 型号: `sys/devices/virtual/dmi/id/product_name`，回退到 `proc/device-tree/model`
#[derive(Debug, Clone)]
pub struct HostPlatform {
    root: PathBuf,
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::with_root("/")
    }
}

impl HostPlatform {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_trimmed(&self, relative: &str) -> Option<String> {
        let raw = std::fs::read_to_string(self.root.join(relative)).ok()?;
        let value = raw.trim_matches(|c: char| c.is_whitespace() || c == '\0');
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    fn os_release_version(&self) -> Option<String> {
        let raw = std::fs::read_to_string(self.root.join("etc/os-release")).ok()?;
        raw.lines()
            .filter_map(|line| line.strip_prefix("VERSION_ID="))
            .map(|v| v.trim().trim_matches('"').to_string())
            .find(|v| !v.is_empty())
    }
}

impl DevicePlatform for HostPlatform {
    fn initialize(&self) -> Result<(), DeviceError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(DeviceError::Initialize(format!(
                "platform root {} is not a directory",
                self.root.display()
            )))
        }
    }

    fn details(&self) -> Result<DeviceDetails, DeviceError> {
        let os_version = self
            .os_release_version()
            .or_else(|| self.read_trimmed("proc/sys/kernel/osrelease"));
        let hardware_id = self
            .read_trimmed("sys/devices/virtual/dmi/id/product_name")
            .or_else(|| self.read_trimmed("proc/device-tree/model"));

        if os_version.is_none() && hardware_id.is_none() {
            return Err(DeviceError::Details(format!(
                "no device information under {}",
                self.root.display()
            )));
        }

        Ok(DeviceDetails {
            os_version: os_version.unwrap_or_default(),
            hardware_id: hardware_id.unwrap_or_default(),
        })
    }

    fn shutdown(&self) {}
}
