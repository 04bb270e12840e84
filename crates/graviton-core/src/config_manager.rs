//! 설정 파일 관리.
//!
//! 기본값 → 플랫폼 설정 디렉토리의 JSON 파일 → `GRAVITON_CONFIG_` 환경변수 순으로 덮어쓴다.
//! 환경변수 섹션 구분자는 `__` (예: `GRAVITON_CONFIG_SCHEDULER__ENABLED=false`).

use crate::config::LauncherConfig;
use crate::error::CoreError;
use config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 설정 파일 이름
const CONFIG_FILE_NAME: &str = "config.json";

/// 환경변수 접두사
const ENV_PREFIX: &str = "GRAVITON_CONFIG";

/// 설정 관리자
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: LauncherConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 기본 경로에서 설정 로드
    pub fn new() -> Result<Self, CoreError> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// 지정된 경로에서 설정 로드 (프로세스 환경변수 재정의 포함)
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        Self::load(config_path, None)
    }

    /// 환경변수 맵을 직접 주입하여 로드
    pub fn with_env_overrides(
        config_path: PathBuf,
        env: HashMap<String, String>,
    ) -> Result<Self, CoreError> {
        Self::load(config_path, Some(env))
    }

    fn load(
        config_path: PathBuf,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, CoreError> {
        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env);

        let config: LauncherConfig = Config::builder()
            .add_source(
                File::from(config_path.as_path())
                    .format(FileFormat::Json)
                    .required(false),
            )
            .add_source(environment)
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| {
                CoreError::Config(format!("설정 로드 실패: {}: {}", config_path.display(), e))
            })?;

        config.validate()?;
        debug!(path = %config_path.display(), "설정 로드 완료");

        Ok(Self {
            config,
            config_path,
        })
    }

    /// 현재 설정
    pub fn get(&self) -> &LauncherConfig {
        &self.config
    }

    /// 설정 파일 경로
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 설정 파일이 없으면 현재 값으로 생성
    pub fn ensure_saved(&self) -> Result<(), CoreError> {
        if self.config_path.exists() {
            return Ok(());
        }
        self.save()?;
        info!("기본 설정 파일 생성: {}", self.config_path.display());
        Ok(())
    }

    /// 현재 설정을 JSON 파일로 저장
    pub fn save(&self) -> Result<(), CoreError> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CoreError::Config(format!(
                    "설정 디렉토리 생성 실패: {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let json = serde_json::to_string_pretty(&self.config)?;
        fs::write(&self.config_path, json)?;
        Ok(())
    }

    /// 플랫폼별 설정 디렉토리
    ///
    /// - macOS: `~/Library/Application Support/app.graviton.Graviton-Browser/`
    /// - Windows: `%APPDATA%\graviton\Graviton Browser\config\`
    /// - Linux: `~/.config/gravitonbrowser/`
    pub fn config_dir() -> Result<PathBuf, CoreError> {
        ProjectDirs::from("app", "graviton", "Graviton Browser")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
    }

    fn default_config_path() -> Result<PathBuf, CoreError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }
}
