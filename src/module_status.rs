use std::fmt::{Display, Formatter};

/// Download state of a module, as derived by the prefetch delegate.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ModuleStatus {
    NotDownloadable,
    NotDownloaded,
    Downloading,
    Downloaded,
    Outdated,
}

impl Display for ModuleStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleStatus::NotDownloadable => write!(f, "NotDownloadable"),
            ModuleStatus::NotDownloaded => write!(f, "NotDownloaded"),
            ModuleStatus::Downloading => write!(f, "Downloading"),
            ModuleStatus::Downloaded => write!(f, "Downloaded"),
            ModuleStatus::Outdated => write!(f, "Outdated"),
        }
    }
}

impl From<ModuleStatus> for u8 {
    fn from(status: ModuleStatus) -> u8 {
        match status {
            ModuleStatus::NotDownloadable => 0,
            ModuleStatus::NotDownloaded => 1,
            ModuleStatus::Downloading => 2,
            ModuleStatus::Downloaded => 3,
            ModuleStatus::Outdated => 4,
        }
    }
}

impl From<u8> for ModuleStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => ModuleStatus::NotDownloadable,
            1 => ModuleStatus::NotDownloaded,
            2 => ModuleStatus::Downloading,
            3 => ModuleStatus::Downloaded,
            4 => ModuleStatus::Outdated,
            _ => ModuleStatus::NotDownloadable,
        }
    }
}
