use std::path::PathBuf;

pub fn data_dir() -> PathBuf {
    // ~/.local/share/station/ on unix (XDG layout, same on macOS for
    // consistency with the config dir).
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("station")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("station")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("station")
    }
    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("station")
    }
}

/// Locate the external fetch/extract tool.
///
/// Search order:
/// 1. STATION_FETCH_BIN environment variable
/// 2. Beside the current executable
/// 3. PATH
pub fn find_fetch_binary() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("STATION_FETCH_BIN") {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            for name in fetch_binary_names() {
                let candidate = dir.join(name);
                if candidate.exists() {
                    return Some(candidate);
                }
            }
        }
    }

    if let Ok(path) = std::env::var("PATH") {
        #[cfg(unix)]
        let separator = ':';
        #[cfg(windows)]
        let separator = ';';

        for dir in path.split(separator) {
            for name in fetch_binary_names() {
                let candidate = PathBuf::from(dir).join(name);
                if candidate.exists() {
                    return Some(candidate);
                }
            }
        }
    }

    None
}

fn fetch_binary_names() -> Vec<String> {
    #[cfg(windows)]
    return vec!["yt-dlp.exe".to_string(), "yt-dlp".to_string()];

    #[cfg(not(windows))]
    return vec![
        "yt-dlp".to_string(),
        "yt-dlp_linux".to_string(),
        "yt-dlp_macos".to_string(),
    ];
}
