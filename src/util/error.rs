use std::path::Path;

/// User-friendly error messages for common error scenarios.
pub struct UserError;

impl UserError {
    /// Get user-friendly message for beatmap file not found.
    pub fn beatmap_not_found(path: &Path) -> String {
        format!(
            "Beatmap file not found: {}\n譜面ファイルが見つかりません: {}",
            path.display(),
            path.display()
        )
    }

    /// Get user-friendly message for a beatmap record that failed validation.
    pub fn beatmap_invalid(field: Option<&str>) -> String {
        match field {
            Some(field) => format!(
                "Invalid beatmap: field `{field}` is missing or malformed\n譜面データが不正です: {field}"
            ),
            None => "Invalid beatmap record\n譜面データが不正です".to_string(),
        }
    }

    /// Get user-friendly message for a beatmap record that could not be fetched.
    pub fn beatmap_unavailable() -> &'static str {
        "Failed to load the beatmap\n譜面を読み込めませんでした"
    }

    /// Get user-friendly message for a playback clock that could not be opened.
    pub fn audio_unavailable() -> &'static str {
        "Failed to start audio playback\n音声の再生を開始できませんでした"
    }

    /// Get user-friendly message for database error.
    pub fn database_error(operation: &str) -> String {
        format!("Database error during {operation}\nデータベースエラーが発生しました")
    }

    /// Get user-friendly message for config save error.
    pub fn config_save_error() -> &'static str {
        "Failed to save settings\n設定の保存に失敗しました"
    }
}
