use thiserror::Error;
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },
    #[error("malformed payload: {0}")]
    Payload(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no data to export; start a recording first")]
    EmptyExport,
    #[error("enter a name for the file")]
    EmptyName,
    #[error("stop the recording before clearing data")]
    ClearWhileRecording,
    #[error("save or discard the previous recording first")]
    SavePending,
    #[error("no recording is waiting for a file name")]
    NoPendingSave,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl MonitorError {
    /// Errors caused by something the user did, shown as a toast rather than logged.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            MonitorError::EmptyExport
                | MonitorError::EmptyName
                | MonitorError::ClearWhileRecording
                | MonitorError::SavePending
        )
    }
}
impl From<reqwest::Error> for MonitorError {
    fn from(value: reqwest::Error) -> Self {
        MonitorError::Http {
            url: value
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "<unknown>".into()),
            reason: value.to_string(),
        }
    }
}
impl From<serde_json::Error> for MonitorError {
    fn from(value: serde_json::Error) -> Self {
        MonitorError::Payload(value.to_string())
    }
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for MonitorError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        MonitorError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for MonitorError {
    fn from(value: image::ImageError) -> Self {
        MonitorError::Plot(value.to_string())
    }
}
