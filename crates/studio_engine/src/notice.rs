use studio_core::{Notice, NoticeLevel, StudioViewModel};
use studio_logging::{studio_debug, studio_error, studio_info, studio_warn};

/// Surface for user-facing notices (the alert-equivalent of a studio page).
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: &Notice);

    /// Called whenever the lifecycle state changed.
    fn progress(&self, _view: &StudioViewModel) {}
}

/// Routes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNoticeSink;

impl NoticeSink for LogNoticeSink {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Info => studio_info!("{}", notice.message),
            NoticeLevel::Warning => studio_warn!("{}", notice.message),
            NoticeLevel::Error => studio_error!("{}", notice.message),
        }
    }

    fn progress(&self, view: &StudioViewModel) {
        studio_debug!(
            "status={} remote={:?} transient_errors={}",
            view.status,
            view.remote_status,
            view.transient_errors
        );
    }
}
