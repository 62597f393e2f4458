use async_trait::async_trait;

use dlog_client::Subject;

use crate::aggregate::TextBlock;
use crate::traits::ProgressSink;

pub const LOADING_NOTICE: &str = "Loading logs... please wait! User has lots of activity!";

/// Where replies go: a chat channel, a terminal, a test recorder.
#[async_trait]
pub trait Surface: Send + Sync {
    /// A one-line message.
    async fn notice(&self, text: &str);

    /// A titled block of bullet lines.
    async fn block(&self, block: &TextBlock);
}

/// Relays the collector's large-history notice to a surface.
pub struct SurfaceProgress<'a> {
    surface: &'a dyn Surface,
}

impl<'a> SurfaceProgress<'a> {
    pub fn new(surface: &'a dyn Surface) -> Self {
        Self { surface }
    }
}

#[async_trait]
impl<'a> ProgressSink for SurfaceProgress<'a> {
    async fn pages_remaining(&self, _subject: &Subject, _remaining: usize) {
        self.surface.notice(LOADING_NOTICE).await;
    }
}
