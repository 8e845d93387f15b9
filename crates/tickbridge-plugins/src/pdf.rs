//! PDF document: load a file, render one page at a time.

use std::sync::{Arc, Mutex};

use tickbridge_common::{CallbackEnvelope, HandlerError, NativeCode, Result, SurfaceHandle};
use tickbridge_config::schema::LoopbackSection;
use tickbridge_core::{
    CallbackEntry, DispatchConfig, LoopbackModule, NativeBridgeHandle, NativeModule,
    NotificationHandler, OperationFuture, PluginCommand, PluginEvent, Reply,
};
use tracing::{debug, info, warn};

use crate::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PdfKind {
    Load,
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfPage {
    pub index: u32,
    pub width: i32,
    pub height: i32,
    pub surface: SurfaceHandle,
}

impl PdfPage {
    fn is_renderable(&self) -> bool {
        self.width > 0 && self.height > 0 && !self.surface.is_null()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfEvent {
    Loading,
    Loaded,
    Opened { page_count: u32 },
    Selected(PdfPage),
}

impl PluginEvent for PdfEvent {
    type Kind = PdfKind;

    fn completes(&self) -> Option<PdfKind> {
        match self {
            Self::Opened { .. } => Some(PdfKind::Load),
            Self::Selected(_) => Some(PdfKind::Select),
            Self::Loading | Self::Loaded => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfCommand {
    LoadFile { folder: String, file: String },
    SelectPage { index: u32 },
}

impl PluginCommand for PdfCommand {
    type Kind = PdfKind;

    fn kind(&self) -> PdfKind {
        match self {
            Self::LoadFile { .. } => PdfKind::Load,
            Self::SelectPage { .. } => PdfKind::Select,
        }
    }
}

/// Document state as reported by the native side.
#[derive(Debug, Default)]
pub struct PdfPages {
    loading: bool,
    page_count: Option<u32>,
    current: Option<PdfPage>,
    /// Set by a non-empty `Opened` until the wrapper shows the first page.
    first_page_due: bool,
}

impl PdfPages {
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Pages in the open document, `None` before the first `Opened`.
    pub fn page_count(&self) -> Option<u32> {
        self.page_count
    }

    pub fn current(&self) -> Option<&PdfPage> {
        self.current.as_ref()
    }

    pub fn current_index(&self) -> Option<u32> {
        self.current.map(|p| p.index)
    }

    /// Wrap a requested index into the document: below zero goes to the
    /// last page, past the end goes to the first.
    pub fn wrap_index(&self, requested: i64) -> Option<u32> {
        let count = self.page_count.filter(|&n| n > 0)? as i64;
        let index = if requested < 0 {
            count - 1
        } else if requested >= count {
            0
        } else {
            requested
        };
        Some(index as u32)
    }
}

impl NotificationHandler<PdfEvent> for PdfPages {
    fn observe(&mut self, event: &PdfEvent) {
        match event {
            PdfEvent::Loading => self.loading = true,
            PdfEvent::Loaded => {}
            PdfEvent::Opened { page_count } => {
                self.loading = false;
                self.page_count = Some(*page_count);
                self.current = None;
                self.first_page_due = *page_count > 0;
                info!(page_count, "document opened");
            }
            PdfEvent::Selected(page) if page.is_renderable() => {
                self.current = Some(*page);
            }
            PdfEvent::Selected(page) => {
                warn!(index = page.index, "selected page has no surface");
            }
        }
    }

    fn on_notification(&mut self, event: PdfEvent) -> std::result::Result<(), HandlerError> {
        debug!(?event, "document progress");
        Ok(())
    }

    fn on_failure(&mut self, code: NativeCode) {
        self.loading = false;
        warn!(%code, "document load failed");
    }
}

/// PDF viewer component bound to one native instance.
pub struct PdfDocument<N>
where
    N: NativeModule<Event = PdfEvent, Command = PdfCommand>,
{
    bridge: NativeBridgeHandle<N, PdfPages>,
}

impl<N> PdfDocument<N>
where
    N: NativeModule<Event = PdfEvent, Command = PdfCommand>,
{
    pub fn new(module: Arc<N>, entry: CallbackEntry<PdfEvent>, config: DispatchConfig) -> Self {
        Self {
            bridge: NativeBridgeHandle::new(module, entry, PdfPages::default(), config),
        }
    }

    pub fn activate(&mut self) -> Result<()> {
        self.bridge.activate()
    }

    pub fn load(
        &mut self,
        folder: impl Into<String>,
        file: impl Into<String>,
    ) -> OperationFuture<PdfEvent> {
        self.bridge.operation(PdfCommand::LoadFile {
            folder: folder.into(),
            file: file.into(),
        })
    }

    /// Execute this tick's callbacks. Once a document opens with pages,
    /// its first page is selected.
    pub fn tick(&mut self) -> usize {
        let ran = self.bridge.tick();
        if std::mem::take(&mut self.bridge.handler_mut().first_page_due) {
            // Completion is observed through `pages()`.
            drop(self.select_page(0));
        }
        ran
    }

    /// Select a page, wrapping out-of-range indices around the document.
    ///
    /// `None` when no document is open or the target is already shown.
    pub fn select_page(&mut self, index: i64) -> Option<OperationFuture<PdfEvent>> {
        let pages = self.bridge.handler();
        let target = pages.wrap_index(index)?;
        if pages.current_index() == Some(target) {
            return None;
        }
        Some(self.bridge.operation(PdfCommand::SelectPage { index: target }))
    }

    pub fn first_page(&mut self) -> Option<OperationFuture<PdfEvent>> {
        self.select_page(0)
    }

    pub fn previous_page(&mut self) -> Option<OperationFuture<PdfEvent>> {
        let current = self.current_index();
        self.select_page(current - 1)
    }

    pub fn next_page(&mut self) -> Option<OperationFuture<PdfEvent>> {
        let current = self.current_index();
        self.select_page(current + 1)
    }

    pub fn last_page(&mut self) -> Option<OperationFuture<PdfEvent>> {
        let count = self.bridge.handler().page_count()? as i64;
        self.select_page(count - 1)
    }

    pub fn pages(&self) -> &PdfPages {
        self.bridge.handler()
    }

    pub fn bridge(&self) -> &NativeBridgeHandle<N, PdfPages> {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut NativeBridgeHandle<N, PdfPages> {
        &mut self.bridge
    }

    fn current_index(&self) -> i64 {
        self.bridge
            .handler()
            .current_index()
            .map_or(0, |i| i as i64)
    }
}

// =============================================================================
// Loopback simulation
// =============================================================================

pub type SimulatedPdf = LoopbackModule<PdfCommand, PdfEvent>;

/// Page count of every document the loopback renderer opens.
pub const SIMULATED_PAGE_COUNT: u32 = 8;

/// Loopback renderer: any non-empty file name opens as a
/// [`SIMULATED_PAGE_COUNT`]-page US Letter document.
pub fn simulated(section: &LoopbackSection) -> SimulatedPdf {
    let open = Arc::new(Mutex::new(None::<u32>));

    LoopbackModule::from_config(section, move |command: &PdfCommand| match command {
        PdfCommand::LoadFile { file, .. } if file.trim().is_empty() => {
            Reply::reject(NativeCode::NOT_FOUND)
        }
        PdfCommand::LoadFile { .. } => {
            *lock(&open) = Some(SIMULATED_PAGE_COUNT);
            Reply::accept(vec![
                CallbackEnvelope::StateEvent(PdfEvent::Loading),
                CallbackEnvelope::StateEvent(PdfEvent::Loaded),
                CallbackEnvelope::StateEvent(PdfEvent::Opened {
                    page_count: SIMULATED_PAGE_COUNT,
                }),
            ])
        }
        PdfCommand::SelectPage { index } => match *lock(&open) {
            Some(count) if *index < count => Reply::accept_one(PdfEvent::Selected(PdfPage {
                index: *index,
                width: 612,
                height: 792,
                surface: SurfaceHandle(0x2000 + *index as usize),
            })),
            _ => Reply::reject(NativeCode::INVALID_ARG),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_is_due_only_for_non_empty_documents() {
        let mut pages = PdfPages::default();
        pages.observe(&PdfEvent::Opened { page_count: 0 });
        assert!(!pages.first_page_due);
        assert_eq!(pages.wrap_index(0), None);

        pages.observe(&PdfEvent::Opened { page_count: 3 });
        assert!(pages.first_page_due);
    }

    fn page(index: u32) -> PdfPage {
        PdfPage {
            index,
            width: 612,
            height: 792,
            surface: SurfaceHandle(0x40),
        }
    }

    fn opened(count: u32) -> PdfPages {
        let mut pages = PdfPages::default();
        pages.observe(&PdfEvent::Opened { page_count: count });
        pages
    }

    #[test]
    fn correlation_rules() {
        assert_eq!(PdfEvent::Opened { page_count: 1 }.completes(), Some(PdfKind::Load));
        assert_eq!(PdfEvent::Selected(page(0)).completes(), Some(PdfKind::Select));
        assert_eq!(PdfEvent::Loading.completes(), None);
        assert_eq!(PdfEvent::Loaded.completes(), None);
    }

    #[test]
    fn wrap_index_around_document() {
        let pages = opened(5);
        assert_eq!(pages.wrap_index(-1), Some(4));
        assert_eq!(pages.wrap_index(5), Some(0));
        assert_eq!(pages.wrap_index(2), Some(2));
    }

    #[test]
    fn wrap_index_without_document() {
        assert_eq!(PdfPages::default().wrap_index(0), None);
        assert_eq!(opened(0).wrap_index(0), None);
    }

    #[test]
    fn opened_resets_current_page() {
        let mut pages = opened(3);
        pages.observe(&PdfEvent::Selected(page(2)));
        assert_eq!(pages.current_index(), Some(2));
        pages.observe(&PdfEvent::Opened { page_count: 7 });
        assert_eq!(pages.current_index(), None);
        assert_eq!(pages.page_count(), Some(7));
    }

    #[test]
    fn unrenderable_selection_is_ignored() {
        let mut pages = opened(3);
        let mut blank = page(1);
        blank.surface = SurfaceHandle::NULL;
        pages.observe(&PdfEvent::Selected(blank));
        assert_eq!(pages.current(), None);
    }

    #[test]
    fn loading_flag() {
        let mut pages = PdfPages::default();
        pages.observe(&PdfEvent::Loading);
        assert!(pages.is_loading());
        pages.on_failure(NativeCode::NOT_FOUND);
        assert!(!pages.is_loading());
    }
}
