//! The page's chart container and the resize-driven render loop.
//!
//! Every render takes a generation number when it is triggered. Loads may
//! finish in any order; only the newest generation is allowed to mount its
//! surface, so the last triggered render wins.

use crate::config::ChartConfig;
use crate::data::DataSource;
use crate::error::ChartError;
use crate::render::{render_chart, DrawingSurface};
use crate::types::Viewport;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Holds at most one drawing surface.
#[derive(Debug, Default)]
pub struct ChartContainer {
    current: Option<DrawingSurface>,
}

impl ChartContainer {
    /// Replaces the current surface, returning the one removed.
    pub fn mount(&mut self, surface: DrawingSurface) -> Option<DrawingSurface> {
        self.current.replace(surface)
    }

    pub fn clear(&mut self) -> Option<DrawingSurface> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&DrawingSurface> {
        self.current.as_ref()
    }

    pub fn surface_count(&self) -> usize {
        usize::from(self.current.is_some())
    }
}

#[derive(Debug)]
pub enum RenderOutcome {
    Drawn { generation: u64 },
    /// A newer render was triggered while this one was loading.
    Superseded { generation: u64, latest: u64 },
    Failed { generation: u64, error: ChartError },
}

impl RenderOutcome {
    pub fn generation(&self) -> u64 {
        match self {
            RenderOutcome::Drawn { generation }
            | RenderOutcome::Superseded { generation, .. }
            | RenderOutcome::Failed { generation, .. } => *generation,
        }
    }
}

pub struct ChartController<S> {
    source: S,
    config: ChartConfig,
    generation: AtomicU64,
    container: Mutex<ChartContainer>,
}

impl<S: DataSource> ChartController<S> {
    pub fn new(source: S, config: ChartConfig) -> Self {
        Self {
            source,
            config,
            generation: AtomicU64::new(0),
            container: Mutex::new(ChartContainer::default()),
        }
    }

    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn container(&self) -> MutexGuard<'_, ChartContainer> {
        self.container.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the surface currently mounted, if any.
    pub fn snapshot(&self) -> Option<DrawingSurface> {
        self.container().current().cloned()
    }

    /// Starts a render for `viewport`. The generation is taken now, at
    /// trigger time, not when the returned future is first polled.
    pub fn render(&self, viewport: Viewport) -> impl Future<Output = RenderOutcome> + Send + '_ {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Render #{} triggered for {}", generation, viewport);
        self.run(generation, viewport)
    }

    /// Window resize hook. Not debounced: every resize reloads and redraws.
    pub fn resize(&self, viewport: Viewport) -> impl Future<Output = RenderOutcome> + Send + '_ {
        self.render(viewport)
    }

    async fn run(&self, generation: u64, viewport: Viewport) -> RenderOutcome {
        let surface = match self.source.load().await {
            Ok(rows) => render_chart(viewport, &rows, &self.config),
            Err(e) => Err(e),
        };

        let surface = match surface {
            Ok(surface) => surface,
            Err(error) => {
                warn!("Render #{} failed: {}", generation, error);
                return RenderOutcome::Failed { generation, error };
            }
        };

        let mut container = self.container();
        let latest = self.latest_generation();
        if generation != latest {
            debug!("Render #{} discarded, #{} is newer", generation, latest);
            return RenderOutcome::Superseded { generation, latest };
        }
        container.mount(surface);
        info!("Render #{} drawn at {}", generation, viewport);
        RenderOutcome::Drawn { generation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemory;
    use crate::error::ChartResult;
    use crate::types::{DataRow, Dataset};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn dataset() -> Dataset {
        let mut a = DataRow::new("A", "AA");
        a.poverty = 10.0;
        a.healthcare = 50.0;
        a.income = 40_000.0;
        a.obesity = 20.0;
        let mut b = DataRow::new("B", "BB");
        b.poverty = 20.0;
        b.healthcare = 60.0;
        b.income = 60_000.0;
        b.obesity = 30.0;
        vec![a, b]
    }

    /// First load is slow, later ones are immediate.
    struct SlowFirst {
        rows: Dataset,
        calls: AtomicUsize,
    }

    impl DataSource for SlowFirst {
        async fn load(&self) -> ChartResult<Dataset> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok(self.rows.clone())
        }
    }

    /// Succeeds once, then the file "disappears".
    struct FailsAfterFirst {
        rows: Dataset,
        calls: AtomicUsize,
    }

    impl DataSource for FailsAfterFirst {
        async fn load(&self) -> ChartResult<Dataset> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(self.rows.clone())
            } else {
                Err(std::io::Error::new(std::io::ErrorKind::NotFound, "data.csv").into())
            }
        }
    }

    #[test]
    fn container_keeps_a_single_surface() {
        let rows = dataset();
        let config = ChartConfig::default();
        let mut container = ChartContainer::default();
        assert_eq!(container.surface_count(), 0);

        let first = render_chart(Viewport::new(800, 600), &rows, &config).unwrap();
        let second = render_chart(Viewport::new(900, 600), &rows, &config).unwrap();
        assert!(container.mount(first).is_none());
        let removed = container.mount(second).unwrap();
        assert_eq!(removed.viewport(), Viewport::new(800, 600));
        assert_eq!(container.surface_count(), 1);

        container.clear();
        assert_eq!(container.surface_count(), 0);
    }

    #[tokio::test]
    async fn rendering_twice_leaves_one_surface() {
        let controller = ChartController::new(InMemory(dataset()), ChartConfig::default());
        let viewport = Viewport::new(1000, 700);

        assert!(matches!(controller.render(viewport).await, RenderOutcome::Drawn { generation: 1 }));
        assert!(matches!(controller.render(viewport).await, RenderOutcome::Drawn { generation: 2 }));
        assert_eq!(controller.container().surface_count(), 1);
    }

    #[tokio::test]
    async fn resize_replaces_surface_with_new_size() {
        let controller = ChartController::new(InMemory(dataset()), ChartConfig::default());
        controller.render(Viewport::new(1000, 700)).await;
        controller.resize(Viewport::new(1400, 900)).await;

        let container = controller.container();
        assert_eq!(container.surface_count(), 1);
        let surface = container.current().unwrap();
        assert_eq!(surface.viewport(), Viewport::new(1400, 900));
        assert_eq!(surface.root().get_attr("width"), Some("1400"));
    }

    #[tokio::test]
    async fn last_triggered_render_wins() {
        let source = SlowFirst {
            rows: dataset(),
            calls: AtomicUsize::new(0),
        };
        let controller = ChartController::new(source, ChartConfig::default());

        let older = controller.resize(Viewport::new(800, 600));
        let newer = controller.resize(Viewport::new(1200, 800));
        tokio::pin!(older);
        // start the slow load first, then let the newer render finish
        assert!(futures::poll!(older.as_mut()).is_pending());
        let newer = newer.await;
        let older = older.await;

        assert!(matches!(newer, RenderOutcome::Drawn { generation: 2 }));
        assert!(matches!(older, RenderOutcome::Superseded { generation: 1, latest: 2 }));
        let surface = controller.snapshot().unwrap();
        assert_eq!(surface.viewport(), Viewport::new(1200, 800));
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_chart() {
        let source = FailsAfterFirst {
            rows: dataset(),
            calls: AtomicUsize::new(0),
        };
        let controller = ChartController::new(source, ChartConfig::default());
        controller.render(Viewport::new(1000, 700)).await;

        let outcome = controller.resize(Viewport::new(1100, 700)).await;
        assert!(matches!(
            outcome,
            RenderOutcome::Failed { generation: 2, error: ChartError::Io(_) }
        ));
        let surface = controller.snapshot().unwrap();
        assert_eq!(surface.viewport(), Viewport::new(1000, 700));
    }

    #[tokio::test]
    async fn too_small_viewport_fails_without_mounting() {
        let controller = ChartController::new(InMemory(dataset()), ChartConfig::default());
        let outcome = controller.render(Viewport::new(120, 80)).await;
        assert_eq!(outcome.generation(), 1);
        assert!(matches!(outcome, RenderOutcome::Failed { .. }));
        assert_eq!(controller.container().surface_count(), 0);
    }
}
