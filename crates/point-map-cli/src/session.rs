//! Scripted interactive session
//!
//! Stands in for the host UI: the camera mounts late, the pointer sweeps a Lissajous
//! path, clicks at intervals, clusters get highlighted and toggled, and the camera
//! tours the heaviest clusters one animation after another.

use crate::settings::Settings;
use geo::Coord;
use point_map_lib::{
    AnimationStep, AttributeBuffer, ClusterId, CullOutcome, Dataset, Engine, EngineConfig,
    FrameInput, OrthoCamera, PickOutcome, PointerInput,
};
use std::sync::Arc;

const CLICK_EVERY: u32 = 45;
const HIGHLIGHT_EVERY: u32 = 150;
const TOGGLE_EVERY: u32 = 200;
const TOUR_ZOOM: f64 = 6.0;

/// Aggregated counters over a whole session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub ticks: u32,
    pub ticks_without_camera: u32,
    pub cull_updates: u32,
    pub cull_throttled: u32,
    pub picks: u32,
    pub picks_throttled: u32,
    pub hover_hits: u32,
    pub clicks_selected: u32,
    pub animations_finished: u32,
    pub highlights_expired: u32,
    pub attribute_writes: usize,
    pub visibility_passes: u32,
    pub max_tick_us: u128,
    pub total_tick_us: u128,
}

impl SessionSummary {
    pub fn mean_tick_us(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.total_tick_us as f64 / self.ticks as f64
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "ticks": self.ticks,
            "ticksWithoutCamera": self.ticks_without_camera,
            "cullUpdates": self.cull_updates,
            "cullThrottled": self.cull_throttled,
            "picks": self.picks,
            "picksThrottled": self.picks_throttled,
            "hoverHits": self.hover_hits,
            "clicksSelected": self.clicks_selected,
            "animationsFinished": self.animations_finished,
            "highlightsExpired": self.highlights_expired,
            "attributeWrites": self.attribute_writes,
            "visibilityPasses": self.visibility_passes,
            "maxTickUs": self.max_tick_us,
            "meanTickUs": self.mean_tick_us(),
        })
    }
}

/// Tick-by-tick replay against one engine
pub struct Session {
    engine: Engine,
    buffer: AttributeBuffer,
    camera: OrthoCamera,
    settings: Settings,
    /// Clusters visited by the camera tour, heaviest first
    tour: Vec<ClusterId>,
    tour_pos: usize,
    summary: SessionSummary,
}

impl Session {
    pub fn new(
        dataset: Arc<Dataset>,
        config: EngineConfig,
        settings: Settings,
    ) -> crate::error::Result<Self> {
        let buffer = AttributeBuffer::new(dataset.len());

        let mut tour: Vec<(ClusterId, f64)> = dataset
            .clusters()
            .iter()
            .map(|c| (c.id, c.weight))
            .collect();
        tour.sort_by(|a, b| b.1.total_cmp(&a.1));
        let tour = tour.into_iter().map(|(id, _)| id).collect();

        // Start zoomed out over the whole dataset
        let (center, zoom) = match dataset.bounds() {
            Some(bounds) => {
                let width = bounds.width().max(f64::EPSILON);
                let height = bounds.height().max(f64::EPSILON);
                let zoom = (settings.width as f64 / width)
                    .min(settings.height as f64 / height)
                    .max(f64::EPSILON);
                (bounds.center(), zoom)
            }
            None => (Coord { x: 0.0, y: 0.0 }, 1.0),
        };
        let camera = OrthoCamera::for_viewport(
            center,
            zoom,
            settings.width as f64,
            settings.height as f64,
        );

        Ok(Self {
            engine: Engine::new(dataset, config)?,
            buffer,
            camera,
            settings,
            tour,
            tour_pos: 0,
            summary: SessionSummary::default(),
        })
    }

    pub fn run(mut self) -> SessionSummary {
        tracing::info!(
            ticks = self.settings.ticks,
            points = self.engine.dataset().len(),
            clusters = self.engine.dataset().clusters().len(),
            "Session started"
        );

        // Requested before the camera exists; stays pending until it mounts
        self.next_tour_stop();

        for tick in 0..self.settings.ticks {
            self.step(tick);
        }

        self.summary
    }

    fn step(&mut self, tick: u32) {
        let dt = self.settings.tick_ms;
        let now_ms = tick as f64 * dt;
        let (width, height) = (self.settings.width as f64, self.settings.height as f64);
        let camera_ready = tick >= self.settings.camera_delay_ticks;

        if camera_ready {
            self.scripted_input(tick, now_ms, width, height);
        }

        let input = FrameInput {
            now_ms,
            delta_ms: dt,
            viewport_width_px: width,
            viewport_height_px: height,
        };
        let camera = camera_ready.then_some(&mut self.camera);

        let started = instant::Instant::now();
        let report = self.engine.tick(input, camera, &mut self.buffer);
        let elapsed_us = started.elapsed().as_micros();

        let summary = &mut self.summary;
        summary.ticks += 1;
        summary.total_tick_us += elapsed_us;
        summary.max_tick_us = summary.max_tick_us.max(elapsed_us);
        summary.attribute_writes += report.sync.total();
        if report.sync.visibility_writes > 0 {
            summary.visibility_passes += 1;
        }
        match report.cull {
            None => summary.ticks_without_camera += 1,
            Some(CullOutcome::Updated { .. }) => summary.cull_updates += 1,
            Some(CullOutcome::Throttled) => summary.cull_throttled += 1,
            Some(CullOutcome::Skipped) => {}
        }
        if report.highlight_expired.is_some() {
            summary.highlights_expired += 1;
        }
        if report.animation == AnimationStep::Finished {
            summary.animations_finished += 1;
            self.next_tour_stop();
        }

        let every = self.settings.report_every;
        if every > 0 && tick % every == 0 {
            let store = self.engine.store();
            tracing::info!(
                tick,
                zoom = store.zoom(),
                labels = store.should_show_labels(),
                visible_clusters = store.visible_cluster_ids().len(),
                visible_points = store.visible_point_ids().len(),
                writes = report.sync.total(),
                animation = ?report.animation,
                elapsed_us = elapsed_us as u64,
                "Tick"
            );
        } else {
            tracing::trace!(tick, ?report, "Tick");
        }
    }

    fn scripted_input(&mut self, tick: u32, now_ms: f64, width: f64, height: f64) {
        // Lissajous sweep; the seed shifts the phase so runs differ
        let t = now_ms / 1000.0;
        let phase = (self.settings.seed % 360) as f64 * std::f64::consts::PI / 180.0;
        let pointer = PointerInput {
            screen_x: width * (0.5 + 0.45 * (1.3 * t + phase).sin()),
            screen_y: height * (0.5 + 0.45 * (1.7 * t).cos()),
            now_ms,
        };

        match self.engine.pointer_move(pointer) {
            PickOutcome::Throttled => self.summary.picks_throttled += 1,
            PickOutcome::Picked(hit) => {
                self.summary.picks += 1;
                if hit.is_some() {
                    self.summary.hover_hits += 1;
                }
            }
        }

        if tick % CLICK_EVERY == 0 {
            if let Some(hit) = self.engine.click(pointer) {
                self.summary.clicks_selected += 1;
                tracing::debug!(id = hit.id, distance = hit.distance, "Clicked point");
            }
        }

        if tick % HIGHLIGHT_EVERY == 0 {
            if let Some(&cluster) = self.engine.store().visible_cluster_ids().iter().next() {
                self.engine.highlight_cluster(cluster, now_ms);
            }
        }

        if tick % TOGGLE_EVERY == 0 {
            if let Some(&cluster) = self.tour.last() {
                let selected = self.engine.toggle_cluster(cluster);
                tracing::debug!(cluster, selected, "Toggled cluster");
            }
        }
    }

    fn next_tour_stop(&mut self) {
        if self.tour.is_empty() {
            return;
        }
        let cluster = self.tour[self.tour_pos % self.tour.len()];
        self.tour_pos += 1;
        if self.engine.focus_cluster(cluster, TOUR_ZOOM) {
            tracing::debug!(cluster, "Camera tour");
        }
    }
}
