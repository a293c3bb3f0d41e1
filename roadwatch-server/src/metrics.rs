use metrics::{counter, histogram};
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct Metrics {
    pub uploads_total: Arc<RwLock<u64>>,
    pub images_processed_total: Arc<RwLock<u64>>,
    pub videos_processed_total: Arc<RwLock<u64>>,
    pub failures_total: Arc<RwLock<u64>>,
    pub processing_durations: Arc<RwLock<Vec<f64>>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            uploads_total: Arc::new(RwLock::new(0)),
            images_processed_total: Arc::new(RwLock::new(0)),
            videos_processed_total: Arc::new(RwLock::new(0)),
            failures_total: Arc::new(RwLock::new(0)),
            processing_durations: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn record_upload(&self) {
        let mut total = self.uploads_total.write().await;
        *total += 1;
        counter!("roadwatch_uploads_total").increment(1);
    }

    pub async fn record_image(&self, duration_ms: f64) {
        let mut total = self.images_processed_total.write().await;
        *total += 1;
        drop(total);

        self.push_duration(duration_ms).await;
        counter!("roadwatch_images_processed_total").increment(1);
        histogram!("roadwatch_processing_duration_ms").record(duration_ms);
    }

    pub async fn record_video(&self, duration_ms: f64) {
        let mut total = self.videos_processed_total.write().await;
        *total += 1;
        drop(total);

        self.push_duration(duration_ms).await;
        counter!("roadwatch_videos_processed_total").increment(1);
        histogram!("roadwatch_processing_duration_ms").record(duration_ms);
    }

    pub async fn record_failure(&self) {
        let mut total = self.failures_total.write().await;
        *total += 1;
        counter!("roadwatch_processing_failures_total").increment(1);
    }

    async fn push_duration(&self, duration_ms: f64) {
        let mut durations = self.processing_durations.write().await;
        durations.push(duration_ms);
        if durations.len() > 1000 {
            durations.remove(0);
        }
    }

    pub async fn get_prometheus_metrics(&self) -> String {
        let durations = self.processing_durations.read().await;
        let avg_ms = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<f64>() / durations.len() as f64
        };
        drop(durations);

        format!(
            "# HELP roadwatch_uploads_total Total uploads accepted\n\
             # TYPE roadwatch_uploads_total counter\n\
             roadwatch_uploads_total {}\n\
             # HELP roadwatch_images_processed_total Images processed\n\
             # TYPE roadwatch_images_processed_total counter\n\
             roadwatch_images_processed_total {}\n\
             # HELP roadwatch_videos_processed_total Videos processed\n\
             # TYPE roadwatch_videos_processed_total counter\n\
             roadwatch_videos_processed_total {}\n\
             # HELP roadwatch_processing_failures_total Uploads that failed during processing\n\
             # TYPE roadwatch_processing_failures_total counter\n\
             roadwatch_processing_failures_total {}\n\
             # HELP roadwatch_processing_duration_ms_avg Mean processing time over the recent window\n\
             # TYPE roadwatch_processing_duration_ms_avg gauge\n\
             roadwatch_processing_duration_ms_avg {}\n",
            *self.uploads_total.read().await,
            *self.images_processed_total.read().await,
            *self.videos_processed_total.read().await,
            *self.failures_total.read().await,
            avg_ms
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
