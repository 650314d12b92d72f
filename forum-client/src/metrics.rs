use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub auth_retries: u64,
    pub token_refreshes: u64,
    pub failed_token_refreshes: u64,
    pub average_response_time: Duration,
    pub last_request_time: Option<SystemTime>,
    pub requests_by_endpoint: HashMap<String, EndpointMetrics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointMetrics {
    pub request_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub total_response_time: Duration,
    pub min_response_time: Duration,
    pub max_response_time: Duration,
}

#[derive(Debug, Clone)]
pub struct RequestMetrics {
    pub endpoint: String,
    pub method: String,
    pub status_code: Option<u16>,
    pub response_time: Duration,
    pub success: bool,
    /// Request was reissued after a reactive token refresh.
    pub auth_retry: bool,
}

impl EndpointMetrics {
    fn new() -> Self {
        Self {
            request_count: 0,
            success_count: 0,
            error_count: 0,
            total_response_time: Duration::from_millis(0),
            min_response_time: Duration::from_secs(u64::MAX),
            max_response_time: Duration::from_millis(0),
        }
    }

    fn update(&mut self, metrics: &RequestMetrics) {
        self.request_count += 1;
        self.total_response_time += metrics.response_time;
        self.min_response_time = self.min_response_time.min(metrics.response_time);
        self.max_response_time = self.max_response_time.max(metrics.response_time);

        if metrics.success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
    }
}

#[derive(Debug)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<ApiMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(ApiMetrics::default())),
        }
    }

    pub async fn record_request(&self, request_metrics: RequestMetrics) {
        let mut metrics = self.metrics.write().await;

        metrics.total_requests += 1;
        metrics.last_request_time = Some(SystemTime::now());

        if request_metrics.success {
            metrics.successful_requests += 1;
        } else {
            metrics.failed_requests += 1;
        }

        if request_metrics.auth_retry {
            metrics.auth_retries += 1;
        }

        let total_time = metrics.average_response_time * metrics.total_requests as u32
            - metrics.average_response_time
            + request_metrics.response_time;
        metrics.average_response_time = total_time / metrics.total_requests as u32;

        metrics
            .requests_by_endpoint
            .entry(request_metrics.endpoint.clone())
            .or_insert_with(EndpointMetrics::new)
            .update(&request_metrics);
    }

    pub async fn record_refresh(&self, succeeded: bool) {
        let mut metrics = self.metrics.write().await;
        if succeeded {
            metrics.token_refreshes += 1;
        } else {
            metrics.failed_token_refreshes += 1;
        }
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn export_metrics(&self) -> Result<String, serde_json::Error> {
        let metrics = self.get_metrics().await;
        serde_json::to_string_pretty(&metrics)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(endpoint: &str, success: bool, auth_retry: bool) -> RequestMetrics {
        RequestMetrics {
            endpoint: endpoint.to_string(),
            method: "POST".to_string(),
            status_code: Some(if success { 201 } else { 401 }),
            response_time: Duration::from_millis(100),
            success,
            auth_retry,
        }
    }

    #[tokio::test]
    async fn test_metrics_collection() {
        let collector = MetricsCollector::new();

        collector
            .record_request(request("/community/create-post", false, false))
            .await;
        collector
            .record_request(request("/community/create-post", true, true))
            .await;
        collector.record_refresh(true).await;
        collector.record_refresh(false).await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.successful_requests, 1);
        assert_eq!(metrics.failed_requests, 1);
        assert_eq!(metrics.auth_retries, 1);
        assert_eq!(metrics.token_refreshes, 1);
        assert_eq!(metrics.failed_token_refreshes, 1);
        assert_eq!(metrics.average_response_time, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_endpoint_metrics() {
        let collector = MetricsCollector::new();
        collector
            .record_request(request("/auth/verify-token", true, false))
            .await;

        collector
            .record_request(request("/auth/verify-token", false, false))
            .await;

        let metrics = collector.get_metrics().await;
        let endpoint = &metrics.requests_by_endpoint["/auth/verify-token"];
        assert_eq!(endpoint.request_count, 2);
        assert_eq!(endpoint.success_count, 1);
        assert_eq!(endpoint.error_count, 1);
        assert_eq!(endpoint.max_response_time, Duration::from_millis(100));
        assert!(!metrics.requests_by_endpoint.contains_key("/community/create-post"));
    }

    #[tokio::test]
    async fn test_export_metrics() {
        let collector = MetricsCollector::new();
        collector.record_refresh(true).await;

        let exported = collector.export_metrics().await.unwrap();
        assert!(exported.contains("token_refreshes"));
    }
}
