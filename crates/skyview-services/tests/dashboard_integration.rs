//! Integration tests for the Dashboard controller using wiremock.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::{TimeZone, Utc};
use skyview_core::{FavoritesConfig, SearchConfig, WeatherConfig};
use skyview_services::{Dashboard, MemoryStorage};
use skyview_weather::{StatisticalAggregation, WeatherProvider};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn search_config() -> SearchConfig {
    SearchConfig {
        debounce_ms: 50,
        ..SearchConfig::default()
    }
}

fn dashboard_for(server: &MockServer, storage: MemoryStorage) -> Dashboard {
    let provider = WeatherProvider::new(WeatherConfig {
        api_key: Some("test-key".into()),
        base_url: server.uri(),
        history_base_url: server.uri(),
        ..WeatherConfig::default()
    })
    .unwrap();

    Dashboard::new(
        provider,
        Box::new(storage),
        &search_config(),
        &FavoritesConfig::default(),
    )
}

fn london_suggestions() -> serde_json::Value {
    serde_json::json!([
        {"name": "London", "lat": 51.5073, "lon": -0.1276, "country": "GB", "state": "England"},
        {"name": "London", "lat": 42.9834, "lon": -81.233, "country": "CA", "state": "Ontario"}
    ])
}

fn current_json(name: &str, lat: f64, lon: f64) -> serde_json::Value {
    serde_json::json!({
        "coord": {"lat": lat, "lon": lon},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
        "main": {"temp": 21.5, "feels_like": 21.0, "pressure": 1020, "humidity": 48},
        "wind": {"speed": 2.0, "deg": 180},
        "dt": 1718000000,
        "sys": {"country": "GB"},
        "name": name
    })
}

async fn mount_current(server: &MockServer, name: &str, lat: f64, lon: f64) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json(name, lat, lon)))
        .mount(server)
        .await;
}

async fn mount_air(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "coord": {"lat": 51.5073, "lon": -0.1276},
            "list": [{"dt": 1718000000, "main": {"aqi": 1}, "components": {}}]
        })))
        .mount(server)
        .await;
}

async fn mount_historical(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall/timemachine"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "lat": 51.5073, "lon": -0.1276,
            "data": [{"dt": 1717900000, "temp": 16.0, "feels_like": 15.5}]
        })))
        .mount(server)
        .await;
}

async fn mount_onecall(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "lat": 51.5073, "lon": -0.1276, "hourly": [], "daily": []
        })))
        .mount(server)
        .await;
}

/// Dashboard with a complete London snapshot already resolved.
async fn resolved_dashboard(server: &MockServer) -> Dashboard {
    mount_current(server, "London", 51.5073, -0.1276).await;
    mount_air(server).await;
    mount_historical(server).await;
    mount_onecall(server).await;

    let mut dashboard = dashboard_for(server, MemoryStorage::new());
    dashboard.on_map_click(51.5073, -0.1276).await;
    assert!(dashboard.view().snapshot.is_some());
    dashboard
}

async fn next_suggestions(dashboard: &mut Dashboard) -> bool {
    tokio::time::timeout(Duration::from_secs(5), dashboard.next_suggestions())
        .await
        .expect("suggestions did not arrive")
}

#[tokio::test]
async fn test_rapid_input_issues_single_lookup() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Lond"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_suggestions()))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Lon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_suggestions()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server, MemoryStorage::new());
    dashboard.on_search_input("Lon");
    dashboard.on_search_input("Lond");

    assert!(next_suggestions(&mut dashboard).await);
    assert_eq!(dashboard.suggestions().len(), 2);
    assert_eq!(dashboard.suggestions()[0].display_name(), "London, England, GB");
}

#[tokio::test]
async fn test_short_input_never_looks_up() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_suggestions()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server, MemoryStorage::new());
    dashboard.on_search_input("L");
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(dashboard.suggestions().is_empty());
    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_clearing_input_cancels_pending_lookup() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_suggestions()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server, MemoryStorage::new());
    dashboard.on_search_input("Par");
    dashboard.on_search_input("");
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(dashboard.suggestions().is_empty());
}

#[tokio::test]
async fn test_select_suggestion_resolves_snapshot() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_suggestions()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "51.5073"))
        .and(query_param("lon", "-0.1276"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(current_json("London", 51.5073, -0.1276)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server, MemoryStorage::new());
    dashboard.on_search_input("London");
    assert!(next_suggestions(&mut dashboard).await);

    assert!(!dashboard.select_suggestion(7).await);
    assert!(dashboard.select_suggestion(0).await);

    assert_eq!(dashboard.search_text(), "London, England, GB");
    assert!(dashboard.suggestions().is_empty());

    let view = dashboard.view();
    assert!(!view.loading);
    assert!(view.error.is_none());
    assert_eq!(view.snapshot.as_ref().unwrap().location.name, "London");
    // No optional endpoint is mounted.
    assert_eq!(
        view.notice.as_deref(),
        Some("Some data is currently unavailable: air quality, historical weather, forecast")
    );
}

#[tokio::test]
async fn test_submit_unknown_name_reports_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Atlantis"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "cod": "404",
            "message": "city not found"
        })))
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server, MemoryStorage::new());
    // Below the debounce interval: submit before any lookup runs.
    dashboard.on_search_input("Atlantis");
    dashboard.submit_search().await;

    let view = dashboard.view();
    assert!(view.snapshot.is_none());
    assert_eq!(view.error.as_deref(), Some("Location not found"));
}

#[tokio::test]
async fn test_map_click_failure_sets_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server, MemoryStorage::new());
    dashboard.on_map_click(48.8566, 2.3522).await;

    let view = dashboard.view();
    assert!(!view.loading);
    assert!(view.snapshot.is_none());
    assert_eq!(view.error.as_deref(), Some("Failed to fetch current weather"));
}

#[tokio::test]
async fn test_new_resolution_clears_previous_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "0"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;
    mount_current(&mock_server, "Paris", 48.8566, 2.3522).await;
    mount_air(&mock_server).await;
    mount_historical(&mock_server).await;
    mount_onecall(&mock_server).await;

    let mut dashboard = dashboard_for(&mock_server, MemoryStorage::new());
    dashboard.on_map_click(0.0, 0.0).await;
    assert!(dashboard.view().error.is_some());

    dashboard.on_geolocated(48.8566, 2.3522).await;
    let view = dashboard.view();
    assert!(view.error.is_none());
    assert!(view.notice.is_none());
    assert_eq!(view.snapshot.as_ref().unwrap().location.name, "Paris");
}

#[tokio::test]
async fn test_historical_failure_keeps_snapshot() {
    let mock_server = MockServer::start().await;

    mount_current(&mock_server, "London", 51.5073, -0.1276).await;
    mount_air(&mock_server).await;
    mount_historical(&mock_server).await;
    mount_onecall(&mock_server).await;

    let mut dashboard = dashboard_for(&mock_server, MemoryStorage::new());
    dashboard.on_map_click(51.5073, -0.1276).await;
    let before = dashboard.view().snapshot.clone().unwrap();
    assert!(before.is_complete());

    mock_server.reset().await;
    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall/timemachine"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    dashboard.change_historical_date(at).await;

    let view = dashboard.view();
    assert!(!view.historical_loading);
    assert_eq!(view.snapshot.as_ref(), Some(&before));
    assert_eq!(
        view.error.as_deref(),
        Some("Failed to fetch historical weather data")
    );
}

#[tokio::test]
async fn test_save_blank_name_uses_place_name() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "Seattle", "lat": 47.6062, "lon": -122.3321, "country": "US", "state": "Washington"}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server, MemoryStorage::new());
    let saved = dashboard.save_location("  ", 47.6062, -122.3321).await.unwrap();

    assert_eq!(saved.name, "Seattle, Washington");
    assert_eq!(saved.id, "47.6062--122.3321");
    assert!(dashboard.is_saved(47.6062, -122.3321));
}

#[tokio::test]
async fn test_save_blank_name_without_place_uses_coordinates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server, MemoryStorage::new());
    let saved = dashboard.save_location("", 0.0, -30.0).await.unwrap();

    assert_eq!(saved.name, "0.0000, -30.0000");
}

#[tokio::test]
async fn test_saved_locations_persist_across_dashboards() {
    let mock_server = MockServer::start().await;
    mount_current(&mock_server, "London", 51.5073, -0.1276).await;
    let storage = MemoryStorage::new();

    {
        let mut dashboard = dashboard_for(&mock_server, storage.clone());
        dashboard.on_map_click(51.5073, -0.1276).await;
        let saved = dashboard.save_current().await.unwrap().unwrap();
        assert_eq!(saved.name, "London, GB");

        // Same point again is rejected.
        assert!(dashboard.save_location("Home", 51.5073, -0.1276).await.is_err());
    }

    let mut dashboard = dashboard_for(&mock_server, storage);
    assert_eq!(dashboard.saved_locations().len(), 1);
    let id = dashboard.saved_locations()[0].id.clone();

    assert!(dashboard.select_saved(&id).await);
    assert_eq!(dashboard.view().snapshot.as_ref().unwrap().location.name, "London");
    assert!(!dashboard.select_saved("missing").await);

    assert!(dashboard.delete_saved(&id).unwrap());
    assert!(!dashboard.delete_saved(&id).unwrap());
    assert!(dashboard.saved_locations().is_empty());
}

#[tokio::test]
async fn test_accumulated_loads_both_series_for_snapshot() {
    let mock_server = MockServer::start().await;
    let mut dashboard = resolved_dashboard(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/history/accumulated_temperature"))
        .and(query_param("lat", "51.5073"))
        .and(query_param("threshold", "284"))
        .and(query_param("start", "1709251200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "list": [{"date": "2024-03-01", "temp": 12.5, "count": 1}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/history/accumulated_precipitation"))
        .and(query_param("lon", "-0.1276"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "list": [
                {"date": "2024-03-01", "rain": 1.5, "count": 1},
                {"date": "2024-03-02", "rain": 3.0, "count": 2}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap();
    dashboard.load_accumulated(start, end, None).await;

    let view = dashboard.view();
    assert!(!view.details_loading);
    assert!(view.error.is_none());
    let data = view.accumulated.as_ref().unwrap();
    assert_eq!(data.threshold, 284.0);
    assert_eq!(data.start, start);
    assert_eq!(data.temperature[0].temp, 12.5);
    assert_eq!(data.precipitation.len(), 2);

    // A new location discards details loaded for the old one.
    dashboard.on_map_click(51.5073, -0.1276).await;
    assert!(dashboard.view().accumulated.is_none());
}

#[tokio::test]
async fn test_accumulated_rejects_long_range_without_request() {
    let mock_server = MockServer::start().await;
    let mut dashboard = resolved_dashboard(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/history/accumulated_temperature"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    dashboard.load_accumulated(start, end, Some(290.0)).await;

    let view = dashboard.view();
    assert_eq!(view.error.as_deref(), Some("Date range cannot exceed 30 days"));
    assert!(view.accumulated.is_none());
    assert!(view.snapshot.is_some());
}

#[tokio::test]
async fn test_accumulated_failure_keeps_previous_data() {
    let mock_server = MockServer::start().await;
    let mut dashboard = resolved_dashboard(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/history/accumulated_temperature"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"list": []})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/history/accumulated_precipitation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"list": []})))
        .mount(&mock_server)
        .await;

    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap();
    dashboard.load_accumulated(start, end, None).await;
    let before = dashboard.view().accumulated.clone();
    assert!(before.is_some());

    mock_server.reset().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/history/accumulated_temperature"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"list": []})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/history/accumulated_precipitation"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    dashboard.load_accumulated(start, end, Some(280.0)).await;

    let view = dashboard.view();
    assert!(!view.details_loading);
    assert_eq!(
        view.error.as_deref(),
        Some("Failed to fetch accumulated precipitation data")
    );
    assert_eq!(view.accumulated, before);
}

#[tokio::test]
async fn test_yearly_statistics_carry_monthly_summaries() {
    let mock_server = MockServer::start().await;
    let mut dashboard = resolved_dashboard(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/aggregated/year"))
        .and(query_param("lat", "51.5073"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "cod": 200,
            "city_id": 2643743,
            "result": [
                {"month": 1, "day": 1, "temp": {"mean": 278.0, "record_min": 260.0, "record_max": 288.0}},
                {"month": 1, "day": 2, "temp": {"mean": 280.0, "record_min": 262.0, "record_max": 290.0}},
                {"month": 2, "day": 1, "temp": {"mean": 281.0, "record_min": 265.0, "record_max": 291.0}}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    dashboard.load_statistics(StatisticalAggregation::Year).await;

    let view = dashboard.view();
    assert!(view.error.is_none());
    let stats = view.statistics.as_ref().unwrap();
    assert_eq!(stats.aggregation, StatisticalAggregation::Year);
    assert_eq!(stats.days.len(), 3);
    assert_eq!(stats.monthly.len(), 2);
    assert_eq!(stats.monthly[0].month_name, "January");
    assert_eq!(stats.monthly[0].mean_temp, 279.0);
    assert_eq!(stats.monthly[0].record_min_temp, 260.0);
    assert_eq!(stats.monthly[1].record_max_temp, 291.0);
}

#[tokio::test]
async fn test_monthly_statistics_have_no_summaries() {
    let mock_server = MockServer::start().await;
    let mut dashboard = resolved_dashboard(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/aggregated/month"))
        .and(query_param("month", "6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": {"month": 6, "temp": {"mean": 290.0}}
        })))
        .mount(&mock_server)
        .await;

    dashboard
        .load_statistics(StatisticalAggregation::Month { month: 6 })
        .await;

    let stats = dashboard.view().statistics.as_ref().unwrap();
    assert_eq!(stats.days.len(), 1);
    assert!(stats.monthly.is_empty());
}

#[tokio::test]
async fn test_invalid_statistics_request_sets_error() {
    let mock_server = MockServer::start().await;
    let mut dashboard = resolved_dashboard(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/aggregated/month"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    dashboard
        .load_statistics(StatisticalAggregation::Month { month: 13 })
        .await;

    let view = dashboard.view();
    assert_eq!(
        view.error.as_deref(),
        Some("Month must be between 1 and 12, got: 13")
    );
    assert!(view.statistics.is_none());
}

#[tokio::test]
async fn test_daily_forecast_for_snapshot() {
    let mock_server = MockServer::start().await;
    let mut dashboard = resolved_dashboard(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast/daily"))
        .and(query_param("cnt", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "city": {"id": 2643743, "name": "London", "coord": {"lat": 51.5073, "lon": -0.1276},
                     "country": "GB", "timezone": 3600},
            "cnt": 1,
            "list": [{
                "dt": 1718010000,
                "temp": {"day": 19.0, "min": 11.0, "max": 21.0, "night": 12.0, "eve": 17.0, "morn": 13.0},
                "feels_like": {"day": 18.5, "night": 11.5, "eve": 16.5, "morn": 12.5},
                "humidity": 55, "speed": 4.0, "deg": 210, "pop": 0.2,
                "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}]
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    dashboard.load_daily_forecast(7).await;

    let view = dashboard.view();
    assert!(view.error.is_none());
    let forecast = view.daily_forecast.as_ref().unwrap();
    assert_eq!(forecast.city.name, "London");
    assert_eq!(forecast.list[0].temp.max, 21.0);

    dashboard.load_daily_forecast(17).await;
    let view = dashboard.view();
    assert_eq!(
        view.error.as_deref(),
        Some("Forecast length must be between 1 and 16 days")
    );
    assert!(view.daily_forecast.is_some());
}

#[tokio::test]
async fn test_details_need_a_snapshot() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut dashboard = dashboard_for(&mock_server, MemoryStorage::new());
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    dashboard.load_accumulated(start, start, None).await;
    dashboard.load_statistics(StatisticalAggregation::Year).await;
    dashboard.load_daily_forecast(3).await;

    assert_eq!(dashboard.view(), &skyview_services::ViewState::default());
}
