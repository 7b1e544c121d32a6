//! TomTom Routing API adapter.
//!
//! Builds `calculateRoute` requests over the ordered waypoint coordinates
//! and normalizes the response into a [`RoutingSolution`]. When the solve
//! may reorder waypoints we ask for the polyline representation so each
//! leg's endpoints can be read back from its point list; for fixed-order
//! solves a summary-only response suffices and endpoints are synthesized
//! from the request order.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderError;
use crate::model::{RoutingSolution, SolutionSummary, SolvedLeg};
use crate::traits::RoutingProvider;

#[derive(Debug, Clone)]
pub struct TomTomConfig {
    pub base_url: String,
    pub api_key: String,
    pub route_type: String,
    pub travel_mode: String,
    pub timeout_secs: u64,
}

impl TomTomConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.tomtom.com/routing/1/calculateRoute".to_string(),
            api_key: api_key.into(),
            route_type: "fastest".to_string(),
            travel_mode: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TomTomClient {
    config: TomTomConfig,
    client: reqwest::blocking::Client,
}

impl TomTomClient {
    pub fn new(config: TomTomConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn request_url(&self, coordinates: &[(f64, f64)], allow_reorder: bool) -> String {
        let coords = coordinates
            .iter()
            .map(|(lat, lon)| format!("{lat:.6},{lon:.6}"))
            .collect::<Vec<_>>()
            .join(":");

        let representation = if allow_reorder {
            "polyline"
        } else {
            "summaryOnly"
        };

        format!(
            "{}/{}/json?routeType={}&travelMode={}&routeRepresentation={}&departAt=now&computeBestOrder={}&traffic=true&key={}",
            self.config.base_url.trim_end_matches('/'),
            coords,
            self.config.route_type,
            self.config.travel_mode,
            representation,
            allow_reorder,
            self.config.api_key,
        )
    }
}

impl RoutingProvider for TomTomClient {
    fn solve(
        &self,
        coordinates: &[(f64, f64)],
        allow_reorder: bool,
    ) -> Result<RoutingSolution, ProviderError> {
        let url = self.request_url(coordinates, allow_reorder);
        debug!(
            waypoints = coordinates.len(),
            allow_reorder, "requesting TomTom solve"
        );

        let response = self.client.get(&url).send()?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        let response = response.error_for_status()?;
        let body: CalculateRouteResponse = response
            .json()
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;

        normalize(body, coordinates, allow_reorder)
    }
}

/// Turn a raw TomTom response into the normalized solution shape.
fn normalize(
    body: CalculateRouteResponse,
    coordinates: &[(f64, f64)],
    allow_reorder: bool,
) -> Result<RoutingSolution, ProviderError> {
    let route = body
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("response contains no routes".to_string()))?;

    let mut legs = Vec::with_capacity(route.legs.len());
    for (i, leg) in route.legs.into_iter().enumerate() {
        let (departure, arrival) = if allow_reorder {
            // Endpoints come from the returned polyline of each leg.
            let first = leg.points.first().ok_or_else(|| {
                ProviderError::InvalidResponse(format!("leg {i} has no points"))
            })?;
            let last = leg.points.last().ok_or_else(|| {
                ProviderError::InvalidResponse(format!("leg {i} has no points"))
            })?;
            (
                (first.latitude, first.longitude),
                (last.latitude, last.longitude),
            )
        } else {
            // Fixed order: leg i runs between request coordinates i and i+1.
            let from = coordinates.get(i).copied().ok_or_else(|| {
                ProviderError::InvalidResponse(format!(
                    "leg {i} has no matching request coordinate"
                ))
            })?;
            let to = coordinates.get(i + 1).copied().ok_or_else(|| {
                ProviderError::InvalidResponse(format!(
                    "leg {i} has no matching request coordinate"
                ))
            })?;
            (from, to)
        };

        legs.push(SolvedLeg {
            departure,
            arrival,
            length_in_meters: leg.summary.length_in_meters,
            travel_time_in_seconds: leg.summary.travel_time_in_seconds,
            traffic_delay_in_seconds: leg.summary.traffic_delay_in_seconds,
            traffic_length_in_meters: leg.summary.traffic_length_in_meters,
            departure_time: leg.summary.departure_time,
            arrival_time: leg.summary.arrival_time,
        });
    }

    Ok(RoutingSolution {
        summary: SolutionSummary {
            length_in_meters: route.summary.length_in_meters,
            travel_time_in_seconds: route.summary.travel_time_in_seconds,
            traffic_delay_in_seconds: route.summary.traffic_delay_in_seconds,
            traffic_length_in_meters: route.summary.traffic_length_in_meters,
            departure_time: route.summary.departure_time,
            arrival_time: route.summary.arrival_time,
        },
        legs,
    })
}

#[derive(Debug, Deserialize)]
struct CalculateRouteResponse {
    #[serde(default)]
    routes: Vec<TomTomRoute>,
}

#[derive(Debug, Deserialize)]
struct TomTomRoute {
    summary: TomTomSummary,
    #[serde(default)]
    legs: Vec<TomTomLeg>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TomTomSummary {
    length_in_meters: i64,
    travel_time_in_seconds: i64,
    #[serde(default)]
    traffic_delay_in_seconds: i64,
    #[serde(default)]
    traffic_length_in_meters: i64,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TomTomLeg {
    summary: TomTomSummary,
    #[serde(default)]
    points: Vec<TomTomPoint>,
}

#[derive(Debug, Deserialize)]
struct TomTomPoint {
    latitude: f64,
    longitude: f64,
}
